//! Seed data generator, used by the `/demo-data` endpoint and by tests.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::calendar;
use crate::domain::{
    Group, Leave, Membership, Person, Qualification, Schedule, ScheduleStatus, SoftWeights, Station, StationWeight,
};
use crate::holidays;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoSize {
    Small,
    Large,
}

impl std::str::FromStr for DemoSize {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMALL" => Ok(DemoSize::Small),
            "LARGE" => Ok(DemoSize::Large),
            _ => Err(()),
        }
    }
}

pub fn list_demo_data() -> Vec<&'static str> {
    vec!["SMALL", "LARGE"]
}

const STATION_NAMES: &[(&str, &str)] = &[
    ("Officer of the Deck", "OOD"),
    ("Conning Officer", "CONN"),
    ("Engineering Duty Officer", "EDO"),
    ("Quarterdeck Watch", "QMOW"),
];

const FIRST_NAMES: &[&str] = &[
    "Amy", "Beth", "Carl", "Dan", "Elsa", "Flo", "Gus", "Hugo", "Ivy", "Jay", "Kira", "Leo",
];
const LAST_NAMES: &[&str] = &[
    "Cole", "Fox", "Green", "Jones", "King", "Li", "Poe", "Rye", "Smith", "Watt",
];

/// Populates `store` with a seeded demo roster and a materialized,
/// membership-populated schedule, returning the new schedule's id.
pub fn generate(store: &Store, size: DemoSize) -> crate::domain::ScheduleId {
    let (person_count, weeks) = match size {
        DemoSize::Small => (15, 4),
        DemoSize::Large => (50, 8),
    };
    let mut rng = StdRng::seed_from_u64(0);

    let stations: Vec<Station> = STATION_NAMES
        .iter()
        .map(|(name, abbr)| {
            store.insert_station(Station {
                id: crate::domain::StationId(0),
                name: (*name).to_string(),
                abbr: (*abbr).to_string(),
            })
        })
        .collect();

    let group_names = ["Junior", "Senior", "Department Head"];
    let groups: Vec<Group> = group_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let mut group = Group::new(crate::domain::GroupId(0), *name, (i + 1) as i32);
            group.seniority_factor = 1.0 + 0.25 * i as f64;
            group.max_assignments = 10 - (i as i32 * 2);
            store.insert_group(group)
        })
        .collect();

    let names = name_permutations(&mut rng);
    let people: Vec<Person> = (0..person_count)
        .map(|i| {
            store.insert_person(Person {
                id: crate::domain::PersonId(0),
                name: names[i % names.len()].clone(),
                is_active: true,
                group_id: Some(groups[i % groups.len()].id),
            })
        })
        .collect();

    for person in &people {
        let qualified_stations = stations.choose_multiple(&mut rng, rng.gen_range(1..=stations.len())).cloned();
        for station in qualified_stations {
            let _ = store.insert_qualification(Qualification {
                id: crate::domain::QualificationId(0),
                person_id: person.id,
                station_id: station.id,
                is_active: true,
                earned_date: None,
            });
        }
    }

    let start_date = find_next_monday(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    let end_date = start_date + Duration::days(7 * weeks - 1);

    let schedule = store.insert_schedule(Schedule {
        id: crate::domain::ScheduleId(0),
        name: format!("{:?} demo watchbill", size),
        start_date,
        end_date,
        status: ScheduleStatus::Draft,
        weights: SoftWeights::default(),
        group_weights: std::collections::HashMap::new(),
        required_stations: stations.iter().map(|s| s.id).collect(),
    });

    let holiday_list = holidays::holidays_in_range(start_date - Duration::days(calendar::LOOKBACK_DAYS), end_date);
    let days = calendar::materialize_days(schedule.id, start_date, end_date, &holiday_list);
    let _ = store.insert_days(schedule.id, days);

    for (person, group) in people.iter().zip(people.iter().map(|p| p.group_id.unwrap())) {
        if let Ok(membership) = store.insert_membership(Membership {
            id: crate::domain::MembershipId(0),
            schedule_id: schedule.id,
            person_id: person.id,
            group_id: group,
            override_seniority_factor: None,
            override_min_assignments: None,
            override_max_assignments: None,
        }) {
            let quals = store.qualifications_for_person(person.id);
            if quals.len() == 1 {
                store.insert_station_weight(StationWeight {
                    id: crate::domain::StationWeightId(0),
                    membership_id: membership.id,
                    station_id: quals[0].station_id,
                    weight: 1.0,
                });
            }

            if rng.gen_bool(0.15) {
                let leave_start = start_date + Duration::days(rng.gen_range(0..(7 * weeks - 5)));
                store.insert_leave(Leave {
                    id: crate::domain::LeaveId(0),
                    membership_id: membership.id,
                    start_date: leave_start,
                    end_date: leave_start + Duration::days(rng.gen_range(1..4)),
                    reason: Some("Leave".to_string()),
                });
            }
        }
    }

    schedule.id
}

fn find_next_monday(date: NaiveDate) -> NaiveDate {
    let days_until_monday = match date.weekday() {
        Weekday::Mon => 0,
        Weekday::Tue => 6,
        Weekday::Wed => 5,
        Weekday::Thu => 4,
        Weekday::Fri => 3,
        Weekday::Sat => 2,
        Weekday::Sun => 1,
    };
    date + Duration::days(days_until_monday)
}

fn name_permutations(rng: &mut StdRng) -> Vec<String> {
    let mut names = Vec::with_capacity(FIRST_NAMES.len() * LAST_NAMES.len());
    for first in FIRST_NAMES {
        for last in LAST_NAMES {
            names.push(format!("{} {}", first, last));
        }
    }
    names.shuffle(rng);
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_demo_seeds_the_expected_roster_size() {
        let store = Store::new();
        let schedule_id = generate(&store, DemoSize::Small);
        assert_eq!(store.memberships_for_schedule(schedule_id).len(), 15);
    }

    #[test]
    fn every_seeded_person_has_at_least_one_qualification() {
        let store = Store::new();
        generate(&store, DemoSize::Small);
        for person in store.list_people() {
            assert!(!store.qualifications_for_person(person.id).is_empty());
        }
    }

    #[test]
    fn demo_size_parses_case_insensitively() {
        assert_eq!("small".parse::<DemoSize>(), Ok(DemoSize::Small));
        assert_eq!("LARGE".parse::<DemoSize>(), Ok(DemoSize::Large));
        assert!("medium".parse::<DemoSize>().is_err());
    }
}
