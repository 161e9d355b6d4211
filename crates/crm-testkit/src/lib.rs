// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crm_app::{
    ClientId, ContactPersonId, DealId, DealStage, NewClient, NewContactPerson, NewDeal,
    NewProject, NewTask, ProjectId, TaskPriority, TaskStatus, UserId,
};
use std::path::PathBuf;
use time::{Date, Duration, Month};

const COMPANY_STEMS: [&str; 14] = [
    "Acme", "Globex", "Initech", "Umbrella", "Hooli", "Stark", "Wayne", "Wonka", "Tyrell",
    "Cyberdyne", "Soylent", "Vandelay", "Pied Piper", "Massive Dynamic",
];

// Suffixes include a comma and a quote so generated rows exercise cell quoting.
const COMPANY_SUFFIXES: [&str; 7] = [
    "Inc.", ", Inc.", "Group", "Labs", "Holdings", "& Sons", "\"Global\"",
];

const FIRST_NAMES: [&str; 12] = [
    "John", "Jane", "Peter", "Susan", "Mike", "Priya", "Omar", "Lena", "Tariq", "Yuki", "Ana",
    "Grace",
];
const LAST_NAMES: [&str; 12] = [
    "Doe", "Smith", "Jones", "Williams", "Brown", "Nakamura", "Haddad", "Okafor", "Silva",
    "Novak", "Ibrahim", "Kowalski",
];

const DESIGNATIONS: [&str; 8] = [
    "CEO",
    "CTO",
    "Head of Procurement",
    "Marketing Director",
    "Founder",
    "VP, Operations",
    "Engineering Manager",
    "Buyer",
];

const SEGMENTS: [&str; 5] = ["Commercial", "Residential", "Industrial", "Retail", "Mixed Use"];
const SECTORS: [&str; 6] = [
    "Cloud Services",
    "Fintech",
    "Healthcare",
    "Logistics",
    "Marketing",
    "Education",
];

const PROJECT_CODENAMES: [&str; 10] = [
    "Phoenix", "Atlas", "Nimbus", "Orion", "Keystone", "Lighthouse", "Granite", "Harbor",
    "Meridian", "Summit",
];

const WORDS: [&str; 20] = [
    "follow", "up", "on", "proposal", "send", "contract", "review", "pricing", "schedule",
    "demo", "call", "renewal", "budget", "approval", "draft", "onboarding", "kickoff",
    "quarterly", "timeline", "scope",
];

const REFERENCE_YEAR: i32 = 2024;

/// Seeded splitmix64 stream. Same seed, same draws on every platform.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform-ish index in `0..n`; zero when `n` is zero or one.
    pub fn below(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    pub fn coin(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }

    /// True roughly once in `n` draws.
    pub fn one_in(&mut self, n: usize) -> bool {
        self.below(n) == 0
    }

    pub fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.below(items.len())]
    }
}

/// Seeded generator of CRM form input. Same seed, same sequence.
#[derive(Debug, Clone)]
pub struct CrmFaker {
    rng: SeededRng,
}

impl CrmFaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SeededRng::new(seed),
        }
    }

    pub fn company_name(&mut self) -> String {
        let stem = self.rng.pick(&COMPANY_STEMS);
        let suffix = self.rng.pick(&COMPANY_SUFFIXES);
        if suffix.starts_with(',') {
            format!("{stem}{suffix}")
        } else {
            format!("{stem} {suffix}")
        }
    }

    pub fn person_name(&mut self) -> String {
        format!("{} {}", self.rng.pick(&FIRST_NAMES), self.rng.pick(&LAST_NAMES))
    }

    pub fn client(&mut self) -> NewClient {
        let name = self.company_name();
        let owner_id = if self.rng.coin() {
            Some(UserId::new(format!("user-{}", self.rng.below(4) + 1)))
        } else {
            None
        };
        NewClient {
            website: format!("https://{}.example", slug(&name)),
            name,
            owner_id,
        }
    }

    pub fn contact_person(&mut self, client_id: &ClientId) -> NewContactPerson {
        let name = self.person_name();
        NewContactPerson {
            email: format!("{}@example.com", slug(&name)),
            phone: format!(
                "555-{:03}-{:04}",
                self.rng.below(1000),
                self.rng.below(10_000)
            ),
            designation: self.rng.pick(&DESIGNATIONS).to_owned(),
            client_id: client_id.clone(),
            name,
        }
    }

    pub fn project(&mut self, client_id: &ClientId, members: &[ContactPersonId]) -> NewProject {
        let member_ids = members
            .iter()
            .filter(|_| self.rng.coin())
            .cloned()
            .collect();
        let team_member_ids = (1..=4)
            .filter(|_| self.rng.one_in(3))
            .map(|index| UserId::new(format!("user-{index}")))
            .collect();
        NewProject {
            name: format!("Project {}", self.rng.pick(&PROJECT_CODENAMES)),
            client_id: client_id.clone(),
            real_estate_segment: self.rng.pick(&SEGMENTS).to_owned(),
            sector: self.rng.pick(&SECTORS).to_owned(),
            member_ids,
            team_member_ids,
        }
    }

    pub fn deal(&mut self, project_id: &ProjectId) -> NewDeal {
        let stage = self.rng.pick(&DealStage::ALL);
        // Whole hundreds and the odd fractional amount.
        let hundreds = (self.rng.below(1_000) + 1) as f64 * 100.0;
        let value = if self.rng.one_in(5) {
            hundreds + 0.5
        } else {
            hundreds
        };
        let notes = if self.rng.coin() {
            Some(self.sentence(3, 9))
        } else {
            None
        };
        NewDeal {
            name: format!(
                "{}, phase {}",
                self.rng.pick(&PROJECT_CODENAMES),
                self.rng.below(3) + 1
            ),
            value,
            stage,
            project_id: project_id.clone(),
            expected_close_date: self.date_in_year(REFERENCE_YEAR),
            notes,
        }
    }

    pub fn task(&mut self, project_id: Option<&ProjectId>, deal_id: Option<&DealId>) -> NewTask {
        let priority = self
            .rng
            .pick(&[TaskPriority::High, TaskPriority::Medium, TaskPriority::Low]);
        let status = self
            .rng
            .pick(&[TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Completed]);
        let description = if self.rng.coin() {
            Some(self.sentence(4, 12))
        } else {
            None
        };
        NewTask {
            title: self.sentence(2, 5),
            description,
            due_date: self.date_in_year(REFERENCE_YEAR),
            priority,
            status,
            project_id: project_id.cloned(),
            deal_id: deal_id.cloned(),
        }
    }

    pub fn date_in_year(&mut self, year: i32) -> Date {
        let start = Date::from_calendar_date(year, Month::January, 1).unwrap_or(Date::MIN);
        let offset = self.rng.below(365) as i64;
        start.saturating_add(Duration::days(offset))
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let count = min_words + self.rng.below(max_words.saturating_sub(min_words) + 1);
        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            parts.push(self.rng.pick(&WORDS).to_owned());
        }
        let mut sentence = parts.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("crm.db");
    Ok((dir, db_path))
}

pub fn fixture_datetime() -> &'static str {
    "2024-07-15T10:00:00Z"
}

fn slug(name: &str) -> String {
    name.chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}
