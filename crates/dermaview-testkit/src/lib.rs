// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use dermaview_app::Image;
use dermaview_app::timestamp::format_rfc3339;
use std::path::PathBuf;
use time::{Duration, OffsetDateTime};

const DISEASES: [&str; 12] = [
    "Atopic Dermatitis",
    "Psoriasis",
    "Acne Vulgaris",
    "Rosacea",
    "Seborrheic Keratosis",
    "Basal Cell Carcinoma",
    "Melanocytic Nevus",
    "Urticaria",
    "Tinea Corporis",
    "Vitiligo",
    "Contact Dermatitis",
    "Actinic Keratosis",
];

const DEPARTMENTS: [&str; 4] = [
    "Dermatology",
    "Plastic Surgery",
    "Pediatric Dermatology",
    "Dermatologic Oncology",
];

const FAMILY_NAMES: [&str; 12] = [
    "Kim", "Lee", "Park", "Choi", "Jung", "Kang", "Cho", "Yoon", "Jang", "Lim", "Han", "Oh",
];
const GIVEN_NAMES: [&str; 14] = [
    "Minjun", "Seoyeon", "Jiho", "Hayoon", "Dohyun", "Jiwoo", "Yuna", "Eunwoo", "Sua", "Hajun",
    "Jian", "Siwoo", "Chaewon", "Taeyang",
];

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "png", "jpeg"];

/// 2025-01-01T00:00:00Z
const REFERENCE_UNIX: i64 = 1_735_689_600;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

#[derive(Debug, Clone)]
pub struct Patient {
    pub id: String,
    pub name: String,
}

/// Deterministic generator of patients and image rows for tests and demo data.
#[derive(Debug, Clone)]
pub struct ClinicFaker {
    rng: DeterministicRng,
    sequence: u64,
}

impl ClinicFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            sequence: 0,
        }
    }

    pub fn patient(&mut self) -> Patient {
        let id = format!("{:08}", self.rng.next_u64() % 100_000_000);
        let name = format!("{} {}", self.pick(&FAMILY_NAMES), self.pick(&GIVEN_NAMES));
        Patient { id, name }
    }

    pub fn image_for(&mut self, patient: &Patient) -> Image {
        self.sequence += 1;
        let uploaded_at = self.uploaded_at();
        let extension = self.pick(&IMAGE_EXTENSIONS);
        Image {
            digest: format!(
                "upload/{}/{}_{:04}.{extension}",
                uploaded_at.date(),
                patient.id,
                self.sequence
            ),
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            uploaded_at: format_rfc3339(uploaded_at).unwrap_or_default(),
            disease: self.pick(&DISEASES).to_owned(),
            department: self.pick(&DEPARTMENTS).to_owned(),
        }
    }

    pub fn image(&mut self) -> Image {
        let patient = self.patient();
        self.image_for(&patient)
    }

    /// `patients` patients with 1..=`max_per_patient` images each.
    pub fn clinic_images(&mut self, patients: usize, max_per_patient: usize) -> Vec<Image> {
        let mut images = Vec::new();
        for _ in 0..patients {
            let patient = self.patient();
            let count = 1 + self.rng.int_n(max_per_patient.max(1));
            for _ in 0..count {
                images.push(self.image_for(&patient));
            }
        }
        images
    }

    fn uploaded_at(&mut self) -> OffsetDateTime {
        let offset = (self.rng.next_u64() % (365 * 24 * 60 * 60)) as i64;
        reference_time() + Duration::seconds(offset)
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn reference_time() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(REFERENCE_UNIX).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

pub fn temp_root_dir() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let root = dir.path().join("dermaview-root");
    Ok((dir, root))
}

pub fn diseases() -> &'static [&'static str] {
    &DISEASES
}

pub fn departments() -> &'static [&'static str] {
    &DEPARTMENTS
}
