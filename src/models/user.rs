use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::fitness::{BmiCategory, BodyMetrics, Gender, Measurement};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String,  // bcrypt hash, never the plain password
    pub history: Vec<Reading>,  // oldest first
    pub is_admin: bool,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: String, is_admin: bool) -> Self {
        Self {
            username: username.into(),
            password_hash,
            history: Vec::new(),
            is_admin,
        }
    }
}

/// One submitted measurement together with what was computed from it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
    pub gender: Gender,
    pub bmi: f64,
    pub body_fat_percent: f64,
    pub bmi_category: BmiCategory,
}

impl Reading {
    pub fn new(measurement: &Measurement, metrics: &BodyMetrics, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            weight_kg: measurement.weight_kg,
            height_cm: measurement.height_cm,
            age: measurement.age,
            gender: measurement.gender,
            bmi: metrics.bmi,
            body_fat_percent: metrics.body_fat_percent,
            bmi_category: metrics.category,
        }
    }
}

/// Row of the admin user list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub username: String,
    pub is_admin: bool,
    pub reading_count: usize,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            is_admin: user.is_admin,
            reading_count: user.history.len(),
        }
    }
}
