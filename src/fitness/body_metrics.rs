use std::fmt;
use serde::{Deserialize, Serialize};
use crate::errors::{ValidationError, ValidationResult};

const MAX_WEIGHT_KG: f64 = 1000.0;
const MAX_HEIGHT_CM: f64 = 300.0;
const MAX_AGE: u32 = 150;

const UNDERWEIGHT_BELOW: f64 = 18.5;
const OVERWEIGHT_FROM: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" => Err(ValidationError::Missing("gender")),
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(ValidationError::UnknownGender(raw.trim().to_string())),
        }
    }

    // Constant term of the body-fat estimate
    fn body_fat_offset(&self) -> f64 {
        match self {
            Gender::Male => 16.2,
            Gender::Female => 5.4,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
}

impl BmiCategory {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < UNDERWEIGHT_BELOW {
            BmiCategory::Underweight
        } else if bmi < OVERWEIGHT_FROM {
            BmiCategory::Normal
        } else {
            BmiCategory::Overweight
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BmiCategory::Underweight => write!(f, "underweight"),
            BmiCategory::Normal => write!(f, "normal"),
            BmiCategory::Overweight => write!(f, "overweight"),
        }
    }
}

/// Validated calculator input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
    pub gender: Gender,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyMetrics {
    pub bmi: f64,
    pub body_fat_percent: f64,
    pub category: BmiCategory,
}

fn parse_positive(raw: &str, field: &'static str, max: f64) -> ValidationResult<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    let value: f64 = raw
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| ValidationError::NotNumeric { field, value: raw.to_string() })?;

    if value <= 0.0 || value > max {
        return Err(ValidationError::OutOfRange { field, value: raw.to_string() });
    }
    Ok(value)
}

fn parse_age(raw: &str) -> ValidationResult<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Missing("age"));
    }
    let age: u32 = raw
        .parse()
        .map_err(|_| ValidationError::NotNumeric { field: "age", value: raw.to_string() })?;

    if age > MAX_AGE {
        return Err(ValidationError::OutOfRange { field: "age", value: raw.to_string() });
    }
    Ok(age)
}

impl Measurement {
    pub fn parse(weight: &str, height: &str, age: &str, gender: &str) -> ValidationResult<Self> {
        Ok(Self {
            weight_kg: parse_positive(weight, "weight", MAX_WEIGHT_KG)?,
            height_cm: parse_positive(height, "height", MAX_HEIGHT_CM)?,
            age: parse_age(age)?,
            gender: Gender::parse(gender)?,
        })
    }

    pub fn compute(&self) -> BodyMetrics {
        let height_m = self.height_cm / 100.0;
        let bmi = self.weight_kg / (height_m * height_m);
        let body_fat = 1.20 * bmi + 0.23 * self.age as f64 - self.gender.body_fat_offset();

        BodyMetrics {
            bmi: round2(bmi),
            body_fat_percent: round2(body_fat),
            category: BmiCategory::from_bmi(bmi),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
