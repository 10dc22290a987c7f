//! Donor eligibility rules.
//!
//! Pure functions shared by donation recording, donor registration and the
//! public eligibility endpoint.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const MIN_DONOR_WEIGHT_KG: f64 = 50.0;
pub const STANDARD_DONOR_WEIGHT_KG: f64 = 60.0;

pub const MIN_DONOR_AGE: i32 = 18;
pub const MAX_DONOR_AGE: i32 = 65;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLimits {
    pub recommended_ml: u32,
    pub max_ml: u32,
}

/// Volume limits for a donor weight, or `None` below the minimum weight.
pub fn volume_limits(weight_kg: f64) -> Option<VolumeLimits> {
    if weight_kg < MIN_DONOR_WEIGHT_KG {
        None
    } else if weight_kg < STANDARD_DONOR_WEIGHT_KG {
        Some(VolumeLimits { recommended_ml: 350, max_ml: 400 })
    } else {
        Some(VolumeLimits { recommended_ml: 450, max_ml: 500 })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum VolumeVerdict {
    Ineligible,
    Safe { recommended_ml: u32, max_ml: u32 },
    Unsafe { recommended_ml: u32, max_ml: u32 },
}

impl VolumeVerdict {
    pub fn is_acceptable(&self) -> bool {
        matches!(self, VolumeVerdict::Safe { .. })
    }

    pub fn message(&self) -> String {
        match self {
            VolumeVerdict::Ineligible => "Donor is below minimum weight requirement".to_string(),
            VolumeVerdict::Safe { recommended_ml, .. } => {
                format!("Volume is within the safe limit (recommended {} ml)", recommended_ml)
            }
            VolumeVerdict::Unsafe { max_ml, .. } => {
                format!("Volume exceeds the safe limit of {} ml for this weight", max_ml)
            }
        }
    }
}

/// Weight/volume verdict. Unknown (`None`) when the inputs are insufficient;
/// an underweight donor is ineligible whatever the volume.
pub fn assess_volume(weight_kg: Option<f64>, volume_ml: Option<f64>) -> Option<VolumeVerdict> {
    let weight_kg = weight_kg?;
    let Some(limits) = volume_limits(weight_kg) else {
        return Some(VolumeVerdict::Ineligible);
    };
    let volume_ml = volume_ml?;

    let VolumeLimits { recommended_ml, max_ml } = limits;
    if volume_ml > f64::from(max_ml) {
        Some(VolumeVerdict::Unsafe { recommended_ml, max_ml })
    } else {
        Some(VolumeVerdict::Safe { recommended_ml, max_ml })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum AgeVerdict {
    TooYoung { age: i32 },
    Eligible { age: i32 },
    Senior { age: i32 },
}

impl AgeVerdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, AgeVerdict::TooYoung { .. })
    }

    /// Advisory note for donors allowed through with a caveat.
    pub fn warning(&self) -> Option<String> {
        match self {
            AgeVerdict::Senior { age } => Some(format!(
                "Donor is {} years old; donors over {} require medical clearance",
                age, MAX_DONOR_AGE
            )),
            _ => None,
        }
    }
}

/// Completed years between `date_of_birth` and `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

pub fn assess_age(date_of_birth: NaiveDate, today: NaiveDate) -> AgeVerdict {
    let age = age_on(date_of_birth, today);
    if age < MIN_DONOR_AGE {
        AgeVerdict::TooYoung { age }
    } else if age <= MAX_DONOR_AGE {
        AgeVerdict::Eligible { age }
    } else {
        AgeVerdict::Senior { age }
    }
}
