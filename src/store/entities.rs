use chrono::NaiveTime;

use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use std::fmt::Display;
use std::sync::Arc;

/// Upper bound for a single bottle, in milliliters.
pub const MAX_FEEDING_ML: u32 = 500;
/// Body temperatures outside this band are taken for typos.
pub const MIN_TEMPERATURE: f64 = 30.0;
pub const MAX_TEMPERATURE: f64 = 45.0;

/// One recorded event. The calendar date is not part of the entry: it is the
/// key of the log map, so an entry can never disagree with the day it is
/// filed under.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct Entry {
    #[serde(with = "wall_time")]
    pub time: NaiveTime,
    #[serde(flatten)]
    pub event: EventPayload,
    pub user: Arc<str>,
}

impl Entry {
    pub fn feeding(time: NaiveTime, amount_ml: u32, user: impl Into<Arc<str>>) -> Self {
        Self {
            time,
            event: EventPayload::Feeding { amount_ml },
            user: user.into(),
        }
    }

    pub fn temperature(time: NaiveTime, celsius: f64, user: impl Into<Arc<str>>) -> Self {
        Self {
            time,
            event: EventPayload::Temperature {
                temperature_celsius: celsius,
            },
            user: user.into(),
        }
    }

    pub fn diaper(time: NaiveTime, diaper_type: DiaperKind, user: impl Into<Arc<str>>) -> Self {
        Self {
            time,
            event: EventPayload::Diaper { diaper_type },
            user: user.into(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.event.kind()
    }

    /// Checks the ranges the input prompts enforce. Data written by hand can
    /// violate them, so appends re-check instead of trusting the constructor.
    pub fn validate(&self) -> Result<(), InvalidEntry> {
        if self.user.is_empty() {
            return Err(InvalidEntry::EmptyUser);
        }
        match self.event {
            EventPayload::Feeding { amount_ml } if !(1..=MAX_FEEDING_ML).contains(&amount_ml) => {
                Err(InvalidEntry::Amount(amount_ml))
            }
            EventPayload::Temperature {
                temperature_celsius,
            } if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature_celsius) => {
                Err(InvalidEntry::Temperature(temperature_celsius))
            }
            _ => Ok(()),
        }
    }
}

/// The payload of an entry, tagged the way the data file spells it. Only the
/// field belonging to the variant exists, which keeps half-filled records
/// unrepresentable.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum EventPayload {
    #[serde(rename = "drink")]
    Feeding { amount_ml: u32 },
    #[serde(rename = "temperature")]
    Temperature { temperature_celsius: f64 },
    #[serde(rename = "diaper")]
    Diaper { diaper_type: DiaperKind },
}

impl EventPayload {
    pub fn kind(&self) -> EntryKind {
        match self {
            EventPayload::Feeding { .. } => EntryKind::Feeding,
            EventPayload::Temperature { .. } => EntryKind::Temperature,
            EventPayload::Diaper { .. } => EntryKind::Diaper,
        }
    }

    pub fn amount_ml(&self) -> Option<u32> {
        match self {
            EventPayload::Feeding { amount_ml } => Some(*amount_ml),
            _ => None,
        }
    }

    pub fn temperature_celsius(&self) -> Option<f64> {
        match self {
            EventPayload::Temperature {
                temperature_celsius,
            } => Some(*temperature_celsius),
            _ => None,
        }
    }

    pub fn diaper_type(&self) -> Option<DiaperKind> {
        match self {
            EventPayload::Diaper { diaper_type } => Some(*diaper_type),
            _ => None,
        }
    }
}

/// What went on a diaper. Wire names come from the original data files.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, ValueEnum)]
pub enum DiaperKind {
    #[serde(rename = "pooped")]
    Soiled,
    #[serde(rename = "peed")]
    Wet,
    #[serde(rename = "both")]
    Both,
}

impl Display for DiaperKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiaperKind::Soiled => write!(f, "soiled"),
            DiaperKind::Wet => write!(f, "wet"),
            DiaperKind::Both => write!(f, "both"),
        }
    }
}

/// Discriminant of [EventPayload], used for filtering and delete-last.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, ValueEnum)]
pub enum EntryKind {
    Feeding,
    Temperature,
    Diaper,
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Feeding => write!(f, "feeding"),
            EntryKind::Temperature => write!(f, "temperature"),
            EntryKind::Diaper => write!(f, "diaper"),
        }
    }
}

/// Rejected entry input. Surfaced to the user as a re-prompt, never stored.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidEntry {
    #[error("feeding amount must be 1..={} ml, got {0}", MAX_FEEDING_ML)]
    Amount(u32),
    #[error("temperature must be {:.1}..={:.1} °C, got {0}", MIN_TEMPERATURE, MAX_TEMPERATURE)]
    Temperature(f64),
    #[error("author initial is empty")]
    EmptyUser,
}

mod wall_time {
    use chrono::{NaiveTime, Timelike};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    /// The python bot wrote seconds, the rewrite writes HH:MM. Both load,
    /// and a seconds tail is dropped.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let time = NaiveTime::parse_from_str(&s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)?;
        NaiveTime::from_hms_opt(time.hour(), time.minute(), 0)
            .ok_or_else(|| serde::de::Error::custom("hour or minute out of range"))
    }
}
