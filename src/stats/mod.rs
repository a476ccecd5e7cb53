//! Turns the raw log into per-day summaries over a report window.
//! Windows are anchored at the clock's idea of today, and every day in the
//! window gets a slot even when nothing was logged on it, so charts and
//! averages line up with the calendar.

use std::fmt;

use chrono::{Duration, NaiveDate};
use clap::ValueEnum;

use crate::{
    store::{
        entities::{DiaperKind, Entry, EventPayload},
        entry_log::{EntryStore, StoreError},
    },
    utils::clock::Clock,
};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Today,
    Week,
    Month,
    All,
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Today => write!(f, "today"),
            Window::Week => write!(f, "last 7 days"),
            Window::Month => write!(f, "last 30 days"),
            Window::All => write!(f, "all time"),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct DiaperTally {
    pub soiled: u32,
    pub wet: u32,
    pub both: u32,
}

impl DiaperTally {
    pub fn note(&mut self, kind: DiaperKind) {
        match kind {
            DiaperKind::Soiled => self.soiled += 1,
            DiaperKind::Wet => self.wet += 1,
            DiaperKind::Both => self.both += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.soiled + self.wet + self.both
    }
}

/// Everything recorded on one calendar day, folded down.
#[derive(Debug, PartialEq, Clone)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub feeding_ml: u32,
    pub feedings: u32,
    pub temperatures: Vec<f64>,
    pub diapers: DiaperTally,
}

impl DaySummary {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            feeding_ml: 0,
            feedings: 0,
            temperatures: vec![],
            diapers: DiaperTally::default(),
        }
    }

    fn note(&mut self, entry: &Entry) {
        match entry.event {
            EventPayload::Feeding { amount_ml } => {
                self.feeding_ml += amount_ml;
                self.feedings += 1;
            }
            EventPayload::Temperature {
                temperature_celsius,
            } => self.temperatures.push(temperature_celsius),
            EventPayload::Diaper { diaper_type } => self.diapers.note(diaper_type),
        }
    }

    /// Mean of the day's readings, when any were taken.
    pub fn mean_temperature(&self) -> Option<f64> {
        let count = self.temperatures.len();
        (count > 0).then(|| self.temperatures.iter().sum::<f64>() / count as f64)
    }
}

/// A continuous run of day summaries, oldest first.
#[derive(Debug, PartialEq, Clone)]
pub struct Summary {
    pub window: Window,
    pub days: Vec<DaySummary>,
}

impl Summary {
    pub fn total_ml(&self) -> u32 {
        self.days.iter().map(|d| d.feeding_ml).sum()
    }

    pub fn total_feedings(&self) -> u32 {
        self.days.iter().map(|d| d.feedings).sum()
    }

    pub fn total_diapers(&self) -> u32 {
        self.days.iter().map(|d| d.diapers.total()).sum()
    }

    /// Average intake over the whole window, counting days without feedings.
    pub fn mean_ml_per_day(&self) -> f64 {
        if self.days.is_empty() {
            return 0.0;
        }
        f64::from(self.total_ml()) / self.days.len() as f64
    }

    /// Day with the highest intake. Ties resolve to the most recent day.
    pub fn max_day(&self) -> Option<&DaySummary> {
        self.days.iter().max_by_key(|d| d.feeding_ml)
    }

    pub fn max_ml(&self) -> u32 {
        self.max_day().map(|d| d.feeding_ml).unwrap_or(0)
    }

    pub fn mean_temperature(&self) -> Option<f64> {
        let (sum, count) = self
            .days
            .iter()
            .flat_map(|d| &d.temperatures)
            .fold((0.0, 0u32), |(sum, count), t| (sum + t, count + 1));
        (count > 0).then(|| sum / f64::from(count))
    }
}

/// Folds the stored entries of `window` into one slot per calendar day.
/// The all time window starts at the first day anything was logged on, or
/// collapses to a single empty slot for today when the log is empty.
pub async fn summarize(
    store: &(impl EntryStore + Sync),
    clock: &dyn Clock,
    window: Window,
) -> Result<Summary, StoreError> {
    let today = clock.now().date_naive();
    let from = match window {
        Window::Today => today,
        Window::Week => today - Duration::days(6),
        Window::Month => today - Duration::days(29),
        Window::All => NaiveDate::MIN,
    };

    let entries = store.entries_between(from, today).await?;

    let start = match window {
        Window::All => entries.first().map(|(date, _)| *date).unwrap_or(today),
        _ => from,
    };

    let mut days = vec![];
    let mut date = start;
    while date <= today {
        days.push(DaySummary::empty(date));
        let Some(next) = date.succ_opt() else { break };
        date = next;
    }

    for (date, entry) in entries {
        let index = (date - start).num_days();
        let Some(slot) = usize::try_from(index).ok().and_then(|i| days.get_mut(i)) else {
            continue;
        };
        slot.note(&entry);
    }

    Ok(Summary { window, days })
}
