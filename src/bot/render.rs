//! Pure message building. Everything here returns strings or keyboards so
//! the exact texts can be pinned down in tests without a Telegram server.

use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use teloxide::{
    types::{InlineKeyboardButton, InlineKeyboardMarkup},
    utils::command::BotCommands,
};

use crate::{
    stats::Summary,
    store::entities::{
        DiaperKind, Entry, EventPayload, MAX_FEEDING_ML, MAX_TEMPERATURE, MIN_TEMPERATURE,
    },
    utils::time::{format_relative, local_moment},
};

use super::commands::Command;

pub const REFUSAL: &str = "❌ Sorry, you are not authorized to use this bot.";
pub const ASK_ML: &str = "🍼 How many ml did the baby drink?";
pub const ASK_TIME: &str = "🕐 When was it? Send a time like 09:15, or 'now'.";
pub const ASK_TEMPERATURE: &str = "🌡️ What is the baby's body temperature in Celsius?";
pub const ASK_DIAPER: &str = "👶 Pick the diaper change type:";
pub const ASK_DELETE: &str = "🗑 Delete the last entry of which kind?";
pub const ASK_STATS: &str = "📊 Which period?";
pub const BAD_ML_NUMBER: &str = "❌ Enter only a number for the ml amount.";
pub const BAD_TEMPERATURE_NUMBER: &str = "❌ Enter a number like 36.5 or 36,5.";
pub const BAD_TIME: &str = "❌ I need a time like 09:15, or 'now'.";
pub const CANCELLED: &str = "👌 Okay, question forgotten.";
pub const NOTHING_TO_DELETE: &str = "❌ Nothing of that kind has been logged yet.";
pub const STORE_FAILURE: &str = "❌ Something went wrong on my side. Please try again.";

const BAR_WIDTH: usize = 10;

pub fn bad_ml_range() -> String {
    format!("❌ Enter a valid amount of ml (1-{MAX_FEEDING_ML}).")
}

pub fn bad_temperature_range() -> String {
    format!("❌ Enter a valid temperature ({MIN_TEMPERATURE:.1}-{MAX_TEMPERATURE:.1}°C).")
}

pub fn help_text() -> String {
    Command::descriptions().to_string()
}

pub fn start_greeting(name: &str) -> String {
    format!(
        "👶 Hi {name}! Baby Feeding Tracker at your service.\n\n{}",
        help_text()
    )
}

pub fn fallback_text() -> String {
    format!("🤔 I don't understand that.\n\n{}", help_text())
}

pub fn startup_message(timezone: Tz) -> String {
    format!(
        "👶 Baby Feeding Tracker is starting up! 🕐 All times are in {timezone}.\n\n\
         📋 Features:\n\
         🍼 Track bottle feedings (/feeding)\n\
         🌡️ Track temperatures (/temperature)\n\
         🧷 Track diaper changes (/diaper)\n\
         📊 Stats and charts (/stats)\n\
         📅 Today's overview (/today)"
    )
}

pub fn diaper_label(kind: DiaperKind) -> &'static str {
    match kind {
        DiaperKind::Soiled => "💩 Soiled",
        DiaperKind::Wet => "💧 Wet",
        DiaperKind::Both => "🧷 Both",
    }
}

/// One log line, the same shape in the today report and in delete receipts.
pub fn entry_line(entry: &Entry) -> String {
    let time = entry.time.format("%H:%M");
    match &entry.event {
        EventPayload::Feeding { amount_ml } => {
            format!("{time} - {amount_ml}ml [{}]", entry.user)
        }
        EventPayload::Temperature {
            temperature_celsius,
        } => format!("{time} - {temperature_celsius:.1}°C [{}]", entry.user),
        EventPayload::Diaper { diaper_type } => {
            format!("{time} - {} [{}]", diaper_label(*diaper_type), entry.user)
        }
    }
}

pub fn feeding_saved(amount_ml: u32, time: NaiveTime, initial: &str) -> String {
    format!(
        "✅ Feeding saved: {amount_ml}ml at {} [{initial}]",
        time.format("%H:%M")
    )
}

pub fn temperature_saved(celsius: f64, time: NaiveTime, initial: &str) -> String {
    format!(
        "✅ Temperature saved: {celsius:.1}°C at {} [{initial}]",
        time.format("%H:%M")
    )
}

pub fn diaper_saved(kind: DiaperKind, time: NaiveTime, initial: &str) -> String {
    format!(
        "✅ Diaper change saved: {} at {} [{initial}]",
        diaper_label(kind),
        time.format("%H:%M")
    )
}

pub fn deleted_line(date: NaiveDate, entry: &Entry) -> String {
    format!("🗑 Deleted from {date}: {}", entry_line(entry))
}

/// The /today overview: sections per kind in original recording order, a
/// running total and how long ago the last feeding was.
pub fn today_report(entries: &[Entry], now: DateTime<Tz>) -> String {
    let date = now.format("%Y-%m-%d");
    if entries.is_empty() {
        return format!("📅 No events recorded today yet ({date}).");
    }

    let feedings: Vec<&Entry> = entries
        .iter()
        .filter(|e| matches!(e.event, EventPayload::Feeding { .. }))
        .collect();
    let temperatures: Vec<&Entry> = entries
        .iter()
        .filter(|e| matches!(e.event, EventPayload::Temperature { .. }))
        .collect();
    let diapers: Vec<&Entry> = entries
        .iter()
        .filter(|e| matches!(e.event, EventPayload::Diaper { .. }))
        .collect();

    let mut message = format!("📅 Today's events ({date}):\n\n");

    if !feedings.is_empty() {
        let total: u32 = feedings.iter().filter_map(|e| e.event.amount_ml()).sum();
        message.push_str("🍼 Feedings:\n");
        for (i, entry) in feedings.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, entry_line(entry)));
        }
        message.push_str(&format!("  💧 Total: {total}ml\n"));
        if let Some(line) = last_feeding_line(&feedings, now) {
            message.push_str(&line);
        }
        message.push('\n');
    }

    if !temperatures.is_empty() {
        message.push_str("🌡️ Temperatures:\n");
        for (i, entry) in temperatures.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, entry_line(entry)));
        }
        message.push('\n');
    }

    if !diapers.is_empty() {
        message.push_str("🧷 Diaper changes:\n");
        for (i, entry) in diapers.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, entry_line(entry)));
        }
    }

    message.trim_end().to_owned()
}

fn last_feeding_line(feedings: &[&Entry], now: DateTime<Tz>) -> Option<String> {
    let last = feedings.last()?;
    // A time inside a DST gap has no moment, then the line is dropped.
    let moment = local_moment(now.date_naive(), last.time, now.timezone())?;
    Some(format!(
        "  ⏱ Last feeding: {}\n",
        format_relative(moment, now)
    ))
}

/// The /stats reply. Per-day bars only fit readable windows, longer spans
/// get the aggregate block alone. Sent with html parse mode for the `pre`.
pub fn stats_chart(summary: &Summary) -> String {
    let mut message = format!("📊 Feedings - {}\n\n", summary.window);
    let max = summary.max_ml();

    if max > 0 && summary.days.len() <= 31 {
        message.push_str("<pre>\n");
        for day in &summary.days {
            let filled = bar_width(day.feeding_ml, max);
            message.push_str(&format!(
                "{} {}{} {:>4}ml\n",
                day.date.format("%d-%m"),
                "█".repeat(filled),
                "░".repeat(BAR_WIDTH - filled),
                day.feeding_ml,
            ));
        }
        message.push_str("</pre>\n");
    }

    message.push_str(&format!(
        "🍼 Total: {}ml over {} days ({} feedings)\n",
        summary.total_ml(),
        summary.days.len(),
        summary.total_feedings(),
    ));
    message.push_str(&format!(
        "💧 Average: {:.0}ml/day\n",
        summary.mean_ml_per_day()
    ));
    if let Some(best) = summary.max_day().filter(|d| d.feeding_ml > 0) {
        message.push_str(&format!("🏆 Most: {}ml on {}\n", best.feeding_ml, best.date));
    }
    if let Some(mean) = summary.mean_temperature() {
        message.push_str(&format!("🌡️ Average temperature: {mean:.1}°C\n"));
    }
    message.push_str(&format!("🧷 Diaper changes: {}", summary.total_diapers()));
    message
}

fn bar_width(ml: u32, max: u32) -> usize {
    if max == 0 {
        return 0;
    }
    (u64::from(ml) * BAR_WIDTH as u64).div_ceil(u64::from(max)) as usize
}

pub fn diaper_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::callback("💩 Soiled", "diaper:soiled"),
            InlineKeyboardButton::callback("💧 Wet", "diaper:wet"),
        ],
        vec![InlineKeyboardButton::callback("🧷 Both", "diaper:both")],
    ])
}

pub fn delete_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::callback("🍼 Feeding", "delete:feeding"),
            InlineKeyboardButton::callback("🌡️ Temperature", "delete:temperature"),
        ],
        vec![InlineKeyboardButton::callback("🧷 Diaper", "delete:diaper")],
    ])
}

pub fn stats_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::callback("Today", "stats:today"),
            InlineKeyboardButton::callback("7 days", "stats:week"),
        ],
        vec![
            InlineKeyboardButton::callback("30 days", "stats:month"),
            InlineKeyboardButton::callback("All time", "stats:all"),
        ],
    ])
}
