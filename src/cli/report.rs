//! Terminal output for the command line. The bot renders its own messages,
//! see [crate::bot::render].

use ansi_term::Colour::{Cyan, Green, Yellow};
use ansi_term::Style;
use chrono::NaiveDate;

use crate::{
    stats::Summary,
    store::entities::{Entry, EntryKind, EventPayload},
};

const BAR_WIDTH: u32 = 20;
const MAX_CHART_DAYS: usize = 60;

pub fn print_day(date: NaiveDate, entries: &[Entry]) {
    println!(
        "{}",
        Style::new().bold().paint(format!("Entries for {date}"))
    );
    if entries.is_empty() {
        println!("  nothing logged yet");
        return;
    }
    for entry in entries {
        println!("  {}", format_entry(entry));
    }
    println!();
    print_day_totals(entries);
}

fn print_day_totals(entries: &[Entry]) {
    let ml: u32 = entries.iter().filter_map(|e| e.event.amount_ml()).sum();
    let feedings = entries
        .iter()
        .filter(|e| e.kind() == EntryKind::Feeding)
        .count();
    let diapers = entries
        .iter()
        .filter(|e| e.kind() == EntryKind::Diaper)
        .count();
    println!("  {feedings} feedings for {ml}ml, {diapers} diaper changes");
}

pub fn print_added(date: NaiveDate, entry: &Entry) {
    println!("Added on {date}: {}", format_entry(entry));
}

pub fn print_deleted(date: NaiveDate, entry: &Entry) {
    println!("Deleted from {date}: {}", format_entry(entry));
}

pub fn print_summary(summary: &Summary) {
    println!(
        "{}",
        Style::new()
            .bold()
            .paint(format!("Feedings {}", summary.window))
    );
    let max = summary.max_ml();
    if max > 0 && summary.days.len() <= MAX_CHART_DAYS {
        for day in &summary.days {
            println!(
                "  {}  {} {:>4}ml",
                day.date.format("%d-%m"),
                bar(day.feeding_ml, max),
                day.feeding_ml
            );
        }
        println!();
    }
    println!(
        "  total {}ml over {} days ({} feedings)",
        summary.total_ml(),
        summary.days.len(),
        summary.total_feedings()
    );
    println!("  average {:.0}ml per day", summary.mean_ml_per_day());
    if let Some(best) = summary.max_day() {
        println!("  most {}ml on {}", best.feeding_ml, best.date);
    }
    if let Some(mean) = summary.mean_temperature() {
        println!("  mean temperature {mean:.1}°C");
    }
    println!("  {} diaper changes", summary.total_diapers());
}

pub fn print_history(entries: &[(NaiveDate, Entry)]) {
    if entries.is_empty() {
        println!("No entries in this range.");
        return;
    }
    let mut current = None;
    for (date, entry) in entries {
        if current != Some(*date) {
            println!("{}", Style::new().bold().paint(date.to_string()));
            current = Some(*date);
        }
        println!("  {}", format_entry(entry));
    }
}

pub fn format_entry(entry: &Entry) -> String {
    let time = entry.time.format("%H:%M");
    match &entry.event {
        EventPayload::Feeding { amount_ml } => format!(
            "{time}  {}  [{}]",
            Green.paint(format!("feeding {amount_ml}ml")),
            entry.user
        ),
        EventPayload::Temperature {
            temperature_celsius,
        } => format!(
            "{time}  {}  [{}]",
            Yellow.paint(format!("temperature {temperature_celsius:.1}°C")),
            entry.user
        ),
        EventPayload::Diaper { diaper_type } => format!(
            "{time}  {}  [{}]",
            Cyan.paint(format!("diaper {diaper_type}")),
            entry.user
        ),
    }
}

// max > 0 checked by the caller.
fn bar(ml: u32, max: u32) -> String {
    let filled = (ml * BAR_WIDTH).div_ceil(max) as usize;
    format!(
        "{}{}",
        Green.paint("█".repeat(filled)),
        "░".repeat(BAR_WIDTH as usize - filled)
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use crate::store::entities::{DiaperKind, Entry};

    use super::{bar, format_entry};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn entry_lines_carry_kind_value_and_signer() {
        let line = format_entry(&Entry::feeding(at(9, 15), 65, "Z"));
        assert!(line.contains("09:15"));
        assert!(line.contains("feeding 65ml"));
        assert!(line.contains("[Z]"));

        let line = format_entry(&Entry::temperature(at(19, 4), 36.8, "M"));
        assert!(line.contains("temperature 36.8°C"));

        let line = format_entry(&Entry::diaper(at(10, 0), DiaperKind::Wet, "Z"));
        assert!(line.contains("diaper wet"));
    }

    #[test]
    fn bars_fill_proportionally() {
        let full = bar(150, 150);
        assert_eq!(full.matches('█').count(), 20);
        assert_eq!(full.matches('░').count(), 0);

        let partial = bar(60, 150);
        assert_eq!(partial.matches('█').count(), 8);
        assert_eq!(partial.matches('░').count(), 12);

        let empty = bar(0, 150);
        assert_eq!(empty.matches('█').count(), 0);
        assert_eq!(empty.matches('░').count(), 20);
    }
}
