//! Endpoint functions behind [super::schema]. Anything that talks to the
//! store signs the entry with the caretaker's initial from the access list.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use teloxide::{prelude::*, types::ParseMode};
use tracing::{error, info, warn};

use crate::{
    access::AccessGuard,
    stats::{summarize, Window},
    store::{
        entities::{
            DiaperKind, Entry, EntryKind, MAX_FEEDING_ML, MAX_TEMPERATURE, MIN_TEMPERATURE,
        },
        entry_log::{EntryStore, EntryStoreImpl, StoreError},
    },
    utils::{clock::Clock, time::parse_time_of_day},
};

use super::{
    dialogue_state::{BotDialogue, ChatState},
    render,
};

pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, render::help_text()).await?;
    Ok(())
}

pub async fn start(bot: Bot, msg: Message, guard: Arc<AccessGuard>) -> Result<()> {
    let name = msg
        .from()
        .and_then(|user| guard.name(user.id.0))
        .unwrap_or("there");
    bot.send_message(msg.chat.id, render::start_greeting(name))
        .await?;
    Ok(())
}

pub async fn cancel(bot: Bot, msg: Message, dialogue: BotDialogue) -> Result<()> {
    dialogue.exit().await?;
    bot.send_message(msg.chat.id, render::CANCELLED).await?;
    Ok(())
}

pub async fn today(
    bot: Bot,
    msg: Message,
    store: Arc<EntryStoreImpl>,
    clock: Arc<dyn Clock>,
) -> Result<()> {
    let now = clock.now();
    let text = match store.entries_on(now.date_naive()).await {
        Ok(entries) => render::today_report(&entries, now),
        Err(e) => store_failure(&e),
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn feeding(bot: Bot, msg: Message, dialogue: BotDialogue) -> Result<()> {
    bot.send_message(msg.chat.id, render::ASK_ML).await?;
    dialogue.update(ChatState::AwaitingFeedingMl).await?;
    Ok(())
}

pub async fn feeding_ml(bot: Bot, msg: Message, dialogue: BotDialogue) -> Result<()> {
    match msg.text().and_then(parse_ml) {
        Some(amount_ml) if feeding_in_range(amount_ml) => {
            bot.send_message(msg.chat.id, render::ASK_TIME).await?;
            dialogue
                .update(ChatState::AwaitingFeedingTime { amount_ml })
                .await?;
        }
        Some(_) => {
            bot.send_message(msg.chat.id, render::bad_ml_range()).await?;
        }
        None => {
            bot.send_message(msg.chat.id, render::BAD_ML_NUMBER).await?;
        }
    }
    Ok(())
}

pub async fn feeding_time(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    amount_ml: u32,
    store: Arc<EntryStoreImpl>,
    guard: Arc<AccessGuard>,
    clock: Arc<dyn Clock>,
) -> Result<()> {
    let now = clock.now();
    let Some(time) = msg.text().and_then(|raw| parse_entry_time(raw, &now)) else {
        bot.send_message(msg.chat.id, render::BAD_TIME).await?;
        return Ok(());
    };

    let initial = signer(&msg, &guard);
    let reply = match store
        .append(now.date_naive(), Entry::feeding(time, amount_ml, initial.clone()))
        .await
    {
        Ok(()) => {
            info!("feeding of {amount_ml}ml saved for chat {}", msg.chat.id);
            render::feeding_saved(amount_ml, time, &initial)
        }
        Err(e) => store_failure(&e),
    };

    // The dialogue ends even when the append failed.
    bot.send_message(msg.chat.id, reply).await?;
    dialogue.exit().await?;
    Ok(())
}

pub async fn temperature(bot: Bot, msg: Message, dialogue: BotDialogue) -> Result<()> {
    bot.send_message(msg.chat.id, render::ASK_TEMPERATURE).await?;
    dialogue.update(ChatState::AwaitingTemperature).await?;
    Ok(())
}

pub async fn temperature_value(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    store: Arc<EntryStoreImpl>,
    guard: Arc<AccessGuard>,
    clock: Arc<dyn Clock>,
) -> Result<()> {
    let Some(celsius) = msg.text().and_then(parse_temperature) else {
        bot.send_message(msg.chat.id, render::BAD_TEMPERATURE_NUMBER)
            .await?;
        return Ok(());
    };
    if !temperature_in_range(celsius) {
        bot.send_message(msg.chat.id, render::bad_temperature_range())
            .await?;
        return Ok(());
    }

    let now = clock.now();
    let initial = signer(&msg, &guard);
    let reply = match store
        .append(
            now.date_naive(),
            Entry::temperature(now.time(), celsius, initial.clone()),
        )
        .await
    {
        Ok(()) => {
            info!("temperature saved for chat {}", msg.chat.id);
            render::temperature_saved(celsius, now.time(), &initial)
        }
        Err(e) => store_failure(&e),
    };

    bot.send_message(msg.chat.id, reply).await?;
    dialogue.exit().await?;
    Ok(())
}

pub async fn diaper(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, render::ASK_DIAPER)
        .reply_markup(render::diaper_keyboard())
        .await?;
    Ok(())
}

pub async fn delete(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, render::ASK_DELETE)
        .reply_markup(render::delete_keyboard())
        .await?;
    Ok(())
}

pub async fn stats(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, render::ASK_STATS)
        .reply_markup(render::stats_keyboard())
        .await?;
    Ok(())
}

pub async fn callback(
    bot: Bot,
    q: CallbackQuery,
    store: Arc<EntryStoreImpl>,
    guard: Arc<AccessGuard>,
    clock: Arc<dyn Clock>,
) -> Result<()> {
    bot.answer_callback_query(q.id.clone()).await?;
    let (Some(data), Some(message)) = (q.data.as_deref(), q.message.as_ref()) else {
        return Ok(());
    };
    let chat = message.chat.id;

    match parse_callback(data) {
        Some(CallbackAction::Diaper(kind)) => {
            let now = clock.now();
            let initial = guard
                .initial(q.from.id.0)
                .unwrap_or_else(|| "?".to_owned());
            let text = match store
                .append(
                    now.date_naive(),
                    Entry::diaper(now.time(), kind, initial.clone()),
                )
                .await
            {
                Ok(()) => {
                    info!("diaper change saved for chat {chat}");
                    render::diaper_saved(kind, now.time(), &initial)
                }
                Err(e) => store_failure(&e),
            };
            bot.edit_message_text(chat, message.id, text).await?;
        }
        Some(CallbackAction::Delete(kind)) => {
            let text = delete_reply(store.delete_last(kind).await);
            bot.edit_message_text(chat, message.id, text).await?;
        }
        Some(CallbackAction::Stats(window)) => {
            match summarize(&store, clock.as_ref(), window).await {
                Ok(summary) => {
                    bot.edit_message_text(chat, message.id, render::stats_chart(&summary))
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                Err(e) => {
                    bot.edit_message_text(chat, message.id, store_failure(&e))
                        .await?;
                }
            }
        }
        None => {
            warn!("unknown callback data {data:?}");
        }
    }
    Ok(())
}

pub async fn refuse_message(bot: Bot, msg: Message) -> Result<()> {
    warn!("refused chat {}", msg.chat.id);
    bot.send_message(msg.chat.id, render::REFUSAL).await?;
    Ok(())
}

pub async fn refuse_callback(bot: Bot, q: CallbackQuery) -> Result<()> {
    warn!("refused callback from {}", q.from.id);
    bot.answer_callback_query(q.id).await?;
    Ok(())
}

pub async fn fallback(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, render::fallback_text()).await?;
    Ok(())
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CallbackAction {
    Diaper(DiaperKind),
    Delete(EntryKind),
    Stats(Window),
}

/// Decodes the `group:value` strings the inline keyboards send back.
pub fn parse_callback(data: &str) -> Option<CallbackAction> {
    let (group, value) = data.split_once(':')?;
    match group {
        "diaper" => {
            let kind = match value {
                "soiled" => DiaperKind::Soiled,
                "wet" => DiaperKind::Wet,
                "both" => DiaperKind::Both,
                _ => return None,
            };
            Some(CallbackAction::Diaper(kind))
        }
        "delete" => {
            let kind = match value {
                "feeding" => EntryKind::Feeding,
                "temperature" => EntryKind::Temperature,
                "diaper" => EntryKind::Diaper,
                _ => return None,
            };
            Some(CallbackAction::Delete(kind))
        }
        "stats" => {
            let window = match value {
                "today" => Window::Today,
                "week" => Window::Week,
                "month" => Window::Month,
                "all" => Window::All,
                _ => return None,
            };
            Some(CallbackAction::Stats(window))
        }
        _ => None,
    }
}

/// The chat only hears that something failed, the log gets the details.
fn store_failure(e: &StoreError) -> String {
    error!("store operation failed: {e}");
    render::STORE_FAILURE.to_owned()
}

fn delete_reply(result: Result<(NaiveDate, Entry), StoreError>) -> String {
    match result {
        Ok((date, entry)) => {
            info!("deleted the last {} entry from {date}", entry.kind());
            render::deleted_line(date, &entry)
        }
        Err(StoreError::NotFound(_)) => render::NOTHING_TO_DELETE.to_owned(),
        Err(e) => store_failure(&e),
    }
}

fn signer(msg: &Message, guard: &AccessGuard) -> String {
    msg.from()
        .and_then(|user| guard.initial(user.id.0))
        .unwrap_or_else(|| "?".to_owned())
}

fn parse_ml(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

fn feeding_in_range(ml: u32) -> bool {
    (1..=MAX_FEEDING_ML).contains(&ml)
}

/// Both `36.8` and the dutch style `36,8` are fine.
fn parse_temperature(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse().ok()
}

fn temperature_in_range(celsius: f64) -> bool {
    (MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&celsius)
}

/// The wizard takes a backfilled `HH:MM` or the literal `now`.
fn parse_entry_time(raw: &str, now: &DateTime<Tz>) -> Option<NaiveTime> {
    if raw.trim().eq_ignore_ascii_case("now") {
        return Some(now.time());
    }
    parse_time_of_day(raw).ok()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use chrono_tz::Europe::Amsterdam;
    use teloxide::types::{InlineKeyboardButtonKind, InlineKeyboardMarkup};

    use crate::{
        bot::render,
        stats::Window,
        store::{
            entities::{DiaperKind, Entry, EntryKind},
            entry_log::StoreError,
        },
    };

    use super::{
        delete_reply, feeding_in_range, parse_callback, parse_entry_time, parse_ml,
        parse_temperature, store_failure, temperature_in_range, CallbackAction,
    };

    #[test]
    fn ml_input_is_a_plain_integer() {
        assert_eq!(parse_ml(" 120 "), Some(120));
        assert_eq!(parse_ml("65"), Some(65));
        for bad in ["12.5", "abc", "-5", "", "65ml"] {
            assert_eq!(parse_ml(bad), None, "{bad:?} should not parse");
        }
        assert!(feeding_in_range(1) && feeding_in_range(500));
        assert!(!feeding_in_range(0) && !feeding_in_range(501));
    }

    #[test]
    fn temperature_input_accepts_comma_decimals() {
        assert_eq!(parse_temperature("36,8"), Some(36.8));
        assert_eq!(parse_temperature(" 36.5 "), Some(36.5));
        assert_eq!(parse_temperature("abc"), None);
        assert!(temperature_in_range(30.0) && temperature_in_range(45.0));
        assert!(!temperature_in_range(29.9) && !temperature_in_range(45.1));
    }

    #[test]
    fn entry_time_is_strict_or_the_now_keyword() {
        let now = Amsterdam.with_ymd_and_hms(2025, 9, 3, 14, 30, 25).unwrap();
        assert_eq!(parse_entry_time("NOW", &now), Some(now.time()));
        assert_eq!(parse_entry_time(" now ", &now), Some(now.time()));
        assert_eq!(
            parse_entry_time("09:15", &now),
            Some(NaiveTime::from_hms_opt(9, 15, 0).unwrap())
        );
        assert_eq!(parse_entry_time("9:15", &now), None);
        assert_eq!(parse_entry_time("later", &now), None);
    }

    fn button_datas(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn every_keyboard_button_decodes_to_an_action() {
        let keyboards = [
            (render::diaper_keyboard(), 3),
            (render::delete_keyboard(), 3),
            (render::stats_keyboard(), 4),
        ];
        for (markup, expected) in keyboards {
            let datas = button_datas(&markup);
            assert_eq!(datas.len(), expected);
            for data in datas {
                assert!(parse_callback(&data).is_some(), "{data:?} does not decode");
            }
        }
    }

    #[test]
    fn store_failures_surface_as_a_generic_reply() {
        let broken = StoreError::Io(std::io::Error::other("disk gone"));
        assert_eq!(store_failure(&broken), render::STORE_FAILURE);

        let receipt = delete_reply(Ok((
            NaiveDate::from_ymd_opt(2025, 9, 3).unwrap(),
            Entry::feeding(NaiveTime::from_hms_opt(9, 15, 0).unwrap(), 65, "Z"),
        )));
        assert!(receipt.contains("Deleted from 2025-09-03"));
        assert!(receipt.contains("65ml"));

        assert_eq!(
            delete_reply(Err(StoreError::NotFound(EntryKind::Diaper))),
            render::NOTHING_TO_DELETE
        );
        assert_eq!(
            delete_reply(Err(StoreError::Io(std::io::Error::other("no disk")))),
            render::STORE_FAILURE
        );
    }

    #[test]
    fn callback_actions_decode_by_group() {
        assert_eq!(
            parse_callback("diaper:soiled"),
            Some(CallbackAction::Diaper(DiaperKind::Soiled))
        );
        assert_eq!(
            parse_callback("delete:temperature"),
            Some(CallbackAction::Delete(EntryKind::Temperature))
        );
        assert_eq!(
            parse_callback("stats:week"),
            Some(CallbackAction::Stats(Window::Week))
        );
        for junk in ["diaper:purple", "stats:year", "nonsense", "diaper_pooped", ""] {
            assert_eq!(parse_callback(junk), None, "{junk:?} should not decode");
        }
    }
}
