//! Telegram front end. All state lives in the store and the in-memory
//! dialogue map, so the bot can be restarted freely.
//!
//! Handler wiring happens in [schema]: messages go through an authorization
//! gate, then commands, then whatever step of a conversation the chat is in.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use teloxide::{
    dispatching::{
        dialogue::{self, InMemStorage},
        UpdateHandler,
    },
    prelude::*,
};
use tracing::{info, warn};

use crate::{
    access::AccessGuard,
    config::Config,
    store::entry_log::EntryStoreImpl,
    utils::clock::{Clock, DefaultClock},
};

pub mod commands;
pub mod dialogue_state;
pub mod handlers;
pub mod render;

use commands::Command;
use dialogue_state::ChatState;

/// Connects to Telegram and serves updates until interrupted. Refuses to
/// start without a token and at least one configured user.
pub async fn start_bot(config: Config) -> Result<()> {
    let token = config
        .bot_token
        .clone()
        .context("no bot token in the config file or TELOXIDE_TOKEN")?;
    let guard = Arc::new(AccessGuard::new(
        config.users.iter().map(|u| (u.id, u.name.clone())),
    ));
    if guard.is_empty() {
        bail!("no users configured, every chat would be refused");
    }

    let store = Arc::new(EntryStoreImpl::open(config.data_file.clone()).await?);
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock::new(config.timezone));

    let bot = Bot::new(token);
    broadcast_startup(&bot, &guard, &config).await;

    info!("serving updates for {} configured users", config.users.len());
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![
            InMemStorage::<ChatState>::new(),
            store,
            guard,
            clock
        ])
        .default_handler(|update| async move {
            warn!("unhandled update: {:?}", update);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "an error from the update handler",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

pub fn schema() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(handlers::help))
        .branch(case![Command::Start].endpoint(handlers::start))
        .branch(case![Command::Cancel].endpoint(handlers::cancel))
        .branch(case![Command::Today].endpoint(handlers::today))
        .branch(case![Command::Feeding].endpoint(handlers::feeding))
        .branch(case![Command::Temperature].endpoint(handlers::temperature))
        .branch(case![Command::Diaper].endpoint(handlers::diaper))
        .branch(case![Command::Delete].endpoint(handlers::delete))
        .branch(case![Command::Stats].endpoint(handlers::stats));

    let message_handler = Update::filter_message()
        .branch(
            dptree::filter(|msg: Message, guard: Arc<AccessGuard>| {
                msg.from()
                    .map(|user| !guard.is_authorized(user.id.0))
                    .unwrap_or(true)
            })
            .endpoint(handlers::refuse_message),
        )
        .branch(command_handler)
        .branch(case![ChatState::AwaitingFeedingMl].endpoint(handlers::feeding_ml))
        .branch(case![ChatState::AwaitingFeedingTime { amount_ml }].endpoint(handlers::feeding_time))
        .branch(case![ChatState::AwaitingTemperature].endpoint(handlers::temperature_value))
        .branch(dptree::endpoint(handlers::fallback));

    let callback_handler = Update::filter_callback_query()
        .branch(
            dptree::filter(|q: CallbackQuery, guard: Arc<AccessGuard>| {
                !guard.is_authorized(q.from.id.0)
            })
            .endpoint(handlers::refuse_callback),
        )
        .endpoint(handlers::callback);

    dialogue::enter::<Update, InMemStorage<ChatState>, ChatState, _>()
        .branch(message_handler)
        .branch(callback_handler)
}

/// Tells everyone on the list that the bot is back. Delivery failures are
/// logged and skipped so one blocked chat cannot stop the start.
async fn broadcast_startup(bot: &Bot, guard: &AccessGuard, config: &Config) {
    for id in guard.ids() {
        let greeting = render::startup_message(config.timezone);
        if let Err(e) = bot.send_message(ChatId(id as i64), greeting).await {
            warn!("could not greet {id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{tests::mk_config, BotUser};

    use super::start_bot;

    #[tokio::test]
    async fn refuses_to_start_without_a_token() {
        let config = mk_config(
            "/tmp/baby_data.json".into(),
            vec![BotUser {
                name: "Zoe".to_owned(),
                id: 100,
            }],
        );

        let err = start_bot(config).await.unwrap_err();
        assert!(err.to_string().contains("bot token"));
    }

    #[tokio::test]
    async fn refuses_to_start_without_users() {
        let mut config = mk_config("/tmp/baby_data.json".into(), vec![]);
        config.bot_token = Some("123:abc".to_owned());

        let err = start_bot(config).await.unwrap_err();
        assert!(err.to_string().contains("no users"));
    }
}
