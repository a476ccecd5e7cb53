use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::Dialogue;

/// Where a chat currently is in a logging conversation. One state per chat,
/// kept in memory only. A restart simply forgets half-finished questions.
#[derive(Clone, Default, Debug, PartialEq)]
pub enum ChatState {
    #[default]
    Idle,
    /// Asked how many ml were drunk.
    AwaitingFeedingMl,
    /// Asked when the feeding happened.
    AwaitingFeedingTime { amount_ml: u32 },
    /// Asked for a body temperature.
    AwaitingTemperature,
}

pub type BotDialogue = Dialogue<ChatState, InMemStorage<ChatState>>;
