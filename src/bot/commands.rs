use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "📋 Commands:")]
pub enum Command {
    #[command(description = "show this help")]
    Help,
    #[command(description = "start talking to the bot")]
    Start,
    #[command(description = "everything logged today")]
    Today,
    #[command(description = "log a bottle feeding")]
    Feeding,
    #[command(description = "log a body temperature")]
    Temperature,
    #[command(description = "log a diaper change")]
    Diaper,
    #[command(description = "delete the last entry of a kind")]
    Delete,
    #[command(description = "feeding charts over a period")]
    Stats,
    #[command(description = "forget the question I just asked")]
    Cancel,
}
