use std::path::PathBuf;

use anyhow::Result;
use babylog::{
    bot::start_bot,
    config::Config,
    utils::{
        logging::{enable_logging, BOT_PREFIX},
        runtime::single_thread_runtime,
    },
};
use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(
    name = "babylog-bot",
    version,
    about = "Telegram bot for the shared baby care log"
)]
struct BotArgs {
    #[arg(
        long,
        help = "Path to the config file. By default reads $XDG_CONFIG_HOME/babylog/config.toml"
    )]
    config: Option<PathBuf>,
    /// Detach from the console and keep running in the background.
    #[cfg(unix)]
    #[arg(long)]
    detach: bool,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    log_console: bool,
    #[arg(long = "log-filter")]
    log: Option<LevelFilter>,
}

fn main() {
    run_service(BotArgs::parse()).unwrap();
}

fn run_service(args: BotArgs) -> Result<()> {
    #[cfg(unix)]
    if args.detach {
        use daemonize::Daemonize;
        use tracing::error;

        // stdin is redirected to /dev/null by the crate itself.
        let daemonize = Daemonize::new()
            .stdout(daemonize::Stdio::devnull())
            .stderr(daemonize::Stdio::devnull())
            .execute();
        match daemonize {
            daemonize::Outcome::Parent(parent) => {
                parent.inspect_err(|e| error!("Failed to detach the bot process {e:?}"))?;
                println!("Bot detached");
                return Ok(());
            }
            daemonize::Outcome::Child(_) => (),
        }
    }

    run(args)
}

fn run(args: BotArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    enable_logging(BOT_PREFIX, &config.app_dir, args.log, args.log_console)?;
    single_thread_runtime()?.block_on(async move { start_bot(config).await })?;
    Ok(())
}
