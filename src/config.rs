use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::utils::dir;

/// One person allowed to talk to the bot.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BotUser {
    pub name: String,
    pub id: u64,
}

/// Runtime configuration, resolved from the TOML file plus environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// File the whole entry log is stored in.
    pub data_file: PathBuf,
    /// Directory for rolling logs and other state.
    pub app_dir: PathBuf,
    /// Timezone all dates and wall times are interpreted in.
    pub timezone: Tz,
    /// Telegram token. Only needed when the bot is started.
    pub bot_token: Option<String>,
    pub users: Vec<BotUser>,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    data_file: Option<PathBuf>,
    timezone: Option<String>,
    bot_token: Option<String>,
    /// Optional tables:
    /// [[users]]
    /// name = "Zoe"
    /// id = 100200300
    #[serde(default)]
    users: Vec<BotUser>,
}

impl Config {
    /// Loads the config file at `path`, or the default location when no path
    /// is given. A missing default file simply means defaults everywhere.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_config = Self::read_file_config(path)?;
        Self::resolve(file_config)
    }

    fn read_file_config(path: Option<&Path>) -> Result<FileConfig> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_config_file() {
                Some(path) if path.exists() => path,
                _ => return Ok(FileConfig::default()),
            },
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse_file(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    fn parse_file(raw: &str) -> Result<FileConfig> {
        Ok(toml::from_str::<FileConfig>(raw)?)
    }

    /// `$XDG_CONFIG_HOME/babylog/config.toml`, falling back to
    /// `~/.config/babylog/config.toml`.
    fn default_config_file() -> Option<PathBuf> {
        let base = env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
            .ok()?;
        Some(base.join("babylog").join("config.toml"))
    }

    fn resolve(file_config: FileConfig) -> Result<Self> {
        let timezone = Self::parse_timezone(file_config.timezone.as_deref())?;
        Self::check_users(&file_config.users)?;

        let app_dir = dir::create_application_default_path()?;
        let data_file = file_config
            .data_file
            .unwrap_or_else(|| app_dir.join("baby_data.json"));
        let bot_token = file_config
            .bot_token
            .or_else(|| env::var("TELOXIDE_TOKEN").ok());

        Ok(Self {
            data_file,
            app_dir,
            timezone,
            bot_token,
            users: file_config.users,
        })
    }

    fn parse_timezone(name: Option<&str>) -> Result<Tz> {
        match name {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow!("unknown timezone {name:?}: {e}")),
            None => Ok(chrono_tz::Europe::Amsterdam),
        }
    }

    fn check_users(users: &[BotUser]) -> Result<()> {
        for user in users {
            if user.name.trim().is_empty() {
                bail!("user {} has an empty name", user.id);
            }
        }
        Ok(())
    }
}
