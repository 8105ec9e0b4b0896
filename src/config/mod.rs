pub mod destinations;

use crate::core::dispatcher::{DispatchSettings, TELEGRAM_API_BASE};
use crate::core::engine::RunFilter;
use crate::core::schedule::HourWindow;
use crate::core::search::{SearchSettings, COMMONS_API_URL};
use crate::utils::error::{BotError, Result};
use crate::utils::validation::{validate_required_field, validate_url, Validate};
use clap::builder::FalseyValueParser;
use clap::Parser;
use destinations::DestinationTable;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "botpic", version)]
#[command(about = "Posts a random district painting from Wikimedia Commons to each configured Telegram group")]
pub struct CliConfig {
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    #[arg(
        long,
        env = "ONLY_SEND_AT_HOUR",
        help = "Only send during this hour (0-23, UTC+3); empty means always"
    )]
    pub only_send_at_hour: Option<String>,

    #[arg(
        long,
        env = "MAX_GROUPS",
        default_value = "0",
        value_parser = parse_group_limit,
        help = "Process at most this many groups (0, empty or negative = all)"
    )]
    pub max_groups: usize,

    #[arg(long, env = "EXCLUDE_GROUPS", value_delimiter = ',', help = "Group identifiers to skip")]
    pub exclude_groups: Vec<String>,

    #[arg(
        long,
        env = "SILENT",
        value_parser = FalseyValueParser::new(),
        help = "Only print startup and summary lines"
    )]
    pub silent: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, env = "LOG_JSON", value_parser = FalseyValueParser::new(), help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, env = "DESTINATIONS_FILE", help = "TOML file replacing the embedded group table")]
    pub destinations: Option<PathBuf>,

    #[arg(long, env = "TELEGRAM_API_BASE", default_value = TELEGRAM_API_BASE, hide = true)]
    pub telegram_api_base: String,

    #[arg(long, env = "COMMONS_API_URL", default_value = COMMONS_API_URL, hide = true)]
    pub commons_api_url: String,
}

/// 空字串或負數代表不限制
fn parse_group_limit(raw: &str) -> std::result::Result<usize, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<i64>()
        .map(|n| usize::try_from(n).unwrap_or(0))
        .map_err(|e| format!("'{}' is not a whole number: {}", raw, e))
}

impl CliConfig {
    pub fn token(&self) -> Result<&str> {
        let token = validate_required_field("BOT_TOKEN", &self.bot_token)?;
        if token.trim().is_empty() {
            return Err(BotError::MissingConfigError {
                field: "BOT_TOKEN".to_string(),
            });
        }
        Ok(token.trim())
    }

    pub fn hour_window(&self) -> HourWindow {
        HourWindow::parse(self.only_send_at_hour.as_deref())
    }

    pub fn run_filter(&self) -> RunFilter {
        RunFilter::new(&self.exclude_groups, self.max_groups)
    }

    pub fn destination_table(&self) -> Result<DestinationTable> {
        match &self.destinations {
            Some(path) => {
                tracing::info!("📂 Loading groups from {}", path.display());
                DestinationTable::from_file(path)
            }
            None => DestinationTable::embedded(),
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            api_url: self.commons_api_url.clone(),
            ..SearchSettings::default()
        }
    }

    pub fn dispatch_settings(&self) -> Result<DispatchSettings> {
        let mut settings = DispatchSettings::new(self.token()?);
        settings.api_base = self.telegram_api_base.clone();
        Ok(settings)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        // 必須最先檢查，缺少 token 時不做任何網路操作
        self.token()?;

        validate_url("telegram_api_base", &self.telegram_api_base)?;
        validate_url("commons_api_url", &self.commons_api_url)?;
        Ok(())
    }
}
