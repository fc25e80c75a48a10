use crate::chat::gemini::DEFAULT_BASE_URL;
use crate::chat::{DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use crate::transition::{OverlapPolicy, TransitionTimings};
use clap::{Parser, ValueEnum};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "portfolio.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Gemini model used by the assistant
    #[arg(long)]
    pub chat_model: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub transition: TransitionConfig,
    #[serde(default)]
    pub pages: PagesConfig,
    #[serde(skip)]
    pub log_format: LogFormat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Settings for the chat assistant.
///
/// `api_key` doubles as the feature flag: without it the assistant is off.
#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ChatSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub system_prompt: String,
    pub request_timeout_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for ChatSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TransitionConfig {
    pub exit_delay_ms: u64,
    pub frame_interval_ms: u64,
    pub settle_frames: u32,
    pub overlap: OverlapPolicy,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        let timings = TransitionTimings::default();
        Self {
            exit_delay_ms: duration_ms(timings.exit_delay),
            frame_interval_ms: duration_ms(timings.frame_interval),
            settle_frames: timings.settle_frames,
            overlap: OverlapPolicy::default(),
        }
    }
}

impl TransitionConfig {
    pub fn timings(&self) -> TransitionTimings {
        TransitionTimings {
            exit_delay: Duration::from_millis(self.exit_delay_ms),
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            settle_frames: self.settle_frames,
        }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.overlap
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PagesConfig {
    pub idle_timeout_secs: u64,
    pub reap_interval_secs: u64,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30 * 60,
            reap_interval_secs: 60,
        }
    }
}

impl PagesConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?;

        // Explicit file must exist; the implicit one is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::new(path, FileFormat::Yaml)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder.add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml))
            }
            None => builder,
        };

        // PORTFOLIO_SERVER__PORT=8000, PORTFOLIO_TRANSITION__OVERLAP=supersede
        builder = builder.add_source(
            Environment::with_prefix("PORTFOLIO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Unprefixed credential names win over the file and prefixed env.
        if let Some(key) = credential_from_env() {
            builder = builder.set_override("chat.api_key", key)?;
        }

        // CLI flags (and their clap-mapped env vars) win over everything.
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(model) = cli.chat_model {
            builder = builder.set_override("chat.model", model)?;
        }

        let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.chat.api_key = cfg.chat.api_key.filter(|k| !k.trim().is_empty());
        cfg.log_format = cli.log_format;
        Ok(cfg)
    }
}

/// `GEMINI_API_KEY`, falling back to `API_KEY`. Blank values count as unset.
fn credential_from_env() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .into_iter()
        .filter_map(|name| env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}
