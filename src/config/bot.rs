// src/config/bot.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const ENV_CONFIG_PATH: &str = "BOT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/bot.toml";

fn default_rss_url() -> String {
    "https://rss.app/feeds/ns3Rql1vEE1hffmX.xml".to_string()
}
fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_check_interval() -> u64 {
    600
}
fn default_backoff_max() -> u64 {
    300
}
fn default_max_posts() -> usize {
    1
}
fn default_last_id_file() -> PathBuf {
    PathBuf::from("last_fb_post.txt")
}
fn default_port() -> u16 {
    10_000
}
fn default_split_at() -> usize {
    900
}
fn default_post_header() -> String {
    "📢 New post from the school page:".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_rss_url")]
    pub rss_url: String,
    #[serde(default)]
    pub chat_id: String,
    /// Forum topic inside `chat_id`; omitted from requests when `None`.
    #[serde(default)]
    pub thread_id: Option<i64>,
    #[serde(default, skip_serializing)]
    pub bot_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: u64,
    #[serde(default = "default_max_posts")]
    pub max_posts_per_check: usize,
    #[serde(default = "default_last_id_file")]
    pub last_id_file: PathBuf,
    #[serde(default, skip_serializing)]
    pub database_url: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Characters of the (unescaped) message that go into the caption.
    #[serde(default = "default_split_at")]
    pub split_at: usize,
    #[serde(default = "default_post_header")]
    pub post_header: String,
    #[serde(default)]
    pub root_triggers_check: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            rss_url: default_rss_url(),
            chat_id: String::new(),
            thread_id: None,
            bot_token: String::new(),
            api_base: default_api_base(),
            check_interval_secs: default_check_interval(),
            backoff_max_secs: default_backoff_max(),
            max_posts_per_check: default_max_posts(),
            last_id_file: default_last_id_file(),
            database_url: None,
            port: default_port(),
            split_at: default_split_at(),
            post_header: default_post_header(),
            root_triggers_check: false,
        }
    }
}

impl BotConfig {
    /// Parse a TOML file; missing keys fall back to defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading bot config from {}", path.display()))?;
        let cfg: BotConfig = toml::from_str(&data)
            .with_context(|| format!("parsing bot config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Defaults, then the optional TOML file, then environment variables.
    ///
    /// Lookup order for the file:
    /// 1) $BOT_CONFIG_PATH (must exist)
    /// 2) config/bot.toml if present
    pub fn from_env() -> Result<Self> {
        let base = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(&p)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => Self::default(),
        };
        Ok(base.apply_env().sanitized())
    }

    fn apply_env(mut self) -> Self {
        if let Some(v) = env_string("RSS_URL") {
            self.rss_url = v;
        }
        if let Some(v) = env_string("TELEGRAM_CHAT_ID") {
            self.chat_id = v;
        }
        if let Some(v) = env_parsed::<i64>("TELEGRAM_THREAD_ID") {
            self.thread_id = Some(v);
        }
        if let Some(v) = env_string("TELEGRAM_BOT_TOKEN") {
            self.bot_token = v;
        }
        if let Some(v) = env_string("TELEGRAM_API_BASE") {
            self.api_base = v;
        }
        if let Some(v) = env_parsed("CHECK_INTERVAL") {
            self.check_interval_secs = v;
        }
        if let Some(v) = env_parsed("BACKOFF_MAX_SECS") {
            self.backoff_max_secs = v;
        }
        if let Some(v) = env_parsed("MAX_POSTS_PER_CHECK") {
            self.max_posts_per_check = v;
        }
        if let Some(v) = env_string("LAST_ID_FILE") {
            self.last_id_file = PathBuf::from(v);
        }
        if let Some(v) = env_string("DATABASE_URL") {
            self.database_url = Some(v);
        }
        if let Some(v) = env_parsed("PORT") {
            self.port = v;
        }
        if let Some(v) = env_parsed("CAPTION_SPLIT_AT") {
            self.split_at = v;
        }
        if let Some(v) = env_string("POST_HEADER") {
            self.post_header = v;
        }
        if let Some(v) = env_string("ROOT_TRIGGERS_CHECK") {
            self.root_triggers_check = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        self
    }

    fn sanitized(mut self) -> Self {
        self.max_posts_per_check = self.max_posts_per_check.max(1);
        self.check_interval_secs = self.check_interval_secs.max(1);
        self.backoff_max_secs = self.backoff_max_secs.max(1);
        // Telegram caps captions at 1024 characters.
        self.split_at = self.split_at.clamp(1, 1024);
        self.api_base = self.api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn has_token(&self) -> bool {
        !self.bot_token.trim().is_empty()
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable config value");
            None
        }
    }
}
