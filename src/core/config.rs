use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

pub const LLM_API_KEY_ENV: &str = "MEDIA_FETCH_LLM_API_KEY";
pub const METADATA_API_KEY_ENV: &str = "MEDIA_FETCH_METADATA_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    /// Directory served for unmatched routes (the browser front-end)
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
    pub movies_root: PathBuf,
    pub tv_shows_root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub rpc_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_engine_timeout")]
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_api_base")]
    pub api_base: String,
    #[serde(default = "default_search_category")]
    pub category: u32,
    #[serde(default = "default_upstream_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default)]
    pub frequency_penalty: f32,
    #[serde(default)]
    pub presence_penalty: f32,
    #[serde(default = "default_llm_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_metadata_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_upstream_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base: default_search_api_base(),
            category: default_search_category(),
            timeout: default_upstream_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_llm_api_base(),
            api_key: String::new(),
            model: default_llm_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            timeout: default_llm_timeout(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            api_base: default_metadata_api_base(),
            api_key: String::new(),
            timeout: default_upstream_timeout(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    3000
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_engine_timeout() -> u64 {
    15
}

fn default_search_api_base() -> String {
    "https://apibay.org".to_string()
}

fn default_search_category() -> u32 {
    200 // video
}

fn default_upstream_timeout() -> u64 {
    15
}

fn default_llm_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    256
}

fn default_top_p() -> f32 {
    1.0
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_metadata_api_base() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_channel_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::parse(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        config.resolve_downloads_dir()?;

        Ok(config)
    }

    /// Parse configuration from TOML text without touching the environment
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Credentials set in the environment win over the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(LLM_API_KEY_ENV) {
            if !key.is_empty() {
                self.llm.api_key = key;
            }
        }

        if let Ok(key) = std::env::var(METADATA_API_KEY_ENV) {
            if !key.is_empty() {
                self.metadata.api_key = key;
            }
        }
    }

    /// The engine daemon runs with its own working directory, so it must be
    /// handed an absolute download path
    pub fn resolve_downloads_dir(&mut self) -> Result<()> {
        if self.storage.downloads_dir.is_relative() {
            self.storage.downloads_dir = std::path::absolute(&self.storage.downloads_dir)
                .context(format!(
                    "Failed to resolve downloads_dir {}",
                    self.storage.downloads_dir.display()
                ))?;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("Server port must be greater than 0");
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        let dirs = [
            ("downloads_dir", &self.storage.downloads_dir),
            ("movies_root", &self.storage.movies_root),
            ("tv_shows_root", &self.storage.tv_shows_root),
        ];
        for (name, dir) in dirs {
            if dir.as_os_str().is_empty() {
                bail!("{} must not be empty", name);
            }
        }

        if self.storage.movies_root == self.storage.tv_shows_root {
            bail!("movies_root and tv_shows_root must be different directories");
        }

        let bases = [
            ("engine.rpc_url", &self.engine.rpc_url),
            ("search.api_base", &self.search.api_base),
            ("llm.api_base", &self.llm.api_base),
            ("metadata.api_base", &self.metadata.api_base),
        ];
        for (name, base) in bases {
            if base.is_empty() {
                bail!("{} must not be empty", name);
            }
        }

        if self.engine.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than 0");
        }

        let timeouts = [
            ("engine.request_timeout", self.engine.request_timeout),
            ("search.timeout", self.search.timeout),
            ("llm.timeout", self.llm.timeout),
            ("metadata.timeout", self.metadata.timeout),
        ];
        for (name, timeout) in timeouts {
            if timeout == 0 {
                bail!("{} must be greater than 0", name);
            }
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            bail!(
                "llm.temperature ({}) must be between 0 and 2",
                self.llm.temperature
            );
        }

        if self.llm.top_p <= 0.0 || self.llm.top_p > 1.0 {
            bail!("llm.top_p ({}) must be in (0, 1]", self.llm.top_p);
        }

        if self.llm.max_tokens == 0 {
            bail!("llm.max_tokens must be greater than 0");
        }

        if self.progress.channel_capacity == 0 {
            bail!("channel_capacity must be greater than 0");
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
