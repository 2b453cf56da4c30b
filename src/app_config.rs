use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alignment::AlignmentConfig;
use crate::bookwash::{Axis, Level, Targets};
use crate::pipeline::{EscalationPolicy, PipelineConfig};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// AI provider config
    #[serde(default)]
    pub ai: AiConfig,

    /// Rating and cleaning policy
    #[serde(default)]
    pub cleaning: CleaningConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// AI provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl ProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Hosted providers refuse requests without a key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Primary model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: Model used after repeated rate limiting, empty to disable
    #[serde(default = "String::new")]
    pub fallback_model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: ProviderKind) -> Self {
        let (model, fallback_model, endpoint, timeout_secs, rate_limit) = match provider_type {
            ProviderKind::Ollama => (default_ollama_model(), String::new(), default_ollama_endpoint(), default_local_timeout_secs(), None),
            ProviderKind::OpenAI => (default_openai_model(), default_openai_fallback_model(), default_openai_endpoint(), default_timeout_secs(), Some(60)),
            ProviderKind::Anthropic => (
                default_anthropic_model(),
                default_anthropic_fallback_model(),
                default_anthropic_endpoint(),
                default_timeout_secs(),
                // Slightly below the standard 50 requests per minute
                Some(45),
            ),
            ProviderKind::LMStudio => (default_lmstudio_model(), String::new(), default_lmstudio_endpoint(), default_local_timeout_secs(), None),
        };

        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            fallback_model,
            api_key: String::new(),
            endpoint,
            timeout_secs,
            rate_limit,
        }
    }
}

/// AI service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AiConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: ProviderKind,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Settings shared by all providers
    #[serde(default)]
    pub common: AiCommonConfig,
}

/// Pacing, retry and fallback settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AiCommonConfig {
    /// Minimum delay in milliseconds between consecutive requests
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound for a single backoff wait in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Consecutive rate limit rejections before switching to the fallback model
    #[serde(default = "default_fallback_after")]
    pub fallback_after: u32,

    /// Consecutive successes on the fallback model before returning to the primary
    #[serde(default = "default_reset_after")]
    pub reset_after: u32,
}

impl Default for AiCommonConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            temperature: default_temperature(),
            fallback_after: default_fallback_after(),
            reset_after: default_reset_after(),
        }
    }
}

/// Rating targets and cleaning loop policy
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CleaningConfig {
    #[serde(default = "default_target_language")]
    pub target_language: Level,

    #[serde(default = "default_target_sexual")]
    pub target_sexual: Level,

    #[serde(default = "default_target_violence")]
    pub target_violence: Level,

    /// Maximum revise/verify rounds per chapter
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Re-classify after each revision
    #[serde(default = "default_true")]
    pub verify: bool,

    /// Characters of chapter text sent to the classifier
    #[serde(default = "default_classify_char_budget")]
    pub classify_char_budget: usize,

    /// Targets at or below this level count as strict
    #[serde(default = "default_strict_threshold")]
    pub strict_threshold: Level,

    /// Axes whose targets can make the policy strict
    #[serde(default = "default_strict_axes")]
    pub strict_axes: Vec<Axis>,

    /// Minimum similarity for pairing paragraphs of unequal-length revisions
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Originals shorter than this get the substring match boost
    #[serde(default = "default_short_paragraph_len")]
    pub short_paragraph_len: usize,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            target_language: default_target_language(),
            target_sexual: default_target_sexual(),
            target_violence: default_target_violence(),
            max_iterations: default_max_iterations(),
            verify: true,
            classify_char_budget: default_classify_char_budget(),
            strict_threshold: default_strict_threshold(),
            strict_axes: default_strict_axes(),
            similarity_threshold: default_similarity_threshold(),
            short_paragraph_len: default_short_paragraph_len(),
        }
    }
}

impl CleaningConfig {
    pub fn targets(&self) -> Targets {
        Targets::new(self.target_language, self.target_sexual, self.target_violence)
    }

    /// Pipeline settings derived from this section
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            targets: self.targets(),
            max_iterations: self.max_iterations,
            verify: self.verify,
            rerate: false,
            escalation: EscalationPolicy {
                strict_threshold: self.strict_threshold,
                strict_axes: self.strict_axes.clone(),
            },
            alignment: AlignmentConfig {
                similarity_threshold: self.similarity_threshold,
                short_paragraph_len: self.short_paragraph_len,
                ..AlignmentConfig::default()
            },
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_local_timeout_secs() -> u64 {
    // Local models can be slow to rewrite long chapters
    300
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_fallback_after() -> u32 {
    2
}

fn default_reset_after() -> u32 {
    5
}

fn default_target_language() -> Level {
    Level::PG
}

fn default_target_sexual() -> Level {
    Level::PG
}

fn default_target_violence() -> Level {
    Level::PG13
}

fn default_max_iterations() -> u32 {
    3
}

fn default_classify_char_budget() -> usize {
    12_000
}

fn default_strict_threshold() -> Level {
    Level::PG
}

fn default_strict_axes() -> Vec<Axis> {
    vec![Axis::Language, Axis::Sexual]
}

fn default_similarity_threshold() -> f32 {
    0.3
}

fn default_short_paragraph_len() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio's OpenAI compatible server
    "http://localhost:1234/v1".to_string()
}

fn default_ollama_model() -> String {
    "llama3".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_fallback_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_anthropic_fallback_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

/// Name of the config file looked up in the working and user config directories
pub const CONFIG_FILE_NAME: &str = "conf.json";

/// Environment variable that overrides the configured API key
pub const API_KEY_ENV: &str = "BOOKWASH_API_KEY";

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.ai.provider.requires_api_key() && self.ai.get_api_key().is_empty() {
            return Err(anyhow!(
                "API key is required for the {} provider (set it in the config or via {})",
                self.ai.provider.display_name(),
                API_KEY_ENV
            ));
        }

        if self.cleaning.max_iterations == 0 {
            return Err(anyhow!("cleaning.max_iterations must be at least 1"));
        }

        if !(0.0..=1.0).contains(&self.cleaning.similarity_threshold) {
            return Err(anyhow!(
                "cleaning.similarity_threshold must be between 0 and 1, got {}",
                self.cleaning.similarity_threshold
            ));
        }

        if self.cleaning.classify_char_budget == 0 {
            return Err(anyhow!("cleaning.classify_char_budget must be greater than 0"));
        }

        Ok(())
    }

    /// Load a config file, or the per-user one, or write a default config to `path`
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        if let Some(user_path) = user_config_path() {
            if user_path.exists() {
                info!("Using config file {}", user_path.display());
                return Self::load(&user_path);
            }
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }
}

/// `<config dir>/bookwash/conf.json`, if the platform has a config dir
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bookwash").join(CONFIG_FILE_NAME))
}

impl AiConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &ProviderKind) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter().find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider, inserting defaults if it is missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let index = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Active provider config with every empty field filled from defaults
    pub fn resolved_provider_config(&self) -> ProviderConfig {
        let defaults = ProviderConfig::new(self.provider.clone());
        let Some(configured) = self.get_active_provider_config() else {
            return defaults;
        };

        let or_default = |value: &String, default: String| if value.is_empty() { default } else { value.clone() };
        ProviderConfig {
            provider_type: configured.provider_type.clone(),
            model: or_default(&configured.model, defaults.model),
            fallback_model: configured.fallback_model.clone(),
            api_key: configured.api_key.clone(),
            endpoint: or_default(&configured.endpoint, defaults.endpoint),
            timeout_secs: configured.timeout_secs,
            rate_limit: configured.rate_limit,
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.resolved_provider_config().model
    }

    /// Fallback model for the active provider, if configured
    pub fn get_fallback_model(&self) -> Option<String> {
        let fallback = self.resolved_provider_config().fallback_model;
        (!fallback.is_empty()).then_some(fallback)
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Effective minimum interval between requests: the larger of the common
    /// setting and the provider's requests-per-minute limit
    pub fn min_interval(&self) -> Duration {
        let from_rate_limit = self
            .get_active_provider_config()
            .and_then(|p| p.rate_limit)
            .filter(|rpm| *rpm > 0)
            .map(|rpm| 60_000 / rpm as u64)
            .unwrap_or(0);
        Duration::from_millis(self.common.min_interval_ms.max(from_rate_limit))
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            available_providers: vec![
                ProviderConfig::new(ProviderKind::Ollama),
                ProviderConfig::new(ProviderKind::OpenAI),
                ProviderConfig::new(ProviderKind::Anthropic),
                ProviderConfig::new(ProviderKind::LMStudio),
            ],
            common: AiCommonConfig::default(),
        }
    }
}
