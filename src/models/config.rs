//! Configuration models for quizforge.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! The operator resolves these unknowns at startup via config file;
//! the user narrows them per session through [`Settings`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Top-level configuration for quizforge.
///
/// Every section has defaults, so an empty file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat completion endpoint
    #[serde(default)]
    pub llm: LlmConfig,

    /// Chunking bounds and defaults
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Quiz generation settings
    #[serde(default)]
    pub quiz: QuizConfig,

    /// Web UI settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// OpenAI-compatible endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key (can also be set via the env var named by `api_key_env`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL for the chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum attempts per request on transport failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Ask the provider for a JSON object response (`response_format`)
    #[serde(default = "default_true")]
    pub json_mode: bool,

    /// Custom headers to include in requests.
    /// Values can contain ${ENV_VAR} for environment variable expansion
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Model used for quiz generation
    #[serde(default)]
    pub model: ModelSpec,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    180
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            json_mode: true,
            headers: HashMap::new(),
            model: ModelSpec::default(),
        }
    }
}

/// Specification for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model ID (e.g., "gpt-4o-mini", or "llama3:70b" for Ollama)
    #[serde(default = "default_model_id")]
    pub id: String,

    /// Maximum tokens for this model
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for this model
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_model_id() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f64 {
    0.7
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            id: default_model_id(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// A user-adjustable integer with bounds, slider step and default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRange {
    pub min: usize,
    pub max: usize,
    pub step: usize,
    pub default: usize,
}

impl SettingRange {
    pub const fn new(min: usize, max: usize, step: usize, default: usize) -> Self {
        Self {
            min,
            max,
            step,
            default,
        }
    }

    /// Clamp a requested value into `[min, max]`.
    pub fn clamp(&self, value: usize) -> usize {
        value.clamp(self.min, self.max)
    }

    fn check(&self, name: &str) -> Result<(), ConfigError> {
        if self.step == 0 {
            return Err(ConfigError::Invalid(format!("{name}.step must be positive")));
        }
        if self.min > self.max || self.default < self.min || self.default > self.max {
            return Err(ConfigError::Invalid(format!(
                "{name} requires min <= default <= max (got {} <= {} <= {})",
                self.min, self.default, self.max
            )));
        }
        Ok(())
    }
}

/// Chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: SettingRange,

    /// Overlap between adjacent chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: SettingRange,
}

fn default_chunk_size() -> SettingRange {
    SettingRange::new(800, 2400, 100, 1200)
}

fn default_chunk_overlap() -> SettingRange {
    SettingRange::new(100, 600, 20, 240)
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Quiz generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Questions generated per difficulty tier
    #[serde(default = "default_questions_per_level")]
    pub questions_per_level: SettingRange,

    /// Number of leading chunks sent to the model
    #[serde(default = "default_sample_chunks")]
    pub sample_chunks: usize,

    /// Model calls allowed when the output fails parsing or validation
    #[serde(default = "default_generation_attempts")]
    pub generation_attempts: u32,
}

fn default_questions_per_level() -> SettingRange {
    SettingRange::new(3, 8, 1, 5)
}

fn default_sample_chunks() -> usize {
    3
}

fn default_generation_attempts() -> u32 {
    2
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            questions_per_level: default_questions_per_level(),
            sample_chunks: default_sample_chunks(),
            generation_attempts: default_generation_attempts(),
        }
    }
}

/// Web UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Request body limit (covers PDF uploads)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Sessions untouched for this long are evicted
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: i64,
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_session_idle_minutes() -> i64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            session_idle_minutes: default_session_idle_minutes(),
        }
    }
}

/// Per-session knobs the user can move between generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub questions_per_level: usize,
}

impl Settings {
    /// Defaults taken from the configured ranges.
    pub fn defaults(config: &Config) -> Self {
        Self {
            chunk_size: config.chunking.chunk_size.default,
            chunk_overlap: config.chunking.chunk_overlap.default,
            questions_per_level: config.quiz.questions_per_level.default,
        }
    }

    /// Clamp every value into its range and keep overlap below chunk size.
    pub fn clamped(self, config: &Config) -> Self {
        let chunk_size = config.chunking.chunk_size.clamp(self.chunk_size);
        let chunk_overlap = config
            .chunking
            .chunk_overlap
            .clamp(self.chunk_overlap)
            .min(chunk_size.saturating_sub(1));
        Self {
            chunk_size,
            chunk_overlap,
            questions_per_level: config.quiz.questions_per_level.clamp(self.questions_per_level),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve API key from config or environment.
    ///
    /// B_i(api key available) → Result
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = &self.llm.api_key {
            return Ok(expand_env_vars(key));
        }

        std::env::var(&self.llm.api_key_env).map_err(|_| ConfigError::MissingApiKey {
            env_var: self.llm.api_key_env.clone(),
        })
    }

    /// Check ranges and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.chunk_size.check("chunking.chunk_size")?;
        self.chunking.chunk_overlap.check("chunking.chunk_overlap")?;
        self.quiz.questions_per_level.check("quiz.questions_per_level")?;

        if self.chunking.chunk_size.min == 0 {
            return Err(ConfigError::Invalid(
                "chunking.chunk_size.min must be positive".to_string(),
            ));
        }
        if self.chunking.chunk_overlap.min >= self.chunking.chunk_size.min {
            return Err(ConfigError::Invalid(
                "chunking.chunk_overlap.min must be below chunking.chunk_size.min".to_string(),
            ));
        }
        if self.quiz.questions_per_level.min == 0 {
            return Err(ConfigError::Invalid(
                "quiz.questions_per_level.min must be positive".to_string(),
            ));
        }
        if self.quiz.sample_chunks == 0 {
            return Err(ConfigError::Invalid(
                "quiz.sample_chunks must be positive".to_string(),
            ));
        }
        if self.quiz.generation_attempts == 0 || self.llm.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "quiz.generation_attempts and llm.max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    static PLACEHOLDER: OnceLock<regex::Regex> = OnceLock::new();
    let re = PLACEHOLDER
        .get_or_init(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("placeholder regex"));

    let mut result = s.to_string();
    for cap in re.captures_iter(s) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }
    result
}

/// Expand environment variables in all headers.
pub fn expand_headers(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| (k.clone(), expand_env_vars(v)))
        .collect()
}

/// Configuration errors.
///
/// Epistemic origin:
/// - B_i falsified: File not found, parse error, out-of-range value
/// - I^B materialized: Missing required values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing API key: set {env_var} env var or llm.api_key in config")]
    MissingApiKey { env_var: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
