use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub telegram: TelegramConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: Option<SecretString>,
    pub chat_id: Option<String>,
    pub base_url: String,
    pub parse_mode: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    pub gemini_max_attempts: Option<u32>,
    pub gemini_retry_delay_secs: Option<u64>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_base_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    /// `message` never quotes the offending source line, and values
    /// substituted from the environment are replaced before it is built.
    #[error("could not parse config file `{path}`: {message}")]
    ParseFile { path: PathBuf, message: String },
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                api_key: None,
                model: "gemini-2.5-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                temperature: 0.7,
                timeout_secs: 30,
                max_attempts: 3,
                retry_delay_secs: 5,
            },
            telegram: TelegramConfig {
                bot_token: None,
                chat_id: None,
                base_url: "https://api.telegram.org".to_string(),
                parse_mode: "Markdown".to_string(),
                timeout_secs: 10,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl GeminiConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty())
    }
}

impl TelegramConfig {
    /// Both the bot token and the destination chat are present and non-blank.
    pub fn has_credentials(&self) -> bool {
        let token = self.bot_token.as_ref().is_some_and(|token| !token.expose_secret().trim().is_empty());
        let chat = self.chat_id.as_deref().is_some_and(|chat| !chat.trim().is_empty());
        token && chat
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(gemini) = patch.gemini {
            if let Some(api_key) = gemini.api_key {
                self.gemini.api_key = Some(secret_value(api_key));
            }
            if let Some(model) = gemini.model {
                self.gemini.model = model;
            }
            if let Some(base_url) = gemini.base_url {
                self.gemini.base_url = base_url;
            }
            if let Some(temperature) = gemini.temperature {
                self.gemini.temperature = temperature;
            }
            if let Some(timeout_secs) = gemini.timeout_secs {
                self.gemini.timeout_secs = timeout_secs;
            }
            if let Some(max_attempts) = gemini.max_attempts {
                self.gemini.max_attempts = max_attempts;
            }
            if let Some(retry_delay_secs) = gemini.retry_delay_secs {
                self.gemini.retry_delay_secs = retry_delay_secs;
            }
        }

        if let Some(telegram) = patch.telegram {
            if let Some(bot_token) = telegram.bot_token {
                self.telegram.bot_token = Some(secret_value(bot_token));
            }
            if let Some(chat_id) = telegram.chat_id {
                self.telegram.chat_id = Some(chat_id);
            }
            if let Some(base_url) = telegram.base_url {
                self.telegram.base_url = base_url;
            }
            if let Some(parse_mode) = telegram.parse_mode {
                self.telegram.parse_mode = parse_mode;
            }
            if let Some(timeout_secs) = telegram.timeout_secs {
                self.telegram.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env(GOOGLE_API_KEY_ENV) {
            self.gemini.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("MENTOR_GEMINI_MODEL") {
            self.gemini.model = value;
        }
        if let Some(value) = read_env("MENTOR_GEMINI_BASE_URL") {
            self.gemini.base_url = value;
        }
        if let Some(value) = read_env("MENTOR_GEMINI_TEMPERATURE") {
            self.gemini.temperature = parse_f32("MENTOR_GEMINI_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("MENTOR_GEMINI_TIMEOUT_SECS") {
            self.gemini.timeout_secs = parse_u64("MENTOR_GEMINI_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("MENTOR_GEMINI_MAX_ATTEMPTS") {
            self.gemini.max_attempts = parse_u32("MENTOR_GEMINI_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("MENTOR_GEMINI_RETRY_DELAY_SECS") {
            self.gemini.retry_delay_secs = parse_u64("MENTOR_GEMINI_RETRY_DELAY_SECS", &value)?;
        }

        if let Some(value) = read_env(TELEGRAM_TOKEN_ENV) {
            self.telegram.bot_token = Some(secret_value(value));
        }
        if let Some(value) = read_env(TELEGRAM_CHAT_ID_ENV) {
            self.telegram.chat_id = Some(value);
        }
        if let Some(value) = read_env("MENTOR_TELEGRAM_BASE_URL") {
            self.telegram.base_url = value;
        }
        if let Some(value) = read_env("MENTOR_TELEGRAM_TIMEOUT_SECS") {
            self.telegram.timeout_secs = parse_u64("MENTOR_TELEGRAM_TIMEOUT_SECS", &value)?;
        }

        let log_level = read_env("MENTOR_LOGGING_LEVEL").or_else(|| read_env("MENTOR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MENTOR_LOGGING_FORMAT").or_else(|| read_env("MENTOR_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_key) = overrides.gemini_api_key {
            self.gemini.api_key = Some(secret_value(api_key));
        }
        if let Some(model) = overrides.gemini_model {
            self.gemini.model = model;
        }
        if let Some(base_url) = overrides.gemini_base_url {
            self.gemini.base_url = base_url;
        }
        if let Some(max_attempts) = overrides.gemini_max_attempts {
            self.gemini.max_attempts = max_attempts;
        }
        if let Some(retry_delay_secs) = overrides.gemini_retry_delay_secs {
            self.gemini.retry_delay_secs = retry_delay_secs;
        }
        if let Some(bot_token) = overrides.telegram_bot_token {
            self.telegram.bot_token = Some(secret_value(bot_token));
        }
        if let Some(chat_id) = overrides.telegram_chat_id {
            self.telegram.chat_id = Some(chat_id);
        }
        if let Some(base_url) = overrides.telegram_base_url {
            self.telegram.base_url = base_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_gemini(&self.gemini)?;
        validate_telegram(&self.telegram)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("mentor.toml"), PathBuf::from("config/mentor.toml")]
        .into_iter()
        .find(|path| path.exists())
}

// Interpolation runs on parsed string values, so an expanded secret can
// never end up in a TOML syntax error.
fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let mut document = raw
        .parse::<toml::Table>()
        .map_err(|error| parse_error(path, &raw, &error, &[]))?;

    let mut substituted = Vec::new();
    for (_, value) in document.iter_mut() {
        interpolate_value(value, &mut substituted)?;
    }

    toml::Value::Table(document)
        .try_into::<ConfigPatch>()
        .map_err(|error| parse_error(path, &raw, &error, &substituted))
}

fn parse_error(
    path: &Path,
    raw: &str,
    error: &toml::de::Error,
    substituted: &[String],
) -> ConfigError {
    let mut message = error.message().trim().to_string();
    for value in substituted.iter().filter(|value| !value.is_empty()) {
        message = message.replace(value.as_str(), "<redacted>");
    }

    if let Some(span) = error.span() {
        let before = raw.get(..span.start).unwrap_or(raw);
        let line = before.matches('\n').count() + 1;
        let column = before.chars().rev().take_while(|ch| *ch != '\n').count() + 1;
        message = format!("{message} (line {line}, column {column})");
    }

    ConfigError::ParseFile { path: path.to_path_buf(), message }
}

fn interpolate_value(
    value: &mut toml::Value,
    substituted: &mut Vec<String>,
) -> Result<(), ConfigError> {
    match value {
        toml::Value::String(text) => {
            *text = interpolate_env_vars(text, substituted)?;
        }
        toml::Value::Array(items) => {
            for item in items.iter_mut() {
                interpolate_value(item, substituted)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                interpolate_value(item, substituted)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn interpolate_env_vars(input: &str, substituted: &mut Vec<String>) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            substituted.push(value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_gemini(gemini: &GeminiConfig) -> Result<(), ConfigError> {
    if gemini.model.trim().is_empty() {
        return Err(ConfigError::Validation("gemini.model must not be empty".to_string()));
    }
    validate_base_url("gemini.base_url", &gemini.base_url)?;

    if !(0.0..=2.0).contains(&gemini.temperature) {
        return Err(ConfigError::Validation(
            "gemini.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if gemini.timeout_secs == 0 || gemini.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "gemini.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if gemini.max_attempts == 0 {
        return Err(ConfigError::Validation(
            "gemini.max_attempts must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

// Missing credentials are reported by the notifier at delivery time.
fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    validate_base_url("telegram.base_url", &telegram.base_url)?;

    if telegram.parse_mode.trim().is_empty() {
        return Err(ConfigError::Validation(
            "telegram.parse_mode must not be empty".to_string(),
        ));
    }

    if telegram.timeout_secs == 0 || telegram.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "telegram.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_base_url(key: &str, base_url: &str) -> Result<(), ConfigError> {
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{key} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    gemini: Option<GeminiPatch>,
    telegram: Option<TelegramPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiPatch {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
    retry_delay_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    chat_id: Option<String>,
    base_url: Option<String>,
    parse_mode: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
