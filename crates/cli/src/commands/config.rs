use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use mentor_core::config::{
    AppConfig, LoadOptions, GOOGLE_API_KEY_ENV, TELEGRAM_CHAT_ID_ENV, TELEGRAM_TOKEN_ENV,
};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut field = |key: &str, value: &str, env_keys: &[&str]| {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, value, source));
    };

    field("gemini.api_key", &redact_api_key(config.gemini.api_key.as_ref()), &[GOOGLE_API_KEY_ENV]);
    field("gemini.model", &config.gemini.model, &["MENTOR_GEMINI_MODEL"]);
    field("gemini.base_url", &config.gemini.base_url, &["MENTOR_GEMINI_BASE_URL"]);
    field(
        "gemini.temperature",
        &config.gemini.temperature.to_string(),
        &["MENTOR_GEMINI_TEMPERATURE"],
    );
    field(
        "gemini.timeout_secs",
        &config.gemini.timeout_secs.to_string(),
        &["MENTOR_GEMINI_TIMEOUT_SECS"],
    );
    field(
        "gemini.max_attempts",
        &config.gemini.max_attempts.to_string(),
        &["MENTOR_GEMINI_MAX_ATTEMPTS"],
    );
    field(
        "gemini.retry_delay_secs",
        &config.gemini.retry_delay_secs.to_string(),
        &["MENTOR_GEMINI_RETRY_DELAY_SECS"],
    );

    field(
        "telegram.bot_token",
        &redact_bot_token(config.telegram.bot_token.as_ref()),
        &[TELEGRAM_TOKEN_ENV],
    );
    field(
        "telegram.chat_id",
        config.telegram.chat_id.as_deref().unwrap_or("<unset>"),
        &[TELEGRAM_CHAT_ID_ENV],
    );
    field("telegram.base_url", &config.telegram.base_url, &["MENTOR_TELEGRAM_BASE_URL"]);
    field("telegram.parse_mode", &config.telegram.parse_mode, &[]);
    field(
        "telegram.timeout_secs",
        &config.telegram.timeout_secs.to_string(),
        &["MENTOR_TELEGRAM_TIMEOUT_SECS"],
    );

    field("logging.level", &config.logging.level, &["MENTOR_LOGGING_LEVEL", "MENTOR_LOG_LEVEL"]);
    field(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["MENTOR_LOGGING_FORMAT", "MENTOR_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("mentor.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/mentor.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let set_env_key = env_keys
        .iter()
        .find(|env_key| env::var(env_key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = set_env_key {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_api_key(key: Option<&SecretString>) -> String {
    match key.map(|key| key.expose_secret().trim()) {
        None | Some("") => "<unset>".to_string(),
        Some(_) => "<redacted>".to_string(),
    }
}

/// Keeps the numeric bot id, which is public, and hides the secret half.
fn redact_bot_token(token: Option<&SecretString>) -> String {
    let Some(token) = token.map(|token| token.expose_secret().trim()) else {
        return "<unset>".to_string();
    };
    if token.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((bot_id, _)) = token.split_once(':') {
        return format!("{bot_id}:***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{contains_path, redact_api_key, redact_bot_token};

    fn secret(value: &str) -> SecretString {
        value.to_string().into()
    }

    #[test]
    fn bot_token_keeps_only_bot_id() {
        assert_eq!(redact_bot_token(Some(&secret("123456:AAE-secret"))), "123456:***");
        assert_eq!(redact_bot_token(Some(&secret("opaque"))), "<redacted>");
        assert_eq!(redact_bot_token(Some(&secret("  "))), "<empty>");
        assert_eq!(redact_bot_token(None), "<unset>");
    }

    #[test]
    fn api_key_is_never_shown() {
        assert_eq!(redact_api_key(Some(&secret("AIza-secret"))), "<redacted>");
        assert_eq!(redact_api_key(Some(&secret(""))), "<unset>");
        assert_eq!(redact_api_key(None), "<unset>");
    }

    #[test]
    fn nested_keys_are_found_in_file_document() {
        let doc: toml::Value = "[telegram]\nchat_id = \"-100\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "telegram.chat_id"));
        assert!(!contains_path(&doc, "telegram.bot_token"));
        assert!(!contains_path(&doc, "gemini.model"));
    }
}
