use chrono::Utc;
use mentor_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checked_at: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_gemini_key(&config));
            checks.push(check_telegram_credentials(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("gemini_api_key"));
            checks.push(skipped("telegram_credentials"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checked_at: Utc::now().to_rfc3339(), checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn check_gemini_key(config: &AppConfig) -> DoctorCheck {
    if config.gemini.has_api_key() {
        DoctorCheck {
            name: "gemini_api_key",
            status: CheckStatus::Pass,
            details: format!("api key present for model `{}`", config.gemini.model),
        }
    } else {
        DoctorCheck {
            name: "gemini_api_key",
            status: CheckStatus::Fail,
            details: "GOOGLE_API_KEY is not set; runs will deliver the auth error message"
                .to_string(),
        }
    }
}

fn check_telegram_credentials(config: &AppConfig) -> DoctorCheck {
    if config.telegram.has_credentials() {
        return DoctorCheck {
            name: "telegram_credentials",
            status: CheckStatus::Pass,
            details: "bot token and chat id present".to_string(),
        };
    }

    let token_set = config
        .telegram
        .bot_token
        .as_ref()
        .is_some_and(|token| !token.expose_secret().trim().is_empty());
    let chat_set = config.telegram.chat_id.as_deref().is_some_and(|chat| !chat.trim().is_empty());

    let mut missing = Vec::new();
    if !token_set {
        missing.push("TELEGRAM_TOKEN");
    }
    if !chat_set {
        missing.push("TELEGRAM_CHAT_ID");
    }

    DoctorCheck {
        name: "telegram_credentials",
        status: CheckStatus::Fail,
        details: format!("missing {}; delivery will be skipped", missing.join(", ")),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use mentor_core::config::AppConfig;

    use super::{check_telegram_credentials, CheckStatus};

    #[test]
    fn blank_credentials_are_named_as_missing() {
        let mut config = AppConfig::default();
        config.telegram.bot_token = Some(String::new().into());
        config.telegram.chat_id = Some("  ".to_string());

        let check = check_telegram_credentials(&config);

        assert_eq!(check.status, CheckStatus::Fail);
        assert_eq!(check.details, "missing TELEGRAM_TOKEN, TELEGRAM_CHAT_ID; delivery will be skipped");
    }

    #[test]
    fn blank_chat_id_alone_is_reported() {
        let mut config = AppConfig::default();
        config.telegram.bot_token = Some("4242:token".to_string().into());
        config.telegram.chat_id = Some(String::new());

        let check = check_telegram_credentials(&config);

        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.details.starts_with("missing TELEGRAM_CHAT_ID;"));
    }
}
