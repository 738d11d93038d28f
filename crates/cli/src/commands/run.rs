use mentor_agent::QuoteGenerator;
use mentor_core::config::{AppConfig, LoadOptions};
use mentor_core::flow::{DailyMentorFlow, FlowReport};
use mentor_telegram::TelegramNotifier;

use crate::commands::CommandResult;
use crate::logging::init_logging;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("run", "config_validation", error.to_string(), 2);
        }
    };
    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "run",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    let report = runtime.block_on(run_pipeline(&config));
    CommandResult::flow_finished("run", &report)
}

/// One generate-then-deliver pass built from `config`.
pub async fn run_pipeline(config: &AppConfig) -> FlowReport {
    let generator = QuoteGenerator::from_config(&config.gemini);
    let notifier = TelegramNotifier::from_config(&config.telegram);

    DailyMentorFlow::new(&generator, &notifier).run().await
}
