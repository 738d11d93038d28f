//! Telegram delivery for the daily quote.
//!
//! - **Transport** (`transport`) - `BotTransport` seam and the reqwest-backed
//!   `HttpBotTransport` calling `POST /bot{token}/sendMessage`
//! - **Notifier** (`notifier`) - `TelegramNotifier`, credential checks, status
//!   handling and transport error classification
//!
//! The request URL embeds the bot token, so neither the URL nor raw transport
//! errors are ever written to the log.

pub mod notifier;
pub mod transport;

pub use notifier::{TelegramNotifier, DEFAULT_PARSE_MODE};
pub use transport::{
    BotReply, BotTransport, HttpBotTransport, SendMessageRequest, TransportError,
    UnavailableTransport,
};
