use poise::serenity_prelude as serenity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Discord API error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed schedule feed: {0}")]
    Feed(String),

    #[error("timestamp parse error: {0}")]
    Parse(#[from] chrono::ParseError),

    #[error("database I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;
