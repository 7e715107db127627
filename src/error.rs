//! Error types for the news core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BubblaError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("API error: {code} - {message}")]
    ApiError {
        code: String,
        message: String,
    },

    #[error("Feed could not be decoded: {0}")]
    DecodeError(String),

    #[error("Notification service {operation} failed: {message}")]
    NotificationError {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}

impl BubblaError {
    /// Builds a notification-service failure for the named call
    pub fn notification(operation: &'static str, message: impl ToString) -> Self {
        Self::NotificationError {
            operation,
            message: message.to_string(),
        }
    }

    /// True for failures of the transport underneath a fetch
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_) | Self::ApiError { .. } | Self::ConnectionLost(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BubblaError>;
