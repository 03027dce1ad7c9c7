//! Custom error types for the StealthPad application

use thiserror::Error;

/// Main error type for StealthPad operations
#[derive(Error, Debug)]
pub enum PadError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),

    #[error("Windows API error: {0}")]
    WindowsApi(#[from] windows::core::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(String),

    #[error("Tray icon error: {0}")]
    Tray(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for StealthPad operations
pub type PadResult<T> = Result<T, PadError>;
