//! Error types for skyscape

use thiserror::Error;

/// Main error type for the sky effect
#[derive(Debug, Error)]
pub enum Error {
    /// Missing render target or invalid options. Fatal at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The external cloud renderer could not be loaded. The effect keeps
    /// running in gradient-only mode.
    #[error("renderer dependency unavailable: {0}")]
    DependencyLoad(String),

    /// Network, HTTP status or decoding failure while fetching weather.
    #[error("weather fetch failed: {0}")]
    WeatherFetch(String),

    /// Operation attempted on an instance after `destroy()`.
    #[error("sky effect has been destroyed")]
    Destroyed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
