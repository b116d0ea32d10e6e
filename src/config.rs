use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::processing::PipelineSettings;
use crate::processing::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::sink::DEFAULT_BATCH_SIZE;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable {key}: '{value}'")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value that failed to parse.
        value: String,
    },
}

/// Runtime configuration for Rusty Docs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters repeated between consecutive chunks.
    pub chunk_overlap: usize,
    /// Optional cap on chunks returned per document.
    pub max_chunks: Option<usize>,
    /// Timeout applied to remote document downloads.
    pub fetch_timeout_secs: u64,
    /// Tesseract executable used for image OCR.
    pub tesseract_bin: String,
    /// Tesseract language pack.
    pub ocr_language: String,
    /// Chunks handed to the sink per batch.
    pub sink_batch_size: usize,
    /// Documents processed concurrently by the batch runner.
    pub concurrency: usize,
    /// Optional log file override.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_chunks: None,
            fetch_timeout_secs: 30,
            tesseract_bin: "tesseract".into(),
            ocr_language: "eng".into(),
            sink_batch_size: DEFAULT_BATCH_SIZE,
            concurrency: 4,
            log_file: None,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and then read configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read configuration from the process environment, applying defaults for unset values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            chunk_size: parse_or(&get, "RUSTY_DOCS_CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or(&get, "RUSTY_DOCS_CHUNK_OVERLAP", defaults.chunk_overlap)?,
            max_chunks: parse_optional(&get, "RUSTY_DOCS_MAX_CHUNKS")?,
            fetch_timeout_secs: parse_or(
                &get,
                "RUSTY_DOCS_FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout_secs,
            )?,
            tesseract_bin: get("RUSTY_DOCS_TESSERACT_BIN").unwrap_or(defaults.tesseract_bin),
            ocr_language: get("RUSTY_DOCS_OCR_LANGUAGE").unwrap_or(defaults.ocr_language),
            sink_batch_size: parse_or(
                &get,
                "RUSTY_DOCS_SINK_BATCH_SIZE",
                defaults.sink_batch_size,
            )?,
            concurrency: parse_or(&get, "RUSTY_DOCS_CONCURRENCY", defaults.concurrency)?,
            log_file: get("RUSTY_DOCS_LOG_FILE").map(PathBuf::from),
        })
    }

    /// Pipeline settings derived from this configuration.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            max_chunks: self.max_chunks,
        }
    }

    /// Download timeout as a [`Duration`].
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_optional<T, G>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    Ok(parse_optional(get, key)?.unwrap_or(default))
}
