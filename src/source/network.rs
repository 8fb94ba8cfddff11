//! HTTP polling source.

use crate::error::{LedseqError, Result};
use crate::source::{run_periodic, RefreshContext, SourceAdapter};
use async_trait::async_trait;
use std::time::Duration;

/// How a response body becomes display text.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyFormat {
    /// Whole body, trimmed
    Text,
    /// First non-empty line
    FirstLine,
    /// Value at a JSON pointer (RFC 6901); an empty pointer selects the whole document
    Json { pointer: String },
}

impl BodyFormat {
    pub fn extract(&self, body: &str) -> Result<String> {
        match self {
            BodyFormat::Text => Ok(body.trim().to_string()),
            BodyFormat::FirstLine => Ok(body
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or_default()
                .to_string()),
            BodyFormat::Json { pointer } => {
                let document: serde_json::Value = serde_json::from_str(body)
                    .map_err(|e| LedseqError::acquisition("http", format!("invalid JSON: {e}")))?;
                let value = document.pointer(pointer).ok_or_else(|| {
                    LedseqError::acquisition("http", format!("no value at JSON pointer '{pointer}'"))
                })?;
                Ok(match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub url: String,
    pub format: BodyFormat,
    pub refresh_interval: Duration,
    /// Upper bound for one request including the body
    pub timeout: Duration,
}

pub struct NetworkAdapter {
    config: NetworkConfig,
    client: reqwest::Client,
}

impl NetworkAdapter {
    pub fn new(config: NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("ledseq/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LedseqError::config(format!("cannot create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| LedseqError::acquisition("http", e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LedseqError::acquisition(
                "http",
                format!("{} returned {status}", self.config.url),
            ));
        }
        let body = response
            .text()
            .await
            .map_err(|e| LedseqError::acquisition("http", e.to_string()))?;
        self.config.format.extract(&body)
    }
}

#[async_trait]
impl SourceAdapter for NetworkAdapter {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn run(self: Box<Self>, ctx: RefreshContext) {
        let adapter = &*self;
        run_periodic(
            &ctx,
            adapter.config.refresh_interval,
            adapter.config.timeout,
            move || adapter.fetch(),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_first_line() {
        assert_eq!(BodyFormat::Text.extract("  hi there \n").unwrap(), "hi there");
        assert_eq!(
            BodyFormat::FirstLine.extract("\n\n 21.5 C \nhumid\n").unwrap(),
            "21.5 C"
        );
    }

    #[test]
    fn json_pointer_unquotes_strings() {
        let body = r#"{"weather": {"summary": "Sunny", "temp": 21.5}}"#;
        let summary = BodyFormat::Json {
            pointer: "/weather/summary".into(),
        };
        let temp = BodyFormat::Json {
            pointer: "/weather/temp".into(),
        };
        assert_eq!(summary.extract(body).unwrap(), "Sunny");
        assert_eq!(temp.extract(body).unwrap(), "21.5");
    }

    #[test]
    fn json_errors_are_acquisition_failures() {
        let format = BodyFormat::Json {
            pointer: "/missing".into(),
        };
        assert!(matches!(
            format.extract("{}"),
            Err(LedseqError::SourceAcquisition { .. })
        ));
        assert!(format.extract("not json").is_err());
    }
}
