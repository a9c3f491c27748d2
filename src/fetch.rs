//! Blocking HTTP fetch producing a `RawDocument`

use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::document::{RawDocument, ShapeHint};
use crate::error::{ExtractError, ExtractResult};

/// Fetch a page and hand it over with its declared shape.
///
/// Every failure, including a non-success status, is a `TransportFailure`.
pub fn fetch_document(url: &str, config: &FetchConfig, shape: ShapeHint) -> ExtractResult<RawDocument> {
    let url = parse_http_url(url)?;

    let agent = ureq::Agent::new_with_config(
        ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .user_agent(config.user_agent.as_str())
            .http_status_as_error(false)
            .build(),
    );

    debug!("Fetching {}", url);
    let response = agent.get(url.as_str()).call().map_err(|e| {
        warn!("Failed to fetch {}: {}", url, e);
        ExtractError::transport(format!("failed to fetch {}: {}", url, e))
    })?;

    if !response.status().is_success() {
        warn!("HTTP {} for {}", response.status(), url);
        return Err(ExtractError::transport(format!(
            "HTTP {} for {}",
            response.status(),
            url
        )));
    }

    let bytes = response
        .into_body()
        .read_to_vec()
        .map_err(|e| ExtractError::transport(format!("failed to read {}: {}", url, e)))?;
    debug!("Fetched {} bytes from {}", bytes.len(), url);

    Ok(RawDocument::new(bytes, shape))
}

fn parse_http_url(raw: &str) -> ExtractResult<Url> {
    let url = Url::parse(raw).map_err(|e| ExtractError::transport(format!("invalid URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ExtractError::transport(format!(
            "unsupported scheme '{}' in {}",
            scheme, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_urls_are_transport_failures() {
        let config = FetchConfig::default();
        for url in ["not a url", "ftp://example.com/list", "/title/tt0111161/"] {
            let err = fetch_document(url, &config, ShapeHint::MarkupTree).unwrap_err();
            assert!(matches!(err, ExtractError::TransportFailure { .. }), "{}", url);
            assert_eq!(err.envelope_message(), "Failed to retrieve document");
        }
    }

    #[test]
    fn test_http_urls_accepted() {
        assert!(parse_http_url("https://www.imdb.com/chart/top/").is_ok());
        assert!(parse_http_url("http://localhost:8080/showtimes").is_ok());
    }
}
