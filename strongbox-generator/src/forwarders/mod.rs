//! HTTP clients for the email forwarding services.
//!
//! Each service exposes one token-authenticated endpoint that creates a
//! forwarding address. Failures are reported as [`ForwarderError`]s naming
//! the service; nothing is retried.

mod addy_io;
mod duck_duck_go;
mod fastmail;
mod firefox_relay;
mod forward_email;
mod simple_login;

use crate::config::ForwarderConfig;
use crate::error::{ForwarderError, ForwarderResult};
use crate::options::{ApiOptions, Forwarder, ForwarderOptions};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Shared HTTP client for every forwarder.
#[derive(Clone)]
pub struct ForwarderClient {
    client: Client,
    config: ForwarderConfig,
}

impl ForwarderClient {
    pub fn new(config: ForwarderConfig) -> ForwarderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ForwarderError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    /// Creates a forwarding address with the given service settings.
    pub async fn generate(&self, options: &ForwarderOptions) -> ForwarderResult<String> {
        let forwarder = options.forwarder();
        debug!("requesting forwarding address from {forwarder}");
        let result = match options {
            ForwarderOptions::AddyIo(s) => addy_io::create_alias(self, s).await,
            ForwarderOptions::DuckDuckGo(s) => duck_duck_go::create_alias(self, s).await,
            ForwarderOptions::Fastmail(s) => fastmail::create_alias(self, s).await,
            ForwarderOptions::FirefoxRelay(s) => firefox_relay::create_alias(self, s).await,
            ForwarderOptions::ForwardEmail(s) => forward_email::create_alias(self, s).await,
            ForwarderOptions::SimpleLogin(s) => simple_login::create_alias(self, s).await,
        };
        if let Err(e) = &result {
            warn!("{forwarder} request failed: {e}");
        }
        result
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }
}

/// Note attached to every created alias.
pub(crate) fn description(website: Option<&str>) -> String {
    match website.filter(|w| !w.is_empty()) {
        Some(website) => format!("Generated by Strongbox. Website: {website}"),
        None => "Generated by Strongbox.".to_string(),
    }
}

pub(crate) fn require_token(forwarder: Forwarder, api: &ApiOptions) -> ForwarderResult<&str> {
    let token = api.token.trim();
    if token.is_empty() {
        return Err(ForwarderError::MissingToken { forwarder });
    }
    Ok(token)
}

/// The user's server when set, otherwise the configured endpoint. Trailing
/// slashes are dropped.
pub(crate) fn resolve_url(
    forwarder: Forwarder,
    custom: &str,
    default: &str,
) -> ForwarderResult<String> {
    let url = match custom.trim() {
        "" => default.trim(),
        custom => custom,
    };
    if url.is_empty() {
        return Err(ForwarderError::MissingUrl { forwarder });
    }
    Ok(url.trim_end_matches('/').to_string())
}

pub(crate) fn http_error(forwarder: Forwarder) -> impl FnOnce(reqwest::Error) -> ForwarderError {
    move |source| ForwarderError::Http { forwarder, source }
}

pub(crate) fn malformed(forwarder: Forwarder, message: impl Into<String>) -> ForwarderError {
    ForwarderError::Malformed {
        forwarder,
        message: message.into(),
    }
}

/// Maps a non-success status to an error and decodes a success body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    forwarder: Forwarder,
    resp: Response,
) -> ForwarderResult<T> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ForwarderError::InvalidToken { forwarder });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ForwarderError::Rejected {
            forwarder,
            status: status.as_u16(),
            message: error_message(&body, status),
        });
    }
    resp.json()
        .await
        .map_err(|e| malformed(forwarder, e.to_string()))
}

/// Best human-readable message in an error body.
fn error_message(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        ["error", "message", "detail"]
            .iter()
            .find_map(|field| json.get(field).and_then(Value::as_str).map(str::to_string))
    });
    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_mentions_website() {
        assert_eq!(description(None), "Generated by Strongbox.");
        assert_eq!(description(Some("")), "Generated by Strongbox.");
        assert_eq!(
            description(Some("example.com")),
            "Generated by Strongbox. Website: example.com"
        );
    }

    #[test]
    fn resolve_url_prefers_custom_and_trims() {
        let url = resolve_url(Forwarder::AddyIo, "https://self.hosted/", "https://app.addy.io");
        assert_eq!(url.unwrap(), "https://self.hosted");
        let url = resolve_url(Forwarder::AddyIo, " ", "https://app.addy.io");
        assert_eq!(url.unwrap(), "https://app.addy.io");
        assert!(matches!(
            resolve_url(Forwarder::AddyIo, "", ""),
            Err(ForwarderError::MissingUrl { .. })
        ));
    }

    #[test]
    fn error_message_prefers_json_fields() {
        assert_eq!(
            error_message(r#"{"error":"quota reached"}"#, StatusCode::FORBIDDEN),
            "quota reached"
        );
        assert_eq!(error_message("plain", StatusCode::BAD_REQUEST), "plain");
        assert_eq!(error_message("", StatusCode::BAD_REQUEST), "Bad Request");
    }

    #[test]
    fn blank_token_is_missing() {
        let api = ApiOptions {
            token: "  ".into(),
            website: None,
        };
        assert!(matches!(
            require_token(Forwarder::DuckDuckGo, &api),
            Err(ForwarderError::MissingToken {
                forwarder: Forwarder::DuckDuckGo
            })
        ));
    }
}
