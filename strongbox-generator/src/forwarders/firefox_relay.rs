use super::{ForwarderClient, description, http_error, malformed, read_json, require_token, resolve_url};
use crate::error::ForwarderResult;
use crate::options::{FirefoxRelaySettings, Forwarder};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;

const FORWARDER: Forwarder = Forwarder::FirefoxRelay;

#[derive(Deserialize)]
struct Resp {
    full_address: Option<String>,
}

pub(super) async fn create_alias(
    client: &ForwarderClient,
    settings: &FirefoxRelaySettings,
) -> ForwarderResult<String> {
    let token = require_token(FORWARDER, &settings.api)?;
    let base = resolve_url(FORWARDER, "", &client.config().firefox_relay_url)?;
    let website = settings.api.website.as_deref();

    let resp = client
        .http()
        .post(format!("{base}/api/v1/relayaddresses/"))
        .header(AUTHORIZATION, format!("Token {token}"))
        .json(&json!({
            "enabled": true,
            "generated_for": website.unwrap_or_default(),
            "description": description(website),
        }))
        .send()
        .await
        .map_err(http_error(FORWARDER))?;

    let resp: Resp = read_json(FORWARDER, resp).await?;
    resp.full_address
        .ok_or_else(|| malformed(FORWARDER, "response is missing full_address"))
}
