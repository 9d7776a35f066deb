use super::{ForwarderClient, http_error, malformed, read_json, require_token, resolve_url};
use crate::error::ForwarderResult;
use crate::options::{DuckDuckGoSettings, Forwarder};
use serde::Deserialize;

const FORWARDER: Forwarder = Forwarder::DuckDuckGo;

#[derive(Deserialize)]
struct Resp {
    address: Option<String>,
}

pub(super) async fn create_alias(
    client: &ForwarderClient,
    settings: &DuckDuckGoSettings,
) -> ForwarderResult<String> {
    let token = require_token(FORWARDER, &settings.api)?;
    let base = resolve_url(FORWARDER, "", &client.config().duck_duck_go_url)?;

    let resp = client
        .http()
        .post(format!("{base}/api/email/addresses"))
        .bearer_auth(token)
        .send()
        .await
        .map_err(http_error(FORWARDER))?;

    let resp: Resp = read_json(FORWARDER, resp).await?;
    match resp.address {
        Some(address) if !address.is_empty() => Ok(format!("{address}@duck.com")),
        _ => Err(malformed(FORWARDER, "response is missing address")),
    }
}
