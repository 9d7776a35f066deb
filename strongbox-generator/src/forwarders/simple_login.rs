use super::{ForwarderClient, description, http_error, malformed, read_json, require_token, resolve_url};
use crate::error::ForwarderResult;
use crate::options::{Forwarder, SimpleLoginSettings};
use serde::Deserialize;
use serde_json::json;

const FORWARDER: Forwarder = Forwarder::SimpleLogin;

#[derive(Deserialize)]
struct Resp {
    alias: Option<String>,
}

pub(super) async fn create_alias(
    client: &ForwarderClient,
    settings: &SimpleLoginSettings,
) -> ForwarderResult<String> {
    let token = require_token(FORWARDER, &settings.api.api)?;
    let base = resolve_url(FORWARDER, &settings.api.base_url, &client.config().simple_login_url)?;
    let website = settings.api.api.website.as_deref().filter(|w| !w.is_empty());

    let mut request = client
        .http()
        .post(format!("{base}/api/alias/random/new"))
        .header("Authentication", token);
    if let Some(website) = website {
        request = request.query(&[("hostname", website)]);
    }

    let resp = request
        .json(&json!({ "note": description(website) }))
        .send()
        .await
        .map_err(http_error(FORWARDER))?;

    let resp: Resp = read_json(FORWARDER, resp).await?;
    resp.alias
        .ok_or_else(|| malformed(FORWARDER, "response is missing alias"))
}
