use super::{ForwarderClient, description, http_error, malformed, read_json, require_token, resolve_url};
use crate::error::{ForwarderError, ForwarderResult};
use crate::options::{AddyIoSettings, Forwarder};
use serde::Deserialize;
use serde_json::json;

const FORWARDER: Forwarder = Forwarder::AddyIo;

#[derive(Deserialize)]
struct Resp {
    data: Option<Alias>,
}

#[derive(Deserialize)]
struct Alias {
    email: Option<String>,
}

pub(super) async fn create_alias(
    client: &ForwarderClient,
    settings: &AddyIoSettings,
) -> ForwarderResult<String> {
    let token = require_token(FORWARDER, &settings.api.api)?;
    let domain = settings.email.domain.trim();
    if domain.is_empty() {
        return Err(ForwarderError::MissingDomain { forwarder: FORWARDER });
    }
    let base = resolve_url(FORWARDER, &settings.api.base_url, &client.config().addy_io_url)?;

    let resp = client
        .http()
        .post(format!("{base}/api/v1/aliases"))
        .bearer_auth(token)
        .header("X-Requested-With", "XMLHttpRequest")
        .json(&json!({
            "domain": domain,
            "description": description(settings.api.api.website.as_deref()),
        }))
        .send()
        .await
        .map_err(http_error(FORWARDER))?;

    let resp: Resp = read_json(FORWARDER, resp).await?;
    resp.data
        .and_then(|alias| alias.email)
        .ok_or_else(|| malformed(FORWARDER, "response is missing data.email"))
}
