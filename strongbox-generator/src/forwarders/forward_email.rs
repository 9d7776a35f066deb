use super::{ForwarderClient, description, http_error, malformed, read_json, require_token, resolve_url};
use crate::error::{ForwarderError, ForwarderResult};
use crate::options::{ForwardEmailSettings, Forwarder};
use serde::Deserialize;
use serde_json::json;

const FORWARDER: Forwarder = Forwarder::ForwardEmail;

#[derive(Deserialize)]
struct Resp {
    name: Option<String>,
    domain: Option<Domain>,
}

#[derive(Deserialize)]
struct Domain {
    name: Option<String>,
}

pub(super) async fn create_alias(
    client: &ForwarderClient,
    settings: &ForwardEmailSettings,
) -> ForwarderResult<String> {
    let token = require_token(FORWARDER, &settings.api)?;
    let domain = settings.email.domain.trim();
    if domain.is_empty() {
        return Err(ForwarderError::MissingDomain { forwarder: FORWARDER });
    }
    let base = resolve_url(FORWARDER, "", &client.config().forward_email_url)?;
    let website = settings.api.website.as_deref();

    let resp = client
        .http()
        .post(format!("{base}/v1/domains/{domain}/aliases"))
        .basic_auth(token, None::<&str>)
        .json(&json!({
            "labels": website.unwrap_or_default(),
            "description": description(website),
        }))
        .send()
        .await
        .map_err(http_error(FORWARDER))?;

    let resp: Resp = read_json(FORWARDER, resp).await?;
    let name = resp
        .name
        .ok_or_else(|| malformed(FORWARDER, "response is missing name"))?;
    let alias_domain = resp
        .domain
        .and_then(|d| d.name)
        .unwrap_or_else(|| domain.to_string());
    Ok(format!("{name}@{alias_domain}"))
}
