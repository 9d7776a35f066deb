//! Fastmail masked email over JMAP.
//!
//! Two calls: the JMAP session resource names the account that owns masked
//! emails, then a `MaskedEmail/set` call creates one for the website.

use super::{ForwarderClient, http_error, malformed, read_json, require_token, resolve_url};
use crate::error::{ForwarderError, ForwarderResult};
use crate::options::{FastmailSettings, Forwarder};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;

const FORWARDER: Forwarder = Forwarder::Fastmail;
const MASKED_EMAIL_CAPABILITY: &str = "https://www.fastmail.com/dev/maskedemail";
const CREATE_ID: &str = "new-masked-email";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    #[serde(default)]
    primary_accounts: HashMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    method_responses: Vec<(String, Value, String)>,
}

pub(super) async fn create_alias(
    client: &ForwarderClient,
    settings: &FastmailSettings,
) -> ForwarderResult<String> {
    let token = require_token(FORWARDER, &settings.api)?;
    let base = resolve_url(FORWARDER, "", &client.config().fastmail_url)?;
    let account_id = account_id(client, &base, token).await?;

    let body = json!({
        "using": ["urn:ietf:params:jmap:core", MASKED_EMAIL_CAPABILITY],
        "methodCalls": [[
            "MaskedEmail/set",
            {
                "accountId": account_id,
                "create": {
                    CREATE_ID: {
                        "state": "enabled",
                        "description": "",
                        "forDomain": settings.api.website.as_deref().unwrap_or_default(),
                        "emailPrefix": settings.email.prefix,
                    }
                }
            },
            "0"
        ]]
    });

    let resp = client
        .http()
        .post(format!("{base}/jmap/api/"))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .map_err(http_error(FORWARDER))?;
    let status = resp.status().as_u16();
    let resp: ApiResponse = read_json(FORWARDER, resp).await?;

    let Some((method, result, _)) = resp.method_responses.into_iter().next() else {
        return Err(malformed(FORWARDER, "no method response"));
    };
    if method == "error" {
        return Err(rejected(status, &result, "JMAP error"));
    }
    if let Some(email) = result["created"][CREATE_ID]["email"].as_str() {
        return Ok(email.to_string());
    }
    let not_created = &result["notCreated"][CREATE_ID];
    if !not_created.is_null() {
        return Err(rejected(status, not_created, "masked email was not created"));
    }
    Err(malformed(FORWARDER, "response is missing the created masked email"))
}

async fn account_id(client: &ForwarderClient, base: &str, token: &str) -> ForwarderResult<String> {
    let resp = client
        .http()
        .get(format!("{base}/.well-known/jmap"))
        .bearer_auth(token)
        .send()
        .await
        .map_err(http_error(FORWARDER))?;
    let session: Session = read_json(FORWARDER, resp).await?;
    session
        .primary_accounts
        .get(MASKED_EMAIL_CAPABILITY)
        .filter(|id| !id.is_empty())
        .cloned()
        .ok_or(ForwarderError::MissingAccountId { forwarder: FORWARDER })
}

fn rejected(status: u16, detail: &Value, fallback: &str) -> ForwarderError {
    let message = detail["description"]
        .as_str()
        .or_else(|| detail["type"].as_str())
        .unwrap_or(fallback)
        .to_string();
    ForwarderError::Rejected {
        forwarder: FORWARDER,
        status,
        message,
    }
}
