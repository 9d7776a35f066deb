//! Option types for every generator.
//!
//! Stored settings use camelCase field names and `#[serde(default)]`, so a
//! saved record missing newer fields merges over the defaults when read.
//! `website` is always request-scoped: no settings type serializes it, so it
//! never reaches storage, buffered or encrypted.

use serde::{Deserialize, Serialize};
use std::fmt;
use strongbox_state::{SecretClassifier, StateValue};

// --- Password & passphrase ---

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PasswordGenerationOptions {
    pub length: u32,
    pub min_length: u32,
    /// Include look-alike characters (`l`, `I`, `O`, `0`, `1`).
    pub ambiguous: bool,
    pub uppercase: bool,
    pub min_uppercase: u32,
    pub lowercase: bool,
    pub min_lowercase: u32,
    pub number: bool,
    pub min_number: u32,
    pub special: bool,
    pub min_special: u32,
}

impl Default for PasswordGenerationOptions {
    fn default() -> Self {
        Self {
            length: 14,
            min_length: 5,
            ambiguous: false,
            uppercase: true,
            min_uppercase: 1,
            lowercase: true,
            min_lowercase: 1,
            number: true,
            min_number: 1,
            special: false,
            min_special: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PassphraseGenerationOptions {
    pub num_words: u32,
    pub word_separator: String,
    pub capitalize: bool,
    pub include_number: bool,
}

impl Default for PassphraseGenerationOptions {
    fn default() -> Self {
        Self {
            num_words: 6,
            word_separator: "-".to_string(),
            capitalize: false,
            include_number: false,
        }
    }
}

// --- Usernames & email addresses ---

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffUsernameGenerationOptions {
    pub word_capitalize: bool,
    pub word_include_number: bool,
    #[serde(skip)]
    pub website: Option<String>,
}

/// How the variable part of a generated address is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailType {
    /// Eight random lowercase alphanumeric characters.
    #[default]
    Random,
    /// The request's website, verbatim.
    WebsiteName,
}

/// `local+extra@domain` addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubaddressGenerationOptions {
    pub subaddress_type: EmailType,
    pub subaddress_email: String,
    #[serde(skip)]
    pub website: Option<String>,
}

/// `anything@domain` addresses on a catch-all domain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatchallGenerationOptions {
    pub catchall_type: EmailType,
    pub catchall_domain: String,
    #[serde(skip)]
    pub website: Option<String>,
}

// --- Forwarders ---

/// Email forwarding services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Forwarder {
    #[serde(rename = "anonaddy")]
    AddyIo,
    #[serde(rename = "duckduckgo")]
    DuckDuckGo,
    #[serde(rename = "fastmail")]
    Fastmail,
    #[serde(rename = "firefoxrelay")]
    FirefoxRelay,
    #[serde(rename = "forwardemail")]
    ForwardEmail,
    #[serde(rename = "simplelogin")]
    SimpleLogin,
}

impl Forwarder {
    pub const ALL: [Forwarder; 6] = [
        Forwarder::AddyIo,
        Forwarder::DuckDuckGo,
        Forwarder::Fastmail,
        Forwarder::FirefoxRelay,
        Forwarder::ForwardEmail,
        Forwarder::SimpleLogin,
    ];

    /// Stable identifier, also the prefix of the settings storage key.
    pub fn id(&self) -> &'static str {
        match self {
            Forwarder::AddyIo => "anonaddy",
            Forwarder::DuckDuckGo => "duckduckgo",
            Forwarder::Fastmail => "fastmail",
            Forwarder::FirefoxRelay => "firefoxrelay",
            Forwarder::ForwardEmail => "forwardemail",
            Forwarder::SimpleLogin => "simplelogin",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Forwarder::AddyIo => "Addy.io",
            Forwarder::DuckDuckGo => "DuckDuckGo",
            Forwarder::Fastmail => "Fastmail",
            Forwarder::FirefoxRelay => "Firefox Relay",
            Forwarder::ForwardEmail => "Forward Email",
            Forwarder::SimpleLogin => "SimpleLogin",
        }
    }
}

impl fmt::Display for Forwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Token-authenticated API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiOptions {
    pub token: String,
    #[serde(skip)]
    pub website: Option<String>,
}

/// API that may run on the user's own server. An empty `base_url` means the
/// hosted service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelfHostedApiOptions {
    #[serde(flatten)]
    pub api: ApiOptions,
    pub base_url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailDomainOptions {
    pub domain: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailPrefixOptions {
    pub prefix: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddyIoSettings {
    #[serde(flatten)]
    pub api: SelfHostedApiOptions,
    #[serde(flatten)]
    pub email: EmailDomainOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuckDuckGoSettings {
    #[serde(flatten)]
    pub api: ApiOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastmailSettings {
    #[serde(flatten)]
    pub api: ApiOptions,
    #[serde(flatten)]
    pub email: EmailPrefixOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirefoxRelaySettings {
    #[serde(flatten)]
    pub api: ApiOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardEmailSettings {
    #[serde(flatten)]
    pub api: ApiOptions,
    #[serde(flatten)]
    pub email: EmailDomainOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleLoginSettings {
    #[serde(flatten)]
    pub api: SelfHostedApiOptions,
}

/// Settings of any forwarder, dispatched by service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForwarderOptions {
    AddyIo(AddyIoSettings),
    DuckDuckGo(DuckDuckGoSettings),
    Fastmail(FastmailSettings),
    FirefoxRelay(FirefoxRelaySettings),
    ForwardEmail(ForwardEmailSettings),
    SimpleLogin(SimpleLoginSettings),
}

impl ForwarderOptions {
    pub fn forwarder(&self) -> Forwarder {
        match self {
            ForwarderOptions::AddyIo(_) => Forwarder::AddyIo,
            ForwarderOptions::DuckDuckGo(_) => Forwarder::DuckDuckGo,
            ForwarderOptions::Fastmail(_) => Forwarder::Fastmail,
            ForwarderOptions::FirefoxRelay(_) => Forwarder::FirefoxRelay,
            ForwarderOptions::ForwardEmail(_) => Forwarder::ForwardEmail,
            ForwarderOptions::SimpleLogin(_) => Forwarder::SimpleLogin,
        }
    }

    pub fn api(&self) -> &ApiOptions {
        match self {
            ForwarderOptions::AddyIo(s) => s.api(),
            ForwarderOptions::DuckDuckGo(s) => s.api(),
            ForwarderOptions::Fastmail(s) => s.api(),
            ForwarderOptions::FirefoxRelay(s) => s.api(),
            ForwarderOptions::ForwardEmail(s) => s.api(),
            ForwarderOptions::SimpleLogin(s) => s.api(),
        }
    }
}

/// Per-service settings persisted by a forwarder strategy.
pub trait ForwarderSettings: StateValue + Default + PartialEq {
    const FORWARDER: Forwarder;

    /// Which fields are stored in plaintext. `website` is always excluded.
    fn classifier() -> SecretClassifier<Self>;

    fn api(&self) -> &ApiOptions;

    fn into_options(self) -> ForwarderOptions;

    fn token(&self) -> &str {
        &self.api().token
    }
}

impl ForwarderSettings for AddyIoSettings {
    const FORWARDER: Forwarder = Forwarder::AddyIo;

    fn classifier() -> SecretClassifier<Self> {
        SecretClassifier::all_secret()
            .disclose("baseUrl")
            .disclose("domain")
            .exclude("website")
    }

    fn api(&self) -> &ApiOptions {
        &self.api.api
    }

    fn into_options(self) -> ForwarderOptions {
        ForwarderOptions::AddyIo(self)
    }
}

impl ForwarderSettings for DuckDuckGoSettings {
    const FORWARDER: Forwarder = Forwarder::DuckDuckGo;

    fn classifier() -> SecretClassifier<Self> {
        SecretClassifier::all_secret().exclude("website")
    }

    fn api(&self) -> &ApiOptions {
        &self.api
    }

    fn into_options(self) -> ForwarderOptions {
        ForwarderOptions::DuckDuckGo(self)
    }
}

impl ForwarderSettings for FastmailSettings {
    const FORWARDER: Forwarder = Forwarder::Fastmail;

    fn classifier() -> SecretClassifier<Self> {
        SecretClassifier::all_secret()
            .disclose("prefix")
            .exclude("website")
    }

    fn api(&self) -> &ApiOptions {
        &self.api
    }

    fn into_options(self) -> ForwarderOptions {
        ForwarderOptions::Fastmail(self)
    }
}

impl ForwarderSettings for FirefoxRelaySettings {
    const FORWARDER: Forwarder = Forwarder::FirefoxRelay;

    fn classifier() -> SecretClassifier<Self> {
        SecretClassifier::all_secret().exclude("website")
    }

    fn api(&self) -> &ApiOptions {
        &self.api
    }

    fn into_options(self) -> ForwarderOptions {
        ForwarderOptions::FirefoxRelay(self)
    }
}

impl ForwarderSettings for ForwardEmailSettings {
    const FORWARDER: Forwarder = Forwarder::ForwardEmail;

    fn classifier() -> SecretClassifier<Self> {
        SecretClassifier::all_secret()
            .disclose("domain")
            .exclude("website")
    }

    fn api(&self) -> &ApiOptions {
        &self.api
    }

    fn into_options(self) -> ForwarderOptions {
        ForwarderOptions::ForwardEmail(self)
    }
}

impl ForwarderSettings for SimpleLoginSettings {
    const FORWARDER: Forwarder = Forwarder::SimpleLogin;

    fn classifier() -> SecretClassifier<Self> {
        SecretClassifier::all_secret()
            .disclose("baseUrl")
            .exclude("website")
    }

    fn api(&self) -> &ApiOptions {
        &self.api.api
    }

    fn into_options(self) -> ForwarderOptions {
        ForwarderOptions::SimpleLogin(self)
    }
}
