//! Credential generation for Strongbox.
//!
//! # Architecture
//!
//! - [`strategy`] holds one [`GeneratorStrategy`] per algorithm: random
//!   passwords, passphrases, EFF word usernames, plus-addressed and
//!   catch-all email addresses, and forwarding addresses from six email
//!   forwarding services.
//! - [`policy`] folds organization policies into an effective policy and
//!   enforces it on generator options.
//! - [`GeneratorService`] ties a strategy to the user's saved settings and
//!   the [`PolicySource`].
//! - [`GeneratorHistoryService`] keeps an encrypted record of what was
//!   generated.
//!
//! Settings and history are stored through `strongbox-state`; forwarder
//! settings and history entries are encrypted with the user's key.

pub mod config;
mod error;
pub mod forwarders;
mod history;
mod options;
pub mod policy;
mod randomizer;
mod service;
pub mod strategy;
mod wordlist;

pub use config::{DEFAULT_MAX_HISTORY, ForwarderConfig, GeneratorConfig};
pub use error::{
    ForwarderError, ForwarderResult, GeneratorError, GeneratorResult, PolicyError, PolicyResult,
};
pub use forwarders::ForwarderClient;
pub use history::{
    CredentialCategory, GeneratedCredential, GeneratorHistoryService, LegacyPasswordHistory,
};
pub use options::{
    AddyIoSettings, ApiOptions, CatchallGenerationOptions, DuckDuckGoSettings,
    EffUsernameGenerationOptions, EmailDomainOptions, EmailPrefixOptions, EmailType,
    FastmailSettings, FirefoxRelaySettings, ForwardEmailSettings, Forwarder, ForwarderOptions,
    ForwarderSettings, PassphraseGenerationOptions, PasswordGenerationOptions,
    SelfHostedApiOptions, SimpleLoginSettings, SubaddressGenerationOptions,
};
pub use policy::{
    DefaultPolicyEvaluator, MemoryPolicySource, Policy, PolicyEvaluator, PolicySource, PolicyType,
};
pub use randomizer::{Randomizer, WordOptions};
pub use service::GeneratorService;
pub use strategy::GeneratorStrategy;
pub use wordlist::WordList;
