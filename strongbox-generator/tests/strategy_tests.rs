mod support;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use strongbox_crypto::{KeyService, generate_random_key};
use strongbox_generator::strategy::*;
use strongbox_generator::*;
use strongbox_state::ActiveState;
use strongbox_types::UserId;
use support::*;

const LOWERCASE: &str = "abcdefghijkmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ";
const NUMBERS: &str = "23456789";
const SPECIAL: &str = "!@#$%^&*";

fn count_in(password: &str, set: &str) -> usize {
    password.chars().filter(|c| set.contains(*c)).count()
}

// --- Password ---

#[tokio::test]
async fn default_password_has_every_required_class() {
    let (provider, _) = memory_provider();
    let strategy = PasswordGeneratorStrategy::new(provider, Randomizer::os());

    for _ in 0..20 {
        let password = strategy
            .generate(&PasswordGenerationOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(password.chars().count(), 14);
        assert!(count_in(&password, LOWERCASE) >= 1);
        assert!(count_in(&password, UPPERCASE) >= 1);
        assert!(count_in(&password, NUMBERS) >= 1);
        assert_eq!(count_in(&password, SPECIAL), 0);
        assert!(!password.contains(['l', 'I', 'O', '0', '1']));
    }
}

#[tokio::test]
async fn password_honours_minimum_counts() {
    let (provider, _) = memory_provider();
    let strategy = PasswordGeneratorStrategy::new(provider, Randomizer::os());
    let options = PasswordGenerationOptions {
        length: 10,
        special: true,
        min_special: 3,
        min_number: 4,
        ..Default::default()
    };

    for _ in 0..20 {
        let password = strategy.generate(&options).await.unwrap().unwrap();
        assert_eq!(password.chars().count(), 10);
        assert!(count_in(&password, SPECIAL) >= 3);
        assert!(count_in(&password, NUMBERS) >= 4);
    }
}

#[tokio::test]
async fn password_is_sanitized_before_generation() {
    let (provider, _) = memory_provider();
    let strategy = PasswordGeneratorStrategy::new(provider, Randomizer::os());
    let options = PasswordGenerationOptions {
        length: 2,
        min_uppercase: 3,
        min_lowercase: 3,
        ..Default::default()
    };
    let password = strategy.generate(&options).await.unwrap().unwrap();
    assert_eq!(password.chars().count(), 7);
}

#[tokio::test]
async fn ambiguous_characters_are_only_available_on_request() {
    let (provider, _) = memory_provider();
    let strategy = PasswordGeneratorStrategy::new(provider, max_randomizer());
    let options = PasswordGenerationOptions {
        length: 5,
        ambiguous: true,
        uppercase: false,
        lowercase: false,
        special: false,
        min_number: 5,
        ..Default::default()
    };
    let password = strategy.generate(&options).await.unwrap().unwrap();
    assert_eq!(password, "11111");
}

#[tokio::test]
async fn password_without_character_sets_fails() {
    let (provider, _) = memory_provider();
    let strategy = PasswordGeneratorStrategy::new(provider, Randomizer::os());
    let options = PasswordGenerationOptions {
        uppercase: false,
        lowercase: false,
        number: false,
        special: false,
        ..Default::default()
    };
    let err = strategy.generate(&options).await.unwrap_err();
    assert!(matches!(err, GeneratorError::NoCharacterSet));
}

// --- Passphrase ---

#[tokio::test]
async fn passphrase_with_lowest_draws() {
    let (provider, _) = memory_provider();
    let strategy = PassphraseGeneratorStrategy::new(provider, min_randomizer(), words());
    let options = PassphraseGenerationOptions {
        num_words: 3,
        word_separator: "-".into(),
        capitalize: true,
        include_number: true,
    };
    let passphrase = strategy.generate(&options).await.unwrap().unwrap();
    assert_eq!(passphrase, "Alpha0-Alpha-Alpha");
}

#[tokio::test]
async fn passphrase_with_highest_draws() {
    let (provider, _) = memory_provider();
    let strategy = PassphraseGeneratorStrategy::new(provider, max_randomizer(), words());
    let options = PassphraseGenerationOptions {
        num_words: 3,
        word_separator: " ".into(),
        capitalize: false,
        include_number: true,
    };
    let passphrase = strategy.generate(&options).await.unwrap().unwrap();
    assert_eq!(passphrase, "foxtrot foxtrot foxtrot9");
}

#[tokio::test]
async fn passphrase_number_lands_on_exactly_one_word() {
    let (provider, _) = memory_provider();
    let strategy = PassphraseGeneratorStrategy::new(provider, Randomizer::os(), words());
    let options = PassphraseGenerationOptions {
        include_number: true,
        ..Default::default()
    };
    for _ in 0..20 {
        let passphrase = strategy.generate(&options).await.unwrap().unwrap();
        let parts: Vec<&str> = passphrase.split('-').collect();
        assert_eq!(parts.len(), 6);
        let numbered = parts
            .iter()
            .filter(|w| w.ends_with(|c: char| c.is_ascii_digit()))
            .count();
        assert_eq!(numbered, 1);
    }
}

#[tokio::test]
async fn too_few_words_fall_back_to_default_count() {
    let (provider, _) = memory_provider();
    let strategy = PassphraseGeneratorStrategy::new(provider, min_randomizer(), words());
    let options = PassphraseGenerationOptions {
        num_words: 2,
        word_separator: String::new(),
        ..Default::default()
    };
    let passphrase = strategy.generate(&options).await.unwrap().unwrap();
    assert_eq!(passphrase, "alpha".repeat(6));
}

#[tokio::test]
async fn passphrase_from_empty_word_list_fails() {
    let (provider, _) = memory_provider();
    let empty = WordList::from_words(Vec::<String>::new());
    let strategy = PassphraseGeneratorStrategy::new(provider, Randomizer::os(), empty);
    let err = strategy
        .generate(&PassphraseGenerationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GeneratorError::EmptyWordList));
}

// --- EFF username ---

#[tokio::test]
async fn eff_username_decorations() {
    let (provider, _) = memory_provider();
    let low = EffUsernameGeneratorStrategy::new(provider.clone(), min_randomizer(), words());
    let high = EffUsernameGeneratorStrategy::new(provider, max_randomizer(), words());
    let decorated = EffUsernameGenerationOptions {
        word_capitalize: true,
        word_include_number: true,
        website: None,
    };

    assert_eq!(low.generate(&decorated).await.unwrap().unwrap(), "Alpha0000");
    assert_eq!(high.generate(&decorated).await.unwrap().unwrap(), "Foxtrot9999");
    assert_eq!(
        low.generate(&EffUsernameGenerationOptions::default())
            .await
            .unwrap()
            .unwrap(),
        "alpha"
    );
}

// --- Subaddress ---

fn subaddress_options(email: &str) -> SubaddressGenerationOptions {
    SubaddressGenerationOptions {
        subaddress_email: email.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn subaddress_inserts_random_tag() {
    let (provider, _) = memory_provider();
    let strategy = SubaddressGeneratorStrategy::new(provider, max_randomizer());
    let address = strategy
        .generate(&subaddress_options("ab@cd.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(address, "ab+00000000@cd.com");
}

#[tokio::test]
async fn subaddress_random_tag_shape() {
    let (provider, _) = memory_provider();
    let strategy = SubaddressGeneratorStrategy::new(provider, Randomizer::os());
    let address = strategy
        .generate(&subaddress_options("ab@cd.com"))
        .await
        .unwrap()
        .unwrap();
    let tag = address
        .strip_prefix("ab+")
        .and_then(|rest| rest.strip_suffix("@cd.com"))
        .unwrap();
    assert_eq!(tag.len(), 8);
    assert!(tag.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

#[tokio::test]
async fn subaddress_uses_website_name() {
    let (provider, _) = memory_provider();
    let strategy = SubaddressGeneratorStrategy::new(provider, Randomizer::os());
    let options = SubaddressGenerationOptions {
        subaddress_type: EmailType::WebsiteName,
        subaddress_email: "me@mail.org".into(),
        website: Some("shop.example".into()),
    };
    let address = strategy.generate(&options).await.unwrap().unwrap();
    assert_eq!(address, "me+shop.example@mail.org");
}

#[tokio::test]
async fn unusable_addresses_come_back_unchanged() {
    let (provider, _) = memory_provider();
    let strategy = SubaddressGeneratorStrategy::new(provider, Randomizer::os());
    for email in ["", "@", "a@", "@ab", "abc@", "no-at-sign"] {
        let address = strategy
            .generate(&subaddress_options(email))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(address, email);
    }
}

// --- Catch-all ---

#[tokio::test]
async fn catchall_builds_address_on_domain() {
    let (provider, _) = memory_provider();
    let strategy = CatchallGeneratorStrategy::new(provider, min_randomizer());
    let options = CatchallGenerationOptions {
        catchall_domain: "example.com".into(),
        ..Default::default()
    };
    assert_eq!(
        strategy.generate(&options).await.unwrap(),
        Some("aaaaaaaa@example.com".into())
    );

    let named = CatchallGenerationOptions {
        catchall_type: EmailType::WebsiteName,
        catchall_domain: "example.com".into(),
        website: Some("news".into()),
    };
    assert_eq!(
        strategy.generate(&named).await.unwrap(),
        Some("news@example.com".into())
    );
}

#[tokio::test]
async fn catchall_without_domain_is_skipped() {
    let (provider, _) = memory_provider();
    let strategy = CatchallGeneratorStrategy::new(provider, Randomizer::os());
    let options = CatchallGenerationOptions {
        catchall_domain: "   ".into(),
        ..Default::default()
    };
    assert_eq!(strategy.generate(&options).await.unwrap(), None);
}

// --- Settings persistence ---

#[tokio::test]
async fn settings_are_saved_without_website() {
    let (provider, _) = memory_provider();
    let user = UserId::new();
    let strategy = SubaddressGeneratorStrategy::new(provider, Randomizer::os());
    let state = strategy.durable_state(&user);

    state
        .update(|_| {
            Some(SubaddressGenerationOptions {
                subaddress_type: EmailType::WebsiteName,
                subaddress_email: "me@mail.org".into(),
                website: Some("shop.example".into()),
            })
        })
        .await
        .unwrap();

    let saved = strategy.durable_state(&user).get().await.unwrap().unwrap();
    assert_eq!(saved.subaddress_email, "me@mail.org");
    assert_eq!(saved.subaddress_type, EmailType::WebsiteName);
    assert_eq!(saved.website, None);
}

#[tokio::test]
async fn strategies_declare_their_policy() {
    let (provider, _) = memory_provider();
    let randomizer = Randomizer::os();
    assert_eq!(
        PasswordGeneratorStrategy::new(provider.clone(), randomizer.clone()).policy(),
        Some(PolicyType::PasswordGenerator)
    );
    assert_eq!(
        PassphraseGeneratorStrategy::new(provider.clone(), randomizer.clone(), words()).policy(),
        Some(PolicyType::PasswordGenerator)
    );
    assert_eq!(
        CatchallGeneratorStrategy::new(provider, randomizer).policy(),
        None
    );
}

// --- Forwarder settings ---

fn addy_io_settings(token: &str) -> AddyIoSettings {
    AddyIoSettings {
        api: SelfHostedApiOptions {
            api: ApiOptions {
                token: token.into(),
                website: None,
            },
            base_url: "https://aliases.example".into(),
        },
        email: EmailDomainOptions {
            domain: "example.com".into(),
        },
    }
}

fn forwarder_strategy(
    provider: Arc<strongbox_state::StateProvider>,
    keys: Arc<KeyService>,
) -> ForwarderStrategy<AddyIoSettings> {
    let client = ForwarderClient::new(ForwarderConfig::default()).unwrap();
    ForwarderStrategy::new(provider, keys, client)
}

#[tokio::test]
async fn forwarder_settings_are_encrypted_at_rest() {
    let (provider, storage) = memory_provider();
    let user = UserId::new();
    let keys = unlocked(&user);
    let strategy = forwarder_strategy(provider, keys);
    let state = strategy.durable_state(&user);

    state
        .update(|_| Some(addy_io_settings("s3cret-token")))
        .await
        .unwrap();

    let storage_key = strategy.key().to_encrypted_state_key().storage_key();
    let raw = storage.raw(&user, &storage_key).unwrap().to_string();
    assert!(!raw.contains("s3cret-token"));
    assert!(raw.contains("example.com"));
    assert!(raw.contains("aliases.example"));

    assert_eq!(
        state.output().get().await.unwrap(),
        Some(addy_io_settings("s3cret-token"))
    );
}

#[tokio::test]
async fn buffered_forwarder_settings_roll_over_on_unlock() {
    init_tracing();
    let (provider, _) = memory_provider();
    let user = UserId::new();
    let keys = Arc::new(KeyService::new());
    let strategy = forwarder_strategy(provider, keys.clone());
    let state = strategy.durable_state(&user);

    state.buffer(Some(addy_io_settings("tok"))).await.unwrap();
    assert_eq!(state.output().get().await.unwrap(), None);

    let mut stream = state.state();
    keys.set_user_key(&user, generate_random_key());

    let rolled = wait_for(&mut stream, |v| v.is_some()).await;
    assert_eq!(rolled, Some(addy_io_settings("tok")));
}

#[tokio::test]
async fn buffered_forwarder_settings_never_store_website() {
    let (provider, storage) = memory_provider();
    let user = UserId::new();
    let keys = Arc::new(KeyService::new());
    let strategy = forwarder_strategy(provider, keys);
    let state = strategy.durable_state(&user);

    let mut settings = addy_io_settings("tok");
    settings.api.api.website = Some("secret-site.example".into());
    state.buffer(Some(settings)).await.unwrap();

    let buffer_key = strategy.buffer_key().to_key_definition().storage_key();
    let raw = storage.raw(&user, &buffer_key).unwrap();
    assert_eq!(raw["token"], "tok");
    assert!(raw.get("website").is_none());
    assert!(!raw.to_string().contains("secret-site.example"));
}

#[tokio::test]
async fn buffered_settings_without_token_are_dropped() {
    let (provider, storage) = memory_provider();
    let user = UserId::new();
    let keys = unlocked(&user);
    let strategy = forwarder_strategy(provider, keys);
    let state = strategy.durable_state(&user);

    state.buffer(Some(addy_io_settings("  "))).await.unwrap();
    assert!(!state.rollover_now().await.unwrap());

    let buffer_key = strategy.buffer_key().to_key_definition().storage_key();
    assert!(storage.raw(&user, &buffer_key).is_none());
    assert_eq!(state.output().get().await.unwrap(), None);
}

#[tokio::test]
async fn forwarder_keys_are_named_by_service() {
    let (provider, _) = memory_provider();
    let user = UserId::new();
    let strategy = forwarder_strategy(provider, unlocked(&user));
    assert_eq!(
        strategy.key().to_encrypted_state_key().storage_key().to_string(),
        "generator_anonaddyForwarder"
    );
    assert_eq!(
        strategy.buffer_key().to_key_definition().storage_key().to_string(),
        "generator_anonaddyBuffer"
    );
}
