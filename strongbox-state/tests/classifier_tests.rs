use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use strongbox_state::*;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Settings {
    token: String,
    domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    website: Option<String>,
}

fn settings() -> Settings {
    Settings {
        token: "tok".into(),
        domain: "example.com".into(),
        website: Some("shop.example".into()),
    }
}

fn classifier() -> SecretClassifier<Settings> {
    SecretClassifier::all_secret()
        .disclose("domain")
        .exclude("website")
}

// --- classify ---

#[test]
fn classify_splits_fields() {
    let classified = classifier().classify(&settings()).unwrap();
    assert_eq!(
        serde_json::Value::Object(classified.disclosed),
        json!({ "domain": "example.com" })
    );
    assert_eq!(
        serde_json::Value::Object(classified.secret),
        json!({ "token": "tok" })
    );
}

#[test]
fn all_secret_puts_everything_in_secret() {
    let classified = SecretClassifier::<Settings>::all_secret()
        .classify(&settings())
        .unwrap();
    assert!(classified.disclosed.is_empty());
    assert_eq!(classified.secret.len(), 3);
}

#[test]
fn non_record_values_are_rejected() {
    let err = SecretClassifier::<String>::all_secret()
        .classify(&"plain".to_string())
        .unwrap_err();
    assert!(matches!(err, StateError::Classification(_)));
}

// --- declassify ---

#[test]
fn declassify_merges_parts() {
    let value = classifier()
        .declassify(json!({ "domain": "example.com" }), json!({ "token": "tok" }))
        .unwrap();
    assert_eq!(
        value,
        Settings {
            website: None,
            ..settings()
        }
    );
}

#[test]
fn declassify_ignores_unlisted_disclosed_fields() {
    let value = classifier()
        .declassify(
            json!({ "domain": "example.com", "token": "injected" }),
            json!({ "token": "tok" }),
        )
        .unwrap();
    assert_eq!(value.token, "tok");
}

#[test]
fn secret_wins_over_disclosed() {
    let classifier = SecretClassifier::<Settings>::all_secret()
        .disclose("domain")
        .disclose("token");
    let value = classifier
        .declassify(
            json!({ "domain": "public.com", "token": "public" }),
            json!({ "domain": "secret.com" }),
        )
        .unwrap();
    assert_eq!(value.domain, "secret.com");
    assert_eq!(value.token, "public");
}

#[test]
fn excluded_fields_are_dropped_even_if_stored() {
    let value = classifier()
        .declassify(
            json!({ "domain": "example.com" }),
            json!({ "token": "tok", "website": "leaked" }),
        )
        .unwrap();
    assert_eq!(value.website, None);
}

// --- Layouts ---

#[test]
fn value_layout_empty_means_none() {
    assert_eq!(ValueLayout::<u32>::reconstruct(Vec::new()), None);
}

#[test]
fn array_layout_empty_is_empty_list() {
    assert_eq!(ArrayLayout::<u32>::reconstruct(Vec::new()), Some(Vec::new()));
}

#[test]
fn array_layout_reorders_by_index() {
    let items = vec![(2, "c"), (0, "a"), (1, "b")]
        .into_iter()
        .map(|(i, s)| (i, s.to_string()))
        .collect();
    assert_eq!(
        ArrayLayout::<String>::reconstruct(items),
        Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
    );
}

#[test]
fn record_layout_empty_is_empty_map() {
    assert_eq!(
        RecordLayout::<String, u32>::reconstruct(Vec::new()),
        Some(HashMap::new())
    );
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn classify_then_declassify_restores_non_excluded_fields(
            token in ".*",
            domain in ".*",
            website in proptest::option::of(".*"),
        ) {
            let original = Settings { token, domain, website };
            let classifier = classifier();
            let classified = classifier.classify(&original).unwrap();
            let restored = classifier
                .declassify(
                    serde_json::Value::Object(classified.disclosed),
                    serde_json::Value::Object(classified.secret),
                )
                .unwrap();
            prop_assert_eq!(restored, Settings { website: None, ..original });
        }

        #[test]
        fn array_layout_is_identity(items in proptest::collection::vec(any::<u32>(), 0..32)) {
            let parts = ArrayLayout::<u32>::deconstruct(items.clone());
            prop_assert_eq!(ArrayLayout::<u32>::reconstruct(parts), Some(items));
        }

        #[test]
        fn record_layout_is_identity(items in proptest::collection::hash_map(".*", any::<u32>(), 0..16)) {
            let parts = RecordLayout::<String, u32>::deconstruct(items.clone());
            prop_assert_eq!(RecordLayout::<String, u32>::reconstruct(parts), Some(items));
        }

        #[test]
        fn value_layout_is_identity(value in any::<i64>()) {
            let parts = ValueLayout::<i64>::deconstruct(value);
            prop_assert_eq!(ValueLayout::<i64>::reconstruct(parts), Some(value));
        }
    }
}
