use strongbox_crypto::*;
use strongbox_types::UserId;

fn unlocked(user: &UserId) -> KeyService {
    let keys = KeyService::new();
    keys.set_user_key(user, generate_random_key());
    keys
}

// --- Cipher ---

#[test]
fn sealed_string_roundtrips() {
    let key = generate_random_key();
    let sealed = encrypt_string(&key, "correct horse").unwrap();
    assert_eq!(decrypt_string(&key, &sealed).unwrap(), "correct horse");
}

#[test]
fn wrong_key_fails_authentication() {
    let sealed = encrypt_string(&generate_random_key(), "secret").unwrap();
    let err = decrypt_string(&generate_random_key(), &sealed).unwrap_err();
    assert!(matches!(err, CryptoError::Decryption(_)));
}

#[test]
fn truncated_sealed_string_is_rejected() {
    let err = EncryptedData::from_sealed_string("AAAA").unwrap_err();
    assert!(matches!(err, CryptoError::Encoding(_)));
}

#[test]
fn same_plaintext_encrypts_differently() {
    let key = generate_random_key();
    let a = encrypt_string(&key, "x").unwrap();
    let b = encrypt_string(&key, "x").unwrap();
    assert_ne!(a, b);
}

// --- KeyService ---

#[test]
fn encrypt_then_decrypt_for_same_user() {
    let user = UserId::new();
    let keys = unlocked(&user);
    let sealed = keys.encrypt_bytes(&user, b"payload").unwrap();
    assert_eq!(keys.decrypt_bytes(&user, &sealed).unwrap(), b"payload");
}

#[test]
fn locked_user_is_unavailable() {
    let user = UserId::new();
    let keys = unlocked(&user);
    keys.lock(&user);

    assert!(!keys.is_available(&user));
    assert_eq!(
        keys.encrypt_bytes(&user, b"x").unwrap_err(),
        EncryptorError::Unavailable(user.clone())
    );
}

#[test]
fn another_users_ciphertext_does_not_decrypt() {
    let alice = UserId::from("alice");
    let bob = UserId::from("bob");
    let keys = unlocked(&alice);
    keys.set_user_key(&bob, generate_random_key());

    let sealed = keys.encrypt_bytes(&alice, b"for alice").unwrap();
    assert!(matches!(
        keys.decrypt_bytes(&bob, &sealed),
        Err(EncryptorError::Crypto(_))
    ));
}

#[test]
fn unlock_with_password_is_deterministic_per_salt() {
    let user = UserId::new();
    let salt = Salt::random();
    let keys = KeyService::new();
    keys.unlock(&user, "pw", &salt, &KdfParams::insecure_fast())
        .unwrap();
    let sealed = keys.encrypt_bytes(&user, b"data").unwrap();

    keys.lock(&user);
    keys.unlock(&user, "pw", &salt, &KdfParams::insecure_fast())
        .unwrap();
    assert_eq!(keys.decrypt_bytes(&user, &sealed).unwrap(), b"data");
}

#[test]
fn lock_all_clears_every_user() {
    let a = UserId::new();
    let b = UserId::new();
    let keys = unlocked(&a);
    keys.set_user_key(&b, generate_random_key());
    keys.lock_all();
    assert!(!keys.has_user_key(&a));
    assert!(!keys.has_user_key(&b));
}

#[tokio::test]
async fn availability_channel_follows_lock_state() {
    let user = UserId::new();
    let keys = KeyService::new();
    let mut rx = keys.watch_available(&user);
    assert!(!*rx.borrow());

    keys.set_user_key(&user, generate_random_key());
    rx.changed().await.unwrap();
    assert!(*rx.borrow_and_update());

    keys.lock(&user);
    rx.changed().await.unwrap();
    assert!(!*rx.borrow());
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn encrypt_decrypt_always_roundtrips(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let key = generate_random_key();
            let sealed = encrypt(&key, &data).unwrap().to_sealed_string();
            let opened = EncryptedData::from_sealed_string(&sealed).unwrap();
            prop_assert_eq!(decrypt(&key, &opened).unwrap(), data);
        }
    }
}
