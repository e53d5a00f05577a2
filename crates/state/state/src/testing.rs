//! Conformance test suite for [`StateStore`] backends.

use crate::error::StateError;
use crate::key::{KeyKind, StateKey};
use crate::store::StateStore;

use taggate_core::ApiFamily;

fn test_key(kind: KeyKind, id: &str) -> StateKey {
    StateKey::new(ApiFamily::Gtm, "test-tenant", kind, id)
}

/// Run the full state store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_store_conformance_tests(store: &dyn StateStore) -> Result<(), StateError> {
    test_get_missing(store).await?;
    test_set_and_get(store).await?;
    test_delete(store).await?;
    test_increment(store).await?;
    test_hash_put_and_get_all(store).await?;
    test_hash_partial_update(store).await?;
    test_hash_remove(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn StateStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::Custom("misc".into()), "missing");
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

async fn test_set_and_get(store: &dyn StateStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::Custom("misc".into()), "set-get");
    store.set(&key, "hello", None).await?;
    let val = store.get(&key).await?;
    assert_eq!(val.as_deref(), Some("hello"));
    Ok(())
}

async fn test_delete(store: &dyn StateStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::Custom("misc".into()), "to-delete");
    store.set(&key, "bye", None).await?;
    let existed = store.delete(&key).await?;
    assert!(existed, "delete should return true for existing key");
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get after delete should return None");

    let existed = store.delete(&key).await?;
    assert!(!existed, "delete on missing key should return false");
    Ok(())
}

async fn test_increment(store: &dyn StateStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::RateLimit, "counter-1");
    let val = store.increment(&key, 1, None).await?;
    assert_eq!(val, 1, "first increment from zero should yield 1");

    let val = store.increment(&key, 5, None).await?;
    assert_eq!(val, 6, "second increment should accumulate");

    let val = store.increment(&key, -2, None).await?;
    assert_eq!(val, 4, "negative delta should decrement");
    Ok(())
}

async fn test_hash_put_and_get_all(store: &dyn StateStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::Cache, "hash-basic");

    let miss = store.hash_get_all(&key).await?;
    assert!(miss.is_none(), "missing hash should read as None");

    store
        .hash_put(
            &key,
            &[
                ("101".to_owned(), "{\"name\":\"a\"}".to_owned()),
                ("102".to_owned(), "{\"name\":\"b\"}".to_owned()),
            ],
            None,
        )
        .await?;

    let all = store.hash_get_all(&key).await?.expect("hash should exist");
    assert_eq!(all.len(), 2);
    assert_eq!(all.get("101").map(String::as_str), Some("{\"name\":\"a\"}"));
    Ok(())
}

async fn test_hash_partial_update(store: &dyn StateStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::Cache, "hash-partial");
    store
        .hash_put(
            &key,
            &[
                ("1".to_owned(), "old".to_owned()),
                ("2".to_owned(), "keep".to_owned()),
            ],
            None,
        )
        .await?;

    // Updating one field must leave the others untouched.
    store
        .hash_put(&key, &[("1".to_owned(), "new".to_owned())], None)
        .await?;

    let all = store.hash_get_all(&key).await?.expect("hash should exist");
    assert_eq!(all.get("1").map(String::as_str), Some("new"));
    assert_eq!(all.get("2").map(String::as_str), Some("keep"));
    Ok(())
}

async fn test_hash_remove(store: &dyn StateStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::Cache, "hash-remove");
    store
        .hash_put(
            &key,
            &[
                ("1".to_owned(), "a".to_owned()),
                ("2".to_owned(), "b".to_owned()),
            ],
            None,
        )
        .await?;

    let removed = store
        .hash_remove(&key, &["1".to_owned(), "nope".to_owned()])
        .await?;
    assert_eq!(removed, 1, "only existing fields count as removed");

    let all = store.hash_get_all(&key).await?.expect("hash should exist");
    assert_eq!(all.len(), 1);

    let removed = store.hash_remove(&key, &["2".to_owned()]).await?;
    assert_eq!(removed, 1);
    let miss = store.hash_get_all(&key).await?;
    assert!(miss.is_none(), "emptied hash should read as a miss");
    Ok(())
}
