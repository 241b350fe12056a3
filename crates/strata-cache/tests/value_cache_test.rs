//! Integration tests for `ValueCache`.
//!
//! These tests run against a real Redis instance using testcontainers.
//! Requires Docker to be available on the system.

mod common;

use common::TestRedis;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strata_cache::{CacheTag, KeyNamespace, Ttl, ValueCache};
use strata_core::Clock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Document {
    id: u64,
    title: String,
}

fn document(id: u64) -> Document {
    Document {
        id,
        title: format!("doc-{id}"),
    }
}

fn document_cache(redis: &TestRedis) -> ValueCache<Document> {
    let namespace = KeyNamespace::new("strata", CacheTag::new("document"), "test");
    ValueCache::new(redis.pool(), namespace)
}

#[tokio::test]
async fn test_set_then_get_round_trip() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    let doc = document(1);
    cache.set("one", &doc, Ttl::Seconds(60)).await;

    assert_eq!(cache.get("one").await, Some(doc));
}

#[tokio::test]
async fn test_get_never_set_is_none() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    assert_eq!(cache.get("missing").await, None);
}

#[tokio::test]
async fn test_entry_expires_after_ttl() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    cache.set("ephemeral", &document(1), Ttl::Seconds(1)).await;
    assert!(cache.get("ephemeral").await.is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.get("ephemeral").await, None);
}

#[tokio::test]
async fn test_ttl_until_past_instant_clamps_to_one_second() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    // An already-expired deadline still persists the entry for 1 second.
    let past = Clock::now().add_seconds(-60);
    cache.set("clamped", &document(1), Ttl::Until(past)).await;
    assert!(cache.get("clamped").await.is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.get("clamped").await, None);
}

#[tokio::test]
async fn test_unreadable_payload_reads_as_miss() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    let mut conn = redis.pool().get().await.unwrap();
    redis::cmd("SET")
        .arg(cache.namespace().key("corrupt"))
        .arg("{not json")
        .arg("EX")
        .arg(60)
        .query_async::<()>(&mut *conn)
        .await
        .unwrap();

    assert_eq!(cache.get("corrupt").await, None);
}

#[tokio::test]
async fn test_get_many_omits_missing_by_default() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    cache.set("a", &document(1), Ttl::Seconds(60)).await;
    cache.set("c", &document(3), Ttl::Seconds(60)).await;

    let values = cache.get_many(&["a", "b", "c"], false).await;
    assert_eq!(values.len(), 2);
    assert_eq!(values["a"], Some(document(1)));
    assert_eq!(values["c"], Some(document(3)));
    assert!(!values.contains_key("b"));
}

#[tokio::test]
async fn test_get_many_includes_missing_when_asked() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    cache.set("a", &document(1), Ttl::Seconds(60)).await;

    let values = cache.get_many(&["a", "b"], true).await;
    assert_eq!(values.len(), 2);
    assert_eq!(values["a"], Some(document(1)));
    assert_eq!(values["b"], None);
}

#[tokio::test]
async fn test_remove() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    cache.set("gone", &document(1), Ttl::Seconds(60)).await;
    cache.remove("gone").await;

    assert_eq!(cache.get("gone").await, None);
}

#[tokio::test]
async fn test_namespace_isolation_between_cache_types() {
    let redis = TestRedis::new().await;

    let type_a: ValueCache<i64> = ValueCache::new(
        redis.pool(),
        KeyNamespace::new("strata", CacheTag::new("type_a"), "test"),
    );
    let type_b: ValueCache<i64> = ValueCache::new(
        redis.pool(),
        KeyNamespace::new("strata", CacheTag::new("type_b"), "test"),
    );

    type_a.set("x", &1, Ttl::Seconds(60)).await;

    assert_eq!(type_b.get("x").await, None);
    assert_eq!(type_a.get("x").await, Some(1));
}

#[tokio::test]
async fn test_incr_and_decr() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    assert_eq!(cache.incr("counter").await.unwrap(), 1);
    assert_eq!(cache.incr("counter").await.unwrap(), 2);
    assert_eq!(cache.decr("counter").await.unwrap(), 1);
}

#[tokio::test]
async fn test_size_on_empty_namespace() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    assert_eq!(cache.size().await.unwrap(), (0, 0));
}

#[tokio::test]
async fn test_size_counts_inserted_keys() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    for i in 0..5 {
        cache
            .set(&format!("key-{i}"), &document(i), Ttl::Seconds(60))
            .await;
    }

    let (count, approx_bytes) = cache.size().await.unwrap();
    assert_eq!(count, 5);
    assert!(approx_bytes > 0);
}

#[tokio::test]
async fn test_clear_deletes_only_own_namespace() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);
    let other: ValueCache<i64> = ValueCache::new(
        redis.pool(),
        KeyNamespace::new("strata", CacheTag::new("survivor"), "test"),
    );

    for i in 0..3 {
        cache
            .set(&format!("key-{i}"), &document(i), Ttl::Seconds(60))
            .await;
    }
    other.set("kept", &7, Ttl::Seconds(60)).await;

    let deleted = cache.clear().await.unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(cache.size().await.unwrap(), (0, 0));
    assert_eq!(other.get("kept").await, Some(7));
}

#[tokio::test]
async fn test_write_batch_flushes_on_close() {
    let redis = TestRedis::new().await;
    let cache = document_cache(&redis);

    cache.set("stale", &document(0), Ttl::Seconds(60)).await;

    let mut batch = cache.begin_transaction().await.unwrap();
    batch
        .set("a", &document(1), Ttl::Seconds(60))
        .set("b", &document(2), Ttl::Seconds(60))
        .remove("stale");
    batch.close_transaction().await;

    assert_eq!(cache.get("a").await, Some(document(1)));
    assert_eq!(cache.get("b").await, Some(document(2)));
    assert_eq!(cache.get("stale").await, None);
}
