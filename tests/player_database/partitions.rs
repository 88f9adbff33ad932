//! Round trips, partition isolation and copy isolation.

use crate::common::*;

#[tokio::test]
async fn insecure_round_trip() {
    let t = TestDb::new();
    let profile = Profile::new("ayla", 3).with_item("sword");

    t.write_insecure(1, &profile, None).await.unwrap();
    assert_eq!(t.read_insecure(1).await.unwrap(), Some(profile));
    t.assert_no_open_transactions();
}

#[tokio::test]
async fn secure_round_trip() {
    let t = TestDb::new();
    let profile = Profile::new("ayla", 3);

    t.write_secure(1, "H1", &profile, None).await.unwrap();
    assert_eq!(t.read_secure(1, "H1").await.unwrap(), Some(profile));
}

#[tokio::test]
async fn unknown_entity_reads_none() {
    let t = TestDb::new();
    assert_eq!(t.read_insecure(404).await.unwrap(), None);
    assert_eq!(t.read_secure(404, "H1").await.unwrap(), None);
}

#[tokio::test]
async fn secure_write_does_not_touch_insecure() {
    let t = TestDb::new();
    let shared = Profile::new("shared", 1);
    t.write_insecure(1, &shared, None).await.unwrap();

    t.write_secure(1, "H1", &Profile::new("secret", 9), None)
        .await
        .unwrap();
    assert_eq!(t.read_insecure(1).await.unwrap(), Some(shared));
}

#[tokio::test]
async fn insecure_write_does_not_touch_secure() {
    let t = TestDb::new();
    let secret = Profile::new("secret", 9);
    t.write_secure(1, "H1", &secret, None).await.unwrap();

    // The insecure partition is still empty, so nothing is expected
    t.write_insecure(1, &Profile::new("shared", 1), None)
        .await
        .unwrap();
    assert_eq!(t.read_secure(1, "H1").await.unwrap(), Some(secret));
}

#[tokio::test]
async fn secure_hashes_are_independent() {
    let t = TestDb::new();
    let first = Profile::new("first", 1);
    let second = Profile::new("second", 2);

    t.write_secure(1, "H1", &first, None).await.unwrap();
    t.write_secure(1, "H2", &second, None).await.unwrap();

    assert_eq!(t.read_secure(1, "H1").await.unwrap(), Some(first));
    assert_eq!(t.read_secure(1, "H2").await.unwrap(), Some(second));
    assert_eq!(t.read_secure(1, "H3").await.unwrap(), None);
    assert_eq!(t.stored(1).unwrap().secure_len(), 2);
}

#[tokio::test]
async fn entities_are_independent() {
    let t = TestDb::new();
    t.write_insecure(1, &Profile::new("one", 1), None)
        .await
        .unwrap();
    t.write_insecure(2, &Profile::new("two", 2), None)
        .await
        .unwrap();

    assert_eq!(t.read_insecure(1).await.unwrap().unwrap().name, "one");
    assert_eq!(t.read_insecure(2).await.unwrap().unwrap().name, "two");
}

#[tokio::test]
async fn caller_mutation_after_write_is_not_stored() {
    let t = TestDb::new();
    let mut profile = Profile::new("ayla", 3).with_item("sword");
    t.write_insecure(1, &profile, None).await.unwrap();

    profile.items.push("shield".to_string());
    profile.level = 99;

    let stored = t.read_insecure(1).await.unwrap().unwrap();
    assert_eq!(stored.items, vec!["sword".to_string()]);
    assert_eq!(stored.level, 3);
}

#[tokio::test]
async fn caller_mutation_after_read_is_not_stored() {
    let t = TestDb::new();
    t.write_insecure(1, &Profile::new("ayla", 3), None)
        .await
        .unwrap();

    let mut read = t.read_insecure(1).await.unwrap().unwrap();
    read.items.push("stolen".to_string());

    let again = t.read_insecure(1).await.unwrap().unwrap();
    assert!(again.items.is_empty());
}

#[tokio::test]
async fn empty_stored_record_reads_none() {
    let t = TestDb::new();
    let collection = t.create_collection();
    let tx = t.store.begin_transaction().unwrap();
    assert!(collection
        .try_add(&tx, 7, DataRecord::new(), std::time::Duration::from_secs(1))
        .await
        .unwrap());
    tx.commit().await.unwrap();

    assert_eq!(t.read_insecure(7).await.unwrap(), None);
    assert_eq!(t.read_secure(7, "H1").await.unwrap(), None);

    // and writes to it expect nothing
    t.write_insecure(7, &Profile::new("late", 1), None)
        .await
        .unwrap();
    assert_eq!(t.read_insecure(7).await.unwrap().unwrap().name, "late");
}
