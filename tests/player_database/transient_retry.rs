//! Bounded retry of transient store faults.

use std::time::Duration;

use crate::common::*;

#[tokio::test(start_paused = true)]
async fn read_recovers_after_two_timeouts() {
    let t = TestDb::new();
    let profile = Profile::new("a", 1);
    t.write_insecure(1, &profile, None).await.unwrap();
    let gets_before = t.store.faults().calls(FaultPoint::Get);
    t.store
        .faults()
        .fail_next(FaultPoint::Get, StoreFault::Timeout, 2);

    assert_eq!(t.read_insecure(1).await.unwrap(), Some(profile));
    assert_eq!(t.store.faults().calls(FaultPoint::Get) - gets_before, 3);
    t.assert_no_open_transactions();
}

#[tokio::test(start_paused = true)]
async fn read_gives_up_after_four_attempts() {
    let t = TestDb::new();
    t.store
        .faults()
        .fail_always(FaultPoint::Get, StoreFault::Timeout);

    let err = t.read_insecure(1).await.unwrap_err();
    assert_eq!(
        err,
        Error::Timeout {
            attempts: 4,
            last: StoreFault::Timeout
        }
    );
    assert_eq!(t.store.faults().calls(FaultPoint::Get), 4);
    t.assert_no_open_transactions();
}

#[tokio::test(start_paused = true)]
async fn read_timeout_wraps_transaction_fault() {
    let t = TestDb::new();
    t.store
        .faults()
        .fail_always(FaultPoint::Get, StoreFault::TransactionFaulted);

    let err = t.read_secure(1, "H1").await.unwrap_err();
    assert!(err.is_timeout());
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), StoreFault::TransactionFaulted.to_string());
}

#[tokio::test(start_paused = true)]
async fn write_recovers_after_two_timeouts() {
    let t = TestDb::new();
    let a = Profile::new("a", 1);
    let b = Profile::new("b", 2);
    t.write_insecure(1, &a, None).await.unwrap();
    t.store
        .faults()
        .fail_next(FaultPoint::Update, StoreFault::Timeout, 2);

    t.write_insecure(1, &b, Some(&a)).await.unwrap();
    assert_eq!(t.read_insecure(1).await.unwrap(), Some(b));
    assert_eq!(t.store.faults().calls(FaultPoint::Update), 3);
    t.assert_no_open_transactions();
}

#[tokio::test(start_paused = true)]
async fn write_gives_up_after_four_attempts() {
    let t = TestDb::new();
    t.store
        .faults()
        .fail_always(FaultPoint::Get, StoreFault::Timeout);

    let err = t
        .write_insecure(1, &Profile::new("a", 1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { attempts: 4, .. }));
    assert_eq!(t.store.faults().calls(FaultPoint::Get), 4);
    assert_eq!(t.store.stats().committed, 0);
    t.assert_no_open_transactions();
}

#[tokio::test(start_paused = true)]
async fn commit_timeout_is_retried_without_double_apply() {
    let t = TestDb::new();
    t.store
        .faults()
        .fail_next(FaultPoint::Commit, StoreFault::Timeout, 1);

    t.write_insecure(1, &Profile::new("a", 1), None)
        .await
        .unwrap();
    assert_eq!(t.store.faults().calls(FaultPoint::Add), 2);
    assert_eq!(t.store.stats().committed, 1);
    assert_eq!(t.read_insecure(1).await.unwrap().unwrap().name, "a");
}

#[tokio::test(start_paused = true)]
async fn update_lock_timeout_is_retried() {
    let t = TestDb::new();
    let collection = t.create_collection();
    t.write_insecure(1, &Profile::new("a", 1), None)
        .await
        .unwrap();

    // Another transaction holds the update lock for 1.5s
    let holder = t.store.begin_transaction().unwrap();
    collection
        .try_get(&holder, &1, LockMode::Update, Duration::from_secs(1))
        .await
        .unwrap();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        holder.abort();
    });

    t.write_insecure(1, &Profile::new("b", 2), Some(&Profile::new("a", 1)))
        .await
        .unwrap();
    assert_eq!(t.read_insecure(1).await.unwrap().unwrap().name, "b");
}

#[tokio::test(start_paused = true)]
async fn backoff_waits_are_bounded() {
    let t = TestDb::new();
    t.store
        .faults()
        .fail_always(FaultPoint::Get, StoreFault::Timeout);

    let started = tokio::time::Instant::now();
    t.read_insecure(1).await.unwrap_err();

    // Three waits in [10ms, 500ms), [10ms, 1s), [10ms, 2s)
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(30));
    assert!(elapsed < Duration::from_millis(3500));
}

#[tokio::test]
async fn non_transient_faults_surface_unchanged() {
    let t = TestDb::new();
    t.store
        .faults()
        .fail_always(FaultPoint::Get, StoreFault::Closed);

    assert_eq!(
        t.read_insecure(1).await.unwrap_err(),
        Error::Store(StoreFault::Closed)
    );
    assert_eq!(t.store.faults().calls(FaultPoint::Get), 1);
    t.assert_no_open_transactions();
}

#[tokio::test(start_paused = true)]
async fn custom_attempt_budget() {
    let config = PlayerDbConfig {
        access_attempts: 2,
        ..Default::default()
    };
    let t = TestDb::with_config(config);
    t.create_collection();
    t.store
        .faults()
        .fail_always(FaultPoint::Get, StoreFault::Timeout);

    let err = t.read_insecure(1).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { attempts: 2, .. }));
    assert_eq!(t.store.faults().calls(FaultPoint::Get), 2);
}
