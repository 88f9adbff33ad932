//! Cancellation: nothing is committed and every transaction is released.

use std::time::Duration;

use crate::common::*;

fn cancel_after(delay: Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        trigger.cancel();
    });
    cancel
}

#[tokio::test]
async fn cancelled_before_start() {
    let t = TestDb::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = t
        .db
        .write_insecure(1, &Profile::new("a", 1), None, &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    let err = t.db.get_insecure::<Profile>(1, &cancel).await.unwrap_err();
    assert!(err.is_cancelled());

    assert!(t.stored(1).is_none());
    assert_eq!(t.store.stats().begun, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_during_backoff() {
    let t = TestDb::new();
    t.store
        .faults()
        .fail_always(FaultPoint::Add, StoreFault::Timeout);
    let cancel = cancel_after(Duration::from_millis(5));

    let err = t
        .db
        .write_insecure(1, &Profile::new("a", 1), None, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, Error::Cancelled);
    assert!(t.stored(1).is_none());
    assert!(t.store.faults().calls(FaultPoint::Add) < 4);
    t.assert_no_open_transactions();
}

#[tokio::test(start_paused = true)]
async fn cancelled_while_waiting_for_update_lock() {
    let t = TestDb::new();
    let collection = t.create_collection();
    let a = Profile::new("a", 1);
    t.write_insecure(1, &a, None).await.unwrap();

    let holder = t.store.begin_transaction().unwrap();
    collection
        .try_get(&holder, &1, LockMode::Update, Duration::from_secs(1))
        .await
        .unwrap();

    let cancel = cancel_after(Duration::from_millis(100));
    let err = t
        .db
        .write_insecure(1, &Profile::new("b", 2), Some(&a), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, Error::Cancelled);

    // Only the holder is still open
    assert_eq!(t.store.stats().open(), 1);
    holder.abort();
    t.assert_no_open_transactions();
    assert_eq!(t.read_insecure(1).await.unwrap(), Some(a));
}

#[tokio::test(start_paused = true)]
async fn cancelled_read_during_backoff() {
    let t = TestDb::new();
    t.store
        .faults()
        .fail_always(FaultPoint::Get, StoreFault::TransactionFaulted);
    let cancel = cancel_after(Duration::from_millis(5));

    let err = t.db.get_insecure::<Profile>(1, &cancel).await.unwrap_err();
    assert_eq!(err, Error::Cancelled);
    t.assert_no_open_transactions();
}

#[tokio::test(start_paused = true)]
async fn cancelled_while_polling_for_collection() {
    let t = TestDb::without_collection();
    let cancel = cancel_after(Duration::from_millis(2500));

    let err = t.db.get_insecure::<Profile>(1, &cancel).await.unwrap_err();
    assert_eq!(err, Error::Cancelled);
    assert_eq!(t.store.faults().calls(FaultPoint::OpenCollection), 2);

    // The failed open was not cached; a later call polls again
    t.create_collection();
    assert_eq!(t.read_insecure(1).await.unwrap(), None);
    assert_eq!(t.store.faults().calls(FaultPoint::OpenCollection), 3);
}

#[tokio::test]
async fn cancelling_after_success_changes_nothing() {
    let t = TestDb::new();
    let cancel = CancellationToken::new();
    t.db
        .write_insecure(1, &Profile::new("a", 1), None, &cancel)
        .await
        .unwrap();
    cancel.cancel();

    assert_eq!(t.read_insecure(1).await.unwrap().unwrap().name, "a");
    assert_eq!(t.store.stats().committed, 1);
}
