//! Compare-and-set: expected-previous validation and lost races.

use crate::common::*;

#[tokio::test]
async fn write_with_current_value_succeeds() {
    let t = TestDb::new();
    let a = Profile::new("a", 1);
    let b = Profile::new("b", 2);

    t.write_insecure(1, &a, None).await.unwrap();
    t.write_insecure(1, &b, Some(&a)).await.unwrap();
    assert_eq!(t.read_insecure(1).await.unwrap(), Some(b));
}

#[tokio::test]
async fn write_with_stale_value_is_rejected() {
    let t = TestDb::new();
    let a = Profile::new("a", 1);
    let b = Profile::new("b", 2);
    let c = Profile::new("c", 3);

    t.write_insecure(1, &a, None).await.unwrap();
    t.write_insecure(1, &b, Some(&a)).await.unwrap();

    let err = t.write_insecure(1, &c, Some(&a)).await.unwrap_err();
    assert_eq!(err, Error::conflict(1, ConflictReason::ValueMismatch));
    assert_eq!(t.read_insecure(1).await.unwrap(), Some(b));
    t.assert_no_open_transactions();
}

#[tokio::test]
async fn expected_value_compared_structurally() {
    let t = TestDb::new();
    let a = Profile::new("a", 1).with_item("x");
    t.write_insecure(1, &a, None).await.unwrap();

    // An equal value built separately is accepted
    let rebuilt = Profile::new("a", 1).with_item("x");
    t.write_insecure(1, &Profile::new("b", 2), Some(&rebuilt))
        .await
        .unwrap();
}

#[tokio::test]
async fn expecting_a_value_where_none_exists() {
    let t = TestDb::new();
    let err = t
        .write_insecure(1, &Profile::new("a", 1), Some(&Profile::new("ghost", 0)))
        .await
        .unwrap_err();

    assert_eq!(
        err.conflict_reason(),
        Some(ConflictReason::ExistenceMismatch {
            expected_present: true,
            found_present: false,
        })
    );
    assert!(t.stored(1).is_none());
}

#[tokio::test]
async fn expecting_nothing_where_a_value_exists() {
    let t = TestDb::new();
    let a = Profile::new("a", 1);
    t.write_insecure(1, &a, None).await.unwrap();

    let err = t
        .write_insecure(1, &Profile::new("b", 2), None)
        .await
        .unwrap_err();
    assert_eq!(
        err.conflict_reason(),
        Some(ConflictReason::ExistenceMismatch {
            expected_present: false,
            found_present: true,
        })
    );
    assert_eq!(t.read_insecure(1).await.unwrap(), Some(a));
}

#[tokio::test]
async fn secure_expectation_checked_against_its_own_hash() {
    let t = TestDb::new();
    let h1 = Profile::new("h1", 1);
    t.write_secure(1, "H1", &h1, None).await.unwrap();

    // H2 holds nothing, even though H1 does
    let err = t
        .write_secure(1, "H2", &Profile::new("h2", 2), Some(&h1))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    t.write_secure(1, "H2", &Profile::new("h2", 2), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn lost_race_on_add_is_a_conflict() {
    let t = TestDb::new();
    t.store.faults().reject_next(FaultPoint::Add, 1);

    let err = t
        .write_insecure(1, &Profile::new("a", 1), None)
        .await
        .unwrap_err();
    assert_eq!(err, Error::conflict(1, ConflictReason::LostRace));
    assert_eq!(t.store.faults().calls(FaultPoint::Add), 1);
    assert!(t.stored(1).is_none());
    t.assert_no_open_transactions();
}

#[tokio::test]
async fn lost_race_on_update_is_a_conflict() {
    let t = TestDb::new();
    let a = Profile::new("a", 1);
    t.write_insecure(1, &a, None).await.unwrap();
    t.store.faults().reject_next(FaultPoint::Update, 1);

    let err = t
        .write_insecure(1, &Profile::new("b", 2), Some(&a))
        .await
        .unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::LostRace));
    assert_eq!(t.store.faults().calls(FaultPoint::Update), 1);
    assert_eq!(t.read_insecure(1).await.unwrap(), Some(a));
}

#[tokio::test]
async fn conflicts_are_not_retried() {
    let t = TestDb::new();
    t.write_insecure(1, &Profile::new("a", 1), None)
        .await
        .unwrap();
    let gets_before = t.store.faults().calls(FaultPoint::Get);

    t.write_insecure(1, &Profile::new("b", 2), None)
        .await
        .unwrap_err();
    assert_eq!(t.store.faults().calls(FaultPoint::Get) - gets_before, 1);
}
