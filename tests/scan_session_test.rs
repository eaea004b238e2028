mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{product, FakeCatalog, COOLDOWN, LOOKUP_TIMEOUT};
use inventory_scan::{
    catalog::CatalogLookup,
    scan::{DraftEdit, ScanController, ScanOutcome, ScanSession, ScanState, SessionClosed},
};
use rust_decimal_macros::dec;

const KNOWN: &str = "036000291452";

fn session(catalog: std::sync::Arc<FakeCatalog>) -> ScanSession {
    let lookup = CatalogLookup::with_timeout(catalog, LOOKUP_TIMEOUT);
    ScanSession::spawn(ScanController::new(lookup, COOLDOWN))
}

#[tokio::test]
async fn session_resolves_scans_after_activation() {
    let catalog = FakeCatalog::new(vec![product(9, "Cereal", KNOWN, dec!(3.20))]);
    let session = session(catalog.clone());

    assert_eq!(session.scan(KNOWN).await.unwrap(), ScanOutcome::Ignored);

    session.activate().await.unwrap();
    assert_eq!(session.state(), ScanState::Scanning);

    let outcome = session.scan(KNOWN).await.unwrap();
    assert_matches!(outcome, ScanOutcome::Found(p) if p.name == "Cereal");
    assert_matches!(session.state(), ScanState::Found { .. });

    session.dismiss().await.unwrap();
    assert_eq!(session.state(), ScanState::Scanning);
    assert_eq!(session.teardown().await, ScanState::Idle);
}

#[tokio::test]
async fn draft_can_be_edited_and_submitted_through_the_session() {
    let catalog = FakeCatalog::empty();
    let session = session(catalog.clone());
    session.activate().await.unwrap();

    assert_matches!(session.scan(KNOWN).await.unwrap(), ScanOutcome::NotFound(_));
    let edited = session
        .edit_draft(DraftEdit {
            name: Some("Cereal".into()),
            product_type: Some("Food".into()),
            price: Some("3.2".into()),
            supplier: Some("Mills".into()),
            image: None,
        })
        .await
        .unwrap();
    assert!(edited);

    let created = session.submit().await.unwrap();
    assert_matches!(created, Some(Ok(p)) if p.barcode == KNOWN);
    assert_eq!(session.state(), ScanState::Scanning);
    assert_eq!(catalog.create_calls(), 1);

    session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn teardown_during_lookup_discards_the_result() {
    let catalog = FakeCatalog::new(vec![product(9, "Cereal", KNOWN, dec!(3.20))]);
    catalog.set_delay(Some(Duration::from_secs(3)));
    let session = std::sync::Arc::new(session(catalog.clone()));
    session.activate().await.unwrap();

    let mut states = session.subscribe();
    let scanning = {
        let session = session.clone();
        tokio::spawn(async move { session.scan(KNOWN).await })
    };

    // wait until the lookup is in flight
    states
        .wait_for(|state| matches!(state, ScanState::LookingUp { .. }))
        .await
        .unwrap();

    let final_state = session.teardown().await;

    assert_eq!(final_state, ScanState::Idle);
    assert_eq!(scanning.await.unwrap(), Err(SessionClosed));
    assert_eq!(catalog.find_calls(), 1);

    // nothing is applied later either
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(session.state(), ScanState::Idle);
}

#[tokio::test(start_paused = true)]
async fn teardown_during_submit_does_not_wait_for_the_create() {
    let catalog = FakeCatalog::empty();
    let session = std::sync::Arc::new(session(catalog.clone()));
    session.activate().await.unwrap();

    assert_matches!(session.scan(KNOWN).await.unwrap(), ScanOutcome::NotFound(_));
    session
        .edit_draft(DraftEdit {
            name: Some("Cereal".into()),
            product_type: Some("Food".into()),
            price: Some("3.2".into()),
            supplier: Some("Mills".into()),
            image: None,
        })
        .await
        .unwrap();

    catalog.set_delay(Some(Duration::from_secs(3)));
    let submitting = {
        let session = session.clone();
        tokio::spawn(async move { session.submit().await })
    };
    while catalog.create_calls() == 0 {
        tokio::task::yield_now().await;
    }

    let started = tokio::time::Instant::now();
    let final_state = session.teardown().await;

    assert_eq!(final_state, ScanState::Idle);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(submitting.await.unwrap(), Err(SessionClosed));
    assert!(catalog.created().is_empty());
}

#[tokio::test]
async fn commands_after_teardown_fail() {
    let session = session(FakeCatalog::empty());
    session.activate().await.unwrap();
    session.teardown().await;

    assert_eq!(session.activate().await, Err(SessionClosed));
    assert_eq!(session.scan(KNOWN).await, Err(SessionClosed));
}
