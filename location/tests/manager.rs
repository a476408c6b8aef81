use std::sync::Arc;

use trackkit_location::mock::{MockBackend, fix_at};
use trackkit_location::{AuthorizationLevel, AuthorizationStatus, Fix, LocationManager};

#[test]
fn last_fix_is_empty_until_an_update_arrives() {
    let backend = Arc::new(MockBackend::default());
    let manager = LocationManager::new(backend, AuthorizationLevel::Always);

    assert_eq!(manager.last_fix(), None);
}

#[test]
fn continuous_updates_keep_the_latest_fix() {
    let backend = Arc::new(MockBackend::default());
    let manager = LocationManager::new(backend.clone(), AuthorizationLevel::Always);

    manager.start_continuous().unwrap();
    let a = fix_at(40.71, -74.00);
    let b = fix_at(40.72, -74.01);
    backend.deliver_update(a);
    backend.deliver_update(b.clone());

    assert_eq!(manager.last_fix(), Some(b));
    assert_eq!(backend.update_starts(), 1);
}

#[test]
fn start_continuous_is_idempotent() {
    let backend = Arc::new(MockBackend::default());
    let manager = LocationManager::new(backend.clone(), AuthorizationLevel::Always);

    manager.start_continuous().unwrap();
    manager.start_continuous().unwrap();

    assert!(manager.acquirer().is_continuous());
    assert_eq!(backend.update_starts(), 1);
}

#[test]
fn authorization_grant_starts_sampling_once() {
    let backend = Arc::new(MockBackend::new(AuthorizationStatus::NotDetermined));
    let manager = LocationManager::new(backend.clone(), AuthorizationLevel::WhenInUse);

    backend.change_authorization(AuthorizationStatus::AuthorizedWhenInUse);
    backend.change_authorization(AuthorizationStatus::AuthorizedAlways);

    assert!(manager.gate().is_sampling());
    assert_eq!(backend.update_starts(), 1);
}

#[test]
fn grant_after_startup_sampling_does_not_restart() {
    let backend = Arc::new(MockBackend::new(AuthorizationStatus::NotDetermined));
    let manager = LocationManager::new(backend.clone(), AuthorizationLevel::WhenInUse);

    manager.start_continuous().unwrap();
    backend.change_authorization(AuthorizationStatus::AuthorizedWhenInUse);

    assert_eq!(backend.update_starts(), 1);
}

#[test]
fn not_determined_then_denied_requests_once() {
    let backend = Arc::new(MockBackend::new(AuthorizationStatus::NotDetermined));
    let manager = LocationManager::new(backend.clone(), AuthorizationLevel::Always);

    backend.change_authorization(AuthorizationStatus::NotDetermined);
    backend.change_authorization(AuthorizationStatus::Denied);

    assert_eq!(backend.authorization_requests(), 1);
    assert_eq!(backend.update_starts(), 0);
    assert!(!manager.gate().is_sampling());
}

#[tokio::test(start_paused = true)]
async fn prepare_prompt_grant_starts_sampling() {
    let backend = Arc::new(
        MockBackend::new(AuthorizationStatus::NotDetermined)
            .granting(AuthorizationStatus::AuthorizedAlways),
    );
    let manager = LocationManager::new(backend.clone(), AuthorizationLevel::Always);

    let status = manager.prepare(std::time::Duration::from_secs(5)).await;

    assert_eq!(status, AuthorizationStatus::AuthorizedAlways);
    assert_eq!(backend.authorization_requests(), 1);
    assert_eq!(backend.update_starts(), 1);
}

#[test]
fn coordinate_validation() {
    let fix = fix_at(91.0, 0.0);
    assert!(!fix.has_valid_coordinates());

    let fix = Fix {
        longitude: f64::NAN,
        ..fix_at(0.0, 0.0)
    };
    assert!(!fix.has_valid_coordinates());
    assert!(fix_at(-90.0, 180.0).has_valid_coordinates());
}
