//! OTP Login Integration Tests
//!
//! Login-code issue, cooldown, expiry, single use and mail failure, driven
//! through the auth service over the in-memory store.
//!
//! Run: cargo test --test otp_login_test

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio_test::{assert_err, assert_ok};

use digital_house_api::error::AppError;
use digital_house_api::models::{NewOtp, NewUser, UserStatus};
use digital_house_api::security::otp::hash_code;
use digital_house_api::services::{AuthService, OtpDispatch, OtpError, OtpService};

mod test_harness;
use test_harness::{FailingMailer, TestApp};

#[tokio::test]
async fn test_otp_round_trip_succeeds_exactly_once() {
    let app = TestApp::new();
    let user = app.approved_member("Kavya", "kavya@example.com", Some("Salem")).await;
    let auth = AuthService::new(&app.state);

    let dispatch = assert_ok!(auth.request_login("Kavya@Example.com ").await);
    assert_eq!(dispatch, OtpDispatch::Sent);

    let code = app
        .mailer
        .last_code_for("kavya@example.com")
        .await
        .expect("OTP mail recorded");

    let (logged_in, token) = assert_ok!(auth.verify_login("kavya@example.com", &code).await);
    assert_eq!(logged_in.id, user.id);
    assert!(!token.is_empty());

    let second = auth.verify_login("kavya@example.com", &code).await;
    assert!(
        matches!(second, Err(AppError::Otp(OtpError::AlreadyUsed))),
        "reusing a code must fail: {:?}",
        second.err()
    );
}

#[tokio::test]
async fn test_wrong_code_is_invalid_and_keeps_row_usable() {
    let app = TestApp::new();
    app.approved_member("Arun", "arun@example.com", None).await;
    let auth = AuthService::new(&app.state);

    auth.request_login("arun@example.com").await.unwrap();
    let code = app.mailer.last_code_for("arun@example.com").await.unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let result = auth.verify_login("arun@example.com", wrong).await;
    assert!(matches!(result, Err(AppError::Otp(OtpError::InvalidCode))));

    assert_ok!(auth.verify_login("arun@example.com", &code).await);
}

#[tokio::test]
async fn test_expired_code_fails_even_when_correct() {
    let app = TestApp::new();
    let user = app.approved_member("Devi", "devi@example.com", None).await;
    let pepper = app.state.config.otp.hash_pepper.clone();
    let now = Utc::now();

    app.store
        .insert_otp(&NewOtp {
            user_id: user.id,
            otp_hash: hash_code(&pepper, "devi@example.com", "482913"),
            expires_at: now - Duration::minutes(1),
            created_at: now - Duration::minutes(6),
        })
        .await;

    let result = OtpService::new(&app.state)
        .verify(user.id, "devi@example.com", "482913")
        .await;
    assert!(matches!(result, Err(AppError::Otp(OtpError::Expired))));
}

#[tokio::test]
async fn test_verify_without_any_code_is_not_found() {
    let app = TestApp::new();
    let user = app.approved_member("Ravi", "ravi@example.com", None).await;

    let result = OtpService::new(&app.state)
        .verify(user.id, "ravi@example.com", "123456")
        .await;
    assert!(matches!(result, Err(AppError::Otp(OtpError::NotFound))));
}

#[tokio::test]
async fn test_cooldown_persists_a_single_row() {
    let app = TestApp::new();
    let user = app.approved_member("Meena", "meena@example.com", None).await;
    let auth = AuthService::new(&app.state);

    assert_eq!(auth.request_login("meena@example.com").await.unwrap(), OtpDispatch::Sent);
    assert_eq!(
        auth.request_login("meena@example.com").await.unwrap(),
        OtpDispatch::Throttled
    );

    assert_eq!(app.store.otp_rows(user.id).await.len(), 1);
    assert_eq!(app.mailer.sent().await.len(), 1);
}

#[tokio::test]
async fn test_new_code_supersedes_older_unused_codes() {
    let app = TestApp::new();
    let user = app.approved_member("Selvi", "selvi@example.com", None).await;
    let pepper = app.state.config.otp.hash_pepper.clone();
    let issued = Utc::now() - Duration::minutes(3);

    app.store
        .insert_otp(&NewOtp {
            user_id: user.id,
            otp_hash: hash_code(&pepper, "selvi@example.com", "111222"),
            expires_at: issued + Duration::minutes(5),
            created_at: issued,
        })
        .await;

    AuthService::new(&app.state)
        .request_login("selvi@example.com")
        .await
        .unwrap();

    let rows = app.store.otp_rows(user.id).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.iter().filter(|r| !r.is_used).count(), 1);
}

#[tokio::test]
async fn test_mail_failure_blocks_login_request() {
    let app = TestApp::with_mailer(Arc::new(FailingMailer));
    app.approved_member("Gopal", "gopal@example.com", None).await;

    let err = assert_err!(AuthService::new(&app.state).request_login("gopal@example.com").await);
    assert!(matches!(err, AppError::ServiceUnavailable(_)));
    assert_eq!(err.status().as_u16(), 503);
}

#[tokio::test]
async fn test_only_approved_members_get_codes() {
    let app = TestApp::new();
    let pending = app.pending_member("Latha", "latha@example.com", None).await;
    let rejected = app.pending_member("Mani", "mani@example.com", None).await;
    app.store.set_status(rejected.id, UserStatus::Rejected).await;
    let auth = AuthService::new(&app.state);

    assert!(matches!(
        auth.request_login("latha@example.com").await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        auth.request_login("mani@example.com").await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        auth.request_login("nobody@example.com").await,
        Err(AppError::NotFound(_))
    ));
    assert!(app.store.otp_rows(pending.id).await.is_empty());
}

#[tokio::test]
async fn test_register_rejects_duplicate_email_and_mobile() {
    let app = TestApp::new();
    let existing = app.pending_member("Anbu", "anbu@example.com", None).await;
    let auth = AuthService::new(&app.state);

    let duplicate_email = auth
        .register(NewUser {
            full_name: "Other".to_string(),
            email: "ANBU@example.com".to_string(),
            mobile: Some("9000000000".to_string()),
            ..Default::default()
        })
        .await;
    match duplicate_email {
        Err(AppError::Validation { message, .. }) => {
            assert_eq!(message, "An account with this email already exists.")
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let duplicate_mobile = auth
        .register(NewUser {
            full_name: "Other".to_string(),
            email: "other@example.com".to_string(),
            mobile: existing.mobile.clone(),
            ..Default::default()
        })
        .await;
    match duplicate_mobile {
        Err(AppError::Validation { message, .. }) => {
            assert_eq!(message, "An account with this mobile number already exists.")
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}
