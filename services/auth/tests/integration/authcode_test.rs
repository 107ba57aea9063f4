use chrono::{Duration, Utc};

use repassia_auth::error::AuthServiceError;
use repassia_auth::usecase::authcode::{
    RequestCodeInput, RequestCodeUseCase, VerifyCodeInput, VerifyCodeUseCase,
};
use repassia_auth::usecase::token::verify_access_token;

use crate::helpers::{
    MockAuthCodeRepo, MockProfileRepo, MockRefreshTokenRepo, TEST_JWT_SECRET, test_auth_code,
    test_profile, test_settings,
};

fn request_usecase(
    profiles: MockProfileRepo,
    auth_codes: MockAuthCodeRepo,
) -> RequestCodeUseCase<MockProfileRepo, MockAuthCodeRepo> {
    RequestCodeUseCase {
        profiles,
        auth_codes,
        settings: test_settings(),
    }
}

fn verify_usecase(
    profiles: MockProfileRepo,
    auth_codes: MockAuthCodeRepo,
    refresh_tokens: MockRefreshTokenRepo,
) -> VerifyCodeUseCase<MockProfileRepo, MockAuthCodeRepo, MockRefreshTokenRepo> {
    VerifyCodeUseCase {
        profiles,
        auth_codes,
        refresh_tokens,
        settings: test_settings(),
    }
}

// ── RequestCodeUseCase ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_issue_code_and_outbox_event_for_active_profile() {
    let profile = test_profile();
    let auth_codes = MockAuthCodeRepo::empty();

    let out = request_usecase(MockProfileRepo::new(vec![profile.clone()]), auth_codes.clone())
        .execute(RequestCodeInput {
            email: profile.email.clone(),
        })
        .await
        .unwrap();

    assert_eq!(out.code.len(), 6, "default code length is 6 digits");
    assert!(out.code.bytes().all(|b| b.is_ascii_digit()));
    assert_eq!(out.profile_name, profile.name);

    let remaining = out.expires_at - Utc::now();
    assert!(remaining > Duration::minutes(14) && remaining <= Duration::minutes(15));

    let codes = auth_codes.codes.lock().unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].email, profile.email);
    assert_eq!(codes[0].code, out.code);
    assert!(!codes[0].used);

    let events = auth_codes.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.kind, "auth_code_requested");
    assert_eq!(event.aggregate_id, codes[0].id);
    assert_eq!(event.idempotency_key, format!("auth_code_requested:{}", codes[0].id));
    assert_eq!(event.payload["email"], profile.email);
    assert_eq!(event.payload["name"], profile.name);
    assert_eq!(event.payload["code"], out.code);
}

#[tokio::test]
async fn should_honor_configured_code_length() {
    let profile = test_profile();
    let mut settings = (*test_settings()).clone();
    settings.code_length = 8;

    let uc = RequestCodeUseCase {
        profiles: MockProfileRepo::new(vec![profile.clone()]),
        auth_codes: MockAuthCodeRepo::empty(),
        settings: std::sync::Arc::new(settings),
    };
    let out = uc
        .execute(RequestCodeInput {
            email: profile.email,
        })
        .await
        .unwrap();
    assert_eq!(out.code.len(), 8);
}

#[tokio::test]
async fn should_reject_unknown_email() {
    let result = request_usecase(MockProfileRepo::empty(), MockAuthCodeRepo::empty())
        .execute(RequestCodeInput {
            email: "a@x.com".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::NotFoundOrInactive)),
        "expected NotFoundOrInactive, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_inactive_profile_like_unknown_email() {
    let profile = test_profile();
    let profiles = MockProfileRepo::new(vec![profile.clone()]);
    profiles.deactivate(profile.id);

    let auth_codes = MockAuthCodeRepo::empty();
    let result = request_usecase(profiles, auth_codes.clone())
        .execute(RequestCodeInput {
            email: profile.email,
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::NotFoundOrInactive)),
        "expected NotFoundOrInactive, got {result:?}"
    );
    assert!(auth_codes.codes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_rate_limit_fourth_request_within_window() {
    let profile = test_profile();
    let uc = request_usecase(
        MockProfileRepo::new(vec![profile.clone()]),
        MockAuthCodeRepo::empty(),
    );

    for _ in 0..3 {
        uc.execute(RequestCodeInput {
            email: profile.email.clone(),
        })
        .await
        .unwrap();
    }

    let result = uc
        .execute(RequestCodeInput {
            email: profile.email.clone(),
        })
        .await;
    assert!(
        matches!(result, Err(AuthServiceError::RateLimited)),
        "expected RateLimited, got {result:?}"
    );
}

#[tokio::test]
async fn should_admit_one_of_two_concurrent_requests_at_the_limit() {
    let profile = test_profile();
    let auth_codes = MockAuthCodeRepo::new(vec![
        test_auth_code(&profile.email, "111111"),
        test_auth_code(&profile.email, "222222"),
    ]);
    let uc = request_usecase(
        MockProfileRepo::new(vec![profile.clone()]),
        auth_codes.clone(),
    );
    let input = || RequestCodeInput {
        email: profile.email.clone(),
    };

    let (first, second) = tokio::join!(uc.execute(input()), uc.execute(input()));

    let limited = [&first, &second]
        .iter()
        .filter(|r| matches!(r, Err(AuthServiceError::RateLimited)))
        .count();
    assert_eq!(limited, 1, "got {first:?} and {second:?}");
    assert!(first.is_ok() || second.is_ok());
    assert_eq!(auth_codes.codes.lock().unwrap().len(), 3);
    assert_eq!(auth_codes.events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_write_nothing_when_rate_limited() {
    let profile = test_profile();
    let auth_codes = MockAuthCodeRepo::new(vec![
        test_auth_code(&profile.email, "111111"),
        test_auth_code(&profile.email, "222222"),
        test_auth_code(&profile.email, "333333"),
    ]);
    let uc = request_usecase(
        MockProfileRepo::new(vec![profile.clone()]),
        auth_codes.clone(),
    );

    let result = uc
        .execute(RequestCodeInput {
            email: profile.email,
        })
        .await;

    assert!(matches!(result, Err(AuthServiceError::RateLimited)));
    assert_eq!(auth_codes.codes.lock().unwrap().len(), 3);
    assert!(auth_codes.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_not_count_codes_outside_window_or_already_used() {
    let profile = test_profile();
    let mut old = test_auth_code(&profile.email, "111111");
    old.created_at = Utc::now() - Duration::minutes(16);
    let mut old2 = old.clone();
    old2.id = uuid::Uuid::new_v4();
    let mut used = test_auth_code(&profile.email, "222222");
    used.used = true;
    let recent = test_auth_code(&profile.email, "333333");

    let uc = request_usecase(
        MockProfileRepo::new(vec![profile.clone()]),
        MockAuthCodeRepo::new(vec![old, old2, used, recent]),
    );

    let result = uc
        .execute(RequestCodeInput {
            email: profile.email,
        })
        .await;
    assert!(result.is_ok(), "expected success, got {result:?}");
}

// ── VerifyCodeUseCase ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_verify_code_exactly_once() {
    let profile = test_profile();
    let profiles = MockProfileRepo::new(vec![profile.clone()]);
    let auth_codes = MockAuthCodeRepo::new(vec![test_auth_code(&profile.email, "123456")]);
    let refresh_tokens = MockRefreshTokenRepo::empty();
    let uc = verify_usecase(profiles.clone(), auth_codes, refresh_tokens.clone());

    let out = uc
        .execute(VerifyCodeInput {
            email: profile.email.clone(),
            code: "123456".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(out.profile.id, profile.id);
    assert_eq!(
        verify_access_token(&out.access_token.token, TEST_JWT_SECRET).unwrap(),
        profile.id
    );
    let stored = refresh_tokens.find(&out.refresh_token).unwrap();
    assert_eq!(stored.profile_id, profile.id);
    assert!(!stored.revoked);
    assert!(profiles.get(profile.id).unwrap().last_login_at.is_some());

    let again = uc
        .execute(VerifyCodeInput {
            email: profile.email,
            code: "123456".to_owned(),
        })
        .await;
    assert!(
        matches!(again, Err(AuthServiceError::InvalidOrExpired)),
        "expected InvalidOrExpired, got {again:?}"
    );
}

#[tokio::test]
async fn should_reject_expired_code() {
    let profile = test_profile();
    let mut code = test_auth_code(&profile.email, "123456");
    code.created_at = Utc::now() - Duration::minutes(20);
    code.expires_at = Utc::now() - Duration::minutes(5);

    let result = verify_usecase(
        MockProfileRepo::new(vec![profile.clone()]),
        MockAuthCodeRepo::new(vec![code]),
        MockRefreshTokenRepo::empty(),
    )
    .execute(VerifyCodeInput {
        email: profile.email,
        code: "123456".to_owned(),
    })
    .await;

    assert!(
        matches!(result, Err(AuthServiceError::InvalidOrExpired)),
        "expected InvalidOrExpired, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_code_issued_to_another_email() {
    let profile = test_profile();
    let result = verify_usecase(
        MockProfileRepo::new(vec![profile.clone()]),
        MockAuthCodeRepo::new(vec![test_auth_code("someone@example.com", "123456")]),
        MockRefreshTokenRepo::empty(),
    )
    .execute(VerifyCodeInput {
        email: profile.email,
        code: "123456".to_owned(),
    })
    .await;

    assert!(matches!(result, Err(AuthServiceError::InvalidOrExpired)));
}

#[tokio::test]
async fn should_consume_newest_matching_code() {
    let profile = test_profile();
    let mut older = test_auth_code(&profile.email, "123456");
    older.created_at = Utc::now() - Duration::minutes(5);
    let newer = test_auth_code(&profile.email, "123456");
    let newer_id = newer.id;
    let auth_codes = MockAuthCodeRepo::new(vec![older, newer]);

    verify_usecase(
        MockProfileRepo::new(vec![profile.clone()]),
        auth_codes.clone(),
        MockRefreshTokenRepo::empty(),
    )
    .execute(VerifyCodeInput {
        email: profile.email,
        code: "123456".to_owned(),
    })
    .await
    .unwrap();

    let codes = auth_codes.codes.lock().unwrap();
    let used: Vec<_> = codes.iter().filter(|c| c.used).map(|c| c.id).collect();
    assert_eq!(used, vec![newer_id]);
}

#[tokio::test]
async fn should_let_only_one_concurrent_redemption_win() {
    let profile = test_profile();
    // Both callers read the code as unused; the conditional mark-used decides.
    let auth_codes =
        MockAuthCodeRepo::new(vec![test_auth_code(&profile.email, "654321")]).with_stale_reads();
    let refresh_tokens = MockRefreshTokenRepo::empty();
    let uc = verify_usecase(
        MockProfileRepo::new(vec![profile.clone()]),
        auth_codes,
        refresh_tokens.clone(),
    );

    let input = || VerifyCodeInput {
        email: profile.email.clone(),
        code: "654321".to_owned(),
    };
    let (first, second) = tokio::join!(uc.execute(input()), uc.execute(input()));

    let wins = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one redemption must succeed");
    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(AuthServiceError::InvalidOrExpired)));
    assert_eq!(refresh_tokens.tokens.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_reject_inactive_profile_after_consuming_code() {
    let profile = test_profile();
    let profiles = MockProfileRepo::new(vec![profile.clone()]);
    profiles.deactivate(profile.id);
    let auth_codes = MockAuthCodeRepo::new(vec![test_auth_code(&profile.email, "123456")]);
    let refresh_tokens = MockRefreshTokenRepo::empty();

    let result = verify_usecase(profiles, auth_codes.clone(), refresh_tokens.clone())
        .execute(VerifyCodeInput {
            email: profile.email,
            code: "123456".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::ProfileInactive)),
        "expected ProfileInactive, got {result:?}"
    );
    assert!(auth_codes.codes.lock().unwrap()[0].used);
    assert!(refresh_tokens.tokens.lock().unwrap().is_empty());
}
