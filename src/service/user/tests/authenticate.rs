use chrono::Duration;

use crate::{
    error::auth::AuthError,
    store::SortOrder,
    util::{
        telemetry::AUTH_FAILURES_TOTAL,
        test::{counter_value, record_telemetry},
        time,
    },
};

use super::*;

/// Expect Ok with the user, an Ok standing and refreshed activity
#[tokio::test]
async fn authenticates_with_secret() -> Result<(), TestError> {
    let test = test_setup_with_user_tables!()?;
    let state = state_over(&test.db);
    let ctx = state.request(constant::TEST_IP, None);
    let user_service = UserService::new(&ctx);

    let registered = user_service.register(new_user("alice")).await.unwrap();
    let (user, status) = user_service
        .authenticate("ALICE", &registered.secret)
        .await
        .unwrap();

    assert_eq!(user.id, registered.user.id);
    assert_eq!(status, SubscriptionStatus::Ok);
    assert!(user.last_active >= registered.user.last_active);

    let active = state
        .cache
        .zrange_by_score(
            keys::USERS_BY_LAST_ACTIVE,
            f64::NEG_INFINITY,
            f64::INFINITY,
            SortOrder::Descending,
            None,
        )
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].0, user.id.to_string());

    Ok(())
}

/// Expect unknown users and wrong secrets to fail identically and be counted
#[tokio::test]
async fn fails_identically_for_unknown_user_and_wrong_secret() -> Result<(), TestError> {
    let test = test_setup_with_user_tables!()?;
    let mut state = state_over(&test.db);
    let telemetry = record_telemetry(&mut state);
    let ctx = state.request(constant::TEST_IP, None);
    let user_service = UserService::new(&ctx);

    let registered = user_service.register(new_user("alice")).await.unwrap();
    let wrong_secret = user_service.authenticate("alice", &"0".repeat(128)).await;
    let unknown_user = user_service
        .authenticate("nobody", &registered.secret)
        .await;
    let short_secret = user_service.authenticate("alice", "ab").await;

    for result in [wrong_secret, unknown_user, short_secret] {
        assert!(matches!(
            result,
            Err(Error::AuthError(AuthError::InvalidCredentials))
        ));
    }
    assert_eq!(counter_value(&telemetry, AUTH_FAILURES_TOTAL), 3);

    Ok(())
}

/// Expect the standing of a lapsed subscription to be reported
#[tokio::test]
async fn reports_lapsed_subscription() -> Result<(), TestError> {
    let mut test = test_setup_with_user_tables!()?;
    test.user()
        .insert_user_with_subscription("grace", time::now() - Duration::days(1))
        .await?;
    test.user()
        .insert_user_with_subscription("expired", time::now() - Duration::days(10))
        .await?;

    let state = state_over(&test.db);
    let ctx = state.request(constant::TEST_IP, None);
    let user_service = UserService::new(&ctx);

    let (_, grace) = user_service
        .authenticate("grace", &factory::mock_secret())
        .await
        .unwrap();
    let (_, expired) = user_service
        .authenticate("expired", &factory::mock_secret())
        .await
        .unwrap();

    assert!(matches!(grace, SubscriptionStatus::GraceWarning { .. }));
    assert!(matches!(expired, SubscriptionStatus::Expired { .. }));
    assert_eq!(
        expired.into_result().map_err(Error::from).unwrap_err().kind(),
        ErrorKind::SubscriptionExpired
    );

    Ok(())
}

/// Expect Ok standing when subscriptions are disabled
#[tokio::test]
async fn ignores_subscriptions_when_disabled() -> Result<(), TestError> {
    let mut test = test_setup_with_user_tables!()?;
    test.user()
        .insert_user_with_subscription("expired", time::now() - Duration::days(10))
        .await?;

    let state = state_with_config(
        &test,
        Config {
            use_subscriptions: false,
            ..Default::default()
        },
    );
    let ctx = state.request(constant::TEST_IP, None);

    let (_, status) = UserService::new(&ctx)
        .authenticate("expired", &factory::mock_secret())
        .await
        .unwrap();

    assert_eq!(status, SubscriptionStatus::Ok);

    Ok(())
}

/// Expect authentication to succeed without refreshing activity in maintenance mode
#[tokio::test]
async fn skips_activity_in_maintenance_mode() -> Result<(), TestError> {
    let mut test = test_setup_with_user_tables!()?;
    let (fixture, _) = test
        .user()
        .insert_user_with_subscription("alice", time::now() + Duration::days(10))
        .await?;

    let state = state_with_config(
        &test,
        Config {
            maintenance_mode: true,
            ..Default::default()
        },
    );
    let ctx = state.request(constant::TEST_IP, None);

    let (user, _) = UserService::new(&ctx)
        .authenticate("alice", &factory::mock_secret())
        .await
        .unwrap();

    assert_eq!(user.last_active, fixture.last_active);

    Ok(())
}
