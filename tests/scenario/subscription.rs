use chrono::{Duration, Utc};
use tandem::{
    config::Config,
    error::{auth::AuthError, Error},
    model::{id::Id, user::SubscriptionStatus},
    service::{subscription::SubscriptionService, user::UserService},
};
use tandem_test_utils::prelude::*;

use crate::support::{state, state_with_config};

/// Expect standing to move from grace to expired and back to Ok after an extension
#[tokio::test]
async fn lapsed_subscription_recovers_after_extension() -> Result<(), TestError> {
    let mut test = test_setup_with_user_tables!()?;
    let now = Utc::now().naive_utc();
    test.user()
        .insert_user_with_subscription("grace", now - Duration::days(1))
        .await?;
    let (lapsed, lapsed_subscription) = test
        .user()
        .insert_user_with_subscription("lapsed", now - Duration::days(4))
        .await?;
    let state = state(&test);
    let ctx = state.request(constant::TEST_IP, None);
    let user_service = UserService::new(&ctx);
    let secret = factory::mock_secret();

    let (_, status) = user_service.authenticate("grace", &secret).await.unwrap();
    assert!(matches!(status, SubscriptionStatus::GraceWarning { .. }));
    assert!(matches!(
        status.into_result(),
        Err(AuthError::SubscriptionGrace { .. })
    ));

    let (_, status) = user_service.authenticate("lapsed", &secret).await.unwrap();
    let SubscriptionStatus::Expired { expires } = status else {
        panic!("expected an expired subscription, got {status:?}");
    };
    assert_eq!(expires, lapsed_subscription.expires);

    // Lapsed subscriptions are extended from now rather than from their old expiry
    let extended = SubscriptionService::new(&ctx)
        .extend(Id::from(lapsed.id), 30)
        .await
        .unwrap();
    assert!(extended.expires >= now + Duration::days(30));

    let (_, status) = user_service.authenticate("lapsed", &secret).await.unwrap();
    assert_eq!(status, SubscriptionStatus::Ok);

    let subscriptions = SubscriptionService::new(&ctx);
    let within_week = subscriptions
        .expiring_before(now + Duration::days(7), None)
        .await
        .unwrap();
    let within_quarter = subscriptions
        .expiring_before(now + Duration::days(90), None)
        .await
        .unwrap();
    assert!(within_week.is_empty());
    assert_eq!(within_quarter, vec![Id::from(lapsed.id)]);

    Ok(())
}

/// Expect admins to sign in with an Ok standing however long their subscription has lapsed
#[tokio::test]
async fn admins_bypass_subscription_checks() -> Result<(), TestError> {
    let mut test = test_setup_with_user_tables!()?;
    let now = Utc::now().naive_utc();
    let (user, _) = test
        .user()
        .insert_user_with_subscription("operator", now - Duration::days(400))
        .await?;
    let state = state(&test);
    let ctx = state.request(constant::TEST_IP, None);
    let user_service = UserService::new(&ctx);
    let secret = factory::mock_secret();

    let (_, before) = user_service.authenticate("operator", &secret).await.unwrap();
    assert!(matches!(before, SubscriptionStatus::Expired { .. }));

    user_service.make_admin(Id::from(user.id)).await.unwrap();

    let (_, after) = user_service.authenticate("operator", &secret).await.unwrap();
    assert_eq!(after, SubscriptionStatus::Ok);

    Ok(())
}

/// Expect a maintenance-mode deployment to refuse extensions but still authenticate
#[tokio::test]
async fn maintenance_mode_refuses_extension() -> Result<(), TestError> {
    let mut test = test_setup_with_user_tables!()?;
    let now = Utc::now().naive_utc();
    let (user, _) = test
        .user()
        .insert_user_with_subscription("alice", now + Duration::days(10))
        .await?;
    let state = state_with_config(
        &test,
        Config {
            maintenance_mode: true,
            ..Default::default()
        },
    );
    let ctx = state.request(constant::TEST_IP, None);

    let (_, status) = UserService::new(&ctx)
        .authenticate("alice", &factory::mock_secret())
        .await
        .unwrap();
    let result = SubscriptionService::new(&ctx).extend(Id::from(user.id), 30).await;

    assert_eq!(status, SubscriptionStatus::Ok);
    assert!(matches!(result, Err(Error::MaintenanceMode)));

    Ok(())
}
