use std::time::Duration;

use tandem::{
    error::ErrorKind,
    model::{id::Id, user::NewUser},
    service::{pairing::PairingService, user::UserService},
};
use tandem_test_utils::prelude::*;

use crate::support::state;

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        ..Default::default()
    }
}

/// Expect a device to pair with tokens shown on a signed-in session until the ticket expires
#[tokio::test]
async fn pairs_device_until_ticket_expires() -> Result<(), TestError> {
    let test = test_setup_with_user_tables!()?;
    let state = state(&test);

    let session = state.request(constant::TEST_IP, None);
    let registered = UserService::new(&session)
        .register(new_user("alice"))
        .await
        .unwrap();
    let (user, _) = UserService::new(&session)
        .authenticate("alice", &registered.secret)
        .await
        .unwrap();
    let user_id = Id::from(user.id);

    tokio::time::pause();
    let signed_in = state.request(constant::TEST_IP, Some(user_id));
    let (first, second) = PairingService::new(&signed_in).issue(user_id).await.unwrap();

    let device = state.request("198.51.100.20", None);
    let pairing = PairingService::new(&device);
    assert_eq!(pairing.redeem(&second, &first).await.unwrap(), user_id);

    tokio::time::advance(Duration::from_secs(301)).await;
    let expired = pairing.redeem(&first, &second).await;
    assert_eq!(expired.unwrap_err().kind(), ErrorKind::InvalidCredentials);

    Ok(())
}

/// Expect outstanding tickets to stop resolving once their user is deleted
#[tokio::test]
async fn deleting_user_revokes_tickets() -> Result<(), TestError> {
    let test = test_setup_with_user_tables!()?;
    let state = state(&test);
    let ctx = state.request(constant::TEST_IP, None);

    let registered = UserService::new(&ctx)
        .register(new_user("alice"))
        .await
        .unwrap();
    let user_id = Id::from(registered.user.id);
    let pairing = PairingService::new(&ctx);
    let (first, second) = pairing.issue(user_id).await.unwrap();
    let (third, fourth) = pairing.issue(user_id).await.unwrap();

    assert!(UserService::new(&ctx).delete_user(user_id).await.unwrap());

    assert_eq!(pairing.resolve(&first, &second).await.unwrap(), None);
    assert_eq!(pairing.resolve(&third, &fourth).await.unwrap(), None);

    Ok(())
}
