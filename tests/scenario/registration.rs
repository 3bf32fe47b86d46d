use tandem::{
    error::{auth::AuthError, Error, ErrorKind},
    model::{id::Id, user::NewUser},
    service::user::UserService,
};
use tandem_test_utils::prelude::*;

use crate::support::state;

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{}@example.com", username.to_lowercase()),
        ..Default::default()
    }
}

/// Expect exactly one of two concurrent registrations of the same name to win
#[tokio::test]
async fn concurrent_registrations_reserve_name_once() -> Result<(), TestError> {
    let test = test_setup_with_user_tables!()?;
    let state = state(&test);
    let first_ctx = state.request(constant::TEST_IP, None);
    let second_ctx = state.request("198.51.100.20", None);
    let first = UserService::new(&first_ctx);
    let second = UserService::new(&second_ctx);

    let (a, b) = tokio::join!(first.register(new_user("alice")), second.register(new_user("Alice")));

    let (winner, loser) = match (a, b) {
        (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => (winner, loser),
        (a, b) => panic!("expected exactly one winner, got {:?} and {:?}", a.is_ok(), b.is_ok()),
    };
    assert!(matches!(loser, Error::AuthError(AuthError::UsernameTaken(_))));
    assert_eq!(loser.kind(), ErrorKind::UniqueConflict);

    let stored = first.get_by_username("ALICE").await.unwrap().unwrap();
    assert_eq!(stored.id, Id::from(winner.user.id));

    Ok(())
}

/// Expect a freed name to be registrable again after its user is deleted
#[tokio::test]
async fn deleted_user_frees_name() -> Result<(), TestError> {
    let test = test_setup_with_user_tables!()?;
    let state = state(&test);
    let ctx = state.request(constant::TEST_IP, None);
    let user_service = UserService::new(&ctx);

    let original = user_service.register(new_user("alice")).await.unwrap();
    assert!(user_service
        .delete_user(Id::from(original.user.id))
        .await
        .unwrap());

    let replacement = user_service.register(new_user("alice")).await.unwrap();
    assert_ne!(replacement.user.id, original.user.id);

    let old_secret = user_service.authenticate("alice", &original.secret).await;
    assert_eq!(old_secret.unwrap_err().kind(), ErrorKind::InvalidCredentials);

    Ok(())
}
