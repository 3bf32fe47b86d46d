use chrono::DateTime;
use tandem::{
    audit::REDACTED,
    model::{
        id::Id,
        user::{NewUser, UserUpdate},
    },
    service::user::UserService,
};
use tandem_test_utils::prelude::*;

use crate::support::state;

/// Expect one attributed entry per changed field, newest first, with unchanged fields skipped
#[tokio::test]
async fn records_field_level_changes() -> Result<(), TestError> {
    let test = test_setup_with_user_tables!()?;
    let state = state(&test);
    let anonymous = state.request(constant::TEST_IP, None);

    let registered = UserService::new(&anonymous)
        .register(NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            given_name: "Alice".to_string(),
            family_name: "Liddell".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let user_id = Id::from(registered.user.id);
    let key = format!("users:{user_id}");

    let operator = state.request("198.51.100.20", Some(Id::new(9)));
    UserService::new(&operator)
        .update_user(
            user_id,
            UserUpdate {
                email: Some("alice@wonderland.example".to_string()),
                given_name: Some("Alicia".to_string()),
                family_name: Some("Liddell".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let entries = operator.audit().list(&key, 100).await.unwrap();
    let (update, creation) = entries.split_at(2);

    let mut fields: Vec<_> = update
        .iter()
        .map(|e| (e.field.as_str(), e.from.as_str(), e.to.as_str()))
        .collect();
    fields.sort();
    assert_eq!(
        fields,
        vec![
            ("email", "alice@example.com", "alice@wonderland.example"),
            ("given_name", "Alice", "Alicia"),
        ]
    );
    for entry in update {
        assert_eq!(entry.user, Some(Id::new(9)));
        assert_eq!(entry.ip, "198.51.100.20");
        assert!(DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }

    assert!(creation.iter().all(|e| e.user.is_none() && e.from.is_empty()));
    let secret = creation.iter().find(|e| e.field == "secret").unwrap();
    assert_eq!(secret.to, REDACTED);

    Ok(())
}

/// Expect audit listing to be capped at the requested count
#[tokio::test]
async fn limits_listing() -> Result<(), TestError> {
    let test = test_setup_with_user_tables!()?;
    let state = state(&test);
    let ctx = state.request(constant::TEST_IP, None);
    let user_service = UserService::new(&ctx);

    let registered = user_service
        .register(NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let user_id = Id::from(registered.user.id);
    user_service.reset_secret(user_id).await.unwrap();

    let key = format!("users:{user_id}");
    let newest = ctx.audit().list(&key, 1).await.unwrap();

    assert_eq!(newest.len(), 1);
    assert_eq!(newest[0].field, "secret");
    assert!(ctx.audit().list(&key, 0).await.unwrap().is_empty());

    Ok(())
}
