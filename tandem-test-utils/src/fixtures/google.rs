//! Identity provider HTTP mock endpoint creation utilities.

use mockito::Matcher;

use crate::{
    constant::{TEST_TOKEN_PATH, TEST_USERINFO_PATH},
    error::TestError,
    TestSetup,
};

impl TestSetup {
    pub fn google<'a>(&'a mut self) -> GoogleFixtures<'a> {
        GoogleFixtures { setup: self }
    }
}

pub struct GoogleFixtures<'a> {
    setup: &'a mut TestSetup,
}

impl<'a> GoogleFixtures<'a> {
    /// Mocks a successful authorization code exchange answering with `access_token`.
    ///
    /// The mock is kept on the setup and verified by [`TestSetup::assert_mocks`].
    pub async fn with_token_endpoint(
        &mut self,
        code: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), TestError> {
        let mut body = serde_json::json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3600,
        });
        if let Some(refresh_token) = refresh_token {
            body["refresh_token"] = serde_json::Value::from(refresh_token);
        }

        let mock = self
            .setup
            .server
            .mock("POST", TEST_TOKEN_PATH)
            .match_body(Matcher::UrlEncoded("code".into(), code.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&body)?)
            .create_async()
            .await;
        self.setup.mocks.push(mock);

        Ok(())
    }

    /// Mocks the userinfo endpoint returning `profile` for `access_token`.
    pub async fn with_userinfo_endpoint(
        &mut self,
        access_token: &str,
        profile: serde_json::Value,
    ) -> Result<(), TestError> {
        let mock = self
            .setup
            .server
            .mock("GET", TEST_USERINFO_PATH)
            .match_header("authorization", format!("Bearer {access_token}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&profile)?)
            .create_async()
            .await;
        self.setup.mocks.push(mock);

        Ok(())
    }
}

/// Userinfo payload for a Google account with subject `sub` and `email`.
pub fn profile_json(sub: &str, email: &str) -> serde_json::Value {
    serde_json::json!({
        "sub": sub,
        "email": email,
        "email_verified": true,
        "name": "Ada Lovelace",
        "given_name": "Ada",
        "family_name": "Lovelace",
        "picture": "https://example.com/ada.png",
        "locale": "en",
    })
}
