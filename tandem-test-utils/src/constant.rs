//! Test configuration constants.
//!
//! These values are placeholders for tests, not real credentials.

/// Mock OAuth2 client ID for the identity provider.
pub static TEST_OAUTH_CLIENT_ID: &str = "tandem_client_id";

/// Mock OAuth2 client secret for the identity provider.
pub static TEST_OAUTH_CLIENT_SECRET: &str = "tandem_client_secret";

/// Mock OAuth2 callback URL.
pub static TEST_CALLBACK_URL: &str = "http://localhost:8080/auth/callback";

/// Client address attributed to test requests.
pub static TEST_IP: &str = "203.0.113.7";

/// Path of the mocked token endpoint on the mock server.
pub static TEST_TOKEN_PATH: &str = "/token";

/// Path of the mocked userinfo endpoint on the mock server.
pub static TEST_USERINFO_PATH: &str = "/v1/userinfo";
