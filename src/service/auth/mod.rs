//! Sign-in through the Google identity provider.

pub mod google;

pub use google::{GoogleClient, GoogleEndpoints, LoginUrl};

use crate::{
    error::{auth::AuthError, Error},
    model::{account::SignIn, context::RequestContext},
    service::account::AccountService,
    util::crypto,
};

/// Completes the authorization code flow started by [`GoogleClient::login_url`].
///
/// # Arguments
/// - `ctx` - Request the callback arrived on
/// - `google` - Identity provider client
/// - `code` - Authorization code from the callback
/// - `state` - CSRF state from the callback
/// - `expected_state` - CSRF state issued with the login URL
///
/// # Returns
/// - `Ok(SignIn)` - Signed in user and its account
/// - `Err(Error::AuthError(AuthError::InvalidCredentials))` - State does not match
/// - `Err(Error::AuthError(AuthError::TokenExchange))` - Code exchange failed
pub async fn callback(
    ctx: &RequestContext,
    google: &GoogleClient,
    code: &str,
    state: &str,
    expected_state: &str,
) -> Result<SignIn, Error> {
    if !crypto::constant_time_eq(state, expected_state) {
        ctx.telemetry().record_auth_failure();
        return Err(AuthError::InvalidCredentials.into());
    }

    let tokens = google.exchange_code(code).await?;
    let access_token = tokens
        .access_token
        .as_deref()
        .ok_or_else(|| AuthError::TokenExchange("Empty access token".to_string()))?;
    let profile = google.fetch_profile(access_token).await?;

    AccountService::new(ctx).sign_in(profile, tokens).await
}
