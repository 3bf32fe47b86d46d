//! Google OAuth2 client.
//!
//! Wraps an `oauth2` [`BasicClient`] for the authorization code flow and fetches the signed-in
//! user's profile from the OpenID Connect userinfo endpoint.

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenResponse, TokenUrl,
};

use crate::{
    config::OAuthConfig,
    error::{auth::AuthError, config::ConfigError, Error},
    model::account::{ProviderProfile, ProviderTokens},
    util::time,
};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

const SCOPES: [&str; 3] = ["openid", "email", "profile"];

type OAuthClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Endpoints of the identity provider, overridable for tests.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

/// Authorization URL to redirect the user to, with the CSRF state to verify on callback.
#[derive(Debug, Clone)]
pub struct LoginUrl {
    pub url: String,
    pub state: String,
}

pub struct GoogleClient {
    oauth: OAuthClient,
    http: reqwest::Client,
    userinfo_url: String,
}

impl GoogleClient {
    /// Builds a client against Google's production endpoints.
    pub fn new(config: &OAuthConfig, http: reqwest::Client) -> Result<Self, Error> {
        Self::with_endpoints(config, http, GoogleEndpoints::default())
    }

    pub fn with_endpoints(
        config: &OAuthConfig,
        http: reqwest::Client,
        endpoints: GoogleEndpoints,
    ) -> Result<Self, Error> {
        let invalid = |var: &str, e: oauth2::url::ParseError| ConfigError::InvalidEnvValue {
            var: var.to_string(),
            reason: e.to_string(),
        };

        let oauth = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(endpoints.auth_url).map_err(|e| invalid("OAUTH_AUTH_URL", e))?,
            )
            .set_token_uri(
                TokenUrl::new(endpoints.token_url).map_err(|e| invalid("OAUTH_TOKEN_URL", e))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.callback_url.clone())
                    .map_err(|e| invalid("OAUTH_CALLBACK_URL", e))?,
            );

        Ok(Self {
            oauth,
            http,
            userinfo_url: endpoints.userinfo_url,
        })
    }

    /// Creates the authorization URL with a fresh CSRF state.
    pub fn login_url(&self) -> LoginUrl {
        let (url, state) = self
            .oauth
            .authorize_url(CsrfToken::new_random)
            .add_scopes(SCOPES.iter().map(|scope| Scope::new(scope.to_string())))
            .add_extra_param("access_type", "offline")
            .url();

        LoginUrl {
            url: url.to_string(),
            state: state.secret().clone(),
        }
    }

    /// Exchanges an authorization code for provider tokens.
    ///
    /// # Returns
    /// - `Ok(ProviderTokens)` - Tokens with their expiry
    /// - `Err(Error::AuthError(AuthError::TokenExchange))` - Provider rejected the code or
    ///   could not be reached
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, Error> {
        let token = self
            .oauth
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        let expires = token
            .expires_in()
            .map(|expires_in: Duration| {
                ChronoDuration::from_std(expires_in).map(|d| time::now() + d)
            })
            .transpose()
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        Ok(ProviderTokens {
            access_token: Some(token.access_token().secret().clone()),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires,
        }
        .normalized())
    }

    /// Fetches the profile of the user `access_token` was issued for.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, Error> {
        let profile = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<ProviderProfile>()
            .await?;

        Ok(profile)
    }
}
