use async_trait::async_trait;

use super::IdSource;
use crate::{error::id::IdError, model::id::Id};

/// ID source backed by a shared generator service.
///
/// Each allocation is a `POST {address}/ids` authenticated with a bearer token; the service
/// answers with the ID as a plain-text decimal body.
pub struct RemoteIdSource {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl RemoteIdSource {
    pub fn new(client: reqwest::Client, address: &str, token: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/ids", address.trim_end_matches('/')),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl IdSource for RemoteIdSource {
    async fn next_id(&self) -> Result<Id, IdError> {
        let body = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let trimmed = body.trim();
        match trimmed.parse::<Id>() {
            Ok(id) if !id.is_unset() => Ok(id),
            _ => Err(IdError::InvalidResponse(trimmed.to_string())),
        }
    }
}
