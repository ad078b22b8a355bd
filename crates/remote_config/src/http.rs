//! Remote config backend speaking the JSON fetch endpoint over HTTP.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    error::FetchError,
    protocol::{FetchRequest, FetchResponse, FetchState},
};
use url::Url;
use uuid::Uuid;

use crate::{FetchedConfig, RemoteConfigBackend};

pub struct HttpRemoteConfigBackend {
    http: Client,
    endpoint: Url,
    app_instance_id: String,
    app_id: Option<String>,
}

impl HttpRemoteConfigBackend {
    pub fn new(endpoint: Url, app_id: Option<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            app_instance_id: Uuid::new_v4().to_string(),
            app_id,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn app_instance_id(&self) -> &str {
        &self.app_instance_id
    }
}

#[async_trait]
impl RemoteConfigBackend for HttpRemoteConfigBackend {
    async fn fetch_and_activate(&self) -> Result<FetchedConfig, FetchError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&FetchRequest {
                app_instance_id: self.app_instance_id.clone(),
                app_id: self.app_id.clone(),
            })
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let payload: FetchResponse =
            serde_json::from_slice(&body).map_err(|err| FetchError::Malformed(err.to_string()))?;

        Ok(resolve_fetch_response(payload))
    }
}

pub(crate) fn resolve_fetch_response(payload: FetchResponse) -> FetchedConfig {
    match payload.state {
        FetchState::Update => FetchedConfig::Values(payload.entries.unwrap_or_default()),
        FetchState::NoTemplate | FetchState::EmptyConfig => FetchedConfig::Values(HashMap::new()),
        FetchState::NoChange => FetchedConfig::Unchanged,
        FetchState::Unknown => match payload.entries {
            Some(entries) => FetchedConfig::Values(entries),
            None => FetchedConfig::Unchanged,
        },
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
