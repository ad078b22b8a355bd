//! Wire types of the remote-config fetch endpoint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub app_instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchState {
    #[default]
    Update,
    NoChange,
    NoTemplate,
    EmptyConfig,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FetchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<HashMap<String, String>>,
    #[serde(default)]
    pub state: FetchState,
}
