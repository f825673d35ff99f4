use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

const REVISION: &str = "2023-12-15";
const SIGNUP_SOURCE: &str = "Flight Price Alert Signup";

#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("email is required")]
    MissingEmail,
    #[error("subscription provider is not configured")]
    MissingConfiguration,
    #[error("profile request answered with status {0}")]
    ProfileStatus(u16),
    #[error("profile response carried no id")]
    MissingProfileId,
    #[error("list request answered with status {0}")]
    ListStatus(u16),
    #[error("request to subscription provider failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscribed {
    Created { profile_id: String },
    Existing { profile_id: Option<String> },
}

#[derive(Clone)]
pub struct SubscriptionClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    list_id: Option<String>,
}

impl SubscriptionClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: Option<String>, list_id: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            list_id,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.list_id.is_some()
    }

    pub async fn subscribe(&self, email: &str) -> Result<Subscribed, SubscribeError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(SubscribeError::MissingEmail);
        }
        let (Some(api_key), Some(list_id)) = (self.api_key.as_deref(), self.list_id.as_deref()) else {
            return Err(SubscribeError::MissingConfiguration);
        };

        let profile = self
            .authorized(self.http.post(format!("{}/api/profiles/", self.base_url)), api_key)
            .json(&profile_body(email))
            .send()
            .await?;
        let status = profile.status();
        let body: Value = profile.json().await.unwrap_or(Value::Null);

        let outcome = if status.is_success() {
            Subscribed::Created {
                profile_id: created_profile_id(&body).ok_or(SubscribeError::MissingProfileId)?,
            }
        } else if status == StatusCode::CONFLICT {
            Subscribed::Existing {
                profile_id: duplicate_profile_id(&body),
            }
        } else {
            warn!(status = status.as_u16(), %body, "profile request rejected");
            return Err(SubscribeError::ProfileStatus(status.as_u16()));
        };

        let profile_id = match &outcome {
            Subscribed::Created { profile_id } => Some(profile_id.as_str()),
            Subscribed::Existing { profile_id } => profile_id.as_deref(),
        };
        match profile_id {
            Some(profile_id) => self.add_to_list(api_key, list_id, profile_id).await?,
            None => warn!("profile already exists but its id was not reported, skipping list step"),
        }

        info!(existing = matches!(outcome, Subscribed::Existing { .. }), "email subscribed");
        Ok(outcome)
    }

    async fn add_to_list(&self, api_key: &str, list_id: &str, profile_id: &str) -> Result<(), SubscribeError> {
        let response = self
            .authorized(
                self.http
                    .post(format!("{}/api/lists/{list_id}/relationships/profiles/", self.base_url)),
                api_key,
            )
            .json(&json!({ "data": [{ "type": "profile", "id": profile_id }] }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "list request rejected");
            return Err(SubscribeError::ListStatus(status.as_u16()));
        }
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        request
            .header("Accept", "application/json")
            .header("Revision", REVISION)
            .header("Authorization", format!("Klaviyo-API-Key {api_key}"))
    }
}

fn profile_body(email: &str) -> Value {
    json!({
        "data": {
            "type": "profile",
            "attributes": {
                "email": email,
                "properties": { "source": SIGNUP_SOURCE }
            }
        }
    })
}

fn created_profile_id(body: &Value) -> Option<String> {
    body.pointer("/data/id")?.as_str().map(str::to_string)
}

/// Id of the existing profile reported in a 409 conflict body.
fn duplicate_profile_id(body: &Value) -> Option<String> {
    body.get("errors")?
        .as_array()?
        .iter()
        .find_map(|error| error.pointer("/meta/duplicate_profile_id")?.as_str())
        .map(str::to_string)
}
