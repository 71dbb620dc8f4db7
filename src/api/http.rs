//! reqwest-backed transport for the audience API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{Instrument, debug};

use super::{ApiContact, ApiResponse, AudienceApi};
use crate::error::{Error, Result};
use crate::model::ContactEvent;
use crate::telemetry::http::{record_response_status, start_request_span};

const AUTHORIZATION_PREFIX: &str = "apikey ";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the audience API. Every request carries the SDK key as a
/// static `Authorization` header.
#[derive(Clone)]
pub struct HttpAudienceApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAudienceApi {
    pub fn new(base_url: impl Into<String>, sdk_key: &SecretString) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!(
            "{AUTHORIZATION_PREFIX}{}",
            sdk_key.expose_secret()
        ))
        .map_err(|e| Error::Config(format!("sdk key is not a valid header value: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + ?Sized>(&self, route: &str, body: &T) -> Result<ApiResponse> {
        let url = format!("{}/{route}", self.base_url);
        let span = start_request_span("POST", route);

        async {
            let response = self.client.post(&url).json(body).send().await?;
            let status = response.status().as_u16();
            record_response_status(&tracing::Span::current(), status);
            debug!(%url, status, "audience api responded");
            Ok(ApiResponse::new(status))
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl AudienceApi for HttpAudienceApi {
    async fn update_contact(&self, contact: &ApiContact) -> Result<ApiResponse> {
        self.post("contacts", contact).await
    }

    async fn add_contact_event(&self, event: &ContactEvent) -> Result<ApiResponse> {
        self.post("contacts/events", event).await
    }
}
