//! Remote Signature Service Client
//!
//! Issues one HTTP request per identity. The identity address (EIP-55
//! checksummed) replaces `{address}` in the configured URL; POST requests
//! additionally carry `{"address": ..., <params>}` as a JSON body.
//!
//! # Response Formats
//! Services disagree on where they put the signature, so the body is
//! searched in a fixed priority order (see `SIGNATURE_FIELDS`) and the first
//! non-empty string wins.

use async_trait::async_trait;
use ethers::types::{Address, Bytes};
use ethers::utils::to_checksum;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::provider::{decode_signature, SignatureParams, SignatureProvider};
use crate::error::SignatureError;

/// JSON pointers checked for the signature, highest priority first
pub const SIGNATURE_FIELDS: [&str; 4] = ["/signature", "/sig", "/data/signature", "/result"];

/// Request method used against the signature service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

/// HTTP signature service client
#[derive(Debug, Clone)]
pub struct RemoteSignatureProvider {
    /// URL with an `{address}` placeholder
    url_template: String,
    method: HttpMethod,
    headers: HeaderMap,
    client: reqwest::Client,
}

impl RemoteSignatureProvider {
    /// Creates a client for the given service
    ///
    /// # Arguments
    /// * `url_template` - Endpoint URL, `{address}` is substituted per call
    /// * `method` - GET or POST
    /// * `extra_headers` - Sent with every request, after `Content-Type`
    ///
    /// # Returns
    /// An error if a header name or value is not valid HTTP
    pub fn new(
        url_template: String,
        method: HttpMethod,
        extra_headers: &HashMap<String, String>,
    ) -> Result<Self, SignatureError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SignatureError::Request(format!("invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SignatureError::Request(format!("invalid header value for {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        Ok(Self {
            url_template,
            method,
            headers,
            client: reqwest::Client::new(),
        })
    }

    fn url_for(&self, address: &str) -> String {
        self.url_template.replace("{address}", address)
    }
}

#[async_trait]
impl SignatureProvider for RemoteSignatureProvider {
    async fn get_signature(&self, address: Address, params: &SignatureParams) -> Result<Bytes, SignatureError> {
        let checksummed = to_checksum(&address, None);
        let url = self.url_for(&checksummed);

        let request = match self.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => {
                let mut body = params.clone();
                body.insert("address".to_string(), Value::String(checksummed.clone()));
                self.client.post(&url).json(&body)
            }
        };

        let response = request.headers(self.headers.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Signature service returned {} for {}", status, checksummed);
            return Err(SignatureError::Status { status: status.as_u16() });
        }

        let body: Value = response.json().await?;
        let raw = extract_signature(&body).ok_or(SignatureError::MissingField)?;
        debug!("Fetched signature for {}", checksummed);
        decode_signature(raw)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Finds the signature string in a service response
pub fn extract_signature(body: &Value) -> Option<&str> {
    SIGNATURE_FIELDS
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .filter_map(Value::as_str)
        .find(|value| !value.is_empty())
}
