//! Shared HTTP plumbing for the remote services

use pdfutil_core::InputFile;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::error::RemoteError;

const USER_AGENT: &str = concat!("pdfutil/", env!("CARGO_PKG_VERSION"));

/// HTTP client bound to one service base URL
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
}

/// `{"error": "..."}` bodies returned by the services on failure
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl ServiceClient {
    /// Client for `base_url`; `timeout` bounds each whole request
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, RemoteError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    /// POST `file` as multipart field `file`, plus any extra text fields
    pub fn post_file(
        &self,
        path: &str,
        file: &InputFile,
        mime_type: &str,
        fields: &[(&'static str, String)],
    ) -> Result<RequestBuilder, RemoteError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(mime_type)?;

        let form = fields
            .iter()
            .fold(Form::new().part("file", part), |form, (name, value)| {
                form.text(*name, value.clone())
            });

        Ok(self.client.post(self.url(path)).multipart(form))
    }
}

/// Status plus the service's own error text, if it sent one
pub(crate) async fn read_failure(response: Response) -> (StatusCode, Option<String>, String) {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.error);
    (status, message, text)
}
