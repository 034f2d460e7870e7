//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, bail};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};

/// Where the daemon lives and how to authenticate to it.
pub struct Endpoint {
    base: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl Endpoint {
    pub fn new(host: &str, port: u16, token: Option<String>) -> Self {
        Self {
            base: format!("http://{}:{}/api", host, port),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .context("this command needs a token: pass --token or set COURIER_TOKEN")?;
        Ok(req.bearer_auth(token))
    }

    pub async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, auth: bool) -> Result<T> {
        let url = self.url(path);
        let mut req = self.client.get(&url);
        if auth {
            req = self.authorize(req)?;
        }
        decode(send(req, &url).await?).await
    }

    pub async fn post_json_body<T, R>(&self, path: &str, body: &T, auth: bool) -> Result<R>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.url(path);
        let mut req = self.client.post(&url).json(body);
        if auth {
            req = self.authorize(req)?;
        }
        decode(send(req, &url).await?).await
    }
}

async fn send(req: RequestBuilder, url: &str) -> Result<Response> {
    req.send()
        .await
        .with_context(|| format!("failed to connect to courierd at {}. Is it running?", url))
}

/// Parse a success body, or turn an error response into a readable message.
async fn decode<R: for<'de> Deserialize<'de>>(resp: Response) -> Result<R> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("request failed ({}): {}", status, describe_error(&body));
    }
    resp.json::<R>().await.context("failed to parse response")
}

/// Flatten `{"detail": ...}` or `{field: [messages]}` into one line.
fn describe_error(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
        return detail.to_string();
    }
    match value.as_object() {
        Some(fields) => fields
            .iter()
            .map(|(field, messages)| {
                let messages = match messages.as_array() {
                    Some(list) => list
                        .iter()
                        .filter_map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(" "),
                    None => messages.to_string(),
                };
                format!("{}: {}", field, messages)
            })
            .collect::<Vec<_>>()
            .join("; "),
        None => body.to_string(),
    }
}
