// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_USER_ID: &str = "system";
pub const MISSING_TOKEN_MESSAGE: &str = "access token missing; sign in and retry";

/// The backend has used each of these names for the uploader id at some point;
/// every upload carries all of them.
pub const USER_ID_FIELDS: [&str; 5] = [
    "regUserId",
    "reg_user_id",
    "REG_USER_ID",
    "userId",
    "user_id",
];

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const TOKEN_LOG_PREFIX: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProxyRequest {
    #[serde(default)]
    pub method: Option<String>,
    pub url: String,
    #[serde(default, rename = "baseURL")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySuccess {
    pub status: u16,
    pub status_text: String,
    pub data: Value,
    pub headers: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyFailure {
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub message: String,
}

/// Envelope handed back to the renderer. Upstream failures are values, not
/// errors, so the caller always gets a reply it can inspect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProxyResponse {
    Success(ProxySuccess),
    Failure(ProxyFailure),
}

impl ProxyResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(ProxyFailure {
            error: true,
            status: None,
            status_text: None,
            data: None,
            message: message.into(),
        })
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Success(success) => Some(success.status),
            Self::Failure(failure) => failure.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadFile {
    pub path: PathBuf,
    pub name: String,
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub url: String,
    #[serde(default)]
    pub files: Vec<UploadFile>,
    #[serde(default)]
    pub img_upload_date: Option<String>,
    #[serde(default)]
    pub img_cluster: Option<String>,
    #[serde(default)]
    pub reg_user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfoUpdate {
    #[serde(default)]
    pub url: Option<String>,
    pub img_id: Value,
    #[serde(default)]
    pub img_remark: Option<String>,
    #[serde(default)]
    pub img_modality: Option<String>,
    #[serde(default)]
    pub img_body_part: Option<String>,
    #[serde(default)]
    pub img_cluster: Option<String>,
    #[serde(default)]
    pub mod_user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReply {
    pub status: u16,
    pub data: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageInfoBody<'a> {
    img_id: &'a Value,
    img_remark: &'a str,
    img_modality: &'a str,
    img_body_part: &'a str,
    img_cluster: &'a str,
    mod_user_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generic proxy for the renderer's API calls.
    pub fn send(&self, request: &ProxyRequest) -> ProxyResponse {
        match self.try_send(request) {
            Ok(response) => response,
            Err(error) => {
                warn!(url = %request.url, error = %format!("{error:#}"), "proxied request failed");
                ProxyResponse::failure(format!("{error:#}"))
            }
        }
    }

    /// Multipart upload of local files, followed by a best-effort cluster
    /// assignment for the upload date. `token` is the already-resolved bearer
    /// token; see [`resolve_token`].
    pub fn upload_files(&self, request: &UploadRequest, token: Option<&str>) -> ProxyResponse {
        match self.try_upload(request, token) {
            Ok(response) => response,
            Err(error) => {
                warn!(url = %request.url, error = %format!("{error:#}"), "file upload failed");
                ProxyResponse::failure(format!("{error:#}"))
            }
        }
    }

    pub fn update_image_info(
        &self,
        update: &ImageInfoUpdate,
        token: Option<&str>,
    ) -> Result<StatusReply> {
        let token = token.ok_or_else(|| anyhow!(MISSING_TOKEN_MESSAGE))?;
        let base = non_empty(update.url.as_deref())
            .map_or(self.base_url.as_str(), |url| url.trim_end_matches('/'));
        let endpoint = format!("{base}/file/updateImageInfo");

        let body = ImageInfoBody {
            img_id: &update.img_id,
            img_remark: update.img_remark.as_deref().unwrap_or_default(),
            img_modality: update.img_modality.as_deref().unwrap_or_default(),
            img_body_part: update.img_body_part.as_deref().unwrap_or_default(),
            img_cluster: update.img_cluster.as_deref().unwrap_or_default(),
            mod_user_id: non_empty(update.mod_user_id.as_deref()).unwrap_or(DEFAULT_USER_ID),
        };

        info!(endpoint, token = %token_prefix(token), "updating image info");
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .map_err(|error| connection_error(&endpoint, error))?;

        let status = response.status();
        let text = response.text().context("read update response body")?;
        if !status.is_success() {
            return Err(clean_error_response(status, &text));
        }

        Ok(StatusReply {
            status: status.as_u16(),
            data: decode_body(text),
        })
    }

    fn try_send(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        let method_name = request
            .method
            .as_deref()
            .unwrap_or("GET")
            .to_ascii_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .with_context(|| format!("invalid HTTP method {method_name:?}"))?;
        let url = resolve_url(request.base_url.as_deref(), &request.url)?;

        debug!(method = %method, url = %url, "proxying request");
        let mut builder = self.http.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), scalar_text(value));
        }
        if !request.params.is_empty() {
            builder = builder.query(&query_pairs(&request.params));
        }
        if let Some(data) = &request.data {
            builder = builder.json(data);
        }

        let response = builder
            .send()
            .map_err(|error| connection_error(url.as_str(), error))?;
        read_response(response)
    }

    fn try_upload(&self, request: &UploadRequest, token: Option<&str>) -> Result<ProxyResponse> {
        let upload_date = non_empty(request.img_upload_date.as_deref());
        let mut form = Form::new();
        if let Some(date) = upload_date {
            form = form.text("imgUploadDate", date.to_owned());
        }
        if let Some(cluster) = non_empty(request.img_cluster.as_deref()) {
            form = form.text("imgCluster", cluster.to_owned());
        }

        let user_id = non_empty(request.reg_user_id.as_deref()).unwrap_or(DEFAULT_USER_ID);
        for field in USER_ID_FIELDS {
            form = form.text(field, user_id.to_owned());
        }

        for file in &request.files {
            let bytes = fs::read(&file.path)
                .with_context(|| format!("read upload file {}", file.name))?;
            debug!(file = %file.name, bytes = bytes.len(), "attached upload file");
            let part = Part::bytes(bytes)
                .file_name(file.name.clone())
                .mime_str(file.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE))
                .with_context(|| format!("content type for {}", file.name))?;
            form = form.part("files", part);
        }

        let token = token.ok_or_else(|| anyhow!(MISSING_TOKEN_MESSAGE))?;
        info!(
            url = %request.url,
            files = request.files.len(),
            token = %token_prefix(token),
            "uploading files"
        );

        let response = self
            .http
            .post(&request.url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .map_err(|error| connection_error(&request.url, error))?;

        let status = response.status();
        let reply = read_response(response)?;
        info!(status = status.as_u16(), "file upload finished");

        if status == StatusCode::OK
            && let Some(date) = upload_date
            && let Err(error) = self.assign_random_cluster(&request.url, date, token)
        {
            warn!(error = %format!("{error:#}"), date, "cluster assignment failed");
        }

        Ok(reply)
    }

    fn assign_random_cluster(&self, upload_url: &str, date: &str, token: &str) -> Result<()> {
        let base = upload_url.split("/file/").next().unwrap_or(upload_url);
        let endpoint = format!("{base}/file/setRandomCluster");
        let response = self
            .http
            .post(&endpoint)
            .query(&[("uploadDate", date)])
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .map_err(|error| connection_error(&endpoint, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        info!(date, "cluster assignment requested");
        Ok(())
    }
}

/// Bridge-held token first, then the one passed with the request. Empty
/// strings count as missing.
pub fn resolve_token<'a>(
    bridge_token: &'a str,
    request_token: Option<&'a str>,
) -> Option<&'a str> {
    non_empty(Some(bridge_token)).or_else(|| non_empty(request_token))
}

pub fn token_prefix(token: &str) -> String {
    let prefix = token.chars().take(TOKEN_LOG_PREFIX).collect::<String>();
    format!("{prefix}...")
}

/// Relative urls always extend the base path: `http://h/api` + `/patients`
/// is `http://h/api/patients`, never `http://h/patients`.
fn resolve_url(base_url: Option<&str>, url: &str) -> Result<Url> {
    if let Ok(absolute) = Url::parse(url) {
        return Ok(absolute);
    }

    let Some(base) = non_empty(base_url) else {
        bail!("request url {url:?} is relative and no baseURL was given");
    };
    let mut base = Url::parse(base).with_context(|| format!("parse baseURL {base:?}"))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(url.trim_start_matches('/'))
        .with_context(|| format!("join request url {url:?} onto {base}"))
}

fn read_response(response: Response) -> Result<ProxyResponse> {
    let status = response.status();
    let status_text = status.canonical_reason().unwrap_or_default().to_owned();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_owned(), Value::String(value.to_owned())))
        })
        .collect::<Map<_, _>>();
    let body = response.text().context("read response body")?;
    let data = decode_body(body);

    if status.is_success() {
        return Ok(ProxyResponse::Success(ProxySuccess {
            status: status.as_u16(),
            status_text,
            data,
            headers,
        }));
    }

    Ok(ProxyResponse::Failure(ProxyFailure {
        error: true,
        status: Some(status.as_u16()),
        status_text: Some(status_text),
        data: Some(data),
        message: format!("request failed with status code {}", status.as_u16()),
    }))
}

fn decode_body(body: String) -> Value {
    if body.is_empty() {
        return Value::String(body);
    }
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len());
    for (name, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|item| !item.is_null()) {
                    pairs.push((name.clone(), scalar_text(item)));
                }
            }
            other => pairs.push((name.clone(), scalar_text(other))),
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

fn connection_error(target: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("request to {target} timed out -- the server did not answer in time");
    }
    anyhow!("cannot reach {target} -- check that the API server is running ({error})")
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<Value>(body)
        && let Some(message) = parsed.get("message").and_then(Value::as_str)
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}
