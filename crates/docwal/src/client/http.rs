use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::fs::File;
use url::Url;

pub use bytes::Bytes;

use crate::client::ClientConfig;
use crate::Error;

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// A file sent as one part of a multipart request.
///
/// Files opened with [`Upload::from_path`] are streamed, and the handle is
/// closed once the request finishes or fails.
pub struct Upload {
    file_name: String,
    content: UploadContent,
}

enum UploadContent {
    Bytes(Vec<u8>),
    File { file: File, len: u64 },
}

impl Upload {
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: UploadContent::Bytes(bytes.into()),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        let len = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            file_name,
            content: UploadContent::File { file, len },
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => "application/pdf",
            Some("zip") => "application/zip",
            Some("csv") => "text/csv",
            Some("json") => "application/json",
            _ => "application/octet-stream",
        }
    }

    fn into_part(self) -> Result<Part, Error> {
        let mime = self.mime_type();
        let part = match self.content {
            UploadContent::Bytes(bytes) => Part::bytes(bytes),
            UploadContent::File { file, len } => Part::stream_with_length(file, len),
        };

        part.file_name(self.file_name)
            .mime_str(mime)
            .map_err(Error::Request)
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = match &self.content {
            UploadContent::Bytes(bytes) => bytes.len() as u64,
            UploadContent::File { len, .. } => *len,
        };
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("len", &len)
            .finish()
    }
}

/// A single API call, relative to the configured base URL.
///
/// With no files attached the body is sent as JSON. Once a file is attached
/// the request becomes multipart, and each top-level body field becomes a
/// text part: strings as-is, anything else JSON-encoded.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    files: Vec<(String, Upload)>,
    accept: Option<&'static str>,
    timeout: Option<Duration>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            files: Vec::new(),
            accept: None,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn file(mut self, field: impl Into<String>, upload: Upload) -> Self {
        self.files.push((field.into(), upload));
        self
    }

    /// Replaces the default `Accept: application/json`, for non-JSON downloads.
    pub fn accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }

    /// Overrides the client's default timeout for this call only.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn form_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn build_form(body: Option<Value>, files: Vec<(String, Upload)>) -> Result<Form, Error> {
    let mut form = Form::new();

    match body {
        Some(Value::Object(fields)) => {
            for (key, value) in fields {
                if let Some(text) = form_value(value) {
                    form = form.text(key, text);
                }
            }
        }
        Some(other) => {
            if let Some(text) = form_value(other) {
                form = form.text("data", text);
            }
        }
        None => {}
    }

    for (field, upload) in files {
        form = form.part(field, upload.into_part()?);
    }

    Ok(form)
}

/// The HTTP transport shared by every resource client.
pub struct Http {
    client: reqwest::Client,
    base_url: Url,
    api_key: HeaderValue,
    timeout: Duration,
}

impl Http {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let mut api_key = HeaderValue::from_str(config.api_key.expose())
            .map_err(|_| Error::precondition("api_key", "API key contains invalid characters"))?;
        api_key.set_sensitive(true);

        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| {
                Error::precondition("user_agent", "user agent contains invalid characters")
            })?;

        let client = reqwest::Client::builder()
            .default_headers(
                [(USER_AGENT, user_agent), (ACCEPT, HeaderValue::from_static("application/json"))]
                    .into_iter()
                    .collect(),
            )
            .timeout(config.timeout)
            .build()
            .map_err(Error::Request)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Appends `path` to the base URL one segment at a time, percent-encoding each.
    fn url(&self, path: &str) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::precondition("base_url", "base URL cannot take a path"))?;
            segments.pop_if_empty();
            for segment in path.split('/').skip(1) {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    async fn execute(&self, request: Request) -> Result<(StatusCode, Bytes), Error> {
        let Request {
            method,
            path,
            query,
            body,
            files,
            accept,
            timeout,
        } = request;

        let url = self.url(&path)?;
        let timeout = timeout.unwrap_or(self.timeout);

        let mut builder = self
            .client
            .request(method.clone(), url)
            .header(API_KEY_HEADER, self.api_key.clone())
            .timeout(timeout);

        if let Some(accept) = accept {
            builder = builder.header(ACCEPT, accept);
        }

        if !query.is_empty() {
            builder = builder.query(&query);
        }

        builder = if files.is_empty() {
            match body {
                Some(body) => builder.json(&body),
                None => builder,
            }
        } else {
            builder.multipart(build_form(body, files)?)
        };

        let transport_err = |e| Error::from_transport(e, timeout, self.base_url.as_str());

        let response = builder.send().await.map_err(transport_err)?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(transport_err)?;

        log::debug!("{method} {path} -> {status}");

        if !status.is_success() {
            return Err(Error::from_response(status, retry_after.as_deref(), &bytes));
        }

        Ok((status, bytes))
    }

    /// Sends `request` and parses the JSON response. An empty body parses as `{}`.
    pub async fn send<T: DeserializeOwned>(&self, request: Request) -> Result<T, Error> {
        let (status, bytes) = self.execute(request).await?;

        let json: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(json).map_err(|source| Error::Decode {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            source,
        })
    }

    /// Sends `request` and returns the raw response body.
    pub async fn send_bytes(&self, request: Request) -> Result<Bytes, Error> {
        self.execute(request).await.map(|(_, bytes)| bytes)
    }
}

impl fmt::Debug for Http {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Http")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
