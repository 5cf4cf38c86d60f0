// Copyright 2026 burnbox Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{future::Future, pin::Pin, time::Duration};

use burnbox::{base64_bytes, Error, ErrorKind, Exchange, SecretPayload, Ticket};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use multer::{Constraints, Multipart, SizeLimit};
use hyper::{
    body::{Body, Bytes},
    header::CONTENT_TYPE,
    service::Service,
    Method, Request, Response, StatusCode,
};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Default time allowed to read a request body and produce the response.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

const MULTIPART_ERROR: &str = "File too large or invalid multipart";

/// Failures of a single request, each answered with its own status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("Request body too large")]
    BodyTooLarge,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Not found")]
    NoRoute,
    #[error("Request timed out")]
    Timeout,
    #[error(transparent)]
    Secret(#[from] Error),
    #[error("Encoding error: {0}")]
    Encode(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NoRoute => StatusCode::NOT_FOUND,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Secret(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Burned | ErrorKind::Recycled => StatusCode::GONE,
                ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                ErrorKind::Crypto => StatusCode::UNAUTHORIZED,
                ErrorKind::Parse => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Secret(e) => match e.kind() {
                ErrorKind::NotFound => "Secret not found".to_string(),
                ErrorKind::Burned => "Secret already retrieved (burned)".to_string(),
                ErrorKind::Recycled => "Secret evicted to free up memory (recycled)".to_string(),
                ErrorKind::TooLarge => "Secret too large".to_string(),
                ErrorKind::Crypto => "Decryption failed (invalid key)".to_string(),
                ErrorKind::Parse => "ID and Key are required".to_string(),
                ErrorKind::Collision => format!("Failed to store secret: {}", e.kind()),
                _ => "Internal server error".to_string(),
            },
            e => e.to_string(),
        }
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("[service]: {:?}", self);
        } else {
            tracing::debug!("[service]: {}: {}", status, self);
        }
        text(status, self.message())
    }
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    #[serde(default)]
    data: String,
    #[serde(default)]
    file: Option<FileUpload>,
}

#[derive(Debug, Deserialize)]
struct FileUpload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(with = "base64_bytes")]
    data: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct RetrieveRequest {
    #[serde(default)]
    id: String,
    #[serde(default)]
    key: String,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    memory_used: usize,
    memory_limit: usize,
    percent_used: f64,
    secrets_created: u64,
    secrets_retrieved: u64,
}

/// Routes http requests onto an [`Exchange`].
#[derive(Debug, Clone)]
pub struct BurnboxService {
    exchange: Exchange,
    max_body_size: usize,
    write_timeout: Duration,
    registry: Option<Registry>,
}

impl BurnboxService {
    pub fn new(exchange: Exchange, max_body_size: usize, registry: Option<Registry>) -> Self {
        Self {
            exchange,
            max_body_size,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            registry,
        }
    }

    /// Set the time allowed to read a request body and produce the response.
    ///
    /// Default: 10 seconds.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Answer `req`, or `408` if it is not answered within the write timeout.
    pub async fn route<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body + Send + 'static,
        B::Data: Into<Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        match tokio::time::timeout(self.write_timeout, self.dispatch(req)).await {
            Ok(res) => res,
            Err(_) => ApiError::Timeout.into_response(),
        }
    }

    async fn dispatch<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body + Send + 'static,
        B::Data: Into<Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let path = req.uri().path().to_owned();
        let method = req.method().clone();

        let res = match (path.as_str(), &method) {
            ("/secret", &Method::POST) => self.create(req).await,
            ("/retrieve", &Method::POST) => self.retrieve(req.into_body()).await,
            ("/stats", &Method::GET) => self.stats(),
            ("/health", &Method::GET) => Ok(text(StatusCode::OK, "OK")),
            ("/metrics", &Method::GET) if self.registry.is_some() => self.metrics(),
            ("/secret" | "/retrieve" | "/stats" | "/health", _) => Err(ApiError::MethodNotAllowed),
            ("/metrics", _) if self.registry.is_some() => Err(ApiError::MethodNotAllowed),
            _ => Err(ApiError::NoRoute),
        };
        res.unwrap_or_else(ApiError::into_response)
    }

    async fn create<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>, ApiError>
    where
        B: Body + Send + 'static,
        B::Data: Into<Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("multipart/form-data"))
            .map(str::to_owned);

        let payload = match content_type {
            Some(content_type) => read_multipart(req.into_body(), &content_type, self.max_body_size).await?,
            None => {
                let req: CreateRequest = read_json(req.into_body(), self.max_body_size).await?;
                match req.file {
                    Some(file) => SecretPayload::file(file.name, file.mime_type, file.data),
                    None if req.data.is_empty() => return Err(ApiError::BadRequest("Data cannot be empty")),
                    None => SecretPayload::text(req.data),
                }
            }
        };

        let ticket: Ticket = self.exchange.create(&payload)?;
        json(&ticket)
    }

    async fn retrieve<B>(&self, body: B) -> Result<Response<Full<Bytes>>, ApiError>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let req: RetrieveRequest = read_json(body, self.max_body_size).await?;
        let payload = self.exchange.retrieve(&req.id, &req.key)?;
        json(&payload)
    }

    fn stats(&self) -> Result<Response<Full<Bytes>>, ApiError> {
        let stats = self.exchange.stats();
        json(&StatsResponse {
            memory_used: stats.used,
            memory_limit: stats.limit,
            percent_used: (stats.percent_used() * 100.0).round() / 100.0,
            secrets_created: stats.created,
            secrets_retrieved: stats.retrieved,
        })
    }

    fn metrics(&self) -> Result<Response<Full<Bytes>>, ApiError> {
        let Some(registry) = self.registry.as_ref() else {
            return Err(ApiError::NoRoute);
        };
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        encoder
            .encode(&registry.gather(), &mut buffer)
            .map_err(|e| ApiError::Encode(e.to_string()))?;
        response(StatusCode::OK, encoder.format_type(), buffer)
    }
}

impl<B> Service<Request<B>> for BurnboxService
where
    B: Body + Send + 'static,
    B::Data: Into<Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = anyhow::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.route(req).await) })
    }
}

async fn read_json<T, B>(body: B, limit: usize) -> Result<T, ApiError>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                ApiError::BodyTooLarge
            } else {
                ApiError::BadRequest("Invalid request body")
            }
        })?
        .to_bytes();
    serde_json::from_slice(&bytes).map_err(|_| ApiError::BadRequest("Invalid request body"))
}

/// Read a `multipart/form-data` create request.
///
/// A `file` part becomes a file secret. Otherwise the `data` field becomes a text secret.
async fn read_multipart<B>(body: B, content_type: &str, limit: usize) -> Result<SecretPayload, ApiError>
where
    B: Body + Send + 'static,
    B::Data: Into<Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let boundary = multer::parse_boundary(content_type).map_err(|_| ApiError::BadRequest(MULTIPART_ERROR))?;
    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(limit as u64));
    let mut multipart = Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut text = String::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let mime_type = field.content_type().map(ToString::to_string).unwrap_or_default();
                let data = field.bytes().await.map_err(multipart_error)?;
                return Ok(SecretPayload::file(filename, mime_type, data.to_vec()));
            }
            Some("data") if text.is_empty() => text = field.text().await.map_err(multipart_error)?,
            _ => {}
        }
    }

    if text.is_empty() {
        return Err(ApiError::BadRequest("No secret data provided"));
    }
    Ok(SecretPayload::text(text))
}

fn multipart_error(e: multer::Error) -> ApiError {
    match e {
        multer::Error::StreamSizeExceeded { .. } => ApiError::BodyTooLarge,
        _ => ApiError::BadRequest(MULTIPART_ERROR),
    }
}

fn json<T: Serialize>(value: &T) -> Result<Response<Full<Bytes>>, ApiError> {
    let body = serde_json::to_vec(value).map_err(|e| ApiError::Encode(e.to_string()))?;
    response(StatusCode::OK, "application/json", body)
}

fn text(status: StatusCode, body: impl Into<String>) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from(body.into())));
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, hyper::header::HeaderValue::from_static("text/plain; charset=utf-8"));
    res
}

fn response(status: StatusCode, content_type: &str, body: Vec<u8>) -> Result<Response<Full<Bytes>>, ApiError> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(Bytes::from(body)))
        .map_err(|e| ApiError::Encode(e.to_string()))
}
