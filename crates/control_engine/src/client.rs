use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use url::Url;

use control_core::{FileUpload, HealthReport, StatusReport, TaskHandle, TaskRequest};
use control_logging::control_debug;

use crate::wire::{AckBody, FilesBody, HealthBody, SearchBody, ShopBody, StatusBody};
use crate::{BackendError, FailureKind, RemoteFile};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub health_interval: Duration,
    pub poll_interval: Duration,
    /// `None` leaves connects unbounded.
    pub connect_timeout: Option<Duration>,
    /// `None` leaves requests unbounded; a hung request only delays its own tick.
    pub request_timeout: Option<Duration>,
    pub download_dir: PathBuf,
    pub max_download_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            health_interval: Duration::from_secs(5),
            poll_interval: Duration::from_secs(2),
            connect_timeout: None,
            request_timeout: None,
            download_dir: PathBuf::from("downloads"),
            max_download_bytes: 64 * 1024 * 1024,
        }
    }
}

/// The scraper backend as seen by the client.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn health(&self) -> Result<HealthReport, BackendError>;

    /// Returns the backend's confirmation message.
    async fn initialize_driver(&self) -> Result<String, BackendError>;

    async fn submit(&self, request: &TaskRequest) -> Result<TaskHandle, BackendError>;

    async fn task_status(&self, handle: &TaskHandle) -> Result<StatusReport, BackendError>;

    async fn download(&self, file_name: &str) -> Result<Vec<u8>, BackendError>;

    async fn list_files(&self) -> Result<Vec<RemoteFile>, BackendError>;

    /// Closes the remote browser driver; returns the backend's message.
    async fn close_driver(&self) -> Result<String, BackendError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    base_url: Url,
    max_download_bytes: u64,
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(settings: &ClientSettings) -> Result<Self, BackendError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| BackendError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(BackendError::new(
                FailureKind::InvalidUrl,
                format!("unsupported backend address {base_url}"),
            ));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| BackendError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            base_url,
            max_download_bytes: settings.max_download_bytes,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base address, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::new(FailureKind::InvalidUrl, "base url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, BackendError> {
        let url = self.endpoint(segments)?;
        control_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn post_ack(&self, segments: &[&str]) -> Result<AckBody, BackendError> {
        let url = self.endpoint(segments)?;
        control_debug!("POST {}", url);
        let response = self.client.post(url).send().await.map_err(map_reqwest_error)?;
        read_json::<AckBody>(response).await?.accepted()
    }
}

#[async_trait::async_trait]
impl Backend for ReqwestBackend {
    /// Any reply with a readable body counts as connected, whatever its status code.
    async fn health(&self) -> Result<HealthReport, BackendError> {
        let body: HealthBody = self.get_json(&["api", "health"]).await?;
        Ok(HealthReport {
            driver_initialized: body.driver_initialized,
        })
    }

    async fn initialize_driver(&self) -> Result<String, BackendError> {
        let ack = self.post_ack(&["api", "initialize-driver"]).await?;
        Ok(ack
            .message
            .unwrap_or_else(|| "Driver initialized.".to_string()))
    }

    async fn submit(&self, request: &TaskRequest) -> Result<TaskHandle, BackendError> {
        let builder = match request {
            TaskRequest::Search { keyword, pages } => self
                .client
                .post(self.endpoint(&["api", "search"])?)
                .json(&SearchBody {
                    keyword,
                    pages: *pages,
                }),
            TaskRequest::Shop {
                shop_id,
                include_active,
                include_sold_out,
            } => self
                .client
                .post(self.endpoint(&["api", "shop"])?)
                .json(&ShopBody {
                    shop_id,
                    include_active: *include_active,
                    include_soldout: *include_sold_out,
                }),
            TaskRequest::Reviews { file, max_reviews } => {
                let form = Form::new()
                    .part("file", file_part(file))
                    .text("max_reviews", max_reviews.to_string());
                self.client
                    .post(self.endpoint(&["api", "reviews"])?)
                    .multipart(form)
            }
            TaskRequest::Analyze { file } => {
                let form = Form::new().part("file", file_part(file));
                self.client
                    .post(self.endpoint(&["api", "analyze"])?)
                    .multipart(form)
            }
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let ack = read_json::<AckBody>(response).await?.accepted()?;
        ack.task_id
            .filter(|id| !id.is_empty())
            .map(TaskHandle::new)
            .ok_or_else(|| BackendError::new(FailureKind::Decode, "accepted reply without task_id"))
    }

    async fn task_status(&self, handle: &TaskHandle) -> Result<StatusReport, BackendError> {
        let body: StatusBody = self
            .get_json(&["api", "task-status", handle.as_str()])
            .await?;
        body.into_report(chrono::Local::now().time())
    }

    async fn download(&self, file_name: &str) -> Result<Vec<u8>, BackendError> {
        let url = self.endpoint(&["api", "download", file_name])?;
        control_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = match read_json::<AckBody>(response).await {
                Ok(AckBody {
                    error: Some(error), ..
                }) => error,
                _ => status.to_string(),
            };
            return Err(BackendError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }

        let max_bytes = self.max_download_bytes;
        if response.content_length().is_some_and(|len| len > max_bytes) {
            return Err(BackendError::new(
                FailureKind::TooLarge { max_bytes },
                "artifact too large",
            ));
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(BackendError::new(
                    FailureKind::TooLarge { max_bytes },
                    "artifact too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, BackendError> {
        let body: FilesBody = self.get_json(&["api", "files"]).await?;
        Ok(body.files)
    }

    async fn close_driver(&self) -> Result<String, BackendError> {
        let ack = self.post_ack(&["api", "cleanup"]).await?;
        Ok(ack.message.unwrap_or_else(|| "Driver closed".to_string()))
    }
}

fn file_part(file: &FileUpload) -> Part {
    Part::bytes(file.bytes.clone()).file_name(file.file_name.clone())
}

/// Decodes a JSON body. Error statuses still carry JSON (`{"error": ...}`) on
/// this backend, so the status code only matters when the body is unreadable.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    match serde_json::from_slice::<T>(&body) {
        Ok(value) => Ok(value),
        Err(err) if status.is_success() => {
            Err(BackendError::new(FailureKind::Decode, err.to_string()))
        }
        Err(_) => Err(BackendError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        )),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        return BackendError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return BackendError::new(FailureKind::Decode, err.to_string());
    }
    BackendError::new(FailureKind::Network, err.to_string())
}
