use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};
use crate::models::{
    ConnectionConfig, ConnectionStatus, File, FilePatch, FileSystem, Folder, FolderPatch,
};

use super::StorageProvider;

/// Body every route answers with. Only the fields relevant to the route
/// are present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    use_local_storage: bool,
    #[serde(default)]
    file_system: Option<FileSystem>,
    #[serde(default)]
    file: Option<File>,
    #[serde(default)]
    folder: Option<Folder>,
}

impl Envelope {
    fn reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "no error message".to_string())
    }
}

/// Turns a raw response into an envelope, or the failure it represents.
///
/// Any of: a server "use local storage" signal, a non-2xx status, a body
/// that isn't JSON, or `success: false` counts as a failure.
fn interpret(status: u16, content_type: Option<&str>, body: &str) -> StorageResult<Envelope> {
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);
    let envelope: Option<Envelope> = if is_json {
        serde_json::from_str(body).ok()
    } else {
        None
    };

    if let Some(env) = &envelope {
        if env.use_local_storage {
            return Err(StorageError::UseLocalStorage(env.reason()));
        }
    }

    let reason = || {
        envelope
            .as_ref()
            .map(Envelope::reason)
            .unwrap_or_else(|| body.chars().take(200).collect())
    };

    match status {
        200..=299 => {}
        400..=499 => {
            return Err(StorageError::Rejected {
                status,
                message: reason(),
            })
        }
        _ => {
            return Err(StorageError::Http {
                status,
                message: reason(),
            })
        }
    }

    let env = match envelope {
        Some(env) => env,
        None if !is_json => {
            return Err(StorageError::MalformedResponse(format!(
                "expected application/json, got {}",
                content_type.unwrap_or("no content type")
            )))
        }
        None => {
            return Err(StorageError::MalformedResponse(
                "response body is not a valid envelope".to_string(),
            ))
        }
    };

    if !env.success {
        return Err(StorageError::Http {
            status,
            message: env.reason(),
        });
    }
    Ok(env)
}

/// Talks to the storage server's REST routes.
///
/// The provider owns its own HTTP client; dropping the provider drops the
/// connection pool with it.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    base_url: String,
    database: ConnectionConfig,
    timeout: Duration,
    client: Client,
}

impl HttpProvider {
    pub fn new(config: &ConnectionConfig, timeout: Duration) -> StorageResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            database: config.clone(),
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, route: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, route))
    }

    async fn send(&self, request: RequestBuilder) -> StorageResult<Envelope> {
        execute(request).await
    }

    async fn send_json<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        route: &str,
        body: &B,
    ) -> StorageResult<Envelope> {
        self.send(self.request(method, route).json(body)).await
    }
}

async fn execute(request: RequestBuilder) -> StorageResult<Envelope> {
    let response = request.send().await?;
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await?;
    interpret(status, content_type.as_deref(), &body)
}

fn missing(field: &str) -> StorageError {
    StorageError::MalformedResponse(format!("response is missing `{}`", field))
}

#[async_trait]
impl StorageProvider for HttpProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn load(&self) -> StorageResult<FileSystem> {
        let env = self.send(self.request(Method::GET, "file-system")).await?;
        env.file_system.ok_or_else(|| missing("fileSystem"))
    }

    async fn create_folder(&self, folder: &Folder) -> StorageResult<Folder> {
        let env = self.send_json(Method::POST, "folders", folder).await?;
        Ok(env.folder.unwrap_or_else(|| folder.clone()))
    }

    async fn create_file(&self, file: &File) -> StorageResult<File> {
        let env = self.send_json(Method::POST, "files", file).await?;
        Ok(env.file.unwrap_or_else(|| file.clone()))
    }

    async fn update_folder(&self, id: &str, patch: &FolderPatch) -> StorageResult<Folder> {
        let env = self
            .send_json(Method::PUT, &format!("folders/{}", id), patch)
            .await?;
        env.folder.ok_or_else(|| missing("folder"))
    }

    async fn update_file(&self, id: &str, patch: &FilePatch) -> StorageResult<File> {
        let env = self
            .send_json(Method::PUT, &format!("files/{}", id), patch)
            .await?;
        env.file.ok_or_else(|| missing("file"))
    }

    async fn delete_folder(&self, id: &str) -> StorageResult<()> {
        self.send(self.request(Method::DELETE, &format!("folders/{}", id)))
            .await
            .map(|_| ())
    }

    async fn delete_file(&self, id: &str) -> StorageResult<()> {
        self.send(self.request(Method::DELETE, &format!("files/{}", id)))
            .await
            .map(|_| ())
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> ConnectionStatus {
        // Throwaway client: the connection test must not reuse or disturb our pool.
        let client = match Client::builder().timeout(self.timeout).build() {
            Ok(client) => client,
            Err(e) => return ConnectionStatus::failed(format!("Could not build client: {}", e)),
        };
        let url = format!("{}/test-connection", config.api_url.trim_end_matches('/'));
        match execute(client.post(url).json(config)).await {
            Ok(env) => ConnectionStatus::ok(
                env.message
                    .unwrap_or_else(|| format!("Connected to {}", config.database)),
            ),
            Err(e) => ConnectionStatus::failed(e.to_string()),
        }
    }

    async fn init(&self) -> StorageResult<()> {
        let env = self
            .send_json(Method::POST, "init-db", &self.database)
            .await?;
        if let Some(message) = env.message {
            log::info!("Remote schema bootstrap: {}", message);
        }
        Ok(())
    }
}
