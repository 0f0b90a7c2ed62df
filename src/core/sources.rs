use std::{fs, path::PathBuf, sync::Once, time::Duration};

use actix_web::web;
use async_trait::async_trait;
use awc::{error::SendRequestError, Client, ClientRequest};
use serde_json::Value;
use tracing::debug;

use crate::error::SourceError;

/// Upper bound for any upstream document.
pub const MAX_PAYLOAD_BYTES: usize = 8 * 1024 * 1024;

pub const SANITY_QUERY: &str = r#"*[_type == "project"] | order(order asc) {
  "id": order,
  order,
  title,
  description,
  tags,
  color,
  "thumbnail": { "url": thumbnail.asset->url },
  "gallery": gallery[]{ "url": asset->url, type },
  about,
  results
}"#;

static TLS_PROVIDER: Once = Once::new();

/// Client shared by the remote sources of one worker.
///
/// rustls needs a process-wide crypto provider before the first TLS
/// connector is built; ring is installed here on first use.
pub fn http_client(timeout: Duration) -> Client {
    TLS_PROVIDER.call_once(|| {
        if rustls::crypto::ring::default_provider().install_default().is_err() {
            debug!("A TLS crypto provider was already installed");
        }
    });
    Client::builder().timeout(timeout).finish()
}

/// One origin of raw project records.
///
/// Implementations make a single attempt per call; retrying is the chain's
/// business (it doesn't).
#[async_trait(?Send)]
pub trait ProjectSource {
    fn name(&self) -> &str;

    /// Base URL prepended to relative media references from this source.
    fn media_base(&self) -> &str;

    fn is_remote(&self) -> bool {
        true
    }

    async fn fetch(&self) -> Result<Vec<Value>, SourceError>;
}

/// Sends one request and parses the response body as JSON.
pub async fn fetch_document(request: ClientRequest) -> Result<Value, SourceError> {
    let mut response = request.send().await.map_err(|error| match error {
        SendRequestError::Timeout => SourceError::Timeout,
        other => SourceError::Transport(other.to_string()),
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }
    let body = response
        .body()
        .limit(MAX_PAYLOAD_BYTES)
        .await
        .map_err(|error| SourceError::Transport(error.to_string()))?;
    debug!("Received {} bytes", body.len());
    Ok(serde_json::from_slice(&body)?)
}

/// Pulls the record list out of `{ <key>: [...] }`.
pub fn envelope(document: Value, key: &str) -> Result<Vec<Value>, SourceError> {
    match document {
        Value::Object(mut fields) => match fields.remove(key) {
            Some(Value::Array(records)) => Ok(records),
            Some(_) => Err(SourceError::Payload(format!("\"{}\" is not a list", key))),
            None => Err(SourceError::Payload(format!("missing \"{}\"", key))),
        },
        _ => Err(SourceError::Payload("document is not an object".to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotLocation {
    File(PathBuf),
    Url(String),
}

impl SnapshotLocation {
    pub fn parse(location: &str) -> Self {
        let lower = location.trim().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SnapshotLocation::Url(location.trim().to_string())
        } else {
            SnapshotLocation::File(PathBuf::from(location.trim()))
        }
    }
}

/// The baked `{ projects: [...] }` document, on disk or behind a URL.
pub struct StaticSource {
    location: SnapshotLocation,
    media_base: String,
    client: Client,
}

impl StaticSource {
    pub fn new(location: SnapshotLocation, media_base: String, client: Client) -> Self {
        StaticSource {
            location,
            media_base,
            client,
        }
    }
}

#[async_trait(?Send)]
impl ProjectSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn media_base(&self) -> &str {
        &self.media_base
    }

    fn is_remote(&self) -> bool {
        false
    }

    async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
        let document = match &self.location {
            SnapshotLocation::File(path) => {
                let path = path.clone();
                let bytes = web::block(move || fs::read(path))
                    .await
                    .map_err(|error| SourceError::Transport(error.to_string()))??;
                debug!("Read {} bytes of static projects", bytes.len());
                serde_json::from_slice(&bytes)?
            }
            SnapshotLocation::Url(url) => fetch_document(self.client.get(url)).await?,
        };
        envelope(document, "projects")
    }
}

pub struct StrapiSource {
    base_url: String,
    client: Client,
}

impl StrapiSource {
    pub fn new(base_url: String, client: Client) -> Self {
        StrapiSource { base_url, client }
    }

    pub fn projects_url(&self) -> String {
        format!("{}/api/projects?populate=*&sort=order:asc", self.base_url)
    }
}

#[async_trait(?Send)]
impl ProjectSource for StrapiSource {
    fn name(&self) -> &str {
        "strapi"
    }

    fn media_base(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
        let document = fetch_document(self.client.get(self.projects_url())).await?;
        envelope(document, "data")
    }
}

pub struct SanitySource {
    project_id: String,
    dataset: String,
    api_version: String,
    use_cdn: bool,
    client: Client,
}

impl SanitySource {
    pub fn new(
        project_id: String,
        dataset: String,
        api_version: String,
        use_cdn: bool,
        client: Client,
    ) -> Self {
        SanitySource {
            project_id,
            dataset,
            api_version,
            use_cdn,
            client,
        }
    }

    pub fn query_url(&self) -> String {
        let host = if self.use_cdn { "apicdn" } else { "api" };
        format!(
            "https://{}.{}.sanity.io/v{}/data/query/{}",
            self.project_id,
            host,
            self.api_version.trim_start_matches('v'),
            self.dataset
        )
    }
}

#[async_trait(?Send)]
impl ProjectSource for SanitySource {
    fn name(&self) -> &str {
        "sanity"
    }

    // Sanity hands out absolute CDN URLs.
    fn media_base(&self) -> &str {
        ""
    }

    async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
        let request = self
            .client
            .get(self.query_url())
            .query(&[("query", SANITY_QUERY)])
            .map_err(|error| SourceError::Transport(error.to_string()))?;
        let document = fetch_document(request).await?;
        envelope(document, "result")
    }
}
