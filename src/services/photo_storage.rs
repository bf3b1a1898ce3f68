use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use uuid::Uuid;

use crate::utils::validation::{check_photo, ValidationError};

/// An image attached to a new issue, held in memory until it is stored.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_photo(&self.content_type, self.bytes.len())
    }

    /// File extension for the stored object: taken from the uploaded name
    /// when it has a sane one, otherwise from the image subtype.
    pub fn extension(&self) -> String {
        let from_name = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
        match from_name {
            Some(ext) => ext.to_ascii_lowercase(),
            None => self
                .content_type
                .split_once('/')
                .map(|(_, subtype)| subtype.split(['+', ';']).next().unwrap_or(subtype))
                .unwrap_or("img")
                .trim()
                .to_ascii_lowercase(),
        }
    }
}

/// External object storage for issue photos.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Stores the photo and returns the public URL to keep on the issue.
    async fn upload(&self, photo: &PhotoUpload) -> Result<String>;

    /// Deletes a previously uploaded photo by its public URL.
    async fn remove(&self, public_url: &str) -> Result<()>;
}

pub struct SupabasePhotoStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabasePhotoStore {
    pub fn new(base_url: &str, api_key: &str, bucket: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("issue-tracker/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build storage HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    fn public_prefix(&self) -> String {
        format!("{}/storage/v1/object/public/{}/", self.base_url, self.bucket)
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}{}", self.public_prefix(), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        Ok(headers)
    }
}

#[async_trait]
impl PhotoStore for SupabasePhotoStore {
    async fn upload(&self, photo: &PhotoUpload) -> Result<String> {
        let path = format!("issues/{}.{}", Uuid::new_v4(), photo.extension());

        let mut headers = self.headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(&photo.content_type)?);
        headers.insert("x-upsert", HeaderValue::from_static("false"));

        let res = self
            .client
            .post(self.object_url(&path))
            .headers(headers)
            .body(photo.bytes.clone())
            .send()
            .await
            .context("storage upload request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("storage upload error: status={} body={}", status, truncate(&body));
        }

        tracing::info!("Uploaded photo {} ({} bytes)", path, photo.bytes.len());
        Ok(self.public_url(&path))
    }

    async fn remove(&self, public_url: &str) -> Result<()> {
        let path = public_url
            .strip_prefix(&self.public_prefix())
            .with_context(|| format!("'{}' is not in bucket {}", public_url, self.bucket))?;

        let res = self
            .client
            .delete(self.object_url(path))
            .headers(self.headers()?)
            .send()
            .await
            .context("storage delete request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("storage delete error: status={} body={}", status, truncate(&body));
        }
        Ok(())
    }
}

fn truncate(s: &str) -> String {
    const MAX: usize = 512;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
