//! HTTP content source talking to an origin or replica server.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use packmirror_common::{Error, Profile, Result, TreePath};
use packmirror_tree::TreeNode;

use crate::source::{ByteStream, ContentSource, FileCount};

/// Characters escaped inside one URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'/')
    .add(b'\\');

/// Default per-request timeout. Expiry surfaces as a network error.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP implementation of `ContentSource`.
pub struct HttpOrigin {
    http: Client,
    base: String,
}

impl HttpOrigin {
    /// Create a client for the given origin base URL.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if the base URL does not parse
    pub fn new(base: &str) -> Result<Self> {
        Self::with_timeout(base, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout.
    pub fn with_timeout(base: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base)
            .map_err(|e| Error::InvalidInput(format!("invalid origin URL '{}': {}", base, e)))?;

        let http = Client::builder()
            .user_agent("PackMirror/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Build the URL for a static file in the published tree.
    fn static_url(&self, path: &TreePath) -> String {
        let mut url = format!("{}/static", self.base);
        for component in path.components() {
            url.push('/');
            url.push_str(&utf8_percent_encode(component, SEGMENT).to_string());
        }
        url
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::NOT_FOUND {
            Err(Error::NotFound(format!("{} returned 404", url)))
        } else {
            Err(Error::Network(format!("GET {} returned {}", url, status)))
        }
    }

    /// Server build version string.
    pub async fn version(&self) -> Result<String> {
        let response = self.get(&format!("{}/version", self.base)).await?;
        response
            .text()
            .await
            .map_err(|e| Error::Network(format!("failed to read version: {}", e)))
    }

    /// Force an out-of-band rebuild/reconcile cycle on the peer.
    pub async fn reload(&self) -> Result<()> {
        let url = format!("{}/reload", self.base);
        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("POST {} failed: {}", url, e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Network(format!(
                "POST {} returned {}",
                url,
                response.status()
            )))
        }
    }
}

#[async_trait]
impl ContentSource for HttpOrigin {
    fn name(&self) -> &str {
        &self.base
    }

    async fn fetch_tree(&self) -> Result<TreeNode> {
        let response = self.get(&format!("{}/hashes", self.base)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("failed to read tree body: {}", e)))?;

        TreeNode::from_json(&body)
    }

    async fn fetch_profiles(&self) -> Result<Vec<Profile>> {
        let response = self.get(&format!("{}/profiles", self.base)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("failed to read profiles body: {}", e)))?;

        serde_json::from_str(&body)
            .map_err(|e| Error::Protocol(format!("malformed profile list: {}", e)))
    }

    async fn file_count(&self, game_folder: &str) -> Result<u64> {
        let url = format!(
            "{}/fileCount/{}",
            self.base,
            utf8_percent_encode(game_folder, SEGMENT)
        );
        let response = self.get(&url).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("failed to read file count: {}", e)))?;

        let parsed: FileCount = serde_json::from_str(&body)
            .map_err(|e| Error::Protocol(format!("malformed file count: {}", e)))?;
        Ok(parsed.count)
    }

    async fn fetch_file(&self, path: &TreePath) -> Result<ByteStream> {
        let url = self.static_url(path);
        debug!(%url, "downloading file");

        let response = self.get(&url).await?;
        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| Error::Network(format!("stream read error: {}", e))));

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_url_encodes_segments() {
        let origin = HttpOrigin::new("http://origin:8080/").unwrap();
        let path = TreePath::parse("/gameFolders/sky block/mod 100%.jar").unwrap();

        assert_eq!(
            origin.static_url(&path),
            "http://origin:8080/static/gameFolders/sky%20block/mod%20100%25.jar"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(matches!(
            HttpOrigin::new("not a url"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_name_is_trimmed_base() {
        let origin = HttpOrigin::new("http://origin:8080/").unwrap();
        assert_eq!(origin.name(), "http://origin:8080");
    }
}
