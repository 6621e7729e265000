//! Fetches a conference program and reads its talks.
//!
//! The reader is constructed with the program address, fetched once with
//! [`ProgramReader::parse`], and afterwards exposes the talks in program order.

use std::time::Duration;

use reqwest::Client;
use talkmeta_shared::{Catalog, FetchOptions, Result, TalkMetaError, Talk};
use tracing::{debug, info, instrument};
use url::Url;

use crate::adapters::LayoutRegistry;

/// User-Agent string for program requests.
const USER_AGENT: &str = concat!("TalkMeta/", env!("CARGO_PKG_VERSION"));

/// Maximum response size we consider a plausible program page (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// Reads the talks published at a program address.
pub struct ProgramReader {
    address: Url,
    client: Client,
    registry: LayoutRegistry,
    talks: Vec<Talk>,
}

impl ProgramReader {
    /// Create a reader for `address`. Nothing is fetched until [`parse`](Self::parse).
    pub fn new(address: &str, options: &FetchOptions) -> Result<Self> {
        let address = Url::parse(address).map_err(|e| {
            TalkMetaError::validation(format!("invalid program address '{address}': {e}"))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| TalkMetaError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            address,
            client,
            registry: LayoutRegistry::new(),
            talks: Vec::new(),
        })
    }

    /// The address this reader was created with.
    pub fn address(&self) -> &Url {
        &self.address
    }

    /// Fetch the program and extract its talks, replacing any previous result.
    #[instrument(skip_all, fields(address = %self.address))]
    pub async fn parse(&mut self) -> Result<()> {
        let body = self.fetch().await?;
        self.talks = self.registry.parse_program(&body)?;

        info!(talks = self.talks.len(), "program parsed");
        Ok(())
    }

    /// Talks found by the last [`parse`](Self::parse), in program order.
    pub fn talks(&self) -> &[Talk] {
        &self.talks
    }

    /// Consume the reader into an immutable catalog.
    pub fn into_catalog(self) -> Catalog {
        Catalog::new(self.talks)
    }

    async fn fetch(&self) -> Result<String> {
        match self.address.scheme() {
            "http" | "https" => fetch_http(&self.client, &self.address).await,
            "file" => fetch_file(&self.address).await,
            other => Err(TalkMetaError::Network(format!(
                "{}: unsupported scheme '{other}'",
                self.address
            ))),
        }
    }
}

/// Fetch a program page over HTTP(S).
async fn fetch_http(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching program page");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| TalkMetaError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TalkMetaError::Network(format!("{url}: HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE {
            return Err(TalkMetaError::parse(format!(
                "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    response
        .text()
        .await
        .map_err(|e| TalkMetaError::Network(format!("{url}: failed to read body: {e}")))
}

/// Read a program page from a `file://` address.
async fn fetch_file(url: &Url) -> Result<String> {
    let path = url
        .to_file_path()
        .map_err(|_| TalkMetaError::Network(format!("{url}: not a local file path")))?;

    debug!(path = %path.display(), "reading program file");

    tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| TalkMetaError::io(&path, e))
}
