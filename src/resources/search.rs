//! Search service client (Elasticsearch HTTP API).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::config::SearchSettings;
use crate::resources::error::{BackendError, ReleaseError, SearchError};
use crate::resources::{endpoint_url, BackendKind, Resource};

/// Shared handle to the search cluster.
#[derive(Debug)]
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
    username: Option<String>,
    password: Option<SecretString>,
    released: AtomicBool,
}

impl SearchClient {
    /// Build the client and verify the cluster answers on its root endpoint.
    pub(crate) async fn connect(settings: &SearchSettings) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        let search = Self {
            client,
            endpoint: settings.endpoint.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            released: AtomicBool::new(false),
        };
        search.probe().await?;

        tracing::info!(endpoint = %settings.endpoint, "Search client ready");
        Ok(search)
    }

    /// Round trip to the cluster root.
    pub async fn ping(&self) -> Result<(), SearchError> {
        self.ensure_open()?;
        self.probe().await.map_err(SearchError::from)
    }

    /// Create or replace a document.
    pub async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &serde_json::Value,
    ) -> Result<(), SearchError> {
        self.ensure_open()?;
        let url = self.url(&format!("{}/_doc/{}", index, id))?;
        let response = self
            .authorize(self.client.put(url))
            .json(document)
            .send()
            .await
            .map_err(BackendError::from)?;
        check_status(&response)?;
        Ok(())
    }

    /// Run a query DSL body against an index and return the raw response.
    pub async fn search(
        &self,
        index: &str,
        query: &serde_json::Value,
    ) -> Result<serde_json::Value, SearchError> {
        self.ensure_open()?;
        let url = self.url(&format!("{}/_search", index))?;
        let response = self
            .authorize(self.client.post(url))
            .json(query)
            .send()
            .await
            .map_err(BackendError::from)?;
        check_status(&response)?;
        let body = response.json().await.map_err(BackendError::from)?;
        Ok(body)
    }

    pub fn is_open(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
    }

    async fn probe(&self) -> Result<(), BackendError> {
        let url = self.url("")?;
        let response = self.authorize(self.client.get(url)).send().await?;
        check_status(&response)
    }

    fn url(&self, path: &str) -> Result<Url, BackendError> {
        endpoint_url(&self.endpoint, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(
                username,
                self.password.as_ref().map(|p| p.expose_secret()),
            ),
            None => request,
        }
    }

    fn ensure_open(&self) -> Result<(), SearchError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(SearchError::Released)
        }
    }
}

#[async_trait]
impl Resource for SearchClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Search
    }

    /// The client holds no server-side state; releasing stops further use.
    async fn release(&self) -> Result<(), ReleaseError> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn check_status(response: &reqwest::Response) -> Result<(), BackendError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(BackendError::Rejected {
            status: response.status().as_u16(),
        })
    }
}
