pub mod graph;
pub mod weather;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::LookupError;

pub use graph::GraphLookup;
pub use weather::{StaticWeatherLookup, WeatherLookup};

/// Performs the side-effecting work behind one tool. Arguments arrive
/// already decoded into a typed record; the output is serialized into the
/// success envelope and into the handler's displayed state.
///
/// Implementations must not panic on bad input — every failure, including
/// a dependent external call going wrong, becomes a [`LookupError`] whose
/// message is fed back to the model.
#[async_trait]
pub trait LookupAdapter: Send + Sync + 'static {
    type Args: DeserializeOwned + Send;
    type Output: Serialize + Send;

    async fn lookup(&self, args: Self::Args) -> Result<Self::Output, LookupError>;
}

/// One HTTP GET returning JSON. Seam between adapters and the network so
/// multi-step lookups are testable without one.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get_json(&self, url: Url) -> Result<Value, LookupError>;
}

/// Production fetcher backed by a shared reqwest client.
pub struct HttpFetch {
    client: reqwest::Client,
}

impl HttpFetch {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetch for HttpFetch {
    async fn get_json(&self, url: Url) -> Result<Value, LookupError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::new(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::new(format!("request returned {status}")));
        }

        resp.json()
            .await
            .map_err(|e| LookupError::new(format!("invalid JSON body: {e}")))
    }
}
