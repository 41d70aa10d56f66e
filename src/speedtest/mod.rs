use anyhow::{Context, Result};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use thiserror::Error;

pub use server::{SelectedServer, Server};

mod http;
mod server;

#[derive(Debug, Error)]
pub enum SpeedtestError {
    /// The fixed server id was not present in the directory listing.
    #[error("no speedtest server matching id(s) {0:?}")]
    NoMatchingServer(Vec<String>),
    /// Every candidate failed its latency probes.
    #[error("no speedtest server answered latency probes")]
    NoUsableServer,
}

/// Client for the speedtest.net measurement flow: directory lookup, latency
/// probing, then one download and one upload transfer test.
pub struct SpeedtestClient {
    http: Client,
}

impl SpeedtestClient {
    pub fn new() -> Result<Self> {
        let http = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http })
    }

    /// Fetch the server directory and keep the entries matching `ids`.
    pub async fn servers_by_id(&self, ids: &[&str]) -> Result<Vec<Server>> {
        server::fetch_by_id(&self.http, ids).await
    }

    /// Probe every candidate and return the one with the lowest round trip,
    /// together with that latency in milliseconds.
    pub async fn best_server(&self, candidates: Vec<Server>) -> Result<SelectedServer> {
        http::best_server(&self.http, candidates).await
    }

    /// Download throughput against `server`, in Mbps.
    pub async fn download(&self, server: &Server) -> Result<f64> {
        http::download_test(&self.http, server).await
    }

    /// Upload throughput against `server`, in Mbps.
    pub async fn upload(&self, server: &Server) -> Result<f64> {
        http::upload_test(&self.http, server).await
    }
}
