use anyhow::{Result, ensure};
use bytes::Bytes;
use futures::stream::StreamExt;
use rand::{prelude::*, rng};
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use super::SpeedtestError;
use super::server::{SelectedServer, Server, resource_url};
use crate::constants::{
    DOWNLOAD_RESOURCE, LATENCY_PROBES, LATENCY_RESOURCE, PARALLEL_CONNECTIONS, TRANSFER_DURATION,
    UPLOAD_PAYLOAD_SIZE,
};

pub(super) async fn best_server(http: &Client, candidates: Vec<Server>) -> Result<SelectedServer> {
    let mut best: Option<SelectedServer> = None;

    for server in candidates {
        match measure_latency(http, &server).await {
            Ok(latency_ms) => {
                debug!(id = %server.id, host = %server.host, latency_ms, "latency probe");
                if best.as_ref().is_none_or(|b| latency_ms < b.latency_ms) {
                    best = Some(SelectedServer { server, latency_ms });
                }
            }
            Err(err) => {
                debug!(id = %server.id, host = %server.host, %err, "latency probe failed");
            }
        }
    }

    best.ok_or_else(|| SpeedtestError::NoUsableServer.into())
}

/// Minimum round trip over a fixed number of GETs of the server's
/// latency.txt, in milliseconds.
async fn measure_latency(http: &Client, server: &Server) -> Result<f64> {
    let url = resource_url(&server.url, LATENCY_RESOURCE)?;
    let mut best = f64::INFINITY;

    for _ in 0..LATENCY_PROBES {
        let url = cache_busted(&url);
        let started = Instant::now();
        let response = http.get(url).send().await?.error_for_status()?;
        let _ = response.bytes().await?;
        best = best.min(started.elapsed().as_secs_f64() * 1000.0);
    }

    Ok(best)
}

pub(super) async fn download_test(http: &Client, server: &Server) -> Result<f64> {
    let url = resource_url(&server.url, DOWNLOAD_RESOURCE)?;
    debug!(%url, connections = PARALLEL_CONNECTIONS, "starting download test");

    let total = Arc::new(AtomicU64::new(0));
    let started = Instant::now();
    let deadline = started + TRANSFER_DURATION;

    let mut tasks = Vec::new();
    for connection in 0..PARALLEL_CONNECTIONS {
        let http = http.clone();
        let url = url.clone();
        let total = Arc::clone(&total);

        tasks.push(tokio::spawn(async move {
            while Instant::now() < deadline {
                if let Err(err) = stream_download(&http, &url, &total, deadline).await {
                    debug!(connection, %err, "download connection stopped");
                    break;
                }
            }
        }));
    }
    for task in tasks {
        let _ = task.await;
    }

    let bytes = total.load(Ordering::Relaxed);
    ensure!(bytes > 0, "download test transferred no data");
    Ok(mbps(bytes, started.elapsed()))
}

async fn stream_download(
    http: &Client,
    url: &Url,
    total: &AtomicU64,
    deadline: Instant,
) -> Result<()> {
    let response = http
        .get(cache_busted(url))
        .send()
        .await?
        .error_for_status()?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        total.fetch_add(chunk?.len() as u64, Ordering::Relaxed);
        if Instant::now() >= deadline {
            break;
        }
    }
    Ok(())
}

pub(super) async fn upload_test(http: &Client, server: &Server) -> Result<f64> {
    let url = Url::parse(&server.url)?;
    debug!(%url, connections = PARALLEL_CONNECTIONS, "starting upload test");

    let mut payload = vec![0u8; UPLOAD_PAYLOAD_SIZE];
    rng().fill_bytes(&mut payload);
    let payload = Bytes::from(payload);

    let total = Arc::new(AtomicU64::new(0));
    let started = Instant::now();
    let deadline = started + TRANSFER_DURATION;

    let mut tasks = Vec::new();
    for connection in 0..PARALLEL_CONNECTIONS {
        let http = http.clone();
        let url = url.clone();
        let payload = payload.clone();
        let total = Arc::clone(&total);

        tasks.push(tokio::spawn(async move {
            while Instant::now() < deadline {
                let request = http.post(cache_busted(&url)).body(payload.clone());
                match request.send().await.and_then(|r| r.error_for_status()) {
                    Ok(_) => {
                        total.fetch_add(payload.len() as u64, Ordering::Relaxed);
                    }
                    Err(err) => {
                        debug!(connection, %err, "upload connection stopped");
                        break;
                    }
                }
            }
        }));
    }
    for task in tasks {
        let _ = task.await;
    }

    let bytes = total.load(Ordering::Relaxed);
    ensure!(bytes > 0, "upload test transferred no data");
    Ok(mbps(bytes, started.elapsed()))
}

/// Append a random query value so intermediaries cannot serve the test
/// resource from cache.
fn cache_busted(url: &Url) -> Url {
    let mut url = url.clone();
    url.query_pairs_mut()
        .append_pair("x", &rng().random::<u32>().to_string());
    url
}

fn mbps(bytes: u64, elapsed: Duration) -> f64 {
    (bytes as f64 * 8.0) / (elapsed.as_secs_f64() * 1_000_000.0)
}
