use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::SpeedtestError;
use crate::constants::{SERVER_LIST_LIMIT, SERVER_LIST_URL};

/// One entry of the speedtest.net server directory. The directory carries
/// more fields (coordinates, distance); only the ones used here are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub sponsor: String,
    pub name: String,
    pub country: String,
    pub host: String,
    /// Upload endpoint, e.g. "http://host:8080/speedtest/upload.php".
    /// Test resources are resolved as siblings of this path.
    pub url: String,
}

/// A server that answered its latency probes, with the measured minimum
/// round trip. The latency doubles as the run's ping value.
#[derive(Debug, Clone)]
pub struct SelectedServer {
    pub server: Server,
    pub latency_ms: f64,
}

pub(super) async fn fetch_by_id(http: &Client, ids: &[&str]) -> Result<Vec<Server>> {
    let limit = SERVER_LIST_LIMIT.to_string();
    let listing: Vec<Server> = http
        .get(SERVER_LIST_URL)
        .query(&[("engine", "js"), ("limit", limit.as_str())])
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .context("speedtest server directory request failed")?
        .json()
        .await
        .context("speedtest server directory was not valid JSON")?;

    debug!(total = listing.len(), "fetched speedtest server directory");

    let matching = filter_by_id(listing, ids);
    if matching.is_empty() {
        let ids = ids.iter().map(|id| id.to_string()).collect();
        return Err(SpeedtestError::NoMatchingServer(ids).into());
    }
    Ok(matching)
}

fn filter_by_id(servers: Vec<Server>, ids: &[&str]) -> Vec<Server> {
    servers
        .into_iter()
        .filter(|server| ids.contains(&server.id.as_str()))
        .collect()
}

/// Resolve a test resource (latency.txt, random....jpg) as a sibling of the
/// server's upload endpoint.
pub(super) fn resource_url(server_url: &str, resource: &str) -> Result<Url> {
    let base =
        Url::parse(server_url).with_context(|| format!("invalid server url '{server_url}'"))?;
    base.join(resource)
        .with_context(|| format!("cannot resolve '{resource}' against '{server_url}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trimmed-down directory entry as the JS API returns it; unknown fields
    // must not break decoding.
    const DIRECTORY_FIXTURE: &str = r#"[
        {
            "url": "http://speedtest.ridgewireless.net:8080/speedtest/upload.php",
            "lat": "41.0000",
            "lon": "-81.0000",
            "distance": 12,
            "name": "Ohio",
            "country": "United States",
            "cc": "US",
            "sponsor": "RidgeWireless",
            "id": "12818",
            "host": "speedtest.ridgewireless.net:8080"
        },
        {
            "url": "http://other.example.net/speedtest/upload.php",
            "lat": "0.0",
            "lon": "0.0",
            "distance": 900,
            "name": "Elsewhere",
            "country": "Nowhere",
            "cc": "NW",
            "sponsor": "Other ISP",
            "id": "99999",
            "host": "other.example.net:8080"
        }
    ]"#;

    #[test]
    fn test_directory_decoding_ignores_unknown_fields() {
        let servers: Vec<Server> = serde_json::from_str(DIRECTORY_FIXTURE).unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].id, "12818");
        assert_eq!(servers[0].sponsor, "RidgeWireless");
        assert_eq!(servers[0].host, "speedtest.ridgewireless.net:8080");
    }

    #[test]
    fn test_filter_by_id() {
        let servers: Vec<Server> = serde_json::from_str(DIRECTORY_FIXTURE).unwrap();
        let matching = filter_by_id(servers, &["12818"]);
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].id, "12818");
    }

    #[test]
    fn test_filter_by_id_no_match() {
        let servers: Vec<Server> = serde_json::from_str(DIRECTORY_FIXTURE).unwrap();
        assert!(filter_by_id(servers, &["1"]).is_empty());
    }

    #[test]
    fn test_resource_url_replaces_last_segment() {
        let url = resource_url(
            "http://speedtest.ridgewireless.net:8080/speedtest/upload.php",
            "latency.txt",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://speedtest.ridgewireless.net:8080/speedtest/latency.txt"
        );

        let url = resource_url(
            "http://speedtest.ridgewireless.net:8080/speedtest/upload.php",
            "random2500x2500.jpg",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://speedtest.ridgewireless.net:8080/speedtest/random2500x2500.jpg"
        );
    }

    #[test]
    fn test_resource_url_rejects_garbage() {
        assert!(resource_url("not a url", "latency.txt").is_err());
    }
}
