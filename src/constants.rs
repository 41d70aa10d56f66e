use std::time::Duration;

/// speedtest.net id of the one server every run measures against.
pub const SPEEDTEST_SERVER_ID: &str = "12818"; // RidgeWireless

/// OAuth client secret, read from the working directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";
/// Where the OAuth flow persists refreshed tokens between runs.
pub const TOKEN_CACHE_FILE: &str = "token_cache.json";

/// Environment variable naming the destination spreadsheet.
pub const SPREADSHEET_ENV: &str = "SPREADSHEET";
/// Destination spreadsheet name when the variable is unset.
pub const DEFAULT_SPREADSHEET: &str = "Speedtest";

/// speedtest.net server directory (JSON).
pub const SERVER_LIST_URL: &str = "https://www.speedtest.net/api/js/servers";
/// Directory page size; the fixed server must appear within it.
pub const SERVER_LIST_LIMIT: usize = 1000;

/// GET probes per candidate when picking the best server.
pub const LATENCY_PROBES: usize = 3;
/// Concurrent connections per transfer test.
pub const PARALLEL_CONNECTIONS: usize = 4;
/// Wall-clock duration of each transfer test.
pub const TRANSFER_DURATION: Duration = Duration::from_secs(10);
/// Random payload POSTed repeatedly by the upload test.
pub const UPLOAD_PAYLOAD_SIZE: usize = 8 * 1024 * 1024; // 8MiB

/// Test resources resolved against the server's upload endpoint.
pub const LATENCY_RESOURCE: &str = "latency.txt";
pub const DOWNLOAD_RESOURCE: &str = "random2500x2500.jpg";
