use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

/// Spreadsheet timestamp format, e.g. "03/01/24 10:00:00".
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%y %H:%M:%S";

/// One appended spreadsheet row: timestamp plus the three measured scalars.
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementRow {
    pub timestamp: String,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
}

impl MeasurementRow {
    pub fn new(taken_at: DateTime<Utc>, download_mbps: f64, upload_mbps: f64, ping_ms: f64) -> Self {
        Self {
            timestamp: taken_at.format(TIMESTAMP_FORMAT).to_string(),
            download_mbps,
            upload_mbps,
            ping_ms,
        }
    }

    /// Stamps the row with the current UTC time. Called when the row is
    /// built, right before the append, so the timestamp stays honest.
    pub fn now(download_mbps: f64, upload_mbps: f64, ping_ms: f64) -> Self {
        Self::new(Utc::now(), download_mbps, upload_mbps, ping_ms)
    }

    /// Cell values in the order the sheet expects them.
    pub fn values(&self) -> Vec<Value> {
        vec![
            json!(self.timestamp),
            json!(self.download_mbps),
            json!(self.upload_mbps),
            json!(self.ping_ms),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let taken_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let row = MeasurementRow::new(taken_at, 55.2, 9.8, 14.3);
        assert_eq!(row.timestamp, "03/01/24 10:00:00");
    }

    #[test]
    fn test_timestamp_zero_pads_all_fields() {
        let taken_at = Utc.with_ymd_and_hms(2026, 1, 9, 4, 5, 6).unwrap();
        let row = MeasurementRow::new(taken_at, 0.0, 0.0, 0.0);
        assert_eq!(row.timestamp, "01/09/26 04:05:06");
    }

    #[test]
    fn test_values_in_fixed_order() {
        let taken_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let row = MeasurementRow::new(taken_at, 55.2, 9.8, 14.3);
        assert_eq!(
            row.values(),
            vec![json!("03/01/24 10:00:00"), json!(55.2), json!(9.8), json!(14.3)]
        );
    }
}
