use anyhow::{Context, Result};
use google_drive3::DriveHub;
use google_sheets4::api::{Spreadsheet, ValueRange};
use google_sheets4::{Sheets, hyper_rustls, hyper_util, yup_oauth2};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::constants::{DEFAULT_SPREADSHEET, TOKEN_CACHE_FILE};
use crate::report::MeasurementRow;

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("no spreadsheet named '{0}' is visible to this account")]
    SpreadsheetNotFound(String),
    #[error("spreadsheet '{0}' has no sheets")]
    NoSheets(String),
}

/// A spreadsheet resolved by name, pinned to its first sheet.
#[derive(Debug, Clone)]
pub struct SheetHandle {
    pub spreadsheet_id: String,
    pub sheet_title: String,
}

/// Google Sheets session. The Drive hub resolves spreadsheet names to ids;
/// the Sheets hub appends the rows. Both share one authenticator.
pub struct SheetsClient {
    sheets: Sheets<HttpsConnector>,
    drive: DriveHub<HttpsConnector>,
}

impl SheetsClient {
    /// Authorize against the OAuth client secret at `credentials`. Token
    /// storage and renewal are owned by the OAuth flow, which caches
    /// refreshed tokens next to the binary.
    pub async fn authorize(credentials: &Path) -> Result<Self> {
        let secret = yup_oauth2::read_application_secret(credentials)
            .await
            .with_context(|| {
                format!("failed to read OAuth client secret {}", credentials.display())
            })?;

        let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
            secret,
            yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(TOKEN_CACHE_FILE)
        .build()
        .await
        .context("failed to set up the OAuth flow")?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("failed to load system TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();
        let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
            .build(connector);

        Ok(Self {
            sheets: Sheets::new(client.clone(), auth.clone()),
            drive: DriveHub::new(client, auth),
        })
    }

    /// Resolve `name` to a spreadsheet and select its first sheet.
    pub async fn open_by_name(&self, name: &str) -> Result<SheetHandle> {
        let (_, listing) = self
            .drive
            .files()
            .list()
            .q(&drive_query(name))
            .param("fields", "files(id,name)")
            .doit()
            .await
            .with_context(|| format!("spreadsheet lookup for '{name}' failed"))?;

        let spreadsheet_id = listing
            .files
            .unwrap_or_default()
            .into_iter()
            .find_map(|file| file.id)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(name.to_string()))?;
        debug!(%spreadsheet_id, "resolved spreadsheet");

        let (_, spreadsheet) = self
            .sheets
            .spreadsheets()
            .get(&spreadsheet_id)
            .doit()
            .await
            .with_context(|| format!("failed to fetch metadata for spreadsheet '{name}'"))?;

        let sheet_title = first_sheet_title(&spreadsheet)
            .ok_or_else(|| SheetsError::NoSheets(name.to_string()))?
            .to_string();
        debug!(%sheet_title, "selected first sheet");

        Ok(SheetHandle {
            spreadsheet_id,
            sheet_title,
        })
    }

    /// Append one measurement row. A single append call; the service owns
    /// row placement and ordering.
    pub async fn append_row(&self, sheet: &SheetHandle, row: &MeasurementRow) -> Result<()> {
        let values = ValueRange {
            values: Some(vec![row.values()]),
            ..Default::default()
        };

        self.sheets
            .spreadsheets()
            .values_append(values, &sheet.spreadsheet_id, &append_range(&sheet.sheet_title))
            .value_input_option("USER_ENTERED")
            .insert_data_option("INSERT_ROWS")
            .doit()
            .await
            .with_context(|| format!("failed to append row to sheet '{}'", sheet.sheet_title))?;

        Ok(())
    }
}

/// Destination spreadsheet name: the environment value when set, the
/// default otherwise.
pub fn spreadsheet_name(env_value: Option<String>) -> String {
    env_value.unwrap_or_else(|| DEFAULT_SPREADSHEET.to_string())
}

/// Drive search for a spreadsheet by exact name. Single quotes and
/// backslashes are escaped per the Drive query syntax.
fn drive_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name = '{escaped}' and mimeType = '{SPREADSHEET_MIME_TYPE}' and trashed = false")
}

fn first_sheet_title(spreadsheet: &Spreadsheet) -> Option<&str> {
    spreadsheet
        .sheets
        .as_ref()?
        .first()?
        .properties
        .as_ref()?
        .title
        .as_deref()
}

/// A1 range addressing the whole sheet; embedded quotes are doubled.
fn append_range(sheet_title: &str) -> String {
    format!("'{}'!A1", sheet_title.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use google_sheets4::api::{Sheet, SheetProperties};

    #[test]
    fn test_spreadsheet_name_defaults() {
        assert_eq!(spreadsheet_name(None), "Speedtest");
        assert_eq!(spreadsheet_name(Some("Office".into())), "Office");
    }

    #[test]
    fn test_drive_query() {
        assert_eq!(
            drive_query("Speedtest"),
            "name = 'Speedtest' and mimeType = 'application/vnd.google-apps.spreadsheet' \
             and trashed = false"
        );
    }

    #[test]
    fn test_drive_query_escapes_quotes() {
        assert!(drive_query("bob's sheet").starts_with("name = 'bob\\'s sheet'"));
        assert!(drive_query("a\\b").starts_with("name = 'a\\\\b'"));
    }

    #[test]
    fn test_append_range_quotes_title() {
        assert_eq!(append_range("Sheet1"), "'Sheet1'!A1");
        assert_eq!(append_range("bob's data"), "'bob''s data'!A1");
    }

    fn spreadsheet_with_titles(titles: &[&str]) -> Spreadsheet {
        Spreadsheet {
            sheets: Some(
                titles
                    .iter()
                    .map(|title| Sheet {
                        properties: Some(SheetProperties {
                            title: Some(title.to_string()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_sheet_title() {
        let spreadsheet = spreadsheet_with_titles(&["Results", "Archive"]);
        assert_eq!(first_sheet_title(&spreadsheet), Some("Results"));
    }

    #[test]
    fn test_first_sheet_title_empty_spreadsheet() {
        assert_eq!(first_sheet_title(&Spreadsheet::default()), None);
        assert_eq!(first_sheet_title(&spreadsheet_with_titles(&[])), None);
    }
}
