//! Google Sheets adapter for the site directory.

use async_trait::async_trait;
use google_sheets4::{hyper_rustls, hyper_util, yup_oauth2, Sheets};
use serde_json::Value;

use super::directory::{dedup_vacancies, ColumnMap, DirectoryError, SiteDirectory};
use super::domain::SiteRecord;

/// Column B carries the vacancy name; the full sheet spans A..J.
const VACANCY_RANGE: &str = "Проекты!B:B";
const SITE_RANGE: &str = "Проекты!A:J";

pub type SheetsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Thin wrapper around the generated google-sheets4 client exposing the
/// directory seam without leaking the wire types.
pub struct SheetsDirectory<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    hub: Sheets<C>,
    spreadsheet_id: String,
}

impl<C> SheetsDirectory<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: Sheets<C>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            hub,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    async fn fetch_rows(&self, range: &str) -> Result<Vec<Vec<String>>, DirectoryError> {
        let (_, value_range) = self
            .hub
            .spreadsheets()
            .values_get(&self.spreadsheet_id, range)
            .doit()
            .await
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))?;

        let rows = value_range.values.unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }
}

impl SheetsDirectory<SheetsConnector> {
    /// Builds an authenticated read-only client from a service-account key
    /// file.
    pub async fn from_service_account(
        spreadsheet_id: impl Into<String>,
        credentials_path: &str,
    ) -> Result<Self, DirectoryError> {
        let key = yup_oauth2::read_service_account_key(credentials_path).await?;
        let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))?
            .https_or_http()
            .enable_http1()
            .build();
        let client =
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build(connector);

        Ok(Self::new(Sheets::new(client, auth), spreadsheet_id))
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl<C> SiteDirectory for SheetsDirectory<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    async fn list_vacancies(&self) -> Result<Vec<String>, DirectoryError> {
        let rows = self.fetch_rows(VACANCY_RANGE).await?;
        // First row is the header.
        Ok(dedup_vacancies(
            rows.into_iter()
                .skip(1)
                .filter_map(|row| row.into_iter().next()),
        ))
    }

    async fn sites_for_vacancy(&self, vacancy: &str) -> Result<Vec<SiteRecord>, DirectoryError> {
        let rows = self.fetch_rows(SITE_RANGE).await?;
        let mut rows = rows.into_iter();
        let Some(headers) = rows.next() else {
            return Ok(Vec::new());
        };

        let columns = ColumnMap::from_headers(&headers);
        if !columns.has_vacancy_column() {
            return Err(DirectoryError::Malformed(
                "no vacancy column in sheet header".to_string(),
            ));
        }

        let wanted = vacancy.trim().to_lowercase();
        Ok(rows
            .filter(|cells| {
                columns
                    .vacancy_cell(cells)
                    .map(|name| name.to_lowercase() == wanted)
                    .unwrap_or(false)
            })
            .filter_map(|cells| columns.site_from_cells(&cells))
            .collect())
    }
}
