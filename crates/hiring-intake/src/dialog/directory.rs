//! The site directory seam and its file-backed adapter.
//!
//! Directory backends must tolerate malformed rows by omitting them and
//! must never crash the dialog flow; callers degrade to the placeholder
//! data below when a backend is unavailable or empty.

use std::fs::File;
use std::path::PathBuf;

use async_trait::async_trait;

use super::domain::SiteRecord;
use crate::geo::Coordinate;

/// Supplies vacancies and the sites offering them.
#[async_trait]
pub trait SiteDirectory: Send + Sync {
    /// Distinct non-empty vacancy names, first-occurrence order.
    async fn list_vacancies(&self) -> Result<Vec<String>, DirectoryError>;

    /// Sites offering the vacancy; the match is case-insensitive exact.
    async fn sites_for_vacancy(&self, vacancy: &str) -> Result<Vec<SiteRecord>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory backend unavailable: {0}")]
    Unavailable(String),
    #[error("directory source unreadable: {0}")]
    Io(#[from] std::io::Error),
    #[error("directory source malformed: {0}")]
    Malformed(String),
}

/// Fallback vacancy list used when the directory is down or empty.
pub fn placeholder_vacancies() -> Vec<String> {
    ["Кассир", "Уборщик", "Повар", "Менеджер"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Fallback site used when no rows exist for a chosen vacancy.
pub fn placeholder_sites(vacancy: &str) -> Vec<SiteRecord> {
    vec![SiteRecord {
        city: "Москва".to_string(),
        street: "ул. Тестовая, 1".to_string(),
        full_address: Some("Москва, ул. Тестовая, д. 1".to_string()),
        vacancy: vacancy.to_string(),
        rate: Some("от 50000 руб.".to_string()),
        schedule: Some("5/2".to_string()),
        age_requirement: None,
        description: None,
        project: None,
        coordinate: Coordinate::new(55.7558, 37.6176),
    }]
}

/// Trims, drops empties, and deduplicates preserving first occurrence.
pub fn dedup_vacancies<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = Vec::new();
    let mut vacancies = Vec::new();
    for name in raw {
        let trimmed = name.trim();
        if trimmed.is_empty() || seen.contains(&trimmed.to_string()) {
            continue;
        }
        seen.push(trimmed.to_string());
        vacancies.push(trimmed.to_string());
    }
    vacancies
}

/// Parses the "lat, lon" coordinate cell. Unparsable cells yield `None`;
/// the (0, 0) placeholder is kept here and dropped by the ranker.
pub(crate) fn parse_coordinate_cell(cell: &str) -> Option<Coordinate> {
    let mut parts = cell.split(',').map(str::trim);
    let latitude: f64 = parts.next()?.parse().ok()?;
    let longitude: f64 = parts.next()?.parse().ok()?;
    Coordinate::new(latitude, longitude)
}

/// Column layout shared by the spreadsheet and CSV backends; resolved from
/// the localized header row.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ColumnMap {
    city: Option<usize>,
    vacancy: Option<usize>,
    street: Option<usize>,
    full_address: Option<usize>,
    rate: Option<usize>,
    schedule: Option<usize>,
    age_requirement: Option<usize>,
    description: Option<usize>,
    project: Option<usize>,
    coordinate: Option<usize>,
}

impl ColumnMap {
    pub(crate) fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut map = Self::default();
        for (index, header) in headers.iter().enumerate() {
            let key = header.as_ref().trim().to_lowercase();
            match key.as_str() {
                "город" => map.city = map.city.or(Some(index)),
                "адрес" => map.street = map.street.or(Some(index)),
                "полный адрес" => map.full_address = map.full_address.or(Some(index)),
                "тариф" => map.rate = map.rate.or(Some(index)),
                "график" => map.schedule = map.schedule.or(Some(index)),
                "возраст" => map.age_requirement = map.age_requirement.or(Some(index)),
                "описание" => map.description = map.description.or(Some(index)),
                "проект" => map.project = map.project.or(Some(index)),
                "координаты" => map.coordinate = map.coordinate.or(Some(index)),
                _ if key.contains("ваканс") => map.vacancy = map.vacancy.or(Some(index)),
                _ => {}
            }
        }
        map
    }

    pub(crate) fn has_vacancy_column(&self) -> bool {
        self.vacancy.is_some()
    }

    pub(crate) fn vacancy_cell<'a>(&self, cells: &'a [String]) -> Option<&'a str> {
        let cell = cells.get(self.vacancy?)?.trim();
        (!cell.is_empty()).then_some(cell)
    }

    /// Maps one data row; rows without a vacancy or without any address
    /// text are omitted.
    pub(crate) fn site_from_cells(&self, cells: &[String]) -> Option<SiteRecord> {
        let vacancy = self.vacancy_cell(cells)?.to_string();
        let city = self.required_text(cells, self.city);
        let street = self.required_text(cells, self.street);
        if city.is_empty() && street.is_empty() {
            return None;
        }

        Some(SiteRecord {
            city,
            street,
            full_address: self.optional_text(cells, self.full_address),
            vacancy,
            rate: self.optional_text(cells, self.rate),
            schedule: self.optional_text(cells, self.schedule),
            age_requirement: self.optional_text(cells, self.age_requirement),
            description: self.optional_text(cells, self.description),
            project: self.optional_text(cells, self.project),
            coordinate: self
                .optional_text(cells, self.coordinate)
                .and_then(|cell| parse_coordinate_cell(&cell)),
        })
    }

    fn required_text(&self, cells: &[String], index: Option<usize>) -> String {
        index
            .and_then(|i| cells.get(i))
            .map(|cell| cell.trim().to_string())
            .unwrap_or_default()
    }

    fn optional_text(&self, cells: &[String], index: Option<usize>) -> Option<String> {
        let text = self.required_text(cells, index);
        (!text.is_empty()).then_some(text)
    }
}

/// File-backed directory for deployments that export the sheet to CSV and
/// for local runs without Google credentials.
pub struct CsvDirectory {
    path: PathBuf,
}

impl CsvDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_rows(&self) -> Result<(ColumnMap, Vec<Vec<String>>), DirectoryError> {
        let file = File::open(&self.path)?;
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|err| DirectoryError::Malformed(err.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();
        let columns = ColumnMap::from_headers(&headers);
        if !columns.has_vacancy_column() {
            return Err(DirectoryError::Malformed(
                "no vacancy column in header row".to_string(),
            ));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            // A single broken row must not take the listing down.
            let Ok(record) = record else { continue };
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok((columns, rows))
    }
}

#[async_trait]
impl SiteDirectory for CsvDirectory {
    async fn list_vacancies(&self) -> Result<Vec<String>, DirectoryError> {
        let (columns, rows) = self.read_rows()?;
        Ok(dedup_vacancies(rows.iter().filter_map(|cells| {
            columns.vacancy_cell(cells).map(str::to_string)
        })))
    }

    async fn sites_for_vacancy(&self, vacancy: &str) -> Result<Vec<SiteRecord>, DirectoryError> {
        let wanted = vacancy.trim().to_lowercase();
        let (columns, rows) = self.read_rows()?;
        Ok(rows
            .iter()
            .filter(|cells| {
                columns
                    .vacancy_cell(cells)
                    .map(|name| name.to_lowercase() == wanted)
                    .unwrap_or(false)
            })
            .filter_map(|cells| columns.site_from_cells(cells))
            .collect())
    }
}
