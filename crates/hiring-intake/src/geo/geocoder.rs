//! Free-text address resolution.
//!
//! A query is expanded into a small set of variants (raw, normalized with a
//! country qualifier and a street-type token, city+street, city only) and
//! each variant is tried against an ordered provider chain. Provider
//! failures are never surfaced to the dialog flow: they degrade to `None`
//! with a warning.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::Coordinate;

const COUNTRY_QUALIFIER: &str = "Россия";
const STREET_TOKEN: &str = "улица";

const STREET_TYPE_TOKENS: &[&str] = &[
    "улица",
    "ул.",
    "проспект",
    "пр-т",
    "шоссе",
    "ш.",
    "бульвар",
    "бул.",
    "проезд",
    "пер.",
    "переулок",
    "наб.",
    "площадь",
    "пл.",
];

/// The seam the conversation engine depends on.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Option<Coordinate>;
}

/// A single upstream geocoding service.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn lookup(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Normalizes "Город, Улица, Дом" input: prefixes the country qualifier and
/// inserts a street-type token when the street segment lacks one. Inputs
/// with fewer than three segments only get the country prefix.
fn normalize_address(address: &str) -> String {
    let parts: Vec<&str> = address
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.len() >= 3 {
        let city = parts[0];
        let mut street = parts[1].to_string();
        let house = parts[2..].join(" ");

        let lowered = street.to_lowercase();
        if !STREET_TYPE_TOKENS
            .iter()
            .any(|token| lowered.contains(token))
        {
            street = format!("{STREET_TOKEN} {street}");
        }

        format!("{COUNTRY_QUALIFIER}, {city}, {street}, {house}")
    } else {
        format!("{COUNTRY_QUALIFIER}, {address}")
    }
}

/// Builds the ordered query variants for an address, deduplicated
/// case-insensitively with the raw input first.
pub fn address_variants(address: &str) -> Vec<String> {
    let original = address.trim().to_string();
    let parts: Vec<&str> = original
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    let city_street = if parts.len() >= 2 {
        format!("{}, {}", parts[0], parts[1])
    } else {
        original.clone()
    };
    let city_only = parts
        .first()
        .map(|part| (*part).to_string())
        .unwrap_or_else(|| original.clone());

    let candidates = [
        original.clone(),
        normalize_address(&original),
        normalize_address(&city_street),
        normalize_address(&city_only),
        format!("{COUNTRY_QUALIFIER}, {original}"),
    ];

    let mut seen = Vec::new();
    let mut variants = Vec::new();
    for candidate in candidates {
        let key = candidate.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        variants.push(candidate);
    }
    variants
}

/// How many of the generated variants a chain step may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    AllVariants,
    FirstVariantOnly,
}

struct ProviderStep {
    provider: Box<dyn GeocodeProvider>,
    scope: QueryScope,
}

/// Ordered provider chain; the first non-`None` coordinate wins.
pub struct AddressResolver {
    steps: Vec<ProviderStep>,
}

impl AddressResolver {
    /// Yandex across every variant, then Nominatim on the first variant.
    pub fn standard(yandex_api_key: Option<String>) -> Self {
        let client = reqwest::Client::new();
        Self::new()
            .step(
                YandexGeocoder::new(client.clone(), yandex_api_key),
                QueryScope::AllVariants,
            )
            .step(NominatimGeocoder::new(client), QueryScope::FirstVariantOnly)
    }

    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn step<P>(mut self, provider: P, scope: QueryScope) -> Self
    where
        P: GeocodeProvider + 'static,
    {
        self.steps.push(ProviderStep {
            provider: Box::new(provider),
            scope,
        });
        self
    }
}

impl Default for AddressResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geocoder for AddressResolver {
    async fn resolve(&self, address: &str) -> Option<Coordinate> {
        let variants = address_variants(address);
        if variants.is_empty() {
            return None;
        }

        for step in &self.steps {
            let queries: &[String] = match step.scope {
                QueryScope::AllVariants => &variants,
                QueryScope::FirstVariantOnly => &variants[..1],
            };

            for query in queries {
                match step.provider.lookup(query).await {
                    Ok(Some(coordinate)) => {
                        debug!(provider = step.provider.name(), query, "address resolved");
                        return Some(coordinate);
                    }
                    Ok(None) => {}
                    Err(error) => {
                        warn!(
                            provider = step.provider.name(),
                            query,
                            %error,
                            "geocoding provider failed"
                        );
                    }
                }
            }
        }

        None
    }
}

const YANDEX_GEOCODE_URL: &str = "https://geocode-maps.yandex.ru/v1/";

/// Primary provider: the Yandex Geocoder HTTP API.
pub struct YandexGeocoder {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl YandexGeocoder {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[derive(Debug, Deserialize)]
struct YandexResponse {
    #[serde(default)]
    features: Vec<YandexFeature>,
    response: Option<YandexLegacyResponse>,
}

#[derive(Debug, Deserialize)]
struct YandexFeature {
    geometry: Option<YandexGeometry>,
}

#[derive(Debug, Deserialize)]
struct YandexGeometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct YandexLegacyResponse {
    #[serde(rename = "GeoObjectCollection")]
    collection: Option<YandexGeoObjectCollection>,
}

#[derive(Debug, Deserialize)]
struct YandexGeoObjectCollection {
    #[serde(rename = "featureMember", default)]
    members: Vec<YandexFeatureMember>,
}

#[derive(Debug, Deserialize)]
struct YandexFeatureMember {
    #[serde(rename = "GeoObject")]
    geo_object: Option<YandexGeoObject>,
}

#[derive(Debug, Deserialize)]
struct YandexGeoObject {
    #[serde(rename = "Point")]
    point: Option<YandexPoint>,
}

#[derive(Debug, Deserialize)]
struct YandexPoint {
    pos: Option<String>,
}

/// Yandex has shipped two response shapes: a GeoJSON-like `features` array
/// with `[lon, lat]` coordinates, and the legacy `GeoObjectCollection` with
/// a "lon lat" position string. The former wins when both are present.
fn yandex_coordinate(body: &YandexResponse) -> Option<Coordinate> {
    if let Some(coordinates) = body
        .features
        .first()
        .and_then(|feature| feature.geometry.as_ref())
        .map(|geometry| &geometry.coordinates)
    {
        if coordinates.len() >= 2 {
            return Coordinate::new(coordinates[1], coordinates[0]);
        }
    }

    let pos = body
        .response
        .as_ref()?
        .collection
        .as_ref()?
        .members
        .first()?
        .geo_object
        .as_ref()?
        .point
        .as_ref()?
        .pos
        .as_deref()?;

    let mut split = pos.split_whitespace();
    let longitude: f64 = split.next()?.parse().ok()?;
    let latitude: f64 = split.next()?.parse().ok()?;
    Coordinate::new(latitude, longitude)
}

#[async_trait]
impl GeocodeProvider for YandexGeocoder {
    fn name(&self) -> &'static str {
        "yandex"
    }

    async fn lookup(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let mut request = self
            .client
            .get(YANDEX_GEOCODE_URL)
            .query(&[("format", "json"), ("geocode", query)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }

        let body: YandexResponse = request.send().await?.error_for_status()?.json().await?;
        Ok(yandex_coordinate(&body))
    }
}

const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
const NOMINATIM_USER_AGENT: &str = "hiring-intake-bot/0.1";

/// Fallback provider: OSM Nominatim search.
pub struct NominatimGeocoder {
    client: reqwest::Client,
}

impl NominatimGeocoder {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[async_trait]
impl GeocodeProvider for NominatimGeocoder {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn lookup(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let places: Vec<NominatimPlace> = self
            .client
            .get(NOMINATIM_SEARCH_URL)
            .header(reqwest::header::USER_AGENT, NOMINATIM_USER_AGENT)
            .query(&[
                ("format", "json"),
                ("addressdetails", "1"),
                ("limit", "1"),
                ("q", query),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let coordinate = places.first().and_then(|place| {
            let latitude: f64 = place.lat.parse().ok()?;
            let longitude: f64 = place.lon.parse().ok()?;
            Coordinate::new(latitude, longitude)
        });
        Ok(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_insert_country_and_street_token() {
        let variants = address_variants("Москва, Тверская, 1");
        assert_eq!(variants[0], "Москва, Тверская, 1");
        assert!(variants.contains(&"Россия, Москва, улица Тверская, 1".to_string()));
        assert!(variants.contains(&"Россия, Москва, Тверская".to_string()));
        assert!(variants.contains(&"Россия, Москва".to_string()));
        assert!(variants.contains(&"Россия, Москва, Тверская, 1".to_string()));
    }

    #[test]
    fn variants_keep_existing_street_type() {
        let variants = address_variants("Москва, ул. Ленина, 10");
        assert!(variants.contains(&"Россия, Москва, ул. Ленина, 10".to_string()));
        assert!(!variants
            .iter()
            .any(|variant| variant.contains("улица ул. Ленина")));
    }

    #[test]
    fn variants_dedup_case_insensitively() {
        let variants = address_variants("москва");
        let mut keys: Vec<String> = variants.iter().map(|v| v.to_lowercase()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), variants.len());
    }

    #[test]
    fn short_input_gets_country_prefix_only() {
        assert_eq!(normalize_address("Тверь"), "Россия, Тверь");
        assert_eq!(normalize_address("Тверь, Советская"), "Россия, Тверь, Советская");
    }

    #[test]
    fn yandex_parser_prefers_feature_geometry() {
        let body: YandexResponse = serde_json::from_str(
            r#"{
                "features": [
                    {"geometry": {"coordinates": [37.6176, 55.7558]}}
                ],
                "response": {
                    "GeoObjectCollection": {
                        "featureMember": [
                            {"GeoObject": {"Point": {"pos": "30.3609 59.9311"}}}
                        ]
                    }
                }
            }"#,
        )
        .expect("fixture parses");

        let coordinate = yandex_coordinate(&body).expect("coordinate extracted");
        assert!((coordinate.latitude - 55.7558).abs() < 1e-9);
        assert!((coordinate.longitude - 37.6176).abs() < 1e-9);
    }

    #[test]
    fn yandex_parser_reads_legacy_collection() {
        let body: YandexResponse = serde_json::from_str(
            r#"{
                "response": {
                    "GeoObjectCollection": {
                        "featureMember": [
                            {"GeoObject": {"Point": {"pos": "30.3609 59.9311"}}}
                        ]
                    }
                }
            }"#,
        )
        .expect("fixture parses");

        let coordinate = yandex_coordinate(&body).expect("coordinate extracted");
        assert!((coordinate.latitude - 59.9311).abs() < 1e-9);
        assert!((coordinate.longitude - 30.3609).abs() < 1e-9);
    }

    #[test]
    fn yandex_parser_handles_empty_body() {
        let body: YandexResponse = serde_json::from_str("{}").expect("fixture parses");
        assert!(yandex_coordinate(&body).is_none());
    }
}
