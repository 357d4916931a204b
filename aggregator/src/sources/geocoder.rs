use guardcore::prelude::{Coordinate, FeedError, FeedResult};
use log::debug;
use serde::Deserialize;

const RESULT_LIMIT: &str = "3";
const REGIONAL_COUNTRIES: &str = "ca,us";

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Free-text address search against a Nominatim-compatible endpoint.
#[derive(Clone)]
pub struct Geocoder {
    http: reqwest::Client,
    url: String,
}

impl Geocoder {
    pub fn new(http: reqwest::Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }

    /// First match over the progressively simplified queries for `address`.
    pub async fn resolve(&self, address: &str) -> FeedResult<Option<Coordinate>> {
        for params in search_queries(address) {
            let response = self
                .http
                .get(&self.url)
                .query(&params)
                .send()
                .await
                .map_err(|err| FeedError::Transport(err.to_string()))?;
            if !response.status().is_success() {
                debug!("geocoder returned {} for {:?}", response.status(), params);
                continue;
            }
            // Anything that is not a list of places counts as no match.
            let places: Vec<Place> = response.json().await.unwrap_or_default();
            if let Some((coordinate, place)) = places
                .iter()
                .find_map(|place| parse_place(place).map(|c| (c, place)))
            {
                debug!(
                    "geocoded {:?} to {:?} ({})",
                    address,
                    coordinate,
                    place.display_name.as_deref().unwrap_or("unnamed")
                );
                return Ok(Some(coordinate));
            }
        }
        Ok(None)
    }
}

fn parse_place(place: &Place) -> Option<Coordinate> {
    let coordinate = Coordinate::new(place.lat.trim().parse().ok()?, place.lon.trim().parse().ok()?);
    coordinate.is_finite().then_some(coordinate)
}

/// The address as typed, without a leading street number, and its first comma segment.
pub fn address_variants(address: &str) -> Vec<String> {
    let address = address.trim();
    let candidates = [
        address,
        strip_street_number(address),
        address.split(',').next().unwrap_or(address).trim(),
    ];

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !candidate.is_empty() && !variants.iter().any(|v| v == candidate) {
            variants.push(candidate.to_string());
        }
    }
    variants
}

/// Each variant is tried as-is and then as a Canadian address restricted to CA/US.
pub fn search_queries(address: &str) -> Vec<Vec<(&'static str, String)>> {
    address_variants(address)
        .into_iter()
        .flat_map(|variant| {
            [
                vec![
                    ("format", "json".to_string()),
                    ("q", variant.clone()),
                    ("limit", RESULT_LIMIT.to_string()),
                ],
                vec![
                    ("format", "json".to_string()),
                    ("q", format!("{variant}, Canada")),
                    ("limit", RESULT_LIMIT.to_string()),
                    ("countrycodes", REGIONAL_COUNTRIES.to_string()),
                ],
            ]
        })
        .collect()
}

fn strip_street_number(address: &str) -> &str {
    let rest = address.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() < address.len() && rest.starts_with(char::is_whitespace) {
        rest.trim_start()
    } else {
        address
    }
}
