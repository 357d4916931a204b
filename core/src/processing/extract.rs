//! Approximate fire locations for contextual news filtering.

use crate::geo::BoundingBox;
use crate::model::{ApproximateLocation, SatelliteEventPoint, ThermalDetectionPoint};
use regex::Regex;
use std::sync::LazyLock;

/// Upper bound on returned locations and on sampled detections.
pub const MAX_LOCATIONS: usize = 10;

const DEFAULT_COUNTRY: &str = "USA";

static PLACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:in|near|at)\s+([^,]+)(?:,\s*([^,]+))?(?:,\s*([^,]+))?")
        .expect("place pattern is a valid regex")
});

const COUNTRY_BUCKETS: [(BoundingBox, &str); 3] = [
    (BoundingBox::new(25.0, 49.0, -125.0, -66.0), "USA"),
    (BoundingBox::new(42.0, 83.0, -141.0, -52.0), "Canada"),
    (BoundingBox::new(14.0, 33.0, -117.0, -86.0), "Mexico"),
];

/// Derives up to [`MAX_LOCATIONS`] unique locations from event titles and a
/// deterministic sample of detections, in first-seen order.
pub fn extract_fire_locations(
    events: &[SatelliteEventPoint],
    detections: &[ThermalDetectionPoint],
) -> Vec<ApproximateLocation> {
    let from_titles = events
        .iter()
        .filter(|event| !event.title.trim().is_empty())
        .filter_map(|event| parse_location_from_title(&event.title));

    let from_detections = sample_detections(detections)
        .map(|detection| country_bucket(detection.lat, detection.lon));

    let mut unique: Vec<ApproximateLocation> = Vec::new();
    for location in from_titles.chain(from_detections) {
        if !unique.contains(&location) {
            unique.push(location);
        }
    }
    unique.truncate(MAX_LOCATIONS);
    unique
}

/// Pulls a place out of a title such as `"Fire near Jasper, Alberta, Canada"`.
///
/// Falls back to reading the last two comma-separated segments as city and
/// state when no `in`/`near`/`at` phrase is present.
pub fn parse_location_from_title(title: &str) -> Option<ApproximateLocation> {
    if let Some(captures) = PLACE_PATTERN.captures(title) {
        let part = |index: usize| {
            captures
                .get(index)
                .map(|m| m.as_str().trim().to_string())
                .filter(|value| !value.is_empty())
        };
        return Some(ApproximateLocation {
            city: part(1),
            state: part(2),
            country: part(3).or_else(|| Some(DEFAULT_COUNTRY.to_string())),
        });
    }

    let parts: Vec<&str> = title.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [.., city, state] => Some(ApproximateLocation {
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            country: Some(DEFAULT_COUNTRY.to_string()),
        }),
        _ => None,
    }
}

/// Every `ceil(len / 10)`-th detection starting at index 0, at most ten.
pub fn sample_detections(
    detections: &[ThermalDetectionPoint],
) -> impl Iterator<Item = &ThermalDetectionPoint> {
    let stride = detections.len().div_ceil(MAX_LOCATIONS).max(1);
    detections.iter().step_by(stride).take(MAX_LOCATIONS)
}

/// Country-level bucket; coarser than [`crate::geo::name_location`].
pub fn country_bucket(lat: f64, lon: f64) -> ApproximateLocation {
    let country = COUNTRY_BUCKETS
        .iter()
        .find(|(bounds, _)| bounds.contains(lat, lon))
        .map_or("North America", |(_, name)| *name);
    ApproximateLocation::country(country)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(title: &str) -> SatelliteEventPoint {
        SatelliteEventPoint {
            id: format!("{title}-2024"),
            title: title.to_string(),
            date: "2024-07-01".into(),
            lat: 40.0,
            lon: -120.0,
        }
    }

    fn detection(lat: f64, lon: f64) -> ThermalDetectionPoint {
        ThermalDetectionPoint {
            lat,
            lon,
            brightness: 350.0,
            confidence: "nominal".into(),
            frp: 5.0,
            date: "2024-07-01".into(),
        }
    }

    #[test]
    fn title_with_preposition_phrase() {
        let location = parse_location_from_title("Wildfire in Jasper, Alberta, Canada").unwrap();
        assert_eq!(location.city.as_deref(), Some("Jasper"));
        assert_eq!(location.state.as_deref(), Some("Alberta"));
        assert_eq!(location.country.as_deref(), Some("Canada"));

        let location = parse_location_from_title("Brush fire NEAR Paradise").unwrap();
        assert_eq!(location.city.as_deref(), Some("Paradise"));
        assert_eq!(location.state, None);
        assert_eq!(location.country.as_deref(), Some("USA"));
    }

    #[test]
    fn title_without_phrase_uses_last_two_segments() {
        let location = parse_location_from_title("Park Fire, Butte County, California").unwrap();
        assert_eq!(location.city.as_deref(), Some("Butte County"));
        assert_eq!(location.state.as_deref(), Some("California"));
        assert_eq!(location.country.as_deref(), Some("USA"));

        assert_eq!(parse_location_from_title("Wildfire 42"), None);
    }

    #[test]
    fn sampling_is_strided_and_deterministic() {
        let detections: Vec<_> = (0..25).map(|i| detection(30.0 + i as f64, -100.0)).collect();
        let sampled: Vec<f64> = sample_detections(&detections).map(|d| d.lat).collect();
        // ceil(25 / 10) = 3
        assert_eq!(sampled, vec![30.0, 33.0, 36.0, 39.0, 42.0, 45.0, 48.0, 51.0, 54.0]);
        let again: Vec<f64> = sample_detections(&detections).map(|d| d.lat).collect();
        assert_eq!(sampled, again);

        assert_eq!(sample_detections(&[]).count(), 0);
        assert_eq!(sample_detections(&detections[..4]).count(), 4);
    }

    #[test]
    fn identical_buckets_collapse() {
        let detections = vec![detection(40.0, -100.0), detection(41.0, -101.0)];
        let locations = extract_fire_locations(&[], &detections);
        assert_eq!(locations, vec![ApproximateLocation::country("USA")]);
    }

    #[test]
    fn buckets_cover_neighbours_and_fallback() {
        assert_eq!(country_bucket(55.0, -110.0), ApproximateLocation::country("Canada"));
        assert_eq!(country_bucket(20.0, -100.0), ApproximateLocation::country("Mexico"));
        assert_eq!(
            country_bucket(64.0, -150.0),
            ApproximateLocation::country("North America")
        );
    }

    #[test]
    fn output_is_capped_and_keeps_first_seen_order() {
        let events: Vec<_> = (0..15)
            .map(|i| event(&format!("Fire {i}, County {i}, State {i}")))
            .collect();
        let detections = vec![detection(55.0, -110.0)];
        let locations = extract_fire_locations(&events, &detections);
        assert_eq!(locations.len(), MAX_LOCATIONS);
        assert_eq!(locations[0].city.as_deref(), Some("County 0"));
        assert_eq!(locations[9].city.as_deref(), Some("County 9"));
    }

    #[test]
    fn events_and_detections_are_merged() {
        let events = vec![event("Wildfire in Jasper, Alberta, Canada"), event("")];
        let detections = vec![detection(40.0, -100.0), detection(20.0, -100.0)];
        let locations = extract_fire_locations(&events, &detections);
        assert_eq!(locations.len(), 3);
        assert_eq!(locations[1], ApproximateLocation::country("USA"));
        assert_eq!(locations[2], ApproximateLocation::country("Mexico"));
    }
}
