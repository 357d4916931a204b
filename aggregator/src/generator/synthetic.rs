use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Header of the VIIRS near-real-time area CSV.
pub const THERMAL_HEADER: &str = "latitude,longitude,bright_ti4,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_ti5,frp,daynight";

const CONFIDENCE_LABELS: [&str; 3] = ["low", "nominal", "high"];

/// Configuration for generating offline feed bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub detections: usize,
    /// Share of detections placed inside North America.
    pub regional_share: f64,
    /// Every n-th row is written malformed; 0 disables.
    pub malformed_every: usize,
    pub events: usize,
    pub date: String,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            detections: 120,
            regional_share: 0.6,
            malformed_every: 25,
            events: 12,
            date: "2024-08-01".to_string(),
        }
    }
}

/// Thermal CSV body. Column 11 carries the radiative-power value the adapter reads.
pub fn thermal_csv(config: &SyntheticConfig) -> String {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut lines = Vec::with_capacity(config.detections + 1);
    lines.push(THERMAL_HEADER.to_string());

    for index in 0..config.detections {
        if config.malformed_every > 0 && index % config.malformed_every == config.malformed_every - 1 {
            lines.push(if index % 2 == 0 {
                "garbled".to_string()
            } else {
                "n/a,n/a,340.0".to_string()
            });
            continue;
        }

        let (lat, mut lon) = if rng.gen_bool(config.regional_share.clamp(0.0, 1.0)) {
            (rng.gen_range(30.0..60.0), rng.gen_range(-130.0..-60.0))
        } else {
            (rng.gen_range(-20.0..15.0), rng.gen_range(10.0..40.0))
        };
        // Some rows use the 0..360 longitude convention.
        if lon < 0.0 && rng.gen_bool(0.2) {
            lon += 360.0;
        }
        let brightness: f64 = rng.gen_range(300.0..380.0);
        let frp: f64 = rng.gen_range(0.5..150.0);
        let confidence = CONFIDENCE_LABELS[rng.gen_range(0..CONFIDENCE_LABELS.len())];
        let acq_time = rng.gen_range(0..2400);

        lines.push(format!(
            "{lat:.5},{lon:.5},{brightness:.2},0.39,0.36,{date},{acq_time:04},N20,VIIRS,{confidence},2.0NRT,{frp:.2},{frp:.2},D",
            date = config.date,
        ));
    }

    lines.join("\n")
}

/// Open-events JSON body with one to three geometry entries per event.
pub fn events_json(config: &SyntheticConfig) -> String {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let places = [
        "Kamloops, British Columbia, Canada",
        "Redding, California",
        "Flagstaff, Arizona",
        "Fort McMurray, Alberta, Canada",
        "Bend, Oregon",
    ];

    let events: Vec<_> = (0..config.events)
        .map(|index| {
            let base_lat: f64 = rng.gen_range(32.0..58.0);
            let base_lon: f64 = rng.gen_range(-125.0..-100.0);
            let geometry: Vec<_> = (0..rng.gen_range(1..=3))
                .map(|day| {
                    json!({
                        "date": format!("{}T{:02}:00:00Z", config.date, 6 * day),
                        "type": "Point",
                        "coordinates": [
                            base_lon + rng.gen_range(-0.2..0.2),
                            base_lat + rng.gen_range(-0.2..0.2)
                        ]
                    })
                })
                .collect();
            json!({
                "id": format!("EONET_{}", 9000 + index),
                "title": format!("Wildfire near {}", places[index % places.len()]),
                "geometry": geometry
            })
        })
        .collect();

    json!({ "title": "EONET Events", "events": events }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardcore::prelude::FeedAdapter;
    use guardcore::processing::{EventFeedAdapter, ThermalFeedAdapter};

    #[test]
    fn generator_is_deterministic_per_seed() {
        let config = SyntheticConfig {
            seed: 13,
            ..Default::default()
        };
        assert_eq!(thermal_csv(&config), thermal_csv(&config));
        assert_eq!(events_json(&config), events_json(&config));
    }

    #[test]
    fn thermal_rows_exercise_every_filter() {
        let config = SyntheticConfig {
            seed: 3,
            detections: 200,
            ..Default::default()
        };
        let csv = thermal_csv(&config);
        assert_eq!(csv.lines().count(), 201);

        let batch = ThermalFeedAdapter::new().normalize(&csv).unwrap();
        assert_eq!(batch.metadata.skipped, 8);
        assert!(batch.metadata.filtered > 0);
        assert!(!batch.points.is_empty());
        assert!(!batch.metadata.fallback_applied);
    }

    #[test]
    fn events_document_flattens() {
        let config = SyntheticConfig {
            events: 5,
            ..Default::default()
        };
        let batch = EventFeedAdapter::new().normalize(&events_json(&config)).unwrap();
        assert!(batch.points.len() >= 5);
        assert!(batch.points.iter().all(|p| p.title.starts_with("Wildfire near")));
    }
}
