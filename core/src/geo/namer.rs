//! Coordinate to place-name heuristic.
//!
//! A flat, ordered table of regions, each holding an ordered list of finer
//! areas. The first region whose box contains the point is chosen; inside it
//! the first matching area wins, otherwise the region's own label is used.
//! Regions overlap at their margins (Mountain West and Southwest share a band)
//! and the table order decides those points.

use super::region::BoundingBox;

struct Area {
    bounds: BoundingBox,
    label: &'static str,
}

struct Region {
    bounds: BoundingBox,
    label: &'static str,
    areas: &'static [Area],
}

const fn area(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64, label: &'static str) -> Area {
    Area {
        bounds: BoundingBox::new(min_lat, max_lat, min_lon, max_lon),
        label,
    }
}

const fn region(
    bounds: BoundingBox,
    label: &'static str,
    areas: &'static [Area],
) -> Region {
    Region {
        bounds,
        label,
        areas,
    }
}

const REGIONS: &[Region] = &[
    region(
        BoundingBox::new(32.5, 42.0, -124.5, -114.0),
        "Southern California",
        &[
            area(37.7, 38.9, -123.0, -121.5, "San Francisco Bay Area, CA"),
            area(34.0, 34.3, -118.7, -118.0, "Los Angeles, CA"),
            area(32.5, 33.5, -117.5, -116.8, "San Diego, CA"),
            area(38.0, 40.0, -122.0, -120.0, "Northern California"),
            area(36.0, 38.0, -122.0, -119.0, "Central California"),
        ],
    ),
    region(
        BoundingBox::new(42.0, 49.0, -124.5, -116.5),
        "Oregon",
        &[
            area(45.4, 45.7, -122.8, -122.5, "Portland, OR"),
            area(47.4, 47.8, -122.5, -122.0, "Seattle, WA"),
            area(45.5, 49.0, -124.0, -121.0, "Washington"),
        ],
    ),
    region(
        BoundingBox::new(31.0, 37.0, -114.5, -103.0),
        "New Mexico",
        &[
            area(35.0, 36.0, -106.7, -106.5, "Albuquerque, NM"),
            area(33.3, 33.6, -112.2, -111.8, "Phoenix, AZ"),
            area(31.0, 37.0, -114.0, -109.0, "Arizona"),
        ],
    ),
    region(
        BoundingBox::new(37.0, 49.0, -116.5, -104.0),
        "Colorado",
        &[
            area(39.5, 40.0, -105.5, -104.5, "Denver, CO"),
            area(40.0, 41.5, -112.2, -111.5, "Salt Lake City, UT"),
            area(41.0, 49.0, -116.5, -104.0, "Montana/Idaho"),
            area(40.5, 45.0, -111.0, -104.5, "Wyoming"),
            area(37.0, 41.0, -114.0, -109.0, "Utah"),
        ],
    ),
    region(
        BoundingBox::new(25.8, 36.5, -106.5, -93.5),
        "Texas",
        &[
            area(29.5, 30.0, -98.0, -97.0, "Austin, TX"),
            area(32.6, 33.0, -97.0, -96.5, "Dallas, TX"),
            area(29.6, 30.0, -95.7, -95.0, "Houston, TX"),
        ],
    ),
    // Provinces are split on longitude only.
    region(
        BoundingBox::new(49.0, 83.0, -141.0, -52.0),
        "Canada",
        &[
            area(49.0, 83.0, -123.0, -114.0, "British Columbia"),
            area(49.0, 83.0, -120.0, -110.0, "Alberta"),
            area(49.0, 83.0, -110.0, -101.0, "Saskatchewan"),
            area(49.0, 83.0, -102.0, -95.0, "Manitoba"),
            area(49.0, 83.0, -95.0, -74.0, "Ontario"),
            area(49.0, 83.0, -79.0, -57.0, "Quebec"),
        ],
    ),
    region(BoundingBox::new(14.0, 32.5, -117.0, -86.0), "Mexico", &[]),
    region(
        BoundingBox::new(36.5, 49.0, -104.0, -94.0),
        "Great Plains",
        &[
            area(41.0, 43.0, -104.5, -96.0, "Nebraska"),
            area(37.0, 40.0, -102.0, -94.5, "Kansas"),
        ],
    ),
    region(
        BoundingBox::new(37.0, 49.0, -94.0, -66.0),
        "Eastern US",
        &[
            area(40.5, 42.0, -88.0, -87.5, "Chicago, IL"),
            area(42.2, 42.5, -83.3, -82.9, "Detroit, MI"),
            area(40.5, 41.0, -74.3, -73.7, "New York, NY"),
            area(39.7, 40.0, -75.3, -74.9, "Philadelphia, PA"),
            area(38.8, 39.0, -77.1, -76.9, "Washington, DC"),
        ],
    ),
    region(
        BoundingBox::new(24.0, 37.0, -94.0, -75.0),
        "Southeastern US",
        &[
            area(33.6, 34.0, -84.5, -84.2, "Atlanta, GA"),
            area(25.7, 26.0, -80.3, -80.0, "Miami, FL"),
            area(27.0, 31.0, -87.0, -80.0, "Florida"),
        ],
    ),
];

/// Returns a human-readable place name for a coordinate.
///
/// Points outside every region get a hemisphere-tagged coordinate string such
/// as `"N0.0° E0.0°"`.
pub fn name_location(lat: f64, lon: f64) -> String {
    REGIONS
        .iter()
        .find(|region| region.bounds.contains(lat, lon))
        .map(|region| {
            region
                .areas
                .iter()
                .find(|area| area.bounds.contains(lat, lon))
                .map_or(region.label, |area| area.label)
                .to_string()
        })
        .unwrap_or_else(|| format_coordinate(lat, lon))
}

fn format_coordinate(lat: f64, lon: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lon >= 0.0 { 'E' } else { 'W' };
    format!("{}{:.1}° {}{:.1}°", ns, lat.abs(), ew, lon.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metro_areas_resolve() {
        assert_eq!(name_location(34.05, -118.3), "Los Angeles, CA");
        assert_eq!(name_location(45.5, -122.6), "Portland, OR");
        assert_eq!(name_location(47.6, -122.3), "Seattle, WA");
        assert_eq!(name_location(39.74, -104.99), "Denver, CO");
        assert_eq!(name_location(25.8, -80.2), "Miami, FL");
    }

    #[test]
    fn province_split_on_longitude() {
        assert_eq!(name_location(55.0, -105.0), "Saskatchewan");
        assert_eq!(name_location(53.5, -116.0), "British Columbia");
        assert_eq!(name_location(60.0, -135.0), "Canada");
    }

    #[test]
    fn region_label_when_no_area_matches() {
        assert_eq!(name_location(33.0, -115.5), "Southern California");
        assert_eq!(name_location(31.0, -99.0), "Texas");
        assert_eq!(name_location(20.0, -100.0), "Mexico");
    }

    #[test]
    fn earlier_region_wins_on_shared_band() {
        // Latitude 37 belongs to both the Southwest and Mountain West boxes.
        assert_eq!(name_location(37.0, -110.0), "Arizona");
    }

    #[test]
    fn unmatched_points_fall_back_to_coordinates() {
        assert_eq!(name_location(0.0, 0.0), "N0.0° E0.0°");
        assert_eq!(name_location(-33.87, 151.21), "S33.9° E151.2°");
        assert_eq!(name_location(64.2, -21.9), "N64.2° W21.9°");
    }
}
