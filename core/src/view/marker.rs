//! Marker appearance and popup content for each map category.

use crate::model::{
    Incident, ReportStatus, SatelliteEventPoint, Sensor, Severity, ThermalDetectionPoint,
    UserReport,
};
use crate::prelude::Coordinate;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Scale applied to the selected incident's radius.
pub const SELECTED_SCALE: f32 = 1.5;
/// Scale applied to a hovered incident's radius.
pub const HOVER_SCALE: f32 = 1.3;
/// Radius shared by satellite-event and thermal-detection markers.
pub const POINT_RADIUS: f32 = 6.0;
pub const POINT_HOVER_RADIUS: f32 = 8.0;

const INCIDENT_FILL_OPACITY: f32 = 0.8;
const POINT_FILL_OPACITY: f32 = 0.7;
const POINT_REST_FILL_OPACITY: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }
}

pub const WHITE: Rgb = Rgb::from_hex(0xffffff);
pub const SENSOR_BLUE: Rgb = Rgb::from_hex(0x3b82f6);
pub const POINT_FILL: Rgb = Rgb::from_hex(0xd94e3d);
pub const POINT_STROKE: Rgb = Rgb::from_hex(0xe88a70);
pub const POINT_ACCENT: Rgb = Rgb::from_hex(0xff4500);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Glyph {
    Circle,
    /// Upward-pointing triangle used for sensors.
    Triangle,
    /// Person silhouette used for user reports; `pulsing` adds the attention badge.
    Person { pulsing: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub glyph: Glyph,
    pub radius: f32,
    pub fill: Rgb,
    pub stroke: Rgb,
    pub stroke_weight: f32,
    pub opacity: f32,
    pub fill_opacity: f32,
}

/// What a marker represents; incidents carry their id so clicks can select them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    Incident(String),
    Sensor,
    Report,
    SatelliteEvent,
    ThermalDetection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupLine {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Popup {
    pub title: String,
    pub accent: Rgb,
    pub badge: Option<String>,
    pub body: Option<String>,
    pub lines: Vec<PopupLine>,
    pub tags: Vec<String>,
    pub footer: Option<String>,
}

impl Popup {
    fn new(title: impl Into<String>, accent: Rgb) -> Self {
        Self {
            title: title.into(),
            accent,
            badge: None,
            body: None,
            lines: Vec::new(),
            tags: Vec::new(),
            footer: None,
        }
    }

    fn line(mut self, label: &str, value: impl Into<String>) -> Self {
        self.lines.push(PopupLine {
            label: label.to_string(),
            value: value.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: Coordinate,
    pub kind: MarkerKind,
    pub style: MarkerStyle,
    pub popup: Popup,
}

pub fn severity_color(severity: Severity) -> Rgb {
    match severity {
        Severity::Critical => Rgb::from_hex(0xdc2626),
        Severity::High => Rgb::from_hex(0xff5722),
        Severity::Medium => Rgb::from_hex(0xff9800),
        Severity::Low => Rgb::from_hex(0xfbbf24),
    }
}

pub fn severity_radius(severity: Severity) -> f32 {
    match severity {
        Severity::Critical => 15.0,
        Severity::High => 12.0,
        Severity::Medium => 10.0,
        Severity::Low => 8.0,
    }
}

/// Colour, badge text and popup background for a report's verification state.
/// Anything other than verified or false positive gets the pending treatment.
pub fn report_palette(status: ReportStatus) -> (Rgb, &'static str, Rgb) {
    match status {
        ReportStatus::Verified => (
            Rgb::from_hex(0x10b981),
            "VERIFIED",
            Rgb::from_hex(0xd1fae5),
        ),
        ReportStatus::FalsePositive => (
            Rgb::from_hex(0xef4444),
            "FALSE POSITIVE",
            Rgb::from_hex(0xfee2e2),
        ),
        ReportStatus::Pending | ReportStatus::Duplicate | ReportStatus::Other => (
            Rgb::from_hex(0xfbbf24),
            "PENDING VERIFICATION",
            Rgb::from_hex(0xfef3c7),
        ),
    }
}

pub fn incident_style(severity: Severity, selected: bool) -> MarkerStyle {
    let radius = severity_radius(severity);
    MarkerStyle {
        glyph: Glyph::Circle,
        radius: if selected { radius * SELECTED_SCALE } else { radius },
        fill: severity_color(severity),
        stroke: WHITE,
        stroke_weight: 2.0,
        opacity: 1.0,
        fill_opacity: INCIDENT_FILL_OPACITY,
    }
}

pub fn point_style() -> MarkerStyle {
    MarkerStyle {
        glyph: Glyph::Circle,
        radius: POINT_RADIUS,
        fill: POINT_FILL,
        stroke: POINT_STROKE,
        stroke_weight: 2.0,
        opacity: 0.8,
        fill_opacity: POINT_FILL_OPACITY,
    }
}

pub fn incident_marker(incident: &Incident, selected: bool) -> Marker {
    let size = incident
        .size_acres
        .map(group_thousands)
        .unwrap_or_else(|| "N/A".into());
    let mut popup = Popup::new(&incident.name, severity_color(incident.severity))
        .line("Location", &incident.location)
        .line("Size", format!("{size} acres"))
        .line(
            "Containment",
            format!("{}%", incident.containment_percent.unwrap_or(0.0)),
        );
    popup.footer = Some("SATELLITE VERIFIED".into());

    Marker {
        position: incident.coordinate(),
        kind: MarkerKind::Incident(incident.id.clone()),
        style: incident_style(incident.severity, selected),
        popup,
    }
}

pub fn sensor_marker(sensor: &Sensor) -> Marker {
    let popup = Popup::new(format!("Sensor: {}", sensor.name), SENSOR_BLUE)
        .line("Type", sensor.sensor_type.label().to_uppercase())
        .line(
            "Confidence",
            sensor
                .confidence_level
                .map(|c| format!("{c:.1}%"))
                .unwrap_or_else(|| "N/A".into()),
        )
        .line(
            "Temperature",
            sensor
                .temperature_celsius
                .map(|t| format!("{t:.0}°C"))
                .unwrap_or_else(|| "N/A".into()),
        );

    Marker {
        position: sensor.coordinate(),
        kind: MarkerKind::Sensor,
        style: MarkerStyle {
            glyph: Glyph::Triangle,
            radius: 10.0,
            fill: SENSOR_BLUE,
            stroke: SENSOR_BLUE,
            stroke_weight: 0.0,
            opacity: 1.0,
            fill_opacity: 1.0,
        },
        popup,
    }
}

pub fn report_marker(report: &UserReport) -> Marker {
    let (color, badge, _) = report_palette(report.report_status);
    let pulsing = !matches!(
        report.report_status,
        ReportStatus::Verified | ReportStatus::FalsePositive
    );

    let mut popup = Popup::new("User Report", color);
    popup.badge = Some(badge.into());
    popup.body = report.description.clone().filter(|d| !d.trim().is_empty());
    let flags = [
        (report.has_visible_smoke, "Smoke"),
        (report.has_visible_flames, "Flames"),
        (report.has_smell, "Smell"),
    ];
    popup.tags = flags
        .into_iter()
        .filter(|(present, _)| *present)
        .map(|(_, tag)| tag.to_string())
        .collect();
    popup.footer = Some(report.created_at.format("%Y-%m-%d %H:%M UTC").to_string());

    Marker {
        position: report.coordinate(),
        kind: MarkerKind::Report,
        style: MarkerStyle {
            glyph: Glyph::Person { pulsing },
            radius: 8.0,
            fill: color,
            stroke: WHITE,
            stroke_weight: 1.5,
            opacity: 1.0,
            fill_opacity: 1.0,
        },
        popup,
    }
}

pub fn event_marker(event: &SatelliteEventPoint) -> Marker {
    let date = DateTime::parse_from_rfc3339(&event.date)
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|_| event.date.clone());
    let mut popup = Popup::new(&event.title, POINT_ACCENT)
        .line("Date", date)
        .line("Lat/Lon", format!("{:.2}, {:.2}", event.lat, event.lon));
    popup.footer = Some("Source: NASA EONET".into());

    Marker {
        position: event.coordinate(),
        kind: MarkerKind::SatelliteEvent,
        style: point_style(),
        popup,
    }
}

pub fn thermal_marker(detection: &ThermalDetectionPoint) -> Marker {
    let mut popup = Popup::new("Fire Detection", POINT_ACCENT)
        .line("Brightness", format!("{:.1}K", detection.brightness))
        .line("Confidence", &detection.confidence)
        .line("FRP", format!("{:.1} MW", detection.frp))
        .line("Detected", &detection.date);
    popup.footer = Some("Source: NASA FIRMS VIIRS NRT".into());

    Marker {
        position: detection.coordinate(),
        kind: MarkerKind::ThermalDetection,
        style: point_style(),
        popup,
    }
}

/// Style while the pointer is over a marker, or `None` for markers without hover feedback.
pub fn hover_style(kind: &MarkerKind, current: &MarkerStyle, base_radius: f32) -> Option<MarkerStyle> {
    match kind {
        MarkerKind::Incident(_) => Some(MarkerStyle {
            radius: current.radius.max(base_radius * HOVER_SCALE),
            fill_opacity: 1.0,
            ..*current
        }),
        MarkerKind::SatelliteEvent | MarkerKind::ThermalDetection => Some(MarkerStyle {
            radius: POINT_HOVER_RADIUS,
            fill_opacity: 1.0,
            ..*current
        }),
        MarkerKind::Sensor | MarkerKind::Report => None,
    }
}

/// Style after the pointer leaves. Points settle at a slightly stronger fill than on first draw.
pub fn rest_style(kind: &MarkerKind, drawn: &MarkerStyle) -> Option<MarkerStyle> {
    match kind {
        MarkerKind::Incident(_) => Some(*drawn),
        MarkerKind::SatelliteEvent | MarkerKind::ThermalDetection => Some(MarkerStyle {
            radius: POINT_RADIUS,
            fill_opacity: POINT_REST_FILL_OPACITY,
            ..*drawn
        }),
        MarkerKind::Sensor | MarkerKind::Report => None,
    }
}

/// `12345.5` -> `"12,345.5"`; whole numbers print without a fraction.
pub fn group_thousands(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    let whole = rounded.trunc().abs() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        grouped.insert(0, '-');
    }
    let tenths = ((rounded.abs().fract()) * 10.0).round() as u64;
    if tenths > 0 {
        grouped.push_str(&format!(".{tenths}"));
    }
    grouped
}
