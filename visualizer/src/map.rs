//! Web-Mercator canvas backing the core map controller.

use crate::Message;
use guardcore::geo::BoundingBox;
use guardcore::prelude::Coordinate;
use guardcore::view::{CameraView, Glyph, MapSurface, Marker, MarkerId, MarkerStyle, Rgb};
use iced::time::Instant;
use iced::widget::canvas::{self, Frame, Geometry, Path, Stroke};
use iced::{mouse, Color, Event, Point, Rectangle, Renderer, Size, Theme, Vector};
use std::collections::BTreeMap;
use std::time::Duration;

const TILE_SIZE: f64 = 256.0;
const MIN_ZOOM: f32 = 2.0;
const MAX_ZOOM: f32 = 14.0;
const MAX_MERCATOR_SIN: f64 = 0.9999;
/// Extra pixels around a marker that still count as a hit.
const HIT_SLOP: f32 = 3.0;
const DEFAULT_VIEWPORT: Size = Size::new(960.0, 640.0);

#[derive(Debug, Clone, Copy)]
struct Flight {
    from: CameraView,
    to: CameraView,
    started: Instant,
    duration: Duration,
}

/// Marker store and camera for the dashboard map.
#[derive(Debug)]
pub struct CanvasSurface {
    next_id: u64,
    markers: BTreeMap<MarkerId, Marker>,
    camera: CameraView,
    flight: Option<Flight>,
    viewport: Size,
}

impl CanvasSurface {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            markers: BTreeMap::new(),
            camera: guardcore::view::surface::INITIAL_VIEW,
            flight: None,
            viewport: DEFAULT_VIEWPORT,
        }
    }

    pub fn camera(&self) -> CameraView {
        self.camera
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn is_flying(&self) -> bool {
        self.flight.is_some()
    }

    pub fn set_viewport(&mut self, size: Size) {
        if size.width > 0.0 && size.height > 0.0 {
            self.viewport = size;
        }
    }

    /// Steps the fly-to animation; the camera lands exactly on the target.
    pub fn advance(&mut self, now: Instant) {
        let Some(flight) = self.flight else {
            return;
        };
        let elapsed = now.saturating_duration_since(flight.started);
        let t = (elapsed.as_secs_f64() / flight.duration.as_secs_f64().max(f64::EPSILON)).min(1.0);
        if t >= 1.0 {
            self.camera = flight.to;
            self.flight = None;
            return;
        }
        let eased = ease_in_out(t);
        self.camera = CameraView {
            center: Coordinate::new(
                lerp(flight.from.center.lat, flight.to.center.lat, eased),
                lerp(flight.from.center.lon, flight.to.center.lon, eased),
            ),
            zoom: lerp(f64::from(flight.from.zoom), f64::from(flight.to.zoom), eased) as f32,
        };
    }

    /// Moves the camera by a screen-space drag.
    pub fn pan(&mut self, delta: Vector) {
        self.flight = None;
        let zoom = f64::from(self.camera.zoom);
        let (x, y) = project(self.camera.center, zoom);
        self.camera.center = unproject(x - f64::from(delta.x), y - f64::from(delta.y), zoom);
    }

    pub fn zoom_by(&mut self, steps: f32) {
        self.flight = None;
        self.camera.zoom = (self.camera.zoom + steps).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn to_screen(&self, coordinate: Coordinate) -> Point {
        let zoom = f64::from(self.camera.zoom);
        let (cx, cy) = project(self.camera.center, zoom);
        let (x, y) = project(coordinate, zoom);
        Point::new(
            (x - cx) as f32 + self.viewport.width / 2.0,
            (y - cy) as f32 + self.viewport.height / 2.0,
        )
    }

    /// Topmost marker under `point`, in draw order.
    pub fn hit_test(&self, point: Point) -> Option<MarkerId> {
        self.markers
            .iter()
            .rev()
            .find(|(_, marker)| {
                let center = self.to_screen(marker.position);
                center.distance(point) <= marker.style.radius + HIT_SLOP
            })
            .map(|(id, _)| *id)
    }

    pub fn markers(&self) -> impl Iterator<Item = (&MarkerId, &Marker)> {
        self.markers.iter()
    }
}

impl Default for CanvasSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MapSurface for CanvasSurface {
    fn set_view(&mut self, view: CameraView) {
        self.flight = None;
        self.camera = view;
    }

    fn add_marker(&mut self, marker: Marker) -> MarkerId {
        self.next_id += 1;
        let id = MarkerId(self.next_id);
        self.markers.insert(id, marker);
        id
    }

    fn restyle_marker(&mut self, id: MarkerId, style: MarkerStyle) {
        if let Some(marker) = self.markers.get_mut(&id) {
            marker.style = style;
        }
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
    }

    fn fly_to(&mut self, view: CameraView, duration: Duration) {
        self.flight = Some(Flight {
            from: self.camera,
            to: view,
            started: Instant::now(),
            duration,
        });
    }

    fn fit_bounds(&mut self, bounds: BoundingBox, padding_px: u32) {
        self.flight = None;
        self.camera = fit_camera(bounds, self.viewport, padding_px);
    }

    fn release(&mut self) {
        self.markers.clear();
        self.flight = None;
    }
}

/// Camera that frames `bounds` inside `viewport` minus `padding_px` on every side.
pub fn fit_camera(bounds: BoundingBox, viewport: Size, padding_px: u32) -> CameraView {
    let padding = f64::from(padding_px) * 2.0;
    let usable_w = (f64::from(viewport.width) - padding).max(1.0);
    let usable_h = (f64::from(viewport.height) - padding).max(1.0);

    let (west, north) = project(Coordinate::new(bounds.max_lat, bounds.min_lon), 0.0);
    let (east, south) = project(Coordinate::new(bounds.min_lat, bounds.max_lon), 0.0);
    let span_w = (east - west).abs();
    let span_h = (south - north).abs();

    let zoom = if span_w <= f64::EPSILON && span_h <= f64::EPSILON {
        f64::from(MAX_ZOOM)
    } else {
        let zoom_w = (usable_w / span_w.max(f64::EPSILON)).log2();
        let zoom_h = (usable_h / span_h.max(f64::EPSILON)).log2();
        zoom_w.min(zoom_h)
    };

    CameraView {
        center: unproject((west + east) / 2.0, (north + south) / 2.0, 0.0),
        zoom: (zoom as f32).clamp(MIN_ZOOM, MAX_ZOOM),
    }
}

fn project(coordinate: Coordinate, zoom: f64) -> (f64, f64) {
    let scale = TILE_SIZE * zoom.exp2();
    let x = (coordinate.lon + 180.0) / 360.0 * scale;
    let sin = coordinate
        .lat
        .to_radians()
        .sin()
        .clamp(-MAX_MERCATOR_SIN, MAX_MERCATOR_SIN);
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * std::f64::consts::PI)) * scale;
    (x, y)
}

fn unproject(x: f64, y: f64, zoom: f64) -> Coordinate {
    let scale = TILE_SIZE * zoom.exp2();
    let lon = x / scale * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * y / scale);
    let lat = n.sinh().atan().to_degrees();
    Coordinate::new(lat, lon)
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

fn ease_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

fn color(rgb: Rgb, alpha: f32) -> Color {
    Color::from_rgba8(rgb.r, rgb.g, rgb.b, alpha)
}

/// Pointer bookkeeping kept by the canvas between events.
#[derive(Debug, Default)]
pub struct Interaction {
    drag_from: Option<Point>,
    dragged: bool,
    hovered: Option<MarkerId>,
}

/// Canvas program drawing a [`CanvasSurface`].
pub struct MapCanvas<'a> {
    pub surface: &'a CanvasSurface,
}

impl canvas::Program<Message> for MapCanvas<'_> {
    type State = Interaction;

    fn update(
        &self,
        state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        if bounds.width > 0.0 && bounds.height > 0.0 && bounds.size() != self.surface.viewport() {
            return Some(canvas::Action::publish(Message::ViewportResized(bounds.size())));
        }
        let position = cursor.position_in(bounds);

        match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let position = position?;
                state.drag_from = Some(position);
                state.dragged = false;
                Some(canvas::Action::request_redraw().and_capture())
            }
            Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                let Some(position) = position else {
                    return state
                        .hovered
                        .take()
                        .map(|_| canvas::Action::publish(Message::MarkerHovered(None)));
                };
                if let Some(from) = state.drag_from {
                    let delta = position - from;
                    if state.dragged || delta.x.abs() + delta.y.abs() > 2.0 {
                        state.dragged = true;
                        state.drag_from = Some(position);
                        return Some(canvas::Action::publish(Message::MapPanned(delta)).and_capture());
                    }
                    return None;
                }
                let hovered = self.surface.hit_test(position);
                if hovered != state.hovered {
                    state.hovered = hovered;
                    return Some(canvas::Action::publish(Message::MarkerHovered(hovered)));
                }
                None
            }
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                let from = state.drag_from.take()?;
                if std::mem::take(&mut state.dragged) {
                    return None;
                }
                let message = match self.surface.hit_test(from) {
                    Some(id) => Message::MarkerClicked(id),
                    None => Message::MapClicked,
                };
                Some(canvas::Action::publish(message).and_capture())
            }
            Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                position?;
                let y = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => *y,
                    mouse::ScrollDelta::Pixels { y, .. } => *y / 60.0,
                };
                (y != 0.0).then(|| {
                    canvas::Action::publish(Message::MapZoomed(y.signum() * 0.5)).and_capture()
                })
            }
            _ => None,
        }
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::from_rgb(0.09, 0.11, 0.14));
        self.draw_graticule(&mut frame);

        for marker in self.surface.markers.values() {
            let center = self.surface.to_screen(marker.position);
            if !bounds_contains(bounds.size(), center, marker.style.radius) {
                continue;
            }
            draw_marker(&mut frame, center, &marker.style);
        }

        vec![frame.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if state.dragged {
            mouse::Interaction::Grabbing
        } else if cursor
            .position_in(bounds)
            .and_then(|p| self.surface.hit_test(p))
            .is_some()
        {
            mouse::Interaction::Pointer
        } else {
            mouse::Interaction::Grab
        }
    }
}

impl MapCanvas<'_> {
    fn draw_graticule(&self, frame: &mut Frame) {
        let zoom = self.surface.camera().zoom;
        let step = if zoom >= 8.0 {
            1.0
        } else if zoom >= 5.0 {
            5.0
        } else {
            10.0
        };
        let line = Stroke::default()
            .with_width(1.0)
            .with_color(Color::from_rgba(1.0, 1.0, 1.0, 0.06));

        let size = self.surface.viewport();
        let mut lon = -180.0;
        while lon <= 180.0 {
            let x = self.surface.to_screen(Coordinate::new(0.0, lon)).x;
            if (0.0..=size.width).contains(&x) {
                let path = Path::line(Point::new(x, 0.0), Point::new(x, size.height));
                frame.stroke(&path, line);
            }
            lon += step;
        }
        let mut lat = -80.0;
        while lat <= 80.0 {
            let y = self.surface.to_screen(Coordinate::new(lat, 0.0)).y;
            if (0.0..=size.height).contains(&y) {
                let path = Path::line(Point::new(0.0, y), Point::new(size.width, y));
                frame.stroke(&path, line);
            }
            lat += step;
        }
    }
}

fn bounds_contains(size: Size, point: Point, radius: f32) -> bool {
    point.x >= -radius
        && point.y >= -radius
        && point.x <= size.width + radius
        && point.y <= size.height + radius
}

fn draw_marker(frame: &mut Frame, center: Point, style: &MarkerStyle) {
    let r = style.radius;
    let fill = color(style.fill, style.fill_opacity * style.opacity);
    let stroke = Stroke::default()
        .with_width(style.stroke_weight)
        .with_color(color(style.stroke, style.opacity));

    match style.glyph {
        Glyph::Circle => {
            let path = Path::circle(center, r);
            frame.fill(&path, fill);
            if style.stroke_weight > 0.0 {
                frame.stroke(&path, stroke);
            }
        }
        Glyph::Triangle => {
            let path = Path::new(|builder| {
                builder.move_to(Point::new(center.x, center.y - r));
                builder.line_to(Point::new(center.x + r, center.y + r));
                builder.line_to(Point::new(center.x - r, center.y + r));
                builder.close();
            });
            frame.fill(&path, fill);
        }
        Glyph::Person { pulsing } => {
            let head = Path::circle(Point::new(center.x, center.y - r * 0.55), r * 0.4);
            let body = Path::new(|builder| {
                builder.move_to(Point::new(center.x - r * 0.6, center.y + r));
                builder.line_to(Point::new(center.x - r * 0.6, center.y + r * 0.1));
                builder.line_to(Point::new(center.x + r * 0.6, center.y + r * 0.1));
                builder.line_to(Point::new(center.x + r * 0.6, center.y + r));
                builder.close();
            });
            frame.fill(&head, fill);
            frame.fill(&body, fill);
            frame.stroke(&head, stroke);
            frame.stroke(&body, stroke);
            if pulsing {
                let badge = Path::circle(Point::new(center.x + r * 0.8, center.y - r), r * 0.35);
                frame.fill(&badge, color(Rgb::from_hex(0xef4444), 1.0));
            }
        }
    }
}
