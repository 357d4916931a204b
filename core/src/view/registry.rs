use crate::view::marker::{MarkerKind, MarkerStyle, Popup};
use crate::view::surface::{MapSurface, MarkerId};

/// Marker drawn in the current render cycle.
#[derive(Debug, Clone)]
pub struct RegisteredMarker {
    pub id: MarkerId,
    pub kind: MarkerKind,
    /// Style at draw time; mouse-out restores it.
    pub drawn_style: MarkerStyle,
    /// Unselected radius, the base for hover scaling.
    pub base_radius: f32,
    pub popup: Popup,
}

/// Owns every marker the controller has placed on its surface.
///
/// Scoped to one mounted controller: created empty on mount and cleared
/// (removing each marker from the surface) before every redraw and on unmount.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    entries: Vec<RegisteredMarker>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, entry: RegisteredMarker) {
        self.entries.push(entry);
    }

    pub fn get(&self, id: MarkerId) -> Option<&RegisteredMarker> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredMarker> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear<S: MapSurface>(&mut self, surface: &mut S) {
        for entry in self.entries.drain(..) {
            surface.remove_marker(entry.id);
        }
    }
}
