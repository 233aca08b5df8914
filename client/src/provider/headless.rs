use std::collections::BTreeMap;

use listing_map_shared::{LatLng, ListingId, ViewportBounds};

use super::{CameraPose, MapProvider, MarkerKey, MarkerSpec, MarkerStyle};
use crate::events::{EventQueue, UiEvent};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraMove {
    Pan(LatLng),
    Ease(CameraPose),
}

#[derive(Debug, Clone)]
pub struct HeadlessMarker {
    pub spec: MarkerSpec,
    pub style: MarkerStyle,
}

/// In-memory map with a fixed viewport span. Camera moves complete instantly.
#[derive(Debug)]
pub struct HeadlessMap {
    center: LatLng,
    zoom: f64,
    span_lat: f64,
    span_lng: f64,
    sized: bool,
    markers: BTreeMap<MarkerKey, HeadlessMarker>,
    next_key: u64,
    moves: Vec<CameraMove>,
    detached: usize,
    queue: Option<EventQueue>,
}

impl HeadlessMap {
    pub fn new(center: LatLng, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            span_lat: 0.2,
            span_lng: 0.3,
            sized: true,
            markers: BTreeMap::new(),
            next_key: 1,
            moves: Vec::new(),
            detached: 0,
            queue: None,
        }
    }

    /// Simulate a map that has not been laid out yet.
    pub fn not_laid_out(mut self) -> Self {
        self.sized = false;
        self
    }

    pub fn markers(&self) -> impl Iterator<Item = (MarkerKey, &HeadlessMarker)> {
        self.markers.iter().map(|(key, marker)| (*key, marker))
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker(&self, key: MarkerKey) -> Option<&HeadlessMarker> {
        self.markers.get(&key)
    }

    /// Key of the live marker carrying `id`.
    pub fn key_for_listing(&self, id: ListingId) -> Option<MarkerKey> {
        self.markers
            .iter()
            .find(|(_, marker)| marker.spec.listing_ids.contains(&id))
            .map(|(key, _)| *key)
    }

    pub fn moves(&self) -> &[CameraMove] {
        &self.moves
    }

    pub fn detached_count(&self) -> usize {
        self.detached
    }

    /// Move the camera as a user gesture would and report the gesture start.
    pub fn user_drag_to(&mut self, center: LatLng) {
        self.emit(UiEvent::MapDragStarted);
        self.center = center;
    }

    pub fn user_zoom_to(&mut self, zoom: f64) {
        self.emit(UiEvent::MapZoomStarted);
        self.zoom = zoom;
    }

    pub fn settle(&self) {
        self.emit(UiEvent::MapIdle);
    }

    pub fn click(&self, key: MarkerKey) {
        self.emit(UiEvent::MarkerClicked(key));
    }

    fn emit(&self, event: UiEvent) {
        if let Some(queue) = &self.queue {
            queue.push(event);
        }
    }
}

impl MapProvider for HeadlessMap {
    fn bounds(&self) -> Option<ViewportBounds> {
        if !self.sized {
            return None;
        }
        Some(ViewportBounds::new(
            self.center.lat + self.span_lat / 2.0,
            self.center.lat - self.span_lat / 2.0,
            self.center.lng + self.span_lng / 2.0,
            self.center.lng - self.span_lng / 2.0,
        ))
    }

    fn center(&self) -> LatLng {
        self.center
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn pan_to(&mut self, point: LatLng) {
        self.moves.push(CameraMove::Pan(point));
        self.center = point;
    }

    fn ease_to(&mut self, pose: CameraPose) {
        self.moves.push(CameraMove::Ease(pose));
        self.center = pose.center;
        self.zoom = pose.zoom;
    }

    fn attach_marker(&mut self, spec: &MarkerSpec) -> MarkerKey {
        let key = MarkerKey(self.next_key);
        self.next_key += 1;
        self.markers.insert(
            key,
            HeadlessMarker {
                spec: spec.clone(),
                style: MarkerStyle::BASELINE,
            },
        );
        key
    }

    fn detach_marker(&mut self, key: MarkerKey) {
        if self.markers.remove(&key).is_some() {
            self.detached += 1;
        }
    }

    fn style_marker(&mut self, key: MarkerKey, style: MarkerStyle) {
        if let Some(marker) = self.markers.get_mut(&key) {
            marker.style = style;
        }
    }

    fn subscribe(&mut self, queue: EventQueue) {
        self.queue = Some(queue);
    }
}
