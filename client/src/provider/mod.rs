//! Map provider capability surface.
//!
//! The engine talks to the map only through [`MapProvider`]. Two browser backends implement it
//! (Mapbox GL and Google Maps); [`HeadlessMap`] records calls for tests and the replay binary.

mod headless;
#[cfg(target_arch = "wasm32")]
mod element;
#[cfg(target_arch = "wasm32")]
mod google;
#[cfg(target_arch = "wasm32")]
mod mapbox;

pub use headless::{CameraMove, HeadlessMap, HeadlessMarker};
#[cfg(target_arch = "wasm32")]
pub use google::GoogleMap;
#[cfg(target_arch = "wasm32")]
pub use mapbox::MapboxMap;

use listing_map_shared::{LatLng, ListingId, ViewportBounds};

use crate::events::EventQueue;
use crate::highlight::HighlightState;

/// Provider-assigned identity of an attached marker. Never reused within one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerKey(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub center: LatLng,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerLabel {
    /// Abbreviated price of a single listing.
    Price(String),
    /// Member count of a cluster.
    Count(usize),
}

impl MarkerLabel {
    pub fn text(&self) -> String {
        match self {
            Self::Price(price) => price.clone(),
            Self::Count(count) => count.to_string(),
        }
    }
}

/// Everything a backend needs to build one marker element.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub label: MarkerLabel,
    /// Written to the element's identity attribute for card/marker hit-testing.
    pub listing_ids: Vec<ListingId>,
}

impl MarkerSpec {
    pub fn is_cluster(&self) -> bool {
        matches!(self.label, MarkerLabel::Count(_))
    }

    /// Value of the `data-listing-ids` attribute.
    pub fn identity_attr(&self) -> String {
        self.listing_ids
            .iter()
            .map(ListingId::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Applied visual of a marker: highlight class plus stacking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerStyle {
    pub state: HighlightState,
    pub z_index: i32,
}

impl MarkerStyle {
    pub const BASELINE: Self = Self {
        state: HighlightState::None,
        z_index: crate::config::MARKER_Z_BASE,
    };
}

pub trait MapProvider {
    /// Current viewport, or `None` before the map has a size.
    fn bounds(&self) -> Option<ViewportBounds>;
    fn center(&self) -> LatLng;
    fn zoom(&self) -> f64;
    /// Direct, unanimated move of the center.
    fn pan_to(&mut self, point: LatLng);
    /// Animated move ending exactly at `pose`.
    fn ease_to(&mut self, pose: CameraPose);
    fn attach_marker(&mut self, spec: &MarkerSpec) -> MarkerKey;
    fn detach_marker(&mut self, key: MarkerKey);
    fn style_marker(&mut self, key: MarkerKey, style: MarkerStyle);
    /// Forward idle, user drag-start and user zoom-start, plus marker click/hover, into `queue`.
    fn subscribe(&mut self, queue: EventQueue);

    fn camera(&self) -> CameraPose {
        CameraPose {
            center: self.center(),
            zoom: self.zoom(),
        }
    }
}

impl<T: MapProvider + ?Sized> MapProvider for Box<T> {
    fn bounds(&self) -> Option<ViewportBounds> {
        (**self).bounds()
    }

    fn center(&self) -> LatLng {
        (**self).center()
    }

    fn zoom(&self) -> f64 {
        (**self).zoom()
    }

    fn pan_to(&mut self, point: LatLng) {
        (**self).pan_to(point)
    }

    fn ease_to(&mut self, pose: CameraPose) {
        (**self).ease_to(pose)
    }

    fn attach_marker(&mut self, spec: &MarkerSpec) -> MarkerKey {
        (**self).attach_marker(spec)
    }

    fn detach_marker(&mut self, key: MarkerKey) {
        (**self).detach_marker(key)
    }

    fn style_marker(&mut self, key: MarkerKey, style: MarkerStyle) {
        (**self).style_marker(key, style)
    }

    fn subscribe(&mut self, queue: EventQueue) {
        (**self).subscribe(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_attr_joins_member_ids_in_order() {
        let spec = MarkerSpec {
            position: LatLng::new(0.0, 0.0),
            label: MarkerLabel::Count(3),
            listing_ids: vec![ListingId(9), ListingId(2), ListingId(14)],
        };
        assert!(spec.is_cluster());
        assert_eq!(spec.identity_attr(), "9,2,14");
        assert_eq!(spec.label.text(), "3");
    }

    #[test]
    fn boxed_provider_delegates() {
        let mut map: Box<dyn MapProvider> = Box::new(HeadlessMap::new(LatLng::new(1.0, 2.0), 9.0));
        let pose = CameraPose {
            center: LatLng::new(3.0, 4.0),
            zoom: 10.0,
        };
        map.ease_to(pose);
        assert_eq!(map.camera(), pose);
        assert!(map.bounds().is_some_and(|b| b.contains(pose.center)));
    }
}
