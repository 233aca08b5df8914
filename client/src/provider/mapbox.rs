use std::collections::HashMap;

use listing_map_shared::{LatLng, ViewportBounds};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsValue;

use super::element::{
    MapListener, MarkerElement, call, call_f64, construct, get, global_path, object,
};
use super::{CameraPose, MapProvider, MarkerKey, MarkerSpec, MarkerStyle};
use crate::events::{EventQueue, UiEvent};

struct MapboxMarker {
    native: JsValue,
    element: MarkerElement,
}

/// Adapter over a `mapboxgl.Map` created by the host page.
pub struct MapboxMap {
    map: JsValue,
    markers: HashMap<MarkerKey, MapboxMarker>,
    next_key: u64,
    queue: EventQueue,
    listeners: Vec<(&'static str, MapListener)>,
}

fn lng_lat(point: LatLng) -> JsValue {
    let array = js_sys::Array::new();
    array.push(&JsValue::from_f64(point.lng));
    array.push(&JsValue::from_f64(point.lat));
    array.into()
}

impl MapboxMap {
    /// Wrap the map stored at `window[map_global]`.
    pub fn from_global(map_global: &str) -> Result<Self, JsValue> {
        let map = global_path(map_global)?;
        Ok(Self {
            map,
            markers: HashMap::new(),
            next_key: 1,
            queue: EventQueue::new(),
            listeners: Vec::new(),
        })
    }

    fn listen(&mut self, event: &'static str, listener: MapListener) {
        let handler: &JsValue = listener.as_ref();
        if call(&self.map, "on", &[JsValue::from_str(event), handler.clone()]).is_ok() {
            self.listeners.push((event, listener));
        }
    }
}

/// Mapbox sets `originalEvent` only for movements started by user input.
fn user_initiated(event: &JsValue) -> bool {
    get(event, "originalEvent").is_ok_and(|original| !original.is_undefined() && !original.is_null())
}

impl MapProvider for MapboxMap {
    fn bounds(&self) -> Option<ViewportBounds> {
        let bounds = call(&self.map, "getBounds", &[]).ok()?;
        if bounds.is_null() || bounds.is_undefined() {
            return None;
        }
        Some(ViewportBounds::new(
            call_f64(&bounds, "getNorth")?,
            call_f64(&bounds, "getSouth")?,
            call_f64(&bounds, "getEast")?,
            call_f64(&bounds, "getWest")?,
        ))
    }

    fn center(&self) -> LatLng {
        let Ok(center) = call(&self.map, "getCenter", &[]) else {
            return LatLng::new(0.0, 0.0);
        };
        let lat = get(&center, "lat").ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let lng = get(&center, "lng").ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        LatLng::new(lat, lng)
    }

    fn zoom(&self) -> f64 {
        call_f64(&self.map, "getZoom").unwrap_or(0.0)
    }

    fn pan_to(&mut self, point: LatLng) {
        let _ = call(&self.map, "panTo", &[lng_lat(point)]);
    }

    fn ease_to(&mut self, pose: CameraPose) {
        let Ok(options) = object(&[
            ("center", lng_lat(pose.center)),
            ("zoom", JsValue::from_f64(pose.zoom)),
        ]) else {
            return;
        };
        let _ = call(&self.map, "easeTo", &[options]);
    }

    fn attach_marker(&mut self, spec: &MarkerSpec) -> MarkerKey {
        let key = MarkerKey(self.next_key);
        self.next_key += 1;

        let attached = MarkerElement::build(spec, key, &self.queue).and_then(|element| {
            let options = object(&[("element", element.element.clone().into())])?;
            let native = construct("mapboxgl.Marker", &[options])?;
            call(&native, "setLngLat", &[lng_lat(spec.position)])?;
            call(&native, "addTo", &[self.map.clone()])?;
            Ok(MapboxMarker { native, element })
        });
        match attached {
            Ok(marker) => {
                self.markers.insert(key, marker);
            }
            Err(e) => tracing::warn!(marker = key.0, error = ?e, "mapbox marker attach failed"),
        }
        key
    }

    fn detach_marker(&mut self, key: MarkerKey) {
        if let Some(marker) = self.markers.remove(&key) {
            let _ = call(&marker.native, "remove", &[]);
            marker.element.release();
        }
    }

    fn style_marker(&mut self, key: MarkerKey, style: MarkerStyle) {
        if let Some(marker) = self.markers.get(&key) {
            marker.element.apply_state(style.state);
            let _ = marker
                .element
                .element
                .style()
                .set_property("z-index", &style.z_index.to_string());
        }
    }

    fn subscribe(&mut self, queue: EventQueue) {
        self.queue = queue.clone();

        let idle_queue = queue.clone();
        self.listen(
            "idle",
            Closure::<dyn Fn(JsValue)>::new(move |_| idle_queue.push(UiEvent::MapIdle)),
        );
        let drag_queue = queue.clone();
        self.listen(
            "dragstart",
            Closure::<dyn Fn(JsValue)>::new(move |e: JsValue| {
                if user_initiated(&e) {
                    drag_queue.push(UiEvent::MapDragStarted);
                }
            }),
        );
        self.listen(
            "zoomstart",
            Closure::<dyn Fn(JsValue)>::new(move |e: JsValue| {
                if user_initiated(&e) {
                    queue.push(UiEvent::MapZoomStarted);
                }
            }),
        );
    }
}

impl Drop for MapboxMap {
    fn drop(&mut self) {
        for (event, listener) in self.listeners.drain(..) {
            let handler: &JsValue = listener.as_ref();
            let _ = call(&self.map, "off", &[JsValue::from_str(event), handler.clone()]);
        }
        for (_, marker) in self.markers.drain() {
            let _ = call(&marker.native, "remove", &[]);
            marker.element.release();
        }
    }
}
