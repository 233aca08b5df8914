use std::collections::HashMap;

use listing_map_shared::{LatLng, ViewportBounds};
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;

use super::element::{
    MapListener, MarkerElement, call, call_f64, construct, global_path, object,
};
use super::{CameraPose, MapProvider, MarkerKey, MarkerSpec, MarkerStyle};
use crate::events::{EventQueue, UiEvent};

struct GoogleMarker {
    native: JsValue,
    element: MarkerElement,
}

/// Adapter over a `google.maps.Map` created by the host page.
pub struct GoogleMap {
    map: JsValue,
    markers: HashMap<MarkerKey, GoogleMarker>,
    next_key: u64,
    queue: EventQueue,
    /// `google.maps.MapsEventListener` handles paired with their callbacks.
    listeners: Vec<(JsValue, MapListener)>,
    wheel: Option<(web_sys::HtmlElement, Closure<dyn Fn()>)>,
}

fn lat_lng_literal(point: LatLng) -> Result<JsValue, JsValue> {
    object(&[
        ("lat", JsValue::from_f64(point.lat)),
        ("lng", JsValue::from_f64(point.lng)),
    ])
}

/// Read a `google.maps.LatLng`, whose coordinates are methods rather than fields.
fn read_lat_lng(value: &JsValue) -> Option<LatLng> {
    Some(LatLng::new(call_f64(value, "lat")?, call_f64(value, "lng")?))
}

impl GoogleMap {
    /// Wrap the map stored at `window[map_global]`.
    pub fn from_global(map_global: &str) -> Result<Self, JsValue> {
        let map = global_path(map_global)?;
        Ok(Self {
            map,
            markers: HashMap::new(),
            next_key: 1,
            queue: EventQueue::new(),
            listeners: Vec::new(),
            wheel: None,
        })
    }

    fn listen(&mut self, event: &str, listener: MapListener) {
        let Ok(events) = global_path("google.maps.event") else {
            return;
        };
        let handler: &JsValue = listener.as_ref();
        if let Ok(handle) = call(
            &events,
            "addListener",
            &[self.map.clone(), JsValue::from_str(event), handler.clone()],
        ) {
            self.listeners.push((handle, listener));
        }
    }

    /// Google reports `zoom_changed` for programmatic moves too, so user zoom is taken from wheel
    /// input on the map container.
    fn listen_wheel(&mut self, queue: EventQueue) {
        use wasm_bindgen::JsCast;

        let Some(div) = call(&self.map, "getDiv", &[])
            .ok()
            .and_then(|v| v.dyn_into::<web_sys::HtmlElement>().ok())
        else {
            return;
        };
        let on_wheel = Closure::<dyn Fn()>::new(move || queue.push(UiEvent::MapZoomStarted));
        if div
            .add_event_listener_with_callback("wheel", on_wheel.as_ref().unchecked_ref())
            .is_ok()
        {
            self.wheel = Some((div, on_wheel));
        }
    }
}

impl MapProvider for GoogleMap {
    fn bounds(&self) -> Option<ViewportBounds> {
        let bounds = call(&self.map, "getBounds", &[]).ok()?;
        if bounds.is_null() || bounds.is_undefined() {
            return None;
        }
        let north_east = read_lat_lng(&call(&bounds, "getNorthEast", &[]).ok()?)?;
        let south_west = read_lat_lng(&call(&bounds, "getSouthWest", &[]).ok()?)?;
        Some(ViewportBounds::new(
            north_east.lat,
            south_west.lat,
            north_east.lng,
            south_west.lng,
        ))
    }

    fn center(&self) -> LatLng {
        call(&self.map, "getCenter", &[])
            .ok()
            .and_then(|center| read_lat_lng(&center))
            .unwrap_or(LatLng::new(0.0, 0.0))
    }

    fn zoom(&self) -> f64 {
        call_f64(&self.map, "getZoom").unwrap_or(0.0)
    }

    fn pan_to(&mut self, point: LatLng) {
        if let Ok(literal) = lat_lng_literal(point) {
            let _ = call(&self.map, "setCenter", &[literal]);
        }
    }

    /// `panTo` animates but cannot change zoom; `moveCamera` handles the zoom case.
    fn ease_to(&mut self, pose: CameraPose) {
        let Ok(center) = lat_lng_literal(pose.center) else {
            return;
        };
        if (self.zoom() - pose.zoom).abs() < f64::EPSILON {
            let _ = call(&self.map, "panTo", &[center]);
            return;
        }
        if let Ok(options) = object(&[("center", center), ("zoom", JsValue::from_f64(pose.zoom))])
        {
            let _ = call(&self.map, "moveCamera", &[options]);
        }
    }

    fn attach_marker(&mut self, spec: &MarkerSpec) -> MarkerKey {
        let key = MarkerKey(self.next_key);
        self.next_key += 1;

        let attached = MarkerElement::build(spec, key, &self.queue).and_then(|element| {
            let options = object(&[
                ("map", self.map.clone()),
                ("position", lat_lng_literal(spec.position)?),
                ("content", element.element.clone().into()),
            ])?;
            let native = construct("google.maps.marker.AdvancedMarkerElement", &[options])?;
            Ok(GoogleMarker { native, element })
        });
        match attached {
            Ok(marker) => {
                self.markers.insert(key, marker);
            }
            Err(e) => tracing::warn!(marker = key.0, error = ?e, "google marker attach failed"),
        }
        key
    }

    fn detach_marker(&mut self, key: MarkerKey) {
        if let Some(marker) = self.markers.remove(&key) {
            let _ = js_sys::Reflect::set(&marker.native, &"map".into(), &JsValue::NULL);
            marker.element.release();
        }
    }

    fn style_marker(&mut self, key: MarkerKey, style: MarkerStyle) {
        if let Some(marker) = self.markers.get(&key) {
            marker.element.apply_state(style.state);
            let _ = js_sys::Reflect::set(
                &marker.native,
                &"zIndex".into(),
                &JsValue::from_f64(style.z_index as f64),
            );
        }
    }

    fn subscribe(&mut self, queue: EventQueue) {
        self.queue = queue.clone();

        let idle_queue = queue.clone();
        self.listen(
            "idle",
            Closure::<dyn Fn(JsValue)>::new(move |_| idle_queue.push(UiEvent::MapIdle)),
        );
        // Google only emits dragstart for user drags.
        let drag_queue = queue.clone();
        self.listen(
            "dragstart",
            Closure::<dyn Fn(JsValue)>::new(move |_| drag_queue.push(UiEvent::MapDragStarted)),
        );
        self.listen_wheel(queue);
    }
}

impl Drop for GoogleMap {
    fn drop(&mut self) {
        for (handle, _listener) in self.listeners.drain(..) {
            let _ = call(&handle, "remove", &[]);
        }
        if let Some((div, on_wheel)) = self.wheel.take() {
            use wasm_bindgen::JsCast;
            let _ = div
                .remove_event_listener_with_callback("wheel", on_wheel.as_ref().unchecked_ref());
        }
        for (_, marker) in self.markers.drain() {
            let _ = js_sys::Reflect::set(&marker.native, &"map".into(), &JsValue::NULL);
            marker.element.release();
        }
    }
}
