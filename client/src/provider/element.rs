//! Marker DOM elements and small `Reflect` helpers shared by the browser backends.

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlElement;

use super::{MarkerKey, MarkerSpec};
use crate::events::{EventQueue, UiEvent};
use crate::highlight::HighlightState;

pub(super) fn get(target: &JsValue, name: &str) -> Result<JsValue, JsValue> {
    Reflect::get(target, &JsValue::from_str(name))
}

/// Call `target[name](...args)`.
pub(super) fn call(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let method: Function = get(target, name)?.dyn_into()?;
    let array = Array::new();
    for arg in args {
        array.push(arg);
    }
    method.apply(target, &array)
}

pub(super) fn call_f64(target: &JsValue, name: &str) -> Option<f64> {
    call(target, name, &[]).ok().and_then(|v| v.as_f64())
}

/// Resolve a dotted path such as `google.maps.marker.AdvancedMarkerElement` from `window`.
pub(super) fn global_path(path: &str) -> Result<JsValue, JsValue> {
    let mut current: JsValue = js_sys::global().into();
    for segment in path.split('.') {
        current = get(&current, segment)?;
        if current.is_undefined() || current.is_null() {
            return Err(JsValue::from_str(&format!("{path} is not defined")));
        }
    }
    Ok(current)
}

pub(super) fn construct(path: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let ctor: Function = global_path(path)?.dyn_into()?;
    let array = Array::new();
    for arg in args {
        array.push(arg);
    }
    Reflect::construct(&ctor, &array)
}

pub(super) fn object(entries: &[(&str, JsValue)]) -> Result<JsValue, JsValue> {
    let obj = js_sys::Object::new();
    for (key, value) in entries {
        Reflect::set(&obj, &JsValue::from_str(key), value)?;
    }
    Ok(obj.into())
}

/// Marker element plus the listeners that forward its pointer input.
pub(super) struct MarkerElement {
    pub element: HtmlElement,
    on_click: Closure<dyn Fn(web_sys::Event)>,
    on_enter: Closure<dyn Fn()>,
    on_leave: Closure<dyn Fn()>,
}

impl MarkerElement {
    pub fn build(spec: &MarkerSpec, key: MarkerKey, queue: &EventQueue) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("document is unavailable"))?;
        let element: HtmlElement = document.create_element("div")?.dyn_into()?;
        let kind = if spec.is_cluster() {
            "listing-marker listing-marker--cluster"
        } else {
            "listing-marker listing-marker--price"
        };
        element.set_class_name(kind);
        element.set_attribute("data-listing-ids", &spec.identity_attr())?;
        element.set_text_content(Some(&spec.label.text()));

        let click_queue = queue.clone();
        let on_click = Closure::<dyn Fn(web_sys::Event)>::new(move |e: web_sys::Event| {
            e.stop_propagation();
            click_queue.push(UiEvent::MarkerClicked(key));
        });
        let enter_queue = queue.clone();
        let on_enter = Closure::<dyn Fn()>::new(move || {
            enter_queue.push(UiEvent::MarkerHoverEntered(key));
        });
        let leave_queue = queue.clone();
        let on_leave = Closure::<dyn Fn()>::new(move || {
            leave_queue.push(UiEvent::MarkerHoverLeft(key));
        });
        element.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        element
            .add_event_listener_with_callback("mouseenter", on_enter.as_ref().unchecked_ref())?;
        element
            .add_event_listener_with_callback("mouseleave", on_leave.as_ref().unchecked_ref())?;

        Ok(Self {
            element,
            on_click,
            on_enter,
            on_leave,
        })
    }

    pub fn apply_state(&self, state: HighlightState) {
        let classes = self.element.class_list();
        let _ = classes.toggle_with_force("is-hover", state == HighlightState::Hover);
        let _ = classes.toggle_with_force("is-active", state == HighlightState::Active);
    }

    pub fn release(self) {
        let _ = self
            .element
            .remove_event_listener_with_callback("click", self.on_click.as_ref().unchecked_ref());
        let _ = self.element.remove_event_listener_with_callback(
            "mouseenter",
            self.on_enter.as_ref().unchecked_ref(),
        );
        let _ = self.element.remove_event_listener_with_callback(
            "mouseleave",
            self.on_leave.as_ref().unchecked_ref(),
        );
        self.element.remove();
    }
}

/// Listener registered on the provider map object, kept alive until the backend drops.
pub(super) type MapListener = Closure<dyn Fn(JsValue)>;
