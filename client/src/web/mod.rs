//! Browser entry point: reads the page config, wires the provider and DOM targets into one
//! coordinator and drives it from the event queue.

mod dom;

use std::cell::RefCell;
use std::sync::Once;

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;

pub use dom::{DomPopupSurface, DomSidebar};

use crate::config::{MapConfig, ProviderKind};
use crate::coordinator::{FetchRequest, ViewCoordinator};
use crate::events::{EventQueue, UiEvent};
use crate::fetch::fetch_listings;
use crate::provider::{GoogleMap, MapProvider, MapboxMap};

/// Element carrying the `data-config` JSON.
pub const MOUNT_ELEMENT_ID: &str = "listing-map-app";
/// Fallback config object on `window` when the mount element has no `data-config`.
pub const CONFIG_GLOBAL: &str = "listingMapConfig";

type App = ViewCoordinator<Box<dyn MapProvider>, DomPopupSurface, DomSidebar>;

struct Running {
    app: App,
    endpoint: String,
}

thread_local! {
    static APP: RefCell<Option<Running>> = const { RefCell::new(None) };
    static QUEUE: RefCell<Option<EventQueue>> = const { RefCell::new(None) };
}

static LOGGING: Once = Once::new();

fn init_logging() {
    LOGGING.call_once(|| {
        tracing_wasm::set_as_global_default_with_config(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(tracing::Level::INFO)
                .build(),
        );
    });
}

/// Queue a DOM event for the running coordinator. Dropped when nothing is mounted.
pub(crate) fn emit(event: UiEvent) {
    QUEUE.with(|slot| match slot.borrow().as_ref() {
        Some(queue) => queue.push(event),
        None => tracing::debug!(?event, "event with no running map"),
    });
}

fn read_config(document: &web_sys::Document) -> Result<MapConfig, String> {
    let inline = document
        .get_element_by_id(MOUNT_ELEMENT_ID)
        .and_then(|mount| mount.get_attribute("data-config"));
    if let Some(raw) = inline {
        return MapConfig::from_json(&raw).map_err(|e| e.to_string());
    }

    let window = web_sys::window().ok_or("window is unavailable")?;
    let value = js_sys::Reflect::get(&window, &JsValue::from_str(CONFIG_GLOBAL))
        .map_err(|_| format!("failed to read window.{CONFIG_GLOBAL}"))?;
    if value.is_undefined() || value.is_null() {
        return Ok(MapConfig::default());
    }
    let config: MapConfig = serde_wasm_bindgen::from_value(value).map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.to_string())
}

fn element_by_id(document: &web_sys::Document, id: &str) -> Result<web_sys::HtmlElement, String> {
    document
        .get_element_by_id(id)
        .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok())
        .ok_or_else(|| format!("#{id} not found"))
}

fn build_provider(config: &MapConfig) -> Result<Box<dyn MapProvider>, String> {
    let describe = |e: JsValue| e.as_string().unwrap_or_else(|| format!("{e:?}"));
    Ok(match config.provider {
        ProviderKind::Mapbox => {
            Box::new(MapboxMap::from_global(&config.map_global).map_err(describe)?)
        }
        ProviderKind::Google => {
            Box::new(GoogleMap::from_global(&config.map_global).map_err(describe)?)
        }
    })
}

/// Mount the engine onto the page. Calling it again replaces the running instance.
pub fn start() -> Result<(), String> {
    init_logging();
    let window = web_sys::window().ok_or("window is unavailable")?;
    let document = window.document().ok_or("document is unavailable")?;

    let config = read_config(&document)?;
    let queue = EventQueue::new();
    let map = build_provider(&config)?;
    let popup_container = element_by_id(&document, &config.popup_container_id)?;
    let sidebar_list = element_by_id(&document, &config.sidebar_element_id)?;
    QUEUE.with(|slot| *slot.borrow_mut() = Some(queue.clone()));
    let popups = DomPopupSurface::new(popup_container);
    let sidebar = DomSidebar::new(sidebar_list);

    let endpoint = config.listings_endpoint.clone();
    let provider = config.provider;
    let app = ViewCoordinator::with_queue(config, map, popups, sidebar, queue.clone());
    APP.with(|slot| {
        // Re-entered start: the old instance detaches its map listeners on drop.
        drop(slot.borrow_mut().take());
        *slot.borrow_mut() = Some(Running { app, endpoint });
    });

    queue.set_waker(|| spawn_local(async { drain() }));
    // The map may already be idle, in which case its first idle event has come and gone.
    queue.push(UiEvent::MapIdle);
    tracing::info!(?provider, "listing map started");
    Ok(())
}

/// Pump the coordinator and start any fetches it asked for.
fn drain() {
    let Some((requests, endpoint, queue)) = APP.with(|slot| {
        // Already pumping further up the stack; that loop picks up the new event.
        let mut guard = slot.try_borrow_mut().ok()?;
        let running = guard.as_mut()?;
        let requests = running.app.pump();
        Some((requests, running.endpoint.clone(), running.app.queue()))
    }) else {
        return;
    };
    for request in requests {
        spawn_fetch(endpoint.clone(), request, queue.clone());
    }
}

fn spawn_fetch(endpoint: String, request: FetchRequest, queue: EventQueue) {
    spawn_local(async move {
        let result = fetch_listings(&endpoint, &request).await;
        match &result {
            Ok(batch) if batch.undecodable > 0 => tracing::warn!(
                generation = request.generation,
                undecodable = batch.undecodable,
                "listing records failed to decode"
            ),
            Ok(_) => {}
            Err(e) => tracing::warn!(generation = request.generation, error = %e, "listing fetch failed"),
        }
        queue.push(UiEvent::ListingsLoaded {
            generation: request.generation,
            result,
        });
    });
}
