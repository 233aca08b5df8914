//! DOM render targets: the floating popup container and the sidebar card list, rendered with
//! leptos and fed through signals the engine sets.

use std::any::Any;

use leptos::ev;
use leptos::leptos_dom::helpers::{WindowListenerHandle, window_event_listener};
use leptos::mount::mount_to;
use leptos::prelude::*;
use listing_map_shared::{CardDescriptor, ListingId};
use web_sys::HtmlElement;

use super::emit;
use crate::events::UiEvent;
use crate::highlight::HighlightState;
use crate::surface::{PopupPlacement, PopupPosition, PopupSurface, SidebarSink};

/// Card body shared by sidebar entries and popups.
#[component]
fn CardBody(card: CardDescriptor) -> impl IntoView {
    let facts = [&card.beds, &card.baths, &card.area]
        .into_iter()
        .filter_map(|fact| fact.as_deref())
        .collect::<Vec<_>>()
        .join(" · ");
    let address = card.address.clone();
    let photo = card.photo.clone().map(|src| {
        let alt = address.clone();
        view! { <img class="listing-card__photo" src=src alt=alt /> }
    });
    let facts = (!facts.is_empty()).then(|| view! { <div class="listing-card__facts">{facts}</div> });
    let address =
        (!address.is_empty()).then(|| view! { <div class="listing-card__address">{address}</div> });

    view! {
        <div class="listing-card__body">
            {photo}
            <div class="listing-card__price">{card.price}</div>
            {facts}
            {address}
        </div>
    }
}

fn placement_css(placement: PopupPlacement, z_index: i32) -> String {
    match placement {
        PopupPlacement::Anchored { bottom, shift_x } => format!(
            "top: auto; bottom: {bottom}px; left: calc(50% + {shift_x}px); \
             transform: translateX(-50%); z-index: {z_index};"
        ),
        PopupPlacement::Absolute { top, left } => format!(
            "bottom: auto; top: {top}px; left: {left}px; transform: none; z-index: {z_index};"
        ),
    }
}

/// One mounted popup. `mount` changes whenever the same listing is mounted again so the keyed
/// list rebuilds the row instead of reusing stale signals.
#[derive(Clone)]
struct PopupEntry {
    card: CardDescriptor,
    mount: u64,
    placement: RwSignal<PopupPlacement>,
    z_index: RwSignal<i32>,
}

#[component]
fn PopupLayer(
    popups: RwSignal<Vec<PopupEntry>>,
    visible: RwSignal<bool>,
    close_all: RwSignal<bool>,
) -> impl IntoView {
    view! {
        <div
            class="listing-popups"
            style:display=move || if visible.get() { "block" } else { "none" }
        >
            <For
                each=move || popups.get()
                key=|entry| (entry.card.listing_id, entry.mount)
                children=move |entry| {
                    let id = entry.card.listing_id;
                    let placement = entry.placement;
                    let z_index = entry.z_index;
                    view! {
                        <div
                            class="listing-popup"
                            data-listing-id=id.to_string()
                            style=move || placement_css(placement.get(), z_index.get())
                        >
                            <div
                                class="listing-popup__handle"
                                on:pointerdown=move |e: ev::PointerEvent| {
                                    if e.button() != 0 {
                                        return;
                                    }
                                    e.prevent_default();
                                    emit(UiEvent::PopupDragStarted {
                                        listing: id,
                                        x: e.client_x() as f64,
                                        y: e.client_y() as f64,
                                    });
                                }
                            >
                                <button
                                    type="button"
                                    class="listing-popup__close"
                                    aria-label="Close"
                                    on:pointerdown=|e: ev::PointerEvent| e.stop_propagation()
                                    on:click=move |_| emit(UiEvent::PopupCloseClicked(id))
                                >
                                    "×"
                                </button>
                            </div>
                            <CardBody card=entry.card />
                        </div>
                    }
                }
            />
            <Show when=move || close_all.get()>
                <button
                    type="button"
                    class="listing-popups__close-all"
                    on:click=|_| emit(UiEvent::CloseAllClicked)
                >
                    "Close all"
                </button>
            </Show>
        </div>
    }
}

/// The shared popup mount point.
pub struct DomPopupSurface {
    container: HtmlElement,
    popups: RwSignal<Vec<PopupEntry>>,
    visible: RwSignal<bool>,
    close_all: RwSignal<bool>,
    mounts: u64,
    drag: Vec<WindowListenerHandle>,
    _mount: Box<dyn Any>,
}

impl DomPopupSurface {
    pub fn new(container: HtmlElement) -> Self {
        let popups = RwSignal::new(Vec::new());
        let visible = RwSignal::new(false);
        let close_all = RwSignal::new(false);
        let handle = mount_to(container.clone(), move || {
            view! { <PopupLayer popups=popups visible=visible close_all=close_all /> }
        });
        Self {
            container,
            popups,
            visible,
            close_all,
            mounts: 0,
            drag: Vec::new(),
            _mount: Box::new(handle),
        }
    }

    fn entry(&self, id: ListingId) -> Option<PopupEntry> {
        self.popups
            .with_untracked(|popups| popups.iter().find(|p| p.card.listing_id == id).cloned())
    }
}

impl PopupSurface for DomPopupSurface {
    fn set_container_visible(&mut self, visible: bool) {
        self.visible.set(visible);
    }

    fn mount_popup(&mut self, card: &CardDescriptor, placement: PopupPlacement, z_index: i32) {
        self.mounts += 1;
        let entry = PopupEntry {
            card: card.clone(),
            mount: self.mounts,
            placement: RwSignal::new(placement),
            z_index: RwSignal::new(z_index),
        };
        self.popups.update(|popups| {
            popups.retain(|p| p.card.listing_id != card.listing_id);
            popups.push(entry);
        });
    }

    fn place_popup(&mut self, id: ListingId, placement: PopupPlacement) {
        if let Some(entry) = self.entry(id) {
            entry.placement.set(placement);
        }
    }

    fn restack_popup(&mut self, id: ListingId, z_index: i32) {
        if let Some(entry) = self.entry(id) {
            entry.z_index.set(z_index);
        }
    }

    fn remove_popup(&mut self, id: ListingId) {
        self.popups
            .update(|popups| popups.retain(|p| p.card.listing_id != id));
    }

    fn rendered_position(&self, id: ListingId) -> Option<PopupPosition> {
        let selector = format!(r#".listing-popup[data-listing-id="{id}"]"#);
        let Some(element) = self.container.query_selector(&selector).ok().flatten() else {
            tracing::debug!(listing = %id, "popup not in the document yet");
            return None;
        };
        let rect = element.get_bounding_client_rect();
        let origin = self.container.get_bounding_client_rect();
        Some(PopupPosition {
            top: rect.top() - origin.top(),
            left: rect.left() - origin.left(),
        })
    }

    fn set_close_all_visible(&mut self, visible: bool) {
        self.close_all.set(visible);
    }

    fn attach_drag_listeners(&mut self) {
        self.detach_drag_listeners();
        self.drag = vec![
            window_event_listener(ev::pointermove, |e| {
                emit(UiEvent::PopupDragMoved {
                    x: e.client_x() as f64,
                    y: e.client_y() as f64,
                });
            }),
            window_event_listener(ev::pointerup, |_| emit(UiEvent::PopupDragEnded)),
            window_event_listener(ev::pointercancel, |_| emit(UiEvent::PopupDragCancelled)),
        ];
    }

    fn detach_drag_listeners(&mut self) {
        for handle in self.drag.drain(..) {
            handle.remove();
        }
    }
}

/// One rendered sidebar card; `render` keys it to the list render that produced it.
#[derive(Clone)]
struct SidebarCard {
    card: CardDescriptor,
    render: u64,
    highlight: RwSignal<HighlightState>,
}

#[component]
fn SidebarCards(cards: RwSignal<Vec<SidebarCard>>) -> impl IntoView {
    view! {
        <For
            each=move || cards.get()
            key=|entry| (entry.card.listing_id, entry.render)
            children=move |entry| {
                let id = entry.card.listing_id;
                let highlight = entry.highlight;
                view! {
                    <article
                        class="listing-card"
                        data-listing-id=id.to_string()
                        class:is-hover=move || highlight.get() == HighlightState::Hover
                        class:is-active=move || highlight.get() == HighlightState::Active
                        on:mouseenter=move |_| emit(UiEvent::CardHoverEntered(id))
                        on:mouseleave=move |_| emit(UiEvent::CardHoverLeft(id))
                        on:click=move |_| emit(UiEvent::CardClicked(id))
                    >
                        <CardBody card=entry.card />
                    </article>
                }
            }
        />
    }
}

/// Sidebar list of listing cards, one per listing of the current fetch.
pub struct DomSidebar {
    cards: RwSignal<Vec<SidebarCard>>,
    renders: u64,
    _mount: Box<dyn Any>,
}

impl DomSidebar {
    pub fn new(list: HtmlElement) -> Self {
        let cards = RwSignal::new(Vec::new());
        let handle = mount_to(list, move || view! { <SidebarCards cards=cards /> });
        Self {
            cards,
            renders: 0,
            _mount: Box::new(handle),
        }
    }
}

impl SidebarSink for DomSidebar {
    fn render(&mut self, cards: &[CardDescriptor]) {
        self.renders += 1;
        let render = self.renders;
        self.cards.set(
            cards
                .iter()
                .map(|card| SidebarCard {
                    card: card.clone(),
                    render,
                    highlight: RwSignal::new(HighlightState::None),
                })
                .collect(),
        );
    }

    fn set_highlight(&mut self, id: ListingId, state: HighlightState) {
        let highlight = self.cards.with_untracked(|cards| {
            cards
                .iter()
                .find(|entry| entry.card.listing_id == id)
                .map(|entry| entry.highlight)
        });
        if let Some(highlight) = highlight {
            highlight.set(state);
        }
    }
}
