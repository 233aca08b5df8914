//! Render targets the engine drives: the shared popup container and the sidebar card list.

use std::collections::{BTreeMap, HashMap};

use listing_map_shared::{CardDescriptor, ListingId};

use crate::highlight::HighlightState;

/// Where a popup card sits inside the popup container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PopupPlacement {
    /// Initial placement: `bottom` px above the container's bottom edge, horizontally centered
    /// and then shifted right by `shift_x` px.
    Anchored { bottom: f64, shift_x: f64 },
    /// Absolute top/left in container pixels, used once a popup has been dragged.
    Absolute { top: f64, left: f64 },
}

impl PopupPlacement {
    pub fn is_anchored(&self) -> bool {
        matches!(self, Self::Anchored { .. })
    }
}

/// Rendered top-left of a popup, in container pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupPosition {
    pub top: f64,
    pub left: f64,
}

pub trait PopupSurface {
    fn set_container_visible(&mut self, visible: bool);
    /// Create a popup card with its close control and drag handle.
    fn mount_popup(&mut self, card: &CardDescriptor, placement: PopupPlacement, z_index: i32);
    fn place_popup(&mut self, id: ListingId, placement: PopupPlacement);
    fn restack_popup(&mut self, id: ListingId, z_index: i32);
    fn remove_popup(&mut self, id: ListingId);
    /// Current rendered offset, read back from layout.
    fn rendered_position(&self, id: ListingId) -> Option<PopupPosition>;
    fn set_close_all_visible(&mut self, visible: bool);
    /// Install document-level pointer-move/pointer-up listeners for one drag.
    fn attach_drag_listeners(&mut self);
    fn detach_drag_listeners(&mut self);
}

pub trait SidebarSink {
    /// Replace the whole card list.
    fn render(&mut self, cards: &[CardDescriptor]);
    fn set_highlight(&mut self, id: ListingId, state: HighlightState);
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessPopup {
    pub card: CardDescriptor,
    pub placement: PopupPlacement,
    pub z_index: i32,
}

/// Popup container that lays popups out arithmetically instead of through a DOM.
#[derive(Debug)]
pub struct HeadlessPopupSurface {
    pub container_visible: bool,
    pub close_all_visible: bool,
    popups: BTreeMap<ListingId, HeadlessPopup>,
    listeners: usize,
    layout_pending: bool,
    width: f64,
    height: f64,
    popup_width: f64,
    popup_height: f64,
}

impl Default for HeadlessPopupSurface {
    fn default() -> Self {
        Self {
            container_visible: false,
            close_all_visible: false,
            popups: BTreeMap::new(),
            listeners: 0,
            layout_pending: false,
            width: 1_000.0,
            height: 800.0,
            popup_width: 300.0,
            popup_height: 200.0,
        }
    }
}

impl HeadlessPopupSurface {
    pub fn popup(&self, id: ListingId) -> Option<&HeadlessPopup> {
        self.popups.get(&id)
    }

    pub fn popup_count(&self) -> usize {
        self.popups.len()
    }

    /// Document listeners currently installed.
    pub fn active_listeners(&self) -> usize {
        self.listeners
    }

    /// While pending, popups have no rendered position, as before the browser's first layout.
    pub fn set_layout_pending(&mut self, pending: bool) {
        self.layout_pending = pending;
    }
}

impl PopupSurface for HeadlessPopupSurface {
    fn set_container_visible(&mut self, visible: bool) {
        self.container_visible = visible;
    }

    fn mount_popup(&mut self, card: &CardDescriptor, placement: PopupPlacement, z_index: i32) {
        self.popups.insert(
            card.listing_id,
            HeadlessPopup {
                card: card.clone(),
                placement,
                z_index,
            },
        );
    }

    fn place_popup(&mut self, id: ListingId, placement: PopupPlacement) {
        if let Some(popup) = self.popups.get_mut(&id) {
            popup.placement = placement;
        }
    }

    fn restack_popup(&mut self, id: ListingId, z_index: i32) {
        if let Some(popup) = self.popups.get_mut(&id) {
            popup.z_index = z_index;
        }
    }

    fn remove_popup(&mut self, id: ListingId) {
        self.popups.remove(&id);
    }

    fn rendered_position(&self, id: ListingId) -> Option<PopupPosition> {
        if self.layout_pending {
            return None;
        }
        let popup = self.popups.get(&id)?;
        Some(match popup.placement {
            PopupPlacement::Anchored { bottom, shift_x } => PopupPosition {
                top: self.height - bottom - self.popup_height,
                left: self.width / 2.0 + shift_x - self.popup_width / 2.0,
            },
            PopupPlacement::Absolute { top, left } => PopupPosition { top, left },
        })
    }

    fn set_close_all_visible(&mut self, visible: bool) {
        self.close_all_visible = visible;
    }

    fn attach_drag_listeners(&mut self) {
        self.listeners += 2;
    }

    fn detach_drag_listeners(&mut self) {
        self.listeners = self.listeners.saturating_sub(2);
    }
}

/// Sidebar that keeps the last rendered card list and per-card highlight.
#[derive(Debug, Default)]
pub struct HeadlessSidebar {
    cards: Vec<CardDescriptor>,
    highlights: HashMap<ListingId, HighlightState>,
    renders: usize,
}

impl HeadlessSidebar {
    pub fn cards(&self) -> &[CardDescriptor] {
        &self.cards
    }

    pub fn render_count(&self) -> usize {
        self.renders
    }

    pub fn highlight_of(&self, id: ListingId) -> HighlightState {
        self.highlights.get(&id).copied().unwrap_or_default()
    }
}

impl SidebarSink for HeadlessSidebar {
    fn render(&mut self, cards: &[CardDescriptor]) {
        self.cards = cards.to_vec();
        self.highlights.clear();
        self.renders += 1;
    }

    fn set_highlight(&mut self, id: ListingId, state: HighlightState) {
        if state == HighlightState::None {
            self.highlights.remove(&id);
        } else {
            self.highlights.insert(id, state);
        }
    }
}
