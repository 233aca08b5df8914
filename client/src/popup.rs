use std::collections::HashMap;

use listing_map_shared::{CardDescriptor, Listing, ListingId};
use tracing::debug;

use crate::config::POPUP_Z_BASE;
use crate::surface::{PopupPlacement, PopupSurface};

/// Listings with an open popup, in the order they were opened. Each id appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenPopupSet {
    ids: Vec<ListingId>,
}

impl OpenPopupSet {
    /// Append `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: ListingId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn remove(&mut self, id: ListingId) -> bool {
        match self.position(id) {
            Some(idx) => {
                self.ids.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: ListingId) -> bool {
        self.ids.contains(&id)
    }

    /// Stacking index of `id`; later opens stack higher.
    pub fn position(&self, id: ListingId) -> Option<usize> {
        self.ids.iter().position(|open| *open == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = ListingId> + '_ {
        self.ids.iter().copied()
    }

    pub fn as_slice(&self) -> &[ListingId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupCard {
    /// Down-and-right offset from the shared anchor, fixed at open time.
    pub stagger: f64,
    pub placement: PopupPlacement,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragSession {
    popup: ListingId,
    last_x: f64,
    last_y: f64,
    anchored_by_bottom: bool,
}

/// Owns the floating popup cards and their shared container.
#[derive(Debug)]
pub struct PopupManager<S> {
    surface: S,
    open: OpenPopupSet,
    cards: HashMap<ListingId, PopupCard>,
    drag: Option<DragSession>,
    close_all_shown: bool,
    stagger_px: f64,
    base_bottom_px: f64,
}

impl<S: PopupSurface> PopupManager<S> {
    pub fn new(surface: S, stagger_px: f64, base_bottom_px: f64) -> Self {
        Self {
            surface,
            open: OpenPopupSet::default(),
            cards: HashMap::new(),
            drag: None,
            close_all_shown: false,
            stagger_px,
            base_bottom_px,
        }
    }

    pub fn open_set(&self) -> &OpenPopupSet {
        &self.open
    }

    pub fn is_open(&self, id: ListingId) -> bool {
        self.open.contains(id)
    }

    pub fn card(&self, id: ListingId) -> Option<&PopupCard> {
        self.cards.get(&id)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Open a popup for `listing`. Returns `false` if it is already open.
    pub fn open(&mut self, listing: &Listing) -> bool {
        if !self.open.insert(listing.id) {
            return false;
        }
        let stagger = self.stagger_px * (self.open.len() - 1) as f64;
        let placement = PopupPlacement::Anchored {
            bottom: self.base_bottom_px - stagger,
            shift_x: stagger,
        };
        self.cards.insert(listing.id, PopupCard { stagger, placement });

        let card = CardDescriptor::from_listing(listing);
        let z_index = POPUP_Z_BASE + (self.open.len() - 1) as i32;
        self.surface.mount_popup(&card, placement, z_index);
        if self.open.len() == 1 {
            self.surface.set_container_visible(true);
        }
        self.sync_close_all();
        debug!(listing = %listing.id, open = self.open.len(), stagger, "opened popup");
        true
    }

    /// Close the popup for `id`. Returns `false` if it was not open.
    pub fn close(&mut self, id: ListingId) -> bool {
        if !self.open.remove(id) {
            return false;
        }
        if self.drag.is_some_and(|session| session.popup == id) {
            self.end_drag();
        }
        self.cards.remove(&id);
        self.surface.remove_popup(id);
        for (idx, remaining) in self.open.iter().enumerate() {
            self.surface.restack_popup(remaining, POPUP_Z_BASE + idx as i32);
        }
        if self.open.is_empty() {
            self.surface.set_container_visible(false);
        }
        self.sync_close_all();
        debug!(listing = %id, open = self.open.len(), "closed popup");
        true
    }

    /// Close every popup open at the time of the call. Returns the ids actually closed, in
    /// opening order.
    pub fn close_all(&mut self) -> Vec<ListingId> {
        let snapshot = self.open.as_slice().to_vec();
        snapshot.into_iter().filter(|id| self.close(*id)).collect()
    }

    /// Pointer went down on the drag handle of `id`.
    pub fn begin_drag(&mut self, id: ListingId, x: f64, y: f64) {
        if self.drag.is_some() {
            self.end_drag();
        }
        let Some(card) = self.cards.get(&id) else {
            return;
        };
        self.surface.attach_drag_listeners();
        self.drag = Some(DragSession {
            popup: id,
            last_x: x,
            last_y: y,
            anchored_by_bottom: card.placement.is_anchored(),
        });
    }

    /// Apply a pointer move to the dragged popup. The first move of an anchored popup converts it
    /// to absolute positioning from its rendered offset.
    pub fn drag_to(&mut self, x: f64, y: f64) {
        let Some(mut session) = self.drag else {
            return;
        };
        let Some(card) = self.cards.get_mut(&session.popup) else {
            self.drag = None;
            self.surface.detach_drag_listeners();
            return;
        };

        if session.anchored_by_bottom {
            // Not laid out yet: keep the old pointer so the next move carries this delta too.
            let Some(rendered) = self.surface.rendered_position(session.popup) else {
                return;
            };
            card.placement = PopupPlacement::Absolute {
                top: rendered.top,
                left: rendered.left,
            };
            session.anchored_by_bottom = false;
        }

        let dx = x - session.last_x;
        let dy = y - session.last_y;
        session.last_x = x;
        session.last_y = y;
        if let PopupPlacement::Absolute { top, left } = card.placement {
            card.placement = PopupPlacement::Absolute {
                top: top + dy,
                left: left + dx,
            };
        }
        self.surface.place_popup(session.popup, card.placement);
        self.drag = Some(session);
    }

    /// Pointer released, normally or not. Always removes the document listeners.
    pub fn end_drag(&mut self) {
        if self.drag.take().is_some() {
            self.surface.detach_drag_listeners();
        }
    }

    fn sync_close_all(&mut self) {
        let wanted = self.open.len() > 1;
        if wanted != self.close_all_shown {
            self.close_all_shown = wanted;
            self.surface.set_close_all_visible(wanted);
        }
    }
}
