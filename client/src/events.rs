use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use listing_map_shared::{ListingBatch, ListingId};

use crate::error::FetchError;
use crate::provider::MarkerKey;

/// Every input the engine reacts to. Browser callbacks translate DOM and provider events into
/// these; tests construct them directly.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Camera settled after any movement.
    MapIdle,
    /// User started dragging the map.
    MapDragStarted,
    /// User started zooming the map.
    MapZoomStarted,
    ListingsLoaded {
        generation: u64,
        result: Result<ListingBatch, FetchError>,
    },
    MarkerClicked(MarkerKey),
    MarkerHoverEntered(MarkerKey),
    MarkerHoverLeft(MarkerKey),
    CardHoverEntered(ListingId),
    CardHoverLeft(ListingId),
    CardClicked(ListingId),
    PopupCloseClicked(ListingId),
    CloseAllClicked,
    PopupDragStarted {
        listing: ListingId,
        x: f64,
        y: f64,
    },
    PopupDragMoved {
        x: f64,
        y: f64,
    },
    PopupDragEnded,
    /// Pointer released abnormally (pointercancel, lost capture, window blur).
    PopupDragCancelled,
}

/// FIFO shared between UI callbacks and the coordinator on the single UI thread.
///
/// Callbacks only push; the owner of the coordinator drains with `ViewCoordinator::pump`, so a
/// provider that fires events synchronously from inside a camera call never re-enters the engine.
/// An optional waker runs after every push so a browser host can schedule that drain.
#[derive(Clone, Default)]
pub struct EventQueue {
    inner: Rc<RefCell<VecDeque<UiEvent>>>,
    waker: Rc<RefCell<Option<Rc<dyn Fn()>>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_waker(&self, waker: impl Fn() + 'static) {
        *self.waker.borrow_mut() = Some(Rc::new(waker));
    }

    pub fn push(&self, event: UiEvent) {
        self.inner.borrow_mut().push_back(event);
        let waker = self.waker.borrow().clone();
        if let Some(waker) = waker {
            waker();
        }
    }

    pub fn pop(&self) -> Option<UiEvent> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("pending", &self.len())
            .field("has_waker", &self.waker.borrow().is_some())
            .finish()
    }
}
