use std::collections::HashMap;

use listing_map_shared::ListingId;

use crate::config::{MARKER_Z_ACTIVE, MARKER_Z_BASE, MARKER_Z_HOVER};
use crate::markers::MarkerRegistry;
use crate::popup::OpenPopupSet;
use crate::provider::{MapProvider, MarkerStyle};
use crate::surface::SidebarSink;

/// Visual state of one listing. Ordered by precedence: `Active` beats `Hover` beats `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum HighlightState {
    #[default]
    None,
    Hover,
    Active,
}

impl HighlightState {
    /// CSS class applied to markers and cards in this state.
    pub fn class(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Hover => Some("is-hover"),
            Self::Active => Some("is-active"),
        }
    }
}

/// Everything a highlight change touches, borrowed from the coordinator for one call.
pub struct HighlightTargets<'a, M: ?Sized, S: ?Sized> {
    pub map: &'a mut M,
    pub registry: &'a mut MarkerRegistry,
    pub sidebar: &'a mut S,
    pub open: &'a OpenPopupSet,
}

/// Per-listing highlight bookkeeping. Marker visuals are derived from it: a cluster marker shows
/// the strongest state among its members.
#[derive(Debug, Default)]
pub struct HighlightController {
    applied: HashMap<ListingId, HighlightState>,
}

impl HighlightController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_of(&self, id: ListingId) -> HighlightState {
        self.applied.get(&id).copied().unwrap_or_default()
    }

    pub fn set_state<M, S>(
        &mut self,
        targets: &mut HighlightTargets<'_, M, S>,
        id: ListingId,
        state: HighlightState,
    ) where
        M: MapProvider + ?Sized,
        S: SidebarSink + ?Sized,
    {
        let next = match state {
            HighlightState::Hover
                if targets.open.contains(id) || self.state_of(id) == HighlightState::Active =>
            {
                return;
            }
            other => other,
        };

        if next == HighlightState::None {
            self.applied.remove(&id);
        } else {
            self.applied.insert(id, next);
        }
        targets.sidebar.set_highlight(id, next);
        self.refresh_marker(targets, id);
    }

    /// Drop Hover from `id` while leaving Active untouched. Safe without a matching enter.
    pub fn clear_hover<M, S>(&mut self, targets: &mut HighlightTargets<'_, M, S>, id: ListingId)
    where
        M: MapProvider + ?Sized,
        S: SidebarSink + ?Sized,
    {
        if self.state_of(id) != HighlightState::Active {
            self.set_state(targets, id, HighlightState::None);
        }
    }

    /// Force Active on every listing with an open popup.
    pub fn reapply_active<M, S>(&mut self, targets: &mut HighlightTargets<'_, M, S>)
    where
        M: MapProvider + ?Sized,
        S: SidebarSink + ?Sized,
    {
        let open: Vec<ListingId> = targets.open.iter().collect();
        for id in open {
            self.set_state(targets, id, HighlightState::Active);
        }
    }

    /// Forget all applied state. Called when markers and cards were rebuilt at baseline.
    pub fn reset(&mut self) {
        self.applied.clear();
    }

    fn refresh_marker<M, S>(&self, targets: &mut HighlightTargets<'_, M, S>, id: ListingId)
    where
        M: MapProvider + ?Sized,
        S: SidebarSink + ?Sized,
    {
        let Some(handle) = targets.registry.lookup(id) else {
            return;
        };
        let members = handle.group.members();
        let state = members
            .iter()
            .map(|member| self.state_of(*member))
            .max()
            .unwrap_or_default();
        let z_index = match state {
            HighlightState::None => MARKER_Z_BASE,
            HighlightState::Hover => MARKER_Z_HOVER,
            HighlightState::Active => {
                let top = members
                    .iter()
                    .filter_map(|member| targets.open.position(*member))
                    .max()
                    .unwrap_or(0);
                MARKER_Z_ACTIVE + top as i32
            }
        };
        targets
            .registry
            .restyle(&mut *targets.map, id, MarkerStyle { state, z_index });
    }
}
