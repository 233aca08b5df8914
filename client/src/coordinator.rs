use listing_map_shared::{CardDescriptor, ListingBatch, ListingId, ListingSet, ViewportBounds};
use tracing::{debug, info, warn};

use crate::camera::CameraController;
use crate::config::MapConfig;
use crate::error::FetchError;
use crate::events::{EventQueue, UiEvent};
use crate::grouping;
use crate::highlight::{HighlightController, HighlightState, HighlightTargets};
use crate::markers::{MarkerAction, MarkerRegistry};
use crate::popup::{OpenPopupSet, PopupManager};
use crate::provider::{MapProvider, MarkerKey};
use crate::surface::{PopupSurface, SidebarSink};

/// A listing query the host must run and answer with `UiEvent::ListingsLoaded`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchRequest {
    pub generation: u64,
    pub bounds: ViewportBounds,
    pub limit: usize,
}

/// Viewport cycle. Grouping and rendering run synchronously when a response is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Idle,
    /// Waiting on the request with generation `latest` (older ones may still be in flight).
    Fetching { latest: u64 },
}

/// Owns all engine state and routes every `UiEvent` through the component contracts.
pub struct ViewCoordinator<M, P, S> {
    config: MapConfig,
    map: M,
    sidebar: S,
    popups: PopupManager<P>,
    registry: MarkerRegistry,
    highlight: HighlightController,
    camera: CameraController,
    listings: ListingSet,
    queue: EventQueue,
    phase: ViewPhase,
    issued_generation: u64,
    applied_generation: u64,
}

impl<M, P, S> ViewCoordinator<M, P, S>
where
    M: MapProvider,
    P: PopupSurface,
    S: SidebarSink,
{
    pub fn new(config: MapConfig, map: M, popup_surface: P, sidebar: S) -> Self {
        Self::with_queue(config, map, popup_surface, sidebar, EventQueue::new())
    }

    /// Build around an existing queue, for hosts whose render targets already push into it.
    pub fn with_queue(
        config: MapConfig,
        mut map: M,
        popup_surface: P,
        sidebar: S,
        queue: EventQueue,
    ) -> Self {
        map.subscribe(queue.clone());
        let popups = PopupManager::new(
            popup_surface,
            config.popup_stagger_px,
            config.popup_base_bottom_px,
        );
        Self {
            config,
            map,
            sidebar,
            popups,
            registry: MarkerRegistry::new(),
            highlight: HighlightController::new(),
            camera: CameraController::new(),
            listings: ListingSet::default(),
            queue,
            phase: ViewPhase::Idle,
            issued_generation: 0,
            applied_generation: 0,
        }
    }

    /// Handle for callbacks that need to enqueue events (DOM listeners, the fetch task).
    pub fn queue(&self) -> EventQueue {
        self.queue.clone()
    }

    /// Drain the queue, returning fetches to start in the order they were requested.
    pub fn pump(&mut self) -> Vec<FetchRequest> {
        let mut requests = Vec::new();
        while let Some(event) = self.queue.pop() {
            if let Some(request) = self.dispatch(event) {
                requests.push(request);
            }
        }
        requests
    }

    pub fn dispatch(&mut self, event: UiEvent) -> Option<FetchRequest> {
        match event {
            UiEvent::MapIdle => return self.on_idle(),
            UiEvent::MapDragStarted | UiEvent::MapZoomStarted => self.camera.user_gesture(),
            UiEvent::ListingsLoaded { generation, result } => self.on_loaded(generation, result),
            UiEvent::MarkerClicked(key) => self.on_marker_clicked(key),
            UiEvent::MarkerHoverEntered(key) => self.on_marker_hover(key, true),
            UiEvent::MarkerHoverLeft(key) => self.on_marker_hover(key, false),
            UiEvent::CardHoverEntered(id) => self.on_card_hover_entered(id),
            UiEvent::CardHoverLeft(id) => self.on_card_hover_left(id),
            UiEvent::CardClicked(id) => self.toggle_popup(id),
            UiEvent::PopupCloseClicked(id) => self.close_popup(id),
            UiEvent::CloseAllClicked => self.close_all_popups(),
            UiEvent::PopupDragStarted { listing, x, y } => self.popups.begin_drag(listing, x, y),
            UiEvent::PopupDragMoved { x, y } => self.popups.drag_to(x, y),
            UiEvent::PopupDragEnded | UiEvent::PopupDragCancelled => self.popups.end_drag(),
        }
        None
    }

    fn on_idle(&mut self) -> Option<FetchRequest> {
        self.camera.on_idle();
        let Some(bounds) = self.map.bounds() else {
            debug!("map idle without bounds, skipping fetch");
            return None;
        };
        self.issued_generation += 1;
        let generation = self.issued_generation;
        self.phase = ViewPhase::Fetching { latest: generation };
        debug!(generation, ?bounds, "requesting listings");
        Some(FetchRequest {
            generation,
            bounds,
            limit: self.config.max_results,
        })
    }

    fn on_loaded(&mut self, generation: u64, result: Result<ListingBatch, FetchError>) {
        let is_latest = generation == self.issued_generation;
        if generation <= self.applied_generation {
            debug!(
                generation,
                applied = self.applied_generation,
                "discarding stale listings response"
            );
            return;
        }

        match result {
            Err(e) => {
                warn!(generation, error = %e, "listing fetch failed, keeping previous view");
            }
            Ok(batch) => self.apply_listings(generation, batch),
        }

        if is_latest {
            self.phase = ViewPhase::Idle;
        }
    }

    fn apply_listings(&mut self, generation: u64, batch: ListingBatch) {
        let received = batch.records.len() + batch.undecodable;
        let (listings, invalid) = ListingSet::from_raw(batch.records);
        let skipped = invalid + batch.undecodable;
        if skipped > 0 {
            warn!(generation, skipped, "skipped malformed listings");
        }
        self.listings = listings;
        self.applied_generation = generation;

        let groups = grouping::group(self.listings.iter());
        self.registry.rebuild(&mut self.map, groups, &self.listings);
        self.highlight.reset();

        let cards: Vec<CardDescriptor> = self
            .listings
            .iter()
            .map(CardDescriptor::from_listing)
            .collect();
        self.sidebar.render(&cards);

        let mut targets = HighlightTargets {
            map: &mut self.map,
            registry: &mut self.registry,
            sidebar: &mut self.sidebar,
            open: self.popups.open_set(),
        };
        self.highlight.reapply_active(&mut targets);

        info!(
            generation,
            received,
            listings = self.listings.len(),
            markers = self.registry.len(),
            "applied listings"
        );
    }

    fn on_marker_clicked(&mut self, key: MarkerKey) {
        match self.registry.action_for(key) {
            Some(MarkerAction::TogglePopup(id)) => self.toggle_popup(id),
            Some(MarkerAction::ExpandCluster(ids)) => {
                for id in ids {
                    if !self.popups.is_open(id) {
                        self.open_popup(id);
                    }
                }
            }
            None => debug!(?key, "click on retired marker ignored"),
        }
    }

    fn on_marker_hover(&mut self, key: MarkerKey, entered: bool) {
        let Some(members) = self
            .registry
            .by_key(key)
            .map(|handle| handle.group.members().to_vec())
        else {
            return;
        };
        for id in members {
            if entered {
                self.set_highlight(id, HighlightState::Hover);
            } else {
                self.clear_hover(id);
            }
        }
    }

    fn on_card_hover_entered(&mut self, id: ListingId) {
        let Some(position) = self.listings.get(id).map(|listing| listing.position) else {
            return;
        };
        self.set_highlight(id, HighlightState::Hover);
        self.camera.begin_hover_pan(&mut self.map, position);
    }

    fn on_card_hover_left(&mut self, id: ListingId) {
        self.clear_hover(id);
        self.camera.end_hover_pan(&mut self.map);
    }

    /// Single-marker and card click: open or close, then pan directly to the listing.
    pub fn toggle_popup(&mut self, id: ListingId) {
        let Some(position) = self.listings.get(id).map(|listing| listing.position) else {
            return;
        };
        if self.popups.is_open(id) {
            self.close_popup(id);
        } else {
            self.open_popup(id);
        }
        self.camera.pan_to(&mut self.map, position, false);
    }

    pub fn open_popup(&mut self, id: ListingId) {
        let Some(listing) = self.listings.get(id) else {
            return;
        };
        if self.popups.open(listing) {
            self.set_highlight(id, HighlightState::Active);
        }
    }

    pub fn close_popup(&mut self, id: ListingId) {
        if self.popups.close(id) {
            self.set_highlight(id, HighlightState::None);
            self.reapply_active();
        }
    }

    pub fn close_all_popups(&mut self) {
        let closed = self.popups.close_all();
        if closed.is_empty() {
            return;
        }
        for id in closed {
            self.set_highlight(id, HighlightState::None);
        }
        self.reapply_active();
    }

    fn set_highlight(&mut self, id: ListingId, state: HighlightState) {
        let mut targets = HighlightTargets {
            map: &mut self.map,
            registry: &mut self.registry,
            sidebar: &mut self.sidebar,
            open: self.popups.open_set(),
        };
        self.highlight.set_state(&mut targets, id, state);
    }

    fn clear_hover(&mut self, id: ListingId) {
        let mut targets = HighlightTargets {
            map: &mut self.map,
            registry: &mut self.registry,
            sidebar: &mut self.sidebar,
            open: self.popups.open_set(),
        };
        self.highlight.clear_hover(&mut targets, id);
    }

    fn reapply_active(&mut self) {
        let mut targets = HighlightTargets {
            map: &mut self.map,
            registry: &mut self.registry,
            sidebar: &mut self.sidebar,
            open: self.popups.open_set(),
        };
        self.highlight.reapply_active(&mut targets);
    }

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn listings(&self) -> &ListingSet {
        &self.listings
    }

    pub fn open_popups(&self) -> &OpenPopupSet {
        self.popups.open_set()
    }

    pub fn highlight_of(&self, id: ListingId) -> HighlightState {
        self.highlight.state_of(id)
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.registry
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn popups(&self) -> &PopupManager<P> {
        &self.popups
    }

    pub fn sidebar(&self) -> &S {
        &self.sidebar
    }
}

#[cfg(test)]
mod tests {
    use listing_map_shared::{LatLng, RawListing};

    use super::*;
    use crate::provider::{CameraMove, CameraPose, HeadlessMap, MarkerLabel};
    use crate::surface::{HeadlessPopupSurface, HeadlessSidebar};

    type Harness = ViewCoordinator<HeadlessMap, HeadlessPopupSurface, HeadlessSidebar>;

    const HOME: LatLng = LatLng::new(40.0, -74.0);

    fn harness() -> Harness {
        ViewCoordinator::new(
            MapConfig::default(),
            HeadlessMap::new(HOME, 12.0),
            HeadlessPopupSurface::default(),
            HeadlessSidebar::default(),
        )
    }

    fn raw(id: u64, lat: f64, lng: f64) -> RawListing {
        RawListing {
            id: ListingId(id),
            lat: Some(lat),
            lng: Some(lng),
            price: Some(300_000.0 + id as f64 * 1_000.0),
            bedrooms: Some(2.0),
            ..RawListing::default()
        }
    }

    /// Five listings; 2 and 4 differ only past the sixth decimal.
    fn five() -> Vec<RawListing> {
        vec![
            raw(1, 40.01, -74.01),
            raw(2, 40.02, -74.02),
            raw(3, 40.03, -74.03),
            raw(4, 40.020_000_2, -74.019_999_9),
            raw(5, 40.05, -74.05),
        ]
    }

    fn load(h: &mut Harness, listings: Vec<RawListing>) -> u64 {
        let request = h.dispatch(UiEvent::MapIdle).expect("idle should request listings");
        h.dispatch(UiEvent::ListingsLoaded {
            generation: request.generation,
            result: Ok(listings.into()),
        });
        request.generation
    }

    fn key_of(h: &Harness, id: u64) -> MarkerKey {
        h.map().key_for_listing(ListingId(id)).expect("marker for listing")
    }

    fn ids(set: &OpenPopupSet) -> Vec<u64> {
        set.iter().map(|id| id.0).collect()
    }

    #[test]
    fn fetch_groups_opens_cluster_and_closes_all() {
        let mut h = harness();
        load(&mut h, five());

        assert_eq!(h.map().marker_count(), 4);
        let labels: Vec<MarkerLabel> = h
            .map()
            .markers()
            .map(|(_, marker)| marker.spec.label.clone())
            .collect();
        assert_eq!(
            labels.iter().filter(|l| matches!(l, MarkerLabel::Count(2))).count(),
            1
        );
        assert_eq!(
            labels.iter().filter(|l| matches!(l, MarkerLabel::Price(_))).count(),
            3
        );
        assert_eq!(h.sidebar().cards().len(), 5);

        h.dispatch(UiEvent::MarkerClicked(key_of(&h, 2)));
        assert_eq!(ids(h.open_popups()), vec![2, 4]);
        assert!(h.popups().surface().container_visible);
        assert!(h.popups().surface().close_all_visible);
        assert_eq!(h.highlight_of(ListingId(4)), HighlightState::Active);

        h.dispatch(UiEvent::CloseAllClicked);
        assert!(h.open_popups().is_empty());
        assert_eq!(h.popups().surface().popup_count(), 0);
        assert!(!h.popups().surface().container_visible);
        assert!(!h.popups().surface().close_all_visible);
        assert_eq!(h.highlight_of(ListingId(2)), HighlightState::None);
        let cluster = h.map().marker(key_of(&h, 2)).expect("cluster marker");
        assert_eq!(cluster.style.state, HighlightState::None);
    }

    #[test]
    fn cluster_click_leaves_open_members_alone() {
        let mut h = harness();
        load(&mut h, five());
        h.open_popup(ListingId(4));
        h.open_popup(ListingId(1));

        h.dispatch(UiEvent::MarkerClicked(key_of(&h, 2)));
        assert_eq!(ids(h.open_popups()), vec![4, 1, 2]);

        h.dispatch(UiEvent::MarkerClicked(key_of(&h, 2)));
        assert_eq!(ids(h.open_popups()), vec![4, 1, 2]);
    }

    #[test]
    fn open_then_close_restores_none() {
        let mut h = harness();
        load(&mut h, five());

        h.dispatch(UiEvent::CardClicked(ListingId(3)));
        assert_eq!(h.highlight_of(ListingId(3)), HighlightState::Active);
        assert_eq!(
            h.sidebar().highlight_of(ListingId(3)),
            HighlightState::Active
        );

        h.dispatch(UiEvent::PopupCloseClicked(ListingId(3)));
        assert_eq!(h.highlight_of(ListingId(3)), HighlightState::None);
        assert!(!h.open_popups().contains(ListingId(3)));

        h.dispatch(UiEvent::PopupCloseClicked(ListingId(99)));
        assert!(h.open_popups().is_empty());
    }

    #[test]
    fn reopening_keeps_order_without_duplicates() {
        let mut h = harness();
        load(&mut h, five());
        h.open_popup(ListingId(1));
        h.open_popup(ListingId(3));
        h.open_popup(ListingId(1));
        assert_eq!(ids(h.open_popups()), vec![1, 3]);
    }

    #[test]
    fn single_marker_click_toggles_and_pans_directly() {
        let mut h = harness();
        load(&mut h, five());

        h.dispatch(UiEvent::MarkerClicked(key_of(&h, 5)));
        assert!(h.open_popups().contains(ListingId(5)));
        assert_eq!(
            h.map().moves(),
            &[CameraMove::Pan(LatLng::new(40.05, -74.05))]
        );

        h.dispatch(UiEvent::MarkerClicked(key_of(&h, 5)));
        assert!(h.open_popups().is_empty());
        assert_eq!(h.map().moves().len(), 2);
    }

    #[test]
    fn rebuild_reapplies_active_to_fresh_markers() {
        let mut h = harness();
        load(&mut h, five());
        h.dispatch(UiEvent::MarkerClicked(key_of(&h, 1)));
        h.dispatch(UiEvent::MarkerClicked(key_of(&h, 2)));
        let old_key = key_of(&h, 1);

        load(&mut h, five());
        let fresh_key = key_of(&h, 1);
        assert_ne!(fresh_key, old_key);
        for id in [1, 2] {
            let marker = h.map().marker(key_of(&h, id)).expect("marker");
            assert_eq!(marker.style.state, HighlightState::Active);
        }
        let single = h.map().marker(key_of(&h, 3)).expect("marker");
        assert_eq!(single.style.state, HighlightState::None);
        assert_eq!(
            h.sidebar().highlight_of(ListingId(4)),
            HighlightState::Active
        );

        h.dispatch(UiEvent::MarkerClicked(old_key));
        assert_eq!(ids(h.open_popups()), vec![1, 2, 4]);
    }

    #[test]
    fn card_hover_round_trip_restores_camera() {
        let mut h = harness();
        load(&mut h, five());
        let original = h.map().camera();

        h.dispatch(UiEvent::CardHoverEntered(ListingId(1)));
        assert_eq!(h.camera().snapshot(), Some(original));
        assert_eq!(h.map().center(), LatLng::new(40.01, -74.01));
        assert_eq!(h.highlight_of(ListingId(1)), HighlightState::Hover);

        h.dispatch(UiEvent::CardHoverEntered(ListingId(3)));
        assert_eq!(h.camera().snapshot(), Some(original));

        h.dispatch(UiEvent::CardHoverLeft(ListingId(3)));
        assert_eq!(h.map().camera(), original);
        assert_eq!(h.camera().snapshot(), None);
        assert_eq!(
            h.map().moves().last(),
            Some(&CameraMove::Ease(CameraPose {
                center: original.center,
                zoom: original.zoom
            }))
        );
    }

    #[test]
    fn hover_leave_without_enter_is_harmless() {
        let mut h = harness();
        load(&mut h, five());
        h.dispatch(UiEvent::CardHoverLeft(ListingId(2)));
        assert!(h.map().moves().is_empty());
        assert_eq!(h.highlight_of(ListingId(2)), HighlightState::None);
    }

    #[test]
    fn hover_does_not_override_active_card() {
        let mut h = harness();
        load(&mut h, five());
        h.open_popup(ListingId(1));
        h.dispatch(UiEvent::CardHoverEntered(ListingId(1)));
        assert_eq!(h.highlight_of(ListingId(1)), HighlightState::Active);
        h.dispatch(UiEvent::CardHoverLeft(ListingId(1)));
        assert_eq!(h.highlight_of(ListingId(1)), HighlightState::Active);
    }

    #[test]
    fn user_gestures_and_viewport_changes_drop_snapshot() {
        let mut h = harness();
        load(&mut h, five());

        h.dispatch(UiEvent::CardHoverEntered(ListingId(1)));
        h.dispatch(UiEvent::MapDragStarted);
        assert!(h.camera().snapshot().is_none());
        h.dispatch(UiEvent::CardHoverLeft(ListingId(1)));
        assert_eq!(h.map().moves().len(), 1);

        h.dispatch(UiEvent::CardHoverEntered(ListingId(3)));
        // Idle from our own ease refreshes listings but keeps the revert target.
        assert!(h.dispatch(UiEvent::MapIdle).is_some());
        assert!(h.camera().snapshot().is_some());
        h.dispatch(UiEvent::MapIdle);
        assert!(h.camera().snapshot().is_none());

        h.dispatch(UiEvent::CardHoverEntered(ListingId(5)));
        h.dispatch(UiEvent::MapZoomStarted);
        assert!(h.camera().snapshot().is_none());
    }

    #[test]
    fn marker_hover_highlights_every_member() {
        let mut h = harness();
        load(&mut h, five());
        let cluster = key_of(&h, 2);

        h.dispatch(UiEvent::MarkerHoverEntered(cluster));
        assert_eq!(h.sidebar().highlight_of(ListingId(2)), HighlightState::Hover);
        assert_eq!(h.sidebar().highlight_of(ListingId(4)), HighlightState::Hover);
        assert_eq!(
            h.map().marker(cluster).map(|m| m.style.state),
            Some(HighlightState::Hover)
        );
        assert!(h.map().moves().is_empty());

        h.dispatch(UiEvent::MarkerHoverLeft(cluster));
        assert_eq!(
            h.map().marker(cluster).map(|m| m.style.state),
            Some(HighlightState::None)
        );
    }

    #[test]
    fn failed_fetch_keeps_previous_view() {
        let mut h = harness();
        load(&mut h, five());
        let markers_before = h.map().marker_count();

        let request = h.dispatch(UiEvent::MapIdle).expect("request");
        assert_eq!(
            h.phase(),
            ViewPhase::Fetching {
                latest: request.generation
            }
        );
        h.dispatch(UiEvent::ListingsLoaded {
            generation: request.generation,
            result: Err(FetchError::Status(500)),
        });

        assert_eq!(h.phase(), ViewPhase::Idle);
        assert_eq!(h.map().marker_count(), markers_before);
        assert_eq!(h.sidebar().cards().len(), 5);
        assert_eq!(h.sidebar().render_count(), 1);
        assert_eq!(h.listings().len(), 5);
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut h = harness();
        let first = h.dispatch(UiEvent::MapIdle).expect("first request");
        let second = h.dispatch(UiEvent::MapIdle).expect("second request");
        assert!(second.generation > first.generation);

        h.dispatch(UiEvent::ListingsLoaded {
            generation: second.generation,
            result: Ok(vec![raw(10, 40.0, -74.0)].into()),
        });
        assert_eq!(h.phase(), ViewPhase::Idle);

        h.dispatch(UiEvent::ListingsLoaded {
            generation: first.generation,
            result: Ok(five().into()),
        });
        assert_eq!(h.listings().len(), 1);
        assert!(h.listings().get(ListingId(10)).is_some());
        assert_eq!(h.sidebar().render_count(), 1);
    }

    #[test]
    fn older_response_arriving_first_is_shown_until_newer_lands() {
        let mut h = harness();
        let first = h.dispatch(UiEvent::MapIdle).expect("first request");
        let second = h.dispatch(UiEvent::MapIdle).expect("second request");

        h.dispatch(UiEvent::ListingsLoaded {
            generation: first.generation,
            result: Ok(five().into()),
        });
        assert_eq!(h.listings().len(), 5);
        assert_eq!(
            h.phase(),
            ViewPhase::Fetching {
                latest: second.generation
            }
        );

        h.dispatch(UiEvent::ListingsLoaded {
            generation: second.generation,
            result: Ok(vec![raw(10, 40.0, -74.0)].into()),
        });
        assert_eq!(h.listings().len(), 1);
        assert_eq!(h.phase(), ViewPhase::Idle);
    }

    #[test]
    fn malformed_listings_are_skipped() {
        let mut h = harness();
        let mut listings = five();
        listings.push(RawListing {
            lat: None,
            ..raw(6, 40.06, -74.06)
        });
        listings.push(RawListing {
            price: None,
            ..raw(7, 40.07, -74.07)
        });
        load(&mut h, listings);

        assert_eq!(h.listings().len(), 5);
        assert_eq!(h.sidebar().cards().len(), 5);
        assert_eq!(h.map().marker_count(), 4);
    }

    #[test]
    fn undecodable_records_do_not_sink_the_response() {
        let mut h = harness();
        let payload: listing_map_shared::ListingsPayload = serde_json::from_value(serde_json::json!({
            "listings": [
                { "id": 1, "lat": 40.01, "lng": -74.01, "price": 410000 },
                { "id": 2, "lat": 40.02, "lng": -74.02, "price": "425000" },
                { "lat": 40.03, "lng": -74.03, "price": 300000 },
                { "id": 4, "lat": 40.04, "price": 390000 },
                { "id": 5, "lat": 40.05, "lng": -74.05, "price": 515000 }
            ]
        }))
        .expect("payload should parse");

        let request = h.dispatch(UiEvent::MapIdle).expect("idle should request listings");
        h.dispatch(UiEvent::ListingsLoaded {
            generation: request.generation,
            result: Ok(payload.decode()),
        });

        let loaded: Vec<u64> = h.listings().iter().map(|l| l.id.0).collect();
        assert_eq!(loaded, vec![1, 5]);
        assert_eq!(h.map().marker_count(), 2);
        assert_eq!(h.sidebar().cards().len(), 2);
        assert_eq!(h.phase(), ViewPhase::Idle);
    }

    #[test]
    fn click_during_hover_ease_recenters_for_good() {
        let mut h = harness();
        load(&mut h, five());
        let target = LatLng::new(40.01, -74.01);

        h.dispatch(UiEvent::CardHoverEntered(ListingId(1)));
        h.dispatch(UiEvent::CardClicked(ListingId(1)));
        assert_eq!(h.camera().snapshot(), None);

        assert!(h.dispatch(UiEvent::MapIdle).is_some());
        h.dispatch(UiEvent::CardHoverLeft(ListingId(1)));

        assert_eq!(h.map().center(), target);
        assert_eq!(
            h.map().moves(),
            &[
                CameraMove::Ease(CameraPose {
                    center: target,
                    zoom: 12.0
                }),
                CameraMove::Pan(target),
            ]
        );
        assert_eq!(h.highlight_of(ListingId(1)), HighlightState::Active);
    }

    #[test]
    fn popup_outside_new_viewport_stays_open() {
        let mut h = harness();
        load(&mut h, five());
        h.open_popup(ListingId(1));

        load(&mut h, vec![raw(20, 41.0, -75.0)]);
        assert!(h.open_popups().contains(ListingId(1)));
        assert_eq!(h.highlight_of(ListingId(1)), HighlightState::Active);

        h.dispatch(UiEvent::PopupCloseClicked(ListingId(1)));
        assert!(!h.popups().surface().container_visible);
    }

    #[test]
    fn drag_events_move_popup_and_release_listeners() {
        let mut h = harness();
        load(&mut h, five());
        h.open_popup(ListingId(1));

        h.dispatch(UiEvent::PopupDragStarted {
            listing: ListingId(1),
            x: 10.0,
            y: 10.0,
        });
        assert_eq!(h.popups().surface().active_listeners(), 2);
        h.dispatch(UiEvent::PopupDragMoved { x: 30.0, y: 40.0 });
        h.dispatch(UiEvent::PopupDragCancelled);

        assert_eq!(h.popups().surface().active_listeners(), 0);
        assert!(!h.popups().is_dragging());
        assert!(
            !h.popups()
                .card(ListingId(1))
                .expect("card")
                .placement
                .is_anchored()
        );
    }

    #[test]
    fn pump_drains_provider_events() {
        let mut h = harness();
        h.map().settle();
        h.map().settle();
        let requests = h.pump();
        assert_eq!(
            requests.iter().map(|r| r.generation).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(requests[0].limit, 250);
        assert!(h.queue().is_empty());

        let request = requests[1];
        h.queue().push(UiEvent::ListingsLoaded {
            generation: request.generation,
            result: Ok(five().into()),
        });
        assert!(h.pump().is_empty());
        assert_eq!(h.map().marker_count(), 4);

        let key = key_of(&h, 5);
        h.map().click(key);
        h.pump();
        assert!(h.open_popups().contains(ListingId(5)));
    }

    #[test]
    fn idle_before_layout_requests_nothing() {
        let mut h: Harness = ViewCoordinator::new(
            MapConfig::default(),
            HeadlessMap::new(HOME, 12.0).not_laid_out(),
            HeadlessPopupSurface::default(),
            HeadlessSidebar::default(),
        );
        assert!(h.dispatch(UiEvent::MapIdle).is_none());
        assert_eq!(h.phase(), ViewPhase::Idle);
    }
}
