use std::collections::HashMap;

use listing_map_shared::{ListingId, ListingSet, format_price_short};
use tracing::debug;

use crate::grouping::{GroupKind, MarkerGroup};
use crate::provider::{MapProvider, MarkerKey, MarkerLabel, MarkerSpec, MarkerStyle};

/// What clicking a marker does, fixed when the marker is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerAction {
    /// Open the popup if closed, close it if open, and pan to the listing.
    TogglePopup(ListingId),
    /// Open every member popup that is not already open.
    ExpandCluster(Vec<ListingId>),
}

#[derive(Debug, Clone)]
pub struct MarkerHandle {
    pub group: MarkerGroup,
    pub key: MarkerKey,
    pub style: MarkerStyle,
}

impl MarkerHandle {
    pub fn action(&self) -> MarkerAction {
        match &self.group.kind {
            GroupKind::Single(id) => MarkerAction::TogglePopup(*id),
            GroupKind::Cluster(ids) => MarkerAction::ExpandCluster(ids.clone()),
        }
    }
}

/// Live on-map markers of the current fetch cycle. Handles are replaced wholesale on rebuild and
/// never carried across cycles.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    handles: Vec<MarkerHandle>,
    by_listing: HashMap<ListingId, usize>,
    by_key: HashMap<MarkerKey, usize>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detach every existing marker and attach fresh ones for `groups`, all at baseline style.
    pub fn rebuild<M: MapProvider + ?Sized>(
        &mut self,
        map: &mut M,
        groups: Vec<MarkerGroup>,
        listings: &ListingSet,
    ) {
        let removed = self.clear(map);

        self.handles.reserve(groups.len());
        for group in groups {
            let label = match &group.kind {
                GroupKind::Single(id) => MarkerLabel::Price(
                    listings
                        .get(*id)
                        .map(|listing| format_price_short(listing.price))
                        .unwrap_or_default(),
                ),
                GroupKind::Cluster(ids) => MarkerLabel::Count(ids.len()),
            };
            let spec = MarkerSpec {
                position: group.position,
                label,
                listing_ids: group.members().to_vec(),
            };
            let key = map.attach_marker(&spec);

            let idx = self.handles.len();
            for id in group.members() {
                self.by_listing.insert(*id, idx);
            }
            self.by_key.insert(key, idx);
            self.handles.push(MarkerHandle {
                group,
                key,
                style: MarkerStyle::BASELINE,
            });
        }

        debug!(removed, markers = self.handles.len(), "rebuilt markers");
    }

    /// Detach every marker. Returns how many were removed.
    pub fn clear<M: MapProvider + ?Sized>(&mut self, map: &mut M) -> usize {
        let removed = self.handles.len();
        for handle in self.handles.drain(..) {
            map.detach_marker(handle.key);
        }
        self.by_listing.clear();
        self.by_key.clear();
        removed
    }

    pub fn lookup(&self, id: ListingId) -> Option<&MarkerHandle> {
        self.by_listing.get(&id).map(|&idx| &self.handles[idx])
    }

    pub fn by_key(&self, key: MarkerKey) -> Option<&MarkerHandle> {
        self.by_key.get(&key).map(|&idx| &self.handles[idx])
    }

    /// Click behavior of a live marker. `None` for keys from an earlier cycle.
    pub fn action_for(&self, key: MarkerKey) -> Option<MarkerAction> {
        self.by_key(key).map(MarkerHandle::action)
    }

    /// Apply `style` to the marker carrying `id` if it differs from what is shown.
    pub fn restyle<M: MapProvider + ?Sized>(
        &mut self,
        map: &mut M,
        id: ListingId,
        style: MarkerStyle,
    ) -> bool {
        let Some(&idx) = self.by_listing.get(&id) else {
            return false;
        };
        let handle = &mut self.handles[idx];
        if handle.style == style {
            return false;
        }
        handle.style = style;
        map.style_marker(handle.key, style);
        true
    }

    pub fn handles(&self) -> &[MarkerHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use listing_map_shared::{LatLng, RawListing};

    use super::*;
    use crate::grouping::group;
    use crate::highlight::HighlightState;
    use crate::provider::HeadlessMap;

    fn listings(coords: &[(u64, f64, f64, f64)]) -> ListingSet {
        let raw = coords
            .iter()
            .map(|&(id, lat, lng, price)| RawListing {
                id: ListingId(id),
                lat: Some(lat),
                lng: Some(lng),
                price: Some(price),
                ..RawListing::default()
            })
            .collect();
        ListingSet::from_raw(raw).0
    }

    #[test]
    fn rebuild_labels_singles_by_price_and_clusters_by_count() {
        let set = listings(&[
            (1, 40.0, -74.0, 850_000.0),
            (2, 40.5, -74.5, 1.0),
            (3, 40.5, -74.5, 2.0),
        ]);
        let mut map = HeadlessMap::new(LatLng::new(40.0, -74.0), 12.0);
        let mut registry = MarkerRegistry::new();
        registry.rebuild(&mut map, group(set.iter()), &set);

        assert_eq!(registry.len(), 2);
        let single = registry.lookup(ListingId(1)).expect("single marker");
        let cluster = registry.lookup(ListingId(3)).expect("cluster marker");
        assert_eq!(
            map.marker(single.key).map(|m| m.spec.label.clone()),
            Some(MarkerLabel::Price("$850K".into()))
        );
        assert_eq!(
            map.marker(cluster.key).map(|m| m.spec.label.clone()),
            Some(MarkerLabel::Count(2))
        );
        assert_eq!(
            registry.action_for(cluster.key),
            Some(MarkerAction::ExpandCluster(vec![ListingId(2), ListingId(3)]))
        );
        assert_eq!(
            registry.action_for(single.key),
            Some(MarkerAction::TogglePopup(ListingId(1)))
        );
    }

    #[test]
    fn rebuild_detaches_old_handles_and_resets_styles() {
        let set = listings(&[(1, 40.0, -74.0, 1.0), (2, 41.0, -74.0, 1.0)]);
        let mut map = HeadlessMap::new(LatLng::new(40.0, -74.0), 12.0);
        let mut registry = MarkerRegistry::new();
        registry.rebuild(&mut map, group(set.iter()), &set);

        let old_key = registry.lookup(ListingId(1)).map(|h| h.key).expect("marker");
        let active = MarkerStyle {
            state: HighlightState::Active,
            z_index: 1_000,
        };
        assert!(registry.restyle(&mut map, ListingId(1), active));
        assert!(!registry.restyle(&mut map, ListingId(1), active));

        registry.rebuild(&mut map, group(set.iter()), &set);
        assert_eq!(map.detached_count(), 2);
        assert_eq!(map.marker_count(), 2);
        assert!(registry.action_for(old_key).is_none());
        let fresh = registry.lookup(ListingId(1)).expect("fresh marker");
        assert_ne!(fresh.key, old_key);
        assert_eq!(fresh.style, MarkerStyle::BASELINE);
    }

    #[test]
    fn restyle_of_unknown_listing_is_a_no_op() {
        let mut map = HeadlessMap::new(LatLng::new(0.0, 0.0), 3.0);
        let mut registry = MarkerRegistry::new();
        assert!(!registry.restyle(&mut map, ListingId(5), MarkerStyle::BASELINE));
    }
}
