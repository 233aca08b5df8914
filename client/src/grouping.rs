use std::collections::HashMap;

use listing_map_shared::{LatLng, Listing, ListingId};

use crate::config::COORD_PRECISION;

/// Coordinates rounded to `COORD_PRECISION` decimals, as integers so equal keys compare exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey {
    pub lat: i64,
    pub lng: i64,
}

impl CoordKey {
    pub fn of(position: LatLng) -> Self {
        let scale = 10f64.powi(COORD_PRECISION);
        Self {
            lat: (position.lat * scale).round() as i64,
            lng: (position.lng * scale).round() as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    Single(ListingId),
    /// Two or more listings, in input order.
    Cluster(Vec<ListingId>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGroup {
    pub key: CoordKey,
    /// Position of the first member.
    pub position: LatLng,
    pub kind: GroupKind,
}

impl MarkerGroup {
    pub fn members(&self) -> &[ListingId] {
        match &self.kind {
            GroupKind::Single(id) => std::slice::from_ref(id),
            GroupKind::Cluster(ids) => ids,
        }
    }

    pub fn len(&self) -> usize {
        self.members().len()
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self.kind, GroupKind::Cluster(_))
    }
}

/// Partition listings by rounded coordinate. Groups are ordered by the first appearance of their
/// key and members keep input order, so the result is deterministic for a given input.
pub fn group<'a>(listings: impl IntoIterator<Item = &'a Listing>) -> Vec<MarkerGroup> {
    let mut slots: HashMap<CoordKey, usize> = HashMap::new();
    let mut pending: Vec<(CoordKey, LatLng, Vec<ListingId>)> = Vec::new();

    for listing in listings {
        let key = CoordKey::of(listing.position);
        match slots.get(&key) {
            Some(&idx) => pending[idx].2.push(listing.id),
            None => {
                slots.insert(key, pending.len());
                pending.push((key, listing.position, vec![listing.id]));
            }
        }
    }

    pending
        .into_iter()
        .map(|(key, position, mut ids)| {
            let kind = if ids.len() == 1 {
                GroupKind::Single(ids.remove(0))
            } else {
                GroupKind::Cluster(ids)
            };
            MarkerGroup {
                key,
                position,
                kind,
            }
        })
        .collect()
}
