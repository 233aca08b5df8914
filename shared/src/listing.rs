use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// Stable listing identity. Also used as the DOM identity attribute on cards and markers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ListingId(pub u64);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
}

/// Listing as delivered by the bounding-box query. Any field may be missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    pub id: ListingId,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub bedrooms: Option<f64>,
    #[serde(default)]
    pub bathrooms: Option<f64>,
    #[serde(default)]
    pub living_area: Option<f64>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Why a raw listing was left out of a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingRejection {
    MissingCoordinates,
    InvalidCoordinates,
    MissingPrice,
}

/// A listing that has coordinates and a price and can be placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub position: LatLng,
    pub price: f64,
    pub bedrooms: Option<f64>,
    pub bathrooms: Option<f64>,
    pub living_area: Option<f64>,
    pub address: Address,
    pub photos: Vec<String>,
}

impl TryFrom<RawListing> for Listing {
    type Error = ListingRejection;

    fn try_from(raw: RawListing) -> Result<Self, Self::Error> {
        let (Some(lat), Some(lng)) = (raw.lat, raw.lng) else {
            return Err(ListingRejection::MissingCoordinates);
        };
        let position = LatLng::new(lat, lng);
        if !position.is_valid() {
            return Err(ListingRejection::InvalidCoordinates);
        }
        let price = match raw.price {
            Some(price) if price.is_finite() && price >= 0.0 => price,
            _ => return Err(ListingRejection::MissingPrice),
        };
        Ok(Self {
            id: raw.id,
            position,
            price,
            bedrooms: raw.bedrooms,
            bathrooms: raw.bathrooms,
            living_area: raw.living_area,
            address: raw.address,
            photos: raw.photos,
        })
    }
}

impl Listing {
    pub fn primary_photo(&self) -> Option<&str> {
        self.photos.first().map(String::as_str)
    }
}

/// Response body of the listings endpoint: either a bare array or wrapped in an object.
///
/// Records are kept as raw JSON so one bad record cannot fail the whole response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListingsPayload {
    Bare(Vec<serde_json::Value>),
    Wrapped { listings: Vec<serde_json::Value> },
}

impl ListingsPayload {
    /// Decode each record on its own. Records that do not fit `RawListing` are counted, not
    /// returned.
    pub fn decode(self) -> ListingBatch {
        let records = match self {
            Self::Bare(records) | Self::Wrapped { listings: records } => records,
        };
        let mut batch = ListingBatch::default();
        for record in records {
            match serde_json::from_value::<RawListing>(record) {
                Ok(raw) => batch.records.push(raw),
                Err(_) => batch.undecodable += 1,
            }
        }
        batch
    }
}

/// Records of one listings response, plus how many could not be decoded at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingBatch {
    pub records: Vec<RawListing>,
    pub undecodable: usize,
}

impl From<Vec<RawListing>> for ListingBatch {
    fn from(records: Vec<RawListing>) -> Self {
        Self {
            records,
            undecodable: 0,
        }
    }
}

/// The authoritative listing set of one fetch cycle, in response order.
#[derive(Debug, Clone, Default)]
pub struct ListingSet {
    listings: Vec<Listing>,
    index: HashMap<ListingId, usize>,
}

impl ListingSet {
    /// Validate raw records, keeping response order. Returns the set and the number of records
    /// skipped as malformed. A repeated id keeps its first occurrence.
    pub fn from_raw(raw: Vec<RawListing>) -> (Self, usize) {
        let mut set = Self::default();
        let mut skipped = 0usize;
        for record in raw {
            match Listing::try_from(record) {
                Ok(listing) if !set.index.contains_key(&listing.id) => {
                    set.index.insert(listing.id, set.listings.len());
                    set.listings.push(listing);
                }
                _ => skipped += 1,
            }
        }
        (set, skipped)
    }

    pub fn get(&self, id: ListingId) -> Option<&Listing> {
        self.index.get(&id).map(|&idx| &self.listings[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listing> {
        self.listings.iter()
    }

    pub fn as_slice(&self) -> &[Listing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
