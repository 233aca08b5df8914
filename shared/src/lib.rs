pub mod card;
pub mod geo;
pub mod listing;

pub use card::{CardDescriptor, format_price, format_price_short};
pub use geo::{LatLng, ViewportBounds};
pub use listing::*;
