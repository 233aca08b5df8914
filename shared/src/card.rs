use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::listing::{Address, Listing, ListingId};

/// Render-layer description of one listing card, used by the sidebar and by popups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDescriptor {
    pub listing_id: ListingId,
    pub price: String,
    pub beds: Option<String>,
    pub baths: Option<String>,
    pub area: Option<String>,
    pub address: String,
    pub photo: Option<String>,
}

impl CardDescriptor {
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            listing_id: listing.id,
            price: format_price(listing.price),
            beds: listing.bedrooms.map(|b| format!("{} bd", trim_number(b))),
            baths: listing.bathrooms.map(|b| format!("{} ba", trim_number(b))),
            area: listing
                .living_area
                .filter(|a| *a > 0.0)
                .map(|a| format!("{} sq ft", group_thousands(a.round() as u64))),
            address: format_address(&listing.address),
            photo: listing.primary_photo().map(str::to_string),
        }
    }
}

/// Full price with thousands separators: `$1,250,000`.
pub fn format_price(price: f64) -> String {
    format!("${}", group_thousands(price.round().max(0.0) as u64))
}

/// Abbreviated price for marker labels: `$950`, `$850K`, `$1.2M`.
pub fn format_price_short(price: f64) -> String {
    let price = price.max(0.0);
    let mut out = String::with_capacity(8);
    out.push('$');
    let thousands = (price / 1_000.0).round();
    if price.round() < 1_000.0 {
        let _ = write!(out, "{}", price.round() as u64);
    } else if thousands < 1_000.0 {
        let _ = write!(out, "{}K", thousands as u64);
    } else {
        let millions = (price / 100_000.0).round() / 10.0;
        let _ = write!(out, "{}M", trim_number(millions));
    }
    out
}

pub fn format_address(address: &Address) -> String {
    let mut out = String::new();
    out.push_str(address.street.trim());
    if let Some(unit) = address.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(unit);
    }
    let city = address.city.trim();
    if !city.is_empty() {
        if !out.is_empty() {
            out.push_str(", ");
        }
        out.push_str(city);
    }
    let region = [address.state.trim(), address.postal_code.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !region.is_empty() {
        if !out.is_empty() {
            out.push_str(", ");
        }
        out.push_str(&region);
    }
    out
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LatLng;

    fn listing() -> Listing {
        Listing {
            id: ListingId(42),
            position: LatLng::new(40.0, -74.0),
            price: 1_250_000.0,
            bedrooms: Some(3.0),
            bathrooms: Some(2.5),
            living_area: Some(1_850.4),
            address: Address {
                street: "12 Elm St".into(),
                unit: Some("Apt 4".into()),
                city: "Springfield".into(),
                state: "MA".into(),
                postal_code: "01101".into(),
            },
            photos: vec!["a.jpg".into(), "b.jpg".into()],
        }
    }

    #[test]
    fn card_formats_every_field() {
        let card = CardDescriptor::from_listing(&listing());
        assert_eq!(card.listing_id, ListingId(42));
        assert_eq!(card.price, "$1,250,000");
        assert_eq!(card.beds.as_deref(), Some("3 bd"));
        assert_eq!(card.baths.as_deref(), Some("2.5 ba"));
        assert_eq!(card.area.as_deref(), Some("1,850 sq ft"));
        assert_eq!(card.address, "12 Elm St Apt 4, Springfield, MA 01101");
        assert_eq!(card.photo.as_deref(), Some("a.jpg"));
    }

    #[test]
    fn fractional_rooms_print_as_given() {
        let card = CardDescriptor::from_listing(&Listing {
            bedrooms: Some(1.5),
            bathrooms: Some(2.1),
            ..listing()
        });
        assert_eq!(card.beds.as_deref(), Some("1.5 bd"));
        assert_eq!(card.baths.as_deref(), Some("2.1 ba"));
    }

    #[test]
    fn card_omits_missing_details() {
        let card = CardDescriptor::from_listing(&Listing {
            bedrooms: None,
            bathrooms: None,
            living_area: Some(0.0),
            address: Address::default(),
            photos: Vec::new(),
            ..listing()
        });
        assert!(card.beds.is_none());
        assert!(card.baths.is_none());
        assert!(card.area.is_none());
        assert_eq!(card.address, "");
        assert!(card.photo.is_none());
    }

    #[test]
    fn short_price_abbreviates_by_magnitude() {
        assert_eq!(format_price_short(950.0), "$950");
        assert_eq!(format_price_short(849_700.0), "$850K");
        assert_eq!(format_price_short(999_800.0), "$1M");
        assert_eq!(format_price_short(1_200_000.0), "$1.2M");
        assert_eq!(format_price_short(2_000_000.0), "$2M");
    }

    #[test]
    fn short_price_rounds_before_picking_a_unit() {
        assert_eq!(format_price_short(999.4), "$999");
        assert_eq!(format_price_short(999.6), "$1K");
        assert_eq!(format_price_short(999_499.0), "$999K");
    }

    #[test]
    fn full_price_groups_thousands() {
        assert_eq!(format_price(0.0), "$0");
        assert_eq!(format_price(999.0), "$999");
        assert_eq!(format_price(1_000.0), "$1,000");
        assert_eq!(format_price(12_345_678.0), "$12,345,678");
    }
}
