use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Viewport bounding box as reported by the map provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl ViewportBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Whether the box crosses the antimeridian (east edge numerically west of the west edge).
    pub fn crosses_antimeridian(&self) -> bool {
        self.east < self.west
    }

    pub fn contains(&self, point: LatLng) -> bool {
        if point.lat < self.south || point.lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            point.lng >= self.west || point.lng <= self.east
        } else {
            point.lng >= self.west && point.lng <= self.east
        }
    }

    pub fn center(&self) -> LatLng {
        let lat = (self.north + self.south) / 2.0;
        let mut lng = if self.crosses_antimeridian() {
            (self.west + self.east + 360.0) / 2.0
        } else {
            (self.west + self.east) / 2.0
        };
        if lng > 180.0 {
            lng -= 360.0;
        }
        LatLng::new(lat, lng)
    }

    /// Query-string form understood by the listings endpoint.
    pub fn to_query(&self) -> String {
        format!(
            "north={}&south={}&east={}&west={}",
            self.north, self.south, self.east, self.west
        )
    }
}
