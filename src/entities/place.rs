use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A trip endpoint: resolved coordinates plus a human-readable address.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Place {
    pub coordinates: Coordinates,
    pub address: String,
}

impl Place {
    pub fn new(coordinates: Coordinates, address: String) -> Self {
        Self {
            coordinates,
            address,
        }
    }
}
