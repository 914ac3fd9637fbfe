mod bid;
mod driver;
mod place;
mod rider;
mod trip;
mod vehicle;

pub use bid::{Bid, BidStatus};
pub use driver::{Driver, FeeStatus};
pub use place::{Coordinates, Place};
pub use rider::Rider;
pub use trip::{CancelledBy, Status, Trip};
pub use vehicle::{Vehicle, VehicleStatus};
