use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub status: VehicleStatus,
    pub make: String,
    pub model: String,
    pub plate: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Pending,
    Approved,
    Rejected,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl Vehicle {
    pub fn new(driver_id: Uuid, make: String, model: String, plate: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver_id,
            status: VehicleStatus::Pending,
            make,
            model,
            plate,
            created_at: Utc::now(),
        }
    }

    pub fn is_approved(&self) -> bool {
        match self.status {
            VehicleStatus::Approved => true,
            _ => false,
        }
    }

    pub fn approve(&mut self) -> Result<(), Error> {
        match self.status {
            VehicleStatus::Pending => {
                self.status = VehicleStatus::Approved;
                Ok(())
            }
            _ => Err(Error::bad_request("Vehicle cannot be approved")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_is_a_one_way_transition() {
        let mut vehicle = Vehicle::new(Uuid::new_v4(), "Toyota".into(), "Prius".into(), "AB-123".into());
        assert!(!vehicle.is_approved());

        vehicle.approve().unwrap();
        assert!(vehicle.is_approved());

        assert!(vehicle.approve().unwrap_err().is_bad_request());
    }
}
