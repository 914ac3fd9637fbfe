use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A driver profile. Eligibility to take work requires an active
/// subscription (`fee_status == paid`) and at least one approved vehicle.
#[derive(Clone, Debug, Serialize, Deserialize, PolarClass)]
pub struct Driver {
    #[polar(attribute)]
    pub id: Uuid,
    pub name: String,
    pub rating: f64,
    pub completed_trips: i64,
    pub fee_status: FeeStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeStatus {
    Paid,
    Due,
}

impl Driver {
    pub fn new(user_id: Uuid, name: String) -> Self {
        Self {
            id: user_id,
            name,
            rating: 5.0,
            completed_trips: 0,
            fee_status: FeeStatus::Due,
        }
    }

    pub fn has_active_subscription(&self) -> bool {
        match self.fee_status {
            FeeStatus::Paid => true,
            FeeStatus::Due => false,
        }
    }

    pub fn set_fee_status(&mut self, fee_status: FeeStatus) {
        self.fee_status = fee_status;
    }

    pub fn record_completed_trip(&mut self) {
        self.completed_trips += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_drivers_are_ineligible_until_fees_are_paid() {
        let mut driver = Driver::new(Uuid::new_v4(), "Ada".into());
        assert!(!driver.has_active_subscription());

        driver.set_fee_status(FeeStatus::Paid);
        assert!(driver.has_active_subscription());
    }

    #[test]
    fn completed_trips_accumulate() {
        let mut driver = Driver::new(Uuid::new_v4(), "Ada".into());
        driver.record_completed_trip();
        driver.record_completed_trip();

        assert_eq!(driver.completed_trips, 2);
    }
}
