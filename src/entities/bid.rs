use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::geo;

/// A driver's offer to fulfil a pending trip at a stated amount.
///
/// Bids only change state as a side effect of trip assignment: the winning
/// bid becomes `accepted` and every other pending bid on the trip becomes
/// `rejected`, in the same transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub driver_id: Uuid,
    pub status: BidStatus,
    pub amount: f64,
    pub message: Option<String>,
    pub eta_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl Bid {
    pub fn new(
        trip_id: Uuid,
        driver_id: Uuid,
        amount: f64,
        message: Option<String>,
        eta_minutes: Option<i32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            driver_id,
            status: BidStatus::Pending,
            amount: geo::round_to_cents(amount),
            message,
            eta_minutes,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        match self.status {
            BidStatus::Pending => true,
            _ => false,
        }
    }

    pub fn accept(&mut self) -> Result<(), Error> {
        match self.status {
            BidStatus::Pending => {
                self.status = BidStatus::Accepted;
                Ok(())
            }
            _ => Err(Error::bad_request("Bid is no longer available")),
        }
    }

    pub fn reject(&mut self) {
        if let BidStatus::Pending = self.status {
            self.status = BidStatus::Rejected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_bid(amount: f64) -> Bid {
        Bid::new(Uuid::new_v4(), Uuid::new_v4(), amount, None, Some(5))
    }

    #[test]
    fn amounts_are_normalized_to_two_decimals() {
        let bid = pending_bid(6.333333);

        assert_eq!(bid.amount, 6.33);
        assert_eq!(bid.status, BidStatus::Pending);
    }

    #[test]
    fn only_a_pending_bid_can_be_accepted() {
        let mut bid = pending_bid(6.00);
        bid.accept().unwrap();
        assert_eq!(bid.status, BidStatus::Accepted);

        let err = bid.accept().unwrap_err();
        assert!(err.is_bad_request());

        let mut bid = pending_bid(8.00);
        bid.reject();
        assert!(bid.accept().unwrap_err().is_bad_request());
    }

    #[test]
    fn reject_never_downgrades_an_accepted_bid() {
        let mut bid = pending_bid(6.00);
        bid.accept().unwrap();

        bid.reject();
        assert_eq!(bid.status, BidStatus::Accepted);
    }
}
