use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub rating: f64,
}

impl Rider {
    pub fn new(user_id: Uuid, name: String) -> Self {
        Self {
            id: user_id,
            name,
            rating: 5.0,
        }
    }
}
