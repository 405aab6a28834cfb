use crate::domain::card::OwnerId;
use serde::{Deserialize, Serialize};

/// A card owner, referenced by id for ownership checks.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct User {
    pub id: OwnerId,
}

impl User {
    pub fn new(id: OwnerId) -> Self {
        Self { id }
    }
}
