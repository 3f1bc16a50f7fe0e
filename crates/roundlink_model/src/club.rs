//! Club reference data.
//!
//! Clubs and club types are one-way, replace-on-receipt reference data
//! pushed from the primary device; they live outside the round
//! replication path.

use crate::id::{ClubId, ClubTypeId};
use serde::{Deserialize, Serialize};

/// A club in the golfer's bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
    /// Stable identifier.
    pub id: ClubId,
    /// Display name, e.g. "7 Iron".
    pub name: String,
    /// The club's type.
    pub club_type_id: ClubTypeId,
}

/// A category of club (driver, iron, wedge, putter, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubType {
    /// Stable identifier.
    pub id: ClubTypeId,
    /// Display name.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction() {
        let ty = ClubType {
            id: ClubTypeId::new(),
            name: "Iron".into(),
        };
        let club = Club {
            id: ClubId::new(),
            name: "7 Iron".into(),
            club_type_id: ty.id,
        };
        assert_eq!(club.club_type_id, ty.id);
    }
}
