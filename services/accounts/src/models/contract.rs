//! Contract model
//!
//! Contracts are owned elsewhere; accounts only read their employment window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Employment contract attached to an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date_debut: DateTime<Utc>,
    /// Absent for open-ended contracts
    pub date_fin: Option<DateTime<Utc>>,
}

impl Contract {
    /// A contract is active once started and until its end date, inclusive.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.date_debut <= now && self.date_fin.is_none_or(|fin| fin >= now)
    }
}
