//! Team store trait: the read-only view of team state the engine consumes.
//!
//! Implementations can run against a SQLite database or be mocked for
//! testing. Each operation is independently retryable by the implementation;
//! the engine only observes success-with-data or failure.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::types::{ActiveTicket, HolidayEntry, HolidayRegion, Member};

/// Read-only access to the team state backing one assignment decision.
///
/// All operations are async so snapshot loading can fan them out
/// concurrently. The handle is shared across concurrent decision calls and
/// must be safe for concurrent use.
#[async_trait]
pub trait TeamStore: Send + Sync {
    /// Members carrying the given role tag.
    async fn list_members(&self, role: &str) -> Result<Vec<Member>, StoreError>;

    /// Active tickets (status Open/InProgress/Pending) per member, keyed by
    /// member id. Members with no active tickets may be absent from the map.
    async fn list_active_tickets(
        &self,
        member_ids: &[String],
    ) -> Result<HashMap<String, Vec<ActiveTicket>>, StoreError>;

    /// Ids of members with a leave record overlapping `today`.
    async fn list_active_leaves(
        &self,
        member_ids: &[String],
        today: NaiveDate,
    ) -> Result<HashSet<String>, StoreError>;

    /// Holiday entries for `date` restricted to the given regions.
    async fn list_holidays(
        &self,
        date: NaiveDate,
        regions: &[HolidayRegion],
    ) -> Result<Vec<HolidayEntry>, StoreError>;

    /// Tickets assigned to each member within the trailing window, keyed by
    /// member id. Members with no recent assignments may be absent.
    async fn count_recent_assignments(
        &self,
        member_ids: &[String],
        window_days: u32,
    ) -> Result<HashMap<String, u32>, StoreError>;
}
