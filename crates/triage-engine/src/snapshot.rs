//! Snapshot loader: fetches a consistent, point-in-time view of team state
//! in a bounded number of store calls.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use triage_core::error::EngineError;
use triage_core::store::TeamStore;
use triage_core::types::{ActiveTicket, HolidayEntry, HolidayRegion, Member, MemberRegion};

/// The regions holidays are fetched for. GLOBAL entries apply to everyone.
const HOLIDAY_REGIONS: [HolidayRegion; 3] = [
    HolidayRegion::India,
    HolidayRegion::Us,
    HolidayRegion::Global,
];

/// Point-in-time view of team state used by a single decision call.
/// Read-only after loading; the call never mutates it.
#[derive(Debug, Clone)]
pub struct TeamSnapshot {
    pub members: Vec<Member>,
    pub active_tickets: HashMap<String, Vec<ActiveTicket>>,
    pub on_leave: HashSet<String>,
    pub holidays: Vec<HolidayEntry>,
    pub recent_assignments: HashMap<String, u32>,
    pub today: NaiveDate,
    pub now_utc: DateTime<Utc>,
}

impl TeamSnapshot {
    /// Whether any holiday entry blocks the given region today.
    pub fn holiday_blocks(&self, region: MemberRegion) -> bool {
        self.holidays.iter().any(|entry| entry.region.blocks(region))
    }

    /// Whether a GLOBAL holiday entry is present today.
    pub fn has_global_holiday(&self) -> bool {
        self.holidays
            .iter()
            .any(|entry| entry.region == HolidayRegion::Global)
    }

    /// Active tickets for a member; absent members have none.
    pub fn active_tickets_for(&self, member_id: &str) -> &[ActiveTicket] {
        self.active_tickets
            .get(member_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Recent-assignment count for a member; absent counts default to 0.
    pub fn recent_assignments_for(&self, member_id: &str) -> u32 {
        self.recent_assignments
            .get(member_id)
            .copied()
            .unwrap_or(0)
    }
}

/// Load a snapshot: one members query, then the four per-member queries
/// fanned out concurrently and joined before scoring begins.
///
/// The single `now` captured at call entry is the only wall-clock value the
/// whole decision sees; `today` is derived from it.
pub async fn load_snapshot(
    store: &dyn TeamStore,
    role_filter: &str,
    recent_window_days: u32,
    now: DateTime<Utc>,
) -> Result<TeamSnapshot, EngineError> {
    let today = now.date_naive();
    let members = store.list_members(role_filter).await?;
    debug!(member_count = members.len(), %today, "loaded team members");

    if members.is_empty() {
        return Ok(TeamSnapshot {
            members,
            active_tickets: HashMap::new(),
            on_leave: HashSet::new(),
            holidays: Vec::new(),
            recent_assignments: HashMap::new(),
            today,
            now_utc: now,
        });
    }

    let member_ids: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
    let (active_tickets, on_leave, holidays, recent_assignments) = tokio::try_join!(
        store.list_active_tickets(&member_ids),
        store.list_active_leaves(&member_ids, today),
        store.list_holidays(today, &HOLIDAY_REGIONS),
        store.count_recent_assignments(&member_ids, recent_window_days),
    )?;

    let snapshot = TeamSnapshot {
        members,
        active_tickets,
        on_leave,
        holidays,
        recent_assignments,
        today,
        now_utc: now,
    };
    verify_consistency(&snapshot)?;
    Ok(snapshot)
}

/// Every active-ticket, leave, and recent-assignment row must reference a
/// member present in the team set.
fn verify_consistency(snapshot: &TeamSnapshot) -> Result<(), EngineError> {
    let known: HashSet<&str> = snapshot.members.iter().map(|m| m.id.as_str()).collect();

    for member_id in snapshot.active_tickets.keys() {
        if !known.contains(member_id.as_str()) {
            return Err(EngineError::InvariantViolation {
                message: format!("active tickets reference unknown member {member_id}"),
            });
        }
    }
    for member_id in &snapshot.on_leave {
        if !known.contains(member_id.as_str()) {
            return Err(EngineError::InvariantViolation {
                message: format!("leave record references unknown member {member_id}"),
            });
        }
    }
    for member_id in snapshot.recent_assignments.keys() {
        if !known.contains(member_id.as_str()) {
            return Err(EngineError::InvariantViolation {
                message: format!("recent assignments reference unknown member {member_id}"),
            });
        }
    }
    Ok(())
}
