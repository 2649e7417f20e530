//! Mock team store for unit testing.
//!
//! Provides a configurable mock that records all calls and serves
//! pre-populated team state, with per-operation error injection.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::store::TeamStore;
use crate::types::{ActiveTicket, HolidayEntry, HolidayRegion, Member};

/// A recorded call to the mock store.
#[derive(Debug, Clone)]
pub enum MockCall {
    ListMembers(String),
    ListActiveTickets(Vec<String>),
    ListActiveLeaves(Vec<String>, NaiveDate),
    ListHolidays(NaiveDate, Vec<HolidayRegion>),
    CountRecentAssignments(Vec<String>, u32),
}

/// Mock implementation of `TeamStore` for testing.
#[derive(Default)]
pub struct MockTeamStore {
    members: Mutex<Vec<Member>>,
    active_tickets: Mutex<HashMap<String, Vec<ActiveTicket>>>,
    on_leave: Mutex<HashSet<String>>,
    holidays: Mutex<Vec<HolidayEntry>>,
    recent_assignments: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<MockCall>>,
    members_error: Mutex<Option<StoreError>>,
    tickets_error: Mutex<Option<StoreError>>,
    leaves_error: Mutex<Option<StoreError>>,
    holidays_error: Mutex<Option<StoreError>>,
    recent_error: Mutex<Option<StoreError>>,
}

impl MockTeamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a member. Members are served to every `list_members`
    /// call regardless of the role filter unless their role differs.
    pub fn with_member(self, member: Member) -> Self {
        lock(&self.members).push(member);
        self
    }

    /// Pre-populate active tickets for a member id.
    pub fn with_active_tickets(self, member_id: &str, tickets: Vec<ActiveTicket>) -> Self {
        lock(&self.active_tickets).insert(member_id.to_owned(), tickets);
        self
    }

    /// Mark a member as on leave for any queried date.
    pub fn with_leave(self, member_id: &str) -> Self {
        lock(&self.on_leave).insert(member_id.to_owned());
        self
    }

    /// Pre-populate a holiday entry.
    pub fn with_holiday(self, entry: HolidayEntry) -> Self {
        lock(&self.holidays).push(entry);
        self
    }

    /// Pre-populate a recent-assignment count for a member id.
    pub fn with_recent_assignments(self, member_id: &str, count: u32) -> Self {
        lock(&self.recent_assignments).insert(member_id.to_owned(), count);
        self
    }

    /// Configure `list_members` to fail once.
    pub fn with_members_error(self, err: StoreError) -> Self {
        *lock(&self.members_error) = Some(err);
        self
    }

    /// Configure `list_active_tickets` to fail once.
    pub fn with_tickets_error(self, err: StoreError) -> Self {
        *lock(&self.tickets_error) = Some(err);
        self
    }

    /// Configure `list_active_leaves` to fail once.
    pub fn with_leaves_error(self, err: StoreError) -> Self {
        *lock(&self.leaves_error) = Some(err);
        self
    }

    /// Configure `list_holidays` to fail once.
    pub fn with_holidays_error(self, err: StoreError) -> Self {
        *lock(&self.holidays_error) = Some(err);
        self
    }

    /// Configure `count_recent_assignments` to fail once.
    pub fn with_recent_error(self, err: StoreError) -> Self {
        *lock(&self.recent_error) = Some(err);
        self
    }

    /// Return all recorded calls.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Return the number of recorded calls.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }

    fn take_error(slot: &Mutex<Option<StoreError>>) -> Option<StoreError> {
        lock(slot).take()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Helper to create a test member with sensible defaults.
pub fn test_member(id: &str, email: &str, timezone: &str) -> Member {
    Member {
        id: id.to_owned(),
        name: email
            .split('@')
            .next()
            .unwrap_or(email)
            .to_owned(),
        email: email.to_owned(),
        timezone: timezone.to_owned(),
        role: "USER".to_owned(),
        skills: Vec::new(),
    }
}

#[async_trait]
impl TeamStore for MockTeamStore {
    async fn list_members(&self, role: &str) -> Result<Vec<Member>, StoreError> {
        self.record(MockCall::ListMembers(role.to_owned()));
        if let Some(err) = Self::take_error(&self.members_error) {
            return Err(err);
        }
        Ok(lock(&self.members)
            .iter()
            .filter(|member| member.role == role)
            .cloned()
            .collect())
    }

    async fn list_active_tickets(
        &self,
        member_ids: &[String],
    ) -> Result<HashMap<String, Vec<ActiveTicket>>, StoreError> {
        self.record(MockCall::ListActiveTickets(member_ids.to_vec()));
        if let Some(err) = Self::take_error(&self.tickets_error) {
            return Err(err);
        }
        let tickets = lock(&self.active_tickets);
        Ok(member_ids
            .iter()
            .filter_map(|id| tickets.get(id).map(|list| (id.clone(), list.clone())))
            .collect())
    }

    async fn list_active_leaves(
        &self,
        member_ids: &[String],
        today: NaiveDate,
    ) -> Result<HashSet<String>, StoreError> {
        self.record(MockCall::ListActiveLeaves(member_ids.to_vec(), today));
        if let Some(err) = Self::take_error(&self.leaves_error) {
            return Err(err);
        }
        let on_leave = lock(&self.on_leave);
        Ok(member_ids
            .iter()
            .filter(|id| on_leave.contains(*id))
            .cloned()
            .collect())
    }

    async fn list_holidays(
        &self,
        date: NaiveDate,
        regions: &[HolidayRegion],
    ) -> Result<Vec<HolidayEntry>, StoreError> {
        self.record(MockCall::ListHolidays(date, regions.to_vec()));
        if let Some(err) = Self::take_error(&self.holidays_error) {
            return Err(err);
        }
        Ok(lock(&self.holidays)
            .iter()
            .filter(|entry| entry.date == date && regions.contains(&entry.region))
            .cloned()
            .collect())
    }

    async fn count_recent_assignments(
        &self,
        member_ids: &[String],
        window_days: u32,
    ) -> Result<HashMap<String, u32>, StoreError> {
        self.record(MockCall::CountRecentAssignments(
            member_ids.to_vec(),
            window_days,
        ));
        if let Some(err) = Self::take_error(&self.recent_error) {
            return Err(err);
        }
        let recent = lock(&self.recent_assignments);
        Ok(member_ids
            .iter()
            .filter_map(|id| recent.get(id).map(|count| (id.clone(), *count)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{test_member, MockCall, MockTeamStore};
    use crate::error::StoreError;
    use crate::store::TeamStore;
    use crate::types::{HolidayEntry, HolidayRegion};
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        match NaiveDate::from_ymd_opt(y, m, d) {
            Some(value) => value,
            None => panic!("invalid test date {y}-{m}-{d}"),
        }
    }

    #[tokio::test]
    async fn serves_populated_state_and_records_calls() {
        let store = MockTeamStore::new()
            .with_member(test_member("m-1", "ravi@example.com", "Asia/Kolkata"))
            .with_leave("m-1")
            .with_recent_assignments("m-1", 4)
            .with_holiday(HolidayEntry {
                date: day(2026, 3, 11),
                region: HolidayRegion::Global,
            });

        let members = match store.list_members("USER").await {
            Ok(members) => members,
            Err(err) => panic!("list_members failed: {err}"),
        };
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].email, "ravi@example.com");

        let ids = vec!["m-1".to_owned()];
        let leaves = match store.list_active_leaves(&ids, day(2026, 3, 11)).await {
            Ok(leaves) => leaves,
            Err(err) => panic!("list_active_leaves failed: {err}"),
        };
        assert!(leaves.contains("m-1"));

        let holidays = match store
            .list_holidays(day(2026, 3, 11), &[HolidayRegion::Global])
            .await
        {
            Ok(holidays) => holidays,
            Err(err) => panic!("list_holidays failed: {err}"),
        };
        assert_eq!(holidays.len(), 1);

        // Holidays on other dates or regions are filtered out.
        let other = match store
            .list_holidays(day(2026, 3, 12), &[HolidayRegion::Global])
            .await
        {
            Ok(holidays) => holidays,
            Err(err) => panic!("list_holidays failed: {err}"),
        };
        assert!(other.is_empty());

        assert_eq!(store.call_count(), 4);
        assert!(matches!(&store.calls()[0], MockCall::ListMembers(role) if role == "USER"));
    }

    #[tokio::test]
    async fn role_filter_excludes_other_roles() {
        let mut admin = test_member("m-2", "admin@example.com", "America/New_York");
        admin.role = "ADMIN".to_owned();
        let store = MockTeamStore::new()
            .with_member(test_member("m-1", "ravi@example.com", "Asia/Kolkata"))
            .with_member(admin);

        let members = match store.list_members("USER").await {
            Ok(members) => members,
            Err(err) => panic!("list_members failed: {err}"),
        };
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, "m-1");
    }

    #[tokio::test]
    async fn injected_error_fires_once() {
        let store = MockTeamStore::new().with_members_error(StoreError::Unavailable {
            message: "down".to_owned(),
        });

        let first = store.list_members("USER").await;
        assert!(matches!(first, Err(StoreError::Unavailable { .. })));

        let second = store.list_members("USER").await;
        assert!(second.is_ok());
    }
}
