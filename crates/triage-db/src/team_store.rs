//! Team store queries: batched reads backing one assignment decision,
//! plus the write helpers tests and seeders use.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, params_from_iter};
use uuid::Uuid;

use triage_core::error::StoreError;
use triage_core::store::TeamStore;
use triage_core::types::{
    ActiveTicket, HolidayEntry, HolidayRegion, LeaveRecord, Member, TicketPriority, TicketStatus,
};

use crate::{now_rfc3339, Db, DbError};

/// A ticket row as stored. Status is free text at the storage layer so
/// resolved/closed history stays queryable; the active-ticket query only
/// surfaces the statuses the engine scores.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRow {
    pub id: String,
    pub title: String,
    pub priority: TicketPriority,
    pub status: String,
    pub category: String,
    pub assignee_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}

pub struct TeamRepository<'a> {
    db: &'a Db,
}

impl<'a> TeamRepository<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    pub fn create_member(&self, member: &Member) -> Result<(), DbError> {
        if member.email.trim().is_empty() {
            return Err(DbError::Validation("member email is required".to_owned()));
        }
        if member.role.trim().is_empty() {
            return Err(DbError::Validation("member role is required".to_owned()));
        }
        let id = if member.id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            member.id.clone()
        };
        let skills_json = serde_json::to_string(&member.skills)
            .map_err(|err| DbError::Validation(format!("serialize skills: {err}")))?;
        let now = now_rfc3339();
        self.db.conn().execute(
            "INSERT INTO members (id, name, email, timezone, role, skills_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                id,
                member.name,
                member.email,
                member.timezone,
                member.role,
                skills_json,
                now
            ],
        )?;
        Ok(())
    }

    pub fn create_ticket(&self, ticket: &TicketRow) -> Result<(), DbError> {
        if ticket.id.trim().is_empty() {
            return Err(DbError::Validation("ticket id is required".to_owned()));
        }
        if ticket.status.trim().is_empty() {
            return Err(DbError::Validation("ticket status is required".to_owned()));
        }
        self.db.conn().execute(
            "INSERT INTO tickets (id, title, priority, status, category, assignee_id, created_at, assigned_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                ticket.id,
                ticket.title,
                ticket.priority.as_str(),
                ticket.status,
                ticket.category,
                ticket.assignee_id,
                ticket.created_at.to_rfc3339(),
                ticket.assigned_at.map(|ts| ts.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn create_leave(&self, leave: &LeaveRecord) -> Result<(), DbError> {
        if leave.member_id.trim().is_empty() {
            return Err(DbError::Validation("leave member_id is required".to_owned()));
        }
        if leave.start_date > leave.end_date {
            return Err(DbError::Validation(format!(
                "leave window inverted: {} > {}",
                leave.start_date, leave.end_date
            )));
        }
        self.db.conn().execute(
            "INSERT INTO leaves (id, member_id, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
            params![
                Uuid::new_v4().to_string(),
                leave.member_id,
                leave.start_date.to_string(),
                leave.end_date.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn create_holiday(&self, entry: &HolidayEntry) -> Result<(), DbError> {
        self.db.conn().execute(
            "INSERT INTO holidays (id, date, region, name) VALUES (?1, ?2, ?3, '')",
            params![
                Uuid::new_v4().to_string(),
                entry.date.to_string(),
                entry.region.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn list_members(&self, role: &str) -> Result<Vec<Member>, DbError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, name, email, timezone, role, skills_json
             FROM members WHERE role = ?1 ORDER BY email",
        )?;
        let rows = stmt.query_map([role], scan_member)?;
        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    pub fn list_active_tickets(
        &self,
        member_ids: &[String],
    ) -> Result<HashMap<String, Vec<ActiveTicket>>, DbError> {
        if member_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = in_placeholders(member_ids.len());
        let query = format!(
            "SELECT assignee_id, priority, status, created_at
             FROM tickets
             WHERE assignee_id IN ({placeholders})
               AND status IN ('open', 'in_progress', 'pending')"
        );
        let mut stmt = self.db.conn().prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(member_ids.iter()), |row| {
            let assignee: String = row.get(0)?;
            let priority: String = row.get(1)?;
            let status: String = row.get(2)?;
            let created_at: String = row.get(3)?;
            Ok((assignee, priority, status, created_at))
        })?;

        let mut by_member: HashMap<String, Vec<ActiveTicket>> = HashMap::new();
        for row in rows {
            let (assignee, priority, status, created_at) = row?;
            let priority = TicketPriority::from_str(&priority).ok_or_else(|| {
                DbError::Validation(format!("ticket row carries unknown priority: {priority}"))
            })?;
            let status = TicketStatus::from_str(&status).ok_or_else(|| {
                DbError::Validation(format!("ticket row carries unknown status: {status}"))
            })?;
            let created_at = parse_timestamp(&created_at)?;
            by_member.entry(assignee).or_default().push(ActiveTicket {
                priority,
                status,
                created_at,
            });
        }
        Ok(by_member)
    }

    pub fn list_active_leaves(
        &self,
        member_ids: &[String],
        today: NaiveDate,
    ) -> Result<HashSet<String>, DbError> {
        if member_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let placeholders = in_placeholders(member_ids.len());
        let query = format!(
            "SELECT DISTINCT member_id FROM leaves
             WHERE member_id IN ({placeholders})
               AND start_date <= ?{} AND end_date >= ?{}",
            member_ids.len() + 1,
            member_ids.len() + 2,
        );
        let mut stmt = self.db.conn().prepare(&query)?;
        let today_text = today.to_string();
        let mut args: Vec<&dyn rusqlite::ToSql> = member_ids
            .iter()
            .map(|id| id as &dyn rusqlite::ToSql)
            .collect();
        args.push(&today_text);
        args.push(&today_text);
        let rows = stmt.query_map(args.as_slice(), |row| row.get::<_, String>(0))?;

        let mut on_leave = HashSet::new();
        for row in rows {
            on_leave.insert(row?);
        }
        Ok(on_leave)
    }

    pub fn list_holidays(
        &self,
        date: NaiveDate,
        regions: &[HolidayRegion],
    ) -> Result<Vec<HolidayEntry>, DbError> {
        if regions.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = in_placeholders(regions.len());
        let query = format!(
            "SELECT date, region FROM holidays
             WHERE date = ?{} AND region IN ({placeholders})",
            regions.len() + 1,
        );
        let mut stmt = self.db.conn().prepare(&query)?;
        let date_text = date.to_string();
        let region_texts: Vec<&str> = regions.iter().map(|r| r.as_str()).collect();
        let mut args: Vec<&dyn rusqlite::ToSql> = region_texts
            .iter()
            .map(|r| r as &dyn rusqlite::ToSql)
            .collect();
        args.push(&date_text);
        let rows = stmt.query_map(args.as_slice(), |row| {
            let date: String = row.get(0)?;
            let region: String = row.get(1)?;
            Ok((date, region))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (date_text, region_text) = row?;
            let date = parse_date(&date_text)?;
            let region = HolidayRegion::from_str(&region_text).ok_or_else(|| {
                DbError::Validation(format!("holiday row carries unknown region: {region_text}"))
            })?;
            entries.push(HolidayEntry { date, region });
        }
        Ok(entries)
    }

    pub fn count_recent_assignments(
        &self,
        member_ids: &[String],
        window_days: u32,
        now: DateTime<Utc>,
    ) -> Result<HashMap<String, u32>, DbError> {
        if member_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let cutoff = (now - Duration::days(window_days as i64)).to_rfc3339();
        let placeholders = in_placeholders(member_ids.len());
        let query = format!(
            "SELECT assignee_id, COUNT(*) FROM tickets
             WHERE assignee_id IN ({placeholders})
               AND assigned_at IS NOT NULL
               AND assigned_at >= ?{}
             GROUP BY assignee_id",
            member_ids.len() + 1,
        );
        let mut stmt = self.db.conn().prepare(&query)?;
        let mut args: Vec<&dyn rusqlite::ToSql> = member_ids
            .iter()
            .map(|id| id as &dyn rusqlite::ToSql)
            .collect();
        args.push(&cutoff);
        let rows = stmt.query_map(args.as_slice(), |row| {
            let assignee: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((assignee, count))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (assignee, count) = row?;
            counts.insert(assignee, count.max(0) as u32);
        }
        Ok(counts)
    }
}

fn in_placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn scan_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<Member> {
    let skills_json: String = row.get(5)?;
    // Missing or malformed skills degrade to the empty set.
    let skills = serde_json::from_str::<Vec<String>>(&skills_json).unwrap_or_default();
    Ok(Member {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        timezone: row.get(3)?,
        role: row.get(4)?,
        skills,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| DbError::Validation(format!("invalid stored timestamp {value:?}: {err}")))
}

fn parse_date(value: &str) -> Result<NaiveDate, DbError> {
    value
        .parse::<NaiveDate>()
        .map_err(|err| DbError::Validation(format!("invalid stored date {value:?}: {err}")))
}

/// `TeamStore` over a SQLite database. Queries are short and local, so
/// they run inline on the async executor behind a mutex.
pub struct SqliteTeamStore {
    db: Mutex<Db>,
}

impl SqliteTeamStore {
    pub fn new(db: Db) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn with_repo<T>(
        &self,
        op: impl FnOnce(&TeamRepository<'_>) -> Result<T, DbError>,
    ) -> Result<T, StoreError> {
        let db = match self.db.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        op(&TeamRepository::new(&db)).map_err(store_error)
    }
}

fn store_error(err: DbError) -> StoreError {
    match err {
        DbError::Open(inner) => StoreError::Unavailable {
            message: inner.to_string(),
        },
        other => StoreError::Query {
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl TeamStore for SqliteTeamStore {
    async fn list_members(&self, role: &str) -> Result<Vec<Member>, StoreError> {
        self.with_repo(|repo| repo.list_members(role))
    }

    async fn list_active_tickets(
        &self,
        member_ids: &[String],
    ) -> Result<HashMap<String, Vec<ActiveTicket>>, StoreError> {
        self.with_repo(|repo| repo.list_active_tickets(member_ids))
    }

    async fn list_active_leaves(
        &self,
        member_ids: &[String],
        today: NaiveDate,
    ) -> Result<HashSet<String>, StoreError> {
        self.with_repo(|repo| repo.list_active_leaves(member_ids, today))
    }

    async fn list_holidays(
        &self,
        date: NaiveDate,
        regions: &[HolidayRegion],
    ) -> Result<Vec<HolidayEntry>, StoreError> {
        self.with_repo(|repo| repo.list_holidays(date, regions))
    }

    async fn count_recent_assignments(
        &self,
        member_ids: &[String],
        window_days: u32,
    ) -> Result<HashMap<String, u32>, StoreError> {
        self.with_repo(|repo| repo.count_recent_assignments(member_ids, window_days, Utc::now()))
    }
}
