//! Transport-agnostic domain types for ticket assignment.
//!
//! These types provide a clean domain model for the decision pipeline,
//! decoupled from any particular ticket tracker or storage backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Ticket priority, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl TicketPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Parse a priority from its string representation. Accepts the
    /// canonical lowercase form and the tracker-facing capitalized form.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow status of an active ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Blocked,
    Pending,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Pending => "pending",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "blocked" => Some(Self::Blocked),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }

    /// Statuses that count toward a member's active workload.
    pub fn counts_as_active(self) -> bool {
        matches!(self, Self::Open | Self::InProgress | Self::Pending)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ticket under assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub category: String,
}

impl Ticket {
    /// Build a ticket from tracker-facing strings. Unknown priorities fail
    /// here rather than silently falling through to a default.
    pub fn from_parts(
        id: &str,
        title: &str,
        description: &str,
        priority: &str,
        category: &str,
    ) -> Result<Self, EngineError> {
        let priority = TicketPriority::from_str(priority).ok_or_else(|| {
            EngineError::InvalidInput {
                message: format!("ticket {id}: unknown priority {priority:?}"),
            }
        })?;
        let ticket = Self {
            id: id.to_owned(),
            title: title.to_owned(),
            description: description.to_owned(),
            priority,
            category: category.to_owned(),
        };
        ticket.validate()?;
        Ok(ticket)
    }

    /// Reject tickets missing required fields before any store work happens.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.trim().is_empty() {
            return Err(EngineError::InvalidInput {
                message: "ticket id is required".to_owned(),
            });
        }
        if self.title.trim().is_empty() {
            return Err(EngineError::InvalidInput {
                message: format!("ticket {}: title is required", self.id),
            });
        }
        Ok(())
    }
}

/// A historical ticket pre-identified as semantically close to the input.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarTicket {
    pub assignee_email: String,
    pub similarity: f64,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Validate a batch of similar-ticket entries: similarity must be a finite
/// value in [0, 1].
pub fn validate_similar_tickets(entries: &[SimilarTicket]) -> Result<(), EngineError> {
    for (index, entry) in entries.iter().enumerate() {
        if !entry.similarity.is_finite() || !(0.0..=1.0).contains(&entry.similarity) {
            return Err(EngineError::InvalidInput {
                message: format!(
                    "similar ticket at index {index}: similarity {} out of range [0, 1]",
                    entry.similarity
                ),
            });
        }
    }
    Ok(())
}

/// Coarse geographic region derived from a member's IANA timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRegion {
    India,
    Us,
    Unknown,
}

impl MemberRegion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::India => "IN",
            Self::Us => "US",
            Self::Unknown => "unknown",
        }
    }

    /// Derive the region from a timezone prefix. Anything outside the two
    /// known prefixes maps to `Unknown`, which regional holidays never match.
    pub fn from_timezone(timezone: &str) -> Self {
        if timezone.starts_with("Asia/") {
            Self::India
        } else if timezone.starts_with("America/") {
            Self::Us
        } else {
            Self::Unknown
        }
    }
}

impl std::fmt::Display for MemberRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Region tag carried by a holiday entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayRegion {
    India,
    Us,
    Global,
}

impl HolidayRegion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::India => "IN",
            Self::Us => "US",
            Self::Global => "GLOBAL",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Some(Self::India),
            "US" => Some(Self::Us),
            "GLOBAL" => Some(Self::Global),
            _ => None,
        }
    }

    /// Whether a holiday with this tag blocks a member in the given region.
    /// GLOBAL blocks everyone, including members with an unknown region.
    pub fn blocks(self, region: MemberRegion) -> bool {
        match self {
            Self::Global => true,
            Self::India => region == MemberRegion::India,
            Self::Us => region == MemberRegion::Us,
        }
    }
}

impl std::fmt::Display for HolidayRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A team member eligible for assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub email: String,
    pub timezone: String,
    pub role: String,
    pub skills: Vec<String>,
}

impl Member {
    pub fn region(&self) -> MemberRegion {
        MemberRegion::from_timezone(&self.timezone)
    }
}

/// An open ticket currently assigned to a member, as seen by the workload
/// calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTicket {
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

/// An approved leave window, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRecord {
    pub member_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl LeaveRecord {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// A holiday calendar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayEntry {
    pub date: NaiveDate,
    pub region: HolidayRegion,
}

/// A member under evaluation for one decision call, with all scoring
/// factors. Lives only for the duration of that call.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub member_id: String,
    pub email: String,
    pub name: String,
    pub timezone: String,
    pub region: MemberRegion,

    // Component scores, each in [0, 1].
    pub similarity_score: f64,
    pub skill_score: f64,
    pub availability_score: f64,
    pub workload_score: f64,
    pub timezone_score: f64,

    /// Priority-weighted sum of the five components.
    pub composite_score: f64,

    // Supporting data.
    pub solved_similar_count: usize,
    pub active_tickets_count: usize,
    pub recent_assignments_count: u32,
    pub weighted_load: f64,
    pub is_overloaded: bool,

    /// Human-readable availability/workload annotations.
    pub notes: Vec<String>,
}

impl Candidate {
    /// Compressed view of the candidate for the decision record.
    pub fn summary(&self) -> CandidateSummary {
        CandidateSummary {
            email: self.email.clone(),
            name: self.name.clone(),
            composite: self.composite_score,
            similarity: self.similarity_score,
            skill: self.skill_score,
            availability: self.availability_score,
            workload: self.workload_score,
            timezone: self.timezone_score,
        }
    }
}

/// Serializable per-candidate score breakdown carried on the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub email: String,
    pub name: String,
    pub composite: f64,
    pub similarity: f64,
    pub skill: f64,
    pub availability: f64,
    pub workload: f64,
    pub timezone: f64,
}

/// How the decision routes the ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    Normal,
    HumanReview,
}

impl AssignmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::HumanReview => "human_review",
        }
    }
}

impl std::fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a human-review trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TriggerSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for TriggerSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a decision was routed to a human, and what should happen next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewTrigger {
    pub reason: String,
    pub severity: TriggerSeverity,
    pub action: String,
    pub timeout: Option<String>,
    pub message: String,
}

impl ReviewTrigger {
    pub fn no_similar_pattern() -> Self {
        Self {
            reason: "no_similar_pattern".to_owned(),
            severity: TriggerSeverity::High,
            action: "team_consultation_email".to_owned(),
            timeout: Some("1h".to_owned()),
            message: "No similar pattern found, team input needed".to_owned(),
        }
    }

    pub fn no_available_members() -> Self {
        Self {
            reason: "no_available_members".to_owned(),
            severity: TriggerSeverity::Critical,
            action: "immediate_manager_escalation".to_owned(),
            timeout: None,
            message: "No team member is available to take this ticket".to_owned(),
        }
    }

    pub fn team_at_capacity() -> Self {
        Self {
            reason: "team_at_capacity".to_owned(),
            severity: TriggerSeverity::Critical,
            action: "immediate_manager_escalation".to_owned(),
            timeout: None,
            message: "Team at capacity, requires immediate attention".to_owned(),
        }
    }

    pub fn low_confidence() -> Self {
        Self {
            reason: "low_confidence_assignment".to_owned(),
            severity: TriggerSeverity::Medium,
            action: "team_lead_review".to_owned(),
            timeout: Some("15min".to_owned()),
            message: "Low confidence assignment, team lead review requested".to_owned(),
        }
    }
}

/// The decision record returned by one assignment call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub ticket_id: String,
    pub assignment_type: AssignmentType,
    pub primary_assignee: Option<String>,
    pub confidence: f64,
    pub applied_rules: Vec<String>,
    pub reasoning: Vec<String>,
    pub review_triggers: Vec<ReviewTrigger>,
    pub top_candidates: Vec<CandidateSummary>,
    pub decided_at: DateTime<Utc>,
}

impl Decision {
    pub fn is_human_review(&self) -> bool {
        self.assignment_type == AssignmentType::HumanReview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_round_trips_through_strings() {
        for priority in [
            TicketPriority::Critical,
            TicketPriority::High,
            TicketPriority::Medium,
            TicketPriority::Low,
        ] {
            assert_eq!(TicketPriority::from_str(priority.as_str()), Some(priority));
        }
        assert_eq!(TicketPriority::from_str("Critical"), Some(TicketPriority::Critical));
        assert_eq!(TicketPriority::from_str("  HIGH "), Some(TicketPriority::High));
        assert_eq!(TicketPriority::from_str("urgent"), None);
        assert_eq!(TicketPriority::from_str(""), None);
    }

    #[test]
    fn status_active_set_excludes_blocked() {
        assert!(TicketStatus::Open.counts_as_active());
        assert!(TicketStatus::InProgress.counts_as_active());
        assert!(TicketStatus::Pending.counts_as_active());
        assert!(!TicketStatus::Blocked.counts_as_active());
    }

    #[test]
    fn region_derivation_follows_timezone_prefix() {
        assert_eq!(
            MemberRegion::from_timezone("Asia/Kolkata"),
            MemberRegion::India
        );
        assert_eq!(
            MemberRegion::from_timezone("America/New_York"),
            MemberRegion::Us
        );
        assert_eq!(
            MemberRegion::from_timezone("Europe/Oslo"),
            MemberRegion::Unknown
        );
        assert_eq!(MemberRegion::from_timezone(""), MemberRegion::Unknown);
    }

    #[test]
    fn global_holidays_block_every_region() {
        for region in [MemberRegion::India, MemberRegion::Us, MemberRegion::Unknown] {
            assert!(HolidayRegion::Global.blocks(region));
        }
        assert!(HolidayRegion::India.blocks(MemberRegion::India));
        assert!(!HolidayRegion::India.blocks(MemberRegion::Us));
        assert!(!HolidayRegion::India.blocks(MemberRegion::Unknown));
        assert!(!HolidayRegion::Us.blocks(MemberRegion::Unknown));
    }

    #[test]
    fn leave_windows_are_inclusive() {
        let leave = LeaveRecord {
            member_id: "m-1".to_owned(),
            start_date: date(2026, 3, 10),
            end_date: date(2026, 3, 12),
        };
        assert!(!leave.is_active_on(date(2026, 3, 9)));
        assert!(leave.is_active_on(date(2026, 3, 10)));
        assert!(leave.is_active_on(date(2026, 3, 11)));
        assert!(leave.is_active_on(date(2026, 3, 12)));
        assert!(!leave.is_active_on(date(2026, 3, 13)));
    }

    #[test]
    fn from_parts_rejects_unknown_priorities() {
        let ok = Ticket::from_parts("T-1", "Checkout failing", "", "High", "payments");
        match ok {
            Ok(ticket) => assert_eq!(ticket.priority, TicketPriority::High),
            Err(err) => panic!("from_parts failed: {err}"),
        }

        let unknown = Ticket::from_parts("T-1", "Checkout failing", "", "urgent", "payments");
        let err = match unknown {
            Ok(ticket) => panic!("expected rejection, got {ticket:?}"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("unknown priority"));
    }

    #[test]
    fn ticket_validation_requires_id_and_title() {
        let mut ticket = Ticket {
            id: "T-1".to_owned(),
            title: "Checkout failing".to_owned(),
            description: String::new(),
            priority: TicketPriority::High,
            category: "payments".to_owned(),
        };
        assert!(ticket.validate().is_ok());

        ticket.id = "  ".to_owned();
        assert!(ticket.validate().is_err());

        ticket.id = "T-1".to_owned();
        ticket.title = String::new();
        assert!(ticket.validate().is_err());
    }

    #[test]
    fn similar_ticket_validation_rejects_out_of_range_scores() {
        let ok = vec![similar("a@example.com", 0.0), similar("b@example.com", 1.0)];
        assert!(validate_similar_tickets(&ok).is_ok());

        let too_high = vec![similar("a@example.com", 1.2)];
        assert!(validate_similar_tickets(&too_high).is_err());

        let negative = vec![similar("a@example.com", -0.1)];
        assert!(validate_similar_tickets(&negative).is_err());

        let nan = vec![similar("a@example.com", f64::NAN)];
        assert!(validate_similar_tickets(&nan).is_err());
    }

    #[test]
    fn decision_round_trips_through_json() {
        let decision = Decision {
            ticket_id: "T-1".to_owned(),
            assignment_type: AssignmentType::Normal,
            primary_assignee: Some("ravi@example.com".to_owned()),
            confidence: 0.8,
            applied_rules: vec!["overload_prevention".to_owned()],
            reasoning: vec!["Assigned to Ravi".to_owned()],
            review_triggers: Vec::new(),
            top_candidates: vec![CandidateSummary {
                email: "ravi@example.com".to_owned(),
                name: "Ravi".to_owned(),
                composite: 0.68,
                similarity: 0.55,
                skill: 0.2,
                availability: 1.0,
                workload: 1.0,
                timezone: 1.0,
            }],
            decided_at: DateTime::parse_from_rfc3339("2026-03-11T04:00:00Z")
                .map(|ts| ts.with_timezone(&Utc))
                .unwrap_or_else(|err| panic!("parse test timestamp: {err}")),
        };

        let json = match serde_json::to_string(&decision) {
            Ok(json) => json,
            Err(err) => panic!("serialize decision: {err}"),
        };
        assert!(json.contains("\"normal\""));

        let back: Decision = match serde_json::from_str(&json) {
            Ok(back) => back,
            Err(err) => panic!("deserialize decision: {err}"),
        };
        assert_eq!(back, decision);
    }

    #[test]
    fn review_trigger_presets_carry_operator_messages() {
        for trigger in [
            ReviewTrigger::no_similar_pattern(),
            ReviewTrigger::no_available_members(),
            ReviewTrigger::team_at_capacity(),
            ReviewTrigger::low_confidence(),
        ] {
            assert!(!trigger.reason.is_empty());
            assert!(!trigger.action.is_empty());
            assert!(!trigger.message.is_empty());
        }
        assert_eq!(
            ReviewTrigger::team_at_capacity().severity,
            TriggerSeverity::Critical
        );
        assert_eq!(
            ReviewTrigger::no_similar_pattern().timeout.as_deref(),
            Some("1h")
        );
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        match NaiveDate::from_ymd_opt(y, m, d) {
            Some(value) => value,
            None => panic!("invalid test date {y}-{m}-{d}"),
        }
    }

    fn similar(email: &str, similarity: f64) -> SimilarTicket {
        SimilarTicket {
            assignee_email: email.to_owned(),
            similarity,
            resolved_at: None,
        }
    }
}
