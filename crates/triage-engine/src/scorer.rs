//! Component scoring: similarity, skill, availability, workload, and
//! timezone per candidate, plus the priority-weighted composite.

use chrono::{DateTime, Timelike, Utc};

use triage_core::config::EngineConfig;
use triage_core::types::{
    ActiveTicket, Candidate, HolidayRegion, Member, MemberRegion, SimilarTicket, Ticket,
    TicketPriority, TicketStatus,
};

use crate::snapshot::TeamSnapshot;

/// Saturation point of the logarithmic expertise curve: five solved
/// similar tickets reach factor 1.0.
const EXPERTISE_LOG_BASE: f64 = 6.0;

/// Default skill score when no match signal is available. Never 0.0:
/// a zero placeholder would trip the skills-gap rule on every decision.
const SKILL_SCORE_FLOOR: f64 = 0.2;

/// Aggregate workload picture for one member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkloadBreakdown {
    pub score: f64,
    pub weighted_load: f64,
    pub is_overloaded: bool,
}

/// Similarity evidence for one member: how many of the similar tickets
/// they resolved, and the score derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityEvidence {
    pub score: f64,
    pub solved_count: usize,
}

/// Logarithmic expertise scaling: `ln(n + 1) / ln 6`, clamped to 1.0.
/// One match gives 0.387, three 0.774, five saturates at 1.0. Diminishing
/// returns keep frequent assignees from monopolizing their patterns.
pub fn expertise_factor(solved_count: usize) -> f64 {
    if solved_count == 0 {
        return 0.0;
    }
    let factor = ((solved_count as f64) + 1.0).ln() / EXPERTISE_LOG_BASE.ln();
    factor.min(1.0)
}

/// Similarity score for a member: expertise factor times the mean
/// similarity of the entries they resolved, clamped to [0, 1]. Order of
/// the input list does not matter.
pub fn similarity_evidence(member_email: &str, similar: &[SimilarTicket]) -> SimilarityEvidence {
    let matching: Vec<&SimilarTicket> = similar
        .iter()
        .filter(|entry| entry.assignee_email == member_email)
        .collect();
    if matching.is_empty() {
        return SimilarityEvidence {
            score: 0.0,
            solved_count: 0,
        };
    }

    let solved_count = matching.len();
    let avg_similarity =
        matching.iter().map(|entry| entry.similarity).sum::<f64>() / (solved_count as f64);
    let score = (expertise_factor(solved_count) * avg_similarity).clamp(0.0, 1.0);
    SimilarityEvidence { score, solved_count }
}

/// Skill match over the ticket category and the member's skill tags.
///
/// Tokenizes the category, counts tokens present in the member's tags, and
/// returns the matched fraction with a 0.2 floor. No category or no tags
/// yields the floor.
pub fn skill_score(category: &str, skills: &[String]) -> f64 {
    let tokens: Vec<String> = category
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    if tokens.is_empty() || skills.is_empty() {
        return SKILL_SCORE_FLOOR;
    }

    let tags: Vec<String> = skills
        .iter()
        .map(|skill| skill.trim().to_ascii_lowercase())
        .filter(|skill| !skill.is_empty())
        .collect();
    if tags.is_empty() {
        return SKILL_SCORE_FLOOR;
    }

    let matched = tokens
        .iter()
        .filter(|token| tags.iter().any(|tag| tag == *token))
        .count();
    let fraction = (matched as f64) / (tokens.len() as f64);
    fraction.max(SKILL_SCORE_FLOOR)
}

/// Binary availability gate: 1.0 iff the member is not on leave and no
/// holiday (regional or global) blocks them today. No graded values.
pub fn availability_score(on_leave: bool, regional_holiday: bool, global_holiday: bool) -> f64 {
    if on_leave || regional_holiday || global_holiday {
        0.0
    } else {
        1.0
    }
}

fn priority_weight(priority: TicketPriority) -> f64 {
    match priority {
        TicketPriority::Critical => 3.0,
        TicketPriority::High => 2.0,
        TicketPriority::Medium => 1.0,
        TicketPriority::Low => 0.5,
    }
}

fn age_multiplier(age_days: i64) -> f64 {
    if age_days > 7 {
        1.5
    } else if age_days > 3 {
        1.2
    } else {
        1.0
    }
}

fn status_weight(status: TicketStatus) -> f64 {
    match status {
        TicketStatus::InProgress => 1.0,
        TicketStatus::Open => 0.5,
        TicketStatus::Blocked => 0.3,
        TicketStatus::Pending => 0.5,
    }
}

/// Contextual workload: each active ticket contributes
/// `priority × age × status`; the sum normalizes against capacity.
/// Old in-progress criticals weigh far more than fresh blocked lows.
pub fn workload(
    active: &[ActiveTicket],
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> WorkloadBreakdown {
    let mut weighted_load = 0.0;
    for ticket in active {
        let age_days = (now - ticket.created_at).num_days();
        weighted_load +=
            priority_weight(ticket.priority) * age_multiplier(age_days) * status_weight(ticket.status);
    }

    let score = (1.0 - weighted_load / config.workload_capacity).max(0.0);
    WorkloadBreakdown {
        score,
        weighted_load,
        is_overloaded: weighted_load > config.overload_threshold,
    }
}

/// UTC hour with minute fraction for the captured decision time.
pub fn utc_hour_fraction(now: DateTime<Utc>) -> f64 {
    (now.hour() as f64) + (now.minute() as f64) / 60.0
}

/// The region preferred at the captured decision time: India inside the
/// IST window, US otherwise.
pub fn preferred_region(now: DateTime<Utc>, config: &EngineConfig) -> MemberRegion {
    let hour = utc_hour_fraction(now);
    let (start, end) = config.ist_window_utc;
    if (start..end).contains(&hour) {
        MemberRegion::India
    } else {
        MemberRegion::Us
    }
}

/// Timezone score: 1.0 for the preferred region, otherwise a non-zero
/// mismatch floor with one of two overrides. Critical tickets lift the
/// floor (urgency beats working hours), and so does proven expertise on
/// the pattern. Hard exclusion would be too rigid.
pub fn timezone_score(
    region: MemberRegion,
    preferred: MemberRegion,
    priority: TicketPriority,
    solved_similar_count: usize,
    config: &EngineConfig,
) -> f64 {
    if region == preferred {
        return 1.0;
    }
    if priority == TicketPriority::Critical {
        return config.tz_boost_critical;
    }
    if solved_similar_count >= config.expert_solved_count {
        return config.tz_boost_expert;
    }
    config.tz_mismatch_floor
}

/// Priority-weighted composite of the five component scores.
pub fn composite_score(candidate: &Candidate, priority: TicketPriority, config: &EngineConfig) -> f64 {
    let row = config.weights.row(priority);
    candidate.similarity_score * row.similarity
        + candidate.skill_score * row.skill
        + candidate.availability_score * row.availability
        + candidate.workload_score * row.workload
        + candidate.timezone_score * row.timezone
}

/// Score every member of the snapshot against the ticket. Produces one
/// candidate per member; ordering is the snapshot's member order (the
/// ranker imposes the total order).
pub fn score_candidates(
    config: &EngineConfig,
    ticket: &Ticket,
    similar: &[SimilarTicket],
    snapshot: &TeamSnapshot,
) -> Vec<Candidate> {
    let preferred = preferred_region(snapshot.now_utc, config);
    let global_holiday = snapshot.has_global_holiday();

    snapshot
        .members
        .iter()
        .map(|member| score_member(config, ticket, similar, snapshot, member, preferred, global_holiday))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn score_member(
    config: &EngineConfig,
    ticket: &Ticket,
    similar: &[SimilarTicket],
    snapshot: &TeamSnapshot,
    member: &Member,
    preferred: MemberRegion,
    global_holiday: bool,
) -> Candidate {
    let region = member.region();
    let evidence = similarity_evidence(&member.email, similar);

    let on_leave = snapshot.on_leave.contains(&member.id);
    let regional_holiday = snapshot.holidays.iter().any(|h| match region {
        MemberRegion::India => h.region == HolidayRegion::India,
        MemberRegion::Us => h.region == HolidayRegion::Us,
        MemberRegion::Unknown => false,
    });

    let mut notes = Vec::new();
    if on_leave {
        notes.push("on leave today".to_owned());
    }
    if regional_holiday {
        notes.push(format!("regional holiday ({region})"));
    }
    if global_holiday {
        notes.push("global holiday".to_owned());
    }

    let active = snapshot.active_tickets_for(&member.id);
    let load = workload(active, snapshot.now_utc, config);
    if load.is_overloaded {
        notes.push(format!("overloaded (weighted load {:.1})", load.weighted_load));
    }

    let mut candidate = Candidate {
        member_id: member.id.clone(),
        email: member.email.clone(),
        name: member.name.clone(),
        timezone: member.timezone.clone(),
        region,
        similarity_score: evidence.score,
        skill_score: skill_score(&ticket.category, &member.skills),
        availability_score: availability_score(on_leave, regional_holiday, global_holiday),
        workload_score: load.score,
        timezone_score: timezone_score(
            region,
            preferred,
            ticket.priority,
            evidence.solved_count,
            config,
        ),
        composite_score: 0.0,
        solved_similar_count: evidence.solved_count,
        active_tickets_count: active.len(),
        recent_assignments_count: snapshot.recent_assignments_for(&member.id),
        weighted_load: load.weighted_load,
        is_overloaded: load.is_overloaded,
        notes,
    };
    candidate.composite_score = composite_score(&candidate, ticket.priority, config);
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use triage_core::types::HolidayRegion;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        match Utc.with_ymd_and_hms(2026, 3, 11, hour, minute, 0) {
            chrono::LocalResult::Single(value) => value,
            _ => panic!("invalid test timestamp {hour}:{minute}"),
        }
    }

    fn similar(email: &str, score: f64) -> SimilarTicket {
        SimilarTicket {
            assignee_email: email.to_owned(),
            similarity: score,
            resolved_at: None,
        }
    }

    fn active(priority: TicketPriority, status: TicketStatus, age_days: i64) -> ActiveTicket {
        ActiveTicket {
            priority,
            status,
            created_at: at(4, 0) - Duration::days(age_days),
        }
    }

    #[test]
    fn expertise_factor_follows_log_curve() {
        let cases = [(0, 0.0), (1, 0.387), (3, 0.774), (5, 1.0), (10, 1.0)];
        for (solved, expected) in cases {
            let actual = expertise_factor(solved);
            assert!(
                (actual - expected).abs() < 1e-3,
                "expertise_factor({solved}) = {actual}, expected {expected}"
            );
        }
    }

    #[test]
    fn similarity_combines_expertise_and_average() {
        let entries = vec![
            similar("ravi@example.com", 0.92),
            similar("ravi@example.com", 0.88),
            similar("priya@example.com", 0.65),
        ];

        let ravi = similarity_evidence("ravi@example.com", &entries);
        assert_eq!(ravi.solved_count, 2);
        let expected = expertise_factor(2) * 0.90;
        assert!((ravi.score - expected).abs() < 1e-9);

        let priya = similarity_evidence("priya@example.com", &entries);
        assert_eq!(priya.solved_count, 1);
        assert!((priya.score - expertise_factor(1) * 0.65).abs() < 1e-9);

        let nobody = similarity_evidence("sam@example.com", &entries);
        assert_eq!(nobody.solved_count, 0);
        assert_eq!(nobody.score, 0.0);
    }

    #[test]
    fn similarity_is_order_independent() {
        let mut entries = vec![
            similar("ravi@example.com", 0.92),
            similar("priya@example.com", 0.65),
            similar("ravi@example.com", 0.88),
        ];
        let forward = similarity_evidence("ravi@example.com", &entries);
        entries.reverse();
        let reversed = similarity_evidence("ravi@example.com", &entries);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn skill_score_never_hits_zero() {
        assert_eq!(skill_score("", &[]), 0.2);
        assert_eq!(skill_score("payments", &[]), 0.2);
        assert_eq!(skill_score("", &["payments".to_owned()]), 0.2);

        let skills = vec!["payments".to_owned(), "sql".to_owned()];
        assert_eq!(skill_score("payments", &skills), 1.0);
        assert_eq!(skill_score("payments gateway", &skills), 0.5);
        assert_eq!(skill_score("networking", &skills), 0.2);
    }

    #[test]
    fn availability_is_strictly_binary() {
        assert_eq!(availability_score(false, false, false), 1.0);
        for (leave, regional, global) in [
            (true, false, false),
            (false, true, false),
            (false, false, true),
            (true, true, true),
        ] {
            assert_eq!(availability_score(leave, regional, global), 0.0);
        }
    }

    #[test]
    fn workload_weights_priority_age_and_status() {
        let config = config();
        // Critical in-progress, 10 days old: 3.0 * 1.5 * 1.0 = 4.5
        // High open, 5 days old: 2.0 * 1.2 * 0.5 = 1.2
        // Low blocked, fresh: 0.5 * 1.0 * 0.3 = 0.15
        let tickets = vec![
            active(TicketPriority::Critical, TicketStatus::InProgress, 10),
            active(TicketPriority::High, TicketStatus::Open, 5),
            active(TicketPriority::Low, TicketStatus::Blocked, 1),
        ];
        let breakdown = workload(&tickets, at(4, 0), &config);
        assert!((breakdown.weighted_load - 5.85).abs() < 1e-9);
        assert!((breakdown.score - (1.0 - 5.85 / 30.0)).abs() < 1e-9);
        assert!(!breakdown.is_overloaded);
    }

    #[test]
    fn workload_score_floors_at_zero_and_flags_overload() {
        let config = config();
        // 8 critical in-progress tickets, all stale: 8 * 4.5 = 36 > capacity.
        let tickets: Vec<ActiveTicket> = (0..8)
            .map(|_| active(TicketPriority::Critical, TicketStatus::InProgress, 10))
            .collect();
        let breakdown = workload(&tickets, at(4, 0), &config);
        assert_eq!(breakdown.score, 0.0);
        assert!(breakdown.is_overloaded);

        // Exactly at the threshold is not overloaded; just above is.
        let at_threshold: Vec<ActiveTicket> = (0..10)
            .map(|_| active(TicketPriority::High, TicketStatus::InProgress, 1))
            .collect();
        let breakdown = workload(&at_threshold, at(4, 0), &config);
        assert!((breakdown.weighted_load - 20.0).abs() < 1e-9);
        assert!(!breakdown.is_overloaded);
    }

    #[test]
    fn empty_workload_scores_one() {
        let breakdown = workload(&[], at(4, 0), &config());
        assert_eq!(breakdown.score, 1.0);
        assert_eq!(breakdown.weighted_load, 0.0);
        assert!(!breakdown.is_overloaded);
    }

    #[test]
    fn ist_window_boundaries_are_half_open() {
        let config = config();
        assert_eq!(preferred_region(at(2, 30), &config), MemberRegion::India);
        assert_eq!(preferred_region(at(12, 29), &config), MemberRegion::India);
        assert_eq!(preferred_region(at(12, 30), &config), MemberRegion::Us);
        assert_eq!(preferred_region(at(2, 29), &config), MemberRegion::Us);
        assert_eq!(preferred_region(at(18, 0), &config), MemberRegion::Us);
    }

    #[test]
    fn timezone_mismatch_floor_and_overrides() {
        let config = config();
        let preferred = MemberRegion::India;

        assert_eq!(
            timezone_score(MemberRegion::India, preferred, TicketPriority::High, 0, &config),
            1.0
        );
        assert_eq!(
            timezone_score(MemberRegion::Us, preferred, TicketPriority::High, 0, &config),
            0.2
        );
        // Critical override wins over the expert override.
        assert_eq!(
            timezone_score(MemberRegion::Us, preferred, TicketPriority::Critical, 5, &config),
            0.5
        );
        assert_eq!(
            timezone_score(MemberRegion::Us, preferred, TicketPriority::Medium, 3, &config),
            0.6
        );
        assert_eq!(
            timezone_score(MemberRegion::Unknown, preferred, TicketPriority::Low, 2, &config),
            0.2
        );
    }

    #[test]
    fn composite_uses_the_priority_row() {
        let config = config();
        let candidate = Candidate {
            member_id: "m-1".to_owned(),
            email: "ravi@example.com".to_owned(),
            name: "Ravi".to_owned(),
            timezone: "Asia/Kolkata".to_owned(),
            region: MemberRegion::India,
            similarity_score: 0.8,
            skill_score: 0.2,
            availability_score: 1.0,
            workload_score: 1.0,
            timezone_score: 1.0,
            composite_score: 0.0,
            solved_similar_count: 2,
            active_tickets_count: 0,
            recent_assignments_count: 0,
            weighted_load: 0.0,
            is_overloaded: false,
            notes: Vec::new(),
        };

        let high = composite_score(&candidate, TicketPriority::High, &config);
        let expected = 0.8 * 0.25 + 0.2 * 0.25 + 1.0 * 0.20 + 1.0 * 0.15 + 1.0 * 0.15;
        assert!((high - expected).abs() < 1e-9);

        let low = composite_score(&candidate, TicketPriority::Low, &config);
        let expected = 0.8 * 0.15 + 0.2 * 0.15 + 1.0 * 0.15 + 1.0 * 0.40 + 1.0 * 0.15;
        assert!((low - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn score_candidates_covers_every_member() {
        use triage_core::mock::{test_member, MockTeamStore};

        let store = MockTeamStore::new()
            .with_member(test_member("m-1", "ravi@example.com", "Asia/Kolkata"))
            .with_member(test_member("m-2", "john@example.com", "America/Chicago"))
            .with_holiday(triage_core::types::HolidayEntry {
                date: at(4, 0).date_naive(),
                region: HolidayRegion::Us,
            });

        let snapshot = match crate::snapshot::load_snapshot(&store, "USER", 7, at(4, 0)).await {
            Ok(snapshot) => snapshot,
            Err(err) => panic!("load_snapshot failed: {err}"),
        };

        let ticket = Ticket {
            id: "T-1".to_owned(),
            title: "Payment webhook retries".to_owned(),
            description: String::new(),
            priority: TicketPriority::High,
            category: "payments".to_owned(),
        };
        let entries = vec![similar("ravi@example.com", 0.9)];

        let candidates = score_candidates(&config(), &ticket, &entries, &snapshot);
        assert_eq!(candidates.len(), 2);

        let ravi = candidates
            .iter()
            .find(|c| c.email == "ravi@example.com")
            .unwrap_or_else(|| panic!("ravi missing from candidates"));
        assert_eq!(ravi.availability_score, 1.0);
        assert_eq!(ravi.timezone_score, 1.0);
        assert_eq!(ravi.solved_similar_count, 1);
        assert!(ravi.composite_score > 0.0);

        // The US holiday zeroes John's availability and leaves a note.
        let john = candidates
            .iter()
            .find(|c| c.email == "john@example.com")
            .unwrap_or_else(|| panic!("john missing from candidates"));
        assert_eq!(john.availability_score, 0.0);
        assert!(john.notes.iter().any(|note| note.contains("regional holiday")));
    }
}
