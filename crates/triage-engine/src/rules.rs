//! Business-rule pipeline over the ranked candidate list.
//!
//! Rules run in a fixed order. Each rule inspects the current top pick and
//! the full ordered list; it may replace the top pick, annotate the
//! decision, or short-circuit to human review. Annotations accumulate so
//! the final decision reflects every rule that fired, in order.

use tracing::debug;

use triage_core::config::{EngineConfig, FairDistributionMetric};
use triage_core::types::{Candidate, ReviewTrigger, SimilarTicket};

pub const RULE_OVERLOAD_PREVENTION: &str = "overload_prevention";
pub const RULE_TIMEZONE_VS_EXPERTISE: &str = "timezone_vs_expertise";
pub const RULE_FAIR_DISTRIBUTION: &str = "fair_distribution";
pub const RULE_SKILLS_GAP: &str = "skills_gap_detected";
pub const RULE_TEAM_LEAD_NOTIFICATION: &str = "team_lead_notification";

/// Top similarity above which the timezone trade-off rule engages.
const TZ_RULE_SIMILARITY_TRIGGER: f64 = 0.8;

/// How far down the ordered list fair distribution looks for a
/// replacement (positions 2 through 5).
const FAIR_DISTRIBUTION_SCAN: usize = 5;

/// Result of running the rule pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    /// Index into the ranked list of the final top pick.
    pub top_index: usize,
    pub applied_rules: Vec<String>,
    pub reasoning: Vec<String>,
    /// Set when a rule short-circuited to human review.
    pub escalation: Option<ReviewTrigger>,
}

/// Highest similarity across the similar-ticket list; 0.0 when empty.
pub fn max_similarity(similar: &[SimilarTicket]) -> f64 {
    similar
        .iter()
        .map(|entry| entry.similarity)
        .fold(0.0, f64::max)
}

/// Pre-rule: without a sufficiently similar historical pattern the
/// decision is not worth scoring at all.
pub fn similarity_floor_trigger(
    similar: &[SimilarTicket],
    config: &EngineConfig,
) -> Option<ReviewTrigger> {
    if max_similarity(similar) < config.similarity_floor {
        Some(ReviewTrigger::no_similar_pattern())
    } else {
        None
    }
}

/// Scoring edge cases that resolve to human review instead of a crash:
/// nobody to score, everyone unavailable, or similar tickets that none of
/// the current members resolved.
pub fn scoring_edge_case(ranked: &[Candidate]) -> Option<ReviewTrigger> {
    if ranked.is_empty() {
        return Some(ReviewTrigger::no_available_members());
    }
    if ranked.iter().all(|c| c.availability_score == 0.0) {
        return Some(ReviewTrigger::no_available_members());
    }
    if ranked.iter().all(|c| c.similarity_score == 0.0) {
        return Some(ReviewTrigger::no_similar_pattern());
    }
    None
}

/// Whether the overload-prevention rule fires for this top pick.
pub fn overload_rule_triggers(top: &Candidate, config: &EngineConfig) -> bool {
    top.is_overloaded || top.workload_score <= config.overload_score_floor
}

/// Run the fixed rule pipeline against a non-empty ranked list.
pub fn apply_rules(config: &EngineConfig, ranked: &[Candidate]) -> RuleOutcome {
    let mut outcome = RuleOutcome {
        top_index: 0,
        applied_rules: Vec::new(),
        reasoning: Vec::new(),
        escalation: None,
    };

    if let Some(trigger) = rule_overload_prevention(config, ranked, &mut outcome) {
        outcome.escalation = Some(trigger);
        return outcome;
    }
    rule_timezone_vs_expertise(config, ranked, &mut outcome);
    rule_fair_distribution(config, ranked, &mut outcome);
    rule_skills_gap(config, ranked, &mut outcome);
    outcome
}

/// Rule 1: an overloaded top pick is replaced by the first ranked
/// alternative with headroom; with no such alternative the whole team is
/// at capacity and a human decides.
fn rule_overload_prevention(
    config: &EngineConfig,
    ranked: &[Candidate],
    outcome: &mut RuleOutcome,
) -> Option<ReviewTrigger> {
    let top = &ranked[outcome.top_index];
    if !overload_rule_triggers(top, config) {
        return None;
    }

    outcome.applied_rules.push(RULE_OVERLOAD_PREVENTION.to_owned());
    debug!(top = %top.email, weighted_load = top.weighted_load, "overload prevention fired");

    let replacement = ranked.iter().enumerate().find(|(index, c)| {
        *index != outcome.top_index
            && !c.is_overloaded
            && c.availability_score == 1.0
            && c.workload_score >= config.overload_alt_floor
    });

    match replacement {
        Some((index, alternative)) => {
            outcome.reasoning.push(format!(
                "Top choice {} is overloaded; assigned to next available: {}",
                top.name, alternative.name
            ));
            outcome.top_index = index;
            None
        }
        None => {
            outcome
                .reasoning
                .push("Every member is overloaded or unavailable".to_owned());
            Some(ReviewTrigger::team_at_capacity())
        }
    }
}

/// Rule 2: a cross-timezone expert is kept only when materially better
/// than the best in-window alternative.
fn rule_timezone_vs_expertise(
    config: &EngineConfig,
    ranked: &[Candidate],
    outcome: &mut RuleOutcome,
) {
    let top = &ranked[outcome.top_index];
    if top.timezone_score >= 1.0 || top.similarity_score <= TZ_RULE_SIMILARITY_TRIGGER {
        return;
    }

    outcome
        .applied_rules
        .push(RULE_TIMEZONE_VS_EXPERTISE.to_owned());

    let alternative = ranked
        .iter()
        .enumerate()
        .find(|(index, c)| *index != outcome.top_index && c.timezone_score >= 1.0);

    let Some((index, alternative)) = alternative else {
        outcome
            .reasoning
            .push("No in-window alternative; keeping cross-timezone expert".to_owned());
        return;
    };

    let score_diff = top.composite_score - alternative.composite_score;
    if score_diff > config.tz_expertise_gap {
        outcome.reasoning.push(format!(
            "Cross-timezone assignment: {} is the expert ({} similar tickets solved)",
            top.name, top.solved_similar_count
        ));
    } else {
        outcome.reasoning.push(format!(
            "Preferred in-window member {} with comparable score",
            alternative.name
        ));
        outcome.top_index = index;
    }
}

fn fair_load(candidate: &Candidate, metric: FairDistributionMetric) -> u64 {
    match metric {
        FairDistributionMetric::ActiveTickets => candidate.active_tickets_count as u64,
        FairDistributionMetric::RecentAssignments => candidate.recent_assignments_count as u64,
    }
}

fn fair_cap(config: &EngineConfig) -> u64 {
    match config.fair_distribution_metric {
        FairDistributionMetric::ActiveTickets => config.fair_active_cap as u64,
        FairDistributionMetric::RecentAssignments => config.fair_recent_cap as u64,
    }
}

/// Rule 3: when the top pick already carries too much load, spread the
/// work across positions 2-5 of the ordered list.
fn rule_fair_distribution(
    config: &EngineConfig,
    ranked: &[Candidate],
    outcome: &mut RuleOutcome,
) {
    let metric = config.fair_distribution_metric;
    let cap = fair_cap(config);
    let top = &ranked[outcome.top_index];
    if fair_load(top, metric) < cap {
        return;
    }

    outcome.applied_rules.push(RULE_FAIR_DISTRIBUTION.to_owned());

    let replacement = ranked
        .iter()
        .enumerate()
        .take(FAIR_DISTRIBUTION_SCAN)
        .skip(1)
        .find(|(index, c)| {
            *index != outcome.top_index
                && fair_load(c, metric) < cap
                && c.availability_score == 1.0
        });

    match replacement {
        Some((index, alternative)) => {
            outcome.reasoning.push(format!(
                "{} already carries {} {}; distributing to {} ({})",
                top.name,
                fair_load(top, metric),
                metric_label(metric),
                alternative.name,
                fair_load(alternative, metric),
            ));
            outcome.top_index = index;
        }
        None => {
            outcome
                .reasoning
                .push("No less-loaded alternative in the top ranks; keeping pick".to_owned());
        }
    }
}

fn metric_label(metric: FairDistributionMetric) -> &'static str {
    match metric {
        FairDistributionMetric::ActiveTickets => "active tickets",
        FairDistributionMetric::RecentAssignments => "recent assignments",
    }
}

/// Rule 4: a weak skill match is worth a note for the operator, but does
/// not change the assignee.
fn rule_skills_gap(config: &EngineConfig, ranked: &[Candidate], outcome: &mut RuleOutcome) {
    let top = &ranked[outcome.top_index];
    if top.skill_score >= config.skills_gap_floor {
        return;
    }

    outcome.applied_rules.push(RULE_SKILLS_GAP.to_owned());
    outcome.reasoning.push(
        "Skills gap detected: no strong skill match on the team; consider consultation or training"
            .to_owned(),
    );
}
