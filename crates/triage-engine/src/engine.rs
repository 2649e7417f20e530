//! Assignment pipeline: the single entry point composing snapshot
//! loading, scoring, ranking, the rule pipeline, and the confidence gate
//! into one decision call.
//!
//! The only suspension points are the snapshot queries; dropping the call
//! future cancels any outstanding store work without leaving partial
//! state. Deadlines are the caller's concern.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use triage_core::config::EngineConfig;
use triage_core::error::EngineError;
use triage_core::store::TeamStore;
use triage_core::types::{
    validate_similar_tickets, AssignmentType, Candidate, Decision, ReviewTrigger, SimilarTicket,
    Ticket,
};

use crate::confidence::{confidence_factors, route, ConfidenceRoute};
use crate::ranker::rank;
use crate::rules::{
    apply_rules, scoring_edge_case, similarity_floor_trigger, RULE_TEAM_LEAD_NOTIFICATION,
};
use crate::scorer::score_candidates;
use crate::snapshot::load_snapshot;

/// How many candidates the decision record carries for operator review.
const DECISION_BOARD_SIZE: usize = 3;

/// The assignment engine. Holds immutable configuration and a shared store
/// handle; construction is cheap and concurrent calls share no mutable
/// state.
pub struct AssignmentEngine {
    config: EngineConfig,
    store: Arc<dyn TeamStore>,
}

impl AssignmentEngine {
    /// Build an engine, validating the configuration once up front. A bad
    /// weight table is rejected here rather than on every call.
    pub fn new(config: EngineConfig, store: Arc<dyn TeamStore>) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config, store })
    }

    /// Engine with the default configuration.
    pub fn with_defaults(store: Arc<dyn TeamStore>) -> Result<Self, EngineError> {
        Self::new(EngineConfig::default(), store)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decide who should own the ticket, or route to human review.
    /// Captures the wall clock once; everything downstream is
    /// deterministic in the snapshot and inputs.
    pub async fn assign_ticket(
        &self,
        ticket: &Ticket,
        similar: &[SimilarTicket],
    ) -> Result<Decision, EngineError> {
        self.assign_ticket_at(ticket, similar, Utc::now()).await
    }

    /// `assign_ticket` with an injected decision time. Given an identical
    /// snapshot and inputs, the decision is byte-identical.
    pub async fn assign_ticket_at(
        &self,
        ticket: &Ticket,
        similar: &[SimilarTicket],
        now: DateTime<Utc>,
    ) -> Result<Decision, EngineError> {
        ticket.validate()?;
        validate_similar_tickets(similar)?;

        // Pre-rule: no usable historical pattern means no store work at all.
        if let Some(trigger) = similarity_floor_trigger(similar, &self.config) {
            info!(ticket = %ticket.id, "similarity floor not met, routing to human review");
            return Ok(review_decision(
                ticket,
                now,
                trigger,
                Vec::new(),
                Vec::new(),
                Vec::new(),
                0.0,
            ));
        }

        let snapshot = load_snapshot(
            self.store.as_ref(),
            &self.config.member_role_filter,
            self.config.recent_window_days,
            now,
        )
        .await?;

        let mut candidates = score_candidates(&self.config, ticket, similar, &snapshot);
        rank(&mut candidates);
        debug!(
            ticket = %ticket.id,
            candidates = candidates.len(),
            "scored and ranked candidates"
        );

        if let Some(trigger) = scoring_edge_case(&candidates) {
            info!(ticket = %ticket.id, reason = %trigger.reason, "scoring edge case, routing to human review");
            let board = candidate_board(&candidates);
            return Ok(review_decision(
                ticket,
                now,
                trigger,
                Vec::new(),
                Vec::new(),
                board,
                0.0,
            ));
        }

        let outcome = apply_rules(&self.config, &candidates);
        if let Some(trigger) = outcome.escalation {
            info!(ticket = %ticket.id, reason = %trigger.reason, "rule escalation, routing to human review");
            let board = candidate_board(&candidates);
            return Ok(review_decision(
                ticket,
                now,
                trigger,
                outcome.applied_rules,
                outcome.reasoning,
                board,
                0.0,
            ));
        }

        let top = &candidates[outcome.top_index];
        let factors = confidence_factors(top, candidates.get(1));
        let confidence = factors.score();
        debug!(
            ticket = %ticket.id,
            assignee = %top.email,
            confidence,
            "confidence evaluated"
        );

        let mut applied_rules = outcome.applied_rules;
        let mut reasoning = outcome.reasoning;

        match route(confidence, &self.config) {
            ConfidenceRoute::HumanReview => {
                info!(ticket = %ticket.id, confidence, "low confidence, routing to human review");
                let board = candidate_board(&candidates);
                Ok(review_decision(
                    ticket,
                    now,
                    ReviewTrigger::low_confidence(),
                    applied_rules,
                    reasoning,
                    board,
                    confidence,
                ))
            }
            route_kind => {
                if route_kind == ConfidenceRoute::AssignWithNotification {
                    applied_rules.push(RULE_TEAM_LEAD_NOTIFICATION.to_owned());
                    reasoning.push("Medium confidence assignment; team lead notified".to_owned());
                }
                reasoning.push(format!(
                    "Assigned to {}: composite {:.2} (similarity {:.2}, skill {:.2}, availability {:.2})",
                    top.name,
                    top.composite_score,
                    top.similarity_score,
                    top.skill_score,
                    top.availability_score,
                ));
                info!(ticket = %ticket.id, assignee = %top.email, confidence, "ticket assigned");
                Ok(Decision {
                    ticket_id: ticket.id.clone(),
                    assignment_type: AssignmentType::Normal,
                    primary_assignee: Some(top.email.clone()),
                    confidence,
                    applied_rules,
                    reasoning,
                    review_triggers: Vec::new(),
                    top_candidates: candidate_board(&candidates),
                    decided_at: now,
                })
            }
        }
    }
}

fn candidate_board(ranked: &[Candidate]) -> Vec<triage_core::types::CandidateSummary> {
    ranked
        .iter()
        .take(DECISION_BOARD_SIZE)
        .map(Candidate::summary)
        .collect()
}

fn review_decision(
    ticket: &Ticket,
    now: DateTime<Utc>,
    trigger: ReviewTrigger,
    applied_rules: Vec<String>,
    mut reasoning: Vec<String>,
    top_candidates: Vec<triage_core::types::CandidateSummary>,
    confidence: f64,
) -> Decision {
    reasoning.push(format!(
        "Human review triggered: {} (severity: {})",
        trigger.reason, trigger.severity
    ));
    Decision {
        ticket_id: ticket.id.clone(),
        assignment_type: AssignmentType::HumanReview,
        primary_assignee: None,
        confidence,
        applied_rules,
        reasoning,
        review_triggers: vec![trigger],
        top_candidates,
        decided_at: now,
    }
}
