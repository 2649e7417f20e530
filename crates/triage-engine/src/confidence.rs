//! Confidence gate: five boolean factors over the final top pick decide
//! whether the assignment ships automatically, ships with a team-lead
//! notification, or goes to a human.

use triage_core::config::EngineConfig;
use triage_core::types::Candidate;

const HIGH_SIMILARITY: f64 = 0.75;
const STRONG_SKILLS: f64 = 0.15;
const GOOD_AVAILABILITY: f64 = 0.7;
const CLEAR_WINNER_MARGIN: f64 = 0.01;
const TIMEZONE_FLOOR: f64 = 0.2;

/// The five confidence factors, individually inspectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceFactors {
    pub high_similarity: bool,
    pub strong_skills: bool,
    pub good_availability: bool,
    pub clear_winner: bool,
    pub timezone_workable: bool,
}

impl ConfidenceFactors {
    pub fn satisfied(&self) -> usize {
        [
            self.high_similarity,
            self.strong_skills,
            self.good_availability,
            self.clear_winner,
            self.timezone_workable,
        ]
        .iter()
        .filter(|v| **v)
        .count()
    }

    /// Fraction of factors satisfied.
    pub fn score(&self) -> f64 {
        (self.satisfied() as f64) / 5.0
    }
}

/// Evaluate the factors for the final top pick. `runner_up` is the
/// second-ranked candidate overall; with a single candidate there is no
/// margin evidence, so the clear-winner factor stays false.
pub fn confidence_factors(top: &Candidate, runner_up: Option<&Candidate>) -> ConfidenceFactors {
    let clear_winner = match runner_up {
        Some(second) => top.composite_score - second.composite_score > CLEAR_WINNER_MARGIN,
        None => false,
    };
    ConfidenceFactors {
        high_similarity: top.similarity_score > HIGH_SIMILARITY,
        strong_skills: top.skill_score > STRONG_SKILLS,
        good_availability: top.availability_score > GOOD_AVAILABILITY,
        clear_winner,
        timezone_workable: top.timezone_score >= TIMEZONE_FLOOR,
    }
}

/// Where the confidence score routes the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceRoute {
    HumanReview,
    AssignWithNotification,
    AutoAssign,
}

/// `< low` goes to a human, `[low, medium)` ships with a notification,
/// `>= medium` ships clean.
pub fn route(confidence: f64, config: &EngineConfig) -> ConfidenceRoute {
    if confidence < config.confidence_low {
        ConfidenceRoute::HumanReview
    } else if confidence < config.confidence_medium {
        ConfidenceRoute::AssignWithNotification
    } else {
        ConfidenceRoute::AutoAssign
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::types::MemberRegion;

    fn candidate(composite: f64) -> Candidate {
        Candidate {
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
            composite_score: composite,
            solved_similar_count: 2,
            active_tickets_count: 0,
            recent_assignments_count: 0,
            weighted_load: 0.0,
            is_overloaded: false,
            notes: Vec::new(),
        }
    }

    #[test]
    fn all_factors_pass_for_a_strong_pick() {
        let top = candidate(0.8);
        let second = candidate(0.5);
        let factors = confidence_factors(&top, Some(&second));
        assert!(factors.high_similarity);
        assert!(factors.strong_skills);
        assert!(factors.good_availability);
        assert!(factors.clear_winner);
        assert!(factors.timezone_workable);
        assert_eq!(factors.score(), 1.0);
    }

    #[test]
    fn factor_thresholds_are_strict_where_specified() {
        let mut top = candidate(0.8);
        top.similarity_score = 0.75; // strictly-greater threshold
        top.skill_score = 0.15;
        top.availability_score = 0.7;
        let factors = confidence_factors(&top, None);
        assert!(!factors.high_similarity);
        assert!(!factors.strong_skills);
        assert!(!factors.good_availability);

        // The timezone floor is inclusive.
        top.timezone_score = 0.2;
        let factors = confidence_factors(&top, None);
        assert!(factors.timezone_workable);
    }

    #[test]
    fn single_candidate_has_no_clear_winner_evidence() {
        let top = candidate(0.9);
        let factors = confidence_factors(&top, None);
        assert!(!factors.clear_winner);
        assert_eq!(factors.satisfied(), 4);
    }

    #[test]
    fn tight_margin_is_not_a_clear_win() {
        let top = candidate(0.800);
        let second = candidate(0.795);
        let factors = confidence_factors(&top, Some(&second));
        assert!(!factors.clear_winner);
    }

    #[test]
    fn routing_boundaries_are_inclusive_on_the_assign_side() {
        let config = EngineConfig::default();
        assert_eq!(route(0.0, &config), ConfidenceRoute::HumanReview);
        assert_eq!(route(0.2, &config), ConfidenceRoute::HumanReview);
        assert_eq!(route(0.30, &config), ConfidenceRoute::AssignWithNotification);
        assert_eq!(route(0.4, &config), ConfidenceRoute::AssignWithNotification);
        assert_eq!(route(0.50, &config), ConfidenceRoute::AutoAssign);
        assert_eq!(route(1.0, &config), ConfidenceRoute::AutoAssign);
    }

    #[test]
    fn score_counts_fractions_of_five() {
        let mut top = candidate(0.8);
        top.similarity_score = 0.1;
        top.skill_score = 0.1;
        let factors = confidence_factors(&top, None);
        assert_eq!(factors.satisfied(), 2);
        assert!((factors.score() - 0.4).abs() < 1e-9);
    }
}
