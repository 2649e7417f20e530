//! Engine configuration: thresholds and priority weight tables with full
//! defaults and validation. Immutable after the engine is constructed.

use crate::error::EngineError;
use crate::types::TicketPriority;

/// Which load metric drives the fair-distribution rule.
///
/// The intended metric is recent assignments; active-ticket count is the
/// documented proxy and the default until recent-assignment history is
/// trusted in a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FairDistributionMetric {
    ActiveTickets,
    RecentAssignments,
}

/// One row of the priority weight table. Rows must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightRow {
    pub similarity: f64,
    pub skill: f64,
    pub availability: f64,
    pub workload: f64,
    pub timezone: f64,
}

impl WeightRow {
    pub fn sum(&self) -> f64 {
        self.similarity + self.skill + self.availability + self.workload + self.timezone
    }
}

/// Per-priority component weights.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    pub critical: WeightRow,
    pub high: WeightRow,
    pub medium: WeightRow,
    pub low: WeightRow,
}

impl WeightTable {
    pub fn row(&self, priority: TicketPriority) -> &WeightRow {
        match priority {
            TicketPriority::Critical => &self.critical,
            TicketPriority::High => &self.high,
            TicketPriority::Medium => &self.medium,
            TicketPriority::Low => &self.low,
        }
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            critical: WeightRow {
                similarity: 0.30,
                skill: 0.25,
                availability: 0.15,
                workload: 0.10,
                timezone: 0.20,
            },
            high: WeightRow {
                similarity: 0.25,
                skill: 0.25,
                availability: 0.20,
                workload: 0.15,
                timezone: 0.15,
            },
            medium: WeightRow {
                similarity: 0.20,
                skill: 0.25,
                availability: 0.20,
                workload: 0.20,
                timezone: 0.15,
            },
            low: WeightRow {
                similarity: 0.15,
                skill: 0.15,
                availability: 0.15,
                workload: 0.40,
                timezone: 0.15,
            },
        }
    }
}

/// Root configuration for the assignment engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Role tag members must carry to be considered for assignment.
    pub member_role_filter: String,

    /// Pre-rule threshold: below this max similarity the decision goes
    /// straight to human review.
    pub similarity_floor: f64,

    /// Confidence below this routes to human review.
    pub confidence_low: f64,
    /// Confidence below this (and at or above `confidence_low`) assigns
    /// with a team-lead notification.
    pub confidence_medium: f64,

    /// Normalization denominator for the workload score.
    pub workload_capacity: f64,
    /// Weighted load above this marks a member overloaded.
    pub overload_threshold: f64,

    /// `[start, end)` UTC hours-with-fraction during which India-based
    /// members are preferred.
    pub ist_window_utc: (f64, f64),
    /// Timezone score for a member outside the preferred region.
    pub tz_mismatch_floor: f64,
    /// Mismatch override when the ticket is Critical.
    pub tz_boost_critical: f64,
    /// Mismatch override for experts on this pattern.
    pub tz_boost_expert: f64,
    /// Solved-similar count at which a member counts as an expert.
    pub expert_solved_count: usize,

    /// Rule 1: workload score at or below this triggers overload handling.
    pub overload_score_floor: f64,
    /// Rule 1: minimum workload score an alternative must have.
    pub overload_alt_floor: f64,

    /// Rule 2: composite gap above which the cross-timezone expert is kept.
    pub tz_expertise_gap: f64,

    /// Rule 3: which metric triggers fair distribution.
    pub fair_distribution_metric: FairDistributionMetric,
    /// Rule 3: active-ticket cap for the proxy metric.
    pub fair_active_cap: usize,
    /// Rule 3: recent-assignment cap for the intended metric.
    pub fair_recent_cap: u32,

    /// Rule 4: skill score below this annotates a skills gap.
    pub skills_gap_floor: f64,

    /// Window for the recent-assignment count, in days.
    pub recent_window_days: u32,

    /// Per-priority component weights.
    pub weights: WeightTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            member_role_filter: "USER".to_owned(),
            similarity_floor: 0.70,
            confidence_low: 0.30,
            confidence_medium: 0.50,
            workload_capacity: 30.0,
            overload_threshold: 20.0,
            ist_window_utc: (2.5, 12.5),
            tz_mismatch_floor: 0.2,
            tz_boost_critical: 0.5,
            tz_boost_expert: 0.6,
            expert_solved_count: 3,
            overload_score_floor: 0.3,
            overload_alt_floor: 0.5,
            tz_expertise_gap: 0.15,
            fair_distribution_metric: FairDistributionMetric::ActiveTickets,
            fair_active_cap: 8,
            fair_recent_cap: 5,
            skills_gap_floor: 0.4,
            recent_window_days: 7,
            weights: WeightTable::default(),
        }
    }
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

impl EngineConfig {
    /// Validate the configuration. Called once at engine construction; a
    /// failure here is an invariant violation, not a per-call error.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (priority, row) in [
            (TicketPriority::Critical, &self.weights.critical),
            (TicketPriority::High, &self.weights.high),
            (TicketPriority::Medium, &self.weights.medium),
            (TicketPriority::Low, &self.weights.low),
        ] {
            let sum = row.sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(EngineError::InvariantViolation {
                    message: format!("weight row for {priority} sums to {sum}, expected 1.0"),
                });
            }
            for (name, value) in [
                ("similarity", row.similarity),
                ("skill", row.skill),
                ("availability", row.availability),
                ("workload", row.workload),
                ("timezone", row.timezone),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(EngineError::InvariantViolation {
                        message: format!(
                            "weight {name} for {priority} is {value}, expected [0, 1]"
                        ),
                    });
                }
            }
        }

        for (name, value) in [
            ("similarity_floor", self.similarity_floor),
            ("confidence_low", self.confidence_low),
            ("confidence_medium", self.confidence_medium),
            ("tz_mismatch_floor", self.tz_mismatch_floor),
            ("tz_boost_critical", self.tz_boost_critical),
            ("tz_boost_expert", self.tz_boost_expert),
            ("overload_score_floor", self.overload_score_floor),
            ("overload_alt_floor", self.overload_alt_floor),
            ("skills_gap_floor", self.skills_gap_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvariantViolation {
                    message: format!("{name} is {value}, expected [0, 1]"),
                });
            }
        }

        if self.confidence_low > self.confidence_medium {
            return Err(EngineError::InvariantViolation {
                message: format!(
                    "confidence_low {} exceeds confidence_medium {}",
                    self.confidence_low, self.confidence_medium
                ),
            });
        }

        if self.workload_capacity <= 0.0 {
            return Err(EngineError::InvariantViolation {
                message: format!(
                    "workload_capacity must be positive, got {}",
                    self.workload_capacity
                ),
            });
        }
        if self.overload_threshold <= 0.0 {
            return Err(EngineError::InvariantViolation {
                message: format!(
                    "overload_threshold must be positive, got {}",
                    self.overload_threshold
                ),
            });
        }

        let (start, end) = self.ist_window_utc;
        if !(0.0..24.0).contains(&start) || !(0.0..=24.0).contains(&end) || start >= end {
            return Err(EngineError::InvariantViolation {
                message: format!("ist_window_utc [{start}, {end}) is not a valid UTC hour range"),
            });
        }

        if self.member_role_filter.trim().is_empty() {
            return Err(EngineError::InvariantViolation {
                message: "member_role_filter is required".to_owned(),
            });
        }
        if self.recent_window_days == 0 {
            return Err(EngineError::InvariantViolation {
                message: "recent_window_days must be at least 1".to_owned(),
            });
        }

        Ok(())
    }
}
