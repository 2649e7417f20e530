//! Candidate ordering: composite score descending, ties broken by email
//! ascending. The order is total so downstream rules can reference
//! positions deterministically.

use std::cmp::Ordering;

use triage_core::types::Candidate;

/// Sort candidates into the total order the rule engine consumes.
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(compare);
}

fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| a.email.cmp(&b.email))
}
