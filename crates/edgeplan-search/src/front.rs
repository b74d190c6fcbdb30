//! Non-dominated candidate fronts.

use edgeplan_model::Solution;

/// Which search algorithm produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Pso,
    Gwo,
}

impl Algorithm {
    pub fn index(self) -> usize {
        match self {
            Algorithm::Pso => 0,
            Algorithm::Gwo => 1,
        }
    }
}

/// One non-dominated candidate: a plan, its score, and its origin.
#[derive(Debug, Clone)]
pub struct FrontEntry {
    pub solution: Solution,
    pub score: f64,
    pub origin: Algorithm,
}

impl FrontEntry {
    /// Whether this candidate dominates a challenger.
    ///
    /// Single tracked objective today (score, lower is better); additional
    /// objectives extend this comparison, not the insertion logic.
    pub fn dominates(&self, challenger: &FrontEntry) -> bool {
        self.score <= challenger.score
    }
}

/// An ordered list of candidates none of which was dominated at insertion
/// time.
///
/// Insertion rejects any candidate dominated by an existing member;
/// established members are never evicted. Re-offering a member is rejected
/// by the member itself, so insertion is idempotent.
#[derive(Debug, Clone, Default)]
pub struct ParetoFront {
    entries: Vec<FrontEntry>,
}

impl ParetoFront {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate; returns whether it joined the front.
    pub fn insert(&mut self, candidate: FrontEntry) -> bool {
        if self.entries.iter().any(|e| e.dominates(&candidate)) {
            return false;
        }
        self.entries.push(candidate);
        true
    }

    /// The lowest-score member.
    pub fn best(&self) -> Option<&FrontEntry> {
        self.entries
            .iter()
            .min_by(|a, b| a.score.total_cmp(&b.score))
    }

    pub fn entries(&self) -> &[FrontEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<FrontEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
