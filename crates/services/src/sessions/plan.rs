use std::cmp::Ordering;
use std::collections::BTreeSet;

use log::{debug, warn};
use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::mastery::{MasteryPolicy, classify_record};
use quiz_core::model::{QuestionKey, QuestionRecord, SelectionPolicy, SessionSize};

/// Restricts a session to some sections. Empty means every section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankFilter {
    sections: BTreeSet<String>,
}

impl BankFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sections<I, S>(sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sections: sections
                .into_iter()
                .map(|s| s.into().trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn matches(&self, record: &QuestionRecord) -> bool {
        self.sections.is_empty() || self.sections.contains(record.section())
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    /// Questions in presentation order.
    pub questions: Vec<QuestionKey>,
    /// Every question the filter admitted, used for verification spot-checks.
    pub pool: Vec<QuestionKey>,
    pub unmastered_selected: usize,
    pub mastered_selected: usize,
    /// The requested policy matched nothing and `All` was used instead.
    pub fallback: bool,
    /// The filtered pool was smaller than the requested minimum.
    pub undersized: bool,
}

impl SessionPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Builds a session by choosing questions from a pool according to mastery.
pub struct SessionBuilder<'a> {
    mastery: &'a MasteryPolicy,
    policy: SelectionPolicy,
    size: SessionSize,
    filter: BankFilter,
}

impl<'a> SessionBuilder<'a> {
    #[must_use]
    pub fn new(mastery: &'a MasteryPolicy) -> Self {
        Self {
            mastery,
            policy: SelectionPolicy::All,
            size: SessionSize::default(),
            filter: BankFilter::all(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: SessionSize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: BankFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Build a plan from `pool`. The pool itself is never reordered or modified.
    ///
    /// - `All`: unmastered first (never attempted, then fewest attempts, then lowest
    ///   accuracy) up to `max`, remaining slots filled with random mastered ones.
    /// - `UnmasteredOnly` / `MasteredOnly`: only that class, falling back to `All`
    ///   when it is empty.
    ///
    /// The resulting order is shuffled.
    pub fn build<R: Rng + ?Sized>(self, pool: &[QuestionRecord], rng: &mut R) -> SessionPlan {
        let candidates: Vec<&QuestionRecord> =
            pool.iter().filter(|r| self.filter.matches(r)).collect();
        let undersized = candidates.len() < self.size.min();
        if undersized {
            warn!(
                "only {} questions available (minimum recommended: {})",
                candidates.len(),
                self.size.min()
            );
        }

        let (mastered, unmastered): (Vec<&QuestionRecord>, Vec<&QuestionRecord>) = candidates
            .iter()
            .copied()
            .partition(|r| classify_record(r, self.mastery).is_mastered());

        let max = self.size.max();
        let mut fallback = false;
        let (mut selected, unmastered_selected, mastered_selected) = match self.policy {
            SelectionPolicy::UnmasteredOnly if !unmastered.is_empty() => {
                let picked = by_priority(unmastered, max);
                let n = picked.len();
                (picked, n, 0)
            }
            SelectionPolicy::MasteredOnly if !mastered.is_empty() => {
                let picked = random_subset(mastered, max, rng);
                let n = picked.len();
                (picked, 0, n)
            }
            policy => {
                if policy != SelectionPolicy::All {
                    fallback = true;
                    warn!("no questions match the {policy} filter; selecting from all questions");
                }
                let mut picked = by_priority(unmastered, max);
                let unmastered_selected = picked.len();
                let extra = random_subset(mastered, max - unmastered_selected, rng);
                let mastered_selected = extra.len();
                picked.extend(extra);
                (picked, unmastered_selected, mastered_selected)
            }
        };
        selected.shuffle(rng);

        debug!(
            "session plan: {} unmastered + {} mastered from {} candidates (policy {})",
            unmastered_selected,
            mastered_selected,
            candidates.len(),
            self.policy
        );

        SessionPlan {
            questions: selected.iter().map(|r| r.key().clone()).collect(),
            pool: candidates.iter().map(|r| r.key().clone()).collect(),
            unmastered_selected,
            mastered_selected,
            fallback,
            undersized,
        }
    }
}

/// `SessionBuilder` shorthand without a section filter.
pub fn select<R: Rng + ?Sized>(
    pool: &[QuestionRecord],
    policy: SelectionPolicy,
    size: SessionSize,
    mastery: &MasteryPolicy,
    rng: &mut R,
) -> SessionPlan {
    SessionBuilder::new(mastery)
        .with_policy(policy)
        .with_size(size)
        .build(pool, rng)
}

/// Never attempted first, then fewer attempts, then lower accuracy.
fn priority(a: &QuestionRecord, b: &QuestionRecord) -> Ordering {
    let (ma, mb) = (a.metrics(), b.metrics());
    (!ma.is_unattempted())
        .cmp(&!mb.is_unattempted())
        .then(ma.total().cmp(&mb.total()))
        .then(ma.accuracy().total_cmp(&mb.accuracy()))
}

fn by_priority(mut records: Vec<&QuestionRecord>, max: usize) -> Vec<&QuestionRecord> {
    records.sort_by(|a, b| priority(a, b));
    records.truncate(max);
    records
}

fn random_subset<'r, R: Rng + ?Sized>(
    mut records: Vec<&'r QuestionRecord>,
    n: usize,
    rng: &mut R,
) -> Vec<&'r QuestionRecord> {
    records.shuffle(rng);
    records.truncate(n);
    records
}
