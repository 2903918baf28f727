use std::collections::BTreeSet;

use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Rejected answer input. Callers re-prompt; none of these end a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("the answer cannot be empty")]
    Empty,

    #[error("{0:?} is not an option number")]
    NotANumber(String),

    #[error("option {choice} does not exist (choose 1-{options})")]
    OutOfRange { choice: usize, options: usize },

    #[error("this question takes a single option, got {given}")]
    SingleChoiceExpected { given: usize },

    #[error("display order is not a permutation of {options} options")]
    InvalidOrder { options: usize },
}

//
// ─── INPUT ─────────────────────────────────────────────────────────────────────
//

/// What the respondent typed at the answer prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerInput {
    /// Detour to note entry; does not consume an attempt.
    NoteRequest,
    /// Displayed (1-based) option numbers in the order typed.
    Choices(Vec<usize>),
}

impl AnswerInput {
    /// Parse `N` / `n` as a note request, otherwise numbers separated by `,` or `;`.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::Empty` for blank input and `AnswerError::NotANumber` for
    /// any token that is not a positive integer.
    pub fn parse(raw: &str) -> Result<Self, AnswerError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AnswerError::Empty);
        }
        if raw.eq_ignore_ascii_case("n") {
            return Ok(Self::NoteRequest);
        }

        let choices = raw
            .split([',', ';'])
            .map(str::trim)
            .map(|token| {
                if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(AnswerError::NotANumber(token.to_owned()));
                }
                token
                    .parse::<usize>()
                    .map_err(|_| AnswerError::NotANumber(token.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Choices(choices))
    }
}

//
// ─── PRESENTATION ──────────────────────────────────────────────────────────────
//

/// Display order of a question's options for one presentation.
///
/// `order[n]` is the original index shown as option number `n + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    order: Vec<usize>,
}

impl Presentation {
    /// Options shown in their stored order.
    #[must_use]
    pub fn identity(options: usize) -> Self {
        Self {
            order: (0..options).collect(),
        }
    }

    /// # Errors
    ///
    /// Returns `AnswerError::InvalidOrder` unless `order` is a permutation of `0..len`.
    pub fn from_order(order: Vec<usize>) -> Result<Self, AnswerError> {
        let distinct: BTreeSet<_> = order.iter().copied().collect();
        let is_permutation =
            distinct.len() == order.len() && order.iter().all(|&i| i < order.len());
        if !is_permutation {
            return Err(AnswerError::InvalidOrder {
                options: order.len(),
            });
        }
        Ok(Self { order })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Original indices in display order.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Original index behind a displayed, 1-based option number.
    #[must_use]
    pub fn original_index(&self, displayed: usize) -> Option<usize> {
        displayed
            .checked_sub(1)
            .and_then(|i| self.order.get(i))
            .copied()
    }

    /// `(displayed number, option text)` pairs in display order.
    pub fn display<'a, 'o>(
        &'a self,
        options: &'o [String],
    ) -> impl Iterator<Item = (usize, &'o str)> + use<'a, 'o> {
        self.order
            .iter()
            .enumerate()
            .filter_map(|(n, &i)| options.get(i).map(|text| (n + 1, text.as_str())))
    }

    /// Map displayed choices back to original indices, enforcing range and arity.
    ///
    /// Repeated numbers collapse into one choice.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::Empty` for no choices, `AnswerError::OutOfRange` for numbers
    /// outside `1..=len`, and `AnswerError::SingleChoiceExpected` when more than one
    /// distinct option is chosen for a single-select question.
    pub fn map_choices(
        &self,
        displayed: &[usize],
        is_multi: bool,
    ) -> Result<BTreeSet<usize>, AnswerError> {
        if displayed.is_empty() {
            return Err(AnswerError::Empty);
        }
        let chosen = displayed
            .iter()
            .map(|&choice| {
                self.original_index(choice).ok_or(AnswerError::OutOfRange {
                    choice,
                    options: self.len(),
                })
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        if !is_multi && chosen.len() != 1 {
            return Err(AnswerError::SingleChoiceExpected {
                given: chosen.len(),
            });
        }
        Ok(chosen)
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// All-or-nothing: the chosen set must equal the correct set.
#[must_use]
pub fn is_correct(chosen: &BTreeSet<usize>, correct: &BTreeSet<usize>) -> bool {
    !correct.is_empty() && chosen == correct
}

/// Percentage of correct answers rounded to two decimals; `0.0` when nothing was asked.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn session_score(num_correct: usize, num_asked: usize) -> f64 {
    if num_asked == 0 {
        return 0.0;
    }
    let raw = 100.0 * num_correct as f64 / num_asked as f64;
    (raw * 100.0).round() / 100.0
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_note_request_and_choices() {
        assert_eq!(AnswerInput::parse(" n ").unwrap(), AnswerInput::NoteRequest);
        assert_eq!(AnswerInput::parse("N").unwrap(), AnswerInput::NoteRequest);
        assert_eq!(
            AnswerInput::parse("1, 3;4").unwrap(),
            AnswerInput::Choices(vec![1, 3, 4])
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(AnswerInput::parse("  ").unwrap_err(), AnswerError::Empty);
        assert_eq!(
            AnswerInput::parse("1,x").unwrap_err(),
            AnswerError::NotANumber("x".into())
        );
        assert_eq!(
            AnswerInput::parse("1,,2").unwrap_err(),
            AnswerError::NotANumber(String::new())
        );
    }

    #[test]
    fn presentation_rejects_non_permutations() {
        assert!(Presentation::from_order(vec![0, 0, 1]).is_err());
        assert!(Presentation::from_order(vec![0, 3, 1]).is_err());
        assert!(Presentation::from_order(vec![2, 0, 1]).is_ok());
    }

    #[test]
    fn displayed_choices_map_back_to_original_indices() {
        // shown as: 1) C  2) A  3) B
        let presentation = Presentation::from_order(vec![2, 0, 1]).unwrap();
        let options: Vec<String> = vec!["A".into(), "B".into(), "C".into()];
        let shown: Vec<_> = presentation.display(&options).collect();
        assert_eq!(shown, vec![(1, "C"), (2, "A"), (3, "B")]);

        let chosen = presentation.map_choices(&[3], false).unwrap();
        assert_eq!(chosen, BTreeSet::from([1]));
    }

    #[test]
    fn map_choices_validates_range_and_arity() {
        let presentation = Presentation::identity(3);
        assert_eq!(
            presentation.map_choices(&[4], true).unwrap_err(),
            AnswerError::OutOfRange {
                choice: 4,
                options: 3
            }
        );
        assert_eq!(
            presentation.map_choices(&[0], true).unwrap_err(),
            AnswerError::OutOfRange {
                choice: 0,
                options: 3
            }
        );
        assert_eq!(
            presentation.map_choices(&[1, 2], false).unwrap_err(),
            AnswerError::SingleChoiceExpected { given: 2 }
        );
        assert_eq!(
            presentation.map_choices(&[2, 2], false).unwrap(),
            BTreeSet::from([1])
        );
    }

    #[test]
    fn multi_select_needs_the_exact_set() {
        let correct = BTreeSet::from([0, 2]);
        let presentation = Presentation::identity(3);

        let unsorted = presentation.map_choices(&[3, 1], true).unwrap();
        assert!(is_correct(&unsorted, &correct));

        let partial = presentation.map_choices(&[1], true).unwrap();
        assert!(!is_correct(&partial, &correct));

        let superset = presentation.map_choices(&[1, 2, 3], true).unwrap();
        assert!(!is_correct(&superset, &correct));
    }

    #[test]
    fn empty_correct_set_never_scores() {
        assert!(!is_correct(&BTreeSet::new(), &BTreeSet::new()));
    }

    #[test]
    fn session_score_rounds_to_two_decimals() {
        assert_eq!(session_score(0, 0), 0.0);
        assert_eq!(session_score(2, 3), 66.67);
        assert_eq!(session_score(1, 3), 33.33);
        assert_eq!(session_score(3, 3), 100.0);
    }
}
