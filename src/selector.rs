//! Deterministic selection of one mask from the candidate list

use crate::error::{CutoutError, Result};
use crate::types::MaskCandidate;

/// Picks the winning candidate from a segmentation call
///
/// The score scale is opaque; selection only relies on `>` comparisons, so
/// repeated invocation over the same candidate list always returns the same
/// index. Exact ties resolve to the first occurrence.
pub struct MaskSelector;

impl MaskSelector {
    /// Index of the highest-scoring candidate, first occurrence on ties
    ///
    /// NaN scores never win a `>` comparison, so a candidate list led by a
    /// NaN falls through to the first comparable score.
    ///
    /// # Errors
    ///
    /// Returns `CutoutError::NoMaskCandidates` when the list is empty.
    pub fn select_best_index(candidates: &[MaskCandidate]) -> Result<usize> {
        if candidates.is_empty() {
            return Err(CutoutError::NoMaskCandidates);
        }

        let mut best_index = 0;
        for (index, candidate) in candidates.iter().enumerate().skip(1) {
            if candidate.score > candidates[best_index].score {
                best_index = index;
            }
        }
        Ok(best_index)
    }

    /// The highest-scoring candidate itself
    ///
    /// # Errors
    ///
    /// Returns `CutoutError::NoMaskCandidates` when the list is empty.
    pub fn select_best(candidates: &[MaskCandidate]) -> Result<&MaskCandidate> {
        let index = Self::select_best_index(candidates)?;
        candidates
            .get(index)
            .ok_or_else(|| CutoutError::internal("selected candidate index out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mask;

    fn candidate(score: f32) -> MaskCandidate {
        MaskCandidate {
            mask: Mask::new(vec![0.0; 4], (2, 2)).unwrap(),
            score,
        }
    }

    #[test]
    fn test_empty_candidates_rejected() {
        let err = MaskSelector::select_best_index(&[]).unwrap_err();
        assert!(matches!(err, CutoutError::NoMaskCandidates));
    }

    #[test]
    fn test_selects_maximum_score() {
        let candidates = vec![candidate(0.1), candidate(0.7), candidate(0.3)];
        assert_eq!(MaskSelector::select_best_index(&candidates).unwrap(), 1);
    }

    #[test]
    fn test_ties_resolve_to_first_occurrence() {
        let candidates = vec![candidate(0.2), candidate(0.9), candidate(0.9)];
        assert_eq!(MaskSelector::select_best_index(&candidates).unwrap(), 1);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let candidates = vec![candidate(0.5), candidate(0.5), candidate(0.5)];
        let first = MaskSelector::select_best_index(&candidates).unwrap();
        for _ in 0..10 {
            assert_eq!(MaskSelector::select_best_index(&candidates).unwrap(), first);
        }
        assert_eq!(first, 0);
    }

    #[test]
    fn test_nan_scores_never_win() {
        let candidates = vec![candidate(f32::NAN), candidate(0.4), candidate(0.2)];
        assert_eq!(MaskSelector::select_best_index(&candidates).unwrap(), 1);
    }

    #[test]
    fn test_single_candidate() {
        let candidates = vec![candidate(0.0)];
        assert_eq!(MaskSelector::select_best_index(&candidates).unwrap(), 0);
        let best = MaskSelector::select_best(&candidates).unwrap();
        assert!((best.score - 0.0).abs() < f32::EPSILON);
    }
}
