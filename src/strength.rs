use crate::error::PairingError;
use crate::models::StudentRecord;

/// Score given to a component with nothing to measure yet.
pub const NEUTRAL_BASELINE: f64 = 0.5;

pub const DEFAULT_WIN_WEIGHT: f64 = 0.7;
pub const DEFAULT_HOMEWORK_WEIGHT: f64 = 0.3;

/// Win and homework weights, normalized to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    win: f64,
    homework: f64,
}

impl Weights {
    pub fn new(win_weight: f64, homework_weight: f64) -> Result<Self, PairingError> {
        if !win_weight.is_finite() || !homework_weight.is_finite() {
            return Err(PairingError::config("weights must be finite numbers"));
        }
        if win_weight < 0.0 || homework_weight < 0.0 {
            return Err(PairingError::config("weights must be zero or greater"));
        }

        let total = win_weight + homework_weight;
        if total <= 0.0 {
            return Err(PairingError::config(
                "win and homework weights must sum to a positive value",
            ));
        }

        Ok(Self {
            win: win_weight / total,
            homework: homework_weight / total,
        })
    }

    pub fn win(&self) -> f64 {
        self.win
    }

    pub fn homework(&self) -> f64 {
        self.homework
    }
}

/// Composite strength of a student under the given weights.
pub fn strength(record: &StudentRecord, weights: &Weights) -> f64 {
    if record.games_played() == 0 && record.homework_entries() == 0 {
        return NEUTRAL_BASELINE;
    }
    weights.win * win_ratio(record) + weights.homework * homework_ratio(record)
}

/// Share of games won, ties counting as half a win.
pub fn win_ratio(record: &StudentRecord) -> f64 {
    ratio(
        record.wins as f64 + 0.5 * record.ties as f64,
        record.games_played(),
    )
}

pub fn homework_ratio(record: &StudentRecord) -> f64 {
    ratio(record.homework_correct as f64, record.homework_entries())
}

fn ratio(numerator: f64, total: u64) -> f64 {
    if total == 0 {
        NEUTRAL_BASELINE
    } else {
        numerator / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(wins: u32, losses: u32, ties: u32, correct: u32, incorrect: u32) -> StudentRecord {
        StudentRecord {
            wins,
            losses,
            ties,
            homework_correct: correct,
            homework_incorrect: incorrect,
            ..StudentRecord::new("Avery Lee")
        }
    }

    #[test]
    fn combines_win_and_homework_ratios() {
        let weights = Weights::new(0.7, 0.3).unwrap();
        let score = strength(&record(3, 1, 0, 8, 2), &weights);
        assert!((score - 0.765).abs() < 1e-9);
    }

    #[test]
    fn ties_count_as_half_a_win() {
        assert!((win_ratio(&record(1, 1, 2, 0, 0)) - 0.5).abs() < 1e-9);
        assert!((win_ratio(&record(0, 0, 1, 0, 0)) - 0.5).abs() < 1e-9);
        assert!((win_ratio(&record(2, 0, 2, 0, 0)) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn empty_history_gets_neutral_baseline() {
        let fresh = StudentRecord::new("Jules Moreno");
        for (win, homework) in [(1.0, 0.0), (0.0, 1.0), (0.7, 0.3), (5.0, 2.0)] {
            let weights = Weights::new(win, homework).unwrap();
            assert_eq!(strength(&fresh, &weights), NEUTRAL_BASELINE);
        }
    }

    #[test]
    fn missing_component_falls_back_to_baseline() {
        let weights = Weights::new(0.5, 0.5).unwrap();
        let homework_only = record(0, 0, 0, 10, 0);
        assert!((strength(&homework_only, &weights) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn saturated_counts_do_not_overflow() {
        let weights = Weights::new(0.7, 0.3).unwrap();
        let veteran = record(u32::MAX, 1, u32::MAX, u32::MAX, u32::MAX);

        let score = strength(&veteran, &weights);

        assert!(score.is_finite());
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(veteran.games_played(), 2 * u64::from(u32::MAX) + 1);
    }

    #[test]
    fn weights_are_normalized() {
        let weights = Weights::new(7.0, 3.0).unwrap();
        assert!((weights.win() - 0.7).abs() < 1e-12);
        assert!((weights.homework() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn rejects_unusable_weights() {
        assert!(matches!(
            Weights::new(0.0, 0.0),
            Err(PairingError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            Weights::new(-1.0, 2.0),
            Err(PairingError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            Weights::new(f64::NAN, 1.0),
            Err(PairingError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            Weights::new(f64::INFINITY, 1.0),
            Err(PairingError::InvalidConfiguration { .. })
        ));
    }

    proptest! {
        #[test]
        fn scaling_weights_leaves_scores_unchanged(
            win in 0.0f64..10.0,
            homework in 0.0f64..10.0,
            scale in 0.01f64..100.0,
            wins in 0u32..50,
            losses in 0u32..50,
            ties in 0u32..50,
            correct in 0u32..50,
            incorrect in 0u32..50,
        ) {
            prop_assume!(win + homework > 0.01);
            let student = record(wins, losses, ties, correct, incorrect);
            let base = Weights::new(win, homework).unwrap();
            let scaled = Weights::new(win * scale, homework * scale).unwrap();
            prop_assert!((strength(&student, &base) - strength(&student, &scaled)).abs() < 1e-9);
        }

        #[test]
        fn scores_stay_within_unit_interval(
            win in 0.0f64..10.0,
            homework in 0.0f64..10.0,
            wins in 0u32..50,
            losses in 0u32..50,
            ties in 0u32..50,
            correct in 0u32..50,
            incorrect in 0u32..50,
        ) {
            prop_assume!(win + homework > 0.01);
            let weights = Weights::new(win, homework).unwrap();
            let score = strength(&record(wins, losses, ties, correct, incorrect), &weights);
            prop_assert!((0.0..=1.0 + 1e-12).contains(&score));
        }
    }
}
