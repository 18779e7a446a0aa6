use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{ApplyOutcome, RoundPairings};

#[derive(Debug, Clone, PartialEq)]
pub struct GapSummary {
    pub average: f64,
    pub largest: f64,
}

pub fn summarize_gaps(round: &RoundPairings) -> Option<GapSummary> {
    if round.pairings.is_empty() {
        return None;
    }

    let gaps: Vec<f64> = round.pairings.iter().map(|pairing| pairing.rating_gap()).collect();
    Some(GapSummary {
        average: gaps.iter().sum::<f64>() / gaps.len() as f64,
        largest: gaps.iter().copied().fold(0.0, f64::max),
    })
}

pub fn build_round_report(
    classroom: Option<&str>,
    generated_on: NaiveDate,
    round: &RoundPairings,
) -> String {
    let mut output = String::new();
    let classroom_label = classroom.unwrap_or("roster sheet");

    let _ = writeln!(output, "# Round Pairings");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        classroom_label, generated_on
    );
    let _ = writeln!(
        output,
        "Weights: wins {:.3}, homework {:.3}",
        round.win_weight, round.homework_weight
    );
    if let Some(seed) = round.seed {
        let _ = writeln!(output, "Seed: {seed}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Boards");

    if round.pairings.is_empty() {
        let _ = writeln!(output, "No games this round.");
    } else {
        let _ = writeln!(output, "| Board | White | Strength | Black | Strength | Gap |");
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for (board, pairing) in round.pairings.iter().enumerate() {
            let _ = writeln!(
                output,
                "| {} | {} | {:.3} | {} | {:.3} | {:.3} |",
                board + 1,
                pairing.white.name,
                pairing.white.strength,
                pairing.black.name,
                pairing.black.strength,
                pairing.rating_gap()
            );
        }
    }

    if let Some(summary) = summarize_gaps(round) {
        let _ = writeln!(
            output,
            "\nAverage gap {:.3}, largest gap {:.3}",
            summary.average, summary.largest
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Bye");
    match &round.bye {
        Some(seat) => {
            let _ = writeln!(output, "- {} (strength {:.3})", seat.name, seat.strength);
        }
        None => {
            let _ = writeln!(output, "No bye this round.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Absent");
    if round.absent.is_empty() {
        let _ = writeln!(output, "Everyone present.");
    } else {
        for name in &round.absent {
            let _ = writeln!(output, "- {name}");
        }
    }

    output
}

pub fn build_results_report(generated_on: NaiveDate, outcome: &ApplyOutcome) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Round Results");
    let _ = writeln!(output, "Applied on {generated_on}");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "- {} games recorded, {} byes recorded, {} pending",
        outcome.applied,
        outcome.byes,
        outcome.pending.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Pending Results");
    if outcome.pending.is_empty() {
        let _ = writeln!(output, "Nothing pending.");
    } else {
        for entry in &outcome.pending {
            let _ = writeln!(
                output,
                "- row {}: {} vs {}",
                entry.row, entry.white, entry.black
            );
        }
    }

    output
}
