use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PairingError;
use crate::models::{
    ApplyOutcome, GameResult, HomeworkTally, Pairing, PendingMatch, Seat, StudentRecord,
};

const BYE_NOTE: &str = "bye";

/// One line of the match sheet handed to teachers and read back once results are in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRow {
    #[serde(rename = "White Player", default)]
    pub white_player: String,
    #[serde(rename = "White Player Strength", default)]
    pub white_strength: String,
    #[serde(rename = "Black Player", default)]
    pub black_player: String,
    #[serde(rename = "Black Player Strength", default)]
    pub black_strength: String,
    #[serde(rename = "Who Won", default)]
    pub who_won: String,
    #[serde(rename = "White Homework Correct", default)]
    pub white_homework_correct: String,
    #[serde(rename = "White Homework Incorrect", default)]
    pub white_homework_incorrect: String,
    #[serde(rename = "Black Homework Correct", default)]
    pub black_homework_correct: String,
    #[serde(rename = "Black Homework Incorrect", default)]
    pub black_homework_incorrect: String,
    #[serde(rename = "Notes", default)]
    pub notes: String,
}

impl MatchRow {
    pub fn from_pairing(pairing: &Pairing) -> Self {
        Self {
            white_player: pairing.white.name.clone(),
            white_strength: format!("{:.3}", pairing.white.strength),
            black_player: pairing.black.name.clone(),
            black_strength: format!("{:.3}", pairing.black.strength),
            who_won: result_code(pairing.result).to_string(),
            white_homework_correct: tally_cell(pairing.white_homework.correct),
            white_homework_incorrect: tally_cell(pairing.white_homework.incorrect),
            black_homework_correct: tally_cell(pairing.black_homework.correct),
            black_homework_incorrect: tally_cell(pairing.black_homework.incorrect),
            notes: String::new(),
        }
    }

    pub fn bye(seat: &Seat) -> Self {
        Self {
            white_player: seat.name.clone(),
            white_strength: format!("{:.3}", seat.strength),
            notes: BYE_NOTE.to_string(),
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        [
            &self.white_player,
            &self.black_player,
            &self.who_won,
            &self.white_homework_correct,
            &self.white_homework_incorrect,
            &self.black_homework_correct,
            &self.black_homework_incorrect,
        ]
        .iter()
        .all(|cell| cell.trim().is_empty())
    }
}

fn tally_cell(count: u32) -> String {
    if count == 0 {
        String::new()
    } else {
        count.to_string()
    }
}

pub fn result_code(result: GameResult) -> &'static str {
    match result {
        GameResult::WhiteWin => "W",
        GameResult::BlackWin => "B",
        GameResult::Tie => "T",
        GameResult::Unset => "",
    }
}

pub fn parse_result_code(raw: &str) -> Result<GameResult, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(GameResult::Unset),
        "w" | "white" | "1-0" => Ok(GameResult::WhiteWin),
        "b" | "black" | "0-1" => Ok(GameResult::BlackWin),
        "t" | "tie" | "d" | "draw" | "1/2-1/2" => Ok(GameResult::Tie),
        _ => Err(format!("result must be W, B, T or blank, got {:?}", raw.trim())),
    }
}

/// Blank cells count as zero. Spreadsheet floats such as `3.0` are accepted.
pub fn parse_count(raw: &str, label: &str) -> Result<u32, String> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(0);
    }
    if let Ok(count) = text.parse::<u32>() {
        return Ok(count);
    }

    match text.parse::<f64>() {
        Ok(value) if value < 0.0 => Err(format!("{label} cannot be negative, got {text:?}")),
        Ok(value) if value.is_finite() && value.fract() == 0.0 && value <= u32::MAX as f64 => {
            Ok(value as u32)
        }
        _ => Err(format!("{label} must be a whole number, got {text:?}")),
    }
}

fn parse_tally(correct: &str, incorrect: &str, side: &str) -> Result<HomeworkTally, String> {
    Ok(HomeworkTally {
        correct: parse_count(correct, &format!("{side} homework correct"))?,
        incorrect: parse_count(incorrect, &format!("{side} homework incorrect"))?,
    })
}

enum Entry {
    Game {
        row: usize,
        white: usize,
        black: usize,
        result: GameResult,
        white_homework: HomeworkTally,
        black_homework: HomeworkTally,
    },
    Bye {
        row: usize,
        student: usize,
        homework: HomeworkTally,
    },
    Pending {
        white: usize,
        black: usize,
        entry: PendingMatch,
    },
}

impl Entry {
    fn students(&self) -> Vec<usize> {
        match self {
            Entry::Game { white, black, .. } | Entry::Pending { white, black, .. } => {
                vec![*white, *black]
            }
            Entry::Bye { student, .. } => vec![*student],
        }
    }
}

/// Applies a completed match sheet to a roster snapshot.
///
/// Every row is validated before any counter moves, so a single bad row leaves
/// the whole roster untouched. Rows with no result yet come back as pending.
pub fn apply(rows: &[MatchRow], roster: &[StudentRecord]) -> Result<ApplyOutcome, PairingError> {
    let index: HashMap<&str, usize> = roster
        .iter()
        .enumerate()
        .map(|(position, record)| (record.name.trim(), position))
        .collect();

    let mut entries = Vec::with_capacity(rows.len());
    let mut seen: HashMap<usize, usize> = HashMap::new();
    for (offset, row) in rows.iter().enumerate() {
        let row_number = offset + 1;
        if row.is_blank() {
            continue;
        }
        let entry = parse_row(row, row_number, &index)
            .map_err(|reason| PairingError::result_row(row_number, reason))?;

        for student in entry.students() {
            if let Some(first) = seen.insert(student, row_number) {
                return Err(PairingError::result_row(
                    row_number,
                    format!("{:?} already appears in row {first}", roster[student].name),
                ));
            }
        }
        entries.push(entry);
    }

    // Counters move on a copy; an overflow discards it with the error.
    let mut updated = roster.to_vec();
    let mut applied = 0usize;
    let mut byes = 0usize;
    let mut pending = Vec::new();

    for entry in entries {
        match entry {
            Entry::Game {
                row,
                white,
                black,
                result,
                white_homework,
                black_homework,
            } => {
                record_game(&mut updated, white, black, result, white_homework, black_homework)
                    .ok_or_else(|| overflow(row))?;
                applied += 1;
            }
            Entry::Bye {
                row,
                student,
                homework,
            } => {
                let record = &mut updated[student];
                bump(&mut record.byes, 1)
                    .and_then(|_| add_homework(record, homework))
                    .ok_or_else(|| overflow(row))?;
                byes += 1;
            }
            Entry::Pending { entry, .. } => {
                warn!(
                    row = entry.row,
                    white = %entry.white,
                    black = %entry.black,
                    "result still pending"
                );
                pending.push(entry);
            }
        }
    }

    info!(applied, byes, pending = pending.len(), "results applied");

    Ok(ApplyOutcome {
        roster: updated,
        applied,
        byes,
        pending,
    })
}

fn overflow(row: usize) -> PairingError {
    PairingError::result_row(row, "a roster count would exceed its maximum")
}

fn bump(counter: &mut u32, delta: u32) -> Option<()> {
    *counter = counter.checked_add(delta)?;
    Some(())
}

fn record_game(
    roster: &mut [StudentRecord],
    white: usize,
    black: usize,
    result: GameResult,
    white_homework: HomeworkTally,
    black_homework: HomeworkTally,
) -> Option<()> {
    match result {
        GameResult::WhiteWin => {
            bump(&mut roster[white].wins, 1)?;
            bump(&mut roster[black].losses, 1)?;
        }
        GameResult::BlackWin => {
            bump(&mut roster[black].wins, 1)?;
            bump(&mut roster[white].losses, 1)?;
        }
        GameResult::Tie => {
            bump(&mut roster[white].ties, 1)?;
            bump(&mut roster[black].ties, 1)?;
        }
        GameResult::Unset => {}
    }
    bump(&mut roster[white].white_games_played, 1)?;
    bump(&mut roster[black].black_games_played, 1)?;
    add_homework(&mut roster[white], white_homework)?;
    add_homework(&mut roster[black], black_homework)
}

fn add_homework(record: &mut StudentRecord, tally: HomeworkTally) -> Option<()> {
    bump(&mut record.homework_correct, tally.correct)?;
    bump(&mut record.homework_incorrect, tally.incorrect)
}

fn parse_row(
    row: &MatchRow,
    row_number: usize,
    index: &HashMap<&str, usize>,
) -> Result<Entry, String> {
    let white_name = row.white_player.trim();
    let black_name = row.black_player.trim();

    if white_name.is_empty() {
        return Err("cannot record results without a white player".to_string());
    }
    let lookup = |name: &str| {
        index
            .get(name)
            .copied()
            .ok_or_else(|| format!("player {name:?} is not on the roster"))
    };
    let white = lookup(white_name)?;
    let white_homework = parse_tally(
        &row.white_homework_correct,
        &row.white_homework_incorrect,
        "white",
    )?;

    if black_name.is_empty() {
        let code = row.who_won.trim();
        if !code.is_empty() && !code.eq_ignore_ascii_case(BYE_NOTE) {
            return Err(format!("bye row cannot carry a result, got {code:?}"));
        }
        if !row.black_homework_correct.trim().is_empty()
            || !row.black_homework_incorrect.trim().is_empty()
        {
            return Err("bye row cannot carry black homework".to_string());
        }
        return Ok(Entry::Bye {
            row: row_number,
            student: white,
            homework: white_homework,
        });
    }

    if white_name == black_name {
        return Err(format!("{white_name:?} cannot play against themselves"));
    }
    let black = lookup(black_name)?;
    let black_homework = parse_tally(
        &row.black_homework_correct,
        &row.black_homework_incorrect,
        "black",
    )?;

    match parse_result_code(&row.who_won)? {
        GameResult::Unset => Ok(Entry::Pending {
            white,
            black,
            entry: PendingMatch {
                row: row_number,
                white: white_name.to_string(),
                black: black_name.to_string(),
            },
        }),
        result => Ok(Entry::Game {
            row: row_number,
            white,
            black,
            result,
            white_homework,
            black_homework,
        }),
    }
}
