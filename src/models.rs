use serde::{Deserialize, Serialize};

/// One student on a classroom roster. Names are unique within a roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub homework_correct: u32,
    pub homework_incorrect: u32,
    pub white_games_played: u32,
    pub black_games_played: u32,
    /// Byes received so far; feeds bye rotation.
    pub byes: u32,
    /// Sitting out the round being generated.
    pub absent: bool,
    pub notes: String,
}

impl StudentRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn games_played(&self) -> u64 {
        u64::from(self.wins) + u64::from(self.losses) + u64::from(self.ties)
    }

    pub fn homework_entries(&self) -> u64 {
        u64::from(self.homework_correct) + u64::from(self.homework_incorrect)
    }
}

/// One side of a pairing, with the strength it carried when the round was generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub name: String,
    pub strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    WhiteWin,
    BlackWin,
    Tie,
    Unset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeworkTally {
    pub correct: u32,
    pub incorrect: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pairing {
    pub white: Seat,
    pub black: Seat,
    pub result: GameResult,
    pub white_homework: HomeworkTally,
    pub black_homework: HomeworkTally,
}

impl Pairing {
    pub fn new(white: Seat, black: Seat) -> Self {
        Self {
            white,
            black,
            result: GameResult::Unset,
            white_homework: HomeworkTally::default(),
            black_homework: HomeworkTally::default(),
        }
    }

    pub fn rating_gap(&self) -> f64 {
        (self.white.strength - self.black.strength).abs()
    }
}

/// Output of one pairing run: ordered matchups, at most one bye, and the absence log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundPairings {
    pub win_weight: f64,
    pub homework_weight: f64,
    pub seed: Option<u64>,
    pub pairings: Vec<Pairing>,
    pub bye: Option<Seat>,
    pub absent: Vec<String>,
}

/// A result row left blank, reported back so the caller can chase it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMatch {
    pub row: usize,
    pub white: String,
    pub black: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyOutcome {
    pub roster: Vec<StudentRecord>,
    pub applied: usize,
    pub byes: usize,
    pub pending: Vec<PendingMatch>,
}
