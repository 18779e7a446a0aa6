use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::{RoundPairings, StudentRecord};
use crate::repository::RosterRepository;
use crate::results::{parse_count, MatchRow};

/// Roster kept in the classroom spreadsheet.
#[derive(Debug, Clone)]
pub struct CsvRoster {
    path: PathBuf,
}

impl CsvRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RosterRepository for CsvRoster {
    async fn load_roster(&self) -> anyhow::Result<Vec<StudentRecord>> {
        read_roster(&self.path)
    }

    async fn save_roster(&self, roster: &[StudentRecord]) -> anyhow::Result<()> {
        write_roster(&self.path, roster)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RosterRow {
    #[serde(rename = "Student Name")]
    name: String,
    #[serde(rename = "Total Wins", default, deserialize_with = "count")]
    wins: u32,
    #[serde(rename = "Total Losses", default, deserialize_with = "count")]
    losses: u32,
    #[serde(rename = "Total Ties", default, deserialize_with = "count")]
    ties: u32,
    #[serde(rename = "# Times Played White", default, deserialize_with = "count")]
    white_games_played: u32,
    #[serde(rename = "# Times Played Black", default, deserialize_with = "count")]
    black_games_played: u32,
    #[serde(rename = "Correct Homework", default, deserialize_with = "count")]
    homework_correct: u32,
    #[serde(rename = "Incorrect Homework", default, deserialize_with = "count")]
    homework_incorrect: u32,
    #[serde(rename = "Byes", default, deserialize_with = "count")]
    byes: u32,
    #[serde(
        rename = "Absent",
        default,
        deserialize_with = "flag",
        serialize_with = "flag_cell"
    )]
    absent: bool,
    #[serde(rename = "Notes", default)]
    notes: String,
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_count(&raw, "count").map_err(D::Error::custom)
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on" | "x" | "absent"
    ))
}

fn flag_cell<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "yes" } else { "" })
}

impl From<RosterRow> for StudentRecord {
    fn from(row: RosterRow) -> Self {
        Self {
            name: row.name.trim().to_string(),
            wins: row.wins,
            losses: row.losses,
            ties: row.ties,
            homework_correct: row.homework_correct,
            homework_incorrect: row.homework_incorrect,
            white_games_played: row.white_games_played,
            black_games_played: row.black_games_played,
            byes: row.byes,
            absent: row.absent,
            notes: row.notes,
        }
    }
}

impl From<&StudentRecord> for RosterRow {
    fn from(record: &StudentRecord) -> Self {
        Self {
            name: record.name.clone(),
            wins: record.wins,
            losses: record.losses,
            ties: record.ties,
            white_games_played: record.white_games_played,
            black_games_played: record.black_games_played,
            homework_correct: record.homework_correct,
            homework_incorrect: record.homework_incorrect,
            byes: record.byes,
            absent: record.absent,
            notes: record.notes.clone(),
        }
    }
}

fn reader(path: &Path) -> anyhow::Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))
}

fn writer(path: &Path) -> anyhow::Result<csv::Writer<std::fs::File>> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))
}

pub fn read_roster(path: &Path) -> anyhow::Result<Vec<StudentRecord>> {
    let mut reader = reader(path)?;
    let mut seen = HashSet::new();
    let mut roster = Vec::new();

    for (offset, result) in reader.deserialize::<RosterRow>().enumerate() {
        let row = result.with_context(|| format!("invalid roster row {}", offset + 1))?;
        let record = StudentRecord::from(row);
        if record.name.is_empty() {
            continue;
        }
        if !seen.insert(record.name.clone()) {
            bail!("duplicate student name detected: {}", record.name);
        }
        roster.push(record);
    }

    Ok(roster)
}

pub fn write_roster(path: &Path, roster: &[StudentRecord]) -> anyhow::Result<()> {
    let mut writer = writer(path)?;
    for record in roster {
        writer.serialize(RosterRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the sheet teachers fill in: one row per game, then the bye.
pub fn write_match_sheet(path: &Path, round: &RoundPairings) -> anyhow::Result<()> {
    let mut writer = writer(path)?;
    for pairing in &round.pairings {
        writer.serialize(MatchRow::from_pairing(pairing))?;
    }
    if let Some(bye) = &round.bye {
        writer.serialize(MatchRow::bye(bye))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_match_sheet(path: &Path) -> anyhow::Result<Vec<MatchRow>> {
    let mut reader = reader(path)?;
    reader
        .deserialize::<MatchRow>()
        .enumerate()
        .map(|(offset, result)| result.with_context(|| format!("invalid match row {}", offset + 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pairing, Seat};

    fn seat(name: &str, strength: f64) -> Seat {
        Seat {
            name: name.to_string(),
            strength,
        }
    }

    #[test]
    fn roster_survives_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("class").join("Student_Information.csv");
        let roster = vec![
            StudentRecord {
                wins: 3,
                losses: 1,
                homework_correct: 8,
                homework_incorrect: 2,
                white_games_played: 2,
                black_games_played: 2,
                byes: 1,
                notes: "prefers rapid".to_string(),
                ..StudentRecord::new("Avery Lee")
            },
            StudentRecord {
                absent: true,
                ..StudentRecord::new("Jules Moreno")
            },
        ];

        write_roster(&path, &roster).unwrap();

        assert_eq!(read_roster(&path).unwrap(), roster);
    }

    #[test]
    fn reads_sparse_classroom_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        std::fs::write(
            &path,
            "Student Name , Total Wins,Total Losses,Total Ties,# Times Played White,# Times Played Black,Correct Homework,Incorrect Homework\n\
             Avery Lee,3,1,,2,2.0,8,2\n\
             ,,,,,,,\n\
             Kiara Patel,,,,,,,\n",
        )
        .unwrap();

        let roster = read_roster(&path).unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].wins, 3);
        assert_eq!(roster[0].ties, 0);
        assert_eq!(roster[0].black_games_played, 2);
        assert_eq!(roster[0].byes, 0);
        assert!(!roster[0].absent);
        assert_eq!(roster[1], StudentRecord::new("Kiara Patel"));
    }

    #[test]
    fn rejects_duplicate_names_and_bad_counts() {
        let dir = tempfile::tempdir().unwrap();
        let duplicate = dir.path().join("duplicate.csv");
        std::fs::write(&duplicate, "Student Name,Total Wins\nAvery Lee,1\nAvery Lee,2\n").unwrap();
        assert!(read_roster(&duplicate).is_err());

        let negative = dir.path().join("negative.csv");
        std::fs::write(&negative, "Student Name,Total Wins\nAvery Lee,-1\n").unwrap();
        assert!(read_roster(&negative).is_err());
    }

    #[test]
    fn match_sheet_uses_the_documented_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("next_matches.csv");
        let round = RoundPairings {
            win_weight: 0.7,
            homework_weight: 0.3,
            seed: None,
            pairings: vec![Pairing::new(seat("Avery Lee", 0.765), seat("Jules Moreno", 0.6))],
            bye: Some(seat("Kiara Patel", 0.2)),
            absent: Vec::new(),
        };

        write_match_sheet(&path, &round).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "White Player,White Player Strength,Black Player,Black Player Strength,Who Won,\
             White Homework Correct,White Homework Incorrect,Black Homework Correct,\
             Black Homework Incorrect,Notes"
        );

        let rows = read_match_sheet(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].white_player, "Avery Lee");
        assert_eq!(rows[0].white_strength, "0.765");
        assert_eq!(rows[0].black_strength, "0.600");
        assert_eq!(rows[1].white_player, "Kiara Patel");
        assert_eq!(rows[1].black_player, "");
        assert_eq!(rows[1].notes, "bye");
    }
}
