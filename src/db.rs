use anyhow::Context;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::csv_store;
use crate::models::{RoundPairings, StudentRecord};
use crate::pairing::RecentOpponents;
use crate::repository::RosterRepository;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// One classroom's roster and round history in Postgres.
#[derive(Debug, Clone)]
pub struct PgRoster {
    pool: PgPool,
    classroom: String,
}

impl PgRoster {
    pub fn new(pool: PgPool, classroom: impl Into<String>) -> Self {
        Self {
            pool,
            classroom: classroom.into(),
        }
    }
}

fn to_db(count: u32) -> anyhow::Result<i32> {
    i32::try_from(count).context("count too large to store")
}

fn count_column(row: &PgRow, column: &str) -> anyhow::Result<u32> {
    let value: i32 = row.try_get(column)?;
    u32::try_from(value).with_context(|| format!("negative {column} stored"))
}

fn student_from_row(row: &PgRow) -> anyhow::Result<StudentRecord> {
    Ok(StudentRecord {
        name: row.try_get("name")?,
        wins: count_column(row, "wins")?,
        losses: count_column(row, "losses")?,
        ties: count_column(row, "ties")?,
        homework_correct: count_column(row, "homework_correct")?,
        homework_incorrect: count_column(row, "homework_incorrect")?,
        white_games_played: count_column(row, "white_games_played")?,
        black_games_played: count_column(row, "black_games_played")?,
        byes: count_column(row, "byes")?,
        absent: row.try_get("absent")?,
        notes: row.try_get("notes")?,
    })
}

impl RosterRepository for PgRoster {
    async fn load_roster(&self) -> anyhow::Result<Vec<StudentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT name, wins, losses, ties, homework_correct, homework_incorrect,
                   white_games_played, black_games_played, byes, absent, notes
            FROM chess_pairing.students
            WHERE classroom = $1
            ORDER BY name
            "#,
        )
        .bind(&self.classroom)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(student_from_row).collect()
    }

    async fn save_roster(&self, roster: &[StudentRecord]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        for record in roster {
            sqlx::query(
                r#"
                INSERT INTO chess_pairing.students
                (id, classroom, name, wins, losses, ties, homework_correct, homework_incorrect,
                 white_games_played, black_games_played, byes, absent, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (classroom, name) DO UPDATE
                SET wins = EXCLUDED.wins,
                    losses = EXCLUDED.losses,
                    ties = EXCLUDED.ties,
                    homework_correct = EXCLUDED.homework_correct,
                    homework_incorrect = EXCLUDED.homework_incorrect,
                    white_games_played = EXCLUDED.white_games_played,
                    black_games_played = EXCLUDED.black_games_played,
                    byes = EXCLUDED.byes,
                    absent = EXCLUDED.absent,
                    notes = EXCLUDED.notes,
                    updated_at = NOW()
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&self.classroom)
            .bind(&record.name)
            .bind(to_db(record.wins)?)
            .bind(to_db(record.losses)?)
            .bind(to_db(record.ties)?)
            .bind(to_db(record.homework_correct)?)
            .bind(to_db(record.homework_incorrect)?)
            .bind(to_db(record.white_games_played)?)
            .bind(to_db(record.black_games_played)?)
            .bind(to_db(record.byes)?)
            .bind(record.absent)
            .bind(&record.notes)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to save {}", record.name))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn recent_opponents(&self) -> anyhow::Result<RecentOpponents> {
        let rows = sqlx::query(
            r#"
            WITH ranked AS (
                SELECT id, ROW_NUMBER() OVER (ORDER BY created_at DESC, id DESC) AS distance
                FROM chess_pairing.rounds
                WHERE classroom = $1
            )
            SELECT m.white_name, m.black_name, ranked.distance
            FROM chess_pairing.round_matches m
            JOIN ranked ON ranked.id = m.round_id
            WHERE m.black_name IS NOT NULL
            "#,
        )
        .bind(&self.classroom)
        .fetch_all(&self.pool)
        .await?;

        let mut history = RecentOpponents::default();
        for row in rows {
            let white: String = row.try_get("white_name")?;
            let black: String = row.try_get("black_name")?;
            let distance: i64 = row.try_get("distance")?;
            history.record(&white, &black, u32::try_from(distance).unwrap_or(u32::MAX));
        }

        Ok(history)
    }

    async fn record_round(&self, round: &RoundPairings) -> anyhow::Result<()> {
        let round_id = Uuid::new_v4();
        let seed = round
            .seed
            .map(i64::try_from)
            .transpose()
            .context("seed too large to store")?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chess_pairing.rounds
            (id, classroom, win_weight, homework_weight, seed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(round_id)
        .bind(&self.classroom)
        .bind(round.win_weight)
        .bind(round.homework_weight)
        .bind(seed)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let boards = round
            .pairings
            .iter()
            .map(|pairing| (&pairing.white, Some(&pairing.black)))
            .chain(round.bye.iter().map(|seat| (seat, None)));

        for (board, (white, black)) in boards.enumerate() {
            sqlx::query(
                r#"
                INSERT INTO chess_pairing.round_matches
                (id, round_id, board, white_name, white_strength, black_name, black_strength)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(round_id)
            .bind(i32::try_from(board + 1)?)
            .bind(&white.name)
            .bind(white.strength)
            .bind(black.map(|seat| seat.name.as_str()))
            .bind(black.map(|seat| seat.strength))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let roster = vec![
        StudentRecord {
            wins: 3,
            losses: 1,
            homework_correct: 8,
            homework_incorrect: 2,
            white_games_played: 2,
            black_games_played: 2,
            ..StudentRecord::new("Avery Lee")
        },
        StudentRecord {
            wins: 2,
            losses: 1,
            ties: 1,
            homework_correct: 6,
            homework_incorrect: 4,
            white_games_played: 3,
            black_games_played: 1,
            ..StudentRecord::new("Jules Moreno")
        },
        StudentRecord {
            wins: 1,
            losses: 2,
            ties: 1,
            homework_correct: 9,
            homework_incorrect: 1,
            white_games_played: 1,
            black_games_played: 3,
            ..StudentRecord::new("Kiara Patel")
        },
        StudentRecord {
            wins: 1,
            losses: 3,
            homework_correct: 5,
            homework_incorrect: 5,
            white_games_played: 2,
            black_games_played: 2,
            byes: 1,
            ..StudentRecord::new("Rowan Brooks")
        },
        StudentRecord {
            losses: 2,
            homework_correct: 3,
            homework_incorrect: 3,
            white_games_played: 1,
            black_games_played: 1,
            notes: "joined mid-term".to_string(),
            ..StudentRecord::new("Sam Okafor")
        },
    ];

    PgRoster::new(pool.clone(), "demo")
        .save_roster(&roster)
        .await?;
    Ok(roster.len())
}

pub async fn import_csv(
    pool: &PgPool,
    classroom: &str,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let roster = csv_store::read_roster(csv_path)?;
    PgRoster::new(pool.clone(), classroom)
        .save_roster(&roster)
        .await?;
    Ok(roster.len())
}
