use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod color;
mod csv_store;
mod db;
mod error;
mod models;
mod pairing;
mod report;
mod repository;
mod results;
mod strength;

use crate::csv_store::CsvRoster;
use crate::db::PgRoster;
use crate::pairing::{RecentOpponents, RoundConfig, DEFAULT_REMATCH_WINDOW};
use crate::repository::RosterRepository;
use crate::strength::{DEFAULT_HOMEWORK_WEIGHT, DEFAULT_WIN_WEIGHT};

#[derive(Parser)]
#[command(name = "chess-pairing")]
#[command(about = "Balanced practice-round pairings for classroom chess", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo classroom
    Seed,
    /// Import a roster sheet into a classroom
    Import {
        #[arg(long)]
        classroom: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Export a classroom to a roster sheet
    Export {
        #[arg(long)]
        classroom: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate the next round of pairings
    #[command(group(
        ArgGroup::new("source")
            .args(["roster", "classroom"])
            .required(true)
            .multiple(false)
    ))]
    Pair {
        #[arg(long)]
        roster: Option<PathBuf>,
        #[arg(long)]
        classroom: Option<String>,
        #[arg(long, default_value = "next_matches.csv")]
        out: PathBuf,
        /// Student sitting out this round (repeatable)
        #[arg(long)]
        absent: Vec<String>,
        #[arg(long)]
        seed: Option<String>,
        #[arg(long, default_value_t = DEFAULT_WIN_WEIGHT)]
        win_weight: f64,
        #[arg(long, default_value_t = DEFAULT_HOMEWORK_WEIGHT)]
        homework_weight: f64,
        /// Rounds within which rematches are avoided; 0 turns it off
        #[arg(long, default_value_t = DEFAULT_REMATCH_WINDOW)]
        rematch_window: u32,
        /// Also write a markdown report
        #[arg(long)]
        report: Option<PathBuf>,
        /// Print the round as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply a completed match sheet to the roster
    #[command(group(
        ArgGroup::new("source")
            .args(["roster", "classroom"])
            .required(true)
            .multiple(false)
    ))]
    Apply {
        #[arg(long)]
        roster: Option<PathBuf>,
        #[arg(long)]
        classroom: Option<String>,
        #[arg(long, default_value = "next_matches.csv")]
        results: PathBuf,
        /// Write the updated roster here instead of back to its source
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

struct PairRequest {
    classroom: Option<String>,
    config: RoundConfig,
    out: PathBuf,
    report: Option<PathBuf>,
    json: bool,
}

struct ApplyRequest {
    results: PathBuf,
    out: Option<PathBuf>,
    report: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PAIRING_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set for classroom commands")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn run_pair<R: RosterRepository>(repo: &R, request: PairRequest) -> anyhow::Result<()> {
    let roster = repo.load_roster().await?;
    let history = if request.config.rematch_window > 0 {
        repo.recent_opponents().await?
    } else {
        RecentOpponents::default()
    };
    info!(
        students = roster.len(),
        known_meetings = history.meetings(),
        "roster loaded"
    );

    let round = pairing::pair(&roster, &request.config, &history)?;
    csv_store::write_match_sheet(&request.out, &round)?;
    repo.record_round(&round).await?;

    println!("Processed {} players.", roster.len() - round.absent.len());
    println!("Created {} matches.", round.pairings.len());
    match &round.bye {
        Some(seat) => println!("Bye: {} (rating {:.3})", seat.name, seat.strength),
        None => println!("Bye: None"),
    }
    if !round.absent.is_empty() {
        println!("Absent: {}", round.absent.join(", "));
    }
    println!(
        "Weights used -> Wins: {:.3}, Homework: {:.3}",
        round.win_weight, round.homework_weight
    );
    println!("Pairings written to {}.", request.out.display());

    if let Some(path) = &request.report {
        let report = report::build_round_report(
            request.classroom.as_deref(),
            Utc::now().date_naive(),
            &round,
        );
        std::fs::write(path, report)?;
        println!("Report written to {}.", path.display());
    }

    if request.json {
        println!("{}", serde_json::to_string_pretty(&round)?);
    }

    Ok(())
}

async fn run_apply<R: RosterRepository>(repo: &R, request: ApplyRequest) -> anyhow::Result<()> {
    let roster = repo.load_roster().await?;
    let rows = csv_store::read_match_sheet(&request.results)?;
    let outcome = results::apply(&rows, &roster)?;

    match &request.out {
        Some(path) => csv_store::write_roster(path, &outcome.roster)?,
        None => repo.save_roster(&outcome.roster).await?,
    }

    println!(
        "Recorded {} games and {} byes from {}.",
        outcome.applied,
        outcome.byes,
        request.results.display()
    );
    if outcome.pending.is_empty() {
        println!("No results pending.");
    } else {
        println!("Pending results:");
        for entry in &outcome.pending {
            println!("- row {}: {} vs {}", entry.row, entry.white, entry.black);
        }
    }

    if let Some(path) = &request.report {
        let report = report::build_results_report(Utc::now().date_naive(), &outcome);
        std::fs::write(path, report)?;
        println!("Report written to {}.", path.display());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            let inserted = db::seed(&pool).await?;
            println!("Seeded {inserted} students into classroom demo.");
        }
        Commands::Import { classroom, csv } => {
            let pool = connect().await?;
            let imported = db::import_csv(&pool, &classroom, &csv).await?;
            println!("Imported {imported} students from {}.", csv.display());
        }
        Commands::Export { classroom, csv } => {
            let pool = connect().await?;
            let roster = PgRoster::new(pool, classroom).load_roster().await?;
            csv_store::write_roster(&csv, &roster)?;
            println!("Exported {} students to {}.", roster.len(), csv.display());
        }
        Commands::Pair {
            roster,
            classroom,
            out,
            absent,
            seed,
            win_weight,
            homework_weight,
            rematch_window,
            report,
            json,
        } => {
            let seed = match seed.as_deref() {
                Some(raw) => pairing::parse_seed(raw)?,
                None => None,
            };
            let config = RoundConfig::new(win_weight, homework_weight)?
                .with_seed(seed)
                .with_absent(absent)
                .with_rematch_window(rematch_window);
            let request = PairRequest {
                classroom: classroom.clone(),
                config,
                out,
                report,
                json,
            };

            match (roster, classroom) {
                (Some(path), _) => run_pair(&CsvRoster::new(path), request).await?,
                (None, Some(classroom)) => {
                    let pool = connect().await?;
                    run_pair(&PgRoster::new(pool, classroom), request).await?
                }
                (None, None) => bail!("pass --roster or --classroom"),
            }
        }
        Commands::Apply {
            roster,
            classroom,
            results,
            out,
            report,
        } => {
            let request = ApplyRequest {
                results,
                out,
                report,
            };

            match (roster, classroom) {
                (Some(path), _) => run_apply(&CsvRoster::new(path), request).await?,
                (None, Some(classroom)) => {
                    let pool = connect().await?;
                    run_apply(&PgRoster::new(pool, classroom), request).await?
                }
                (None, None) => bail!("pass --roster or --classroom"),
            }
        }
    }

    Ok(())
}
