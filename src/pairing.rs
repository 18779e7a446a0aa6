use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::color::{preferred_color, Color, ColorPreference};
use crate::error::PairingError;
use crate::models::{Pairing, RoundPairings, Seat, StudentRecord};
use crate::strength::{strength, Weights};

pub const DEFAULT_REMATCH_WINDOW: u32 = 2;

/// How far down the ranking a student may look for an opponent.
const CANDIDATE_LOOKAHEAD: usize = 5;
const REMATCH_PENALTY: f64 = 1000.0;

/// Inputs for generating one round.
#[derive(Debug, Clone)]
pub struct RoundConfig {
    pub weights: Weights,
    pub seed: Option<u64>,
    /// Names sitting out on top of any record already flagged absent.
    pub absent: Vec<String>,
    /// Rounds within which a repeat meeting is penalized; 0 disables it.
    pub rematch_window: u32,
}

impl RoundConfig {
    pub fn new(win_weight: f64, homework_weight: f64) -> Result<Self, PairingError> {
        Ok(Self {
            weights: Weights::new(win_weight, homework_weight)?,
            seed: None,
            absent: Vec::new(),
            rematch_window: DEFAULT_REMATCH_WINDOW,
        })
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_absent(mut self, absent: Vec<String>) -> Self {
        self.absent = absent;
        self
    }

    pub fn with_rematch_window(mut self, window: u32) -> Self {
        self.rematch_window = window;
        self
    }
}

/// Reads a seed as typed by a teacher. Blank means no seed.
pub fn parse_seed(raw: &str) -> Result<Option<u64>, PairingError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| PairingError::config(format!("seed must be a non-negative integer, got {raw:?}")))
}

/// Distance, in rounds, since each pair of students last met (1 = the latest round).
#[derive(Debug, Clone, Default)]
pub struct RecentOpponents {
    rounds_since: HashMap<(String, String), u32>,
}

impl RecentOpponents {
    pub fn record(&mut self, a: &str, b: &str, rounds_ago: u32) {
        let entry = self.rounds_since.entry(meeting_key(a, b)).or_insert(rounds_ago);
        *entry = (*entry).min(rounds_ago);
    }

    pub fn rounds_since(&self, a: &str, b: &str) -> Option<u32> {
        self.rounds_since.get(&meeting_key(a, b)).copied()
    }

    pub fn meetings(&self) -> usize {
        self.rounds_since.len()
    }
}

fn meeting_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

struct Contender<'a> {
    record: &'a StudentRecord,
    strength: f64,
    preference: ColorPreference,
}

impl Contender<'_> {
    fn seat(&self) -> Seat {
        Seat {
            name: self.record.name.clone(),
            strength: self.strength,
        }
    }
}

/// Source for every decision the ranking alone cannot settle.
enum TieBreak {
    Alphabetical,
    Seeded(StdRng),
}

impl TieBreak {
    fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => TieBreak::Seeded(StdRng::seed_from_u64(seed)),
            None => TieBreak::Alphabetical,
        }
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        if let TieBreak::Seeded(rng) = self {
            items.shuffle(rng);
        }
    }

    /// True when the higher-ranked student should take White.
    fn higher_takes_white(&mut self) -> bool {
        match self {
            TieBreak::Alphabetical => true,
            TieBreak::Seeded(rng) => rng.gen_bool(0.5),
        }
    }
}

/// Pairs the present students of a roster for one round.
pub fn pair(
    roster: &[StudentRecord],
    config: &RoundConfig,
    history: &RecentOpponents,
) -> Result<RoundPairings, PairingError> {
    let excluded: HashSet<&str> = config
        .absent
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();

    for name in &excluded {
        if !roster.iter().any(|record| record.name == *name) {
            warn!(student = %name, "absent student is not on the roster");
        }
    }

    let (absent, present): (Vec<&StudentRecord>, Vec<&StudentRecord>) = roster
        .iter()
        .partition(|record| record.absent || excluded.contains(record.name.as_str()));

    for record in &absent {
        debug!(student = %record.name, "excluded from pairing as absent");
    }

    if present.is_empty() {
        return Err(PairingError::EmptyRoster);
    }

    let mut tie_break = TieBreak::new(config.seed);
    let mut pool = rank(present, &config.weights, &mut tie_break);

    let bye = if pool.len() % 2 == 1 {
        let sitting_out = take_bye(&mut pool);
        debug!(
            student = %sitting_out.record.name,
            strength = sitting_out.strength,
            prior_byes = sitting_out.record.byes,
            "bye assigned"
        );
        Some(sitting_out.seat())
    } else {
        None
    };

    let pairings = match_pool(pool, history, config.rematch_window, &mut tie_break);

    info!(
        pairings = pairings.len(),
        bye = bye.as_ref().map(|seat| seat.name.as_str()).unwrap_or("none"),
        absent = absent.len(),
        "round paired"
    );

    Ok(RoundPairings {
        win_weight: config.weights.win(),
        homework_weight: config.weights.homework(),
        seed: config.seed,
        pairings,
        bye,
        absent: absent.iter().map(|record| record.name.clone()).collect(),
    })
}

/// Strongest first. Equal strengths keep name order, reshuffled when seeded.
fn rank<'a>(
    present: Vec<&'a StudentRecord>,
    weights: &Weights,
    tie_break: &mut TieBreak,
) -> Vec<Contender<'a>> {
    let mut pool: Vec<Contender<'a>> = present
        .into_iter()
        .map(|record| Contender {
            record,
            strength: strength(record, weights),
            preference: preferred_color(record),
        })
        .collect();

    pool.sort_by(|a, b| a.record.name.cmp(&b.record.name));
    tie_break.shuffle(&mut pool);
    pool.sort_by(|a, b| b.strength.total_cmp(&a.strength));

    for (position, contender) in pool.iter().enumerate() {
        debug!(
            rank = position + 1,
            student = %contender.record.name,
            strength = contender.strength,
            "ranked"
        );
    }

    pool
}

/// Fewest byes first, then weakest, then lowest ranked.
fn take_bye<'a>(pool: &mut Vec<Contender<'a>>) -> Contender<'a> {
    let index = pool
        .iter()
        .enumerate()
        .rev()
        .min_by(|(_, a), (_, b)| {
            a.record
                .byes
                .cmp(&b.record.byes)
                .then(a.strength.total_cmp(&b.strength))
        })
        .map(|(index, _)| index)
        .unwrap_or(pool.len() - 1);

    pool.remove(index)
}

fn match_pool(
    mut pool: Vec<Contender<'_>>,
    history: &RecentOpponents,
    window: u32,
    tie_break: &mut TieBreak,
) -> Vec<Pairing> {
    let mut pairings = Vec::with_capacity(pool.len() / 2);

    while pool.len() >= 2 {
        let top = pool.remove(0);
        let (offset, cost) = pick_opponent(&top, &pool, history, window);
        let opponent = pool.remove(offset);

        if cost.rematch_penalty > 0.0 {
            warn!(
                first = %top.record.name,
                second = %opponent.record.name,
                "recent rematch could not be avoided"
            );
        }

        let pairing = seat_pair(&top, &opponent, tie_break);
        debug!(
            white = %pairing.white.name,
            black = %pairing.black.name,
            gap = pairing.rating_gap(),
            "paired"
        );
        pairings.push(pairing);
    }

    pairings
}

struct PairingCost {
    total: f64,
    rematch_penalty: f64,
}

/// Cheapest opponent among the next few in rank. Without history this is always the adjacent one.
fn pick_opponent(
    top: &Contender<'_>,
    candidates: &[Contender<'_>],
    history: &RecentOpponents,
    window: u32,
) -> (usize, PairingCost) {
    candidates
        .iter()
        .take(CANDIDATE_LOOKAHEAD)
        .enumerate()
        .map(|(offset, candidate)| (offset, pairing_cost(top, candidate, history, window)))
        .min_by(|(_, a), (_, b)| a.total.total_cmp(&b.total))
        .unwrap_or((
            0,
            PairingCost {
                total: 0.0,
                rematch_penalty: 0.0,
            },
        ))
}

fn pairing_cost(
    a: &Contender<'_>,
    b: &Contender<'_>,
    history: &RecentOpponents,
    window: u32,
) -> PairingCost {
    let gap = (a.strength - b.strength).abs();
    let rematch_penalty = match history.rounds_since(&a.record.name, &b.record.name) {
        Some(rounds) if window > 0 && rounds <= window => REMATCH_PENALTY / rounds.max(1) as f64,
        _ => 0.0,
    };

    PairingCost {
        total: 2.0 * gap + rematch_penalty,
        rematch_penalty,
    }
}

/// The higher-ranked student's preference decides; the other side follows it.
fn seat_pair(higher: &Contender<'_>, lower: &Contender<'_>, tie_break: &mut TieBreak) -> Pairing {
    let higher_color = match (higher.preference.color(), lower.preference.color()) {
        (Some(color), _) => color,
        (None, Some(color)) => color.opposite(),
        (None, None) => {
            if tie_break.higher_takes_white() {
                Color::White
            } else {
                Color::Black
            }
        }
    };

    match higher_color {
        Color::White => Pairing::new(higher.seat(), lower.seat()),
        Color::Black => Pairing::new(lower.seat(), higher.seat()),
    }
}
