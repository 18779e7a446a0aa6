use crate::models::{RoundPairings, StudentRecord};
use crate::pairing::RecentOpponents;

/// Where a classroom roster lives between rounds.
pub trait RosterRepository {
    async fn load_roster(&self) -> anyhow::Result<Vec<StudentRecord>>;

    async fn save_roster(&self, roster: &[StudentRecord]) -> anyhow::Result<()>;

    /// Stores without round history never steer around rematches.
    async fn recent_opponents(&self) -> anyhow::Result<RecentOpponents> {
        Ok(RecentOpponents::default())
    }

    async fn record_round(&self, _round: &RoundPairings) -> anyhow::Result<()> {
        Ok(())
    }
}
