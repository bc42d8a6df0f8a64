use anyhow::Result;

use crate::db::models::{CompletedGame, Matchup};

/// Narrow capability surface the engine-facing tools need from whatever
/// data layer exists. Concrete adapters (the SQLite store, test fixtures)
/// implement this; the core never sees HTTP clients or rate limiting.
pub trait GameSource {
    /// Upcoming matchups eligible for prediction.
    fn fetch_matchups(&self) -> Result<Vec<Matchup>>;

    /// Previously observed games with final scores, most recent first.
    fn fetch_historical_games(&self) -> Result<Vec<CompletedGame>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// In-memory source backed by plain vectors. Used by tests and for
/// replaying exported corpora without a database.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub matchups: Vec<Matchup>,
    pub games: Vec<CompletedGame>,
}

impl InMemorySource {
    pub fn with_games(games: Vec<CompletedGame>) -> Self {
        InMemorySource {
            matchups: Vec::new(),
            games,
        }
    }
}

impl GameSource for InMemorySource {
    fn fetch_matchups(&self) -> Result<Vec<Matchup>> {
        Ok(self.matchups.clone())
    }

    fn fetch_historical_games(&self) -> Result<Vec<CompletedGame>> {
        Ok(self.games.clone())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
