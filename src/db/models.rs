use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team's season win-loss-tie record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl TeamRecord {
    pub fn new(wins: u32, losses: u32, ties: u32) -> Self {
        TeamRecord { wins, losses, ties }
    }

    pub fn games_played(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Win percentage with ties counted as half a win.
    /// Returns 0.0 for a team that has not played.
    pub fn win_pct(&self) -> f64 {
        let games = self.games_played();
        if games == 0 {
            return 0.0;
        }
        (self.wins as f64 + 0.5 * self.ties as f64) / games as f64
    }
}

/// Immutable team snapshot as supplied by the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Provider team ID (ESPN numeric ID as a string)
    pub id: String,
    pub name: String,
    pub record: TeamRecord,
}

impl Team {
    pub fn new(id: impl Into<String>, name: impl Into<String>, record: TeamRecord) -> Self {
        Team {
            id: id.into(),
            name: name.into(),
            record,
        }
    }
}

/// Game scheduling status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Final,
    Other,
}

impl GameStatus {
    /// Parse the provider's status string (e.g. "STATUS_SCHEDULED").
    pub fn parse(s: &str) -> Self {
        match s {
            "STATUS_SCHEDULED" => GameStatus::Scheduled,
            "STATUS_IN_PROGRESS" => GameStatus::InProgress,
            "STATUS_FINAL" => GameStatus::Final,
            _ => GameStatus::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "STATUS_SCHEDULED",
            GameStatus::InProgress => "STATUS_IN_PROGRESS",
            GameStatus::Final => "STATUS_FINAL",
            GameStatus::Other => "STATUS_OTHER",
        }
    }
}

/// Weather snapshot attached to an outdoor matchup.
///
/// Indoor games carry `NotNeeded`; games where the weather service had no
/// reading carry `Unavailable`. Only `Observed` contributes signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Weather {
    NotNeeded,
    Unavailable,
    Observed {
        conditions: String,
        /// Precomputed impact on total score in points (negative = suppressed scoring)
        total_score_impact: f64,
    },
}

/// A single upcoming (or live/finished) game — the unit of work for one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    /// Provider game ID
    pub game_id: String,
    pub home_team: Team,
    pub away_team: Team,
    pub status: GameStatus,
    /// Missing weather is treated the same as `NotNeeded`
    pub weather: Option<Weather>,
}

/// A historical game row from the store, with final scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedGame {
    pub game_id: String,
    pub game_date: DateTime<Utc>,
    pub home_team_id: String,
    pub home_team_name: String,
    pub away_team_id: String,
    pub away_team_name: String,
    pub status: GameStatus,
    pub home_score: i32,
    pub away_score: i32,
    pub weather: Option<Weather>,
}

impl CompletedGame {
    /// A game counts as completed when the provider marked it final or a
    /// nonzero score was recorded on either side.
    pub fn is_completed(&self) -> bool {
        self.status == GameStatus::Final || self.home_score > 0 || self.away_score > 0
    }
}

/// One weighted, confidence-scored signal about a matchup.
///
/// `value` is in points, positive favoring the home team. `weight` comes
/// from the engine's factor-weight configuration; calculators only supply
/// value, confidence, and explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub value: f64,
    pub weight: f64,
    /// Data-quality trust in [0, 1]
    pub confidence: f64,
    pub explanation: String,
}

/// A finished prediction for one matchup. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub predicted_winner: String,
    /// Win confidence as a percentage in [50, 85]
    pub confidence: f64,
    /// Predicted point spread, positive favoring home
    pub spread: f64,
    /// All seven factors, in canonical order
    pub factors: Vec<Factor>,
    pub algorithm_version: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_pct_counts_ties_as_half() {
        let rec = TeamRecord::new(8, 6, 2);
        assert!((rec.win_pct() - 9.0 / 16.0).abs() < 1e-12);
        assert_eq!(rec.games_played(), 16);
    }

    #[test]
    fn win_pct_of_empty_record_is_zero() {
        assert_eq!(TeamRecord::default().win_pct(), 0.0);
    }

    #[test]
    fn status_string_round_trip() {
        for s in ["STATUS_SCHEDULED", "STATUS_IN_PROGRESS", "STATUS_FINAL"] {
            assert_eq!(GameStatus::parse(s).as_str(), s);
        }
        assert_eq!(GameStatus::parse("STATUS_POSTPONED"), GameStatus::Other);
    }

    #[test]
    fn completed_predicate_accepts_final_or_scored_games() {
        let mut game = CompletedGame {
            game_id: "g1".into(),
            game_date: Utc::now(),
            home_team_id: "2".into(),
            home_team_name: "Buffalo Bills".into(),
            away_team_id: "15".into(),
            away_team_name: "Miami Dolphins".into(),
            status: GameStatus::Scheduled,
            home_score: 0,
            away_score: 0,
            weather: None,
        };
        assert!(!game.is_completed());
        game.status = GameStatus::Final;
        assert!(game.is_completed());
        game.status = GameStatus::Scheduled;
        game.away_score = 3;
        assert!(game.is_completed());
    }

    #[test]
    fn weather_json_round_trip() {
        let w = Weather::Observed {
            conditions: "rain".into(),
            total_score_impact: -3.0,
        };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("\"status\":\"observed\""));
        assert_eq!(serde_json::from_str::<Weather>(&json).unwrap(), w);
    }
}
