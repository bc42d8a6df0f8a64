use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub mod models;
use models::*;

use crate::sources::GameSource;

/// How many stored games a single fetch materialises.
const GAME_FETCH_LIMIT: i64 = 500;

/// Thread-safe SQLite connection (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Teams ─────────────────────────────────────────────────────────────────

    /// Upsert a team's current record
    pub fn upsert_team(&self, team: &Team) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO teams (team_id, name, wins, losses, ties, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6)
             ON CONFLICT(team_id) DO UPDATE SET
                name=excluded.name,
                wins=excluded.wins,
                losses=excluded.losses,
                ties=excluded.ties,
                updated_at=excluded.updated_at",
            params![
                team.id,
                team.name,
                team.record.wins,
                team.record.losses,
                team.record.ties,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    /// Look up a team; a name-only snapshot with an empty record when the
    /// teams table has no row yet
    pub fn get_team(&self, team_id: &str, fallback_name: &str) -> Result<Team> {
        let conn = self.conn.lock().unwrap();
        let team = conn
            .query_row(
                "SELECT team_id, name, wins, losses, ties FROM teams WHERE team_id=?1",
                params![team_id],
                |row| {
                    Ok(Team {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        record: TeamRecord {
                            wins: row.get(2)?,
                            losses: row.get(3)?,
                            ties: row.get(4)?,
                        },
                    })
                },
            )
            .unwrap_or_else(|_| Team::new(team_id, fallback_name, TeamRecord::default()));
        Ok(team)
    }

    // ── Games ─────────────────────────────────────────────────────────────────

    /// Upsert a game row (scheduled or completed)
    pub fn upsert_game(&self, game: &CompletedGame) -> Result<()> {
        let weather_json = match &game.weather {
            Some(w) => Some(serde_json::to_string(w)?),
            None => None,
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO games (
                game_id, game_date, home_team_id, home_team_name,
                away_team_id, away_team_name, status, home_score,
                away_score, weather_data, updated_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
             ON CONFLICT(game_id) DO UPDATE SET
                status=excluded.status,
                home_score=excluded.home_score,
                away_score=excluded.away_score,
                weather_data=excluded.weather_data,
                updated_at=excluded.updated_at",
            params![
                game.game_id,
                game.game_date,
                game.home_team_id,
                game.home_team_name,
                game.away_team_id,
                game.away_team_name,
                game.status.as_str(),
                game.home_score,
                game.away_score,
                weather_json,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    /// List stored games, most recent first
    pub fn list_games(&self, limit: i64) -> Result<Vec<CompletedGame>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT game_id, game_date, home_team_id, home_team_name,
                    away_team_id, away_team_name, status, home_score,
                    away_score, weather_data
             FROM games ORDER BY game_date DESC LIMIT ?1",
        )?;
        let games = stmt
            .query_map(params![limit], map_game)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }

    /// Materialise scheduled games as matchups, with team records joined
    /// in from the teams table
    pub fn list_scheduled_matchups(&self) -> Result<Vec<Matchup>> {
        let scheduled: Vec<CompletedGame> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT game_id, game_date, home_team_id, home_team_name,
                        away_team_id, away_team_name, status, home_score,
                        away_score, weather_data
                 FROM games WHERE status=?1 ORDER BY game_date ASC LIMIT ?2",
            )?;
            let games = stmt
                .query_map(params![GameStatus::Scheduled.as_str(), GAME_FETCH_LIMIT], map_game)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            games
        };

        let mut matchups = Vec::with_capacity(scheduled.len());
        for game in scheduled {
            matchups.push(Matchup {
                home_team: self.get_team(&game.home_team_id, &game.home_team_name)?,
                away_team: self.get_team(&game.away_team_id, &game.away_team_name)?,
                game_id: game.game_id,
                status: GameStatus::Scheduled,
                weather: game.weather,
            });
        }
        Ok(matchups)
    }

    // ── Predictions ───────────────────────────────────────────────────────────

    /// Persist a prediction with its full factor breakdown as JSON
    pub fn save_prediction(&self, prediction: &Prediction) -> Result<i64> {
        let factors_json = serde_json::to_string(&prediction.factors)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO predictions (
                game_id, home_team, away_team, predicted_winner,
                confidence, spread, factors, algorithm_version, created_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                prediction.game_id,
                prediction.home_team,
                prediction.away_team,
                prediction.predicted_winner,
                prediction.confidence,
                prediction.spread,
                factors_json,
                prediction.algorithm_version,
                prediction.created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List saved predictions, most recent first
    pub fn list_predictions(&self, limit: i64) -> Result<Vec<Prediction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT game_id, home_team, away_team, predicted_winner,
                    confidence, spread, factors, algorithm_version, created_at
             FROM predictions ORDER BY created_at DESC LIMIT ?1",
        )?;
        let predictions = stmt
            .query_map(params![limit], |row| {
                let factors_json: String = row.get(6)?;
                Ok(Prediction {
                    game_id: row.get(0)?,
                    home_team: row.get(1)?,
                    away_team: row.get(2)?,
                    predicted_winner: row.get(3)?,
                    confidence: row.get(4)?,
                    spread: row.get(5)?,
                    factors: serde_json::from_str(&factors_json).unwrap_or_default(),
                    algorithm_version: row.get(7)?,
                    created_at: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(predictions)
    }
}

impl GameSource for Database {
    fn fetch_matchups(&self) -> Result<Vec<Matchup>> {
        self.list_scheduled_matchups()
    }

    fn fetch_historical_games(&self) -> Result<Vec<CompletedGame>> {
        self.list_games(GAME_FETCH_LIMIT)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_game(row: &rusqlite::Row) -> rusqlite::Result<CompletedGame> {
    let status: String = row.get(6)?;
    let weather_json: Option<String> = row.get(9)?;
    let weather = weather_json.and_then(|json| match serde_json::from_str(&json) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("Unparseable weather blob, dropping it: {}", e);
            None
        }
    });
    Ok(CompletedGame {
        game_id: row.get(0)?,
        game_date: row.get(1)?,
        home_team_id: row.get(2)?,
        home_team_name: row.get(3)?,
        away_team_id: row.get(4)?,
        away_team_name: row.get(5)?,
        status: GameStatus::parse(&status),
        home_score: row.get(7)?,
        away_score: row.get(8)?,
        weather,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS teams (
    team_id    TEXT    PRIMARY KEY,
    name       TEXT    NOT NULL,
    wins       INTEGER NOT NULL DEFAULT 0,
    losses     INTEGER NOT NULL DEFAULT 0,
    ties       INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS games (
    game_id        TEXT    PRIMARY KEY,
    game_date      TEXT    NOT NULL,
    home_team_id   TEXT    NOT NULL,
    home_team_name TEXT    NOT NULL,
    away_team_id   TEXT    NOT NULL,
    away_team_name TEXT    NOT NULL,
    status         TEXT    NOT NULL DEFAULT 'STATUS_SCHEDULED',
    home_score     INTEGER NOT NULL DEFAULT 0,
    away_score     INTEGER NOT NULL DEFAULT 0,
    weather_data   TEXT,
    updated_at     TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS predictions (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id           TEXT    NOT NULL,
    home_team         TEXT    NOT NULL,
    away_team         TEXT    NOT NULL,
    predicted_winner  TEXT    NOT NULL,
    confidence        REAL    NOT NULL,
    spread            REAL    NOT NULL,
    factors           TEXT    NOT NULL,
    algorithm_version TEXT    NOT NULL,
    created_at        TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_games_status ON games(status);
CREATE INDEX IF NOT EXISTS idx_games_date ON games(game_date);
CREATE INDEX IF NOT EXISTS idx_predictions_game ON predictions(game_id);
"#;
