//! Backtesting harness.
//!
//! Replays the prediction engine against stored completed games, scoring
//! accuracy overall, per confidence bucket, and per factor. The actual
//! outcome is hidden from the engine: the game's status is forced back to
//! scheduled and the team records are zeroed before predicting (the store
//! has no as-of-kickoff records, a known signal gap that suppresses the
//! team-strength factor in every historical prediction).

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::models::{
    CompletedGame, Factor, GameStatus, Matchup, Prediction, Team, TeamRecord,
};
use crate::engine::PredictionEngine;
use crate::sources::GameSource;

/// Profit per unit staked at standard -110 American odds.
const WIN_PROFIT_MULTIPLIER: f64 = 0.9091;
/// Win rate needed to break even at -110 odds, as a percentage.
const BREAK_EVEN_ACCURACY_PCT: f64 = 52.38;
/// Simulated bets are only placed at or above this confidence.
const MIN_BET_CONFIDENCE: f64 = 60.0;
/// Sentinel actual-winner for drawn games; can never match a team name,
/// so tied games always score as incorrect.
const TIE_SENTINEL: &str = "TIE";

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("no historical games available for backtesting")]
    NoHistoricalData,
}

/// Inclusive date window over `game_date`. Default is unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    fn contains(&self, date: DateTime<Utc>) -> bool {
        self.from.map(|from| date >= from).unwrap_or(true)
            && self.to.map(|to| date <= to).unwrap_or(true)
    }
}

/// The four fixed confidence bands used to stratify accuracy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ConfidenceBucket {
    #[serde(rename = "50-60%")]
    Pct50To60,
    #[serde(rename = "60-70%")]
    Pct60To70,
    #[serde(rename = "70-80%")]
    Pct70To80,
    #[serde(rename = "80%+")]
    Pct80Plus,
}

impl ConfidenceBucket {
    pub const ALL: [ConfidenceBucket; 4] = [
        ConfidenceBucket::Pct50To60,
        ConfidenceBucket::Pct60To70,
        ConfidenceBucket::Pct70To80,
        ConfidenceBucket::Pct80Plus,
    ];

    /// Every prediction lands in exactly one band; all bands are
    /// closed-open except the top one, which is closed-unbounded.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 80.0 {
            ConfidenceBucket::Pct80Plus
        } else if confidence >= 70.0 {
            ConfidenceBucket::Pct70To80
        } else if confidence >= 60.0 {
            ConfidenceBucket::Pct60To70
        } else {
            ConfidenceBucket::Pct50To60
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceBucket::Pct50To60 => "50-60%",
            ConfidenceBucket::Pct60To70 => "60-70%",
            ConfidenceBucket::Pct70To80 => "70-80%",
            ConfidenceBucket::Pct80Plus => "80%+",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub total: u32,
    pub correct: u32,
}

impl BucketStats {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }
}

/// One graded historical prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub game_id: String,
    /// "Away Team @ Home Team"
    pub matchup: String,
    pub predicted_winner: String,
    /// Team name, or the literal `"TIE"` sentinel
    pub actual_winner: String,
    pub confidence: f64,
    pub correct: bool,
    pub factors: Vec<Factor>,
}

/// Accuracy and impact attribution for one factor across a backtest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorPerformance {
    pub total_predictions: u32,
    pub correct_predictions: u32,
    /// Mean absolute factor value across all predictions it appeared in
    pub avg_impact: f64,
    pub accuracy: f64,
}

/// Full results of one backtest run. Built fresh each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub total_games: usize,
    pub completed_games: usize,
    pub correct_predictions: usize,
    /// Fraction in [0, 1]
    pub accuracy: f64,
    pub avg_confidence: f64,
    pub predictions: Vec<PredictionOutcome>,
    pub performance_by_confidence: BTreeMap<ConfidenceBucket, BucketStats>,
    pub factor_analysis: BTreeMap<String, FactorPerformance>,
}

/// Accuracy-only subset produced by the bounded runs the optimizer uses.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuickStats {
    pub completed_games: usize,
    pub correct_predictions: usize,
    pub accuracy: f64,
}

/// Outcome of the fixed-stake betting simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BettingSummary {
    pub total_bets: u32,
    pub total_wagered: f64,
    pub total_winnings: f64,
    pub profit_loss: f64,
    pub roi_percentage: f64,
    /// Fixed break-even win rate for -110 odds
    pub break_even_accuracy: f64,
}

pub struct Backtester<S: GameSource> {
    source: S,
    engine: PredictionEngine,
}

impl<S: GameSource> Backtester<S> {
    pub fn new(source: S, engine: PredictionEngine) -> Self {
        Backtester { source, engine }
    }

    pub fn engine(&self) -> &PredictionEngine {
        &self.engine
    }

    /// Replay the engine over every stored completed game in `range`.
    ///
    /// Fails with [`BacktestError::NoHistoricalData`] when the store holds
    /// no completed games at all, so callers can tell "no signal" apart
    /// from a crash.
    pub fn run(&self, range: DateRange) -> Result<BacktestReport> {
        let all_games = self.source.fetch_historical_games()?;
        let completed: Vec<&CompletedGame> = all_games
            .iter()
            .filter(|g| g.is_completed() && range.contains(g.game_date))
            .collect();

        if completed.is_empty() {
            return Err(BacktestError::NoHistoricalData.into());
        }

        let mut report = BacktestReport {
            total_games: completed.len(),
            completed_games: 0,
            correct_predictions: 0,
            accuracy: 0.0,
            avg_confidence: 0.0,
            predictions: Vec::new(),
            performance_by_confidence: ConfidenceBucket::ALL
                .iter()
                .map(|b| (*b, BucketStats::default()))
                .collect(),
            factor_analysis: BTreeMap::new(),
        };
        let mut total_confidence = 0.0;

        for game in &completed {
            // The head-to-head factor sees the whole corpus; only status
            // and team records are suppressed.
            let Some(prediction) = self.predict_historical(&self.engine, game, &all_games) else {
                continue;
            };

            report.completed_games += 1;
            let actual_winner = actual_winner(game);
            let correct = prediction.predicted_winner == actual_winner;
            if correct {
                report.correct_predictions += 1;
            }

            total_confidence += prediction.confidence;
            let bucket = ConfidenceBucket::from_confidence(prediction.confidence);
            let stats = report.performance_by_confidence.entry(bucket).or_default();
            stats.total += 1;
            if correct {
                stats.correct += 1;
            }

            for factor in &prediction.factors {
                let perf = report
                    .factor_analysis
                    .entry(factor.name.clone())
                    .or_default();
                perf.total_predictions += 1;
                perf.avg_impact += factor.value.abs();
                if correct {
                    perf.correct_predictions += 1;
                }
            }

            report.predictions.push(PredictionOutcome {
                game_id: game.game_id.clone(),
                matchup: format!("{} @ {}", game.away_team_name, game.home_team_name),
                predicted_winner: prediction.predicted_winner,
                actual_winner,
                confidence: prediction.confidence,
                correct,
                factors: prediction.factors,
            });
        }

        if report.completed_games > 0 {
            report.accuracy = report.correct_predictions as f64 / report.completed_games as f64;
            report.avg_confidence = total_confidence / report.completed_games as f64;
        }
        for perf in report.factor_analysis.values_mut() {
            if perf.total_predictions > 0 {
                perf.accuracy = perf.correct_predictions as f64 / perf.total_predictions as f64;
                perf.avg_impact /= perf.total_predictions as f64;
            }
        }

        info!(
            "Backtest complete: {:.1}% accuracy on {} games",
            report.accuracy * 100.0,
            report.completed_games
        );
        Ok(report)
    }

    /// Bounded accuracy-only backtest over the first `sample_limit`
    /// completed games, with a caller-supplied engine. The optimizer runs
    /// this once per candidate configuration.
    pub fn quick_run(&self, engine: &PredictionEngine, sample_limit: usize) -> Result<QuickStats> {
        let all_games = self.source.fetch_historical_games()?;
        let sample: Vec<&CompletedGame> = all_games
            .iter()
            .filter(|g| g.is_completed())
            .take(sample_limit)
            .collect();

        let mut stats = QuickStats::default();
        for game in &sample {
            let Some(prediction) = self.predict_historical(engine, game, &all_games) else {
                continue;
            };
            if prediction.predicted_winner == actual_winner(game) {
                stats.correct_predictions += 1;
            }
            stats.completed_games += 1;
        }
        if stats.completed_games > 0 {
            stats.accuracy = stats.correct_predictions as f64 / stats.completed_games as f64;
        }
        Ok(stats)
    }

    fn predict_historical(
        &self,
        engine: &PredictionEngine,
        game: &CompletedGame,
        history: &[CompletedGame],
    ) -> Option<Prediction> {
        let matchup = synthetic_matchup(game);
        let prediction = engine.predict(&matchup, history);
        if prediction.is_none() {
            warn!(game_id = %game.game_id, "Historical game produced no prediction");
        }
        prediction
    }
}

/// Rebuild a stored game as a scheduled matchup with the outcome hidden:
/// scheduled status, zeroed records, stored weather re-attached.
fn synthetic_matchup(game: &CompletedGame) -> Matchup {
    Matchup {
        game_id: game.game_id.clone(),
        home_team: Team::new(
            game.home_team_id.clone(),
            game.home_team_name.clone(),
            TeamRecord::default(),
        ),
        away_team: Team::new(
            game.away_team_id.clone(),
            game.away_team_name.clone(),
            TeamRecord::default(),
        ),
        status: GameStatus::Scheduled,
        weather: game.weather.clone(),
    }
}

fn actual_winner(game: &CompletedGame) -> String {
    if game.home_score > game.away_score {
        game.home_team_name.clone()
    } else if game.away_score > game.home_score {
        game.away_team_name.clone()
    } else {
        TIE_SENTINEL.to_string()
    }
}

/// Fixed-stake betting simulation over a finished backtest. Only
/// predictions at 60%+ confidence are bet; wins accrue the -110 profit
/// leg (stake × 0.9091), losses forfeit the stake.
pub fn simulate_betting(report: &BacktestReport, stake: f64) -> BettingSummary {
    let mut total_bets = 0u32;
    let mut total_wagered = 0.0;
    let mut total_winnings = 0.0;

    for outcome in &report.predictions {
        if outcome.confidence < MIN_BET_CONFIDENCE {
            continue;
        }
        total_bets += 1;
        total_wagered += stake;
        if outcome.correct {
            total_winnings += stake * WIN_PROFIT_MULTIPLIER;
        }
    }

    let profit_loss = total_winnings - total_wagered;
    let roi_percentage = if total_wagered > 0.0 {
        profit_loss / total_wagered * 100.0
    } else {
        0.0
    };

    BettingSummary {
        total_bets,
        total_wagered,
        total_winnings,
        profit_loss,
        roi_percentage,
        break_even_accuracy: BREAK_EVEN_ACCURACY_PCT,
    }
}
