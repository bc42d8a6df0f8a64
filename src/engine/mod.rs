//! Multi-factor prediction engine.
//!
//! Seven independent signals (team strength, head-to-head, home advantage,
//! rest, weather, motivation, injuries) are combined with a
//! confidence-weighted average: each factor contributes
//! `value × weight × confidence`, so a factor backed by thin data is
//! automatically down-weighted without manual retuning.

pub mod factors;
pub mod stadiums;
pub mod weights;

pub use stadiums::{StadiumDirectory, StadiumInfo};
pub use weights::{FactorKind, FactorWeights};

use chrono::Utc;
use tracing::{debug, info};

use crate::db::models::{CompletedGame, Factor, GameStatus, Matchup, Prediction};

pub const ALGORITHM_VERSION: &str = "1.0";

/// Points of predicted spread per percentage point of win confidence.
const CONFIDENCE_PER_POINT: f64 = 8.0;
/// Confidence for a dead-even prediction.
const CONFIDENCE_FLOOR: f64 = 50.0;
/// Confidence is capped here no matter how lopsided the spread.
const CONFIDENCE_CEILING: f64 = 85.0;

/// The prediction engine. Construction takes the factor-weight
/// configuration and the stadium table as explicit values so many engine
/// instances with different tunings can coexist (the optimizer relies on
/// this).
#[derive(Debug, Clone)]
pub struct PredictionEngine {
    weights: FactorWeights,
    stadiums: StadiumDirectory,
}

impl PredictionEngine {
    pub fn new(weights: FactorWeights, stadiums: StadiumDirectory) -> Self {
        PredictionEngine { weights, stadiums }
    }

    pub fn weights(&self) -> &FactorWeights {
        &self.weights
    }

    /// A sibling engine with the same stadium table but a different weight
    /// configuration. The optimizer builds one per candidate.
    pub fn with_weights(&self, weights: FactorWeights) -> PredictionEngine {
        PredictionEngine {
            weights,
            stadiums: self.stadiums.clone(),
        }
    }

    /// Predict the outcome of a single matchup.
    ///
    /// Returns `None` for anything not in `Scheduled` status — already
    /// started or finished games are simply not eligible, which is not an
    /// error. `history` is the corpus of past completed games the
    /// head-to-head factor draws meetings from.
    pub fn predict(&self, matchup: &Matchup, history: &[CompletedGame]) -> Option<Prediction> {
        if matchup.status != GameStatus::Scheduled {
            return None;
        }

        let factors = self.collect_factors(matchup, history);
        let (spread, confidence) = combine_factors(&factors);

        // Ties in spread fall through to the away team. That break is
        // incidental (spread > 0 strictly) but downstream accuracy numbers
        // depend on it, so it is pinned by tests rather than changed.
        let predicted_winner = if spread > 0.0 {
            matchup.home_team.name.clone()
        } else {
            matchup.away_team.name.clone()
        };

        Some(Prediction {
            game_id: matchup.game_id.clone(),
            home_team: matchup.home_team.name.clone(),
            away_team: matchup.away_team.name.clone(),
            predicted_winner,
            confidence,
            spread,
            factors,
            algorithm_version: ALGORITHM_VERSION.to_string(),
            created_at: Utc::now(),
        })
    }

    /// Predict a batch of matchups. Ineligible matchups are skipped
    /// silently; one bad matchup never drops the rest of the batch.
    pub fn predict_many(&self, matchups: &[Matchup], history: &[CompletedGame]) -> Vec<Prediction> {
        let mut predictions = Vec::new();
        for matchup in matchups {
            match self.predict(matchup, history) {
                Some(p) => predictions.push(p),
                None => debug!(
                    game_id = %matchup.game_id,
                    status = matchup.status.as_str(),
                    "Skipping matchup not in scheduled status"
                ),
            }
        }
        info!("Generated {} game predictions", predictions.len());
        predictions
    }

    /// Run all seven calculators in canonical order and attach configured
    /// weights.
    fn collect_factors(&self, matchup: &Matchup, history: &[CompletedGame]) -> Vec<Factor> {
        let home = &matchup.home_team;
        let away = &matchup.away_team;

        let signals = [
            (
                FactorKind::TeamStrength,
                factors::team_strength(home, away),
            ),
            (
                FactorKind::HeadToHead,
                factors::head_to_head(&home.id, &away.id, history),
            ),
            (
                FactorKind::HomeAdvantage,
                factors::home_advantage(self.stadiums.get(&home.id)),
            ),
            (FactorKind::RestAdvantage, factors::rest_advantage()),
            (
                FactorKind::WeatherImpact,
                factors::weather(matchup.weather.as_ref()),
            ),
            (FactorKind::Motivation, factors::motivation()),
            (FactorKind::Injuries, factors::injuries()),
        ];

        signals
            .into_iter()
            .map(|(kind, signal)| Factor {
                name: kind.label().to_string(),
                value: signal.value,
                weight: self.weights.get(kind),
                confidence: signal.confidence,
                explanation: signal.explanation,
            })
            .collect()
    }
}

/// Confidence-weighted combination of all factors into a spread and a win
/// confidence percentage.
///
/// `spread = Σ v·w·c / Σ w·c` over factors with confidence > 0, and 0 when
/// the denominator is 0. Confidence is a fixed linear calibration of the
/// spread magnitude into a [50, 85] percentage; both come back rounded to
/// one decimal.
fn combine_factors(factors: &[Factor]) -> (f64, f64) {
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;

    for factor in factors {
        if factor.confidence > 0.0 {
            weighted_sum += factor.value * factor.weight * factor.confidence;
            weight_sum += factor.weight * factor.confidence;
        }
    }

    let spread = if weight_sum > 0.0 {
        weighted_sum / weight_sum
    } else {
        0.0
    };

    let confidence =
        (spread.abs() * CONFIDENCE_PER_POINT + CONFIDENCE_FLOOR).min(CONFIDENCE_CEILING);

    (round1(spread), round1(confidence))
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
