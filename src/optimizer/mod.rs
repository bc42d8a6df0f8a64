//! Weight search, factor ablation, and tuning recommendations.
//!
//! Every analysis here is a deterministic sweep: candidate configurations
//! are evaluated in the order given, over the same bounded sample of
//! completed games, with first-seen-best tie-breaking, so repeated runs on
//! an unchanged corpus agree exactly.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backtest::{BacktestError, Backtester, QuickStats};
use crate::engine::{FactorKind, FactorWeights};
use crate::sources::GameSource;

/// Bounded backtest size used per candidate, for speed.
const SAMPLE_GAMES: usize = 50;
/// Factors below this importance (in accuracy percentage points) are
/// flagged as removal candidates.
const LOW_IMPACT_THRESHOLD: f64 = 1.0;

/// One evaluated weight configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub weights: FactorWeights,
    pub accuracy: f64,
    pub completed_games: usize,
}

/// Result of a weight search over a candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSearch {
    /// `None` when no candidate produced a single graded prediction
    pub best_weights: Option<FactorWeights>,
    pub best_accuracy: f64,
    pub trials: Vec<CandidateResult>,
    pub searched_at: DateTime<Utc>,
}

/// Marginal contribution of one factor, measured by leave-one-out ablation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorImportance {
    pub kind: FactorKind,
    pub without_factor_accuracy: f64,
    /// `baseline − ablated` accuracy. Negative means removing the factor
    /// improved accuracy — a legitimate, reportable signal.
    pub accuracy_drop: f64,
    /// `accuracy_drop` in percentage points
    pub importance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AblationReport {
    pub baseline_accuracy: f64,
    /// One entry per factor, in canonical factor order
    pub factors: Vec<FactorImportance>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    WeightOptimization,
    FactorRemoval,
    DataEnhancement,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::WeightOptimization => "weight_optimization",
            RecommendationKind::FactorRemoval => "factor_removal",
            RecommendationKind::DataEnhancement => "data_enhancement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub description: String,
    /// Present on weight-optimization recommendations
    pub suggested_weights: Option<FactorWeights>,
    /// Present on factor-removal recommendations
    pub factors: Vec<String>,
}

pub struct Optimizer<'a, S: GameSource> {
    backtester: &'a Backtester<S>,
    baseline: FactorWeights,
}

impl<'a, S: GameSource> Optimizer<'a, S> {
    pub fn new(backtester: &'a Backtester<S>) -> Self {
        let baseline = backtester.engine().weights().clone();
        Optimizer {
            backtester,
            baseline,
        }
    }

    /// Evaluate each candidate configuration over the same bounded sample
    /// and keep the strictly-best accuracy; ties keep the first seen.
    pub fn search_weights(&self, candidates: &[FactorWeights]) -> Result<WeightSearch> {
        let mut search = WeightSearch {
            best_weights: None,
            best_accuracy: 0.0,
            trials: Vec::with_capacity(candidates.len()),
            searched_at: Utc::now(),
        };

        for (i, weights) in candidates.iter().enumerate() {
            info!("Testing weight combination {}/{}", i + 1, candidates.len());
            let stats = self.bounded_run(weights)?;
            if stats.completed_games > 0 && stats.accuracy > search.best_accuracy {
                search.best_accuracy = stats.accuracy;
                search.best_weights = Some(weights.clone());
            }
            search.trials.push(CandidateResult {
                weights: weights.clone(),
                accuracy: stats.accuracy,
                completed_games: stats.completed_games,
            });
        }
        Ok(search)
    }

    /// Remove each factor in turn, redistribute its weight proportionally
    /// over the rest, and measure the accuracy drop against a baseline run
    /// over the same bounded sample. Using the same sample on both sides
    /// keeps the invariant that ablating a zero-weight factor scores
    /// exactly 0.
    pub fn ablate_factors(&self) -> Result<AblationReport> {
        let baseline_stats = self.bounded_run(&self.baseline)?;
        if baseline_stats.completed_games == 0 {
            return Err(BacktestError::NoHistoricalData.into());
        }

        let mut factors = Vec::with_capacity(FactorKind::ALL.len());
        for kind in FactorKind::ALL {
            info!("Testing impact of removing {}", kind.key());
            let ablated = self.baseline.without_redistributed(kind);
            let stats = self.bounded_run(&ablated)?;
            let accuracy_drop = baseline_stats.accuracy - stats.accuracy;
            factors.push(FactorImportance {
                kind,
                without_factor_accuracy: stats.accuracy,
                accuracy_drop,
                importance_score: accuracy_drop * 100.0,
            });
        }

        Ok(AblationReport {
            baseline_accuracy: baseline_stats.accuracy,
            factors,
            analyzed_at: Utc::now(),
        })
    }

    /// Derive an ordered list of tuning recommendations from the weight
    /// search and the ablation analysis. The two data-enhancement entries
    /// are always present regardless of backtest outcome.
    pub fn recommend(&self) -> Result<Vec<Recommendation>> {
        let search = self.search_weights(&candidate_weight_sets())?;
        let ablation = self.ablate_factors()?;

        let mut recommendations = Vec::new();

        if search.best_accuracy > ablation.baseline_accuracy {
            recommendations.push(Recommendation {
                kind: RecommendationKind::WeightOptimization,
                priority: Priority::High,
                description: format!(
                    "Adopt the best searched weight configuration ({:.1}% vs {:.1}% baseline accuracy)",
                    search.best_accuracy * 100.0,
                    ablation.baseline_accuracy * 100.0
                ),
                suggested_weights: search.best_weights.clone(),
                factors: Vec::new(),
            });
        }

        let low_impact: Vec<String> = ablation
            .factors
            .iter()
            .filter(|f| f.importance_score < LOW_IMPACT_THRESHOLD)
            .map(|f| f.kind.key().to_string())
            .collect();
        if !low_impact.is_empty() {
            recommendations.push(Recommendation {
                kind: RecommendationKind::FactorRemoval,
                priority: Priority::Medium,
                description: format!(
                    "Consider removing low-impact factors: {}",
                    low_impact.join(", ")
                ),
                suggested_weights: None,
                factors: low_impact,
            });
        }

        recommendations.push(Recommendation {
            kind: RecommendationKind::DataEnhancement,
            priority: Priority::Medium,
            description: "Implement weather API integration for better outdoor game predictions"
                .into(),
            suggested_weights: None,
            factors: vec![FactorKind::WeatherImpact.key().to_string()],
        });
        recommendations.push(Recommendation {
            kind: RecommendationKind::DataEnhancement,
            priority: Priority::Low,
            description: "Add injury report analysis for more accurate predictions".into(),
            suggested_weights: None,
            factors: vec![FactorKind::Injuries.key().to_string()],
        });

        Ok(recommendations)
    }

    fn bounded_run(&self, weights: &FactorWeights) -> Result<QuickStats> {
        let engine = self.backtester.engine().with_weights(weights.clone());
        self.backtester.quick_run(&engine, SAMPLE_GAMES)
    }
}

/// The candidate configurations the weight search sweeps by default:
/// the baseline, a team-strength-heavy tilt, and a head-to-head-heavy tilt.
pub fn candidate_weight_sets() -> Vec<FactorWeights> {
    vec![
        FactorWeights::default(),
        FactorWeights::default()
            .with(FactorKind::TeamStrength, 0.45)
            .with(FactorKind::HeadToHead, 0.15)
            .with(FactorKind::WeatherImpact, 0.08)
            .with(FactorKind::Motivation, 0.04)
            .with(FactorKind::Injuries, 0.03),
        FactorWeights::default()
            .with(FactorKind::TeamStrength, 0.30)
            .with(FactorKind::HeadToHead, 0.30)
            .with(FactorKind::WeatherImpact, 0.08)
            .with(FactorKind::Motivation, 0.04)
            .with(FactorKind::Injuries, 0.03),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CompletedGame, GameStatus};
    use crate::engine::{PredictionEngine, StadiumDirectory};
    use crate::sources::InMemorySource;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn game(id: &str, home_score: i32, away_score: i32, days_ago: i64) -> CompletedGame {
        CompletedGame {
            game_id: id.into(),
            game_date: Utc::now() - Duration::days(days_ago),
            home_team_id: "2".into(),
            home_team_name: "Buffalo Bills".into(),
            away_team_id: "15".into(),
            away_team_name: "Miami Dolphins".into(),
            status: GameStatus::Final,
            home_score,
            away_score,
            weather: None,
        }
    }

    fn backtester_with(
        games: Vec<CompletedGame>,
        weights: FactorWeights,
    ) -> Backtester<InMemorySource> {
        Backtester::new(
            InMemorySource::with_games(games),
            PredictionEngine::new(weights, StadiumDirectory::nfl()),
        )
    }

    /// Corpus where the home side won 3 of 4 games. Records are zeroed
    /// during backtests, so accuracy is 0.75 for any weight configuration
    /// (home advantage is the only live signal, always positive).
    fn mixed_corpus() -> Vec<CompletedGame> {
        vec![
            game("g1", 24, 17, 8),
            game("g2", 31, 14, 6),
            game("g3", 13, 27, 4),
            game("g4", 20, 17, 2),
        ]
    }

    #[test]
    fn search_keeps_first_seen_best_on_ties() {
        let bt = backtester_with(mixed_corpus(), FactorWeights::default());
        let optimizer = Optimizer::new(&bt);
        let candidates = candidate_weight_sets();
        let search = optimizer.search_weights(&candidates).unwrap();

        assert_eq!(search.trials.len(), 3);
        for trial in &search.trials {
            assert_relative_eq!(trial.accuracy, 0.75, epsilon = 1e-12);
            assert_eq!(trial.completed_games, 4);
        }
        // All candidates tie at 0.75; the first one must win
        assert_eq!(search.best_weights.as_ref(), Some(&candidates[0]));
        assert_relative_eq!(search.best_accuracy, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn search_over_empty_store_flags_no_best() {
        let bt = backtester_with(Vec::new(), FactorWeights::default());
        let optimizer = Optimizer::new(&bt);
        let search = optimizer.search_weights(&candidate_weight_sets()).unwrap();
        assert!(search.best_weights.is_none());
        assert_eq!(search.best_accuracy, 0.0);
        assert_eq!(search.trials.len(), 3);
    }

    #[test]
    fn ablation_covers_every_factor_in_order() {
        let bt = backtester_with(mixed_corpus(), FactorWeights::default());
        let report = Optimizer::new(&bt).ablate_factors().unwrap();

        assert_relative_eq!(report.baseline_accuracy, 0.75, epsilon = 1e-12);
        let kinds: Vec<FactorKind> = report.factors.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, FactorKind::ALL.to_vec());
    }

    #[test]
    fn ablating_a_zero_weight_factor_has_zero_importance() {
        let weights = FactorWeights::default().with(FactorKind::Motivation, 0.0);
        let bt = backtester_with(mixed_corpus(), weights);
        let report = Optimizer::new(&bt).ablate_factors().unwrap();

        let motivation = report
            .factors
            .iter()
            .find(|f| f.kind == FactorKind::Motivation)
            .unwrap();
        assert_eq!(motivation.importance_score, 0.0);
        assert_eq!(motivation.accuracy_drop, 0.0);
    }

    #[test]
    fn ablation_without_history_is_a_typed_error() {
        let bt = backtester_with(Vec::new(), FactorWeights::default());
        let err = Optimizer::new(&bt).ablate_factors().unwrap_err();
        assert!(err.downcast_ref::<BacktestError>().is_some());
    }

    #[test]
    fn recommendations_always_include_the_static_data_enhancements() {
        let bt = backtester_with(mixed_corpus(), FactorWeights::default());
        let recs = Optimizer::new(&bt).recommend().unwrap();

        let enhancements: Vec<&Recommendation> = recs
            .iter()
            .filter(|r| r.kind == RecommendationKind::DataEnhancement)
            .collect();
        assert_eq!(enhancements.len(), 2);
        assert_eq!(enhancements[0].priority, Priority::Medium);
        assert_eq!(enhancements[0].factors, vec!["weather_impact".to_string()]);
        assert_eq!(enhancements[1].priority, Priority::Low);
        assert_eq!(enhancements[1].factors, vec!["injuries".to_string()]);
    }

    #[test]
    fn recommendations_flag_low_impact_factors() {
        // In this corpus every ablation leaves accuracy unchanged, so all
        // seven factors fall under the 1-point importance threshold.
        let bt = backtester_with(mixed_corpus(), FactorWeights::default());
        let recs = Optimizer::new(&bt).recommend().unwrap();

        let removal = recs
            .iter()
            .find(|r| r.kind == RecommendationKind::FactorRemoval)
            .unwrap();
        assert_eq!(removal.priority, Priority::Medium);
        assert_eq!(removal.factors.len(), 7);
    }

    #[test]
    fn recommendations_are_deterministic() {
        let bt = backtester_with(mixed_corpus(), FactorWeights::default());
        let optimizer = Optimizer::new(&bt);
        let a = optimizer.recommend().unwrap();
        let b = optimizer.recommend().unwrap();
        assert_eq!(a, b);
    }
}
