use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use tracing::{info, warn};

mod backtest;
mod config;
mod db;
mod engine;
mod optimizer;
mod sources;

use backtest::{simulate_betting, BacktestError, BacktestReport, Backtester, DateRange};
use config::{Command, Config};
use db::models::{CompletedGame, GameStatus, Weather};
use db::Database;
use engine::{FactorWeights, PredictionEngine, StadiumDirectory};
use optimizer::{candidate_weight_sets, Optimizer};
use sources::GameSource;

fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let engine = PredictionEngine::new(FactorWeights::default(), StadiumDirectory::nfl());
    info!("Initialized prediction engine v{}", engine::ALGORITHM_VERSION);

    match config.command {
        Command::Predict { save } => run_predict(&db, &engine, save),
        Command::Backtest { from, to, stake } => run_backtest(db, engine, from, to, stake),
        Command::Optimize => run_optimize(db, engine),
        Command::Ablate => run_ablate(db, engine),
        Command::Recommend => run_recommend(db, engine),
        Command::SeedDemo => seed_demo(&db),
    }
}

fn run_predict(db: &Database, engine: &PredictionEngine, save: bool) -> Result<()> {
    let matchups = db.fetch_matchups()?;
    if matchups.is_empty() {
        warn!("No scheduled games in the database; nothing to predict");
        return Ok(());
    }
    let history = db.fetch_historical_games()?;
    let predictions = engine.predict_many(&matchups, &history);

    for p in &predictions {
        println!(
            "{} @ {} -> {} ({:.1}% confidence, spread {:+.1})",
            p.away_team, p.home_team, p.predicted_winner, p.confidence, p.spread
        );
    }

    if save {
        let mut saved = 0usize;
        for p in &predictions {
            // One failed insert must not drop the rest of the batch
            match db.save_prediction(p) {
                Ok(_) => saved += 1,
                Err(e) => warn!(game_id = %p.game_id, "Failed to save prediction: {}", e),
            }
        }
        info!("Saved {} predictions to database", saved);
    }
    Ok(())
}

fn run_backtest(
    db: Database,
    engine: PredictionEngine,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    stake: f64,
) -> Result<()> {
    let backtester = Backtester::new(db, engine);
    let range = DateRange {
        from: from.map(|d| d.and_time(NaiveTime::MIN).and_utc()),
        to: to.map(|d| d.and_time(NaiveTime::MIN).and_utc() + Duration::days(1) - Duration::seconds(1)),
    };

    let report = match backtester.run(range) {
        Ok(report) => report,
        Err(e) if e.downcast_ref::<BacktestError>().is_some() => {
            warn!("{}", e);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    print_report(&report);

    let summary = simulate_betting(&report, stake);
    println!();
    println!("Betting simulation (stake ${:.2} at -110 odds):", stake);
    println!("  bets placed:   {}", summary.total_bets);
    println!("  total wagered: ${:.2}", summary.total_wagered);
    println!("  total winnings: ${:.2}", summary.total_winnings);
    println!("  profit/loss:   ${:+.2}", summary.profit_loss);
    println!("  ROI:           {:+.2}%", summary.roi_percentage);
    println!("  break-even accuracy: {:.2}%", summary.break_even_accuracy);
    Ok(())
}

fn print_report(report: &BacktestReport) {
    println!("Backtest over {} completed games:", report.completed_games);
    println!(
        "  accuracy:       {:.1}% ({}/{} correct)",
        report.accuracy * 100.0,
        report.correct_predictions,
        report.completed_games
    );
    println!("  avg confidence: {:.1}%", report.avg_confidence);
    println!("  by confidence bucket:");
    for (bucket, stats) in &report.performance_by_confidence {
        println!(
            "    {:>6}: {:>3} predictions, {:.1}% correct",
            bucket.label(),
            stats.total,
            stats.accuracy() * 100.0
        );
    }
    println!("  by factor:");
    for (name, perf) in &report.factor_analysis {
        println!(
            "    {:<14} hit rate {:.1}%, avg impact {:.2} points",
            name,
            perf.accuracy * 100.0,
            perf.avg_impact
        );
    }
}

fn run_optimize(db: Database, engine: PredictionEngine) -> Result<()> {
    let backtester = Backtester::new(db, engine);
    let optimizer = Optimizer::new(&backtester);
    let search = optimizer.search_weights(&candidate_weight_sets())?;

    for (i, trial) in search.trials.iter().enumerate() {
        println!(
            "candidate {}: {:.1}% accuracy on {} games",
            i + 1,
            trial.accuracy * 100.0,
            trial.completed_games
        );
    }
    match &search.best_weights {
        Some(weights) => {
            println!("best configuration ({:.1}% accuracy):", search.best_accuracy * 100.0);
            for (kind, weight) in weights.entries() {
                println!("  {:<15} {:.2}", kind.key(), weight);
            }
        }
        None => warn!("Weight search produced no graded predictions"),
    }
    Ok(())
}

fn run_ablate(db: Database, engine: PredictionEngine) -> Result<()> {
    let backtester = Backtester::new(db, engine);
    let optimizer = Optimizer::new(&backtester);

    let report = match optimizer.ablate_factors() {
        Ok(report) => report,
        Err(e) if e.downcast_ref::<BacktestError>().is_some() => {
            warn!("{}", e);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    println!("Baseline accuracy: {:.1}%", report.baseline_accuracy * 100.0);
    println!("Factor importance (accuracy drop when removed, percentage points):");
    for f in &report.factors {
        println!("  {:<15} {:+.2}", f.kind.key(), f.importance_score);
    }
    Ok(())
}

fn run_recommend(db: Database, engine: PredictionEngine) -> Result<()> {
    let backtester = Backtester::new(db, engine);
    let optimizer = Optimizer::new(&backtester);

    let recommendations = match optimizer.recommend() {
        Ok(recs) => recs,
        Err(e) if e.downcast_ref::<BacktestError>().is_some() => {
            warn!("{}", e);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    for rec in &recommendations {
        println!("[{}] {}: {}", rec.priority.as_str(), rec.kind.as_str(), rec.description);
        if let Some(weights) = &rec.suggested_weights {
            for (kind, weight) in weights.entries() {
                println!("    {:<15} {:.2}", kind.key(), weight);
            }
        }
    }
    Ok(())
}

/// Insert three sample completed games so `backtest` has something to chew
/// on in a fresh database.
fn seed_demo(db: &Database) -> Result<()> {
    let games = demo_games();
    for game in &games {
        db.upsert_game(game)?;
    }
    info!("Added {} historical games for testing", games.len());
    Ok(())
}

fn demo_games() -> Vec<CompletedGame> {
    let clear = Weather::Observed {
        conditions: "clear".into(),
        total_score_impact: 0.0,
    };
    vec![
        CompletedGame {
            game_id: "hist_001".into(),
            game_date: Utc::now() - Duration::days(7),
            home_team_id: "2".into(),
            home_team_name: "Buffalo Bills".into(),
            away_team_id: "15".into(),
            away_team_name: "Miami Dolphins".into(),
            status: GameStatus::Final,
            home_score: 24,
            away_score: 17,
            weather: Some(clear.clone()),
        },
        CompletedGame {
            game_id: "hist_002".into(),
            game_date: Utc::now() - Duration::days(6),
            home_team_id: "12".into(),
            home_team_name: "Kansas City Chiefs".into(),
            away_team_id: "7".into(),
            away_team_name: "Denver Broncos".into(),
            status: GameStatus::Final,
            home_score: 31,
            away_score: 14,
            weather: Some(clear),
        },
        CompletedGame {
            game_id: "hist_003".into(),
            game_date: Utc::now() - Duration::days(5),
            home_team_id: "25".into(),
            home_team_name: "San Francisco 49ers".into(),
            away_team_id: "26".into(),
            away_team_name: "Seattle Seahawks".into(),
            status: GameStatus::Final,
            home_score: 21,
            away_score: 28,
            weather: Some(Weather::Observed {
                conditions: "rain".into(),
                total_score_impact: -3.0,
            }),
        },
    ]
}
