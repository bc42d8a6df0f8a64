use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Multi-factor NFL game prediction engine
#[derive(Parser, Debug, Clone)]
#[command(name = "gridiron-predictor", version, about)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "gridiron.db")]
    pub database_path: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Predict all stored upcoming games
    Predict {
        /// Persist the predictions to the database
        #[arg(long, default_value = "false")]
        save: bool,
    },
    /// Replay the engine against stored completed games
    Backtest {
        /// Only include games on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Only include games on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Fixed stake per simulated bet (USD)
        #[arg(long, env = "BET_STAKE", default_value = "100.0")]
        stake: f64,
    },
    /// Search candidate factor-weight configurations for the best accuracy
    Optimize,
    /// Rank factor importance by leave-one-out ablation
    Ablate,
    /// Print tuning and data recommendations
    Recommend,
    /// Insert three sample completed games to try the backtester on
    SeedDemo,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Command::Backtest { stake, from, to } = &self.command {
            if *stake <= 0.0 {
                anyhow::bail!("stake must be positive");
            }
            if let (Some(from), Some(to)) = (from, to) {
                if from > to {
                    anyhow::bail!("--from must not be after --to");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtest_rejects_non_positive_stake() {
        let config = Config::parse_from(["gridiron-predictor", "backtest", "--stake", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn backtest_rejects_inverted_date_range() {
        let config = Config::parse_from([
            "gridiron-predictor",
            "backtest",
            "--from",
            "2025-12-01",
            "--to",
            "2025-09-01",
        ]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::parse_from(["gridiron-predictor", "backtest"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.database_path, "gridiron.db");
    }
}
