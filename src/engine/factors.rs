//! The seven factor calculators.
//!
//! Each calculator is a pure function over already-fetched data and returns
//! exactly one [`Signal`] (value, confidence, explanation). Weights are
//! attached later by the engine from its [`FactorWeights`](super::FactorWeights)
//! configuration, so calculators stay independent of tuning.
//!
//! Calculators never fail outward: anything degenerate (no games played,
//! thin head-to-head history, missing weather) comes back as a low- or
//! zero-confidence signal instead, so one bad input can never abort a
//! prediction.

use crate::db::models::{CompletedGame, Team, Weather};
use crate::engine::stadiums::StadiumInfo;

/// Points of spread per 100% of win-percentage differential.
const POINTS_PER_WIN_PCT: f64 = 14.0;
/// League-average home field advantage in points.
const BASE_HOME_ADVANTAGE: f64 = 2.5;
/// Extra edge for enclosed venues (controlled conditions).
const DOME_BONUS: f64 = 0.5;
/// How many recent meetings the head-to-head factor looks at.
const H2H_WINDOW: usize = 5;
/// Below this many meetings the head-to-head sample is too thin to score.
const MIN_H2H_MEETINGS: usize = 3;

/// Unweighted output of a single calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Points, positive favoring the home team
    pub value: f64,
    /// Data-quality trust in [0, 1]
    pub confidence: f64,
    pub explanation: String,
}

impl Signal {
    fn new(value: f64, confidence: f64, explanation: String) -> Self {
        // A non-finite value means an upstream data problem; degrade to a
        // zero-confidence signal rather than poisoning the combination.
        if !value.is_finite() || !confidence.is_finite() {
            return Signal {
                value: 0.0,
                confidence: 0.0,
                explanation: "Calculation error".into(),
            };
        }
        Signal {
            value,
            confidence,
            explanation,
        }
    }
}

// ── Team strength ────────────────────────────────────────────────────────────

/// Win-percentage differential converted to points.
///
/// Confidence grows with the combined sample: `min(0.9, games / 20)`.
pub fn team_strength(home: &Team, away: &Team) -> Signal {
    let home_games = home.record.games_played();
    let away_games = away.record.games_played();

    if home_games == 0 || away_games == 0 {
        return Signal::new(0.0, 0.1, "Insufficient season data".into());
    }

    let home_pct = home.record.win_pct();
    let away_pct = away.record.win_pct();
    let strength_diff = (home_pct - away_pct) * POINTS_PER_WIN_PCT;
    let confidence = ((home_games + away_games) as f64 / 20.0).min(0.9);

    Signal::new(
        strength_diff,
        confidence,
        format!(
            "Home: {:.1}% ({}-{}) vs Away: {:.1}% ({}-{})",
            home_pct * 100.0,
            home.record.wins,
            home.record.losses,
            away_pct * 100.0,
            away.record.wins,
            away.record.losses
        ),
    )
}

// ── Head-to-head ─────────────────────────────────────────────────────────────

/// Average point margin over the last up-to-5 meetings between the two
/// teams, sign-normalized to the current home team's perspective.
pub fn head_to_head(home_id: &str, away_id: &str, history: &[CompletedGame]) -> Signal {
    let mut meetings: Vec<&CompletedGame> = history
        .iter()
        .filter(|g| {
            (g.home_team_id == home_id && g.away_team_id == away_id)
                || (g.home_team_id == away_id && g.away_team_id == home_id)
        })
        .collect();
    meetings.sort_by_key(|g| g.game_date);

    if meetings.len() < MIN_H2H_MEETINGS {
        return Signal::new(0.0, 0.2, "Limited historical data".into());
    }

    let recent = &meetings[meetings.len().saturating_sub(H2H_WINDOW)..];
    let total_margin: f64 = recent
        .iter()
        .map(|g| {
            // Orient the margin to the current home team
            if g.home_team_id == home_id {
                (g.home_score - g.away_score) as f64
            } else {
                (g.away_score - g.home_score) as f64
            }
        })
        .sum();
    let avg_margin = total_margin / recent.len() as f64;
    let confidence = (recent.len() as f64 / H2H_WINDOW as f64).min(0.8);

    Signal::new(
        avg_margin,
        confidence,
        format!(
            "Last {} games: avg margin {:+.1} points",
            recent.len(),
            avg_margin
        ),
    )
}

// ── Home advantage ───────────────────────────────────────────────────────────

/// Fixed home field edge, slightly larger under a roof.
pub fn home_advantage(stadium: Option<&StadiumInfo>) -> Signal {
    let mut advantage = BASE_HOME_ADVANTAGE;
    if stadium.map(|s| s.dome).unwrap_or(false) {
        advantage += DOME_BONUS;
    }
    Signal::new(
        advantage,
        0.9,
        format!("Standard home advantage: {:.1} points", advantage),
    )
}

// ── Rest advantage ───────────────────────────────────────────────────────────

/// Neutral until scheduling-gap tracking exists; participates at token
/// confidence so the combination stays uniform across all seven factors.
pub fn rest_advantage() -> Signal {
    Signal::new(0.0, 0.1, "Rest data not implemented".into())
}

// ── Weather ──────────────────────────────────────────────────────────────────

/// Signed total-score impact from the precomputed weather summary.
/// A missing snapshot is treated as "not needed" (indoor).
pub fn weather(weather: Option<&Weather>) -> Signal {
    match weather {
        None | Some(Weather::NotNeeded) => {
            Signal::new(0.0, 0.9, "Indoor game - no weather impact".into())
        }
        Some(Weather::Unavailable) => Signal::new(0.0, 0.1, "Weather data unavailable".into()),
        Some(Weather::Observed {
            conditions,
            total_score_impact,
        }) => Signal::new(
            *total_score_impact,
            0.7,
            format!(
                "Weather impact: {:+.1} points ({})",
                total_score_impact, conditions
            ),
        ),
    }
}

// ── Motivation ───────────────────────────────────────────────────────────────

/// Placeholder for division-game / playoff-stakes analysis.
pub fn motivation() -> Signal {
    Signal::new(0.0, 0.2, "Motivation factors not implemented".into())
}

// ── Injuries ─────────────────────────────────────────────────────────────────

/// Placeholder for injury-report analysis.
pub fn injuries() -> Signal {
    Signal::new(0.0, 0.1, "Injury analysis not implemented".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{GameStatus, TeamRecord};
    use approx::assert_relative_eq;
    use chrono::{Duration, Utc};

    fn team(id: &str, name: &str, wins: u32, losses: u32, ties: u32) -> Team {
        Team::new(id, name, TeamRecord::new(wins, losses, ties))
    }

    fn meeting(home_id: &str, away_id: &str, home_score: i32, away_score: i32, days_ago: i64) -> CompletedGame {
        CompletedGame {
            game_id: format!("g-{}-{}-{}", home_id, away_id, days_ago),
            game_date: Utc::now() - Duration::days(days_ago),
            home_team_id: home_id.into(),
            home_team_name: format!("Team {}", home_id),
            away_team_id: away_id.into(),
            away_team_name: format!("Team {}", away_id),
            status: GameStatus::Final,
            home_score,
            away_score,
            weather: None,
        }
    }

    // ── Team strength ────────────────────────────────────────────────────────

    #[test]
    fn team_strength_perfect_vs_winless() {
        let s = team_strength(&team("2", "Bills", 10, 0, 0), &team("15", "Dolphins", 0, 10, 0));
        assert_relative_eq!(s.value, 14.0, epsilon = 1e-12);
        assert_relative_eq!(s.confidence, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn team_strength_small_sample_lowers_confidence() {
        let s = team_strength(&team("2", "Bills", 2, 1, 0), &team("15", "Dolphins", 1, 2, 0));
        // 6 combined games → 6/20
        assert_relative_eq!(s.confidence, 0.3, epsilon = 1e-12);
        assert!(s.value > 0.0);
    }

    #[test]
    fn team_strength_degenerates_without_games() {
        let s = team_strength(&team("2", "Bills", 0, 0, 0), &team("15", "Dolphins", 5, 0, 0));
        assert_eq!(s.value, 0.0);
        assert_relative_eq!(s.confidence, 0.1, epsilon = 1e-12);
        assert!(s.explanation.contains("Insufficient"));
    }

    #[test]
    fn team_strength_symmetric_records_cancel() {
        let s = team_strength(&team("2", "Bills", 6, 6, 0), &team("15", "Dolphins", 6, 6, 0));
        assert_relative_eq!(s.value, 0.0, epsilon = 1e-12);
    }

    // ── Head-to-head ─────────────────────────────────────────────────────────

    #[test]
    fn head_to_head_under_three_meetings_is_neutral() {
        let history = vec![meeting("2", "15", 30, 10, 10), meeting("15", "2", 3, 40, 20)];
        let s = head_to_head("2", "15", &history);
        assert_eq!(s.value, 0.0);
        assert_relative_eq!(s.confidence, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn head_to_head_orients_margins_to_current_home_team() {
        // Team 2 won all three, once as the road team
        let history = vec![
            meeting("2", "15", 24, 17, 30), // +7
            meeting("15", "2", 10, 20, 20), // +10 from team 2's perspective
            meeting("2", "15", 27, 21, 10), // +6
        ];
        let s = head_to_head("2", "15", &history);
        assert_relative_eq!(s.value, 23.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(s.confidence, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn head_to_head_uses_only_five_most_recent_meetings() {
        // Seven meetings; the two oldest are blowouts that must be ignored
        let mut history = vec![
            meeting("2", "15", 60, 0, 70),
            meeting("2", "15", 60, 0, 60),
        ];
        for days in [50, 40, 30, 20, 10] {
            history.push(meeting("2", "15", 21, 20, days)); // +1 each
        }
        let s = head_to_head("2", "15", &history);
        assert_relative_eq!(s.value, 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.confidence, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn head_to_head_ignores_unrelated_games() {
        let history = vec![
            meeting("2", "7", 50, 0, 30),
            meeting("12", "15", 50, 0, 20),
        ];
        let s = head_to_head("2", "15", &history);
        assert_eq!(s.value, 0.0);
        assert_relative_eq!(s.confidence, 0.2, epsilon = 1e-12);
    }

    // ── Home advantage / weather / placeholders ──────────────────────────────

    #[test]
    fn home_advantage_outdoor_and_dome() {
        let outdoor = StadiumInfo { city: "Buffalo", state: "NY", dome: false };
        let dome = StadiumInfo { city: "Detroit", state: "MI", dome: true };
        assert_relative_eq!(home_advantage(Some(&outdoor)).value, 2.5, epsilon = 1e-12);
        assert_relative_eq!(home_advantage(Some(&dome)).value, 3.0, epsilon = 1e-12);
        assert_relative_eq!(home_advantage(None).value, 2.5, epsilon = 1e-12);
        assert_relative_eq!(home_advantage(None).confidence, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn weather_missing_snapshot_counts_as_indoor() {
        let s = weather(None);
        assert_eq!(s.value, 0.0);
        assert_relative_eq!(s.confidence, 0.9, epsilon = 1e-12);

        let s = weather(Some(&Weather::NotNeeded));
        assert_relative_eq!(s.confidence, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn weather_unavailable_is_near_zero_confidence() {
        let s = weather(Some(&Weather::Unavailable));
        assert_eq!(s.value, 0.0);
        assert_relative_eq!(s.confidence, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn weather_observed_passes_impact_through() {
        let w = Weather::Observed {
            conditions: "Snow".into(),
            total_score_impact: -4.0,
        };
        let s = weather(Some(&w));
        assert_relative_eq!(s.value, -4.0, epsilon = 1e-12);
        assert_relative_eq!(s.confidence, 0.7, epsilon = 1e-12);
        assert!(s.explanation.contains("Snow"));
    }

    #[test]
    fn placeholder_factors_are_neutral() {
        for (s, conf) in [(rest_advantage(), 0.1), (motivation(), 0.2), (injuries(), 0.1)] {
            assert_eq!(s.value, 0.0);
            assert_relative_eq!(s.confidence, conf, epsilon = 1e-12);
        }
    }

    #[test]
    fn non_finite_signal_is_degraded_to_zero_confidence() {
        let s = Signal::new(f64::NAN, 0.7, "bad".into());
        assert_eq!(s.value, 0.0);
        assert_eq!(s.confidence, 0.0);
    }
}
