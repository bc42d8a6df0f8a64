use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The seven prediction factors, in the canonical order the engine
/// evaluates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FactorKind {
    TeamStrength,
    HeadToHead,
    HomeAdvantage,
    RestAdvantage,
    WeatherImpact,
    Motivation,
    Injuries,
}

impl FactorKind {
    pub const ALL: [FactorKind; 7] = [
        FactorKind::TeamStrength,
        FactorKind::HeadToHead,
        FactorKind::HomeAdvantage,
        FactorKind::RestAdvantage,
        FactorKind::WeatherImpact,
        FactorKind::Motivation,
        FactorKind::Injuries,
    ];

    /// Configuration key, used in weight maps and saved reports.
    pub fn key(&self) -> &'static str {
        match self {
            FactorKind::TeamStrength => "team_strength",
            FactorKind::HeadToHead => "head_to_head",
            FactorKind::HomeAdvantage => "home_advantage",
            FactorKind::RestAdvantage => "rest_advantage",
            FactorKind::WeatherImpact => "weather_impact",
            FactorKind::Motivation => "motivation",
            FactorKind::Injuries => "injuries",
        }
    }

    /// Display name, used on the `Factor` records themselves.
    pub fn label(&self) -> &'static str {
        match self {
            FactorKind::TeamStrength => "Team Strength",
            FactorKind::HeadToHead => "Head-to-Head",
            FactorKind::HomeAdvantage => "Home Advantage",
            FactorKind::RestAdvantage => "Rest Advantage",
            FactorKind::WeatherImpact => "Weather",
            FactorKind::Motivation => "Motivation",
            FactorKind::Injuries => "Injuries",
        }
    }
}

/// Factor-weight configuration: a name → weight map shared by all seven
/// calculators for one prediction.
///
/// Weights are not required to sum to 1.0; the combination step
/// normalizes. An explicit value passed into engine construction rather
/// than process-wide state, so the optimizer can sweep many
/// configurations at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    weights: BTreeMap<String, f64>,
}

impl Default for FactorWeights {
    /// The baseline tuning: team strength dominates, placeholders get
    /// token weight.
    fn default() -> Self {
        let mut w = FactorWeights {
            weights: BTreeMap::new(),
        };
        w.set(FactorKind::TeamStrength, 0.35);
        w.set(FactorKind::HeadToHead, 0.20);
        w.set(FactorKind::HomeAdvantage, 0.15);
        w.set(FactorKind::RestAdvantage, 0.10);
        w.set(FactorKind::WeatherImpact, 0.10);
        w.set(FactorKind::Motivation, 0.05);
        w.set(FactorKind::Injuries, 0.05);
        w
    }
}

impl FactorWeights {
    /// Weight for a factor; absent entries count as 0.
    pub fn get(&self, kind: FactorKind) -> f64 {
        self.weights.get(kind.key()).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, kind: FactorKind, weight: f64) {
        self.weights.insert(kind.key().to_string(), weight);
    }

    /// Builder-style helper for constructing test configurations.
    pub fn with(mut self, kind: FactorKind, weight: f64) -> Self {
        self.set(kind, weight);
        self
    }

    /// Weights in canonical factor order, for display and reports.
    pub fn entries(&self) -> Vec<(FactorKind, f64)> {
        FactorKind::ALL.iter().map(|k| (*k, self.get(*k))).collect()
    }

    /// Remove one factor and redistribute its weight proportionally across
    /// the remaining factors: `remaining[k] += removed * remaining[k] / Σremaining`.
    pub fn without_redistributed(&self, removed: FactorKind) -> FactorWeights {
        let removed_weight = self.get(removed);
        let mut out = self.clone();
        out.weights.remove(removed.key());
        let total_remaining: f64 = out.weights.values().sum();
        if total_remaining > 0.0 {
            for w in out.weights.values_mut() {
                *w += removed_weight * *w / total_remaining;
            }
        }
        out
    }
}
