//! Scorecard derived from the three stage scores.
//!
//! Everything here is a pure lookup over [`StageScores`]; there is no real
//! scoring model behind the numbers.

pub mod leaderboard;

use serde::{Deserialize, Serialize};

use crate::flow::Stage;

pub use leaderboard::{LEADERBOARD, LeaderboardEntry, podium, rank_for};

/// Upper bound of the combined score.
pub const MAX_TOTAL: u64 = 1000;

/// Divisor applied to the raw stage sum.
const TOTAL_DIVISOR: u64 = 20;

// ============================================================================
// Stage scores
// ============================================================================

/// Final score of each stage; zero for stages not yet connected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageScores {
    /// Twitter stage score
    pub twitter: u64,
    /// Telegram stage score
    pub telegram: u64,
    /// Wallet stage score
    pub wallet: u64,
}

impl StageScores {
    /// Score for `stage`.
    #[must_use]
    pub const fn get(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Twitter => self.twitter,
            Stage::Telegram => self.telegram,
            Stage::Wallet => self.wallet,
        }
    }

    /// Sets the score for `stage`.
    pub const fn set(&mut self, stage: Stage, score: u64) {
        match stage {
            Stage::Twitter => self.twitter = score,
            Stage::Telegram => self.telegram = score,
            Stage::Wallet => self.wallet = score,
        }
    }

    /// Raw sum of the three stages.
    #[must_use]
    pub const fn sum(&self) -> u64 {
        self.twitter
            .saturating_add(self.telegram)
            .saturating_add(self.wallet)
    }
}

// ============================================================================
// Lookups
// ============================================================================

/// Status banner keyed on percentile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTier {
    /// Percentile above 90
    Elite,
    /// Percentile above 70
    Advanced,
    /// Everyone else
    RisingStar,
}

impl StatusTier {
    /// Tier for a percentile.
    #[must_use]
    pub const fn for_percentile(percentile: u64) -> Self {
        if percentile > 90 {
            Self::Elite
        } else if percentile > 70 {
            Self::Advanced
        } else {
            Self::RisingStar
        }
    }

    /// Banner text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Elite => "ELITE STATUS",
            Self::Advanced => "ADVANCED STATUS",
            Self::RisingStar => "RISING STAR",
        }
    }
}

impl std::fmt::Display for StatusTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Badge text for a total score.
#[must_use]
pub const fn badge_for(total: u64) -> &'static str {
    match total {
        901.. => "Alpha Finder",
        801..=900 => "Degen Master",
        701..=800 => "Crypto Insider",
        601..=700 => "Web3 Enthusiast",
        501..=600 => "Future Whale",
        401..=500 => "Diamond Hands",
        301..=400 => "Hodler",
        201..=300 => "Crypto Explorer",
        _ => "Crypto Curious",
    }
}

/// One achievement and whether the scores unlock it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Achievement {
    /// Display label
    pub label: &'static str,
    /// Whether it is unlocked
    pub unlocked: bool,
}

/// Stage score as a whole percentage of its reference, rounded half up.
#[must_use]
pub const fn influence_percent(score: u64, reference: u64) -> u64 {
    if reference == 0 {
        return 0;
    }
    score.saturating_mul(100).saturating_add(reference / 2) / reference
}

/// Influence of each stage against its default target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Influence {
    /// Twitter influence percent
    pub twitter: u64,
    /// Telegram influence percent
    pub telegram: u64,
    /// Wallet influence percent
    pub wallet: u64,
}

// ============================================================================
// Scorecard
// ============================================================================

/// Everything the final screen shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scorecard {
    /// Per-stage scores
    pub scores: StageScores,
    /// Combined score, capped at [`MAX_TOTAL`]
    pub total: u64,
    /// "Top N%" figure, between 1 and 99
    pub percentile: u64,
    /// Position against the sample leaderboard
    pub rank: u32,
    /// Badge text
    pub badge: &'static str,
    /// Status banner
    pub tier: StatusTier,
    /// Achievement list, in display order
    pub achievements: Vec<Achievement>,
    /// Per-stage influence percentages
    pub influence: Influence,
}

impl Scorecard {
    /// Derives the scorecard from stage scores.
    #[must_use]
    pub fn from_scores(scores: StageScores) -> Self {
        let total = (scores.sum() / TOTAL_DIVISOR).min(MAX_TOTAL);
        let percentile = (total / 10).clamp(1, 99);
        let achievements = vec![
            Achievement {
                label: "Early Adopter",
                unlocked: scores.twitter > 1000,
            },
            Achievement {
                label: "Top 10%",
                unlocked: percentile >= 90,
            },
            Achievement {
                label: "Power User",
                unlocked: total > 800,
            },
            Achievement {
                label: "Gem Finder",
                unlocked: scores.wallet > 3000,
            },
        ];
        let influence = Influence {
            twitter: influence_percent(
                scores.twitter,
                Stage::Twitter.default_target_score(),
            ),
            telegram: influence_percent(
                scores.telegram,
                Stage::Telegram.default_target_score(),
            ),
            wallet: influence_percent(scores.wallet, Stage::Wallet.default_target_score()),
        };
        Self {
            scores,
            total,
            percentile,
            rank: rank_for(total),
            badge: badge_for(total),
            tier: StatusTier::for_percentile(percentile),
            achievements,
            influence,
        }
    }

    /// Number of unlocked achievements.
    #[must_use]
    pub fn unlocked_count(&self) -> usize {
        self.achievements.iter().filter(|a| a.unlocked).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> StageScores {
        StageScores {
            twitter: 4200,
            telegram: 5250,
            wallet: 6750,
        }
    }

    #[test]
    fn test_default_run_scorecard() {
        let card = Scorecard::from_scores(defaults());
        assert_eq!(card.total, 810);
        assert_eq!(card.percentile, 81);
        assert_eq!(card.rank, 6);
        assert_eq!(card.badge, "Degen Master");
        assert_eq!(card.tier, StatusTier::Advanced);
        assert_eq!(card.influence.twitter, 100);
        assert_eq!(card.influence.wallet, 100);
        let unlocked: Vec<_> = card
            .achievements
            .iter()
            .filter(|a| a.unlocked)
            .map(|a| a.label)
            .collect();
        assert_eq!(unlocked, ["Early Adopter", "Power User", "Gem Finder"]);
    }

    #[test]
    fn test_empty_scores() {
        let card = Scorecard::from_scores(StageScores::default());
        assert_eq!(card.total, 0);
        assert_eq!(card.percentile, 1);
        assert_eq!(card.badge, "Crypto Curious");
        assert_eq!(card.tier, StatusTier::RisingStar);
        assert_eq!(card.unlocked_count(), 0);
    }

    #[test]
    fn test_total_is_capped() {
        let card = Scorecard::from_scores(StageScores {
            twitter: 40_000,
            telegram: 0,
            wallet: 0,
        });
        assert_eq!(card.total, MAX_TOTAL);
        assert_eq!(card.percentile, 99);
        assert_eq!(card.tier, StatusTier::Elite);
        assert_eq!(card.rank, 1);
        assert!(card.achievements[1].unlocked);
    }

    #[test]
    fn test_badge_thresholds_are_exclusive() {
        assert_eq!(badge_for(901), "Alpha Finder");
        assert_eq!(badge_for(900), "Degen Master");
        assert_eq!(badge_for(801), "Degen Master");
        assert_eq!(badge_for(800), "Crypto Insider");
        assert_eq!(badge_for(501), "Future Whale");
        assert_eq!(badge_for(301), "Hodler");
        assert_eq!(badge_for(201), "Crypto Explorer");
        assert_eq!(badge_for(200), "Crypto Curious");
    }

    #[test]
    fn test_status_tier_boundaries() {
        assert_eq!(StatusTier::for_percentile(91), StatusTier::Elite);
        assert_eq!(StatusTier::for_percentile(90), StatusTier::Advanced);
        assert_eq!(StatusTier::for_percentile(70), StatusTier::RisingStar);
        assert_eq!(StatusTier::Elite.to_string(), "ELITE STATUS");
    }

    #[test]
    fn test_influence_rounding() {
        assert_eq!(influence_percent(2100, 4200), 50);
        assert_eq!(influence_percent(1, 200), 1);
        assert_eq!(influence_percent(0, 6750), 0);
        assert_eq!(influence_percent(5, 0), 0);
    }

    #[test]
    fn test_stage_scores_accessors() {
        let mut scores = StageScores::default();
        scores.set(Stage::Wallet, 42);
        assert_eq!(scores.get(Stage::Wallet), 42);
        assert_eq!(scores.sum(), 42);
    }
}
