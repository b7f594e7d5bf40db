//! Static sample leaderboard.

use serde::Serialize;

/// One leaderboard row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// Display name
    pub name: &'static str,
    /// Total score
    pub score: u64,
    /// 1-based position
    pub rank: u32,
}

/// Sample leaderboard, highest score first.
pub const LEADERBOARD: [LeaderboardEntry; 5] = [
    LeaderboardEntry {
        name: "CryptoWhale",
        score: 980,
        rank: 1,
    },
    LeaderboardEntry {
        name: "DegenKing",
        score: 965,
        rank: 2,
    },
    LeaderboardEntry {
        name: "AlphaSeeker",
        score: 943,
        rank: 3,
    },
    LeaderboardEntry {
        name: "SatoshiLover",
        score: 932,
        rank: 4,
    },
    LeaderboardEntry {
        name: "TokenMaster",
        score: 929,
        rank: 5,
    },
];

/// Top three entries.
#[must_use]
pub fn podium() -> &'static [LeaderboardEntry] {
    &LEADERBOARD[..3]
}

/// Position `total` would take: one plus the entries scoring strictly higher.
#[must_use]
pub fn rank_for(total: u64) -> u32 {
    let above = LEADERBOARD.iter().filter(|e| e.score > total).count();
    u32::try_from(above).map_or(u32::MAX, |n| n.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaderboard_sorted() {
        assert!(LEADERBOARD.windows(2).all(|w| w[0].score > w[1].score));
        assert!(LEADERBOARD.iter().enumerate().all(|(i, e)| e.rank as usize == i + 1));
    }

    #[test]
    fn test_podium() {
        let names: Vec<_> = podium().iter().map(|e| e.name).collect();
        assert_eq!(names, ["CryptoWhale", "DegenKing", "AlphaSeeker"]);
    }

    #[test]
    fn test_rank_for() {
        assert_eq!(rank_for(1000), 1);
        assert_eq!(rank_for(980), 1);
        assert_eq!(rank_for(970), 2);
        assert_eq!(rank_for(930), 5);
        assert_eq!(rank_for(810), 6);
        assert_eq!(rank_for(0), 6);
    }
}
