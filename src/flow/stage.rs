//! The connect stages and their built-in defaults.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One connect stage of the flow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Social graph scan
    Twitter,
    /// Community engagement scan
    Telegram,
    /// On-chain activity scan
    Wallet,
}

const TWITTER_STEPS: &[&str] = &[
    "Checking Account Age & Followers",
    "Analyzing Tweet Engagement",
    "Measuring Crypto Influence",
    "Detecting Alpha Calls",
];

const TELEGRAM_STEPS: &[&str] = &[
    "Checking Group Memberships",
    "Analyzing Activity & Replies",
    "Measuring Influence in Key Groups",
    "Detecting Admin/Mod Roles",
];

const WALLET_STEPS: &[&str] = &[
    "Checking DEX Trades & Interactions",
    "Analyzing NFT Flip Performance",
    "Measuring DeFi Exposure & Farming Activity",
    "Detecting Blue-Chip Token Holdings",
];

impl Stage {
    /// Every stage in flow order.
    pub const ALL: [Self; 3] = [Self::Twitter, Self::Telegram, Self::Wallet];

    /// Lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Telegram => "telegram",
            Self::Wallet => "wallet",
        }
    }

    /// Display title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Twitter => "Twitter",
            Self::Telegram => "Telegram",
            Self::Wallet => "Wallet",
        }
    }

    /// Target score used when the configuration does not set one.
    ///
    /// Also the reference the scorecard measures influence against.
    #[must_use]
    pub const fn default_target_score(self) -> u64 {
        match self {
            Self::Twitter => 4200,
            Self::Telegram => 5250,
            Self::Wallet => 6750,
        }
    }

    /// Verification step labels used when the configuration sets none.
    #[must_use]
    pub const fn default_steps(self) -> &'static [&'static str] {
        match self {
            Self::Twitter => TWITTER_STEPS,
            Self::Telegram => TELEGRAM_STEPS,
            Self::Wallet => WALLET_STEPS,
        }
    }

    /// Where step signals come from unless configured otherwise.
    ///
    /// The wallet stage waits on the wallet provider; the social stages
    /// are paced by the sequencer's own timer.
    #[must_use]
    pub const fn default_verification(self) -> VerificationMode {
        match self {
            Self::Twitter | Self::Telegram => VerificationMode::Simulated,
            Self::Wallet => VerificationMode::External,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" => Ok(Self::Twitter),
            "telegram" => Ok(Self::Telegram),
            "wallet" => Ok(Self::Wallet),
            other => Err(format!(
                "unknown stage '{other}' (expected twitter, telegram or wallet)"
            )),
        }
    }
}

/// Configured origin of step-completion signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Steps complete on the sequencer's timer.
    Simulated,
    /// Steps complete as the external connector reports them.
    External,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_order() {
        assert_eq!(Stage::ALL, [Stage::Twitter, Stage::Telegram, Stage::Wallet]);
        assert!(Stage::Twitter < Stage::Wallet);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Stage::Telegram.default_target_score(), 5250);
        assert_eq!(Stage::Wallet.default_target_score(), 6750);
        assert_eq!(Stage::Wallet.default_steps().len(), 4);
        assert_eq!(
            Stage::Telegram.default_steps()[0],
            "Checking Group Memberships"
        );
        assert_eq!(
            Stage::Wallet.default_verification(),
            VerificationMode::External
        );
        assert_eq!(
            Stage::Twitter.default_verification(),
            VerificationMode::Simulated
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("Wallet".parse::<Stage>(), Ok(Stage::Wallet));
        assert!("discord".parse::<Stage>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&Stage::Telegram).unwrap(),
            "\"telegram\""
        );
        let mode: VerificationMode = serde_yaml::from_str("external").unwrap();
        assert_eq!(mode, VerificationMode::External);
    }
}
