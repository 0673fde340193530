//! Core data model for the screening pipeline
//!
//! Every entity here is created fresh per evaluation cycle and discarded
//! after a signal is emitted or the token is skipped. No cross-cycle
//! mutable state lives in these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable market snapshot for one token, produced by an external
/// market-data collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetrics {
    pub address: String,
    pub ticker: String,
    pub name: String,
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub volume_24h_usd: f64,
    pub holder_count: u32,
    /// Net holder change over the last hour (can be negative)
    pub holder_change_1h: i32,
    /// Combined share of supply held by the top 10 wallets (0-100)
    pub top10_concentration_pct: f64,
    pub liquidity_usd: f64,
    /// Age of the token in minutes since launch
    pub age_minutes: u64,
    pub lp_locked: bool,
    pub lp_lock_duration_days: u32,
    /// Top holder wallet addresses, largest first (for rug cross-reference)
    #[serde(default)]
    pub top_holders: Vec<String>,
}

impl TokenMetrics {
    /// Volume to market cap ratio; 0 when market cap is 0
    pub fn volume_mcap_ratio(&self) -> f64 {
        if self.market_cap_usd <= 0.0 {
            return 0.0;
        }
        self.volume_24h_usd / self.market_cap_usd
    }
}

/// Contract-level security analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAnalysis {
    pub mint_authority_revoked: bool,
    pub freeze_authority_revoked: bool,
    pub metadata_mutable: bool,
    pub is_known_scam_template: bool,
}

impl ContractAnalysis {
    pub fn authorities_revoked(&self) -> bool {
        self.mint_authority_revoked && self.freeze_authority_revoked
    }
}

impl Default for ContractAnalysis {
    /// Conservative default: assume authorities are still active
    fn default() -> Self {
        Self {
            mint_authority_revoked: false,
            freeze_authority_revoked: false,
            metadata_mutable: true,
            is_known_scam_template: false,
        }
    }
}

/// Honeypot probe result from the security collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoneypotStatus {
    /// Sell path confirmed broken - holders can buy but not sell
    pub confirmed_unsellable: bool,
    pub failed_sell_count: u32,
}

/// Bundle risk classification from the security collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleRiskLevel {
    Low,
    Medium,
    High,
}

/// Coordinated-wallet (bundle/insider) analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleAnalysis {
    pub bundle_detected: bool,
    /// Share of supply acquired by commonly-funded wallets at launch (0-100)
    pub bundled_supply_pct: f64,
    pub clustered_wallet_count: u32,
    pub funding_overlap_detected: bool,
    pub has_rug_history: bool,
    pub risk_level: BundleRiskLevel,
}

impl Default for BundleAnalysis {
    /// Neutral default used when the bundle fetch fails open
    fn default() -> Self {
        Self {
            bundle_detected: false,
            bundled_supply_pct: 0.0,
            clustered_wallet_count: 0,
            funding_overlap_detected: false,
            has_rug_history: false,
            risk_level: BundleRiskLevel::Low,
        }
    }
}

/// Deployer wallet behaviour over the first 48h
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevWalletBehaviour {
    pub deployer_address: String,
    /// Share of the deployer's initial allocation sold in 48h (0-100)
    pub sold_pct_48h: f64,
    pub transferred_to_cex: bool,
    pub cex_addresses: Vec<String>,
    pub bridge_activity: bool,
}

/// Overall verdict of the risk filter cascade
///
/// Within one evaluation the verdict only moves in one direction:
/// Pass -> Flag -> Reject. Reject is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterVerdict {
    Pass,
    Flag,
    Reject,
}

impl FilterVerdict {
    /// Raise severity monotonically; never lowers an existing verdict
    pub fn raise(self, other: FilterVerdict) -> FilterVerdict {
        use FilterVerdict::*;
        match (self, other) {
            (Reject, _) | (_, Reject) => Reject,
            (Flag, _) | (_, Flag) => Flag,
            _ => Pass,
        }
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, FilterVerdict::Reject)
    }
}

/// Which cascade stage produced a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStage {
    Honeypot,
    Contract,
    Bundle,
    DevWallet,
    RugHistory,
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterStage::Honeypot => "honeypot",
            FilterStage::Contract => "contract",
            FilterStage::Bundle => "bundle",
            FilterStage::DevWallet => "dev_wallet",
            FilterStage::RugHistory => "rug_history",
        };
        write!(f, "{}", name)
    }
}

/// A single flag raised by a filter stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterFlag {
    pub stage: FilterStage,
    pub reason: String,
}

impl FilterFlag {
    pub fn new(stage: FilterStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FilterFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.reason)
    }
}

/// Full output of the risk filter cascade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScamFilterOutput {
    pub verdict: FilterVerdict,
    /// Ordered, append-only flag list
    pub flags: Vec<FilterFlag>,
    pub contract: ContractAnalysis,
    pub bundle: BundleAnalysis,
    pub dev_behaviour: Option<DevWalletBehaviour>,
    /// Top-holder wallets found in the rug registry
    pub rug_history_wallet_count: u32,
}

impl ScamFilterOutput {
    pub fn has_scam_template_flag(&self) -> bool {
        self.contract.is_known_scam_template
    }
}

/// Result of the cheap pre-filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickScreenResult {
    pub pass: bool,
    pub reason: Option<String>,
    pub warnings: Vec<String>,
}

/// Social activity snapshot from the social-data collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialMetrics {
    pub mention_count_24h: u32,
    pub mention_velocity_per_hour: f64,
    /// Engagement quality score (0-100)
    pub engagement_score: f64,
    /// Estimated share of bot accounts among mentioners (0-1)
    pub bot_ratio: f64,
    /// Aggregate sentiment (-1 bearish .. +1 bullish)
    pub sentiment: f64,
    pub kol_mentions: u32,
    pub top_tier_kol_mention: bool,
    /// Dominant narrative tag, if one was detected
    pub narrative: Option<String>,
}

impl Default for SocialMetrics {
    /// Neutral snapshot used when the social fetch fails open
    fn default() -> Self {
        Self {
            mention_count_24h: 0,
            mention_velocity_per_hour: 0.0,
            engagement_score: 0.0,
            bot_ratio: 0.5,
            sentiment: 0.0,
            kol_mentions: 0,
            top_tier_kol_mention: false,
            narrative: None,
        }
    }
}

/// Volume authenticity estimate from the market-data collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeAuthenticity {
    /// 0 = fully synthetic, 100 = fully organic
    pub score: f64,
    pub wash_trading_suspected: bool,
}

impl Default for VolumeAuthenticity {
    /// Middle-of-the-road default for a failed fetch
    fn default() -> Self {
        Self {
            score: 50.0,
            wash_trading_suspected: false,
        }
    }
}

/// KOL wallet classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletClass {
    Main,
    Side,
}

/// One observed KOL transaction on the candidate token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KolTransaction {
    pub signature: String,
    pub sol_amount: f64,
    pub usd_value: f64,
    pub tokens_acquired: f64,
    pub supply_pct: f64,
    pub timestamp: DateTime<Utc>,
}

/// A tracked KOL wallet's activity on the candidate token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KolWalletActivity {
    pub kol_name: String,
    pub wallet: String,
    pub wallet_class: WalletClass,
    /// Historical win rate of this KOL (0-1)
    pub win_rate: f64,
    pub avg_return_pct: f64,
    pub tracked_days: u32,
    pub transaction: KolTransaction,
}

/// The individual score factors, each 0-100 except the bonuses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactors {
    pub on_chain_health: f64,
    pub social_momentum: f64,
    pub kol_conviction_main: f64,
    pub kol_conviction_side: f64,
    pub scam_risk_inverse: f64,
    /// 0-30
    pub narrative_bonus: f64,
    /// 0-20
    pub timing_bonus: f64,
}

/// Confidence grade on a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn downgrade(self) -> Confidence {
        match self {
            Confidence::High => Confidence::Medium,
            Confidence::Medium | Confidence::Low => Confidence::Low,
        }
    }
}

/// Risk grading derived from the composite score, ordered safest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Force the level to be at least `floor` (floor = riskier bound)
    pub fn at_least(self, floor: RiskLevel) -> RiskLevel {
        if self < floor {
            floor
        } else {
            self
        }
    }
}

/// Which weighting profile produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreProfile {
    /// All five factors weighted; composite clamped to [0, 150]
    Validated,
    /// KOL-free scoring; composite clamped to [0, 100]
    Discovery,
}

impl ScoreProfile {
    pub fn max_composite(&self) -> f64 {
        match self {
            ScoreProfile::Validated => 150.0,
            ScoreProfile::Discovery => 100.0,
        }
    }
}

/// Scored evaluation of one token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenScore {
    pub token_address: String,
    pub composite_score: f64,
    pub factors: ScoreFactors,
    pub confidence: Confidence,
    /// Uncertainty band in score points (plus/minus)
    pub confidence_band_pts: f64,
    pub flags: Vec<FilterFlag>,
    pub risk_level: RiskLevel,
    pub profile: ScoreProfile,
}

/// Kind of emitted signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Buy,
    Discovery,
}

/// Price entry zone around the current price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryZone {
    pub low: f64,
    pub high: f64,
}

/// An actionable trade signal, immutable once built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    pub id: String,
    pub token_address: String,
    pub ticker: String,
    pub token_name: String,
    pub score: TokenScore,
    pub metrics: TokenMetrics,
    pub social: SocialMetrics,
    pub volume_authenticity: VolumeAuthenticity,
    pub scam_filter: ScamFilterOutput,
    /// Primary KOL behind the signal; None for discovery signals
    pub primary_kol: Option<KolWalletActivity>,
    pub entry_zone: EntryZone,
    pub position_size_pct: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub time_limit_hours: u32,
    pub generated_at: DateTime<Utc>,
    pub kind: SignalKind,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn test_volume_mcap_ratio_zero_mcap() {
        let mut metrics = test_metrics();
        metrics.market_cap_usd = 0.0;
        assert_eq!(metrics.volume_mcap_ratio(), 0.0);
    }

    #[test]
    fn test_verdict_raise_is_monotone() {
        use FilterVerdict::*;
        assert_eq!(Pass.raise(Flag), Flag);
        assert_eq!(Flag.raise(Pass), Flag);
        assert_eq!(Flag.raise(Reject), Reject);
        // Reject is terminal and cannot be lowered
        assert_eq!(Reject.raise(Pass), Reject);
        assert_eq!(Reject.raise(Flag), Reject);
    }

    #[test]
    fn test_risk_level_at_least() {
        assert_eq!(RiskLevel::VeryLow.at_least(RiskLevel::Medium), RiskLevel::Medium);
        assert_eq!(RiskLevel::High.at_least(RiskLevel::Medium), RiskLevel::High);
    }

    #[test]
    fn test_confidence_downgrade_saturates() {
        assert_eq!(Confidence::High.downgrade(), Confidence::Medium);
        assert_eq!(Confidence::Low.downgrade(), Confidence::Low);
    }

    pub(crate) fn test_metrics() -> TokenMetrics {
        TokenMetrics {
            address: "So11111111111111111111111111111111111111112".to_string(),
            ticker: "TEST".to_string(),
            name: "Test Token".to_string(),
            price_usd: 0.001,
            market_cap_usd: 2_000_000.0,
            volume_24h_usd: 800_000.0,
            holder_count: 600,
            holder_change_1h: 40,
            top10_concentration_pct: 20.0,
            liquidity_usd: 50_000.0,
            age_minutes: 90,
            lp_locked: true,
            lp_lock_duration_days: 90,
            top_holders: Vec::new(),
        }
    }
}
