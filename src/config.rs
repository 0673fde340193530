//! Configuration loading and validation
//!
//! Layered the same way across the whole crate: hard defaults, then an
//! optional TOML file, then `SCREENER__`-prefixed environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub filter: RiskFilterConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub signal: SignalBuilderConfig,
}

/// Timeouts for external fetches
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-fetch deadline; a timeout is a fetch failure, never a pipeline abort
    #[serde(default = "default_fetch_timeout_ms")]
    pub timeout_ms: u64,
    /// Lookback window for KOL activity
    #[serde(default = "default_kol_window_minutes")]
    pub kol_window_minutes: u64,
}

/// Thresholds for the risk filter cascade
#[derive(Debug, Clone, Deserialize)]
pub struct RiskFilterConfig {
    /// Token age (minutes) within which unrevoked authorities flag instead
    /// of reject - legitimate launches retain authority briefly
    #[serde(default = "default_authority_grace_minutes")]
    pub authority_grace_minutes: u64,
    /// Bundled supply % that flags on its own and rejects with rug history
    #[serde(default = "default_bundled_supply_high_pct")]
    pub bundled_supply_high_pct: f64,
    /// Bundled supply % that flags
    #[serde(default = "default_bundled_supply_medium_pct")]
    pub bundled_supply_medium_pct: f64,
    /// 48h dev sell % that rejects when combined with a CEX transfer
    #[serde(default = "default_dev_sell_reject_with_cex_pct")]
    pub dev_sell_reject_with_cex_pct: f64,
    /// 48h dev sell % that rejects on its own
    #[serde(default = "default_dev_sell_reject_pct")]
    pub dev_sell_reject_pct: f64,
    /// 48h dev sell % that flags
    #[serde(default = "default_dev_sell_flag_pct")]
    pub dev_sell_flag_pct: f64,
    /// Rug-registry hits among top holders that reject
    #[serde(default = "default_rug_holder_reject_count")]
    pub rug_holder_reject_count: u32,
    /// Rug-registry hits among top holders that flag
    #[serde(default = "default_rug_holder_flag_count")]
    pub rug_holder_flag_count: u32,
}

/// Factor weights for one scoring profile (fractions of 100 base points)
#[derive(Debug, Clone, Deserialize)]
pub struct FactorWeights {
    pub on_chain_health: f64,
    pub social_momentum: f64,
    pub kol_conviction_main: f64,
    pub kol_conviction_side: f64,
    pub scam_risk_inverse: f64,
}

impl FactorWeights {
    fn sum(&self) -> f64 {
        self.on_chain_health
            + self.social_momentum
            + self.kol_conviction_main
            + self.kol_conviction_side
            + self.scam_risk_inverse
    }
}

/// Composite scorer tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_validated_weights")]
    pub validated_weights: FactorWeights,
    #[serde(default = "default_discovery_weights")]
    pub discovery_weights: FactorWeights,

    // On-chain health ideals
    #[serde(default = "default_ideal_volume_mcap_ratio")]
    pub ideal_volume_mcap_ratio: f64,
    #[serde(default = "default_ideal_holder_count")]
    pub ideal_holder_count: u32,
    /// Top-10 concentration % earning full points
    #[serde(default = "default_ideal_top10_pct")]
    pub ideal_top10_pct: f64,
    /// Top-10 concentration % earning zero points
    #[serde(default = "default_worst_top10_pct")]
    pub worst_top10_pct: f64,

    // Social momentum ideals
    #[serde(default = "default_ideal_mention_velocity")]
    pub ideal_mention_velocity_per_hour: f64,

    // KOL conviction normalization
    /// Buy size (SOL) that counts as a full-weight buy
    #[serde(default = "default_kol_benchmark_buy_sol")]
    pub kol_benchmark_buy_sol: f64,
    /// Cap on the buy-size normalization factor
    #[serde(default = "default_kol_buy_factor_cap")]
    pub kol_buy_factor_cap: f64,
    /// Scale applied to the summed weighted conviction
    #[serde(default = "default_kol_conviction_scale")]
    pub kol_conviction_scale: f64,

    // Scam-risk-inverse penalties
    #[serde(default = "default_penalty_per_flag")]
    pub penalty_per_flag: f64,
    #[serde(default = "default_penalty_rug_history")]
    pub penalty_rug_history: f64,
    #[serde(default = "default_penalty_high_bundle")]
    pub penalty_high_bundle: f64,
    /// Bundled-supply % at which the high-bundle penalty applies; defaults
    /// to the cascade's high threshold so the two stay in step
    #[serde(default = "default_bundled_supply_high_pct")]
    pub high_bundle_supply_pct: f64,
    #[serde(default = "default_penalty_dev_cex")]
    pub penalty_dev_cex: f64,
    /// Maximum scam_risk_inverse when the filter verdict is FLAG
    #[serde(default = "default_flag_verdict_cap")]
    pub flag_verdict_cap: f64,

    // Narrative matching - explicit versioned config, not a global constant
    #[serde(default = "default_meta_themes")]
    pub meta_themes: Vec<String>,
    #[serde(default = "default_meta_themes_version")]
    pub meta_themes_version: u32,

    // Confidence minimums
    #[serde(default = "default_min_age_minutes")]
    pub min_age_minutes: u64,
    #[serde(default = "default_min_liquidity_usd")]
    pub min_liquidity_usd: f64,
    #[serde(default = "default_min_kol_sample")]
    pub min_kol_sample: usize,
}

/// Signal decision thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_buy_threshold")]
    pub buy_threshold: f64,
    #[serde(default = "default_discovery_threshold")]
    pub discovery_threshold: f64,
}

/// Trade-parameter construction
#[derive(Debug, Clone, Deserialize)]
pub struct SignalBuilderConfig {
    /// Starting position size as % of portfolio
    #[serde(default = "default_base_position_pct")]
    pub base_position_pct: f64,
    /// Score at which the first size-up tier applies
    #[serde(default = "default_size_up_tier1_score")]
    pub size_up_tier1_score: f64,
    #[serde(default = "default_size_up_tier1_mult")]
    pub size_up_tier1_mult: f64,
    /// Score at which the second size-up tier applies
    #[serde(default = "default_size_up_tier2_score")]
    pub size_up_tier2_score: f64,
    #[serde(default = "default_size_up_tier2_mult")]
    pub size_up_tier2_mult: f64,
    /// Hard cap on position size %
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: f64,
    /// Entry zone half-width around current price (%)
    #[serde(default = "default_entry_band_pct")]
    pub entry_band_pct: f64,
    /// Stop loss offset below entry (%)
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,
    /// First take-profit offset above entry (%)
    #[serde(default = "default_take_profit_1_pct")]
    pub take_profit_1_pct: f64,
    /// Second take-profit offset above entry (%)
    #[serde(default = "default_take_profit_2_pct")]
    pub take_profit_2_pct: f64,
    /// Signal expiry
    #[serde(default = "default_time_limit_hours")]
    pub time_limit_hours: u32,
}

// Default value functions

fn default_fetch_timeout_ms() -> u64 {
    5000
}

fn default_kol_window_minutes() -> u64 {
    240
}

fn default_authority_grace_minutes() -> u64 {
    60
}

fn default_bundled_supply_high_pct() -> f64 {
    25.0
}

fn default_bundled_supply_medium_pct() -> f64 {
    15.0
}

fn default_dev_sell_reject_with_cex_pct() -> f64 {
    30.0
}

fn default_dev_sell_reject_pct() -> f64 {
    60.0
}

fn default_dev_sell_flag_pct() -> f64 {
    20.0
}

fn default_rug_holder_reject_count() -> u32 {
    3
}

fn default_rug_holder_flag_count() -> u32 {
    1
}

fn default_validated_weights() -> FactorWeights {
    FactorWeights {
        on_chain_health: 0.25,
        social_momentum: 0.20,
        kol_conviction_main: 0.25,
        kol_conviction_side: 0.10,
        scam_risk_inverse: 0.20,
    }
}

fn default_discovery_weights() -> FactorWeights {
    FactorWeights {
        on_chain_health: 0.40,
        social_momentum: 0.25,
        kol_conviction_main: 0.0,
        kol_conviction_side: 0.0,
        scam_risk_inverse: 0.35,
    }
}

fn default_ideal_volume_mcap_ratio() -> f64 {
    0.3
}

fn default_ideal_holder_count() -> u32 {
    500
}

fn default_ideal_top10_pct() -> f64 {
    30.0
}

fn default_worst_top10_pct() -> f64 {
    70.0
}

fn default_ideal_mention_velocity() -> f64 {
    50.0
}

fn default_kol_benchmark_buy_sol() -> f64 {
    5.0
}

fn default_kol_buy_factor_cap() -> f64 {
    2.0
}

fn default_kol_conviction_scale() -> f64 {
    50.0
}

fn default_penalty_per_flag() -> f64 {
    10.0
}

fn default_penalty_rug_history() -> f64 {
    25.0
}

fn default_penalty_high_bundle() -> f64 {
    20.0
}

fn default_penalty_dev_cex() -> f64 {
    15.0
}

fn default_flag_verdict_cap() -> f64 {
    60.0
}

fn default_meta_themes() -> Vec<String> {
    vec![
        "(?i)\\bai\\b".to_string(),
        "(?i)agent".to_string(),
        "(?i)\\bdog\\b|\\bcat\\b|pepe".to_string(),
        "(?i)quant".to_string(),
    ]
}

fn default_meta_themes_version() -> u32 {
    1
}

fn default_min_age_minutes() -> u64 {
    30
}

fn default_min_liquidity_usd() -> f64 {
    25_000.0
}

fn default_min_kol_sample() -> usize {
    2
}

fn default_buy_threshold() -> f64 {
    70.0
}

fn default_discovery_threshold() -> f64 {
    45.0
}

fn default_base_position_pct() -> f64 {
    2.5
}

fn default_size_up_tier1_score() -> f64 {
    100.0
}

fn default_size_up_tier1_mult() -> f64 {
    1.5
}

fn default_size_up_tier2_score() -> f64 {
    120.0
}

fn default_size_up_tier2_mult() -> f64 {
    2.0
}

fn default_max_position_pct() -> f64 {
    10.0
}

fn default_entry_band_pct() -> f64 {
    2.0
}

fn default_stop_loss_pct() -> f64 {
    30.0
}

fn default_take_profit_1_pct() -> f64 {
    50.0
}

fn default_take_profit_2_pct() -> f64 {
    100.0
}

fn default_time_limit_hours() -> u32 {
    24
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_fetch_timeout_ms(),
            kol_window_minutes: default_kol_window_minutes(),
        }
    }
}

impl Default for RiskFilterConfig {
    fn default() -> Self {
        Self {
            authority_grace_minutes: default_authority_grace_minutes(),
            bundled_supply_high_pct: default_bundled_supply_high_pct(),
            bundled_supply_medium_pct: default_bundled_supply_medium_pct(),
            dev_sell_reject_with_cex_pct: default_dev_sell_reject_with_cex_pct(),
            dev_sell_reject_pct: default_dev_sell_reject_pct(),
            dev_sell_flag_pct: default_dev_sell_flag_pct(),
            rug_holder_reject_count: default_rug_holder_reject_count(),
            rug_holder_flag_count: default_rug_holder_flag_count(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            validated_weights: default_validated_weights(),
            discovery_weights: default_discovery_weights(),
            ideal_volume_mcap_ratio: default_ideal_volume_mcap_ratio(),
            ideal_holder_count: default_ideal_holder_count(),
            ideal_top10_pct: default_ideal_top10_pct(),
            worst_top10_pct: default_worst_top10_pct(),
            ideal_mention_velocity_per_hour: default_ideal_mention_velocity(),
            kol_benchmark_buy_sol: default_kol_benchmark_buy_sol(),
            kol_buy_factor_cap: default_kol_buy_factor_cap(),
            kol_conviction_scale: default_kol_conviction_scale(),
            penalty_per_flag: default_penalty_per_flag(),
            penalty_rug_history: default_penalty_rug_history(),
            penalty_high_bundle: default_penalty_high_bundle(),
            high_bundle_supply_pct: default_bundled_supply_high_pct(),
            penalty_dev_cex: default_penalty_dev_cex(),
            flag_verdict_cap: default_flag_verdict_cap(),
            meta_themes: default_meta_themes(),
            meta_themes_version: default_meta_themes_version(),
            min_age_minutes: default_min_age_minutes(),
            min_liquidity_usd: default_min_liquidity_usd(),
            min_kol_sample: default_min_kol_sample(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            buy_threshold: default_buy_threshold(),
            discovery_threshold: default_discovery_threshold(),
        }
    }
}

impl Default for SignalBuilderConfig {
    fn default() -> Self {
        Self {
            base_position_pct: default_base_position_pct(),
            size_up_tier1_score: default_size_up_tier1_score(),
            size_up_tier1_mult: default_size_up_tier1_mult(),
            size_up_tier2_score: default_size_up_tier2_score(),
            size_up_tier2_mult: default_size_up_tier2_mult(),
            max_position_pct: default_max_position_pct(),
            entry_band_pct: default_entry_band_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_1_pct: default_take_profit_1_pct(),
            take_profit_2_pct: default_take_profit_2_pct(),
            time_limit_hours: default_time_limit_hours(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            filter: RiskFilterConfig::default(),
            scoring: ScoringConfig::default(),
            gate: GateConfig::default(),
            signal: SignalBuilderConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix SCREENER_)
            .add_source(
                config::Environment::with_prefix("SCREENER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for weights in [&self.scoring.validated_weights, &self.scoring.discovery_weights] {
            let sum = weights.sum();
            if (sum - 1.0).abs() > 1e-6 {
                anyhow::bail!("factor weights must sum to 1.0, got {}", sum);
            }
        }

        if self.scoring.discovery_weights.kol_conviction_main != 0.0
            || self.scoring.discovery_weights.kol_conviction_side != 0.0
        {
            anyhow::bail!("discovery profile must not weight KOL factors");
        }

        if self.gate.discovery_threshold > self.gate.buy_threshold {
            anyhow::bail!(
                "discovery_threshold {} cannot exceed buy_threshold {}",
                self.gate.discovery_threshold,
                self.gate.buy_threshold
            );
        }

        if self.signal.base_position_pct <= 0.0
            || self.signal.base_position_pct > self.signal.max_position_pct
        {
            anyhow::bail!("base_position_pct must be positive and below the hard cap");
        }

        if self.signal.stop_loss_pct <= 0.0 || self.signal.stop_loss_pct >= 100.0 {
            anyhow::bail!("stop_loss_pct must be between 0 and 100");
        }

        if self.signal.take_profit_2_pct <= self.signal.take_profit_1_pct {
            anyhow::bail!("take_profit_2_pct must exceed take_profit_1_pct");
        }

        if self.filter.bundled_supply_medium_pct > self.filter.bundled_supply_high_pct {
            anyhow::bail!("bundle medium threshold cannot exceed the high threshold");
        }

        if self.filter.rug_holder_flag_count > self.filter.rug_holder_reject_count {
            anyhow::bail!("rug flag count cannot exceed the reject count");
        }

        // Compile theme patterns to catch bad regexes at startup
        for pattern in &self.scoring.meta_themes {
            regex::Regex::new(pattern)
                .with_context(|| format!("Invalid meta theme regex: {}", pattern))?;
        }

        Ok(())
    }
}
