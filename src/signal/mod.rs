//! Signal decision gate and trade-parameter builder
//!
//! The gate decides whether an approved score becomes a signal at all; the
//! builder turns an approved score into concrete trade parameters. Neither
//! ever errors: a blocked signal is a value with a reason, not an exception.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::config::{GateConfig, SignalBuilderConfig};
use crate::providers::KolProvider;
use crate::types::{
    EntryZone, FilterVerdict, KolWalletActivity, ScamFilterOutput, SignalKind, SocialMetrics,
    TokenMetrics, TokenScore, TradeSignal, VolumeAuthenticity, WalletClass,
};

// Caution multipliers applied to the position size
const LOW_LIQUIDITY_MULT: f64 = 0.5;
const NEW_TOKEN_MULT: f64 = 0.75;
const SIDE_ONLY_MULT: f64 = 0.75;
const CAUTION_LIQUIDITY_USD: f64 = 25_000.0;
const NEW_TOKEN_AGE_MINUTES: u64 = 30;

/// Gate verdict with a human-readable reason on rejection
#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
    pub meets: bool,
    pub reason: Option<String>,
}

impl GateDecision {
    fn approve() -> Self {
        Self {
            meets: true,
            reason: None,
        }
    }

    fn block(reason: impl Into<String>) -> Self {
        Self {
            meets: false,
            reason: Some(reason.into()),
        }
    }
}

/// Minimum-score and minimum-evidence thresholds for signal emission
pub struct DecisionGate {
    config: GateConfig,
    kol: Arc<dyn KolProvider>,
}

impl DecisionGate {
    pub fn new(config: GateConfig, kol: Arc<dyn KolProvider>) -> Self {
        Self { config, kol }
    }

    /// BUY gate: score threshold plus independent KOL evidence.
    /// A missing qualifying KOL activity is a hard block regardless of score.
    pub fn meets_buy_requirements(
        &self,
        score: &TokenScore,
        activities: &[KolWalletActivity],
    ) -> GateDecision {
        if activities.is_empty() {
            return GateDecision::block("no KOL activity backing the signal");
        }

        if score.composite_score < self.config.buy_threshold {
            return GateDecision::block(format!(
                "composite score {:.1} below buy threshold {:.1}",
                score.composite_score, self.config.buy_threshold
            ));
        }

        let qualifying = activities
            .iter()
            .any(|a| self.kol.meets_signal_requirements(a));
        if !qualifying {
            return GateDecision::block("no KOL activity meets the minimum-evidence requirements");
        }

        GateDecision::approve()
    }

    /// DISCOVERY gate: score threshold plus basic contract hygiene
    pub fn meets_discovery_requirements(
        &self,
        score: &TokenScore,
        filter: &ScamFilterOutput,
    ) -> GateDecision {
        if score.composite_score < self.config.discovery_threshold {
            return GateDecision::block(format!(
                "composite score {:.1} below discovery threshold {:.1}",
                score.composite_score, self.config.discovery_threshold
            ));
        }

        if filter.verdict == FilterVerdict::Reject {
            return GateDecision::block("risk filter rejected the token");
        }

        if !filter.contract.mint_authority_revoked && !filter.contract.freeze_authority_revoked {
            return GateDecision::block("both mint and freeze authority still active");
        }

        if filter.has_scam_template_flag() {
            return GateDecision::block("known scam contract template");
        }

        GateDecision::approve()
    }
}

/// Supporting data handed to the builder alongside the approved score
pub struct SignalInputs<'a> {
    pub metrics: &'a TokenMetrics,
    pub social: &'a SocialMetrics,
    pub volume_auth: &'a VolumeAuthenticity,
    pub filter: &'a ScamFilterOutput,
}

/// Converts an approved score into an immutable trade-parameter record
pub struct SignalBuilder {
    config: SignalBuilderConfig,
}

impl SignalBuilder {
    pub fn new(config: SignalBuilderConfig) -> Self {
        Self { config }
    }

    /// Build a BUY signal; `activities` must be the gate-approved list and
    /// its first entry becomes the primary KOL
    pub fn build_buy_signal(
        &self,
        score: TokenScore,
        inputs: &SignalInputs<'_>,
        activities: &[KolWalletActivity],
    ) -> TradeSignal {
        let primary = activities.first().cloned();
        self.build(score, inputs, primary, activities, SignalKind::Buy)
    }

    /// Build a DISCOVERY signal (no KOL evidence yet)
    pub fn build_discovery_signal(
        &self,
        score: TokenScore,
        inputs: &SignalInputs<'_>,
    ) -> TradeSignal {
        self.build(score, inputs, None, &[], SignalKind::Discovery)
    }

    fn build(
        &self,
        score: TokenScore,
        inputs: &SignalInputs<'_>,
        primary_kol: Option<KolWalletActivity>,
        activities: &[KolWalletActivity],
        kind: SignalKind,
    ) -> TradeSignal {
        let position_size_pct = self.position_size(&score, inputs.metrics, activities);

        let price = inputs.metrics.price_usd;
        let band = self.config.entry_band_pct / 100.0;
        let entry_zone = EntryZone {
            low: price * (1.0 - band),
            high: price * (1.0 + band),
        };

        let signal = TradeSignal {
            id: Uuid::new_v4().to_string(),
            token_address: inputs.metrics.address.clone(),
            ticker: inputs.metrics.ticker.clone(),
            token_name: inputs.metrics.name.clone(),
            score,
            metrics: inputs.metrics.clone(),
            social: inputs.social.clone(),
            volume_authenticity: inputs.volume_auth.clone(),
            scam_filter: inputs.filter.clone(),
            primary_kol,
            entry_zone,
            position_size_pct,
            stop_loss: price * (1.0 - self.config.stop_loss_pct / 100.0),
            take_profit_1: price * (1.0 + self.config.take_profit_1_pct / 100.0),
            take_profit_2: price * (1.0 + self.config.take_profit_2_pct / 100.0),
            time_limit_hours: self.config.time_limit_hours,
            generated_at: Utc::now(),
            kind,
        };

        debug!(
            token = %signal.token_address,
            kind = ?signal.kind,
            size_pct = signal.position_size_pct,
            "built trade signal"
        );

        signal
    }

    /// Default size, tiered up for very high scores, shrunk for caution
    /// flags, hard-capped
    fn position_size(
        &self,
        score: &TokenScore,
        metrics: &TokenMetrics,
        activities: &[KolWalletActivity],
    ) -> f64 {
        let mut size = self.config.base_position_pct;

        if score.composite_score >= self.config.size_up_tier2_score {
            size *= self.config.size_up_tier2_mult;
        } else if score.composite_score >= self.config.size_up_tier1_score {
            size *= self.config.size_up_tier1_mult;
        }

        if metrics.liquidity_usd < CAUTION_LIQUIDITY_USD {
            size *= LOW_LIQUIDITY_MULT;
        }
        if metrics.age_minutes < NEW_TOKEN_AGE_MINUTES {
            size *= NEW_TOKEN_MULT;
        }

        let side_only = !activities.is_empty()
            && !activities
                .iter()
                .any(|a| a.wallet_class == WalletClass::Main);
        if side_only {
            size *= SIDE_ONLY_MULT;
        }

        size.min(self.config.max_position_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        BundleAnalysis, Confidence, ContractAnalysis, KolTransaction, RiskLevel, ScoreFactors,
        ScoreProfile,
    };
    use async_trait::async_trait;
    use std::time::Duration;

    /// KOL provider whose evidence predicate is a simple SOL floor
    struct StubKol {
        min_sol: f64,
    }

    #[async_trait]
    impl KolProvider for StubKol {
        async fn get_kol_activity(
            &self,
            _address: &str,
            _window: Duration,
        ) -> crate::error::Result<Vec<KolWalletActivity>> {
            Ok(vec![])
        }

        fn signal_weight(&self, activity: &KolWalletActivity) -> f64 {
            activity.win_rate
        }

        fn meets_signal_requirements(&self, activity: &KolWalletActivity) -> bool {
            activity.transaction.sol_amount >= self.min_sol
        }
    }

    fn gate() -> DecisionGate {
        DecisionGate::new(GateConfig::default(), Arc::new(StubKol { min_sol: 1.0 }))
    }

    fn score(composite: f64, profile: ScoreProfile) -> TokenScore {
        TokenScore {
            token_address: "addr".to_string(),
            composite_score: composite,
            factors: ScoreFactors::default(),
            confidence: Confidence::High,
            confidence_band_pts: 5.0,
            flags: vec![],
            risk_level: RiskLevel::Low,
            profile,
        }
    }

    fn activity(class: WalletClass, sol: f64) -> KolWalletActivity {
        KolWalletActivity {
            kol_name: "kol".to_string(),
            wallet: "wallet".to_string(),
            wallet_class: class,
            win_rate: 0.6,
            avg_return_pct: 30.0,
            tracked_days: 90,
            transaction: KolTransaction {
                signature: "sig".to_string(),
                sol_amount: sol,
                usd_value: sol * 150.0,
                tokens_acquired: 1_000_000.0,
                supply_pct: 0.3,
                timestamp: Utc::now(),
            },
        }
    }

    fn clean_filter() -> ScamFilterOutput {
        ScamFilterOutput {
            verdict: FilterVerdict::Pass,
            flags: vec![],
            contract: ContractAnalysis {
                mint_authority_revoked: true,
                freeze_authority_revoked: true,
                metadata_mutable: false,
                is_known_scam_template: false,
            },
            bundle: BundleAnalysis::default(),
            dev_behaviour: None,
            rug_history_wallet_count: 0,
        }
    }

    #[test]
    fn test_buy_gate_blocks_empty_activities_regardless_of_score() {
        let decision = gate().meets_buy_requirements(&score(149.0, ScoreProfile::Validated), &[]);
        assert!(!decision.meets);
        assert!(decision.reason.unwrap().contains("no KOL activity"));
    }

    #[test]
    fn test_buy_gate_blocks_low_score_regardless_of_kol() {
        let activities = vec![activity(WalletClass::Main, 20.0)];
        let decision =
            gate().meets_buy_requirements(&score(69.9, ScoreProfile::Validated), &activities);
        assert!(!decision.meets);
        assert!(decision.reason.unwrap().contains("below buy threshold"));
    }

    #[test]
    fn test_buy_gate_requires_qualifying_activity() {
        // Activity exists but fails the collaborator's evidence predicate
        let activities = vec![activity(WalletClass::Main, 0.1)];
        let decision =
            gate().meets_buy_requirements(&score(90.0, ScoreProfile::Validated), &activities);
        assert!(!decision.meets);
        assert!(decision.reason.unwrap().contains("minimum-evidence"));
    }

    #[test]
    fn test_buy_gate_approves() {
        let activities = vec![activity(WalletClass::Main, 15.0)];
        let decision =
            gate().meets_buy_requirements(&score(85.0, ScoreProfile::Validated), &activities);
        assert!(decision.meets);
        assert!(decision.reason.is_none());
    }

    #[test]
    fn test_discovery_gate_scenario_e() {
        // Score 50 vs threshold 45, filter not rejected, authorities fine
        let decision = gate()
            .meets_discovery_requirements(&score(50.0, ScoreProfile::Discovery), &clean_filter());
        assert!(decision.meets);
    }

    #[test]
    fn test_discovery_gate_blocks_below_threshold() {
        let decision = gate()
            .meets_discovery_requirements(&score(40.0, ScoreProfile::Discovery), &clean_filter());
        assert!(!decision.meets);
    }

    #[test]
    fn test_discovery_gate_blocks_rejected_filter() {
        let mut filter = clean_filter();
        filter.verdict = FilterVerdict::Reject;
        let decision =
            gate().meets_discovery_requirements(&score(60.0, ScoreProfile::Discovery), &filter);
        assert!(!decision.meets);
    }

    #[test]
    fn test_discovery_gate_blocks_both_authorities_active() {
        let mut filter = clean_filter();
        filter.contract.mint_authority_revoked = false;
        filter.contract.freeze_authority_revoked = false;
        let decision =
            gate().meets_discovery_requirements(&score(60.0, ScoreProfile::Discovery), &filter);
        assert!(!decision.meets);

        // One unrevoked authority alone does not block the discovery gate
        filter.contract.freeze_authority_revoked = true;
        let decision =
            gate().meets_discovery_requirements(&score(60.0, ScoreProfile::Discovery), &filter);
        assert!(decision.meets);
    }

    #[test]
    fn test_discovery_gate_blocks_scam_template() {
        let mut filter = clean_filter();
        filter.contract.is_known_scam_template = true;
        let decision =
            gate().meets_discovery_requirements(&score(60.0, ScoreProfile::Discovery), &filter);
        assert!(!decision.meets);
    }

    fn builder() -> SignalBuilder {
        SignalBuilder::new(SignalBuilderConfig::default())
    }

    fn inputs<'a>(
        metrics: &'a TokenMetrics,
        social: &'a SocialMetrics,
        va: &'a VolumeAuthenticity,
        filter: &'a ScamFilterOutput,
    ) -> SignalInputs<'a> {
        SignalInputs {
            metrics,
            social,
            volume_auth: va,
            filter,
        }
    }

    #[test]
    fn test_buy_signal_trade_parameters() {
        let metrics = crate::types::tests::test_metrics();
        let social = SocialMetrics::default();
        let va = VolumeAuthenticity::default();
        let filter = clean_filter();
        let activities = vec![activity(WalletClass::Main, 15.0)];

        let signal = builder().build_buy_signal(
            score(85.0, ScoreProfile::Validated),
            &inputs(&metrics, &social, &va, &filter),
            &activities,
        );

        assert_eq!(signal.kind, SignalKind::Buy);
        assert!(signal.primary_kol.is_some());
        // Entry zone is price +/- 2%
        assert!((signal.entry_zone.low - 0.00098).abs() < 1e-9);
        assert!((signal.entry_zone.high - 0.00102).abs() < 1e-9);
        // Fixed percentage offsets
        assert!((signal.stop_loss - 0.0007).abs() < 1e-9);
        assert!((signal.take_profit_1 - 0.0015).abs() < 1e-9);
        assert!((signal.take_profit_2 - 0.002).abs() < 1e-9);
        assert_eq!(signal.time_limit_hours, 24);
        // No tiers or cautions apply at score 85 with healthy metrics
        assert!((signal.position_size_pct - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_position_size_tiers_up_for_high_scores() {
        let metrics = crate::types::tests::test_metrics();
        let social = SocialMetrics::default();
        let va = VolumeAuthenticity::default();
        let filter = clean_filter();
        let activities = vec![activity(WalletClass::Main, 15.0)];
        let b = builder();

        let tier1 = b.build_buy_signal(
            score(105.0, ScoreProfile::Validated),
            &inputs(&metrics, &social, &va, &filter),
            &activities,
        );
        assert!((tier1.position_size_pct - 3.75).abs() < 1e-9);

        let tier2 = b.build_buy_signal(
            score(130.0, ScoreProfile::Validated),
            &inputs(&metrics, &social, &va, &filter),
            &activities,
        );
        assert!((tier2.position_size_pct - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_size_caution_multipliers() {
        let mut metrics = crate::types::tests::test_metrics();
        metrics.liquidity_usd = 10_000.0;
        metrics.age_minutes = 10;
        let social = SocialMetrics::default();
        let va = VolumeAuthenticity::default();
        let filter = clean_filter();
        let side_only = vec![activity(WalletClass::Side, 15.0)];

        let signal = builder().build_buy_signal(
            score(85.0, ScoreProfile::Validated),
            &inputs(&metrics, &social, &va, &filter),
            &side_only,
        );
        // 2.5 * 0.5 * 0.75 * 0.75
        assert!((signal.position_size_pct - 0.703125).abs() < 1e-9);
    }

    #[test]
    fn test_position_size_hard_cap() {
        let metrics = crate::types::tests::test_metrics();
        let social = SocialMetrics::default();
        let va = VolumeAuthenticity::default();
        let filter = clean_filter();
        let activities = vec![activity(WalletClass::Main, 15.0)];

        let mut config = SignalBuilderConfig::default();
        config.base_position_pct = 8.0;
        let b = SignalBuilder::new(config);

        let signal = b.build_buy_signal(
            score(130.0, ScoreProfile::Validated),
            &inputs(&metrics, &social, &va, &filter),
            &activities,
        );
        assert_eq!(signal.position_size_pct, 10.0);
    }

    #[test]
    fn test_discovery_signal_has_no_primary_kol() {
        let metrics = crate::types::tests::test_metrics();
        let social = SocialMetrics::default();
        let va = VolumeAuthenticity::default();
        let filter = clean_filter();

        let signal = builder().build_discovery_signal(
            score(50.0, ScoreProfile::Discovery),
            &inputs(&metrics, &social, &va, &filter),
        );
        assert_eq!(signal.kind, SignalKind::Discovery);
        assert!(signal.primary_kol.is_none());
    }
}
