//! Risk filter: quick screen + ordered short-circuiting cascade
//!
//! The cascade runs honeypot, contract, bundle, dev-wallet and rug-history
//! checks strictly in order. Any stage can escalate the verdict to FLAG;
//! the first REJECT finalizes the output and skips the remaining stages,
//! leaving their fields at safe defaults.
//!
//! Failure policy: a stage whose fetch fails never aborts the pipeline.
//! Honeypot and contract (mint authority) fail closed with an
//! "analysis unavailable" flag; the rest fail open with neutral defaults.

pub mod stages;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RiskFilterConfig;
use crate::error::Error;
use crate::providers::{RugRegistry, SecurityProvider};
use crate::types::{
    BundleAnalysis, ContractAnalysis, DevWalletBehaviour, FilterFlag, FilterVerdict,
    QuickScreenResult, ScamFilterOutput, TokenMetrics,
};

pub use stages::StageOutcome;

/// Cheap pre-filter and full risk cascade over the security collaborators
pub struct RiskFilter {
    config: RiskFilterConfig,
    security: Arc<dyn SecurityProvider>,
    rug_registry: Arc<dyn RugRegistry>,
    fetch_timeout: Duration,
}

/// Accumulates the verdict and the ordered flag list while folding stages
struct CascadeState {
    verdict: FilterVerdict,
    flags: Vec<FilterFlag>,
}

impl CascadeState {
    fn new() -> Self {
        Self {
            verdict: FilterVerdict::Pass,
            flags: Vec::new(),
        }
    }

    /// Apply one stage outcome; returns false once the cascade is finalized
    fn apply(&mut self, outcome: StageOutcome) -> bool {
        match outcome {
            StageOutcome::Continue => true,
            StageOutcome::Flag(flag) => {
                debug!(flag = %flag, "risk filter stage flagged");
                self.verdict = self.verdict.raise(FilterVerdict::Flag);
                self.flags.push(flag);
                true
            }
            StageOutcome::Reject(flag) => {
                warn!(flag = %flag, "risk filter stage rejected");
                self.verdict = FilterVerdict::Reject;
                self.flags.push(flag);
                false
            }
        }
    }
}

impl RiskFilter {
    pub fn new(
        config: RiskFilterConfig,
        security: Arc<dyn SecurityProvider>,
        rug_registry: Arc<dyn RugRegistry>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            config,
            security,
            rug_registry,
            fetch_timeout,
        }
    }

    /// Cheap pre-filter using contract analysis only
    ///
    /// Eliminates obviously-bad candidates before the expensive pipeline
    /// runs. Fails closed: an unreachable security provider means the token
    /// is treated as suspicious.
    pub async fn quick_check(&self, address: &str) -> QuickScreenResult {
        match self.fetch("contract", self.security.analyze_contract(address)).await {
            None => QuickScreenResult {
                pass: false,
                reason: Some("contract check failed, treating token as suspicious".to_string()),
                warnings: Vec::new(),
            },
            Some(analysis) if analysis.is_known_scam_template => QuickScreenResult {
                pass: false,
                reason: Some("matches known scam contract template".to_string()),
                warnings: Vec::new(),
            },
            Some(analysis) => {
                // Legitimate new launches retain authority briefly, so this
                // is a warning rather than a fail
                let mut warnings = Vec::new();
                if !analysis.mint_authority_revoked {
                    warnings.push("mint authority not yet revoked".to_string());
                }
                if !analysis.freeze_authority_revoked {
                    warnings.push("freeze authority not yet revoked".to_string());
                }
                QuickScreenResult {
                    pass: true,
                    reason: None,
                    warnings,
                }
            }
        }
    }

    /// Run the full cascade for one token
    ///
    /// `bundle` is pre-fetched by the pipeline alongside the market data;
    /// None means that fetch failed and the stage fails open with the
    /// neutral default.
    pub async fn filter_token(
        &self,
        metrics: &TokenMetrics,
        bundle: Option<BundleAnalysis>,
    ) -> ScamFilterOutput {
        let mut state = CascadeState::new();

        // Stage 1: honeypot (fail closed)
        let honeypot = self
            .fetch("honeypot", self.security.check_honeypot(&metrics.address))
            .await;
        if !state.apply(stages::evaluate_honeypot(honeypot.as_ref())) {
            return self.finalize(state, ContractAnalysis::default(), BundleAnalysis::default(), None, 0);
        }

        // Stage 2: contract (mint-authority check fails closed)
        let contract = self
            .fetch("contract", self.security.analyze_contract(&metrics.address))
            .await;
        for outcome in stages::evaluate_contract(contract.as_ref(), metrics.age_minutes, &self.config)
        {
            if !state.apply(outcome) {
                return self.finalize(
                    state,
                    contract.unwrap_or_default(),
                    BundleAnalysis::default(),
                    None,
                    0,
                );
            }
        }
        let contract = contract.unwrap_or_default();

        // Stage 3: bundle / insider (fails open)
        let bundle = bundle.unwrap_or_default();
        if !state.apply(stages::evaluate_bundle(&bundle, &self.config)) {
            return self.finalize(state, contract, bundle, None, 0);
        }

        // Stage 4: dev wallet behaviour (skipped when deployer unknown)
        let dev_behaviour = self
            .fetch("dev_wallet", self.security.analyze_dev_wallet(&metrics.address))
            .await
            .flatten();
        if !state.apply(stages::evaluate_dev_wallet(dev_behaviour.as_ref(), &self.config)) {
            return self.finalize(state, contract, bundle, dev_behaviour, 0);
        }

        // Stage 5: rug-history cross-reference over top holders
        let rug_count = self.count_rug_holders(&metrics.top_holders).await;
        state.apply(stages::evaluate_rug_history(rug_count, &self.config));

        self.finalize(state, contract, bundle, dev_behaviour, rug_count)
    }

    async fn count_rug_holders(&self, top_holders: &[String]) -> u32 {
        let mut count = 0;
        for wallet in top_holders {
            if self.rug_registry.is_rug_wallet(wallet).await {
                count += 1;
            }
        }
        count
    }

    fn finalize(
        &self,
        state: CascadeState,
        contract: ContractAnalysis,
        bundle: BundleAnalysis,
        dev_behaviour: Option<DevWalletBehaviour>,
        rug_history_wallet_count: u32,
    ) -> ScamFilterOutput {
        ScamFilterOutput {
            verdict: state.verdict,
            flags: state.flags,
            contract,
            bundle,
            dev_behaviour,
            rug_history_wallet_count,
        }
    }

    /// Run a provider fetch under the configured deadline, converting any
    /// failure into None for the stage policy to handle
    async fn fetch<T, F>(&self, what: &str, fut: F) -> Option<T>
    where
        F: Future<Output = crate::error::Result<T>>,
    {
        match tokio::time::timeout(self.fetch_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(fetch = what, error = %e, "security fetch failed");
                None
            }
            Err(_) => {
                let e = Error::FetchTimeout(self.fetch_timeout.as_millis() as u64);
                warn!(fetch = what, error = %e, "security fetch timed out");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::types::{BundleRiskLevel, FilterStage, HoneypotStatus};
    use async_trait::async_trait;

    /// Scriptable security provider for cascade tests
    struct MockSecurity {
        contract: Result<ContractAnalysis>,
        bundle: Result<BundleAnalysis>,
        dev: Result<Option<DevWalletBehaviour>>,
        honeypot: Result<HoneypotStatus>,
    }

    impl Default for MockSecurity {
        fn default() -> Self {
            Self {
                contract: Ok(ContractAnalysis {
                    mint_authority_revoked: true,
                    freeze_authority_revoked: true,
                    metadata_mutable: false,
                    is_known_scam_template: false,
                }),
                bundle: Ok(BundleAnalysis::default()),
                dev: Ok(None),
                honeypot: Ok(HoneypotStatus::default()),
            }
        }
    }

    fn clone_result<T: Clone>(r: &Result<T>) -> Result<T> {
        match r {
            Ok(v) => Ok(v.clone()),
            Err(_) => Err(Error::provider("security", "scripted failure")),
        }
    }

    #[async_trait]
    impl SecurityProvider for MockSecurity {
        async fn analyze_contract(&self, _address: &str) -> Result<ContractAnalysis> {
            clone_result(&self.contract)
        }
        async fn analyze_bundles(&self, _address: &str) -> Result<BundleAnalysis> {
            clone_result(&self.bundle)
        }
        async fn analyze_dev_wallet(&self, _address: &str) -> Result<Option<DevWalletBehaviour>> {
            clone_result(&self.dev)
        }
        async fn check_honeypot(&self, _address: &str) -> Result<HoneypotStatus> {
            clone_result(&self.honeypot)
        }
    }

    struct MockRegistry {
        rug_wallets: Vec<String>,
    }

    #[async_trait]
    impl RugRegistry for MockRegistry {
        async fn is_rug_wallet(&self, wallet: &str) -> bool {
            self.rug_wallets.iter().any(|w| w == wallet)
        }
    }

    fn filter_with(security: MockSecurity, rug_wallets: Vec<String>) -> RiskFilter {
        RiskFilter::new(
            RiskFilterConfig::default(),
            Arc::new(security),
            Arc::new(MockRegistry { rug_wallets }),
            Duration::from_millis(500),
        )
    }

    fn metrics() -> TokenMetrics {
        crate::types::tests::test_metrics()
    }

    #[tokio::test]
    async fn test_clean_token_passes() {
        let filter = filter_with(MockSecurity::default(), vec![]);
        let output = filter.filter_token(&metrics(), Some(BundleAnalysis::default())).await;
        assert_eq!(output.verdict, FilterVerdict::Pass);
        assert!(output.flags.is_empty());
    }

    #[tokio::test]
    async fn test_honeypot_reject_skips_later_stages() {
        let security = MockSecurity {
            honeypot: Ok(HoneypotStatus {
                confirmed_unsellable: true,
                failed_sell_count: 3,
            }),
            // Would flag if the contract stage ran
            contract: Ok(ContractAnalysis::default()),
            ..Default::default()
        };
        let filter = filter_with(security, vec!["rug1".to_string()]);
        let mut m = metrics();
        m.top_holders = vec!["rug1".to_string()];

        let output = filter.filter_token(&m, None).await;
        assert_eq!(output.verdict, FilterVerdict::Reject);
        // Only the triggering stage's flag; no later-stage flags
        assert_eq!(output.flags.len(), 1);
        assert_eq!(output.flags[0].stage, FilterStage::Honeypot);
        assert_eq!(output.rug_history_wallet_count, 0);
    }

    #[tokio::test]
    async fn test_reject_keeps_earlier_flags() {
        // Mutable metadata flags at the contract stage, then the bundle
        // stage rejects: the earlier flag must survive
        let security = MockSecurity {
            contract: Ok(ContractAnalysis {
                mint_authority_revoked: true,
                freeze_authority_revoked: true,
                metadata_mutable: true,
                is_known_scam_template: false,
            }),
            ..Default::default()
        };
        let filter = filter_with(security, vec![]);
        let bundle = BundleAnalysis {
            bundled_supply_pct: 40.0,
            has_rug_history: true,
            risk_level: BundleRiskLevel::High,
            bundle_detected: true,
            ..Default::default()
        };

        let output = filter.filter_token(&metrics(), Some(bundle)).await;
        assert_eq!(output.verdict, FilterVerdict::Reject);
        assert_eq!(output.flags.len(), 2);
        assert_eq!(output.flags[0].stage, FilterStage::Contract);
        assert_eq!(output.flags[1].stage, FilterStage::Bundle);
    }

    #[tokio::test]
    async fn test_scenario_d_bundle_rug_history_rejects() {
        let filter = filter_with(MockSecurity::default(), vec![]);
        let bundle = BundleAnalysis {
            bundle_detected: true,
            bundled_supply_pct: 12.0,
            clustered_wallet_count: 9,
            funding_overlap_detected: false,
            has_rug_history: true,
            risk_level: BundleRiskLevel::High,
        };
        let output = filter.filter_token(&metrics(), Some(bundle)).await;
        assert_eq!(output.verdict, FilterVerdict::Reject);
    }

    #[tokio::test]
    async fn test_failed_honeypot_fetch_flags_not_passes() {
        let security = MockSecurity {
            honeypot: Err(Error::provider("security", "down")),
            ..Default::default()
        };
        let filter = filter_with(security, vec![]);
        let output = filter.filter_token(&metrics(), None).await;
        assert_eq!(output.verdict, FilterVerdict::Flag);
        assert!(output.flags[0].reason.contains("unavailable"));
    }

    /// Security provider that hangs long enough to trip the fetch deadline
    struct SlowSecurity;

    #[async_trait]
    impl SecurityProvider for SlowSecurity {
        async fn analyze_contract(&self, _address: &str) -> Result<ContractAnalysis> {
            Ok(ContractAnalysis {
                mint_authority_revoked: true,
                freeze_authority_revoked: true,
                metadata_mutable: false,
                is_known_scam_template: false,
            })
        }
        async fn analyze_bundles(&self, _address: &str) -> Result<BundleAnalysis> {
            Ok(BundleAnalysis::default())
        }
        async fn analyze_dev_wallet(&self, _address: &str) -> Result<Option<DevWalletBehaviour>> {
            Ok(None)
        }
        async fn check_honeypot(&self, _address: &str) -> Result<HoneypotStatus> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(HoneypotStatus::default())
        }
    }

    #[tokio::test]
    async fn test_honeypot_fetch_timeout_flags_not_passes() {
        let filter = RiskFilter::new(
            RiskFilterConfig::default(),
            Arc::new(SlowSecurity),
            Arc::new(MockRegistry { rug_wallets: vec![] }),
            Duration::from_millis(5),
        );
        let output = filter.filter_token(&metrics(), None).await;
        assert_eq!(output.verdict, FilterVerdict::Flag);
        assert!(output.flags[0].reason.contains("unavailable"));
    }

    #[tokio::test]
    async fn test_failed_bundle_fetch_fails_open() {
        let filter = filter_with(MockSecurity::default(), vec![]);
        // None bundle = failed fetch upstream; must not flag or reject
        let output = filter.filter_token(&metrics(), None).await;
        assert_eq!(output.verdict, FilterVerdict::Pass);
    }

    #[tokio::test]
    async fn test_rug_holder_count_flags_and_rejects() {
        let rugs = vec!["r1".to_string(), "r2".to_string(), "r3".to_string()];
        let filter = filter_with(MockSecurity::default(), rugs.clone());

        let mut m = metrics();
        m.top_holders = vec!["r1".to_string(), "clean".to_string()];
        let output = filter.filter_token(&m, None).await;
        assert_eq!(output.verdict, FilterVerdict::Flag);
        assert_eq!(output.rug_history_wallet_count, 1);

        m.top_holders = rugs;
        let output = filter.filter_token(&m, None).await;
        assert_eq!(output.verdict, FilterVerdict::Reject);
        assert_eq!(output.rug_history_wallet_count, 3);
    }

    #[tokio::test]
    async fn test_monotonicity_adding_reject_condition() {
        // A passing input with a flag keeps its flag when a reject
        // condition is added downstream
        let security = MockSecurity {
            contract: Ok(ContractAnalysis {
                mint_authority_revoked: true,
                freeze_authority_revoked: true,
                metadata_mutable: true,
                is_known_scam_template: false,
            }),
            dev: Ok(Some(DevWalletBehaviour {
                deployer_address: "dev".to_string(),
                sold_pct_48h: 70.0,
                transferred_to_cex: false,
                cex_addresses: vec![],
                bridge_activity: false,
            })),
            ..Default::default()
        };
        let filter = filter_with(security, vec![]);
        let output = filter.filter_token(&metrics(), None).await;
        assert_eq!(output.verdict, FilterVerdict::Reject);
        assert_eq!(output.flags[0].stage, FilterStage::Contract);
        assert_eq!(output.flags.last().unwrap().stage, FilterStage::DevWallet);
    }

    #[tokio::test]
    async fn test_quick_check_passes_with_authority_warnings() {
        let security = MockSecurity {
            contract: Ok(ContractAnalysis {
                mint_authority_revoked: false,
                freeze_authority_revoked: true,
                metadata_mutable: false,
                is_known_scam_template: false,
            }),
            ..Default::default()
        };
        let filter = filter_with(security, vec![]);
        let result = filter.quick_check("addr").await;
        assert!(result.pass);
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_quick_check_scam_template_fails() {
        let security = MockSecurity {
            contract: Ok(ContractAnalysis {
                mint_authority_revoked: true,
                freeze_authority_revoked: true,
                metadata_mutable: false,
                is_known_scam_template: true,
            }),
            ..Default::default()
        };
        let filter = filter_with(security, vec![]);
        assert!(!filter.quick_check("addr").await.pass);
    }

    #[tokio::test]
    async fn test_quick_check_fails_closed_on_error() {
        let security = MockSecurity {
            contract: Err(Error::provider("security", "down")),
            ..Default::default()
        };
        let filter = filter_with(security, vec![]);
        let result = filter.quick_check("addr").await;
        assert!(!result.pass);
        assert!(result.reason.unwrap().contains("suspicious"));
    }
}
