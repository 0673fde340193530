//! Per-stage evaluators for the risk filter cascade
//!
//! Each stage is a pure function over already-fetched data returning a
//! tagged outcome. The cascade in `filter::RiskFilter` folds them strictly
//! in order, which keeps the short-circuit contract explicit and lets every
//! stage be unit-tested in isolation.

use crate::config::RiskFilterConfig;
use crate::types::{
    BundleAnalysis, BundleRiskLevel, ContractAnalysis, DevWalletBehaviour, FilterFlag,
    FilterStage, HoneypotStatus,
};

/// Outcome of a single cascade stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Nothing suspicious; move to the next stage
    Continue,
    /// Suspicious but not disqualifying; the verdict escalates to FLAG
    Flag(FilterFlag),
    /// Disqualifying; the cascade finalizes as REJECT and stops
    Reject(FilterFlag),
}

impl StageOutcome {
    pub fn flag(stage: FilterStage, reason: impl Into<String>) -> Self {
        StageOutcome::Flag(FilterFlag::new(stage, reason))
    }

    pub fn reject(stage: FilterStage, reason: impl Into<String>) -> Self {
        StageOutcome::Reject(FilterFlag::new(stage, reason))
    }
}

/// Stage 1: honeypot.
///
/// `status` is None when the probe failed; the honeypot check must never
/// silently pass on fetch failure, so that becomes a FLAG.
pub fn evaluate_honeypot(status: Option<&HoneypotStatus>) -> StageOutcome {
    match status {
        None => StageOutcome::flag(FilterStage::Honeypot, "honeypot analysis unavailable"),
        Some(s) if s.confirmed_unsellable => StageOutcome::reject(
            FilterStage::Honeypot,
            format!(
                "confirmed unsellable ({} failed sell attempts)",
                s.failed_sell_count
            ),
        ),
        Some(_) => StageOutcome::Continue,
    }
}

/// Stage 2: contract analysis.
///
/// Unrevoked authorities flag inside the grace window and reject past it.
/// Like the honeypot probe, a failed fetch flags rather than passes: the
/// mint-authority check is one of the two fail-closed stages.
///
/// Can produce up to two flags (authority + mutable metadata), so it
/// returns a list folded by the caller.
pub fn evaluate_contract(
    analysis: Option<&ContractAnalysis>,
    token_age_minutes: u64,
    config: &RiskFilterConfig,
) -> Vec<StageOutcome> {
    let analysis = match analysis {
        Some(a) => a,
        None => {
            return vec![StageOutcome::flag(
                FilterStage::Contract,
                "contract analysis unavailable",
            )]
        }
    };

    if analysis.is_known_scam_template {
        return vec![StageOutcome::reject(
            FilterStage::Contract,
            "matches known scam contract template",
        )];
    }

    let mut outcomes = Vec::new();

    if !analysis.mint_authority_revoked || !analysis.freeze_authority_revoked {
        let which = match (
            analysis.mint_authority_revoked,
            analysis.freeze_authority_revoked,
        ) {
            (false, false) => "mint and freeze authority",
            (false, true) => "mint authority",
            (true, false) => "freeze authority",
            (true, true) => unreachable!(),
        };
        if token_age_minutes <= config.authority_grace_minutes {
            outcomes.push(StageOutcome::flag(
                FilterStage::Contract,
                format!("{} not revoked (within {}min grace window)", which, config.authority_grace_minutes),
            ));
        } else {
            outcomes.push(StageOutcome::reject(
                FilterStage::Contract,
                format!("{} not revoked past the grace window", which),
            ));
        }
    }

    if analysis.metadata_mutable {
        outcomes.push(StageOutcome::flag(
            FilterStage::Contract,
            "token metadata is mutable",
        ));
    }

    if outcomes.is_empty() {
        outcomes.push(StageOutcome::Continue);
    }
    outcomes
}

/// Stage 3: bundle / insider distribution. Fails open: a missing analysis
/// is treated as the neutral default upstream, so `bundle` is never None here.
pub fn evaluate_bundle(bundle: &BundleAnalysis, config: &RiskFilterConfig) -> StageOutcome {
    let high_supply = bundle.bundled_supply_pct >= config.bundled_supply_high_pct
        || bundle.risk_level == BundleRiskLevel::High;

    if high_supply && bundle.has_rug_history {
        return StageOutcome::reject(
            FilterStage::Bundle,
            format!(
                "{:.1}% bundled supply concentrated with rug-history wallets",
                bundle.bundled_supply_pct
            ),
        );
    }

    if high_supply {
        return StageOutcome::flag(
            FilterStage::Bundle,
            format!("high bundled supply ({:.1}%)", bundle.bundled_supply_pct),
        );
    }

    if bundle.bundled_supply_pct >= config.bundled_supply_medium_pct {
        return StageOutcome::flag(
            FilterStage::Bundle,
            format!("medium bundled supply ({:.1}%)", bundle.bundled_supply_pct),
        );
    }

    if bundle.funding_overlap_detected {
        return StageOutcome::flag(
            FilterStage::Bundle,
            format!(
                "cross-wallet funding overlap across {} wallets",
                bundle.clustered_wallet_count
            ),
        );
    }

    StageOutcome::Continue
}

/// Stage 4: deployer wallet behaviour. Skipped entirely when the deployer
/// is unknown (fails open).
pub fn evaluate_dev_wallet(
    behaviour: Option<&DevWalletBehaviour>,
    config: &RiskFilterConfig,
) -> StageOutcome {
    let dev = match behaviour {
        Some(d) => d,
        None => return StageOutcome::Continue,
    };

    if dev.transferred_to_cex && dev.sold_pct_48h >= config.dev_sell_reject_with_cex_pct {
        return StageOutcome::reject(
            FilterStage::DevWallet,
            format!(
                "deployer sold {:.1}% in 48h and transferred to CEX",
                dev.sold_pct_48h
            ),
        );
    }

    if dev.sold_pct_48h >= config.dev_sell_reject_pct {
        return StageOutcome::reject(
            FilterStage::DevWallet,
            format!("deployer sold {:.1}% of allocation in 48h", dev.sold_pct_48h),
        );
    }

    if dev.sold_pct_48h >= config.dev_sell_flag_pct {
        return StageOutcome::flag(
            FilterStage::DevWallet,
            format!("deployer sold {:.1}% in 48h", dev.sold_pct_48h),
        );
    }

    if dev.transferred_to_cex {
        return StageOutcome::flag(
            FilterStage::DevWallet,
            format!("deployer transferred to CEX ({})", dev.cex_addresses.join(", ")),
        );
    }

    if dev.bridge_activity {
        return StageOutcome::flag(FilterStage::DevWallet, "deployer bridge activity detected");
    }

    StageOutcome::Continue
}

/// Stage 5: rug-history cross-reference over the top-holder wallets.
pub fn evaluate_rug_history(rug_wallet_count: u32, config: &RiskFilterConfig) -> StageOutcome {
    if rug_wallet_count >= config.rug_holder_reject_count {
        return StageOutcome::reject(
            FilterStage::RugHistory,
            format!("{} top holders have rug history", rug_wallet_count),
        );
    }

    if rug_wallet_count >= config.rug_holder_flag_count {
        return StageOutcome::flag(
            FilterStage::RugHistory,
            format!("{} top holder(s) have rug history", rug_wallet_count),
        );
    }

    StageOutcome::Continue
}
