//! Provider seams for external collaborators
//!
//! The pipeline consumes market, social, security, KOL, rug-registry and
//! position data through these traits. Real clients (HTTP, RPC, database)
//! live outside this crate; tests and the replay CLI supply their own
//! implementations.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::types::{
    BundleAnalysis, ContractAnalysis, DevWalletBehaviour, HoneypotStatus, KolWalletActivity,
    SocialMetrics, TokenMetrics, VolumeAuthenticity,
};

/// Market and on-chain data
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Metrics snapshot for a token; None when the token is unknown upstream
    async fn get_token_metrics(&self, address: &str) -> Result<Option<TokenMetrics>>;

    /// Organic-volume estimate
    async fn get_volume_authenticity(&self, address: &str) -> Result<VolumeAuthenticity>;
}

/// Social activity data
#[async_trait]
pub trait SocialDataProvider: Send + Sync {
    async fn get_social_metrics(&self, address: &str) -> Result<SocialMetrics>;
}

/// Contract, bundle and deployer security analysis
#[async_trait]
pub trait SecurityProvider: Send + Sync {
    async fn analyze_contract(&self, address: &str) -> Result<ContractAnalysis>;

    async fn analyze_bundles(&self, address: &str) -> Result<BundleAnalysis>;

    /// None when the deployer wallet cannot be identified
    async fn analyze_dev_wallet(&self, address: &str) -> Result<Option<DevWalletBehaviour>>;

    async fn check_honeypot(&self, address: &str) -> Result<HoneypotStatus>;
}

/// Tracked KOL wallet activity and its evidentiary policy
///
/// Signal weighting and the minimum-evidence predicate belong to the KOL
/// collaborator: this core consumes both without re-deriving them.
#[async_trait]
pub trait KolProvider: Send + Sync {
    async fn get_kol_activity(
        &self,
        address: &str,
        window: Duration,
    ) -> Result<Vec<KolWalletActivity>>;

    /// Externally computed signal weight for one activity (0-1)
    fn signal_weight(&self, activity: &KolWalletActivity) -> f64;

    /// Whether one activity on its own satisfies the collaborator's
    /// minimum-evidence bar for signal emission
    fn meets_signal_requirements(&self, activity: &KolWalletActivity) -> bool;
}

/// Registry of wallets associated with confirmed exit scams
#[async_trait]
pub trait RugRegistry: Send + Sync {
    async fn is_rug_wallet(&self, wallet: &str) -> bool;
}

/// Open-position check against the external position tracker
#[async_trait]
pub trait PositionTracker: Send + Sync {
    async fn has_open_position(&self, address: &str) -> bool;
}
