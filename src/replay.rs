//! Fixture-backed providers for offline replay
//!
//! A replay book is a JSON file of captured candidate snapshots. Every
//! provider seam is served out of the book, so a full pipeline run is
//! reproducible without any live collaborator. Missing security records
//! replay as provider failures, which exercises the same fail-closed and
//! fail-open paths as a live outage.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::providers::{
    KolProvider, MarketDataProvider, PositionTracker, RugRegistry, SecurityProvider,
    SocialDataProvider,
};
use crate::types::{
    BundleAnalysis, ContractAnalysis, DevWalletBehaviour, HoneypotStatus, KolWalletActivity,
    SocialMetrics, TokenMetrics, VolumeAuthenticity,
};

// Evidence bar applied when replaying the KOL collaborator
const MIN_POSITION_SOL: f64 = 1.0;
const MIN_TRACKED_DAYS: u32 = 30;

/// One captured candidate snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateRecord {
    pub address: String,
    /// Absent when the token was unknown upstream at capture time
    pub metrics: Option<TokenMetrics>,
    #[serde(default)]
    pub social: Option<SocialMetrics>,
    #[serde(default)]
    pub volume_authenticity: Option<VolumeAuthenticity>,
    #[serde(default)]
    pub contract: Option<ContractAnalysis>,
    #[serde(default)]
    pub honeypot: Option<HoneypotStatus>,
    #[serde(default)]
    pub bundle: Option<BundleAnalysis>,
    #[serde(default)]
    pub dev_wallet: Option<DevWalletBehaviour>,
    #[serde(default)]
    pub kol_activity: Vec<KolWalletActivity>,
    #[serde(default)]
    pub open_position: bool,
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    candidates: Vec<CandidateRecord>,
    #[serde(default)]
    rug_wallets: Vec<String>,
}

/// Parsed replay fixture, indexed by token address
pub struct ReplayBook {
    records: HashMap<String, CandidateRecord>,
    order: Vec<String>,
    rug_wallets: HashSet<String>,
}

impl ReplayBook {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let fixture: FixtureFile = serde_json::from_str(&raw)?;

        let order: Vec<String> = fixture
            .candidates
            .iter()
            .map(|c| c.address.clone())
            .collect();
        let records = fixture
            .candidates
            .into_iter()
            .map(|c| (c.address.clone(), c))
            .collect();

        Ok(Self {
            records,
            order,
            rug_wallets: fixture.rug_wallets.into_iter().collect(),
        })
    }

    /// Candidate addresses in file order
    pub fn addresses(&self) -> &[String] {
        &self.order
    }

    fn record(&self, address: &str) -> Option<&CandidateRecord> {
        self.records.get(address)
    }

    fn missing(&self, what: &str, address: &str) -> Error {
        Error::provider("replay", format!("no {} record for {}", what, address))
    }
}

pub struct ReplayMarket(pub Arc<ReplayBook>);

#[async_trait]
impl MarketDataProvider for ReplayMarket {
    async fn get_token_metrics(&self, address: &str) -> Result<Option<TokenMetrics>> {
        Ok(self.0.record(address).and_then(|r| r.metrics.clone()))
    }

    async fn get_volume_authenticity(&self, address: &str) -> Result<VolumeAuthenticity> {
        self.0
            .record(address)
            .and_then(|r| r.volume_authenticity.clone())
            .ok_or_else(|| self.0.missing("volume authenticity", address))
    }
}

pub struct ReplaySocial(pub Arc<ReplayBook>);

#[async_trait]
impl SocialDataProvider for ReplaySocial {
    async fn get_social_metrics(&self, address: &str) -> Result<SocialMetrics> {
        self.0
            .record(address)
            .and_then(|r| r.social.clone())
            .ok_or_else(|| self.0.missing("social", address))
    }
}

pub struct ReplaySecurity(pub Arc<ReplayBook>);

#[async_trait]
impl SecurityProvider for ReplaySecurity {
    async fn analyze_contract(&self, address: &str) -> Result<ContractAnalysis> {
        self.0
            .record(address)
            .and_then(|r| r.contract.clone())
            .ok_or_else(|| self.0.missing("contract", address))
    }

    async fn analyze_bundles(&self, address: &str) -> Result<BundleAnalysis> {
        self.0
            .record(address)
            .and_then(|r| r.bundle.clone())
            .ok_or_else(|| self.0.missing("bundle", address))
    }

    async fn analyze_dev_wallet(&self, address: &str) -> Result<Option<DevWalletBehaviour>> {
        Ok(self.0.record(address).and_then(|r| r.dev_wallet.clone()))
    }

    async fn check_honeypot(&self, address: &str) -> Result<HoneypotStatus> {
        self.0
            .record(address)
            .and_then(|r| r.honeypot.clone())
            .ok_or_else(|| self.0.missing("honeypot", address))
    }
}

pub struct ReplayKol(pub Arc<ReplayBook>);

#[async_trait]
impl KolProvider for ReplayKol {
    async fn get_kol_activity(
        &self,
        address: &str,
        _window: Duration,
    ) -> Result<Vec<KolWalletActivity>> {
        Ok(self
            .0
            .record(address)
            .map(|r| r.kol_activity.clone())
            .unwrap_or_default())
    }

    // The captured win rate stands in for the live tracker's weighting
    fn signal_weight(&self, activity: &KolWalletActivity) -> f64 {
        activity.win_rate.clamp(0.0, 1.0)
    }

    fn meets_signal_requirements(&self, activity: &KolWalletActivity) -> bool {
        activity.transaction.sol_amount >= MIN_POSITION_SOL
            && activity.tracked_days >= MIN_TRACKED_DAYS
    }
}

pub struct ReplayRugRegistry(pub Arc<ReplayBook>);

#[async_trait]
impl RugRegistry for ReplayRugRegistry {
    async fn is_rug_wallet(&self, wallet: &str) -> bool {
        self.0.rug_wallets.contains(wallet)
    }
}

pub struct ReplayPositions(pub Arc<ReplayBook>);

#[async_trait]
impl PositionTracker for ReplayPositions {
    async fn has_open_position(&self, address: &str) -> bool {
        self.0.record(address).map(|r| r.open_position).unwrap_or(false)
    }
}
