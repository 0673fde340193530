//! Per-token evaluation pipeline
//!
//! Orders the stages cheapest-first: position pre-gate, quick screen,
//! concurrent data fetch, risk cascade, scoring, gate, builder. The
//! expensive collaborator calls only run for tokens that survive the
//! earlier stages.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{validate_address, Error, Result};
use crate::filter::RiskFilter;
use crate::providers::{
    KolProvider, MarketDataProvider, PositionTracker, RugRegistry, SecurityProvider,
    SocialDataProvider,
};
use crate::scoring::{CompositeScorer, ScoreContext};
use crate::signal::{DecisionGate, SignalBuilder, SignalInputs};
use crate::types::{FilterVerdict, ScamFilterOutput, TokenScore, TradeSignal};

/// Terminal state of one evaluation
#[derive(Debug)]
pub enum EvaluationOutcome {
    /// Dropped before the full pipeline ran
    Skipped { reason: String },
    /// The risk cascade rejected the token
    Rejected { filter: ScamFilterOutput },
    /// Scored but blocked by the decision gate
    BelowThreshold { score: TokenScore, reason: String },
    /// An actionable signal
    Signal(Box<TradeSignal>),
}

pub struct Pipeline {
    config: Config,
    market: Arc<dyn MarketDataProvider>,
    social: Arc<dyn SocialDataProvider>,
    security: Arc<dyn SecurityProvider>,
    kol: Arc<dyn KolProvider>,
    positions: Arc<dyn PositionTracker>,
    filter: RiskFilter,
    scorer: CompositeScorer,
    gate: DecisionGate,
    builder: SignalBuilder,
}

impl Pipeline {
    pub fn new(
        config: Config,
        market: Arc<dyn MarketDataProvider>,
        social: Arc<dyn SocialDataProvider>,
        security: Arc<dyn SecurityProvider>,
        kol: Arc<dyn KolProvider>,
        rug_registry: Arc<dyn RugRegistry>,
        positions: Arc<dyn PositionTracker>,
    ) -> Result<Self> {
        let fetch_timeout = Duration::from_millis(config.fetch.timeout_ms);
        let filter = RiskFilter::new(
            config.filter.clone(),
            security.clone(),
            rug_registry,
            fetch_timeout,
        );
        let scorer = CompositeScorer::new(config.scoring.clone())?;
        let gate = DecisionGate::new(config.gate.clone(), kol.clone());
        let builder = SignalBuilder::new(config.signal.clone());

        Ok(Self {
            config,
            market,
            social,
            security,
            kol,
            positions,
            filter,
            scorer,
            gate,
            builder,
        })
    }

    /// Evaluate one candidate token end to end
    pub async fn evaluate(&self, address: &str) -> Result<EvaluationOutcome> {
        validate_address(address)?;

        // Tokens we already hold are never re-signalled
        if self.positions.has_open_position(address).await {
            debug!(token = %address, "open position exists, skipping");
            return Ok(EvaluationOutcome::Skipped {
                reason: "open position already exists".to_string(),
            });
        }

        let screen = self.filter.quick_check(address).await;
        if !screen.pass {
            let reason = screen
                .reason
                .unwrap_or_else(|| "failed quick screen".to_string());
            info!(token = %address, %reason, "quick screen dropped token");
            return Ok(EvaluationOutcome::Skipped { reason });
        }
        for warning in &screen.warnings {
            debug!(token = %address, %warning, "quick screen warning");
        }

        // Independent fetches run concurrently; only metrics are essential
        let (metrics, social, volume_auth, bundle) = tokio::join!(
            self.fetch("metrics", self.market.get_token_metrics(address)),
            self.fetch("social", self.social.get_social_metrics(address)),
            self.fetch("volume_auth", self.market.get_volume_authenticity(address)),
            self.fetch("bundle", self.security.analyze_bundles(address)),
        );

        let metrics = match metrics {
            Some(Some(m)) => m,
            Some(None) => {
                return Ok(EvaluationOutcome::Skipped {
                    reason: "token unknown to market data provider".to_string(),
                })
            }
            None => {
                return Ok(EvaluationOutcome::Skipped {
                    reason: "token metrics unavailable".to_string(),
                });
            }
        };
        let social = social.unwrap_or_default();
        let volume_auth = volume_auth.unwrap_or_default();

        let filter_output = self.filter.filter_token(&metrics, bundle).await;
        if filter_output.verdict == FilterVerdict::Reject {
            info!(token = %address, flags = filter_output.flags.len(), "risk filter rejected token");
            return Ok(EvaluationOutcome::Rejected {
                filter: filter_output,
            });
        }

        let window = Duration::from_secs(self.config.fetch.kol_window_minutes * 60);
        let activities = self
            .fetch("kol_activity", self.kol.get_kol_activity(address, window))
            .await
            .unwrap_or_default();

        let ctx = ScoreContext {
            metrics: &metrics,
            social: &social,
            volume_auth: &volume_auth,
            filter: &filter_output,
        };
        let inputs = SignalInputs {
            metrics: &metrics,
            social: &social,
            volume_auth: &volume_auth,
            filter: &filter_output,
        };

        if !activities.is_empty() {
            // The validated profile already weights KOL conviction; the
            // mix multiplier is only for re-scoring discovery scores
            let score = self
                .scorer
                .calculate_score(&ctx, &activities, |a| self.kol.signal_weight(a));
            debug!(
                token = %address,
                composite = score.composite_score,
                kols = activities.len(),
                "validated score computed"
            );

            let decision = self.gate.meets_buy_requirements(&score, &activities);
            if decision.meets {
                let signal = self.builder.build_buy_signal(score, &inputs, &activities);
                info!(token = %address, signal_id = %signal.id, "BUY signal emitted");
                return Ok(EvaluationOutcome::Signal(Box::new(signal)));
            }
            let reason = decision
                .reason
                .unwrap_or_else(|| "buy gate blocked".to_string());
            return Ok(EvaluationOutcome::BelowThreshold { score, reason });
        }

        let score = self.scorer.calculate_discovery_score(&ctx);
        debug!(token = %address, composite = score.composite_score, "discovery score computed");

        let decision = self.gate.meets_discovery_requirements(&score, &filter_output);
        if decision.meets {
            let signal = self.builder.build_discovery_signal(score, &inputs);
            info!(token = %address, signal_id = %signal.id, "DISCOVERY signal emitted");
            return Ok(EvaluationOutcome::Signal(Box::new(signal)));
        }
        let reason = decision
            .reason
            .unwrap_or_else(|| "discovery gate blocked".to_string());
        Ok(EvaluationOutcome::BelowThreshold { score, reason })
    }

    /// Bounded fetch; collaborator failures degrade rather than abort
    async fn fetch<T, F>(&self, what: &str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = Duration::from_millis(self.config.fetch.timeout_ms);
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(%what, error = %e, "fetch failed");
                None
            }
            Err(_) => {
                let e = Error::FetchTimeout(self.config.fetch.timeout_ms);
                warn!(%what, error = %e, "fetch timed out");
                None
            }
        }
    }
}
