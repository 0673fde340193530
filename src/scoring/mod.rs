//! Composite scoring engine
//!
//! Combines token metrics, social metrics, volume authenticity, the risk
//! filter output and KOL activity into a weighted score with confidence,
//! flags and a risk level. Two weighting profiles exist: KOL-validated and
//! a KOL-free discovery profile; a discovery score can later be re-scored
//! with a KOL multiplier when activity appears.

pub mod factors;

use regex::Regex;

use crate::config::{FactorWeights, ScoringConfig};
use crate::error::{Error, Result};
use crate::types::{
    Confidence, FilterVerdict, KolWalletActivity, RiskLevel, ScamFilterOutput, ScoreFactors,
    ScoreProfile, SocialMetrics, TokenMetrics, TokenScore, VolumeAuthenticity, WalletClass,
};

const NARRATIVE_THEME_PTS: f64 = 30.0;
const NARRATIVE_KOL_PTS: f64 = 15.0;
const NARRATIVE_FLAT_PTS: f64 = 8.0;

const BASE_CONFIDENCE_BAND_PTS: f64 = 5.0;

/// Everything the scorer needs about one candidate besides KOL activity
pub struct ScoreContext<'a> {
    pub metrics: &'a TokenMetrics,
    pub social: &'a SocialMetrics,
    pub volume_auth: &'a VolumeAuthenticity,
    pub filter: &'a ScamFilterOutput,
}

/// Classification mix of the KOL activity set, for the multiplier table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KolMix {
    None,
    SingleSide,
    SingleMain,
    MultiSide,
    MultiMain,
    Mixed,
    /// Three or more MAIN-classified buys
    HighConviction,
}

impl KolMix {
    pub fn classify(activities: &[KolWalletActivity]) -> KolMix {
        let main = activities
            .iter()
            .filter(|a| a.wallet_class == WalletClass::Main)
            .count();
        let side = activities.len() - main;

        if main >= 3 {
            return KolMix::HighConviction;
        }
        match (main, side) {
            (0, 0) => KolMix::None,
            (1, 0) => KolMix::SingleMain,
            (0, 1) => KolMix::SingleSide,
            (0, _) => KolMix::MultiSide,
            (2, 0) => KolMix::MultiMain,
            _ => KolMix::Mixed,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            KolMix::None => 1.0,
            KolMix::SingleSide => 1.1,
            KolMix::MultiSide => 1.2,
            KolMix::SingleMain => 1.25,
            KolMix::Mixed => 1.3,
            KolMix::MultiMain => 1.4,
            KolMix::HighConviction => 1.6,
        }
    }
}

/// The composite scorer; immutable once built, safe to share across
/// concurrent evaluations
pub struct CompositeScorer {
    config: ScoringConfig,
    theme_patterns: Vec<Regex>,
}

impl CompositeScorer {
    /// Build a scorer, compiling the configured meta-theme patterns
    pub fn new(config: ScoringConfig) -> Result<Self> {
        let theme_patterns = config
            .meta_themes
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Config(format!("invalid meta theme regex: {}", e)))?;

        Ok(Self {
            config,
            theme_patterns,
        })
    }

    /// KOL-validated scoring profile; composite clamped to [0, 150]
    ///
    /// `signal_weight` is the KOL collaborator's externally computed weight
    /// for one activity.
    pub fn calculate_score<F>(
        &self,
        ctx: &ScoreContext<'_>,
        activities: &[KolWalletActivity],
        signal_weight: F,
    ) -> TokenScore
    where
        F: Fn(&KolWalletActivity) -> f64,
    {
        let factors = ScoreFactors {
            on_chain_health: factors::on_chain_health(ctx.metrics, ctx.volume_auth, &self.config),
            social_momentum: factors::social_momentum(ctx.social, &self.config),
            kol_conviction_main: factors::kol_conviction(
                activities,
                WalletClass::Main,
                &signal_weight,
                &self.config,
            ),
            kol_conviction_side: factors::kol_conviction(
                activities,
                WalletClass::Side,
                &signal_weight,
                &self.config,
            ),
            scam_risk_inverse: factors::scam_risk_inverse(ctx.filter, &self.config),
            narrative_bonus: self.narrative_bonus(ctx.metrics, ctx.social),
            timing_bonus: factors::timing_bonus(ctx.metrics.age_minutes),
        };

        self.assemble(ctx, activities, factors, ScoreProfile::Validated)
    }

    /// Discovery scoring profile: no KOL data, composite clamped to [0, 100]
    pub fn calculate_discovery_score(&self, ctx: &ScoreContext<'_>) -> TokenScore {
        let factors = ScoreFactors {
            on_chain_health: factors::on_chain_health(ctx.metrics, ctx.volume_auth, &self.config),
            social_momentum: factors::social_momentum(ctx.social, &self.config),
            // KOL factors forced to zero in discovery mode
            kol_conviction_main: 0.0,
            kol_conviction_side: 0.0,
            scam_risk_inverse: factors::scam_risk_inverse(ctx.filter, &self.config),
            narrative_bonus: self.narrative_bonus(ctx.metrics, ctx.social),
            timing_bonus: factors::timing_bonus(ctx.metrics.age_minutes),
        };

        self.assemble(ctx, &[], factors, ScoreProfile::Discovery)
    }

    /// Re-score a discovery score after KOL activity appeared, via the
    /// classification-based multiplier table instead of recomputing from
    /// scratch. Risk level and confidence are re-derived against the new
    /// activity list; the zero-KOL confidence degradation must not stick.
    pub fn apply_kol_multiplier(
        &self,
        score: &TokenScore,
        metrics: &TokenMetrics,
        activities: &[KolWalletActivity],
    ) -> TokenScore {
        let mix = KolMix::classify(activities);
        let multiplier = mix.multiplier();

        let composite_score = (score.composite_score * multiplier)
            .clamp(0.0, ScoreProfile::Validated.max_composite());

        let has_main = activities
            .iter()
            .any(|a| a.wallet_class == WalletClass::Main);
        let filter_flagged = !score.flags.is_empty();

        let mut risk_level = risk_band(composite_score);
        if filter_flagged || !has_main {
            risk_level = risk_level.at_least(RiskLevel::Medium);
        }

        let (confidence, confidence_band_pts) = self.confidence(metrics, activities);

        TokenScore {
            composite_score,
            risk_level,
            confidence,
            confidence_band_pts,
            profile: ScoreProfile::Validated,
            ..score.clone()
        }
    }

    fn assemble(
        &self,
        ctx: &ScoreContext<'_>,
        activities: &[KolWalletActivity],
        factors: ScoreFactors,
        profile: ScoreProfile,
    ) -> TokenScore {
        let weights = match profile {
            ScoreProfile::Validated => &self.config.validated_weights,
            ScoreProfile::Discovery => &self.config.discovery_weights,
        };

        let weighted = weighted_sum(&factors, weights);
        let composite_score =
            (weighted + factors.narrative_bonus + factors.timing_bonus)
                .clamp(0.0, profile.max_composite());

        let (confidence, confidence_band_pts) = self.confidence(ctx.metrics, activities);

        let has_main = activities
            .iter()
            .any(|a| a.wallet_class == WalletClass::Main);
        let mut risk_level = risk_band(composite_score);
        // A flagged filter verdict or missing MAIN-wallet evidence puts a
        // floor under the risk grading no matter how good the score looks
        if ctx.filter.verdict == FilterVerdict::Flag || !has_main {
            risk_level = risk_level.at_least(RiskLevel::Medium);
        }

        TokenScore {
            token_address: ctx.metrics.address.clone(),
            composite_score,
            factors,
            confidence,
            confidence_band_pts,
            // Risk filter flags merged verbatim
            flags: ctx.filter.flags.clone(),
            risk_level,
            profile,
        }
    }

    /// Confidence starts HIGH with a tight band and degrades once per
    /// missing evidence dimension
    fn confidence(
        &self,
        metrics: &TokenMetrics,
        activities: &[KolWalletActivity],
    ) -> (Confidence, f64) {
        let mut confidence = Confidence::High;
        let mut band = BASE_CONFIDENCE_BAND_PTS;

        let degrade = |pts: f64, confidence: &mut Confidence, band: &mut f64| {
            *confidence = confidence.downgrade();
            *band += pts;
        };

        if metrics.age_minutes < self.config.min_age_minutes {
            degrade(5.0, &mut confidence, &mut band);
        }
        if metrics.liquidity_usd < self.config.min_liquidity_usd {
            degrade(5.0, &mut confidence, &mut band);
        }
        if activities.is_empty() {
            degrade(10.0, &mut confidence, &mut band);
        } else {
            let has_main = activities
                .iter()
                .any(|a| a.wallet_class == WalletClass::Main);
            if !has_main {
                degrade(5.0, &mut confidence, &mut band);
            }
            if activities.len() < self.config.min_kol_sample {
                degrade(5.0, &mut confidence, &mut band);
            }
        }

        (confidence, band)
    }

    /// Narrative bonus: strong theme match beats KOL chatter beats a bare
    /// narrative; no narrative, no bonus
    fn narrative_bonus(&self, metrics: &TokenMetrics, social: &SocialMetrics) -> f64 {
        let narrative = match &social.narrative {
            Some(n) => n,
            None => return 0.0,
        };

        let theme_match = self.theme_patterns.iter().any(|p| {
            p.is_match(&metrics.name) || p.is_match(&metrics.ticker) || p.is_match(narrative)
        });

        if theme_match {
            NARRATIVE_THEME_PTS
        } else if social.kol_mentions > 0 {
            NARRATIVE_KOL_PTS
        } else {
            NARRATIVE_FLAT_PTS
        }
    }
}

fn weighted_sum(factors: &ScoreFactors, weights: &FactorWeights) -> f64 {
    factors.on_chain_health * weights.on_chain_health
        + factors.social_momentum * weights.social_momentum
        + factors.kol_conviction_main * weights.kol_conviction_main
        + factors.kol_conviction_side * weights.kol_conviction_side
        + factors.scam_risk_inverse * weights.scam_risk_inverse
}

/// Five descending risk bands over the composite score
fn risk_band(composite: f64) -> RiskLevel {
    if composite >= 90.0 {
        RiskLevel::VeryLow
    } else if composite >= 70.0 {
        RiskLevel::Low
    } else if composite >= 50.0 {
        RiskLevel::Medium
    } else if composite >= 30.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}
