//! Individual factor computations for the composite scorer
//!
//! Every factor is a pure function of its inputs and the scoring config.
//! Sub-terms are clamped to their point budgets before summing and each
//! factor total is clamped to [0, 100].

use crate::config::ScoringConfig;
use crate::types::{
    FilterVerdict, KolWalletActivity, ScamFilterOutput, SocialMetrics, TokenMetrics,
    VolumeAuthenticity, WalletClass,
};

// On-chain health point budgets
const VOLUME_RATIO_PTS: f64 = 30.0;
const HOLDER_COUNT_PTS: f64 = 25.0;
const CONCENTRATION_PTS: f64 = 25.0;
const VOLUME_AUTH_PTS: f64 = 20.0;

// Social momentum point budgets
const MENTION_VELOCITY_PTS: f64 = 30.0;
const ENGAGEMENT_PTS: f64 = 25.0;
const AUTHENTICITY_PTS: f64 = 25.0;
const SENTIMENT_PTS: f64 = 20.0;
const KOL_MENTION_BONUS_PTS: f64 = 3.0;
const KOL_MENTION_BONUS_CAP: u32 = 5;

// Timing bonus shape: ramp to full by RAMP_END, hold through PLATEAU_END,
// decay to zero at DECAY_END (minutes)
const TIMING_MAX_PTS: f64 = 20.0;
const TIMING_RAMP_END_MIN: f64 = 30.0;
const TIMING_PLATEAU_END_MIN: f64 = 120.0;
const TIMING_DECAY_END_MIN: f64 = 1440.0;

/// Weighted on-chain health (0-100)
pub fn on_chain_health(
    metrics: &TokenMetrics,
    volume_auth: &VolumeAuthenticity,
    config: &ScoringConfig,
) -> f64 {
    let ratio_term = (metrics.volume_mcap_ratio() / config.ideal_volume_mcap_ratio)
        .clamp(0.0, 1.0)
        * VOLUME_RATIO_PTS;

    let holder_term = (metrics.holder_count as f64 / config.ideal_holder_count as f64)
        .clamp(0.0, 1.0)
        * HOLDER_COUNT_PTS;

    // Full points at/below the ideal concentration, linear decay to zero
    // at the worst acceptable concentration
    let concentration_term = if metrics.top10_concentration_pct <= config.ideal_top10_pct {
        CONCENTRATION_PTS
    } else {
        let span = config.worst_top10_pct - config.ideal_top10_pct;
        ((config.worst_top10_pct - metrics.top10_concentration_pct) / span).clamp(0.0, 1.0)
            * CONCENTRATION_PTS
    };

    let auth_term = (volume_auth.score / 100.0).clamp(0.0, 1.0) * VOLUME_AUTH_PTS;

    (ratio_term + holder_term + concentration_term + auth_term).clamp(0.0, 100.0)
}

/// Social momentum with additive KOL-mention bonus (0-100)
pub fn social_momentum(social: &SocialMetrics, config: &ScoringConfig) -> f64 {
    let velocity_term = (social.mention_velocity_per_hour / config.ideal_mention_velocity_per_hour)
        .clamp(0.0, 1.0)
        * MENTION_VELOCITY_PTS;

    let engagement_term = (social.engagement_score / 100.0).clamp(0.0, 1.0) * ENGAGEMENT_PTS;

    let authenticity_term = (1.0 - social.bot_ratio).clamp(0.0, 1.0) * AUTHENTICITY_PTS;

    // Sentiment normalized from [-1, 1] to [0, 1]
    let sentiment_term = ((social.sentiment + 1.0) / 2.0).clamp(0.0, 1.0) * SENTIMENT_PTS;

    let mut kol_bonus =
        social.kol_mentions.min(KOL_MENTION_BONUS_CAP) as f64 * KOL_MENTION_BONUS_PTS;
    if social.top_tier_kol_mention {
        kol_bonus *= 2.0;
    }

    (velocity_term + engagement_term + authenticity_term + sentiment_term + kol_bonus)
        .clamp(0.0, 100.0)
}

/// KOL conviction for one wallet classification (0-100)
///
/// Sums each matching activity's externally computed signal weight times a
/// capped buy-size normalization factor, then scales. Main and side wallets
/// are computed independently - they carry different evidentiary weight.
pub fn kol_conviction<F>(
    activities: &[KolWalletActivity],
    class: WalletClass,
    signal_weight: F,
    config: &ScoringConfig,
) -> f64
where
    F: Fn(&KolWalletActivity) -> f64,
{
    let sum: f64 = activities
        .iter()
        .filter(|a| a.wallet_class == class)
        .map(|a| {
            let size_factor = (a.transaction.sol_amount / config.kol_benchmark_buy_sol)
                .min(config.kol_buy_factor_cap);
            signal_weight(a).clamp(0.0, 1.0) * size_factor
        })
        .sum();

    (sum * config.kol_conviction_scale).clamp(0.0, 100.0)
}

/// Inverse scam risk (0-100); REJECT is an immediate zero
pub fn scam_risk_inverse(filter: &ScamFilterOutput, config: &ScoringConfig) -> f64 {
    if filter.verdict == FilterVerdict::Reject {
        return 0.0;
    }

    let mut score = 100.0;
    score -= filter.flags.len() as f64 * config.penalty_per_flag;

    if filter.rug_history_wallet_count > 0 || filter.bundle.has_rug_history {
        score -= config.penalty_rug_history;
    }
    if filter.bundle.bundled_supply_pct >= config.high_bundle_supply_pct {
        score -= config.penalty_high_bundle;
    }
    if filter
        .dev_behaviour
        .as_ref()
        .is_some_and(|d| d.transferred_to_cex)
    {
        score -= config.penalty_dev_cex;
    }

    // A flagged verdict caps how clean the token can look
    if filter.verdict == FilterVerdict::Flag {
        score = score.min(config.flag_verdict_cap);
    }

    score.max(0.0)
}

/// Timing bonus rewarding the "early but not too early" window (0-20)
///
/// Continuous single-peak shape instead of discrete age brackets: linear
/// ramp up, plateau, linear decay to zero by 24h.
pub fn timing_bonus(age_minutes: u64) -> f64 {
    let age = age_minutes as f64;
    let ramp_up = (age / TIMING_RAMP_END_MIN).min(1.0);
    let decay = if age <= TIMING_PLATEAU_END_MIN {
        1.0
    } else {
        ((TIMING_DECAY_END_MIN - age) / (TIMING_DECAY_END_MIN - TIMING_PLATEAU_END_MIN))
            .clamp(0.0, 1.0)
    };
    TIMING_MAX_PTS * ramp_up.min(decay)
}
