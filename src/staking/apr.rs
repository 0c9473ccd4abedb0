//! APR, APY, and era ETA calculations.
//!
//! Pure functions over a [`ChainSnapshot`]. Block production rate is measured
//! from the snapshot rather than assumed, since block time drifts.

use crate::chain::ChainSnapshot;

/// Julian year, shared by the APR annualization and the APY compounding count.
pub const DAYS_PER_YEAR: f64 = 365.25;
const MINUTES_PER_DAY: f64 = 1440.0;

pub const SECONDS_PER_YEAR: f64 = DAYS_PER_YEAR * MINUTES_PER_DAY * 60.0;

/// Assumed block interval used as the APY compounding period.
pub const BLOCK_INTERVAL_SECS: f64 = 14.0;

/// Convert a fixed-point chain amount to token units.
pub fn decimal_adjust(amount: u128, decimals: u32) -> f64 {
    match 10u128.checked_pow(decimals) {
        Some(divisor) => {
            (amount / divisor) as f64 + (amount % divisor) as f64 / divisor as f64
        }
        None => amount as f64 / 10f64.powi(decimals as i32),
    }
}

/// Variable staker reward share, capped at `adjustable_percent`.
pub fn adjustable_staker_percentage(
    tvl_percentage: f64,
    ideal_dapps_staking_tvl: f64,
    adjustable_percent: f64,
) -> f64 {
    (tvl_percentage / ideal_dapps_staking_tvl).min(1.0) * adjustable_percent
}

/// Seconds per block measured between `(from_block, from_ts)` and `(to_block, to_ts)`.
fn average_block_time(from_block: u64, from_ts: u64, to_block: u64, to_ts: u64) -> f64 {
    let seconds = to_ts.saturating_sub(from_ts) as f64 / 1000.0;
    let blocks = to_block.saturating_sub(from_block) as f64;
    seconds / blocks
}

/// Annual percentage rate for stakers, given total value locked in raw units.
///
/// Returns 0 when the result is not finite (for example nothing is staked).
pub fn calculate_apr(snapshot: &ChainSnapshot, tvl: u128) -> f64 {
    let block_rewards = decimal_adjust(snapshot.block_reward_per_block, snapshot.chain_decimals);
    let block_per_era = snapshot.block_per_era as f64;
    let era_rewards = block_per_era * block_rewards;

    let avg_block_time = average_block_time(
        snapshot.block_7_era_ago,
        snapshot.ts_block_7_era_ago,
        snapshot.latest_block,
        snapshot.timestamp,
    );
    let avg_blocks_per_minute = 60.0 / avg_block_time;
    let avg_blocks_per_day = avg_blocks_per_minute * MINUTES_PER_DAY;
    let daily_era_rate = avg_blocks_per_day / block_per_era;
    let annual_rewards = era_rewards * daily_era_rate * DAYS_PER_YEAR;

    let total_staked = decimal_adjust(tvl, snapshot.chain_decimals);
    let tvl_percentage = total_staked / snapshot.total_issuance;
    let staker_block_reward = adjustable_staker_percentage(
        tvl_percentage,
        snapshot.ideal_dapps_staking_tvl,
        snapshot.adjustable_percent,
    ) + snapshot.base_staker_percent;

    let apr = annual_rewards / total_staked * staker_block_reward * 100.0;
    if apr.is_finite() {
        apr
    } else {
        0.0
    }
}

/// Compound `apr` (percent) once per block over a year.
pub fn apr_to_apy(apr: f64) -> f64 {
    let frequency = SECONDS_PER_YEAR / BLOCK_INTERVAL_SECS;
    // (1 + r/f)^f - 1, evaluated without losing r/f against 1.
    (frequency * (apr / 100.0 / frequency).ln_1p()).exp_m1() * 100.0
}

/// Seconds until `next_era_block`, at the block rate of the last era.
pub fn next_era_eta(snapshot: &ChainSnapshot, next_era_block: u64) -> f64 {
    let avg_block_time = average_block_time(
        snapshot.block_1_era_ago,
        snapshot.ts_block_1_era_ago,
        snapshot.latest_block,
        snapshot.timestamp,
    );
    let eta = next_era_block.saturating_sub(snapshot.latest_block) as f64 * avg_block_time;
    if eta.is_finite() {
        eta
    } else {
        0.0
    }
}
