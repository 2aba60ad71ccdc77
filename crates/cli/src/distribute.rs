// Spreading commit times across a window with human-looking jitter.
//
// Base slots divide the window into n+1 equal intervals so commits stay
// away from the edges. Jitter magnitude is capped at min(20% of the
// interval, 18 minutes): draws can never reorder adjacent base slots or
// escape the window by more than the cap. The jitter distribution is
// biased slightly negative, and the seconds component is randomised
// separately so timestamps don't land on :00.
//
// All randomness comes in through the caller's Rng, so tests drive the
// algorithm with a seeded generator.

use chrono::{DateTime, Duration, Local, Timelike};
use rand::Rng;

use trickle_common::types::{CommitChunk, ScheduledCommit};

/// Hard ceiling on jitter magnitude: 18 minutes.
const JITTER_CAP_MS: i64 = 18 * 60 * 1000;
/// Jitter magnitude as a fraction of the inter-commit interval.
const JITTER_FRACTION: f64 = 0.20;
/// Negative bias applied to the unit jitter draw.
const JITTER_BIAS: f64 = 1.15;

/// Assign each chunk a firing time inside `[start, end]`, in chunk order.
pub fn assign_times(
    chunks: Vec<CommitChunk>,
    start: DateTime<Local>,
    end: DateTime<Local>,
    rng: &mut impl Rng,
) -> Vec<ScheduledCommit> {
    let times = distribute_evenly(start, end, chunks.len(), rng);
    chunks
        .into_iter()
        .zip(times)
        .map(|(chunk, scheduled_time)| ScheduledCommit { chunk, scheduled_time })
        .collect()
}

/// Produce `n` ascending timestamps spread across `[start, end]`.
///
/// The caller guarantees `end > start`.
pub fn distribute_evenly(
    start: DateTime<Local>,
    end: DateTime<Local>,
    n: usize,
    rng: &mut impl Rng,
) -> Vec<DateTime<Local>> {
    if n == 0 {
        return Vec::new();
    }

    if n == 1 {
        // The window midpoint, nudged off the minute boundary.
        let midpoint = start + (end - start) / 2;
        let into_minute = Duration::seconds(i64::from(midpoint.second()))
            + Duration::nanoseconds(i64::from(midpoint.nanosecond()));
        let second = Duration::seconds(rng.gen_range(0..60));
        return vec![midpoint - into_minute + second];
    }

    let total_ms = (end - start).num_milliseconds();
    let interval_ms = total_ms as f64 / (n as f64 + 1.0);
    let cap_ms = (interval_ms * JITTER_FRACTION).min(JITTER_CAP_MS as f64);

    let mut times = Vec::with_capacity(n);
    for i in 1..=n {
        let base_ms = interval_ms * i as f64;
        let jitter_ms = (rng.gen::<f64>() * 2.0 - JITTER_BIAS) * cap_ms;
        let seconds_ms = f64::from(rng.gen_range(0u32..60) * 1_000);

        let offset = Duration::milliseconds((base_ms + jitter_ms + seconds_ms) as i64);
        times.push(start + offset);
    }

    // Safety net: jitter alone cannot cross adjacent slots, but the final
    // ordering guarantee should not depend on that arithmetic.
    times.sort();
    times
}

/// Split scheduled commits into those still ahead of `now` and those
/// already elapsed. Pure comparison; the daemon never re-checks this.
pub fn partition_future(
    scheduled: Vec<ScheduledCommit>,
    now: DateTime<Local>,
) -> (Vec<ScheduledCommit>, Vec<ScheduledCommit>) {
    scheduled.into_iter().partition(|commit| commit.scheduled_time > now)
}
