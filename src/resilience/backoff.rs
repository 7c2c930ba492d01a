//! Linear backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Calculate the wait before retry number `attempt` (1-based).
///
/// The delay grows linearly (`min_ms * attempt`), gets up to 50% random
/// jitter on top, and is clamped to `[min_ms, max_ms]`.
pub fn calculate_backoff(attempt: u32, min_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let max_ms = max_ms.max(min_ms);
    let linear = min_ms.saturating_mul(attempt as u64);

    let jitter_range = linear / 2;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..=jitter_range)
    } else {
        0
    };

    Duration::from_millis(linear.saturating_add(jitter).clamp(min_ms, max_ms))
}

/// Like [`calculate_backoff`], but a server-provided hint (e.g. `Retry-After`)
/// replaces the computed delay. The hint is still clamped to `[min_ms, max_ms]`.
pub fn backoff_with_hint(attempt: u32, min_ms: u64, max_ms: u64, hint: Option<Duration>) -> Duration {
    match hint {
        Some(hint) if attempt > 0 => {
            let max_ms = max_ms.max(min_ms);
            let ms = u64::try_from(hint.as_millis()).unwrap_or(u64::MAX);
            Duration::from_millis(ms.clamp(min_ms, max_ms))
        }
        _ => calculate_backoff(attempt, min_ms, max_ms),
    }
}
