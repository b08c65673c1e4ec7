// Math utilities and helper functions

use std::time::Duration;

/// Share of `value` in `max` as a percentage in `[0, 100]`
///
/// A zero `max` reads as empty.
pub fn percent(value: i64, max: i64) -> f32 {
    if max <= 0 {
        return 0.0;
    }
    (value.clamp(0, max) as f32 / max as f32) * 100.0
}

/// Same as [`percent`] for durations
pub fn duration_percent(value: Duration, max: Duration) -> f32 {
    if max.is_zero() {
        return 0.0;
    }
    (value.min(max).as_secs_f32() / max.as_secs_f32()) * 100.0
}
