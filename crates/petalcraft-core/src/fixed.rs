use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of workshop time.
pub type Ticks = u64;

/// Host update rate that tick durations are expressed against.
pub const TICKS_PER_SECOND: Ticks = 60;

/// Convert an f64 to Fixed64. Use only for initialization and config loading.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and host hand-off.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Convert a duration in seconds to whole ticks, rounding to nearest.
/// Negative durations clamp to zero.
#[inline]
pub fn seconds_to_ticks(seconds: f64) -> Ticks {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds * TICKS_PER_SECOND as f64).round() as Ticks
}

/// Saturating multiply for scale factors. Overflow clamps to `Fixed64::MAX`.
#[inline]
pub fn scale_by(value: Fixed64, factor: Fixed64) -> Fixed64 {
    value.saturating_mul(factor)
}
