//! Wraparound-safe arithmetic on 33-bit MPEG presentation timestamps.

/// Ticks per second of the 90 kHz PTS clock.
pub const PTS_HZ: u64 = 90_000;

/// The PTS domain is 33 bits wide; values wrap at this modulus.
pub const PTS_MODULUS: u64 = 1 << 33;

/// Forward distance from `begin` to `end` on the 33-bit PTS clock, in ticks.
///
/// A live stream eventually wraps its timestamps; the forward distance is
/// always well defined as long as the real interval is shorter than the
/// ~26.5 hour wrap period.
pub fn pts_delta(begin: u64, end: u64) -> u64 {
    (end.wrapping_sub(begin).wrapping_add(PTS_MODULUS)) % PTS_MODULUS
}

/// Forward distance from `begin` to `end` in seconds.
pub fn pts_delta_seconds(begin: u64, end: u64) -> f64 {
    pts_delta(begin, end) as f64 / PTS_HZ as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_delta_simple() {
        assert_eq!(pts_delta(0, 90_000), 90_000);
        assert_eq!(pts_delta_seconds(0, 90_000), 1.0);
    }

    #[test]
    fn test_delta_wraparound() {
        // begin near the top of the 33-bit domain, end just past zero
        let begin = PTS_MODULUS - 10;
        let end = 5;
        assert_eq!(pts_delta(begin, end), 15);
        assert!((pts_delta_seconds(begin, end) - 15.0 / 90_000.0).abs() < 1e-12);
    }

    #[quickcheck]
    fn prop_delta_is_forward_distance(begin: u64, ticks: u64) -> bool {
        let begin = begin % PTS_MODULUS;
        let ticks = ticks % PTS_MODULUS;
        let end = (begin + ticks) % PTS_MODULUS;
        pts_delta(begin, end) == ticks
    }
}
