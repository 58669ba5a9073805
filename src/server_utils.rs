use crate::constants::SHIFT_DURATION_SECS;

const MIN_SHIFT_MINUTES: i64 = 1;
const MAX_SHIFT_MINUTES: i64 = 10;
const MAX_STARTING_BALANCE: i64 = 1_000_000;

/// Client-requested shift length in seconds, or the default when absent.
pub fn normalize_shift_secs(minutes: Option<i64>) -> f32 {
    match minutes {
        Some(minutes) => (minutes.clamp(MIN_SHIFT_MINUTES, MAX_SHIFT_MINUTES) * 60) as f32,
        None => SHIFT_DURATION_SECS,
    }
}

pub fn normalize_starting_balance(value: Option<i64>, carried: i64) -> i64 {
    value
        .unwrap_or(carried)
        .clamp(-MAX_STARTING_BALANCE, MAX_STARTING_BALANCE)
}

/// Seeds are 32-bit; larger values keep their low bits.
pub fn normalize_seed(value: Option<i64>) -> Option<u32> {
    value.map(|seed| seed as u32)
}

pub fn parse_port(raw: Option<&str>, fallback: u16) -> u16 {
    raw.and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_minutes_are_clamped() {
        assert_eq!(normalize_shift_secs(None), SHIFT_DURATION_SECS);
        assert_eq!(normalize_shift_secs(Some(-3)), 60.0);
        assert_eq!(normalize_shift_secs(Some(2)), 120.0);
        assert_eq!(normalize_shift_secs(Some(99)), 600.0);
    }

    #[test]
    fn starting_balance_prefers_request_then_carry_over() {
        assert_eq!(normalize_starting_balance(None, 350), 350);
        assert_eq!(normalize_starting_balance(Some(20), 350), 20);
        assert_eq!(normalize_starting_balance(Some(i64::MAX), 0), 1_000_000);
    }

    #[test]
    fn seed_keeps_low_bits() {
        assert_eq!(normalize_seed(None), None);
        assert_eq!(normalize_seed(Some(7)), Some(7));
        assert_eq!(normalize_seed(Some((1 << 32) + 5)), Some(5));
        assert_eq!(normalize_seed(Some(-1)), Some(u32::MAX));
    }

    #[test]
    fn port_parsing_falls_back_on_garbage() {
        assert_eq!(parse_port(Some("8080"), 3000), 8080);
        assert_eq!(parse_port(Some(" 9000 "), 3000), 9000);
        assert_eq!(parse_port(Some("abc"), 3000), 3000);
        assert_eq!(parse_port(Some("70000"), 3000), 3000);
        assert_eq!(parse_port(None, 3000), 3000);
    }
}
