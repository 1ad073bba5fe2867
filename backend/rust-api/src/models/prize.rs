//! Fixed prize ladder. Level `n` pays `PRIZES[n]`; fireproof levels keep
//! their prize even if the player fails later on.

use super::question::MAX_LEVEL;

pub const PRIZES: [u64; 15] = [
    100, 200, 300, 500, 1_000, 2_000, 4_000, 8_000, 16_000, 32_000, 64_000, 125_000, 250_000,
    500_000, 1_000_000,
];

pub const FIREPROOF_LEVELS: [u8; 3] = [4, 9, 14];

/// Prize for a level, `None` outside 0..=14.
pub fn prize_for(level: u8) -> Option<u64> {
    PRIZES.get(level as usize).copied()
}

pub fn max_prize() -> u64 {
    PRIZES[MAX_LEVEL as usize]
}

pub fn is_fireproof(level: u8) -> bool {
    FIREPROOF_LEVELS.contains(&level)
}

/// Prize of the highest fireproof level not above `level`.
///
/// Takes a signed level so `previous_level() == -1` (nothing answered yet)
/// can be passed straight through; returns 0 when no fireproof level was
/// reached.
pub fn fireproof_prize_below_or_equal(level: i32) -> u64 {
    FIREPROOF_LEVELS
        .iter()
        .rev()
        .find(|&&fireproof| i32::from(fireproof) <= level)
        .and_then(|&fireproof| prize_for(fireproof))
        .unwrap_or(0)
}

/// Formats a prize the way game history shows it: `1 000 000 ₽`.
pub fn format_prize(prize: u64) -> String {
    let digits = prize.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    format!("{} ₽", grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prizes_are_monotonic_and_top_out_at_a_million() {
        assert!(PRIZES.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(prize_for(14), Some(1_000_000));
        assert_eq!(max_prize(), 1_000_000);
        assert_eq!(prize_for(0), Some(100));
        assert_eq!(prize_for(15), None);
    }

    #[test]
    fn fireproof_levels() {
        assert!(is_fireproof(4));
        assert!(is_fireproof(9));
        assert!(is_fireproof(14));
        assert!(!is_fireproof(0));
        assert!(!is_fireproof(5));
    }

    #[test]
    fn fireproof_prize_picks_highest_passed_checkpoint() {
        assert_eq!(fireproof_prize_below_or_equal(-1), 0);
        assert_eq!(fireproof_prize_below_or_equal(0), 0);
        assert_eq!(fireproof_prize_below_or_equal(3), 0);
        assert_eq!(fireproof_prize_below_or_equal(4), 1_000);
        assert_eq!(fireproof_prize_below_or_equal(8), 1_000);
        assert_eq!(fireproof_prize_below_or_equal(9), 32_000);
        assert_eq!(fireproof_prize_below_or_equal(13), 32_000);
        assert_eq!(fireproof_prize_below_or_equal(14), 1_000_000);
    }

    #[test]
    fn format_prize_groups_thousands() {
        assert_eq!(format_prize(0), "0 ₽");
        assert_eq!(format_prize(500), "500 ₽");
        assert_eq!(format_prize(1_000), "1 000 ₽");
        assert_eq!(format_prize(32_000), "32 000 ₽");
        assert_eq!(format_prize(1_000_000), "1 000 000 ₽");
    }
}
