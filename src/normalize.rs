//! Percentage normalization for large financial magnitudes.
//!
//! Raw figures in the corpus span roughly nine orders of magnitude, which
//! makes a linear slider over native units unusable. A single global linear
//! mapping between [`MIN_VALUE`]..[`MAX_VALUE`] and 0..100 gives every
//! large-magnitude column the same interactive range. The mapping is
//! stateless and global, not per-column.
//!
//! Out-of-domain inputs clamp to the nearest bound; conversion never fails.

/// Plausible extremes of any financial magnitude in the corpus.
pub const MIN_VALUE: f64 = -98_908_000.0;
pub const MAX_VALUE: f64 = 44_019_015_000_000.0;

/// Column-name fragments that mark a value as a financial magnitude.
const MAGNITUDE_NAME_TOKENS: &[&str] = &[
    "revenue",
    "sales",
    "income",
    "expense",
    "cost",
    "asset",
    "liability",
    "debt",
    "profit",
    "cash",
    "investment",
    "equity",
    "capital",
    "value",
    "worth",
    "balance",
    "amount",
];

/// Magnitude floor below which raw units stay readable on their own.
const LARGE_VALUE_THRESHOLD: f64 = 1_000_000.0;

/// Maps a raw value into the 0..100 percentage domain, clamped.
pub fn value_to_percentage(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let percentage = (value - MIN_VALUE) / (MAX_VALUE - MIN_VALUE) * 100.0;
    percentage.clamp(0.0, 100.0)
}

/// Maps a percentage back to the raw value domain. The input percentage is
/// clamped to 0..100 first, so the result always lies in the data range.
pub fn percentage_to_value(percentage: f64) -> f64 {
    if !percentage.is_finite() {
        return MIN_VALUE;
    }
    let clamped = percentage.clamp(0.0, 100.0);
    clamped / 100.0 * (MAX_VALUE - MIN_VALUE) + MIN_VALUE
}

/// Decides whether a column's values should be shown on the percentage
/// scale: the name must look like a financial magnitude, the sample must be
/// large, and the sample must fall inside the data range.
pub fn should_normalize(column_name: &str, sample: f64) -> bool {
    if !sample.is_finite() {
        return false;
    }
    let lowered = column_name.to_ascii_lowercase();
    let name_matches = MAGNITUDE_NAME_TOKENS
        .iter()
        .any(|token| lowered.contains(token));
    name_matches
        && sample.abs() > LARGE_VALUE_THRESHOLD
        && sample >= MIN_VALUE
        && sample <= MAX_VALUE
}

/// Formats a raw value as a percentage string with the given precision.
pub fn format_as_percentage(value: f64, precision: usize) -> String {
    format!("{:.*}%", precision, value_to_percentage(value))
}

/// Slider step size for a given display precision.
pub fn percentage_step(precision: u32) -> f64 {
    1.0 / 10f64.powi(precision as i32)
}

/// Converts a user-facing percentage range into raw bounds for comparison.
pub fn percentage_range_to_values(range: (f64, f64)) -> (f64, f64) {
    (percentage_to_value(range.0), percentage_to_value(range.1))
}

/// Converts a raw value range into the percentage display domain.
pub fn value_range_to_percentages(range: (f64, f64)) -> (f64, f64) {
    (value_to_percentage(range.0), value_to_percentage(range.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn percentage_is_clamped_for_out_of_domain_values() {
        assert_eq!(value_to_percentage(MIN_VALUE - 1.0e9), 0.0);
        assert_eq!(value_to_percentage(MAX_VALUE + 1.0e9), 100.0);
        assert_eq!(value_to_percentage(f64::NAN), 0.0);
    }

    #[test]
    fn inverse_clamps_percentage_input() {
        assert_eq!(percentage_to_value(-5.0), MIN_VALUE);
        assert_eq!(percentage_to_value(250.0), MAX_VALUE);
        assert_eq!(percentage_to_value(f64::NAN), MIN_VALUE);
    }

    #[test]
    fn five_million_revenue_lands_near_zero_percent() {
        let pct = value_to_percentage(5_000_000.0);
        assert!((pct - 0.000_236).abs() < 0.000_01, "got {pct}");
    }

    #[test]
    fn should_normalize_requires_all_three_conditions() {
        assert!(should_normalize("Revenue", 5_000_000.0));
        assert!(should_normalize("Total_Investment", 2.5e13));
        // Name matches but magnitude is small.
        assert!(!should_normalize("Profit_Margin", 16.8));
        // Large but the name is not a financial magnitude.
        assert!(!should_normalize("Employees", 4_500_000.0));
        // Outside the data range.
        assert!(!should_normalize("Assets", MAX_VALUE * 2.0));
        assert!(!should_normalize("Revenue", f64::NAN));
    }

    #[test]
    fn step_matches_precision() {
        assert_eq!(percentage_step(2), 0.01);
        assert_eq!(percentage_step(0), 1.0);
    }

    proptest! {
        #[test]
        fn round_trip_is_exact_within_tolerance(v in MIN_VALUE..MAX_VALUE) {
            let recovered = percentage_to_value(value_to_percentage(v));
            let tolerance = (MAX_VALUE - MIN_VALUE) * 1e-12;
            prop_assert!((recovered - v).abs() <= tolerance,
                "v={v} recovered={recovered}");
        }

        #[test]
        fn percentage_always_in_unit_range(v in proptest::num::f64::NORMAL) {
            let pct = value_to_percentage(v);
            prop_assert!((0.0..=100.0).contains(&pct));
        }
    }
}
