// Price band shown next to a point estimate. A fixed +/-10% presentation
// heuristic, not a statistical interval.

use serde::Serialize;

const LOWER_FACTOR: f64 = 0.9;
const UPPER_FACTOR: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub min: f64,
    pub max: f64,
}

/// Derives the band purely from the predicted price, rounding each bound to
/// the nearest whole currency unit.
pub fn derive_interval(price: f64) -> ConfidenceInterval {
    ConfidenceInterval {
        min: (price * LOWER_FACTOR).round(),
        max: (price * UPPER_FACTOR).round(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn corolla_estimate_band() {
        assert_eq!(
            derive_interval(3_500_000.0),
            ConfidenceInterval {
                min: 3_150_000.0,
                max: 3_850_000.0
            }
        );
    }

    #[test]
    fn fractional_estimates_round_to_whole_units() {
        let band = derive_interval(2_745_000.55);
        assert_eq!(band.min, 2_470_500.0);
        assert_eq!(band.max, 3_019_501.0);
    }

    #[test]
    fn zero_price_gives_zero_band() {
        assert_eq!(derive_interval(0.0), ConfidenceInterval { min: 0.0, max: 0.0 });
    }

    proptest! {
        #[test]
        fn band_brackets_whole_prices(price in 0u64..1_000_000_000_000) {
            let price = price as f64;
            let band = derive_interval(price);
            prop_assert_eq!(band.min, (price * 0.9).round());
            prop_assert_eq!(band.max, (price * 1.1).round());
            prop_assert!(band.min <= price && price <= band.max);
        }

        #[test]
        fn band_is_deterministic(price in 0.0f64..1.0e12) {
            prop_assert_eq!(derive_interval(price), derive_interval(price));
        }
    }
}
