use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// VAT-exclusive breakdown of a VAT-inclusive retail price.
///
/// Invariant: `price_excluding_vat + vat_amount == price_including_vat`
/// (exactly, because the VAT amount is derived by subtraction after
/// rounding the exclusive price to 2 decimals).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPricing {
    pub price_including_vat: Decimal,
    pub price_excluding_vat: Decimal,
    pub vat_amount: Decimal,
    pub vat_rate: Decimal,
}

/// Computes pricing breakdowns at a fixed VAT rate.
#[derive(Debug, Clone)]
pub struct PricingCalculator {
    vat_rate: Decimal,
}

impl PricingCalculator {
    pub fn new(vat_rate: Decimal) -> Self {
        Self { vat_rate }
    }

    /// Returns the breakdown for an inclusive retail price, or `None` when
    /// the price is zero or negative (nothing to derive).
    pub fn breakdown(&self, price_including_vat: Decimal) -> Option<VariantPricing> {
        if price_including_vat <= Decimal::ZERO {
            return None;
        }

        let excluding = (price_including_vat / (Decimal::ONE + self.vat_rate)).round_dp(2);
        let vat_amount = (price_including_vat - excluding).round_dp(2);

        Some(VariantPricing {
            price_including_vat,
            price_excluding_vat: excluding,
            vat_amount,
            vat_rate: self.vat_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_breakdown_round_trip() {
        let calc = PricingCalculator::new(dec!(0.20));
        let pricing = calc.breakdown(dec!(49.99)).expect("breakdown");

        assert_eq!(pricing.price_excluding_vat, dec!(41.66));
        assert_eq!(pricing.vat_amount, dec!(8.33));
        assert_eq!(
            pricing.price_excluding_vat + pricing.vat_amount,
            dec!(49.99)
        );
    }

    #[test]
    fn test_whole_number_price() {
        let calc = PricingCalculator::new(dec!(0.20));
        let pricing = calc.breakdown(dec!(120.00)).expect("breakdown");

        assert_eq!(pricing.price_excluding_vat, dec!(100.00));
        assert_eq!(pricing.vat_amount, dec!(20.00));
    }

    #[test]
    fn test_zero_and_negative_skipped() {
        let calc = PricingCalculator::new(dec!(0.20));
        assert!(calc.breakdown(Decimal::ZERO).is_none());
        assert!(calc.breakdown(dec!(-1.00)).is_none());
    }

    #[test]
    fn test_zero_rate() {
        let calc = PricingCalculator::new(Decimal::ZERO);
        let pricing = calc.breakdown(dec!(10.00)).expect("breakdown");
        assert_eq!(pricing.price_excluding_vat, dec!(10.00));
        assert_eq!(pricing.vat_amount, dec!(0.00));
    }
}
