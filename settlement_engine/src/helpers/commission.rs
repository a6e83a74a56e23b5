use lps_common::Reais;

/// The fraction of each sale retained by the platform, expressed as a percentage. The seller receives the
/// complement. The rate is injected from configuration; 20% (an 80/20 split) is the default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionRate {
    platform_fee_percent: f64,
}

pub const DEFAULT_PLATFORM_FEE_PERCENT: f64 = 20.0;

impl Default for CommissionRate {
    fn default() -> Self {
        Self { platform_fee_percent: DEFAULT_PLATFORM_FEE_PERCENT }
    }
}

impl CommissionRate {
    /// Values outside 0..=100 are clamped. A clamped rate is almost certainly a configuration mistake, but
    /// a clamp keeps the ledger arithmetic well-defined instead of producing negative credits.
    pub fn from_platform_fee_percent(pct: f64) -> Self {
        Self { platform_fee_percent: pct.clamp(0.0, 100.0) }
    }

    pub fn platform_fee_percent(&self) -> f64 {
        self.platform_fee_percent
    }

    /// The seller's multiplier, e.g. 0.80 for a 20% platform fee.
    pub fn seller_multiplier(&self) -> f64 {
        1.0 - self.platform_fee_percent / 100.0
    }
}

/// Computes the seller's share of an item price, rounding to the nearest centavo.
pub fn seller_share(price_paid: Reais, rate: CommissionRate) -> Reais {
    let share = (price_paid.value() as f64 * rate.seller_multiplier()).round() as i64;
    Reais::from_cents(share)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_is_eighty_twenty() {
        let rate = CommissionRate::default();
        assert_eq!(seller_share(Reais::from_cents(10_000), rate), Reais::from_cents(8_000));
    }

    #[test]
    fn rounding_is_to_nearest_centavo() {
        let rate = CommissionRate::from_platform_fee_percent(20.0);
        // 33 centavos * 0.8 = 26.4 -> 26
        assert_eq!(seller_share(Reais::from_cents(33), rate), Reais::from_cents(26));
        // 37 centavos * 0.8 = 29.6 -> 30
        assert_eq!(seller_share(Reais::from_cents(37), rate), Reais::from_cents(30));
    }

    #[test]
    fn degenerate_rates_are_clamped() {
        let all_to_platform = CommissionRate::from_platform_fee_percent(150.0);
        assert_eq!(seller_share(Reais::from_cents(1_000), all_to_platform), Reais::zero());
        let all_to_seller = CommissionRate::from_platform_fee_percent(-3.0);
        assert_eq!(seller_share(Reais::from_cents(1_000), all_to_seller), Reais::from_cents(1_000));
    }
}
