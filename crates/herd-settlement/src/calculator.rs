//! Settlement calculator.
//!
//! Pure computation of the farmer/platform disbursement from sale proceeds:
//!
//! 1. `net = gross - expenses`, rejected when negative
//! 2. `farmer = floor(net * farmer_share / 100)`
//! 3. `platform = floor(net * platform_share / 100)`
//!
//! The rounding remainder `net - farmer - platform` is not redistributed; it
//! is at most one micro-unit per bucket and is reported by
//! [`SettlementResult::remainder`]. Identical inputs always give identical
//! results, so a caller may retry disbursement without recomputing.

use herd_types::settlement::{Disbursement, SettlementInput, SettlementResult};
use herd_types::split::SplitConfig;
use herd_types::{Amount, Identity};

use crate::{Result, SettlementError};

/// Validate that a split's shares sum to 100.
///
/// # Errors
///
/// - [`SettlementError::Configuration`] if they do not
pub fn validate_split(split: &SplitConfig) -> Result<()> {
    let total = split.total_share();
    if total != 100 {
        return Err(SettlementError::Configuration {
            split_id: split.id.clone(),
            farmer_share: split.farmer_share,
            platform_share: split.platform_share,
            total,
        });
    }
    Ok(())
}

/// Compute the settlement for `input`.
///
/// # Errors
///
/// - [`SettlementError::Configuration`] if the split's shares do not sum to 100
/// - [`SettlementError::NegativeSettlement`] if expenses exceed gross
pub fn calculate(input: &SettlementInput) -> Result<SettlementResult> {
    validate_split(&input.split)?;

    let net_amount = input
        .gross_amount
        .checked_sub(input.expenses)
        .ok_or(SettlementError::NegativeSettlement {
            gross: input.gross_amount,
            expenses: input.expenses,
        })?;

    let farmer_amount = share_of(net_amount, input.split.farmer_share);
    let platform_amount = share_of(net_amount, input.split.platform_share);

    Ok(SettlementResult {
        net_amount,
        farmer_amount,
        platform_amount,
    })
}

/// `floor(amount * pct / 100)` without overflowing `u64`.
///
/// With `amount = 100q + r` this is `q * pct + floor(r * pct / 100)`.
fn share_of(amount: Amount, pct: u8) -> Amount {
    let pct = Amount::from(pct);
    (amount / 100) * pct + (amount % 100) * pct / 100
}

/// The farmer/platform payment pair for a computed settlement, farmer first.
pub fn disbursement_pair(
    result: &SettlementResult,
    farmer: &Identity,
    platform: &Identity,
) -> [Disbursement; 2] {
    [
        Disbursement {
            payee: farmer.clone(),
            amount: result.farmer_amount,
        },
        Disbursement {
            payee: platform.clone(),
            amount: result.platform_amount,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(gross: Amount, expenses: Amount, farmer: u8, platform: u8) -> SettlementInput {
        SettlementInput {
            gross_amount: gross,
            expenses,
            split: SplitConfig::new("test", "standard", farmer, platform),
        }
    }

    #[test]
    fn test_standard_sale_in_micro_units() {
        let result = calculate(&input(10_000_000, 2_000_000, 70, 30)).expect("calculate");
        assert_eq!(result.net_amount, 8_000_000);
        assert_eq!(result.farmer_amount, 5_600_000);
        assert_eq!(result.platform_amount, 2_400_000);
        assert_eq!(result.remainder(), 0);
    }

    #[test]
    fn test_exact_split_of_100() {
        let result = calculate(&input(100, 0, 33, 67)).expect("calculate");
        assert_eq!(result.farmer_amount, 33);
        assert_eq!(result.platform_amount, 67);
        assert_eq!(result.remainder(), 0);
    }

    #[test]
    fn test_shares_not_summing_to_100_rejected() {
        let err = calculate(&input(100, 0, 33, 34)).expect_err("must reject 33/34");
        assert!(matches!(err, SettlementError::Configuration { total: 67, .. }));
    }

    #[test]
    fn test_rounding_drift_of_one_unit() {
        let result = calculate(&input(7, 0, 70, 30)).expect("calculate");
        assert_eq!(result.farmer_amount, 4);
        assert_eq!(result.platform_amount, 2);
        assert_eq!(result.farmer_amount + result.platform_amount, 6);
        assert_eq!(result.remainder(), 1);
    }

    #[test]
    fn test_expenses_exceeding_gross_rejected() {
        let err = calculate(&input(5, 8, 70, 30)).expect_err("must reject");
        assert!(matches!(
            err,
            SettlementError::NegativeSettlement { gross: 5, expenses: 8 }
        ));
    }

    #[test]
    fn test_invalid_split_checked_before_net() {
        let err = calculate(&input(5, 8, 50, 60)).expect_err("must reject");
        assert!(matches!(err, SettlementError::Configuration { .. }));
    }

    #[test]
    fn test_zero_net_is_allowed() {
        let result = calculate(&input(3_000_000, 3_000_000, 70, 30)).expect("calculate");
        assert_eq!(result.net_amount, 0);
        assert_eq!(result.farmer_amount, 0);
        assert_eq!(result.platform_amount, 0);
    }

    #[test]
    fn test_idempotent() {
        let input = input(12_345_679, 1_000_001, 61, 39);
        let first = calculate(&input).expect("first");
        let second = calculate(&input).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_overflow_at_u64_max() {
        let result = calculate(&input(u64::MAX, 0, 70, 30)).expect("calculate");
        assert_eq!(result.net_amount, u64::MAX);
        assert!(result.farmer_amount + result.platform_amount <= result.net_amount);
        assert_eq!(
            u128::from(result.farmer_amount),
            u128::from(u64::MAX) * 70 / 100
        );
    }

    #[test]
    fn test_share_of_matches_wide_arithmetic() {
        for amount in [0u64, 1, 7, 99, 100, 101, 12_345, 8_000_000, u64::MAX / 3] {
            for pct in [0u8, 1, 30, 33, 50, 67, 70, 99, 100] {
                let expected = u128::from(amount) * u128::from(pct) / 100;
                assert_eq!(u128::from(share_of(amount, pct)), expected, "{amount} @ {pct}%");
            }
        }
    }

    #[test]
    fn test_drift_bound_holds_for_every_valid_split() {
        for farmer in 0..=100u8 {
            let platform = 100 - farmer;
            for net in [0u64, 1, 2, 3, 7, 99, 101, 999, 1_000_003] {
                let result = calculate(&input(net, 0, farmer, platform)).expect("calculate");
                let paid = result.farmer_amount + result.platform_amount;
                assert!(paid <= result.net_amount);
                // Two floored buckets lose strictly less than one unit each.
                assert!(result.remainder() <= 1, "net {net} split {farmer}/{platform}");
            }
        }
    }

    #[test]
    fn test_disbursement_pair_order() {
        let result = calculate(&input(10_000_000, 2_000_000, 70, 30)).expect("calculate");
        let pair = disbursement_pair(&result, &Identity::from("FARMER"), &Identity::from("PLATFORM"));
        assert_eq!(pair[0].payee.as_str(), "FARMER");
        assert_eq!(pair[0].amount, 5_600_000);
        assert_eq!(pair[1].payee.as_str(), "PLATFORM");
        assert_eq!(pair[1].amount, 2_400_000);
    }
}
