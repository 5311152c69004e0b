//! Proportional split of a balance across a delegation set.
//!
//! Policy: the remainder is inert. Whatever is not covered by the shares (the un-delegated
//! fraction plus per-entry truncation) is attributed to nobody.

use crate::{Address, Balance, Delegation, Result, VotesError};

/// Absolute vote amount owed to one delegatee at a given balance. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelegationAdjustment {
    pub delegatee: Address,
    pub amount: Balance,
}

/// `floor(value * numerator / denominator)` without intermediate overflow.
///
/// Fails with `InvalidInput` on a zero denominator or `numerator > denominator`.
///
/// With `value = q * d + r`, the result is `q * n + floor(r * n / d)`: `q * n <= value` and
/// `r * n < d^2 <= 2^64`, so the computation is exact for every `u128` value.
pub fn mul_div_floor(value: Balance, numerator: u32, denominator: u32) -> Result<Balance> {
    if denominator == 0 {
        return Err(VotesError::InvalidInput("division by zero".into()));
    }
    if numerator > denominator {
        return Err(VotesError::InvalidInput(format!(
            "numerator {numerator} above denominator {denominator}"
        )));
    }
    let n = u128::from(numerator);
    let d = u128::from(denominator);
    let q = value / d;
    let r = value % d;
    Ok(q * n + (r * n) / d)
}

/// Compute the vote amount owed to each entry of `delegations` at `balance`.
///
/// Preconditions (re-validated, fail-closed):
/// - every share is non-zero (`InvalidShareZero`)
/// - shares sum to at most `denominator` (`ShareSumExceedsDenominator`)
///
/// Postconditions:
/// - output has one entry per input entry, in input order
/// - `sum(amount) <= balance`
pub fn distribute(
    delegations: &[Delegation],
    balance: Balance,
    denominator: u32,
) -> Result<Vec<DelegationAdjustment>> {
    if denominator == 0 {
        return Err(VotesError::ConfigError("denominator must be > 0".into()));
    }

    let mut sum: u64 = 0;
    for d in delegations {
        if d.share == 0 {
            return Err(VotesError::InvalidShareZero {
                delegatee: d.delegatee,
            });
        }
        sum = sum.saturating_add(u64::from(d.share));
    }
    if sum > u64::from(denominator) {
        return Err(VotesError::ShareSumExceedsDenominator { sum, denominator });
    }

    delegations
        .iter()
        .map(|d| {
            Ok(DelegationAdjustment {
                delegatee: d.delegatee,
                amount: mul_div_floor(balance, d.share, denominator)?,
            })
        })
        .collect()
}

/// Portion of `balance` not attributed to any delegatee by `adjustments`.
pub fn inert_remainder(adjustments: &[DelegationAdjustment], balance: Balance) -> Balance {
    let attributed = adjustments
        .iter()
        .fold(0u128, |acc, a| acc.saturating_add(a.amount));
    balance.saturating_sub(attributed)
}
