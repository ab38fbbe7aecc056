use crate::money::Money;
use crate::prices::PriceTable;
use serde::Serialize;
use std::convert::TryFrom;

/// Amounts printed on one household's receipt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fees {
    pub school_fee: Money,
    pub membership_fee: Money,
    pub total: Money,
}

impl Fees {
    /// The n-th child of a household pays the n-th tier of the fee table, whichever
    /// child that is. Children beyond the last tier are free.
    pub fn compute(children: usize, prices: &PriceTable) -> Self {
        let children = u32::try_from(children).unwrap_or(u32::MAX);
        let school_fee: Money = (1..=children).map(|rank| prices.child_fee(rank)).sum();
        let membership_fee = prices.membership_fee();
        Fees {
            school_fee,
            membership_fee,
            total: school_fee + membership_fee,
        }
    }
}
