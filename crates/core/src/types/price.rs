//! Prices in integer cents.
//!
//! Every money amount in the shop (product prices, order item prices, order
//! totals, payment charges) is stored as a whole number of cents in USD, so
//! $24.99 is entered as `2499`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A USD price in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Create a price from a number of cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The price in cents.
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    ///
    /// Saturates instead of wrapping on overflow.
    #[must_use]
    pub const fn times(self, quantity: i64) -> Self {
        Self(self.0.saturating_mul(quantity))
    }

    /// Whether this is below zero, which no stored price may be.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl core::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl core::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |tally, price| tally + price)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_money(self.0))
    }
}

/// Format an amount in cents as US dollars.
///
/// Whole-dollar amounts drop the cents (`$24`), anything else shows two
/// decimals (`$24.99`). Thousands are comma separated.
///
/// ```
/// use cyber_shop_core::format_money;
///
/// assert_eq!(format_money(2499), "$24.99");
/// assert_eq!(format_money(5000), "$50");
/// assert_eq!(format_money(123_456_789), "$1,234,567.89");
/// ```
#[must_use]
pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let dollars = group_thousands(abs / 100);
    let remainder = abs % 100;

    if remainder == 0 {
        format!("{sign}${dollars}")
    } else {
        format!("{sign}${dollars}.{remainder:02}")
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money_cents() {
        assert_eq!(format_money(2499), "$24.99");
        assert_eq!(format_money(1), "$0.01");
        assert_eq!(format_money(105), "$1.05");
    }

    #[test]
    fn test_format_money_whole_dollars() {
        assert_eq!(format_money(0), "$0");
        assert_eq!(format_money(100), "$1");
        assert_eq!(format_money(300_000), "$3,000");
    }

    #[test]
    fn test_format_money_negative() {
        assert_eq!(format_money(-250), "-$2.50");
    }

    #[test]
    fn test_price_sum_and_times() {
        let total: Price = [Price::from_cents(2499).times(2), Price::from_cents(1000)]
            .into_iter()
            .sum();
        assert_eq!(total.cents(), 5998);
        assert_eq!(total.to_string(), "$59.98");
    }

    #[test]
    fn test_is_negative() {
        assert!(Price::from_cents(-1).is_negative());
        assert!(!Price::ZERO.is_negative());
        assert!(!Price::from_cents(2499).is_negative());
    }
}
