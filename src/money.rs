use crate::words;
use anyhow::{Context, Error, Result, bail};
use rust_decimal::prelude::*;
use serde::Serialize;
use std::convert::TryFrom;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// An amount in euros. Displayed the German way: `1.234,56 EUR`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Money(pub Decimal);

impl Money {
    pub fn zero() -> Self {
        Money(Decimal::zero())
    }

    /// Whole euros, cents are discarded (not rounded).
    pub fn whole_euros(&self) -> Result<i64> {
        self.0
            .trunc()
            .to_i64()
            .context(format!("{} is too large to spell out", self.0))
    }

    /// Spelled out German cardinal of the whole euros followed by the currency word.
    pub fn in_words(&self) -> Result<String> {
        Ok(format!("{} Euro", words::cardinal(self.whole_euros()?)))
    }
}

/// Basically this holds a Decimal that is scaled out to at least 2 dp (doesn't round).
impl TryFrom<f64> for Money {
    type Error = Error;

    fn try_from(f: f64) -> Result<Self> {
        let mut d = Decimal::from_f64(f).context(format!("Failed to convert {} to Money", f))?;
        if d.scale() < 2 {
            d.rescale(2);
        }
        Ok(Self(d))
    }
}

impl From<i64> for Money {
    fn from(i: i64) -> Self {
        let mut d = Decimal::from(i);
        d.rescale(2);
        Self(d)
    }
}

/// Accepts `180`, `180.50`, `180,50`, `1.234,56` with an optional `EUR`/`€` suffix.
impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s
            .trim()
            .trim_end_matches("EUR")
            .trim_end_matches('€')
            .trim();
        if trimmed.is_empty() {
            bail!("Empty amount");
        }
        let normalized = if trimmed.contains(',') {
            trimmed.replace('.', "").replace(',', ".")
        } else {
            trimmed.to_owned()
        };
        let mut d = Decimal::from_str(&normalized)
            .with_context(|| format!("Failed to parse '{}' as an amount", s))?;
        if d.scale() < 2 {
            d.rescale(2);
        }
        Ok(Self(d))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = format!("{:.2}", self.0.abs().round_dp(2));
        let (int, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));
        let mut grouped = String::with_capacity(int.len() + int.len() / 3);
        for (i, digit) in int.chars().enumerate() {
            if i > 0 && (int.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }
        let sign = if self.0.is_sign_negative() && !self.0.is_zero() {
            "-"
        } else {
            ""
        };
        write!(f, "{sign}{grouped},{frac} EUR")
    }
}

impl Add<Money> for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}

#[cfg(test)]
mod money_tests {
    use super::*;
    use std::convert::TryInto;

    #[test]
    fn money_from_f64() -> Result<()> {
        let m: Money = 1f64.try_into()?;
        assert_eq!(m.to_string(), "1,00 EUR");
        let m: Money = 1.1.try_into()?;
        assert_eq!(m.to_string(), "1,10 EUR");
        let m: Money = 1234.5.try_into()?;
        assert_eq!(m.to_string(), "1.234,50 EUR");
        Ok(())
    }

    #[test]
    fn german_grouping() -> Result<()> {
        assert_eq!(Money::from(0).to_string(), "0,00 EUR");
        assert_eq!(Money::from(999).to_string(), "999,00 EUR");
        assert_eq!(Money::from(1000).to_string(), "1.000,00 EUR");
        assert_eq!(Money::from(1234567).to_string(), "1.234.567,00 EUR");
        assert_eq!(Money::from(-1500).to_string(), "-1.500,00 EUR");
        Ok(())
    }

    #[test]
    fn parse_amounts() -> Result<()> {
        assert_eq!("180".parse::<Money>()?, Money::from(180));
        assert_eq!("180,50".parse::<Money>()?.to_string(), "180,50 EUR");
        assert_eq!("1.234,56 EUR".parse::<Money>()?.to_string(), "1.234,56 EUR");
        assert_eq!("99.5".parse::<Money>()?.to_string(), "99,50 EUR");
        assert!("".parse::<Money>().is_err());
        assert!("zehn".parse::<Money>().is_err());
        Ok(())
    }

    #[test]
    fn words_truncate_cents() -> Result<()> {
        let m: Money = 180.99.try_into()?;
        assert_eq!(m.whole_euros()?, 180);
        assert_eq!(m.in_words()?, "einhundertachtzig Euro");
        Ok(())
    }

    #[test]
    fn test_sum() -> Result<()> {
        let total: Money = vec![Money::from(100), Money::from(80), Money::try_from(0.5)?]
            .into_iter()
            .sum();
        assert_eq!(total.to_string(), "180,50 EUR");
        Ok(())
    }
}
