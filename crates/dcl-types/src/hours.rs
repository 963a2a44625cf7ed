use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TypeError;

/// A quantity of delegation credit.
///
/// Stored as whole minutes so every sum and the percentage caps are exact.
/// Serialized as the raw minute count; deserialization also accepts any
/// notation [`Hours::parse`] understands, so configuration files can say `"12h"`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Hours(i64);

impl Hours {
    pub const ZERO: Self = Self(0);

    /// Largest accepted magnitude, 100 000 hours. Parsed and deserialized
    /// quantities stay within it, so ledger sums cannot overflow.
    pub const MAX: Self = Self(100_000 * 60);

    pub const fn from_minutes(minutes: i64) -> Self {
        Self(minutes)
    }

    pub const fn from_hours(hours: i64) -> Self {
        Self(hours.saturating_mul(60))
    }

    /// Whole minutes.
    pub const fn minutes(self) -> i64 {
        self.0
    }

    /// Fractional hours, for display and reporting only.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 60.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Negative quantities become zero.
    pub fn clamp_non_negative(self) -> Self {
        Self(self.0.max(0))
    }

    /// `self * percent / 100`, rounded down to the minute.
    pub fn percent(self, percent: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(percent)) / 100)
    }

    /// Parse `7`, `7.5`, `7h`, `7h30` or `7:30`.
    ///
    /// Quantities beyond [`Hours::MAX`] in either direction are rejected.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let raw = input.trim();
        let invalid = || TypeError::InvalidHours(input.to_string());
        if raw.is_empty() {
            return Err(invalid());
        }

        let (negative, body) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let whole_hours = |h: &str| -> Result<i64, TypeError> {
            let hours: i64 = h.parse().map_err(|_| invalid())?;
            hours.checked_mul(60).ok_or_else(invalid)
        };

        let minutes = if let Some((h, m)) = body.split_once(['h', 'H', ':']) {
            let mins: i64 = if m.is_empty() {
                0
            } else {
                m.parse().map_err(|_| invalid())?
            };
            if !(0..60).contains(&mins) {
                return Err(invalid());
            }
            whole_hours(h)?.checked_add(mins).ok_or_else(invalid)?
        } else if let Some((whole, frac)) = body.split_once(['.', ',']) {
            let hours = if whole.is_empty() { 0 } else { whole_hours(whole)? };
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let fraction: f64 = format!("0.{frac}").parse().map_err(|_| invalid())?;
            hours
                .checked_add((fraction * 60.0).round() as i64)
                .ok_or_else(invalid)?
        } else {
            whole_hours(body)?
        };

        if minutes < 0 {
            return Err(invalid());
        }
        Self::bounded(if negative { -minutes } else { minutes }).ok_or_else(invalid)
    }

    /// `minutes` as a quantity, or `None` beyond [`Hours::MAX`].
    pub fn bounded(minutes: i64) -> Option<Self> {
        (minutes.checked_abs()? <= Self::MAX.0).then_some(Self(minutes))
    }
}

impl Add for Hours {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Hours {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for Hours {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl SubAssign for Hours {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl Neg for Hours {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Sum for Hours {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl FromStr for Hours {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Hours {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Minutes(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Minutes(minutes) => Self::bounded(minutes).ok_or_else(|| {
                serde::de::Error::custom(TypeError::InvalidHours(minutes.to_string()))
            }),
            Repr::Text(text) => Self::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

impl fmt::Debug for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hours({self})")
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}h{:02}", abs / 60, abs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_accepts_common_notations() {
        assert_eq!(Hours::parse("7").unwrap(), Hours::from_minutes(420));
        assert_eq!(Hours::parse("7.5").unwrap(), Hours::from_minutes(450));
        assert_eq!(Hours::parse("7,25").unwrap(), Hours::from_minutes(435));
        assert_eq!(Hours::parse("7h").unwrap(), Hours::from_hours(7));
        assert_eq!(Hours::parse("7h30").unwrap(), Hours::from_minutes(450));
        assert_eq!(Hours::parse("0:45").unwrap(), Hours::from_minutes(45));
        assert_eq!(Hours::parse("-2").unwrap(), Hours::from_hours(-2));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Hours::parse("").is_err());
        assert!(Hours::parse("abc").is_err());
        assert!(Hours::parse("7h75").is_err());
        assert!(Hours::parse("7.x").is_err());
    }

    #[test]
    fn display_uses_hour_minute_notation() {
        assert_eq!(Hours::from_minutes(450).to_string(), "7h30");
        assert_eq!(Hours::from_hours(10).to_string(), "10h00");
        assert_eq!(Hours::from_minutes(-90).to_string(), "-1h30");
    }

    #[test]
    fn percent_is_exact_on_minutes() {
        assert_eq!(Hours::from_hours(10).percent(150), Hours::from_hours(15));
        assert_eq!(Hours::from_hours(22).percent(150), Hours::from_hours(33));
    }

    #[test]
    fn clamp_drops_negative_values() {
        assert_eq!(Hours::from_hours(-3).clamp_non_negative(), Hours::ZERO);
        assert_eq!(Hours::from_hours(3).clamp_non_negative(), Hours::from_hours(3));
    }

    #[test]
    fn serializes_as_minutes() {
        let json = serde_json::to_string(&Hours::from_hours(2)).unwrap();
        assert_eq!(json, "120");
    }

    #[test]
    fn deserializes_minutes_or_notation() {
        let a: Hours = serde_json::from_str("90").unwrap();
        let b: Hours = serde_json::from_str("\"1h30\"").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<Hours>("\"soon\"").is_err());
    }

    #[test]
    fn oversized_quantities_are_rejected_not_wrapped() {
        assert!(Hours::parse("200000000000000000").is_err());
        assert!(Hours::parse("200000000000000000h").is_err());
        assert!(Hours::parse("-200000000000000000:30").is_err());
        assert!(Hours::parse("153722867280912930.5").is_err());
        assert!(Hours::parse("100001h").is_err());
        assert_eq!(Hours::parse("100000h").unwrap(), Hours::MAX);

        assert!(serde_json::from_str::<Hours>("\"200000000000000000h\"").is_err());
        assert!(serde_json::from_str::<Hours>("9223372036854775807").is_err());
    }

    #[test]
    fn arithmetic_saturates() {
        let huge = Hours::from_minutes(i64::MAX);
        assert_eq!(huge + Hours::from_minutes(1), huge);
        assert_eq!(Hours::from_minutes(i64::MIN) - Hours::from_minutes(1), Hours::from_minutes(i64::MIN));
        assert_eq!(-Hours::from_minutes(i64::MIN), huge);
        assert_eq!(Hours::from_hours(i64::MAX), huge);
    }

    proptest! {
        #[test]
        fn display_then_parse_preserves_minutes(minutes in 0i64..100_000) {
            let hours = Hours::from_minutes(minutes);
            prop_assert_eq!(Hours::parse(&hours.to_string()).unwrap(), hours);
        }
    }
}
