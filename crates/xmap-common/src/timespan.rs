//! Signed duration measured in 100-nanosecond ticks.
//!
//! The canonical text form is `[-][d.]hh:mm:ss[.fffffff]`, where the day
//! component is only written when non-zero and the fraction is only written
//! when the duration has sub-second ticks.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A signed duration with 100-nanosecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TimeSpan {
    ticks: i64,
}

impl TimeSpan {
    /// Ticks per millisecond.
    pub const TICKS_PER_MILLISECOND: i64 = 10_000;
    /// Ticks per second.
    pub const TICKS_PER_SECOND: i64 = 10_000_000;
    /// Ticks per minute.
    pub const TICKS_PER_MINUTE: i64 = Self::TICKS_PER_SECOND * 60;
    /// Ticks per hour.
    pub const TICKS_PER_HOUR: i64 = Self::TICKS_PER_MINUTE * 60;
    /// Ticks per day.
    pub const TICKS_PER_DAY: i64 = Self::TICKS_PER_HOUR * 24;

    /// Zero duration.
    pub const ZERO: Self = Self { ticks: 0 };

    /// Create a duration from a raw tick count.
    #[inline]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self { ticks }
    }

    /// Create a duration from whole seconds.
    pub fn from_seconds(seconds: i64) -> Result<Self, Error> {
        seconds
            .checked_mul(Self::TICKS_PER_SECOND)
            .map(Self::from_ticks)
            .ok_or(Error::TimeSpanOverflow)
    }

    /// Create a duration from days, hours, minutes and seconds.
    pub fn new(days: i64, hours: i64, minutes: i64, seconds: i64) -> Result<Self, Error> {
        let total = days
            .checked_mul(Self::TICKS_PER_DAY)
            .and_then(|t| t.checked_add(hours.checked_mul(Self::TICKS_PER_HOUR)?))
            .and_then(|t| t.checked_add(minutes.checked_mul(Self::TICKS_PER_MINUTE)?))
            .and_then(|t| t.checked_add(seconds.checked_mul(Self::TICKS_PER_SECOND)?))
            .ok_or(Error::TimeSpanOverflow)?;
        Ok(Self::from_ticks(total))
    }

    /// Raw tick count.
    #[inline]
    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    /// Whole days component.
    #[inline]
    pub const fn days(&self) -> i64 {
        self.ticks / Self::TICKS_PER_DAY
    }

    /// Check if this is the zero duration.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.ticks == 0
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.ticks < 0;
        let abs = self.ticks.unsigned_abs();

        let day = Self::TICKS_PER_DAY as u64;
        let hour = Self::TICKS_PER_HOUR as u64;
        let minute = Self::TICKS_PER_MINUTE as u64;
        let second = Self::TICKS_PER_SECOND as u64;

        let days = abs / day;
        let hours = (abs % day) / hour;
        let minutes = (abs % hour) / minute;
        let seconds = (abs % minute) / second;
        let fraction = abs % second;

        if negative {
            f.write_str("-")?;
        }
        if days > 0 {
            write!(f, "{}.", days)?;
        }
        write!(f, "{:02}:{:02}:{:02}", hours, minutes, seconds)?;
        if fraction > 0 {
            write!(f, ".{:07}", fraction)?;
        }
        Ok(())
    }
}

impl FromStr for TimeSpan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidTimeSpan(s.to_string());

        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let parts: Vec<&str> = body.split(':').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        // `d.hh`: the day separator is a dot before the hour field.
        let (days, hours) = match parts[0].split_once('.') {
            Some((d, h)) => (d, h),
            None => ("0", parts[0]),
        };
        let (seconds, fraction) = match parts[2].split_once('.') {
            Some((s, frac)) => (s, frac),
            None => (parts[2], ""),
        };

        let number = |text: &str| -> Result<i64, Error> {
            if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            text.parse::<i64>().map_err(|_| invalid())
        };

        let days = number(days)?;
        let hours = number(hours)?;
        let minutes = number(parts[1])?;
        let seconds = number(seconds)?;
        if hours > 23 || minutes > 59 || seconds > 59 {
            return Err(invalid());
        }

        let fraction_ticks = if fraction.is_empty() {
            0
        } else {
            if fraction.len() > 7 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let padded = format!("{:0<7}", fraction);
            padded.parse::<i64>().map_err(|_| invalid())?
        };

        let span = Self::new(days, hours, minutes, seconds)?;
        let ticks = span
            .ticks
            .checked_add(fraction_ticks)
            .ok_or(Error::TimeSpanOverflow)?;

        Ok(Self::from_ticks(if negative { -ticks } else { ticks }))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TimeSpan {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TimeSpan {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(TimeSpan::ZERO.to_string(), "00:00:00");
        assert_eq!(TimeSpan::new(0, 1, 2, 3).unwrap().to_string(), "01:02:03");
        assert_eq!(TimeSpan::new(2, 3, 0, 5).unwrap().to_string(), "2.03:00:05");
        assert_eq!(TimeSpan::from_ticks(15_000_000).to_string(), "00:00:01.5000000");
        assert_eq!(TimeSpan::from_ticks(-TimeSpan::TICKS_PER_HOUR).to_string(), "-01:00:00");
    }

    #[test]
    fn test_parse() {
        let span: TimeSpan = "2.03:00:05".parse().unwrap();
        assert_eq!(span, TimeSpan::new(2, 3, 0, 5).unwrap());

        let span: TimeSpan = "00:00:01.5".parse().unwrap();
        assert_eq!(span.ticks(), 15_000_000);

        let span: TimeSpan = "-01:00:00".parse().unwrap();
        assert_eq!(span.ticks(), -TimeSpan::TICKS_PER_HOUR);
    }

    #[test]
    fn test_roundtrip() {
        for ticks in [0, 1, 9_999_999, 36_000_000_000, -864_000_000_001, i64::MAX / 2] {
            let span = TimeSpan::from_ticks(ticks);
            let parsed: TimeSpan = span.to_string().parse().unwrap();
            assert_eq!(parsed, span);
        }
    }

    #[test]
    fn test_invalid() {
        assert!("".parse::<TimeSpan>().is_err());
        assert!("1:2".parse::<TimeSpan>().is_err());
        assert!("00:61:00".parse::<TimeSpan>().is_err());
        assert!("00:00:00.12345678".parse::<TimeSpan>().is_err());
        assert!("aa:00:00".parse::<TimeSpan>().is_err());
    }
}
