use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

const SQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Second-resolution local timestamp.
///
/// Serialized as an SQL-style string, `YYYY-MM-DD HH:MM:SS`, which is the
/// representation used for every timestamp in the document.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Datime(NaiveDateTime);

impl Datime {
    /// The current local time, truncated to whole seconds.
    pub fn now() -> Self {
        let now = Local::now().naive_local();
        Self(now.with_nanosecond(0).unwrap_or(now))
    }

    /// Fixed timestamp written when reproducible output is requested.
    pub fn reproducible() -> Self {
        Self(
            NaiveDate::from_ymd_opt(1995, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
        )
    }

    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    pub fn as_naive(&self) -> &NaiveDateTime {
        &self.0
    }

    /// `YYYY-MM-DD HH:MM:SS`.
    pub fn to_sql_string(&self) -> String {
        self.0.format(SQL_FORMAT).to_string()
    }

    /// Parse `YYYY-MM-DD HH:MM:SS`.
    pub fn parse_sql(s: &str) -> Result<Self, TypeError> {
        NaiveDateTime::parse_from_str(s.trim(), SQL_FORMAT)
            .map(Self)
            .map_err(|e| TypeError::InvalidTimestamp(format!("{s}: {e}")))
    }
}

impl Default for Datime {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Debug for Datime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Datime({})", self.to_sql_string())
    }
}

impl fmt::Display for Datime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql_string())
    }
}

impl FromStr for Datime {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_sql(s)
    }
}

impl Serialize for Datime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_sql_string())
    }
}

impl<'de> Deserialize<'de> for Datime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_sql(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_string_roundtrip() {
        let dt = Datime::parse_sql("2022-07-08 13:45:01").unwrap();
        assert_eq!(dt.to_sql_string(), "2022-07-08 13:45:01");
    }

    #[test]
    fn now_has_no_subseconds() {
        assert_eq!(Datime::now().as_naive().nanosecond(), 0);
    }

    #[test]
    fn reproducible_is_fixed() {
        assert_eq!(Datime::reproducible(), Datime::reproducible());
        assert_eq!(Datime::reproducible().to_string(), "1995-01-01 00:00:00");
    }

    #[test]
    fn invalid_string_rejected() {
        assert!(matches!(
            Datime::parse_sql("yesterday"),
            Err(TypeError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn serde_uses_sql_string() {
        let dt = Datime::parse_sql("2020-01-02 03:04:05").unwrap();
        let json = serde_json::to_string(&dt).unwrap();
        assert_eq!(json, "\"2020-01-02 03:04:05\"");
        let parsed: Datime = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, dt);
    }

    #[test]
    fn ordering_follows_time() {
        let a = Datime::parse_sql("2020-01-01 00:00:00").unwrap();
        let b = Datime::parse_sql("2020-01-01 00:00:01").unwrap();
        assert!(a < b);
    }
}
