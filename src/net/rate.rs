//! 数据速率
//!
//! 支持 `"500Mb/s"`、`"10Gb/s"`、`"8000b/s"`、`"1kbps"`、`"2MB/s"` 这类写法。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TraceError;

/// 比特率（bit/s）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DataRate(pub u64);

impl DataRate {
    pub fn bps(self) -> u64 {
        self.0
    }
}

impl FromStr for DataRate {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: f64 = num
            .parse()
            .map_err(|_| TraceError::invalid(format!("bad data rate `{s}`")))?;

        let unit = unit.trim();
        let (prefix, rest) = match unit.chars().next() {
            Some('k') | Some('K') => (1e3, &unit[1..]),
            Some('M') => (1e6, &unit[1..]),
            Some('G') => (1e9, &unit[1..]),
            _ => (1.0, unit),
        };
        let per_unit = match rest {
            "" | "b/s" | "bps" | "bit/s" => 1.0,
            "B/s" | "Bps" => 8.0,
            _ => return Err(TraceError::invalid(format!("bad data rate unit `{unit}`"))),
        };
        let bps = (value * prefix * per_unit).round();
        if !bps.is_finite() || bps < 0.0 || bps > u64::MAX as f64 {
            return Err(TraceError::invalid(format!("data rate out of range `{s}`")));
        }
        Ok(DataRate(bps as u64))
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}b/s", self.0)
    }
}

impl Serialize for DataRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bps(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Bps(v) => Ok(DataRate(v)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
