//! 流量方向

use std::fmt;

/// 两个互不引用的流量方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Downlink,
    Uplink,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Downlink, Direction::Uplink];

    pub fn index(self) -> usize {
        match self {
            Direction::Downlink => 0,
            Direction::Uplink => 1,
        }
    }

    /// 文件名标签：`dl` / `ul`
    pub fn tag(self) -> &'static str {
        match self {
            Direction::Downlink => "dl",
            Direction::Uplink => "ul",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Downlink => f.write_str("Downlink"),
            Direction::Uplink => f.write_str("Uplink"),
        }
    }
}
