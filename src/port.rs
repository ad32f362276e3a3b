use std::{fmt::Display, ops::RangeInclusive};

use crate::error::ScanError;

pub const MIN_PORT: u16 = 1;
pub const MAX_PORT: u16 = u16::MAX;

/// Inclusive range of TCP ports, always non-empty and never containing port 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Result<Self, ScanError> {
        if start < MIN_PORT {
            return Err(ScanError::PortOutOfRange("start", start.into()));
        }
        if start > end {
            return Err(ScanError::InvertedRange { start, end });
        }

        Ok(Self { start, end })
    }

    /// Parses both bounds from their textual form, as typed on the command line.
    pub fn parse(start: &str, end: &str) -> Result<Self, ScanError> {
        let start = parse_bound("start", start)?;
        let end = parse_bound("end", end)?;

        Self::new(start, end)
    }

    #[inline]
    pub fn start(&self) -> u16 {
        self.start
    }

    #[inline]
    pub fn end(&self) -> u16 {
        self.end
    }

    /// Number of ports in the range, at least one.
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    #[inline]
    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }

    #[inline]
    pub fn ports(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }
}

impl Display for PortRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

fn parse_bound(which: &'static str, raw: &str) -> Result<u16, ScanError> {
    // Parsed wider than u16 so that 65536 reports as out of range, not as garbage.
    let value = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| ScanError::InvalidPort(which, raw.into()))?;

    match u16::try_from(value) {
        Ok(port) if port >= MIN_PORT => Ok(port),
        _ => Err(ScanError::PortOutOfRange(which, value)),
    }
}
