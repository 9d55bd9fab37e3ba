use crate::collectors::ParseError;
use std::fmt;
use std::str::FromStr;

/// Size units vendor tools report, smallest first. Each step is 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Unit {
    KB,
    MB,
    GB,
    TB,
    PB,
}

const UNITS: [Unit; 5] = [Unit::KB, Unit::MB, Unit::GB, Unit::TB, Unit::PB];

/// Everything is normalized to this unit.
pub const CANONICAL: Unit = Unit::GB;

impl Unit {
    pub fn label(&self) -> &'static str {
        match self {
            Unit::KB => "KB",
            Unit::MB => "MB",
            Unit::GB => "GB",
            Unit::TB => "TB",
            Unit::PB => "PB",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl FromStr for Unit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UNITS
            .iter()
            .find(|u| u.label().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ParseError(format!("unrecognized size unit '{}'", s)))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A unit-tagged size as printed by a vendor tool, e.g. "894.252 GB".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub value: f64,
    pub unit:  Unit,
}

impl FromStr for Size {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let value = tokens
            .next()
            .ok_or_else(|| ParseError("empty size".to_string()))?;
        let value = value
            .parse::<f64>()
            .map_err(|e| ParseError(format!("bad size value '{}': {}", value, e)))?;
        let unit = tokens
            .next()
            .ok_or_else(|| ParseError(format!("size '{}' has no unit", s.trim())))?
            .parse::<Unit>()?;
        Ok(Size { value, unit })
    }
}

/// Rounded to two decimals: "894.25 GB", "2.0 GB".
impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Whole values keep one decimal: "1.0 GB", not "1 GB".
        let value = round2(self.value);
        if value.fract() == 0.0 {
            write!(f, "{:.1} {}", value, self.unit)
        } else {
            write!(f, "{} {}", value, self.unit)
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Convert to GB, stepping by 1024 per unit. The target is always GB.
pub fn normalize(value: f64, unit: Unit) -> Size {
    Size { value: round2(to_canonical(value, unit)), unit: CANONICAL }
}

fn to_canonical(value: f64, unit: Unit) -> f64 {
    let mut val = value;
    let mut idx = unit.index();
    let target = CANONICAL.index();
    while idx < target {
        val /= 1024.0;
        idx += 1;
    }
    while idx > target {
        val *= 1024.0;
        idx -= 1;
    }
    val
}

/// Parse "<value> <unit>" and normalize it to GB.
pub fn normalize_str(text: &str) -> Result<Size, ParseError> {
    let size: Size = text.parse()?;
    Ok(normalize(size.value, size.unit))
}

/// Whole gigabytes, truncated rather than rounded: 511990 MB is 499 GB.
pub fn whole_gb(size: Size) -> u64 {
    to_canonical(size.value, size.unit).trunc() as u64
}

/// Format a raw byte count into a human-readable string: "12.5 MB"
pub fn fmt_bytes(bytes: u64) -> String {
    const TB: f64 = 1_099_511_627_776.0;
    const GB: f64 = 1_073_741_824.0;
    const MB: f64 = 1_048_576.0;
    const KB: f64 = 1_024.0;
    let b = bytes as f64;
    if b >= TB      { format!("{:.1} TB", b / TB) }
    else if b >= GB { format!("{:.1} GB", b / GB) }
    else if b >= MB { format!("{:.1} MB", b / MB) }
    else if b >= KB { format!("{:.1} KB", b / KB) }
    else            { format!("{:.0} B",  b) }
}
