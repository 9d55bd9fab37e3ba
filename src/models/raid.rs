use crate::collectors::ParseError;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Requested or realized logical drive size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeGb {
    /// Use all remaining space on the member disks.
    Max,
    Gb(u64),
}

/// Largest size whose megabyte count fits in a u64.
pub const MAX_SIZE_GB: u64 = u64::MAX / 1024;

impl SizeGb {
    /// The size argument vendor tools take: "MAX" or megabytes.
    pub fn to_megabytes_arg(&self) -> Result<String, ParseError> {
        match self {
            SizeGb::Max   => Ok("MAX".to_string()),
            SizeGb::Gb(g) => g
                .checked_mul(1024)
                .map(|mb| mb.to_string())
                .ok_or_else(|| ParseError(format!("size_gb {} is out of range", g))),
        }
    }
}

fn checked_gb<E: de::Error>(g: u64) -> Result<SizeGb, E> {
    if g > MAX_SIZE_GB {
        return Err(E::custom(format!("size_gb {} exceeds {}", g, MAX_SIZE_GB)));
    }
    Ok(SizeGb::Gb(g))
}

impl fmt::Display for SizeGb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeGb::Max   => f.write_str("MAX"),
            SizeGb::Gb(g) => write!(f, "{}", g),
        }
    }
}

impl Serialize for SizeGb {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SizeGb::Max   => serializer.serialize_str("MAX"),
            SizeGb::Gb(g) => serializer.serialize_u64(*g),
        }
    }
}

impl<'de> Deserialize<'de> for SizeGb {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(g) => checked_gb(g),
            Raw::Text(s) if s.eq_ignore_ascii_case("max") => Ok(SizeGb::Max),
            Raw::Text(s) => s.parse().map_err(|_| {
                de::Error::custom(format!("size_gb must be \"MAX\" or whole GB, got '{}'", s))
            }).and_then(checked_gb),
        }
    }
}

/// Controllers and RAID levels show up both as `"1"` and `1` in layouts.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s))   => Ok(Some(s)),
        Some(Value::Number(n))   => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!("expected string or number, got {}", other))),
    }
}

/// One logical drive of a target RAID layout. Keys this crate does not
/// use (`volume_name`, `is_root_volume`, ...) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalDiskSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_gb: Option<SizeGb>,

    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub raid_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_disks: Option<Vec<String>>,

    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogicalDiskSpec {
    /// Requested size; an absent size means MAX.
    pub fn requested_size(&self) -> SizeGb {
        self.size_gb.unwrap_or(SizeGb::Max)
    }

    /// The fields a create command needs, or the name of the first one
    /// missing.
    pub fn require(&self) -> Result<(&str, &[String], &str), &'static str> {
        let level = self.raid_level.as_deref().ok_or("raid_level")?;
        let disks = self.physical_disks.as_deref().ok_or("physical_disks")?;
        let controller = self.controller.as_deref().ok_or("controller")?;
        Ok((level, disks, controller))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetRaidConfig {
    #[serde(default)]
    pub logical_disks: Vec<LogicalDiskSpec>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The node record the host agent passes to configuration steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_raid_config: Option<TargetRaidConfig>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
