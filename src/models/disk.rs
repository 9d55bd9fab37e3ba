use crate::collectors::ParseError;
use crate::util::units;
use serde::Serialize;

/// One physical drive as `arcconf getconfig <ctl> pd` reports it.
/// Every field is the raw report text; sizes are not normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArcconfDisk {
    pub controller_id:               String,
    pub state:                       String,
    pub block_size:                  String,
    pub supported:                   String,
    pub programmed_max_speed:        String,
    pub transfer_speed:              String,
    pub reported_channel_and_device: String,
    pub reported_location:           String,
    pub reported_esd:                String,
    pub vendor:                      String,
    pub model:                       String,
    pub firmware:                    String,
    pub serial_number:               String,
    pub world_wide_name:             String,
    pub reserved_size:               String,
    pub used_size:                   String,
    pub unused_size:                 String,
    pub total_size:                  String,
    pub write_cache:                 String,
    pub fru:                         String,
    pub s_m_a_r_t:                   String,
    pub s_m_a_r_t_warnings:          String,
    pub power_state:                 String,
    pub supported_power_states:      String,
    pub ssd:                         String,
    pub temperature:                 String,
}

impl ArcconfDisk {
    /// "0,1(1:0)" → "0 1": the channel/device pair `arcconf create` takes.
    pub fn position(&self) -> String {
        let pair = self.reported_channel_and_device
            .split('(')
            .next()
            .unwrap_or_default();
        pair.split(',').map(str::trim).collect::<Vec<_>>().join(" ")
    }

    /// Project onto the compact shape shared with MegaCLI inventory.
    pub fn summary(&self) -> Result<DiskSummary, ParseError> {
        let disk_type = if self.ssd.eq_ignore_ascii_case("yes") {
            "SSD".to_string()
        } else {
            // "SAS 12.0 Gb/s" → "SAS"
            self.transfer_speed
                .split_whitespace()
                .next()
                .unwrap_or("Unknown")
                .to_string()
        };
        Ok(DiskSummary {
            id:            self.position(),
            controller_id: self.controller_id.clone(),
            disk_type,
            size:          units::normalize_str(&self.total_size)?.to_string(),
        })
    }
}

/// Compact physical drive record: position, controller, media type and
/// size in GB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskSummary {
    /// `enclosure:slot` (MegaCLI) or `channel device` (arcconf).
    pub id:            String,
    pub controller_id: String,
    #[serde(rename = "type")]
    pub disk_type:     String,
    pub size:          String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PhysicalDisk {
    Verbose(ArcconfDisk),
    Compact(DiskSummary),
}

impl PhysicalDisk {
    pub fn summary(&self) -> Result<DiskSummary, ParseError> {
        match self {
            PhysicalDisk::Verbose(d) => d.summary(),
            PhysicalDisk::Compact(d) => Ok(d.clone()),
        }
    }
}
