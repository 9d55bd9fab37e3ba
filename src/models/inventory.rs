use crate::models::disk::PhysicalDisk;
use serde::Serialize;
use std::fmt;

/// How well a hardware manager supports the machine it runs on. Higher
/// wins when the host picks a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HardwareSupport {
    None            = 0,
    // Reported by generic and site-specific managers this binary does not
    // ship. Kept so the ranking matches what the host agent expects.
    #[allow(dead_code)]
    Generic         = 1,
    Mainline        = 2,
    #[allow(dead_code)]
    ServiceProvider = 3,
}

impl HardwareSupport {
    pub fn label(&self) -> &'static str {
        match self {
            HardwareSupport::None            => "NONE",
            HardwareSupport::Generic         => "GENERIC",
            HardwareSupport::Mainline        => "MAINLINE",
            HardwareSupport::ServiceProvider => "SERVICE_PROVIDER",
        }
    }
}

impl fmt::Display for HardwareSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), *self as u8)
    }
}

/// One cleaning step a manager offers to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanStep {
    pub step:             &'static str,
    pub priority:         u32,
    pub interface:        &'static str,
    pub reboot_requested: bool,
    pub abortable:        bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemVendor {
    pub product_name:  String,
    pub serial_number: String,
    pub manufacturer:  String,
}

/// Metadata for one top-level disk device from lsblk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDevice {
    pub name:       String,
    pub size:       u64,
    pub model:      Option<String>,
    pub serial:     Option<String>,
    pub vendor:     Option<String>,
    pub rotational: bool,
    pub transport:  Option<String>,
}

/// What a RAID hardware manager contributes to the host's inventory.
#[derive(Debug, Clone, Serialize)]
pub struct Inventory {
    pub disks:          Vec<BlockDevice>,
    pub physical_disks: Vec<PhysicalDisk>,
    pub bmc_address:    Option<String>,
    pub system_vendor:  Option<SystemVendor>,
}
