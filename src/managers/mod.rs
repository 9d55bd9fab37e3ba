//! Hardware manager plugins: one per controller family, plus the shared
//! pieces they are built from.

pub mod arcconf;
pub mod mega;

use crate::collectors::{host, lsblk, Error};
use crate::config::ToolsConfig;
use crate::executor::BoxedExecutor;
use crate::models::disk::PhysicalDisk;
use crate::models::inventory::{CleanStep, HardwareSupport, Inventory, SystemVendor};
use crate::models::raid::{Node, SizeGb, TargetRaidConfig};
use serde_json::Value;
use slog::{info, warn, Logger};

pub const VERSION: &str = "1.0";

/// The contract a provisioning agent drives a RAID plugin through.
///
/// `ports` is the node's port list as the agent hands it over; none of the
/// controller families here look at it.
pub trait HardwareManager {
    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str {
        VERSION
    }

    /// MAINLINE when this manager's controller is present, NONE otherwise.
    /// Never fails.
    fn evaluate_hardware_support(&self) -> HardwareSupport;

    fn list_physical_devices(&self) -> Result<Vec<PhysicalDisk>, Error>;

    fn list_hardware_info(&self) -> Result<Inventory, Error>;

    /// Build every logical disk of `node.target_raid_config` and return the
    /// layout with realized sizes filled in.
    fn create_configuration(&self, node: &Node, ports: &[Value]) -> Result<TargetRaidConfig, Error>;

    fn delete_configuration(&self, node: &Node, ports: &[Value]) -> Result<(), Error>;

    fn get_clean_steps(&self, _node: &Node, _ports: &[Value]) -> Vec<CleanStep> {
        clean_steps()
    }
}

pub fn clean_steps() -> Vec<CleanStep> {
    let step = |step, priority, abortable| CleanStep {
        step,
        priority,
        interface:        "deploy",
        reboot_requested: false,
        abortable,
    };
    vec![
        step("erase_devices",          0,  true),
        step("erase_devices_metadata", 99, true),
        step("delete_configuration",   20, false),
        step("create_configuration",   15, false),
    ]
}

/// Pick the manager with the highest support level. The first one wins a
/// tie; NONE everywhere means no manager applies.
pub fn dispatch<'a>(
    managers: &'a [Box<dyn HardwareManager>],
    log: &Logger,
) -> Option<&'a dyn HardwareManager> {
    let mut best: Option<(&'a dyn HardwareManager, HardwareSupport)> = None;
    for manager in managers {
        let support = manager.evaluate_hardware_support();
        info!(log, "hardware support evaluated";
            "manager" => manager.name(), "support" => %support);
        if support == HardwareSupport::None { continue; }
        if best.map_or(true, |(_, s)| support > s) {
            best = Some((manager.as_ref(), support));
        }
    }
    best.map(|(m, _)| m)
}

// ── Logical volume configurator ──────────────────────────────────────

/// A controller family that can build one logical drive.
pub trait LogicalVolumes {
    /// Create the drive and return its realized size in whole GB.
    fn create_logical_drive(
        &self,
        controller: &str,
        size: SizeGb,
        raid_level: &str,
        physical_disks: &[String],
    ) -> Result<u64, Error>;
}

/// Create every complete logical disk of `target` in order and return a
/// copy with each `size_gb` replaced by the realized size. Entries missing
/// a required field are logged and left as they are.
pub fn apply(
    volumes: &dyn LogicalVolumes,
    target: &TargetRaidConfig,
    log: &Logger,
) -> Result<TargetRaidConfig, Error> {
    let mut realized = target.clone();
    for (index, disk) in realized.logical_disks.iter_mut().enumerate() {
        let (level, members, controller) = match disk.require() {
            Ok(fields) => fields,
            Err(missing) => {
                warn!(log, "skipping incomplete logical disk";
                    "index" => index, "missing" => missing);
                continue;
            }
        };
        let size = disk.requested_size();
        info!(log, "creating logical disk";
            "index" => index, "controller" => controller,
            "raid_level" => level, "size_gb" => %size);
        let gb = volumes.create_logical_drive(controller, size, level, members)?;
        disk.size_gb = Some(SizeGb::Gb(gb));
    }
    Ok(realized)
}

/// The layout to build for `node`; a node without one builds nothing.
pub fn target_of(node: &Node, log: &Logger) -> TargetRaidConfig {
    match &node.target_raid_config {
        Some(t) => t.clone(),
        None => {
            info!(log, "node has no target raid config");
            TargetRaidConfig::default()
        }
    }
}

// ── Host facts ───────────────────────────────────────────────────────

/// Inventory that does not come from the RAID controller.
pub struct HostFacts {
    exec:  BoxedExecutor,
    tools: ToolsConfig,
    log:   Logger,
}

impl HostFacts {
    pub fn new(exec: BoxedExecutor, tools: &ToolsConfig, log: &Logger) -> Self {
        Self { exec, tools: tools.clone(), log: log.new(slog::o!("component" => "host")) }
    }

    pub fn system_vendor(&self) -> Result<SystemVendor, Error> {
        host::system_vendor_info(&self.exec, &self.tools.dmidecode)
    }

    pub fn bmc_address(&self) -> Result<String, Error> {
        host::bmc_address(&self.exec, &self.tools.ipmitool)
    }

    /// Combine controller disks with host facts. A host fact that cannot be
    /// read is logged and left empty.
    pub fn inventory(&self, physical_disks: Vec<PhysicalDisk>) -> Inventory {
        let disks = lsblk::run_lsblk(&self.exec, &self.tools.lsblk).unwrap_or_else(|e| {
            warn!(self.log, "block devices unavailable"; "error" => %e);
            Vec::new()
        });
        let bmc_address = self
            .bmc_address()
            .map_err(|e| warn!(self.log, "bmc address unavailable"; "error" => %e))
            .ok();
        let system_vendor = self
            .system_vendor()
            .map_err(|e| warn!(self.log, "system vendor unavailable"; "error" => %e))
            .ok();
        Inventory { disks, physical_disks, bmc_address, system_vendor }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::executor::fake::FakeExecutor;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;

    fn log() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    /// Records each create and reports a fixed realized size.
    struct Recorder {
        created:  RefCell<Vec<(String, SizeGb, String, Vec<String>)>>,
        realized: u64,
    }

    impl LogicalVolumes for Recorder {
        fn create_logical_drive(
            &self,
            controller: &str,
            size: SizeGb,
            raid_level: &str,
            physical_disks: &[String],
        ) -> Result<u64, Error> {
            self.created.borrow_mut().push((
                controller.to_string(),
                size,
                raid_level.to_string(),
                physical_disks.to_vec(),
            ));
            Ok(self.realized)
        }
    }

    struct Fixed(&'static str, HardwareSupport);

    impl HardwareManager for Fixed {
        fn name(&self) -> &'static str { self.0 }
        fn evaluate_hardware_support(&self) -> HardwareSupport { self.1 }
        fn list_physical_devices(&self) -> Result<Vec<PhysicalDisk>, Error> { Ok(Vec::new()) }
        fn list_hardware_info(&self) -> Result<Inventory, Error> {
            Ok(Inventory { disks: Vec::new(), physical_disks: Vec::new(), bmc_address: None, system_vendor: None })
        }
        fn create_configuration(&self, _: &Node, _: &[Value]) -> Result<TargetRaidConfig, Error> {
            Ok(TargetRaidConfig::default())
        }
        fn delete_configuration(&self, _: &Node, _: &[Value]) -> Result<(), Error> { Ok(()) }
    }

    #[test]
    fn test_apply_fills_realized_sizes() {
        let target: TargetRaidConfig = serde_json::from_value(json!({
            "logical_disks": [
                {"size_gb": "MAX", "raid_level": "1", "controller": "1",
                 "physical_disks": ["0 0", "0 1"], "is_root_volume": true},
                {"size_gb": 500, "raid_level": "0", "controller": "1",
                 "physical_disks": ["0 2"]}
            ]
        }))
        .unwrap();
        let recorder = Recorder { created: RefCell::new(Vec::new()), realized: 499 };

        let realized = apply(&recorder, &target, &log()).unwrap();

        assert_eq!(realized.logical_disks[0].size_gb, Some(SizeGb::Gb(499)));
        assert_eq!(realized.logical_disks[1].size_gb, Some(SizeGb::Gb(499)));
        assert_eq!(realized.logical_disks[0].extra["is_root_volume"], json!(true));
        assert_eq!(target.logical_disks[0].size_gb, Some(SizeGb::Max));
        assert_eq!(
            recorder.created.borrow()[1],
            ("1".to_string(), SizeGb::Gb(500), "0".to_string(), vec!["0 2".to_string()])
        );
    }

    #[test]
    fn test_apply_skips_incomplete_entries() {
        let target: TargetRaidConfig = serde_json::from_value(json!({
            "logical_disks": [
                {"size_gb": 100, "raid_level": "1", "controller": "0"},
                {"raid_level": "5", "physical_disks": ["8:0", "8:1", "8:2"]}
            ]
        }))
        .unwrap();
        let recorder = Recorder { created: RefCell::new(Vec::new()), realized: 1 };

        let realized = apply(&recorder, &target, &log()).unwrap();

        assert_eq!(realized, target);
        assert!(recorder.created.borrow().is_empty());
    }

    #[test]
    fn test_clean_steps() {
        let steps = clean_steps();
        let summary: Vec<_> = steps.iter().map(|s| (s.step, s.priority, s.abortable)).collect();
        assert_eq!(
            summary,
            vec![
                ("erase_devices", 0, true),
                ("erase_devices_metadata", 99, true),
                ("delete_configuration", 20, false),
                ("create_configuration", 15, false),
            ]
        );
        assert!(steps.iter().all(|s| s.interface == "deploy" && !s.reboot_requested));
    }

    #[test]
    fn test_dispatch_picks_highest_support() {
        let managers: Vec<Box<dyn HardwareManager>> = vec![
            Box::new(Fixed("none", HardwareSupport::None)),
            Box::new(Fixed("generic", HardwareSupport::Generic)),
            Box::new(Fixed("first", HardwareSupport::Mainline)),
            Box::new(Fixed("second", HardwareSupport::Mainline)),
        ];
        assert_eq!(dispatch(&managers, &log()).map(|m| m.name()), Some("first"));

        let managers: Vec<Box<dyn HardwareManager>> =
            vec![Box::new(Fixed("none", HardwareSupport::None))];
        assert!(dispatch(&managers, &log()).is_none());
    }

    #[test]
    fn test_host_fact_failures_leave_fields_empty() {
        let fake = FakeExecutor::new(log());
        fake.set_handler(Box::new(|cmd| {
            if cmd.starts_with("lsblk") {
                Ok(r#"{"blockdevices":[{"name":"sda","type":"disk","size":1024,"rota":true}]}"#.to_string())
            } else {
                Err("not permitted".to_string())
            }
        }));
        let facts = HostFacts::new(fake.clone().as_executor(), &ToolsConfig::default(), &log());

        let inventory = facts.inventory(Vec::new());

        assert_eq!(inventory.disks.len(), 1);
        assert!(inventory.bmc_address.is_none());
        assert!(inventory.system_vendor.is_none());
        assert_eq!(
            fake.calls(),
            vec![
                "lsblk --json --bytes -o NAME,TYPE,SIZE,MODEL,SERIAL,ROTA,TRAN,VENDOR".to_string(),
                "ipmitool lan print".to_string(),
                "dmidecode --type system".to_string(),
            ]
        );
    }
}
