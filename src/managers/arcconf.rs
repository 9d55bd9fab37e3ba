use super::{apply, target_of, HardwareManager, HostFacts, LogicalVolumes};
use crate::collectors::arcconf::Arcconf;
use crate::collectors::Error;
use crate::config::ToolsConfig;
use crate::executor::BoxedExecutor;
use crate::models::disk::PhysicalDisk;
use crate::models::inventory::{HardwareSupport, Inventory};
use crate::models::raid::{Node, SizeGb, TargetRaidConfig};
use serde_json::Value;
use slog::{info, Logger};

impl LogicalVolumes for Arcconf {
    fn create_logical_drive(
        &self,
        controller: &str,
        size: SizeGb,
        raid_level: &str,
        physical_disks: &[String],
    ) -> Result<u64, Error> {
        Arcconf::create_logical_drive(self, controller, size, raid_level, physical_disks)
    }
}

pub struct ArcconfHardwareManager {
    arcconf: Arcconf,
    host:    HostFacts,
    log:     Logger,
}

impl ArcconfHardwareManager {
    pub const NAME: &'static str = "ArcconfHardwareManager";

    pub fn new(exec: BoxedExecutor, tools: &ToolsConfig, log: &Logger) -> Self {
        let log = log.new(slog::o!("component" => Self::NAME));
        Self {
            arcconf: Arcconf::new(&tools.arcconf, exec.clone(), &log),
            host:    HostFacts::new(exec, tools, &log),
            log,
        }
    }
}

impl HardwareManager for ArcconfHardwareManager {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate_hardware_support(&self) -> HardwareSupport {
        if self.arcconf.detect_controller_present() {
            HardwareSupport::Mainline
        } else {
            HardwareSupport::None
        }
    }

    fn list_physical_devices(&self) -> Result<Vec<PhysicalDisk>, Error> {
        Ok(self
            .arcconf
            .list_physical_disks()?
            .into_iter()
            .map(PhysicalDisk::Verbose)
            .collect())
    }

    fn list_hardware_info(&self) -> Result<Inventory, Error> {
        let physical = self.list_physical_devices()?;
        Ok(self.host.inventory(physical))
    }

    fn create_configuration(&self, node: &Node, _ports: &[Value]) -> Result<TargetRaidConfig, Error> {
        let target = target_of(node, &self.log);
        let realized = apply(&self.arcconf, &target, &self.log)?;
        info!(self.log, "raid configuration created";
            "logical_disks" => realized.logical_disks.len());
        Ok(realized)
    }

    fn delete_configuration(&self, _node: &Node, _ports: &[Value]) -> Result<(), Error> {
        let controllers = self.arcconf.list_controller_ids()?;
        let wiped = self.arcconf.destroy_all(&controllers)?;
        info!(self.log, "raid configuration deleted"; "controllers" => wiped);
        Ok(())
    }
}
