use super::{apply, target_of, HardwareManager, HostFacts, LogicalVolumes};
use crate::collectors::megacli::MegaCli;
use crate::collectors::Error;
use crate::config::ToolsConfig;
use crate::executor::BoxedExecutor;
use crate::models::disk::PhysicalDisk;
use crate::models::inventory::{HardwareSupport, Inventory};
use crate::models::raid::{Node, SizeGb, TargetRaidConfig};
use serde_json::Value;
use slog::{info, Logger};

impl LogicalVolumes for MegaCli {
    fn create_logical_drive(
        &self,
        controller: &str,
        size: SizeGb,
        raid_level: &str,
        physical_disks: &[String],
    ) -> Result<u64, Error> {
        MegaCli::create_logical_drive(self, controller, size, raid_level, physical_disks)
    }
}

pub struct MegaHardwareManager {
    megacli: MegaCli,
    host:    HostFacts,
    log:     Logger,
}

impl MegaHardwareManager {
    pub const NAME: &'static str = "MegaHardwareManager";

    pub fn new(exec: BoxedExecutor, tools: &ToolsConfig, log: &Logger) -> Self {
        let log = log.new(slog::o!("component" => Self::NAME));
        Self {
            megacli: MegaCli::new(&tools.megacli, exec.clone(), &log),
            host:    HostFacts::new(exec, tools, &log),
            log,
        }
    }

    /// Toggle JBOD passthrough on adapter 0.
    pub fn set_jbod_mode(&self, enabled: bool) -> Result<(), Error> {
        self.megacli.set_jbod_mode(enabled)
    }
}

impl HardwareManager for MegaHardwareManager {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate_hardware_support(&self) -> HardwareSupport {
        if self.megacli.detect_controller_present() {
            HardwareSupport::Mainline
        } else {
            HardwareSupport::None
        }
    }

    fn list_physical_devices(&self) -> Result<Vec<PhysicalDisk>, Error> {
        Ok(self
            .megacli
            .list_physical_disks()?
            .into_iter()
            .map(PhysicalDisk::Compact)
            .collect())
    }

    fn list_hardware_info(&self) -> Result<Inventory, Error> {
        let physical = self.list_physical_devices()?;
        Ok(self.host.inventory(physical))
    }

    fn create_configuration(&self, node: &Node, _ports: &[Value]) -> Result<TargetRaidConfig, Error> {
        let target = target_of(node, &self.log);
        let realized = apply(&self.megacli, &target, &self.log)?;
        info!(self.log, "raid configuration created";
            "logical_disks" => realized.logical_disks.len());
        Ok(realized)
    }

    fn delete_configuration(&self, _node: &Node, _ports: &[Value]) -> Result<(), Error> {
        let controllers = self.megacli.list_controller_ids()?;
        let wiped = self.megacli.destroy_all(&controllers)?;
        info!(self.log, "raid configuration deleted"; "controllers" => wiped);
        Ok(())
    }
}
