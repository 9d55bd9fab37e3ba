//! LSI/Broadcom MegaRAID controllers driven through `MegaCli64`.

use super::text::{self, PositionalRecord};
use super::{Error, ParseError};
use crate::executor::{shell, stdout_string, BoxedExecutor};
use crate::models::disk::DiskSummary;
use crate::models::raid::SizeGb;
use crate::util::units::{self, Size};
use regex::Regex;
use slog::{debug, info, Logger};
use std::sync::OnceLock;

/// Lines kept from `-PDList` and the order they appear in for each drive.
const PD_LABELS: &[&str] = &[
    "Enclosure Device ID",
    "Slot Number",
    "PD Type",
    "Raw Size",
    "Inquiry Data",
];
const PD_FILTER: &str = "adapter|Enclosure Device ID|slot number|Raw size|PD Type|Inquiry Data";
const NO_VIRTUAL_DRIVES: &str = "No Virtual Drive Configured";

/// Model strings of drives that are flash even when PD Type only names the
/// bus.
fn ssd_model() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"SSD|Micron_5200").unwrap())
}

pub struct MegaCli {
    path: String,
    exec: BoxedExecutor,
    log:  Logger,
}

impl MegaCli {
    pub fn new(path: &str, exec: BoxedExecutor, log: &Logger) -> Self {
        Self {
            path: path.to_string(),
            exec,
            log: log.new(slog::o!("tool" => "megacli")),
        }
    }

    fn run(&self, args: &str) -> Result<String, Error> {
        let line = format!("{} {}", self.path, args);
        let output = self.exec.execute(&mut shell(&line))?;
        Ok(stdout_string(&output))
    }

    fn controller_count(&self) -> Result<u32, Error> {
        let report = self.run("-adpCount | grep Controller")?;
        Ok(parse_controller_count(&report)?)
    }

    /// True when at least one adapter is present. Any failure to run or
    /// read the tool counts as "no controller".
    pub fn detect_controller_present(&self) -> bool {
        match self.controller_count() {
            Ok(n) => {
                debug!(self.log, "adapter count"; "count" => n);
                n != 0
            }
            Err(e) => {
                debug!(self.log, "megacli detection failed"; "error" => %e);
                false
            }
        }
    }

    /// Adapters are numbered from 0.
    pub fn list_controller_ids(&self) -> Result<Vec<String>, Error> {
        let ids: Vec<String> = (0..self.controller_count()?).map(|n| n.to_string()).collect();
        info!(self.log, "controllers found"; "ids" => ?ids);
        Ok(ids)
    }

    pub fn list_physical_disks(&self) -> Result<Vec<DiskSummary>, Error> {
        let report = self.run(&format!("-PDList -aALL | grep -iE \"{}\"", PD_FILTER))?;
        let disks = parse_physical_disks(&report)?;
        debug!(self.log, "physical disks parsed"; "count" => disks.len());
        Ok(disks)
    }

    /// Create one virtual drive and return its realized size in whole GB.
    pub fn create_logical_drive(
        &self,
        controller: &str,
        size: SizeGb,
        raid_level: &str,
        physical_disks: &[String],
    ) -> Result<u64, Error> {
        info!(self.log, "raid disk list"; "disks" => physical_disks.join(","));
        if let SizeGb::Gb(gb) = size {
            // -CfgLdAdd always takes the whole span of the member disks.
            info!(self.log, "requested size not passed to megacli"; "size_gb" => gb);
        }
        let args = create_args(controller, raid_level, physical_disks);
        info!(self.log, "raid configuration command"; "args" => &args);
        let report = self.run(&args)?;

        let drive = parse_created_drive(&report)?;
        let sizes = self.run(&format!("-LDInfo -L{} -aAll | grep -i size", drive))?;
        let realized = parse_drive_size(&sizes)?;
        Ok(units::whole_gb(realized))
    }

    /// On each adapter that reports virtual drives, delete them all. Then
    /// clear foreign configuration once for every adapter. Returns the
    /// number of adapters a delete was issued on.
    pub fn destroy_all(&self, controllers: &[String]) -> Result<usize, Error> {
        let mut deleted = 0;
        for controller in controllers {
            let report = self.run(&format!("-LDInfo -LAll -a{}", controller))?;
            if report.contains(NO_VIRTUAL_DRIVES) {
                debug!(self.log, "no virtual drives to delete"; "controller" => controller);
                continue;
            }
            info!(self.log, "deleting all virtual drives"; "controller" => controller);
            self.run(&format!("-CfgLdDel -LAll -a{}", controller))?;
            deleted += 1;
        }
        self.run("-CfgForeign -Clear -aAll")?;
        Ok(deleted)
    }

    pub fn set_jbod_mode(&self, enabled: bool) -> Result<(), Error> {
        let mode = if enabled { "1" } else { "0" };
        info!(self.log, "setting JBOD mode"; "enabled" => enabled);
        self.run(&format!("-AdpSetProp EnableJBOD {} -a0", mode))?;
        Ok(())
    }
}

/// `-CfgLdAdd -r<level>[<e:s>,<e:s>] -a<ctl>`
pub fn create_args(controller: &str, raid_level: &str, disks: &[String]) -> String {
    format!("-CfgLdAdd -r{}[{}] -a{}", raid_level, disks.join(","), controller)
}

/// "Controller Count: 1." → 1
pub fn parse_controller_count(report: &str) -> Result<u32, ParseError> {
    let value = text::value_after_colon(report)?;
    let count = value.split('.').next().unwrap_or_default().trim();
    count
        .parse()
        .map_err(|e| ParseError(format!("bad adapter count '{}': {}", count, e)))
}

/// Read the filtered `-PDList` report: an `Adapter #N` banner, then five
/// labelled lines per drive.
pub fn parse_physical_disks(report: &str) -> Result<Vec<DiskSummary>, ParseError> {
    let mut disks = Vec::new();
    let mut adapter: Option<String> = None;
    let mut record = PositionalRecord::new(PD_LABELS);

    for line in report.lines() {
        if line.trim().is_empty() { continue; }

        if line.contains("Adapter") {
            if !record.is_empty() {
                return Err(ParseError(format!("drive record cut short by '{}'", line.trim())));
            }
            let (_, id) = line.split_once('#').ok_or_else(|| {
                ParseError(format!("adapter line without a number: '{}'", line.trim()))
            })?;
            adapter = Some(id.trim().trim_end_matches(':').to_string());
            continue;
        }

        record.push(line)?;
        if record.is_complete() {
            let controller = adapter
                .as_deref()
                .ok_or_else(|| ParseError("drive listed before any adapter".to_string()))?;
            disks.push(disk_from_record(controller, &record)?);
            record = PositionalRecord::new(PD_LABELS);
        }
    }

    if !record.is_empty() {
        return Err(ParseError("report ended inside a drive record".to_string()));
    }
    Ok(disks)
}

fn disk_from_record(controller: &str, record: &PositionalRecord) -> Result<DiskSummary, ParseError> {
    let enclosure = record.get("Enclosure Device ID")?;
    let slot      = record.get("Slot Number")?;
    let model     = record.get("Inquiry Data")?;
    // "894.252 GB [0x6fc81ab0 Sectors]"
    let raw_size  = record.get("Raw Size")?.split('[').next().unwrap_or_default().trim();

    let disk_type = if ssd_model().is_match(model) {
        "SSD".to_string()
    } else {
        record.get("PD Type")?.to_string()
    };

    Ok(DiskSummary {
        id:            format!("{}:{}", enclosure, slot),
        controller_id: controller.to_string(),
        disk_type,
        size:          units::normalize_str(raw_size)?.to_string(),
    })
}

/// "Adapter 0: Created VD 1" on line 1 → "1"
pub fn parse_created_drive(report: &str) -> Result<String, ParseError> {
    let line = text::line_at(report, 1, "created virtual drive")?;
    let id = text::last_token(line, "virtual drive number")?;
    id.parse::<u32>()
        .map_err(|_| ParseError(format!("no virtual drive number in '{}'", line.trim())))?;
    Ok(id.to_string())
}

/// "Size                : 557.861 GB" on line 0 of the filtered `-LDInfo`.
pub fn parse_drive_size(report: &str) -> Result<Size, ParseError> {
    let line = text::line_at(report, 0, "virtual drive size")?;
    text::value_after_colon(line)?.parse()
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::executor::fake::FakeExecutor;
    use pretty_assertions::assert_eq;

    pub const PD_OUTPUT: &str = "Adapter #0\n\
        Enclosure Device ID: 8\n\
        Slot Number: 0\n\
        PD Type: SATA\n\
        Raw Size: 894.252 GB [0x6fc81ab0 Sectors]\n\
        Inquiry Data: BTYF84730BXY960CGN  INTEL SSDSC2KB960G8                     XCV10100\n\
        Enclosure Device ID: 8\n\
        Slot Number: 1\n\
        PD Type: SATA\n\
        Raw Size: 894.252 GB [0x6fc81ab0 Sectors]\n\
        Inquiry Data: BTYF84820BNW960CGN  INTEL SSDSC2KB960G8                     XCV10100\n\
        Enclosure Device ID: 8\n\
        Slot Number: 2\n\
        PD Type: SATA\n\
        Raw Size: 894.252 GB [0x6fc81ab0 Sectors]\n\
        Inquiry Data: BTYF84820BT4960CGN  INTEL SSDSC2KB960G8                     XCV10100\n";

    pub const CREATE_OUTPUT: &str = "\n\
        Adapter 0: Created VD 1\n\
        \n\
        Adapter 0: Configured the Adapter!!\n\
        \n\
        Exit Code: 0x00\n";

    pub const DRIVE_SIZE_OUTPUT: &str = "Size                : 557.861 GB\n\
        Sector Size         : 512\n\
        Strip Size          : 256 KB\n";

    fn log() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn megacli(fake: &std::sync::Arc<FakeExecutor>) -> MegaCli {
        MegaCli::new("/opt/MegaRAID/MegaCli/MegaCli64", fake.clone().as_executor(), &log())
    }

    #[test]
    fn test_detect_controller() {
        let fake = FakeExecutor::with_outputs(log(), &["Controller Count: 1.\n"]);
        assert!(megacli(&fake).detect_controller_present());
        assert_eq!(
            fake.calls(),
            vec!["/opt/MegaRAID/MegaCli/MegaCli64 -adpCount | grep Controller".to_string()]
        );
    }

    #[test]
    fn test_detect_no_controller() {
        let fake = FakeExecutor::with_outputs(log(), &["Controller Count: 0.\n"]);
        assert!(!megacli(&fake).detect_controller_present());

        let fake = FakeExecutor::with_outputs(log(), &[""]);
        assert!(!megacli(&fake).detect_controller_present());
    }

    #[test]
    fn test_list_controller_ids() {
        let fake = FakeExecutor::with_outputs(log(), &["Controller Count: 2.\n"]);
        assert_eq!(
            megacli(&fake).list_controller_ids().unwrap(),
            vec!["0".to_string(), "1".to_string()]
        );
    }

    #[test]
    fn test_list_physical_disks() {
        let fake = FakeExecutor::with_outputs(log(), &[PD_OUTPUT]);
        let disks = megacli(&fake).list_physical_disks().unwrap();
        assert_eq!(
            fake.calls(),
            vec![
                "/opt/MegaRAID/MegaCli/MegaCli64 -PDList -aALL | grep -iE \
                 \"adapter|Enclosure Device ID|slot number|Raw size|PD Type|Inquiry Data\""
                    .to_string()
            ]
        );
        assert_eq!(
            disks,
            vec![
                DiskSummary {
                    id: "8:0".into(), controller_id: "0".into(),
                    disk_type: "SSD".into(), size: "894.25 GB".into(),
                },
                DiskSummary {
                    id: "8:1".into(), controller_id: "0".into(),
                    disk_type: "SSD".into(), size: "894.25 GB".into(),
                },
                DiskSummary {
                    id: "8:2".into(), controller_id: "0".into(),
                    disk_type: "SSD".into(), size: "894.25 GB".into(),
                },
            ]
        );
    }

    #[test]
    fn test_type_falls_back_to_pd_type() {
        let report = "Adapter #1\n\n\
            Enclosure Device ID: 32\n\
            Slot Number: 4\n\
            PD Type: SAS\n\
            Raw Size: 1.090 TB [0x8bba0cb0 Sectors]\n\
            Inquiry Data: SEAGATE ST1200MM0088     N004W420BW9B\n\n";
        let disks = parse_physical_disks(report).unwrap();
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0].id, "32:4");
        assert_eq!(disks[0].controller_id, "1");
        assert_eq!(disks[0].disk_type, "SAS");
        assert_eq!(disks[0].size, "1116.16 GB");
    }

    #[test]
    fn test_micron_model_is_ssd() {
        let report = "Adapter #0\n\
            Enclosure Device ID: 252\n\
            Slot Number: 0\n\
            PD Type: SATA\n\
            Raw Size: 447.130 GB [0x37e436b0 Sectors]\n\
            Inquiry Data: 18211C8D1A2B    Micron_5200_MTFDDAK480TDN  D1MU020\n";
        assert_eq!(parse_physical_disks(report).unwrap()[0].disk_type, "SSD");
    }

    #[test]
    fn test_drifted_report_fails() {
        // Slot Number dropped from the second drive.
        let report = "Adapter #0\n\
            Enclosure Device ID: 8\n\
            Slot Number: 0\n\
            PD Type: SATA\n\
            Raw Size: 894.252 GB [0x6fc81ab0 Sectors]\n\
            Inquiry Data: INTEL SSDSC2KB960G8\n\
            Enclosure Device ID: 8\n\
            PD Type: SATA\n";
        assert!(parse_physical_disks(report).is_err());

        let truncated = "Adapter #0\nEnclosure Device ID: 8\nSlot Number: 0\n";
        assert_eq!(
            parse_physical_disks(truncated).unwrap_err(),
            ParseError("report ended inside a drive record".to_string())
        );
    }

    #[test]
    fn test_create_logical_drive_max() {
        let fake = FakeExecutor::with_outputs(log(), &[CREATE_OUTPUT, DRIVE_SIZE_OUTPUT]);
        let disks = vec!["8:0".to_string(), "8:1".to_string()];
        let gb = megacli(&fake)
            .create_logical_drive("0", SizeGb::Max, "1", &disks)
            .unwrap();
        assert_eq!(gb, 557);
        assert_eq!(
            fake.calls(),
            vec![
                "/opt/MegaRAID/MegaCli/MegaCli64 -CfgLdAdd -r1[8:0,8:1] -a0".to_string(),
                "/opt/MegaRAID/MegaCli/MegaCli64 -LDInfo -L1 -aAll | grep -i size".to_string(),
            ]
        );
    }

    #[test]
    fn test_numeric_size_keeps_command_shape() {
        let disks = vec!["8:0".to_string(), "8:1".to_string(), "8:2".to_string()];
        assert_eq!(create_args("0", "5", &disks), "-CfgLdAdd -r5[8:0,8:1,8:2] -a0");

        let fake = FakeExecutor::with_outputs(log(), &[CREATE_OUTPUT, DRIVE_SIZE_OUTPUT]);
        let gb = megacli(&fake)
            .create_logical_drive("0", SizeGb::Gb(100), "5", &disks)
            .unwrap();
        assert_eq!(gb, 557);
        assert_eq!(
            fake.calls()[0],
            "/opt/MegaRAID/MegaCli/MegaCli64 -CfgLdAdd -r5[8:0,8:1,8:2] -a0"
        );
    }

    #[test]
    fn test_drive_size_in_tb() {
        let size = parse_drive_size("Size                : 1.089 TB\n").unwrap();
        assert_eq!(units::whole_gb(size), 1115);
    }

    #[test]
    fn test_destroy_with_virtual_drives() {
        let fake = FakeExecutor::with_outputs(
            log(),
            &["Adapter 0 -- Virtual Drive Information:\nVirtual Drive: 0 (Target Id: 0)\n"],
        );
        assert_eq!(megacli(&fake).destroy_all(&["0".to_string()]).unwrap(), 1);
        assert_eq!(
            fake.calls(),
            vec![
                "/opt/MegaRAID/MegaCli/MegaCli64 -LDInfo -LAll -a0".to_string(),
                "/opt/MegaRAID/MegaCli/MegaCli64 -CfgLdDel -LAll -a0".to_string(),
                "/opt/MegaRAID/MegaCli/MegaCli64 -CfgForeign -Clear -aAll".to_string(),
            ]
        );
    }

    #[test]
    fn test_destroy_without_virtual_drives() {
        let fake = FakeExecutor::with_outputs(
            log(),
            &["Adapter 0 -- Virtual Drive Information:\nAdapter 0: No Virtual Drive Configured.\n"],
        );
        assert_eq!(megacli(&fake).destroy_all(&["0".to_string()]).unwrap(), 0);
        assert_eq!(fake.calls().len(), 2);
        assert!(fake.calls().iter().all(|c| !c.contains("-CfgLdDel")));
    }

    #[test]
    fn test_destroy_skips_only_empty_adapters() {
        // Adapter 0 is empty, adapter 1 still holds a volume.
        let fake = FakeExecutor::with_outputs(
            log(),
            &[
                "Adapter 0: No Virtual Drive Configured.\n",
                "Adapter 1 -- Virtual Drive Information:\nVirtual Drive: 0 (Target Id: 0)\n",
            ],
        );
        let ids = vec!["0".to_string(), "1".to_string()];
        assert_eq!(megacli(&fake).destroy_all(&ids).unwrap(), 1);
        assert_eq!(
            fake.calls(),
            vec![
                "/opt/MegaRAID/MegaCli/MegaCli64 -LDInfo -LAll -a0".to_string(),
                "/opt/MegaRAID/MegaCli/MegaCli64 -LDInfo -LAll -a1".to_string(),
                "/opt/MegaRAID/MegaCli/MegaCli64 -CfgLdDel -LAll -a1".to_string(),
                "/opt/MegaRAID/MegaCli/MegaCli64 -CfgForeign -Clear -aAll".to_string(),
            ]
        );
    }

    #[test]
    fn test_set_jbod_mode() {
        let fake = FakeExecutor::new(log());
        megacli(&fake).set_jbod_mode(true).unwrap();
        assert_eq!(
            fake.calls(),
            vec!["/opt/MegaRAID/MegaCli/MegaCli64 -AdpSetProp EnableJBOD 1 -a0".to_string()]
        );
    }
}
