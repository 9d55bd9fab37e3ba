//! Adaptec/Microsemi controllers driven through `arcconf`.

use super::text::{self, FieldMap};
use super::{Error, ParseError};
use crate::executor::{shell, stdout_string, BoxedExecutor};
use crate::models::disk::ArcconfDisk;
use crate::models::raid::SizeGb;
use crate::util::units::{self, Size};
use slog::{debug, info, Logger};

/// Sentinel line that opens one physical device block in `getconfig pd`.
const DEVICE_SENTINEL: &str = "Hard drive";
const NO_LOGICAL_DEVICES: &str = "No logical devices configured";
/// Banner lines ahead of the per-controller lines in `list | grep Controller`.
const LIST_BANNER_LINES: usize = 3;

pub struct Arcconf {
    path: String,
    exec: BoxedExecutor,
    log:  Logger,
}

impl Arcconf {
    pub fn new(path: &str, exec: BoxedExecutor, log: &Logger) -> Self {
        Self {
            path: path.to_string(),
            exec,
            log: log.new(slog::o!("tool" => "arcconf")),
        }
    }

    fn run(&self, args: &str) -> Result<String, Error> {
        let line = format!("{} {}", self.path, args);
        let output = self.exec.execute(&mut shell(&line))?;
        Ok(stdout_string(&output))
    }

    fn list_report(&self) -> Result<String, Error> {
        self.run("list | grep Controller")
    }

    /// True when at least one controller is present. Any failure to run or
    /// read the tool counts as "no controller".
    pub fn detect_controller_present(&self) -> bool {
        let count = self
            .list_report()
            .and_then(|report| Ok(parse_controller_count(&report)?));
        match count {
            Ok(n) => {
                debug!(self.log, "controller count"; "count" => n);
                n != 0
            }
            Err(e) => {
                debug!(self.log, "arcconf detection failed"; "error" => %e);
                false
            }
        }
    }

    pub fn list_controller_ids(&self) -> Result<Vec<String>, Error> {
        let report = self.list_report()?;
        let ids = parse_controller_ids(&report)?;
        info!(self.log, "controllers found"; "ids" => ?ids);
        Ok(ids)
    }

    pub fn list_physical_disks(&self) -> Result<Vec<ArcconfDisk>, Error> {
        let mut disks = Vec::new();
        for controller in self.list_controller_ids()? {
            let report = self.run(&format!("getconfig {} pd", controller))?;
            let found = parse_physical_disks(&report, &controller)?;
            debug!(self.log, "physical disks parsed";
                "controller" => &controller, "count" => found.len());
            disks.extend(found);
        }
        Ok(disks)
    }

    /// Create one logical drive and return its realized size in whole GB.
    pub fn create_logical_drive(
        &self,
        controller: &str,
        size: SizeGb,
        raid_level: &str,
        physical_disks: &[String],
    ) -> Result<u64, Error> {
        let args = create_args(controller, size, raid_level, physical_disks)?;
        info!(self.log, "raid configuration command"; "args" => &args);
        let report = self.run(&args)?;
        info!(self.log, "system reaction"; "output" => report.trim());

        let drive = parse_created_drive(&report)?;
        let sizes = self.run(&format!("getconfig {} ld {}|grep -i size", controller, drive))?;
        let realized = parse_drive_size(&sizes)?;
        Ok(units::whole_gb(realized))
    }

    /// Delete every logical drive on each controller that has any. Returns
    /// the number of controllers wiped.
    pub fn destroy_all(&self, controllers: &[String]) -> Result<usize, Error> {
        let mut wiped = 0;
        for controller in controllers {
            let report = self.run(&format!("getconfig {} ld", controller))?;
            if report.contains(NO_LOGICAL_DEVICES) {
                debug!(self.log, "no logical drives to delete"; "controller" => controller);
                continue;
            }
            info!(self.log, "deleting all logical drives"; "controller" => controller);
            self.run(&format!("delete {} LOGICALDRIVE ALL noprompt", controller))?;
            wiped += 1;
        }
        Ok(wiped)
    }
}

/// `create <ctl> LOGICALDRIVE <MAX|MB> <level> <disk> <disk> ... noprompt`
pub fn create_args(
    controller: &str,
    size: SizeGb,
    raid_level: &str,
    disks: &[String],
) -> Result<String, ParseError> {
    Ok(format!(
        "create {} LOGICALDRIVE {} {} {} noprompt",
        controller,
        size.to_megabytes_arg()?,
        raid_level,
        disks.join(" ")
    ))
}

/// "Controllers found: 1" → 1
pub fn parse_controller_count(report: &str) -> Result<u32, ParseError> {
    let after = report
        .split(':')
        .nth(1)
        .ok_or_else(|| ParseError("no controller count in arcconf list output".to_string()))?;
    let token = after
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError("empty controller count".to_string()))?;
    token
        .parse()
        .map_err(|e| ParseError(format!("bad controller count '{}': {}", token, e)))
}

/// IDs from the `Controller <id>:` lines that follow the banner.
pub fn parse_controller_ids(report: &str) -> Result<Vec<String>, ParseError> {
    report
        .split('\n')
        .skip(LIST_BANNER_LINES)
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some("Controller"), Some(id)) if id.ends_with(':') => {
                    Ok(id.trim_end_matches(':').to_string())
                }
                _ => Err(ParseError(format!("unexpected controller line '{}'", line.trim()))),
            }
        })
        .collect()
}

/// Split a `getconfig <ctl> pd` report into per-drive records.
pub fn parse_physical_disks(report: &str, controller: &str) -> Result<Vec<ArcconfDisk>, ParseError> {
    let mut disks = Vec::new();
    let mut lines = report.lines().peekable();

    while let Some(line) = lines.next() {
        if !line.contains(DEVICE_SENTINEL) { continue; }

        let mut fields = FieldMap::default();
        while let Some((key, value)) = lines.peek().and_then(|l| text::split_key_value(*l, " : ")) {
            fields.insert(key, value);
            lines.next();
        }
        disks.push(disk_from_fields(controller, &fields)?);
    }
    Ok(disks)
}

fn disk_from_fields(controller: &str, f: &FieldMap) -> Result<ArcconfDisk, ParseError> {
    Ok(ArcconfDisk {
        controller_id:               controller.to_string(),
        state:                       f.get("State")?.to_string(),
        block_size:                  f.get("Block Size")?.to_string(),
        supported:                   f.get("Supported")?.to_string(),
        programmed_max_speed:        f.get("Programmed Max Speed")?.to_string(),
        transfer_speed:              f.get("Transfer Speed")?.to_string(),
        reported_channel_and_device: f.get("Reported Channel,Device(T:L)")?.to_string(),
        reported_location:           f.get("Reported Location")?.to_string(),
        reported_esd:                f.get("Reported ESD(T:L)")?.to_string(),
        vendor:                      f.get("Vendor")?.to_string(),
        model:                       f.get("Model")?.to_string(),
        firmware:                    f.get("Firmware")?.to_string(),
        serial_number:               f.get("Serial number")?.to_string(),
        world_wide_name:             f.get("World-wide name")?.to_string(),
        reserved_size:               f.get("Reserved Size")?.to_string(),
        used_size:                   f.get("Used Size")?.to_string(),
        unused_size:                 f.get("Unused Size")?.to_string(),
        total_size:                  f.get("Total Size")?.to_string(),
        write_cache:                 f.get("Write Cache")?.to_string(),
        fru:                         f.get("FRU")?.to_string(),
        s_m_a_r_t:                   f.get("S.M.A.R.T.")?.to_string(),
        s_m_a_r_t_warnings:          f.get("S.M.A.R.T. warnings")?.to_string(),
        power_state:                 f.get("Power State")?.to_string(),
        supported_power_states:      f.get("Supported Power States")?.to_string(),
        ssd:                         f.get("SSD")?.to_string(),
        temperature:                 f.get("Temperature")?.to_string(),
    })
}

/// "Creating logical device: LogicalDrv 0" on line 2 → "0"
pub fn parse_created_drive(report: &str) -> Result<String, ParseError> {
    let line = text::line_at(report, 2, "created logical drive")?;
    let id = text::last_token(line, "logical drive number")?;
    id.parse::<u32>()
        .map_err(|_| ParseError(format!("no logical drive number in '{}'", line.trim())))?;
    Ok(id.to_string())
}

/// "Size : 511990 MB" on line 1 of the filtered `getconfig ld` report.
pub fn parse_drive_size(report: &str) -> Result<Size, ParseError> {
    let line = text::line_at(report, 1, "logical drive size")?;
    text::value_after_colon(line)?.parse()
}
