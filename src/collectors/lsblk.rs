use super::{Error, ParseError};
use crate::executor::{stdout_string, BoxedExecutor};
use crate::models::inventory::BlockDevice;
use serde_json::Value;
use std::process::Command;

const COLUMNS: &str = "NAME,TYPE,SIZE,MODEL,SERIAL,ROTA,TRAN,VENDOR";

/// Run `lsblk --json --bytes` and return the top-level disk devices.
pub fn run_lsblk(exec: &BoxedExecutor, lsblk: &str) -> Result<Vec<BlockDevice>, Error> {
    let mut cmd = Command::new(lsblk);
    cmd.args(["--json", "--bytes", "-o", COLUMNS]);
    let out = exec.execute(&mut cmd)?;
    Ok(parse_lsblk(&stdout_string(&out))?)
}

pub fn parse_lsblk(json: &str) -> Result<Vec<BlockDevice>, ParseError> {
    let v: Value = serde_json::from_str(json)
        .map_err(|e| ParseError(format!("lsblk output is not JSON: {}", e)))?;
    let devices = v["blockdevices"]
        .as_array()
        .ok_or_else(|| ParseError("lsblk output has no 'blockdevices'".to_string()))?;

    let mut disks = Vec::new();
    for dev in devices {
        let name     = dev["name"].as_str().unwrap_or("").to_string();
        let dev_type = dev["type"].as_str().unwrap_or("");
        if name.is_empty() { continue; }
        if dev_type != "disk" { continue; }

        disks.push(BlockDevice {
            name,
            size:       num(&dev["size"]),
            model:      str_opt(&dev["model"]),
            serial:     str_opt(&dev["serial"]),
            vendor:     str_opt(&dev["vendor"]),
            rotational: flag(&dev["rota"]),
            transport:  str_opt(&dev["tran"]),
        });
    }
    Ok(disks)
}

fn str_opt(v: &Value) -> Option<String> {
    v.as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// Older util-linux prints numbers and booleans as strings.
fn num(v: &Value) -> u64 {
    v.as_u64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .unwrap_or(0)
}

fn flag(v: &Value) -> bool {
    v.as_bool()
        .or_else(|| v.as_str().map(|s| s.trim() == "1"))
        .unwrap_or(false)
}
