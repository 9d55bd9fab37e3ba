//! Facts about the machine itself: vendor identity and the BMC address.

use super::text::{self, FieldMap};
use super::{Error, ParseError};
use crate::executor::{stdout_string, BoxedExecutor};
use crate::models::inventory::SystemVendor;
use std::process::Command;

pub fn system_vendor_info(exec: &BoxedExecutor, dmidecode: &str) -> Result<SystemVendor, Error> {
    let mut cmd = Command::new(dmidecode);
    cmd.args(["--type", "system"]);
    let out = exec.execute(&mut cmd)?;
    Ok(parse_system_vendor(&stdout_string(&out))?)
}

pub fn bmc_address(exec: &BoxedExecutor, ipmitool: &str) -> Result<String, Error> {
    let mut cmd = Command::new(ipmitool);
    cmd.args(["lan", "print"]);
    let out = exec.execute(&mut cmd)?;
    Ok(parse_bmc_address(&stdout_string(&out))?)
}

/// Pick Product Name, Serial Number and Manufacturer out of the
/// `System Information` block.
pub fn parse_system_vendor(report: &str) -> Result<SystemVendor, ParseError> {
    let mut fields = FieldMap::default();
    for line in report.lines() {
        if let Some((key, value)) = text::split_key_value(line, ":") {
            // First handle wins when dmidecode prints several.
            if fields.get(key).is_err() {
                fields.insert(key, value);
            }
        }
    }
    Ok(SystemVendor {
        product_name:  fields.get("Product Name")?.to_string(),
        serial_number: fields.get("Serial Number")?.to_string(),
        manufacturer:  fields.get("Manufacturer")?.to_string(),
    })
}

/// The `IP Address` line of `ipmitool lan print`. `IP Address Source` is a
/// different field.
pub fn parse_bmc_address(report: &str) -> Result<String, ParseError> {
    report
        .lines()
        .filter_map(|l| text::split_key_value(l, ":"))
        .find(|(key, _)| *key == "IP Address")
        .map(|(_, value)| value.to_string())
        .ok_or_else(|| ParseError("no 'IP Address' in lan print".to_string()))
}
