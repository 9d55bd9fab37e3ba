use crate::models::disk::PhysicalDisk;
use crate::models::inventory::Inventory;
use crate::util::units::fmt_bytes;

/// Render an inventory as a plain-text report.
pub fn generate(manager: &str, inventory: &Inventory) -> String {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut out = String::new();

    out.push_str("═══════════════════════════════════════════════\n");
    out.push_str(&format!("  raidmgr inventory ({}) {}\n", manager, now));
    out.push_str("═══════════════════════════════════════════════\n\n");

    // ── System ─────────────────────────────────────────────────────────
    out.push_str("── System ─────────────────────────────────────\n");
    match &inventory.system_vendor {
        Some(v) => out.push_str(&format!(
            "  {} {}  Serial: {}\n",
            v.manufacturer, v.product_name, v.serial_number
        )),
        None => out.push_str("  (system vendor unavailable)\n"),
    }
    out.push_str(&format!(
        "  BMC: {}\n\n",
        inventory.bmc_address.as_deref().unwrap_or("—")
    ));

    // ── Physical disks ─────────────────────────────────────────────────
    out.push_str(&format!(
        "── Physical Disks ({}) ─────────────────────────\n",
        inventory.physical_disks.len()
    ));
    out.push_str(&format!(
        "  {:<10} {:<6} {:<6} {:>12}  {}\n",
        "ID", "Ctl", "Type", "Size", "Serial"
    ));
    out.push_str(&format!("  {}\n", "─".repeat(60)));
    for disk in &inventory.physical_disks {
        let serial = match disk {
            PhysicalDisk::Verbose(d) => d.serial_number.as_str(),
            PhysicalDisk::Compact(_) => "—",
        };
        match disk.summary() {
            Ok(s) => out.push_str(&format!(
                "  {:<10} {:<6} {:<6} {:>12}  {}\n",
                s.id, s.controller_id, s.disk_type, s.size, serial
            )),
            Err(e) => out.push_str(&format!("  (unreadable record: {})\n", e)),
        }
    }
    out.push('\n');

    // ── Block devices ──────────────────────────────────────────────────
    out.push_str(&format!(
        "── Block Devices ({}) ─────────────────────────\n",
        inventory.disks.len()
    ));
    for dev in &inventory.disks {
        let model = dev.model.as_deref().unwrap_or("Unknown");
        let tran  = dev.transport.as_deref().unwrap_or("—");
        let kind  = if dev.rotational { "HDD" } else { "SSD" };
        out.push_str(&format!(
            "  {:8}  {:4}  {:5}  Cap:{:10}  {}\n",
            dev.name, kind, tran, fmt_bytes(dev.size), model
        ));
    }
    out
}
