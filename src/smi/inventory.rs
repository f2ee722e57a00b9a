//! Inventory listing parser
//!
//! Parses `nvidia-smi --query-gpu=index,name,uuid --format=csv,noheader`.

use crate::domain::{GpuInventory, GpuRecord};

use once_cell::sync::Lazy;
use regex::Regex;

static INVENTORY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+),\s*(.+?),\s*(GPU-[a-z0-9-]+)").expect("inventory pattern is valid")
});

/// Parse the inventory listing into an index-keyed map
///
/// Lines that do not look like `index, name, GPU-uuid` are skipped. An
/// empty result is returned as-is; deciding that it is fatal is up to
/// the caller.
pub fn parse_inventory(listing: &str) -> GpuInventory {
    listing
        .lines()
        .filter_map(|line| {
            let caps = INVENTORY_LINE.captures(line);
            if caps.is_none() && !line.trim().is_empty() {
                log::debug!("Skipping inventory line: {:?}", line);
            }
            caps
        })
        .map(|caps| GpuRecord::new(&caps[1], &caps[2], &caps[3]))
        .collect()
}
