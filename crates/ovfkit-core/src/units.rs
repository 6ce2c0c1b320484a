//! Capacity unit conversion.
//!
//! OVF disks declare `ovf:capacity` together with an optional
//! `ovf:capacityAllocationUnits` string such as `byte * 2^20` or `MegaBytes`.

use std::path::Path;

use crate::error::{Error, Result};

/// Bytes in one KiB.
pub const BYTES_PER_KIB: u64 = 1024;
/// Bytes in one MiB.
pub const BYTES_PER_MIB: u64 = BYTES_PER_KIB * 1024;
/// Bytes in one GiB.
pub const BYTES_PER_GIB: u64 = BYTES_PER_MIB * 1024;

const KIB_TOKENS: [&str; 3] = ["KB", "KiloBytes", "byte * 2^10"];
const MIB_TOKENS: [&str; 3] = ["MB", "MegaBytes", "byte * 2^20"];
const GIB_TOKENS: [&str; 3] = ["GB", "GigaBytes", "byte * 2^30"];

/// Byte multiplier for an allocation unit string. Unknown units count as bytes.
pub fn unit_multiplier(unit: &str) -> u64 {
    let matches = |tokens: &[&str]| tokens.iter().any(|t| t.eq_ignore_ascii_case(unit));

    if matches(&KIB_TOKENS) {
        BYTES_PER_KIB
    } else if matches(&MIB_TOKENS) {
        BYTES_PER_MIB
    } else if matches(&GIB_TOKENS) {
        BYTES_PER_GIB
    } else {
        1
    }
}

/// Convert a capacity to bytes, keeping the raw value when there is nothing to convert.
///
/// This is the lenient form used while scanning every `Disk` element: a zero
/// capacity or an absent unit is returned unchanged instead of failing.
pub fn capacity_to_bytes(capacity: u64, unit: Option<&str>) -> u64 {
    match unit {
        Some(unit) if capacity != 0 => capacity.saturating_mul(unit_multiplier(unit)),
        _ => capacity,
    }
}

/// Convert a disk capacity to bytes, failing on a zero capacity or missing unit.
///
/// `ovf_path` only serves as context in the error message.
///
/// # Errors
///
/// Returns [`Error::Ovf`] when `capacity` is zero or `unit` is `None`.
pub fn disk_capacity_bytes(capacity: u64, unit: Option<&str>, ovf_path: &Path) -> Result<u64> {
    match unit {
        Some(unit) if capacity != 0 => Ok(capacity.saturating_mul(unit_multiplier(unit))),
        _ => Err(Error::ovf(format!(
            "failed to read capacity and capacityAllocationUnits from the OVF file: {}",
            ovf_path.display()
        ))),
    }
}
