//! Choosing how many lanes go into one dispatch
//!
//! Batch sizes are powers of ten. The automatic choice estimates device
//! capacity from compute units and group size, bounded by memory; explicit
//! and automatic sizes are then clamped to what the device and the result
//! buffer can take.

use tracing::debug;

use crate::algorithm::{pow10, LANE_RECORD_SIZE, MAX_MESSAGE_LEN};
use crate::backend::{Capabilities, DeviceClass};
use crate::config::BatchSizeSpec;

/// Hard ceiling on the per-dispatch result buffer
pub const OUTPUT_CEILING_BYTES: usize = 100 * 1024 * 1024;

/// Largest dispatch relative to the reported group size
pub const GROUP_SIZE_MULTIPLIER: usize = 100;

/// Fraction of device memory (as a divisor) the lanes may use
const MEMORY_FRACTION: u64 = 100;

/// Largest power of ten not above `n` (`n` must be at least 1).
fn floor_pow10(n: usize) -> usize {
    let mut p = 1usize;
    while p <= n / 10 {
        p *= 10;
    }
    p
}

/// Power of ten picked from device capabilities.
pub fn auto_power(caps: &Capabilities) -> u32 {
    let group = caps.group_size.unwrap_or(1) as u64;
    let mut capacity = caps.compute_units as u64 * group / 10;

    if let Some(mem) = caps.global_mem {
        let memory_limit = mem / (MAX_MESSAGE_LEN + LANE_RECORD_SIZE) as u64 / MEMORY_FRACTION;
        capacity = capacity.min(memory_limit);
    }

    let power = match caps.class {
        DeviceClass::Gpu => match capacity {
            1_000_000.. => 6,
            100_000.. => 5,
            _ => 4,
        },
        DeviceClass::Cpu | DeviceClass::Other => match capacity {
            100_000.. => 5,
            10_000.. => 4,
            1_000.. => 3,
            _ => 4,
        },
    };

    debug!(
        class = %caps.class,
        compute_units = caps.compute_units,
        group_size = ?caps.group_size,
        capacity,
        power,
        "auto-detected batch size"
    );
    power
}

/// Clamp a batch size to device and output-buffer limits.
pub fn clamp(batch_size: usize, caps: &Capabilities) -> usize {
    let mut size = batch_size.max(1);

    if let Some(group) = caps.group_size.filter(|&g| g > 0) {
        let limit = group.saturating_mul(GROUP_SIZE_MULTIPLIER);
        if size > limit {
            let adjusted = floor_pow10(limit);
            debug!(
                "Adjusted batch size from {} to {} based on work group size limit",
                size, adjusted
            );
            size = adjusted;
        }
    }

    let max_lanes = OUTPUT_CEILING_BYTES / LANE_RECORD_SIZE;
    if size > max_lanes {
        debug!(
            "Batch size {} would need a {} MB result buffer, limiting to {}",
            size,
            size * LANE_RECORD_SIZE / (1024 * 1024),
            max_lanes
        );
        size = max_lanes;
    }

    size
}

/// Resolve a batch size spec into a lane count for a device.
pub fn resolve(spec: BatchSizeSpec, caps: &Capabilities) -> usize {
    let power = match spec {
        BatchSizeSpec::Auto => auto_power(caps),
        BatchSizeSpec::Power(p) => p,
    };
    let requested = pow10(power).unwrap_or(u64::MAX).min(usize::MAX as u64) as usize;
    clamp(requested, caps)
}
