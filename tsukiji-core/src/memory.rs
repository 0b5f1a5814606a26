//! Memory accounting for the graph and its hold lists.

use std::fmt;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Aggregate memory snapshot of an index.
///
/// `allocated_bytes` covers everything the graph currently owns, including
/// fragments parked on hold lists. `dead_bytes` counts empty node-table
/// slots and `used_bytes` is everything else. `on_hold_bytes` covers the
/// superseded fragments awaiting reclamation.
///
/// # Examples
/// ```
/// use tsukiji_core::MemoryUsage;
///
/// let mut total = MemoryUsage::new(1_024, 512, 0, 128);
/// total.merge(MemoryUsage::new(1_024, 1_024, 64, 0));
/// assert_eq!(total.allocated_bytes(), 2_048);
/// assert_eq!(total.used_bytes(), 1_536);
/// assert_eq!(total.to_string(), "allocated 2.0 KiB, used 1.5 KiB, dead 64 B, on hold 128 B");
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MemoryUsage {
    allocated_bytes: usize,
    used_bytes: usize,
    dead_bytes: usize,
    on_hold_bytes: usize,
}

impl MemoryUsage {
    /// Builds a snapshot from its components.
    #[must_use]
    pub const fn new(
        allocated_bytes: usize,
        used_bytes: usize,
        dead_bytes: usize,
        on_hold_bytes: usize,
    ) -> Self {
        Self {
            allocated_bytes,
            used_bytes,
            dead_bytes,
            on_hold_bytes,
        }
    }

    /// Bytes owned by the graph, including on-hold fragments.
    #[must_use]
    pub const fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    /// Bytes in use by live graph state and on-hold fragments.
    #[must_use]
    pub const fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Bytes occupied by empty node-table slots.
    #[must_use]
    pub const fn dead_bytes(&self) -> usize {
        self.dead_bytes
    }

    /// Bytes parked on hold lists awaiting reclamation.
    #[must_use]
    pub const fn on_hold_bytes(&self) -> usize {
        self.on_hold_bytes
    }

    /// Adds `other` into `self`.
    pub const fn merge(&mut self, other: Self) {
        self.allocated_bytes = self.allocated_bytes.saturating_add(other.allocated_bytes);
        self.used_bytes = self.used_bytes.saturating_add(other.used_bytes);
        self.dead_bytes = self.dead_bytes.saturating_add(other.dead_bytes);
        self.on_hold_bytes = self.on_hold_bytes.saturating_add(other.on_hold_bytes);
    }
}

impl fmt::Display for MemoryUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocated {}, used {}, dead {}, on hold {}",
            format_bytes(self.allocated_bytes as u64),
            format_bytes(self.used_bytes as u64),
            format_bytes(self.dead_bytes as u64),
            format_bytes(self.on_hold_bytes as u64),
        )
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Formats a byte count as a human-readable string using binary units.
///
/// Returns values like `"0 B"`, `"1.0 KiB"`, `"2.4 GiB"`, with one decimal
/// place from 1 KiB upwards.
///
/// # Examples
///
/// ```
/// use tsukiji_core::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1_073_741_824), "1.0 GiB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [(&str, u64); 4] = [
        ("TiB", 1 << 40),
        ("GiB", 1 << 30),
        ("MiB", 1 << 20),
        ("KiB", 1 << 10),
    ];

    UNITS
        .iter()
        .find(|(_, scale)| bytes >= *scale)
        .map_or_else(
            || format!("{bytes} B"),
            |(unit, scale)| format!("{:.1} {unit}", bytes as f64 / *scale as f64),
        )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::zero(0, "0 B")]
    #[case::small(512, "512 B")]
    #[case::just_below_kib(1023, "1023 B")]
    #[case::one_kib(1024, "1.0 KiB")]
    #[case::one_and_half_kib(1536, "1.5 KiB")]
    #[case::one_mib(1_048_576, "1.0 MiB")]
    #[case::one_gib(1_073_741_824, "1.0 GiB")]
    #[case::one_tib(1_099_511_627_776, "1.0 TiB")]
    fn format_bytes_picks_the_largest_unit(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_bytes(bytes), expected);
    }

    #[test]
    fn merge_saturates_instead_of_overflowing() {
        let mut usage = MemoryUsage::new(usize::MAX, 1, 2, 3);
        usage.merge(MemoryUsage::new(1, 1, 1, 1));
        assert_eq!(usage.allocated_bytes(), usize::MAX);
        assert_eq!(usage.used_bytes(), 2);
        assert_eq!(usage.dead_bytes(), 3);
        assert_eq!(usage.on_hold_bytes(), 4);
    }
}
