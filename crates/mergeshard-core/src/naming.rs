//! Canonical table names for a dataset.
//!
//! Pure string computation; the only precondition (a non-empty base) is
//! enforced when the [`BaseName`] is constructed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use mergeshard_types::{BaseName, PartitionKey};

/// Separator between the base name and a partition key.
pub const MASK_SEPARATOR: char = '_';

/// Suffix appended to the mask to name the template table.
pub const TEMPLATE_SUFFIX: &str = "model";

/// Marker that keeps rebuild scratch names outside the partition mask.
const SCRATCH_MARKER: char = '~';

static TEMP_UNION_SEQ: AtomicU64 = AtomicU64::new(0);

/// `base_`: prefix shared by every partition of `base`.
#[must_use]
pub fn mask(base: &BaseName) -> String {
    format!("{base}{MASK_SEPARATOR}")
}

/// `base_model`.
#[must_use]
pub fn template_name(base: &BaseName) -> String {
    format!("{}{TEMPLATE_SUFFIX}", mask(base))
}

/// `base_<key>`.
#[must_use]
pub fn partition_name(base: &BaseName, key: &PartitionKey) -> String {
    format!("{}{key}", mask(base))
}

/// Whether `name` is a partition table of `base`: it carries the mask and is
/// neither the aggregate nor the template.
#[must_use]
pub fn is_partition_table(base: &BaseName, name: &str) -> bool {
    name.starts_with(&mask(base)) && name != base.as_str() && name != template_name(base)
}

/// Name for a temporary union: base + process id + millisecond timestamp +
/// a process-wide sequence number.
///
/// The sequence number makes names unique within a process even when several
/// unions are built in the same millisecond. The pid and timestamp are there
/// for operators reading the backend's process list. Isolation between
/// sessions still comes from the backend's temporary-table semantics.
#[must_use]
pub fn temp_union_name(base: &BaseName) -> String {
    let seq = TEMP_UNION_SEQ.fetch_add(1, Ordering::Relaxed);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    format!("{base}{}t{millis}n{seq}", std::process::id())
}

/// Scratch name the next aggregate is built under before being swapped in.
#[must_use]
pub fn staging_name(base: &BaseName) -> String {
    format!("{base}{SCRATCH_MARKER}next")
}

/// Name the previous aggregate is parked under during a swap.
#[must_use]
pub fn retired_name(base: &BaseName) -> String {
    format!("{base}{SCRATCH_MARKER}prev")
}
