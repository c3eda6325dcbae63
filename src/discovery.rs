//! Server discovery over slot-file names
//!
//! Multi-server slot files are named `ipc_server_<N>.bin`, with the instance
//! number N growing monotonically across server starts. Discovery lists the
//! matching names newest-first, probes each by reading its record, and
//! auto-connects to the newest one that is FREE or READY. A PENDING slot is
//! excluded because another exchange is mid-flight and says nothing about
//! liveness.

use crate::error::Result;
use crate::slot::{SlotFile, Status};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Prefix shared by every multi-server slot file
pub const SLOT_FILE_PREFIX: &str = "ipc_server_";

/// Extension used to filter candidates during discovery
pub const SLOT_FILE_EXT: &str = ".bin";

/// Slot file used by the single-server (router) variant
pub const SINGLE_SLOT_FILE: &str = "ipc_slot.bin";

/// One discovered slot file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCandidate {
    pub file_name: String,
    /// Parsed instance number; `None` when the embedded text is non-numeric
    pub instance: Option<u32>,
}

/// Extract the instance number embedded in a slot file name.
pub fn parse_instance(file_name: &str) -> Option<u32> {
    let rest = file_name.strip_prefix(SLOT_FILE_PREFIX)?;
    let digits = rest.split('.').next()?;
    digits.parse().ok()
}

/// List candidate slot files in `dir`, newest first.
///
/// Names whose instance number fails to parse sort after the numeric ones,
/// ordered lexically; they stay in the listing rather than being silently
/// dropped.
pub fn find_candidate_servers(dir: &Path) -> Result<Vec<SlotCandidate>> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with(SLOT_FILE_PREFIX) && file_name.ends_with(SLOT_FILE_EXT) {
            let instance = parse_instance(&file_name);
            candidates.push(SlotCandidate {
                file_name,
                instance,
            });
        }
    }
    candidates.sort_by(|a, b| match (a.instance, b.instance) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.file_name.cmp(&b.file_name),
    });
    Ok(candidates)
}

/// Highest instance number currently present in `dir` (0 when none).
///
/// A starting server claims `highest_instance(dir) + 1`.
pub fn highest_instance(dir: &Path) -> Result<u32> {
    Ok(find_candidate_servers(dir)?
        .iter()
        .filter_map(|c| c.instance)
        .max()
        .unwrap_or(0))
}

/// Probe one slot file: available iff its record reads as FREE or READY.
pub fn probe(path: &Path) -> bool {
    let mut slot = match SlotFile::open(path) {
        Ok(slot) => slot,
        Err(_) => return false,
    };
    match slot.read() {
        Ok(msg) => matches!(msg.status, Status::Free | Status::Ready),
        Err(_) => false,
    }
}

/// Probe all candidates and pick the newest available one.
///
/// Returns `None` when no server is available; an unavailable server is
/// never used as a fallback.
pub fn auto_connect(dir: &Path) -> Result<Option<PathBuf>> {
    for candidate in find_candidate_servers(dir)? {
        let path = dir.join(&candidate.file_name);
        if probe(&path) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
