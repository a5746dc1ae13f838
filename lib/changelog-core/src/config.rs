//! Recognized configuration options (spec.md §6 table).
//!
//! Grounded on `vector-buffers/src/config.rs`: a plain, `serde`-derived,
//! doc-commented config struct with a hand-written `Default` rather than a
//! builder, matching the scale of this option set.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::record::Encoding;

/// Dispatcher implementation selector (spec.md §6 `op-mode`). `Realtime` is
/// the only variant spec.md names; this is left `#[non_exhaustive]` so a
/// future batch/offline dispatcher can be added without a breaking change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[non_exhaustive]
pub enum OpMode {
    #[default]
    Realtime,
}

/// The options a brick's changelog subsystem recognizes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangelogConfig {
    /// Enable recording. Default: off.
    pub changelog: bool,
    /// Directory journals, HTIME, and CSNAP are written under.
    pub changelog_dir: PathBuf,
    /// Identifies the reverse-RPC socket name (an md5 of the brick path in
    /// the original implementation; this crate accepts any caller-chosen
    /// path, see `changelog-rpc`).
    pub changelog_brick: PathBuf,
    /// Dispatcher implementation. Default: `Realtime`.
    pub op_mode: OpMode,
    /// Record encoder. Default: ASCII.
    pub encoding: Encoding,
    /// Auto-rollover period. Default: 15s.
    #[serde(with = "duration_secs")]
    pub rollover_time: Duration,
    /// fsync period; zero means every append opens/writes with `O_SYNC`
    /// semantics instead of batching. Default: 5s.
    #[serde(with = "duration_secs")]
    pub fsync_interval: Duration,
    /// Barrier watchdog: force OFF if the controller never arrives.
    pub changelog_barrier_timeout: Duration,
    /// Resolve a path for unlink/rmdir deleted-path capture. Default: off.
    pub capture_del_path: bool,
}

/// Product default for the barrier watchdog (spec.md §5: "default is the
/// product constant `BARRIER_TIMEOUT`"). 120s matches GlusterFS's
/// `changelog-barrier.c` default.
pub const BARRIER_TIMEOUT: Duration = Duration::from_secs(120);

impl Default for ChangelogConfig {
    fn default() -> Self {
        ChangelogConfig {
            changelog: false,
            changelog_dir: PathBuf::new(),
            changelog_brick: PathBuf::new(),
            op_mode: OpMode::Realtime,
            encoding: Encoding::Ascii,
            rollover_time: Duration::from_secs(15),
            fsync_interval: Duration::from_secs(5),
            changelog_barrier_timeout: BARRIER_TIMEOUT,
            capture_del_path: false,
        }
    }
}

impl ChangelogConfig {
    /// `fsync_interval == 0` selects `O_SYNC`-equivalent behavior on every
    /// append (spec.md §4.4 "Open").
    pub fn is_sync_on_every_write(&self) -> bool {
        self.fsync_interval.is_zero()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(de)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = ChangelogConfig::default();
        assert!(!cfg.changelog);
        assert_eq!(cfg.encoding, Encoding::Ascii);
        assert_eq!(cfg.rollover_time, Duration::from_secs(15));
        assert_eq!(cfg.fsync_interval, Duration::from_secs(5));
        assert!(!cfg.capture_del_path);
    }

    #[test]
    fn zero_fsync_interval_means_sync_every_write() {
        let mut cfg = ChangelogConfig::default();
        cfg.fsync_interval = Duration::from_secs(0);
        assert!(cfg.is_sync_on_every_write());
    }

    #[test]
    fn json_round_trip() {
        let cfg = ChangelogConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ChangelogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.encoding, cfg.encoding);
    }
}
