//! The fixed fop tables that drive ENTRY-record shape.
//!
//! spec.md §4.7: "`nr_gfids` and `nr_extra_recs` are fixed tables keyed by
//! fop code: MKNOD/MKDIR/CREATE have 1 entry-gfid and 3 extras
//! (mode/uid/gid); UNLINK/RMDIR/SYMLINK/LINK have 1 entry-gfid and 0
//! extras; RENAME has 2 entry-gfids and 0 extras." METADATA fops (SETATTR,
//! SETXATTR, REMOVEXATTR, ...) never carry extras in the ASCII grammar
//! (§6's `M-payload := gfid SP fop`) — see DESIGN.md, Open Question 1.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A filesystem operation, as recorded in a changelog. This is the closed
/// set the changelog encoders/decoders need to agree on; it is not the
/// translator stack's full fop table (that is out of scope, spec.md §1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum FopCode {
    Mknod,
    Mkdir,
    Create,
    Unlink,
    Rmdir,
    Symlink,
    Link,
    Rename,
    Setattr,
    Setxattr,
    Removexattr,
    Fsync,
}

impl FopCode {
    /// Numeric code used by the BINARY encoding (`fop_fn` in
    /// `changelog-encoders.c` writes this as a raw integer). Stable across
    /// versions because it is persisted to disk.
    pub const fn code(self) -> u32 {
        match self {
            FopCode::Mknod => 1,
            FopCode::Mkdir => 2,
            FopCode::Create => 3,
            FopCode::Unlink => 4,
            FopCode::Rmdir => 5,
            FopCode::Symlink => 6,
            FopCode::Link => 7,
            FopCode::Rename => 8,
            FopCode::Setattr => 9,
            FopCode::Setxattr => 10,
            FopCode::Removexattr => 11,
            FopCode::Fsync => 12,
        }
    }

    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => FopCode::Mknod,
            2 => FopCode::Mkdir,
            3 => FopCode::Create,
            4 => FopCode::Unlink,
            5 => FopCode::Rmdir,
            6 => FopCode::Symlink,
            7 => FopCode::Link,
            8 => FopCode::Rename,
            9 => FopCode::Setattr,
            10 => FopCode::Setxattr,
            11 => FopCode::Removexattr,
            12 => FopCode::Fsync,
            _ => return None,
        })
    }

    /// Symbolic name used by the ASCII encoder (§4.2: "converts fop numbers
    /// to symbolic names").
    pub const fn name(self) -> &'static str {
        match self {
            FopCode::Mknod => "MKNOD",
            FopCode::Mkdir => "MKDIR",
            FopCode::Create => "CREATE",
            FopCode::Unlink => "UNLINK",
            FopCode::Rmdir => "RMDIR",
            FopCode::Symlink => "SYMLINK",
            FopCode::Link => "LINK",
            FopCode::Rename => "RENAME",
            FopCode::Setattr => "SETATTR",
            FopCode::Setxattr => "SETXATTR",
            FopCode::Removexattr => "REMOVEXATTR",
            FopCode::Fsync => "FSYNC",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "MKNOD" => FopCode::Mknod,
            "MKDIR" => FopCode::Mkdir,
            "CREATE" => FopCode::Create,
            "UNLINK" => FopCode::Unlink,
            "RMDIR" => FopCode::Rmdir,
            "SYMLINK" => FopCode::Symlink,
            "LINK" => FopCode::Link,
            "RENAME" => FopCode::Rename,
            "SETATTR" => FopCode::Setattr,
            "SETXATTR" => FopCode::Setxattr,
            "REMOVEXATTR" => FopCode::Removexattr,
            "FSYNC" => FopCode::Fsync,
            _ => return None,
        })
    }

    /// Is this fop an ENTRY-type fop (always emitted, never suppressed by
    /// the slicer; spec.md §3 ChangeType coding, §4.3 step 1)?
    pub const fn is_entry(self) -> bool {
        matches!(
            self,
            FopCode::Mknod
                | FopCode::Mkdir
                | FopCode::Create
                | FopCode::Unlink
                | FopCode::Rmdir
                | FopCode::Symlink
                | FopCode::Link
                | FopCode::Rename
        )
    }

    /// Number of entry-gfids (pargfid + basename pairs) carried by this
    /// fop's ENTRY record. Zero for non-ENTRY fops.
    pub const fn nr_gfids(self) -> usize {
        match self {
            FopCode::Rename => 2,
            _ if self.is_entry() => 1,
            _ => 0,
        }
    }

    /// Number of scalar extras (mode/uid/gid) carried by this fop's ENTRY
    /// record. Zero for non-ENTRY fops and for METADATA fops — see
    /// DESIGN.md Open Question 1.
    pub const fn nr_extra_recs(self) -> usize {
        match self {
            FopCode::Mknod | FopCode::Mkdir | FopCode::Create => 3,
            _ => 0,
        }
    }
}

impl fmt::Display for FopCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trip_for_every_fop() {
        for code in 1..=12u32 {
            let fop = FopCode::from_code(code).unwrap();
            assert_eq!(FopCode::from_name(fop.name()), Some(fop));
            assert_eq!(fop.code(), code);
        }
    }

    #[test]
    fn entry_fop_tables_match_spec() {
        assert_eq!(FopCode::Mknod.nr_gfids(), 1);
        assert_eq!(FopCode::Mknod.nr_extra_recs(), 3);
        assert_eq!(FopCode::Mkdir.nr_extra_recs(), 3);
        assert_eq!(FopCode::Create.nr_extra_recs(), 3);

        for fop in [
            FopCode::Unlink,
            FopCode::Rmdir,
            FopCode::Symlink,
            FopCode::Link,
        ] {
            assert_eq!(fop.nr_gfids(), 1);
            assert_eq!(fop.nr_extra_recs(), 0);
        }

        assert_eq!(FopCode::Rename.nr_gfids(), 2);
        assert_eq!(FopCode::Rename.nr_extra_recs(), 0);
    }

    #[test]
    fn metadata_fops_never_carry_extras() {
        for fop in [FopCode::Setattr, FopCode::Setxattr, FopCode::Removexattr] {
            assert!(!fop.is_entry());
            assert_eq!(fop.nr_extra_recs(), 0);
            assert_eq!(fop.nr_gfids(), 0);
        }
    }
}
