//! The canonical, encoding-independent form of a changelog record.
//!
//! spec.md §3: "Records are immutable once constructed; freed after the
//! journal write completes." In Rust that constraint is simply ordinary
//! ownership — `ChangeRecord` is built, handed to the journal writer by
//! value, and dropped once written.

use serde::{Deserialize, Serialize};

use crate::fop::FopCode;
use crate::gfid::Gfid;

/// Which on-disk/on-wire form a journal uses. spec.md §6: "`MAJ.MIN = 1.2`,
/// encoding `1 = BINARY`, `2 = ASCII`."
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    Binary,
    Ascii,
}

impl Encoding {
    pub const fn wire_value(self) -> u8 {
        match self {
            Encoding::Binary => 1,
            Encoding::Ascii => 2,
        }
    }

    pub const fn from_wire_value(v: u8) -> Option<Self> {
        match v {
            1 => Some(Encoding::Binary),
            2 => Some(Encoding::Ascii),
            _ => None,
        }
    }
}

/// The three record kinds of spec.md §3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Data,
    Metadata,
    Entry,
}

impl ChangeType {
    /// The single-character type mark of spec.md §6's record grammar.
    pub const fn mark(self) -> char {
        match self {
            ChangeType::Data => 'D',
            ChangeType::Metadata => 'M',
            ChangeType::Entry => 'E',
        }
    }

    pub const fn from_mark(mark: char) -> Option<Self> {
        match mark {
            'D' => Some(ChangeType::Data),
            'M' => Some(ChangeType::Metadata),
            'E' => Some(ChangeType::Entry),
            _ => None,
        }
    }
}

/// One `gfid SP encoded_basename` pair inside an ENTRY record.
/// RENAME carries two (old, then new); every other ENTRY fop carries one.
///
/// `gfid`'s meaning depends on which fop owns this link: for a fop that
/// creates a new name (MKNOD/MKDIR/CREATE/SYMLINK/LINK) it is the *new*
/// inode's own gfid; for RENAME it is that name's parent directory; for
/// UNLINK/RMDIR's single link it is likewise the parent (the removed
/// inode's own gfid is carried separately, see `ChangeRecord::Entry`'s
/// `deleted_gfid`). One field serves all three because the wire grammar
/// does not distinguish them positionally — only the fop code does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLink {
    pub gfid: Gfid,
    pub basename: String,
}

/// The scalar extras MKNOD/MKDIR/CREATE attach ahead of their entry-gfid
/// pair (spec.md §4.7: "1 entry-gfid and 3 extras (mode/uid/gid)").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeOwnership {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

/// One mutating filesystem operation, in canonical (encoding-independent)
/// form. This is what the recorder (C2) builds, the slicer (C3) decides
/// whether to suppress, the journal writer (C4) serializes, and the
/// consumer parser reconstructs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeRecord {
    /// `'D' gfid` — a data-plane write/truncate/etc. on an existing inode.
    Data { gfid: Gfid },
    /// `'M' gfid fop` — a metadata-plane operation (setattr, setxattr, …).
    /// Never carries extras (DESIGN.md, Open Question 1).
    Metadata { gfid: Gfid, fop: FopCode },
    /// `'E' gfid fop (extra)* (pargfid basename)*` — a namespace mutation.
    /// Always emitted, never suppressed by the slicer (spec.md §4.3).
    ///
    /// Field layout is grounded on spec.md §8 scenarios S1/S3/S4, which are
    /// the only byte-literal specification of this wire shape:
    ///
    /// - `parent`: the directory whose entries changed — the gfid shown
    ///   immediately after the `'E'` mark in every worked example (`G0` for
    ///   `mkdir("/d", parent=G0)`, `G1` for `create("/d/f", parent=G1)` and
    ///   for `unlink("/d/f")` whose parent is also `G1`).
    /// - `links[i].gfid`: for a fop that creates a new name (MKNOD, MKDIR,
    ///   CREATE, SYMLINK, LINK), this is the *new* inode's own gfid (`G1`
    ///   in `E G0 MKDIR … G1%2Fd`); for RENAME, each link's gfid is that
    ///   name's parent (S3: `E G1 RENAME G1%2Fa G1%2Fb`).
    /// - `deleted_gfid`: present only for UNLINK/RMDIR, the removed inode's
    ///   own gfid, written as a standalone field *before* the
    ///   parent+basename link because after deletion the link alone can no
    ///   longer be resolved back to it (S4: the standalone `G2` in
    ///   `E G1 UNLINK G2 G1%2Ff`).
    Entry {
        parent: Gfid,
        fop: FopCode,
        ownership: Option<ModeOwnership>,
        deleted_gfid: Option<Gfid>,
        links: Vec<EntryLink>,
        /// Resolved only for UNLINK/RMDIR when `capture_del_path = true`
        /// (spec.md §4, scenario S4). `Some("")` and `None` are distinct:
        /// the original encoder always writes the trailing field for
        /// UNLINK/RMDIR, empty or not, once capture is enabled.
        deleted_path: Option<String>,
    },
}

impl ChangeRecord {
    pub fn change_type(&self) -> ChangeType {
        match self {
            ChangeRecord::Data { .. } => ChangeType::Data,
            ChangeRecord::Metadata { .. } => ChangeType::Metadata,
            ChangeRecord::Entry { .. } => ChangeType::Entry,
        }
    }

    /// The primary gfid of the record: the inode itself for DATA/METADATA,
    /// the parent directory for ENTRY (see the `Entry` variant's doc for
    /// why ENTRY's primary field is the parent, not the mutated name).
    pub fn gfid(&self) -> Gfid {
        match self {
            ChangeRecord::Data { gfid }
            | ChangeRecord::Metadata { gfid, .. } => *gfid,
            ChangeRecord::Entry { parent, .. } => *parent,
        }
    }

    /// The fop code, for record kinds that carry one.
    pub fn fop(&self) -> Option<FopCode> {
        match self {
            ChangeRecord::Data { .. } => None,
            ChangeRecord::Metadata { fop, .. } | ChangeRecord::Entry { fop, .. } => Some(*fop),
        }
    }
}
