//! Diff records and the terminated change set that carries them.

use std::fmt;

use serde::{Deserialize, Serialize};
use yangtree_types::Value;

/// Classification of one changed leaf position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ChangeKind {
    /// Present in B only.
    Created = 1,
    /// Present in both with different values.
    Modified = 2,
    /// Present in A only.
    Removed = 3,
}

impl ChangeKind {
    /// Numeric code of the change kind.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Created => f.write_str("created"),
            ChangeKind::Modified => f.write_str("modified"),
            ChangeKind::Removed => f.write_str("removed"),
        }
    }
}

/// One changed leaf or leaf-list member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    /// Resolved path; `[.='v']` addresses leaf-list members.
    pub path: String,
    /// Value in tree A, `None` when created.
    pub old: Option<Value>,
    /// Value in tree B, `None` when removed.
    pub new: Option<Value>,
    pub kind: ChangeKind,
}

impl DiffRecord {
    pub fn created(path: String, new: Value) -> Self {
        Self {
            path,
            old: None,
            new: Some(new),
            kind: ChangeKind::Created,
        }
    }

    pub fn removed(path: String, old: Value) -> Self {
        Self {
            path,
            old: Some(old),
            new: None,
            kind: ChangeKind::Removed,
        }
    }

    pub fn modified(path: String, old: Value, new: Value) -> Self {
        Self {
            path,
            old: Some(old),
            new: Some(new),
            kind: ChangeKind::Modified,
        }
    }
}

impl fmt::Display for DiffRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.old, &self.new) {
            (Some(old), Some(new)) => write!(f, "~ {} {old:?} -> {new:?}", self.path),
            (None, Some(new)) => write!(f, "+ {} {new:?}", self.path),
            (Some(old), None) => write!(f, "- {} {old:?}", self.path),
            (None, None) => write!(f, "? {}", self.path),
        }
    }
}

// ---------------------------------------------------------------
// Change set
// ---------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Change {
    Record(DiffRecord),
    End,
}

/// The outcome of [`Differ::diff`](crate::Differ::diff).
///
/// Changes are stored as a sequence closed by a terminator entry; iteration
/// stops at the first terminator. Records come in three groups (modified,
/// removed, created), each in document order.
#[derive(Clone, Debug, PartialEq)]
pub struct DataDiff {
    changes: Vec<Change>,
}

impl Default for DataDiff {
    fn default() -> Self {
        Self {
            changes: vec![Change::End],
        }
    }
}

impl DataDiff {
    pub(crate) fn from_records(records: impl IntoIterator<Item = DiffRecord>) -> Self {
        let mut changes: Vec<Change> = records.into_iter().map(Change::Record).collect();
        changes.push(Change::End);
        Self { changes }
    }

    #[cfg(test)]
    pub(crate) fn from_changes(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    pub fn iter(&self) -> Records<'_> {
        Records {
            inner: self.changes.iter(),
        }
    }

    /// Returns `true` if the trees are equivalent.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Number of created positions.
    pub fn additions(&self) -> usize {
        self.count(ChangeKind::Created)
    }

    /// Number of removed positions.
    pub fn removals(&self) -> usize {
        self.count(ChangeKind::Removed)
    }

    /// Number of modified positions.
    pub fn modifications(&self) -> usize {
        self.count(ChangeKind::Modified)
    }

    fn count(&self, kind: ChangeKind) -> usize {
        self.iter().filter(|r| r.kind == kind).count()
    }
}

/// Borrowing iterator over the records of a [`DataDiff`].
pub struct Records<'a> {
    inner: std::slice::Iter<'a, Change>,
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a DiffRecord;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next()? {
            Change::Record(record) => Some(record),
            Change::End => None,
        }
    }
}

/// Owning iterator over the records of a [`DataDiff`].
pub struct IntoRecords {
    inner: std::vec::IntoIter<Change>,
}

impl Iterator for IntoRecords {
    type Item = DiffRecord;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next()? {
            Change::Record(record) => Some(record),
            Change::End => {
                self.inner = Vec::new().into_iter();
                None
            }
        }
    }
}

impl IntoIterator for DataDiff {
    type Item = DiffRecord;
    type IntoIter = IntoRecords;

    fn into_iter(self) -> IntoRecords {
        IntoRecords {
            inner: self.changes.into_iter(),
        }
    }
}

impl<'a> IntoIterator for &'a DataDiff {
    type Item = &'a DiffRecord;
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Records<'a> {
        self.iter()
    }
}
