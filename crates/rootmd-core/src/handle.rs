//! Folder handles
//!
//! A handle names a folder by its participants. The textual form lists the
//! writers, then optionally `#` and the readers, each comma separated:
//! `alice,bob#carol`. Whether the folder is public is carried alongside.

use crate::{MdOpsError, Result};
use rootmd_mdserver::{BareFolderHandle, UserId};
use std::fmt;

const READER_SEPARATOR: char = '#';
const USER_SEPARATOR: char = ',';

/// The resolved participant sets of a folder
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FolderHandle {
    bare: BareFolderHandle,
}

impl FolderHandle {
    /// Build a handle; there must be at least one writer
    pub fn new(
        writers: impl IntoIterator<Item = UserId>,
        readers: impl IntoIterator<Item = UserId>,
        public: bool,
    ) -> Result<Self> {
        let bare = BareFolderHandle::new(writers, readers, public);
        if bare.writers.is_empty() {
            return Err(MdOpsError::InvalidHandle("a folder needs at least one writer".into()));
        }
        Ok(Self { bare })
    }

    /// Resolve the participants recorded in a wire handle
    pub fn from_bare(bare: &BareFolderHandle) -> Self {
        Self {
            bare: bare.canonicalize(),
        }
    }

    /// Parse the textual form, e.g. `alice,bob#carol`
    pub fn parse(s: &str, public: bool) -> Result<Self> {
        let (writers, readers) = match s.split_once(READER_SEPARATOR) {
            Some((w, r)) => (w, Some(r)),
            None => (s, None),
        };
        let writers = parse_users(writers)?;
        let readers = match readers {
            Some(r) => parse_users(r)?,
            None => Vec::new(),
        };
        Self::new(writers, readers, public)
    }

    /// Wire form of this handle
    pub fn bare(&self) -> &BareFolderHandle {
        &self.bare
    }

    /// Folder writers, sorted
    pub fn writers(&self) -> &[UserId] {
        &self.bare.writers
    }

    /// Read-only members, sorted
    pub fn readers(&self) -> &[UserId] {
        &self.bare.readers
    }

    /// Readable by everyone
    pub fn is_public(&self) -> bool {
        self.bare.public
    }

    /// True if `user` may write the folder
    pub fn is_writer(&self, user: &UserId) -> bool {
        self.bare.writers.binary_search(user).is_ok()
    }

    /// True if `user` may read the folder. Writers can always read.
    pub fn is_reader(&self, user: &UserId) -> bool {
        self.bare.public || self.is_writer(user) || self.bare.readers.binary_search(user).is_ok()
    }
}

fn parse_users(list: &str) -> Result<Vec<UserId>> {
    list.split(USER_SEPARATOR)
        .map(str::trim)
        .map(|name| {
            if name.is_empty() {
                Err(MdOpsError::InvalidHandle(format!("empty user name in {list:?}")))
            } else if name.contains(READER_SEPARATOR) {
                Err(MdOpsError::InvalidHandle(format!("stray {READER_SEPARATOR:?} in {list:?}")))
            } else {
                Ok(UserId::new(name))
            }
        })
        .collect()
}

fn join(users: &[UserId]) -> String {
    users
        .iter()
        .map(UserId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for FolderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.bare.writers))?;
        if !self.bare.readers.is_empty() {
            write!(f, "{READER_SEPARATOR}{}", join(&self.bare.readers))?;
        }
        Ok(())
    }
}
