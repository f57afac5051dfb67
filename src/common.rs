// src/common.rs
//
// common imports, type aliases, and other globals (avoids circular imports)

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// file-handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// TODO: use `std::path::Path` for `FPath`
/// `F`ake `Path` or `F`ile `Path`
pub type FPath = String;
pub type FPaths = Vec<FPath>;
pub type FileMetadata = std::fs::Metadata;

/// Offset into a file in bytes
pub type FileOffset = u64;

/// File size in bytes
pub type FileSz = u64;

/// General purpose counting type
pub type Count = u64;

/// Sequence of Bytes
pub type Bytes = Vec<u8>;

/// Inode number as persisted in a status file.
///
/// Signed so the legacy "unknown inode" value `-1` round-trips.
pub type Inode = i64;

/// Inode value meaning "unknown".
pub const INODE_UNKNOWN: Inode = -1;

/// Filesystem identity of a file, `(device, inode)`.
pub type FileId = (u64, u64);

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        /// Return the [`FileId`] of the file described by `metadata`.
        pub fn metadata_to_fileid(metadata: &FileMetadata) -> FileId {
            use std::os::unix::fs::MetadataExt;

            (metadata.dev(), metadata.ino())
        }

        /// Return the [`Inode`] of the file described by `metadata`.
        pub fn metadata_to_inode(metadata: &FileMetadata) -> Inode {
            use std::os::unix::fs::MetadataExt;

            metadata.ino() as Inode
        }
    } else {
        /// Return the [`FileId`] of the file described by `metadata`.
        ///
        /// Platforms without inodes have no stable identity available from
        /// `std`, so files are told apart by size and modification time.
        pub fn metadata_to_fileid(metadata: &FileMetadata) -> FileId {
            let mtime: u64 = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);

            (metadata.len(), mtime)
        }

        /// Return the [`Inode`] of the file described by `metadata`.
        pub fn metadata_to_inode(_metadata: &FileMetadata) -> Inode {
            1
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// custom Results enums for various *Reader functions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `Result` Extended
/// for line reading functions
#[derive(Debug, PartialEq)]
pub enum ResultS3<T, E> {
    /// Contains the success data
    Found(T),
    /// End of the data, nothing to return, but no bad errors happened
    Done,
    /// Contains the error value, something bad happened
    Err(E),
}

impl<T, E> std::fmt::Display for ResultS3<T, E>
where
    E: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultS3::Found(_) => { write!(f, "ResultS3::Found") },
            ResultS3::Done => { write!(f, "ResultS3::Done") },
            ResultS3::Err(err) => { write!(f, "ResultS3::Err({})", err) },
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lines
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// NewLine as char
#[allow(non_upper_case_globals)]
pub const NLc: char = '\n';
/// Single-byte newLine char as u8
#[allow(non_upper_case_globals)]
pub const NLu8: u8 = 10;

/// Separator joining a matched line with its continuation lines.
/// The receiving check splits on this.
pub const CONTINUATION_SEP: char = '\x01';
