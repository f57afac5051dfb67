// src/debug/helpers.rs

//! Miscellaneous helper functions for testing; temporary files and
//! directories.

use crate::common::FPath;

use crate::readers::helpers::path_to_fpath;

use std::fs::{create_dir_all, File};
use std::io::Write; // for `NamedTempFile.write_all`
use std::path::{Path, PathBuf};

use ::lazy_static::lazy_static;
#[allow(unused_imports)]
use ::si_trace_print::{defo, defñ};

#[doc(hidden)]
pub use ::tempfile::tempdir;
#[doc(hidden)]
pub use ::tempfile::NamedTempFile;
#[doc(hidden)]
pub use ::tempfile::TempDir;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// temporary file helper functions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// NamedTempFile instances default to this file name prefix.
pub const STR_TEMPFILE_PREFIX: &str = "tmp-mklw-test-";

lazy_static! {
    pub static ref STRING_TEMPFILE_PREFIX: String = String::from(STR_TEMPFILE_PREFIX);
}

/// Small helper function for copying `NamedTempFile` path to a `FPath`.
pub fn ntf_fpath(ntf: &NamedTempFile) -> FPath {
    path_to_fpath(ntf.path())
}

/// Testing helper function to write a `[u8]` to a temporary file.
pub fn create_temp_file_bytes(data: &[u8]) -> NamedTempFile {
    let mut ntf = match tempfile::Builder::new()
        // use known prefix for easier cleanup
        .prefix::<str>(&STRING_TEMPFILE_PREFIX)
        .tempfile()
    {
        Ok(val) => val,
        Err(err) => {
            panic!("NamedTempFile::new() return Err {}", err);
        }
    };
    match ntf.write_all(data) {
        Ok(_) => {}
        Err(err) => {
            panic!("NamedTempFile::write_all() return Err {}", err);
        }
    }

    ntf
}

/// Testing helper function to write a `str` to a temporary file.
pub fn create_temp_file(data: &str) -> NamedTempFile {
    create_temp_file_bytes(data.as_bytes())
}

/// Create a temporary directory
pub fn create_temp_dir() -> TempDir {
    defñ!();
    match tempfile::Builder::new()
        .prefix::<str>(&STRING_TEMPFILE_PREFIX)
        .tempdir()
    {
        Ok(val) => val,
        Err(err) => {
            panic!("tempfile::Builder::tempdir() return Err {}", err);
        }
    }
}

/// Testing helper function to write a `[u8]` to a file in a temporary directory.
/// Will create leading directories in paths, e.g. `name` value `foo/bar` creates
/// directory `foo` and file `bar`.
///
/// Returns the canonical path of the new file.
pub fn create_file_bytes_name_in_tmpdir(
    data: &[u8],
    name: &str,
    tempdir: &TempDir,
) -> FPath {
    let path_file: PathBuf = tempdir.path().join(name);
    if let Some(parent) = path_file.parent() {
        if let Err(err) = create_dir_all(parent) {
            panic!("create_dir_all({:?}) Error {:?}", parent, err);
        }
    }
    defo!("File::create({:?})", path_file);
    let mut file_ = match File::create(&path_file) {
        Ok(f) => f,
        Err(err) => panic!("File::create({:?}) Error {:?}", path_file, err),
    };
    file_.write_all(data).unwrap();

    canonical_fpath(&path_file)
}

/// Testing helper function to append a `[u8]` to an existing file.
pub fn append_file_bytes(
    path: &str,
    data: &[u8],
) {
    let mut file_ = match std::fs::OpenOptions::new().append(true).open(path) {
        Ok(f) => f,
        Err(err) => panic!("OpenOptions::open({:?}) Error {:?}", path, err),
    };
    file_.write_all(data).unwrap();
}

/// Testing helper returning the canonical `FPath` of `path`.
pub fn canonical_fpath(path: &Path) -> FPath {
    match std::fs::canonicalize(path) {
        Ok(val) => path_to_fpath(&val),
        Err(err) => panic!("canonicalize({:?}) Error {:?}", path, err),
    }
}
