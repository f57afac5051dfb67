// src/tests/fileresolver_tests.rs

use crate::common::FPath;
use crate::debug::helpers::{canonical_fpath, create_file_bytes_name_in_tmpdir, create_temp_dir, TempDir};
use crate::readers::fileresolver::{pattern_names, resolve, resolve_with_ids};

use std::collections::HashSet;

use ::test_case::test_case;

// -------------------------------------------------------------------------------------------------

/// Create a fake file system under a temporary directory
///
/// ```text
/// root/
///   file.log
///   real.log
///   symlink_to_file.log -> real.log
///   dangling.log -> missing.log
///   hard_linked_file_a.log = hard_linked_file_b.log
///   subdir/
///     another.log
///     symlink_to_file.log -> another.log
///     loop -> ../
///     subsubdir/
///       yaf.log
///   symlinked_dir/
///     yet_another_file.log
///   symlink_to_dir -> symlinked_dir/
/// ```
///
/// Returns the temporary directory and the canonical path of `root`.
#[cfg(unix)]
fn create_fake_fs() -> (TempDir, FPath) {
    use std::os::unix::fs::symlink;

    let tmpdir = create_temp_dir();
    create_file_bytes_name_in_tmpdir(b"blub\n", "root/file.log", &tmpdir);
    create_file_bytes_name_in_tmpdir(b"real\n", "root/real.log", &tmpdir);
    create_file_bytes_name_in_tmpdir(b"bla\n", "root/hard_linked_file_a.log", &tmpdir);
    create_file_bytes_name_in_tmpdir(b"bla\n", "root/subdir/another.log", &tmpdir);
    create_file_bytes_name_in_tmpdir(b"bla\n", "root/subdir/subsubdir/yaf.log", &tmpdir);
    create_file_bytes_name_in_tmpdir(b"bla\n", "root/symlinked_dir/yet_another_file.log", &tmpdir);
    let root = tmpdir.path().join("root");
    symlink(root.join("real.log"), root.join("symlink_to_file.log")).unwrap();
    symlink(root.join("missing.log"), root.join("dangling.log")).unwrap();
    symlink(root.join("subdir/another.log"), root.join("subdir/symlink_to_file.log")).unwrap();
    symlink(&root, root.join("subdir/loop")).unwrap();
    symlink(root.join("symlinked_dir"), root.join("symlink_to_dir")).unwrap();
    std::fs::hard_link(root.join("hard_linked_file_a.log"), root.join("hard_linked_file_b.log")).unwrap();

    let root_fpath: FPath = canonical_fpath(&root);

    (tmpdir, root_fpath)
}

#[cfg(unix)]
#[test_case("/*", &["/file.log", "/hard_linked_file_a.log", "/real.log"]; "star")]
#[test_case("/file.lo?", &["/file.log"]; "question")]
#[test_case("/[fh]*.log", &["/file.log", "/hard_linked_file_a.log"]; "class")]
#[test_case("/*.nomatch", &[]; "no_match")]
#[test_case("/subdir/*", &["/subdir/another.log"]; "subdir")]
#[test_case("/symlink_to_dir/*", &["/symlinked_dir/yet_another_file.log"]; "through_symlinked_dir")]
#[test_case(
    "/s*/*.log",
    &["/subdir/another.log", "/symlinked_dir/yet_another_file.log"];
    "star_dir"
)]
#[test_case(
    "/**/*.log",
    &[
        "/file.log",
        "/hard_linked_file_a.log",
        "/real.log",
        "/subdir/another.log",
        "/subdir/subsubdir/yaf.log",
        "/symlinked_dir/yet_another_file.log",
    ];
    "recursive_log"
)]
#[test_case(
    "/**",
    &[
        "/file.log",
        "/hard_linked_file_a.log",
        "/real.log",
        "/subdir/another.log",
        "/subdir/subsubdir/yaf.log",
        "/symlinked_dir/yet_another_file.log",
    ];
    "recursive_all"
)]
#[test_case("/subdir/**/yaf.log", &["/subdir/subsubdir/yaf.log"]; "recursive_middle")]
#[test_case("/file.log", &["/file.log"]; "literal_file")]
#[test_case("/symlink_to_file.log", &["/real.log"]; "literal_symlink")]
#[test_case("/subdir", &[]; "literal_dir")]
#[test_case("/dangling.log", &[]; "literal_dangling")]
#[test_case("/missing.log", &[]; "literal_missing")]
fn test_resolve(
    pattern_suffix: &str,
    expect_suffixes: &[&str],
) {
    let (_tmpdir, root) = create_fake_fs();
    let files = resolve(&format!("{}{}", root, pattern_suffix));
    let expect: Vec<FPath> = expect_suffixes
        .iter()
        .map(|suffix| format!("{}{}", root, suffix))
        .collect();
    assert_eq!(files, expect);
}

#[cfg(unix)]
#[test]
fn test_resolve_no_duplicate_identities() {
    let (_tmpdir, root) = create_fake_fs();
    let resolved = resolve_with_ids(&format!("{}/**", root));
    let ids: HashSet<_> = resolved.iter().map(|(_, fileid)| *fileid).collect();
    assert_eq!(ids.len(), resolved.len());
}

#[test]
fn test_resolve_invalid_pattern() {
    let tmpdir = create_temp_dir();
    let pattern = format!("{}/a**b/*.log", canonical_fpath(tmpdir.path()));
    assert!(resolve(&pattern).is_empty());
}

#[test]
fn test_resolve_sorted() {
    let tmpdir = create_temp_dir();
    let c = create_file_bytes_name_in_tmpdir(b"", "c.log", &tmpdir);
    let a = create_file_bytes_name_in_tmpdir(b"", "a.log", &tmpdir);
    let b = create_file_bytes_name_in_tmpdir(b"", "b.log", &tmpdir);
    let files = resolve(&format!("{}/*.log", canonical_fpath(tmpdir.path())));
    assert_eq!(files, vec![a, b, c]);
}

#[test_case("/var/log/*.log", "/var/log/gone.log", true)]
#[test_case("/var/log/*.log", "/var/log/sub/gone.log", false; "star_one_segment")]
#[test_case("/var/log/**/*.log", "/var/log/a/b/gone.log", true; "recursive")]
#[test_case("/var/log/gone.log", "/var/log/gone.log", true; "literal")]
#[test_case("/var/log/gone.log", "/var/log/other.log", false; "literal_other")]
#[test_case("/var/log/[", "/var/log/[", false; "invalid")]
fn test_pattern_names(
    pattern: &str,
    path: &str,
    expect: bool,
) {
    assert_eq!(pattern_names(pattern, path), expect);
}
