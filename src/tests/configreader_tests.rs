// src/tests/configreader_tests.rs

use crate::common::FPath;
use crate::data::config::{Continuation, LogfilesConfig};
use crate::data::severity::Severity;
use crate::debug::helpers::{create_file_bytes_name_in_tmpdir, create_temp_dir};
use crate::readers::configreader::{
    get_config_files,
    iter_config_lines,
    parse,
    read_config,
    CONFIG_FILENAME,
};
use crate::readers::helpers::path_to_fpath;

use std::io::ErrorKind;

use ::test_case::test_case;

// -------------------------------------------------------------------------------------------------

#[test]
fn test_get_config_files() {
    let tmpdir = create_temp_dir();
    create_file_bytes_name_in_tmpdir(b"", "logwatch.d/custom.cfg", &tmpdir);
    create_file_bytes_name_in_tmpdir(b"", "logwatch.d/another.cfg", &tmpdir);
    create_file_bytes_name_in_tmpdir(b"", "logwatch.d/ignored.txt", &tmpdir);

    let files = get_config_files(tmpdir.path());
    let base: FPath = path_to_fpath(tmpdir.path());
    assert_eq!(
        files,
        vec![
            format!("{}/logwatch.cfg", base),
            format!("{}/logwatch.d/another.cfg", base),
            format!("{}/logwatch.d/custom.cfg", base),
        ]
    );
}

#[test]
fn test_get_config_files_no_fragments() {
    let tmpdir = create_temp_dir();
    let files = get_config_files(tmpdir.path());
    assert_eq!(files, vec![path_to_fpath(&tmpdir.path().join(CONFIG_FILENAME))]);
}

#[test]
fn test_iter_config_lines() {
    let tmpdir = create_temp_dir();
    let main = create_file_bytes_name_in_tmpdir(
        b"# this is a comment\nthis is a line   \n   # indented comment\n",
        CONFIG_FILENAME,
        &tmpdir,
    );
    let fragment = create_file_bytes_name_in_tmpdir(b"\n /var/log/x\n", "logwatch.d/a.cfg", &tmpdir);

    let lines = iter_config_lines(&[main, fragment]).unwrap();
    assert_eq!(lines, vec!["this is a line", "", " /var/log/x"]);
}

#[test]
fn test_iter_config_lines_main_missing() {
    let tmpdir = create_temp_dir();
    let main: FPath = path_to_fpath(&tmpdir.path().join(CONFIG_FILENAME));
    let err = iter_config_lines(&[main]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_iter_config_lines_fragment_missing() {
    let tmpdir = create_temp_dir();
    let main = create_file_bytes_name_in_tmpdir(b"/var/log/messages\n", CONFIG_FILENAME, &tmpdir);
    let fragment: FPath = path_to_fpath(&tmpdir.path().join("logwatch.d/gone.cfg"));
    let lines = iter_config_lines(&[main, fragment]).unwrap();
    assert_eq!(lines, vec!["/var/log/messages"]);
}

// -------------------------------------------------------------------------------------------------

#[test_case(
    &["not a cluster line", "", "CLUSTER duck", " 192.168.1.1", " 192.168.1.2  "],
    "duck",
    &["192.168.1.1", "192.168.1.2"];
    "duck"
)]
#[test_case(&["CLUSTER empty", ""], "empty", &[]; "empty")]
#[test_case(&["CLUSTER last", "10.0.0.0/8"], "last", &["10.0.0.0/8"]; "unindented_member")]
fn test_parse_cluster(
    lines: &[&str],
    name: &str,
    ips: &[&str],
) {
    let (_, clusters) = parse(lines).unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].name, name);
    assert_eq!(clusters[0].ips_or_subnets, ips);
}

#[test]
fn test_parse_cluster_ends_at_blank_line() {
    let lines = ["CLUSTER a", " 192.168.1.1", "", "/var/log/messages", " C panic"];
    let (logfiles, clusters) = parse(&lines).unwrap();
    assert_eq!(clusters[0].ips_or_subnets, vec!["192.168.1.1"]);
    assert_eq!(logfiles.len(), 1);
    assert_eq!(logfiles[0].files, vec!["/var/log/messages"]);
    assert_eq!(logfiles[0].patterns.len(), 1);
}

/// `(severity, regex source)` of each rule
fn patterns_raw(config: &LogfilesConfig) -> Vec<(Severity, String)> {
    config
        .patterns
        .iter()
        .map(|rule| (rule.severity, rule.regex.as_str().to_string()))
        .collect()
}

#[test]
fn test_parse_logfiles_messages() {
    let lines = [
        "",
        "/var/log/messages",
        " C Fail event detected on md device",
        " I mdadm.*: Rebuild.*event detected",
        " W mdadm\\[",
        " W ata.*hard resetting link",
        " W ata.*soft reset failed (.*FIS failed)",
        " C Error: (.*)",
    ];
    let (logfiles, _) = parse(&lines).unwrap();
    assert_eq!(logfiles.len(), 1);
    assert_eq!(logfiles[0].files, vec!["/var/log/messages"]);
    assert_eq!(
        patterns_raw(&logfiles[0]),
        vec![
            (Severity::Critical, String::from("Fail event detected on md device")),
            (Severity::Ignore, String::from("mdadm.*: Rebuild.*event detected")),
            (Severity::Warning, String::from("mdadm\\[")),
            (Severity::Warning, String::from("ata.*hard resetting link")),
            (Severity::Warning, String::from("ata.*soft reset failed (.*FIS failed)")),
            (Severity::Critical, String::from("Error: (.*)")),
        ]
    );
}

#[test]
fn test_parse_logfiles_two_files() {
    let lines = [
        "/var/log/syslog /var/log/kern.log",
        " I registered panic notifier",
        " C panic",
        " W generic protection rip",
    ];
    let (logfiles, _) = parse(&lines).unwrap();
    assert_eq!(logfiles[0].files, vec!["/var/log/syslog", "/var/log/kern.log"]);
    assert_eq!(
        patterns_raw(&logfiles[0]),
        vec![
            (Severity::Ignore, String::from("registered panic notifier")),
            (Severity::Critical, String::from("panic")),
            (Severity::Warning, String::from("generic protection rip")),
        ]
    );
}

#[test]
fn test_parse_options_global_and_local() {
    let lines = [
        "maxlines=500 nocontext=true",
        "/var/log/a maxlines=10",
        " C panic",
        "/var/log/b",
        " W warn",
        "maxlines=7",
        "/var/log/c",
    ];
    let (logfiles, _) = parse(&lines).unwrap();
    assert_eq!(logfiles.len(), 3);
    assert_eq!(logfiles[0].files, vec!["/var/log/a"]);
    assert_eq!(logfiles[0].options.maxlines, Some(10));
    assert!(logfiles[0].options.nocontext);
    assert_eq!(logfiles[1].options.maxlines, Some(500));
    assert!(logfiles[1].options.nocontext);
    assert_eq!(logfiles[2].options.maxlines, Some(7));
    assert!(logfiles[2].options.nocontext);
}

#[test]
fn test_parse_unknown_option_ignored() {
    let lines = ["/var/log/a frobnicate=3", " C panic"];
    let (logfiles, _) = parse(&lines).unwrap();
    assert_eq!(logfiles[0].files, vec!["/var/log/a"]);
}

#[test]
fn test_parse_unknown_letter_is_ok() {
    let lines = ["/var/log/a", " Z something"];
    let (logfiles, _) = parse(&lines).unwrap();
    assert_eq!(logfiles[0].patterns[0].severity, Severity::Ok);
}

#[test_case(" CW panic", "panic"; "two_letters")]
#[test_case(" Warn disk full", "disk full"; "word")]
fn test_parse_unknown_level_word_is_ok(
    pattern_line: &str,
    expect_regex: &str,
) {
    let lines = ["/var/log/a", pattern_line, " C panic"];
    let (logfiles, _) = parse(&lines).unwrap();
    let rules = &logfiles[0].patterns;
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].severity, Severity::Ok);
    assert_eq!(rules[0].regex.as_str(), expect_regex);
    assert_eq!(rules[1].severity, Severity::Critical);
}

#[test]
fn test_parse_iregex_pattern() {
    let lines = ["/var/log/a", " W iregex=ERROR", " C regex=^panic"];
    let (logfiles, _) = parse(&lines).unwrap();
    let rules = &logfiles[0].patterns;
    assert!(rules[0].regex.is_match("an error occurred"));
    assert_eq!(rules[1].regex.as_str(), "^panic");
    assert!(!rules[1].regex.is_match("no panic"));
}

#[test]
fn test_parse_sub_rules() {
    let lines = [
        "/var/log/a",
        " C Error: (.*)",
        " A ^\\s+",
        " A 2",
        " R \\1 (rewritten)",
        " K harmless",
        " X disk",
        " W other",
    ];
    let (logfiles, _) = parse(&lines).unwrap();
    let rules = &logfiles[0].patterns;
    assert_eq!(rules.len(), 2);
    let rule = &rules[0];
    assert_eq!(rule.continuations.len(), 2);
    match &rule.continuations[0] {
        Continuation::Pattern(regex) => assert_eq!(regex.as_str(), "^\\s+"),
        other => panic!("expected a pattern continuation, got {:?}", other),
    }
    match &rule.continuations[1] {
        Continuation::Lines(count) => assert_eq!(*count, 2),
        other => panic!("expected a count continuation, got {:?}", other),
    }
    assert_eq!(rule.rewrites, vec!["\\1 (rewritten)"]);
    assert_eq!(rule.ok_patterns.len(), 1);
    assert_eq!(rule.context_patterns.len(), 1);
    assert!(rules[1].continuations.is_empty());
}

#[test_case(&["/var/log/a", " C ("]; "bad_regex")]
#[test_case(&[" C panic"]; "pattern_without_logfiles")]
#[test_case(&["/var/log/a", " A ^\\s+"]; "sub_rule_without_rule")]
#[test_case(&["/var/log/a maxlines=x"]; "bad_option_value")]
#[test_case(&["maxlines=x"]; "bad_global_option_value")]
#[test_case(&["CLUSTER"]; "cluster_without_name")]
fn test_parse_error(lines: &[&str]) {
    let err = parse(lines).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn test_parse_error_names_line() {
    let lines = ["/var/log/a", " C panic", " W ([unclosed"];
    let err = parse(&lines).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("line 3"), "{}", message);
    assert!(message.contains("([unclosed"), "{}", message);
}

#[test]
fn test_read_config() {
    let tmpdir = create_temp_dir();
    create_file_bytes_name_in_tmpdir(
        b"maxlines=5\n/var/log/messages\n C panic\n",
        CONFIG_FILENAME,
        &tmpdir,
    );
    create_file_bytes_name_in_tmpdir(
        b"CLUSTER c1\n 192.168.1.0/24\n\n/var/log/auth.log\n W sshd\n",
        "logwatch.d/10-auth.cfg",
        &tmpdir,
    );
    let files = get_config_files(tmpdir.path());
    let (logfiles, clusters) = read_config(&files).unwrap();
    assert_eq!(logfiles.len(), 2);
    assert_eq!(logfiles[1].files, vec!["/var/log/auth.log"]);
    assert_eq!(logfiles[1].options.maxlines, Some(5));
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].name, "c1");
}
