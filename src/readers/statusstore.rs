// src/readers/statusstore.rs

//! Load and save the [`StatusMap`] of one monitored entity, and decide
//! which status file belongs to this run.
//!
//! A status file is named `logwatch.state[.<suffix>]` and holds one line
//! per tracked file:
//!
//! ```text
//! /var/log/messages|7767698|32455445
//! ```
//!
//! that is `path|offset|inode`.
//!
//! [`StatusMap`]: crate::data::status::StatusMap

use crate::common::{FPath, FileOffset, Inode};
use crate::data::config::ClusterConfig;
use crate::data::status::{Cursor, StatusMap};
use crate::{de_wrn, e_wrn};

use std::collections::HashSet;
use std::io::{BufWriter, ErrorKind, Result, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};
use ::tempfile::NamedTempFile;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// execution context and status file name
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Base name of status files.
pub const STATUS_FILENAME: &str = "logwatch.state";

/// Status file suffix for interactive invocations.
pub const STATUS_SUFFIX_LOCAL: &str = "local";

/// Everything about the invocation that decides the status file.
///
/// Passed explicitly instead of being read from the process environment
/// within the core.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExecContext {
    /// Source IP of the caller, empty if unknown.
    pub remote: String,
    /// Standard output is a terminal.
    pub is_tty: bool,
    /// Directory holding status files.
    pub var_dir: PathBuf,
}

impl ExecContext {
    pub fn new(
        remote: String,
        is_tty: bool,
        var_dir: PathBuf,
    ) -> ExecContext {
        ExecContext {
            remote,
            is_tty,
            var_dir,
        }
    }
}

/// Is `ip` within `subnet`?
///
/// `subnet` is a CIDR subnet like `192.168.1.0/24` or a bare IP literal.
/// Addresses of differing families never match. Values that do not parse
/// as addresses are compared as strings.
pub fn ip_in_subnetwork(
    ip: &str,
    subnet: &str,
) -> bool {
    let ip_addr: IpAddr = match ip.trim().parse::<IpAddr>() {
        Ok(val) => val,
        Err(_) => return ip.trim() == subnet.trim(),
    };
    let (network, prefix_len): (&str, Option<&str>) = match subnet.trim().split_once('/') {
        Some((network, prefix_len)) => (network, Some(prefix_len)),
        None => (subnet.trim(), None),
    };
    let network_addr: IpAddr = match network.parse::<IpAddr>() {
        Ok(val) => val,
        Err(_) => return false,
    };
    let prefix_len: u32 = match prefix_len {
        None => return ip_addr == network_addr,
        Some(val) => match val.parse::<u32>() {
            Ok(val) => val,
            Err(_) => return false,
        },
    };

    match (ip_addr, network_addr) {
        (IpAddr::V4(ip4), IpAddr::V4(net4)) => {
            if prefix_len > 32 {
                return false;
            }
            let mask: u32 = u32::MAX.checked_shl(32 - prefix_len).unwrap_or(0);
            (u32::from(ip4) & mask) == (u32::from(net4) & mask)
        }
        (IpAddr::V6(ip6), IpAddr::V6(net6)) => {
            if prefix_len > 128 {
                return false;
            }
            let mask: u128 = u128::MAX.checked_shl(128 - prefix_len).unwrap_or(0);
            (u128::from(ip6) & mask) == (u128::from(net6) & mask)
        }
        _ => false,
    }
}

/// Make an IP literal usable in a file name; `:` and `.` become `_`.
pub fn sanitize_ip(ip: &str) -> String {
    ip.replace(&[':', '.'][..], "_")
}

/// Return the status file suffix for this run, by precedence:
/// a cluster containing the remote IP, the sanitized remote IP, `local` for
/// a terminal, or no suffix.
pub fn status_suffix(
    ctx: &ExecContext,
    cluster_configs: &[ClusterConfig],
) -> Option<String> {
    defn!("({:?})", ctx);
    let remote: &str = ctx.remote.trim();
    if !remote.is_empty() {
        for cluster in cluster_configs.iter() {
            if cluster
                .ips_or_subnets
                .iter()
                .any(|subnet| ip_in_subnetwork(remote, subnet))
            {
                defx!("cluster {:?}", cluster.name);
                return Some(cluster.name.clone());
            }
        }
        defx!("remote {:?}", remote);
        return Some(sanitize_ip(remote));
    }
    if ctx.is_tty {
        defx!("local");
        return Some(STATUS_SUFFIX_LOCAL.to_string());
    }
    defx!("no suffix");

    None
}

/// Return the path of the status file for this run.
pub fn status_filename(
    ctx: &ExecContext,
    cluster_configs: &[ClusterConfig],
) -> PathBuf {
    let name: String = match status_suffix(ctx, cluster_configs) {
        Some(suffix) => format!("{}.{}", STATUS_FILENAME, suffix),
        None => STATUS_FILENAME.to_string(),
    };

    ctx.var_dir.join(name)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// load and save
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse one status file line `path|offset|inode`.
///
/// Fields are split from the right so a path containing `|` survives.
pub fn parse_status_line(line: &str) -> Option<(FPath, Cursor)> {
    let mut fields = line.rsplitn(3, '|');
    let inode: Inode = fields.next()?.trim().parse::<Inode>().ok()?;
    let offset: FileOffset = fields.next()?.trim().parse::<FileOffset>().ok()?;
    let path: &str = fields.next()?;
    if path.is_empty() {
        return None;
    }

    Some((FPath::from(path), Cursor::new(offset, inode)))
}

/// Format one status file line `path|offset|inode`.
pub fn format_status_line(
    path: &str,
    cursor: &Cursor,
) -> String {
    format!("{}|{}", path, cursor)
}

/// Load the status file at `path`.
///
/// A missing file is an empty map. Malformed lines are skipped.
pub fn load(path: &Path) -> Result<StatusMap> {
    defn!("({:?})", path);
    let data: Vec<u8> = match std::fs::read(path) {
        Ok(val) => val,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            defx!("not found, return empty");
            return Ok(StatusMap::new());
        }
        Err(err) => {
            defx!("error {}", err);
            return Err(err);
        }
    };
    let mut status = StatusMap::new();
    for line in String::from_utf8_lossy(&data).lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_status_line(line) {
            Some((fpath, cursor)) => {
                status.insert(fpath, cursor);
            }
            None => {
                de_wrn!("skipping malformed status line {:?} in {:?}", line, path);
            }
        }
    }
    defx!("return {} entries", status.len());

    Ok(status)
}

/// Load the status file at `path`; a file that cannot be read is treated
/// as no prior state, with a warning.
pub fn load_or_empty(path: &Path) -> StatusMap {
    match load(path) {
        Ok(status) => status,
        Err(err) => {
            e_wrn!("cannot read status file {:?}, starting without prior state: {}", path, err);
            StatusMap::new()
        }
    }
}

/// Save `status` to `path`.
///
/// Written to a temporary file in the same directory and then renamed over
/// `path`, so readers never see a partially written status file.
pub fn save(
    status: &StatusMap,
    path: &Path,
) -> Result<()> {
    defn!("({} entries, {:?})", status.len(), path);
    let dir: &Path = match path.parent() {
        Some(val) if !val.as_os_str().is_empty() => val,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        for (fpath, cursor) in status.iter() {
            writeln!(writer, "{}", format_status_line(fpath, cursor))?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    defx!();

    Ok(())
}

/// Drop entries for files not in `keep`.
pub fn garbage_collect(
    status: &mut StatusMap,
    keep: &HashSet<FPath>,
) {
    status.retain(|fpath, _| keep.contains(fpath));
}
