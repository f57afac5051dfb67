// src/bin/mk_logwatch.rs

//! Driver program _mk_logwatch_ drives the [_mklwlib_].
//!
//! Processes user-passed command-line arguments and environment variables.
//! Then reads the configuration, loads the status of the calling monitoring
//! entity, prints the `<<<logwatch>>>` section for all configured log files
//! to STDOUT, and saves the updated status.
//!
//! A configuration error prints an error to STDERR, prints no section, and
//! exits with a failure code. A status file that cannot be read or written
//! is only warned about.
//!
//! `mk_logwatch.rs` is the only place that prints to STDOUT.
//!
//! [_mklwlib_]: mklwlib

#![allow(non_camel_case_types)]

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ::anyhow::{Context, Result};
use ::clap::Parser;
use ::const_format::concatcp;
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

use ::mklwlib::common::FPaths;
use ::mklwlib::data::config::{ClusterConfigs, LogfilesConfigs};
use ::mklwlib::data::status::StatusMap;
use ::mklwlib::{e_err, e_wrn};
use ::mklwlib::readers::configreader::{get_config_files, read_config};
use ::mklwlib::readers::logfileprocessor::{process_configs, SECTION_HEADER};
use ::mklwlib::readers::statusstore::{self, status_filename, ExecContext};

// --------------------
// command-line parsing

/// Default directory of `logwatch.cfg` and `logwatch.d/`.
const CONFIG_DIR_DEFAULT: &str = "/etc/check_mk";
/// Default directory of the status files.
const VAR_DIR_DEFAULT: &str = "/var/lib/check_mk_agent";

/// `--help` _afterword_ message.
const CLI_HELP_AFTER: &str = concatcp!(
    "\
The configuration is read from CONFIG_DIR/logwatch.cfg and then
CONFIG_DIR/logwatch.d/*.cfg in lexical order.

The status is kept in VAR_DIR/logwatch.state[.SUFFIX]. SUFFIX is the name of
the cluster containing the REMOTE address, else the REMOTE address with ':'
and '.' replaced by '_', else \"local\" if STDOUT is a terminal.
With no REMOTE and no terminal there is no SUFFIX.

Defaults:
    CONFIG_DIR  ", CONFIG_DIR_DEFAULT, "
    VAR_DIR     ", VAR_DIR_DEFAULT, "
"
);

// clap derive, see https://docs.rs/clap/4.2.1/clap/_derive/index.html
#[derive(Parser, Debug)]
#[clap(
    about = env!("CARGO_PKG_DESCRIPTION"),
    author = env!("CARGO_PKG_AUTHORS"),
    name = "mk_logwatch",
    // write expanded information for the `--version` output
    version = concatcp!(
        "\n",
        "Version: ",
        env!("CARGO_PKG_VERSION_MAJOR"), ".",
        env!("CARGO_PKG_VERSION_MINOR"), ".",
        env!("CARGO_PKG_VERSION_PATCH"), "\n",
        "MSRV: ", env!("CARGO_PKG_RUST_VERSION"), "\n",
        "License: ", env!("CARGO_PKG_LICENSE"), "\n",
        "Repository: ", env!("CARGO_PKG_REPOSITORY"), "\n",
    ),
    after_help = CLI_HELP_AFTER,
    verbatim_doc_comment,
)]
struct CLI_Args {
    /// Directory holding logwatch.cfg and logwatch.d/.
    #[clap(
        long,
        env = "MK_CONFDIR",
        default_value = CONFIG_DIR_DEFAULT,
        verbatim_doc_comment,
    )]
    config_dir: PathBuf,

    /// Directory holding the status files.
    #[clap(
        long,
        env = "MK_VARDIR",
        default_value = VAR_DIR_DEFAULT,
        verbatim_doc_comment,
    )]
    var_dir: PathBuf,

    /// IP address of the caller. Selects the status file.
    #[clap(
        long,
        env = "REMOTE",
        default_value = "",
        verbatim_doc_comment,
    )]
    remote: String,

    /// Debug mode. Continuation lines are printed on separate lines
    /// prefixed "CONT:" and each match is explained by "[explain]" lines.
    #[clap(
        short = 'd',
        long,
        verbatim_doc_comment,
    )]
    debug: bool,
}

// --------------------
// processing

/// Read the configuration, process all log files, print the section, and
/// save the status.
fn run(args: &CLI_Args) -> Result<()> {
    defn!("{:?}", args);
    let config_files: FPaths = get_config_files(&args.config_dir);
    let (logfiles_configs, cluster_configs): (LogfilesConfigs, ClusterConfigs) =
        read_config(&config_files).context("reading configuration")?;
    defo!("{} logfiles blocks, {} clusters", logfiles_configs.len(), cluster_configs.len());

    let ctx = ExecContext::new(
        args.remote.clone(),
        std::io::stdout().is_terminal(),
        args.var_dir.clone(),
    );
    let status_path: PathBuf = status_filename(&ctx, &cluster_configs);
    defo!("status file {:?}", status_path);
    let mut status: StatusMap = statusstore::load_or_empty(&status_path);

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    writeln!(stdout, "{}", SECTION_HEADER)?;
    let lines: Vec<String> = process_configs(&logfiles_configs, &mut status, args.debug);
    for line in lines.iter() {
        stdout.write_all(line.as_bytes())?;
    }
    stdout.flush()?;

    if let Err(err) = save_status(&status, &status_path) {
        // the section is already printed
        e_wrn!("{:#}", err);
    }
    defx!();

    Ok(())
}

fn save_status(
    status: &StatusMap,
    path: &Path,
) -> Result<()> {
    statusstore::save(status, path)
        .with_context(|| format!("saving status file {:?}", path))
}

pub fn main() -> ExitCode {
    defn!();
    let args = CLI_Args::parse();

    let exitcode = match run(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            e_err!("{:#}", err);
            ExitCode::FAILURE
        }
    };
    defx!("exitcode {:?}", exitcode);

    exitcode
}
