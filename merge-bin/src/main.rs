// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use {
    colored::Colorize,
    esptool::{Esptool, HostEnv},
    runner::{Runner, SystemRunner},
    std::{ffi::OsString, io::Write},
    tracing_subscriber::{fmt, prelude::*, EnvFilter},
};

mod args;
mod artifacts;
mod board;
mod esptool;
mod flash;
mod merge;
mod runner;

#[cfg(test)]
mod tests;

fn main() -> std::process::ExitCode {
    main_args(
        std::env::args_os(),
        &HostEnv::from_process(),
        &mut SystemRunner,
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .into()
}

fn main_args<I, T>(
    args: I,
    env: &HostEnv,
    runner: &mut impl Runner,
    mut stdout: impl Write,
    mut stderr: impl Write,
) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match run(args, env, runner, &mut stdout) {
        Ok(()) => ExitCode(0),
        Err(Error::Args(args::Error::Cli(e))) if !e.use_stderr() => {
            // --help and --version
            write!(stdout, "{}", e.render().ansi()).expect("write help to stdout");
            ExitCode(0)
        }
        Err(Error::Args(e @ args::Error::Cli(_))) => {
            // Clap already does the "error: {}" formatting.
            writeln!(stderr, "{e}").expect("write error to stderr");
            ExitCode(1)
        }
        Err(e) => {
            writeln!(stderr, "{} {e}", "error:".bold().red()).expect("write error to stderr");
            ExitCode(1)
        }
    }
}

fn run<I, T>(args: I, env: &HostEnv, runner: &mut impl Runner, mut stdout: impl Write) -> Result<(), Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = args::args(args)?;
    init_tracing(args.verbose);

    match args.command {
        args::Command::Merge(request) => match merge::merge(&request, env, runner)? {
            merge::Outcome::DryRun(command) => writeln!(stdout, "{command}").map_err(Error::Stdout)?,
            merge::Outcome::Merged { output } => {
                tracing::debug!("Merge complete: {}", output.display())
            }
            merge::Outcome::Skipped(reason) => tracing::debug!("Nothing merged: {reason}"),
        },
        args::Command::Locate { build_dir, esptool } => {
            let artifacts = artifacts::Artifacts::locate(&build_dir).map_err(Error::ReadBuildDir)?;
            let found = [
                ("bootloader", artifacts.bootloader),
                ("partitions", artifacts.partitions),
                ("firmware", artifacts.firmware),
                (
                    "esptool",
                    Esptool::locate(esptool.as_deref(), None, env).map(|tool| tool.script),
                ),
            ];
            for (name, path) in &found {
                writeln!(
                    &mut stdout,
                    "{:10} {}",
                    name.bold(),
                    artifacts::MaybePath(path.as_deref())
                )
                .map_err(Error::Stdout)?;
            }
        }
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise info, or debug with `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    // Logs go to stderr so a dry run's stdout is just the command. Tests call
    // this more than once, hence try_init.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExitCode(u8);

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        code.0.into()
    }
}

#[derive(Debug)]
enum Error {
    Args(args::Error),
    Merge(merge::Error),
    ReadBuildDir(std::io::Error),
    Stdout(std::io::Error),
}

impl From<args::Error> for Error {
    fn from(e: args::Error) -> Self {
        Error::Args(e)
    }
}

impl From<merge::Error> for Error {
    fn from(e: merge::Error) -> Self {
        Error::Merge(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Args(e) => write!(f, "{e}"),
            Error::Merge(e) => write!(f, "{e}"),
            Error::ReadBuildDir(e) => write!(f, "failed to read build directory: {e}"),
            Error::Stdout(e) => write!(f, "failed to write to stdout: {e}"),
        }
    }
}

impl std::error::Error for Error {}
