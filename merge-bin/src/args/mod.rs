// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::flash::{FlashSize, ParseFlashSizeError};
use crate::merge::Request;
use clap::Parser;
use std::path::PathBuf;

mod cli;
mod config;

pub use config::Error as ConfigError;

/// Program arguments loaded from the CLI and config file.
#[derive(Debug, Clone)]
pub struct Args {
    pub verbose: bool,
    pub command: Command,
}

#[derive(Debug, Clone)]
pub enum Command {
    /// Merge the build artifacts into one image.
    Merge(Request),
    /// Report what a merge would pick up.
    Locate {
        build_dir: PathBuf,
        esptool: Option<PathBuf>,
    },
}

pub fn args<I, T>(args: I) -> Result<Args, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Args::try_parse_from(args).map_err(Error::Cli)?;
    let command = match cli.command {
        cli::Command::Merge {
            build_dir,
            output,
            flash_size,
            board,
            esptool,
            python,
            config,
            dry_run,
        } => {
            let config = load(config)?;

            // Anything given both on the CLI and in the config file is an error.
            let build_dir = reconcile(build_dir, config.build_dir, "build directory")?
                .ok_or(Error::BuildDirMissing)?;
            let output = reconcile(output, config.output, "output")?;
            let flash_size = reconcile(flash_size, config.flash_size, "flash size")?
                .map(|size| size.parse::<FlashSize>())
                .transpose()
                .map_err(Error::InvalidFlashSize)?;
            let board = reconcile(board, config.board, "board")?;
            let esptool = reconcile(esptool, config.esptool, "esptool")?;
            let python = reconcile(python, config.python, "python")?;

            Command::Merge(Request {
                build_dir,
                output,
                flash_size,
                board,
                esptool,
                python,
                dry_run,
            })
        }
        cli::Command::Locate {
            build_dir,
            esptool,
            config,
        } => {
            let config = load(config)?;
            Command::Locate {
                build_dir: reconcile(build_dir, config.build_dir, "build directory")?
                    .ok_or(Error::BuildDirMissing)?,
                esptool: reconcile(esptool, config.esptool, "esptool")?,
            }
        }
    };
    Ok(Args {
        verbose: cli.verbose,
        command,
    })
}

fn load(path: Option<PathBuf>) -> Result<config::Config, Error> {
    let config = path.map(|c| config::Config::load(&c)).transpose()?;
    Ok(config.unwrap_or_default())
}

fn reconcile<T>(cli: Option<T>, config: Option<T>, field: &'static str) -> Result<Option<T>, Error> {
    match (cli, config) {
        (Some(_), Some(_)) => Err(Error::InConfigAndCli(field)),
        (cli, config) => Ok(cli.or(config)),
    }
}

#[derive(Debug)]
pub enum Error {
    BuildDirMissing,
    Cli(clap::Error),
    Config(ConfigError),
    InConfigAndCli(&'static str),
    InvalidFlashSize(ParseFlashSizeError),
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BuildDirMissing => write!(
                f,
                "build directory must be specified, either with --build-dir or in the config file"
            ),
            Error::Cli(e) => write!(f, "{}", e.render().ansi()),
            Error::Config(e) => write!(f, "config error: {e}"),
            Error::InConfigAndCli(field) => write!(f, "{field} specified in both config and cli"),
            Error::InvalidFlashSize(e) => write!(f, "user specified {e}"),
        }
    }
}

impl std::error::Error for Error {}
