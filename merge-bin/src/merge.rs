// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! The post-build merge: find the inputs, find esptool, run it or skip.

use crate::artifacts::{Artifacts, MaybePath};
use crate::board::{self, Board};
use crate::esptool::{Esptool, HostEnv, MergeCommand};
use crate::flash::{self, FlashSize, ParseFlashSizeError, Region};
use crate::runner::{RunStatus, Runner};
use consts::MERGED_IMAGE_NAME;
use std::fmt;
use std::path::{Path, PathBuf};

/// Everything a merge needs to know, already reconciled from CLI and config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub build_dir: PathBuf,
    /// Defaults to `merged-firmware.bin` in the build directory.
    pub output: Option<PathBuf>,
    pub flash_size: Option<FlashSize>,
    pub board: Option<PathBuf>,
    pub esptool: Option<PathBuf>,
    pub python: Option<PathBuf>,
    pub dry_run: bool,
}

impl Request {
    pub fn output(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.build_dir.join(MERGED_IMAGE_NAME))
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// Nothing was executed.
    Skipped(SkipReason),
    /// The command that would have run.
    DryRun(MergeCommand),
    Merged { output: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingInputs(Artifacts),
    MissingEsptool(Option<PathBuf>),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingInputs(artifacts) => write!(f, "missing inputs ({artifacts})"),
            SkipReason::MissingEsptool(path) => write!(
                f,
                "esptool.py not found (looked at {})",
                MaybePath(path.as_deref())
            ),
        }
    }
}

pub fn merge(request: &Request, env: &HostEnv, runner: &mut impl Runner) -> Result<Outcome, Error> {
    let artifacts = Artifacts::locate(&request.build_dir).map_err(Error::ReadBuildDir)?;
    let Some(inputs) = artifacts.complete() else {
        return Ok(skip(SkipReason::MissingInputs(artifacts)));
    };

    let Some(esptool) = Esptool::locate(request.esptool.as_deref(), request.python.as_deref(), env)
    else {
        let looked_at = env.esptool_script(request.esptool.as_deref());
        return Ok(skip(SkipReason::MissingEsptool(looked_at)));
    };

    let flash_size = resolve_flash_size(request.flash_size, request.board.as_deref())?;
    let command = MergeCommand::new(esptool, request.output(), flash_size, inputs);

    tracing::info!("Creating: {}", command.output().display());
    tracing::info!("  esptool={}", command.esptool().script.display());
    tracing::info!("  flash_size={}", command.flash_size());
    for region in Region::ALL {
        tracing::info!("  {}={}", region.name(), command.input(region).display());
        flash::report_size(region, command.input(region));
    }
    tracing::debug!("{command}");

    if request.dry_run {
        tracing::info!("Dry run, not executing esptool");
        return Ok(Outcome::DryRun(command));
    }

    let status = runner.run(&command).map_err(Error::SpawnEsptool)?;
    if !status.success() {
        return Err(Error::EsptoolFailed(status));
    }

    let output = command.output().to_path_buf();
    match std::fs::metadata(&output) {
        Ok(metadata) => tracing::info!(
            "Merged image {} is {}",
            output.display(),
            humansize::format_size(metadata.len(), humansize::BINARY)
        ),
        Err(e) => tracing::warn!("esptool succeeded but {} is unreadable: {e}", output.display()),
    }
    Ok(Outcome::Merged { output })
}

fn skip(reason: SkipReason) -> Outcome {
    tracing::warn!("Skipped: {reason}");
    Outcome::Skipped(reason)
}

/// Explicit size first, then the board manifest, then the default.
pub fn resolve_flash_size(explicit: Option<FlashSize>, board: Option<&Path>) -> Result<FlashSize, Error> {
    if let Some(size) = explicit {
        return Ok(size);
    }
    let Some(board) = board else {
        return Ok(FlashSize::default());
    };
    let manifest = Board::load(board)?;
    match manifest.flash_size() {
        Some(size) => {
            tracing::debug!(
                "Flash size {size} from board {}",
                manifest.name.as_deref().unwrap_or("<unnamed>")
            );
            size.parse().map_err(Error::InvalidBoardFlashSize)
        }
        None => {
            tracing::debug!("{} has no upload.flash_size", board.display());
            Ok(FlashSize::default())
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Board(board::Error),
    EsptoolFailed(RunStatus),
    InvalidBoardFlashSize(ParseFlashSizeError),
    ReadBuildDir(std::io::Error),
    SpawnEsptool(std::io::Error),
}

impl From<board::Error> for Error {
    fn from(e: board::Error) -> Self {
        Error::Board(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Board(e) => write!(f, "{e}"),
            Error::EsptoolFailed(status) => write!(f, "esptool merge_bin failed with {status}"),
            Error::InvalidBoardFlashSize(e) => write!(f, "board manifest upload.flash_size: {e}"),
            Error::ReadBuildDir(e) => write!(f, "failed to read build directory: {e}"),
            Error::SpawnEsptool(e) => write!(f, "failed to run esptool: {e}"),
        }
    }
}

impl std::error::Error for Error {}
