// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Finding esptool and building its `merge_bin` command line.

use crate::artifacts::Inputs;
use crate::flash::{FlashSize, Region};
use consts::{CHIP, DEFAULT_PYTHON, ESPTOOL_PACKAGE, ESPTOOL_SCRIPT, FLASH_FREQ, FLASH_MODE};
use std::borrow::Cow;
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

/// The parts of the process environment that decide which tool runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnv {
    /// `PYTHONEXE`, the interpreter PlatformIO runs under.
    pub python_exe: Option<PathBuf>,
    /// `PLATFORMIO_PACKAGES_DIR`
    pub packages_dir: Option<PathBuf>,
    /// `PLATFORMIO_CORE_DIR`
    pub core_dir: Option<PathBuf>,
    pub home: Option<PathBuf>,
}

impl HostEnv {
    pub fn from_process() -> Self {
        let home = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
        Self {
            python_exe: var_path("PYTHONEXE"),
            packages_dir: var_path("PLATFORMIO_PACKAGES_DIR"),
            core_dir: var_path("PLATFORMIO_CORE_DIR"),
            home: var_path(home),
        }
    }

    /// Where PlatformIO keeps its installed packages.
    pub fn packages_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.packages_dir {
            return Some(dir.clone());
        }
        if let Some(core) = &self.core_dir {
            return Some(core.join("packages"));
        }
        self.home.as_ref().map(|home| home.join(".platformio").join("packages"))
    }

    pub fn python(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.python_exe.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON))
    }

    /// The esptool script to use, whether or not it exists.
    pub fn esptool_script(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(script) => Some(script.to_path_buf()),
            None => self
                .packages_dir()
                .map(|dir| dir.join(ESPTOOL_PACKAGE).join(ESPTOOL_SCRIPT)),
        }
    }
}

fn var_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// An esptool installation that is actually there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Esptool {
    pub python: PathBuf,
    pub script: PathBuf,
}

impl Esptool {
    pub fn locate(script: Option<&Path>, python: Option<&Path>, env: &HostEnv) -> Option<Self> {
        let script = env.esptool_script(script)?;
        if !script.is_file() {
            tracing::debug!("No esptool at {}", script.display());
            return None;
        }
        Some(Self {
            python: env.python(python),
            script,
        })
    }
}

/// `esptool.py merge_bin` invocation for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCommand {
    esptool: Esptool,
    output: PathBuf,
    flash_size: FlashSize,
    inputs: Inputs,
}

impl MergeCommand {
    pub fn new(esptool: Esptool, output: PathBuf, flash_size: FlashSize, inputs: Inputs) -> Self {
        Self {
            esptool,
            output,
            flash_size,
            inputs,
        }
    }

    pub fn program(&self) -> &OsStr {
        self.esptool.python.as_os_str()
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            self.esptool.script.clone().into(),
            "--chip".into(),
            CHIP.into(),
            "merge_bin".into(),
            "-o".into(),
            self.output.clone().into(),
            "--flash_mode".into(),
            FLASH_MODE.into(),
            "--flash_freq".into(),
            FLASH_FREQ.into(),
            "--flash_size".into(),
            self.flash_size.as_str().into(),
        ];
        for region in Region::ALL {
            args.push(region.offset_arg().into());
            args.push(self.input(region).as_os_str().to_owned());
        }
        args
    }

    pub fn esptool(&self) -> &Esptool {
        &self.esptool
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn flash_size(&self) -> FlashSize {
        self.flash_size
    }

    pub fn input(&self, region: Region) -> &Path {
        match region {
            Region::Bootloader => &self.inputs.bootloader,
            Region::PartitionTable => &self.inputs.partitions,
            Region::App => &self.inputs.firmware,
        }
    }
}

/// Renders the command as one line a POSIX shell would split back into the same argv.
impl fmt::Display for MergeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.program().to_string_lossy()))?;
        for arg in self.args() {
            write!(f, " {}", quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

pub fn quote(word: &str) -> Cow<'_, str> {
    if word.is_empty() {
        return Cow::Borrowed("''");
    }
    let safe = word
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if safe {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r#"'"'"'"#)))
    }
}
