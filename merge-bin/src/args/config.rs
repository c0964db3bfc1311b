// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub build_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub flash_size: Option<String>,
    pub board: Option<PathBuf>,
    pub esptool: Option<PathBuf>,
    /// Interpreter name or path, taken as is.
    pub python: Option<PathBuf>,
}

impl Config {
    /// Loads the config, resolving relative paths against the config file's directory.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let config = std::fs::read_to_string(path)?;
        let Self {
            build_dir,
            output,
            flash_size,
            board,
            esptool,
            python,
        } = toml::from_str(&config)?;
        let base = path.parent().unwrap_or(Path::new(""));
        let resolve = |p: Option<PathBuf>| p.map(|p| base.join(p));
        Ok(Self {
            build_dir: resolve(build_dir),
            output: resolve(output),
            flash_size,
            board: resolve(board),
            esptool: resolve(esptool),
            python,
        })
    }
}

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Toml(toml::de::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Toml(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "failed to read config file: {e}"),
            Error::Toml(e) => write!(f, "config file format error in TOML: {e}"),
        }
    }
}

impl std::error::Error for Error {}
