// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! PlatformIO board manifests, read for their upload settings.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub upload: Upload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Upload {
    #[serde(default)]
    pub flash_size: Option<String>,
}

impl Board {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let board = std::fs::read(path)?;
        serde_json::from_slice(&board).map_err(Into::into)
    }

    pub fn flash_size(&self) -> Option<&str> {
        self.upload.flash_size.as_deref()
    }
}

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "failed to read board manifest: {e}"),
            Error::Json(e) => write!(f, "board manifest format error in JSON: {e}"),
        }
    }
}

impl std::error::Error for Error {}
