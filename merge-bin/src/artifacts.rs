// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Locating the build artifacts that go into the merged image.

use consts::{APP_PATTERN, BOOTLOADER_PATTERN, PARTITION_TABLE_PATTERN};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name glob supporting `*` and `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern(Vec<char>);

impl Pattern {
    pub fn new(pattern: &str) -> Self {
        Self(pattern.chars().collect())
    }

    pub fn matches(&self, name: &str) -> bool {
        let name: Vec<char> = name.chars().collect();
        let pattern = &self.0;
        let (mut p, mut n) = (0, 0);
        // Position of the last `*` seen and the name index it currently absorbs up to.
        let mut star: Option<(usize, usize)> = None;

        while n < name.len() {
            match pattern.get(p).copied() {
                Some('*') => {
                    star = Some((p, n));
                    p += 1;
                }
                Some('?') => {
                    p += 1;
                    n += 1;
                }
                Some(c) if c == name[n] => {
                    p += 1;
                    n += 1;
                }
                _ => match star {
                    Some((star_p, star_n)) => {
                        p = star_p + 1;
                        n = star_n + 1;
                        star = Some((star_p, star_n + 1));
                    }
                    None => return false,
                },
            }
        }

        pattern[p..].iter().all(|c| *c == '*')
    }
}

/// Returns the first file of `dir`, in path order, whose name matches `pattern`.
///
/// A build directory that doesn't exist has no artifacts in it.
pub fn pick(dir: &Path, pattern: &Pattern) -> io::Result<Option<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if pattern.matches(name) && path.is_file() {
            matches.push(path);
        }
    }
    matches.sort();

    Ok(matches.into_iter().next())
}

/// What the build directory has to offer, each input possibly absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub bootloader: Option<PathBuf>,
    pub partitions: Option<PathBuf>,
    pub firmware: Option<PathBuf>,
}

/// All three inputs of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs {
    pub bootloader: PathBuf,
    pub partitions: PathBuf,
    pub firmware: PathBuf,
}

impl Artifacts {
    pub fn locate(build_dir: &Path) -> io::Result<Self> {
        let artifacts = Self {
            bootloader: pick(build_dir, &Pattern::new(BOOTLOADER_PATTERN))?,
            partitions: pick(build_dir, &Pattern::new(PARTITION_TABLE_PATTERN))?,
            firmware: pick(build_dir, &Pattern::new(APP_PATTERN))?,
        };
        tracing::debug!("Located artifacts in {}: {artifacts}", build_dir.display());
        Ok(artifacts)
    }

    pub fn complete(&self) -> Option<Inputs> {
        Some(Inputs {
            bootloader: self.bootloader.clone()?,
            partitions: self.partitions.clone()?,
            firmware: self.firmware.clone()?,
        })
    }
}

impl fmt::Display for Artifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bootloader={}, partitions={}, firmware={}",
            MaybePath(self.bootloader.as_deref()),
            MaybePath(self.partitions.as_deref()),
            MaybePath(self.firmware.as_deref()),
        )
    }
}

/// Displays a path, or `None` when there is none.
#[derive(Debug, Clone, Copy)]
pub struct MaybePath<'a>(pub Option<&'a Path>);

impl fmt::Display for MaybePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(path) => write!(f, "{}", path.display()),
            None => f.write_str("None"),
        }
    }
}
