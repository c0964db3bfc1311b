// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Flash layout of the merged image.

use consts::{APP_ADDR, BOOTLOADER_ADDR, PARTITION_TABLE_ADDR};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Flash chip size as esptool spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashSize {
    Mb1,
    Mb2,
    Mb4,
    #[default]
    Mb8,
    Mb16,
    Mb32,
    Mb64,
    Mb128,
    /// Keep whatever the bootloader header already says.
    Keep,
    /// Let esptool probe the attached chip.
    Detect,
}

impl FlashSize {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashSize::Mb1 => "1MB",
            FlashSize::Mb2 => "2MB",
            FlashSize::Mb4 => "4MB",
            FlashSize::Mb8 => "8MB",
            FlashSize::Mb16 => "16MB",
            FlashSize::Mb32 => "32MB",
            FlashSize::Mb64 => "64MB",
            FlashSize::Mb128 => "128MB",
            FlashSize::Keep => "keep",
            FlashSize::Detect => "detect",
        }
    }
}

impl fmt::Display for FlashSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlashSize {
    type Err = ParseFlashSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1mb" => Ok(FlashSize::Mb1),
            "2mb" => Ok(FlashSize::Mb2),
            "4mb" => Ok(FlashSize::Mb4),
            "8mb" => Ok(FlashSize::Mb8),
            "16mb" => Ok(FlashSize::Mb16),
            "32mb" => Ok(FlashSize::Mb32),
            "64mb" => Ok(FlashSize::Mb64),
            "128mb" => Ok(FlashSize::Mb128),
            "keep" => Ok(FlashSize::Keep),
            "detect" => Ok(FlashSize::Detect),
            _ => Err(ParseFlashSizeError(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFlashSizeError(String);

impl fmt::Display for ParseFlashSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"invalid flash size "{}", expected one of 1MB, 2MB, 4MB, 8MB, 16MB, 32MB, 64MB, 128MB, keep, detect"#,
            self.0
        )
    }
}

impl std::error::Error for ParseFlashSizeError {}

/// The regions of flash one merged image covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Bootloader,
    PartitionTable,
    App,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Bootloader, Region::PartitionTable, Region::App];

    pub fn addr(self) -> u32 {
        match self {
            Region::Bootloader => BOOTLOADER_ADDR,
            Region::PartitionTable => PARTITION_TABLE_ADDR,
            Region::App => APP_ADDR,
        }
    }

    /// Space available before the next region starts. The app runs to the
    /// end of its partition, which only the partition table knows.
    pub fn slot_size(self) -> Option<u32> {
        match self {
            Region::Bootloader => Some(PARTITION_TABLE_ADDR - BOOTLOADER_ADDR),
            Region::PartitionTable => Some(APP_ADDR - PARTITION_TABLE_ADDR),
            Region::App => None,
        }
    }

    /// Offset as passed to esptool, e.g. `0x8000`.
    pub fn offset_arg(self) -> String {
        format!("{:#x}", self.addr())
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::Bootloader => "bootloader",
            Region::PartitionTable => "partitions",
            Region::App => "firmware",
        }
    }
}

/// Logs the size of `image` and how much of its region it fills.
pub fn report_size(region: Region, image: &Path) {
    let Ok(metadata) = fs::metadata(image) else {
        tracing::warn!("Could not read binary metadata for: {}", image.display());
        return;
    };
    let size_bytes = metadata.len();
    let human = humansize::format_size(size_bytes, humansize::BINARY);

    match region.slot_size() {
        Some(slot) => {
            let usage_percentage = (size_bytes as f64 / slot as f64) * 100.0;
            if size_bytes > u64::from(slot) {
                tracing::warn!(
                    "{} is {human} ({size_bytes} bytes), overflowing the {slot} bytes before {:#x}",
                    region.name(),
                    region.addr() + slot,
                );
            } else {
                tracing::info!(
                    "{} size: {human} ({size_bytes} bytes), {usage_percentage:.1}% of {slot} bytes available",
                    region.name(),
                );
            }
        }
        None => tracing::info!("{} size: {human} ({size_bytes} bytes)", region.name()),
    }
}
