// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]

/// Target chip passed to esptool's `--chip`.
pub const CHIP: &str = "esp32s3";

/// SPI flash mode written into the merged image header.
pub const FLASH_MODE: &str = "dio";

/// SPI flash frequency written into the merged image header.
pub const FLASH_FREQ: &str = "80m";

/// Flash size used when neither the user nor the board manifest provide one.
pub const DEFAULT_FLASH_SIZE: &str = "8MB";

/// Flash offset of the second stage bootloader.
/// On the ESP32-S3 the ROM loads the bootloader from the very start of flash.
pub const BOOTLOADER_ADDR: u32 = 0x0;

/// Flash offset of the partition table.
/// The bootloader has everything below this address available.
pub const PARTITION_TABLE_ADDR: u32 = 0x8000;

/// Flash offset of the application image (first app partition).
pub const APP_ADDR: u32 = 0x10000;

/// File name pattern of the bootloader binary in the build directory.
pub const BOOTLOADER_PATTERN: &str = "bootloader*.bin";

/// File name pattern of the partition table binary in the build directory.
pub const PARTITION_TABLE_PATTERN: &str = "partitions*.bin";

/// File name pattern of the application binary in the build directory.
pub const APP_PATTERN: &str = "firmware*.bin";

/// Name of the combined image, written next to its inputs.
pub const MERGED_IMAGE_NAME: &str = "merged-firmware.bin";

/// PlatformIO package shipping esptool.
pub const ESPTOOL_PACKAGE: &str = "tool-esptoolpy";

/// Entry script inside [`ESPTOOL_PACKAGE`].
pub const ESPTOOL_SCRIPT: &str = "esptool.py";

/// Interpreter used when the environment doesn't name one.
pub const DEFAULT_PYTHON: &str = "python";
