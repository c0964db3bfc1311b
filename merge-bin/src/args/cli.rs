// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command line arguments.

use std::path::PathBuf;

#[derive(clap::Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
    /// Log every step, including the full esptool command line.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand)]
pub enum Command {
    /// Merge bootloader, partition table and application into one flashable image:
    /// 0x0     bootloader*.bin
    /// 0x8000  partitions*.bin
    /// 0x10000 firmware*.bin
    #[command(verbatim_doc_comment)]
    Merge {
        /// Directory holding the build artifacts.
        #[clap(short, long)]
        build_dir: Option<PathBuf>,
        /// Where to write the merged image, defaults to merged-firmware.bin in the build directory.
        #[clap(short, long)]
        output: Option<PathBuf>,
        /// Flash size, e.g. 4MB, 8MB, 16MB, keep or detect.
        #[clap(long)]
        flash_size: Option<String>,
        /// PlatformIO board manifest (JSON) to take upload.flash_size from.
        #[clap(long)]
        board: Option<PathBuf>,
        /// Path to esptool.py, instead of the one in PlatformIO's packages.
        #[clap(long)]
        esptool: Option<PathBuf>,
        /// Python interpreter running esptool.py.
        #[clap(long)]
        python: Option<PathBuf>,
        /// Path to config file.
        #[clap(short, long)]
        config: Option<PathBuf>,
        /// Print the esptool command instead of running it.
        #[clap(long)]
        dry_run: bool,
    },
    /// Show which inputs and which esptool a merge would use.
    Locate {
        /// Directory holding the build artifacts.
        #[clap(short, long)]
        build_dir: Option<PathBuf>,
        /// Path to esptool.py, instead of the one in PlatformIO's packages.
        #[clap(long)]
        esptool: Option<PathBuf>,
        /// Path to config file.
        #[clap(short, long)]
        config: Option<PathBuf>,
    },
}
