// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::esptool::MergeCommand;
use std::fmt;
use std::io;
use std::process::{Command, ExitStatus};

/// Executes a merge command.
pub trait Runner {
    fn run(&mut self, command: &MergeCommand) -> io::Result<RunStatus>;
}

/// Runs esptool as a child process sharing our stdio, so its progress shows up in the build log.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&mut self, command: &MergeCommand) -> io::Result<RunStatus> {
        Command::new(command.program())
            .args(command.args())
            .status()
            .map(Into::into)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl RunStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for RunStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}
