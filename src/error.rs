// This file is part of dsufreqd, a daemon that governs the frequency of the DSU clock domain from userspace.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// dsufreqd is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// dsufreqd is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

use log::error;
use std::path::PathBuf;
use zbus::fdo;

#[derive(Debug, thiserror::Error)]
pub enum DsufreqError {
    #[error(
        "DsufreqError::EmptyTable: no frequency between {min_khz} and {max_khz} kHz survived filtering"
    )]
    EmptyTable { min_khz: u64, max_khz: u64 },
    #[error("DsufreqError::Argument: {0}")]
    Argument(String),
    #[error("DsufreqError::Scaling: failed to program {khz} kHz: {e}")]
    Scaling { khz: u64, e: Box<DsufreqError> },
    #[error("DsufreqError::QosInit: QoS registration failed: {0}")]
    QosInit(String),
    #[error(
        "DsufreqError::ConstraintOversize: constraint table for master {master:?} has {rows} rows, keeping the first {max}"
    )]
    ConstraintOversize {
        master: String,
        rows: usize,
        max: usize,
    },
    #[error("DsufreqError::Parse: could not parse {what} from {raw:?} in {file:?}")]
    Parse {
        what: &'static str,
        raw: String,
        file: PathBuf,
    },
    #[error("DsufreqError::IORead: An IO error occurred when reading from {file:?}: {e}")]
    IORead { file: PathBuf, e: std::io::Error },
    #[error("DsufreqError::IOWrite: An IO error occurred when writing {data:?} to {file:?}: {e}")]
    IOWrite {
        data: String,
        file: PathBuf,
        e: std::io::Error,
    },
    #[error("DsufreqError::IOReadDir: An IO error occurred when reading directory {dir:?}: {e}")]
    IOReadDir { dir: PathBuf, e: std::io::Error },
    #[error("DsufreqError::TomlDe: could not parse config file {file:?}: {e}")]
    TomlDe {
        file: PathBuf,
        e: Box<toml::de::Error>,
    },
    #[error("DsufreqError::Internal: An Internal error occurred: {0}")]
    Internal(String),
}

impl From<DsufreqError> for fdo::Error {
    fn from(err: DsufreqError) -> Self {
        error!("{err}");
        match err {
            DsufreqError::Argument(..) => fdo::Error::InvalidArgs(err.to_string()),
            DsufreqError::IORead { .. } => fdo::Error::IOError(err.to_string()),
            DsufreqError::IOWrite { .. } => fdo::Error::IOError(err.to_string()),
            DsufreqError::IOReadDir { .. } => fdo::Error::IOError(err.to_string()),
            _ => fdo::Error::Failed(err.to_string()),
        }
    }
}
