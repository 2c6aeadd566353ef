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

//! Command-line client for the dsufreqd daemon.
//!
//! Talks to the daemon over the system DBus. Commands map one-to-one onto the
//! daemon's status and control interface methods.

use clap::{Parser, Subcommand, command};
use log::debug;

mod proxies;
mod set;
mod status;

#[derive(Parser, Debug)]
#[command(name = "dsufreq")]
#[command(bin_name = "dsufreq")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the domain overview: bounds, current frequency, frequency table
    Status,
    /// Show per-frequency residency and the transition counter
    Stats,
    /// Request a frequency change
    SetTarget {
        /// Requested frequency in kHz
        khz: u64,
        /// Rounding relation when the request is not a table entry: "up" or "down"
        #[arg(long, default_value = "up")]
        relation: String,
    },
    /// Set the minimum-frequency QoS request
    SetMin {
        /// Minimum frequency in kHz
        khz: u64,
    },
    /// Set the maximum-frequency QoS request
    SetMax {
        /// Maximum frequency in kHz
        khz: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    debug!("parsed cli command with {cli:?}");
    let output = match cli.command {
        Commands::Status => status::status_handler().await?,
        Commands::Stats => status::stats_handler().await?,
        Commands::SetTarget { khz, relation } => set::set_target_handler(khz, &relation).await?,
        Commands::SetMin { khz } => set::set_min_handler(khz).await?,
        Commands::SetMax { khz } => set::set_max_handler(khz).await?,
    };
    println!("{output}");
    Ok(())
}
