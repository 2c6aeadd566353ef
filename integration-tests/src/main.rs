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

//! End-to-end exerciser for a running dsufreqd daemon.
//!
//! Drives the live DBus service on the system bus, so it must run on a machine
//! (or in a CI container) where the daemon is up with a known domain
//! description. Exits non-zero on the first failed check.

use clap::Parser;
use log::{error, info};
use zbus::{Connection, Result, proxy};

#[proxy(
    default_service = "org.dsufreq",
    interface = "org.dsufreq.status",
    default_path = "/org/dsufreq/status"
)]
trait Status {
    async fn get_current_frequency(&self) -> Result<u64>;
    async fn get_available_frequencies(&self) -> Result<Vec<u64>>;
    async fn get_limits(&self) -> Result<(u64, u64)>;
    async fn get_total_transitions(&self) -> Result<u64>;
}

#[proxy(
    default_service = "org.dsufreq",
    interface = "org.dsufreq.control",
    default_path = "/org/dsufreq/control"
)]
trait Control {
    async fn set_target_frequency(&self, khz: u64, relation: &str) -> Result<String>;
    async fn set_min_frequency(&self, khz: u64) -> Result<String>;
    async fn set_max_frequency(&self, khz: u64) -> Result<String>;
}

#[derive(Parser, Debug)]
struct Args {
    /// Frequency (kHz) to request during the scaling check; defaults to the
    /// domain's table maximum.
    #[arg(long)]
    target_khz: Option<u64>,
}

struct Failures(u32);

impl Failures {
    fn check(&mut self, what: &str, ok: bool) {
        if ok {
            info!("ok: {what}");
        } else {
            error!("FAILED: {what}");
            self.0 += 1;
        }
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut failures = Failures(0);

    let connection = Connection::system().await?;
    let status = StatusProxy::new(&connection).await?;
    let control = ControlProxy::new(&connection).await?;

    let table = status.get_available_frequencies().await?;
    failures.check("frequency table is non-empty", !table.is_empty());
    failures.check(
        "frequency table is ascending and unique",
        table.windows(2).all(|w| w[0] < w[1]),
    );

    let current_khz = status.get_current_frequency().await?;
    failures.check("current frequency is a table entry", table.contains(&current_khz));

    let (min_khz, max_khz) = status.get_limits().await?;
    failures.check("window is ordered", min_khz <= max_khz);

    let target_khz = args.target_khz.unwrap_or(*table.last().unwrap());
    let transitions_before = status.get_total_transitions().await?;
    let reply = control.set_target_frequency(target_khz, "up").await?;
    info!("{reply}");
    let settled_khz = status.get_current_frequency().await?;
    failures.check("scaling lands on a table entry", table.contains(&settled_khz));
    let transitions_after = status.get_total_transitions().await?;
    failures.check(
        "transition counter moves only on a real change",
        if settled_khz == current_khz {
            transitions_after == transitions_before
        } else {
            transitions_after == transitions_before + 1
        },
    );

    // An impossible window must clamp, not wedge the daemon.
    control.set_min_frequency(0).await?;
    control.set_max_frequency(u64::MAX).await?;
    let (min_khz, max_khz) = status.get_limits().await?;
    failures.check("window clamps to the absolute bounds", min_khz <= max_khz);

    let relation_err = control.set_target_frequency(target_khz, "sideways").await;
    failures.check("bad relation is rejected", relation_err.is_err());

    if failures.0 > 0 {
        Err(format!("{} check(s) failed", failures.0).into())
    } else {
        info!("all checks passed");
        Ok(())
    }
}
