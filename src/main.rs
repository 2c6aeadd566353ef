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

//! DSU frequency governor daemon (dsufreqd).
//!
//! This is the main entry point for dsufreqd, which governs the frequency of a
//! DSU (DynamIQ Shared Unit) clock domain from userspace. The daemon:
//! - Builds the domain's legal frequency table from the per-cluster mapping
//!   tables in the domain description file
//! - Registers the domain, its constraint tables and its scaling callback with
//!   the frequency arbiter
//! - Aggregates minimum/maximum frequency QoS requests into the active window
//! - Exposes two DBus interfaces: `control` and `status`
//!
//! # DBus Service
//!
//! - **Service Name**: `org.dsufreq`
//! - **Status Interface**: `/org/dsufreq/status` - Read-only operations
//! - **Control Interface**: `/org/dsufreq/control` - Write operations
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (`trace`, `debug`, `info`, `warn`,
//!   `error` or `off`). Defaults to `info`
//! - `DSUFREQD_CONFIG` - Path of the domain description file. Defaults to
//!   `/etc/dsufreqd/config.toml`
//!
//! # Architecture
//!
//! Hardware access goes through a clock backend selected by compatibility
//! string, so SoC-specific clock layers can be added without touching the
//! governor. At startup, the daemon:
//! 1. Registers all available clock backends
//! 2. Loads the domain description and probes the matching backend
//! 3. Brings up the governor and registers it with the arbiter
//! 4. Seeds the QoS requests and connects the aggregator to the governor
//! 5. Connects to the system DBus, advertises the service and waits for
//!    incoming requests

use log::{error, info};
use std::error::Error;
use std::future::pending;
use std::path::Path;
use std::sync::Arc;
use zbus::connection;

use dsufreqd::arbiter::FreqArbiter;
use dsufreqd::backends::backend::backend_for_domain;
use dsufreqd::backends::sysfs::SysfsBackend;
use dsufreqd::comm::dbus::{control_interface::ControlInterface, status_interface::StatusInterface};
use dsufreqd::config;
use dsufreqd::config::domain_config::domain_config_from_file;
use dsufreqd::governor::Governor;
use dsufreqd::governor::qos::{QosAggregator, QosKind};

/// Register all available clock backend implementations.
///
/// SoC-specific backends would be registered here ahead of the generic one so
/// their compatibility strings match first.
fn register_backends() {
    SysfsBackend::register();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    register_backends();

    let config_path = std::env::var("DSUFREQD_CONFIG")
        .unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let domain = domain_config_from_file(Path::new(&config_path))?;

    let backend = backend_for_domain(&domain.compatible, &domain.device_dir)?;
    let governor = Arc::new(Governor::new(domain.id, &domain.clusters, backend)?);
    let arbiter = Arc::new(FreqArbiter::new());
    governor.register_with(&arbiter, &domain.constraints)?;

    let qos = Arc::new(QosAggregator::new(
        governor.min_khz_orig(),
        governor.max_khz_orig(),
    ));
    let min_handle = qos.add_request(QosKind::Min, governor.min_khz_orig());
    let max_handle = qos.add_request(QosKind::Max, governor.max_khz_orig());
    {
        let governor = Arc::clone(&governor);
        let arbiter = Arc::clone(&arbiter);
        qos.register_change_notifier(move |min_khz, max_khz| {
            let (min_khz, max_khz) = governor.apply_limits(min_khz, max_khz);
            if let Err(e) = arbiter.update_window(governor.domain_id(), min_khz, max_khz) {
                error!("failed to push QoS window to arbiter: {e}");
            }
        })?;
    }
    // Push the configured initial bounds through the aggregator so the
    // governor and arbiter see them like any later request.
    qos.update_request(min_handle, domain.qos_min_khz.unwrap_or(governor.min_khz_orig()))?;
    qos.update_request(max_handle, domain.qos_max_khz.unwrap_or(governor.max_khz_orig()))?;

    let status_interface = StatusInterface {
        governor: Arc::clone(&governor),
        arbiter: Arc::clone(&arbiter),
    };
    let control_interface = ControlInterface {
        arbiter,
        qos,
        domain_id: governor.domain_id(),
        min_handle,
        max_handle,
    };

    let _conn = connection::Builder::system()?
        .name("org.dsufreq")?
        .serve_at("/org/dsufreq/status", status_interface)?
        .serve_at("/org/dsufreq/control", control_interface)?
        .build()
        .await?;

    info!("Started org.dsufreq dbus service");
    // Do other things or go to wait forever
    pending::<()>().await;

    Ok(())
}
