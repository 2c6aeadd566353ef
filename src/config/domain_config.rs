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

//! Domain description file parsing.
//!
//! The config file is the userspace stand-in for the devicetree data the kernel
//! driver reads at probe time: which clusters feed the DSU domain, the per-cluster
//! CPU-to-DSU frequency mapping tables, the cross-domain constraint tables handed
//! to the arbiter, and optional initial QoS bounds.
//!
//! ```toml
//! [domain]
//! id = 0
//! compatible = "generic"
//! device_dir = "/sys/class/dsufreq/dsu0/"
//!
//! [[cluster]]
//! name = "cl0"
//! table = [[576000, 288000], [1248000, 624000], [2208000, 1104000]]
//!
//! [[constraint]]
//! master = "cpucl0"
//! table = [[288000, 576000], [624000, 1248000]]
//!
//! [qos]
//! min_khz = 288000
//! max_khz = 1104000
//! ```
//!
//! Cluster tables are interleaved `[cpu_khz, dsu_khz]` rows, ascending in the DSU
//! column. Tables exported from zero-padded firmware arrays keep their padding; a
//! row whose DSU frequency is zero terminates the cluster's list here, so the rest
//! of the daemon only ever sees explicit-length tables.

use crate::config;
use crate::error::DsufreqError;
use crate::system_io::fs_read;
use log::{trace, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// This is the top level struct which holds all sections
#[derive(Debug, Deserialize)]
pub(crate) struct TomlConfig {
    domain: Option<DomainSection>,
    #[serde(default, rename = "cluster")]
    clusters: Vec<ClusterSection>,
    #[serde(default, rename = "constraint")]
    constraints: Vec<ConstraintSection>,
    qos: Option<QosSection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainSection {
    id: Option<u32>,
    compatible: Option<String>,
    device_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClusterSection {
    name: String,
    table: Vec<[u64; 2]>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConstraintSection {
    master: String,
    table: Vec<[u64; 2]>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QosSection {
    min_khz: Option<u64>,
    max_khz: Option<u64>,
}

/// One cluster's contribution to the DSU frequency table, already stripped of
/// zero padding. `dsu_khz` is the ascending DSU column of the mapping table.
#[derive(Debug, Clone)]
pub struct ClusterTable {
    pub name: String,
    pub dsu_khz: Vec<u64>,
}

/// One cross-domain constraint table destined for the arbiter.
#[derive(Debug, Clone)]
pub struct ConstraintTable {
    pub master: String,
    pub rows: Vec<(u64, u64)>,
}

/// The fully resolved domain description consumed by daemon bring-up.
#[derive(Debug)]
pub struct DomainConfig {
    pub id: u32,
    pub compatible: String,
    pub device_dir: PathBuf,
    pub clusters: Vec<ClusterTable>,
    pub constraints: Vec<ConstraintTable>,
    pub qos_min_khz: Option<u64>,
    pub qos_max_khz: Option<u64>,
}

fn toml_str_to_config(toml_string: &str, file: &Path) -> Result<TomlConfig, DsufreqError> {
    toml::from_str(toml_string).map_err(|e| DsufreqError::TomlDe {
        file: file.into(),
        e: Box::new(e),
    })
}

/// Truncate an interleaved `[cpu_khz, dsu_khz]` row list at the first zero row
/// and return the DSU column.
///
/// Firmware exports these tables as fixed-size arrays padded with zeros; a zero
/// in either column means "end of valid entries", never a real frequency.
fn dsu_column(name: &str, rows: &[[u64; 2]]) -> Vec<u64> {
    let valid = rows
        .iter()
        .take_while(|row| row[0] != 0 && row[1] != 0)
        .count();
    if valid < rows.len() {
        trace!(
            "cluster {name}: dropping {} zero-padded rows",
            rows.len() - valid
        );
    }
    rows[..valid].iter().map(|row| row[1]).collect()
}

fn cluster_from_section(section: ClusterSection) -> Result<ClusterTable, DsufreqError> {
    let dsu_khz = dsu_column(&section.name, &section.table);
    // The merge step takes ascending input as a precondition, so enforce it at
    // the boundary where foreign data enters.
    if dsu_khz.windows(2).any(|w| w[0] >= w[1]) {
        return Err(DsufreqError::Argument(format!(
            "cluster {:?}: DSU column must be strictly ascending, got {dsu_khz:?}",
            section.name
        )));
    }
    Ok(ClusterTable {
        name: section.name,
        dsu_khz,
    })
}

/// Load and resolve the domain description from a TOML file.
///
/// Missing optional fields fall back to the compiled-in defaults in [`crate::config`];
/// a missing or malformed file is fatal, as is a cluster table that violates the
/// ascending-order contract.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML domain description
///
/// # Returns: `Result<DomainConfig, DsufreqError>`
/// * `Ok(DomainConfig)` - Resolved description ready for bring-up
/// * `Err(DsufreqError::IORead)` - File could not be read
/// * `Err(DsufreqError::TomlDe)` - File is not valid TOML for this schema
/// * `Err(DsufreqError::Argument)` - A cluster table is not ascending
pub fn domain_config_from_file(file_path: &Path) -> Result<DomainConfig, DsufreqError> {
    let config = toml_str_to_config(&fs_read(file_path)?, file_path)?;
    resolve(config)
}

fn resolve(config: TomlConfig) -> Result<DomainConfig, DsufreqError> {
    let domain = config.domain.unwrap_or(DomainSection {
        id: None,
        compatible: None,
        device_dir: None,
    });
    let clusters = config
        .clusters
        .into_iter()
        .map(cluster_from_section)
        .collect::<Result<Vec<_>, _>>()?;
    if clusters.is_empty() {
        warn!("domain description declares no cluster tables");
    }
    let constraints = config
        .constraints
        .into_iter()
        .map(|section| ConstraintTable {
            master: section.master,
            rows: section.table.iter().map(|row| (row[0], row[1])).collect(),
        })
        .collect();
    let (qos_min_khz, qos_max_khz) = match config.qos {
        Some(qos) => (qos.min_khz, qos.max_khz),
        None => (None, None),
    };
    Ok(DomainConfig {
        id: domain.id.unwrap_or(0),
        compatible: domain.compatible.unwrap_or_else(|| {
            trace!("No compatible string provided. Using hardcoded value.");
            config::FALLBACK_COMPATIBLE.to_string()
        }),
        device_dir: PathBuf::from(domain.device_dir.unwrap_or_else(|| {
            trace!("No device_dir provided. Using hardcoded value.");
            config::DEFAULT_DEVICE_DIR.to_string()
        })),
        clusters,
        constraints,
        qos_min_khz,
        qos_max_khz,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use rstest::*;

    const FULL: &str = r#"
        [domain]
        id = 2
        compatible = "samsung,exynos-dsu"
        device_dir = "/sys/class/dsufreq/dsu2/"

        [[cluster]]
        name = "cl0"
        table = [[576000, 288000], [1248000, 624000], [2208000, 1104000]]

        [[cluster]]
        name = "cl1"
        table = [[672000, 336000], [1248000, 624000], [0, 0], [0, 0]]

        [[constraint]]
        master = "cpucl0"
        table = [[288000, 576000], [624000, 1248000]]

        [qos]
        min_khz = 288000
    "#;

    #[gtest]
    fn test_full_config_resolves() {
        let config = resolve(toml_str_to_config(FULL, Path::new("test.toml")).unwrap()).unwrap();
        expect_that!(config.id, eq(2));
        expect_that!(config.compatible, eq("samsung,exynos-dsu"));
        expect_that!(
            config.device_dir.to_str().unwrap(),
            eq("/sys/class/dsufreq/dsu2/")
        );
        expect_that!(config.clusters.len(), eq(2));
        expect_that!(config.clusters[0].dsu_khz, container_eq([288000, 624000, 1104000]));
        expect_that!(config.constraints.len(), eq(1));
        expect_that!(config.qos_min_khz, some(eq(288000)));
        expect_that!(config.qos_max_khz, none());
    }

    #[gtest]
    fn test_zero_row_terminates_cluster_table() {
        let config = resolve(toml_str_to_config(FULL, Path::new("test.toml")).unwrap()).unwrap();
        assert_that!(config.clusters[1].dsu_khz, container_eq([336000, 624000]));
    }

    #[gtest]
    fn test_empty_config_uses_fallbacks() {
        let config = resolve(toml_str_to_config("", Path::new("test.toml")).unwrap()).unwrap();
        expect_that!(config.id, eq(0));
        expect_that!(config.compatible, eq(config::FALLBACK_COMPATIBLE));
        expect_that!(
            config.device_dir.to_str().unwrap(),
            eq(config::DEFAULT_DEVICE_DIR)
        );
        expect_that!(config.clusters, is_empty());
    }

    #[gtest]
    #[rstest]
    #[case::descending("[[cluster]]\nname = \"c\"\ntable = [[2, 2], [1, 1]]")]
    #[case::duplicate("[[cluster]]\nname = \"c\"\ntable = [[1, 5], [2, 5]]")]
    fn test_non_ascending_cluster_rejected(#[case] toml_string: &str) {
        let result = resolve(toml_str_to_config(toml_string, Path::new("test.toml")).unwrap());
        assert!(matches!(result, Err(DsufreqError::Argument(_))));
    }

    #[gtest]
    fn test_bad_toml_is_rejected() {
        let result = toml_str_to_config("[domain", Path::new("test.toml"));
        assert!(matches!(result, Err(DsufreqError::TomlDe { .. })));
    }
}
