//! Link coverage diagnostics run ahead of the merges.
//!
//! The counts are informational: they never fail a run and never change
//! a merge result. A missing collection is still an error.

use anyhow::{Context, Result};
use tabsync_core::diagnostics::{linkage_report, LinkageReport};
use tabsync_core::store::DocumentStore;
use tracing::{info, warn};

use crate::config::{Config, LinkageSpec};
use crate::materialize::read_table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkageCheck {
    pub spec: LinkageSpec,
    pub report: LinkageReport,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiagnosticsReport {
    pub checks: Vec<LinkageCheck>,
}

impl DiagnosticsReport {
    pub fn print(&self) {
        println!("diagnose");
        for c in &self.checks {
            let s = &c.spec;
            println!("  {} ({} <- {} -> {})", s.name, s.left, s.link, s.right);
            println!("    {} absent from {}: {}", s.left, s.link, c.report.left_unlinked);
            println!("    {} absent from {}: {}", s.right, s.link, c.report.right_unlinked);
            println!(
                "    {} references missing from {}: {}",
                s.left_key, s.left, c.report.dangling_left
            );
            println!(
                "    {} references missing from {}: {}",
                s.right_key, s.right, c.report.dangling_right
            );
        }
        println!("ok");
    }
}

pub async fn check_linkage(
    store: &dyn DocumentStore,
    spec: &LinkageSpec,
    ordinal_field: &str,
) -> Result<LinkageReport> {
    let left = read_table(store, &spec.left, ordinal_field, &spec.name).await?;
    let right = read_table(store, &spec.right, ordinal_field, &spec.name).await?;
    let link = read_table(store, &spec.link, ordinal_field, &spec.name).await?;

    let report = linkage_report(&left, &spec.left_key, &right, &spec.right_key, &link)
        .with_context(|| format!("Cannot check linkage '{}'", spec.name))?;

    info!(
        linkage = %spec.name,
        left_unlinked = report.left_unlinked,
        right_unlinked = report.right_unlinked,
        dangling_left = report.dangling_left,
        dangling_right = report.dangling_right,
        "link coverage"
    );
    if report.dangling_left > 0 || report.dangling_right > 0 {
        warn!(
            linkage = %spec.name,
            link = %spec.link,
            "link table references entities that do not exist"
        );
    }
    Ok(report)
}

pub async fn run_diagnostics(
    config: &Config,
    store: &dyn DocumentStore,
) -> Result<DiagnosticsReport> {
    let mut report = DiagnosticsReport::default();
    for spec in &config.linkages {
        let result = check_linkage(store, spec, &config.source.ordinal_field).await?;
        report.checks.push(LinkageCheck {
            spec: spec.clone(),
            report: result,
        });
    }
    Ok(report)
}
