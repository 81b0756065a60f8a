// Orchestrator: canonical phase, then bounded fan-out over dependent targets

use crate::dists::catalog::{Version, VersionCatalog};
use crate::dists::distribution::{CachePathResolver, DistributionTarget, VersionDistributions};
use crate::dists::error::Error;
use crate::dists::links;
use crate::dists::materialize::{MaterializeResult, Materializer};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;

/// A dependent target that could not be materialized
#[derive(Debug, Clone)]
pub struct TargetFailure {
    pub name: String,
    pub message: String,
}

/// Outcome of the dependent fan-out
#[derive(Debug, Default)]
pub struct FanOutReport {
    pub linked: usize,
    pub already_satisfied: usize,
    /// Targets never dispatched because the run was cancelled
    pub skipped: usize,
    pub failed: Vec<TargetFailure>,
}

impl FanOutReport {
    pub fn total(&self) -> usize {
        self.linked + self.already_satisfied + self.skipped + self.failed.len()
    }
}

/// Outcome of a full run
#[derive(Debug)]
pub struct RunSummary {
    pub current: String,
    pub canonical: Vec<(String, MaterializeResult)>,
    pub fan_out: FanOutReport,
}

pub struct Orchestrator {
    catalog: VersionCatalog,
    resolver: CachePathResolver,
    materializer: Arc<Materializer>,
    jobs: usize,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        catalog: VersionCatalog,
        resolver: CachePathResolver,
        materializer: Arc<Materializer>,
        jobs: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            resolver,
            materializer,
            jobs: jobs.max(1),
            cancel,
        }
    }

    /// Fetch the catalog, materialize the current version, then link everything else.
    ///
    /// Catalog errors and canonical-phase errors are returned; dependent failures
    /// only show up in the report.
    pub async fn run(&self) -> Result<RunSummary, Error> {
        let current = self.catalog.fetch_current().await?;
        let versions = self.catalog.fetch_all().await?;
        info!("Current version: {}", current);

        if !current.is_release() {
            warn!("Current version {} is not marked as a release", current);
        }

        let canonical = self.resolver.resolve_all(&current.version)?;
        if let Some(url) = &current.download_url {
            let expected = canonical.binary.remote_url().as_str();
            if url != expected {
                debug!(
                    "Catalog download URL {} differs from wrapper URL {}",
                    url, expected
                );
            }
        }

        // Dependents link into these homes, so they must be complete first
        let mut results = Vec::new();
        for target in canonical.iter() {
            let result = self.materializer.ensure(target, None).await?;
            results.push((target.qualified_name(), result));
        }

        self.refresh_current_link(&canonical).await;

        let fan_out = self.run_all(&versions, &canonical).await;

        Ok(RunSummary {
            current: current.version,
            canonical: results,
            fan_out,
        })
    }

    /// Link every release version except the canonical one into the canonical homes
    pub async fn run_all(
        &self,
        versions: &[Version],
        canonical: &VersionDistributions,
    ) -> FanOutReport {
        let (targets, rejected) = self.dependent_targets(versions, canonical);
        debug!(
            "Dispatching {} dependent target(s) on {} worker(s)",
            targets.len(),
            self.jobs
        );

        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut workers = JoinSet::new();
        let mut names = HashMap::new();
        let mut report = FanOutReport {
            failed: rejected,
            ..Default::default()
        };

        for target in targets {
            if self.cancel.is_cancelled() {
                report.skipped += 1;
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    report.skipped += 1;
                    continue;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let materializer = Arc::clone(&self.materializer);
            let canonical_home = canonical.get(target.classifier()).extracted_home_path();
            let name = target.to_string();
            let handle = workers.spawn(async move {
                let _permit = permit;
                let result = materializer.ensure(&target, Some(&canonical_home)).await;
                (target, result)
            });
            names.insert(handle.id(), name);
        }

        collect(workers, names, &mut report).await;
        report
    }

    /// Release targets to link, plus a failure for every version that cannot be resolved
    fn dependent_targets(
        &self,
        versions: &[Version],
        canonical: &VersionDistributions,
    ) -> (Vec<DistributionTarget>, Vec<TargetFailure>) {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        let mut rejected = Vec::new();

        for version in versions
            .iter()
            .filter(|v| v.is_release())
            .filter(|v| v.version != canonical.version())
        {
            if !seen.insert(version.version.as_str()) {
                continue;
            }
            match self.resolver.resolve_all(&version.version) {
                Ok(dists) => targets.extend(dists),
                Err(err) => {
                    info!("Skipping catalog entry: {}", err);
                    rejected.push(TargetFailure {
                        name: format!("gradle-{}", version.version),
                        message: err.to_string(),
                    });
                }
            }
        }

        (targets, rejected)
    }

    /// Point `<dists>/current` at the canonical full distribution
    async fn refresh_current_link(&self, canonical: &VersionDistributions) {
        let link = self.resolver.current_link();
        let target = canonical.full.extracted_home_path();

        match tokio::fs::symlink_metadata(&link).await {
            Ok(meta) if !meta.file_type().is_symlink() => {
                warn!(
                    "{} exists and is not a link; leaving it alone",
                    link.display()
                );
                return;
            }
            Ok(_) => {
                if let Err(e) = links::remove_symlink(&link).await {
                    warn!("Failed to remove {}: {}", link.display(), e);
                    return;
                }
            }
            Err(_) => {}
        }

        if let Err(e) = links::create_relative_symlink(&link, &target).await {
            warn!("Failed to link {}: {}", link.display(), e);
        }
    }
}

type WorkerOutput = (DistributionTarget, Result<MaterializeResult, Error>);

/// Drain finished workers into `report`; `names` identifies workers that panicked
async fn collect(
    mut workers: JoinSet<WorkerOutput>,
    mut names: HashMap<task::Id, String>,
    report: &mut FanOutReport,
) {
    while let Some(joined) = workers.join_next_with_id().await {
        match joined {
            Ok((_, (_, Ok(MaterializeResult::Linked)))) => report.linked += 1,
            Ok((_, (_, Ok(_)))) => report.already_satisfied += 1,
            Ok((_, (target, Err(err)))) => {
                let message = format!("{:#}", anyhow::Error::new(err));
                info!("{} failed: {}", target, message);
                report.failed.push(TargetFailure {
                    name: target.to_string(),
                    message,
                });
            }
            Err(err) => {
                let name = names
                    .remove(&err.id())
                    .unwrap_or_else(|| "<worker>".to_string());
                warn!("Worker for {} failed: {}", name, err);
                report.failed.push(TargetFailure {
                    name,
                    message: err.to_string(),
                });
            }
        }
    }
}
