// Sync command: materialize the current version and link every other release to it

use crate::config::Settings;
use crate::dists::{
    CachePathResolver, Error, HttpTransport, MaterializeResult, Materializer, Orchestrator,
    RunSummary, VersionCatalog, ZipExtractor,
};
use crate::ui;
use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn sync_distributions(settings: &Settings, cancel: CancellationToken) -> anyhow::Result<i32> {
    let transport = Arc::new(
        HttpTransport::new(&settings.transport, cancel.clone())
            .context("Failed to set up the HTTP client")?,
    );
    let resolver = CachePathResolver::new(&settings.gradle_user_home, &settings.distributions_url)?;
    let catalog = VersionCatalog::new(
        transport.clone(),
        settings.current_version_url(),
        settings.all_versions_url(),
    );
    let materializer = Arc::new(Materializer::new(
        transport,
        Arc::new(ZipExtractor),
        Arc::new(ui::ProgressReporter::new()),
    ));

    ui::action(&format!(
        "Syncing wrapper distributions in {}",
        resolver.dists_dir().display()
    ));

    let orchestrator = Orchestrator::new(catalog, resolver, materializer, settings.jobs, cancel);
    let summary = match orchestrator.run().await {
        Ok(summary) => summary,
        Err(err) => {
            if is_transient(&err) {
                ui::dim("The failure looks transient; running sync again may succeed.");
            }
            return Err(err).context("Sync failed");
        }
    };

    print_summary(&summary);
    Ok(0)
}

fn is_transient(err: &Error) -> bool {
    match err {
        Error::CatalogFetch { source, .. } | Error::Download { source, .. } => {
            source.is_retryable()
        }
        _ => false,
    }
}

fn print_summary(summary: &RunSummary) {
    for (name, result) in &summary.canonical {
        match result {
            MaterializeResult::Downloaded => ui::success(&format!("{} downloaded", name)),
            _ => ui::success(&format!("{} already present", name)),
        }
    }

    let report = &summary.fan_out;
    for failure in &report.failed {
        ui::warning(&format!("{}: {}", failure.name, failure.message));
    }
    if report.skipped > 0 {
        ui::warning(&format!(
            "Interrupted: {} distribution(s) were not processed",
            report.skipped
        ));
    }

    ui::status(
        "Linked",
        &format!(
            "{} of {} distribution(s) to gradle-{} ({} already present, {} failed)",
            report.linked,
            report.total(),
            summary.current,
            report.already_satisfied,
            report.failed.len()
        ),
    );
}
