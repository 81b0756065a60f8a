// Status command: report which release distributions the cache already satisfies

use crate::config::Settings;
use crate::constants;
use crate::dists::{
    CachePathResolver, DistributionTarget, HttpTransport, Version, VersionCatalog, is_satisfied,
};
use crate::ui;
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum TargetState {
    /// Real extracted tree
    Present,
    /// Symlink into another version's home
    Linked,
    Missing,
}

#[derive(Debug, Serialize)]
struct TargetInfo {
    name: String,
    version: String,
    classifier: String,
    state: TargetState,
    home: String,
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    total: usize,
    present: usize,
    linked: usize,
    missing: usize,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    schema_version: u32,
    status: String,
    exit_code: i32,
    current: String,
    dists_dir: String,
    summary: Summary,
    targets: Vec<TargetInfo>,
}

pub async fn show_status(settings: &Settings, json: bool) -> anyhow::Result<i32> {
    let transport = Arc::new(
        HttpTransport::new(&settings.transport, CancellationToken::new())
            .context("Failed to set up the HTTP client")?,
    );
    let resolver = CachePathResolver::new(&settings.gradle_user_home, &settings.distributions_url)?;
    let catalog = VersionCatalog::new(
        transport,
        settings.current_version_url(),
        settings.all_versions_url(),
    );

    let pb = (!json).then(|| ui::spinner("Fetching version catalog"));
    let fetched = async {
        let current = catalog.fetch_current().await?;
        let versions = catalog.fetch_all().await?;
        Ok::<_, crate::dists::Error>((current, versions))
    }
    .await;
    let (current, versions) = match fetched {
        Ok(fetched) => {
            if let Some(pb) = &pb {
                ui::finish_spinner_success(
                    pb,
                    &format!("Fetched version catalog ({} versions)", fetched.1.len()),
                );
            }
            fetched
        }
        Err(err) => {
            if let Some(pb) = &pb {
                ui::finish_spinner_error(pb, "Failed to fetch version catalog");
            }
            return Err(err.into());
        }
    };

    let output = collect_status(&resolver, &current, &versions).await;

    if json {
        ui::plain(&serde_json::to_string_pretty(&output)?);
    } else {
        output_human_readable(&output);
    }

    Ok(output.exit_code)
}

async fn collect_status(
    resolver: &CachePathResolver,
    current: &Version,
    versions: &[Version],
) -> StatusOutput {
    let mut targets = Vec::new();
    let mut summary = Summary::default();

    let mut seen = std::collections::HashSet::new();
    for version in versions.iter().filter(|v| v.is_release()) {
        if !seen.insert(version.version.as_str()) {
            continue;
        }
        let dists = match resolver.resolve_all(&version.version) {
            Ok(dists) => dists,
            Err(err) => {
                ui::warning(&format!("Skipping catalog entry: {}", err));
                continue;
            }
        };
        for target in dists {
            let state = target_state(&target).await;
            match state {
                TargetState::Present => summary.present += 1,
                TargetState::Linked => summary.linked += 1,
                TargetState::Missing => summary.missing += 1,
            }
            targets.push(TargetInfo {
                name: target.qualified_name(),
                version: target.version().to_string(),
                classifier: target.classifier().to_string(),
                state,
                home: target.extracted_home_path().display().to_string(),
            });
        }
    }
    summary.total = targets.len();

    let (status, exit_code) = if summary.missing == 0 {
        ("ok".to_string(), 0)
    } else {
        ("incomplete".to_string(), 1)
    };

    StatusOutput {
        schema_version: constants::SCHEMA_VERSION,
        status,
        exit_code,
        current: current.version.clone(),
        dists_dir: resolver.dists_dir().display().to_string(),
        summary,
        targets,
    }
}

async fn target_state(target: &DistributionTarget) -> TargetState {
    if !is_satisfied(target).await {
        return TargetState::Missing;
    }
    match tokio::fs::symlink_metadata(target.extracted_home_path()).await {
        Ok(meta) if meta.file_type().is_symlink() => TargetState::Linked,
        _ => TargetState::Present,
    }
}

fn output_human_readable(output: &StatusOutput) {
    ui::header(&format!("Wrapper distributions ({})", output.dists_dir));
    ui::dim(&format!("Current version: {}", output.current));

    for target in &output.targets {
        match target.state {
            TargetState::Present => ui::success(&target.name),
            TargetState::Linked => ui::success(&format!("{} (linked)", target.name)),
            TargetState::Missing => ui::warning(&format!("Missing: {}", target.name)),
        }
    }

    ui::status(
        "Summary",
        &format!(
            "{} present, {} linked, {} missing of {}",
            output.summary.present,
            output.summary.linked,
            output.summary.missing,
            output.summary.total
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dists::Classifier;
    use std::fs;
    use url::Url;

    fn resolver(root: &std::path::Path) -> CachePathResolver {
        let url = Url::parse(constants::DEFAULT_DISTRIBUTIONS_URL).unwrap();
        CachePathResolver::new(root, &url).unwrap()
    }

    fn satisfy(target: &DistributionTarget) {
        let home = target.extracted_home_path();
        fs::create_dir_all(home.join("bin")).unwrap();
        fs::write(home.join("bin/gradle"), b"").unwrap();
        fs::write(target.marker_path(), b"").unwrap();
    }

    #[tokio::test]
    async fn test_empty_cache_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let versions = vec![
            Version::release("7.4"),
            Version::release("7.3"),
            Version::release("../../outside"),
        ];

        let output = collect_status(&resolver(dir.path()), &versions[0], &versions).await;

        assert_eq!(output.exit_code, 1);
        assert_eq!(output.status, "incomplete");
        assert_eq!(output.summary.total, 4);
        assert_eq!(output.summary.missing, 4);
        assert_eq!(output.current, "7.4");
        assert!(output.targets.iter().all(|t| !t.version.contains("outside")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_present_and_linked_targets() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver(dir.path());
        for classifier in Classifier::ALL {
            let canonical = r.resolve("7.4", classifier).unwrap();
            satisfy(&canonical);
            let dependent = r.resolve("7.3", classifier).unwrap();
            fs::create_dir_all(dependent.bucket_dir()).unwrap();
            crate::dists::links::create_relative_symlink(
                dependent.extracted_home_path(),
                canonical.extracted_home_path(),
            )
            .await
            .unwrap();
            fs::write(dependent.marker_path(), b"").unwrap();
        }
        let versions = vec![
            Version::release("7.4"),
            Version::release("7.3"),
            Version::release("7.3"),
        ];

        let output = collect_status(&r, &versions[0], &versions).await;

        assert_eq!(output.exit_code, 0);
        assert_eq!(output.summary.present, 2);
        assert_eq!(output.summary.linked, 2);
        assert_eq!(output.summary.total, 4);

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["schema_version"], constants::SCHEMA_VERSION);
        assert_eq!(json["targets"][2]["name"], "gradle-7.3-all");
        assert_eq!(json["targets"][2]["state"], "linked");
    }

    #[tokio::test]
    async fn test_marker_without_home_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver(dir.path());
        let target = r.resolve("7.4", Classifier::Binary).unwrap();
        fs::create_dir_all(target.bucket_dir()).unwrap();
        fs::write(target.marker_path(), b"").unwrap();

        assert_eq!(target_state(&target).await, TargetState::Missing);
    }
}
