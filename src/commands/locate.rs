// Locate command: print where the wrapper keeps a version, offline

use crate::config::Settings;
use crate::dists::{CachePathResolver, Classifier, is_satisfied};
use crate::ui;

pub async fn locate_distribution(
    settings: &Settings,
    version: &str,
    classifier: Classifier,
) -> anyhow::Result<i32> {
    let resolver = CachePathResolver::new(&settings.gradle_user_home, &settings.distributions_url)?;
    let target = resolver.resolve(version, classifier)?;

    let state = if is_satisfied(&target).await {
        "satisfied"
    } else {
        "missing"
    };

    ui::header(&target.qualified_name());
    ui::status("url    ", target.remote_url().as_str());
    ui::status("bucket ", target.bucket());
    ui::status("archive", &target.local_archive_path().display().to_string());
    ui::status("home   ", &target.extracted_home_path().display().to_string());
    ui::status("marker ", &target.marker_path().display().to_string());
    ui::status("state  ", state);

    Ok(0)
}
