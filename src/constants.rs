// Constants module for shared string constants and defaults

pub const APP_NAME: &str = "distshare";

/// Root of the Gradle services the wrapper talks to
pub const DEFAULT_SERVICES_URL: &str = "https://services.gradle.org";
/// Base URL the wrapper's `distributionUrl` points at by default
pub const DEFAULT_DISTRIBUTIONS_URL: &str = "https://services.gradle.org/distributions";

pub const CURRENT_VERSION_PATH: &str = "versions/current";
pub const ALL_VERSIONS_PATH: &str = "versions/all";

/// Directory name under the user home when GRADLE_USER_HOME is unset
pub const DEFAULT_GRADLE_USER_HOME_DIR: &str = ".gradle";
pub const DISTS_DIR: &[&str] = &["wrapper", "dists"];
pub const CURRENT_LINK: &str = "current";
pub const MARKER_SUFFIX: &str = ".ok";

/// Fan-out worker count. Kept small to bound pressure on the cache filesystem.
pub const DEFAULT_JOBS: usize = 3;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

/// Schema version for the status --json output format.
/// Increment only on breaking changes to ensure future integrations can safely evolve.
pub const SCHEMA_VERSION: u32 = 1;
