// rdl-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::{ProjectDirs, UserDirs};
use tracing::debug;
use url::Url;

use super::error::{RdlError, Result};

const LIB_DIR_NAME: &str = "lib";
const LOGS_DIR_NAME: &str = "logs";
const CACHE_FILE_NAME: &str = "dependencies.json";
const FALLBACK_DATA_DIR: &str = ".rdl";

const DEFAULT_SESSION_ID: &str = "rdl";
const DEFAULT_TRANSITIVE_EXCLUDED: &[&str] = &["xseries"];
const DEFAULT_REMOTE_REPOSITORY: &str = "https://repo.maven.apache.org/maven2";
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_PROGRESS_DELAY: Duration = Duration::from_secs(3);
const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Prefix of every isolation identifier handed to the resolver.
    pub session_id: String,
    /// Name substrings that never get transitive expansion.
    pub transitive_excluded: Vec<String>,
    /// Repositories registered before the ones declared by the manifest.
    pub default_repositories: Vec<String>,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub progress_initial_delay: Duration,
    pub progress_interval: Duration,
    pub worker_threads: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading rdl configuration");

        let data_dir = match env_string("RDL_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir(),
        };
        debug!("Effective data directory: {}", data_dir.display());

        let mut config = Self::with_data_dir(data_dir);

        if let Some(id) = env_string("RDL_SESSION_ID") {
            config.session_id = id;
        }
        if let Some(list) = env_string("RDL_TRANSITIVE_EXCLUDE") {
            config.transitive_excluded = split_list(&list);
        }
        if let Some(list) = env_string("RDL_DEFAULT_REPOSITORIES") {
            config.default_repositories = split_list(&list);
        }
        if let Some(attempts) = env_parsed::<u32>("RDL_RETRY_ATTEMPTS")? {
            config.retry_attempts = attempts;
        }
        if let Some(delay) = env_duration("RDL_RETRY_DELAY")? {
            config.retry_delay = delay;
        }
        if let Some(delay) = env_duration("RDL_PROGRESS_DELAY")? {
            config.progress_initial_delay = delay;
        }
        if let Some(interval) = env_duration("RDL_PROGRESS_INTERVAL")? {
            config.progress_interval = interval;
        }
        if let Some(threads) = env_parsed::<usize>("RDL_WORKER_THREADS")? {
            config.worker_threads = threads;
        }

        config.validate()?;
        debug!("Configuration loaded successfully.");
        Ok(config)
    }

    /// Built-in defaults rooted at `data_dir`, ignoring the environment.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            session_id: DEFAULT_SESSION_ID.to_string(),
            transitive_excluded: DEFAULT_TRANSITIVE_EXCLUDED
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_repositories: default_repositories(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            progress_initial_delay: DEFAULT_PROGRESS_DELAY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            worker_threads: num_cpus::get(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry_attempts == 0 {
            return Err(RdlError::Config(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(RdlError::Config(
                "worker thread count must be at least 1".to_string(),
            ));
        }
        if self.progress_interval.is_zero() {
            return Err(RdlError::Config(
                "progress interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.data_dir.join(LIB_DIR_NAME)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.lib_dir().join(CACHE_FILE_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join(LOGS_DIR_NAME)
    }

    /// True when no resolved graph has ever been persisted.
    pub fn is_first_run(&self) -> bool {
        !self.cache_file().is_file()
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("dev", "rdl", "rdl")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            debug!(
                "No platform data directory available, falling back to {}",
                FALLBACK_DATA_DIR
            );
            PathBuf::from(FALLBACK_DATA_DIR)
        })
}

fn default_repositories() -> Vec<String> {
    let mut repositories = vec![DEFAULT_REMOTE_REPOSITORY.to_string()];
    if let Some(user_dirs) = UserDirs::new() {
        let maven_local = user_dirs.home_dir().join(".m2").join("repository");
        match local_repository_url(&maven_local) {
            Some(url) => repositories.push(url),
            None => debug!(
                "Local Maven repository {} is not an absolute path, skipping",
                maven_local.display()
            ),
        }
    }
    repositories
}

fn local_repository_url(path: &Path) -> Option<String> {
    Url::from_directory_path(path).ok().map(String::from)
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parsed<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| RdlError::Config(format!("{key}={raw}: {e}")))
        })
        .transpose()
}

fn env_duration(key: &str) -> Result<Option<Duration>> {
    env_string(key)
        .map(|raw| {
            humantime::parse_duration(raw.trim())
                .map_err(|e| RdlError::Config(format!("{key}={raw}: {e}")))
        })
        .transpose()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
