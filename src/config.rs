//! Application configuration.
//!
//! Settings are layered with [`figment`], later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. `config.toml` in the platform config directory, or the file given with
//!    `--config`
//! 3. `DUPWALK_*` environment variables (e.g. `DUPWALK_VERIFY_TAIL=5`)
//! 4. Command-line flags, applied by [`Config::apply_cli`]

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::analysis::DEFAULT_YIELD_INTERVAL;
use crate::cli::Cli;
use crate::pipeline::{PipelineOptions, SessionPaths};
use crate::stage::{DEFAULT_BLOCK_SIZE, DEFAULT_VERIFY_TAIL};

/// Prefix of environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "DUPWALK_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the checkpoint logs
    pub temp_datadir: PathBuf,
    /// Directories whose files are left out of the report
    pub ignore: Vec<PathBuf>,
    /// Read block size for hashing, in bytes
    pub hash_block_size: usize,
    /// Trailing log records recomputed when resuming
    pub verify_tail: usize,
    /// Files indexed per grouping step
    pub analysis_yield_interval: usize,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temp_datadir: PathBuf::from("session"),
            ignore: Vec::new(),
            hash_block_size: DEFAULT_BLOCK_SIZE,
            verify_tail: DEFAULT_VERIFY_TAIL,
            analysis_yield_interval: DEFAULT_YIELD_INTERVAL,
            follow_symlinks: false,
        }
    }
}

impl Config {
    /// Load defaults, the config file and `DUPWALK_*` variables.
    ///
    /// When `path` is `None` the platform config file is used if it exists.
    ///
    /// # Errors
    ///
    /// Returns the figment error if a layer has a value of the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path).extract().map_err(Box::new)
    }

    /// The layered provider stack behind [`Config::load`].
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(file) => {
                log::debug!("Reading configuration from {}", file.display());
                figment = figment.merge(Toml::file(file));
            }
            None => log::debug!("No configuration directory available"),
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Platform-specific location of `config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "dupwalk", "dupwalk")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Let command-line flags override loaded values.
    ///
    /// Ignore directories from the command line are added to the configured
    /// ones.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.temp_datadir {
            self.temp_datadir.clone_from(dir);
        }
        self.ignore.extend(cli.ignore.iter().cloned());
        if let Some(bytes) = cli.hash_block_size {
            self.hash_block_size = usize::try_from(bytes).unwrap_or(usize::MAX);
        }
        if cli.follow_symlinks {
            self.follow_symlinks = true;
        }
    }

    /// Pipeline options for the given roots.
    #[must_use]
    pub fn pipeline_options(&self, roots: Vec<PathBuf>) -> PipelineOptions {
        let mut options = PipelineOptions::new(SessionPaths::new(&self.temp_datadir))
            .with_roots(roots)
            .with_ignored(self.ignore.clone())
            .with_verify_tail(self.verify_tail)
            .with_analysis_yield_interval(self.analysis_yield_interval);
        options.hash_block_size = self.hash_block_size;
        options.follow_symlinks = self.follow_symlinks;
        options
    }
}
