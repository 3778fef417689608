use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    pub browser: BrowserSection,
    pub feed: FeedSection,
    pub actions: ActionsSection,
    pub pacing: PacingSection,
    pub generation: GenerationSection,
    pub storage: StorageSection,
}

impl AgentConfig {
    /// Resolves a relative path against the directory the config was loaded from.
    pub fn resolve_path<P: AsRef<Path>>(&self, base_dir: &Path, candidate: P) -> PathBuf {
        let path = candidate.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.feed.scroll_fraction) || self.feed.scroll_fraction == 0.0 {
            return Err(ConfigError::Invalid {
                field: "feed.scroll_fraction",
                reason: format!("{} is outside (0, 1]", self.feed.scroll_fraction),
            });
        }
        if self.feed.max_scroll_rounds == 0 {
            return Err(ConfigError::Invalid {
                field: "feed.max_scroll_rounds",
                reason: "must be at least 1".to_string(),
            });
        }
        if url::Url::parse(&self.feed.url).is_err() {
            return Err(ConfigError::Invalid {
                field: "feed.url",
                reason: format!("{} is not a valid url", self.feed.url),
            });
        }
        for (field, range) in [
            ("actions.like_pause_ms", self.actions.like_pause_ms),
            ("actions.composer_pause_ms", self.actions.composer_pause_ms),
            ("actions.fill_pause_ms", self.actions.fill_pause_ms),
            ("actions.submit_pause_ms", self.actions.submit_pause_ms),
            ("pacing.between_posts_ms", self.pacing.between_posts_ms),
        ] {
            if range[0] > range[1] {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("range {}..{} is inverted", range[0], range[1]),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSection {
    pub executable_path: String,
    pub headless: bool,
    pub sandbox: bool,
    pub disable_gpu: bool,
    pub request_timeout_seconds: Option<u64>,
    pub viewport: [u32; 2],
    pub user_agent: Option<String>,
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSection {
    pub url: String,
    /// Substring the final location must contain for the session to count as authenticated.
    pub expected_location: String,
    pub scroll_fraction: f64,
    pub settle_ms: u64,
    pub navigation_settle_ms: u64,
    pub navigation_timeout_seconds: u64,
    pub extraction_timeout_ms: u64,
    pub identifier_attribute: String,
    pub max_scroll_rounds: usize,
}

impl FeedSection {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn navigation_settle(&self) -> Duration {
        Duration::from_millis(self.navigation_settle_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_seconds)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            url: "https://www.linkedin.com/feed/".to_string(),
            expected_location: "linkedin.com/feed".to_string(),
            scroll_fraction: 0.8,
            settle_ms: 2_500,
            navigation_settle_ms: 3_000,
            navigation_timeout_seconds: 90,
            extraction_timeout_ms: 5_000,
            identifier_attribute: "data-urn".to_string(),
            max_scroll_rounds: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionsSection {
    pub action_timeout_ms: u64,
    pub like_pause_ms: [u64; 2],
    pub composer_pause_ms: [u64; 2],
    pub fill_pause_ms: [u64; 2],
    pub submit_pause_ms: [u64; 2],
}

impl ActionsSection {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }
}

impl Default for ActionsSection {
    fn default() -> Self {
        Self {
            action_timeout_ms: 10_000,
            like_pause_ms: [1_500, 3_000],
            composer_pause_ms: [2_000, 4_000],
            fill_pause_ms: [2_500, 5_000],
            submit_pause_ms: [3_000, 5_000],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PacingSection {
    pub between_posts_ms: [u64; 2],
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            between_posts_ms: [8_000, 15_000],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSection {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub api_key_env: String,
    pub deadline_seconds: u64,
    pub voice_directive: String,
}

impl GenerationSection {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    pub log_db: String,
    pub selectors_file: Option<String>,
    pub busy_timeout_ms: u64,
}

impl StorageSection {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

pub fn load_agent_config<P: AsRef<Path>>(path: P) -> Result<AgentConfig> {
    let config: AgentConfig = load_toml(path)?;
    config.validate()?;
    Ok(config)
}

pub(crate) fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
