use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::load_toml;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorMap {
    pub post_container: String,
    pub author_selector: String,
    pub content_selector: String,
    pub like_button: String,
    pub comment_button: String,
    pub comment_textbox: String,
    pub comment_post_button: String,
}

impl Default for SelectorMap {
    fn default() -> Self {
        Self {
            post_container: "div.feed-shared-update-v2".to_string(),
            author_selector:
                ".update-components-actor__single-line-truncate span[aria-hidden='true']"
                    .to_string(),
            content_selector: ".update-components-update-v2__commentary".to_string(),
            like_button: "button.react-button__trigger".to_string(),
            comment_button: "button.comment-button".to_string(),
            comment_textbox: "div.ql-editor[contenteditable='true']".to_string(),
            comment_post_button: "button.comments-comment-box__submit-button--cr".to_string(),
        }
    }
}

/// Where the selector mapping comes from. `Ok(None)` means nothing is
/// configured and the caller should use [`SelectorMap::default`].
#[async_trait]
pub trait SelectorSource: Send + Sync {
    async fn fetch(&self) -> Result<Option<SelectorMap>, ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileSelectorSource {
    path: PathBuf,
}

impl FileSelectorSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SelectorSource for FileSelectorSource {
    async fn fetch(&self) -> Result<Option<SelectorMap>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }
        load_toml(&self.path).map(Some)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticSelectorSource {
    map: Option<SelectorMap>,
}

impl StaticSelectorSource {
    pub fn new(map: Option<SelectorMap>) -> Self {
        Self { map }
    }
}

#[async_trait]
impl SelectorSource for StaticSelectorSource {
    async fn fetch(&self) -> Result<Option<SelectorMap>, ConfigError> {
        Ok(self.map.clone())
    }
}
