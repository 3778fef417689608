use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;

use super::cookies::CookieRecord;
use super::error::BrowserResult;

/// The live page a run drives. One surface backs exactly one session.
#[async_trait(?Send)]
pub trait FeedSurface {
    /// Navigates and waits for the load to settle.
    async fn goto(&mut self, url: &str) -> BrowserResult<()>;
    async fn current_url(&self) -> BrowserResult<String>;
    /// Scrolls down by `fraction` of the viewport height.
    async fn scroll_viewport(&mut self, fraction: f64) -> BrowserResult<()>;
    async fn post_containers(&self, selector: &str) -> BrowserResult<Vec<Rc<dyn PostElement>>>;
    async fn close(&mut self) -> BrowserResult<()>;
}

/// Handle to one rendered post container. Selectors passed to its methods
/// are resolved relative to the container, first match wins.
#[async_trait(?Send)]
pub trait PostElement: fmt::Debug {
    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>>;
    async fn text(&self, selector: &str) -> BrowserResult<Option<String>>;
    async fn click(&self, selector: &str) -> BrowserResult<()>;
    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()>;
}

/// Starts a browser with the given cookies already injected.
#[async_trait(?Send)]
pub trait SurfaceLauncher {
    async fn launch(&self, cookies: &[CookieRecord]) -> BrowserResult<Box<dyn FeedSurface>>;
}
