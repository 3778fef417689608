mod actions;
mod automation;
mod cookies;
mod error;
mod guard;
mod human;
mod metrics;
mod scraper;
mod selectors;
mod session;
mod surface;

pub use actions::{ActionExecutor, ActionResult};
pub use automation::{BrowserLauncher, ChromiumSurface};
pub use cookies::{normalize_same_site, parse_cookies, CookieError, CookieRecord, SameSitePolicy};
pub use error::{BrowserError, BrowserResult};
pub use guard::bounded;
pub use human::HumanPacer;
pub use metrics::AutomationMetrics;
pub use scraper::{FeedScraper, Post, PostRecord, ScrapeReport};
pub use selectors::{FileSelectorSource, SelectorMap, SelectorSource, StaticSelectorSource};
pub use session::{classify_location, AuthFailure, Session, SessionError, SessionManager};
pub use surface::{FeedSurface, PostElement, SurfaceLauncher};
