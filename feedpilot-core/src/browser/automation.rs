use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, CookieSameSite, SetUserAgentOverrideParams, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserSection;

use super::cookies::{CookieRecord, SameSitePolicy};
use super::error::{BrowserError, BrowserResult};
use super::surface::{FeedSurface, PostElement, SurfaceLauncher};

#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    config: Arc<BrowserSection>,
}

impl BrowserLauncher {
    pub fn new(config: BrowserSection) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    fn chromium_config(&self) -> BrowserResult<BrowserConfig> {
        let section = &self.config;
        let [width, height] = section.viewport;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&section.executable_path)
            .viewport(Viewport {
                width,
                height,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: width >= height,
                has_touch: false,
            });
        if !section.headless {
            builder = builder.with_head();
        }
        if !section.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(seconds) = section.request_timeout_seconds {
            builder = builder.request_timeout(Duration::from_secs(seconds));
        }

        let mut flags = vec![
            format!("--window-size={width},{height}"),
            "--no-first-run".to_string(),
            "--disable-features=AutomationControlled".to_string(),
            "--password-store=basic".to_string(),
        ];
        if section.disable_gpu {
            flags.push("--disable-gpu".to_string());
        }
        if let Some(lang) = &section.lang {
            flags.push(format!("--lang={lang}"));
        }
        builder.args(flags).build().map_err(BrowserError::Configuration)
    }

    async fn open_page(
        &self,
        process: &ChromiumProcess,
        cookies: &[CookieRecord],
    ) -> BrowserResult<Page> {
        let page = process.browser.new_page("about:blank").await?;
        if let Some(user_agent) = &self.config.user_agent {
            let params = SetUserAgentOverrideParams::builder()
                .user_agent(user_agent.clone())
                .build()
                .map_err(BrowserError::Configuration)?;
            page.set_user_agent(params).await?;
        }
        let params = cookies
            .iter()
            .map(cookie_param)
            .collect::<BrowserResult<Vec<_>>>()?;
        page.set_cookies(params).await?;
        debug!(count = cookies.len(), "Injected session cookies");
        Ok(page)
    }
}

#[async_trait(?Send)]
impl SurfaceLauncher for BrowserLauncher {
    async fn launch(&self, cookies: &[CookieRecord]) -> BrowserResult<Box<dyn FeedSurface>> {
        info!(
            headless = self.config.headless,
            width = self.config.viewport[0],
            height = self.config.viewport[1],
            "Starting Chromium"
        );
        let process = ChromiumProcess::start(self.chromium_config()?).await?;
        match self.open_page(&process, cookies).await {
            Ok(page) => Ok(Box::new(ChromiumSurface {
                page,
                process: Some(process),
            })),
            Err(err) => {
                process.stop().await;
                Err(err)
            }
        }
    }
}

fn cookie_param(cookie: &CookieRecord) -> BrowserResult<CookieParam> {
    let same_site = match cookie.same_site_policy().unwrap_or(SameSitePolicy::DEFAULT) {
        SameSitePolicy::Strict => CookieSameSite::Strict,
        SameSitePolicy::Lax => CookieSameSite::Lax,
        SameSitePolicy::None => CookieSameSite::None,
    };
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path())
        .same_site(same_site);
    if let Some(secure) = cookie.secure {
        builder = builder.secure(secure);
    }
    if let Some(http_only) = cookie.http_only {
        builder = builder.http_only(http_only);
    }
    if let Some(expires) = cookie.expiry() {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    builder.build().map_err(BrowserError::Configuration)
}

#[derive(Debug)]
struct ChromiumProcess {
    browser: Browser,
    events: Option<JoinHandle<()>>,
}

impl ChromiumProcess {
    async fn start(config: BrowserConfig) -> BrowserResult<Self> {
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "CDP handler error");
                }
            }
        });
        Ok(Self {
            browser,
            events: Some(events),
        })
    }

    async fn stop(mut self) {
        info!("Stopping Chromium");
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "Chromium did not close cleanly");
        }
        if let Some(events) = self.events.take() {
            if let Err(err) = events.await {
                warn!(error = %err, "CDP handler task failed");
            }
        }
    }
}

impl Drop for ChromiumProcess {
    fn drop(&mut self) {
        if matches!(&self.events, Some(events) if !events.is_finished()) {
            warn!("Chromium process dropped while still running");
        }
    }
}

#[derive(Debug)]
pub struct ChromiumSurface {
    page: Page,
    process: Option<ChromiumProcess>,
}

#[async_trait(?Send)]
impl FeedSurface for ChromiumSurface {
    async fn goto(&mut self, url: &str) -> BrowserResult<()> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(BrowserError::Configuration)?;
        self.page.goto(params).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn scroll_viewport(&mut self, fraction: f64) -> BrowserResult<()> {
        let script = format!("window.scrollBy(0, window.innerHeight * {fraction});");
        self.page
            .evaluate(script.as_str())
            .await
            .map_err(|err| BrowserError::Unexpected(format!("scroll script failed: {err}")))?;
        Ok(())
    }

    async fn post_containers(&self, selector: &str) -> BrowserResult<Vec<Rc<dyn PostElement>>> {
        let elements = self.page.find_elements(selector).await?;
        Ok(elements
            .into_iter()
            .map(|element| Rc::new(ChromiumPost { element }) as Rc<dyn PostElement>)
            .collect())
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if let Some(process) = self.process.take() {
            process.stop().await;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ChromiumPost {
    element: Element,
}

impl ChromiumPost {
    async fn child(&self, selector: &str) -> BrowserResult<Element> {
        self.element
            .find_element(selector)
            .await
            .map_err(|err| BrowserError::ElementMissing(format!("{selector}: {err}")))
    }
}

#[async_trait(?Send)]
impl PostElement for ChromiumPost {
    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        Ok(self.element.attribute(name).await?)
    }

    async fn text(&self, selector: &str) -> BrowserResult<Option<String>> {
        Ok(self.child(selector).await?.inner_text().await?)
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        self.child(selector).await?.click().await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()> {
        let input = self.child(selector).await?;
        input.click().await?;
        input.type_str(text).await?;
        Ok(())
    }
}
