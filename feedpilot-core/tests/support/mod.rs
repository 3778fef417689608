#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use feedpilot_core::{
    BrowserError, BrowserResult, CommentDecision, CommentGenerator, CommentRequest, CookieRecord,
    FeedSection, FeedSurface, GenerationError, LogEntry, LogWriter, PostElement, ProgressEvent,
    SelectorMap, SessionManager, StaticSelectorSource, StoreError, SurfaceLauncher,
};
use tokio::sync::mpsc::UnboundedReceiver;

pub const FEED_URL: &str = "https://www.linkedin.com/feed/";

pub fn cookie_payload() -> String {
    serde_json::json!([
        {"name": "li_at", "value": "token", "domain": ".linkedin.com", "path": "/"},
        {"name": "JSESSIONID", "value": "ajax:1", "domain": ".linkedin.com", "path": "/", "sameSite": "lax"}
    ])
    .to_string()
}

/// Rendered post container with scriptable failures.
#[derive(Debug, Default)]
pub struct FakePost {
    pub identifier: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    broken: RefCell<HashSet<String>>,
    stalled: RefCell<HashSet<String>>,
    pub clicks: RefCell<Vec<String>>,
    pub fills: RefCell<Vec<(String, String)>>,
}

impl FakePost {
    pub fn new(identifier: &str, author: &str, content: &str) -> Rc<Self> {
        Rc::new(Self {
            identifier: Some(identifier.to_string()),
            author: Some(author.to_string()),
            content: Some(content.to_string()),
            ..Self::default()
        })
    }

    pub fn anonymous(author: &str, content: &str) -> Rc<Self> {
        Rc::new(Self {
            author: Some(author.to_string()),
            content: Some(content.to_string()),
            ..Self::default()
        })
    }

    /// Makes every interaction with `selector` fail.
    pub fn break_selector(&self, selector: &str) {
        self.broken.borrow_mut().insert(selector.to_string());
    }

    /// Makes text reads through `selector` never complete.
    pub fn stall_selector(&self, selector: &str) {
        self.stalled.borrow_mut().insert(selector.to_string());
    }

    fn check(&self, selector: &str) -> BrowserResult<()> {
        if self.broken.borrow().contains(selector) {
            Err(BrowserError::ElementMissing(selector.to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait(?Send)]
impl PostElement for FakePost {
    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        if name == "data-urn" {
            Ok(self.identifier.clone())
        } else {
            Ok(None)
        }
    }

    async fn text(&self, selector: &str) -> BrowserResult<Option<String>> {
        self.check(selector)?;
        let stalled = self.stalled.borrow().contains(selector);
        if stalled {
            std::future::pending::<()>().await;
        }
        let defaults = SelectorMap::default();
        if selector == defaults.author_selector {
            Ok(self.author.clone())
        } else if selector == defaults.content_selector {
            Ok(self.content.clone())
        } else {
            Ok(None)
        }
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        self.check(selector)?;
        self.clicks.borrow_mut().push(selector.to_string());
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()> {
        self.check(selector)?;
        self.fills
            .borrow_mut()
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFault {
    Scroll,
    Enumerate,
}

/// What the fake browser shows: the URL it lands on and the containers
/// visible after each scroll. The last round repeats once exhausted.
#[derive(Debug, Clone)]
pub struct FeedScript {
    pub landing_url: String,
    pub rounds: Vec<Vec<Rc<FakePost>>>,
    pub endless_unreadable: bool,
    pub fault: Option<PageFault>,
}

impl FeedScript {
    pub fn new(rounds: Vec<Vec<Rc<FakePost>>>) -> Self {
        Self {
            landing_url: FEED_URL.to_string(),
            rounds,
            endless_unreadable: false,
            fault: None,
        }
    }

    /// Every scroll reveals one new container whose author cannot be read.
    pub fn endless_unreadable() -> Self {
        Self {
            endless_unreadable: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn landing_on(mut self, url: &str) -> Self {
        self.landing_url = url.to_string();
        self
    }

    pub fn failing(mut self, fault: PageFault) -> Self {
        self.fault = Some(fault);
        self
    }
}

#[derive(Debug, Default)]
pub struct Journal {
    pub launches: Cell<usize>,
    pub closes: Cell<usize>,
    pub scrolls: Cell<usize>,
    pub visited: RefCell<Vec<String>>,
    pub cookies: RefCell<Vec<CookieRecord>>,
}

struct FakeSurface {
    script: Rc<FeedScript>,
    journal: Rc<Journal>,
    scrolls: usize,
}

#[async_trait(?Send)]
impl FeedSurface for FakeSurface {
    async fn goto(&mut self, url: &str) -> BrowserResult<()> {
        self.journal.visited.borrow_mut().push(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.script.landing_url.clone())
    }

    async fn scroll_viewport(&mut self, _fraction: f64) -> BrowserResult<()> {
        if self.script.fault == Some(PageFault::Scroll) {
            return Err(BrowserError::Unexpected("scroll script failed".into()));
        }
        self.scrolls += 1;
        self.journal.scrolls.set(self.journal.scrolls.get() + 1);
        Ok(())
    }

    async fn post_containers(&self, _selector: &str) -> BrowserResult<Vec<Rc<dyn PostElement>>> {
        if self.script.fault == Some(PageFault::Enumerate) {
            return Err(BrowserError::Unexpected("renderer crashed".into()));
        }
        if self.script.endless_unreadable {
            let post = Rc::new(FakePost {
                identifier: Some(format!("urn:endless:{}", self.scrolls)),
                content: Some("unreadable".to_string()),
                ..FakePost::default()
            });
            return Ok(vec![post as Rc<dyn PostElement>]);
        }
        let rounds = &self.script.rounds;
        if rounds.is_empty() {
            return Ok(Vec::new());
        }
        let index = self.scrolls.saturating_sub(1).min(rounds.len() - 1);
        Ok(rounds[index]
            .iter()
            .map(|post| post.clone() as Rc<dyn PostElement>)
            .collect())
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.journal.closes.set(self.journal.closes.get() + 1);
        Ok(())
    }
}

pub struct FakeLauncher {
    script: Rc<FeedScript>,
    journal: Rc<Journal>,
}

#[async_trait(?Send)]
impl SurfaceLauncher for FakeLauncher {
    async fn launch(&self, cookies: &[CookieRecord]) -> BrowserResult<Box<dyn FeedSurface>> {
        self.journal.launches.set(self.journal.launches.get() + 1);
        *self.journal.cookies.borrow_mut() = cookies.to_vec();
        Ok(Box::new(FakeSurface {
            script: Rc::clone(&self.script),
            journal: Rc::clone(&self.journal),
            scrolls: 0,
        }))
    }
}

pub fn session_manager(script: FeedScript) -> (SessionManager, Rc<Journal>) {
    let journal = Rc::new(Journal::default());
    let launcher = FakeLauncher {
        script: Rc::new(script),
        journal: Rc::clone(&journal),
    };
    let manager = SessionManager::new(
        Box::new(launcher),
        Arc::new(StaticSelectorSource::new(None)),
        FeedSection::default(),
    );
    (manager, journal)
}

pub enum Reply {
    Skip,
    Comment(&'static str),
    Fail,
}

/// Answers by post author; authors without a script get a stock comment.
pub struct ScriptedGenerator {
    replies: Vec<(&'static str, Reply)>,
    summary: Option<&'static str>,
    pub seen_authors: Mutex<Vec<String>>,
    pub summarized: Mutex<Option<String>>,
    cancel_on_comment: Option<tokio_util::sync::CancellationToken>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<(&'static str, Reply)>) -> Self {
        Self {
            replies,
            summary: Some("- Hiring\n- Compilers"),
            seen_authors: Mutex::new(Vec::new()),
            summarized: Mutex::new(None),
            cancel_on_comment: None,
        }
    }

    pub fn failing_summary(mut self) -> Self {
        self.summary = None;
        self
    }

    pub fn cancelling(mut self, token: tokio_util::sync::CancellationToken) -> Self {
        self.cancel_on_comment = Some(token);
        self
    }
}

#[async_trait]
impl CommentGenerator for ScriptedGenerator {
    async fn comment(
        &self,
        request: CommentRequest<'_>,
    ) -> Result<CommentDecision, GenerationError> {
        self.seen_authors
            .lock()
            .unwrap()
            .push(request.author.to_string());
        if let Some(token) = &self.cancel_on_comment {
            token.cancel();
        }
        let reply = self
            .replies
            .iter()
            .find(|(author, _)| *author == request.author)
            .map(|(_, reply)| reply);
        match reply {
            Some(Reply::Skip) => Ok(CommentDecision::Skip),
            Some(Reply::Comment(text)) => Ok(CommentDecision::Comment(text.to_string())),
            Some(Reply::Fail) => Err(GenerationError::Status {
                status: 503,
                body: "model overloaded".into(),
            }),
            None => Ok(CommentDecision::Comment("Thoughtful point.".into())),
        }
    }

    async fn summarize(&self, contents: &str) -> Result<String, GenerationError> {
        *self.summarized.lock().unwrap() = Some(contents.to_string());
        self.summary
            .map(str::to_string)
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[derive(Default)]
pub struct MemoryLog {
    pub entries: Mutex<Vec<LogEntry>>,
    pub fail: bool,
}

impl MemoryLog {
    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl LogWriter for MemoryLog {
    async fn append(&self, entry: &LogEntry) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::MissingStore);
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

pub fn drain(receiver: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
