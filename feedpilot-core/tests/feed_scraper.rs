mod support;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use feedpilot_core::{AutomationMetrics, BrowserError, FeedScraper, FeedSection, SessionError};
use tokio_util::sync::CancellationToken;

use support::{cookie_payload, session_manager, FakePost, FeedScript, PageFault};

fn scraper() -> (FeedScraper, Arc<Mutex<AutomationMetrics>>) {
    let metrics = Arc::new(Mutex::new(AutomationMetrics::default()));
    (
        FeedScraper::new(FeedSection::default(), Arc::clone(&metrics)),
        metrics,
    )
}

fn identifiers(report: &feedpilot_core::ScrapeReport) -> Vec<&str> {
    report
        .posts
        .iter()
        .map(|post| post.identifier.as_str())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn repeated_containers_stop_after_one_quiet_round() {
    let a = FakePost::new("urn:a", "Ada", "Compilers are fun");
    let b = FakePost::new("urn:b", "Bob", "Hiring Rust engineers");
    let c = FakePost::new("urn:c", "Cy", "Notes on tracing");
    let (manager, journal) = session_manager(FeedScript::new(vec![vec![a, b, c]]));
    let cancel = CancellationToken::new();
    let mut session = manager.open(&cookie_payload(), &cancel).await.unwrap();
    let (scraper, _) = scraper();

    let exact = scraper.scrape(&mut session, 3, &cancel).await.unwrap();
    assert_eq!(identifiers(&exact), vec!["urn:a", "urn:b", "urn:c"]);
    assert_eq!(exact.rounds, 1);

    let wide = scraper.scrape(&mut session, 5, &cancel).await.unwrap();
    assert_eq!(identifiers(&wide), vec!["urn:a", "urn:b", "urn:c"]);
    assert_eq!(wide.rounds, 2);
    assert!(wide.exhausted);

    manager.close(session).await.unwrap();
    assert_eq!(journal.closes.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn posts_are_deduplicated_across_rounds() {
    let a = FakePost::new("urn:a", "Ada", "first");
    let b = FakePost::new("urn:b", "Bob", "second");
    let c = FakePost::new("urn:c", "Cy", "third");
    let d = FakePost::new("urn:d", "Dee", "fourth");
    let blank = FakePost::new("urn:blank", "Eve", "   ");
    let nameless = FakePost::anonymous("Zed", "no identifier");
    let script = FeedScript::new(vec![
        vec![a.clone(), b.clone()],
        vec![b.clone(), blank, c.clone(), nameless],
        vec![c.clone(), d.clone(), a.clone()],
    ]);
    let (manager, _) = session_manager(script);
    let cancel = CancellationToken::new();
    let mut session = manager.open(&cookie_payload(), &cancel).await.unwrap();
    let (scraper, metrics) = scraper();

    let report = scraper.scrape(&mut session, 10, &cancel).await.unwrap();
    let ids = identifiers(&report);
    assert_eq!(ids, vec!["urn:a", "urn:b", "urn:c", "urn:d"]);
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.rounds, 4);
    assert!(report.exhausted);
    assert_eq!(report.posts[0].author, "Ada");

    let metrics = metrics.lock().unwrap();
    assert_eq!(metrics.posts_extracted, 4);
    assert_eq!(metrics.extraction_failures, 1);
    drop(metrics);
    manager.close(session).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn never_returns_more_than_requested() {
    let round = (0..6)
        .map(|i| FakePost::new(&format!("urn:{i}"), "Ada", &format!("post {i}")))
        .collect();
    let (manager, _) = session_manager(FeedScript::new(vec![round]));
    let cancel = CancellationToken::new();
    let mut session = manager.open(&cookie_payload(), &cancel).await.unwrap();
    let (scraper, _) = scraper();

    let report = scraper.scrape(&mut session, 4, &cancel).await.unwrap();
    assert_eq!(report.posts.len(), 4);
    assert!(!report.exhausted);
    manager.close(session).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn broken_author_locator_skips_only_that_post() {
    let good = FakePost::new("urn:good", "Ada", "kept");
    let broken = FakePost::new("urn:broken", "Bob", "dropped");
    broken.break_selector(&feedpilot_core::SelectorMap::default().author_selector);
    let (manager, _) = session_manager(FeedScript::new(vec![vec![broken, good]]));
    let cancel = CancellationToken::new();
    let mut session = manager.open(&cookie_payload(), &cancel).await.unwrap();
    let (scraper, _) = scraper();

    let report = scraper.scrape(&mut session, 2, &cancel).await.unwrap();
    assert_eq!(identifiers(&report), vec!["urn:good"]);
    assert_eq!(report.skipped.len(), 1);
    manager.close(session).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stalled_field_read_times_out_and_skips_the_post() {
    let stuck = FakePost::new("urn:stuck", "Ada", "never read");
    stuck.stall_selector(&feedpilot_core::SelectorMap::default().author_selector);
    let fine = FakePost::new("urn:fine", "Bob", "read fine");
    let (manager, _) = session_manager(FeedScript::new(vec![vec![stuck, fine]]));
    let cancel = CancellationToken::new();
    let mut session = manager.open(&cookie_payload(), &cancel).await.unwrap();
    let (scraper, _) = scraper();

    let report = scraper.scrape(&mut session, 2, &cancel).await.unwrap();
    assert_eq!(identifiers(&report), vec!["urn:fine"]);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].starts_with("urn:stuck"));
    assert!(report.skipped[0].contains("timeout waiting for post author"));
    assert!(report.exhausted);
    manager.close(session).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn round_cap_stops_an_endless_unreadable_feed() {
    let (manager, journal) = session_manager(FeedScript::endless_unreadable());
    let cancel = CancellationToken::new();
    let mut session = manager.open(&cookie_payload(), &cancel).await.unwrap();
    let feed = FeedSection {
        max_scroll_rounds: 5,
        ..FeedSection::default()
    };
    let scraper = FeedScraper::new(feed, Arc::new(Mutex::new(AutomationMetrics::default())));

    let report = scraper.scrape(&mut session, 3, &cancel).await.unwrap();
    assert!(report.posts.is_empty());
    assert_eq!(report.rounds, 5);
    assert_eq!(report.skipped.len(), 5);
    assert!(!report.exhausted);
    assert_eq!(journal.scrolls.get(), 5);
    manager.close(session).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn scroll_failure_is_a_page_error() {
    let script = FeedScript::new(vec![vec![FakePost::new("urn:a", "Ada", "content")]])
        .failing(PageFault::Scroll);
    let (manager, _) = session_manager(script);
    let cancel = CancellationToken::new();
    let mut session = manager.open(&cookie_payload(), &cancel).await.unwrap();
    let (scraper, _) = scraper();

    let err = scraper.scrape(&mut session, 1, &cancel).await.unwrap_err();
    assert!(matches!(err, BrowserError::Unexpected(_)));
    manager.close(session).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_scrolling() {
    let (manager, _) = session_manager(FeedScript::new(vec![vec![FakePost::new(
        "urn:a", "Ada", "content",
    )]]));
    let cancel = CancellationToken::new();
    let mut session = manager.open(&cookie_payload(), &cancel).await.unwrap();
    let (scraper, _) = scraper();

    cancel.cancel();
    let err = scraper.scrape(&mut session, 3, &cancel).await.unwrap_err();
    assert!(matches!(err, BrowserError::Cancelled));
    manager.close(session).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn session_rejects_login_redirect_and_releases_browser() {
    let script = FeedScript::new(Vec::new()).landing_on("https://www.linkedin.com/login");
    let (manager, journal) = session_manager(script);
    let cancel = CancellationToken::new();

    let err = manager.open(&cookie_payload(), &cancel).await.unwrap_err();
    assert!(matches!(err, SessionError::Authentication(_)));
    assert_eq!(journal.launches.get(), 1);
    assert_eq!(journal.closes.get(), 1);
    assert_eq!(
        journal.visited.borrow().as_slice(),
        ["https://www.linkedin.com/feed/".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn session_normalizes_cookies_before_launch() {
    let (manager, journal) = session_manager(FeedScript::new(Vec::new()));
    let cancel = CancellationToken::new();
    let session = manager.open(&cookie_payload(), &cancel).await.unwrap();

    let cookies = journal.cookies.borrow();
    assert_eq!(cookies.len(), 2);
    assert!(cookies
        .iter()
        .all(|cookie| cookie.same_site_policy().is_some()));
    drop(cookies);
    manager.close(session).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn malformed_cookies_never_launch_a_browser() {
    let (manager, journal) = session_manager(FeedScript::new(Vec::new()));
    let cancel = CancellationToken::new();
    let err = manager.open("{not json", &cancel).await.unwrap_err();
    assert!(matches!(err, SessionError::Configuration(_)));
    assert_eq!(journal.launches.get(), 0);
}
