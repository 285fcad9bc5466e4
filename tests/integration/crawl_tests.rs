//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use gcrawl::config::{CrawlerConfig, UserAgentConfig};
use gcrawl::crawler::HttpFetcher;
use gcrawl::output::PageReport;
use gcrawl::queue::{JobState, SqliteQueue};
use gcrawl::worker::{report_hooks, CrawlJobHandler, Job, WorkerPool};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn settings(extra: &str) -> CrawlerConfig {
    toml::from_str(&format!("max-pages = 10\ntimeout-secs = 5\n{}", extra))
        .expect("Failed to parse crawler settings")
}

fn handler(
    settings: CrawlerConfig,
    output: &TempDir,
) -> CrawlJobHandler<impl Fn(gcrawl::RobotsEvaluator, &Job) -> gcrawl::output::ReportHooks + Send + Sync>
{
    let fetcher = HttpFetcher::new(&user_agent()).expect("Failed to build fetcher");
    CrawlJobHandler::new(settings, fetcher, output.path(), report_hooks("TestBot"))
}

fn job(seed: String, max_pages: u32) -> Job {
    Job {
        id: 1,
        seed,
        allow_subdomains: false,
        max_pages,
    }
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn urls(reports: &[PageReport]) -> Vec<&str> {
    reports.iter().map(|report| report.url.as_str()).collect()
}

#[tokio::test]
async fn test_full_crawl_respects_budget_and_order() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="http://elsewhere.invalid/">Elsewhere</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(&server, "/page1", r#"<a href="/">Home</a><a href="/page3">3</a>"#.to_string()).await;
    mount_page(&server, "/page2", "<title>Two</title>".to_string()).await;
    mount_page(&server, "/page3", "<title>Three</title>".to_string()).await;

    let output = TempDir::new().unwrap();
    let reports = handler(settings(""), &output)
        .crawl(&job(format!("{}/", base), 3))
        .await
        .expect("Crawl failed");

    assert_eq!(
        urls(&reports),
        vec![
            format!("{}/", base),
            format!("{}/page1", base),
            format!("{}/page2", base),
        ]
    );
    assert_eq!(reports[0].title.as_deref(), Some("Home"));
    assert_eq!(reports[0].follow.len(), 3);
    assert!(reports.iter().all(|report| report.status == 200));
}

#[tokio::test]
async fn test_robots_txt_and_nofollow_are_respected() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    mount_page(
        &server,
        "/",
        r#"<a href="/private/secret">Secret</a>
           <a href="/public">Public</a>
           <a href="/skip" rel="nofollow">Skip</a>"#
            .to_string(),
    )
    .await;
    mount_page(&server, "/public", "<p>nothing here</p>".to_string()).await;

    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/skip"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let reports = handler(settings(""), &output)
        .crawl(&job(format!("{}/", base), 10))
        .await
        .expect("Crawl failed");

    assert_eq!(
        urls(&reports),
        vec![format!("{}/", base), format!("{}/public", base)]
    );
    assert_eq!(reports[0].nofollow, vec![format!("{}/skip", base)]);
}

#[tokio::test]
async fn test_redirect_is_followed_but_not_counted() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/landing"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/landing", "<title>Landing</title>".to_string()).await;

    let output = TempDir::new().unwrap();
    let reports = handler(settings("allow-redirects = false"), &output)
        .crawl(&job(format!("{}/", base), 1))
        .await
        .expect("Crawl failed");

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].url, format!("{}/landing", base));
    assert_eq!(reports[0].title.as_deref(), Some("Landing"));
}

#[tokio::test]
async fn test_slow_page_does_not_stop_the_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    mount_page(
        &server,
        "/",
        r#"<a href="/slow">Slow</a><a href="/fast">Fast</a>"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    mount_page(&server, "/fast", "<title>Fast</title>".to_string()).await;

    let output = TempDir::new().unwrap();
    let reports = handler(
        toml::from_str("max-pages = 10\ntimeout-secs = 1").unwrap(),
        &output,
    )
    .crawl(&job(format!("{}/", base), 10))
    .await
    .expect("Crawl failed");

    assert_eq!(
        urls(&reports),
        vec![format!("{}/", base), format!("{}/fast", base)]
    );
}

#[tokio::test]
async fn test_redirected_robots_txt_is_honored() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/real-robots.txt"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/real-robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /secret"))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<a href="/secret">Secret</a><a href="/open">Open</a>"#.to_string(),
    )
    .await;
    mount_page(&server, "/open", "<title>Open</title>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let reports = handler(settings(""), &output)
        .crawl(&job(format!("{}/", base), 10))
        .await
        .expect("Crawl failed");

    assert_eq!(
        urls(&reports),
        vec![format!("{}/", base), format!("{}/open", base)]
    );
}

#[tokio::test]
async fn test_hanging_robots_txt_does_not_stall_the_job() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /")
                .set_delay(Duration::from_secs(6)),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/", "<title>Home</title>".to_string()).await;

    let output = TempDir::new().unwrap();
    let started = Instant::now();
    let reports = handler(
        toml::from_str("max-pages = 10\ntimeout-secs = 1").unwrap(),
        &output,
    )
    .crawl(&job(format!("{}/", base), 10))
    .await
    .expect("Crawl failed");

    assert!(started.elapsed() < Duration::from_secs(4), "took {:?}", started.elapsed());
    // the late robots.txt is never seen, so the seed is crawled
    assert_eq!(urls(&reports), vec![format!("{}/", base)]);
}

#[tokio::test]
async fn test_worker_pool_runs_queued_jobs() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    mount_page(&server, "/", r#"<a href="/about">About</a>"#.to_string()).await;
    mount_page(&server, "/about", "<title>About</title>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let queue = Arc::new(SqliteQueue::open(&dir.path().join("queue.db")).unwrap());
    let good = queue.enqueue(&format!("{}/", base), false, 5).unwrap();
    let bad = queue.enqueue("not a url", false, 5).unwrap();

    let output = TempDir::new().unwrap();
    let pool = WorkerPool::new(2, Duration::from_millis(10));

    let watched = Arc::clone(&queue);
    let all_done = async move {
        loop {
            let counts = watched.counts().unwrap();
            if counts.completed + counts.failed == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    let started = tokio::time::timeout(
        Duration::from_secs(10),
        pool.run_until(
            Arc::clone(&queue),
            Arc::new(handler(settings(""), &output)),
            all_done,
        ),
    )
    .await
    .expect("Worker pool did not finish");
    assert_eq!(started, 2);

    let record = queue.get(good.id).unwrap().unwrap();
    assert_eq!(record.state, JobState::Completed);
    let dump = std::fs::read_to_string(output.path().join(format!("{}-dump.json", good.id)))
        .expect("Dump file missing");
    let reports: Vec<serde_json::Value> = serde_json::from_str(&dump).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1]["url"], format!("{}/about", base));

    let record = queue.get(bad.id).unwrap().unwrap();
    assert_eq!(record.state, JobState::Failed);
    assert!(record.error_message.unwrap().contains("not a url"));
    assert!(!output.path().join(format!("{}-dump.json", bad.id)).exists());
}
