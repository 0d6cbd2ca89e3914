//! End-to-end crawl tests against a scripted storefront
//!
//! Listing and product pages are served by wiremock; politeness delays and
//! backoff go through a manual clock so the suite runs instantly.

use std::sync::Arc;
use std::time::Duration;

use bestsellers::models::{Config, DedupStage, DelayRange, Genre};
use bestsellers::pipeline::{BookCrawler, StopReason, run_crawler};
use bestsellers::storage::CsvStorage;
use bestsellers::utils::ManualClock;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIRST_PAGE: &str = r#"
<html><body>
  <div class="zg-grid-general-faceout">
    <a class="a-link-normal" href="/dp/alpha"><span>Alpha Rising</span></a>
    <div class="a-row a-size-small">Ann Author</div>
    <span class="a-icon-alt">4.5 out of 5 stars</span>
    <span class="a-size-small a-link-normal">1,204</span>
    <span class="a-price"><span class="a-offscreen">$12.99</span></span>
  </div>
  <div class="zg-grid-general-faceout">
    <a class="a-link-normal" href="/dp/beta"><span>Beta Facts</span></a>
    <div class="a-row a-size-small">Bo Writer</div>
  </div>
  <div class="zg-grid-general-faceout">
    <a class="a-link-normal" href="/dp/alpha"><span>ALPHA   rising</span></a>
    <div class="a-row a-size-small">ann author</div>
  </div>
  <div class="zg-grid-general-faceout">
    <a class="a-link-normal" href="/dp/epsilon"><span>Epsilon Tales</span></a>
    <div class="a-row a-size-small">Eve Lin</div>
  </div>
  <ul class="a-pagination"><li class="a-last"><a href="/list/2">Next page</a></li></ul>
</body></html>
"#;

const SECOND_PAGE: &str = r#"
<html><body>
  <div class="zg-grid-general-faceout">
    <a class="a-link-normal" href="/dp/gamma"><span>Gamma Ray</span></a>
    <div class="a-row a-size-small">Cy Poet</div>
  </div>
  <div class="zg-grid-general-faceout">
    <div class="p13n-sc-truncate">Delta Unlinked</div>
  </div>
  <ul class="a-pagination"><li class="a-disabled a-last">Next page</li></ul>
</body></html>
"#;

const FICTION_DETAIL: &str = r#"
<div id="wayfinding-breadcrumbs_feature_div"><a>Books</a><a>Literature &amp; Fiction</a></div>
<div id="detailBullets_feature_div"><ul>
  <li><span class="a-text-bold">Language:</span> English</li>
  <li><span class="a-text-bold">Publication date:</span> March 5, 2024</li>
</ul></div>
"#;

const SCIENCE_DETAIL: &str = r#"
<div id="wayfinding-breadcrumbs_feature_div"><a>Books</a><a>Science &amp; Math</a></div>
<table id="productDetailsTable">
  <tr><th>Language</th><td>German</td></tr>
  <tr><th>Publisher</th><td>Springer (2019)</td></tr>
</table>
"#;

/// Config pointing at the mock server with fixed, observable delays.
fn test_config(server: &MockServer) -> Config {
    let base = server.uri();
    let mut config = Config::default();

    config.crawl.base_url = base.clone();
    config.crawl.start_url = format!("{base}/list");
    config.crawl.limit = 10;
    config.crawl.max_pages = 5;
    config.crawl.page_delay_ms = DelayRange::new(100, 100);
    config.crawl.detail_delay_ms = DelayRange::new(10, 10);

    config.fetch.referer = base;
    config.fetch.timeout_secs = 5;
    config.fetch.max_attempts = 2;
    config.fetch.backoff_base_ms = 1;
    config.fetch.backoff_step_ms = 0;
    config.fetch.backoff_jitter_ms = 0;
    config
}

async fn serve(server: &MockServer, route: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(times)
        .mount(server)
        .await;
}

async fn serve_status(server: &MockServer, route: &str, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_across_pages() {
    let server = MockServer::start().await;
    serve(&server, "/list", FIRST_PAGE, 1).await;
    serve(&server, "/list/2", SECOND_PAGE, 1).await;
    serve(&server, "/dp/alpha", FICTION_DETAIL, 1).await;
    serve_status(&server, "/dp/beta", 503, 2).await;
    serve(&server, "/dp/epsilon", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/gamma", SCIENCE_DETAIL, 1).await;

    let clock = Arc::new(ManualClock::default());
    let crawler = BookCrawler::new(&test_config(&server), clock.clone()).unwrap();
    let outcome = crawler.crawl().await;

    let titles: Vec<&str> = outcome.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Alpha Rising",
            "Beta Facts",
            "Epsilon Tales",
            "Gamma Ray",
            "Delta Unlinked"
        ]
    );
    assert!(matches!(outcome.stop, StopReason::NoNextPage));
    assert_eq!(outcome.pages_visited, 2);
    assert_eq!(outcome.detail_total, 4);
    assert_eq!(outcome.detail_failures, 1);
    assert!(!outcome.first_page_failed());

    let alpha = &outcome.records[0];
    assert_eq!(alpha.author.as_deref(), Some("Ann Author"));
    assert_eq!(alpha.rating, Some(4.5));
    assert_eq!(alpha.review_count, Some(1204));
    assert_eq!(alpha.price, Some(12.99));
    assert_eq!(alpha.language.as_deref(), Some("English"));
    assert_eq!(alpha.publication_year, Some(2024));
    assert_eq!(alpha.genre, Some(Genre::Fiction));

    // Product page failed: listing fields survive, details stay empty
    let beta = &outcome.records[1];
    assert_eq!(beta.author.as_deref(), Some("Bo Writer"));
    assert_eq!(beta.language, None);
    assert_eq!(beta.genre, None);

    // The next card on the same page is still enriched
    let epsilon = &outcome.records[2];
    assert_eq!(epsilon.language.as_deref(), Some("English"));
    assert_eq!(epsilon.genre, Some(Genre::Fiction));

    let gamma = &outcome.records[3];
    assert_eq!(gamma.language.as_deref(), Some("German"));
    assert_eq!(gamma.publication_year, Some(2019));
    assert_eq!(gamma.genre, Some(Genre::NonFiction));

    let delta = &outcome.records[4];
    assert_eq!(delta.detail_url, None);
    assert_eq!(delta.genre, None);

    // alpha, beta (+ one backoff), epsilon, page two, gamma
    let ms = Duration::from_millis;
    assert_eq!(
        clock.sleeps(),
        vec![ms(10), ms(10), ms(1), ms(10), ms(100), ms(10)]
    );
}

#[tokio::test]
async fn test_limit_stops_before_next_page() {
    let server = MockServer::start().await;
    serve(&server, "/list", FIRST_PAGE, 1).await;
    serve(&server, "/list/2", SECOND_PAGE, 0).await;
    serve(&server, "/dp/alpha", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/beta", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/epsilon", FICTION_DETAIL, 0).await;

    let mut config = test_config(&server);
    config.crawl.limit = 2;

    let crawler = BookCrawler::new(&config, Arc::new(ManualClock::default())).unwrap();
    let outcome = crawler.crawl().await;

    assert_eq!(outcome.records.len(), 2);
    assert!(matches!(outcome.stop, StopReason::LimitReached));
    assert_eq!(outcome.pages_visited, 1);
}

#[tokio::test]
async fn test_limit_stops_mid_page_without_more_fetches() {
    let server = MockServer::start().await;
    serve(&server, "/list", FIRST_PAGE, 1).await;
    serve(&server, "/dp/alpha", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/beta", FICTION_DETAIL, 0).await;
    serve(&server, "/dp/epsilon", FICTION_DETAIL, 0).await;

    let mut config = test_config(&server);
    config.crawl.limit = 1;

    let crawler = BookCrawler::new(&config, Arc::new(ManualClock::default())).unwrap();
    let outcome = crawler.crawl().await;

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].title, "Alpha Rising");
    assert_eq!(outcome.detail_total, 1);
    assert!(matches!(outcome.stop, StopReason::LimitReached));
}

#[tokio::test]
async fn test_page_budget_is_respected() {
    let server = MockServer::start().await;
    serve(&server, "/list", FIRST_PAGE, 1).await;
    serve(&server, "/list/2", SECOND_PAGE, 0).await;
    serve(&server, "/dp/alpha", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/beta", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/epsilon", FICTION_DETAIL, 1).await;

    let mut config = test_config(&server);
    config.crawl.max_pages = 1;

    let crawler = BookCrawler::new(&config, Arc::new(ManualClock::default())).unwrap();
    let outcome = crawler.crawl().await;

    assert_eq!(outcome.records.len(), 3);
    assert!(matches!(outcome.stop, StopReason::PageBudgetExhausted));
}

#[tokio::test]
async fn test_zero_limit_sends_no_request() {
    let server = MockServer::start().await;
    serve(&server, "/list", FIRST_PAGE, 0).await;

    let mut config = test_config(&server);
    config.crawl.limit = 0;

    let crawler = BookCrawler::new(&config, Arc::new(ManualClock::default())).unwrap();
    let outcome = crawler.crawl().await;

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.pages_visited, 0);
}

#[tokio::test]
async fn test_first_page_failure_is_reported() {
    let server = MockServer::start().await;
    serve_status(&server, "/list", 503, 2).await;

    let crawler =
        BookCrawler::new(&test_config(&server), Arc::new(ManualClock::default())).unwrap();
    let outcome = crawler.crawl().await;

    assert!(outcome.records.is_empty());
    assert!(outcome.first_page_failed());
    assert_eq!(outcome.pages_visited, 0);
}

#[tokio::test]
async fn test_later_page_failure_keeps_collected_records() {
    let server = MockServer::start().await;
    serve(&server, "/list", FIRST_PAGE, 1).await;
    serve_status(&server, "/list/2", 500, 2).await;
    serve(&server, "/dp/alpha", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/beta", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/epsilon", FICTION_DETAIL, 1).await;

    let crawler =
        BookCrawler::new(&test_config(&server), Arc::new(ManualClock::default())).unwrap();
    let outcome = crawler.crawl().await;

    assert_eq!(outcome.records.len(), 3);
    assert!(matches!(
        outcome.stop,
        StopReason::ListingFetchFailed {
            first_page: false,
            ..
        }
    ));
    assert!(!outcome.first_page_failed());
}

#[tokio::test]
async fn test_pagination_loop_is_detected() {
    let looping = SECOND_PAGE.replace(
        r#"<li class="a-disabled a-last">Next page</li>"#,
        r#"<li class="a-last"><a href="/list">Next page</a></li>"#,
    );

    let server = MockServer::start().await;
    serve(&server, "/list", FIRST_PAGE, 1).await;
    serve(&server, "/list/2", &looping, 1).await;
    serve(&server, "/dp/alpha", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/beta", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/epsilon", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/gamma", FICTION_DETAIL, 1).await;

    let crawler =
        BookCrawler::new(&test_config(&server), Arc::new(ManualClock::default())).unwrap();
    let outcome = crawler.crawl().await;

    assert_eq!(outcome.records.len(), 5);
    assert!(matches!(outcome.stop, StopReason::RevisitedPage(_)));
    assert_eq!(outcome.pages_visited, 2);
}

#[tokio::test]
async fn test_back_link_on_last_page_ends_crawl() {
    let first = r#"
    <div class="zg-grid-general-faceout"><div class="p13n-sc-truncate">One</div></div>
    <ul class="a-pagination">
      <li class="a-selected"><a href="/list?pg=1">1</a></li>
      <li class="a-normal"><a href="/list?pg=2">2</a></li>
      <li class="a-last"><a href="/list?pg=2">Next page</a></li>
    </ul>"#;
    let last = r#"
    <div class="zg-grid-general-faceout"><div class="p13n-sc-truncate">Two</div></div>
    <ul class="a-pagination">
      <li class="a-normal"><a href="/list?pg=1">1</a></li>
      <li class="a-selected"><a href="/list?pg=2">2</a></li>
      <li class="a-disabled a-last">Next page</li>
    </ul>"#;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("pg", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(last))
        .expect(1)
        .mount(&server)
        .await;
    serve(&server, "/list", first, 1).await;

    let crawler =
        BookCrawler::new(&test_config(&server), Arc::new(ManualClock::default())).unwrap();
    let outcome = crawler.crawl().await;

    let titles: Vec<&str> = outcome.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Two"]);
    assert_eq!(outcome.pages_visited, 2);
    assert!(matches!(outcome.stop, StopReason::NoNextPage));
}

#[tokio::test]
async fn test_dedup_after_enrichment_fetches_duplicate() {
    let server = MockServer::start().await;
    serve(&server, "/list", FIRST_PAGE, 1).await;
    serve(&server, "/dp/alpha", FICTION_DETAIL, 2).await;
    serve(&server, "/dp/beta", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/epsilon", FICTION_DETAIL, 1).await;

    let mut config = test_config(&server);
    config.crawl.max_pages = 1;
    config.crawl.dedup_stage = DedupStage::AfterEnrichment;

    let crawler = BookCrawler::new(&config, Arc::new(ManualClock::default())).unwrap();
    let outcome = crawler.crawl().await;

    let titles: Vec<&str> = outcome.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha Rising", "Beta Facts", "Epsilon Tales"]);
    assert_eq!(outcome.detail_total, 4);
}

#[tokio::test]
async fn test_run_crawler_writes_csv() {
    let server = MockServer::start().await;
    serve(&server, "/list", FIRST_PAGE, 1).await;
    serve(&server, "/dp/alpha", FICTION_DETAIL, 1).await;
    serve(&server, "/dp/beta", SCIENCE_DETAIL, 1).await;
    serve(&server, "/dp/epsilon", FICTION_DETAIL, 1).await;

    let mut config = test_config(&server);
    config.crawl.max_pages = 1;

    let dir = tempfile::tempdir().unwrap();
    let storage = CsvStorage::new(dir.path().join("out/books.csv"));
    let outcome = run_crawler(&config, &storage, Arc::new(ManualClock::default()))
        .await
        .unwrap();
    assert_eq!(outcome.records.len(), 3);

    let text = std::fs::read_to_string(storage.path()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Title,Author,Rating,Reviews,Language,Price,Publication Year,Genre",
            "Alpha Rising,Ann Author,4.5,1204,English,12.99,2024,Fiction",
            "Beta Facts,Bo Writer,,,German,,2019,Non-fiction",
            "Epsilon Tales,Eve Lin,,,English,,2024,Fiction",
        ]
    );
}

#[tokio::test]
async fn test_first_page_failure_still_writes_header() {
    let server = MockServer::start().await;
    serve_status(&server, "/list", 404, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let storage = CsvStorage::new(dir.path().join("books.csv"));
    let outcome = run_crawler(
        &test_config(&server),
        &storage,
        Arc::new(ManualClock::default()),
    )
    .await
    .unwrap();

    assert!(outcome.first_page_failed());
    let text = std::fs::read_to_string(storage.path()).unwrap();
    assert_eq!(text.lines().count(), 1);
}
