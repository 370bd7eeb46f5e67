//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small catalog and run the full
//! crawl-extract-write cycle end-to-end.

use shelf_scraper::config::Config;
use shelf_scraper::crawler::{
    CrawlContext, CrawlEvent, EventSink, FetchErrorKind, Fetcher, ListingPaginator,
};
use shelf_scraper::model::CategoryRef;
use shelf_scraper::output::{read_dataset, COLUMNS};
use shelf_scraper::Coordinator;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, dataset_path: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.root_url = format!("{}/", base_url);
    config.crawler.request_timeout_ms = 2_000;
    config.crawler.max_concurrent_details = 4;
    config.crawler.queue_capacity = 2;
    config.crawler.max_consecutive_failures = 0;
    config.output.dataset_path = dataset_path.display().to_string();
    config
}

fn root_html(categories: &[(&str, &str)]) -> String {
    let entries: String = categories
        .iter()
        .map(|(name, href)| format!(r#"<li><a href="{}">{}</a></li>"#, href, name))
        .collect();
    format!(
        r#"<html><body><div class="side_categories"><ul class="nav nav-list">
        <li><a href="/cat/books">Books</a><ul>{}</ul></li>
        </ul></div></body></html>"#,
        entries
    )
}

fn listing_html(items: &[(&str, &str)], next: Option<&str>) -> String {
    let cards: String = items
        .iter()
        .map(|(title, href)| {
            format!(
                r#"<li><article class="product_pod">
                <div class="image_container"><a href="{href}"><img src="/media/thumb.jpg"></a></div>
                <h3><a href="{href}" title="{title}">{title}</a></h3>
                </article></li>"#
            )
        })
        .collect();
    let pager = match next {
        Some(href) => format!(r#"<ul class="pager"><li class="next"><a href="{}">next</a></li></ul>"#, href),
        None => String::new(),
    };
    format!(r#"<html><body><ol class="row">{}</ol>{}</body></html>"#, cards, pager)
}

fn detail_html(title: &str, rating: &str, availability: Option<&str>) -> String {
    let availability_row = availability
        .map(|text| format!("<tr><th>Availability</th><td>{}</td></tr>", text))
        .unwrap_or_default();
    format!(
        r#"<html><body>
        <div class="item active"><img src="../../media/cache/{title}.jpg" alt="{title}"></div>
        <div class="product_main"><h1>{title}</h1><p class="star-rating {rating}"><i class="icon-star"></i></p></div>
        <div id="product_description" class="sub-header"><h2>Product Description</h2></div>
        <p>About {title}.</p>
        <table class="table table-striped">
          <tr><th>UPC</th><td>upc-{title}</td></tr>
          <tr><th>Product Type</th><td>Books</td></tr>
          <tr><th>Price (excl. tax)</th><td>£20.00</td></tr>
          <tr><th>Price (incl. tax)</th><td>£24.00</td></tr>
          <tr><th>Tax</th><td>£4.00</td></tr>
          {availability_row}
          <tr><th>Number of reviews</th><td>3</td></tr>
        </table>
        </body></html>"#
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Root with Travel (2 pages, 1 item each) and Poetry (1 page, 1 item)
async fn mount_two_category_site(server: &MockServer) {
    serve(server, "/", html(root_html(&[("Travel", "/cat/travel"), ("Poetry", "/cat/poetry")]))).await;
    serve(
        server,
        "/cat/travel",
        html(listing_html(&[("Travel One", "/book/travel-one")], Some("/cat/travel/page-2"))),
    )
    .await;
    serve(
        server,
        "/cat/travel/page-2",
        html(listing_html(&[("Travel Two", "/book/travel-two")], None)),
    )
    .await;
    serve(
        server,
        "/cat/poetry",
        html(listing_html(&[("Poetry One", "/book/poetry-one")], None)),
    )
    .await;
}

#[tokio::test]
async fn test_two_categories_three_rows_in_crawl_order() {
    let mock_server = MockServer::start().await;
    mount_two_category_site(&mock_server).await;

    // The first item finishes last; ids must still follow crawl order
    serve(
        &mock_server,
        "/book/travel-one",
        html(detail_html("travel-one", "Two", Some("In stock (5 available)")))
            .set_delay(Duration::from_millis(300)),
    )
    .await;
    serve(&mock_server, "/book/travel-two", html(detail_html("travel-two", "Four", Some("In stock (7 available)")))).await;
    serve(&mock_server, "/book/poetry-one", html(detail_html("poetry-one", "Five", Some("In stock (1 available)")))).await;

    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("data").join("books_dataset.csv");
    let config = create_test_config(&mock_server.uri(), &dataset_path);

    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let stats = coordinator.run().await.expect("Crawl failed");

    assert_eq!(stats.categories, 2);
    assert_eq!(stats.listing_pages, 3);
    assert_eq!(stats.items_queued, 3);
    assert_eq!(stats.rows_written, 3);
    assert_eq!(stats.fetch_failures(), 0);
    assert!(!stats.cancelled);

    let rows = read_dataset(&dataset_path).expect("Failed to read dataset");
    let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);

    let categories: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
    assert_eq!(categories, vec!["Travel", "Travel", "Poetry"]);

    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Travel One", "Travel Two", "Poetry One"]);

    let base = mock_server.uri();
    assert_eq!(rows[0].category_url, format!("{}/cat/travel", base));
    assert_eq!(rows[1].category_url, format!("{}/cat/travel/page-2", base));
    assert_eq!(rows[0].book_url, format!("{}/book/travel-one", base));
    assert_eq!(rows[0].image_url, format!("{}/media/cache/travel-one.jpg", base));
    assert_eq!(rows[0].description, "About travel-one.");
    assert_eq!(rows[0].stars, 2);
    assert_eq!(rows[2].stars, 5);
    assert_eq!(rows[0].currency, "£");
    assert_eq!(rows[0].price_excl_tax, "20.00");
    assert_eq!(rows[0].price_incl_tax, "24.00");
    assert_eq!(rows[0].tax, "4.00");
    assert_eq!(rows[0].availability, 5);
    assert_eq!(rows[0].review_count, 3);

    let header = std::fs::read_to_string(&dataset_path).unwrap();
    assert_eq!(header.lines().next().unwrap(), COLUMNS.join(";"));
}

#[tokio::test]
async fn test_missing_availability_row_defaults_to_zero() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/", html(root_html(&[("Poetry", "/cat/poetry")]))).await;
    serve(
        &mock_server,
        "/cat/poetry",
        html(listing_html(&[("Poetry One", "/book/poetry-one")], None)),
    )
    .await;
    serve(&mock_server, "/book/poetry-one", html(detail_html("poetry-one", "One", None))).await;

    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("books.csv");
    let config = create_test_config(&mock_server.uri(), &dataset_path);

    Coordinator::new(config).unwrap().run().await.expect("Crawl failed");

    let rows = read_dataset(&dataset_path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].availability, 0);
    assert_eq!(rows[0].stars, 1);
    assert_eq!(rows[0].upc, "upc-poetry-one");
    assert_eq!(rows[0].product_type, "Books");
    assert_eq!(rows[0].price_incl_tax, "24.00");
    assert_eq!(rows[0].review_count, 3);
}

#[tokio::test]
async fn test_listing_timeout_keeps_first_page_and_other_categories() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/", html(root_html(&[("Travel", "/cat/travel"), ("Poetry", "/cat/poetry")]))).await;
    serve(
        &mock_server,
        "/cat/travel",
        html(listing_html(&[("Travel One", "/book/travel-one")], Some("/cat/travel/page-2"))),
    )
    .await;
    serve(
        &mock_server,
        "/cat/travel/page-2",
        html(listing_html(&[("Travel Two", "/book/travel-two")], None))
            .set_delay(Duration::from_secs(2)),
    )
    .await;
    serve(
        &mock_server,
        "/cat/poetry",
        html(listing_html(&[("Poetry One", "/book/poetry-one")], None)),
    )
    .await;
    serve(&mock_server, "/book/travel-one", html(detail_html("travel-one", "Two", Some("In stock (5 available)")))).await;
    serve(&mock_server, "/book/travel-two", html(detail_html("travel-two", "Four", Some("In stock (7 available)")))).await;
    serve(&mock_server, "/book/poetry-one", html(detail_html("poetry-one", "Five", Some("In stock (1 available)")))).await;

    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("books.csv");
    let mut config = create_test_config(&mock_server.uri(), &dataset_path);
    config.crawler.request_timeout_ms = 300;

    let stats = Coordinator::new(config).unwrap().run().await.expect("Crawl failed");
    assert_eq!(stats.listing_failures, 1);
    assert_eq!(stats.rows_written, 2);

    let rows = read_dataset(&dataset_path).unwrap();
    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Travel One", "Poetry One"]);
    assert_eq!(rows[1].id, 1);
}

#[tokio::test]
async fn test_failed_detail_pages_leave_no_gaps_in_ids() {
    let mock_server = MockServer::start().await;
    mount_two_category_site(&mock_server).await;
    serve(&mock_server, "/book/travel-one", html(detail_html("travel-one", "Two", None))).await;
    serve(&mock_server, "/book/travel-two", ResponseTemplate::new(500)).await;
    serve(&mock_server, "/book/poetry-one", html(detail_html("poetry-one", "Five", None))).await;

    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("books.csv");
    let config = create_test_config(&mock_server.uri(), &dataset_path);

    let stats = Coordinator::new(config).unwrap().run().await.expect("Crawl failed");
    assert_eq!(stats.items_queued, 3);
    assert_eq!(stats.detail_failures, 1);

    let rows = read_dataset(&dataset_path).unwrap();
    let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![0, 1]);
    assert_eq!(rows[1].title, "Poetry One");
}

#[tokio::test]
async fn test_unreachable_root_writes_empty_dataset() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/", ResponseTemplate::new(503)).await;

    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("data").join("books.csv");
    let config = create_test_config(&mock_server.uri(), &dataset_path);

    let stats = Coordinator::new(config).unwrap().run().await.expect("Crawl failed");
    assert_eq!(stats.root_failures, 1);
    assert_eq!(stats.categories, 0);
    assert_eq!(stats.rows_written, 0);

    let content = std::fs::read_to_string(&dataset_path).unwrap();
    assert_eq!(content.trim_end(), COLUMNS.join(";"));
}

#[tokio::test]
async fn test_missing_navigation_is_not_fatal() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/", html("<html><body><h1>Catalog</h1></body></html>".to_string())).await;

    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("books.csv");
    let config = create_test_config(&mock_server.uri(), &dataset_path);

    let stats = Coordinator::new(config).unwrap().run().await.expect("Crawl failed");
    assert_eq!(stats.structural_warnings, 1);
    assert_eq!(stats.rows_written, 0);
    assert!(read_dataset(&dataset_path).unwrap().is_empty());
}

#[tokio::test]
async fn test_consecutive_failures_cancel_the_run() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/", html(root_html(&[("Travel", "/cat/travel")]))).await;
    serve(
        &mock_server,
        "/cat/travel",
        html(listing_html(
            &[
                ("A", "/book/a"),
                ("B", "/book/b"),
                ("C", "/book/c"),
                ("D", "/book/d"),
                ("E", "/book/e"),
            ],
            None,
        )),
    )
    .await;
    for slug in ["a", "b", "c", "d", "e"] {
        serve(&mock_server, &format!("/book/{}", slug), ResponseTemplate::new(500)).await;
    }

    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("books.csv");
    let mut config = create_test_config(&mock_server.uri(), &dataset_path);
    config.crawler.max_concurrent_details = 1;
    config.crawler.max_consecutive_failures = 2;

    let stats = Coordinator::new(config).unwrap().run().await.expect("Crawl failed");
    assert!(stats.cancelled);
    assert_eq!(stats.detail_failures, 2);
    assert_eq!(stats.skipped_after_cancel, 3);
    assert_eq!(stats.rows_written, 0);
    assert!(dataset_path.exists());
}

#[tokio::test]
async fn test_rerun_keeps_shape() {
    let mock_server = MockServer::start().await;
    mount_two_category_site(&mock_server).await;
    for slug in ["travel-one", "travel-two", "poetry-one"] {
        serve(
            &mock_server,
            &format!("/book/{}", slug),
            html(detail_html(slug, "Three", Some("In stock (2 available)"))),
        )
        .await;
    }

    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("books.csv");
    let config = create_test_config(&mock_server.uri(), &dataset_path);

    Coordinator::new(config.clone()).unwrap().run().await.expect("First crawl failed");
    let first_header = std::fs::read_to_string(&dataset_path).unwrap().lines().next().map(str::to_string);
    let first = read_dataset(&dataset_path).unwrap();

    Coordinator::new(config).unwrap().run().await.expect("Second crawl failed");
    let second_header = std::fs::read_to_string(&dataset_path).unwrap().lines().next().map(str::to_string);
    let second = read_dataset(&dataset_path).unwrap();

    assert_eq!(first_header, second_header);
    assert_eq!(first.len(), second.len());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_paginator_follows_every_next_link_once() {
    let mock_server = MockServer::start().await;
    serve(
        &mock_server,
        "/cat/mystery",
        html(listing_html(&[("M1", "/book/m1"), ("M2", "/book/m2")], Some("/cat/mystery/page-2"))),
    )
    .await;
    serve(
        &mock_server,
        "/cat/mystery/page-2",
        html(listing_html(&[("M3", "/book/m3")], Some("/cat/mystery/page-3"))),
    )
    .await;
    // The last page links back to the first
    serve(
        &mock_server,
        "/cat/mystery/page-3",
        html(listing_html(&[("M4", "/book/m4")], Some("/cat/mystery"))),
    )
    .await;

    let base = Url::parse(&format!("{}/", mock_server.uri())).unwrap();
    let config = Config::default();
    let fetcher = Fetcher::from_config(&config.crawler, &config.user_agent).unwrap();
    let (sink, mut events) = EventSink::channel();
    let ctx = CrawlContext::new(fetcher, sink, base.clone(), "£".to_string(), 0);

    let category = CategoryRef {
        position: 0,
        name: "Mystery".to_string(),
        url: base.join("cat/mystery").unwrap(),
    };
    let mut paginator = ListingPaginator::new(ctx, category);

    let mut titles = Vec::new();
    let mut pages = 0;
    while let Some(items) = paginator.next_page().await {
        pages += 1;
        titles.extend(items.into_iter().map(|item| item.title));
    }
    assert_eq!(pages, 3);
    assert_eq!(titles, vec!["M1", "M2", "M3", "M4"]);

    // Exhausted: stays exhausted
    assert!(paginator.next_page().await.is_none());

    drop(paginator);
    let mut loops = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, CrawlEvent::Structure(_)) {
            loops += 1;
        }
    }
    assert_eq!(loops, 1);
}

#[tokio::test]
async fn test_fetcher_reports_status_and_timeout() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/missing", ResponseTemplate::new(404)).await;
    serve(
        &mock_server,
        "/slow",
        html("<html></html>".to_string()).set_delay(Duration::from_secs(2)),
    )
    .await;
    serve(&mock_server, "/ok", html("<html><p>ok</p></html>".to_string())).await;

    let mut config = Config::default();
    config.crawler.request_timeout_ms = 200;
    let fetcher = Fetcher::from_config(&config.crawler, &config.user_agent).unwrap();
    let base = Url::parse(&mock_server.uri()).unwrap();

    let err = fetcher.fetch(&base.join("/missing").unwrap()).await.unwrap_err();
    assert_eq!(err.kind, FetchErrorKind::Status(404));
    assert!(err.url.ends_with("/missing"));

    let err = fetcher.fetch(&base.join("/slow").unwrap()).await.unwrap_err();
    assert_eq!(err.kind, FetchErrorKind::Timeout);

    let raw = fetcher.fetch(&base.join("/ok").unwrap()).await.unwrap();
    assert_eq!(raw.status_code, 200);
    assert!(raw.body.contains("<p>ok</p>"));
}

/// Serves every detail page after a fixed delay and records arrival times
///
/// A request stays in flight for at least `delay` after it arrives, so the
/// arrivals inside any `delay`-wide window are requests open at once.
#[derive(Clone)]
struct SlowDetailPages {
    delay: Duration,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl SlowDetailPages {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            arrivals: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn peak_in_flight(&self) -> usize {
        let arrivals = self.arrivals.lock().unwrap();
        arrivals
            .iter()
            .map(|&end| {
                arrivals
                    .iter()
                    .filter(|&&start| start <= end && end.duration_since(start) < self.delay)
                    .count()
            })
            .max()
            .unwrap_or(0)
    }
}

impl Respond for SlowDetailPages {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        let title = request.url.path().trim_start_matches("/book/").to_string();
        html(detail_html(&title, "Two", Some("In stock (5 available)"))).set_delay(self.delay)
    }
}

#[tokio::test]
async fn test_detail_fetches_respect_concurrency_limit() {
    let mock_server = MockServer::start().await;
    let slugs: Vec<String> = (0..12).map(|i| format!("item-{}", i)).collect();
    let cards: Vec<(String, String)> = slugs
        .iter()
        .map(|slug| (slug.clone(), format!("/book/{}", slug)))
        .collect();
    let cards: Vec<(&str, &str)> = cards.iter().map(|(t, h)| (t.as_str(), h.as_str())).collect();

    serve(&mock_server, "/", html(root_html(&[("Travel", "/cat/travel")]))).await;
    serve(&mock_server, "/cat/travel", html(listing_html(&cards, None))).await;

    let detail_pages = SlowDetailPages::new(Duration::from_millis(250));
    Mock::given(method("GET"))
        .and(path_regex(r"^/book/"))
        .respond_with(detail_pages.clone())
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("books.csv");
    let mut config = create_test_config(&mock_server.uri(), &dataset_path);
    config.crawler.max_concurrent_details = 3;
    config.crawler.queue_capacity = 16;

    let stats = Coordinator::new(config).unwrap().run().await.expect("Crawl failed");
    assert_eq!(stats.rows_written, 12);
    assert_eq!(stats.detail_failures, 0);

    let peak = detail_pages.peak_in_flight();
    assert!(peak <= 3, "{} detail fetches in flight, limit is 3", peak);
    assert!(peak > 1, "detail fetches never overlapped");

    let rows = read_dataset(&dataset_path).unwrap();
    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, slugs.iter().map(String::as_str).collect::<Vec<_>>());
}
