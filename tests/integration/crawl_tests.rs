//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the listings site and run the
//! full cycle end-to-end: session bootstrap, listing pages, detail pages
//! and the sink.

use agent_harvest::config::{Config, ParserStrategy, SinkKind};
use agent_harvest::crawler::{Coordinator, SESSION_ENDPOINT};
use agent_harvest::{ErrorKind, HarvestError, Termination};
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/agents/raleigh-nc/";
const FULL_COOKIE_HEADER: &str = "JSESSIONID=j1; zgsession=s1; zguid=g1";

/// Creates a test configuration pointed at the mock server
fn create_test_config(server: &MockServer, output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.base_url = server.uri();
    config.site.listing_url = format!("{}{}", server.uri(), LISTING_PATH);
    config.crawl.page_interval_ms = 0;
    config.retry.attempts = 2;
    config.retry.delay_ms = 0;
    config.retry.detail_delay_ms = 0;
    config.output.csv_path = output_dir.join("agents.csv").display().to_string();
    config.output.database_path = output_dir.join("agents.db").display().to_string();
    config
}

/// Mounts the two bootstrap endpoints
async fn mount_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "zguid=g1; Path=/")
                .append_header("set-cookie", "zgsession=s1; Path=/")
                .set_body_string("<html>home</html>"),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(SESSION_ENDPOINT))
        .and(header("cookie", "zgsession=s1; zguid=g1; zjs_user_id=null"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "JSESSIONID=j1; Path=/")
                .set_body_string("{}"),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn listing_body(profiles: &[&str]) -> String {
    let anchors: String = profiles
        .iter()
        .map(|p| format!(r#"<a href="/profile/{}/">{}</a>"#, p, p))
        .collect();
    format!(
        r#"<html><body>
        <span class="Text-abc jTpxxT">{}</span>
        <div class="StyledGrid-q1 Grid-w2">{}</div>
        </body></html>"#,
        profiles.len(),
        anchors
    )
}

async fn mount_listing(server: &MockServer, page: u32, profiles: &[&str]) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", page.to_string()))
        .and(query_param("priceRange", "250000,700000"))
        .and(header("cookie", FULL_COOKIE_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(profiles)))
        .expect(1)
        .mount(server)
        .await;
}

fn detail_body(name: &str, average_price: serde_json::Value) -> String {
    let data = json!({
        "props": {"pageProps": {
            "displayUser": {
                "name": name,
                "email": format!("{}@example.com", name),
                "businessAddress": {"city": "Raleigh", "state": "NC"},
                "phoneNumbers": {"cell": "(919) 555-0100"}
            },
            "agentLicenses": [{"text": "NC 1", "status": "Active"}],
            "agentSalesStats": {
                "countAllTime": 40,
                "countLastYear": 6,
                "averageValueThreeYear": average_price
            }
        }}
    });
    format!(
        r#"<html><body><script id="__NEXT_DATA__" type="application/json">{}</script></body></html>"#,
        data
    )
}

async fn mount_detail(server: &MockServer, profile: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/profile/{}/", profile)))
        .and(header("cookie", FULL_COOKIE_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_writes_csv() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_session(&server).await;

    mount_listing(&server, 1, &["alice", "bob"]).await;
    mount_listing(&server, 2, &["carol"]).await;
    mount_listing(&server, 3, &[]).await;
    for name in ["alice", "bob", "carol"] {
        mount_detail(&server, name, detail_body(name, json!(350000))).await;
    }

    let config = create_test_config(&server, dir.path());
    let csv_path = config.output.csv_path.clone();
    let mut coordinator = Coordinator::new(config).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.termination, Some(Termination::NoLinks { page: 3 }));
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.links_seen, 3);
    assert_eq!(report.records_saved, 3);
    assert!(report.failures.is_empty());

    let content = std::fs::read_to_string(csv_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("agent_name,"));
    assert!(lines[1].starts_with("alice,alice@example.com,"));
    assert!(lines[2].starts_with("bob,"));
    assert!(lines[3].starts_with("carol,"));
    assert!(lines[1].ends_with(",40,6,,,350000"));
}

#[tokio::test]
async fn test_zero_links_terminates_without_detail_fetch() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_session(&server).await;
    mount_listing(&server, 1, &[]).await;

    Mock::given(method("GET"))
        .and(path_regex("^/profile/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path());
    let csv_path = config.output.csv_path.clone();
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.termination, Some(Termination::NoLinks { page: 1 }));
    assert_eq!(report.records_saved, 0);
    assert!(!Path::new(&csv_path).exists());
}

#[tokio::test]
async fn test_page_limit_stops_crawl() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_session(&server).await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(&["alice"])))
        .expect(2)
        .mount(&server)
        .await;
    mount_detail(&server, "alice", detail_body("alice", json!(null))).await;

    let mut config = create_test_config(&server, dir.path());
    config.crawl.start_page = 4;
    config.crawl.max_page = 5;
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(
        report.termination,
        Some(Termination::PageLimitReached { page: 5 })
    );
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.records_saved, 2);

    let pages: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == LISTING_PATH)
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "page")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(pages, vec!["4", "5"]);
}

#[tokio::test]
async fn test_failed_details_are_skipped() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_session(&server).await;

    mount_listing(&server, 1, &["broken", "pricey", "good"]).await;
    mount_listing(&server, 2, &[]).await;

    Mock::given(method("GET"))
        .and(path("/profile/broken/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    mount_detail(&server, "pricey", detail_body("pricey", json!("abc"))).await;
    mount_detail(&server, "good", detail_body("good", json!(275000))).await;

    let config = create_test_config(&server, dir.path());
    let csv_path = config.output.csv_path.clone();
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.termination, Some(Termination::NoLinks { page: 2 }));
    assert_eq!(report.links_seen, 3);
    assert_eq!(report.records_saved, 1);
    assert_eq!(report.failures_of(ErrorKind::Transport), 1);
    assert_eq!(report.failures_of(ErrorKind::Validation), 1);

    let content = std::fs::read_to_string(csv_path).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("good@example.com"));
}

#[tokio::test]
async fn test_listing_failure_terminates() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_session(&server).await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(
        report.termination,
        Some(Termination::PageFetchFailed { page: 1 })
    );
    assert_eq!(report.pages_fetched, 0);
    assert_eq!(report.failures_of(ErrorKind::Transport), 1);
}

#[tokio::test]
async fn test_bootstrap_without_cookies_aborts() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>home</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SESSION_ENDPOINT))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path());
    let result = Coordinator::new(config).unwrap().run().await;

    match result {
        Err(HarvestError::MissingSessionCookies { missing }) => {
            assert_eq!(missing, "zguid, zgsession");
        }
        other => panic!("expected missing cookies, got {:?}", other),
    }
}

#[tokio::test]
async fn test_markup_strategy_into_sqlite() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_session(&server).await;

    mount_listing(&server, 1, &["dana"]).await;
    mount_listing(&server, 2, &[]).await;
    mount_detail(
        &server,
        "dana",
        r#"<html><body>
            <div class="ProfileFooter-a"><h1 class="StyledHeading-b">Dana Lee</h1></div>
            <a href="tel:+19195550111">(919) 555-0111</a>
            <div><span><strong>9</strong></span><span>sales last 12 months</span></div>
            <div><span><strong>$210K - $640K</strong></span><span>price range</span></div>
        </body></html>"#
            .to_string(),
    )
    .await;

    let mut config = create_test_config(&server, dir.path());
    config.crawl.parser = ParserStrategy::Markup;
    config.output.sink = SinkKind::Sqlite;
    let db_path = config.output.database_path.clone();

    let report = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(report.records_saved, 1);

    let conn = rusqlite::Connection::open(db_path).unwrap();
    let (name, last_year, min_price, max_price): (String, i64, f64, f64) = conn
        .query_row(
            "SELECT agent_name, total_sales_last_12_months, minimum_price_range, maximum_price_range FROM agents",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap();
    assert_eq!(name, "Dana Lee");
    assert_eq!(last_year, 9);
    assert_eq!(min_price, 210000.0);
    assert_eq!(max_price, 640000.0);
}

#[tokio::test]
async fn test_sink_failure_does_not_stop_crawl() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_session(&server).await;

    mount_listing(&server, 1, &["alice", "bob"]).await;
    mount_listing(&server, 2, &[]).await;
    for name in ["alice", "bob"] {
        mount_detail(&server, name, detail_body(name, json!(350000))).await;
    }

    // A directory cannot be opened for appending, so every write fails
    let mut config = create_test_config(&server, dir.path());
    config.output.csv_path = dir.path().display().to_string();
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.termination, Some(Termination::NoLinks { page: 2 }));
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.links_seen, 2);
    assert_eq!(report.records_saved, 0);
    assert_eq!(report.failures_of(ErrorKind::Sink), 2);
    assert_eq!(report.failures_of(ErrorKind::Validation), 0);
}

#[tokio::test]
async fn test_profile_without_agent_fields_is_skipped() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_session(&server).await;

    mount_listing(&server, 1, &["alice", "ghost"]).await;
    mount_listing(&server, 2, &[]).await;
    mount_detail(&server, "alice", detail_body("alice", json!(350000))).await;
    let ghost = json!({"props": {"pageProps": {"displayUser": {"bio": "coming soon"}}}});
    mount_detail(
        &server,
        "ghost",
        format!(
            r#"<html><body><script id="__NEXT_DATA__" type="application/json">{}</script></body></html>"#,
            ghost
        ),
    )
    .await;

    let config = create_test_config(&server, dir.path());
    let csv_path = config.output.csv_path.clone();
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.links_seen, 2);
    assert_eq!(report.records_saved, 1);
    assert_eq!(report.failures_of(ErrorKind::Parse), 1);

    let content = std::fs::read_to_string(csv_path).unwrap();
    assert_eq!(content.lines().count(), 2);
}
