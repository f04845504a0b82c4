//! Keyword crawl behavior against a mock search endpoint
//!
//! These tests drive the crawler end-to-end over HTTP and check pagination,
//! per-keyword deduplication, filtering and cross-keyword merging.

use crate::common::{empty_page, page, search_client, search_item, SEARCH_PATH};
use bili_sweep::config::ScraperConfig;
use bili_sweep::{Crawler, KeywordMatcher};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawler_for(server: &MockServer, keywords: &[&str], max_pages: u32) -> Crawler {
    let client = Arc::new(search_client(&server.uri(), 2));
    let matcher = Arc::new(KeywordMatcher::new(keywords).unwrap());
    let config = ScraperConfig {
        max_pages,
        page_delay_ms: 0,
        ..ScraperConfig::default()
    };
    Crawler::new(client, matcher, &config)
}

async fn mount_page(server: &MockServer, keyword: &str, pn: u32, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("keyword", keyword))
        .and(query_param("pn", pn.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pagination_stops_at_empty_page() {
    let server = MockServer::start().await;

    mount_page(&server, "foo", 1, page(vec![search_item("BV1", "foo one", 5)])).await;
    mount_page(&server, "foo", 2, empty_page()).await;

    // Never reached
    Mock::given(method("GET"))
        .and(query_param("pn", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = crawler_for(&server, &["foo"], 10);
    let videos = crawler.crawl_keyword("foo").await.unwrap();

    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].bvid, "BV1");
    assert_eq!(videos[0].url, "https://www.bilibili.com/video/BV1");
    assert_eq!(videos[0].matches, vec!["foo"]);
    assert_eq!(videos[0].hot, 5);
}

#[tokio::test]
async fn test_pagination_respects_max_pages() {
    let server = MockServer::start().await;

    mount_page(&server, "foo", 1, page(vec![search_item("BV1", "foo", 1)])).await;
    mount_page(&server, "foo", 2, page(vec![search_item("BV2", "foo", 1)])).await;

    let crawler = crawler_for(&server, &["foo"], 2);
    let videos = crawler.crawl_keyword("foo").await.unwrap();

    let bvids: Vec<&str> = videos.iter().map(|v| v.bvid.as_str()).collect();
    assert_eq!(bvids, vec!["BV1", "BV2"]);
}

#[tokio::test]
async fn test_duplicate_bvid_across_pages_keeps_first() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "foo",
        1,
        page(vec![search_item("BV1", "<em class=\"keyword\">foo</em> first", 10)]),
    )
    .await;
    mount_page(
        &server,
        "foo",
        2,
        page(vec![
            search_item("BV1", "foo second", 99),
            search_item("BV2", "more foo", 3),
        ]),
    )
    .await;
    mount_page(&server, "foo", 3, empty_page()).await;

    let crawler = crawler_for(&server, &["foo"], 10);
    let videos = crawler.crawl_keyword("foo").await.unwrap();

    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0].bvid, "BV1");
    // Title is kept raw, markup included
    assert_eq!(videos[0].title, "<em class=\"keyword\">foo</em> first");
    assert_eq!(videos[0].hot, 10);
    assert_eq!(videos[1].bvid, "BV2");
}

#[tokio::test]
async fn test_items_are_filtered() {
    let server = MockServer::start().await;

    let mut no_pubdate = search_item("BVnodate", "foo without date", 1);
    no_pubdate.as_object_mut().unwrap().remove("pubdate");

    let mut no_bvid = search_item("", "foo without bvid", 1);
    no_bvid.as_object_mut().unwrap().remove("bvid");

    let mut by_description = search_item("BVdesc", "unrelated title", 1);
    by_description["description"] = json!("all about foo");

    mount_page(
        &server,
        "foo",
        1,
        page(vec![
            no_pubdate,
            no_bvid,
            search_item("BVmiss", "nothing relevant", 1),
            search_item("BVcase", "FOO in capitals", 1),
            by_description,
            search_item("BVhit", "foo &amp; friends", 1),
        ]),
    )
    .await;
    mount_page(&server, "foo", 2, empty_page()).await;

    let crawler = crawler_for(&server, &["foo"], 10);
    let videos = crawler.crawl_keyword("foo").await.unwrap();

    let bvids: Vec<&str> = videos.iter().map(|v| v.bvid.as_str()).collect();
    assert_eq!(bvids, vec!["BVdesc", "BVhit"]);
    assert_eq!(videos[0].metadata["raw"]["description"], "all about foo");
}

#[tokio::test]
async fn test_rejected_page_keeps_earlier_results() {
    let server = MockServer::start().await;

    mount_page(&server, "foo", 1, page(vec![search_item("BV1", "foo", 1)])).await;
    Mock::given(method("GET"))
        .and(query_param("pn", "2"))
        .respond_with(ResponseTemplate::new(412).set_body_string("blocked"))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = crawler_for(&server, &["foo"], 10);
    let videos = crawler.crawl_keyword("foo").await.unwrap();

    assert_eq!(videos.len(), 1);
}

#[tokio::test]
async fn test_missing_data_object_ends_pagination() {
    let server = MockServer::start().await;

    mount_page(&server, "foo", 1, json!({ "code": -412, "message": "请求被拦截" })).await;

    let crawler = crawler_for(&server, &["foo"], 10);
    let videos = crawler.crawl_keyword("foo").await.unwrap();

    assert!(videos.is_empty());
}

#[tokio::test]
async fn test_exhausted_keyword_does_not_stop_siblings() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("keyword", "bar"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "foo", 1, page(vec![search_item("BV1", "foo", 1)])).await;
    mount_page(&server, "foo", 2, empty_page()).await;

    let crawler = crawler_for(&server, &["foo", "bar"], 10);
    let videos = crawler
        .crawl_all(&["foo".to_string(), "bar".to_string()])
        .await
        .unwrap();

    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].bvid, "BV1");
}

#[tokio::test]
async fn test_crawl_all_merges_by_bvid() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "foo",
        1,
        page(vec![
            search_item("BV1", "foo one", 1),
            search_item("BVboth", "foo and bar", 1),
        ]),
    )
    .await;
    mount_page(&server, "foo", 2, empty_page()).await;
    mount_page(
        &server,
        "bar",
        1,
        page(vec![
            search_item("BV2", "bar two", 1),
            search_item("BVboth", "foo and bar", 1),
        ]),
    )
    .await;
    mount_page(&server, "bar", 2, empty_page()).await;

    let crawler = crawler_for(&server, &["foo", "bar"], 10);
    let videos = crawler
        .crawl_all(&["foo".to_string(), "bar".to_string()])
        .await
        .unwrap();

    let mut bvids: Vec<&str> = videos.iter().map(|v| v.bvid.as_str()).collect();
    bvids.sort_unstable();
    assert_eq!(bvids, vec!["BV1", "BV2", "BVboth"]);

    let both = videos.iter().find(|v| v.bvid == "BVboth").unwrap();
    assert_eq!(both.matches, vec!["bar", "foo"]);
}
