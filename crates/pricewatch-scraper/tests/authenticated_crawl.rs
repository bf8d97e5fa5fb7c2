//! The authenticated family, with a scripted session provider and with the
//! HTTP provider against a mocked file manager.

mod common;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pricewatch_core::FileType;
use pricewatch_scraper::{
    download_document, CrawlRequest, CrawlSession, DiscoveryResult, HttpSessionProvider,
    ScraperError, SessionProvider,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{chain_at, gzip, test_env, test_fetch_options};

/// Replays a fixed session and records every request it receives.
struct ScriptedProvider {
    session: CrawlSession,
    seen: Mutex<Vec<CrawlRequest>>,
}

impl ScriptedProvider {
    fn new(links: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            session: CrawlSession {
                cookies: BTreeMap::from([("cftpSID".to_owned(), "s3ss10n".to_owned())]),
                links: links.iter().map(|l| (*l).to_owned()).collect(),
            },
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SessionProvider for ScriptedProvider {
    async fn crawl(&self, request: &CrawlRequest) -> DiscoveryResult<CrawlSession> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(self.session.clone())
    }
}

#[tokio::test]
async fn store_file_carries_session_cookies() {
    let provider = ScriptedProvider::new(&[
        "https://url.publishedprices.co.il/file/d/Stores7290058140886-20240609-050000.xml",
        "https://url.publishedprices.co.il/file/d/Stores7290058140886-20240610-050000.xml",
        "https://url.publishedprices.co.il/file/d/PriceFull7290058140886-001-202406100500.gz",
    ]);
    let env = test_env().with_session_provider(provider.clone());
    let chain = pricewatch_scraper::find("ramilevi").unwrap();

    let file = chain.store_file(&env, None).await.unwrap();
    assert!(file.url.ends_with("20240610-050000.xml"));
    assert_eq!(file.cookies.get("cftpSID").map(String::as_str), Some("s3ss10n"));

    let seen = provider.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].login_url, "https://url.publishedprices.co.il/login");
    assert_eq!(seen[0].target_url, "https://url.publishedprices.co.il/file");
    assert_eq!(seen[0].username, "RamiLevi");
}

#[tokio::test]
async fn price_files_pick_latest_per_type_for_store() {
    let provider = ScriptedProvider::new(&[
        "https://url.publishedprices.co.il/file/d/PriceFull7290058140886-001-202406100500.gz",
        "https://url.publishedprices.co.il/file/d/PriceFull7290058140886-001-202406100930.gz",
        "https://url.publishedprices.co.il/file/d/Price7290058140886-001-202406101000.gz",
        "https://url.publishedprices.co.il/file/d/Promo7290058140886-002-202406101000.gz",
    ]);
    let env = test_env().with_session_provider(provider);
    let chain = pricewatch_scraper::find("ramilevi").unwrap();

    let files = chain.price_files("1", &env, None).await.unwrap();
    assert_eq!(
        files.keys().copied().collect::<Vec<_>>(),
        vec![FileType::Price, FileType::PriceFull]
    );
    assert!(files[&FileType::PriceFull].url.ends_with("202406100930.gz"));
    assert!(files.values().all(|f| f.cookies.contains_key("cftpSID")));
}

#[tokio::test]
async fn session_cookies_are_sent_with_the_download() {
    let server = MockServer::start().await;
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<Root><ChainId>7290058140886</ChainId><ChainName>רמי לוי</ChainName>
<SubChains><SubChain><SubChainId>1</SubChainId><SubChainName>רמי לוי</SubChainName>
<Stores><Store><StoreId>1</StoreId><StoreName>גבעת שאול</StoreName><City>ירושלים</City></Store></Stores>
</SubChain></SubChains></Root>"#;
    Mock::given(method("GET"))
        .and(path("/file/d/Stores7290058140886-20240610-050000.xml"))
        .and(header("cookie", "cftpSID=s3ss10n"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(xml.as_bytes())))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ScriptedProvider::new(&[&format!(
        "{}/file/d/Stores7290058140886-20240610-050000.xml",
        server.uri()
    )]);
    let env = test_env().with_session_provider(provider);
    let chain = pricewatch_scraper::find("ramilevi").unwrap();

    let file = chain.store_file(&env, None).await.unwrap();
    let document = download_document(chain, &file, &env, None).await.unwrap();
    let records = chain.to_store_records(&document).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].store_name.as_deref(), Some("גבעת שאול"));
    assert_eq!(records[0].subchain_code.as_deref(), Some("1"));
}

// ---------------------------------------------------------------------------
// HTTP session provider
// ---------------------------------------------------------------------------

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><meta name="csrftoken" content="login-token"></head>
            <form><input name="username"><input name="password" type="password"></form></html>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login/user"))
        .and(body_string_contains("username=RamiLevi"))
        .and(body_string_contains("csrftoken=login-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "cftpSID=abc123; Path=/")
                .set_body_string("ok"),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn http_provider_logs_in_and_lists_files() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/file"))
        .and(header("cookie", "cftpSID=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><meta name="csrftoken" content="file-token"></head>
            <table id="fileList"></table></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/file/json/dir"))
        .and(body_string_contains("csrftoken=file-token"))
        .and(body_string_contains("iDisplayStart=0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "iTotalRecords": 3,
            "aaData": [
                { "fname": "Stores7290058140886-202406100500.xml", "ftype": "xml" },
                { "fname": "PriceFull7290058140886-001-202406100500.gz", "ftype": "gz" },
                { "fname": "archive", "ftype": "folder" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = HttpSessionProvider::new(test_fetch_options());
    let request = CrawlRequest {
        login_url: format!("{}/login", server.uri()),
        target_url: format!("{}/file", server.uri()),
        username: "RamiLevi".to_owned(),
        password: None,
        timeout: std::time::Duration::from_secs(5),
    };
    let session = provider.crawl(&request).await.unwrap();

    assert_eq!(
        session.links,
        vec![
            format!("{}/file/d/Stores7290058140886-202406100500.xml", server.uri()),
            format!("{}/file/d/PriceFull7290058140886-001-202406100500.gz", server.uri()),
        ]
    );
    assert_eq!(session.cookies.get("cftpSID").map(String::as_str), Some("abc123"));
}

#[tokio::test]
async fn http_provider_reports_rejected_login() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    // Still on the login form after posting credentials.
    Mock::given(method("GET"))
        .and(path("/file"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<form><input name="username"><input name="password" type="password"></form>"#,
        ))
        .mount(&server)
        .await;

    let chain = chain_at("ramilevi", format!("{}/", server.uri()));
    let env = test_env().with_session_provider(Arc::new(HttpSessionProvider::new(
        test_fetch_options(),
    )));
    let err = chain.store_file(&env, None).await.unwrap_err();
    assert!(
        matches!(&err, ScraperError::AuthenticationFailure { username, .. } if username == "RamiLevi"),
        "expected AuthenticationFailure, got: {err:?}"
    );
}

#[tokio::test]
async fn missing_credentials_are_unsupported() {
    let chain = pricewatch_scraper::find("ramilevi").unwrap();
    let mut descriptor = chain.descriptor().clone();
    descriptor.credentials = None;
    let chain = pricewatch_scraper::Chain::new(descriptor);

    let err = chain.store_file(&test_env(), None).await.unwrap_err();
    assert!(matches!(err, ScraperError::Unsupported { .. }));
}
