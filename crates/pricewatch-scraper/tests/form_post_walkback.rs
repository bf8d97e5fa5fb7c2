//! Date-walkback discovery against a mocked `MainIO_Hok.aspx`.

mod common;

use pricewatch_core::FileType;
use pricewatch_scraper::ScraperError;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use common::{chain_at, test_env};

fn day_request(store: &str, date: &str, file_type: u8) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/MainIO_Hok.aspx"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .and(body_string_contains(format!("WStore={store}&")))
        .and(body_string_contains(format!(
            "WDate={}",
            date.replace('/', "%2F")
        )))
        .and(body_string_contains(format!("WFileType={file_type}")))
}

#[tokio::test]
async fn steps_back_one_day_and_stops_at_first_listing() {
    let server = MockServer::start().await;

    day_request("0", "10/06/2024", 2)
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;
    day_request("0", "09/06/2024", 2)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "FileNm": "Price7290058108879-000-202406090700.gz", "DateFile": "07:00 09/06/2024" },
            { "FileNm": "Price7290058108879-000-202406091800.gz", "DateFile": "18:00 09/06/2024" }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    day_request("0", "08/06/2024", 2)
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;
    // Other types: nothing published.
    Mock::given(method("POST"))
        .and(path("/MainIO_Hok.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let chain = chain_at("kingstore", server.uri());
    let files = chain.price_files("0", &test_env(), None).await.unwrap();

    assert_eq!(files.keys().copied().collect::<Vec<_>>(), vec![FileType::Price]);
    assert_eq!(
        files[&FileType::Price].url,
        format!("{}/Download/Price7290058108879-000-202406091800.gz", server.uri())
    );
}

#[tokio::test]
async fn gives_up_after_fifteen_days() {
    let server = MockServer::start().await;

    // The oldest day requested is today minus 14.
    day_request("0", "27/05/2024", 1)
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;
    day_request("0", "26/05/2024", 1)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "FileNm": "Stores7290058108879-000-202405260500.xml", "DateFile": "05:00 26/05/2024" }
        ])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/MainIO_Hok.aspx"))
        .and(body_string_contains("WFileType=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(14)
        .mount(&server)
        .await;

    let chain = chain_at("kingstore", server.uri());
    let err = chain.store_file(&test_env(), None).await.unwrap_err();

    assert!(
        matches!(
            err,
            ScraperError::NoRecentFile { file_type: FileType::Stores, days: 14, .. }
        ),
        "expected NoRecentFile, got: {err:?}"
    );
}

#[tokio::test]
async fn store_file_uses_latest_row_of_first_listed_day() {
    let server = MockServer::start().await;

    day_request("0", "10/06/2024", 1)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "FileNm": "Stores7290058108879-000-202406100300.xml", "DateFile": "03:00 10/06/2024" },
            { "FileNm": "Stores7290058108879-000-202406100500.xml", "DateFile": "05:00 10/06/2024" }
        ])))
        .mount(&server)
        .await;

    let chain = chain_at("kingstore", server.uri());
    let file = chain.store_file(&test_env(), None).await.unwrap();
    assert_eq!(file.file_type, FileType::Stores);
    assert!(file.url.ends_with("/Download/Stores7290058108879-000-202406100500.xml"));
    assert!(file.cookies.is_empty());
}

#[tokio::test]
async fn http_error_ends_the_walk() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/MainIO_Hok.aspx"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let chain = chain_at("kingstore", server.uri());
    let err = chain.store_file(&test_env(), None).await.unwrap_err();
    assert!(matches!(err, ScraperError::HttpStatus { status: 503, .. }));
}

#[tokio::test]
async fn price_files_fail_when_every_type_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/MainIO_Hok.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let chain = chain_at("kingstore", server.uri());
    let err = chain.price_files("1", &test_env(), None).await.unwrap_err();
    assert!(matches!(err, ScraperError::MalformedDocument { .. }));
}
