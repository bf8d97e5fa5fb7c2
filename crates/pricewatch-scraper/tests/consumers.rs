//! Price and promotion consumers, end to end through discovery and download.

mod common;

use pricewatch_core::FileType;
use pricewatch_scraper::document::{AUDIENCE_KEY, CHAIN_ALIAS_KEY};
use pricewatch_scraper::{price_items, promotions, ScraperError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{chain_at, gzip, test_env};

const PROMO_FULL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Root><ChainId>7290027600007</ChainId><StoreId>123</StoreId>
<Promotions>
  <Promotion><PromotionId>4305214</PromotionId><PromotionDescription>blocked</PromotionDescription>
    <Clubs><ClubId>0</ClubId></Clubs></Promotion>
  <Promotion><PromotionId>900</PromotionId><PromotionDescription>2 ב-10</PromotionDescription>
    <Clubs><ClubId>1</ClubId></Clubs></Promotion>
  <Promotion><PromotionId>901</PromotionId><PromotionDescription>no club</PromotionDescription></Promotion>
</Promotions></Root>"#;

fn grid(links: &[String]) -> String {
    let rows: String = links
        .iter()
        .map(|href| format!(r#"<tr><td><a href="{href}">download</a></td></tr>"#))
        .collect();
    format!(r#"<table class="webgrid"><tbody>{rows}</tbody></table>"#)
}

/// Grid listing `links` for `cat`; every other category lists nothing.
async fn mount_grid(server: &MockServer, cat: &str, links: &[String]) {
    Mock::given(method("GET"))
        .and(path("/FileObject/UpdateCategory"))
        .and(query_param("catID", cat))
        .respond_with(ResponseTemplate::new(200).set_body_string(grid(links)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/FileObject/UpdateCategory"))
        .respond_with(ResponseTemplate::new(200).set_body_string(grid(&[])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn promotions_are_tagged_filtered_and_labelled() {
    let server = MockServer::start().await;
    let file = format!(
        "{}/promofull/PromoFull7290027600007-123-202406100200.gz",
        server.uri()
    );
    mount_grid(&server, "4", &[file]).await;
    Mock::given(method("GET"))
        .and(path("/promofull/PromoFull7290027600007-123-202406100200.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(PROMO_FULL.as_bytes())))
        .expect(1)
        .mount(&server)
        .await;

    let chain = chain_at("shufersal", server.uri());
    let promos = promotions(&chain, "123", FileType::PromoFull, &test_env(), None)
        .await
        .unwrap();

    assert_eq!(promos.len(), 2, "blacklisted promotion is dropped");
    assert_eq!(promos[0]["PromotionId"], "900");
    assert_eq!(promos[0][CHAIN_ALIAS_KEY], "shufersal");
    assert_eq!(promos[0][AUDIENCE_KEY], "Club Members");
    assert!(promos[1].get(AUDIENCE_KEY).is_none());
}

#[tokio::test]
async fn missing_file_type_is_no_price_files() {
    let server = MockServer::start().await;
    let file = format!(
        "{}/promofull/PromoFull7290027600007-123-202406100200.gz",
        server.uri()
    );
    mount_grid(&server, "4", &[file]).await;

    let chain = chain_at("shufersal", server.uri());
    let err = price_items(&chain, "123", FileType::PriceFull, &test_env(), None)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ScraperError::NoPriceFiles { file_type: FileType::PriceFull, .. }),
        "got: {err:?}"
    );
}
