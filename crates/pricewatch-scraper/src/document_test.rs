use std::collections::HashSet;

use pricewatch_core::find_chain;
use serde_json::json;

use super::*;

#[test]
fn first_present_respects_priority_and_skips_empty() {
    let store = json!({ "STOREID": "12", "StoreId": "99", "StoreID": "" });
    assert_eq!(first_present(&store, STORE_CODE), Some(&json!("12")));
    assert_eq!(first_text(&store, STORE_CODE).as_deref(), Some("12"));
    assert_eq!(first_present(&store, CITY), None);
}

#[test]
fn first_text_reads_text_of_attributed_elements() {
    let store = json!({ "City": { "@lang": "he", "#text": "חיפה" } });
    assert_eq!(first_text(&store, CITY).as_deref(), Some("חיפה"));
}

#[test]
fn as_list_normalizes_single_and_missing() {
    let one = json!({ "Item": { "ItemCode": "1" } });
    let many = json!({ "Item": [{ "ItemCode": "1" }, { "ItemCode": "2" }] });
    assert_eq!(as_list(one.get("Item")).len(), 1);
    assert_eq!(as_list(many.get("Item")).len(), 2);
    assert!(as_list(one.get("Nope")).is_empty());
    assert!(as_list(Some(&Value::Null)).is_empty());
}

#[test]
fn single_subchain_layout() {
    let chain = find_chain("hazihinam").unwrap();
    let doc = json!({
        "Root": {
            "ChainID": "7290700100008",
            "ChainName": "חצי חינם",
            "SubChains": { "SubChain": {
                "SubChainID": "1",
                "SubChainName": "חצי חינם",
                "Stores": { "Store": [
                    { "StoreID": "2", "StoreName": "חולון", "City": "חולון", "ZipCode": "58000" },
                    { "StoreID": "3", "StoreName": "ראשון", "Address": "הרצל 1" }
                ]}
            }}
        }
    });
    let records = to_store_records(chain, &doc).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].chain_code, "7290700100008");
    assert_eq!(records[0].chain_name.as_deref(), Some("חצי חינם"));
    assert_eq!(records[0].subchain_code.as_deref(), Some("1"));
    assert_eq!(records[0].store_code, "2");
    assert_eq!(records[0].zip.as_deref(), Some("58000"));
    assert_eq!(records[1].address.as_deref(), Some("הרצל 1"));
    assert_eq!(records[1].city, None);
}

#[test]
fn subchain_list_layout_skips_string_entries() {
    let chain = find_chain("supersapir").unwrap();
    let doc = json!({
        "Root": {
            "ChainId": "7290058156016",
            "SubChains": { "SubChain": [
                { "SubChainId": "1", "Stores": { "Store": { "StoreId": "10", "StoreName": "A" } } },
                { "SubChainId": "2", "Stores": { "Store": ["stray text", { "StoreId": "20" }] } }
            ]}
        }
    });
    let records = to_store_records(chain, &doc).unwrap();
    let codes: Vec<_> = records
        .iter()
        .map(|r| (r.subchain_code.as_deref(), r.store_code.as_str()))
        .collect();
    assert_eq!(codes, vec![(Some("1"), "10"), (Some("2"), "20")]);
    assert_eq!(records[0].chain_name.as_deref(), Some(chain.name));
}

#[test]
fn sap_layout() {
    let chain = find_chain("shufersal").unwrap();
    let doc = json!({
        "asx:abap": { "asx:values": {
            "CHAINID": "7290027600007",
            "STORES": { "STORE": [
                { "SUBCHAINID": "1", "SUBCHAINNAME": "שופרסל דיל", "STOREID": "1",
                  "STORENAME": "שלי ת\"א", "STORETYPE": "1", "ADDRESS": "רוטשילד 79", "CITY": "תל אביב", "ZIPCODE": "" }
            ]}
        }}
    });
    let records = to_store_records(chain, &doc).unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.chain_code, "7290027600007");
    assert_eq!(r.subchain_name.as_deref(), Some("שופרסל דיל"));
    assert_eq!(r.store_type.as_deref(), Some("1"));
    assert_eq!(r.zip, None);
}

#[test]
fn branches_layout_uses_descriptor_chain_code() {
    let chain = find_chain("victory").unwrap();
    let doc = json!({
        "Store": { "Branches": { "Branch": [
            { "StoreID": "1", "StoreName": "ויקטורי אשדוד" },
            { "StoreName": "no code" }
        ]}}
    });
    let records = to_store_records(chain, &doc).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].chain_code, "7290696200003");
}

#[test]
fn wrong_layout_is_malformed() {
    let chain = find_chain("shufersal").unwrap();
    let doc = json!({ "Root": {} });
    assert!(matches!(
        to_store_records(chain, &doc),
        Err(ScraperError::MalformedDocument { .. })
    ));
}

#[test]
fn price_items_are_tagged() {
    let doc = json!({ "root": { "Items": { "Item": [
        { "ItemCode": "7290000000001", "ItemName": "חלב 3%", "ItemPrice": "6.90" },
        { "ItemCode": "7290000000002", "ItemName": "לחם אחיד", "ItemPrice": "8.50" }
    ]}}});
    let items = price_items(&doc, "shufersal").unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i[CHAIN_ALIAS_KEY] == "shufersal"));
    assert_eq!(items[1]["ItemPrice"], "8.50");
}

#[test]
fn price_items_require_items() {
    assert!(price_items(&json!({ "Root": {} }), "x").is_err());
    assert!(price_items(&json!({ "Other": {} }), "x").is_err());
    assert!(price_items(&json!({ "Root": { "Items": null } }), "x")
        .unwrap()
        .is_empty());
}

#[test]
fn promotions_drop_blacklisted_ids() {
    let doc = json!({ "Root": { "Promotions": { "Promotion": [
        { "PromotionId": "4305214", "PromotionItems": { "Item": { "ItemCode": "1" } } },
        { "PromotionId": " 555 ", "PromotionItems": { "Item": [{ "ItemCode": "1" }, { "ItemCode": "2" }] },
          "Clubs": { "ClubId": "1" } }
    ]}}});
    let blacklist: HashSet<String> = ["4305214".to_owned()].into();
    let promos = promotions(&doc, "shufersal", &blacklist).unwrap();
    assert_eq!(promos.len(), 1);
    assert_eq!(promos[0][CHAIN_ALIAS_KEY], "shufersal");
    assert_eq!(promo_audience(&promos[0]), Some(Audience::ClubMembers));
    assert_eq!(promos[0][AUDIENCE_KEY], "Club Members");
}

#[test]
fn promotions_without_a_club_have_no_audience() {
    let doc = json!({ "Root": { "Promotions": { "Promotion": [
        { "PromotionId": "1" },
        { "PromotionId": "2", "AdditionalRestrictions": { "Clubs": { "ClubId": "2" } } }
    ]}}});
    let promos = promotions(&doc, "victory", &HashSet::new()).unwrap();
    assert!(promos[0].get(AUDIENCE_KEY).is_none());
    assert_eq!(promos[1][AUDIENCE_KEY], "Creditcard Holders");
}

#[test]
fn promo_audience_reads_nested_restrictions() {
    let promo = json!({ "AdditionalRestrictions": { "Clubs": { "ClubId": "0" } } });
    assert_eq!(promo_audience(&promo), Some(Audience::AllCustomers));
    let multi = json!({ "Clubs": [{ "ClubId": "2" }, { "ClubId": "0" }] });
    assert_eq!(promo_audience(&multi), Some(Audience::CreditCardHolders));
    assert_eq!(promo_audience(&json!({})), None);
    assert_eq!(Audience::Other.label(), "Other / Unspecified");
}
