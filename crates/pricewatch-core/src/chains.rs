//! The fixed table of chains the acquisition layer knows how to reach.
//!
//! Every entry is static configuration: nothing here is discovered or
//! mutated at runtime. Per-chain quirks that used to live in overridden
//! methods (store-file layout, link pattern, promo blacklist, XML repair)
//! are explicit fields with defaults spelled out in the table.

use std::borrow::Cow;

use serde::Serialize;

/// Which adapter family publishes a chain's files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Form POST per date, walking back day by day.
    BinaProjects,
    /// Static page with the file list embedded as JSON.
    Carrefour,
    /// Login-gated file manager.
    PublishedPrices,
    /// Paginated HTML directory, no login.
    HaziHinam,
    /// Single static HTML table shared by several chains.
    LaibCatalog,
    /// Query-parameter HTML grid.
    Shufersal,
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LinkType::BinaProjects => "binaprojects",
            LinkType::Carrefour => "carrefour",
            LinkType::PublishedPrices => "publishedprices",
            LinkType::HaziHinam => "hazihinam",
            LinkType::LaibCatalog => "laibcatalog",
            LinkType::Shufersal => "shufersal",
        };
        f.write_str(s)
    }
}

/// How a chain's store-list XML nests its stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLayout {
    /// `Root/SubChains/SubChain` is a single object holding `Stores/Store`.
    SingleSubChain,
    /// `Root/SubChains/SubChain` is a list, each holding `Stores/Store`.
    SubChainList,
    /// SAP export: `asx:abap/asx:values/STORES/STORE` with `CHAINID`.
    SapValues,
    /// Catalogue export: `Store/Branches/Branch`, no chain header.
    Branches,
}

/// File-name pattern variant used by the authenticated crawl family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPattern {
    #[default]
    Default,
    Alternate,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub username: &'static str,
    pub password: Option<&'static str>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.map(|_| "[redacted]"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDescriptor {
    /// GS1 company prefix; unique across all chains.
    pub chain_code: &'static str,
    pub alias: &'static str,
    pub name: &'static str,
    /// Site root the adapter family builds its endpoints from.
    pub base_url: Cow<'static, str>,
    pub credentials: Option<Credentials>,
    pub link_type: LinkType,
    pub store_layout: StoreLayout,
    pub link_pattern: LinkPattern,
    /// `PromotionId`s of chain-wide promotions consumers should ignore.
    pub promo_blacklist: &'static [&'static str],
    /// The store file omits `</SubChain>` before `</SubChains>`.
    pub repair_missing_subchain: bool,
}

impl ChainDescriptor {
    /// Copy of this descriptor pointed at another site root.
    #[must_use]
    pub fn with_base_url(&self, base_url: impl Into<String>) -> Self {
        Self {
            base_url: Cow::Owned(base_url.into()),
            ..self.clone()
        }
    }
}

const fn binaprojects(
    chain_code: &'static str,
    alias: &'static str,
    name: &'static str,
    base_url: &'static str,
    store_layout: StoreLayout,
) -> ChainDescriptor {
    ChainDescriptor {
        chain_code,
        alias,
        name,
        base_url: Cow::Borrowed(base_url),
        credentials: None,
        link_type: LinkType::BinaProjects,
        store_layout,
        link_pattern: LinkPattern::Default,
        promo_blacklist: &[],
        repair_missing_subchain: false,
    }
}

const fn published_prices(
    chain_code: &'static str,
    alias: &'static str,
    name: &'static str,
    credentials: Credentials,
    store_layout: StoreLayout,
    link_pattern: LinkPattern,
) -> ChainDescriptor {
    ChainDescriptor {
        chain_code,
        alias,
        name,
        base_url: Cow::Borrowed("https://url.publishedprices.co.il/"),
        credentials: Some(credentials),
        link_type: LinkType::PublishedPrices,
        store_layout,
        link_pattern,
        promo_blacklist: &[],
        repair_missing_subchain: false,
    }
}

const fn laib_catalog(
    chain_code: &'static str,
    alias: &'static str,
    name: &'static str,
) -> ChainDescriptor {
    ChainDescriptor {
        chain_code,
        alias,
        name,
        base_url: Cow::Borrowed("https://laibcatalog.co.il/"),
        credentials: None,
        link_type: LinkType::LaibCatalog,
        store_layout: StoreLayout::Branches,
        link_pattern: LinkPattern::Default,
        promo_blacklist: &[],
        repair_missing_subchain: false,
    }
}

const fn user(username: &'static str) -> Credentials {
    Credentials {
        username,
        password: None,
    }
}

pub static CHAINS: [ChainDescriptor; 25] = [
    // binaprojects
    binaprojects(
        "7290058108879",
        "kingstore",
        "אלמשהדאוי קינג סטור בע\"מ",
        "https://kingstore.binaprojects.com/",
        StoreLayout::SingleSubChain,
    ),
    binaprojects(
        "7290058159628",
        "maayan2000",
        "ג.מ מעיין אלפיים (07) בע\"מ",
        "https://maayan2000.binaprojects.com/",
        StoreLayout::SingleSubChain,
    ),
    binaprojects(
        "7290058197699",
        "goodpharm",
        "גוד פארם בע\"מ",
        "https://goodpharm.binaprojects.com/",
        StoreLayout::SingleSubChain,
    ),
    binaprojects(
        "7290058173198",
        "zulvbgadol",
        "זול ובגדול בע\"מ",
        "https://zolvebegadol.binaprojects.com/",
        StoreLayout::SingleSubChain,
    ),
    binaprojects(
        "7290058156016",
        "supersapir",
        "סופר ספיר בע\"מ",
        "https://supersapir.binaprojects.com/",
        StoreLayout::SubChainList,
    ),
    binaprojects(
        "7290058266241",
        "citymarket",
        "סיטי מרקט",
        "https://citymarketkiryatgat.binaprojects.com/",
        StoreLayout::SingleSubChain,
    ),
    binaprojects(
        "7290875100001",
        "superbareket",
        "עוף והודו ברקת - חנות המפעל בע\"מ",
        "https://superbareket.binaprojects.com/",
        StoreLayout::SubChainList,
    ),
    binaprojects(
        "5144744100001",
        "kt",
        "קיי.טי. יבוא ושיווק בע\"מ (משנת יוסף)",
        "https://ktshivuk.binaprojects.com/",
        StoreLayout::SingleSubChain,
    ),
    binaprojects(
        "7290058148776",
        "shukhayir",
        "שוק העיר (ט.ע.מ.ס) בע\"מ",
        "https://shuk-hayir.binaprojects.com/",
        StoreLayout::SingleSubChain,
    ),
    binaprojects(
        "7290058134977",
        "shefabirkathashem",
        "שפע ברכת השם בע\"מ",
        "https://shefabirkathashem.binaprojects.com/",
        StoreLayout::SingleSubChain,
    ),
    // carrefour
    ChainDescriptor {
        chain_code: "7290055700007",
        alias: "carrefour",
        name: "קרפור/ ביתן אונליין",
        base_url: Cow::Borrowed("https://prices.carrefour.co.il/"),
        credentials: None,
        link_type: LinkType::Carrefour,
        store_layout: StoreLayout::SingleSubChain,
        link_pattern: LinkPattern::Default,
        promo_blacklist: &["11366992", "11211378", "11347342"],
        repair_missing_subchain: false,
    },
    // publishedprices
    published_prices(
        "7290058140886",
        "ramilevi",
        "רשת חנויות רמי לוי שיווק השקמה 2006 בע\"מ",
        user("RamiLevi"),
        StoreLayout::SingleSubChain,
        LinkPattern::Default,
    ),
    published_prices(
        "7290492000005",
        "doralon",
        "דור אלון ניהול מתחמים קמעונאיים בע\"מ",
        user("doralon"),
        StoreLayout::SubChainList,
        LinkPattern::Alternate,
    ),
    published_prices(
        "7290873255550",
        "tivtaam",
        "טיב טעם רשתות בע\"מ",
        user("TivTaam"),
        StoreLayout::SingleSubChain,
        LinkPattern::Default,
    ),
    published_prices(
        "7290803800003",
        "yohananof",
        "מ. יוחננוף ובניו (1988) בע\"מ",
        user("yohananof"),
        StoreLayout::SingleSubChain,
        LinkPattern::Default,
    ),
    published_prices(
        "7290103152017",
        "osherad",
        "מרב-מזון כל בע\"מ (אושר עד)",
        user("osherad"),
        StoreLayout::SingleSubChain,
        LinkPattern::Default,
    ),
    published_prices(
        "7290526500006",
        "salahdabah",
        "סאלח דבאח ובניו בע\"מ",
        Credentials {
            username: "SalachD",
            password: Some("12345"),
        },
        StoreLayout::SingleSubChain,
        LinkPattern::Default,
    ),
    published_prices(
        "7290639000004",
        "stopmarket",
        "סטופ מרקט בע\"מ",
        user("Stop_Market"),
        StoreLayout::SingleSubChain,
        LinkPattern::Default,
    ),
    published_prices(
        "7291059100008",
        "politzer",
        "פוליצר חדרה (1982) בע\"מ",
        user("politzer"),
        StoreLayout::SingleSubChain,
        LinkPattern::Alternate,
    ),
    published_prices(
        "7290785400000",
        "keshettaamim",
        "קשת טעמים בע\"מ",
        user("Keshet"),
        StoreLayout::SingleSubChain,
        LinkPattern::Default,
    ),
    // hazihinam
    ChainDescriptor {
        chain_code: "7290700100008",
        alias: "hazihinam",
        name: "כל בו חצי חינם בע\"מ",
        base_url: Cow::Borrowed("https://shop.hazi-hinam.co.il/Prices"),
        credentials: None,
        link_type: LinkType::HaziHinam,
        store_layout: StoreLayout::SingleSubChain,
        link_pattern: LinkPattern::Default,
        promo_blacklist: &[],
        repair_missing_subchain: true,
    },
    // laibcatalog
    laib_catalog(
        "7290696200003",
        "victory",
        "ויקטורי רשת סופרמרקטים בע\"מ",
    ),
    laib_catalog(
        "7290455000004",
        "hcohen",
        "ח. כהן סוכנות מזון ומשקאות בע\"מ",
    ),
    laib_catalog("7290661400001", "knmarket", "כ.נ מחסני השוק בע\"מ"),
    // shufersal
    ChainDescriptor {
        chain_code: "7290027600007",
        alias: "shufersal",
        name: "שופרסל בע\"מ (כולל רשת BE)",
        base_url: Cow::Borrowed("https://prices.shufersal.co.il/"),
        credentials: None,
        link_type: LinkType::Shufersal,
        store_layout: StoreLayout::SapValues,
        link_pattern: LinkPattern::Default,
        promo_blacklist: &["4305214", "4327051"],
        repair_missing_subchain: false,
    },
];

/// Look up a chain by its code or alias (alias match is case-insensitive).
#[must_use]
pub fn find_chain(key: &str) -> Option<&'static ChainDescriptor> {
    CHAINS
        .iter()
        .find(|c| c.chain_code == key || c.alias.eq_ignore_ascii_case(key))
}
