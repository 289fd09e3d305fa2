use crate::adapters::extract;
use crate::error::{Result, ScraperError};
use crate::fetch::PoliteClient;
use crate::types::{RawRecord, SourceId};
use chrono::Utc;
use scraper::{Html, Selector};
use tracing::{info, warn};

const BASE_URL: &str = "https://dir.indiamart.com";
const MAX_RECORDS_PER_PAGE: usize = 20;

/// Crawler for IndiaMART directory search results.
pub struct IndiaMartAdapter {
    search_term: String,
    keywords: Vec<String>,
}

impl IndiaMartAdapter {
    pub fn new(search_term: &str) -> Self {
        Self {
            search_term: search_term.to_string(),
            keywords: extract::screening_keywords(search_term),
        }
    }

    fn search_url(&self, page: u32) -> String {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/search.mp", BASE_URL),
            &[
                ("ss", self.search_term.as_str()),
                ("page", &page.to_string()),
            ],
        )
        .expect("static base URL is valid");
        url.to_string()
    }

    fn extract_card(&self, card: &scraper::ElementRef, listing_url: &str) -> Option<RawRecord> {
        let name_sel = Selector::parse(".company-name-text, .companyname a, h2 a").unwrap();
        let contact_sel = Selector::parse(".contact-no, .mobile, .pns_h").unwrap();
        let city_sel = Selector::parse(".city-name, .newest-loc, .location").unwrap();
        let product_sel = Selector::parse(".product-name, .prd-name").unwrap();

        let name = card
            .select(&name_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())?;
        if name.len() < 3 {
            return None;
        }

        let card_text = card.text().collect::<Vec<_>>().join(" ");

        let phone = card
            .select(&contact_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| extract::phone_from_text(&card_text))
            .unwrap_or_default();

        let address = card
            .select(&city_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        let description = card
            .select(&product_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_else(|| card_text.chars().take(500).collect());

        Some(RawRecord {
            source: SourceId::IndiaMart,
            name,
            phone,
            email: extract::email_from_text(&card_text).unwrap_or_default(),
            address,
            website: extract::website_from_text(&card_text).unwrap_or_default(),
            description,
            listing_url: listing_url.to_string(),
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait::async_trait]
impl crate::types::SourceAdapter for IndiaMartAdapter {
    fn source_id(&self) -> SourceId {
        SourceId::IndiaMart
    }

    async fn fetch_page(&self, page: u32, client: &PoliteClient) -> Result<String> {
        let url = self.search_url(page);
        info!(page, %url, "fetching IndiaMART listing page");
        client.get_page(SourceId::IndiaMart, page, &url).await
    }

    fn parse_page(&self, html: &str, page: u32) -> Result<Vec<RawRecord>> {
        let document = Html::parse_document(html);
        let card_sel = Selector::parse(".lst, .company-card, .seller-card").unwrap();

        let page_text = document.root_element().text().collect::<Vec<_>>().join(" ");
        if !extract::page_mentions_any(&page_text, &self.keywords) {
            warn!(page, "IndiaMART page has no commodity keywords, skipping");
            return Ok(Vec::new());
        }

        let cards: Vec<_> = document.select(&card_sel).collect();
        if cards.is_empty() {
            if !html.contains("indiamart") {
                return Err(ScraperError::Parse {
                    platform: SourceId::IndiaMart.to_string(),
                    page,
                });
            }
            return Ok(Vec::new());
        }

        let listing_url = self.search_url(page);
        let records: Vec<RawRecord> = cards
            .iter()
            .take(MAX_RECORDS_PER_PAGE)
            .filter_map(|card| self.extract_card(card, &listing_url))
            .collect();

        info!(page, count = records.len(), "parsed IndiaMART listings");
        Ok(records)
    }
}
