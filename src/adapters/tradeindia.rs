use crate::adapters::extract;
use crate::error::{Result, ScraperError};
use crate::fetch::PoliteClient;
use crate::types::{RawRecord, SourceId};
use chrono::Utc;
use scraper::{Html, Selector};
use tracing::{info, warn};

const BASE_URL: &str = "https://www.tradeindia.com";
const MAX_RECORDS_PER_PAGE: usize = 20;

/// Crawler for TradeIndia buyer listings.
pub struct TradeIndiaAdapter {
    search_term: String,
    keywords: Vec<String>,
}

impl TradeIndiaAdapter {
    pub fn new(search_term: &str) -> Self {
        Self {
            search_term: search_term.to_string(),
            keywords: extract::screening_keywords(search_term),
        }
    }

    fn search_url(&self, page: u32) -> String {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/Seller/search.html", BASE_URL),
            &[
                ("ss", self.search_term.as_str()),
                ("t", "buyer"),
                ("page", &page.to_string()),
            ],
        )
        .expect("static base URL is valid");
        url.to_string()
    }

    fn extract_card(&self, card: &scraper::ElementRef, listing_url: &str) -> Option<RawRecord> {
        let name_sel = Selector::parse(".seller_name a, .company_name, h3 a").unwrap();
        let phone_sel = Selector::parse(".phone, .mobile").unwrap();
        let mailto_sel = Selector::parse("a[href^='mailto:']").unwrap();
        let location_sel = Selector::parse(".seller_location, .location").unwrap();

        let name = card
            .select(&name_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())?;
        if name.len() < 3 {
            return None;
        }

        let card_text = card.text().collect::<Vec<_>>().join(" ");

        let email = card
            .select(&mailto_sel)
            .next()
            .and_then(|e| e.value().attr("href"))
            .map(|href| href.trim_start_matches("mailto:").to_string())
            .or_else(|| extract::email_from_text(&card_text))
            .unwrap_or_default();

        let phone = card
            .select(&phone_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| extract::phone_from_text(&card_text))
            .unwrap_or_default();

        let address = card
            .select(&location_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        Some(RawRecord {
            source: SourceId::TradeIndia,
            name,
            phone,
            email,
            address,
            website: extract::website_from_text(&card_text).unwrap_or_default(),
            description: card_text.chars().take(500).collect(),
            listing_url: listing_url.to_string(),
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait::async_trait]
impl crate::types::SourceAdapter for TradeIndiaAdapter {
    fn source_id(&self) -> SourceId {
        SourceId::TradeIndia
    }

    async fn fetch_page(&self, page: u32, client: &PoliteClient) -> Result<String> {
        let url = self.search_url(page);
        info!(page, %url, "fetching TradeIndia listing page");
        client.get_page(SourceId::TradeIndia, page, &url).await
    }

    fn parse_page(&self, html: &str, page: u32) -> Result<Vec<RawRecord>> {
        let document = Html::parse_document(html);
        let card_sel = Selector::parse(".seller_detail, .company-info, .result-item").unwrap();

        // A page for a different commodity entirely is noise, not an error
        let page_text = document.root_element().text().collect::<Vec<_>>().join(" ");
        if !extract::page_mentions_any(&page_text, &self.keywords) {
            warn!(page, "TradeIndia page has no commodity keywords, skipping");
            return Ok(Vec::new());
        }

        let cards: Vec<_> = document.select(&card_sel).collect();
        if cards.is_empty() {
            // Empty result list is the normal end of pagination; a page that
            // is not a TradeIndia results page at all means the markup moved
            if !html.contains("tradeindia") {
                return Err(ScraperError::Parse {
                    platform: SourceId::TradeIndia.to_string(),
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

        info!(page, count = records.len(), "parsed TradeIndia listings");
        Ok(records)
    }
}
