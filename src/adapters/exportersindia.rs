use crate::adapters::extract;
use crate::error::{Result, ScraperError};
use crate::fetch::PoliteClient;
use crate::types::{RawRecord, SourceId};
use chrono::Utc;
use scraper::{Html, Selector};
use tracing::{info, warn};

const BASE_URL: &str = "https://www.exportersindia.com";
const MAX_RECORDS_PER_PAGE: usize = 20;

/// Crawler for ExportersIndia buyer listings. Unlike the other two platforms
/// the search term is part of the path, not the query string.
pub struct ExportersIndiaAdapter {
    search_term: String,
    keywords: Vec<String>,
}

impl ExportersIndiaAdapter {
    pub fn new(search_term: &str) -> Self {
        Self {
            search_term: search_term.to_string(),
            keywords: extract::screening_keywords(search_term),
        }
    }

    fn search_url(&self, page: u32) -> String {
        let slug = self
            .search_term
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        format!("{}/search/{}-buyers.html?page={}", BASE_URL, slug, page)
    }

    fn extract_card(&self, card: &scraper::ElementRef, listing_url: &str) -> Option<RawRecord> {
        let name_sel = Selector::parse(".company_name, h3 a, strong a").unwrap();
        let phone_sel = Selector::parse("td.phone, td.mobile, .phone").unwrap();
        let location_sel = Selector::parse("td.location, td.city, .location").unwrap();
        let requirement_sel = Selector::parse("td.requirement, td.product, .requirement").unwrap();

        let name = card
            .select(&name_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())?;
        if name.len() < 3 {
            return None;
        }

        let card_text = card.text().collect::<Vec<_>>().join(" ");

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

        let description = card
            .select(&requirement_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_else(|| card_text.chars().take(500).collect());

        Some(RawRecord {
            source: SourceId::ExportersIndia,
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
impl crate::types::SourceAdapter for ExportersIndiaAdapter {
    fn source_id(&self) -> SourceId {
        SourceId::ExportersIndia
    }

    async fn fetch_page(&self, page: u32, client: &PoliteClient) -> Result<String> {
        let url = self.search_url(page);
        info!(page, %url, "fetching ExportersIndia listing page");
        client.get_page(SourceId::ExportersIndia, page, &url).await
    }

    fn parse_page(&self, html: &str, page: u32) -> Result<Vec<RawRecord>> {
        let document = Html::parse_document(html);
        let card_sel =
            Selector::parse(".company-list, .buyer-list, tr.listing-row, .search-result").unwrap();

        let page_text = document.root_element().text().collect::<Vec<_>>().join(" ");
        if !extract::page_mentions_any(&page_text, &self.keywords) {
            warn!(page, "ExportersIndia page has no commodity keywords, skipping");
            return Ok(Vec::new());
        }

        let cards: Vec<_> = document.select(&card_sel).collect();
        if cards.is_empty() {
            if !html.contains("exportersindia") {
                return Err(ScraperError::Parse {
                    platform: SourceId::ExportersIndia.to_string(),
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

        info!(page, count = records.len(), "parsed ExportersIndia listings");
        Ok(records)
    }
}
