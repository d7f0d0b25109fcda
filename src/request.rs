use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::config::HarvestConfig;
use crate::parse::{parse_page, PageSelectors};
use crate::source::{Page, PageSource};
use crate::{Error, Result};

const PAGE_PLACEHOLDER: &str = "{page}";

/// Page source backed by a live HTML listing.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    // Client uses Arc so we can clone cheaply
    client: Client,
    base_url: String,
    selectors: Arc<PageSelectors>,
}

impl HttpPageSource {
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &HarvestConfig) -> Result<Self> {
        let selectors = PageSelectors::new(
            &config.item_selector,
            &config.name_selector,
            &config.address_selector,
            &config.website_selector,
            config.next_selector.as_deref(),
        )?;
        // Fail early on a template that can't form a URL.
        page_url(&config.source_base_url, 1)?;

        Ok(Self {
            client,
            base_url: config.source_base_url.clone(),
            selectors: Arc::new(selectors),
        })
    }

    /// Requests a page and returns a `Result<String>` containing the HTML.
    async fn request_page_html(&self, page: usize) -> Result<String> {
        let url = page_url(&self.base_url, page)?;
        tracing::debug!(page, %url, "requesting page");

        let res = self.client.get(url).send().await?.error_for_status()?;
        let html = res.text().await?;
        Ok(html)
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, page: usize) -> Result<Page> {
        let html = self
            .request_page_html(page)
            .await
            .map_err(|e| Error::source_fetch(page, e))?;
        parse_page(html, self.selectors.clone())
            .await
            .map_err(|e| Error::source_fetch(page, e))
    }
}

/// Composes the URL of page `page` from the configured template.
pub(crate) fn page_url(base_url: &str, page: usize) -> Result<Url> {
    if base_url.contains(PAGE_PLACEHOLDER) {
        return Ok(Url::parse(&base_url.replace(PAGE_PLACEHOLDER, &page.to_string()))?);
    }
    let mut url = Url::parse(base_url)?;
    url.query_pairs_mut().append_pair("page", &page.to_string());
    Ok(url)
}
