use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use tokio::task::spawn_blocking;

use crate::record::RawRecord;
use crate::source::Page;
use crate::{Error, Result};

/// Compiled selectors used to pull organizations out of a listing page.
#[derive(Debug, Clone)]
pub(crate) struct PageSelectors {
    item: Selector,
    name: Selector,
    address: Selector,
    website: Selector,
    next: Option<Selector>,
}

impl PageSelectors {
    pub(crate) fn new(
        item: &str,
        name: &str,
        address: &str,
        website: &str,
        next: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            item: create_selector(item)?,
            name: create_selector(name)?,
            address: create_selector(address)?,
            website: create_selector(website)?,
            next: next.map(create_selector).transpose()?,
        })
    }
}

/// Parses the page off the async runtime.
pub(crate) async fn parse_page(html: String, selectors: Arc<PageSelectors>) -> Result<Page> {
    let page = spawn_blocking(move || parse_html(&html, &selectors)).await?;
    Ok(page)
}

/// Extracts every item on the page, nameless ones included. Dropping those is
/// up to the harvester, so a page of nameless items still counts as a page.
pub(crate) fn parse_html(html: &str, selectors: &PageSelectors) -> Page {
    let doc = Html::parse_document(html);

    let mut records = Vec::new();
    for item in doc.select(&selectors.item) {
        let name = first_text(item, &selectors.name);
        let address = first_text(item, &selectors.address);
        let website = item
            .select(&selectors.website)
            .next()
            .map(|el| match el.value().attr("href") {
                Some(href) => href.trim().to_string(),
                None => collapse_text(el),
            })
            .unwrap_or_default();

        records.push(RawRecord {
            name,
            address,
            website,
        });
    }

    let continuation = match &selectors.next {
        Some(next) => doc.select(next).next().is_some(),
        None => !records.is_empty(),
    };
    Page::new(records, continuation)
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseMissingSelector(sel_str.into()))
}

fn first_text(item: ElementRef<'_>, selector: &Selector) -> String {
    item.select(selector)
        .next()
        .map(collapse_text)
        .unwrap_or_default()
}

/// Joins the element's text nodes, collapsing runs of whitespace into one space.
fn collapse_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
