//! Resolves a PWS id to its fact-sheet and flow-document URLs.
//!
//! The Drinking Water Watch search results list matching systems in a
//! table headed "Water System Name". In each result row the number cell
//! links to the flow rates page and the name cell to the fact sheet.

use pws_dossier_extract_models::DocumentLinks;
use scraper::{ElementRef, Html};

use crate::{FetchError, get_text, html, parse_url};

/// Public Drinking Water Watch host for Texas.
pub const DEFAULT_BASE_URL: &str = "https://dww2.tceq.texas.gov/";

const RESULTS_HEADING: &str = "Water System Name";
/// Result rows examined after the heading row.
const MAX_RESULT_ROWS: usize = 5;

/// Search URL for one water system number.
///
/// # Errors
///
/// Returns [`FetchError::Url`] if `base_url` is not a valid URL.
pub fn search_url(base_url: &str, pwsid: &str) -> Result<reqwest::Url, FetchError> {
    let base = parse_url(base_url)?;
    let mut url = base
        .join("DWW/JSP/SearchDispatch")
        .map_err(|e| FetchError::Url {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
    url.query_pairs_mut()
        .append_pair("number", pwsid)
        .append_pair("action", "Search For Water Systems");
    Ok(url)
}

/// Fetches the search page for `pwsid` and resolves the document links.
///
/// # Errors
///
/// Returns [`FetchError`] if the search page cannot be fetched.
pub async fn find_documents(
    client: &reqwest::Client,
    base_url: &str,
    pwsid: &str,
) -> Result<DocumentLinks, FetchError> {
    let url = search_url(base_url, pwsid)?;
    log::debug!("Searching Drinking Water Watch: {url}");
    let body = get_text(client, url.clone()).await?;
    let links = locate_documents(&body, url.as_str());

    if links.fact_sheet_url.is_none() {
        log::warn!("No fact sheet link for {pwsid}");
    }
    if links.flow_url.is_none() {
        log::warn!("No flow document link for {pwsid}");
    }
    Ok(links)
}

/// Reads the document links out of a search results page.
///
/// Relative links are resolved against `page_url`. When several result
/// rows carry links, the last one wins.
#[must_use]
pub fn locate_documents(search_html: &str, page_url: &str) -> DocumentLinks {
    let document = Html::parse_document(search_html);
    let base = reqwest::Url::parse(page_url).ok();
    let mut links = DocumentLinks::default();

    let Some(table) = results_table(&document) else {
        log::warn!("Search results have no '{RESULTS_HEADING}' table");
        return links;
    };

    for row in html::rows(table).into_iter().skip(1).take(MAX_RESULT_ROWS) {
        let cells = html::cells(row);
        if cells.len() < 2 {
            continue;
        }

        if let Some((name, href)) = first_link(cells[1]) {
            if let Some(url) = resolve(base.as_ref(), &href) {
                links.system_name = Some(name);
                links.fact_sheet_url = Some(url);
            }
        }
        if let Some((number, href)) = first_link(cells[0]) {
            if let Some(url) = resolve(base.as_ref(), &href) {
                log::debug!("Found water system {number}: {url}");
                links.flow_url = Some(url);
            }
        }
    }

    links
}

/// The innermost table holding the results heading.
fn results_table(document: &Html) -> Option<ElementRef<'_>> {
    let heading = html::elements(document.root_element())
        .filter(|el| matches!(el.value().name(), "th" | "td"))
        .filter(|cell| html::elements_named(*cell, "table").next().is_none())
        .find(|cell| html::match_text(*cell).contains(RESULTS_HEADING))?;
    html::nearest_ancestor(heading, "table")
}

/// Text and `href` of the first link in a cell, if both are non-empty.
fn first_link(cell: ElementRef<'_>) -> Option<(String, String)> {
    let link = html::elements_named(cell, "a").next()?;
    let text = html::match_text(link);
    let href = link.value().attr("href")?.trim();
    (!text.is_empty() && !href.is_empty()).then(|| (text, href.to_string()))
}

fn resolve(base: Option<&reqwest::Url>, href: &str) -> Option<String> {
    match reqwest::Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(_) => base?.join(href).ok().map(|url| url.to_string()),
    }
}
