#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Regulatory facts from the Texas Drinking Water Watch site.
//!
//! A water system's facts live on two HTML pages: the fact sheet (entity,
//! contacts, service connections, facilities, violations) and the flow
//! rates and measures page. [`locate`] finds both from the search results,
//! [`fetch`] downloads them, and [`pipeline`] turns them into records.
//! Extraction never fails as a whole: every field and table is declared in
//! [`descriptors`] with a default it falls back to.
//!
//! [`registry`] is the free-text system search against EPA's SDWIS
//! service.

pub mod descriptors;
pub mod fetch;
pub mod grouping;
pub mod html;
pub mod locate;
pub mod pipeline;
pub mod registry;

use pws_dossier_extract_models::DocumentKind;

pub use fetch::{DocumentFetcher, FetchedDocuments};
pub use grouping::group_facilities;
pub use locate::locate_documents;
pub use pipeline::{ExtractedRecords, extract_documents};

/// Errors that can occur while retrieving pages or registry records.
///
/// Parsing a page never errors; see [`pipeline`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// A URL could not be built.
    #[error("Invalid URL '{url}': {message}")]
    Url {
        /// The offending URL or base.
        url: String,
        /// Parser message.
        message: String,
    },

    /// The search results did not link to this document.
    #[error("No {0} link in the search results")]
    MissingLink(DocumentKind),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Whether retrying the same request could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_body() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Url { .. } | Self::MissingLink(_) | Self::Json(_) => false,
        }
    }
}

fn parse_url(url: &str) -> Result<reqwest::Url, FetchError> {
    reqwest::Url::parse(url).map_err(|e| FetchError::Url {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Sends a GET and returns the body of a successful response.
async fn get_text(client: &reqwest::Client, url: reqwest::Url) -> Result<String, FetchError> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}
