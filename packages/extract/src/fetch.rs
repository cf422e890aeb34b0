//! Downloads the fact sheet and flow document.

use std::future::Future;

use pws_dossier_extract_models::{DocumentKind, DocumentLinks};

use crate::{FetchError, get_text, parse_url};

/// Drinking Water Watch rejects requests without a browser user agent.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.5735.198 Safari/537.36";

/// HTTP client for Drinking Water Watch pages.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: reqwest::Client,
}

impl DocumentFetcher {
    /// Builds a client with the browser user agent.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    #[must_use]
    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetches one page.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for an invalid URL, a transport failure or a
    /// non-success status.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        log::debug!("Fetching {url}");
        get_text(&self.client, parse_url(url)?).await
    }

    /// Fetches both documents concurrently. See [`fetch_pair_with`].
    pub async fn fetch_pair(&self, links: &DocumentLinks) -> FetchedDocuments {
        fetch_pair_with(links, |url| async move { self.fetch(&url).await }).await
    }
}

/// Outcome of fetching both documents. Each side fails on its own.
#[derive(Debug)]
pub struct FetchedDocuments<E = FetchError> {
    pub fact_sheet: Result<String, E>,
    pub flow: Result<String, E>,
}

impl<E: std::fmt::Display> FetchedDocuments<E> {
    /// Drops the errors after logging them, leaving whichever documents
    /// arrived.
    #[must_use]
    pub fn into_documents(self) -> (Option<String>, Option<String>) {
        let keep = |kind: DocumentKind, result: Result<String, E>| match result {
            Ok(body) => Some(body),
            Err(e) => {
                log::warn!("Proceeding without the {kind}: {e}");
                None
            }
        };
        (
            keep(DocumentKind::FactSheet, self.fact_sheet),
            keep(DocumentKind::Flow, self.flow),
        )
    }
}

/// Fetches both documents concurrently with `fetch`.
///
/// A missing link becomes a [`FetchError::MissingLink`] for that document
/// only. Callers wrap `fetch` to add timeouts or retries.
pub async fn fetch_pair_with<E, F, Fut>(links: &DocumentLinks, fetch: F) -> FetchedDocuments<E>
where
    E: From<FetchError>,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<String, E>>,
{
    let one = |kind: DocumentKind, url: Option<String>| {
        let fetch = &fetch;
        async move {
            match url {
                Some(url) => fetch(url).await,
                None => Err(E::from(FetchError::MissingLink(kind))),
            }
        }
    };

    let (fact_sheet, flow) = tokio::join!(
        one(DocumentKind::FactSheet, links.fact_sheet_url.clone()),
        one(DocumentKind::Flow, links.flow_url.clone()),
    );

    FetchedDocuments { fact_sheet, flow }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn each_document_fails_on_its_own() {
        let links = DocumentLinks {
            system_name: None,
            fact_sheet_url: Some("https://dww.example/fact".to_string()),
            flow_url: None,
        };

        let fetched = fetch_pair_with(&links, |url| async move {
            Ok::<_, FetchError>(format!("<html>{url}</html>"))
        })
        .await;

        assert_eq!(
            fetched.fact_sheet.as_deref().ok(),
            Some("<html>https://dww.example/fact</html>")
        );
        assert!(matches!(
            fetched.flow,
            Err(FetchError::MissingLink(DocumentKind::Flow))
        ));

        let (fact_sheet, flow) = fetched.into_documents();
        assert!(fact_sheet.is_some());
        assert!(flow.is_none());
    }

    #[tokio::test]
    async fn invalid_url_is_an_error_not_a_panic() {
        let fetcher = DocumentFetcher::new().unwrap();

        assert!(matches!(
            fetcher.fetch("not a url").await,
            Err(FetchError::Url { .. })
        ));
    }
}
