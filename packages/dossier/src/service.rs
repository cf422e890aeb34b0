//! Network-facing dossier operations.
//!
//! [`DossierService`] owns the configuration, one HTTP client and the
//! current [`DatasetContext`]. Every outbound request goes through the
//! configured [`RetryPolicy`].

use pws_dossier_extract::fetch::fetch_pair_with;
use pws_dossier_extract::{DocumentFetcher, ExtractedRecords, extract_documents, locate, registry};
use pws_dossier_extract_models::{DocumentLinks, RegistryRecord};
use pws_dossier_geometry::GeometryError;

use crate::DossierError;
use crate::assemble::{Dossier, Section, assemble};
use crate::config::DossierConfig;
use crate::context::DatasetContext;
use crate::retry::RetryPolicy;

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Leave out the Drinking Water Watch documents entirely.
    pub skip_extraction: bool,
}

#[derive(Debug)]
pub struct DossierService {
    config: DossierConfig,
    fetcher: DocumentFetcher,
    policy: RetryPolicy,
    context: Result<DatasetContext, GeometryError>,
}

impl DossierService {
    /// Builds the HTTP client and loads the dataset context.
    ///
    /// A geometry failure does not fail startup: it is kept and reported
    /// in every dossier until a reload succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`DossierError::Fetch`] if the HTTP client cannot be built.
    pub async fn start(config: DossierConfig) -> Result<Self, DossierError> {
        let fetcher = DocumentFetcher::new()?;
        let policy = RetryPolicy::from_config(&config.network);
        let context = DatasetContext::load(&config, fetcher.client(), &policy).await;
        if let Err(e) = &context {
            log::error!("Dataset context failed to load: {e}");
        }

        Ok(Self {
            config,
            fetcher,
            policy,
            context,
        })
    }

    /// Assembles a service around an already loaded context.
    #[must_use]
    pub fn with_context(
        config: DossierConfig,
        fetcher: DocumentFetcher,
        context: Result<DatasetContext, GeometryError>,
    ) -> Self {
        let policy = RetryPolicy::from_config(&config.network);
        Self {
            config,
            fetcher,
            policy,
            context,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &DossierConfig {
        &self.config
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The current dataset context, or why it failed to load.
    ///
    /// # Errors
    ///
    /// Returns the geometry error from the last load attempt.
    pub const fn context(&self) -> Result<&DatasetContext, &GeometryError> {
        self.context.as_ref()
    }

    /// Reloads the dataset context if it is older than the configured max
    /// age, or if the last load failed. Returns whether a reload happened.
    ///
    /// A failed reload keeps a previously loaded context.
    pub async fn refresh_if_stale(&mut self) -> bool {
        let max_age = self.config.context.max_age();
        let client = self.fetcher.client();

        if let Ok(context) = &mut self.context {
            if !context.is_stale(max_age) {
                return false;
            }
            if let Err(e) = context.reload(&self.config, client, &self.policy).await {
                log::warn!("Keeping the current dataset context, reload failed: {e}");
            }
            return true;
        }

        self.context = DatasetContext::load(&self.config, client, &self.policy).await;
        if let Err(e) = &self.context {
            log::error!("Dataset context still unavailable: {e}");
        }
        true
    }

    /// Free-text registry search by system name.
    ///
    /// # Errors
    ///
    /// Returns [`DossierError`] if the search fails after retries.
    pub async fn search(&self, name: &str) -> Result<Vec<RegistryRecord>, DossierError> {
        let client = self.fetcher.client();
        let base_url = &self.config.registry.base_url;
        Ok(self
            .policy
            .run("registry search", || registry::search(client, base_url, name))
            .await?)
    }

    /// Resolves the fact-sheet and flow-document URLs for a system.
    ///
    /// # Errors
    ///
    /// Returns [`DossierError`] if the search page cannot be fetched.
    pub async fn locate(&self, pws_id: &str) -> Result<DocumentLinks, DossierError> {
        let client = self.fetcher.client();
        let base_url = &self.config.documents.base_url;
        Ok(self
            .policy
            .run("document search", || {
                locate::find_documents(client, base_url, pws_id)
            })
            .await?)
    }

    /// Fetches both documents for `links` and extracts their records.
    ///
    /// A document that cannot be fetched is treated as absent.
    pub async fn extract(&self, pws_id: &str, links: &DocumentLinks) -> ExtractedRecords {
        let fetched = fetch_pair_with(links, |url| async move {
            self.policy
                .run("document fetch", || self.fetcher.fetch(&url))
                .await
        })
        .await;

        let (fact_sheet, flow) = fetched.into_documents();
        extract_documents(pws_id, fact_sheet.as_deref(), flow.as_deref())
    }

    /// Builds the full dossier for one water system.
    ///
    /// Never fails as a whole: each part that cannot be produced carries
    /// the reason instead.
    pub async fn build(&self, pws_id: &str, options: BuildOptions) -> Dossier {
        let pws_id = pws_id.trim();

        let (extraction, sources) = if options.skip_extraction {
            (
                Section::unavailable("Extraction skipped"),
                DocumentLinks::default(),
            )
        } else {
            match self.locate(pws_id).await {
                Ok(links) => (Section::Available(self.extract(pws_id, &links).await), links),
                Err(e) => {
                    log::warn!("Could not locate documents for {pws_id}: {e}");
                    (Section::unavailable(e.to_string()), DocumentLinks::default())
                }
            }
        };

        assemble(pws_id, self.context(), extraction, sources)
    }
}
