//! The dossier document and its pure assembly from already computed parts.

use pws_dossier_demographics_models::AggregatedIndicators;
use pws_dossier_extract::ExtractedRecords;
use pws_dossier_extract_models::DocumentLinks;
use pws_dossier_geometry::GeometryError;
use pws_dossier_geometry_models::TractWeight;
use serde::Serialize;

use crate::context::DatasetContext;
use crate::display::DisplayIndicators;

/// One part of a dossier, or the reason it could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "camelCase")]
pub enum Section<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Available(value),
            Err(e) => Self::unavailable(e.to_string()),
        }
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    #[must_use]
    pub const fn available(&self) -> Option<&T> {
        match self {
            Self::Available(value) => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Available(_) => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }
}

/// Aggregated indicators with their display form and the weights behind
/// them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub aggregated: AggregatedIndicators,
    pub display: DisplayIndicators,
    pub tracts: Vec<TractWeight>,
}

/// Everything known about one public water system.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dossier {
    pub service_area_id: String,
    pub service_area_name: Option<String>,
    pub communities: Section<Vec<String>>,
    pub demographics: Section<Demographics>,
    pub extraction: Section<ExtractedRecords>,
    pub sources: DocumentLinks,
}

/// Combines the dataset-derived sections with extraction results.
///
/// A failed dataset load makes communities and demographics unavailable
/// with the load error as the reason; extraction is untouched by it.
#[must_use]
pub fn assemble(
    service_area_id: &str,
    context: Result<&DatasetContext, &GeometryError>,
    extraction: Section<ExtractedRecords>,
    sources: DocumentLinks,
) -> Dossier {
    let (service_area_name, communities, demographics) = match context {
        Ok(context) => (
            context
                .store()
                .service_area(service_area_id)
                .map(|area| area.name.clone()),
            Section::from_result(
                context
                    .communities_for(service_area_id)
                    .map(<[String]>::to_vec),
            ),
            demographics(context, service_area_id),
        ),
        Err(e) => {
            let reason = format!("Dataset unavailable: {e}");
            (
                None,
                Section::unavailable(reason.clone()),
                Section::unavailable(reason),
            )
        }
    };

    let service_area_name = service_area_name.or_else(|| sources.system_name.clone());

    if let Some(reason) = demographics.reason() {
        log::warn!("Demographics unavailable for {service_area_id}: {reason}");
    }

    Dossier {
        service_area_id: service_area_id.to_string(),
        service_area_name,
        communities,
        demographics,
        extraction,
        sources,
    }
}

fn demographics(context: &DatasetContext, service_area_id: &str) -> Section<Demographics> {
    Section::from_result(context.aggregate(service_area_id).and_then(|aggregated| {
        Ok(Demographics {
            display: DisplayIndicators::from_aggregated(&aggregated),
            tracts: context.weights_for(service_area_id)?.to_vec(),
            aggregated,
        })
    }))
}
