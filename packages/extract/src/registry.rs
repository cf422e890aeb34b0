//! Free-text water system search against EPA's SDWIS efservice.
//!
//! Every whitespace-separated token of the query becomes one
//! `pwsname/like/@token@` filter, so all tokens must appear in the name:
//!
//! ```text
//! https://data.epa.gov/efservice/sdwis.sdw_county_served/pwsname/like/@LAREDO@/json
//! ```

use pws_dossier_extract_models::RegistryRecord;

use crate::{FetchError, get_text, parse_url};

/// EPA efservice root.
pub const DEFAULT_BASE_URL: &str = "https://data.epa.gov/efservice";

const TABLE: &str = "sdwis.sdw_county_served";

/// Search URL for `name`, or `None` when it has no tokens.
///
/// # Errors
///
/// Returns [`FetchError::Url`] if `base_url` cannot carry a path.
pub fn search_url(base_url: &str, name: &str) -> Result<Option<reqwest::Url>, FetchError> {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut url = parse_url(base_url)?;
    {
        let mut segments = url.path_segments_mut().map_err(|()| FetchError::Url {
            url: base_url.to_string(),
            message: "cannot be a base".to_string(),
        })?;
        segments.pop_if_empty().push(TABLE);
        for token in tokens {
            segments.push("pwsname").push("like").push(&format!("@{token}@"));
        }
        segments.push("json");
    }
    Ok(Some(url))
}

/// Searches the registry by system name.
///
/// An empty or blank name returns no records without a request.
///
/// # Errors
///
/// Returns [`FetchError`] if the request fails, the service answers with
/// an error status, or the body is not a JSON list of records.
pub async fn search(
    client: &reqwest::Client,
    base_url: &str,
    name: &str,
) -> Result<Vec<RegistryRecord>, FetchError> {
    let Some(url) = search_url(base_url, name)? else {
        return Ok(Vec::new());
    };

    log::info!("Searching registry for '{}'", name.trim());
    let body = get_text(client, url).await?;
    let records = parse_records(&body)?;
    log::info!("Registry returned {} records", records.len());
    Ok(records)
}

/// Parses an efservice JSON body.
///
/// # Errors
///
/// Returns [`FetchError::Json`] if the body is not a list of records.
pub fn parse_records(body: &str) -> Result<Vec<RegistryRecord>, FetchError> {
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_like_filter_per_token() {
        let url = search_url(DEFAULT_BASE_URL, "  city of   laredo ").unwrap().unwrap();

        assert_eq!(
            url.as_str(),
            "https://data.epa.gov/efservice/sdwis.sdw_county_served/pwsname/like/@city@/pwsname/like/@of@/pwsname/like/@laredo@/json"
        );
    }

    #[test]
    fn tokens_are_percent_encoded() {
        let url = search_url(DEFAULT_BASE_URL, "a/b c#d").unwrap().unwrap();

        assert!(url.as_str().contains("@a%2Fb@"));
        assert!(url.as_str().contains("@c%23d@"));
    }

    #[test]
    fn blank_name_needs_no_request() {
        assert!(search_url(DEFAULT_BASE_URL, "   ").unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_search_returns_nothing() {
        let client = reqwest::Client::new();

        let records = search(&client, "not a url", "").await.unwrap();

        assert!(records.is_empty());
    }

    #[test]
    fn parses_efservice_records() {
        let body = r#"[
            {"pwsid":"TX2400001","pwsname":"CITY OF LAREDO","countyserved":"WEBB"},
            {"pwsid":"TX2400015","pwsname":"LAREDO COLLEGE"}
        ]"#;

        let records = parse_records(body).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].county_served, None);
        assert!(matches!(parse_records("{}"), Err(FetchError::Json(_))));
    }
}
