use std::borrow::Cow;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::TrialWatchError;

const CTGOV_BASE: &str = "https://clinicaltrials.gov/api/v2";
const CTGOV_API: &str = "ctgov";
const CTGOV_BASE_ENV: &str = "TRIALWATCH_CTGOV_BASE";

/// Largest `pageSize` the registry search endpoint accepts.
pub(crate) const CTGOV_MAX_PAGE_SIZE: usize = 100;

#[derive(Clone)]
pub struct CtGovClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

#[derive(Debug, Clone, Default)]
pub struct CtGovSearchParams {
    pub condition: String,
    pub page_size: usize,
    /// Lower bound for the registry-side last-update filter (`YYYY-MM-DD`).
    /// `None` leaves filtering entirely to the caller.
    pub updated_since: Option<String>,
    /// Continuation token from the previous page's `nextPageToken`.
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovSearchResponse {
    #[serde(default)]
    pub studies: Vec<CtGovStudy>,
    pub next_page_token: Option<String>,
}

/// One study as returned by the v2 search endpoint. Only the slices of
/// `protocolSection` the normalizer reads are modeled.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovStudy {
    pub protocol_section: Option<ProtocolSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSection {
    pub identification_module: Option<IdentificationModule>,
    pub status_module: Option<StatusModule>,
    pub conditions_module: Option<ConditionsModule>,
    pub arms_interventions_module: Option<ArmsInterventionsModule>,
    pub design_module: Option<DesignModule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationModule {
    pub nct_id: Option<String>,
    pub official_title: Option<String>,
    pub brief_title: Option<String>,
    pub acronym: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusModule {
    pub overall_status: Option<String>,
    pub study_first_post_date_struct: Option<DateStruct>,
    pub last_update_post_date_struct: Option<DateStruct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateStruct {
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConditionsModule {
    #[serde(default)]
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmsInterventionsModule {
    #[serde(default)]
    pub interventions: Vec<Intervention>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Intervention {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignModule {
    pub study_type: Option<String>,
    pub phases: Option<Vec<String>>,
}

impl CtGovClient {
    pub fn new() -> Result<Self, TrialWatchError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(CTGOV_BASE, CTGOV_BASE_ENV),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, TrialWatchError> {
        Ok(Self {
            client: Self::test_client()?,
            base: Cow::Owned(base),
        })
    }

    // Plain client without the retry middleware so error-path tests see
    // exactly one request per call.
    #[cfg(test)]
    fn test_client() -> Result<reqwest_middleware::ClientWithMiddleware, TrialWatchError> {
        let base = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .user_agent(concat!("trialwatch-test/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TrialWatchError::HttpClientInit)?;
        Ok(reqwest_middleware::ClientBuilder::new(base).build())
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        req: reqwest_middleware::RequestBuilder,
    ) -> Result<T, TrialWatchError> {
        let resp = req.send().await?;
        let status = resp.status();
        let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, CTGOV_API).await?;
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(TrialWatchError::Api {
                api: CTGOV_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }
        crate::sources::ensure_json_content_type(CTGOV_API, content_type.as_ref(), &bytes)?;
        serde_json::from_slice(&bytes).map_err(|source| TrialWatchError::ApiJson {
            api: CTGOV_API.to_string(),
            source,
        })
    }

    /// Fetches one page of the `/studies` search for a condition term.
    pub async fn search_studies(
        &self,
        params: &CtGovSearchParams,
    ) -> Result<CtGovSearchResponse, TrialWatchError> {
        let condition = params.condition.trim();
        if condition.is_empty() {
            return Err(TrialWatchError::InvalidArgument(
                "A condition term is required for a studies search".into(),
            ));
        }
        if params.page_size == 0 || params.page_size > CTGOV_MAX_PAGE_SIZE {
            return Err(TrialWatchError::InvalidArgument(format!(
                "pageSize must be between 1 and {CTGOV_MAX_PAGE_SIZE}"
            )));
        }

        let url = self.endpoint("studies");
        let page_size = params.page_size.to_string();
        let mut req = self.client.get(&url).query(&[
            ("query.cond", condition),
            ("pageSize", page_size.as_str()),
        ]);

        if let Some(since) = params
            .updated_since
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            let advanced = format!("AREA[LastUpdatePostDate]RANGE[{since},MAX]");
            req = req.query(&[("filter.advanced", advanced.as_str())]);
        }
        if let Some(token) = params
            .page_token
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            req = req.query(&[("pageToken", token)]);
        }

        self.get_json(req).await
    }
}
