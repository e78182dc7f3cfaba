use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::warn;

use crate::sources::ctgov::{CTGOV_MAX_PAGE_SIZE, CtGovClient, CtGovSearchParams};
use crate::transform::trial::normalize_study;
use crate::utils::date::{cutoff_for_window, format_iso, parse_iso_date, today_utc};

pub const DEFAULT_MONTHS_BACK: i64 = 3;

/// Per-term result lists keyed by the normalized search term.
pub type ResultSet = BTreeMap<String, Vec<TrialRecord>>;

/// Flattened study row with display-ready field labels. Every field is a
/// string; absent upstream values arrive as placeholder text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    #[serde(rename = "NCT ID")]
    pub nct_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Study First Post Date")]
    pub study_first_post_date: String,
    #[serde(rename = "Last Update Post Date")]
    pub last_update_post_date: String,
    #[serde(rename = "Acronym")]
    pub acronym: String,
    #[serde(rename = "Overall Status")]
    pub overall_status: String,
    #[serde(rename = "Conditions")]
    pub conditions: String,
    #[serde(rename = "Interventions")]
    pub interventions: String,
    #[serde(rename = "Study Type")]
    pub study_type: String,
    #[serde(rename = "Phases")]
    pub phases: String,
}

#[derive(Debug, Clone)]
pub struct TrialSearchConfig {
    /// Page size requested from the registry, clamped to its maximum.
    pub page_size: usize,
    /// Ceiling on pages fetched per term.
    pub max_pages: usize,
    /// Also push the recency cutoff into the registry query, instead of
    /// filtering only after download.
    pub server_side_date_filter: bool,
    /// How many terms are fetched concurrently.
    pub term_concurrency: usize,
}

impl Default for TrialSearchConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 5,
            server_side_date_filter: false,
            term_concurrency: 4,
        }
    }
}

impl TrialSearchConfig {
    fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, CTGOV_MAX_PAGE_SIZE)
    }

    fn effective_concurrency(&self) -> usize {
        self.term_concurrency.max(1)
    }
}

/// Splits raw inputs on commas, trims whitespace, and drops duplicates while
/// keeping first-seen order. `["lupus, asthma"]` and `["lupus", "asthma"]`
/// normalize identically.
pub fn normalize_terms<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut terms = Vec::new();
    for value in raw {
        for part in value.split(',') {
            let term = part.trim();
            if term.is_empty() {
                continue;
            }
            if seen.insert(term.to_string()) {
                terms.push(term.to_string());
            }
        }
    }
    terms
}

/// Collects every study for one condition updated within the last
/// `months_back` months (30-day months), newest first.
///
/// Paging stops at the page ceiling, an empty page, or a missing continuation
/// token. A fetch error stops paging and keeps whatever was already gathered,
/// so one flaky page degrades the term instead of failing it.
pub async fn search_term(
    client: &CtGovClient,
    config: &TrialSearchConfig,
    condition: &str,
    months_back: i64,
) -> Vec<TrialRecord> {
    let cutoff = cutoff_for_window(today_utc(), months_back);
    let updated_since = config.server_side_date_filter.then(|| format_iso(cutoff));

    let mut records = Vec::new();
    let mut page_token: Option<String> = None;

    for page_index in 0..config.max_pages {
        let page = match client
            .search_studies(&CtGovSearchParams {
                condition: condition.to_string(),
                page_size: config.effective_page_size(),
                updated_since: updated_since.clone(),
                page_token: page_token.take(),
            })
            .await
        {
            Ok(page) => page,
            Err(err) => {
                warn!(
                    condition = %condition,
                    page = page_index,
                    "Registry page fetch failed, keeping partial results: {err}"
                );
                break;
            }
        };

        if page.studies.is_empty() {
            break;
        }

        for study in &page.studies {
            let Some((last_update, record)) = normalize_study(study) else {
                continue;
            };
            if last_update < cutoff {
                continue;
            }
            records.push(record);
        }

        page_token = page.next_page_token.filter(|token| !token.trim().is_empty());
        if page_token.is_none() {
            break;
        }
    }

    sort_newest_first(&mut records);
    records
}

/// Runs `search_term` for every term with bounded concurrency. Every input
/// term gets a key in the result, even when its search came back empty.
pub async fn search_many(
    client: &CtGovClient,
    config: &TrialSearchConfig,
    terms: &[String],
    months_back: i64,
) -> ResultSet {
    futures::stream::iter(terms.iter().cloned())
        .map(|term| async move {
            let records = search_term(client, config, &term, months_back).await;
            (term, records)
        })
        .buffer_unordered(config.effective_concurrency())
        .collect()
        .await
}

// Stable sort, so records sharing a date keep registry order. Records whose
// stored date no longer parses sort last.
fn sort_newest_first(records: &mut [TrialRecord]) {
    records.sort_by_key(|record| {
        Reverse(parse_iso_date(&record.last_update_post_date).unwrap_or(Date::MIN))
    });
}
