use time::Date;

use crate::entities::trial::TrialRecord;
use crate::sources::ctgov::CtGovStudy;
use crate::utils::date::parse_iso_date;

pub(crate) const FALLBACK_NCT_ID: &str = "N/A";
pub(crate) const FALLBACK_TITLE: &str = "No title provided";
pub(crate) const FALLBACK_ACRONYM: &str = "Unknown";
pub(crate) const FALLBACK_STATUS: &str = "Unknown";
pub(crate) const FALLBACK_STUDY_TYPE: &str = "Unknown";
pub(crate) const FALLBACK_FIRST_POST_DATE: &str = "Unknown Date";
pub(crate) const FALLBACK_CONDITIONS: &str = "No conditions listed";
pub(crate) const FALLBACK_INTERVENTIONS: &str = "No interventions listed";
pub(crate) const FALLBACK_INTERVENTION_NAME: &str = "No intervention name listed";
pub(crate) const FALLBACK_PHASES: &str = "Not Available";

/// Flattens a registry study into a display record, keyed by its last-update
/// date. Studies without a parseable `lastUpdatePostDateStruct.date` cannot be
/// recency-filtered or sorted and are dropped.
pub(crate) fn normalize_study(study: &CtGovStudy) -> Option<(Date, TrialRecord)> {
    let proto = study.protocol_section.as_ref();
    let ident = proto.and_then(|p| p.identification_module.as_ref());
    let status = proto.and_then(|p| p.status_module.as_ref());
    let conditions = proto.and_then(|p| p.conditions_module.as_ref());
    let arms = proto.and_then(|p| p.arms_interventions_module.as_ref());
    let design = proto.and_then(|p| p.design_module.as_ref());

    let last_update_raw = status
        .and_then(|s| s.last_update_post_date_struct.as_ref())
        .and_then(|d| d.date.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())?;
    let last_update = parse_iso_date(last_update_raw)?;

    let title = ident
        .and_then(|i| i.official_title.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            ident
                .and_then(|i| i.brief_title.as_deref())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or(FALLBACK_TITLE);

    let interventions = arms
        .map(|a| a.interventions.as_slice())
        .filter(|list| !list.is_empty())
        .map(|list| {
            list.iter()
                .map(|i| {
                    i.name
                        .as_deref()
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .unwrap_or(FALLBACK_INTERVENTION_NAME)
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_else(|| FALLBACK_INTERVENTIONS.to_string());

    let record = TrialRecord {
        nct_id: text_or(ident.and_then(|i| i.nct_id.as_deref()), FALLBACK_NCT_ID),
        title: title.to_string(),
        study_first_post_date: text_or(
            status
                .and_then(|s| s.study_first_post_date_struct.as_ref())
                .and_then(|d| d.date.as_deref()),
            FALLBACK_FIRST_POST_DATE,
        ),
        last_update_post_date: last_update_raw.to_string(),
        acronym: text_or(ident.and_then(|i| i.acronym.as_deref()), FALLBACK_ACRONYM),
        overall_status: text_or(
            status.and_then(|s| s.overall_status.as_deref()),
            FALLBACK_STATUS,
        ),
        conditions: join_or(
            conditions.map(|c| c.conditions.as_slice()).unwrap_or(&[]),
            FALLBACK_CONDITIONS,
        ),
        interventions,
        study_type: text_or(
            design.and_then(|d| d.study_type.as_deref()),
            FALLBACK_STUDY_TYPE,
        ),
        phases: join_or(
            design
                .and_then(|d| d.phases.as_deref())
                .unwrap_or(&[]),
            FALLBACK_PHASES,
        ),
    };

    Some((last_update, record))
}

fn text_or(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn join_or(values: &[String], fallback: &str) -> String {
    let cleaned: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.join(", ")
    }
}
