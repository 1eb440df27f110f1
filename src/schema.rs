//! Record schemas for the bronze → silver → gold tiers.
//!
//! The raw CSV carries column names with spaces and punctuation. Those are
//! mapped once, through [`COLUMN_ALIASES`], to the validator's internal
//! field names; validation then reshapes a row into the clean
//! [`ValidatedComplaint`] field names persisted in the silver layer.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const TIMELY_RESPONSE_CHOICES: [&str; 2] = ["Yes", "No"];
pub const CONSUMER_DISPUTED_CHOICES: [&str; 3] = ["Yes", "No", "N/A"];

/// Narratives shorter than this carry too little signal for the text model.
pub const MIN_NARRATIVE_CHARS: usize = 50;

/// Raw CSV header name → validator field name. Defined once and reused by
/// the chunk reader and anywhere raw headers are resolved.
pub const COLUMN_ALIASES: [(&str, &str); 12] = [
    ("Complaint ID", "complaint_id"),
    ("Date received", "date_received"),
    ("Product", "product"),
    ("Sub-product", "sub_product"),
    ("Issue", "issue"),
    ("Consumer complaint narrative", "consumer_complaint_narrative"),
    ("Company response to consumer", "company_response_to_consumer"),
    ("Timely response?", "timely_response"),
    ("Consumer disputed?", "consumer_disputed"),
    ("Company", "company"),
    ("State", "state"),
    ("Submitted via", "submitted_via"),
];

/// One source row before validation. All values arrive as untyped text;
/// empty CSV fields are `None`. Exists only within chunk-processing scope.
#[derive(Debug, Clone, Default)]
pub struct RawComplaint {
    pub complaint_id: Option<String>,
    pub date_received: Option<String>,
    pub product: Option<String>,
    pub sub_product: Option<String>,
    pub issue: Option<String>,
    pub consumer_complaint_narrative: Option<String>,
    pub company_response_to_consumer: Option<String>,
    pub timely_response: Option<String>,
    pub consumer_disputed: Option<String>,
    pub company: Option<String>,
    pub state: Option<String>,
    pub submitted_via: Option<String>,
}

/// The canonical post-validation record persisted to the silver layer.
/// Immutable once constructed; appended in source order, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedComplaint {
    pub complaint_id: i64,
    pub date_received: NaiveDateTime,
    pub product: String,
    pub sub_product: Option<String>,
    pub issue: String,
    pub narrative: String,
    pub company_response: String,
    pub timely_response: String,
    pub consumer_disputed: Option<String>,
    pub company: String,
    pub state: Option<String>,
    pub submitted_via: String,
}

/// ValidatedComplaint plus the derived label; the narrative inside the
/// record is replaced by its normalized form when the gold layer is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldComplaint {
    pub record: ValidatedComplaint,
    pub escalation_risk: i32,
}

/// Why a single row was dropped. Missing narratives are tracked separately
/// from every other schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    MissingNarrative,
    Invalid(String),
}

/// Validate one raw row, producing either the clean silver-layer record or
/// a rejection for the caller to count. Never panics; the caller aggregates
/// failures and keeps going.
pub fn validate(raw: &RawComplaint) -> Result<ValidatedComplaint, RowRejection> {
    // The narrative is the multimodal input; a row without one is dropped
    // before any other check and counted under its own reason.
    let narrative = match raw.consumer_complaint_narrative.as_deref() {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(RowRejection::MissingNarrative),
    };
    if narrative.chars().count() < MIN_NARRATIVE_CHARS {
        return Err(RowRejection::Invalid(format!(
            "narrative shorter than {} characters",
            MIN_NARRATIVE_CHARS
        )));
    }

    let complaint_id = raw
        .complaint_id
        .as_deref()
        .ok_or_else(|| RowRejection::Invalid("complaint_id is missing".into()))?
        .trim()
        .parse::<i64>()
        .map_err(|e| RowRejection::Invalid(format!("complaint_id is not an integer: {}", e)))?;

    let date_received = raw
        .date_received
        .as_deref()
        .ok_or_else(|| RowRejection::Invalid("date_received is missing".into()))
        .and_then(|s| {
            parse_date_received(s.trim()).ok_or_else(|| {
                RowRejection::Invalid(format!("date_received '{}' is not a valid timestamp", s))
            })
        })?;

    let timely_response = required_string(&raw.timely_response, "timely_response")?;
    if !TIMELY_RESPONSE_CHOICES.contains(&timely_response.as_str()) {
        return Err(RowRejection::Invalid(format!(
            "timely_response must be one of {:?}, but got '{}'",
            TIMELY_RESPONSE_CHOICES, timely_response
        )));
    }

    let consumer_disputed = match raw.consumer_disputed.as_deref() {
        None => None,
        Some(value) => {
            if !CONSUMER_DISPUTED_CHOICES.contains(&value) {
                return Err(RowRejection::Invalid(format!(
                    "consumer_disputed must be one of {:?}, but got '{}'",
                    CONSUMER_DISPUTED_CHOICES, value
                )));
            }
            Some(value.to_string())
        }
    };

    let product = required_string(&raw.product, "product")?;
    let issue = required_string(&raw.issue, "issue")?;
    let company_response =
        required_string(&raw.company_response_to_consumer, "company_response_to_consumer")?;
    let company = required_string(&raw.company, "company")?;
    let submitted_via = required_string(&raw.submitted_via, "submitted_via")?;

    // Reshape to the silver-layer field names.
    Ok(ValidatedComplaint {
        complaint_id,
        date_received,
        product,
        sub_product: raw.sub_product.clone(),
        issue,
        narrative,
        company_response,
        timely_response,
        consumer_disputed,
        company,
        state: raw.state.clone(),
        submitted_via,
    })
}

fn required_string(
    value: &Option<String>,
    field: &str,
) -> Result<String, RowRejection> {
    match value.as_deref() {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(RowRejection::Invalid(format!("{} is missing", field))),
    }
}

/// Accepts the date formats seen across CFPB exports.
fn parse_date_received(s: &str) -> Option<NaiveDateTime> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    None
}
