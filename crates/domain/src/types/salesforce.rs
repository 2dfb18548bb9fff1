//! Typed Salesforce wire shapes.
//!
//! Remote payloads are loosely shaped JSON; everything crossing the boundary
//! is parsed into these structs before any mapper sees it, and malformed
//! payloads are rejected at deserialization time.
//!
//! Salesforce serializes datetimes as `2024-01-02T00:00:00.000+0000` — an
//! offset without a colon, which strict RFC 3339 parsing rejects — so
//! `LastModifiedDate` fields go through [`sf_datetime`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Envelope returned by the Salesforce query endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse<T> {
    pub total_size: i64,
    pub done: bool,
    /// Relative URL of the next page when `done` is false.
    pub next_records_url: Option<String>,
    pub records: Vec<T>,
}

/// Result body of a sobject create call.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateResult {
    pub id: String,
    pub success: bool,
}

/// A Salesforce user row, as listed for the user ID map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SfUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// A Salesforce account row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SfAccount {
    pub id: String,
    pub name: String,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub owner_id: Option<String>,
    #[serde(with = "sf_datetime")]
    pub last_modified_date: DateTime<Utc>,
}

/// A Salesforce contact row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SfContact {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub account_id: Option<String>,
    #[serde(with = "sf_datetime")]
    pub last_modified_date: DateTime<Utc>,
}

/// A Salesforce opportunity row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SfOpportunity {
    pub id: String,
    pub name: String,
    /// Decimal major currency units.
    pub amount: Option<f64>,
    pub close_date: NaiveDate,
    pub stage_name: String,
    /// 0–100 percentage.
    pub probability: Option<f64>,
    pub forecast_category_name: Option<String>,
    pub owner_id: Option<String>,
    pub account_id: Option<String>,
    #[serde(with = "sf_datetime")]
    pub last_modified_date: DateTime<Utc>,
}

/// Outgoing account create/update body. Absent fields are omitted so a
/// partial update never clears remote values.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SfAccountPatch {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

/// Outgoing contact create/update body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SfContactPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

/// Outgoing opportunity create/update body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SfOpportunityPatch {
    pub name: String,
    pub amount: f64,
    pub close_date: NaiveDate,
    pub stage_name: String,
    pub probability: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub account_id: String,
}

/// Serde support for Salesforce datetime strings.
///
/// Accepts RFC 3339 (`2024-01-02T00:00:00Z`, `...+00:00`) as well as the
/// `...+0000` offset Salesforce actually emits; serializes in Salesforce's
/// own millisecond format.
pub mod sf_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    const SF_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(SF_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("unrecognized Salesforce datetime: {raw}"))
        })
    }
}
