use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One intake export row with blanks already collapsed to `None`.
#[derive(Debug, Deserialize)]
pub(crate) struct IntakeRow {
    #[serde(rename = "Record ID", default, deserialize_with = "empty_string_as_none")]
    pub(crate) record_id: Option<String>,
    #[serde(rename = "Lead Name", default)]
    pub(crate) name: String,
    #[serde(rename = "Email Address", default, deserialize_with = "empty_string_as_none")]
    pub(crate) email: Option<String>,
    #[serde(rename = "Phone Number", default, deserialize_with = "empty_string_as_none")]
    pub(crate) phone: Option<String>,
    #[serde(rename = "Accident Date", default, deserialize_with = "empty_string_as_none")]
    pub(crate) accident_date: Option<String>,
    #[serde(rename = "Jurisdiction", default, deserialize_with = "empty_string_as_none")]
    pub(crate) jurisdiction: Option<String>,
    #[serde(rename = "County", default, deserialize_with = "empty_string_as_none")]
    pub(crate) county: Option<String>,
    #[serde(rename = "Accident Location", default, deserialize_with = "empty_string_as_none")]
    pub(crate) accident_location: Option<String>,
    #[serde(rename = "Case Type", default)]
    pub(crate) case_type: String,
    #[serde(rename = "Lead Information Summary", default)]
    pub(crate) summary: String,
    #[serde(rename = "Processing Status", default, deserialize_with = "empty_string_as_none")]
    pub(crate) status: Option<String>,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<IntakeRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader.deserialize::<IntakeRow>().collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts RFC 3339 timestamps, ISO dates, and US `MM/DD/YYYY` dates.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }

    ["%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}
