use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

const BUNDLED: &[(&str, &str)] = &[
    ("SC", include_str!("../../../data/jurisdictions/sc.json")),
    ("WA", include_str!("../../../data/jurisdictions/wa.json")),
];

/// Statute-of-limitations window expressed in calendar units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatuteDuration {
    pub years: u32,
    #[serde(default)]
    pub months: u32,
}

impl StatuteDuration {
    pub const fn years(years: u32) -> Self {
        Self { years, months: 0 }
    }

    pub const fn total_months(&self) -> u32 {
        self.years * 12 + self.months
    }

    /// Last day a claim for an injury on `injury_date` remains timely. Month arithmetic clamps
    /// to the end of shorter months, so a Feb 29 injury expires on Feb 28.
    pub fn expires_on(&self, injury_date: NaiveDate) -> Option<NaiveDate> {
        injury_date.checked_add_months(Months::new(self.total_months()))
    }
}

impl std::fmt::Display for StatuteDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.years, self.months) {
            (years, 0) => write!(f, "{years} year(s)"),
            (0, months) => write!(f, "{months} month(s)"),
            (years, months) => write!(f, "{years} year(s) {months} month(s)"),
        }
    }
}

/// Immutable reference data for one jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionProfile {
    pub name: String,
    pub code: String,
    pub sol_duration: StatuteDuration,
    #[serde(default)]
    pub sol_notes: String,
    pub counties: Vec<String>,
    #[serde(default, alias = "major_metros")]
    pub metro_groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub default_preferred_counties: Vec<String>,
}

impl JurisdictionProfile {
    /// Canonical spelling of `raw` when it names one of this jurisdiction's counties.
    pub fn canonical_county(&self, raw: &str) -> Option<&str> {
        let wanted = normalize_county(raw);
        if wanted.is_empty() {
            return None;
        }
        self.counties
            .iter()
            .find(|county| normalize_county(county) == wanted)
            .map(String::as_str)
    }

    pub fn contains_county(&self, raw: &str) -> bool {
        self.canonical_county(raw).is_some()
    }

    /// Expand a list of county or metro-group names into normalized county names. Entries that
    /// match a metro group (case-insensitive) are replaced by the group's counties.
    pub fn expand_counties(&self, names: &[String]) -> Vec<String> {
        let mut expanded = Vec::new();
        for name in names {
            let metro = self
                .metro_groups
                .iter()
                .find(|(metro, _)| metro.trim().eq_ignore_ascii_case(name.trim()));
            match metro {
                Some((_, counties)) => {
                    expanded.extend(counties.iter().map(|county| normalize_county(county)))
                }
                None => expanded.push(normalize_county(name)),
            }
        }
        expanded.retain(|county| !county.is_empty());
        expanded.sort();
        expanded.dedup();
        expanded
    }
}

/// Lowercase, trim, and strip a trailing "county" designator.
pub fn normalize_county(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let stripped = lowered
        .strip_suffix(" county")
        .or_else(|| lowered.strip_suffix(" co."))
        .unwrap_or(lowered.as_str());
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, thiserror::Error)]
pub enum JurisdictionError {
    #[error("no jurisdiction data for '{0}'")]
    NotFound(String),
    #[error("jurisdiction data for '{code}' is malformed: {source}")]
    Malformed {
        code: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("jurisdiction data for '{code}' could not be read: {source}")]
    Io {
        code: String,
        #[source]
        source: std::io::Error,
    },
}

/// Backing store for jurisdiction reference data. Codes arrive upper-cased.
pub trait JurisdictionSource: Send + Sync {
    fn load(&self, code: &str) -> Result<Option<JurisdictionProfile>, JurisdictionError>;
    fn codes(&self) -> Vec<String>;
}

/// Jurisdictions compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledJurisdictions;

impl JurisdictionSource for BundledJurisdictions {
    fn load(&self, code: &str) -> Result<Option<JurisdictionProfile>, JurisdictionError> {
        BUNDLED
            .iter()
            .find(|(bundled, _)| *bundled == code)
            .map(|(_, raw)| parse_profile(code, raw))
            .transpose()
    }

    fn codes(&self) -> Vec<String> {
        BUNDLED.iter().map(|(code, _)| code.to_string()).collect()
    }
}

/// Jurisdictions read from `<root>/<code>.json` (lower-case file names).
#[derive(Debug, Clone)]
pub struct DirectoryJurisdictions {
    root: PathBuf,
}

impl DirectoryJurisdictions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl JurisdictionSource for DirectoryJurisdictions {
    fn load(&self, code: &str) -> Result<Option<JurisdictionProfile>, JurisdictionError> {
        let path = self.root.join(format!("{}.json", code.to_ascii_lowercase()));
        match std::fs::read_to_string(&path) {
            Ok(raw) => parse_profile(code, &raw).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(JurisdictionError::Io {
                code: code.to_string(),
                source,
            }),
        }
    }

    fn codes(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut codes: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    return None;
                }
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_ascii_uppercase)
            })
            .collect();
        codes.sort();
        codes
    }
}

fn parse_profile(code: &str, raw: &str) -> Result<JurisdictionProfile, JurisdictionError> {
    serde_json::from_str(raw).map_err(|source| JurisdictionError::Malformed {
        code: code.to_string(),
        source,
    })
}

/// Read-through cache over a [`JurisdictionSource`]. Profiles are loaded once per code and
/// shared for the lifetime of the catalog.
pub struct JurisdictionCatalog {
    source: Box<dyn JurisdictionSource>,
    cache: Mutex<HashMap<String, Arc<JurisdictionProfile>>>,
}

impl JurisdictionCatalog {
    pub fn new(source: Box<dyn JurisdictionSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn bundled() -> Self {
        Self::new(Box::new(BundledJurisdictions))
    }

    /// Codes are two-letter region codes; anything else is `NotFound` before a source is asked.
    pub fn profile_for(&self, code: &str) -> Result<Arc<JurisdictionProfile>, JurisdictionError> {
        let key = code.trim().to_ascii_uppercase();
        if key.len() != 2 || !key.bytes().all(|byte| byte.is_ascii_uppercase()) {
            return Err(JurisdictionError::NotFound(code.to_string()));
        }

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(profile) = cache.get(&key) {
            return Ok(profile.clone());
        }

        let profile = self
            .source
            .load(&key)?
            .ok_or_else(|| JurisdictionError::NotFound(key.clone()))?;
        let profile = Arc::new(profile);
        cache.insert(key, profile.clone());
        Ok(profile)
    }

    pub fn available_codes(&self) -> Vec<String> {
        self.source.codes()
    }
}

impl Default for JurisdictionCatalog {
    fn default() -> Self {
        Self::bundled()
    }
}

impl std::fmt::Debug for JurisdictionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JurisdictionCatalog").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_south_carolina_profile_loads() {
        let catalog = JurisdictionCatalog::bundled();
        let profile = catalog.profile_for("SC").expect("SC bundled");

        assert_eq!(profile.name, "South Carolina");
        assert_eq!(profile.sol_duration, StatuteDuration::years(3));
        assert_eq!(profile.counties.len(), 46);
        assert!(profile.contains_county("Charleston"));
        assert!(profile
            .default_preferred_counties
            .iter()
            .any(|county| county == "Charleston"));
    }

    #[test]
    fn bundled_washington_profile_loads() {
        let profile = JurisdictionCatalog::bundled()
            .profile_for("WA")
            .expect("WA bundled");
        assert_eq!(profile.counties.len(), 39);
        assert!(profile.contains_county("king county"));
    }

    #[test]
    fn lookup_is_case_insensitive_and_cached() {
        let catalog = JurisdictionCatalog::bundled();
        let upper = catalog.profile_for("SC").expect("upper");
        let lower = catalog.profile_for(" sc ").expect("lower");

        assert!(Arc::ptr_eq(&upper, &lower));
        assert_eq!(*upper, *lower);
    }

    #[test]
    fn unknown_code_is_not_found() {
        let catalog = JurisdictionCatalog::bundled();
        match catalog.profile_for("XX") {
            Err(JurisdictionError::NotFound(code)) => assert_eq!(code, "XX"),
            other => panic!("expected not found, got {other:?}"),
        }
        assert_eq!(catalog.available_codes(), vec!["SC", "WA"]);
    }

    #[test]
    fn codes_other_than_two_letters_never_reach_the_source() {
        let root = std::env::temp_dir().join(format!("jurisdictions-{}", std::process::id()));
        let data = root.join("data");
        std::fs::create_dir_all(&data).expect("data dir");
        let sc = include_str!("../../../data/jurisdictions/sc.json");
        std::fs::write(data.join("sc.json"), sc).expect("profile written");
        std::fs::write(root.join("outside.json"), sc).expect("stray file written");

        let catalog = JurisdictionCatalog::new(Box::new(DirectoryJurisdictions::new(&data)));
        let loaded = catalog.profile_for("sc");
        let escaped = catalog.profile_for("../outside");
        let numeric = catalog.profile_for("S1");
        std::fs::remove_dir_all(&root).ok();

        assert_eq!(loaded.expect("sc from directory").code, "SC");
        assert!(matches!(escaped, Err(JurisdictionError::NotFound(_))));
        assert!(matches!(numeric, Err(JurisdictionError::NotFound(_))));
        assert!(matches!(
            JurisdictionCatalog::bundled().profile_for(""),
            Err(JurisdictionError::NotFound(_))
        ));
    }

    #[test]
    fn county_normalization_strips_designators() {
        assert_eq!(normalize_county("  Charleston County "), "charleston");
        assert_eq!(normalize_county("Walla  Walla"), "walla walla");
        assert_eq!(normalize_county("Horry Co."), "horry");
    }

    #[test]
    fn metro_groups_expand_into_counties() {
        let profile = JurisdictionCatalog::bundled()
            .profile_for("SC")
            .expect("SC bundled");
        let expanded =
            profile.expand_counties(&["charleston tri-county".to_string(), "York".to_string()]);
        assert_eq!(expanded, vec!["berkeley", "charleston", "dorchester", "york"]);
    }

    #[test]
    fn leap_day_injuries_expire_at_month_end() {
        let injury = NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid");
        let expiry = StatuteDuration::years(3).expires_on(injury).expect("in range");
        assert_eq!(expiry, NaiveDate::from_ymd_opt(2027, 2, 28).expect("valid"));
    }
}
