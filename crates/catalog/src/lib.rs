use std::collections::BTreeSet;
use std::path::Path;

use foundation::coord::LngLat;
use foundation::ids::is_unset_id;
use serde::{Deserialize, Serialize};

/// Postal location of a business. Online-only businesses have none.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn lng_lat(&self) -> LngLat {
        LngLat::new(self.longitude, self.latitude)
    }
}

/// One business as supplied by the upstream search/filter collaborator.
///
/// Read-only from the map's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl BusinessRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: None,
            category: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some(Location {
            latitude,
            longitude,
        });
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn coordinate(&self) -> Option<LngLat> {
        self.location.map(|l| l.lng_lat())
    }

    pub fn is_online_only(&self) -> bool {
        self.location.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Parse(String),
    Io(String),
    DuplicateId(String),
    InvalidLocation(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Parse(msg) => write!(f, "business list is not valid JSON: {msg}"),
            CatalogError::Io(msg) => write!(f, "business list read error: {msg}"),
            CatalogError::DuplicateId(id) => write!(f, "duplicate business id: {id}"),
            CatalogError::InvalidLocation(id) => {
                write!(f, "business {id} has an out-of-range location")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Parses an ordered business list (a JSON array of records).
///
/// Ids must be unique and any location present must be a valid WGS84
/// coordinate. Input order is preserved.
pub fn parse_businesses(json: &str) -> Result<Vec<BusinessRecord>, CatalogError> {
    let records: Vec<BusinessRecord> =
        serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for r in &records {
        if !seen.insert(r.id.as_str()) {
            return Err(CatalogError::DuplicateId(r.id.clone()));
        }
        if let Some(c) = r.coordinate()
            && !c.is_valid()
        {
            return Err(CatalogError::InvalidLocation(r.id.clone()));
        }
    }
    Ok(records)
}

pub fn load_businesses(path: &Path) -> Result<Vec<BusinessRecord>, CatalogError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CatalogError::Io(format!("{}: {e}", path.display())))?;
    parse_businesses(&raw)
}

/// Linear lookup by id. An empty id never matches.
pub fn find_business_by_id<'a>(
    businesses: &'a [BusinessRecord],
    id: &str,
) -> Option<&'a BusinessRecord> {
    if is_unset_id(id) {
        return None;
    }
    businesses.iter().find(|b| b.id == id)
}

/// Number of businesses that cannot be shown on the map.
pub fn count_online_only(businesses: &[BusinessRecord]) -> usize {
    businesses.iter().filter(|b| b.is_online_only()).count()
}
