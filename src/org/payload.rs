//! Wire types for the organization-listing collaborator.
//!
//! The listing arrives in one of two shapes: a forest already nested by
//! the server (institutions with `children` and `departments` arrays),
//! or a flat list of records each carrying `kind`, `parent_id` and
//! `parent_kind`. The shape is detected from the JSON itself — flat
//! records are the only ones that carry a `kind` field.

use serde::Deserialize;

use crate::error::Result;

fn default_true() -> bool {
    true
}

fn default_level() -> u8 {
    1
}

/// One institution in a server-nested listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstitutionEntry {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    /// Server type label: "ministry", "region", "sector", "school", ...
    #[serde(rename = "type", default)]
    pub institution_type: String,
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Sub-institutions.
    #[serde(default)]
    pub children: Vec<InstitutionEntry>,
    /// Departments attached directly to this institution.
    #[serde(default)]
    pub departments: Vec<DepartmentEntry>,
}

/// One department in a server-nested listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DepartmentEntry {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub department_type: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Sub-departments.
    #[serde(default)]
    pub children: Vec<DepartmentEntry>,
}

/// One record in a flat listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlatEntry {
    pub id: u64,
    /// "institution" or "department".
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(rename = "type", default)]
    pub institution_type: Option<String>,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub department_type: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub parent_id: Option<u64>,
    /// Defaults to "institution" when `parent_id` is set without it.
    #[serde(default)]
    pub parent_kind: Option<String>,
}

/// A parsed organization listing, nested or flat.
#[derive(Debug, Clone, PartialEq)]
pub enum OrgListing {
    Nested(Vec<InstitutionEntry>),
    Flat(Vec<FlatEntry>),
}

impl OrgListing {
    /// Parse a listing from JSON, detecting the shape.
    pub fn from_json(input: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        let is_flat = value.as_array().is_some_and(|entries| {
            entries
                .iter()
                .any(|entry| entry.get("kind").is_some() || entry.get("parent_kind").is_some())
        });
        if is_flat {
            Ok(OrgListing::Flat(serde_json::from_value(value)?))
        } else {
            Ok(OrgListing::Nested(serde_json::from_value(value)?))
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            OrgListing::Nested(entries) => entries.is_empty(),
            OrgListing::Flat(entries) => entries.is_empty(),
        }
    }
}
