use serde::{Deserialize, Serialize};

use crate::region::derive_region;

/// A record as the page source hands it over, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub name: String,
    pub address: String,
    pub website: String,
}

impl RawRecord {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        website: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            website: website.into(),
        }
    }
}

/// A harvested organization.
///
/// `region` is derived from `address` once, when the record is built, and never
/// changes afterwards. Records are compared positionally; two organizations with
/// the same name are two records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub address: String,
    pub website: String,
    #[serde(default)]
    pub contact: Option<String>,
    pub region: String,
}

impl Record {
    /// Builds a final record out of a raw one. Returns `None` when the name is blank.
    pub fn from_raw(raw: RawRecord, contact: Option<String>) -> Option<Self> {
        let name = raw.name.trim();
        if name.is_empty() {
            return None;
        }
        let region = derive_region(&raw.address);
        Some(Self {
            name: name.to_string(),
            address: raw.address,
            website: raw.website,
            contact,
            region,
        })
    }
}
