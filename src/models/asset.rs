use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::fields::{Field, ASSET_NAME_ID_DELIMITER};

/// VersionOne code for the "active" asset state.
pub const ACTIVE_ASSET_STATE: &str = "64";

/// One entry of a bulk query request.
#[derive(Debug, Clone, Serialize)]
pub struct QuerySpec {
    pub from: &'static str,
    pub select: Vec<&'static str>,
    #[serde(rename = "where")]
    pub filter: BTreeMap<&'static str, &'static str>,
    pub sort: Vec<&'static str>,
}

impl QuerySpec {
    pub fn active(from: &'static str, sort: &[&'static str]) -> Self {
        Self {
            from,
            select: vec!["Name"],
            filter: BTreeMap::from([("AssetState", ACTIVE_ASSET_STATE)]),
            sort: sort.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(rename = "queryResult")]
    pub query_result: QueryResult,
}

#[derive(Debug, Deserialize)]
pub struct QueryResult {
    /// One result set per query, in request order.
    pub results: Vec<Vec<AssetRow>>,
}

#[derive(Debug, Deserialize)]
pub struct AssetRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "_oid")]
    pub oid: String,
}

/// A selectable asset, stored in preferences as `name |@| oid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetOption {
    pub name: String,
    pub oid: String,
}

impl AssetOption {
    pub fn parse(raw: &str) -> Option<Self> {
        let (name, oid) = raw.split_once(ASSET_NAME_ID_DELIMITER)?;
        Some(Self {
            name: name.to_string(),
            oid: oid.to_string(),
        })
    }
}

impl From<AssetRow> for AssetOption {
    fn from(row: AssetRow) -> Self {
        Self {
            name: row.name,
            oid: row.oid,
        }
    }
}

impl fmt::Display for AssetOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, ASSET_NAME_ID_DELIMITER, self.oid)
    }
}

/// Options for every asset field, as fetched from VersionOne.
pub type ReferenceLists = BTreeMap<Field, Vec<AssetOption>>;
