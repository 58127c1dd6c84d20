//! Target region lists
//!
//! The first region is the primary (write) region. Lists are validated once,
//! before anything is declared.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::stack::StackError;

lazy_static! {
    static ref REGION_RE: Regex = Regex::new(r"^[a-z0-9]+$").expect("region pattern is valid");
}

/// A non-empty, duplicate-free list of region identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Regions(Vec<String>);

impl Regions {
    /// Validate an explicit list
    pub fn new(regions: Vec<String>) -> Result<Self, StackError> {
        if regions.is_empty() {
            return Err(StackError::InvalidRegions(
                "at least one region is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for region in &regions {
            if !REGION_RE.is_match(region) {
                return Err(StackError::InvalidRegions(format!(
                    "'{region}' is not a region identifier (expected lowercase letters and digits)"
                )));
            }
            if !seen.insert(region.as_str()) {
                return Err(StackError::InvalidRegions(format!(
                    "'{region}' is listed more than once"
                )));
            }
        }

        Ok(Self(regions))
    }

    /// Parse a comma-separated list such as `"westus,eastus,westeurope"`
    pub fn parse(list: &str) -> Result<Self, StackError> {
        let regions = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(regions)
    }

    /// The write region
    pub fn primary(&self) -> &str {
        &self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for Regions {
    type Error = StackError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Regions> for Vec<String> {
    fn from(value: Regions) -> Self {
        value.0
    }
}
