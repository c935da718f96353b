//! Threshold access policy bound to one selected committee.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ExchangeError, Result};
use crate::types::NodeInfo;

/// Share x-coordinates are a single byte.
pub const MAX_COMMITTEE_SIZE: usize = 255;

/// Which `t` of which `n` nodes must cooperate to release a dataset.
///
/// Built once at publish time and stored verbatim in the data record. The
/// fields are private so a policy read back from the ledger has passed the
/// same checks as one built locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyParts")]
pub struct AccessPolicy {
    t: usize,
    n: usize,
    indices: Vec<u32>,
    names: Vec<String>,
}

#[derive(Deserialize)]
struct PolicyParts {
    t: usize,
    n: usize,
    indices: Vec<u32>,
    names: Vec<String>,
}

impl TryFrom<PolicyParts> for AccessPolicy {
    type Error = ExchangeError;

    fn try_from(parts: PolicyParts) -> Result<Self> {
        if parts.n != parts.names.len() {
            return Err(ExchangeError::InvalidPolicy {
                t: parts.t,
                n: parts.n,
            });
        }
        AccessPolicy::new(parts.t, parts.indices, parts.names)
    }
}

impl AccessPolicy {
    /// Validates `1 <= t <= n`, parallel lengths, unique names and dense `1..=n` indices.
    pub fn new(t: usize, indices: Vec<u32>, names: Vec<String>) -> Result<Self> {
        let n = names.len();
        validate_threshold(t, n)?;

        if indices.len() != n {
            return Err(ExchangeError::InvalidPolicy { t, n: indices.len() });
        }
        let dense = indices
            .iter()
            .enumerate()
            .all(|(i, index)| *index as usize == i + 1);
        if !dense {
            return Err(ExchangeError::InvalidPolicy { t, n });
        }
        let unique: HashSet<&String> = names.iter().collect();
        if unique.len() != n {
            return Err(ExchangeError::InvalidPolicy { t, n });
        }

        Ok(AccessPolicy { t, n, indices, names })
    }

    /// Packages a freshly selected committee. The caller asks for the right committee size.
    pub fn from_committee(t: usize, committee: &[NodeInfo]) -> Result<Self> {
        let indices = committee.iter().map(|node| node.committee_index).collect();
        let names = committee.iter().map(|node| node.name.clone()).collect();
        AccessPolicy::new(t, indices, names)
    }

    pub fn threshold(&self) -> usize {
        self.t
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `(committee index, node name)` pairs in policy order.
    pub fn members(&self) -> impl Iterator<Item = (u32, &str)> {
        self.indices
            .iter()
            .copied()
            .zip(self.names.iter().map(String::as_str))
    }
}

pub fn validate_threshold(t: usize, n: usize) -> Result<()> {
    if t == 0 || t > n || n > MAX_COMMITTEE_SIZE {
        return Err(ExchangeError::InvalidPolicy { t, n });
    }
    Ok(())
}
