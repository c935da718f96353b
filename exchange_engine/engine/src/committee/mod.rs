//! Committee selection over a snapshot of the node registry.

pub mod policy;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::{ExchangeError, Result};
use crate::types::{NodeInfo, RegisteredNode};

pub use policy::AccessPolicy;

/// Picks `n` of the registered nodes and numbers them `1..=n`.
///
/// With `randomize` the subset and its order are uniform (partial
/// Fisher-Yates); otherwise the first `n` in registry order are taken.
/// Registry indices may be sparse after churn, so the committee gets its own
/// dense numbering and the registry index is kept for logging only.
pub fn select_committee<R: Rng + ?Sized>(
    registered: &[RegisteredNode],
    n: usize,
    randomize: bool,
    rng: &mut R,
) -> Result<Vec<NodeInfo>> {
    if registered.len() < n {
        return Err(ExchangeError::InsufficientNodes {
            expected: n,
            actual: registered.len(),
        });
    }

    let mut candidates: Vec<&RegisteredNode> = registered.iter().collect();
    let chosen: &[&RegisteredNode] = if randomize {
        let (picked, _) = candidates.partial_shuffle(rng, n);
        picked
    } else {
        &candidates[..n]
    };

    let committee: Vec<NodeInfo> = chosen
        .iter()
        .enumerate()
        .map(|(position, node)| NodeInfo {
            registry_index: node.index,
            committee_index: position as u32 + 1,
            name: node.name.clone(),
            public_key_share: node.public_key.clone(),
        })
        .collect();

    debug!(
        committee = ?committee.iter().map(|m| (m.committee_index, m.registry_index)).collect::<Vec<_>>(),
        "selected committee"
    );
    Ok(committee)
}
