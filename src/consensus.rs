use std::collections::{HashMap, HashSet};

use crate::error::{ChunkError, ChunkResult};
use crate::models::{ChunkKey, ClipStamp};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Windows that at least `min_agreement` of the ranked lists contain.
///
/// Output follows first appearance when the lists are read in order, one
/// entry per window, cut to `limit`.
pub fn consensus(
    rankings: &[Vec<ClipStamp>],
    min_agreement: usize,
    limit: Option<usize>,
) -> ChunkResult<Vec<ClipStamp>> {
    if rankings.is_empty() || min_agreement == 0 {
        return Err(ChunkError::InvalidAgreement {
            min_agreement,
            rankings: rankings.len(),
        });
    }

    // A list naming the same window twice still votes once.
    let mut votes: HashMap<ChunkKey, usize> = HashMap::new();
    for ranking in rankings {
        let distinct: HashSet<ChunkKey> = ranking.iter().map(|clip| clip.key).collect();
        for key in distinct {
            *votes.entry(key).or_insert(0) += 1;
        }
    }

    let mut seen = HashSet::new();
    let mut agreed: Vec<ClipStamp> = rankings
        .iter()
        .flatten()
        .filter(|clip| votes.get(&clip.key).copied().unwrap_or(0) >= min_agreement)
        .filter(|clip| seen.insert(clip.key))
        .cloned()
        .collect();

    if let Some(limit) = limit {
        agreed.truncate(limit);
    }

    log_info!(
        "{} windows agreed on by at least {min_agreement} of {} rankings",
        agreed.len(),
        rankings.len()
    );
    Ok(agreed)
}
