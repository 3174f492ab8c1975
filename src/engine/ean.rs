//! EAN resolution via the repository-side ranked search.
//!
//! The heavy lifting (blending exact, phonetic and lexical similarity over
//! known code/description pairs) lives behind the repository; the resolver
//! just takes the best row. Zero rows is a common, expected outcome.

use crate::engine::error::EngineError;
use crate::repo::{RankedMatch, Repository};

/// Resolve the most likely EAN for a free-text description.
///
/// Returns `EngineError::NotFound` when the ranked search yields no rows and
/// `InvalidCriteria` for a blank description.
pub fn resolve(repo: &dyn Repository, description: &str) -> Result<RankedMatch, EngineError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(EngineError::InvalidCriteria(
            "description must not be empty".into(),
        ));
    }

    let rows = repo.ranked_description_search(description)?;
    rows.into_iter().next().ok_or(EngineError::NotFound)
}
