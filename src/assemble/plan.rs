use std::ops::Range;

use crate::foundation::error::{ToonError, ToonResult};

/// How the assembler concatenates its segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssemblyPlan {
    /// One concat pass over every segment.
    Direct,
    /// Each range is concatenated into an intermediate file first; the intermediates are
    /// joined in a second pass.
    Batched { batches: Vec<Range<usize>> },
}

impl AssemblyPlan {
    pub fn batch_count(&self) -> usize {
        match self {
            Self::Direct => 0,
            Self::Batched { batches } => batches.len(),
        }
    }
}

/// Direct concat up to `direct_limit` segments, otherwise consecutive batches of `batch_size`.
pub fn plan_assembly(
    segment_count: usize,
    direct_limit: usize,
    batch_size: usize,
) -> ToonResult<AssemblyPlan> {
    if segment_count == 0 {
        return Err(ToonError::validation("assembly needs at least one segment"));
    }
    if batch_size == 0 {
        return Err(ToonError::validation("batch_size must be >= 1"));
    }
    if segment_count <= direct_limit {
        return Ok(AssemblyPlan::Direct);
    }

    let batches = (0..segment_count)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(segment_count))
        .collect();
    Ok(AssemblyPlan::Batched { batches })
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/plan.rs"]
mod tests;
