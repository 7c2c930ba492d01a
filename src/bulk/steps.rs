//! Step planning: splitting an identifier set into sequential batches.

use std::ops::Range;

use crate::bulk::BulkError;

/// Split `[0, total)` into at most `step_count` contiguous ranges.
///
/// Step size is `max(1, total / step_count)`; the last step (or any step
/// that would run past `total`) absorbs the remainder. Planning stops as
/// soon as a step would start at or beyond `total`.
pub fn plan_steps(total: usize, step_count: usize) -> Result<Vec<Range<usize>>, BulkError> {
    if step_count == 0 {
        return Err(BulkError::InvalidStepCount);
    }

    let step_size = (total / step_count).max(1);
    let mut steps = Vec::with_capacity(step_count.min(total));

    let mut step = 0;
    while step < step_count && step * step_size < total {
        let start = step * step_size;
        let mut end = start + step_size;
        if end > total || step == step_count - 1 {
            end = total;
        }
        steps.push(start..end);
        step += 1;
    }

    verify_partition(&steps, total)?;
    Ok(steps)
}

/// Check that `steps` cover `[0, total)` exactly once, in order.
pub fn verify_partition(steps: &[Range<usize>], total: usize) -> Result<(), BulkError> {
    let mut expected_start = 0;
    for step in steps {
        if step.start != expected_start || step.end <= step.start {
            return Err(BulkError::InvalidPartition {
                total,
                detail: format!("step {:?} does not start at {}", step, expected_start),
            });
        }
        expected_start = step.end;
    }
    if expected_start != total {
        return Err(BulkError::InvalidPartition {
            total,
            detail: format!("steps end at {}", expected_start),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remainder_goes_to_last_step() {
        assert_eq!(plan_steps(5, 2).unwrap(), vec![0..2, 2..5]);
        assert_eq!(plan_steps(7, 3).unwrap(), vec![0..2, 2..4, 4..7]);
        assert_eq!(plan_steps(9, 3).unwrap(), vec![0..3, 3..6, 6..9]);
    }

    #[test]
    fn test_more_steps_than_items() {
        assert_eq!(plan_steps(3, 10).unwrap(), vec![0..1, 1..2, 2..3]);
        assert_eq!(plan_steps(1, 4).unwrap(), vec![0..1]);
    }

    #[test]
    fn test_single_step() {
        assert_eq!(plan_steps(100, 1).unwrap(), vec![0..100]);
    }

    #[test]
    fn test_empty_and_invalid() {
        assert!(plan_steps(0, 3).unwrap().is_empty());
        assert!(matches!(plan_steps(5, 0), Err(BulkError::InvalidStepCount)));
    }

    #[test]
    fn test_partition_holds_for_all_small_inputs() {
        for total in 0..60 {
            for step_count in 1..25 {
                let steps = plan_steps(total, step_count).unwrap();
                assert!(steps.len() <= step_count);

                let mut covered = vec![0u32; total];
                for step in &steps {
                    for i in step.clone() {
                        covered[i] += 1;
                    }
                }
                assert!(
                    covered.iter().all(|&c| c == 1),
                    "total={} steps={} -> {:?}",
                    total,
                    step_count,
                    steps
                );
                if total > 0 {
                    assert_eq!(steps.last().unwrap().end, total);
                }
            }
        }
    }

    #[test]
    fn test_verify_partition_detects_gaps() {
        assert!(verify_partition(&[0..2, 3..5], 5).is_err());
        assert!(verify_partition(&[0..2, 2..4], 5).is_err());
        assert!(verify_partition(&[0..2, 1..5], 5).is_err());
        assert!(verify_partition(&[0..5], 5).is_ok());
    }
}
