use std::convert::Infallible;

use rayon::prelude::*;
use tracing::info;

use crate::error::RingError;
use crate::ring::{Ring, RingConfig};

/// Visit every ordering of `pool` exactly once, stopping at the first error.
///
/// Orderings are generated in place by swapping, so positions are what is
/// permuted: a pool of k values always yields k! orderings. The first
/// ordering visited is `pool` itself.
pub fn try_for_each_permutation<E, F>(pool: &[i64], mut visit: F) -> Result<(), E>
where
    F: FnMut(&[i64]) -> Result<(), E>,
{
    let mut values = pool.to_vec();
    permute(&mut values, 0, &mut visit)
}

fn permute<E, F>(values: &mut [i64], index: usize, visit: &mut F) -> Result<(), E>
where
    F: FnMut(&[i64]) -> Result<(), E>,
{
    if index + 1 >= values.len() {
        return visit(values);
    }
    for i in index..values.len() {
        values.swap(index, i);
        let result = permute(values, index + 1, visit);
        values.swap(index, i);
        result?;
    }
    Ok(())
}

/// All orderings of `pool`, in visiting order.
pub fn permutations(pool: &[i64]) -> Vec<Vec<i64>> {
    let mut out = Vec::new();
    try_for_each_permutation(pool, |p| {
        out.push(p.to_vec());
        Ok::<(), Infallible>(())
    })
    .unwrap_or_else(|never| match never {});
    out
}

/// Result of evaluating every phase ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exploration {
    /// Highest final signal observed.
    pub signal: i64,
    /// The first ordering that produced it.
    pub phases: Vec<i64>,
    /// Number of orderings evaluated.
    pub trials: usize,
}

/// Searches phase-setting orderings for the one that maximizes a ring's
/// final signal.
pub struct Explorer {
    ring: Ring,
    feedback: bool,
}

impl Explorer {
    pub fn new(ring: Ring, feedback: bool) -> Self {
        Self { ring, feedback }
    }

    pub fn from_config(template: &[i64], config: &RingConfig) -> Result<Self, RingError> {
        Ok(Self::new(Ring::from_config(template, config)?, config.feedback))
    }

    /// Reset the ring and evaluate it once for `phases`.
    fn trial(ring: &mut Ring, feedback: bool, phases: &[i64]) -> Result<i64, RingError> {
        ring.reset();
        if feedback {
            ring.run_with_feedback(phases)
        } else {
            ring.run_once(phases)
        }
    }

    /// Evaluate every ordering of `pool` and return the best one.
    ///
    /// Ties keep the ordering found first. Any machine error aborts the whole
    /// exploration.
    pub fn explore(&mut self, pool: &[i64]) -> Result<Exploration, RingError> {
        if pool.is_empty() {
            return Err(RingError::EmptyPool);
        }
        let mut best: Option<(i64, Vec<i64>)> = None;
        let mut trials = 0;

        try_for_each_permutation(pool, |phases| {
            let signal = Self::trial(&mut self.ring, self.feedback, phases)?;
            trials += 1;
            if best.as_ref().is_none_or(|(top, _)| signal > *top) {
                info!(signal, ?phases, "new best");
                best = Some((signal, phases.to_vec()));
            }
            Ok::<(), RingError>(())
        })?;

        let (signal, phases) = best.ok_or(RingError::EmptyPool)?;
        info!(signal, ?phases, trials, "exploration complete");
        Ok(Exploration {
            signal,
            phases,
            trials,
        })
    }

    /// Same result as [`Explorer::explore`], with trials spread over the rayon
    /// thread pool. Each worker drives its own clone of the ring.
    pub fn par_explore(&self, pool: &[i64]) -> Result<Exploration, RingError> {
        if pool.is_empty() {
            return Err(RingError::EmptyPool);
        }
        let orderings = permutations(pool);
        let feedback = self.feedback;

        let signals: Vec<i64> = orderings
            .par_iter()
            .map_init(
                || self.ring.clone(),
                |ring, phases| Self::trial(ring, feedback, phases),
            )
            .collect::<Result<Vec<i64>, RingError>>()?;

        // Scan in visiting order so ties resolve like the sequential search.
        let mut best = 0;
        for (i, &signal) in signals.iter().enumerate() {
            if signal > signals[best] {
                best = i;
            }
        }

        let exploration = Exploration {
            signal: signals[best],
            phases: orderings[best].clone(),
            trials: signals.len(),
        };
        info!(
            signal = exploration.signal,
            phases = ?exploration.phases,
            trials = exploration.trials,
            "exploration complete"
        );
        Ok(exploration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MachineError;
    use std::collections::HashSet;

    const DIGITS: [i64; 17] = [3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0];

    const SUBTRACT: [i64; 25] = [
        3, 23, 3, 24, 1002, 24, 10, 24, 1002, 23, -1, 23, 101, 5, 23, 23, 1, 24, 23, 23, 4, 23, 99,
        0, 0,
    ];

    const MIXED: [i64; 34] = [
        3, 31, 3, 32, 1002, 32, 10, 32, 1001, 31, -2, 31, 1007, 31, 0, 33, 1002, 33, 7, 33, 1, 33,
        31, 31, 1, 32, 31, 31, 4, 31, 99, 0, 0, 0,
    ];

    const FEEDBACK: [i64; 29] = [
        3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
        1005, 28, 6, 99, 0, 0, 5,
    ];

    const FEEDBACK_LONG: [i64; 57] = [
        3, 52, 1001, 52, -5, 52, 3, 53, 1, 52, 56, 54, 1007, 54, 5, 55, 1005, 55, 26, 1001, 54, -5,
        54, 1105, 1, 12, 1, 53, 54, 53, 1008, 54, 0, 55, 1001, 55, 1, 55, 2, 53, 55, 53, 4, 53,
        1001, 56, -1, 56, 1005, 56, 6, 99, 0, 0, 0, 0, 10,
    ];

    // Output = signal + 1, phase ignored.
    const INCREMENT: [i64; 13] = [3, 11, 3, 12, 1001, 12, 1, 12, 4, 12, 99, 0, 0];

    fn explorer(program: &[i64], size: usize, feedback: bool) -> Explorer {
        let config = if feedback {
            RingConfig::feedback(size)
        } else {
            RingConfig {
                size,
                ..Default::default()
            }
        };
        Explorer::from_config(program, &config).unwrap()
    }

    fn factorial(k: usize) -> usize {
        (1..=k).product()
    }

    #[test]
    fn test_permutation_counts() {
        for k in 0..=6 {
            let pool: Vec<i64> = (0..k as i64).collect();
            let perms = permutations(&pool);
            assert_eq!(perms.len(), factorial(k), "pool of size {k}");
            let unique: HashSet<&Vec<i64>> = perms.iter().collect();
            assert_eq!(unique.len(), perms.len(), "duplicates for pool of size {k}");
        }
    }

    #[test]
    fn test_first_permutation_is_pool() {
        let pool = [5, 6, 7, 8];
        assert_eq!(permutations(&pool)[0], pool.to_vec());
    }

    #[test]
    fn test_each_permutation_uses_the_whole_pool() {
        let pool = [3, -1, 7, 2];
        for p in permutations(&pool) {
            let mut sorted = p.clone();
            sorted.sort();
            assert_eq!(sorted, vec![-1, 2, 3, 7]);
        }
    }

    #[test]
    fn test_permutation_stops_on_error() {
        let mut visited = 0;
        let result = try_for_each_permutation(&[0, 1, 2, 3], |_| {
            visited += 1;
            if visited == 3 { Err("stop") } else { Ok(()) }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_explore_single_pass_examples() {
        let result = explorer(&DIGITS, 5, false).explore(&[0, 1, 2, 3, 4]).unwrap();
        assert_eq!(result.signal, 43210);
        assert_eq!(result.phases, vec![4, 3, 2, 1, 0]);
        assert_eq!(result.trials, 120);

        let result = explorer(&SUBTRACT, 5, false).explore(&[0, 1, 2, 3, 4]).unwrap();
        assert_eq!(result.signal, 54321);
        assert_eq!(result.phases, vec![0, 1, 2, 3, 4]);

        let result = explorer(&MIXED, 5, false).explore(&[0, 1, 2, 3, 4]).unwrap();
        assert_eq!(result.signal, 65210);
        assert_eq!(result.phases, vec![1, 0, 4, 3, 2]);
    }

    #[test]
    fn test_explore_feedback_examples() {
        let result = explorer(&FEEDBACK, 5, true).explore(&[5, 6, 7, 8, 9]).unwrap();
        assert_eq!(result.signal, 139629729);
        assert_eq!(result.phases, vec![9, 8, 7, 6, 5]);

        let result = explorer(&FEEDBACK_LONG, 5, true).explore(&[5, 6, 7, 8, 9]).unwrap();
        assert_eq!(result.signal, 18216);
        assert_eq!(result.phases, vec![9, 7, 8, 5, 6]);
    }

    #[test]
    fn test_explore_matches_brute_force() {
        let pool = [3, -1, 7, 2];
        let mut ring = Ring::build(&MIXED, 4, false).unwrap();
        let mut expected = i64::MIN;
        let mut evaluated = 0;
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    for d in 0..4 {
                        let idx = [a, b, c, d];
                        let distinct: HashSet<usize> = idx.iter().copied().collect();
                        if distinct.len() != 4 {
                            continue;
                        }
                        let phases: Vec<i64> = idx.iter().map(|&i| pool[i]).collect();
                        ring.reset();
                        expected = expected.max(ring.run_once(&phases).unwrap());
                        evaluated += 1;
                    }
                }
            }
        }
        assert_eq!(evaluated, 24);

        let result = explorer(&MIXED, 4, false).explore(&pool).unwrap();
        assert_eq!(result.signal, expected);
        assert_eq!(result.trials, 24);

        // The reported ordering reproduces the reported signal.
        ring.reset();
        assert_eq!(ring.run_once(&result.phases).unwrap(), expected);
    }

    #[test]
    fn test_ties_keep_first_found() {
        let result = explorer(&INCREMENT, 4, false).explore(&[9, 2, 5, 1]).unwrap();
        assert_eq!(result.signal, 4);
        assert_eq!(result.phases, vec![9, 2, 5, 1]);
        assert_eq!(result.trials, 24);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        for (program, feedback, pool) in [
            (&DIGITS[..], false, [0, 1, 2, 3, 4]),
            (&MIXED[..], false, [0, 1, 2, 3, 4]),
            (&INCREMENT[..], false, [4, 0, 3, 1, 2]),
            (&FEEDBACK[..], true, [5, 6, 7, 8, 9]),
            (&FEEDBACK_LONG[..], true, [5, 6, 7, 8, 9]),
        ] {
            let mut ex = explorer(program, 5, feedback);
            let sequential = ex.explore(&pool).unwrap();
            let parallel = ex.par_explore(&pool).unwrap();
            assert_eq!(sequential, parallel);
        }
    }

    #[test]
    fn test_empty_pool() {
        let mut ex = explorer(&DIGITS, 5, false);
        assert_eq!(ex.explore(&[]), Err(RingError::EmptyPool));
        assert_eq!(ex.par_explore(&[]), Err(RingError::EmptyPool));
    }

    #[test]
    fn test_pool_size_must_match_ring() {
        let mut ex = explorer(&DIGITS, 5, false);
        assert_eq!(
            ex.explore(&[0, 1, 2]),
            Err(RingError::PhaseCount { expected: 5, got: 3 })
        );
    }

    #[test]
    fn test_machine_error_aborts_exploration() {
        // Reads three inputs; the third wraps back to the phase, then the
        // program jumps to address 50.
        let program = [3, 9, 3, 9, 3, 9, 1105, 1, 50, 0];
        let mut ex = explorer(&program, 2, false);
        assert!(matches!(
            ex.explore(&[0, 1]),
            Err(RingError::Machine {
                index: 0,
                source: MachineError::OutOfBounds { address: 50, len: 10 }
            })
        ));
    }
}
