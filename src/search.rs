use std::ops::Range;

use tracing::{debug, info};

use crate::error::MachineError;
use crate::machine::Machine;

/// Values tried for both the noun (address 1) and the verb (address 2).
pub const NOUN_VERB_RANGE: Range<i64> = 0..100;

/// Find the first noun/verb pair that leaves `target` at address 0.
///
/// Each pair is written into addresses 1 and 2 of a copy of `template`, which
/// then runs to halt without inputs. Pairs are tried noun-major over
/// [`NOUN_VERB_RANGE`], reloading a single machine for every attempt.
/// Returns `Ok(None)` when no pair matches; any machine error aborts the
/// search.
pub fn search_noun_verb(
    template: &[i64],
    target: i64,
    step_limit: Option<u64>,
) -> Result<Option<(i64, i64)>, MachineError> {
    let len = template.len();
    if len < 3 {
        return Err(MachineError::OutOfBounds {
            address: len.max(1) as i64,
            len,
        });
    }

    let mut patched = template.to_vec();
    let mut machine = Machine::new(template, false)
        .with_name("noun-verb")
        .with_step_limit(step_limit);
    let mut tried = 0u32;
    for noun in NOUN_VERB_RANGE {
        for verb in NOUN_VERB_RANGE {
            patched[1] = noun;
            patched[2] = verb;
            machine.load(&patched);
            machine.run()?;
            tried += 1;
            if machine.read(0) == Some(target) {
                info!(noun, verb, tried, "noun/verb found");
                return Ok(Some((noun, verb)));
            }
        }
    }
    debug!(target, tried, "no noun/verb pair matches");
    Ok(None)
}
