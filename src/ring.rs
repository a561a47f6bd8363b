use tracing::debug;

use crate::error::RingError;
use crate::machine::Machine;

/// Configuration for a ring of machines.
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Number of machines in the ring.
    pub size: usize,
    /// Suspend each machine after every output instruction.
    pub pause_on_output: bool,
    /// Drive the ring with feedback sweeps rather than a single forward pass.
    pub feedback: bool,
    /// Signal fed to the first machine on the initial pass.
    pub seed_signal: i64,
    /// Per-machine instruction budget between reloads (`None` for unlimited).
    pub step_limit: Option<u64>,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            size: 5,
            pause_on_output: false,
            feedback: false,
            seed_signal: 0,
            step_limit: None,
        }
    }
}

impl RingConfig {
    /// Paused-on-output feedback ring of `size` machines.
    pub fn feedback(size: usize) -> Self {
        Self {
            size,
            pause_on_output: true,
            feedback: true,
            ..Default::default()
        }
    }
}

/// A fixed ring of machines sharing one program template.
///
/// Every machine owns its own copy of memory and its own input queue. The
/// only traffic between them is the output value the ring copies from each
/// machine into its successor's input queue.
#[derive(Debug, Clone)]
pub struct Ring {
    template: Vec<i64>,
    machines: Vec<Machine>,
    seed_signal: i64,
}

impl Ring {
    /// Build `size` machines over independent copies of `template`.
    pub fn build(template: &[i64], size: usize, pause_on_output: bool) -> Result<Self, RingError> {
        Self::from_config(
            template,
            &RingConfig {
                size,
                pause_on_output,
                ..Default::default()
            },
        )
    }

    pub fn from_config(template: &[i64], config: &RingConfig) -> Result<Self, RingError> {
        if config.size == 0 {
            return Err(RingError::EmptyRing);
        }
        let machines = (0..config.size)
            .map(|i| {
                Machine::new(template, config.pause_on_output)
                    .with_name(format!("amp-{i}"))
                    .with_step_limit(config.step_limit)
            })
            .collect();
        Ok(Self {
            template: template.to_vec(),
            machines,
            seed_signal: config.seed_signal,
        })
    }

    /// Reload every machine from the template, clearing all flags.
    pub fn reset(&mut self) {
        for machine in &mut self.machines {
            machine.load(&self.template);
        }
    }

    /// Single forward pass: machine `i` receives `[phases[i], signal]` where
    /// `signal` is the previous machine's output (the seed signal for the
    /// first one), and runs until it halts or pauses.
    ///
    /// Returns the last machine's output.
    pub fn run_once(&mut self, phases: &[i64]) -> Result<i64, RingError> {
        self.check_phases(phases)?;
        let mut signal = self.seed_signal;
        for (index, (machine, &phase)) in self.machines.iter_mut().zip(phases).enumerate() {
            machine.set_inputs(&[phase, signal]);
            machine
                .run()
                .map_err(|source| RingError::Machine { index, source })?;
            signal = machine.output();
        }
        Ok(signal)
    }

    /// Seed the ring as [`Ring::run_once`] does, then sweep it in order until
    /// every machine has halted. On each sweep a machine that has not halted
    /// receives its predecessor's latest output as its only input and is
    /// resumed until its next output or halt.
    ///
    /// Returns the last machine's final output.
    pub fn run_with_feedback(&mut self, phases: &[i64]) -> Result<i64, RingError> {
        self.run_once(phases)?;
        let n = self.machines.len();
        let mut sweep = 0u64;
        while !self.all_halted() {
            sweep += 1;
            for index in 0..n {
                let signal = self.machines[(index + n - 1) % n].output();
                let machine = &mut self.machines[index];
                if machine.is_halted() {
                    continue;
                }
                machine.set_inputs(&[signal]);
                machine
                    .resume()
                    .map_err(|source| RingError::Machine { index, source })?;
            }
            debug!(sweep, signal = self.machines[n - 1].output(), "sweep complete");
        }
        Ok(self.machines[n - 1].output())
    }

    pub fn all_halted(&self) -> bool {
        self.machines.iter().all(Machine::is_halted)
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn template(&self) -> &[i64] {
        &self.template
    }

    fn check_phases(&self, phases: &[i64]) -> Result<(), RingError> {
        if phases.len() != self.machines.len() {
            return Err(RingError::PhaseCount {
                expected: self.machines.len(),
                got: phases.len(),
            });
        }
        Ok(())
    }
}
