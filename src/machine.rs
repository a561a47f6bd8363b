use tracing::trace;

use crate::error::MachineError;
use crate::opcode::{self, Instruction, Mode, Opcode};

/// Where a call to [`Machine::run`] or [`Machine::resume`] left the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Stopped right after an output instruction; continue with `resume`.
    Paused,
    /// Executed opcode 99. Terminal.
    Halted,
}

/// Outcome of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Output(i64),
    /// Nothing executed: the machine is waiting for `resume`.
    Paused,
    Halt,
}

/// One resumable machine executing one program.
///
/// State:
/// - `memory`: private copy of the program, fixed length
/// - `ip`: instruction pointer, starts at 0
/// - `inputs` / `cursor`: input queue, replayed from the front once exhausted
/// - `output`: the most recent value written by an output instruction
/// - `paused` / `halted`: run status
///
/// The instruction pointer and the two flags are all the state needed to
/// continue a paused machine; `run` is a plain loop over `step`.
#[derive(Debug, Clone)]
pub struct Machine {
    name: String,
    memory: Vec<i64>,
    ip: usize,
    inputs: Vec<i64>,
    cursor: usize,
    output: i64,
    paused: bool,
    halted: bool,
    pause_on_output: bool,
    steps: u64,
    step_limit: Option<u64>,
}

impl Machine {
    /// Create a machine over a copy of `program`.
    pub fn new(program: &[i64], pause_on_output: bool) -> Self {
        Self {
            name: "machine".to_string(),
            memory: program.to_vec(),
            ip: 0,
            inputs: Vec::new(),
            cursor: 0,
            output: 0,
            paused: false,
            halted: false,
            pause_on_output,
            steps: 0,
            step_limit: None,
        }
    }

    /// Name used in log records.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Abort with [`MachineError::StepLimit`] once this many instructions have
    /// executed since the last `load`. `None` means no limit.
    pub fn with_step_limit(mut self, limit: Option<u64>) -> Self {
        self.step_limit = limit;
        self
    }

    /// Replace memory with a copy of `program` and rewind.
    ///
    /// Clears the instruction pointer, both flags, the output register and the
    /// step counter. The input queue is left alone.
    pub fn load(&mut self, program: &[i64]) {
        self.memory.clear();
        self.memory.extend_from_slice(program);
        self.ip = 0;
        self.output = 0;
        self.paused = false;
        self.halted = false;
        self.steps = 0;
    }

    /// Replace the input queue and move the read cursor to its front.
    pub fn set_inputs(&mut self, values: &[i64]) {
        self.inputs.clear();
        self.inputs.extend_from_slice(values);
        self.cursor = 0;
    }

    /// Execute from the current instruction pointer until the machine halts
    /// or, with pause-on-output enabled, until the next output.
    ///
    /// A paused machine stays paused: only [`Machine::resume`] continues it.
    /// A halted machine is never restarted.
    pub fn run(&mut self) -> Result<Status, MachineError> {
        if self.halted {
            return Ok(Status::Halted);
        }
        while !self.paused {
            match self.step()? {
                Step::Continue | Step::Paused => {}
                Step::Output(value) => {
                    if self.pause_on_output {
                        self.paused = true;
                        trace!(machine = %self.name, value, "paused");
                    }
                }
                Step::Halt => return Ok(Status::Halted),
            }
        }
        Ok(Status::Paused)
    }

    /// Clear the paused flag and continue from the saved instruction pointer.
    pub fn resume(&mut self) -> Result<Status, MachineError> {
        if self.halted {
            return Ok(Status::Halted);
        }
        if self.paused {
            self.paused = false;
            trace!(machine = %self.name, ip = self.ip, "resumed");
        }
        self.run()
    }

    /// Execute exactly one instruction.
    ///
    /// A halted machine reports [`Step::Halt`] and a paused one [`Step::Paused`]
    /// without executing anything.
    pub fn step(&mut self) -> Result<Step, MachineError> {
        if self.halted {
            return Ok(Step::Halt);
        }
        if self.paused {
            return Ok(Step::Paused);
        }
        if let Some(limit) = self.step_limit {
            if self.steps >= limit {
                return Err(MachineError::StepLimit { limit });
            }
        }

        let word = self.read_cell(self.ip as i64)?;
        let instr = opcode::decode(word).map_err(|source| MachineError::Decode {
            ip: self.ip,
            source,
        })?;
        self.steps += 1;
        let next = self.ip + instr.width();

        match instr.opcode {
            Opcode::Add => {
                let value = self.param(&instr, 0)?.wrapping_add(self.param(&instr, 1)?);
                self.store(&instr, value)?;
            }
            Opcode::Multiply => {
                let value = self.param(&instr, 0)?.wrapping_mul(self.param(&instr, 1)?);
                self.store(&instr, value)?;
            }
            Opcode::Input => {
                let value = self.next_input()?;
                self.store(&instr, value)?;
            }
            Opcode::Output => {
                let value = self.param(&instr, 0)?;
                self.output = value;
                self.ip = next;
                return Ok(Step::Output(value));
            }
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => {
                let cond = self.param(&instr, 0)? != 0;
                if cond == (instr.opcode == Opcode::JumpIfTrue) {
                    let target = self.param(&instr, 1)?;
                    self.ip = usize::try_from(target).map_err(|_| MachineError::OutOfBounds {
                        address: target,
                        len: self.memory.len(),
                    })?;
                    return Ok(Step::Continue);
                }
            }
            Opcode::LessThan => {
                let value = (self.param(&instr, 0)? < self.param(&instr, 1)?) as i64;
                self.store(&instr, value)?;
            }
            Opcode::Equals => {
                let value = (self.param(&instr, 0)? == self.param(&instr, 1)?) as i64;
                self.store(&instr, value)?;
            }
            Opcode::Halt => {
                self.halted = true;
                trace!(machine = %self.name, output = self.output, "halted");
                return Ok(Step::Halt);
            }
        }

        self.ip = next;
        Ok(Step::Continue)
    }

    /// The most recent output value (0 before any output).
    pub fn output(&self) -> i64 {
        self.output
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Instructions executed since the last `load`.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn memory(&self) -> &[i64] {
        &self.memory
    }

    /// The value at `address`, or `None` past the end of memory.
    pub fn read(&self, address: usize) -> Option<i64> {
        self.memory.get(address).copied()
    }

    fn read_cell(&self, address: i64) -> Result<i64, MachineError> {
        usize::try_from(address)
            .ok()
            .and_then(|a| self.memory.get(a))
            .copied()
            .ok_or(MachineError::OutOfBounds {
                address,
                len: self.memory.len(),
            })
    }

    fn write_cell(&mut self, address: i64, value: i64) -> Result<(), MachineError> {
        let len = self.memory.len();
        let cell = usize::try_from(address)
            .ok()
            .and_then(|a| self.memory.get_mut(a))
            .ok_or(MachineError::OutOfBounds { address, len })?;
        *cell = value;
        Ok(())
    }

    /// Value of parameter `index`, honouring its mode.
    fn param(&self, instr: &Instruction, index: usize) -> Result<i64, MachineError> {
        let raw = self.read_cell((self.ip + 1 + index) as i64)?;
        match instr.mode(index) {
            Mode::Immediate => Ok(raw),
            Mode::Position => self.read_cell(raw),
        }
    }

    /// Write `value` to the address held by the instruction's last parameter.
    /// The mode digit of that parameter is not consulted.
    fn store(&mut self, instr: &Instruction, value: i64) -> Result<(), MachineError> {
        let slot = self.ip + instr.opcode.param_count();
        let address = self.read_cell(slot as i64)?;
        self.write_cell(address, value)
    }

    fn next_input(&mut self) -> Result<i64, MachineError> {
        if self.inputs.is_empty() {
            return Err(MachineError::EmptyInput { ip: self.ip });
        }
        let value = self.inputs[self.cursor];
        self.cursor = (self.cursor + 1) % self.inputs.len();
        Ok(value)
    }
}
