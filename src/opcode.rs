use crate::error::DecodeError;

/// The closed set of operations.
///
/// An instruction word encodes the opcode in its two lowest decimal digits
/// and one parameter mode per parameter in the digits above, the hundreds
/// digit belonging to the first parameter. `1002` is therefore a multiply
/// whose first parameter is positional, second immediate, third positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Multiply,
    Input,
    Output,
    JumpIfTrue,
    JumpIfFalse,
    LessThan,
    Equals,
    Halt,
}

impl Opcode {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => Opcode::Add,
            2 => Opcode::Multiply,
            3 => Opcode::Input,
            4 => Opcode::Output,
            5 => Opcode::JumpIfTrue,
            6 => Opcode::JumpIfFalse,
            7 => Opcode::LessThan,
            8 => Opcode::Equals,
            99 => Opcode::Halt,
            _ => return None,
        })
    }

    /// Number of parameters following the instruction word.
    pub fn param_count(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output => 1,
            Opcode::Halt => 0,
        }
    }

    /// True if the last parameter is a destination address.
    pub fn writes(self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Multiply | Opcode::Input | Opcode::LessThan | Opcode::Equals
        )
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Multiply => "MUL",
            Opcode::Input => "IN",
            Opcode::Output => "OUT",
            Opcode::JumpIfTrue => "JNZ",
            Opcode::JumpIfFalse => "JZ",
            Opcode::LessThan => "LT",
            Opcode::Equals => "EQ",
            Opcode::Halt => "HALT",
        }
    }
}

/// Parameter addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The parameter is an address; its value is `mem[param]`.
    Position,
    /// The parameter is the value itself.
    Immediate,
}

/// A decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    modes: [Mode; 3],
}

impl Instruction {
    /// Mode of the parameter at `index` (0-based).
    pub fn mode(&self, index: usize) -> Mode {
        self.modes[index]
    }

    /// Width of the instruction in memory cells, including the word itself.
    pub fn width(&self) -> usize {
        1 + self.opcode.param_count()
    }
}

/// Decode an instruction word into its opcode and parameter modes.
///
/// Missing mode digits are positional. Digits above the last parameter's
/// mode are ignored.
pub fn decode(word: i64) -> Result<Instruction, DecodeError> {
    let code = word % 100;
    let opcode = Opcode::from_code(code).ok_or(DecodeError::UnknownOpcode(code))?;

    let mut modes = [Mode::Position; 3];
    let mut digits = word / 100;
    for mode in modes.iter_mut().take(opcode.param_count()) {
        *mode = match digits % 10 {
            0 => Mode::Position,
            1 => Mode::Immediate,
            other => return Err(DecodeError::InvalidMode { word, mode: other }),
        };
        digits /= 10;
    }

    Ok(Instruction { opcode, modes })
}

/// Linear-sweep disassembly of a memory image.
///
/// Words that do not decode, or whose parameters would run past the end of
/// memory, are printed as data.
pub fn disassemble(memory: &[i64]) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    let mut addr = 0;
    while addr < memory.len() {
        let word = memory[addr];
        let instr = match decode(word) {
            Ok(instr) if addr + instr.width() <= memory.len() => instr,
            _ => {
                let _ = writeln!(out, "{addr:04}: {word:<24} .data {word}");
                addr += 1;
                continue;
            }
        };

        let raw = &memory[addr..addr + instr.width()];
        let raw_text = raw
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let count = instr.opcode.param_count();
        let params = raw[1..]
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let is_dest = instr.opcode.writes() && i == count - 1;
                match instr.mode(i) {
                    Mode::Immediate if !is_dest => format!("#{p}"),
                    _ => format!("[{p}]"),
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let line = format!("{addr:04}: {raw_text:<24} {} {params}", instr.opcode.mnemonic());
        let _ = writeln!(out, "{}", line.trim_end());
        addr += instr.width();
    }
    out
}
