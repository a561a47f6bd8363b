use std::num::ParseIntError;

use thiserror::Error;

/// Program text that could not be turned into memory.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("program text is empty")]
    Empty,
    #[error("token {index} ({token:?}) is not an integer: {source}")]
    InvalidToken {
        index: usize,
        token: String,
        #[source]
        source: ParseIntError,
    },
}

/// An instruction word that does not decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(i64),
    #[error("invalid parameter mode {mode} in instruction {word}")]
    InvalidMode { word: i64, mode: i64 },
}

/// Fatal errors for a single machine. There is no recovery path: the run
/// that produced one is aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("address {address} out of bounds (memory size {len})")]
    OutOfBounds { address: i64, len: usize },
    #[error("at ip {ip}: {source}")]
    Decode {
        ip: usize,
        #[source]
        source: DecodeError,
    },
    #[error("input instruction at ip {ip} with an empty input queue")]
    EmptyInput { ip: usize },
    #[error("step limit of {limit} exceeded")]
    StepLimit { limit: u64 },
}

/// Errors from driving a ring of machines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingError {
    #[error("ring must contain at least one machine")]
    EmptyRing,
    #[error("phase setting pool is empty")]
    EmptyPool,
    #[error("expected {expected} phase settings, got {got}")]
    PhaseCount { expected: usize, got: usize },
    #[error("machine {index}: {source}")]
    Machine {
        index: usize,
        #[source]
        source: MachineError,
    },
}
