pub mod error;
pub mod program;
pub mod opcode;
pub mod machine;
pub mod ring;
pub mod explore;
pub mod search;
