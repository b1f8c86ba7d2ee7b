//! Splitting a raw input line into sibling instructions.

use crate::config::CONCURRENT_OPERATOR;
use crate::error::ParsingError;
use crate::parser::{Instruction, parse_instruction};

/// A line after splitting on the concurrency operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// No operator on the line. Only this shape may run a built-in.
    Single(Instruction),
    /// Two or more instructions to run side by side. Some may be empty.
    Concurrent(Vec<Instruction>),
}

impl ParsedLine {
    pub fn instructions(&self) -> &[Instruction] {
        match self {
            ParsedLine::Single(instruction) => std::slice::from_ref(instruction),
            ParsedLine::Concurrent(instructions) => instructions,
        }
    }
}

/// Parse every instruction on `line`.
///
/// The first instruction that fails to parse abandons the whole line; nothing
/// parsed before it is returned.
pub fn split_line(line: &str) -> Result<ParsedLine, ParsingError> {
    if !line.contains(CONCURRENT_OPERATOR) {
        return parse_instruction(line).map(ParsedLine::Single);
    }

    let mut instructions = Vec::new();
    let mut rest = line;
    while let Some((head, tail)) = rest.split_once(CONCURRENT_OPERATOR) {
        instructions.push(parse_instruction(head)?);
        rest = tail;
    }
    instructions.push(parse_instruction(rest)?);

    Ok(ParsedLine::Concurrent(instructions))
}
