//! Tokenization of one instruction into program arguments and an optional
//! output redirection.

use crate::config::REDIRECT_OPERATOR;
use crate::error::ParsingError;

/// One parsed, executable unit: program, arguments and where stdout goes.
///
/// An instruction with no words at all is valid and means "nothing to do".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Instruction {
    argv: Vec<String>,
    output: Option<String>,
}

impl Instruction {
    /// The program name followed by its arguments. Never contains the operator.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// First word of the instruction, if any.
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Words after the program name.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }

    /// File that receives standard output, when redirection was requested.
    pub fn output_target(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn redirects(&self) -> bool {
        self.output.is_some()
    }

    /// Blank or whitespace-only text produces an empty instruction.
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    RedirectRight,
}

struct InstructionBuilder<'a> {
    words: Vec<&'a str>,
    pos: usize,
    tokens: Vec<Token>,
    output: Option<String>,
}

impl<'a> InstructionBuilder<'a> {
    fn from(text: &'a str) -> Self {
        InstructionBuilder {
            words: text.split_whitespace().collect(),
            pos: 0,
            tokens: Vec::new(),
            output: None,
        }
    }

    fn build(mut self) -> Result<Instruction, ParsingError> {
        while let Some(word) = self.consume() {
            match word.find(REDIRECT_OPERATOR) {
                Some(at) => self.parse_redirect(word, at)?,
                None if self.output.is_some() => {
                    return Err(ParsingError::TokenAfterRedirectTarget);
                }
                None => self.tokens.push(Token::Word(word.to_string())),
            }
        }

        if let Some(target) = &self.output {
            if target.contains(REDIRECT_OPERATOR) {
                return Err(ParsingError::MalformedTarget(target.clone()));
            }
        }

        let argv = self
            .tokens
            .into_iter()
            .filter_map(|token| match token {
                Token::Word(word) => Some(word),
                Token::RedirectRight => None,
            })
            .collect();
        Ok(Instruction {
            argv,
            output: self.output,
        })
    }

    fn peek(&self) -> Option<&'a str> {
        self.words.get(self.pos).copied()
    }

    fn consume(&mut self) -> Option<&'a str> {
        let word = self.peek();
        if word.is_some() {
            self.pos += 1;
        }
        word
    }

    /// Handle a word containing the operator at byte offset `at`.
    ///
    /// `ls>out`, `ls> out`, `ls >out` and `ls > out` all land here.
    fn parse_redirect(&mut self, word: &'a str, at: usize) -> Result<(), ParsingError> {
        if self.tokens.contains(&Token::RedirectRight) {
            return Err(ParsingError::DuplicateRedirect);
        }

        let left = &word[..at];
        let right = &word[at + REDIRECT_OPERATOR.len_utf8()..];

        if !left.is_empty() {
            self.tokens.push(Token::Word(left.to_string()));
        }
        self.tokens.push(Token::RedirectRight);
        if self.tokens.first() == Some(&Token::RedirectRight) {
            return Err(ParsingError::StartsWithRedirect);
        }

        if !right.is_empty() {
            self.output = Some(right.to_string());
            return Ok(());
        }

        let target = self.consume().ok_or(ParsingError::MissingRedirectTarget)?;
        if target.len() == REDIRECT_OPERATOR.len_utf8() && target.starts_with(REDIRECT_OPERATOR) {
            return Err(ParsingError::ChainedRedirect);
        }
        self.output = Some(target.to_string());

        if self.peek().is_some() {
            return Err(ParsingError::MultipleRedirectTargets);
        }
        Ok(())
    }
}

/// Split the text of one instruction on whitespace into an [`Instruction`].
///
/// At most one output redirection is accepted. The operator may be glued to
/// the program words, to the target, to both, or stand alone.
pub fn parse_instruction(text: &str) -> Result<Instruction, ParsingError> {
    InstructionBuilder::from(text).build()
}
