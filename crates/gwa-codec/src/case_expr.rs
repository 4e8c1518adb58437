//! Case/combination description mini-language.
//!
//! `2A1 A2to A4 -(A5 A6)` expands to
//! `[(A1, 2), (A2, 1), (A3, 1), (A4, 1), (A5, -1), (A6, -1)]`.
//!
//! Grammar, whitespace-insensitive:
//! - a case token is an upper-case letter followed by digits (`A1`, `C3`)
//! - a number immediately before a token or group is its multiplier
//! - `-` negates the next token or group (repeated signs toggle)
//! - `(...)` applies its own multiplier and sign to every token inside,
//!   nesting multiplies through
//! - `A1toA5` adds `A2`..`A5` with the factor of the preceding token

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseFactor {
    pub case: String,
    pub factor: f64,
}

impl CaseFactor {
    pub fn new(case: impl Into<String>, factor: f64) -> Self {
        Self {
            case: case.into(),
            factor,
        }
    }

    /// Leading letter of the case id, e.g. `A` for `A12`.
    pub fn letter(&self) -> char {
        self.case.chars().next().unwrap_or_default()
    }

    pub fn number(&self) -> Option<u32> {
        self.case.get(1..).and_then(|n| n.parse().ok())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaseExprError {
    #[error("position {position}: invalid multiplier `{text}`")]
    InvalidMultiplier { position: usize, text: String },

    #[error("position {position}: case letter `{letter}` has no number")]
    MissingCaseNumber { position: usize, letter: char },

    #[error("position {position}: range has no preceding case")]
    RangeWithoutStart { position: usize },

    #[error("position {position}: range end `{text}` is not a case of letter {letter}")]
    InvalidRangeEnd {
        position: usize,
        letter: char,
        text: String,
    },

    #[error("position {position}: unmatched parenthesis")]
    UnbalancedParenthesis { position: usize },

    #[error("position {position}: unexpected character `{found}`")]
    UnexpectedCharacter { position: usize, found: char },
}

pub fn expand_case_expression(expression: &str) -> Result<Vec<CaseFactor>, CaseExprError> {
    let chars: Vec<char> = expression.chars().filter(|c| !c.is_whitespace()).collect();
    let mut parser = Parser { chars, pos: 0 };
    let cases = parser.group(1.0, 0)?;
    if parser.pos < parser.chars.len() {
        return Err(CaseExprError::UnbalancedParenthesis {
            position: parser.pos,
        });
    }
    Ok(cases)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn group(&mut self, outer: f64, depth: usize) -> Result<Vec<CaseFactor>, CaseExprError> {
        let mut out: Vec<CaseFactor> = Vec::new();
        let mut multiplier: Option<f64> = None;
        let mut negative = false;

        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' | '.' => multiplier = Some(self.number()?),
                '-' => {
                    negative = !negative;
                    self.pos += 1;
                }
                '+' => self.pos += 1,
                't' | 'T' if self.at_range_keyword() => {
                    self.pos += 2;
                    self.range(&mut out)?;
                }
                'A'..='Z' => {
                    let case = self.case_token()?;
                    let factor = applied(multiplier.take(), negative, outer);
                    negative = false;
                    out.push(CaseFactor::new(case, factor));
                }
                '(' => {
                    self.pos += 1;
                    let factor = applied(multiplier.take(), negative, outer);
                    negative = false;
                    out.extend(self.group(factor, depth + 1)?);
                }
                ')' => {
                    if depth == 0 {
                        return Err(CaseExprError::UnbalancedParenthesis { position: self.pos });
                    }
                    self.pos += 1;
                    return Ok(out);
                }
                other => {
                    return Err(CaseExprError::UnexpectedCharacter {
                        position: self.pos,
                        found: other,
                    });
                }
            }
        }

        if depth > 0 {
            return Err(CaseExprError::UnbalancedParenthesis { position: self.pos });
        }
        Ok(out)
    }

    fn at_range_keyword(&self) -> bool {
        matches!(self.chars.get(self.pos + 1), Some('o') | Some('O'))
    }

    fn number(&mut self) -> Result<f64, CaseExprError> {
        let start = self.pos;
        while matches!(self.peek(), Some('0'..='9') | Some('.')) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map_err(|_| CaseExprError::InvalidMultiplier {
                position: start,
                text,
            })
    }

    fn case_token(&mut self) -> Result<String, CaseExprError> {
        let start = self.pos;
        let letter = self.chars[start];
        self.pos += 1;
        while matches!(self.peek(), Some('0'..='9')) {
            self.pos += 1;
        }
        if self.pos == start + 1 {
            return Err(CaseExprError::MissingCaseNumber {
                position: start,
                letter,
            });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn range(&mut self, out: &mut Vec<CaseFactor>) -> Result<(), CaseExprError> {
        let position = self.pos;
        let last = out
            .last()
            .cloned()
            .ok_or(CaseExprError::RangeWithoutStart { position })?;
        let letter = last.letter();
        let start = last
            .number()
            .ok_or(CaseExprError::RangeWithoutStart { position })?;

        let end_text = match self.peek() {
            Some(c) if c.is_ascii_uppercase() => self.case_token()?,
            _ => {
                return Err(CaseExprError::InvalidRangeEnd {
                    position,
                    letter,
                    text: String::new(),
                });
            }
        };
        let end = CaseFactor::new(end_text.clone(), last.factor);
        if end.letter() != letter {
            return Err(CaseExprError::InvalidRangeEnd {
                position,
                letter,
                text: end_text,
            });
        }
        let end = end.number().unwrap_or(start);
        for n in start + 1..=end {
            out.push(CaseFactor::new(format!("{letter}{n}"), last.factor));
        }
        Ok(())
    }
}

// A missing or zero multiplier counts as 1.
fn applied(multiplier: Option<f64>, negative: bool, outer: f64) -> f64 {
    let base = match multiplier {
        Some(m) if m != 0.0 => m,
        _ => 1.0,
    };
    let factor = base * outer;
    if negative { -factor } else { factor }
}
