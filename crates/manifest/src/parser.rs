use std::{iter::Peekable, str::Chars, vec};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Instruction, ManifestExpression, ManifestValue, TransactionManifest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, line: usize },
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },
    #[error("line {line}: unexpected {found}")]
    UnexpectedToken { found: String, line: usize },
    #[error("unexpected end of manifest")]
    UnexpectedEnd,
    #[error("line {line}: unknown instruction {name}")]
    UnknownInstruction { name: String, line: usize },
    #[error("line {line}: unknown value kind {name}")]
    UnknownValueKind { name: String, line: usize },
    #[error("line {line}: invalid number literal {text}")]
    InvalidNumber { text: String, line: usize },
    #[error("line {line}: invalid decimal {text}")]
    InvalidDecimal { text: String, line: usize },
    #[error("line {line}: unknown expression {name}")]
    UnknownExpression { name: String, line: usize },
    #[error("line {line}: {instruction}: {reason}")]
    InvalidOperands {
        instruction: &'static str,
        reason: &'static str,
        line: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(String),
    LParen,
    RParen,
    Semicolon,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier {name}"),
            Token::Str(text) => format!("string \"{text}\""),
            Token::Number(text) => format!("number {text}"),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Semicolon => "';'".to_string(),
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(&ch) = self.chars.peek() {
            match ch {
                '\n' => {
                    self.line += 1;
                    self.chars.next();
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '#' => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                '(' => {
                    self.chars.next();
                    tokens.push((Token::LParen, self.line));
                }
                ')' => {
                    self.chars.next();
                    tokens.push((Token::RParen, self.line));
                }
                ';' => {
                    self.chars.next();
                    tokens.push((Token::Semicolon, self.line));
                }
                '"' => {
                    let line = self.line;
                    let text = self.string_literal()?;
                    tokens.push((Token::Str(text), line));
                }
                c if c.is_ascii_digit() || c == '-' => {
                    let text = self.take_while(|c| c.is_ascii_alphanumeric() || c == '-');
                    tokens.push((Token::Number(text), self.line));
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let text = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                    tokens.push((Token::Ident(text), self.line));
                }
                other => {
                    return Err(ParseError::UnexpectedChar {
                        ch: other,
                        line: self.line,
                    })
                }
            }
        }
        Ok(tokens)
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if !keep(c) {
                break;
            }
            out.push(c);
            self.chars.next();
        }
        out
    }

    fn string_literal(&mut self) -> Result<String, ParseError> {
        let line = self.line;
        self.chars.next();
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None | Some('\n') => return Err(ParseError::UnterminatedString { line }),
                Some('"') => return Ok(out),
                Some('\\') => match self.chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('"' | '\\')) => out.push(c),
                    Some(other) => {
                        return Err(ParseError::UnexpectedChar { ch: other, line });
                    }
                    None => return Err(ParseError::UnterminatedString { line }),
                },
                Some(c) => out.push(c),
            }
        }
    }
}

/// Parses manifest text into a [`TransactionManifest`].
///
/// Accepts the canonical rendering plus arbitrary whitespace and `#` line
/// comments.
pub fn parse_manifest(source: &str) -> Result<TransactionManifest, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut cursor = tokens.into_iter();
    let mut instructions = Vec::new();

    while let Some((token, line)) = cursor.next() {
        let keyword = match token {
            Token::Ident(keyword) => keyword,
            other => {
                return Err(ParseError::UnexpectedToken {
                    found: other.describe(),
                    line,
                })
            }
        };

        let mut operands = Vec::new();
        loop {
            match cursor.next() {
                Some((Token::Semicolon, _)) => break,
                Some((token, line)) => operands.push(parse_value(token, line, &mut cursor)?),
                None => return Err(ParseError::UnexpectedEnd),
            }
        }

        instructions.push(assemble(&keyword, operands, line)?);
    }

    Ok(TransactionManifest::new(instructions))
}

fn parse_value(
    token: Token,
    line: usize,
    cursor: &mut vec::IntoIter<(Token, usize)>,
) -> Result<ManifestValue, ParseError> {
    match token {
        Token::Str(text) => Ok(ManifestValue::String(text)),
        Token::Number(text) => parse_number(&text, line),
        Token::Ident(name) if name == "true" => Ok(ManifestValue::Bool(true)),
        Token::Ident(name) if name == "false" => Ok(ManifestValue::Bool(false)),
        Token::Ident(name) => {
            expect(cursor, Token::LParen)?;
            let inner = match cursor.next() {
                Some((Token::Str(text), _)) => text,
                Some((other, line)) => {
                    return Err(ParseError::UnexpectedToken {
                        found: other.describe(),
                        line,
                    })
                }
                None => return Err(ParseError::UnexpectedEnd),
            };
            expect(cursor, Token::RParen)?;
            match name.as_str() {
                "Address" => Ok(ManifestValue::Address(inner)),
                "Bucket" => Ok(ManifestValue::Bucket(inner)),
                "Proof" => Ok(ManifestValue::Proof(inner)),
                "Decimal" => inner
                    .parse::<Decimal>()
                    .map(ManifestValue::Decimal)
                    .map_err(|_| ParseError::InvalidDecimal { text: inner, line }),
                "Expression" => ManifestExpression::from_name(&inner)
                    .map(ManifestValue::Expression)
                    .ok_or(ParseError::UnknownExpression { name: inner, line }),
                _ => Err(ParseError::UnknownValueKind { name, line }),
            }
        }
        other => Err(ParseError::UnexpectedToken {
            found: other.describe(),
            line,
        }),
    }
}

fn expect(
    cursor: &mut vec::IntoIter<(Token, usize)>,
    wanted: Token,
) -> Result<(), ParseError> {
    match cursor.next() {
        Some((token, _)) if token == wanted => Ok(()),
        Some((token, line)) => Err(ParseError::UnexpectedToken {
            found: token.describe(),
            line,
        }),
        None => Err(ParseError::UnexpectedEnd),
    }
}

fn parse_number(text: &str, line: usize) -> Result<ManifestValue, ParseError> {
    let invalid = || ParseError::InvalidNumber {
        text: text.to_string(),
        line,
    };
    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(invalid)?;
    let (digits, suffix) = text.split_at(split);
    match suffix {
        "u8" => digits.parse().map(ManifestValue::U8).map_err(|_| invalid()),
        "u32" => digits.parse().map(ManifestValue::U32).map_err(|_| invalid()),
        "u64" => digits.parse().map(ManifestValue::U64).map_err(|_| invalid()),
        "i64" => digits.parse().map(ManifestValue::I64).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn assemble(
    keyword: &str,
    operands: Vec<ManifestValue>,
    line: usize,
) -> Result<Instruction, ParseError> {
    let mut operands = operands.into_iter();
    let instruction = match keyword {
        "CALL_FUNCTION" => {
            const NAME: &str = "CALL_FUNCTION";
            let package_address = take_address(&mut operands, NAME, line)?;
            let blueprint_name = take_string(&mut operands, NAME, line)?;
            let function_name = take_string(&mut operands, NAME, line)?;
            Instruction::CallFunction {
                package_address,
                blueprint_name,
                function_name,
                args: operands.by_ref().collect(),
            }
        }
        "CALL_METHOD" => {
            const NAME: &str = "CALL_METHOD";
            let address = take_address(&mut operands, NAME, line)?;
            let method_name = take_string(&mut operands, NAME, line)?;
            Instruction::CallMethod {
                address,
                method_name,
                args: operands.by_ref().collect(),
            }
        }
        "TAKE_ALL_FROM_WORKTOP" => {
            const NAME: &str = "TAKE_ALL_FROM_WORKTOP";
            Instruction::TakeAllFromWorktop {
                resource_address: take_address(&mut operands, NAME, line)?,
                bucket: take_bucket(&mut operands, NAME, line)?,
            }
        }
        "TAKE_FROM_WORKTOP" => {
            const NAME: &str = "TAKE_FROM_WORKTOP";
            Instruction::TakeFromWorktop {
                resource_address: take_address(&mut operands, NAME, line)?,
                amount: take_decimal(&mut operands, NAME, line)?,
                bucket: take_bucket(&mut operands, NAME, line)?,
            }
        }
        "RETURN_TO_WORKTOP" => Instruction::ReturnToWorktop {
            bucket: take_bucket(&mut operands, "RETURN_TO_WORKTOP", line)?,
        },
        "ASSERT_WORKTOP_CONTAINS" => {
            const NAME: &str = "ASSERT_WORKTOP_CONTAINS";
            Instruction::AssertWorktopContains {
                resource_address: take_address(&mut operands, NAME, line)?,
                amount: take_decimal(&mut operands, NAME, line)?,
            }
        }
        "CREATE_PROOF_FROM_AUTH_ZONE_OF_AMOUNT" => {
            const NAME: &str = "CREATE_PROOF_FROM_AUTH_ZONE_OF_AMOUNT";
            let resource_address = take_address(&mut operands, NAME, line)?;
            let amount = take_decimal(&mut operands, NAME, line)?;
            let proof = match operands.next() {
                Some(ManifestValue::Proof(name)) => name,
                _ => {
                    return Err(ParseError::InvalidOperands {
                        instruction: NAME,
                        reason: "expected Proof",
                        line,
                    })
                }
            };
            Instruction::CreateProofFromAuthZoneOfAmount {
                resource_address,
                amount,
                proof,
            }
        }
        "DROP_ALL_PROOFS" => Instruction::DropAllProofs,
        other => {
            return Err(ParseError::UnknownInstruction {
                name: other.to_string(),
                line,
            })
        }
    };

    if operands.next().is_some() {
        return Err(ParseError::InvalidOperands {
            instruction: instruction.keyword(),
            reason: "too many operands",
            line,
        });
    }
    Ok(instruction)
}

fn take_address(
    operands: &mut impl Iterator<Item = ManifestValue>,
    instruction: &'static str,
    line: usize,
) -> Result<String, ParseError> {
    match operands.next() {
        Some(ManifestValue::Address(address)) => Ok(address),
        _ => Err(ParseError::InvalidOperands {
            instruction,
            reason: "expected Address",
            line,
        }),
    }
}

fn take_string(
    operands: &mut impl Iterator<Item = ManifestValue>,
    instruction: &'static str,
    line: usize,
) -> Result<String, ParseError> {
    match operands.next() {
        Some(ManifestValue::String(text)) => Ok(text),
        _ => Err(ParseError::InvalidOperands {
            instruction,
            reason: "expected string",
            line,
        }),
    }
}

fn take_decimal(
    operands: &mut impl Iterator<Item = ManifestValue>,
    instruction: &'static str,
    line: usize,
) -> Result<Decimal, ParseError> {
    match operands.next() {
        Some(ManifestValue::Decimal(value)) => Ok(value),
        _ => Err(ParseError::InvalidOperands {
            instruction,
            reason: "expected Decimal",
            line,
        }),
    }
}

fn take_bucket(
    operands: &mut impl Iterator<Item = ManifestValue>,
    instruction: &'static str,
    line: usize,
) -> Result<String, ParseError> {
    match operands.next() {
        Some(ManifestValue::Bucket(name)) => Ok(name),
        _ => Err(ParseError::InvalidOperands {
            instruction,
            reason: "expected Bucket",
            line,
        }),
    }
}

#[cfg(test)]
#[path = "tests/parser_tests.rs"]
mod tests;
