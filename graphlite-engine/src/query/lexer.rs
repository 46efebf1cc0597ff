// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lexer for the Cypher-style query language
//!
//! Every sub-lexer must either consume input or return an error. The main
//! loop in [`tokenize`] relies on that to make progress, and additionally
//! rejects a token that leaves the input unchanged.
//!
//! Ordering inside [`token`] matters:
//! 1. Whitespace and comments are skipped first
//! 2. Float literals come before integers so `1.5` is not split at the dot
//! 3. Multi-character operators come before their single-character prefixes
//! 4. Words are lexed once and then classified as keyword or identifier

use super::ParseError;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, digit1, satisfy},
    combinator::{map, map_res, recognize},
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use std::fmt;

/// Token types for the query language
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Match,
    Where,
    Return,
    Create,
    Delete,
    Detach,
    Set,
    Remove,
    As,
    And,
    Or,
    Xor,
    Not,
    Is,
    In,
    Null,
    True,
    False,
    Distinct,
    Order,
    By,
    Asc,
    Desc,
    Skip,
    Limit,

    // Literals and names
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(String),

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,

    // Operators
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Plus,
    Dash,
    Star,
    Slash,
    Percent,
    Arrow,
    ArrowLeft,

    // Skipped by the tokenizer
    Whitespace,
    Comment,

    EOF,
}

impl Token {
    /// Source text of a keyword token, used when a keyword appears where a
    /// name (label, property key) is expected
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            Token::Match => "match",
            Token::Where => "where",
            Token::Return => "return",
            Token::Create => "create",
            Token::Delete => "delete",
            Token::Detach => "detach",
            Token::Set => "set",
            Token::Remove => "remove",
            Token::As => "as",
            Token::And => "and",
            Token::Or => "or",
            Token::Xor => "xor",
            Token::Not => "not",
            Token::Is => "is",
            Token::In => "in",
            Token::Null => "null",
            Token::True => "true",
            Token::False => "false",
            Token::Distinct => "distinct",
            Token::Order => "order",
            Token::By => "by",
            Token::Asc => "asc",
            Token::Desc => "desc",
            Token::Skip => "skip",
            Token::Limit => "limit",
            _ => return None,
        };
        Some(text)
    }

    fn from_word(word: &str) -> Token {
        match word.to_ascii_uppercase().as_str() {
            "MATCH" => Token::Match,
            "WHERE" => Token::Where,
            "RETURN" => Token::Return,
            "CREATE" => Token::Create,
            "DELETE" => Token::Delete,
            "DETACH" => Token::Detach,
            "SET" => Token::Set,
            "REMOVE" => Token::Remove,
            "AS" => Token::As,
            "AND" => Token::And,
            "OR" => Token::Or,
            "XOR" => Token::Xor,
            "NOT" => Token::Not,
            "IS" => Token::Is,
            "IN" => Token::In,
            "NULL" => Token::Null,
            "TRUE" => Token::True,
            "FALSE" => Token::False,
            "DISTINCT" => Token::Distinct,
            "ORDER" => Token::Order,
            "BY" => Token::By,
            "ASC" | "ASCENDING" => Token::Asc,
            "DESC" | "DESCENDING" => Token::Desc,
            "SKIP" => Token::Skip,
            "LIMIT" => Token::Limit,
            _ => Token::Identifier(word.to_string()),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.keyword_text() {
            return write!(f, "{}", text.to_ascii_uppercase());
        }
        match self {
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Integer(i) => write!(f, "{}", i),
            Token::Float(x) => write!(f, "{}", x),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Dot => write!(f, "."),
            Token::Semicolon => write!(f, ";"),
            Token::Equal => write!(f, "="),
            Token::NotEqual => write!(f, "<>"),
            Token::LessThan => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::GreaterThan => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Dash => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Arrow => write!(f, "->"),
            Token::ArrowLeft => write!(f, "<-"),
            Token::Whitespace => write!(f, " "),
            Token::Comment => write!(f, "comment"),
            Token::EOF => write!(f, "end of input"),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Lex a single token
fn token(input: &str) -> IResult<&str, Token> {
    alt((
        whitespace,
        map(comment, |_| Token::Comment),
        map(float_literal, Token::Float),
        map(integer_literal, Token::Integer),
        map(string_literal, Token::String),
        map(backtick_identifier, |s| Token::Identifier(s.to_string())),
        operator,
        map(word, Token::from_word),
    ))(input)
}

fn whitespace(input: &str) -> IResult<&str, Token> {
    map(take_while1(|c: char| c.is_whitespace()), |_| {
        Token::Whitespace
    })(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(tag("//"), take_while(|c| c != '\n'))),
        recognize(tuple((tag("/*"), take_until("*/"), tag("*/")))),
    ))(input)
}

fn operator(input: &str) -> IResult<&str, Token> {
    // Multi-character operators first
    let multi = [
        ("<>", Token::NotEqual),
        ("!=", Token::NotEqual),
        ("<=", Token::LessEqual),
        (">=", Token::GreaterEqual),
        ("->", Token::Arrow),
        ("<-", Token::ArrowLeft),
    ];
    for (text, token) in multi {
        if let Some(rest) = input.strip_prefix(text) {
            return Ok((rest, token));
        }
    }

    let mut chars = input.chars();
    let token = match chars.next() {
        Some('(') => Token::LeftParen,
        Some(')') => Token::RightParen,
        Some('[') => Token::LeftBracket,
        Some(']') => Token::RightBracket,
        Some('{') => Token::LeftBrace,
        Some('}') => Token::RightBrace,
        Some(',') => Token::Comma,
        Some(':') => Token::Colon,
        Some('.') => Token::Dot,
        Some(';') => Token::Semicolon,
        Some('=') => Token::Equal,
        Some('<') => Token::LessThan,
        Some('>') => Token::GreaterThan,
        Some('+') => Token::Plus,
        Some('-') => Token::Dash,
        Some('*') => Token::Star,
        Some('/') => Token::Slash,
        Some('%') => Token::Percent,
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )))
        }
    };
    Ok((chars.as_str(), token))
}

fn integer_literal(input: &str) -> IResult<&str, i64> {
    map_res(digit1, |s: &str| s.parse::<i64>())(input)
}

fn float_literal(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((digit1, char('.'), digit1))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

/// Quoted string with backslash escapes; the quotes are stripped and escapes resolved
fn string_literal(input: &str) -> IResult<&str, String> {
    alt((quoted('\''), quoted('"')))(input)
}

fn quoted(quote: char) -> impl Fn(&str) -> IResult<&str, String> {
    move |input: &str| {
        let (mut rest, _) = char(quote)(input)?;
        let mut value = String::new();
        loop {
            let mut chars = rest.chars();
            match chars.next() {
                Some(c) if c == quote => return Ok((chars.as_str(), value)),
                Some('\\') => {
                    let escaped = match chars.next() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(other) => other,
                        None => break,
                    };
                    value.push(escaped);
                }
                Some(c) => value.push(c),
                None => break,
            }
            rest = chars.as_str();
        }
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }
}

fn backtick_identifier(input: &str) -> IResult<&str, &str> {
    preceded(char('`'), terminated(take_while(|c| c != '`'), char('`')))(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

/// Split query text into tokens, dropping whitespace and comments.
/// The returned stream always ends with [`Token::EOF`].
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut remaining = input;
    let mut tokens = Vec::new();

    while !remaining.is_empty() {
        let position = input.len() - remaining.len();
        match token(remaining) {
            Ok((next, token)) if next.len() < remaining.len() => {
                if !matches!(token, Token::Whitespace | Token::Comment) {
                    tokens.push(token);
                }
                remaining = next;
            }
            _ => {
                let found = remaining.chars().next().unwrap_or(' ');
                return Err(ParseError::UnexpectedCharacter { found, position });
            }
        }
    }

    tokens.push(Token::EOF);
    Ok(tokens)
}
