// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Parser for the query language using nom parsers over the token stream
//!
//! Clause parsers `cut` after their leading keyword, so a malformed clause is
//! reported at the offending token instead of at the start of the clause.

use log::debug;
use nom::{
    branch::alt,
    combinator::{cut, map, opt},
    multi::{many0, many1, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

use super::ast::*;
use super::lexer::{tokenize, Token};
use super::ParseError;
use crate::value::Value;

const CLAUSE_EXPECTATION: &str = "a clause (MATCH, CREATE, SET, REMOVE, DELETE, DETACH DELETE or RETURN)";

/// Parse query text into a [`Query`]
pub fn parse_query(input: &str) -> Result<Query, ParseError> {
    let tokens = tokenize(input)?;

    let query = match query(&tokens) {
        Ok((rest, query)) => {
            if !matches!(rest.first(), Some(Token::EOF) | None) {
                return Err(unexpected(&tokens, rest, false));
            }
            query
        }
        Err(nom::Err::Error(e)) => return Err(unexpected(&tokens, e.input, false)),
        Err(nom::Err::Failure(e)) => return Err(unexpected(&tokens, e.input, true)),
        Err(nom::Err::Incomplete(_)) => {
            return Err(ParseError::UnexpectedEnd {
                expected: CLAUSE_EXPECTATION.to_string(),
            })
        }
    };

    validate(&query)?;
    debug!("Parsed query with {} clause(s)", query.clauses.len());
    Ok(query)
}

/// Build the error for a parse that stopped at `remaining`
fn unexpected(all: &[Token], remaining: &[Token], committed: bool) -> ParseError {
    let position = all.len() - remaining.len();
    let expected = if committed && position > 0 {
        format!("valid syntax after '{}'", all[position - 1])
    } else {
        CLAUSE_EXPECTATION.to_string()
    };

    match remaining.first() {
        None | Some(Token::EOF) => ParseError::UnexpectedEnd { expected },
        Some(found) => ParseError::UnexpectedToken {
            found: found.to_string(),
            expected,
        },
    }
}

/// Structural checks that the grammar alone does not enforce
fn validate(query: &Query) -> Result<(), ParseError> {
    let last = query.clauses.len().saturating_sub(1);
    for (i, clause) in query.clauses.iter().enumerate() {
        if matches!(clause, Clause::Return(_)) && i != last {
            return Err(ParseError::InvalidQuery(
                "RETURN can only be used at the end of the query".to_string(),
            ));
        }
        if let Clause::Create { patterns } = clause {
            for (rel, _) in patterns.iter().flat_map(|p| p.steps.iter()) {
                if rel.direction == Direction::Both {
                    return Err(ParseError::InvalidQuery(
                        "Only directed relationships are supported in CREATE".to_string(),
                    ));
                }
                if rel.rel_type.is_none() {
                    return Err(ParseError::InvalidQuery(
                        "Exactly one relationship type must be specified for CREATE".to_string(),
                    ));
                }
            }
        }
    }

    if let Some(Clause::Match { .. }) = query.clauses.last() {
        return Err(ParseError::InvalidQuery(
            "Query cannot conclude with MATCH (must be RETURN or an update clause)".to_string(),
        ));
    }
    Ok(())
}

fn query(tokens: &[Token]) -> IResult<&[Token], Query> {
    map(
        terminated(many1(clause), opt(expect_token(Token::Semicolon))),
        |clauses| Query { clauses },
    )(tokens)
}

fn clause(tokens: &[Token]) -> IResult<&[Token], Clause> {
    alt((
        match_clause,
        create_clause,
        set_clause,
        remove_clause,
        delete_clause,
        return_clause,
    ))(tokens)
}

fn match_clause(tokens: &[Token]) -> IResult<&[Token], Clause> {
    map(
        preceded(
            expect_token(Token::Match),
            cut(pair(
                separated_list1(expect_token(Token::Comma), pattern),
                opt(preceded(expect_token(Token::Where), cut(expression))),
            )),
        ),
        |(patterns, predicate)| Clause::Match {
            patterns,
            predicate,
        },
    )(tokens)
}

fn create_clause(tokens: &[Token]) -> IResult<&[Token], Clause> {
    map(
        preceded(
            expect_token(Token::Create),
            cut(separated_list1(expect_token(Token::Comma), pattern)),
        ),
        |patterns| Clause::Create { patterns },
    )(tokens)
}

fn set_clause(tokens: &[Token]) -> IResult<&[Token], Clause> {
    map(
        preceded(
            expect_token(Token::Set),
            cut(separated_list1(expect_token(Token::Comma), set_item)),
        ),
        |items| Clause::Set { items },
    )(tokens)
}

fn set_item(tokens: &[Token]) -> IResult<&[Token], SetItem> {
    alt((
        map(
            tuple((
                identifier,
                expect_token(Token::Dot),
                symbolic_name,
                expect_token(Token::Equal),
                expression,
            )),
            |(variable, _, key, _, value)| SetItem::Property {
                variable,
                key,
                value,
            },
        ),
        map(pair(identifier, label_list), |(variable, labels)| {
            SetItem::Labels { variable, labels }
        }),
    ))(tokens)
}

fn remove_clause(tokens: &[Token]) -> IResult<&[Token], Clause> {
    map(
        preceded(
            expect_token(Token::Remove),
            cut(separated_list1(expect_token(Token::Comma), remove_item)),
        ),
        |items| Clause::Remove { items },
    )(tokens)
}

fn remove_item(tokens: &[Token]) -> IResult<&[Token], RemoveItem> {
    alt((
        map(
            separated_pair(identifier, expect_token(Token::Dot), symbolic_name),
            |(variable, key)| RemoveItem::Property { variable, key },
        ),
        map(pair(identifier, label_list), |(variable, labels)| {
            RemoveItem::Labels { variable, labels }
        }),
    ))(tokens)
}

fn delete_clause(tokens: &[Token]) -> IResult<&[Token], Clause> {
    map(
        pair(
            alt((
                map(
                    pair(expect_token(Token::Detach), cut(expect_token(Token::Delete))),
                    |_| true,
                ),
                map(expect_token(Token::Delete), |_| false),
            )),
            cut(separated_list1(expect_token(Token::Comma), expression)),
        ),
        |(detach, expressions)| Clause::Delete {
            detach,
            expressions,
        },
    )(tokens)
}

fn return_clause(tokens: &[Token]) -> IResult<&[Token], Clause> {
    map(
        preceded(
            expect_token(Token::Return),
            cut(tuple((
                opt(expect_token(Token::Distinct)),
                return_items,
                opt(order_by),
                opt(preceded(expect_token(Token::Skip), cut(expression))),
                opt(preceded(expect_token(Token::Limit), cut(expression))),
            ))),
        ),
        |(distinct, items, order_by, skip, limit)| {
            Clause::Return(ReturnClause {
                distinct: distinct.is_some(),
                items,
                order_by: order_by.unwrap_or_default(),
                skip,
                limit,
            })
        },
    )(tokens)
}

fn return_items(tokens: &[Token]) -> IResult<&[Token], ReturnItems> {
    alt((
        map(expect_token(Token::Star), |_| ReturnItems::All),
        map(
            separated_list1(expect_token(Token::Comma), return_item),
            ReturnItems::Explicit,
        ),
    ))(tokens)
}

fn return_item(tokens: &[Token]) -> IResult<&[Token], ReturnItem> {
    map(
        pair(
            expression,
            opt(preceded(expect_token(Token::As), cut(symbolic_name))),
        ),
        |(expression, alias)| ReturnItem { expression, alias },
    )(tokens)
}

fn order_by(tokens: &[Token]) -> IResult<&[Token], Vec<SortItem>> {
    preceded(
        pair(expect_token(Token::Order), cut(expect_token(Token::By))),
        cut(separated_list1(expect_token(Token::Comma), sort_item)),
    )(tokens)
}

fn sort_item(tokens: &[Token]) -> IResult<&[Token], SortItem> {
    map(
        pair(
            expression,
            opt(alt((expect_token(Token::Asc), expect_token(Token::Desc)))),
        ),
        |(expression, direction)| SortItem {
            expression,
            descending: matches!(direction, Some(Token::Desc)),
        },
    )(tokens)
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

fn pattern(tokens: &[Token]) -> IResult<&[Token], Pattern> {
    map(
        pair(node_pattern, many0(pair(relationship_pattern, node_pattern))),
        |(start, steps)| Pattern { start, steps },
    )(tokens)
}

fn node_pattern(tokens: &[Token]) -> IResult<&[Token], NodePattern> {
    map(
        delimited(
            expect_token(Token::LeftParen),
            tuple((opt(identifier), opt(label_list), opt(property_map))),
            expect_token(Token::RightParen),
        ),
        |(variable, labels, properties)| NodePattern {
            variable,
            labels: labels.unwrap_or_default(),
            properties: properties.unwrap_or_default(),
        },
    )(tokens)
}

fn relationship_pattern(tokens: &[Token]) -> IResult<&[Token], RelationshipPattern> {
    let (rest, left) = alt((expect_token(Token::ArrowLeft), expect_token(Token::Dash)))(tokens)?;
    let (rest, detail) = opt(delimited(
        expect_token(Token::LeftBracket),
        tuple((
            opt(identifier),
            opt(preceded(expect_token(Token::Colon), symbolic_name)),
            opt(property_map),
        )),
        expect_token(Token::RightBracket),
    ))(rest)?;
    let (rest, right) = alt((expect_token(Token::Arrow), expect_token(Token::Dash)))(rest)?;

    let direction = match (left, right) {
        (Token::ArrowLeft, Token::Dash) => Direction::Incoming,
        (Token::Dash, Token::Arrow) => Direction::Outgoing,
        _ => Direction::Both,
    };
    let (variable, rel_type, properties) = detail.unwrap_or((None, None, None));

    Ok((
        rest,
        RelationshipPattern {
            variable,
            rel_type,
            properties: properties.unwrap_or_default(),
            direction,
        },
    ))
}

fn label_list(tokens: &[Token]) -> IResult<&[Token], Vec<String>> {
    many1(preceded(expect_token(Token::Colon), symbolic_name))(tokens)
}

fn property_map(tokens: &[Token]) -> IResult<&[Token], Vec<(String, Expression)>> {
    delimited(
        expect_token(Token::LeftBrace),
        separated_list0(
            expect_token(Token::Comma),
            separated_pair(symbolic_name, expect_token(Token::Colon), expression),
        ),
        expect_token(Token::RightBrace),
    )(tokens)
}

// ---------------------------------------------------------------------------
// Expressions, lowest precedence first
// ---------------------------------------------------------------------------

type ExpressionParser = fn(&[Token]) -> IResult<&[Token], Expression>;

fn expression(tokens: &[Token]) -> IResult<&[Token], Expression> {
    or_expression(tokens)
}

/// Fold a left-associative chain `operand (op operand)*`
fn left_assoc<'a>(
    tokens: &'a [Token],
    operand: ExpressionParser,
    operators: &[(Token, BinaryOperator)],
) -> IResult<&'a [Token], Expression> {
    let (mut rest, mut left) = operand(tokens)?;
    'chain: loop {
        for (token, op) in operators {
            if rest.first() == Some(token) {
                let (after, right) = cut(operand)(&rest[1..])?;
                left = Expression::Binary(Box::new(left), *op, Box::new(right));
                rest = after;
                continue 'chain;
            }
        }
        return Ok((rest, left));
    }
}

fn or_expression(tokens: &[Token]) -> IResult<&[Token], Expression> {
    left_assoc(tokens, xor_expression, &[(Token::Or, BinaryOperator::Or)])
}

fn xor_expression(tokens: &[Token]) -> IResult<&[Token], Expression> {
    left_assoc(tokens, and_expression, &[(Token::Xor, BinaryOperator::Xor)])
}

fn and_expression(tokens: &[Token]) -> IResult<&[Token], Expression> {
    left_assoc(tokens, not_expression, &[(Token::And, BinaryOperator::And)])
}

fn not_expression(tokens: &[Token]) -> IResult<&[Token], Expression> {
    alt((
        map(
            preceded(expect_token(Token::Not), cut(not_expression)),
            |inner| Expression::Unary(UnaryOperator::Not, Box::new(inner)),
        ),
        comparison,
    ))(tokens)
}

fn comparison(tokens: &[Token]) -> IResult<&[Token], Expression> {
    let (rest, expression) = left_assoc(
        tokens,
        additive,
        &[
            (Token::Equal, BinaryOperator::Equal),
            (Token::NotEqual, BinaryOperator::NotEqual),
            (Token::LessEqual, BinaryOperator::LessEqual),
            (Token::GreaterEqual, BinaryOperator::GreaterEqual),
            (Token::LessThan, BinaryOperator::LessThan),
            (Token::GreaterThan, BinaryOperator::GreaterThan),
            (Token::In, BinaryOperator::In),
        ],
    )?;

    let (rest, null_check) = opt(preceded(
        expect_token(Token::Is),
        cut(pair(
            opt(expect_token(Token::Not)),
            expect_token(Token::Null),
        )),
    ))(rest)?;

    let expression = match null_check {
        Some((negated, _)) => Expression::IsNull {
            expression: Box::new(expression),
            negated: negated.is_some(),
        },
        None => expression,
    };
    Ok((rest, expression))
}

fn additive(tokens: &[Token]) -> IResult<&[Token], Expression> {
    left_assoc(
        tokens,
        multiplicative,
        &[
            (Token::Plus, BinaryOperator::Add),
            (Token::Dash, BinaryOperator::Subtract),
        ],
    )
}

fn multiplicative(tokens: &[Token]) -> IResult<&[Token], Expression> {
    left_assoc(
        tokens,
        unary,
        &[
            (Token::Star, BinaryOperator::Multiply),
            (Token::Slash, BinaryOperator::Divide),
            (Token::Percent, BinaryOperator::Modulo),
        ],
    )
}

fn unary(tokens: &[Token]) -> IResult<&[Token], Expression> {
    alt((
        map(preceded(expect_token(Token::Dash), cut(unary)), |inner| {
            match inner {
                Expression::Literal(Value::Integer(i)) => {
                    Expression::Literal(Value::Integer(-i))
                }
                Expression::Literal(Value::Float(x)) => Expression::Literal(Value::Float(-x)),
                other => Expression::Unary(UnaryOperator::Negate, Box::new(other)),
            }
        }),
        postfix,
    ))(tokens)
}

fn postfix(tokens: &[Token]) -> IResult<&[Token], Expression> {
    let (rest, base) = primary(tokens)?;
    let (rest, keys) = many0(preceded(expect_token(Token::Dot), cut(symbolic_name)))(rest)?;
    let expression = keys.into_iter().fold(base, |inner, key| {
        Expression::Property(Box::new(inner), key)
    });
    Ok((rest, expression))
}

fn primary(tokens: &[Token]) -> IResult<&[Token], Expression> {
    alt((
        literal,
        map(
            delimited(
                expect_token(Token::LeftBracket),
                separated_list0(expect_token(Token::Comma), expression),
                cut(expect_token(Token::RightBracket)),
            ),
            Expression::List,
        ),
        map(property_map, Expression::Map),
        count_star,
        function_call,
        map(identifier, Expression::Variable),
        delimited(
            expect_token(Token::LeftParen),
            expression,
            cut(expect_token(Token::RightParen)),
        ),
    ))(tokens)
}

fn literal(tokens: &[Token]) -> IResult<&[Token], Expression> {
    let value = match tokens.first() {
        Some(Token::Integer(i)) => Value::Integer(*i),
        Some(Token::Float(x)) => Value::Float(*x),
        Some(Token::String(s)) => Value::String(s.clone()),
        Some(Token::True) => Value::Boolean(true),
        Some(Token::False) => Value::Boolean(false),
        Some(Token::Null) => Value::Null,
        _ => return no_match(tokens),
    };
    Ok((&tokens[1..], Expression::Literal(value)))
}

fn count_star(tokens: &[Token]) -> IResult<&[Token], Expression> {
    let (rest, name) = identifier(tokens)?;
    if !name.eq_ignore_ascii_case("count") {
        return no_match(tokens);
    }
    map(
        tuple((
            expect_token(Token::LeftParen),
            expect_token(Token::Star),
            cut(expect_token(Token::RightParen)),
        )),
        |_| Expression::CountStar,
    )(rest)
}

fn function_call(tokens: &[Token]) -> IResult<&[Token], Expression> {
    let (rest, name) = identifier(tokens)?;
    let (rest, _) = expect_token(Token::LeftParen)(rest)?;
    map(
        cut(terminated(
            pair(
                opt(expect_token(Token::Distinct)),
                separated_list0(expect_token(Token::Comma), expression),
            ),
            expect_token(Token::RightParen),
        )),
        move |(distinct, arguments)| Expression::Function {
            name: name.clone(),
            distinct: distinct.is_some(),
            arguments,
        },
    )(rest)
}

// ---------------------------------------------------------------------------
// Token helpers
// ---------------------------------------------------------------------------

fn no_match<T>(tokens: &[Token]) -> IResult<&[Token], T> {
    Err(nom::Err::Error(nom::error::Error::new(
        tokens,
        nom::error::ErrorKind::Tag,
    )))
}

/// Variable names: plain identifiers only
fn identifier(tokens: &[Token]) -> IResult<&[Token], String> {
    match tokens.first() {
        Some(Token::Identifier(name)) => Ok((&tokens[1..], name.clone())),
        _ => no_match(tokens),
    }
}

/// Labels, relationship types, property keys and aliases may also be keywords
fn symbolic_name(tokens: &[Token]) -> IResult<&[Token], String> {
    match tokens.first() {
        Some(Token::Identifier(name)) => Ok((&tokens[1..], name.clone())),
        Some(token) => match token.keyword_text() {
            Some(text) => Ok((&tokens[1..], text.to_string())),
            None => no_match(tokens),
        },
        None => no_match(tokens),
    }
}

/// Match a token by variant, ignoring any payload
fn expect_token(expected: Token) -> impl Fn(&[Token]) -> IResult<&[Token], Token> {
    move |tokens: &[Token]| match tokens.first() {
        Some(token) if std::mem::discriminant(token) == std::mem::discriminant(&expected) => {
            Ok((&tokens[1..], token.clone()))
        }
        _ => no_match(tokens),
    }
}
