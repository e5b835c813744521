//! A `nom`-based parser for the value-expression language.
use super::ast::{BinaryOp, Expression, PathSegment, Selection};
use crate::error::ExprError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{alpha1, anychar, char, digit1, multispace0},
    combinator::{map, map_res, not, opt, recognize, verify},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};
use serde_json::{Value, json};

// --- Main Public Parser ---

pub fn parse_expression(input: &str) -> Result<Expression, ExprError> {
    match expression(input.trim()) {
        Ok(("", expr)) => Ok(expr),
        Ok((rem, _)) => Err(ExprError::ParseError(
            input.to_string(),
            format!("Parser did not consume all input. Remainder: '{}'", rem),
        )),
        Err(e) => Err(ExprError::ParseError(input.to_string(), e.to_string())),
    }
}

// --- Precedence Levels ---

fn expression(input: &str) -> IResult<&str, Expression> {
    additive(input)
}

fn additive(input: &str) -> IResult<&str, Expression> {
    let (input, first) = multiplicative(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            map(char('+'), |_| BinaryOp::Add),
            map(char('-'), |_| BinaryOp::Sub),
        ))),
        multiplicative,
    ))
    .parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn multiplicative(input: &str) -> IResult<&str, Expression> {
    let (input, first) = atom(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            map(char('*'), |_| BinaryOp::Mul),
            map(char('/'), |_| BinaryOp::Div),
        ))),
        atom,
    ))
    .parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn fold_binary(first: Expression, rest: Vec<(BinaryOp, Expression)>) -> Expression {
    rest.into_iter().fold(first, |left, (op, right)| Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn atom(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        map(literal, Expression::Literal),
        function_call, // Must be before selection to parse `func()` not `func`
        map(selection, Expression::Selection),
        delimited(char('('), expression, char(')')),
    )))
    .parse(input)
}

// --- Literal Parsers ---

/// Matches a bare keyword that is not a prefix of a longer identifier.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(
        tag(word),
        not(verify(anychar, |c| c.is_alphanumeric() || *c == '_')),
    )
}

fn boolean(input: &str) -> IResult<&str, Value> {
    alt((
        map(keyword("true"), |_| json!(true)),
        map(keyword("false"), |_| json!(false)),
    ))
    .parse(input)
}

fn null(input: &str) -> IResult<&str, Value> {
    map(keyword("null"), |_| json!(null)).parse(input)
}

fn string_literal(input: &str) -> IResult<&str, Value> {
    alt((
        map(delimited(char('\''), is_not("'"), char('\'')), |s: &str| {
            json!(s)
        }),
        map(tag("''"), |_| json!("")),
    ))
    .parse(input)
}

fn number(input: &str) -> IResult<&str, Value> {
    map_res(
        recognize((
            opt(char('-')),
            digit1,
            opt(preceded(char('.'), digit1)),
        )),
        |s: &str| s.parse::<f64>().map(Value::from),
    )
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((null, boolean, number, string_literal)).parse(input)
}

// --- Path/Selection Parser ---

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn key_segment(input: &str) -> IResult<&str, PathSegment> {
    map(preceded(char('.'), identifier), |s| {
        PathSegment::Key(s.to_string())
    })
    .parse(input)
}

fn index_segment(input: &str) -> IResult<&str, PathSegment> {
    map(
        delimited(char('['), map_res(digit1, str::parse::<usize>), char(']')),
        PathSegment::Index,
    )
    .parse(input)
}

fn path_segment(input: &str) -> IResult<&str, PathSegment> {
    alt((key_segment, index_segment)).parse(input)
}

fn full_path(input: &str) -> IResult<&str, Selection> {
    map(
        pair(identifier, many0(path_segment)),
        |(start, mut rest)| {
            let mut segments = vec![PathSegment::Key(start.to_string())];
            segments.append(&mut rest);
            Selection::Path(segments)
        },
    )
    .parse(input)
}

fn variable(input: &str) -> IResult<&str, Selection> {
    map(
        pair(preceded(char('$'), identifier), many0(path_segment)),
        |(name, path)| Selection::Variable {
            name: name.to_string(),
            path,
        },
    )
    .parse(input)
}

fn selection(input: &str) -> IResult<&str, Selection> {
    alt((variable, full_path)).parse(input)
}

// --- Function Call Parser ---

fn function_call(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, args) = delimited(
        char('('),
        separated_list0(ws(char(',')), expression),
        char(')'),
    )
    .parse(input)?;

    Ok((
        input,
        Expression::FunctionCall {
            name: name.to_string(),
            args,
        },
    ))
}

/// A combinator that takes a parser `inner` and produces a parser that consumes surrounding whitespace.
fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}
