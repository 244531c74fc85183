use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{map, not, opt, recognize, value},
    error::{Error, ParseError},
    sequence::{delimited, pair, preceded, terminated},
};

use crate::value::Value;

use super::{
    ExpressionError,
    ast::{BinaryOp, Expr},
};

/// Parses a whole expression, failing on trailing input.
pub fn parse_expression(input: &str) -> Result<Expr, ExpressionError> {
    match terminated(parse_or, multispace0).parse(input) {
        Ok(("", expr)) => Ok(expr),
        Ok((rest, _)) => Err(syntax(input, rest, "unexpected input")),
        Err(nom::Err::Error(err) | nom::Err::Failure(err)) => {
            Err(syntax(input, err.input, "invalid expression"))
        }
        Err(nom::Err::Incomplete(_)) => Err(syntax(input, "", "incomplete expression")),
    }
}

fn syntax(input: &str, rest: &str, message: &str) -> ExpressionError {
    ExpressionError::Syntax {
        position: input.len() - rest.len(),
        message: message.to_string(),
    }
}

fn ws<'a, O, E: ParseError<&'a str>, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn symbol<'a>(c: char) -> impl Parser<&'a str, Output = char, Error = Error<&'a str>> {
    ws(char(c))
}

// word operators must not swallow the start of an identifier (`order`, `android`)
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = Error<&'a str>> {
    terminated(tag(word), not(satisfy(is_ident_char)))
}

type Level = for<'a> fn(&'a str) -> IResult<&'a str, Expr>;
type OperatorParser = for<'a> fn(&'a str) -> IResult<&'a str, BinaryOp>;

// left associative chain of `operand (operator operand)*`
fn binary_level(input: &str, operand: Level, operator: OperatorParser) -> IResult<&str, Expr> {
    let (mut input, mut lhs) = operand(input)?;
    loop {
        match operator(input) {
            Ok((rest, op)) => {
                let (rest, rhs) = operand(rest)?;
                lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, lhs)),
            Err(err) => return Err(err),
        }
    }
}

fn parse_or(input: &str) -> IResult<&str, Expr> {
    binary_level(input, parse_and, or_operator)
}

fn parse_and(input: &str) -> IResult<&str, Expr> {
    binary_level(input, parse_comparison, and_operator)
}

fn parse_comparison(input: &str) -> IResult<&str, Expr> {
    binary_level(input, parse_additive, comparison_operator)
}

fn parse_additive(input: &str) -> IResult<&str, Expr> {
    binary_level(input, parse_multiplicative, additive_operator)
}

fn parse_multiplicative(input: &str) -> IResult<&str, Expr> {
    binary_level(input, parse_unary, multiplicative_operator)
}

fn or_operator(input: &str) -> IResult<&str, BinaryOp> {
    value(BinaryOp::Or, ws(alt((tag("||"), keyword("or"))))).parse(input)
}

fn and_operator(input: &str) -> IResult<&str, BinaryOp> {
    value(BinaryOp::And, ws(alt((tag("&&"), keyword("and"))))).parse(input)
}

fn comparison_operator(input: &str) -> IResult<&str, BinaryOp> {
    ws(alt((
        value(BinaryOp::Eq, alt((tag("=="), keyword("eq")))),
        value(BinaryOp::NotEq, alt((tag("!="), keyword("neq")))),
        value(BinaryOp::Lte, alt((tag("<="), keyword("lte")))),
        value(BinaryOp::Gte, alt((tag(">="), keyword("gte")))),
        value(BinaryOp::Lt, alt((tag("<"), keyword("lt")))),
        value(BinaryOp::Gt, alt((tag(">"), keyword("gt")))),
    )))
    .parse(input)
}

fn additive_operator(input: &str) -> IResult<&str, BinaryOp> {
    ws(alt((
        value(BinaryOp::Add, char('+')),
        value(BinaryOp::Sub, char('-')),
    )))
    .parse(input)
}

fn multiplicative_operator(input: &str) -> IResult<&str, BinaryOp> {
    ws(alt((
        value(BinaryOp::Mul, char('*')),
        value(BinaryOp::Div, char('/')),
        value(BinaryOp::Rem, char('%')),
    )))
    .parse(input)
}

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(
            preceded(ws(alt((tag("!"), keyword("not")))), parse_unary),
            |expr| Expr::Not(Box::new(expr)),
        ),
        map(preceded(symbol('-'), parse_unary), |expr| {
            Expr::Negate(Box::new(expr))
        }),
        parse_postfix,
    ))
    .parse(input)
}

fn parse_postfix(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut expr) = ws(parse_primary).parse(input)?;
    loop {
        if let Ok((rest, name)) = preceded(symbol('.'), identifier).parse(input) {
            match pair(symbol('('), symbol(')')).parse(rest) {
                Ok((rest, _)) => {
                    expr = Expr::Method(Box::new(expr), name.into());
                    input = rest;
                }
                Err(_) => {
                    expr = Expr::Property(Box::new(expr), name.into());
                    input = rest;
                }
            }
            continue;
        }
        if let Ok((rest, index)) = delimited(symbol('['), parse_or, symbol(']')).parse(input) {
            expr = Expr::Index(Box::new(expr), Box::new(index));
            input = rest;
            continue;
        }
        return Ok((input, expr));
    }
}

fn parse_primary(input: &str) -> IResult<&str, Expr> {
    alt((
        delimited(symbol('('), parse_or, symbol(')')),
        parse_number,
        parse_string,
        map(identifier, |name| match name {
            "null" => Expr::Literal(Value::Null),
            "true" => Expr::Literal(Value::Bool(true)),
            "false" => Expr::Literal(Value::Bool(false)),
            _ => Expr::Variable(name.into()),
        }),
    ))
    .parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))
    .parse(input)
}

fn number_text(input: &str) -> IResult<&str, &str> {
    recognize(pair(digit1, opt(pair(char('.'), digit1)))).parse(input)
}

fn parse_number(input: &str) -> IResult<&str, Expr> {
    let (rest, text) = number_text(input)?;
    let number = if text.contains('.') {
        text.parse::<f64>().ok().map(Value::Float)
    } else {
        text.parse::<i64>().ok().map(Value::Int)
    };
    match number {
        Some(number) => Ok((rest, Expr::Literal(number))),
        None => Err(nom::Err::Failure(Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn parse_string(input: &str) -> IResult<&str, Expr> {
    map(
        alt((
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        )),
        |text: &str| Expr::Literal(Value::String(text.into())),
    )
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Variable(name.into()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("a == 1 or b and c").unwrap();
        let expected = Expr::Binary(
            Box::new(Expr::Binary(
                var("a"),
                BinaryOp::Eq,
                Box::new(Expr::Literal(Value::Int(1))),
            )),
            BinaryOp::Or,
            Box::new(Expr::Binary(var("b"), BinaryOp::And, var("c"))),
        );
        assert_eq!(expected, expr);
    }

    #[test]
    fn test_postfix_chain() {
        let expr = parse_expression("list[0].name.size()").unwrap();
        let expected = Expr::Method(
            Box::new(Expr::Property(
                Box::new(Expr::Index(
                    var("list"),
                    Box::new(Expr::Literal(Value::Int(0))),
                )),
                "name".into(),
            )),
            "size".into(),
        );
        assert_eq!(expected, expr);
    }

    #[test]
    fn test_literals() {
        assert_eq!(Expr::Literal(Value::Null), parse_expression(" null ").unwrap());
        assert_eq!(Expr::Literal(Value::Float(1.5)), parse_expression("1.5").unwrap());
        assert_eq!(
            Expr::Literal(Value::String("it".into())),
            parse_expression("'it'").unwrap()
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_expression("").is_err());
        assert!(parse_expression("a ==").is_err());
        assert!(parse_expression("(a").is_err());
        assert!(parse_expression("'open").is_err());
    }
}
