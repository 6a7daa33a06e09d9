use logos::Logos;

use crate::{error::EvaError, expression::Expression, stack::ensure_sufficient_stack};


#[derive(Debug, Logos)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token<'a> {
    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    // Delimiters stay part of the literal; the evaluator strips them
    #[regex(r#""[^"]*""#, |lex| lex.slice())]
    Text(&'a str),

    #[regex(r"[A-Za-z0-9_+\-*/<>=%.]+", |lex| lex.slice())]
    Literal(&'a str),
}

type ParseResult<O> = Result<O, EvaError>;

fn syntax_error(message: impl Into<String>) -> EvaError {
    EvaError::SyntaxError(message.into())
}

fn lexer<'a>(input: &'a str) -> ParseResult<Vec<Token<'a>>> {
    let mut tokens = vec![];
    let mut tokenizer = Token::lexer(input);

    while let Some(result) = tokenizer.next() {
        match result {
            Ok(token) => tokens.push(token),
            Err(_) => return Err(syntax_error(format!(
                "unexpected `{}` at offset {}", tokenizer.slice(), tokenizer.span().start
            ))),
        }
    }

    Ok(tokens)
}

fn parse_token<'a, 'b: 'a>(
    expected: &'static str,
    token_recognizer: impl Fn(&'a Token<'b>) -> bool,
) -> impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], &'a Token<'b>)> {
    move |tokens| {
        let Some(token) = tokens.first() else { return Err(syntax_error(format!("expected {}, found end of input", expected))) };

        if !token_recognizer(token) { return Err(syntax_error(format!("expected {}, found {:?}", expected, token))) }
        Ok((&tokens[1..], token))
    }
}

fn parse_surrounds<'a, 'b: 'a, O>(
    start_parser: impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], &'a Token<'b>)>,
    internal_parser: impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], O)>,
    end_parser: impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], &'a Token<'b>)>,
) -> impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], O)> {
    move |tokens| {
        let (tokens, _) = start_parser(tokens)?;
        let (tokens, internal) = internal_parser(tokens)?;
        let (tokens, _) = end_parser(tokens)?;

        Ok((tokens, internal))
    }
}

fn parse_list<'a, 'b: 'a, O>(
    parser: impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], O)>
) -> impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], Vec<O>)> {
    move |mut tokens| {
        let mut result = vec![];

        while let Ok((new_tokens, value)) = parser(tokens) {
            result.push(value);
            tokens = new_tokens
        }

        Ok((tokens, result))
    }
}

fn parse_either<'a, 'b: 'a, O>(
    a: impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], O)>,
    b: impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], O)>,
) -> impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], O)> {
    move |tokens| {
        if let Ok(a) = a(tokens) {
            return Ok(a)
        }
        b(tokens)
    }
}

fn parser_map<'a, 'b: 'a, I, O>(
    parser: impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], I)>,
    f: impl Fn(I) -> O
) -> impl Fn(&'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], O)> {
    move |tokens| {
        let (tokens, value) = parser(tokens)?;
        Ok((tokens, f(value)))
    }
}

// `inf`, `nan` and friends parse as f64 but are names here
fn looks_numeric(literal: &str) -> bool {
    let mut chars = literal.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-' | '.') => chars.next().is_some_and(|c| c.is_ascii_digit() || c == '.'),
        _ => false,
    }
}

fn parse_atom<'a, 'b: 'a>(tokens: &'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], Expression)> {
    let (tokens, token) = parse_token("an atom", |token| matches!(token, Token::Literal(_) | Token::Text(_)))(tokens)?;
    let atom = match token {
        Token::Text(text) => Expression::QuotedString((*text).to_owned()),
        Token::Literal(literal) if looks_numeric(literal) => match literal.parse::<f64>() {
            // Overflowing literals would print back as `inf`, which reads as a name
            Ok(number) if number.is_finite() => Expression::Number(number),
            _ => return Err(syntax_error(format!("malformed number `{}`", literal))),
        },
        Token::Literal(literal) => Expression::Symbol((*literal).to_owned()),
        _ => unreachable!("parse_token only accepts atoms"),
    };
    Ok((tokens, atom))
}

fn parse_expression<'a, 'b: 'a>(tokens: &'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], Expression)> {
    parse_surrounds(
        parse_token("`(`", |token| matches!(token, Token::LeftParen)),
        parser_map(
            parse_list(parse_sexp),
            Expression::List
        ),
        parse_token("`)`", |token| matches!(token, Token::RightParen)),
    )(tokens)
}

fn parse_sexp<'a, 'b: 'a>(tokens: &'a [Token<'b>]) -> ParseResult<(&'a [Token<'b>], Expression)> {
    ensure_sufficient_stack(|| parse_either(
        parse_atom,
        parse_expression
    )(tokens))
}

/// Parses exactly one expression
pub fn parse(input: &str) -> ParseResult<Expression> {
    let tokens = lexer(input)?;

    let (tokens, expression) = parse_sexp(&tokens)?;
    if let Some(token) = tokens.first() {
        return Err(syntax_error(format!("unexpected {:?} after expression", token)));
    }

    Ok(expression)
}

/// Parses a sequence of top-level expressions, possibly empty
pub fn parse_program(input: &str) -> ParseResult<Vec<Expression>> {
    let tokens = lexer(input)?;

    let (rest, expressions) = parse_list(parse_sexp)(&tokens)?;
    if !rest.is_empty() {
        // Re-parse at the failure point to report why it failed
        parse_sexp(rest)?;
    }

    Ok(expressions)
}
