use super::{ParseError, Spanned};
use chumsky::prelude::*;
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'code> {
    BracketRoundOpen,
    BracketRoundClose,
    BracketSquareOpen,
    BracketSquareClose,
    Comma,
    Number(f64),
    Text(&'code str),
    Identifier(&'code str),
    True,
    False,
    Null,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Caret,
    Percent,
    Apostrophe,
    Equal,
    NotEqual,
    LessOrEqual,
    GreaterOrEqual,
    Less,
    Greater,
}

impl<'code> Token<'code> {
    pub fn into_cow_str(self) -> Cow<'code, str> {
        match self {
            Self::BracketRoundOpen => "(".into(),
            Self::BracketRoundClose => ")".into(),
            Self::BracketSquareOpen => "[".into(),
            Self::BracketSquareClose => "]".into(),
            Self::Comma => ",".into(),
            Self::Number(number) => number.to_string().into(),
            Self::Text(text) => format!("\"{text}\"").into(),
            Self::Identifier(identifier) => identifier.into(),
            Self::True => "true".into(),
            Self::False => "false".into(),
            Self::Null => "null".into(),
            Self::Plus => "+".into(),
            Self::Minus => "-".into(),
            Self::Asterisk => "*".into(),
            Self::Slash => "/".into(),
            Self::Caret => "^".into(),
            Self::Percent => "%".into(),
            Self::Apostrophe => "'".into(),
            Self::Equal => "==".into(),
            Self::NotEqual => "!=".into(),
            Self::LessOrEqual => "<=".into(),
            Self::GreaterOrEqual => ">=".into(),
            Self::Less => "<".into(),
            Self::Greater => ">".into(),
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.into_cow_str())
    }
}

pub fn lexer<'code>()
-> impl Parser<'code, &'code str, Vec<Spanned<Token<'code>>>, extra::Err<ParseError<'code, char>>> {
    let bracket = choice((
        just('(').to(Token::BracketRoundOpen),
        just(')').to(Token::BracketRoundClose),
        just('[').to(Token::BracketSquareOpen),
        just(']').to(Token::BracketSquareClose),
    ));

    // Two-character comparators first so `<=` doesn't lex as `<` `=`.
    let comparator = choice((
        just("==").to(Token::Equal),
        just("!=").to(Token::NotEqual),
        just("<=").to(Token::LessOrEqual),
        just(">=").to(Token::GreaterOrEqual),
        just('<').to(Token::Less),
        just('>').to(Token::Greater),
    ));

    let arithmetic_operator = choice((
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Asterisk),
        just('/').to(Token::Slash),
        just('^').to(Token::Caret),
        just('%').to(Token::Percent),
        just('\'').to(Token::Apostrophe),
    ));

    // `12`, `1.5`, `1.`, `.5`, `2e-3`; the sign is a separate token.
    let mantissa = text::digits(10)
        .then(just('.').then(text::digits(10).or_not()).or_not())
        .to_slice()
        .or(just('.').then(text::digits(10)).to_slice());

    let exponent = one_of("eE")
        .then(one_of("+-").or_not())
        .then(text::digits(10));

    let number = mantissa
        .then(exponent.or_not())
        .to_slice()
        .from_str()
        .unwrapped()
        .map(Token::Number);

    let text = just('"')
        .ignore_then(none_of('"').repeated().to_slice())
        .then_ignore(just('"'))
        .map(Token::Text);

    let identifier = any()
        .filter(|character: &char| character.is_ascii_alphabetic() || *character == '_')
        .then(
            any()
                .filter(|character: &char| character.is_ascii_alphanumeric() || *character == '_')
                .repeated(),
        )
        .to_slice()
        .map(|identifier| match identifier {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => Token::Identifier(identifier),
        });

    let token = choice((
        bracket,
        just(',').to(Token::Comma),
        number,
        text,
        comparator,
        arithmetic_operator,
        identifier,
    ));

    token
        .map_with(|token, extra| Spanned {
            node: token,
            span: extra.span(),
        })
        .padded()
        .recover_with(skip_then_retry_until(any().ignored(), end()))
        .repeated()
        .collect::<Vec<_>>()
        .padded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chumsky::prelude::Parser;

    fn tokens(code: &str) -> Vec<Token<'_>> {
        lexer()
            .parse(code)
            .into_output()
            .unwrap()
            .into_iter()
            .map(|token| token.node)
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("12 1.5 .5 2e-3 1E2"),
            vec![
                Token::Number(12.0),
                Token::Number(1.5),
                Token::Number(0.5),
                Token::Number(0.002),
                Token::Number(100.0),
            ]
        );
    }

    #[test]
    fn test_negative_number_is_two_tokens() {
        assert_eq!(tokens("-1"), vec![Token::Minus, Token::Number(1.0)]);
    }

    #[test]
    fn test_identifiers_and_keywords() {
        assert_eq!(
            tokens("M_0 true null x1"),
            vec![
                Token::Identifier("M_0"),
                Token::True,
                Token::Null,
                Token::Identifier("x1"),
            ]
        );
    }

    #[test]
    fn test_comparators_before_single_characters() {
        assert_eq!(
            tokens("a<=b<c"),
            vec![
                Token::Identifier("a"),
                Token::LessOrEqual,
                Token::Identifier("b"),
                Token::Less,
                Token::Identifier("c"),
            ]
        );
    }

    #[test]
    fn test_matrix_literal() {
        assert_eq!(
            tokens("[[1,2],[3,4]]'"),
            vec![
                Token::BracketSquareOpen,
                Token::BracketSquareOpen,
                Token::Number(1.0),
                Token::Comma,
                Token::Number(2.0),
                Token::BracketSquareClose,
                Token::Comma,
                Token::BracketSquareOpen,
                Token::Number(3.0),
                Token::Comma,
                Token::Number(4.0),
                Token::BracketSquareClose,
                Token::BracketSquareClose,
                Token::Apostrophe,
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_an_error() {
        let (_, errors) = lexer().parse("1 # 2").into_output_errors();
        assert!(!errors.is_empty());
    }
}
