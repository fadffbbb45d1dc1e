//! Tokenized CSS values and their re-serialization.
//! Tokenization per <https://www.w3.org/TR/css-syntax-3/#tokenization>.

use core::fmt;
use cssparser::BasicParseErrorKind;
use cssparser::ParseError;
use cssparser::Parser;
use cssparser::ParserInput;
use cssparser::SourcePosition;
use cssparser::Token;

/// A function call token: `name(arg, arg, ...)`.
///
/// Arguments are the token runs between top-level commas. Whitespace inside
/// an argument is kept as tokens, so re-rendering reproduces the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionToken {
    /// Function name as written (case preserved).
    pub name: String,
    /// Comma-separated argument token runs, in order.
    pub args: Vec<Vec<ValueToken>>,
}

/// One token of a CSS value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueToken {
    /// Any atomic token kept as raw text: idents, numbers, dimensions,
    /// hashes, urls, comments.
    Word(String),
    /// A quoted string, raw text including its quotes.
    QuotedString(String),
    /// Operators and punctuation (`,`, `+`, `/`, ...).
    Delim(String),
    /// A whitespace run.
    Whitespace(String),
    /// A function call with structured arguments.
    Function(FunctionToken),
    /// A bare parenthesis group.
    Group(Vec<ValueToken>),
}

/// Error returned when a value cannot be meaningfully tokenized.
///
/// Callers are expected to leave such values untouched rather than fail.
#[derive(Clone, Debug)]
pub struct ValueParseError;

impl fmt::Display for ValueParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "CSS value could not be tokenized")
    }
}

impl core::error::Error for ValueParseError {}

/// Tokenize a CSS value into a token sequence.
///
/// # Errors
/// Returns [`ValueParseError`] when the value contains an unterminated
/// string or url.
pub fn parse_value(value_text: &str) -> Result<Vec<ValueToken>, ValueParseError> {
    let mut input = ParserInput::new(value_text);
    let mut parser = Parser::new(&mut input);
    read_sequence(&mut parser).map_err(|_error| ValueParseError)
}

/// Re-serialize a token sequence to CSS text.
///
/// Loss-free for any sequence produced by [`parse_value`]: simple tokens keep
/// their raw text, argument separators are re-emitted once per split.
pub fn render(tokens: &[ValueToken]) -> String {
    let mut out = String::new();
    render_into(tokens, &mut out);
    out
}

fn render_into(tokens: &[ValueToken], out: &mut String) {
    for token in tokens {
        match token {
            ValueToken::Word(text)
            | ValueToken::QuotedString(text)
            | ValueToken::Delim(text)
            | ValueToken::Whitespace(text) => out.push_str(text),
            ValueToken::Function(call) => {
                out.push_str(&call.name);
                out.push('(');
                for (index, arg) in call.args.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    render_into(arg, out);
                }
                out.push(')');
            }
            ValueToken::Group(inner) => {
                out.push('(');
                render_into(inner, out);
                out.push(')');
            }
        }
    }
}

/// Read tokens until the parser (or the enclosing block) is exhausted.
/// Commas stay in the sequence as delimiters.
fn read_sequence<'input>(
    parser: &mut Parser<'input, '_>,
) -> Result<Vec<ValueToken>, ParseError<'input, ()>> {
    let mut out = Vec::new();
    loop {
        let start = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        out.push(read_token(parser, start, &token)?);
    }
    Ok(out)
}

/// Read the argument runs of a function block, splitting on top-level commas.
fn read_arguments<'input>(
    parser: &mut Parser<'input, '_>,
) -> Result<Vec<Vec<ValueToken>>, ParseError<'input, ()>> {
    let mut args = Vec::new();
    let mut current = Vec::new();
    loop {
        let start = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        if matches!(token, Token::Comma) {
            args.push(core::mem::take(&mut current));
            continue;
        }
        current.push(read_token(parser, start, &token)?);
    }
    if !current.is_empty() || !args.is_empty() {
        args.push(current);
    }
    Ok(args)
}

/// Turn one cssparser token into a [`ValueToken`], recursing into blocks.
fn read_token<'input>(
    parser: &mut Parser<'input, '_>,
    start: SourcePosition,
    token: &Token<'input>,
) -> Result<ValueToken, ParseError<'input, ()>> {
    Ok(match token {
        Token::Function(name) => ValueToken::Function(FunctionToken {
            name: name.to_string(),
            args: parser.parse_nested_block(|block| read_arguments(block))?,
        }),
        Token::ParenthesisBlock => {
            ValueToken::Group(parser.parse_nested_block(|block| read_sequence(block))?)
        }
        Token::SquareBracketBlock | Token::CurlyBracketBlock => {
            // Opaque to substitution; keep the raw text of the whole block.
            parser.parse_nested_block(|block| {
                while block.next_including_whitespace_and_comments().is_ok() {}
                Ok::<_, ParseError<'input, ()>>(())
            })?;
            ValueToken::Word(parser.slice_from(start).to_owned())
        }
        Token::BadString(_) | Token::BadUrl(_) => {
            return Err(parser.new_error(BasicParseErrorKind::QualifiedRuleInvalid));
        }
        Token::QuotedString(_) => ValueToken::QuotedString(parser.slice_from(start).to_owned()),
        Token::WhiteSpace(spaces) => ValueToken::Whitespace((*spaces).to_owned()),
        Token::Comma => ValueToken::Delim(",".to_owned()),
        Token::Colon => ValueToken::Delim(":".to_owned()),
        Token::Semicolon => ValueToken::Delim(";".to_owned()),
        Token::Delim(value) => ValueToken::Delim(value.to_string()),
        _ => ValueToken::Word(parser.slice_from(start).to_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::{FunctionToken, ValueToken, parse_value, render};

    fn round_trip(text: &str) {
        let tokens = parse_value(text).expect("value should tokenize");
        assert_eq!(render(&tokens), text);
    }

    #[test]
    fn words_and_operators_round_trip() {
        round_trip("1px solid #fff");
        round_trip("calc(100% - 8px)");
        round_trip("0 2px 4px rgba(0, 0, 0, 0.5)");
        round_trip("url(images/bg.png) no-repeat");
        round_trip("\"Helvetica Neue\", sans-serif");
    }

    #[test]
    fn var_calls_round_trip() {
        round_trip("var(--color)");
        round_trip("var(--color, red)");
        round_trip("calc(var(--gap) * 2)");
        round_trip("var(--a, var(--b, 1px))");
    }

    #[test]
    fn function_arguments_are_split_on_commas() {
        let tokens = parse_value("var(--color, red)").expect("value should tokenize");
        let [ValueToken::Function(call)] = tokens.as_slice() else {
            panic!("expected a single function token, got {tokens:?}");
        };
        assert_eq!(call.name, "var");
        assert_eq!(call.args.len(), 2);
        assert_eq!(render(&call.args[0]), "--color");
        assert_eq!(render(&call.args[1]), " red");
    }

    #[test]
    fn nested_functions_keep_structure() {
        let tokens = parse_value("calc(var(--gap) + 1px)").expect("value should tokenize");
        let [ValueToken::Function(calc)] = tokens.as_slice() else {
            panic!("expected a single function token, got {tokens:?}");
        };
        assert_eq!(calc.name, "calc");
        assert!(matches!(
            calc.args[0].first(),
            Some(ValueToken::Function(FunctionToken { name, .. })) if name == "var"
        ));
    }

    #[test]
    fn parenthesis_groups_are_structured() {
        let tokens = parse_value("(1px + 2px) solid").expect("value should tokenize");
        assert!(matches!(tokens.first(), Some(ValueToken::Group(_))));
        assert_eq!(render(&tokens), "(1px + 2px) solid");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(parse_value("\"not closed").is_err());
    }

    #[test]
    fn empty_value_is_empty_sequence() {
        assert!(parse_value("").expect("empty value tokenizes").is_empty());
    }
}
