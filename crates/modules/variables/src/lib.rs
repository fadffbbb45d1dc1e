//! CSS Custom Properties for Cascading Variables — `var()` substitution.
//! Spec: <https://www.w3.org/TR/css-variables-1/>

#![forbid(unsafe_code)]

use props_syntax::{FunctionToken, ValueToken, render};
use std::collections::HashMap;

/// A flat table of custom property definitions.
///
/// Keys are property names including the leading `--`; values are the
/// tokenized defining value. Later inserts overwrite earlier ones.
pub type CustomProperties = HashMap<String, Vec<ValueToken>>;

/// Whether a property name is a custom property: `--`, an ASCII letter, then
/// letters, digits, `_` or `-`.
///
/// Spec: <https://www.w3.org/TR/css-variables-1/#custom-properties>
pub fn is_custom_property_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("--") else {
        return false;
    };
    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphabetic() && chars.all(is_name_char)
}

fn is_name_char(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_' || character == '-'
}

/// Resolve `var()` references in a token sequence against a property table.
///
/// Produces a new sequence; the input is never mutated. For each `var()`
/// call (nested calls inside other functions' arguments and parenthesis
/// groups included):
///
/// - a name already being expanded on the current path is circular and the
///   call is kept verbatim, while sibling tokens keep resolving;
/// - a name present in the table is replaced by its recursively resolved
///   definition;
/// - a missing name with a fallback is replaced by the recursively resolved
///   fallback;
/// - a missing name without a fallback keeps the call as written.
///
/// Resolution is a pure function of the inputs; cycles are bounded by the
/// path-local reference stack, not a depth counter.
///
/// Spec: <https://www.w3.org/TR/css-variables-1/#using-variables> and
/// <https://www.w3.org/TR/css-variables-1/#cycles>
pub fn resolve_references(tokens: &[ValueToken], table: &CustomProperties) -> Vec<ValueToken> {
    resolve_sequence(tokens, table, &mut Vec::new())
}

/// Internal recursive walk carrying the in-flight reference stack.
fn resolve_sequence(
    tokens: &[ValueToken],
    table: &CustomProperties,
    stack: &mut Vec<String>,
) -> Vec<ValueToken> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            ValueToken::Function(call) if call.name.eq_ignore_ascii_case("var") => {
                out.extend(resolve_var_call(call, table, stack));
            }
            ValueToken::Function(call) => {
                let args = call
                    .args
                    .iter()
                    .map(|arg| resolve_sequence(arg, table, stack))
                    .collect();
                out.push(ValueToken::Function(FunctionToken {
                    name: call.name.clone(),
                    args,
                }));
            }
            ValueToken::Group(inner) => {
                out.push(ValueToken::Group(resolve_sequence(inner, table, stack)));
            }
            other => out.push(other.clone()),
        }
    }
    out
}

/// Resolve one `var(--name[, fallback...])` call into its replacement tokens.
fn resolve_var_call(
    call: &FunctionToken,
    table: &CustomProperties,
    stack: &mut Vec<String>,
) -> Vec<ValueToken> {
    let name = call
        .args
        .first()
        .map(|arg| render(arg).trim().to_owned())
        .unwrap_or_default();

    if stack.contains(&name) {
        log::debug!("circular custom property reference: {name}");
        return vec![ValueToken::Function(call.clone())];
    }

    if let Some(definition) = table.get(&name) {
        stack.push(name);
        let resolved = resolve_sequence(definition, table, stack);
        stack.pop();
        return trim_edges(&resolved);
    }

    if call.args.len() > 1 {
        let fallback = join_arguments(&call.args[1..]);
        return trim_edges(&resolve_sequence(&fallback, table, stack));
    }

    vec![ValueToken::Function(call.clone())]
}

/// Re-join argument runs with the commas the tokenizer split them on.
fn join_arguments(args: &[Vec<ValueToken>]) -> Vec<ValueToken> {
    let mut out = Vec::new();
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            out.push(ValueToken::Delim(",".to_owned()));
        }
        out.extend(arg.iter().cloned());
    }
    out
}

/// Drop leading and trailing whitespace tokens from a spliced replacement.
fn trim_edges(tokens: &[ValueToken]) -> Vec<ValueToken> {
    let not_space = |token: &&ValueToken| !matches!(token, ValueToken::Whitespace(_));
    let Some(start) = tokens.iter().position(|token| not_space(&token)) else {
        return Vec::new();
    };
    let end = tokens
        .iter()
        .rposition(|token| not_space(&token))
        .map_or(tokens.len(), |pos| pos + 1);
    tokens[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::{CustomProperties, is_custom_property_name, resolve_references};
    use props_syntax::{parse_value, render};

    fn table(entries: &[(&str, &str)]) -> CustomProperties {
        entries
            .iter()
            .map(|(name, value)| {
                let tokens = parse_value(value).expect("definition should tokenize");
                ((*name).to_owned(), tokens)
            })
            .collect()
    }

    fn resolve_text(value: &str, table: &CustomProperties) -> String {
        let tokens = parse_value(value).expect("value should tokenize");
        render(&resolve_references(&tokens, table))
    }

    #[test]
    fn name_pattern_is_enforced() {
        assert!(is_custom_property_name("--color"));
        assert!(is_custom_property_name("--Main-Color_2"));
        assert!(!is_custom_property_name("color"));
        assert!(!is_custom_property_name("--"));
        assert!(!is_custom_property_name("--1st"));
        assert!(!is_custom_property_name("--a b"));
    }

    #[test]
    fn values_without_references_are_identity() {
        let properties = table(&[("--color", "green")]);
        assert_eq!(resolve_text("1px solid red", &properties), "1px solid red");
        assert_eq!(resolve_text("calc(100% - 8px)", &properties), "calc(100% - 8px)");
    }

    #[test]
    fn direct_reference_substitutes() {
        let properties = table(&[("--color", "green")]);
        assert_eq!(resolve_text("var(--color)", &properties), "green");
    }

    #[test]
    fn chained_references_substitute() {
        let properties = table(&[("--color", "green"), ("--ref-color", "var(--color)")]);
        assert_eq!(resolve_text("var(--ref-color)", &properties), "green");
    }

    #[test]
    fn circular_references_stay_unchanged() {
        let properties = table(&[("--circular", "var(--circular-2)"), ("--circular-2", "var(--circular)")]);
        assert_eq!(resolve_text("var(--circular)", &properties), "var(--circular)");
    }

    #[test]
    fn self_reference_stays_unchanged() {
        let properties = table(&[("--loop", "var(--loop)")]);
        assert_eq!(resolve_text("var(--loop)", &properties), "var(--loop)");
    }

    #[test]
    fn fallback_is_used_when_missing() {
        let properties = CustomProperties::new();
        assert_eq!(resolve_text("var(--missing, red)", &properties), "red");
    }

    #[test]
    fn fallback_resolves_its_own_references() {
        let properties = table(&[("--color", "green")]);
        assert_eq!(resolve_text("var(--missing, var(--color))", &properties), "green");
    }

    #[test]
    fn fallback_with_commas_is_rejoined() {
        let properties = CustomProperties::new();
        assert_eq!(
            resolve_text("var(--font, \"Helvetica\", sans-serif)", &properties),
            "\"Helvetica\", sans-serif"
        );
    }

    #[test]
    fn missing_without_fallback_stays() {
        let properties = CustomProperties::new();
        assert_eq!(resolve_text("var(--missing)", &properties), "var(--missing)");
    }

    #[test]
    fn nested_references_inside_functions_resolve() {
        let properties = table(&[("--gap", "8px")]);
        assert_eq!(
            resolve_text("calc(var(--gap) * 2)", &properties),
            "calc(8px * 2)"
        );
    }

    #[test]
    fn references_inside_groups_resolve() {
        let properties = table(&[("--gap", "8px")]);
        assert_eq!(
            resolve_text("(var(--gap) + 1px)", &properties),
            "(8px + 1px)"
        );
    }

    #[test]
    fn function_name_match_is_case_insensitive() {
        let properties = table(&[("--color", "green")]);
        assert_eq!(resolve_text("VAR(--color)", &properties), "green");
    }

    #[test]
    fn sibling_references_resolve_independently() {
        let properties = table(&[("--gap", "8px")]);
        assert_eq!(
            resolve_text("var(--gap) var(--gap)", &properties),
            "8px 8px"
        );
    }
}
