//! `{variable}` substitution for prompt templates.
//!
//! - `{name}` substitutes the value of `name` (surrounding whitespace inside
//!   the braces is ignored)
//! - `{{` renders as `{`, `}}` renders as `}`
//! - a lone `}` is kept as is
//!
//! Substituted values are inserted verbatim and never re-scanned, so file
//! contents full of braces are safe to pass through. Undefined variables are
//! an error rather than an empty substitution.

use std::collections::HashMap;
use thiserror::Error;

/// Error type for template rendering failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("undefined variable '{name}' at position {position} in template")]
    UndefinedVariable { name: String, position: usize },

    #[error("unmatched '{{' at position {position} in template")]
    UnmatchedBrace { position: usize },

    #[error("empty variable name '{{}}' at position {position} in template")]
    EmptyVariableName { position: usize },
}

/// A piece of a parsed template.
#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Text(char),
    Variable { name: &'a str, position: usize },
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut segments = Vec::new();
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                segments.push(Segment::Text('{'));
            }
            '{' => {
                let start = pos + ch.len_utf8();
                let end = loop {
                    match chars.next() {
                        Some((close, '}')) => break close,
                        Some(_) => {}
                        None => return Err(TemplateError::UnmatchedBrace { position: pos }),
                    }
                };
                let name = template[start..end].trim();
                if name.is_empty() {
                    return Err(TemplateError::EmptyVariableName { position: pos });
                }
                segments.push(Segment::Variable {
                    name,
                    position: pos,
                });
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                }
                segments.push(Segment::Text('}'));
            }
            _ => segments.push(Segment::Text(ch)),
        }
    }

    Ok(segments)
}

/// Render `template`, substituting every `{variable}` from `variables`.
pub fn render_template(
    template: &str,
    variables: &HashMap<&str, &str>,
) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Text(ch) => rendered.push(ch),
            Segment::Variable { name, position } => match variables.get(name) {
                Some(value) => rendered.push_str(value),
                None => {
                    return Err(TemplateError::UndefinedVariable {
                        name: name.to_string(),
                        position,
                    });
                }
            },
        }
    }
    Ok(rendered)
}

/// Names referenced by `template`, in order of first appearance.
pub fn template_variables(template: &str) -> Result<Vec<String>, TemplateError> {
    let mut names: Vec<String> = Vec::new();
    for segment in parse(template)? {
        if let Segment::Variable { name, .. } = segment
            && !names.iter().any(|n| n == name)
        {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(pairs: &[(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_simple_substitution() {
        let result = render_template(
            "{instructions}\n\n{content}",
            &vars(&[("instructions", "Be terse."), ("content", "fn main() {}")]),
        )
        .unwrap();
        assert_eq!(result, "Be terse.\n\nfn main() {}");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let result = render_template("{content}", &vars(&[("content", "{feedback} {{x}}")]))
            .unwrap();
        assert_eq!(result, "{feedback} {{x}}");
    }

    #[test]
    fn test_escapes() {
        let result = render_template("Use {{var}} and a }} b }", &HashMap::new()).unwrap();
        assert_eq!(result, "Use {var} and a } b }");
    }

    #[test]
    fn test_whitespace_in_name_is_trimmed() {
        let result = render_template("{ name }", &vars(&[("name", "x")])).unwrap();
        assert_eq!(result, "x");
    }

    #[test]
    fn test_undefined_variable_error() {
        let err = render_template("Hello {name}", &HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UndefinedVariable {
                name: "name".to_string(),
                position: 6
            }
        );
        assert!(err.to_string().contains("undefined variable 'name'"));
    }

    #[test]
    fn test_unmatched_brace_error() {
        let err = render_template("Hello {name", &HashMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::UnmatchedBrace { position: 6 });
    }

    #[test]
    fn test_empty_variable_name_error() {
        let err = render_template("Hello {  }", &HashMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::EmptyVariableName { position: 6 });
    }

    #[test]
    fn test_unicode_text_is_preserved() {
        let result = render_template("résumé → {x}", &vars(&[("x", "✓")])).unwrap();
        assert_eq!(result, "résumé → ✓");
    }

    #[test]
    fn test_template_variables_in_order() {
        let names = template_variables("{content} {instructions} {content} {{literal}}").unwrap();
        assert_eq!(names, vec!["content", "instructions"]);
    }
}
