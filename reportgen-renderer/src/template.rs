//! Placeholder / conditional micro-language.
//!
//! ```text
//! {{name}}                               placeholder
//! {{#if cond}} … {{else}} … {{/if}}      conditional block, else optional
//! ```
//!
//! Names are `[A-Za-z0-9_.-]+`; `else` is reserved. Blocks are flat: a block
//! body may hold text and placeholders but never another block.
//!
//! Text is first split into [`Lexeme`]s. Lexing never fails: a `{{` that does
//! not open a recognised tag is literal text. Parsing into a [`Template`] is
//! strict and reports block-structure mistakes with a 1-based line/column.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{SyntaxErrorKind, TemplateError};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

// ---------------------------------------------------------------------------
// Values and conditions
// ---------------------------------------------------------------------------

/// Placeholder name → replacement text, plus optional registered defaults
/// consulted when a name has no explicit value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values {
    entries: BTreeMap<String, String>,
    defaults: BTreeMap<String, String>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn register_default(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .or_else(|| self.defaults.get(name))
            .map(String::as_str)
    }

    /// Copies every entry and default of `other` over `self`.
    pub fn extend(&mut self, other: &Values) {
        self.entries
            .extend(other.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.defaults
            .extend(other.defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Values {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut values = Values::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}

/// Named booleans driving conditional blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions(BTreeMap<String, bool>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: bool) -> &mut Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: bool) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    pub fn extend(&mut self, other: &Conditions) {
        self.0.extend(other.0.iter().map(|(k, v)| (k.clone(), *v)));
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for Conditions {
    fn from_iter<T: IntoIterator<Item = (K, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// One lexical unit. `raw` is the exact source slice, so re-emitting every
/// lexeme's raw text reproduces the input byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexeme<'a> {
    Text(&'a str),
    Placeholder { name: &'a str, raw: &'a str, offset: usize },
    If { condition: &'a str, raw: &'a str, offset: usize },
    Else { raw: &'a str, offset: usize },
    EndIf { raw: &'a str, offset: usize },
}

impl<'a> Lexeme<'a> {
    pub fn raw(&self) -> &'a str {
        match self {
            Lexeme::Text(raw)
            | Lexeme::Placeholder { raw, .. }
            | Lexeme::If { raw, .. }
            | Lexeme::Else { raw, .. }
            | Lexeme::EndIf { raw, .. } => *raw,
        }
    }
}

/// Split `src` into lexemes. Adjacent literal text may come back as several
/// `Text` pieces.
pub fn lex(src: &str) -> Vec<Lexeme<'_>> {
    let mut out = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(rel) = src[cursor..].find(OPEN) {
        let open = cursor + rel;
        let inner_start = open + OPEN.len();
        let Some(close_rel) = src[inner_start..].find(CLOSE) else {
            break;
        };
        let inner_end = inner_start + close_rel;
        let tag_end = inner_end + CLOSE.len();

        match classify(&src[inner_start..inner_end], &src[open..tag_end], open) {
            Some(lexeme) => {
                if text_start < open {
                    out.push(Lexeme::Text(&src[text_start..open]));
                }
                out.push(lexeme);
                cursor = tag_end;
                text_start = tag_end;
            }
            // Not a tag: keep the braces as text and rescan just past them.
            None => cursor = inner_start,
        }
    }

    if text_start < src.len() {
        out.push(Lexeme::Text(&src[text_start..]));
    }
    out
}

fn classify<'a>(inner: &'a str, raw: &'a str, offset: usize) -> Option<Lexeme<'a>> {
    let trimmed = inner.trim();
    if let Some(rest) = trimmed.strip_prefix("#if") {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return Some(Lexeme::If {
                condition: rest.trim(),
                raw,
                offset,
            });
        }
        return None;
    }
    match trimmed {
        "else" => Some(Lexeme::Else { raw, offset }),
        "/if" => Some(Lexeme::EndIf { raw, offset }),
        name if is_name(name) => Some(Lexeme::Placeholder { name, raw, offset }),
        _ => None,
    }
}

/// Valid placeholder / condition name.
pub fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s != "else"
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
}

/// 1-based (line, column) of a byte offset; columns count characters.
pub fn location(src: &str, offset: usize) -> (usize, usize) {
    let before = &src[..offset.min(src.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

// ---------------------------------------------------------------------------
// Parsed template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Inline {
    Text(String),
    Placeholder { name: String, raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    condition: String,
    line: usize,
    column: usize,
    then: Vec<Inline>,
    otherwise: Option<Vec<Inline>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Inline(Inline),
    Block(Block),
}

/// A parsed template: a flat run of text, placeholders, and conditional blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `src`, rejecting malformed block structure.
    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        let syntax = |offset: usize, kind: SyntaxErrorKind| {
            let (line, column) = location(src, offset);
            TemplateError::Syntax { line, column, kind }
        };

        let mut segments = Vec::new();
        let mut open: Option<(Block, usize)> = None;

        for lexeme in lex(src) {
            match lexeme {
                Lexeme::Text(text) => {
                    push_inline(&mut segments, &mut open, Inline::Text(text.to_string()))
                }
                Lexeme::Placeholder { name, raw, .. } => push_inline(
                    &mut segments,
                    &mut open,
                    Inline::Placeholder {
                        name: name.to_string(),
                        raw: raw.to_string(),
                    },
                ),
                Lexeme::If {
                    condition, offset, ..
                } => {
                    if let Some((outer, _)) = &open {
                        return Err(syntax(
                            offset,
                            SyntaxErrorKind::NestedBlock {
                                outer: outer.condition.clone(),
                            },
                        ));
                    }
                    if condition.is_empty() {
                        return Err(syntax(offset, SyntaxErrorKind::EmptyCondition));
                    }
                    if !is_name(condition) {
                        return Err(syntax(
                            offset,
                            SyntaxErrorKind::InvalidConditionName(condition.to_string()),
                        ));
                    }
                    let (line, column) = location(src, offset);
                    open = Some((
                        Block {
                            condition: condition.to_string(),
                            line,
                            column,
                            then: Vec::new(),
                            otherwise: None,
                        },
                        offset,
                    ));
                }
                Lexeme::Else { offset, .. } => match &mut open {
                    None => return Err(syntax(offset, SyntaxErrorKind::UnexpectedElse)),
                    Some((block, _)) if block.otherwise.is_some() => {
                        return Err(syntax(
                            offset,
                            SyntaxErrorKind::DuplicateElse {
                                condition: block.condition.clone(),
                            },
                        ))
                    }
                    Some((block, _)) => block.otherwise = Some(Vec::new()),
                },
                Lexeme::EndIf { offset, .. } => match open.take() {
                    None => return Err(syntax(offset, SyntaxErrorKind::UnexpectedEndIf)),
                    Some((block, _)) => segments.push(Segment::Block(block)),
                },
            }
        }

        if let Some((block, offset)) = open {
            return Err(syntax(
                offset,
                SyntaxErrorKind::UnclosedBlock {
                    condition: block.condition,
                },
            ));
        }
        Ok(Template { segments })
    }

    /// Every placeholder name the template references, in any branch.
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.inlines()
            .into_iter()
            .filter_map(|inline| match inline {
                Inline::Placeholder { name, .. } => Some(name.as_str()),
                Inline::Text(_) => None,
            })
            .collect()
    }

    /// Every condition name the template's blocks test.
    pub fn conditions(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Block(block) => Some(block.condition.as_str()),
                Segment::Inline(_) => None,
            })
            .collect()
    }

    /// Resolve blocks and substitute placeholders in one pass. Unknown
    /// placeholders stay verbatim; substituted text is never rescanned.
    pub fn render(&self, values: &Values, conditions: &Conditions) -> Result<String, TemplateError> {
        self.emit(conditions, |out, name, raw| {
            out.push_str(values.get(name).unwrap_or(raw))
        })
    }

    /// Resolve blocks only, leaving every placeholder as written.
    pub fn resolve(&self, conditions: &Conditions) -> Result<String, TemplateError> {
        self.emit(conditions, |out, _, raw| out.push_str(raw))
    }

    fn inlines(&self) -> Vec<&Inline> {
        let mut out = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Inline(inline) => out.push(inline),
                Segment::Block(block) => {
                    out.extend(block.then.iter());
                    out.extend(block.otherwise.iter().flatten());
                }
            }
        }
        out
    }

    fn emit<F>(&self, conditions: &Conditions, placeholder: F) -> Result<String, TemplateError>
    where
        F: Fn(&mut String, &str, &str),
    {
        let mut out = String::new();
        let write = |out: &mut String, inline: &Inline| match inline {
            Inline::Text(text) => out.push_str(text),
            Inline::Placeholder { name, raw } => placeholder(out, name, raw),
        };

        for segment in &self.segments {
            match segment {
                Segment::Inline(inline) => write(&mut out, inline),
                Segment::Block(block) => {
                    let flag = conditions.get(&block.condition).ok_or_else(|| {
                        TemplateError::MissingCondition {
                            name: block.condition.clone(),
                            line: block.line,
                            column: block.column,
                        }
                    })?;
                    let branch = if flag {
                        Some(&block.then)
                    } else {
                        block.otherwise.as_ref()
                    };
                    for inline in branch.into_iter().flatten() {
                        write(&mut out, inline);
                    }
                }
            }
        }
        Ok(out)
    }
}

fn push_inline(segments: &mut Vec<Segment>, open: &mut Option<(Block, usize)>, inline: Inline) {
    match open {
        Some((block, _)) => match &mut block.otherwise {
            Some(otherwise) => otherwise.push(inline),
            None => block.then.push(inline),
        },
        None => segments.push(Segment::Inline(inline)),
    }
}

// ---------------------------------------------------------------------------
// Free-standing operations
// ---------------------------------------------------------------------------

/// Replace known placeholders in one non-recursive pass. Block tags and
/// unknown names pass through untouched. Never fails.
pub fn substitute(src: &str, values: &Values) -> String {
    let mut out = String::with_capacity(src.len());
    for lexeme in lex(src) {
        match lexeme {
            Lexeme::Placeholder { name, raw, .. } => out.push_str(values.get(name).unwrap_or(raw)),
            other => out.push_str(other.raw()),
        }
    }
    out
}

/// Resolve every conditional block in `src`, leaving placeholders in place.
pub fn resolve_conditionals(src: &str, conditions: &Conditions) -> Result<String, TemplateError> {
    Template::parse(src)?.resolve(conditions)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn values() -> Values {
        Values::new()
            .with("name", "Hill Country Realty")
            .with("city", "Austin")
    }

    #[test]
    fn substitute_replaces_known_and_keeps_unknown() {
        let out = substitute("{{name}} in {{ city }} | {{unknown}}", &values());
        assert_eq!(out, "Hill Country Realty in Austin | {{unknown}}");
    }

    #[test]
    fn substitute_uses_registered_default() {
        let mut values = Values::new();
        values.register_default("name", "Market Reports");
        assert_eq!(substitute("by {{name}}", &values), "by Market Reports");
        values.insert("name", "Acme");
        assert_eq!(substitute("by {{name}}", &values), "by Acme");
    }

    #[test]
    fn substitute_never_rescans_replacement_text() {
        let values = Values::new()
            .with("a", "{{b}}")
            .with("b", "nope")
            .with("c", "{{#if x}}y{{/if}}");
        assert_eq!(substitute("{{a}}|{{c}}", &values), "{{b}}|{{#if x}}y{{/if}}");
    }

    #[test]
    fn substitute_leaves_block_tags_alone() {
        let src = "{{#if show}}{{name}}{{else}}none{{/if}}";
        assert_eq!(
            substitute(src, &values()),
            "{{#if show}}Hill Country Realty{{else}}none{{/if}}"
        );
    }

    #[rstest]
    #[case("{{ not a tag }}")]
    #[case("{{")]
    #[case("}} stray")]
    #[case("{{#iffy}}")]
    #[case("a {{ {{city}}")]
    fn lexing_is_lossless(#[case] src: &str) {
        let rebuilt: String = lex(src).iter().map(Lexeme::raw).collect();
        assert_eq!(rebuilt, src);
    }

    #[test]
    fn brace_run_before_real_placeholder_still_substitutes() {
        assert_eq!(substitute("a {{ {{city}}", &values()), "a {{ Austin");
    }

    #[test]
    fn conditionals_choose_branches() {
        let src = "[{{#if a}}A{{else}}not A{{/if}}][{{#if b}}B{{/if}}]";
        let both = Conditions::new().with("a", true).with("b", true);
        let neither = Conditions::new().with("a", false).with("b", false);
        assert_eq!(resolve_conditionals(src, &both).unwrap(), "[A][B]");
        assert_eq!(resolve_conditionals(src, &neither).unwrap(), "[not A][]");
    }

    #[test]
    fn else_resolves_regardless_of_preceding_blocks() {
        let mut src = String::new();
        for i in 0..8 {
            src.push_str(&format!("{{{{#if c{i}}}}}{i}{{{{/if}}}}"));
        }
        src.push_str("{{#if last}}yes{{else}}no{{/if}}");

        let mut conditions: Conditions = (0..8).map(|i| (format!("c{i}"), i % 2 == 0)).collect();
        conditions.set("last", false);
        assert_eq!(resolve_conditionals(&src, &conditions).unwrap(), "0246no");
    }

    #[test]
    fn repeated_condition_resolves_each_block() {
        let src = "{{#if x}}1{{/if}}-{{#if x}}2{{else}}3{{/if}}";
        let on = Conditions::new().with("x", true);
        let off = Conditions::new().with("x", false);
        assert_eq!(resolve_conditionals(src, &on).unwrap(), "1-2");
        assert_eq!(resolve_conditionals(src, &off).unwrap(), "-3");
    }

    #[test]
    fn resolve_keeps_placeholders_verbatim() {
        let src = "{{#if x}}{{ name }}{{/if}}";
        let on = Conditions::new().with("x", true);
        assert_eq!(resolve_conditionals(src, &on).unwrap(), "{{ name }}");
    }

    #[test]
    fn render_does_both_in_one_pass() {
        let template = Template::parse("{{#if logo}}<img src=\"{{url}}\">{{else}}{{name}}{{/if}}")
            .expect("parse");
        let values = Values::new().with("url", "{{name}}").with("name", "Acme");
        let on = Conditions::new().with("logo", true);
        assert_eq!(
            template.render(&values, &on).unwrap(),
            "<img src=\"{{name}}\">"
        );
    }

    #[test]
    fn missing_condition_reports_location() {
        let err = resolve_conditionals("line one\n  {{#if ghost}}x{{/if}}", &Conditions::new())
            .unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingCondition {
                name: "ghost".into(),
                line: 2,
                column: 3
            }
        );
    }

    #[rstest]
    #[case("{{#if a}}x", 1, 1, SyntaxErrorKind::UnclosedBlock { condition: "a".into() })]
    #[case("x\n{{else}}", 2, 1, SyntaxErrorKind::UnexpectedElse)]
    #[case("ab{{/if}}", 1, 3, SyntaxErrorKind::UnexpectedEndIf)]
    #[case(
        "{{#if a}}{{else}}{{else}}{{/if}}",
        1,
        18,
        SyntaxErrorKind::DuplicateElse { condition: "a".into() }
    )]
    #[case(
        "{{#if a}}\n  {{#if b}}{{/if}}{{/if}}",
        2,
        3,
        SyntaxErrorKind::NestedBlock { outer: "a".into() }
    )]
    #[case("{{#if   }}{{/if}}", 1, 1, SyntaxErrorKind::EmptyCondition)]
    #[case(
        "é {{#if a b}}{{/if}}",
        1,
        3,
        SyntaxErrorKind::InvalidConditionName("a b".into())
    )]
    fn malformed_blocks_are_located(
        #[case] src: &str,
        #[case] line: usize,
        #[case] column: usize,
        #[case] kind: SyntaxErrorKind,
    ) {
        assert_eq!(
            Template::parse(src).unwrap_err(),
            TemplateError::Syntax { line, column, kind }
        );
    }

    #[test]
    fn introspection_lists_names() {
        let template =
            Template::parse("{{a}}{{#if c1}}{{b}}{{else}}{{d}}{{/if}}{{#if c2}}{{/if}}{{a}}")
                .expect("parse");
        assert_eq!(
            template.placeholders().into_iter().collect::<Vec<_>>(),
            ["a", "b", "d"]
        );
        assert_eq!(
            template.conditions().into_iter().collect::<Vec<_>>(),
            ["c1", "c2"]
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let template = Template::parse("{{#if a}}{{name}}{{/if}} {{city}}").expect("parse");
        let conditions = Conditions::new().with("a", true);
        let first = template.render(&values(), &conditions).unwrap();
        let second = template.render(&values(), &conditions).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "Hill Country Realty Austin");
    }
}
