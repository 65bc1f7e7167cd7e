//! Public `parse()`/`execute()` surface (spec §6). Wraps the segmenter, AST
//! builder, and clause pipeline behind a single entry point each, and runs
//! the strict-dialect extension-detection probes before building the AST.

use std::collections::BTreeMap;

use crate::ast::{self, Query};
use crate::error::{CypCode, Diagnostic, Error};
use crate::executor;
use crate::row::Row;
use crate::scan::{self, LevelMap};
use crate::segment;
use crate::span::Span;
use crate::store::Graph;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Strict,
    Relaxed,
}

/// Extension syntaxes gated behind the strict dialect (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnabledFeatures {
    pub exists_subquery: bool,
    pub call_in_transactions: bool,
    pub pattern_comprehension: bool,
    pub use_clause: bool,
}

impl EnabledFeatures {
    pub fn all() -> Self {
        Self {
            exists_subquery: true,
            call_in_transactions: true,
            pattern_comprehension: true,
            use_clause: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub dialect: Dialect,
    pub enabled_features: EnabledFeatures,
    pub recover_errors: bool,
}

impl ParseOptions {
    /// Strict dialect, no extensions enabled, errors abort the parse.
    pub fn strict() -> Self {
        Self {
            dialect: Dialect::Strict,
            enabled_features: EnabledFeatures::default(),
            recover_errors: false,
        }
    }

    /// Relaxed dialect; all extensions implicitly enabled.
    pub fn relaxed() -> Self {
        Self {
            dialect: Dialect::Relaxed,
            enabled_features: EnabledFeatures::all(),
            recover_errors: false,
        }
    }

    fn effective_features(&self) -> EnabledFeatures {
        match self.dialect {
            Dialect::Relaxed => EnabledFeatures::all(),
            Dialect::Strict => self.enabled_features,
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::strict()
    }
}

/// Configuration surface for [`execute`], mirroring the teacher's
/// builder-style `Params` struct: a plain, `Default`-able struct that wraps
/// the parse-time options rather than a config-file/env-var layer, since
/// this is an embedded library with no outer process to configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecuteOptions {
    pub parse: ParseOptions,
}

impl ExecuteOptions {
    pub fn new(parse: ParseOptions) -> Self {
        Self { parse }
    }
}

impl From<ParseOptions> for ExecuteOptions {
    fn from(parse: ParseOptions) -> Self {
        Self { parse }
    }
}

/// A parsed document: one [`Query`] per `;`-separated statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub statements: Vec<Query>,
}

pub struct ParseOutcome {
    pub document: Option<Document>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ExecuteOutcome {
    pub parse_result: ParseOutcome,
    pub rows: Vec<BTreeMap<String, Value>>,
    pub columns: Vec<String>,
    pub runtime_errors: Vec<String>,
}

/// Parses `text` into a [`Document`], per spec §6.
pub fn parse(text: &str, options: &ParseOptions) -> ParseOutcome {
    let stripped = segment::strip_line_comments(text);
    let mut diagnostics = run_feature_probes(&stripped, &options.effective_features());

    let segmented = segment::segment(&stripped);
    diagnostics.extend(segmented.diagnostics);

    let mut statements = Vec::with_capacity(segmented.statements.len());
    let mut hard_failure = false;
    for statement in &segmented.statements {
        match ast::build_query_checked(statement, &mut diagnostics) {
            Ok(query) => statements.push(query),
            Err(Error::Parse(diag)) => {
                diagnostics.push(diag);
                hard_failure = true;
            }
            Err(other) => {
                let span = statement_span(statement);
                diagnostics.push(Diagnostic::new(CypCode::UnexpectedTokens, other.to_string(), span));
                hard_failure = true;
            }
        }
    }

    let has_error = hard_failure || diagnostics.iter().any(|d| d.is_error());
    let document = if has_error && !options.recover_errors {
        None
    } else {
        Some(Document { statements })
    };
    ParseOutcome { document, diagnostics }
}

fn statement_span(statement: &segment::LexedStatement) -> Span {
    match (statement.clauses.first(), statement.clauses.last()) {
        (Some(first), Some(last)) => Span::new(first.span.start, last.span.end),
        _ => Span::point(0),
    }
}

/// Runs every parsed statement against `graph` in sequence (spec §5: a
/// single `execute` call has exclusive mutable access for its duration).
/// Execution stops at the first statement that errors; later statements are
/// not attempted and mutations from earlier statements are kept (spec §5
/// failure model — no rollback). The returned rows/columns are those of the
/// last statement that ran.
pub fn execute(text: &str, graph: &mut Graph, parameters: &BTreeMap<String, Value>, options: impl Into<ExecuteOptions>) -> ExecuteOutcome {
    let options = options.into();
    let parse_result = parse(text, &options.parse);
    let Some(document) = &parse_result.document else {
        return ExecuteOutcome {
            rows: Vec::new(),
            columns: Vec::new(),
            runtime_errors: Vec::new(),
            parse_result,
        };
    };

    let mut rows = Vec::new();
    let mut columns = Vec::new();
    let mut runtime_errors = Vec::new();
    for query in &document.statements {
        match executor::execute_query(graph, query, vec![Row::empty()], parameters) {
            Ok(outcome) => {
                columns = outcome.columns;
                rows = outcome
                    .rows
                    .into_iter()
                    .map(|row| row.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
                    .collect();
            }
            Err(e) => {
                runtime_errors.push(e.to_string());
                break;
            }
        }
    }

    ExecuteOutcome {
        parse_result,
        rows,
        columns,
        runtime_errors,
    }
}

fn run_feature_probes(text: &str, features: &EnabledFeatures) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let level = LevelMap::compute(text);

    if !features.exists_subquery {
        if let Some(span) = probe_exists_subquery(text, &level) {
            diags.push(Diagnostic::new(CypCode::ExistsSubqueryDisabled, "EXISTS { ... } subqueries are disabled in strict dialect", span));
        }
    }
    if !features.call_in_transactions {
        if let Some(span) = probe_call_in_transactions(text, &level) {
            diags.push(Diagnostic::new(CypCode::CallInTransactionsDisabled, "CALL { ... } IN TRANSACTIONS is disabled in strict dialect", span));
        }
    }
    if !features.pattern_comprehension {
        if let Some(span) = probe_pattern_comprehension(text, &level) {
            diags.push(Diagnostic::new(CypCode::PatternComprehensionDisabled, "pattern comprehensions are disabled in strict dialect", span));
        }
    }
    if !features.use_clause {
        if let Some(span) = probe_use_clause(text, &level) {
            diags.push(Diagnostic::new(CypCode::UseClauseDisabled, "USE clause is disabled in strict dialect", span));
        }
    }
    diags
}

/// `EXISTS {` at a top-level word boundary, ignoring whitespace between the
/// keyword and the brace.
fn probe_exists_subquery(text: &str, level: &LevelMap) -> Option<Span> {
    for (pos, _) in text.char_indices() {
        if let Some(end) = scan::match_word(text, level, pos, "EXISTS") {
            let rest_start = scan::skip_required_whitespace(text, end).unwrap_or(end);
            if text[rest_start..].starts_with('{') {
                return Some(Span::new(pos, rest_start + 1));
            }
        }
    }
    None
}

/// A top-level `IN TRANSACTIONS` keyword sequence, which only occurs after
/// `CALL { ... }` in valid syntax.
fn probe_call_in_transactions(text: &str, level: &LevelMap) -> Option<Span> {
    for (pos, _) in text.char_indices() {
        if let Some(end) = scan::match_word_sequence(text, level, pos, &["IN", "TRANSACTIONS"]) {
            return Some(Span::new(pos, end));
        }
    }
    None
}

/// Brackets containing a top-level `|` whose left side contains both `(`
/// and `-` and no top-level `IN` keyword — distinguishes pattern
/// comprehension `[pattern | proj]` from list comprehension `[x IN xs | f]`.
fn probe_pattern_comprehension(text: &str, level: &LevelMap) -> Option<Span> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if level.is_top_level(i) && bytes[i] == b'[' {
            if let Some(close) = matching_bracket(text, i) {
                let inner = &text[i + 1..close];
                let inner_level = LevelMap::compute(inner);
                if let Some(pipe) = scan::find_top_level_char(inner, &inner_level, 0, '|') {
                    let left = &inner[..pipe];
                    let has_paren = left.contains('(');
                    let has_dash = left.contains('-');
                    let has_in = (0..left.len()).any(|p| left.is_char_boundary(p) && scan::match_word(left, &inner_level, p, "IN").is_some());
                    if has_paren && has_dash && !has_in {
                        return Some(Span::new(i, close + 1));
                    }
                }
            }
        }
        i += 1;
    }
    None
}

fn matching_bracket(text: &str, open_pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open_pos) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' && q != b'`' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn probe_use_clause(text: &str, level: &LevelMap) -> Option<Span> {
    let trimmed_start = text.find(|c: char| !c.is_whitespace())?;
    let end = scan::match_word(text, level, trimmed_start, "USE")?;
    Some(Span::new(trimmed_start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relaxed_dialect_enables_all_features() {
        let outcome = parse("MATCH (n) WHERE EXISTS { MATCH (n)-->(m) } RETURN n", &ParseOptions::relaxed());
        assert!(outcome.document.is_some());
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn strict_dialect_flags_exists_subquery() {
        let outcome = parse("MATCH (n) WHERE EXISTS { MATCH (n)-->(m) } RETURN n", &ParseOptions::strict());
        assert!(outcome.document.is_none());
        assert!(outcome.diagnostics.iter().any(|d| d.code == CypCode::ExistsSubqueryDisabled));
    }

    #[test]
    fn execute_runs_parsed_query_against_graph() {
        let mut graph = Graph::new();
        let params = BTreeMap::new();
        let outcome = execute("UNWIND [1,2,3] AS n RETURN n", &mut graph, &params, ParseOptions::relaxed());
        assert_eq!(outcome.columns, vec!["n".to_string()]);
        assert_eq!(outcome.rows.len(), 3);
        assert!(outcome.runtime_errors.is_empty());
    }

    #[test]
    fn execute_reports_parse_error_without_running() {
        let mut graph = Graph::new();
        let params = BTreeMap::new();
        let outcome = execute("RETURN (", &mut graph, &params, ParseOptions::relaxed());
        assert!(outcome.parse_result.document.is_none());
        assert!(outcome.rows.is_empty());
        assert!(outcome.runtime_errors.is_empty());
    }

    #[test]
    fn execute_accepts_execute_options_directly() {
        let mut graph = Graph::new();
        let params = BTreeMap::new();
        let options = ExecuteOptions::new(ParseOptions::relaxed());
        let outcome = execute("UNWIND [1,2,3] AS n RETURN n", &mut graph, &params, options);
        assert_eq!(outcome.rows.len(), 3);
    }
}
