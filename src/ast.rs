//! AST builder and ordering validation (spec §4.3): maps each lexed clause
//! to a typed node, then checks the inter-clause ordering rules.

use std::collections::HashSet;

use crate::error::{CypCode, Diagnostic, Error, Result};
use crate::expr::{parse::parse_spanned, Expr, SpannedExpr};
use crate::pattern::{self, PatternChain};
use crate::segment::{LexedClause, LexedStatement, OnSuffix};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OrderKey {
    pub expr: SpannedExpr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProjectionItem {
    pub expr: SpannedExpr,
    pub alias: String,
    pub is_star: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum SetItem {
    SetProperty { target: SpannedExpr, property: String, value: SpannedExpr },
    SetLabels { variable: String, labels: Vec<String> },
    MergeMap { variable: String, value: SpannedExpr },
    ReplaceMap { variable: String, value: SpannedExpr },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum RemoveItem {
    Property { target: SpannedExpr, property: String },
    Labels { variable: String, labels: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct YieldItem {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum ClauseKind {
    Match { optional: bool, patterns: Vec<PatternChain> },
    Where { expr: SpannedExpr },
    With { items: Vec<ProjectionItem>, distinct: bool },
    Return { items: Vec<ProjectionItem>, distinct: bool },
    OrderBy { keys: Vec<OrderKey> },
    Skip { expr: SpannedExpr },
    Limit { expr: SpannedExpr },
    Unwind { expr: SpannedExpr, variable: String },
    Create { patterns: Vec<PatternChain> },
    Merge { pattern: PatternChain },
    Set { items: Vec<SetItem>, on_suffix: Option<OnSuffixKind> },
    Remove { items: Vec<RemoveItem> },
    Delete { detach: bool, targets: Vec<SpannedExpr> },
    Call { name: String, args: Vec<SpannedExpr>, yield_items: Option<Vec<YieldItem>>, yield_star: bool },
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum OnSuffixKind {
    Create,
    Match,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClauseNode {
    #[serde(rename = "type")]
    pub type_name: String,
    pub keyword: String,
    pub body: String,
    pub span: Span,
    #[serde(flatten)]
    pub kind: ClauseKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum UnionKind {
    Union,
    UnionAll,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct QueryPart {
    pub clauses: Vec<ClauseNode>,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct Query {
    pub parts: Vec<QueryPart>,
    pub unions: Vec<UnionKind>,
}

impl Query {
    pub fn all_clauses(&self) -> impl Iterator<Item = &ClauseNode> {
        self.parts.iter().flat_map(|p| p.clauses.iter())
    }
}

fn clause_type_name(keyword: &str) -> &'static str {
    match keyword {
        "MATCH" | "OPTIONAL MATCH" => "Match",
        "WHERE" => "Where",
        "WITH" => "With",
        "RETURN" => "Return",
        "ORDER BY" => "OrderBy",
        "SKIP" => "Skip",
        "LIMIT" => "Limit",
        "UNWIND" => "Unwind",
        "CREATE" => "Create",
        "MERGE" => "Merge",
        "SET" => "Set",
        "REMOVE" => "Remove",
        "DELETE" | "DETACH DELETE" => "Delete",
        "CALL" => "Call",
        _ => "Unknown",
    }
}

fn parse_patterns(body: &str, base: usize) -> Result<Vec<PatternChain>> {
    crate::scan::split_top_level(body, ',')
        .into_iter()
        .map(|p| pattern::parse_pattern_chain(p, Span::new(base, base + body.len())))
        .collect()
}

/// Parses comma-separated `expr [AS alias]` projection items, flagging
/// duplicate aliases as CYP301 (spec §4.3).
fn parse_projection(body: &str, base: usize, diags: &mut Vec<Diagnostic>) -> Result<Vec<ProjectionItem>> {
    let mut items = Vec::new();
    let mut seen_aliases: HashSet<String> = HashSet::new();
    for part in crate::scan::split_top_level(body, ',') {
        let part = part.trim();
        if part == "*" {
            items.push(ProjectionItem {
                expr: SpannedExpr { expr: Expr::Variable("*".to_string()), span: Span::new(base, base), text: "*".to_string() },
                alias: "*".to_string(),
                is_star: true,
            });
            continue;
        }
        let level = crate::scan::LevelMap::compute(part);
        let as_pos = (0..part.len()).find_map(|i| crate::scan::match_word(part, &level, i, "AS").map(|end| (i, end)));
        let (expr_text, alias) = match as_pos {
            Some((start, end)) => {
                let alias = part[end..].trim().trim_matches('`').to_string();
                (part[..start].trim(), alias)
            }
            None => (part, implicit_alias(part)),
        };
        if !seen_aliases.insert(alias.clone()) {
            diags.push(Diagnostic::new(CypCode::DuplicateAlias, format!("duplicate alias \"{alias}\""), Span::new(base, base + body.len())));
        }
        let spanned = parse_spanned(expr_text, base)?;
        items.push(ProjectionItem { expr: spanned, alias, is_star: false });
    }
    Ok(items)
}

/// The implicit alias for a projection item with no `AS`: the trimmed
/// expression text, or the bare property name for `n.prop` (spec §4.6).
fn implicit_alias(expr_text: &str) -> String {
    let trimmed = expr_text.trim();
    if let Some(dot) = crate::scan::rfind_top_level_char(trimmed, &crate::scan::LevelMap::compute(trimmed), '.') {
        let prop = trimmed[dot + 1..].trim();
        if !prop.is_empty() && prop.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return prop.to_string();
        }
    }
    trimmed.to_string()
}

fn parse_order_by(body: &str, base: usize) -> Result<Vec<OrderKey>> {
    crate::scan::split_top_level(body, ',')
        .into_iter()
        .map(|part| {
            let part = part.trim();
            let level = crate::scan::LevelMap::compute(part);
            let (expr_text, descending) = if let Some(end) = (0..part.len()).rev().find_map(|i| crate::scan::match_word(part, &level, i, "DESC").or_else(|| crate::scan::match_word(part, &level, i, "DESCENDING"))) {
                let _ = end;
                (strip_trailing_word(part, &["DESC", "DESCENDING"]), true)
            } else if let Some(stripped) = strip_trailing_word_opt(part, &["ASC", "ASCENDING"]) {
                (stripped, false)
            } else {
                (part.to_string(), false)
            };
            Ok(OrderKey { expr: parse_spanned(expr_text.trim(), base)?, descending })
        })
        .collect()
}

fn strip_trailing_word_opt(text: &str, words: &[&str]) -> Option<String> {
    let level = crate::scan::LevelMap::compute(text);
    for w in words {
        for i in 0..text.len() {
            if let Some(end) = crate::scan::match_word(text, &level, i, w) {
                if text[end..].trim().is_empty() && !text[..i].trim().is_empty() {
                    return Some(text[..i].trim().to_string());
                }
            }
        }
    }
    None
}

fn strip_trailing_word(text: &str, words: &[&str]) -> String {
    strip_trailing_word_opt(text, words).unwrap_or_else(|| text.to_string())
}

fn parse_unwind(body: &str, base: usize) -> Result<(SpannedExpr, String)> {
    let level = crate::scan::LevelMap::compute(body);
    let (pos, end) = (0..body.len())
        .find_map(|i| crate::scan::match_word(body, &level, i, "AS").map(|e| (i, e)))
        .ok_or_else(|| Error::other("UNWIND requires an AS clause"))?;
    let expr = parse_spanned(body[..pos].trim(), base)?;
    let variable = body[end..].trim().trim_matches('`').to_string();
    Ok((expr, variable))
}

fn parse_set_items(body: &str, base: usize) -> Result<Vec<SetItem>> {
    crate::scan::split_top_level(body, ',')
        .into_iter()
        .map(|part| parse_set_item(part.trim(), base))
        .collect()
}

fn parse_set_item(part: &str, base: usize) -> Result<SetItem> {
    let level = crate::scan::LevelMap::compute(part);
    if let Some(plus_eq) = part.find("+=") {
        if level.is_top_level(plus_eq) {
            let variable = part[..plus_eq].trim().trim_matches('`').to_string();
            let value = parse_spanned(part[plus_eq + 2..].trim(), base)?;
            return Ok(SetItem::MergeMap { variable, value });
        }
    }
    if let Some(colon) = crate::scan::find_top_level_char(part, &level, 0, ':') {
        let variable = part[..colon].trim().trim_matches('`').to_string();
        if !variable.is_empty() && !variable.contains('.') {
            let mut labels = Vec::new();
            let mut rest = &part[colon..];
            while let Some(stripped) = rest.strip_prefix(':') {
                let end = stripped.find(':').unwrap_or(stripped.len());
                labels.push(stripped[..end].trim().to_string());
                rest = &stripped[end..];
            }
            return Ok(SetItem::SetLabels { variable, labels });
        }
    }
    if let Some(eq) = crate::scan::find_top_level_char(part, &level, 0, '=') {
        let left = part[..eq].trim();
        let right = parse_spanned(part[eq + 1..].trim(), base)?;
        if let Some(dot) = crate::scan::rfind_top_level_char(left, &crate::scan::LevelMap::compute(left), '.') {
            let target = parse_spanned(left[..dot].trim(), base)?;
            let property = left[dot + 1..].trim().trim_matches('`').to_string();
            return Ok(SetItem::SetProperty { target, property, value: right });
        }
        let variable = left.trim_matches('`').to_string();
        return Ok(SetItem::ReplaceMap { variable, value: right });
    }
    Err(Error::other("Invalid pattern in SET"))
}

fn parse_remove_items(body: &str, base: usize) -> Result<Vec<RemoveItem>> {
    crate::scan::split_top_level(body, ',')
        .into_iter()
        .map(|part| parse_remove_item(part.trim(), base))
        .collect()
}

fn parse_remove_item(part: &str, base: usize) -> Result<RemoveItem> {
    let level = crate::scan::LevelMap::compute(part);
    if let Some(colon) = crate::scan::find_top_level_char(part, &level, 0, ':') {
        let variable = part[..colon].trim().trim_matches('`').to_string();
        let mut labels = Vec::new();
        let mut rest = &part[colon..];
        while let Some(stripped) = rest.strip_prefix(':') {
            let end = stripped.find(':').unwrap_or(stripped.len());
            labels.push(stripped[..end].trim().to_string());
            rest = &stripped[end..];
        }
        return Ok(RemoveItem::Labels { variable, labels });
    }
    if let Some(dot) = crate::scan::rfind_top_level_char(part, &level, '.') {
        let target = parse_spanned(part[..dot].trim(), base)?;
        let property = part[dot + 1..].trim().trim_matches('`').to_string();
        return Ok(RemoveItem::Property { target, property });
    }
    Err(Error::other("Unsupported REMOVE item"))
}

fn parse_delete_targets(body: &str, base: usize) -> Result<Vec<SpannedExpr>> {
    crate::scan::split_top_level(body, ',')
        .into_iter()
        .map(|p| parse_spanned(p.trim(), base))
        .collect()
}

fn parse_call(body: &str, base: usize) -> Result<(String, Vec<SpannedExpr>, Option<Vec<YieldItem>>, bool)> {
    let level = crate::scan::LevelMap::compute(body);
    let (head, yield_part) = match (0..body.len()).find_map(|i| crate::scan::match_word(body, &level, i, "YIELD").map(|e| (i, e))) {
        Some((pos, end)) => (body[..pos].trim(), Some(body[end..].trim())),
        None => (body.trim(), None),
    };
    let (name, args) = if let Some(paren) = head.find('(') {
        if head.ends_with(')') {
            let name = head[..paren].trim().to_string();
            let args_text = &head[paren + 1..head.len() - 1];
            let args = if args_text.trim().is_empty() {
                Vec::new()
            } else {
                crate::scan::split_top_level(args_text, ',')
                    .into_iter()
                    .map(|a| parse_spanned(a.trim(), base))
                    .collect::<Result<Vec<_>>>()?
            };
            (name, args)
        } else {
            return Err(Error::other("Unsupported CALL invocation"));
        }
    } else {
        (head.trim().to_string(), Vec::new())
    };
    if name.starts_with("db.") && !head.ends_with(')') {
        return Err(Error::other("Unsupported CALL invocation"));
    }
    let (yield_items, yield_star) = match yield_part {
        None => (None, false),
        Some("*") => (None, true),
        Some(text) => {
            let items = crate::scan::split_top_level(text, ',')
                .into_iter()
                .map(|item| {
                    let item = item.trim();
                    let level = crate::scan::LevelMap::compute(item);
                    match (0..item.len()).find_map(|i| crate::scan::match_word(item, &level, i, "AS").map(|e| (i, e))) {
                        Some((pos, end)) => YieldItem {
                            name: item[..pos].trim().to_string(),
                            alias: Some(item[end..].trim().to_string()),
                        },
                        None => YieldItem { name: item.to_string(), alias: None },
                    }
                })
                .collect::<Vec<_>>();
            if items.is_empty() {
                return Err(Error::other("YIELD requires at least one item"));
            }
            (Some(items), false)
        }
    };
    Ok((name, args, yield_items, yield_star))
}

fn build_clause(lexed: &LexedClause) -> Result<ClauseKind> {
    let base = lexed.span.start;
    match lexed.keyword.as_str() {
        "MATCH" => Ok(ClauseKind::Match { optional: false, patterns: parse_patterns(&lexed.body, base)? }),
        "OPTIONAL MATCH" => Ok(ClauseKind::Match { optional: true, patterns: parse_patterns(&lexed.body, base)? }),
        "WHERE" => Ok(ClauseKind::Where { expr: parse_spanned(&lexed.body, base)? }),
        "WITH" | "RETURN" => {
            let mut body = lexed.body.as_str();
            let mut distinct = false;
            let level = crate::scan::LevelMap::compute(body);
            if let Some(end) = crate::scan::match_word(body, &level, 0, "DISTINCT") {
                distinct = true;
                body = body[end..].trim_start();
            }
            let mut diags = Vec::new();
            let items = parse_projection(body, base, &mut diags)?;
            if lexed.keyword == "WITH" {
                Ok(ClauseKind::With { items, distinct })
            } else {
                Ok(ClauseKind::Return { items, distinct })
            }
        }
        "ORDER BY" => Ok(ClauseKind::OrderBy { keys: parse_order_by(&lexed.body, base)? }),
        "SKIP" => Ok(ClauseKind::Skip { expr: parse_spanned(&lexed.body, base)? }),
        "LIMIT" => Ok(ClauseKind::Limit { expr: parse_spanned(&lexed.body, base)? }),
        "UNWIND" => {
            let (expr, variable) = parse_unwind(&lexed.body, base)?;
            Ok(ClauseKind::Unwind { expr, variable })
        }
        "CREATE" => Ok(ClauseKind::Create { patterns: parse_patterns(&lexed.body, base)? }),
        "MERGE" => {
            let patterns = parse_patterns(&lexed.body, base)?;
            let pattern = patterns.into_iter().next().ok_or_else(|| Error::other("MERGE pattern cannot be empty"))?;
            Ok(ClauseKind::Merge { pattern })
        }
        "SET" => {
            let on_suffix = lexed.on_suffix.map(|s| match s {
                OnSuffix::Create => OnSuffixKind::Create,
                OnSuffix::Match => OnSuffixKind::Match,
            });
            Ok(ClauseKind::Set { items: parse_set_items(&lexed.body, base)?, on_suffix })
        }
        "REMOVE" => Ok(ClauseKind::Remove { items: parse_remove_items(&lexed.body, base)? }),
        "DELETE" => Ok(ClauseKind::Delete { detach: false, targets: parse_delete_targets(&lexed.body, base)? }),
        "DETACH DELETE" => Ok(ClauseKind::Delete { detach: true, targets: parse_delete_targets(&lexed.body, base)? }),
        "CALL" => {
            let (name, args, yield_items, yield_star) = parse_call(&lexed.body, base)?;
            Ok(ClauseKind::Call { name, args, yield_items, yield_star })
        }
        "UNION" | "UNION ALL" => Ok(ClauseKind::Unknown),
        _ => Ok(ClauseKind::Unknown),
    }
}

/// Validates inter-clause ordering (spec §4.3), pushing CYP300 diagnostics.
fn validate_ordering(clauses: &[ClauseNode], diags: &mut Vec<Diagnostic>) {
    let mut seen_return = false;
    for (i, clause) in clauses.iter().enumerate() {
        let prev = if i == 0 { None } else { Some(clauses[i - 1].keyword.as_str()) };
        match clause.keyword.as_str() {
            "RETURN" => {
                if seen_return {
                    diags.push(Diagnostic::new(CypCode::DuplicateReturn, "statement has more than one RETURN", clause.span));
                }
                seen_return = true;
            }
            "WHERE" => {
                if !matches!(prev, Some("MATCH") | Some("OPTIONAL MATCH") | Some("WITH")) {
                    diags.push(Diagnostic::new(CypCode::InvalidOrdering, "WHERE must follow MATCH, OPTIONAL MATCH, or WITH", clause.span));
                }
            }
            "ORDER BY" => {
                if !matches!(prev, Some("RETURN") | Some("WITH")) {
                    diags.push(Diagnostic::new(CypCode::InvalidOrdering, "ORDER BY must follow RETURN or WITH", clause.span));
                }
            }
            "SKIP" | "LIMIT" => {
                if !matches!(prev, Some("RETURN") | Some("WITH") | Some("ORDER BY") | Some("SKIP") | Some("LIMIT")) {
                    diags.push(Diagnostic::new(CypCode::InvalidOrdering, "SKIP/LIMIT must follow RETURN, WITH, ORDER BY, SKIP, or LIMIT", clause.span));
                }
            }
            _ => {}
        }
        if seen_return
            && !matches!(clause.keyword.as_str(), "RETURN" | "ORDER BY" | "SKIP" | "LIMIT" | "UNION" | "UNION ALL")
        {
            diags.push(Diagnostic::new(CypCode::InvalidOrdering, "only ORDER BY / SKIP / LIMIT / UNION may follow RETURN", clause.span));
        }
    }
}

/// Builds the typed [`Query`] for one lexed statement, splitting on
/// UNION/UNION ALL boundaries (spec §4.3/§4.4). Ordering diagnostics are
/// accumulated but never abort the build (parse-time recovery, spec §6).
pub fn build_query_checked(statement: &LexedStatement, diags: &mut Vec<Diagnostic>) -> Result<Query> {
    let mut parts: Vec<QueryPart> = vec![QueryPart { clauses: Vec::new() }];
    let mut unions = Vec::new();
    let mut last_keyword: Option<String> = None;

    for lexed in &statement.clauses {
        if lexed.keyword == "UNION" || lexed.keyword == "UNION ALL" {
            if !matches!(last_keyword.as_deref(), Some("RETURN") | Some("ORDER BY") | Some("SKIP") | Some("LIMIT")) {
                diags.push(Diagnostic::new(
                    CypCode::InvalidOrdering,
                    "UNION/UNION ALL must follow RETURN, ORDER BY, SKIP, or LIMIT",
                    lexed.span,
                ));
            }
            unions.push(if lexed.keyword == "UNION" { UnionKind::Union } else { UnionKind::UnionAll });
            parts.push(QueryPart { clauses: Vec::new() });
            last_keyword = Some(lexed.keyword.clone());
            continue;
        }
        let kind = build_clause(lexed)?;
        if matches!(kind, ClauseKind::Unknown) && lexed.keyword != "UNION" && lexed.keyword != "UNION ALL" {
            diags.push(Diagnostic::new(CypCode::UnknownKeyword, format!("unrecognized clause keyword \"{}\"", lexed.keyword), lexed.span));
        }
        parts.last_mut().unwrap().clauses.push(ClauseNode {
            type_name: clause_type_name(&lexed.keyword).to_string(),
            keyword: lexed.keyword.clone(),
            body: lexed.body.clone(),
            span: lexed.span,
            kind,
        });
        last_keyword = Some(lexed.keyword.clone());
    }

    for part in &parts {
        validate_ordering(&part.clauses, diags);
    }
    for part in &parts {
        if part.clauses.is_empty() {
            return Err(Error::other("UNION cannot have an empty query part"));
        }
    }

    Ok(Query { parts, unions })
}

/// Build without accumulating diagnostics separately — used by EXISTS
/// subquery parsing where a malformed subquery is simply a parse error.
pub fn build_query(statement: &LexedStatement) -> Result<Query> {
    let mut diags = Vec::new();
    let query = build_query_checked(statement, &mut diags)?;
    if diags.iter().any(|d| d.is_error()) {
        return Err(Error::Parse(diags.into_iter().next().unwrap()));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::segment;

    #[test]
    fn builds_match_where_return() {
        let out = segment("MATCH (n:Person) WHERE n.age > 1 RETURN n.name AS name");
        let mut diags = Vec::new();
        let query = build_query_checked(&out.statements[0], &mut diags).unwrap();
        assert!(diags.is_empty());
        assert_eq!(query.parts.len(), 1);
        assert_eq!(query.parts[0].clauses.len(), 3);
    }

    #[test]
    fn duplicate_return_is_flagged() {
        let out = segment("RETURN 1 AS n RETURN 2 AS n");
        let mut diags = Vec::new();
        let _ = build_query_checked(&out.statements[0], &mut diags);
        assert!(diags.iter().any(|d| d.code == CypCode::DuplicateReturn));
    }

    #[test]
    fn union_splits_into_parts() {
        let out = segment("RETURN 1 AS n UNION RETURN 2 AS n");
        let mut diags = Vec::new();
        let query = build_query_checked(&out.statements[0], &mut diags).unwrap();
        assert_eq!(query.parts.len(), 2);
        assert_eq!(query.unions, vec![UnionKind::Union]);
    }

    #[test]
    fn union_not_following_return_order_by_skip_or_limit_is_flagged() {
        let out = segment("MATCH (n) UNION RETURN 1 AS n");
        let mut diags = Vec::new();
        let _ = build_query_checked(&out.statements[0], &mut diags);
        assert!(diags.iter().any(|d| d.code == CypCode::InvalidOrdering));
    }

    #[test]
    fn union_following_limit_is_not_flagged() {
        let out = segment("RETURN 1 AS n LIMIT 1 UNION RETURN 2 AS n");
        let mut diags = Vec::new();
        let _ = build_query_checked(&out.statements[0], &mut diags).unwrap();
        assert!(!diags.iter().any(|d| d.code == CypCode::InvalidOrdering));
    }

    #[test]
    fn duplicate_alias_is_flagged() {
        let out = segment("RETURN 1 AS n, 2 AS n");
        let mut diags = Vec::new();
        let _ = build_query_checked(&out.statements[0], &mut diags);
        assert!(diags.iter().any(|d| d.code == CypCode::DuplicateAlias));
    }
}
