//! Clause segmenter (spec §4.2): raw query text -> statements -> lexed
//! clauses. Tolerant and hand-written: it never builds a token stream, it
//! only finds top-level keyword boundaries and slices the text between them.

use crate::error::CypCode;
use crate::scan::{self, LevelMap};
use crate::span::Span;

/// `ON CREATE` / `ON MATCH` marker stripped off the end of the previous
/// clause's body and reattached to the following `SET` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnSuffix {
    Create,
    Match,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexedClause {
    /// Canonical, upper-cased, single-spaced keyword (e.g. "OPTIONAL MATCH").
    pub keyword: String,
    pub body: String,
    pub span: Span,
    pub on_suffix: Option<OnSuffix>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexedStatement {
    pub clauses: Vec<LexedClause>,
}

pub struct SegmentOutcome {
    pub statements: Vec<LexedStatement>,
    pub diagnostics: Vec<crate::error::Diagnostic>,
}

/// Canonical keyword forms tried in priority order so multi-word keywords
/// win over any single-word prefix overlap (longest-match alternation).
const KEYWORDS: &[(&[&str], &str)] = &[
    (&["OPTIONAL", "MATCH"], "OPTIONAL MATCH"),
    (&["ORDER", "BY"], "ORDER BY"),
    (&["UNION", "ALL"], "UNION ALL"),
    (&["DETACH", "DELETE"], "DETACH DELETE"),
    (&["MATCH"], "MATCH"),
    (&["WHERE"], "WHERE"),
    (&["WITH"], "WITH"),
    (&["RETURN"], "RETURN"),
    (&["CREATE"], "CREATE"),
    (&["MERGE"], "MERGE"),
    (&["SET"], "SET"),
    (&["REMOVE"], "REMOVE"),
    (&["DELETE"], "DELETE"),
    (&["LIMIT"], "LIMIT"),
    (&["SKIP"], "SKIP"),
    (&["UNWIND"], "UNWIND"),
    (&["CALL"], "CALL"),
    (&["UNION"], "UNION"),
];

/// Strips `//`-to-end-of-line comments outside strings/backticks (spec §6),
/// replacing each stripped byte with a space so offsets stay stable.
pub fn strip_line_comments(text: &str) -> String {
    let level = LevelMap::compute(text);
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = bytes.to_vec();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if level.is_top_level(i) && bytes[i] == b'/' && bytes[i + 1] == b'/' {
            let mut j = i;
            while j < bytes.len() && bytes[j] != b'\n' {
                out[j] = b' ';
                j += 1;
            }
            i = j;
        } else {
            i += 1;
        }
    }
    // SAFETY-free: comments are ASCII '/' markers; replacing interior bytes
    // of a UTF-8 string with ASCII spaces can never split a multi-byte
    // sequence because `level.is_top_level` only flags ASCII '/' bytes.
    String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}

struct KeywordHit {
    start: usize,
    end: usize,
    canonical: &'static str,
}

fn find_keyword_hits(text: &str, level: &LevelMap) -> Vec<KeywordHit> {
    let mut hits = Vec::new();
    for (pos, _) in text.char_indices() {
        if !level.is_top_level(pos) || !scan::is_word_start(text, pos) {
            continue;
        }
        for (parts, canonical) in KEYWORDS {
            if let Some(end) = scan::match_word_sequence(text, level, pos, parts) {
                if is_rejected(text, pos, canonical) {
                    break;
                }
                hits.push(KeywordHit {
                    start: pos,
                    end,
                    canonical,
                });
                break;
            }
        }
    }
    hits
}

fn is_rejected(text: &str, start: usize, canonical: &str) -> bool {
    match canonical {
        "MATCH" | "CREATE" => scan::preceding_word(text, start)
            .map(|w| w.eq_ignore_ascii_case("on"))
            .unwrap_or(false),
        "WITH" => scan::preceding_word(text, start)
            .map(|w| w.eq_ignore_ascii_case("starts") || w.eq_ignore_ascii_case("ends"))
            .unwrap_or(false),
        _ => false,
    }
}

fn normalize_keyword(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Segments a single statement's text (already `;`-delimited) into clauses,
/// reporting CYP100 for leading non-whitespace text before the first
/// keyword and CYP101 for bodies that are empty when they may not be.
fn segment_statement(text: &str, base_offset: usize, diags: &mut Vec<crate::error::Diagnostic>) -> LexedStatement {
    let level = LevelMap::compute(text);
    let hits = find_keyword_hits(text, &level);

    if hits.is_empty() {
        if !text.trim().is_empty() {
            diags.push(crate::error::Diagnostic::new(
                CypCode::UnexpectedTokens,
                "unexpected tokens before any recognized clause",
                Span::new(base_offset, base_offset + text.len()),
            ));
        }
        return LexedStatement::default();
    }

    let leading = &text[..hits[0].start];
    if !leading.trim().is_empty() {
        diags.push(crate::error::Diagnostic::new(
            CypCode::UnexpectedTokens,
            "unexpected tokens before the first clause keyword",
            Span::new(base_offset, base_offset + hits[0].start),
        ));
    }

    let mut clauses = Vec::with_capacity(hits.len());
    for (i, hit) in hits.iter().enumerate() {
        let body_end = hits.get(i + 1).map(|h| h.start).unwrap_or(text.len());
        let body = text[hit.end..body_end].trim().to_string();
        let canonical = normalize_keyword(hit.canonical);
        if body.is_empty() && canonical != "UNION" && canonical != "UNION ALL" {
            diags.push(crate::error::Diagnostic::new(
                CypCode::UnexpectedTokens,
                format!("{canonical} clause has an empty body"),
                Span::new(base_offset + hit.start, base_offset + hit.end),
            ));
        }
        clauses.push(LexedClause {
            keyword: canonical,
            body,
            span: Span::new(base_offset + hit.start, base_offset + body_end),
            on_suffix: None,
        });
    }

    apply_on_suffix_fixup(&mut clauses);
    LexedStatement { clauses }
}

/// `ON CREATE`/`ON MATCH` keyword matches for MATCH/CREATE are rejected at
/// scan time, so their text lingers at the end of the preceding clause's
/// body. This pass detects that trailing marker, strips it, and attaches it
/// to the following `SET` clause.
fn apply_on_suffix_fixup(clauses: &mut [LexedClause]) {
    for i in 0..clauses.len().saturating_sub(1) {
        let next_is_set = clauses[i + 1].keyword == "SET";
        if !next_is_set {
            continue;
        }
        let trimmed = clauses[i].body.trim_end();
        let lower = trimmed.to_lowercase();
        let suffix = if lower.ends_with("on create") {
            Some((OnSuffix::Create, "on create".len()))
        } else if lower.ends_with("on match") {
            Some((OnSuffix::Match, "on match".len()))
        } else {
            None
        };
        if let Some((kind, len)) = suffix {
            let cut = trimmed.len() - len;
            clauses[i].body = trimmed[..cut].trim_end().to_string();
            clauses[i + 1].on_suffix = Some(kind);
        }
    }
}

/// Splits the full query text on top-level `;` and segments each statement.
pub fn segment(text: &str) -> SegmentOutcome {
    let stripped = strip_line_comments(text);
    let level = LevelMap::compute(&stripped);
    let mut statements = Vec::new();
    let mut diagnostics = Vec::new();
    let mut start = 0;
    let mut idx = 0;
    for c in stripped.chars() {
        if level.is_top_level(idx) && c == ';' {
            let stmt = segment_statement(&stripped[start..idx], start, &mut diagnostics);
            if !stmt.clauses.is_empty() {
                statements.push(stmt);
            }
            start = idx + c.len_utf8();
        }
        idx += c.len_utf8();
    }
    let tail = segment_statement(&stripped[start..], start, &mut diagnostics);
    if !tail.clauses.is_empty() {
        statements.push(tail);
    }
    SegmentOutcome {
        statements,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_simple_statement_into_clauses() {
        let out = segment("MATCH (n) WHERE n.age > 1 RETURN n");
        assert_eq!(out.statements.len(), 1);
        let kws: Vec<_> = out.statements[0]
            .clauses
            .iter()
            .map(|c| c.keyword.as_str())
            .collect();
        assert_eq!(kws, vec!["MATCH", "WHERE", "RETURN"]);
        assert_eq!(out.statements[0].clauses[0].body, "(n)");
    }

    #[test]
    fn quoted_keywords_are_not_clause_starts() {
        let out = segment("MATCH (n) WHERE n.name = 'WHERE RETURN' RETURN n");
        let kws: Vec<_> = out.statements[0]
            .clauses
            .iter()
            .map(|c| c.keyword.as_str())
            .collect();
        assert_eq!(kws, vec!["MATCH", "WHERE", "RETURN"]);
    }

    #[test]
    fn optional_match_is_one_keyword() {
        let out = segment("OPTIONAL MATCH (n) RETURN n");
        assert_eq!(out.statements[0].clauses[0].keyword, "OPTIONAL MATCH");
    }

    #[test]
    fn on_create_set_reattaches_to_set_clause() {
        let out = segment("MERGE (n:Person {name:'A'}) ON CREATE SET n.created = true RETURN n");
        let clauses = &out.statements[0].clauses;
        assert_eq!(clauses[0].keyword, "MERGE");
        assert!(!clauses[0].body.to_lowercase().contains("on create"));
        assert_eq!(clauses[1].keyword, "SET");
        assert_eq!(clauses[1].on_suffix, Some(OnSuffix::Create));
    }

    #[test]
    fn starts_with_does_not_split_at_with() {
        let out = segment("MATCH (n) WHERE n.name STARTS WITH 'A' RETURN n");
        let kws: Vec<_> = out.statements[0]
            .clauses
            .iter()
            .map(|c| c.keyword.as_str())
            .collect();
        assert_eq!(kws, vec!["MATCH", "WHERE", "RETURN"]);
    }

    #[test]
    fn statements_split_on_top_level_semicolon() {
        let out = segment("RETURN 1 AS n; RETURN 2 AS n");
        assert_eq!(out.statements.len(), 2);
    }

    #[test]
    fn union_allows_empty_body() {
        let out = segment("RETURN 1 AS n UNION RETURN 1 AS n");
        let kws: Vec<_> = out.statements[0]
            .clauses
            .iter()
            .map(|c| c.keyword.as_str())
            .collect();
        assert_eq!(kws, vec!["RETURN", "UNION", "RETURN"]);
        assert!(out.diagnostics.is_empty());
    }
}
