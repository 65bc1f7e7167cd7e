//! Canonical printer (spec §6, §9 "Re-parsing vs. real parser"): consumes an
//! AST and regenerates normalized text. Statements are separated by `;\n`;
//! each clause occupies its own line with the keyword upper-cased and its
//! body whitespace collapsed. Printing never re-derives a clause's body from
//! its typed fields — it replays the original source slice captured on
//! `ClauseNode::body`, so `parse -> print -> parse` only normalizes
//! whitespace, never re-orders or rewrites expressions.

use crate::ast::{ClauseKind, ClauseNode, OnSuffixKind, Query, UnionKind};
use crate::api::Document;

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn print_clause(clause: &ClauseNode) -> String {
    let body = collapse_whitespace(&clause.body);
    let keyword = match &clause.kind {
        ClauseKind::Set { on_suffix: Some(OnSuffixKind::Create), .. } => "ON CREATE SET".to_string(),
        ClauseKind::Set { on_suffix: Some(OnSuffixKind::Match), .. } => "ON MATCH SET".to_string(),
        _ => clause.keyword.clone(),
    };
    if body.is_empty() {
        keyword
    } else {
        format!("{keyword} {body}")
    }
}

/// Prints one statement's clause sequence, including its UNION/UNION ALL
/// segment boundaries, one clause (or union keyword) per line.
pub fn print_query(query: &Query) -> String {
    let mut lines = Vec::new();
    for (i, part) in query.parts.iter().enumerate() {
        if i > 0 {
            let keyword = match query.unions[i - 1] {
                UnionKind::Union => "UNION",
                UnionKind::UnionAll => "UNION ALL",
            };
            lines.push(keyword.to_string());
        }
        for clause in &part.clauses {
            lines.push(print_clause(clause));
        }
    }
    lines.join("\n")
}

/// Prints every statement in a parsed document, joined per spec §6 with
/// `;\n` between statements.
pub fn print_document(document: &Document) -> String {
    document
        .statements
        .iter()
        .map(print_query)
        .collect::<Vec<_>>()
        .join(";\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{parse, ParseOptions};

    #[test]
    fn collapses_whitespace_and_uppercases_keyword() {
        let outcome = parse("match   (n)   where   n.age   >   1   return   n", &ParseOptions::relaxed());
        let document = outcome.document.expect("should parse");
        let printed = print_document(&document);
        assert_eq!(printed, "MATCH (n)\nWHERE n.age > 1\nRETURN n");
    }

    #[test]
    fn on_create_set_prints_as_one_line() {
        let outcome = parse(
            "MERGE (n:Person {name:'A'}) ON CREATE SET n.created = true RETURN n",
            &ParseOptions::relaxed(),
        );
        let document = outcome.document.expect("should parse");
        let printed = print_document(&document);
        assert_eq!(
            printed,
            "MERGE (n:Person {name:'A'})\nON CREATE SET n.created = true\nRETURN n"
        );
    }

    #[test]
    fn union_all_keyword_is_its_own_line() {
        let outcome = parse("RETURN 1 AS n UNION ALL RETURN 1 AS n", &ParseOptions::relaxed());
        let document = outcome.document.expect("should parse");
        let printed = print_document(&document);
        assert_eq!(printed, "RETURN 1 AS n\nUNION ALL\nRETURN 1 AS n");
    }

    #[test]
    fn print_parse_print_is_idempotent_up_to_whitespace() {
        let text = "MATCH (n:Person)   WHERE  n.age >= 30 RETURN n.name AS name";
        let first = parse(text, &ParseOptions::relaxed()).document.expect("parses");
        let printed_once = print_document(&first);
        let second = parse(&printed_once, &ParseOptions::relaxed()).document.expect("reparses");
        let printed_twice = print_document(&second);
        assert_eq!(printed_once, printed_twice);
    }
}
