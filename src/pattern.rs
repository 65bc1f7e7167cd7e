//! Pattern engine (spec §4.5): parses pattern text into an alternating
//! node/relationship chain and matches it against the graph store,
//! including variable-length traversal with relationship-uniqueness.

use std::collections::BTreeMap;

use crate::error::{CypCode, Error};
use crate::expr::Expr;
use crate::row::Row;
use crate::span::Span;
use crate::store::Graph;
use crate::value::{NodeValue, PathValue, RelationshipValue, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum RelDirection {
    LeftToRight,
    RightToLeft,
    Undirected,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PropertyMap {
    pub entries: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Option<PropertyMap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct HopRange {
    pub min: u32,
    pub max: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RelPattern {
    pub variable: Option<String>,
    pub types: Vec<String>,
    pub direction: RelDirection,
    pub properties: Option<PropertyMap>,
    pub variable_length: Option<HopRange>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum PatternElement {
    Node(NodePattern),
    Rel(RelPattern),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PatternChain {
    pub path_variable: Option<String>,
    pub elements: Vec<PatternElement>,
    pub span: Span,
}

impl PatternChain {
    pub fn node_patterns(&self) -> impl Iterator<Item = &NodePattern> {
        self.elements.iter().filter_map(|e| match e {
            PatternElement::Node(n) => Some(n),
            _ => None,
        })
    }

    pub fn rel_patterns(&self) -> impl Iterator<Item = &RelPattern> {
        self.elements.iter().filter_map(|e| match e {
            PatternElement::Rel(r) => Some(r),
            _ => None,
        })
    }
}

fn parse_labels(mut s: &str) -> (Vec<String>, &str) {
    let mut labels = Vec::new();
    loop {
        let trimmed = s.trim_start();
        if let Some(rest) = trimmed.strip_prefix(':') {
            let end = rest
                .find(|c: char| c == ':' || c.is_whitespace() || c == '{')
                .unwrap_or(rest.len());
            labels.push(rest[..end].trim().to_string());
            s = &rest[end..];
        } else {
            return (labels, trimmed);
        }
    }
}

fn parse_property_map_text(text: &str) -> crate::error::Result<Option<PropertyMap>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if !text.starts_with('{') || !text.ends_with('}') {
        return Err(Error::parse(
            CypCode::UnexpectedTokens,
            "Invalid node label",
            Span::point(0),
        ));
    }
    let inner = &text[1..text.len() - 1];
    let mut entries = Vec::new();
    for part in crate::scan::split_top_level(inner, ',') {
        if part.is_empty() {
            continue;
        }
        let (key, value) = part
            .split_once(':')
            .ok_or_else(|| Error::other("Invalid map entry"))?;
        let key = key.trim().trim_matches('`').to_string();
        let expr = crate::expr::parse::parse_expression(value.trim())?;
        entries.push((key, expr));
    }
    Ok(Some(PropertyMap { entries }))
}

/// Parses `(var? :Label* {props}?)`.
fn parse_node_pattern(text: &str) -> crate::error::Result<NodePattern> {
    let inner = crate::scan::strip_one_paren_layer(text)
        .ok_or_else(|| Error::other("Invalid pattern in MATCH"))?;
    let inner = inner.trim();
    let (var_part, rest) = {
        let end = inner
            .find(|c: char| c == ':' || c == '{' || c.is_whitespace())
            .unwrap_or(inner.len());
        (&inner[..end], inner[end..].trim_start())
    };
    let variable = if var_part.is_empty() {
        None
    } else {
        Some(var_part.trim_matches('`').to_string())
    };
    let (labels, rest) = parse_labels(rest);
    let properties = parse_property_map_text(rest)?;
    Ok(NodePattern {
        variable,
        labels,
        properties,
    })
}

fn parse_hop_range(text: &str) -> crate::error::Result<HopRange> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(HopRange { min: 1, max: None });
    }
    if let Some((min_s, max_s)) = text.split_once("..") {
        let min: u32 = if min_s.trim().is_empty() {
            0
        } else {
            min_s.trim().parse().map_err(|_| Error::other("Invalid pattern in MATCH"))?
        };
        let max = if max_s.trim().is_empty() {
            None
        } else {
            Some(max_s.trim().parse().map_err(|_| Error::other("Invalid pattern in MATCH"))?)
        };
        Ok(HopRange { min, max })
    } else {
        let n: u32 = text.parse().map_err(|_| Error::other("Invalid pattern in MATCH"))?;
        Ok(HopRange { min: n, max: Some(n) })
    }
}

/// Parses `[var? :Type(|Type)* *range? {props}?]`, or `None` for a bare
/// edge with no bracketed detail (`-` / `->` / `<-`).
fn parse_rel_detail(text: &str, direction: RelDirection) -> crate::error::Result<RelPattern> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(RelPattern {
            variable: None,
            types: Vec::new(),
            direction,
            properties: None,
            variable_length: None,
        });
    }
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| Error::other("Invalid pattern in MATCH"))?;
    let inner = inner.trim();

    let var_end = inner
        .find(|c: char| c == ':' || c == '*' || c == '{' || c.is_whitespace())
        .unwrap_or(inner.len());
    let (var_part, mut rest) = (&inner[..var_end], inner[var_end..].trim_start());
    let variable = if var_part.is_empty() {
        None
    } else {
        Some(var_part.trim_matches('`').to_string())
    };

    let mut types = Vec::new();
    if let Some(r) = rest.strip_prefix(':') {
        rest = r;
        loop {
            let end = rest
                .find(|c: char| c == '|' || c == '*' || c == '{' || c.is_whitespace())
                .unwrap_or(rest.len());
            types.push(rest[..end].trim().trim_matches(':').to_string());
            rest = rest[end..].trim_start();
            if let Some(r) = rest.strip_prefix('|') {
                rest = r.trim_start().trim_start_matches(':');
            } else {
                break;
            }
        }
    }

    let mut variable_length = None;
    if let Some(r) = rest.strip_prefix('*') {
        rest = r;
        let end = rest.find('{').unwrap_or(rest.len());
        variable_length = Some(parse_hop_range(&rest[..end])?);
        rest = rest[end..].trim_start();
    }

    let properties = parse_property_map_text(rest)?;

    Ok(RelPattern {
        variable,
        types,
        direction,
        properties,
        variable_length,
    })
}

/// Splits `text` into alternating node/edge tokens and parses each.
pub fn parse_pattern_chain(text: &str, span: Span) -> crate::error::Result<PatternChain> {
    let mut text = text.trim();
    let mut path_variable = None;
    if let Some(eq) = crate::scan::find_top_level_char(text, &crate::scan::LevelMap::compute(text), 0, '=') {
        let candidate = text[..eq].trim();
        if !candidate.is_empty() && !candidate.contains('(') {
            path_variable = Some(candidate.trim_matches('`').to_string());
            text = text[eq + 1..].trim();
        }
    }

    let level = crate::scan::LevelMap::compute(text);
    let mut elements = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut expect_node = true;
    while i < bytes.len() {
        if expect_node {
            let depth_start = i;
            let mut depth = 0i32;
            let mut j = i;
            loop {
                if j >= bytes.len() {
                    return Err(Error::other("Unterminated node pattern"));
                }
                match bytes[j] {
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            j += 1;
                            break;
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            elements.push(PatternElement::Node(parse_node_pattern(&text[depth_start..j])?));
            i = j;
            expect_node = false;
        } else {
            // edge: optional '<', '-', optional '[...]', '-', optional '>'
            let edge_start = i;
            let mut j = i;
            let left_arrow = bytes.get(j) == Some(&b'<');
            if left_arrow {
                j += 1;
            }
            if bytes.get(j) != Some(&b'-') {
                return Err(Error::other("Invalid pattern in MATCH"));
            }
            j += 1;
            let mut detail_text = "";
            if bytes.get(j) == Some(&b'[') {
                let bracket_start = j;
                let mut depth = 0i32;
                loop {
                    if j >= bytes.len() {
                        return Err(Error::other("Unterminated relationship pattern"));
                    }
                    match bytes[j] {
                        b'[' => depth += 1,
                        b']' => {
                            depth -= 1;
                            if depth == 0 {
                                j += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    j += 1;
                }
                detail_text = &text[bracket_start..j];
            }
            if bytes.get(j) != Some(&b'-') {
                return Err(Error::other("Invalid pattern in MATCH"));
            }
            j += 1;
            let right_arrow = bytes.get(j) == Some(&b'>');
            if right_arrow {
                j += 1;
            }
            let _ = level.is_top_level(edge_start);
            let direction = match (left_arrow, right_arrow) {
                (true, false) => RelDirection::RightToLeft,
                (false, true) => RelDirection::LeftToRight,
                (false, false) => RelDirection::Undirected,
                (true, true) => return Err(Error::other("Invalid pattern in MATCH")),
            };
            elements.push(PatternElement::Rel(parse_rel_detail(detail_text, direction)?));
            i = j;
            expect_node = true;
        }
    }
    if elements.is_empty() || !expect_node {
        return Err(Error::other("Invalid pattern in MATCH"));
    }
    Ok(PatternChain {
        path_variable,
        elements,
        span,
    })
}

pub(crate) fn eval_property_map(
    map: &Option<PropertyMap>,
    row: &Row,
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> crate::error::Result<BTreeMap<String, Value>> {
    let mut out = BTreeMap::new();
    if let Some(map) = map {
        for (key, expr) in &map.entries {
            out.insert(key.clone(), crate::expr::eval::evaluate(expr, row, graph, params)?);
        }
    }
    Ok(out)
}

fn node_matches(
    pattern: &NodePattern,
    node: &NodeValue,
    row: &Row,
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> crate::error::Result<bool> {
    if !pattern.labels.iter().all(|l| node.labels.contains(l)) {
        return Ok(false);
    }
    let props = eval_property_map(&pattern.properties, row, graph, params)?;
    for (k, v) in &props {
        if node.properties.get(k) != Some(v) {
            return Ok(false);
        }
    }
    if let Some(var) = &pattern.variable {
        if let Some(Value::Node(existing)) = row.get(var) {
            return Ok(existing.id == node.id);
        }
    }
    Ok(true)
}

fn rel_matches(
    pattern: &RelPattern,
    rel: &RelationshipValue,
    row: &Row,
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> crate::error::Result<bool> {
    if !pattern.types.is_empty() && !pattern.types.iter().any(|t| t == &rel.rel_type) {
        return Ok(false);
    }
    let props = eval_property_map(&pattern.properties, row, graph, params)?;
    for (k, v) in &props {
        if rel.properties.get(k) != Some(v) {
            return Ok(false);
        }
    }
    if let Some(var) = &pattern.variable {
        if let Some(Value::Relationship(existing)) = row.get(var) {
            return Ok(existing.id == rel.id);
        }
    }
    Ok(true)
}

/// Result of a successful match: bindings to add plus, if the pattern has
/// a path variable, the materialized path.
pub struct MatchResult {
    pub bindings: Vec<(String, Value)>,
    pub path: Option<PathValue>,
}

/// Matches `chain` against `graph`, extending `row` with every successful
/// binding combination. Candidates are visited in store id order, giving a
/// deterministic match sequence (spec §5).
pub fn match_pattern(
    chain: &PatternChain,
    graph: &Graph,
    row: &Row,
    params: &BTreeMap<String, Value>,
) -> crate::error::Result<Vec<MatchResult>> {
    let mut results = Vec::new();
    let node_patterns: Vec<&NodePattern> = chain.node_patterns().collect();
    let rel_patterns: Vec<&RelPattern> = chain.rel_patterns().collect();
    debug_assert_eq!(node_patterns.len(), rel_patterns.len() + 1);

    let first = node_patterns[0];
    let start_candidates: Vec<NodeValue> = if let Some(var) = &first.variable {
        if let Some(Value::Node(n)) = row.get(var) {
            vec![n.clone()]
        } else {
            graph.nodes().collect()
        }
    } else {
        graph.nodes().collect()
    };

    for start in start_candidates {
        if !node_matches(first, &start, row, graph, params)? {
            continue;
        }
        let mut state = MatchState {
            nodes: vec![start.clone()],
            rels: vec![],
            used_rel_ids: Vec::new(),
        };
        extend_match(&node_patterns, &rel_patterns, 0, &mut state, graph, row, params, &mut results)?;
    }
    Ok(results)
}

struct MatchState {
    nodes: Vec<NodeValue>,
    rels: Vec<RelSegmentMatch>,
    used_rel_ids: Vec<u64>,
}

/// A node variable repeated within one chain (`(n)-->(n)`) must resolve to
/// the same node at every occurrence, exactly like rebinding against an
/// outer row (spec §4.5 "same-row rebinding"). `bound_so_far` holds the
/// nodes already matched for `node_patterns[..pattern_idx]`.
fn rebinds_consistently(node_patterns: &[&NodePattern], bound_so_far: &[NodeValue], pattern_idx: usize, candidate_id: u64) -> bool {
    let Some(var) = &node_patterns[pattern_idx].variable else {
        return true;
    };
    node_patterns[..pattern_idx]
        .iter()
        .zip(bound_so_far)
        .all(|(earlier_pattern, earlier_node)| earlier_pattern.variable.as_deref() != Some(var.as_str()) || earlier_node.id == candidate_id)
}

enum RelSegmentMatch {
    Single(RelationshipValue),
    VarLength(Vec<RelationshipValue>),
}

fn endpoint_aligned(rel: &RelationshipValue, from: u64, direction: RelDirection) -> Option<u64> {
    match direction {
        RelDirection::LeftToRight => (rel.start == from).then_some(rel.end),
        RelDirection::RightToLeft => (rel.end == from).then_some(rel.start),
        RelDirection::Undirected => {
            if rel.start == from {
                Some(rel.end)
            } else if rel.end == from {
                Some(rel.start)
            } else {
                None
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn extend_match(
    node_patterns: &[&NodePattern],
    rel_patterns: &[&RelPattern],
    seg: usize,
    state: &mut MatchState,
    graph: &Graph,
    row: &Row,
    params: &BTreeMap<String, Value>,
    results: &mut Vec<MatchResult>,
) -> crate::error::Result<()> {
    if seg == rel_patterns.len() {
        finalize_match(node_patterns, rel_patterns, state, row, results);
        return Ok(());
    }
    let rel_pattern = rel_patterns[seg];
    let current = state.nodes.last().unwrap().clone();
    let range = rel_pattern.variable_length;

    match range {
        None => {
            for rel in graph.incident(current.id) {
                if state.used_rel_ids.contains(&rel.id) {
                    continue;
                }
                let Some(next_id) = endpoint_aligned(&rel, current.id, rel_pattern.direction) else {
                    continue;
                };
                if !rel_matches(rel_pattern, &rel, row, graph, params)? {
                    continue;
                }
                let Some(next_node) = graph.node(next_id) else { continue };
                let next_pattern = node_patterns[seg + 1];
                if !node_matches(next_pattern, &next_node, row, graph, params)? {
                    continue;
                }
                if !rebinds_consistently(node_patterns, &state.nodes, seg + 1, next_node.id) {
                    continue;
                }
                state.nodes.push(next_node);
                state.rels.push(RelSegmentMatch::Single(rel.clone()));
                state.used_rel_ids.push(rel.id);
                extend_match(node_patterns, rel_patterns, seg + 1, state, graph, row, params, results)?;
                state.used_rel_ids.pop();
                state.rels.pop();
                state.nodes.pop();
            }
        }
        Some(hop_range) => {
            let max = hop_range.max.unwrap_or(graph.relationship_count() as u32);
            let mut path_rels: Vec<RelationshipValue> = Vec::new();
            walk_variable_length(
                node_patterns,
                rel_patterns,
                seg,
                current.id,
                0,
                hop_range.min,
                max,
                &mut path_rels,
                state,
                graph,
                row,
                params,
                results,
            )?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn walk_variable_length(
    node_patterns: &[&NodePattern],
    rel_patterns: &[&RelPattern],
    seg: usize,
    current_id: u64,
    depth: u32,
    min: u32,
    max: u32,
    path_rels: &mut Vec<RelationshipValue>,
    state: &mut MatchState,
    graph: &Graph,
    row: &Row,
    params: &BTreeMap<String, Value>,
    results: &mut Vec<MatchResult>,
) -> crate::error::Result<()> {
    let rel_pattern = rel_patterns[seg];
    if depth >= min {
        let current_node = graph.node(current_id).unwrap();
        let next_pattern = node_patterns[seg + 1];
        if node_matches(next_pattern, &current_node, row, graph, params)? && rebinds_consistently(node_patterns, &state.nodes, seg + 1, current_node.id) {
            state.nodes.push(current_node);
            state.rels.push(RelSegmentMatch::VarLength(path_rels.clone()));
            extend_match(node_patterns, rel_patterns, seg + 1, state, graph, row, params, results)?;
            state.rels.pop();
            state.nodes.pop();
        }
    }
    if depth >= max {
        return Ok(());
    }
    for rel in graph.incident(current_id) {
        if state.used_rel_ids.contains(&rel.id) || path_rels.iter().any(|r| r.id == rel.id) {
            continue;
        }
        let Some(next_id) = endpoint_aligned(&rel, current_id, rel_pattern.direction) else {
            continue;
        };
        if !rel_matches(rel_pattern, &rel, row, graph, params)? {
            continue;
        }
        path_rels.push(rel.clone());
        state.used_rel_ids.push(rel.id);
        walk_variable_length(
            node_patterns,
            rel_patterns,
            seg,
            next_id,
            depth + 1,
            min,
            max,
            path_rels,
            state,
            graph,
            row,
            params,
            results,
        )?;
        state.used_rel_ids.pop();
        path_rels.pop();
    }
    Ok(())
}

fn rel_segment_value(rel: &RelSegmentMatch) -> Value {
    match rel {
        RelSegmentMatch::Single(r) => Value::Relationship(r.clone()),
        RelSegmentMatch::VarLength(rs) => Value::List(rs.iter().map(|r| Value::Relationship(r.clone())).collect()),
    }
}

/// Binds unbound pattern variables from a completed match, or — for a
/// variable already bound by an earlier clause (e.g. a repeated MATCH) —
/// verifies it rebinds to a structurally equal value rather than silently
/// accepting a different relationship or relationship sequence (spec §4.5).
fn finalize_match(
    node_patterns: &[&NodePattern],
    rel_patterns: &[&RelPattern],
    state: &MatchState,
    row: &Row,
    results: &mut Vec<MatchResult>,
) {
    let mut bindings = Vec::new();
    for (pattern, node) in node_patterns.iter().zip(state.nodes.iter()) {
        if let Some(var) = &pattern.variable {
            if !row.contains(var) {
                bindings.push((var.clone(), Value::Node(node.clone())));
            }
        }
    }
    for (pattern, rel) in rel_patterns.iter().zip(state.rels.iter()) {
        if let Some(var) = &pattern.variable {
            let value = rel_segment_value(rel);
            if let Some(existing) = row.get(var) {
                if existing != &value {
                    return;
                }
                continue;
            }
            bindings.push((var.clone(), value));
        }
    }
    let path = Some(PathValue {
        nodes: state.nodes.clone(),
        relationships: state
            .rels
            .iter()
            .flat_map(|r| match r {
                RelSegmentMatch::Single(rel) => vec![rel.clone()],
                RelSegmentMatch::VarLength(rels) => rels.clone(),
            })
            .collect(),
    });
    results.push(MatchResult { bindings, path });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_node_and_relationship_pattern() {
        let chain = parse_pattern_chain("(a:Person)-[:KNOWS]->(b:Person)", Span::default()).unwrap();
        assert_eq!(chain.elements.len(), 3);
        let nodes: Vec<_> = chain.node_patterns().collect();
        assert_eq!(nodes[0].variable.as_deref(), Some("a"));
        assert_eq!(nodes[0].labels, vec!["Person".to_string()]);
        let rels: Vec<_> = chain.rel_patterns().collect();
        assert_eq!(rels[0].types, vec!["KNOWS".to_string()]);
        assert_eq!(rels[0].direction, RelDirection::LeftToRight);
    }

    #[test]
    fn parses_variable_length_range() {
        let chain = parse_pattern_chain("(a)-[r:R*2]->(b)", Span::default()).unwrap();
        let rels: Vec<_> = chain.rel_patterns().collect();
        assert_eq!(rels[0].variable_length, Some(HopRange { min: 2, max: Some(2) }));
    }

    #[test]
    fn parses_path_variable() {
        let chain = parse_pattern_chain("p = (a)-[:R]->(b)", Span::default()).unwrap();
        assert_eq!(chain.path_variable.as_deref(), Some("p"));
    }
}
