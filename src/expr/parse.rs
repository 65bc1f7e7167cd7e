//! Expression parser: a precedence cascade of top-level-aware text splits
//! (spec §4.7 steps 1-21), each level delegating to the next when its own
//! operator is absent. This produces a typed [`Expr`] tree once, rather
//! than re-scanning body text at evaluation time (spec §9 Design Notes).

use crate::error::{CypCode, Error, Result};
use crate::scan::{self, LevelMap};
use crate::span::Span;

use super::{ArithOp, CompareOp, Expr, LogicOp, Param, QuantifierKind, SpannedExpr, StringPredOp};

pub fn parse_spanned(text: &str, base_offset: usize) -> Result<SpannedExpr> {
    let expr = parse_expression(text)?;
    Ok(SpannedExpr {
        expr,
        span: Span::new(base_offset, base_offset + text.len()),
        text: text.trim().to_string(),
    })
}

pub fn parse_expression(text: &str) -> Result<Expr> {
    let text = strip_enclosing_parens(text.trim());
    parse_or(text)
}

/// Repeatedly strips a single enclosing paren layer (spec step 1 is
/// applied once per level, but stripping fully here is equivalent since
/// re-stripping an already-bare expression is a no-op).
fn strip_enclosing_parens(text: &str) -> &str {
    let mut current = text.trim();
    while let Some(inner) = scan::strip_one_paren_layer(current) {
        if inner == current {
            break;
        }
        current = inner;
    }
    current
}

fn split_binary_keyword<'a>(text: &'a str, level: &LevelMap, word: &str) -> Option<(&'a str, &'a str)> {
    for (pos, _) in text.char_indices() {
        if let Some(end) = scan::match_word(text, level, pos, word) {
            return Some((&text[..pos], &text[end..]));
        }
    }
    None
}

fn find_first_top_level_word(text: &str, level: &LevelMap, word: &str) -> Option<(usize, usize)> {
    for (pos, _) in text.char_indices() {
        if let Some(end) = scan::match_word(text, level, pos, word) {
            return Some((pos, end));
        }
    }
    None
}

fn parse_or(text: &str) -> Result<Expr> {
    let text = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(text);
    if let Some((l, r)) = split_binary_keyword(text, &level, "OR") {
        return Ok(Expr::Logic {
            op: LogicOp::Or,
            left: Box::new(parse_or(l)?),
            right: Box::new(parse_xor(r)?),
        });
    }
    parse_xor(text)
}

fn parse_xor(text: &str) -> Result<Expr> {
    let text = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(text);
    if let Some((l, r)) = split_binary_keyword(text, &level, "XOR") {
        return Ok(Expr::Logic {
            op: LogicOp::Xor,
            left: Box::new(parse_xor(l)?),
            right: Box::new(parse_and(r)?),
        });
    }
    parse_and(text)
}

fn parse_and(text: &str) -> Result<Expr> {
    let text = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(text);
    if let Some((l, r)) = split_binary_keyword(text, &level, "AND") {
        return Ok(Expr::Logic {
            op: LogicOp::And,
            left: Box::new(parse_and(l)?),
            right: Box::new(parse_not(r)?),
        });
    }
    parse_not(text)
}

fn parse_not(text: &str) -> Result<Expr> {
    let text = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(text);
    if let Some(end) = scan::match_word(text, &level, 0, "NOT") {
        return Ok(Expr::Not(Box::new(parse_not(&text[end..])?)));
    }
    parse_case(text)
}

fn parse_case(text: &str) -> Result<Expr> {
    let trimmed = text.trim();
    let level = LevelMap::compute(trimmed);
    if scan::match_word(trimmed, &level, 0, "CASE").is_some() {
        return parse_case_body(trimmed, &level);
    }
    parse_exists(text)
}

fn parse_case_body(text: &str, level: &LevelMap) -> Result<Expr> {
    let case_end = scan::match_word(text, level, 0, "CASE").unwrap();
    let end_pos = find_first_top_level_word(text, level, "END")
        .ok_or_else(|| Error::other("Unterminated CASE expression"))?
        .0;
    let body = text[case_end..end_pos].trim();
    let level_body = LevelMap::compute(body);

    let (operand, rest) = if let Some((when_pos, _)) = find_first_top_level_word(body, &level_body, "WHEN") {
        let operand_text = body[..when_pos].trim();
        let operand = if operand_text.is_empty() {
            None
        } else {
            Some(Box::new(parse_expression(operand_text)?))
        };
        (operand, &body[when_pos..])
    } else {
        (None, body)
    };

    let level_rest = LevelMap::compute(rest);
    let mut whens = Vec::new();
    let mut cursor = 0;
    let mut else_expr = None;
    loop {
        let Some((when_pos, when_end)) = find_first_top_level_word(&rest[cursor..], &LevelMap::compute(&rest[cursor..]), "WHEN") else {
            break;
        };
        let abs_when_end = cursor + when_end;
        let search_from = &rest[abs_when_end..];
        let search_level = LevelMap::compute(search_from);
        let then_pos = find_first_top_level_word(search_from, &search_level, "THEN")
            .ok_or_else(|| Error::other("Unterminated CASE expression"))?;
        let when_expr_text = search_from[..then_pos.0].trim();
        let after_then = &search_from[then_pos.1..];
        let after_level = LevelMap::compute(after_then);
        let next_when = find_first_top_level_word(after_then, &after_level, "WHEN");
        let next_else = find_first_top_level_word(after_then, &after_level, "ELSE");
        let stop = match (next_when, next_else) {
            (Some(w), Some(e)) => w.0.min(e.0),
            (Some(w), None) => w.0,
            (None, Some(e)) => e.0,
            (None, None) => after_then.len(),
        };
        let then_expr_text = after_then[..stop].trim();
        whens.push((parse_expression(when_expr_text)?, parse_expression(then_expr_text)?));
        let consumed = abs_when_end + then_pos.1 + stop;
        if next_when.map(|w| w.0) == Some(stop) {
            cursor = consumed;
            continue;
        }
        if next_else.map(|e| e.0) == Some(stop) {
            let else_level = LevelMap::compute(&rest[consumed..]);
            let else_end = scan::match_word(&rest[consumed..], &else_level, 0, "ELSE").unwrap();
            else_expr = Some(Box::new(parse_expression(&rest[consumed + else_end..])?));
        }
        break;
    }
    let _ = level_rest;
    Ok(Expr::Case {
        operand,
        whens,
        else_expr,
    })
}

fn parse_exists(text: &str) -> Result<Expr> {
    let trimmed = text.trim();
    let level = LevelMap::compute(trimmed);
    if let Some(end) = scan::match_word(trimmed, &level, 0, "EXISTS") {
        let rest = trimmed[end..].trim_start();
        if let Some(body) = rest.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            let segmented = crate::segment::segment(body);
            if segmented.diagnostics.iter().any(|d| d.is_error()) {
                return Err(Error::parse(CypCode::UnexpectedTokens, "Invalid EXISTS subquery", Span::point(0)));
            }
            let statement = segmented.statements.into_iter().next().unwrap_or_default();
            let query = crate::ast::build_query(&statement)?;
            return Ok(Expr::ExistsSubquery(Box::new(query)));
        }
    }
    parse_list_or_map(text)
}

fn parse_list_or_map(text: &str) -> Result<Expr> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        return parse_list_literal(trimmed);
    }
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return parse_map_literal(trimmed);
    }
    parse_comparison(text)
}

fn parse_list_literal(text: &str) -> Result<Expr> {
    let inner = &text[1..text.len() - 1];
    let level = LevelMap::compute(inner);
    if let Some((pipe_pos, _)) = find_first_top_level_char(inner, &level, '|') {
        let head = inner[..pipe_pos].trim();
        let projection = inner[pipe_pos + 1..].trim();
        let head_level = LevelMap::compute(head);
        // `x IN list [WHERE pred] | projection` vs a pattern comprehension
        // `pattern [WHERE pred] | projection` (spec §4.7 step 8): the
        // former always has a top-level `IN`, the latter never does.
        if let Some((in_pos, in_end)) = find_first_top_level_word(head, &head_level, "IN") {
            let variable = head[..in_pos].trim().trim_matches('`').to_string();
            let after_in = &head[in_end..];
            let after_level = LevelMap::compute(after_in);
            let (list_text, where_text) = match find_first_top_level_word(after_in, &after_level, "WHERE") {
                Some((w, we)) => (after_in[..w].trim(), Some(after_in[we..].trim())),
                None => (after_in.trim(), None),
            };
            return Ok(Expr::ListComprehension {
                variable,
                list: Box::new(parse_expression(list_text)?),
                where_expr: where_text.map(parse_expression).transpose()?.map(Box::new),
                map_expr: if projection.is_empty() {
                    None
                } else {
                    Some(Box::new(parse_expression(projection)?))
                },
            });
        }
        let (pattern_text, where_text) = match find_first_top_level_word(head, &head_level, "WHERE") {
            Some((w, we)) => (head[..w].trim(), Some(head[we..].trim())),
            None => (head, None),
        };
        let chain = crate::pattern::parse_pattern_chain(pattern_text, Span::default())?;
        if projection.is_empty() {
            return Err(Error::other("Invalid pattern comprehension"));
        }
        return Ok(Expr::PatternComprehension {
            pattern: Box::new(chain),
            where_expr: where_text.map(parse_expression).transpose()?.map(Box::new),
            map_expr: Box::new(parse_expression(projection)?),
        });
    }
    if inner.trim().is_empty() {
        return Ok(Expr::List(Vec::new()));
    }
    let items = scan::split_top_level(inner, ',');
    let items = items
        .into_iter()
        .map(parse_expression)
        .collect::<Result<Vec<_>>>()?;
    Ok(Expr::List(items))
}

fn parse_map_literal(text: &str) -> Result<Expr> {
    let inner = &text[1..text.len() - 1];
    if inner.trim().is_empty() {
        return Ok(Expr::Map(Vec::new()));
    }
    let mut entries = Vec::new();
    for part in scan::split_top_level(inner, ',') {
        let (key, value) = part.split_once(':').ok_or_else(|| Error::other("Invalid map entry"))?;
        entries.push((key.trim().trim_matches('`').to_string(), parse_expression(value.trim())?));
    }
    Ok(Expr::Map(entries))
}

const COMPARE_OPS: &[(&str, CompareOp)] = &[
    ("<>", CompareOp::Ne),
    ("!=", CompareOp::Ne),
    ("<=", CompareOp::Le),
    (">=", CompareOp::Ge),
    ("=", CompareOp::Eq),
    ("<", CompareOp::Lt),
    (">", CompareOp::Gt),
];

fn find_top_level_operator<'a>(text: &'a str, level: &LevelMap, ops: &[(&'a str, CompareOp)]) -> Option<(usize, usize, CompareOp)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    'outer: while i < bytes.len() {
        if level.is_top_level(i) {
            for (op, kind) in ops {
                if text[i..].starts_with(op) {
                    // avoid matching '=' inside '<=' etc: longest ops listed first already.
                    return Some((i, i + op.len(), *kind));
                }
            }
        }
        i += 1;
        continue 'outer;
    }
    None
}

fn find_first_top_level_char(text: &str, level: &LevelMap, ch: char) -> Option<(usize, usize)> {
    scan::find_top_level_char(text, level, 0, ch).map(|p| (p, p + ch.len_utf8()))
}

/// Chained comparison (spec step 10): collects all top-level comparison
/// operators left to right into `Comparison(pairs, last_operand)`.
fn parse_comparison(text: &str) -> Result<Expr> {
    let trimmed = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(trimmed);
    let mut operands = Vec::new();
    let mut ops = Vec::new();
    let mut cursor = 0;
    loop {
        let remaining = &trimmed[cursor..];
        let remaining_level = LevelMap::compute(remaining);
        match find_top_level_operator(remaining, &remaining_level, COMPARE_OPS) {
            Some((start, end, op)) => {
                operands.push(remaining[..start].trim());
                ops.push(op);
                cursor += end;
            }
            None => {
                operands.push(remaining.trim());
                break;
            }
        }
    }
    let _ = level;
    if ops.is_empty() {
        return parse_string_predicate(trimmed);
    }
    let mut pairs = Vec::with_capacity(ops.len());
    for (operand, op) in operands[..operands.len() - 1].iter().zip(ops.into_iter()) {
        pairs.push((parse_string_predicate(operand)?, op));
    }
    let last = parse_string_predicate(operands.last().unwrap())?;
    Ok(Expr::Comparison(pairs, Box::new(last)))
}

const STRING_PRED_WORDS: &[(&[&str], StringPredOp)] = &[
    (&["STARTS", "WITH"], StringPredOp::StartsWith),
    (&["ENDS", "WITH"], StringPredOp::EndsWith),
    (&["CONTAINS"], StringPredOp::Contains),
];

fn parse_string_predicate(text: &str) -> Result<Expr> {
    let trimmed = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(trimmed);
    for (parts, op) in STRING_PRED_WORDS {
        for (pos, _) in trimmed.char_indices() {
            if let Some(end) = scan::match_word_sequence(trimmed, &level, pos, parts) {
                let left = &trimmed[..pos];
                let right = &trimmed[end..];
                if left.trim().is_empty() {
                    continue;
                }
                return Ok(Expr::StringPredicate {
                    op: *op,
                    left: Box::new(parse_is_null(left)?),
                    right: Box::new(parse_is_null(right)?),
                });
            }
        }
    }
    parse_is_null(text)
}

fn parse_is_null(text: &str) -> Result<Expr> {
    let trimmed = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(trimmed);
    if let Some((pos, _)) = find_first_top_level_word(trimmed, &level, "IS") {
        let after_is = trimmed[pos + 2..].trim_start();
        let after_level = LevelMap::compute(after_is);
        let (negated, after_not) = match scan::match_word(after_is, &after_level, 0, "NOT") {
            Some(end) => (true, after_is[end..].trim_start()),
            None => (false, after_is),
        };
        let after_not_level = LevelMap::compute(after_not);
        if let Some(end) = scan::match_word(after_not, &after_not_level, 0, "NULL") {
            if after_not[end..].trim().is_empty() {
                let operand = trimmed[..pos].trim();
                return Ok(Expr::IsNull {
                    operand: Box::new(parse_in(operand)?),
                    negated,
                });
            }
        }
    }
    parse_in(text)
}

fn parse_in(text: &str) -> Result<Expr> {
    let trimmed = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(trimmed);
    if let Some((pos, end)) = find_first_top_level_word(trimmed, &level, "IN") {
        let left = trimmed[..pos].trim();
        if !left.is_empty() {
            return Ok(Expr::In {
                item: Box::new(parse_label_check(left)?),
                list: Box::new(parse_label_check(&trimmed[end..])?),
            });
        }
    }
    parse_label_check(text)
}

fn parse_label_check(text: &str) -> Result<Expr> {
    let trimmed = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(trimmed);
    if let Some(colon) = scan::find_top_level_char(trimmed, &level, 0, ':') {
        let rest = &trimmed[colon..];
        if rest[1..].chars().next().map(|c| c.is_alphabetic() || c == '_').unwrap_or(false) {
            let target_text = trimmed[..colon].trim();
            if !target_text.is_empty() && is_plausible_label_target(target_text) {
                let mut labels = Vec::new();
                let mut cursor = colon;
                loop {
                    let seg = &trimmed[cursor..];
                    let Some(stripped) = seg.strip_prefix(':') else { break };
                    let end = stripped
                        .find(':')
                        .unwrap_or(stripped.len());
                    labels.push(stripped[..end].trim().to_string());
                    cursor += 1 + end;
                    if cursor >= trimmed.len() {
                        break;
                    }
                }
                return Ok(Expr::LabelCheck {
                    target: Box::new(parse_pattern_predicate(target_text)?),
                    labels,
                });
            }
        }
    }
    parse_pattern_predicate(text)
}

/// Heuristic: a label-check target must look like a variable/property
/// access, not an arithmetic expression containing its own `:`-like map.
fn is_plausible_label_target(text: &str) -> bool {
    !text.contains(['{', '['])
}

fn parse_pattern_predicate(text: &str) -> Result<Expr> {
    let trimmed = text.trim();
    if trimmed.starts_with('(') {
        // A pattern predicate has trailing relationship syntax after the
        // first balanced node pattern (`-`/`<` at top level past it).
        if let Some(node_end) = matching_paren_end(trimmed) {
            let tail = trimmed[node_end..].trim_start();
            if tail.starts_with('-') || tail.starts_with('<') {
                if let Ok(chain) = crate::pattern::parse_pattern_chain(trimmed, Span::default()) {
                    return Ok(Expr::PatternPredicate(Box::new(chain)));
                }
            }
        }
    }
    parse_additive(text)
}

fn matching_paren_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'(') {
        return None;
    }
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

const ADDITIVE_OPS: &[(&str, ArithOp)] = &[("+", ArithOp::Add), ("-", ArithOp::Subtract)];
const MULT_OPS: &[(&str, ArithOp)] = &[("*", ArithOp::Multiply), ("/", ArithOp::Divide), ("%", ArithOp::Modulo)];

fn find_arith_operator<'a>(text: &'a str, level: &LevelMap, ops: &[(&'a str, ArithOp)], from_right: bool) -> Option<(usize, usize, ArithOp)> {
    let bytes = text.as_bytes();
    let indices: Vec<usize> = if from_right {
        (0..bytes.len()).rev().collect()
    } else {
        (0..bytes.len()).collect()
    };
    for i in indices {
        if i == 0 || !level.is_top_level(i) {
            continue;
        }
        // skip unary sign directly after another operator or at expression start
        let prev = text[..i].trim_end();
        let prev_is_operator_or_empty = prev.is_empty() || prev.ends_with(['+', '-', '*', '/', '%', '^', '(', ',']);
        for (op, kind) in ops {
            if text[i..].starts_with(op) && !prev_is_operator_or_empty {
                return Some((i, i + op.len(), *kind));
            }
        }
    }
    None
}

fn parse_additive(text: &str) -> Result<Expr> {
    let trimmed = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(trimmed);
    if let Some((start, end, op)) = find_arith_operator(trimmed, &level, ADDITIVE_OPS, true) {
        return Ok(Expr::Arith {
            op,
            left: Box::new(parse_additive(&trimmed[..start])?),
            right: Box::new(parse_multiplicative(&trimmed[end..])?),
        });
    }
    parse_multiplicative(text)
}

fn parse_multiplicative(text: &str) -> Result<Expr> {
    let trimmed = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(trimmed);
    if let Some((start, end, op)) = find_arith_operator(trimmed, &level, MULT_OPS, true) {
        return Ok(Expr::Arith {
            op,
            left: Box::new(parse_multiplicative(&trimmed[..start])?),
            right: Box::new(parse_power(&trimmed[end..])?),
        });
    }
    parse_power(text)
}

fn parse_power(text: &str) -> Result<Expr> {
    let trimmed = strip_enclosing_parens(text.trim());
    let level = LevelMap::compute(trimmed);
    if let Some(pos) = scan::find_top_level_char(trimmed, &level, 0, '^') {
        // right-associative: recurse into the right side for further '^'.
        return Ok(Expr::Arith {
            op: ArithOp::Power,
            left: Box::new(parse_unary(&trimmed[..pos])?),
            right: Box::new(parse_power(&trimmed[pos + 1..])?),
        });
    }
    parse_unary(text)
}

fn parse_unary(text: &str) -> Result<Expr> {
    let trimmed = strip_enclosing_parens(text.trim());
    if let Some(rest) = trimmed.strip_prefix('-') {
        return Ok(Expr::Negate(Box::new(parse_unary(rest)?)));
    }
    parse_postfix(trimmed)
}

/// Index/slice, function call, property access, then bare atoms (spec
/// steps 18-21), all left-associative and applied to the same primary.
fn parse_postfix(text: &str) -> Result<Expr> {
    let trimmed = strip_enclosing_parens(text.trim());
    if let Some(index_start) = trailing_bracket_start(trimmed) {
        let target_text = trimmed[..index_start].trim();
        if !target_text.is_empty() {
            let inner = &trimmed[index_start + 1..trimmed.len() - 1];
            let inner_level = LevelMap::compute(inner);
            if let Some(dots) = find_slice_dots(inner, &inner_level) {
                let lo = inner[..dots].trim();
                let hi = inner[dots + 2..].trim();
                return Ok(Expr::Slice {
                    target: Box::new(parse_postfix(target_text)?),
                    lo: if lo.is_empty() { None } else { Some(Box::new(parse_expression(lo)?)) },
                    hi: if hi.is_empty() { None } else { Some(Box::new(parse_expression(hi)?)) },
                });
            }
            return Ok(Expr::Index {
                target: Box::new(parse_postfix(target_text)?),
                index: Box::new(parse_expression(inner)?),
            });
        }
    }
    if let Some(expr) = try_parse_function_call(trimmed)? {
        return Ok(expr);
    }
    if let Some(dot) = trailing_top_level_dot(trimmed) {
        let target_text = trimmed[..dot].trim();
        let prop = trimmed[dot + 1..].trim().trim_matches('`');
        if !target_text.is_empty() && is_ident(prop) {
            return Ok(Expr::Property {
                target: Box::new(parse_postfix(target_text)?),
                name: prop.to_string(),
            });
        }
    }
    parse_atom(trimmed)
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn trailing_bracket_start(text: &str) -> Option<usize> {
    if !text.ends_with(']') {
        return None;
    }
    let level = LevelMap::compute(text);
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for i in (0..bytes.len()).rev() {
        if bytes[i] == b']' {
            depth += 1;
        } else if bytes[i] == b'[' {
            depth -= 1;
            if depth == 0 && level.is_top_level(i) {
                return (i > 0).then_some(i);
            }
        }
    }
    None
}

fn find_slice_dots(text: &str, level: &LevelMap) -> Option<usize> {
    let bytes = text.as_bytes();
    for i in 0..bytes.len().saturating_sub(1) {
        if level.is_top_level(i) && bytes[i] == b'.' && bytes[i + 1] == b'.' {
            return Some(i);
        }
    }
    None
}

fn trailing_top_level_dot(text: &str) -> Option<usize> {
    let level = LevelMap::compute(text);
    scan::rfind_top_level_char(text, &level, '.')
}

fn try_parse_function_call(text: &str) -> Result<Option<Expr>> {
    if !text.ends_with(')') {
        return Ok(None);
    }
    let level = LevelMap::compute(text);
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut open = None;
    for i in (0..bytes.len()).rev() {
        if bytes[i] == b')' {
            depth += 1;
        } else if bytes[i] == b'(' {
            depth -= 1;
            if depth == 0 && level.is_top_level(i) {
                open = Some(i);
                break;
            }
        }
    }
    let Some(open) = open else { return Ok(None) };
    let name_part = text[..open].trim();
    if name_part.is_empty() || !name_part.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return Ok(None);
    }
    let args_text = &text[open + 1..text.len() - 1];

    if let Some(kind) = quantifier_kind(name_part) {
        let q_level = LevelMap::compute(args_text);
        let (in_pos, in_end) = find_first_top_level_word(args_text, &q_level, "IN")
            .ok_or_else(|| Error::other("Invalid quantifier expression"))?;
        let variable = args_text[..in_pos].trim().trim_matches('`').to_string();
        let after_in = &args_text[in_end..];
        let after_level = LevelMap::compute(after_in);
        let (list_text, where_text) = find_first_top_level_word(after_in, &after_level, "WHERE")
            .map(|(w, we)| (after_in[..w].trim(), after_in[we..].trim()))
            .ok_or_else(|| Error::other("Invalid quantifier expression"))?;
        return Ok(Some(Expr::Quantifier {
            kind,
            variable,
            list: Box::new(parse_expression(list_text)?),
            predicate: Box::new(parse_expression(where_text)?),
        }));
    }

    let mut distinct = false;
    let mut args_text = args_text.trim();
    let args_level = LevelMap::compute(args_text);
    if let Some(end) = scan::match_word(args_text, &args_level, 0, "DISTINCT") {
        distinct = true;
        args_text = args_text[end..].trim_start();
    }
    let args = if args_text.trim().is_empty() && args_text.trim() != "*" {
        Vec::new()
    } else if args_text.trim() == "*" {
        vec![Expr::FunctionCall {
            name: "*".to_string(),
            args: vec![],
            distinct: false,
        }]
    } else {
        scan::split_top_level(args_text, ',')
            .into_iter()
            .map(parse_expression)
            .collect::<Result<Vec<_>>>()?
    };
    Ok(Some(Expr::FunctionCall {
        name: name_part.to_string(),
        args,
        distinct,
    }))
}

fn quantifier_kind(name: &str) -> Option<QuantifierKind> {
    match name.to_lowercase().as_str() {
        "any" => Some(QuantifierKind::Any),
        "all" => Some(QuantifierKind::All),
        "none" => Some(QuantifierKind::None),
        "single" => Some(QuantifierKind::Single),
        _ => None,
    }
}

fn parse_atom(text: &str) -> Result<Expr> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::other("Invalid pattern in expression"));
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Ok(Expr::Bool(true));
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Ok(Expr::Bool(false));
    }
    if trimmed.eq_ignore_ascii_case("null") {
        return Ok(Expr::Null);
    }
    if let Some(rest) = trimmed.strip_prefix('$') {
        return Ok(Expr::Parameter(match rest.parse::<u64>() {
            Ok(n) => Param::Index(n),
            Err(_) => Param::Name(rest.trim_matches('`').to_string()),
        }));
    }
    if let Some(s) = strip_quoted_string(trimmed) {
        return Ok(Expr::String(s));
    }
    if let Some(n) = parse_number_literal(trimmed) {
        return Ok(n);
    }
    if let Some(stripped) = trimmed.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return Ok(Expr::Variable(stripped.to_string()));
    }
    if is_ident(trimmed) {
        return Ok(Expr::Variable(trimmed.to_string()));
    }
    Err(Error::other(format!("Invalid pattern in expression: {trimmed}")))
}

fn strip_quoted_string(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let quote = bytes[0];
    if (quote != b'\'' && quote != b'"') || bytes[bytes.len() - 1] != quote {
        return None;
    }
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

fn parse_number_literal(text: &str) -> Option<Expr> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(Expr::Int);
    }
    if let Some(oct) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        return i64::from_str_radix(oct, 8).ok().map(Expr::Int);
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Expr::Int(i));
    }
    if let Ok(f) = text.parse::<f64>() {
        if text.chars().next().map(|c| c.is_ascii_digit() || c == '.').unwrap_or(false) {
            return Some(Expr::Float(f));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arithmetic_with_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        match expr {
            Expr::Arith { op: ArithOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::Arith { op: ArithOp::Multiply, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_chained_comparison() {
        let expr = parse_expression("a < b < c").unwrap();
        match expr {
            Expr::Comparison(pairs, _) => assert_eq!(pairs.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_property_access() {
        let expr = parse_expression("n.age").unwrap();
        assert_eq!(
            expr,
            Expr::Property {
                target: Box::new(Expr::Variable("n".to_string())),
                name: "age".to_string(),
            }
        );
    }

    #[test]
    fn parses_function_call_with_args() {
        let expr = parse_expression("coalesce(n.name, 'x')").unwrap();
        match expr {
            Expr::FunctionCall { name, args, .. } => {
                assert_eq!(name, "coalesce");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_is_null() {
        let expr = parse_expression("n.name IS NOT NULL").unwrap();
        match expr {
            Expr::IsNull { negated, .. } => assert!(negated),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_list_literal() {
        let expr = parse_expression("[1, 2, 3]").unwrap();
        assert_eq!(expr, Expr::List(vec![Expr::Int(1), Expr::Int(2), Expr::Int(3)]));
    }
}
