//! Top-level, string/bracket-aware text scanning shared by the clause
//! segmenter (spec §4.2), the expression parser (§4.7), and the pattern
//! parser (§4.5). "Top level" means paren/bracket/brace depth zero and no
//! open single/double/backtick-quoted string; backslash escapes apply only
//! inside single- and double-quoted strings, never inside backticks.

/// Per-byte-offset record of whether that position sits at top level,
/// computed once per scanned string.
#[derive(Debug, Clone)]
pub struct LevelMap {
    top_level: Vec<bool>,
}

impl LevelMap {
    pub fn compute(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut top_level = vec![false; bytes.len() + 1];
        let mut depth: i32 = 0;
        let mut quote: Option<u8> = None;
        let mut escaped = false;
        for (i, &b) in bytes.iter().enumerate() {
            top_level[i] = depth == 0 && quote.is_none();
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
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                _ => {}
            }
        }
        top_level[bytes.len()] = depth == 0 && quote.is_none();
        Self { top_level }
    }

    pub fn is_top_level(&self, idx: usize) -> bool {
        self.top_level.get(idx).copied().unwrap_or(false)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True if `pos` is not preceded by an identifier character (a "word start").
pub fn is_word_start(text: &str, pos: usize) -> bool {
    match text[..pos].chars().next_back() {
        Some(c) => !is_ident_char(c),
        None => true,
    }
}

/// True if the byte at `pos` (end of a matched word) is not itself an
/// identifier character continuing the word.
pub fn is_word_end(text: &str, pos: usize) -> bool {
    match text[pos..].chars().next() {
        Some(c) => !is_ident_char(c),
        None => true,
    }
}

/// If `text[pos..]` case-insensitively starts with the single word `word`
/// at a top-level position and word boundary, returns the end offset.
pub fn match_word(text: &str, level: &LevelMap, pos: usize, word: &str) -> Option<usize> {
    if !level.is_top_level(pos) || !is_word_start(text, pos) {
        return None;
    }
    let rest = text.get(pos..)?;
    if rest.len() < word.len() {
        return None;
    }
    let candidate = &rest[..word.len()];
    if candidate.eq_ignore_ascii_case(word) {
        let end = pos + word.len();
        if is_word_end(text, end) {
            return Some(end);
        }
    }
    None
}

/// Skips whitespace/comments starting at `pos`, returning the new offset.
/// Requires at least one whitespace character between keyword components.
pub fn skip_required_whitespace(text: &str, pos: usize) -> Option<usize> {
    let mut end = pos;
    let mut seen = false;
    for c in text[pos..].chars() {
        if c.is_whitespace() {
            seen = true;
            end += c.len_utf8();
        } else {
            break;
        }
    }
    if seen { Some(end) } else { None }
}

/// Matches a multi-word keyword such as `["ORDER", "BY"]` starting at `pos`,
/// tolerating arbitrary whitespace between the components. Returns the end
/// offset of the full match.
pub fn match_word_sequence(text: &str, level: &LevelMap, pos: usize, parts: &[&str]) -> Option<usize> {
    let mut cursor = pos;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            cursor = skip_required_whitespace(text, cursor)?;
        }
        cursor = match_word(text, level, cursor, part)?;
    }
    Some(cursor)
}

/// First top-level occurrence of a single-character delimiter at or after `from`.
pub fn find_top_level_char(text: &str, level: &LevelMap, from: usize, ch: char) -> Option<usize> {
    let mut idx = from;
    for c in text[from..].chars() {
        if level.is_top_level(idx) && c == ch {
            return Some(idx);
        }
        idx += c.len_utf8();
    }
    None
}

/// Last top-level occurrence of a single-character delimiter.
pub fn rfind_top_level_char(text: &str, level: &LevelMap, ch: char) -> Option<usize> {
    let mut found = None;
    let mut idx = 0;
    for c in text.chars() {
        if level.is_top_level(idx) && c == ch {
            found = Some(idx);
        }
        idx += c.len_utf8();
    }
    found
}

/// Splits `text` on top-level occurrences of `ch`, trimming each piece.
/// Never splits inside strings or nested brackets.
pub fn split_top_level(text: &str, ch: char) -> Vec<&str> {
    let level = LevelMap::compute(text);
    let mut parts = Vec::new();
    let mut start = 0;
    let mut idx = 0;
    for c in text.chars() {
        if level.is_top_level(idx) && c == ch {
            parts.push(text[start..idx].trim());
            start = idx + c.len_utf8();
        }
        idx += c.len_utf8();
    }
    parts.push(text[start..].trim());
    parts
}

/// The identifier word immediately preceding `pos` (after trimming
/// trailing whitespace), if any. Used to reject keyword matches that are
/// really part of a different construct (`ON CREATE`, `STARTS WITH`).
pub fn preceding_word(text: &str, pos: usize) -> Option<&str> {
    let before = text[..pos].trim_end();
    if before.is_empty() {
        return None;
    }
    let mut start = before.len();
    for (i, c) in before.char_indices().rev() {
        if is_ident_char(c) {
            start = i;
        } else {
            break;
        }
    }
    if start == before.len() {
        None
    } else {
        Some(&before[start..])
    }
}

/// If `text` (trimmed) is fully enclosed by a single matching `(`...`)` pair
/// — i.e. the first char is `(`, the last is `)`, and the opening paren's
/// matching close is exactly the last character — returns the inner slice.
pub fn strip_one_paren_layer(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if !trimmed.starts_with('(') || !trimmed.ends_with(')') {
        return None;
    }
    let level = LevelMap::compute(trimmed);
    // depth at index 0 is 1 (the '(' itself); find where it returns to 0.
    let bytes = trimmed.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
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
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    let _ = level;
                    return if i == bytes.len() - 1 {
                        Some(trimmed[1..i].trim())
                    } else {
                        None
                    };
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_ignores_strings_and_nesting() {
        let text = "MATCH (n) WHERE n.name = 'WHERE' RETURN n";
        let level = LevelMap::compute(text);
        let pos = text.find("WHERE'").unwrap() + "WHERE".len();
        // the WHERE inside the quoted literal must not be top-level.
        let quoted_where = text.find("'WHERE'").unwrap() + 1;
        assert!(!level.is_top_level(quoted_where));
        let _ = pos;
    }

    #[test]
    fn split_top_level_respects_parens() {
        let parts = split_top_level("(a)-[:R]->(b), (c {x: [1,2]})", ',');
        assert_eq!(parts, vec!["(a)-[:R]->(b)", "(c {x: [1,2]})"]);
    }

    #[test]
    fn strip_paren_layer_only_when_fully_enclosing() {
        assert_eq!(strip_one_paren_layer("(1 + 2)"), Some("1 + 2"));
        assert_eq!(strip_one_paren_layer("(a) + (b)"), None);
    }
}
