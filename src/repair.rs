//! Self-healing for JSON emitted by a text model.
//!
//! Repair escalates through fixed tiers and stops at the first one whose
//! output parses:
//!
//! * tier 0: empty, `null` or `""` input means the field was left out on purpose
//! * tier 1: the input already parses and is returned byte-for-byte
//! * tier 2: ordered textual rewrites for the defects models keep producing
//! * tier 3: brace and bracket balancing
//!
//! Anything still broken after tier 3 is reported with a [`RepairDiagnostic`].

use serde::de::IgnoredAny;
use std::fmt;
use thiserror::Error;

/// Characters shown on each side of the parse error in a diagnostic.
pub const CONTEXT_RADIUS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairTier {
    Absent,
    Direct,
    Textual,
    Structural,
}

impl RepairTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairTier::Absent => "absent",
            RepairTier::Direct => "direct",
            RepairTier::Textual => "textual",
            RepairTier::Structural => "structural",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub text: String,
    pub tier: RepairTier,
    /// Every tier that ran, in order. The last entry is `tier`.
    pub tiers_attempted: Vec<RepairTier>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BracketCounts {
    pub open_braces: usize,
    pub close_braces: usize,
    pub open_brackets: usize,
    pub close_brackets: usize,
}

impl BracketCounts {
    pub fn of(text: &str) -> Self {
        let mut counts = Self::default();
        for c in text.chars() {
            match c {
                '{' => counts.open_braces += 1,
                '}' => counts.close_braces += 1,
                '[' => counts.open_brackets += 1,
                ']' => counts.close_brackets += 1,
                _ => {}
            }
        }
        counts
    }

    pub fn is_balanced(&self) -> bool {
        self.open_braces == self.close_braces && self.open_brackets == self.close_brackets
    }
}

/// Operator-facing description of a terminal repair failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairDiagnostic {
    pub message: String,
    /// Character offset of the parse error in the last attempted text.
    pub position: Option<usize>,
    pub line: usize,
    pub column: usize,
    /// Up to `CONTEXT_RADIUS` characters either side of `position`.
    pub context: String,
    /// Caret line aligned under the offending column of `context`.
    pub caret: String,
    pub length: usize,
    /// Counts taken after the textual fixes, before balancing.
    pub counts: BracketCounts,
}

impl fmt::Display for RepairDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(
                f,
                "{} at position {} (line {}, column {})",
                self.message, position, self.line, self.column
            )?,
            None => write!(f, "{}", self.message)?,
        }
        write!(
            f,
            "; length {}; braces {}/{}; brackets {}/{}",
            self.length,
            self.counts.open_braces,
            self.counts.close_braces,
            self.counts.open_brackets,
            self.counts.close_brackets
        )?;
        if !self.context.is_empty() {
            write!(f, "\n{}\n{}", self.context, self.caret)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unrepairable JSON in '{field}': {diagnostic}")]
pub struct UnrepairableJson {
    pub field: String,
    pub diagnostic: RepairDiagnostic,
}

/// Repair `raw` and return the accepted text. An empty string means the
/// field was intentionally absent.
pub fn repair(raw: &str, field: &str) -> Result<String, UnrepairableJson> {
    repair_with_report(raw, field).map(|report| report.text)
}

pub fn repair_with_report(raw: &str, field: &str) -> Result<RepairReport, UnrepairableJson> {
    run_tiers(raw, field, apply_textual_fixes)
}

/// Repair a whole document whose string values must survive untouched.
///
/// Same tiers as [`repair`], but tier 2 skips the character strip so
/// non-ASCII text inside values is never rewritten.
pub fn repair_document(raw: &str, field: &str) -> Result<String, UnrepairableJson> {
    run_tiers(raw, field, apply_separator_fixes).map(|report| report.text)
}

fn run_tiers(
    raw: &str,
    field: &str,
    textual_fixes: fn(&str) -> String,
) -> Result<RepairReport, UnrepairableJson> {
    let mut attempted = vec![RepairTier::Absent];
    if is_intentionally_absent(raw) {
        log::debug!("[repair:{}] field intentionally absent", field);
        return Ok(report(String::new(), attempted));
    }

    attempted.push(RepairTier::Direct);
    if parses(raw) {
        return Ok(report(raw.to_string(), attempted));
    }

    attempted.push(RepairTier::Textual);
    let fixed = textual_fixes(raw);
    if parses(&fixed) {
        log::warn!(
            "[repair:{}] accepted after textual fixes ({} -> {} chars)",
            field,
            raw.len(),
            fixed.len()
        );
        return Ok(report(fixed, attempted));
    }

    attempted.push(RepairTier::Structural);
    let counts = BracketCounts::of(&fixed);
    let balanced = balance_brackets(&fixed);
    match serde_json::from_str::<IgnoredAny>(&balanced) {
        Ok(_) => {
            log::warn!(
                "[repair:{}] accepted after bracket balancing (braces {}/{}, brackets {}/{})",
                field,
                counts.open_braces,
                counts.close_braces,
                counts.open_brackets,
                counts.close_brackets
            );
            Ok(report(balanced, attempted))
        }
        Err(e) => {
            let diagnostic = diagnose(&balanced, &e, counts);
            log::error!("[repair:{}] giving up: {}", field, diagnostic);
            Err(UnrepairableJson {
                field: field.to_string(),
                diagnostic,
            })
        }
    }
}

fn report(text: String, tiers_attempted: Vec<RepairTier>) -> RepairReport {
    let tier = *tiers_attempted.last().unwrap_or(&RepairTier::Absent);
    RepairReport {
        text,
        tier,
        tiers_attempted,
    }
}

fn is_intentionally_absent(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed == "null" || trimmed == "\"\""
}

fn parses(text: &str) -> bool {
    serde_json::from_str::<IgnoredAny>(text).is_ok()
}

/// The four tier-2 rewrites in their required order.
pub fn apply_textual_fixes(raw: &str) -> String {
    apply_separator_fixes(&strip_non_printable(raw))
}

/// Tier-2 rewrites that only touch separators between values.
pub fn apply_separator_fixes(raw: &str) -> String {
    let text = collapse_quoted_separators(raw);
    let text = period_before_property_to_comma(&text);
    remove_trailing_commas(&text)
}

/// Keep printable ASCII plus newline, carriage return and tab.
pub fn strip_non_printable(text: &str) -> String {
    text.chars()
        .filter(|c| matches!(c, ' '..='~' | '\n' | '\r' | '\t'))
        .collect()
}

/// `"}","name` becomes `},"name` (and likewise for `]`).
pub fn collapse_quoted_separators(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let is_match = chars[i] == '"'
            && i + 4 < chars.len()
            && matches!(chars[i + 1], '}' | ']')
            && chars[i + 2] == '"'
            && chars[i + 3] == ','
            && chars[i + 4] == '"';
        if is_match {
            out.push(chars[i + 1]);
            out.push_str(",\"");
            i += 5;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// `."name":` becomes `,"name":`. A period can never precede a property name
/// in valid JSON.
pub fn period_before_property_to_comma(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '.' && chars.get(i + 1) == Some(&'"') && is_property_name_at(&chars, i + 1) {
            out.push(',');
        } else {
            out.push(chars[i]);
        }
        i += 1;
    }
    out
}

/// True when `chars[start]` opens a quoted name that is followed by a colon.
fn is_property_name_at(chars: &[char], start: usize) -> bool {
    let mut j = start + 1;
    while j < chars.len() && chars[j] != '"' {
        if chars[j] == '\\' || chars[j] == '\n' {
            return false;
        }
        j += 1;
    }
    if j >= chars.len() || j == start + 1 {
        return false;
    }
    j += 1;
    while j < chars.len() && chars[j].is_ascii_whitespace() {
        j += 1;
    }
    chars.get(j) == Some(&':')
}

/// Drop commas whose next non-whitespace character is `}`, `]` or the end of
/// the text.
pub fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_ascii_whitespace());
            if matches!(next, None | Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Tier 3. Excess closers are stripped from the end; missing closers are
/// appended in the order the open nesting needs them.
pub fn balance_brackets(text: &str) -> String {
    let counts = BracketCounts::of(text);
    let mut balanced = text.to_string();

    if counts.close_braces > counts.open_braces {
        balanced = strip_trailing(&balanced, '}', counts.close_braces - counts.open_braces);
    }
    if counts.close_brackets > counts.open_brackets {
        balanced = strip_trailing(
            &balanced,
            ']',
            counts.close_brackets - counts.open_brackets,
        );
    }

    let missing_braces = counts.open_braces.saturating_sub(counts.close_braces);
    let missing_brackets = counts.open_brackets.saturating_sub(counts.close_brackets);
    if missing_braces > 0 || missing_brackets > 0 {
        let suffix = closing_suffix(&balanced, missing_braces, missing_brackets);
        balanced.push_str(&suffix);
    }
    balanced
}

fn strip_trailing(text: &str, target: char, mut excess: usize) -> String {
    let mut kept: Vec<char> = Vec::with_capacity(text.len());
    for c in text.chars().rev() {
        if excess > 0 && c == target {
            excess -= 1;
            continue;
        }
        kept.push(c);
    }
    kept.into_iter().rev().collect()
}

fn closing_suffix(text: &str, mut braces: usize, mut brackets: usize) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => stack.push(c),
            '}' if stack.last() == Some(&'{') => {
                stack.pop();
            }
            ']' if stack.last() == Some(&'[') => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut suffix = String::new();
    for opener in stack.iter().rev() {
        match opener {
            '{' if braces > 0 => {
                suffix.push('}');
                braces -= 1;
            }
            '[' if brackets > 0 => {
                suffix.push(']');
                brackets -= 1;
            }
            _ => {}
        }
    }
    suffix.extend(std::iter::repeat('}').take(braces));
    suffix.extend(std::iter::repeat(']').take(brackets));
    suffix
}

fn diagnose(text: &str, error: &serde_json::Error, counts: BracketCounts) -> RepairDiagnostic {
    let line = error.line();
    let column = error.column();
    let position = char_offset(text, line, column);
    let (context, caret) = match position {
        Some(position) => context_window(text, position),
        None => (String::new(), String::new()),
    };
    RepairDiagnostic {
        message: error.to_string(),
        position,
        line,
        column,
        context,
        caret,
        length: text.chars().count(),
        counts,
    }
}

/// serde_json reports 1-based lines and columns; column 0 means the error was
/// found before the first character of that line.
fn char_offset(text: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let mut offset = 0;
    for (index, content) in text.split('\n').enumerate() {
        if index + 1 == line {
            let within = column.saturating_sub(1).min(content.chars().count());
            return Some(offset + within);
        }
        offset += content.chars().count() + 1;
    }
    Some(text.chars().count())
}

fn context_window(text: &str, position: usize) -> (String, String) {
    let chars: Vec<char> = text.chars().collect();
    let position = position.min(chars.len());
    let start = position.saturating_sub(CONTEXT_RADIUS);
    let end = (position + CONTEXT_RADIUS).min(chars.len());
    let context: String = chars[start..end]
        .iter()
        .map(|c| if c.is_whitespace() { ' ' } else { *c })
        .collect();
    let caret = format!("{}^", " ".repeat(position - start));
    (context, caret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_DOCS: &[&str] = &[
        r#"{"scene":"desk"}"#,
        "{\n  \"style\": {\"mood\": \"calm\"},\n  \"tags\": [1, 2, 3]\n}",
        r#"[{"a":null},{"b":true}]"#,
        r#"{"text":"Stay. Hungry.","negative":["blur" ,"logos"]}"#,
        "  {\"padded\": 1}  ",
    ];

    #[test]
    fn valid_json_is_returned_byte_for_byte() {
        for doc in VALID_DOCS {
            let report = repair_with_report(doc, "imagePromptPayload").unwrap();
            assert_eq!(report.text, *doc);
            assert_eq!(report.tier, RepairTier::Direct);
            assert_eq!(
                report.tiers_attempted,
                vec![RepairTier::Absent, RepairTier::Direct]
            );
        }
    }

    #[test]
    fn repair_is_deterministic() {
        let inputs = [
            r#"{"scene":"desk"},"#,
            r#"{"a":{"b":[1,2"#,
            r#"{"a":"x"."b":1}"#,
            r#"{"a": "never closed"#,
        ];
        for input in inputs {
            let first = repair(input, "field").map_err(|e| e.diagnostic);
            for _ in 0..5 {
                assert_eq!(repair(input, "field").map_err(|e| e.diagnostic), first);
            }
        }
    }

    #[test]
    fn absent_markers_become_empty() {
        for raw in ["", "   \n", "null", " null ", "\"\""] {
            let report = repair_with_report(raw, "videoPromptPayload").unwrap();
            assert_eq!(report.text, "");
            assert_eq!(report.tier, RepairTier::Absent);
        }
    }

    #[test]
    fn trailing_comma_after_document_is_stripped_by_textual_tier() {
        let report = repair_with_report(r#"{"scene":"desk"},"#, "imagePromptPayload").unwrap();
        assert_eq!(report.text, r#"{"scene":"desk"}"#);
        assert_eq!(report.tier, RepairTier::Textual);
        assert!(!report.tiers_attempted.contains(&RepairTier::Structural));
    }

    #[test]
    fn textual_fixes_cover_known_model_defects() {
        assert_eq!(strip_non_printable("{\"a\":\"b\u{0915}\"}\n"), "{\"a\":\"b\"}\n");
        assert_eq!(
            collapse_quoted_separators(r#"{"a":{"x":1"}","b":2}"#),
            r#"{"a":{"x":1},"b":2}"#
        );
        assert_eq!(
            period_before_property_to_comma(r#"{"a":"x"."b":1}"#),
            r#"{"a":"x","b":1}"#
        );
        assert_eq!(
            period_before_property_to_comma(r#"{"a":"Be kind. Always."}"#),
            r#"{"a":"Be kind. Always."}"#
        );
        assert_eq!(remove_trailing_commas("[1, 2, ]"), "[1, 2 ]");
        assert_eq!(remove_trailing_commas("{\"a\":1,\n}"), "{\"a\":1\n}");
    }

    #[test]
    fn combined_textual_defects_repair_in_one_pass() {
        let raw = "{\"scene\":{\"count\":2\"}\",\"lighting\":\"soft\".\"camera\":\"35mm\",}";
        let report = repair_with_report(raw, "imagePromptPayload").unwrap();
        assert_eq!(report.tier, RepairTier::Textual);
        let value: serde_json::Value = serde_json::from_str(&report.text).unwrap();
        assert_eq!(value["camera"], "35mm");
        assert_eq!(value["scene"]["count"], 2);
    }

    #[test]
    fn document_repair_keeps_non_ascii_values() {
        let raw = "{\"quote\":{\"text\":\"Café — ça va, naïve.\"},\"metadata\":{\"author\":\"Zoë\"},}";
        let text = repair_document(raw, "spec").unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["quote"]["text"], "Café — ça va, naïve.");
        assert_eq!(value["metadata"]["author"], "Zoë");

        let stripped = repair(raw, "spec").unwrap();
        assert!(!stripped.contains("Zoë"));
    }

    #[test]
    fn truncated_document_is_closed_in_nesting_order() {
        let report = repair_with_report(r#"{"a":{"b":[1,2"#, "field").unwrap();
        assert_eq!(report.tier, RepairTier::Structural);
        assert_eq!(report.text, r#"{"a":{"b":[1,2]}}"#);
    }

    #[test]
    fn excess_closers_are_stripped_from_the_end() {
        assert_eq!(repair(r#"{"a":1}}"#, "field").unwrap(), r#"{"a":1}"#);
        assert_eq!(repair(r#"{"a":[1,2]]}"#, "field").unwrap(), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn unrepairable_input_reports_diagnostic() {
        let err = repair(r#"{"a": "never closed"#, "imagePromptPayload").unwrap_err();
        assert_eq!(err.field, "imagePromptPayload");
        let diagnostic = err.diagnostic;
        assert!(diagnostic.position.is_some());
        assert_eq!(diagnostic.counts.open_braces, 1);
        assert_eq!(diagnostic.counts.close_braces, 0);
        assert!(diagnostic.caret.ends_with('^'));
        assert!(diagnostic.length > 0);
    }

    #[test]
    fn diagnostic_window_is_bounded() {
        let long_value = "x".repeat(500);
        let raw = format!("{{\"a\": \"{}\" \"b\": 1}}", long_value);
        let err = repair(&raw, "field").unwrap_err();
        assert!(err.diagnostic.context.chars().count() <= 2 * CONTEXT_RADIUS);
        let caret_col = err.diagnostic.caret.len() - 1;
        assert!(caret_col <= CONTEXT_RADIUS);
    }

    #[test]
    fn truncated_documents_never_come_back_unbalanced() {
        let doc = r#"{"visual_style":{"palette":["amber","slate"],"mood":"calm"},"scene":{"surface":"oak","props":[{"kind":"lamp"},{"kind":"book"}]},"negative":["blur","logos"],"camera":{"lens":35}}"#;
        let chars: Vec<char> = doc.chars().collect();
        for cut in 0..=chars.len() {
            let prefix: String = chars[..cut].iter().collect();
            match repair_with_report(&prefix, "field") {
                Ok(report) => {
                    if report.tier != RepairTier::Absent {
                        assert!(
                            BracketCounts::of(&report.text).is_balanced(),
                            "unbalanced success for cut {}: {}",
                            cut,
                            report.text
                        );
                        assert!(parses(&report.text));
                    }
                }
                Err(err) => assert!(err.diagnostic.position.is_some() || cut == 0),
            }
        }
    }

    #[test]
    fn balancing_always_levels_counts() {
        for text in ["{{[", "}}]]", "{]", "[}", "{\"a\":[{\"b\":1}"] {
            assert!(BracketCounts::of(&balance_brackets(text)).is_balanced());
        }
    }
}
