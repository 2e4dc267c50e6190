//! Best-effort structural parsing of snapshot content.
//!
//! The watched document is format-agnostic, so parsing here is a hint,
//! never a gate: content that looks like JSON is parsed as JSON, content
//! with markdown headings is split into per-heading sections, and anything
//! else becomes one item per non-empty line with classifier labels from
//! the configured keyword tables. A parse that fails degrades to
//! [`ParsedForm::Unparsed`] with the reason; it never fails the snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ClassifierConfig, KeywordRule};

/// One heading-delimited block of a markdown document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownSection {
    /// Heading text without the `#` markers. Empty for the preamble
    /// before the first heading.
    pub heading: String,
    /// Heading level 1-6; 0 for the preamble.
    pub level: u8,
    /// Lines under the heading, up to the next heading.
    pub body: String,
}

/// One non-empty line of free text with coarse classifier labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeTextItem {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// Structural interpretation of document content at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ParsedForm {
    /// Content parsed as a JSON document.
    Json { value: Value },
    /// Content split at markdown headings.
    Markdown { sections: Vec<MarkdownSection> },
    /// Plain lines, each annotated from the keyword tables.
    FreeText { items: Vec<FreeTextItem> },
    /// Content looked structured but did not parse; raw content is
    /// still stored alongside.
    Unparsed { reason: String },
}

/// Parse content into its best structural form.
pub fn parse_structure(content: &str, classifier: &ClassifierConfig) -> ParsedForm {
    let trimmed = content.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match serde_json::from_str::<Value>(content) {
            Ok(value) => ParsedForm::Json { value },
            Err(e) => ParsedForm::Unparsed {
                reason: format!("looks like JSON but failed to parse: {e}"),
            },
        };
    }

    if content.lines().any(|line| parse_heading(line).is_some()) {
        return ParsedForm::Markdown {
            sections: split_sections(content),
        };
    }

    let items = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| FreeTextItem {
            text: line.to_string(),
            app_type: detect_app_type(line, classifier),
            priority: detect_priority(line, classifier),
        })
        .collect();

    ParsedForm::FreeText { items }
}

/// Label the probable application type of a request line, or `None`
/// when no configured keyword matches.
pub fn detect_app_type(text: &str, classifier: &ClassifierConfig) -> Option<String> {
    match_rules(text, &classifier.app_types)
}

/// Label the probable priority of a request line, or `None` when no
/// configured keyword matches.
pub fn detect_priority(text: &str, classifier: &ClassifierConfig) -> Option<String> {
    match_rules(text, &classifier.priorities)
}

/// First rule whose keywords contain a case-insensitive substring of
/// the text wins; rule order in the config is match priority.
fn match_rules(text: &str, rules: &[KeywordRule]) -> Option<String> {
    let text = text.to_lowercase();

    rules
        .iter()
        .find(|rule| {
            rule.keywords
                .iter()
                .any(|keyword| !keyword.is_empty() && text.contains(&keyword.to_lowercase()))
        })
        .map(|rule| rule.label.clone())
}

/// Parse a markdown heading line into (level, text).
///
/// Mirrors the usual loose rule: one to six leading `#` after optional
/// indentation, and non-empty text after them.
fn parse_heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('#') {
        return None;
    }

    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level > 6 {
        return None;
    }

    let text = trimmed[level..].trim();
    if text.is_empty() {
        return None;
    }

    Some((level as u8, text))
}

/// Split content into heading-delimited sections.
///
/// Lines before the first heading form a level-0 preamble section when
/// they contain anything.
fn split_sections(content: &str) -> Vec<MarkdownSection> {
    let mut sections = Vec::new();
    let mut current: Option<MarkdownSection> = None;
    let mut preamble: Vec<&str> = Vec::new();

    for line in content.lines() {
        if let Some((level, heading)) = parse_heading(line) {
            if let Some(section) = current.take() {
                sections.push(section);
            } else if preamble.iter().any(|l| !l.trim().is_empty()) {
                sections.push(MarkdownSection {
                    heading: String::new(),
                    level: 0,
                    body: preamble.join("\n").trim().to_string(),
                });
            }
            preamble.clear();

            current = Some(MarkdownSection {
                heading: heading.to_string(),
                level,
                body: String::new(),
            });
        } else if let Some(section) = current.as_mut() {
            if !section.body.is_empty() {
                section.body.push('\n');
            }
            section.body.push_str(line);
        } else {
            preamble.push(line);
        }
    }

    if let Some(section) = current.take() {
        sections.push(section);
    }

    for section in &mut sections {
        section.body = section.body.trim().to_string();
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn test_json_content_parses_as_json() {
        let parsed = parse_structure(r#"{"requests": ["a", "b"]}"#, &classifier());
        match parsed {
            ParsedForm::Json { value } => {
                assert_eq!(value["requests"][1], "b");
            }
            other => panic!("expected Json, got {other:?}"),
        }
    }

    #[test]
    fn test_json_array_detected_by_first_byte() {
        let parsed = parse_structure("  [1, 2, 3]", &classifier());
        assert!(matches!(parsed, ParsedForm::Json { .. }));
    }

    #[test]
    fn test_broken_json_degrades_to_unparsed() {
        let parsed = parse_structure("{ not json", &classifier());
        match parsed {
            ParsedForm::Unparsed { reason } => {
                assert!(reason.contains("JSON"), "unexpected reason: {reason}");
            }
            other => panic!("expected Unparsed, got {other:?}"),
        }
    }

    #[test]
    fn test_markdown_splits_per_heading() {
        let content = "# Requests\n\n- first\n\n## Done\n\n- old one\n";
        let parsed = parse_structure(content, &classifier());
        match parsed {
            ParsedForm::Markdown { sections } => {
                assert_eq!(sections.len(), 2);
                assert_eq!(sections[0].heading, "Requests");
                assert_eq!(sections[0].level, 1);
                assert_eq!(sections[0].body, "- first");
                assert_eq!(sections[1].heading, "Done");
                assert_eq!(sections[1].level, 2);
                assert_eq!(sections[1].body, "- old one");
            }
            other => panic!("expected Markdown, got {other:?}"),
        }
    }

    #[test]
    fn test_markdown_preamble_becomes_level_zero_section() {
        let content = "notes before any heading\n\n# First\nbody\n";
        let parsed = parse_structure(content, &classifier());
        match parsed {
            ParsedForm::Markdown { sections } => {
                assert_eq!(sections.len(), 2);
                assert_eq!(sections[0].heading, "");
                assert_eq!(sections[0].level, 0);
                assert_eq!(sections[0].body, "notes before any heading");
                assert_eq!(sections[1].heading, "First");
            }
            other => panic!("expected Markdown, got {other:?}"),
        }
    }

    #[test]
    fn test_hashes_without_text_are_not_headings() {
        let content = "####\nplain line\n";
        let parsed = parse_structure(content, &classifier());
        // No valid heading, so this is free text.
        assert!(matches!(parsed, ParsedForm::FreeText { .. }));
    }

    #[test]
    fn test_free_text_items_get_classifier_labels() {
        let content = "緊急: ウェブサイトの修正\nティータイム\n";
        let parsed = parse_structure(content, &classifier());
        match parsed {
            ParsedForm::FreeText { items } => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].app_type.as_deref(), Some("web"));
                assert_eq!(items[0].priority.as_deref(), Some("high"));
                assert_eq!(items[1].app_type, None);
                assert_eq!(items[1].priority, None);
            }
            other => panic!("expected FreeText, got {other:?}"),
        }
    }

    #[test]
    fn test_free_text_skips_blank_lines() {
        let parsed = parse_structure("one\n\n\ntwo\n", &classifier());
        match parsed {
            ParsedForm::FreeText { items } => {
                let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
                assert_eq!(texts, vec!["one", "two"]);
            }
            other => panic!("expected FreeText, got {other:?}"),
        }
    }

    #[test]
    fn test_rule_order_is_match_priority() {
        let rules = vec![
            KeywordRule {
                label: "first".to_string(),
                keywords: vec!["shared".to_string()],
            },
            KeywordRule {
                label: "second".to_string(),
                keywords: vec!["shared".to_string()],
            },
        ];
        assert_eq!(match_rules("a shared keyword", &rules).as_deref(), Some("first"));
    }

    #[test]
    fn test_parsed_form_round_trips_through_json() {
        let parsed = parse_structure("# H\nbody", &classifier());
        let raw = serde_json::to_string(&parsed).unwrap();
        assert!(raw.contains(r#""format":"markdown""#));
        let back: ParsedForm = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, parsed);
    }
}
