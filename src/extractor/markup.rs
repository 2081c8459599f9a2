//! HTML-like transcript exports.
//!
//! Platform exports are recognised by their message-container markup.
//! When no known structure is present the markup is stripped and the
//! remaining text goes through the regular line detectors.

use crate::models::MessageRecord;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// A strategy that recognises one platform's HTML message containers.
pub trait MarkupDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extract messages from `raw`, or `None` if the structure is absent.
    fn extract(&self, raw: &str) -> Option<Vec<MessageRecord>>;
}

/// Telegram Desktop "Export chat history" HTML.
///
/// Each message is a `div.message.default` block holding `from_name`,
/// a `date` element whose `title` carries the full timestamp, and `text`.
/// Follow-up messages (`joined`) omit `from_name` and belong to the
/// previous sender.
pub struct TelegramHtmlDetector;

fn telegram_block_start_regex() -> &'static Regex {
    static BLOCK_RE: OnceLock<Regex> = OnceLock::new();
    BLOCK_RE.get_or_init(|| {
        Regex::new(r#"<div class="message default[^"]*""#).expect("block regex must compile")
    })
}

fn telegram_from_name_regex() -> &'static Regex {
    static FROM_RE: OnceLock<Regex> = OnceLock::new();
    FROM_RE.get_or_init(|| {
        Regex::new(r#"(?s)<div class="from_name">(.*?)</div>"#)
            .expect("from_name regex must compile")
    })
}

fn telegram_date_regex() -> &'static Regex {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    DATE_RE.get_or_init(|| {
        Regex::new(r#"<div class="[^"]*\bdate\b[^"]*"\s+title="([^"]*)""#)
            .expect("date regex must compile")
    })
}

fn telegram_text_regex() -> &'static Regex {
    static TEXT_RE: OnceLock<Regex> = OnceLock::new();
    TEXT_RE.get_or_init(|| {
        Regex::new(r#"(?s)<div class="text">(.*?)</div>"#).expect("text regex must compile")
    })
}

impl MarkupDetector for TelegramHtmlDetector {
    fn name(&self) -> &'static str {
        "telegram-html"
    }

    fn extract(&self, raw: &str) -> Option<Vec<MessageRecord>> {
        let starts: Vec<usize> = telegram_block_start_regex()
            .find_iter(raw)
            .map(|m| m.start())
            .collect();
        if starts.is_empty() {
            return None;
        }

        let mut messages = Vec::new();
        let mut last_author: Option<String> = None;

        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(raw.len());
            let block = &raw[start..end];

            if let Some(caps) = telegram_from_name_regex().captures(block) {
                let name = collapse_whitespace(&strip_markup(&caps[1]));
                if !name.is_empty() {
                    last_author = Some(name);
                }
            }

            let Some(author) = last_author.clone() else {
                continue;
            };
            let Some(text) = telegram_text_regex().captures(block) else {
                // Media-only message.
                continue;
            };
            let content = strip_markup(&text[1]).trim().to_string();
            if content.is_empty() {
                continue;
            }
            let timestamp = telegram_date_regex()
                .captures(block)
                .map(|c| decode_entities(&c[1]).trim().to_string())
                .unwrap_or_default();

            let raw_line = if timestamp.is_empty() {
                format!("{}: {}", author, content)
            } else {
                format!("[{}] {}: {}", timestamp, author, content)
            };

            messages.push(MessageRecord {
                author,
                timestamp,
                content,
                raw_line,
            });
        }

        if messages.is_empty() {
            None
        } else {
            Some(messages)
        }
    }
}

/// The built-in markup detectors.
pub fn default_markup_detectors() -> Vec<Box<dyn MarkupDetector>> {
    vec![Box::new(TelegramHtmlDetector)]
}

/// Heuristic check for HTML-like input.
pub fn looks_like_markup(raw: &str) -> bool {
    static MARKUP_RE: OnceLock<Regex> = OnceLock::new();
    MARKUP_RE
        .get_or_init(|| {
            Regex::new(r"(?i)<(!doctype|html|body|div|p|span|br)\b")
                .expect("markup regex must compile")
        })
        .is_match(raw)
}

/// Remove tags, turning block boundaries into line breaks, and decode entities.
pub fn strip_markup(raw: &str) -> String {
    static DROP_RE: OnceLock<Regex> = OnceLock::new();
    static BREAK_RE: OnceLock<Regex> = OnceLock::new();
    static TAG_RE: OnceLock<Regex> = OnceLock::new();

    let drop_re = DROP_RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|head)\b.*?</(script|style|head)>")
            .expect("drop regex must compile")
    });
    let break_re = BREAK_RE.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6])>").expect("break regex must compile")
    });
    let tag_re = TAG_RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex must compile"));

    let without_blocks = drop_re.replace_all(raw, "");
    let with_breaks = break_re.replace_all(&without_blocks, "\n");
    let text = tag_re.replace_all(&with_breaks, "");
    decode_entities(&text)
}

/// Decode the handful of HTML entities chat exports actually use.
pub fn decode_entities(text: &str) -> String {
    static ENTITY_RE: OnceLock<Regex> = OnceLock::new();
    let re = ENTITY_RE.get_or_init(|| {
        Regex::new(r"&(#[xX][0-9a-fA-F]+|#\d+|[a-zA-Z]+);").expect("entity regex must compile")
    });

    re.replace_all(text, |caps: &Captures| {
        let entity = &caps[1];
        let decoded = if let Some(hex) = entity
            .strip_prefix("#x")
            .or_else(|| entity.strip_prefix("#X"))
        {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(dec) = entity.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => None,
            }
        };
        decoded
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
