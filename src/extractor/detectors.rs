//! Line-level transcript format detectors.
//!
//! Each detector recognises the first line of a message in one export
//! format. They are tried in order by the extractor; adding a new export
//! format means adding a detector here and registering it in
//! [`default_detectors`].

use regex::Regex;
use std::sync::OnceLock;

/// The pieces of a message header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub timestamp: String,
    pub author: String,
    pub content: String,
}

/// A strategy that recognises message header lines of one export format.
pub trait FormatDetector: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Parse `line` as the first line of a message, if it matches.
    fn parse_line(&self, line: &str) -> Option<ParsedLine>;
}

/// `[timestamp] author: content`
pub struct BracketedDetector;

/// `date, time - author: content`
pub struct DashSeparatedDetector;

/// `author: content`
pub struct GenericDetector;

fn bracketed_regex() -> &'static Regex {
    static BRACKETED_RE: OnceLock<Regex> = OnceLock::new();
    BRACKETED_RE.get_or_init(|| {
        Regex::new(r"^\[(?P<ts>[^\]]+)\]\s*(?P<author>[^:]+?):\s?(?P<content>.*)$")
            .expect("bracketed regex must compile")
    })
}

fn dash_regex() -> &'static Regex {
    static DASH_RE: OnceLock<Regex> = OnceLock::new();
    DASH_RE.get_or_init(|| {
        Regex::new(
            r"^(?P<ts>\d{1,4}[./-]\d{1,2}[./-]\d{1,4},?\s+\d{1,2}:\d{2}(?::\d{2})?(?:\s?[APap]\.?[Mm]\.?)?)\s+[-–]\s+(?P<author>[^:]+?):\s?(?P<content>.*)$",
        )
        .expect("dash regex must compile")
    })
}

fn generic_regex() -> &'static Regex {
    static GENERIC_RE: OnceLock<Regex> = OnceLock::new();
    GENERIC_RE.get_or_init(|| {
        Regex::new(r"^(?P<author>[^:\[\]\d][^:\[\]]{0,63}?):\s+(?P<content>\S.*)$")
            .expect("generic regex must compile")
    })
}

fn captures_to_parsed(re: &Regex, line: &str) -> Option<ParsedLine> {
    let caps = re.captures(line.trim())?;
    let author = caps.name("author")?.as_str().trim();
    if author.is_empty() {
        return None;
    }
    Some(ParsedLine {
        timestamp: caps
            .name("ts")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
        author: author.to_string(),
        content: caps
            .name("content")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
    })
}

impl FormatDetector for BracketedDetector {
    fn name(&self) -> &'static str {
        "bracketed"
    }

    fn parse_line(&self, line: &str) -> Option<ParsedLine> {
        captures_to_parsed(bracketed_regex(), line)
    }
}

impl FormatDetector for DashSeparatedDetector {
    fn name(&self) -> &'static str {
        "dash-separated"
    }

    fn parse_line(&self, line: &str) -> Option<ParsedLine> {
        captures_to_parsed(dash_regex(), line)
    }
}

impl FormatDetector for GenericDetector {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn parse_line(&self, line: &str) -> Option<ParsedLine> {
        captures_to_parsed(generic_regex(), line)
    }
}

/// The built-in detectors, most specific first.
pub fn default_detectors() -> Vec<Box<dyn FormatDetector>> {
    vec![
        Box::new(BracketedDetector),
        Box::new(DashSeparatedDetector),
        Box::new(GenericDetector),
    ]
}

/// Last-resort split on the first colon.
pub fn naive_split(line: &str) -> Option<ParsedLine> {
    let (left, right) = line.split_once(':')?;
    let author = left.trim();
    if author.is_empty() {
        return None;
    }
    Some(ParsedLine {
        timestamp: String::new(),
        author: author.to_string(),
        content: right.trim().to_string(),
    })
}
