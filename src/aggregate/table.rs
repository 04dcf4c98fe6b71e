//! # Table-document parser
//!
//! Extracts job rows from a loosely formatted text document whose payload is
//! a pipe-delimited table. Cells carry markdown bold markers, HTML anchors or
//! emphasis tags, or bracket-style links rather than plain text, so every
//! extracted value goes through markup stripping. One malformed row never
//! aborts the document.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::aggregate::types::SponsorshipHint;

/// Hosts that never point at an application form (badge/image CDNs).
const EXCLUDED_APPLY_HOSTS: [&str; 2] = ["i.imgur.com", "camo.githubusercontent.com"];

/// One successfully parsed table row, before canonical-record mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub company: String,
    pub title: String,
    pub location: String,
    pub salary: Option<String>,
    pub apply_url: String,
    pub job_type: &'static str,
    pub sponsorship: SponsorshipHint,
    /// Raw relative-age cell ("2d", "3w"), when the table carries one.
    pub age: Option<String>,
}

/// Parse every well-formed job row out of a pipe-table document.
pub fn parse_table(doc: &str) -> Vec<TableRow> {
    doc.lines().filter_map(parse_row).collect()
}

fn parse_row(line: &str) -> Option<TableRow> {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') || is_separator_line(trimmed) {
        return None;
    }
    if has_closed_marker(trimmed) {
        return None;
    }

    let cells: Vec<&str> = trimmed
        .split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if cells.len() < 5 || is_header_row(&cells) {
        return None;
    }

    let company = extract_company(cells[0]);
    let title = strip_markup(cells[1]);
    let location = strip_markup(cells[2]);
    let salary = strip_markup(cells[3]);
    let apply_url = extract_apply_url(cells[4])?;

    // Implausibly short names and currency-led cells signal column
    // misalignment.
    if company.len() < 2 || title.len() < 2 {
        return None;
    }
    if starts_with_currency(&company) || starts_with_currency(&title) {
        return None;
    }

    let sponsorship = if trimmed.contains('\u{1F6C2}') {
        SponsorshipHint::NoSponsorship
    } else if trimmed.contains("\u{1F1FA}\u{1F1F8}") {
        SponsorshipHint::RequiresCitizenship
    } else {
        SponsorshipHint::Unknown
    };

    let job_type = if title.to_lowercase().contains("intern") {
        "Internship"
    } else {
        "Full-time"
    };

    Some(TableRow {
        company,
        title,
        location,
        salary: (!salary.is_empty()).then_some(salary),
        apply_url,
        job_type,
        sponsorship,
        age: cells
            .get(5)
            .map(|c| strip_markup(c))
            .filter(|c| !c.is_empty()),
    })
}

/// `| --- | :---: | --- |` style alignment lines.
fn is_separator_line(line: &str) -> bool {
    line.contains('-') && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn is_header_row(cells: &[&str]) -> bool {
    let first = strip_markup(cells[0]).to_lowercase();
    matches!(first.as_str(), "company" | "company name" | "organization" | "name")
}

fn has_closed_marker(line: &str) -> bool {
    if line.contains('\u{1F512}') {
        return true;
    }
    static RE_CLOSED: OnceCell<Regex> = OnceCell::new();
    let re = RE_CLOSED.get_or_init(|| Regex::new(r"(?i)\bclosed\b").unwrap());
    re.is_match(line)
}

fn starts_with_currency(s: &str) -> bool {
    s.starts_with(['$', '€', '£'])
}

/// Organization cell: bold-marker text, then emphasis/anchor tag text, then
/// bracket-link text; whatever matched still gets residual markup stripped.
fn extract_company(cell: &str) -> String {
    static RE_BOLD: OnceCell<Regex> = OnceCell::new();
    let re_bold = RE_BOLD.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*|__([^_]+)__").unwrap());
    if let Some(caps) = re_bold.captures(cell) {
        if let Some(inner) = caps.get(1).or_else(|| caps.get(2)) {
            return strip_markup(inner.as_str());
        }
    }

    static RE_TAG_TEXT: OnceCell<Regex> = OnceCell::new();
    let re_tag = RE_TAG_TEXT.get_or_init(|| {
        Regex::new(r"(?is)<(?:a|b|strong|em|i)\b[^>]*>(.*?)</(?:a|b|strong|em|i)>").unwrap()
    });
    if let Some(caps) = re_tag.captures(cell) {
        if let Some(inner) = caps.get(1) {
            return strip_markup(inner.as_str());
        }
    }

    static RE_BRACKET: OnceCell<Regex> = OnceCell::new();
    let re_bracket = RE_BRACKET.get_or_init(|| Regex::new(r"\[([^\]]+)\]").unwrap());
    if let Some(caps) = re_bracket.captures(cell) {
        if let Some(inner) = caps.get(1) {
            return strip_markup(inner.as_str());
        }
    }

    strip_markup(cell)
}

/// Anchor href first; when absent or pointing at an excluded host, scan the
/// raw cell for any URL-shaped substring. `None` means the row has no usable
/// application link and must be dropped.
fn extract_apply_url(cell: &str) -> Option<String> {
    static RE_HREF: OnceCell<Regex> = OnceCell::new();
    let re_href =
        RE_HREF.get_or_init(|| Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).unwrap());
    if let Some(caps) = re_href.captures(cell) {
        let url = caps[1].to_string();
        if !is_excluded_host(&url) {
            return Some(url);
        }
    }

    static RE_URL: OnceCell<Regex> = OnceCell::new();
    let re_url = RE_URL.get_or_init(|| Regex::new(r#"https?://[^\s|"'<>)\]]+"#).unwrap());
    re_url
        .find_iter(cell)
        .map(|m| m.as_str().to_string())
        .find(|url| !is_excluded_host(url))
}

fn is_excluded_host(url: &str) -> bool {
    EXCLUDED_APPLY_HOSTS.iter().any(|h| url.contains(h))
}

/// Remove tags, bold markers and bracket links, decode entities, drop the
/// row-status emojis, collapse whitespace.
pub fn strip_markup(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_BRACKET_LINK: OnceCell<Regex> = OnceCell::new();
    let re_link = RE_BRACKET_LINK.get_or_init(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").unwrap());
    out = re_link.replace_all(&out, "$1").to_string();

    out = out.replace("**", "").replace("__", "");
    out = out
        .replace('\u{1F6C2}', "")
        .replace("\u{1F1FA}\u{1F1F8}", "")
        .replace('\u{1F512}', "");

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
