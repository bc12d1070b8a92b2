//! Parsing of generated outline text.

use super::{LengthEstimate, LengthUnit, Outline, OutlineSection, SectionLevel};
use crate::error::{KoseiError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Numbered, symbol-marked or markdown-prefixed section line.
static SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:#{2,6}\s*)?(?P<marker>[0-9０-９]+(?:[.．][0-9０-９]+)*[.．)）、]?|[■◆●▼]|【[0-9０-９]+】)(?P<space>\s*)(?P<title>\S.*)$",
    )
    .expect("section regex")
});

/// Markdown heading without a number.
static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{2,6}\s+(?P<title>\S.*)$").expect("heading regex"));

/// Parenthesised length estimate such as `（約800字）` or `(about 300 words)`.
static LENGTH_IN_PARENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[（(]\s*(?:約|およそ|about|approx\.?|approximately|~|〜|～)?\s*(?P<num>[0-9０-９][0-9０-９,，]*)\s*(?P<unit>文字|字|語|characters?|chars?|words?)\s*(?:程度|前後)?\s*[)）]",
    )
    .expect("length regex")
});

/// Bare length estimate, used on labelled length lines.
static LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?P<num>[0-9０-９][0-9０-９,，]*)\s*(?P<unit>文字|字|語|characters?|chars?|words?)",
    )
    .expect("length regex")
});

static LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<label>概要|要約|summary|description|主要な内容|内容|content|key points|図表|figures?|参考文献|references?|引用|出典|文字数|目安|length)\s*[:：]\s*(?P<value>.*)$",
    )
    .expect("label regex")
});

static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*]\s+|[・•]\s*|[(（][0-9０-９]+[)）]\s*)(?P<text>\S.*)$").expect("bullet regex")
});

/// Where bullets and loose text lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Summary,
    Points,
    Figures,
    References,
}

/// Parse a generated response into an [`Outline`].
///
/// Fails with [`KoseiError::UnparsableResponse`] when no section line is
/// found; the raw text is kept in the error.
pub fn parse_outline(raw: &str) -> Result<Outline> {
    let mut sections: Vec<OutlineSection> = Vec::new();
    let mut current: Option<OutlineSection> = None;
    let mut level = SectionLevel::Major;
    let mut mode = Mode::Summary;

    for raw_line in raw.lines() {
        let line = raw_line.replace("**", "").replace("__", "");
        let indented = line.starts_with([' ', '\t', '\u{3000}']);
        let text = line.trim();

        if text.is_empty() || text.starts_with("```") {
            continue;
        }

        if let Some(marked) = block_marker(text) {
            sections.extend(current.take());
            level = marked;
            continue;
        }

        let Some(section) = current.as_mut() else {
            if let Some(title) = section_title(text) {
                current = Some(new_section(level, &title));
                mode = Mode::Summary;
            }
            continue;
        };

        if let Some(caps) = LABELLED.captures(text) {
            let value = caps["value"].trim();
            mode = apply_label(section, &caps["label"], value);
            continue;
        }

        if let Some(caps) = BULLET.captures(text) {
            push_item(section, mode, caps["text"].trim());
            continue;
        }

        if !indented {
            if let Some(title) = section_title(text) {
                sections.extend(current.replace(new_section(level, &title)));
                mode = Mode::Summary;
                continue;
            }
            if text.starts_with('#') {
                continue;
            }
        } else if section_title(text).is_some() {
            section.points.push(text.to_string());
            continue;
        }

        match mode {
            Mode::Figures | Mode::References => push_item(section, mode, text),
            Mode::Summary | Mode::Points => append_summary(section, text),
        }
    }

    sections.extend(current);

    if sections.is_empty() {
        return Err(KoseiError::UnparsableResponse {
            raw: raw.to_string(),
        });
    }
    Ok(Outline::new(sections))
}

/// Recognize `#大構成` / `#詳細構成` and `# Major …` / `# Detailed …`.
fn block_marker(text: &str) -> Option<SectionLevel> {
    let hashes = text.chars().take_while(|c| *c == '#').count();
    let rest = text[hashes..].trim_start();

    if rest.starts_with("大構成") || rest.starts_with("【大構成") {
        return Some(SectionLevel::Major);
    }
    if rest.starts_with("詳細構成") || rest.starts_with("【詳細構成") {
        return Some(SectionLevel::Detailed);
    }
    if hashes == 1 {
        let lower = rest.to_lowercase();
        if lower.starts_with("major") {
            return Some(SectionLevel::Major);
        }
        if lower.starts_with("detailed") {
            return Some(SectionLevel::Detailed);
        }
    }
    None
}

/// Title of a section line, or None when the line is not a section start.
fn section_title(text: &str) -> Option<String> {
    if let Some(caps) = SECTION.captures(text) {
        let marker = &caps["marker"];
        let space = &caps["space"];
        let title = &caps["title"];

        if marker.starts_with(is_digit) {
            let number_len = marker.chars().take_while(|c| is_digit(*c)).count();
            let ends_with_digit = marker.ends_with(is_digit);
            let multi_level = marker.contains(['.', '．']);

            // "2024年", "12 months"
            if number_len > 3 || (ends_with_digit && !(multi_level && !space.is_empty())) {
                return None;
            }
            // "3.5mg"
            if space.is_empty() && marker.ends_with(['.', '．']) && title.starts_with(is_digit) {
                return None;
            }
        }
        return clean_title(title);
    }

    MARKDOWN_HEADING
        .captures(text)
        .and_then(|caps| clean_title(&caps["title"]))
}

fn clean_title(title: &str) -> Option<String> {
    let title = title.trim().trim_end_matches([':', '：']).trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

fn new_section(level: SectionLevel, title: &str) -> OutlineSection {
    match LENGTH_IN_PARENS.captures(title) {
        Some(caps) => {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let stripped = title.replacen(whole, "", 1);
            let mut section = OutlineSection::new(level, stripped.trim());
            section.target_length = length_from(&caps["num"], &caps["unit"]);
            section
        }
        None => OutlineSection::new(level, title),
    }
}

fn apply_label(section: &mut OutlineSection, label: &str, value: &str) -> Mode {
    match label.to_lowercase().as_str() {
        "概要" | "要約" | "summary" | "description" => {
            if !value.is_empty() {
                append_summary(section, value);
            }
            Mode::Summary
        }
        "主要な内容" | "内容" | "content" | "key points" => {
            if !value.is_empty() {
                section.points.push(value.to_string());
            }
            Mode::Points
        }
        "図表" | "figure" | "figures" => {
            section.figures.extend(split_items(value, &['、', ',', ';', '；', '/']));
            Mode::Figures
        }
        "参考文献" | "reference" | "references" | "引用" | "出典" => {
            section.references.extend(split_items(value, &[';', '；']));
            Mode::References
        }
        // 文字数 / 目安 / length
        _ => {
            if let Some(caps) = LENGTH.captures(value) {
                section.target_length = length_from(&caps["num"], &caps["unit"]);
            }
            Mode::Summary
        }
    }
}

fn push_item(section: &mut OutlineSection, mode: Mode, item: &str) {
    match mode {
        Mode::Figures => section.figures.push(item.to_string()),
        Mode::References => section.references.push(item.to_string()),
        Mode::Summary | Mode::Points => section.points.push(item.to_string()),
    }
}

fn append_summary(section: &mut OutlineSection, text: &str) {
    if !section.summary.is_empty() {
        section.summary.push(' ');
    }
    section.summary.push_str(text);
}

fn split_items(value: &str, separators: &[char]) -> Vec<String> {
    value
        .split(separators)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn length_from(number: &str, unit: &str) -> Option<LengthEstimate> {
    let digits: String = number
        .chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32),
            _ => None,
        })
        .collect();
    let amount = digits.parse().ok()?;

    let unit = match unit.to_lowercase().as_str() {
        "語" | "word" | "words" => LengthUnit::Words,
        _ => LengthUnit::Characters,
    };
    Some(LengthEstimate { amount, unit })
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || ('０'..='９').contains(&c)
}
