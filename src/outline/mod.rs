//! Pamphlet outline model.
//!
//! An outline has two blocks: major sections (`#大構成`) giving the overall
//! flow, and detailed sections (`#詳細構成`) breaking it down. Each section
//! carries a title, an optional target length and its content notes.
//!
//! [`Outline::render`] produces the text artifact; [`parse_outline`] reads
//! it back, so a rendered outline always parses into an equal one.

mod generator;
mod parser;

pub use generator::{GeneratedOutline, OpenAiGenerator, StructureGenerator, TextGenerator};
pub use parser::parse_outline;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which block of the outline a section belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionLevel {
    Major,
    Detailed,
}

impl SectionLevel {
    /// Marker line opening the block.
    pub fn marker(&self) -> &'static str {
        match self {
            SectionLevel::Major => "#大構成",
            SectionLevel::Detailed => "#詳細構成",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Characters,
    Words,
}

/// Target length of a section, e.g. "about 800 characters".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthEstimate {
    pub amount: u32,
    pub unit: LengthUnit,
}

impl LengthEstimate {
    pub fn characters(amount: u32) -> Self {
        Self {
            amount,
            unit: LengthUnit::Characters,
        }
    }

    pub fn words(amount: u32) -> Self {
        Self {
            amount,
            unit: LengthUnit::Words,
        }
    }
}

impl fmt::Display for LengthEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            LengthUnit::Characters => write!(f, "約{}字", self.amount),
            LengthUnit::Words => write!(f, "約{}語", self.amount),
        }
    }
}

/// One section of the outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub level: SectionLevel,
    pub title: String,
    pub target_length: Option<LengthEstimate>,
    pub summary: String,
    /// Content points, usually quoted or condensed from the inputs.
    pub points: Vec<String>,
    pub figures: Vec<String>,
    pub references: Vec<String>,
}

impl OutlineSection {
    pub fn new(level: SectionLevel, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            target_length: None,
            summary: String::new(),
            points: Vec::new(),
            figures: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn with_length(mut self, length: LengthEstimate) -> Self {
        self.target_length = Some(length);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_points<I, S>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.points = points.into_iter().map(Into::into).collect();
        self
    }

    fn render_into(&self, number: usize, out: &mut String) {
        out.push_str(&format!("{}. {}", number, self.title));
        if let Some(length) = &self.target_length {
            out.push_str(&format!("（{}）", length));
        }
        out.push('\n');

        if !self.summary.is_empty() {
            out.push_str(&format!("概要: {}\n", self.summary));
        }
        for point in &self.points {
            out.push_str(&format!("- {}\n", point));
        }
        if !self.figures.is_empty() {
            out.push_str(&format!("図表: {}\n", self.figures.join("、")));
        }
        if !self.references.is_empty() {
            out.push_str(&format!("参考文献: {}\n", self.references.join("; ")));
        }
    }
}

/// The generated pamphlet structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Outline {
    sections: Vec<OutlineSection>,
}

impl Outline {
    pub fn new(sections: Vec<OutlineSection>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &[OutlineSection] {
        &self.sections
    }

    pub fn major(&self) -> impl Iterator<Item = &OutlineSection> {
        self.at_level(SectionLevel::Major)
    }

    pub fn detailed(&self) -> impl Iterator<Item = &OutlineSection> {
        self.at_level(SectionLevel::Detailed)
    }

    fn at_level(&self, level: SectionLevel) -> impl Iterator<Item = &OutlineSection> {
        self.sections.iter().filter(move |s| s.level == level)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Render as the outline text artifact.
    ///
    /// Sections are numbered from 1 within each block; an empty block is
    /// left out entirely.
    pub fn render(&self) -> String {
        let mut blocks = Vec::new();

        for level in [SectionLevel::Major, SectionLevel::Detailed] {
            let sections: Vec<&OutlineSection> = self.at_level(level).collect();
            if sections.is_empty() {
                continue;
            }

            let mut block = format!("{}\n", level.marker());
            for (i, section) in sections.iter().enumerate() {
                block.push('\n');
                section.render_into(i + 1, &mut block);
            }
            blocks.push(block);
        }

        blocks.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Outline {
        let mut intro = OutlineSection::new(SectionLevel::Major, "はじめに")
            .with_length(LengthEstimate::characters(400))
            .with_summary("糖尿病の基礎知識を紹介する")
            .with_points(["患者数の推移", "合併症のリスク"]);
        intro.figures = vec!["図1 患者数".to_string(), "表1 診断基準".to_string()];
        intro.references = vec!["ガイドライン2024".to_string(), "講演資料".to_string()];

        let detail = OutlineSection::new(SectionLevel::Detailed, "食事療法")
            .with_length(LengthEstimate::words(300));

        Outline::new(vec![intro, detail])
    }

    #[test]
    fn test_render() {
        let expected = "#大構成\n\
                        \n\
                        1. はじめに（約400字）\n\
                        概要: 糖尿病の基礎知識を紹介する\n\
                        - 患者数の推移\n\
                        - 合併症のリスク\n\
                        図表: 図1 患者数、表1 診断基準\n\
                        参考文献: ガイドライン2024; 講演資料\n\
                        \n\
                        #詳細構成\n\
                        \n\
                        1. 食事療法（約300語）\n";
        assert_eq!(sample().render(), expected);
    }

    #[test]
    fn test_rendered_outline_parses_back() {
        let outline = sample();
        assert_eq!(parse_outline(&outline.render()).unwrap(), outline);
    }

    #[test]
    fn test_empty_block_is_omitted() {
        let outline = Outline::new(vec![OutlineSection::new(SectionLevel::Detailed, "A")]);
        assert_eq!(outline.render(), "#詳細構成\n\n1. A\n");
        assert_eq!(outline.major().count(), 0);
        assert_eq!(outline.detailed().count(), 1);
    }
}
