//! Corpus assembly.
//!
//! Merges the extraction results of a run into one ordered, source-tagged
//! body of text and renders it for the generation prompt.

mod unit;

pub use unit::{ExtractedUnit, Fragment, FragmentTag};

use crate::config::CorpusSettings;
use crate::error::{KoseiError, Result};
use crate::source::SourceKind;
use crate::transcription::format_timestamp;

/// Ordered extraction results plus the optional reference template.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    units: Vec<ExtractedUnit>,
    reference_template: Option<String>,
}

impl Corpus {
    /// Assemble a corpus from extraction results.
    ///
    /// Units are ordered by their source's discovery id, whatever order they
    /// arrive in. Fails with [`KoseiError::EmptyCorpus`] when there is no unit
    /// or no unit carries any text.
    pub fn assemble(
        mut units: Vec<ExtractedUnit>,
        reference_template: Option<String>,
    ) -> Result<Self> {
        if !units.iter().any(|u| u.has_content()) {
            return Err(KoseiError::EmptyCorpus);
        }

        units.sort_by_key(|u| u.source_id);
        debug_assert!(
            units.windows(2).all(|w| w[0].source_id != w[1].source_id),
            "each source file yields at most one unit"
        );

        let reference_template = reference_template.filter(|t| !t.trim().is_empty());

        Ok(Self {
            units,
            reference_template,
        })
    }

    pub fn units(&self) -> &[ExtractedUnit] {
        &self.units
    }

    pub fn reference_template(&self) -> Option<&str> {
        self.reference_template.as_deref()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Render the corpus as prompt text, one block per unit in order.
    pub fn render(&self, limits: &RenderLimits) -> String {
        self.units
            .iter()
            .filter(|u| u.has_content())
            .map(|unit| match unit.kind {
                SourceKind::Audio => render_recording(unit, limits),
                SourceKind::Document | SourceKind::Presentation => render_document(unit, limits),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Limits applied when rendering the corpus into a prompt.
#[derive(Debug, Clone)]
pub struct RenderLimits {
    pub max_chars_per_source: usize,
    pub max_key_values: usize,
    pub max_utterances: usize,
    pub highlight_keywords: Vec<String>,
    pub highlight_min_chars: usize,
    pub max_highlights: usize,
}

impl From<&CorpusSettings> for RenderLimits {
    fn from(settings: &CorpusSettings) -> Self {
        Self {
            max_chars_per_source: settings.max_chars_per_source,
            max_key_values: settings.max_key_values,
            max_utterances: settings.max_utterances,
            highlight_keywords: settings.highlight_keywords.clone(),
            highlight_min_chars: settings.highlight_min_chars,
            max_highlights: settings.max_highlights,
        }
    }
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self::from(&CorpusSettings::default())
    }
}

fn render_document(unit: &ExtractedUnit, limits: &RenderLimits) -> String {
    let mut body = Vec::new();
    let mut key_values = Vec::new();

    for fragment in &unit.fragments {
        match &fragment.tag {
            FragmentTag::Heading { level } => {
                body.push(format!(
                    "{} {}",
                    "#".repeat((*level).clamp(1, 6) as usize),
                    fragment.text.trim()
                ));
            }
            FragmentTag::Table => body.push(format!("[Table]\n{}", fragment.text.trim())),
            FragmentTag::KeyValue { key } => {
                key_values.push(format!("- {}: {}", key.trim(), fragment.text.trim()))
            }
            FragmentTag::Text | FragmentTag::Utterance { .. } => {
                body.push(fragment.text.trim().to_string())
            }
        }
    }

    let mut out = format!("■ [{}] {}", unit.kind.label(), unit.source_name);
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&truncate_chars(&body.join("\n"), limits.max_chars_per_source));
    }
    if !key_values.is_empty() && limits.max_key_values > 0 {
        out.push_str("\nKey items:");
        for line in key_values.iter().take(limits.max_key_values) {
            out.push('\n');
            out.push_str(line);
        }
    }
    out
}

fn render_recording(unit: &ExtractedUnit, limits: &RenderLimits) -> String {
    let mut out = format!("■ [{}] {}", unit.kind.label(), unit.source_name);
    if let Some(duration) = unit.duration_seconds {
        out.push_str(&format!(" ({})", format_timestamp(duration)));
    }

    for fragment in unit.fragments.iter().take(limits.max_utterances) {
        out.push('\n');
        out.push_str(&truncate_chars(
            &utterance_line(fragment),
            limits.max_chars_per_source,
        ));
    }

    let omitted = unit.fragments.len().saturating_sub(limits.max_utterances);
    if omitted > 0 {
        out.push_str(&format!("\n... ({} more utterances)", omitted));
    }

    let points = key_points(unit, limits);
    if !points.is_empty() {
        out.push_str("\nKey points:");
        for fragment in points {
            out.push_str("\n- ");
            out.push_str(&utterance_line(fragment));
        }
    }
    out
}

fn utterance_line(fragment: &Fragment) -> String {
    match &fragment.tag {
        FragmentTag::Utterance {
            start_seconds,
            speaker,
            ..
        } => match speaker {
            Some(speaker) => format!(
                "[{}] Speaker {}: {}",
                format_timestamp(*start_seconds),
                speaker,
                fragment.text.trim()
            ),
            None => format!("[{}] {}", format_timestamp(*start_seconds), fragment.text.trim()),
        },
        _ => fragment.text.trim().to_string(),
    }
}

/// Utterances long enough and containing one of the highlight keywords.
pub fn key_points<'a>(unit: &'a ExtractedUnit, limits: &RenderLimits) -> Vec<&'a Fragment> {
    if limits.highlight_keywords.is_empty() {
        return Vec::new();
    }

    unit.fragments
        .iter()
        .filter(|f| matches!(f.tag, FragmentTag::Utterance { .. }))
        .filter(|f| f.text.trim().chars().count() >= limits.highlight_min_chars)
        .filter(|f| {
            limits
                .highlight_keywords
                .iter()
                .any(|k| !k.is_empty() && f.text.contains(k.as_str()))
        })
        .take(limits.max_highlights)
        .collect()
}

/// Truncate to at most `max_chars` characters, marking the cut with "...".
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceFile;

    fn doc(id: usize, name: &str, text: &str) -> ExtractedUnit {
        let source = SourceFile::new(id, name.into(), name.into(), SourceKind::Document);
        ExtractedUnit::new(&source, vec![Fragment::text(text)])
    }

    fn recording(id: usize, name: &str, fragments: Vec<Fragment>) -> ExtractedUnit {
        let source = SourceFile::new(id, name.into(), name.into(), SourceKind::Audio);
        ExtractedUnit::new(&source, fragments).with_duration(75.0)
    }

    #[test]
    fn test_assemble_orders_by_discovery() {
        let units = vec![doc(2, "c.pdf", "C"), doc(0, "a.docx", "A"), doc(1, "b.pdf", "B")];
        let corpus = Corpus::assemble(units, None).unwrap();
        let ids: Vec<usize> = corpus.units().iter().map(|u| u.source_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_assemble_is_independent_of_arrival_order() {
        let forward = vec![doc(0, "a", "A"), doc(1, "b", "B"), doc(2, "c", "C")];
        let mut backward = forward.clone();
        backward.reverse();
        let limits = RenderLimits::default();

        let a = Corpus::assemble(forward, None).unwrap().render(&limits);
        let b = Corpus::assemble(backward, None).unwrap().render(&limits);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(Corpus::assemble(vec![], None), Err(KoseiError::EmptyCorpus)));
        let blank = doc(0, "a.pdf", "   ");
        assert!(matches!(
            Corpus::assemble(vec![blank], Some("template".into())),
            Err(KoseiError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_blank_template_is_dropped() {
        let corpus = Corpus::assemble(vec![doc(0, "a", "A")], Some("  \n".into())).unwrap();
        assert!(corpus.reference_template().is_none());
    }

    #[test]
    fn test_render_document() {
        let source = SourceFile::new(0, "plan.docx".into(), "plan.docx".into(), SourceKind::Document);
        let unit = ExtractedUnit::new(
            &source,
            vec![
                Fragment::heading(1, "Plan"),
                Fragment::text("Body text."),
                Fragment::table("a | b\nc | d"),
                Fragment::key_value("Target", "Nurses"),
            ],
        );
        let corpus = Corpus::assemble(vec![unit], None).unwrap();
        let text = corpus.render(&RenderLimits::default());

        assert_eq!(
            text,
            "■ [Document] plan.docx\n# Plan\nBody text.\n[Table]\na | b\nc | d\nKey items:\n- Target: Nurses"
        );
    }

    #[test]
    fn test_render_truncates_by_characters() {
        let limits = RenderLimits {
            max_chars_per_source: 4,
            ..RenderLimits::default()
        };
        let corpus = Corpus::assemble(vec![doc(0, "a.pdf", "医療パンフレット")], None).unwrap();
        assert_eq!(corpus.render(&limits), "■ [Document] a.pdf\n医療パン...");
    }

    #[test]
    fn test_render_recording_with_limits_and_key_points() {
        let limits = RenderLimits {
            max_utterances: 2,
            highlight_min_chars: 5,
            ..RenderLimits::default()
        };
        let unit = recording(
            0,
            "talk.mp3",
            vec![
                Fragment::utterance(0.0, 4.0, Some(0), "こんにちは"),
                Fragment::utterance(4.0, 9.0, Some(1), "今日の発表のまとめです"),
                Fragment::utterance(65.0, 70.0, None, "ここが重要なポイントです"),
            ],
        );
        let text = Corpus::assemble(vec![unit], None).unwrap().render(&limits);

        assert_eq!(
            text,
            "■ [Audio] talk.mp3 (01:15)\n\
             [00:00] Speaker 0: こんにちは\n\
             [00:04] Speaker 1: 今日の発表のまとめです\n\
             ... (1 more utterances)\n\
             Key points:\n\
             - [00:04] Speaker 1: 今日の発表のまとめです\n\
             - [01:05] ここが重要なポイントです"
        );
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("", 0), "");
    }
}
