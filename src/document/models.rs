//! Layout-analysis response models.

use crate::corpus::Fragment;
use serde::Deserialize;

/// State of an analyze operation, as returned by the poll endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOperation {
    pub status: OperationStatus,
    #[serde(default)]
    pub analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceError {
    pub code: String,
    pub message: String,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code.is_empty(), self.message.is_empty()) {
            (false, false) => write!(f, "{}: {}", self.code, self.message),
            (true, false) => write!(f, "{}", self.message),
            (false, true) => write!(f, "{}", self.code),
            (true, true) => write!(f, "analysis failed"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeResult {
    pub pages: Vec<Page>,
    pub paragraphs: Vec<Paragraph>,
    pub tables: Vec<Table>,
    pub key_value_pairs: Vec<KeyValuePair>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Page {
    pub page_number: u32,
    pub lines: Vec<Content>,
    pub words: Vec<Content>,
}

/// Any element whose only field of interest is its text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Content {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Paragraph {
    pub content: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Table {
    pub row_count: usize,
    pub column_count: usize,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableCell {
    pub row_index: usize,
    pub column_index: usize,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeyValuePair {
    pub key: Option<Content>,
    pub value: Option<Content>,
}

impl AnalyzeResult {
    /// Flatten the analysis into fragments.
    ///
    /// Paragraphs are preferred over raw page text when the model returns
    /// them. Page furniture (headers, footers, page numbers) is dropped.
    pub fn into_fragments(self) -> Vec<Fragment> {
        let mut fragments = Vec::new();

        if self.paragraphs.is_empty() {
            fragments.extend(self.pages.iter().map(page_fragment));
        } else {
            fragments.extend(self.paragraphs.into_iter().filter_map(paragraph_fragment));
        }

        fragments.extend(self.tables.iter().map(|t| Fragment::table(t.to_grid())));

        fragments.extend(self.key_value_pairs.into_iter().filter_map(|pair| {
            match (pair.key, pair.value) {
                (Some(key), Some(value)) if !key.content.trim().is_empty() => {
                    Some(Fragment::key_value(key.content.trim(), value.content.trim()))
                }
                _ => None,
            }
        }));

        fragments
    }
}

fn page_fragment(page: &Page) -> Fragment {
    let text = if page.lines.is_empty() {
        page.words
            .iter()
            .map(|w| w.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        page.lines
            .iter()
            .map(|l| l.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    };
    Fragment::text(text.trim())
}

fn paragraph_fragment(paragraph: Paragraph) -> Option<Fragment> {
    let text = paragraph.content.trim().to_string();
    match paragraph.role.as_deref() {
        Some("title") => Some(Fragment::heading(1, text)),
        Some("sectionHeading") => Some(Fragment::heading(2, text)),
        Some("pageHeader") | Some("pageFooter") | Some("pageNumber") => None,
        _ => Some(Fragment::text(text)),
    }
}

impl Table {
    /// Render as rows of ` | `-separated cells.
    pub fn to_grid(&self) -> String {
        let rows = self
            .row_count
            .max(self.cells.iter().map(|c| c.row_index + 1).max().unwrap_or(0));
        let cols = self
            .column_count
            .max(self.cells.iter().map(|c| c.column_index + 1).max().unwrap_or(0));

        let mut grid = vec![vec![String::new(); cols]; rows];
        for cell in &self.cells {
            grid[cell.row_index][cell.column_index] = cell.content.trim().replace('\n', " ");
        }

        grid.iter()
            .map(|row| row.join(" | "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::FragmentTag;

    #[test]
    fn test_paragraph_roles() {
        let result: AnalyzeResult = serde_json::from_str(
            r#"{
                "pages": [{"pageNumber": 1, "lines": [{"content": "ignored"}]}],
                "paragraphs": [
                    {"content": "糖尿病とは", "role": "title"},
                    {"content": "1. 原因", "role": "sectionHeading"},
                    {"content": "- 3 -", "role": "pageNumber"},
                    {"content": "本文です。"}
                ]
            }"#,
        )
        .unwrap();

        let fragments = result.into_fragments();
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].tag, FragmentTag::Heading { level: 1 });
        assert_eq!(fragments[1].tag, FragmentTag::Heading { level: 2 });
        assert_eq!(fragments[2], Fragment::text("本文です。"));
    }

    #[test]
    fn test_page_text_fallback() {
        let result: AnalyzeResult = serde_json::from_str(
            r#"{"pages": [
                {"pageNumber": 1, "lines": [{"content": "line one"}, {"content": "line two"}]},
                {"pageNumber": 2, "words": [{"content": "word"}, {"content": "salad"}]}
            ]}"#,
        )
        .unwrap();

        let fragments = result.into_fragments();
        assert_eq!(fragments[0].text, "line one\nline two");
        assert_eq!(fragments[1].text, "word salad");
    }

    #[test]
    fn test_table_grid_and_key_values() {
        let result: AnalyzeResult = serde_json::from_str(
            r#"{
                "tables": [{"rowCount": 2, "columnCount": 2, "cells": [
                    {"rowIndex": 0, "columnIndex": 0, "content": "薬"},
                    {"rowIndex": 0, "columnIndex": 1, "content": "用量"},
                    {"rowIndex": 1, "columnIndex": 0, "content": "A"}
                ]}],
                "keyValuePairs": [
                    {"key": {"content": "対象"}, "value": {"content": "患者"}},
                    {"key": {"content": "空"}}
                ]
            }"#,
        )
        .unwrap();

        let fragments = result.into_fragments();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0], Fragment::table("薬 | 用量\nA | "));
        assert_eq!(fragments[1], Fragment::key_value("対象", "患者"));
    }

    #[test]
    fn test_operation_status() {
        let op: AnalyzeOperation =
            serde_json::from_str(r#"{"status": "running"}"#).unwrap();
        assert_eq!(op.status, OperationStatus::Running);

        let op: AnalyzeOperation = serde_json::from_str(
            r#"{"status": "failed", "error": {"code": "InvalidContent", "message": "corrupt"}}"#,
        )
        .unwrap();
        assert_eq!(op.status, OperationStatus::Failed);
        assert_eq!(op.error.unwrap().to_string(), "InvalidContent: corrupt");
    }
}
