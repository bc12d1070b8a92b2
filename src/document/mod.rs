//! Document extraction.
//!
//! Word, PDF and PowerPoint files are sent to a layout-analysis service; the
//! returned paragraphs, tables and key/value pairs are flattened into an
//! [`ExtractedUnit`].

mod azure;
mod models;

pub use azure::AzureLayoutAnalyzer;
pub use models::{
    AnalyzeOperation, AnalyzeResult, Content, KeyValuePair, OperationStatus, Page, Paragraph,
    ServiceError, Table, TableCell,
};

use crate::corpus::ExtractedUnit;
use crate::error::Result;
use crate::source::SourceFile;
use async_trait::async_trait;

/// Trait for layout-analysis services.
#[async_trait]
pub trait LayoutAnalyzer: Send + Sync {
    /// Extract the text and structure of one document or presentation.
    async fn analyze(&self, file: &SourceFile) -> Result<ExtractedUnit>;
}
