//! Run artifacts: the outline file and the processing summary.

mod summary;
mod writer;

pub use summary::{FileRecord, ProcessingSummary, RecordStatus};
pub use writer::ReportWriter;
