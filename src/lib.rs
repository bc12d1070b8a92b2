//! Kosei - pamphlet outlines from documents and recorded talks
//!
//! A CLI tool that reads Word, PDF and PowerPoint files plus audio recordings
//! from one directory and drafts the outline of a medical pamphlet aimed at
//! healthcare professionals.
//!
//! The name "Kosei" comes from the Japanese word 構成, "structure".
//!
//! # Overview
//!
//! Kosei:
//! - Extracts text, headings, tables and key/value pairs from documents through
//!   a layout-analysis service
//! - Transcribes recordings with speaker separation through a speech-to-text service
//! - Assembles everything into one labelled corpus
//! - Asks a generative model for a two-level outline following a reference format
//! - Writes the outline and a processing summary to the output directory
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings, prompt templates and credentials
//! - `source` - Input classification and directory scanning
//! - `document` - Layout analysis of documents and presentations
//! - `transcription` - Speech-to-text transcription
//! - `corpus` - Extracted units and corpus rendering
//! - `outline` - Outline model, generation and parsing
//! - `report` - Outline and summary artifacts
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use kosei::config::{Credentials, Settings};
//! use kosei::orchestrator::{Orchestrator, RunRequest};
//! use kosei::source::Capabilities;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let credentials = Credentials::from_env(Capabilities::all())?;
//!     let request = RunRequest::from_settings(&settings);
//!     let orchestrator = Orchestrator::new(settings, &credentials)?;
//!
//!     let report = orchestrator.run(&request).await?;
//!     println!("Wrote {} sections to {}", report.outline.len(), report.outline_path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod corpus;
pub mod document;
pub mod error;
pub mod http;
pub mod logging;
pub mod orchestrator;
pub mod outline;
pub mod report;
pub mod retry;
pub mod source;
pub mod transcription;

pub use error::{KoseiError, Result};
