//! Doctor command - verify credentials, directories and configuration.

use crate::cli::Output;
use crate::config::{
    mask, Settings, DOCUMENT_ENDPOINT_VAR, DOCUMENT_KEY_VAR, GENERATION_KEY_VAR,
    TRANSCRIPTION_KEY_VAR,
};
use console::style;
use std::path::{Path, PathBuf};

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    Output::header("Kosei Doctor");
    println!();
    println!("Checking credentials and configuration...\n");

    let mut checks = Vec::new();

    let sections: [(&str, Vec<CheckResult>); 3] = [
        (
            "API Credentials",
            check_credentials(|name| std::env::var(name).ok()),
        ),
        ("Directories", check_directories(settings)),
        ("Configuration", vec![check_config_file(config_path)]),
    ];

    for (title, results) in sections {
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        checks.extend(results);
        println!();
    }

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before running Kosei.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Kosei is ready to use.");
    }

    Ok(())
}

/// Check each credential variable.
///
/// The generation key is always needed. The others only matter when the
/// matching file kind is processed, so their absence is a warning.
fn check_credentials<F>(lookup: F) -> Vec<CheckResult>
where
    F: Fn(&str) -> Option<String>,
{
    let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let mut results = Vec::new();

    match present(GENERATION_KEY_VAR) {
        Some(key) => results.push(CheckResult::ok(GENERATION_KEY_VAR, &mask(&key))),
        None => results.push(CheckResult::error(
            GENERATION_KEY_VAR,
            "Not set",
            "Required for outline generation. Add it to your environment or .env file",
        )),
    }

    match present(DOCUMENT_ENDPOINT_VAR) {
        Some(endpoint) if url::Url::parse(&endpoint).is_ok() => {
            results.push(CheckResult::ok(DOCUMENT_ENDPOINT_VAR, &endpoint))
        }
        Some(endpoint) => results.push(CheckResult::error(
            DOCUMENT_ENDPOINT_VAR,
            &format!("Not a valid URL: {}", endpoint),
            "Use the endpoint shown for your Document Intelligence resource",
        )),
        None => results.push(CheckResult::warning(
            DOCUMENT_ENDPOINT_VAR,
            "Not set",
            "Needed unless runs use --skip-documents",
        )),
    }

    for (name, hint) in [
        (DOCUMENT_KEY_VAR, "Needed unless runs use --skip-documents"),
        (TRANSCRIPTION_KEY_VAR, "Needed unless runs use --skip-audio"),
    ] {
        match present(name) {
            Some(key) => results.push(CheckResult::ok(name, &mask(&key))),
            None => results.push(CheckResult::warning(name, "Not set", hint)),
        }
    }

    results
}

/// Check the configured directories and files.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let input_dir = settings.input_dir();
    if input_dir.is_dir() {
        let count = std::fs::read_dir(&input_dir)
            .map(|entries| entries.filter_map(|e| e.ok()).count())
            .unwrap_or(0);
        results.push(CheckResult::ok(
            "Input directory",
            &format!("{} ({} entries)", input_dir.display(), count),
        ));
    } else {
        results.push(CheckResult::warning(
            "Input directory",
            &format!("{} does not exist", input_dir.display()),
            "Create it or pass --input-dir to kosei run",
        ));
    }

    let output_dir = settings.output_dir();
    results.push(check_writable_parent("Output directory", &output_dir));

    match settings.reference_template() {
        Some(path) if path.is_file() => results.push(CheckResult::ok(
            "Reference template",
            &format!("{} ({})", path.display(), format_size(file_size(&path))),
        )),
        Some(path) => results.push(CheckResult::warning(
            "Reference template",
            &format!("{} not found", path.display()),
            "The built-in reference outline will be used",
        )),
        None => results.push(CheckResult::ok("Reference template", "Built-in")),
    }

    match settings.log_file() {
        Some(path) => {
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            results.push(check_writable_parent("Log directory", &parent));
        }
        None => results.push(CheckResult::ok("Log file", "Disabled")),
    }

    results
}

/// A directory is fine if it exists or can still be created; a file in its place is not.
fn check_writable_parent(name: &str, dir: &Path) -> CheckResult {
    if dir.is_dir() {
        return CheckResult::ok(name, &dir.display().to_string());
    }
    if dir.exists() {
        return CheckResult::error(
            name,
            &format!("{} is not a directory", dir.display()),
            "Remove the file or choose another path",
        );
    }
    CheckResult::ok(name, &format!("{} (will be created)", dir.display()))
}

/// Check the configuration file.
fn check_config_file(path: Option<&PathBuf>) -> CheckResult {
    let config_path = path.cloned().unwrap_or_else(Settings::default_config_path);

    if !config_path.exists() {
        return CheckResult::ok(
            "Config file",
            &format!("Not found, using defaults ({})", config_path.display()),
        );
    }

    match Settings::load_from(Some(&config_path)) {
        Ok(_) => CheckResult::ok("Config file", &config_path.display().to_string()),
        Err(e) => CheckResult::error(
            "Config file",
            &format!("Invalid: {}", e),
            "Fix the syntax error or run 'kosei config init --force'",
        ),
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
