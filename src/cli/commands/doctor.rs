//! Doctor command - verify configuration and knowledge base health.

use crate::cli::Output;
use crate::config::Settings;
use crate::document::collect_paths;
use crate::index::VectorIndex;
use console::style;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Pass,
    Warn,
    Fail,
}

/// One diagnostic outcome, with an optional way to fix it.
#[derive(Debug)]
struct Finding {
    subject: &'static str,
    level: Level,
    detail: String,
    fix: Option<String>,
}

impl Finding {
    fn pass(subject: &'static str, detail: impl Into<String>) -> Self {
        Self {
            subject,
            level: Level::Pass,
            detail: detail.into(),
            fix: None,
        }
    }

    fn warn(subject: &'static str, detail: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            level: Level::Warn,
            fix: Some(fix.into()),
            ..Self::pass(subject, detail)
        }
    }

    fn fail(subject: &'static str, detail: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            level: Level::Fail,
            ..Self::warn(subject, detail, fix)
        }
    }

    fn show(&self) {
        let marker = match self.level {
            Level::Pass => style("✓").green(),
            Level::Warn => style("!").yellow(),
            Level::Fail => style("✗").red(),
        };
        println!("  {} {}: {}", marker, style(self.subject).bold(), self.detail);
        if let Some(fix) = &self.fix {
            println!("      {}", style(fix).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("policy-rag Doctor");
    println!();

    let sections = [
        ("API key", vec![api_key_finding(settings)]),
        ("Knowledge base", knowledge_base_findings(settings)),
        ("Configuration", configuration_findings(settings)),
    ];

    let mut failures = 0;
    let mut warnings = 0;
    for (title, findings) in &sections {
        println!("{}", style(title).bold());
        for finding in findings {
            finding.show();
            match finding.level {
                Level::Fail => failures += 1,
                Level::Warn => warnings += 1,
                Level::Pass => {}
            }
        }
        println!();
    }

    match (failures, warnings) {
        (0, 0) => Output::success("Everything looks good."),
        (0, w) => Output::warning(&format!("Usable, with {} warning(s).", w)),
        (f, _) => {
            Output::error(&format!("{} problem(s) must be fixed first.", f));
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Show only the start and end of a secret.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 11 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Answering always needs the key. With the offline embedder, ingesting and
/// searching still work without it, so a missing key is only a warning there.
fn api_key_finding(settings: &Settings) -> Finding {
    const SUBJECT: &str = "OPENAI_API_KEY";
    let offline = settings.embedding.provider.eq_ignore_ascii_case("hashed");

    let key = std::env::var(SUBJECT).unwrap_or_default();
    if key.trim().is_empty() {
        let fix = "export OPENAI_API_KEY='sk-...'";
        return if offline {
            Finding::warn(SUBJECT, "not set, 'ask' and 'chat' are unavailable", fix)
        } else {
            Finding::fail(SUBJECT, "not set", fix)
        };
    }

    if key.starts_with("sk-") {
        Finding::pass(SUBJECT, mask_key(&key))
    } else {
        Finding::warn(SUBJECT, mask_key(&key), "OpenAI keys normally start with 'sk-'")
    }
}

/// Data directory and index snapshot.
fn knowledge_base_findings(settings: &Settings) -> Vec<Finding> {
    let data_dir = settings.data_dir();
    let mut findings = vec![if data_dir.is_dir() {
        Finding::pass("Data directory", data_dir.display().to_string())
    } else {
        Finding::warn(
            "Data directory",
            format!("{} is missing", data_dir.display()),
            "It is created on the next command",
        )
    }];

    let index_path = settings.index_path();
    let size = match std::fs::metadata(&index_path) {
        Ok(meta) => format_size(meta.len()),
        Err(_) => {
            findings.push(Finding::warn(
                "Index",
                format!("no snapshot at {}", index_path.display()),
                "Run 'policy-rag ingest <path>' or configure [documents] paths",
            ));
            return findings;
        }
    };

    let index = match VectorIndex::load(&index_path) {
        Ok(index) => index,
        Err(e) => {
            findings.push(Finding::warn(
                "Index",
                e.to_string(),
                "The next start rebuilds it from [documents] paths",
            ));
            return findings;
        }
    };

    findings.push(Finding::pass(
        "Index",
        format!(
            "{} chunks from {} documents, {} distance, {}",
            index.len(),
            index.sources().len(),
            index.metric(),
            size
        ),
    ));

    let configured = settings.embedding.dimensions as usize;
    if let Some(dims) = index.dimensions().filter(|&d| d != configured) {
        findings.push(Finding::fail(
            "Embedding dimensions",
            format!("index stores {} but embedding.dimensions is {}", dims, configured),
            "Run 'policy-rag rebuild' after switching embedding models",
        ));
    }

    findings
}

/// Config file, settings values and document paths.
fn configuration_findings(settings: &Settings) -> Vec<Finding> {
    let config_path = Settings::default_config_path();
    let mut findings = vec![if config_path.is_file() {
        Finding::pass("Config file", config_path.display().to_string())
    } else {
        Finding::warn("Config file", "none, using defaults", "policy-rag config edit")
    }];

    findings.push(match settings.validate() {
        Ok(()) => Finding::pass(
            "Settings",
            format!(
                "{}-char chunks overlapping by {}, top {} with {}",
                settings.chunking.chunk_size,
                settings.chunking.overlap,
                settings.rag.top_k,
                settings.rag.model
            ),
        ),
        Err(e) => Finding::fail("Settings", e.to_string(), "policy-rag config edit"),
    });

    let paths = settings.document_paths();
    findings.push(if paths.is_empty() {
        Finding::warn(
            "Documents",
            "no [documents] paths",
            "A lost index cannot be rebuilt without them",
        )
    } else {
        match collect_paths(&paths) {
            Ok(files) if files.is_empty() => Finding::warn(
                "Documents",
                "no .pdf, .txt or .md files under [documents] paths",
                "Check [documents] paths",
            ),
            Ok(files) => Finding::pass(
                "Documents",
                format!("{} files under {} paths", files.len(), paths.len()),
            ),
            Err(e) => Finding::fail("Documents", e.to_string(), "Check [documents] paths"),
        }
    });

    findings
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
