//! Handler for `locus cache` subcommands.

use crate::commands::{CacheArgs, CacheSubcommand};
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use locus::store::list_suites;
use locus::{LocatorRecord, LocatorStore, TracingSink};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

/// Entry count of one suite document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteSummary {
    /// Suite file stem
    pub suite: String,
    /// Number of records
    pub entries: usize,
}

fn open(dir: &Path, suite: &str) -> LocatorStore {
    LocatorStore::open(dir, suite, Arc::new(TracingSink))
}

/// Summaries of every suite under `dir`
pub fn summarize(dir: &Path) -> CliResult<Vec<SuiteSummary>> {
    Ok(list_suites(dir)?
        .into_iter()
        .map(|suite| {
            let entries = open(dir, &suite).len();
            SuiteSummary { suite, entries }
        })
        .collect())
}

/// Text table of suite summaries
#[must_use]
pub fn render_summaries(summaries: &[SuiteSummary], printer: &Printer) -> String {
    if summaries.is_empty() {
        return "No cached suites\n".to_string();
    }
    let width = summaries.iter().map(|s| s.suite.len()).max().unwrap_or(0);
    let mut out = String::new();
    for summary in summaries {
        let noun = if summary.entries == 1 { "entry" } else { "entries" };
        let _ = writeln!(
            out,
            "{:<width$}  {}",
            summary.suite,
            printer.dim(&format!("{} {noun}", summary.entries)),
        );
    }
    out
}

/// Human-readable listing of one store
#[must_use]
pub fn render_records(store: &LocatorStore, printer: &Printer) -> String {
    if store.is_empty() {
        return format!("No records for suite '{}'\n", store.suite());
    }
    let mut out = String::new();
    for (key, record) in store.records() {
        let _ = writeln!(out, "{key}");
        let _ = writeln!(out, "  selector:     {}", printer.bold(&record.selector));
        let _ = writeln!(out, "  description:  {}", record.description);
        let _ = writeln!(
            out,
            "  last updated: {}",
            printer.dim(&record.last_updated.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        );
    }
    out
}

/// The store document as pretty JSON
pub fn render_json(store: &LocatorStore) -> CliResult<String> {
    let document: BTreeMap<&str, &LocatorRecord> = store.records().collect();
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Execute a cache subcommand
pub fn execute_cache(args: &CacheArgs, printer: &Printer) -> CliResult<()> {
    match &args.subcommand {
        CacheSubcommand::List(dir) => {
            let summaries = summarize(&dir.dir)?;
            print!("{}", render_summaries(&summaries, printer));
        }
        CacheSubcommand::Show(show) => {
            let store = open(&show.cache.dir, &show.suite);
            if show.json {
                println!("{}", render_json(&store)?);
            } else {
                print!("{}", render_records(&store, printer));
            }
        }
        CacheSubcommand::Forget(forget) => {
            let mut store = open(&forget.cache.dir, &forget.suite);
            if store.try_remove(&forget.key)?.is_none() {
                return Err(CliError::invalid_argument(format!(
                    "no cached locator '{}' in suite '{}'",
                    forget.key, forget.suite
                )));
            }
            printer.success(&format!("forgot '{}' in suite '{}'", forget.key, forget.suite));
        }
        CacheSubcommand::Clear(clear) => {
            let mut store = open(&clear.cache.dir, &clear.suite);
            let removed = store.try_clear()?;
            printer.success(&format!(
                "cleared {removed} locators from suite '{}'",
                clear.suite
            ));
        }
    }
    Ok(())
}
