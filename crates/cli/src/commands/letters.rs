//! letters command - Letter frequencies over a repository
//!
//! Counts ASCII letters, case-insensitively, across every file whose name
//! matches one of the requested extensions.

use clap::Args;
use comfy_table::Cell;
use ghstat_core::{AllowedExtensions, FrequencyReport};
use serde::Serialize;

use super::{Context, RepoArgs, build_analyzer};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Letter frequencies over the matching files of a repository
#[derive(Args, Debug)]
pub struct LettersArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Only show the N most frequent letters
    #[arg(short = 'n', long)]
    pub top: Option<usize>,
}

#[derive(Debug, Serialize)]
struct LettersOutput<'a> {
    repository: &'a str,
    extensions: &'a [String],
    mode: &'static str,
    total_letters: u64,
    frequencies: &'a FrequencyReport,
}

/// Execute the letters command
pub async fn execute(args: LettersArgs, ctx: Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output);

    let (analyzer, repository) = match build_analyzer(&args.repo, &ctx.config, &formatter) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let extensions = args.repo.allowed_extensions();

    let result = if args.repo.stream {
        let pb = formatter.spinner("files counted");
        let result = analyzer
            .letter_frequencies_streaming_with(&extensions, &ctx.cancel, |_| pb.inc(1))
            .await;
        pb.finish_and_clear();
        result
    } else {
        let pb = formatter.spinner("walking repository");
        let result = analyzer.letter_frequencies(&extensions, &ctx.cancel).await;
        pb.finish_and_clear();
        result
    };

    let report = match result {
        Ok(r) => r,
        Err(e) => {
            formatter.error(&format!("Failed to compute letter frequencies: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&LettersOutput {
            repository: &repository,
            extensions: extensions.as_slice(),
            mode: if args.repo.stream { "stream" } else { "collect" },
            total_letters: report.total(),
            frequencies: &report,
        });
    } else {
        print_report(&formatter, &repository, &extensions, &report, args.top);
    }

    ExitCode::Success
}

fn print_report(
    formatter: &Formatter,
    repository: &str,
    extensions: &AllowedExtensions,
    report: &FrequencyReport,
    top: Option<usize>,
) {
    let total = report.total();
    let shown = top.unwrap_or(report.entries().len());

    let mut table = formatter.table(&["Letter", "Count", "Share"]);
    for entry in report.entries().iter().take(shown) {
        table.add_row(vec![
            Cell::new(formatter.style_name(&entry.letter.to_string())),
            formatter.number_cell(formatter.style_value(&entry.count.to_string())),
            formatter.number_cell(share(entry.count, total)),
        ]);
    }

    formatter.println(&table.to_string());
    formatter.summary(&format!(
        "{repository}: {total} letters in files matching {}",
        extensions.as_slice().join(", ")
    ));
}

fn share(count: u64, total: u64) -> String {
    if total == 0 {
        return "-".to_string();
    }
    format!("{:.2}%", count as f64 * 100.0 / total as f64)
}
