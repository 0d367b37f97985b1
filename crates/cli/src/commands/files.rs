//! files command - List matching files of a repository

use clap::Args;
use comfy_table::Cell;
use futures::TryStreamExt;
use ghstat_core::FileContent;
use humansize::{BINARY, format_size};
use serde::Serialize;

use super::{Context, RepoArgs, build_analyzer};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// List the matching files of a repository
#[derive(Args, Debug)]
pub struct FilesArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
}

#[derive(Debug, Serialize)]
struct FileInfo {
    path: String,
    size_bytes: usize,
    size_human: String,
}

impl From<&FileContent> for FileInfo {
    fn from(file: &FileContent) -> Self {
        let size = file.text.len();
        Self {
            path: file.path.clone(),
            size_bytes: size,
            size_human: format_size(size as u64, BINARY),
        }
    }
}

#[derive(Debug, Serialize)]
struct FilesOutput {
    repository: String,
    extensions: Vec<String>,
    files: Vec<FileInfo>,
    total_files: usize,
    total_size_bytes: usize,
}

impl FilesOutput {
    fn new(repository: String, extensions: Vec<String>, files: Vec<FileInfo>) -> Self {
        let total_size_bytes = files.iter().map(|f| f.size_bytes).sum();
        Self {
            repository,
            extensions,
            total_files: files.len(),
            total_size_bytes,
            files,
        }
    }
}

/// Execute the files command
pub async fn execute(args: FilesArgs, ctx: Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output);

    let (analyzer, repository) = match build_analyzer(&args.repo, &ctx.config, &formatter) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let extensions = args.repo.allowed_extensions();

    let result = if args.repo.stream {
        stream_files(&formatter, analyzer.stream_files(extensions.clone(), ctx.cancel.clone()))
            .await
    } else {
        let pb = formatter.spinner("walking repository");
        let result = analyzer
            .matching_files(&extensions, &ctx.cancel)
            .await
            .map(|files| files.iter().map(FileInfo::from).collect::<Vec<_>>());
        pb.finish_and_clear();
        result
    };

    let files = match result {
        Ok(f) => f,
        Err(e) => {
            formatter.error(&format!("Failed to list files: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let output = FilesOutput::new(repository, extensions.as_slice().to_vec(), files);

    if formatter.is_json() {
        formatter.json(&output);
    } else {
        if !args.repo.stream {
            print_table(&formatter, &output.files);
        }
        if output.files.is_empty() {
            formatter.warning("No matching files found");
        }
        formatter.summary(&format!(
            "{}: {} files, {}",
            output.repository,
            output.total_files,
            format_size(output.total_size_bytes as u64, BINARY)
        ));
    }

    ExitCode::Success
}

/// Print each path as soon as the walker yields it
async fn stream_files(
    formatter: &Formatter,
    stream: futures::stream::BoxStream<'static, ghstat_core::Result<FileContent>>,
) -> ghstat_core::Result<Vec<FileInfo>> {
    stream
        .map_ok(|file| FileInfo::from(&file))
        .try_fold(Vec::new(), |mut files, info| {
            if !formatter.is_json() {
                formatter.println(&format!(
                    "{}  {}",
                    formatter.style_value(&format!("{:>10}", info.size_human)),
                    formatter.style_name(&info.path)
                ));
            }
            files.push(info);
            async move { Ok(files) }
        })
        .await
}

fn print_table(formatter: &Formatter, files: &[FileInfo]) {
    if files.is_empty() {
        return;
    }
    let mut table = formatter.table(&["Path", "Size"]);
    for file in files {
        table.add_row(vec![
            Cell::new(formatter.style_name(&file.path)),
            formatter.number_cell(formatter.style_value(&file.size_human)),
        ]);
    }
    formatter.println(&table.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, text: &str) -> FileContent {
        FileContent {
            path: path.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_files_output_json() {
        let files = vec![
            FileInfo::from(&file("/index.js", "console.log('test');")),
            FileInfo::from(&file("/src/lib.ts", "")),
        ];
        let output = FilesOutput::new(
            "acme/widgets".to_string(),
            vec![".js".to_string(), ".ts".to_string()],
            files,
        );

        insta::assert_json_snapshot!(output, @r#"
        {
          "repository": "acme/widgets",
          "extensions": [
            ".js",
            ".ts"
          ],
          "files": [
            {
              "path": "/index.js",
              "size_bytes": 20,
              "size_human": "20 B"
            },
            {
              "path": "/src/lib.ts",
              "size_bytes": 0,
              "size_human": "0 B"
            }
          ],
          "total_files": 2,
          "total_size_bytes": 20
        }
        "#);
    }

    #[tokio::test]
    async fn test_stream_files_stops_at_first_error() {
        let formatter = Formatter::new(crate::output::OutputConfig {
            quiet: true,
            ..Default::default()
        });
        let items = vec![
            Ok(file("/a.js", "a")),
            Err(ghstat_core::Error::Cancelled),
            Ok(file("/b.js", "b")),
        ];
        let stream = Box::pin(futures::stream::iter(items));

        let result = stream_files(&formatter, stream).await;
        assert!(matches!(result, Err(ghstat_core::Error::Cancelled)));
    }
}
