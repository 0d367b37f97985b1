//! Letter statistics over a repository
//!
//! Ties the walker to the frequency aggregator. Each call builds a fresh
//! [`LetterFrequencies`], so results never leak between requests.

use futures::stream::{BoxStream, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::extensions::AllowedExtensions;
use crate::frequency::{FrequencyReport, LetterFrequencies};
use crate::walker::{FileContent, ROOT, RepoWalker};

#[derive(Clone)]
pub struct RepoAnalyzer {
    walker: RepoWalker,
}

impl RepoAnalyzer {
    pub fn new(walker: RepoWalker) -> Self {
        Self { walker }
    }

    pub fn walker(&self) -> &RepoWalker {
        &self.walker
    }

    /// Every matching file, fetched eagerly
    pub async fn matching_files(
        &self,
        extensions: &AllowedExtensions,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileContent>> {
        self.walker.collect(ROOT, extensions, cancel).await
    }

    /// Matching files as they are fetched
    pub fn stream_files(
        &self,
        extensions: AllowedExtensions,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<FileContent>> {
        self.walker.stream(ROOT, extensions, cancel)
    }

    /// Batch pattern: collect everything, then count in parallel
    pub async fn letter_frequencies(
        &self,
        extensions: &AllowedExtensions,
        cancel: &CancellationToken,
    ) -> Result<FrequencyReport> {
        let files = self.matching_files(extensions, cancel).await?;
        let texts: Vec<&str> = files.iter().map(|f| f.text.as_str()).collect();

        let frequencies = LetterFrequencies::new();
        frequencies.update_all(&texts);

        tracing::info!(
            files = files.len(),
            letters = frequencies.total(),
            "Letter frequencies computed"
        );
        Ok(frequencies.finalize())
    }

    /// Incremental pattern: count each file as the stream yields it
    ///
    /// An error part-way through discards the partial counts and is returned;
    /// a partial histogram is never reported as complete.
    pub async fn letter_frequencies_streaming(
        &self,
        extensions: &AllowedExtensions,
        cancel: &CancellationToken,
    ) -> Result<FrequencyReport> {
        self.letter_frequencies_streaming_with(extensions, cancel, |_| {})
            .await
    }

    /// Like [`letter_frequencies_streaming`](Self::letter_frequencies_streaming),
    /// calling `on_file` after each file has been counted
    pub async fn letter_frequencies_streaming_with<F>(
        &self,
        extensions: &AllowedExtensions,
        cancel: &CancellationToken,
        mut on_file: F,
    ) -> Result<FrequencyReport>
    where
        F: FnMut(&FileContent),
    {
        let frequencies = LetterFrequencies::new();
        let files = self
            .stream_files(extensions.clone(), cancel.clone())
            .try_fold(0usize, |n, file| {
                frequencies.update(&file.text);
                on_file(&file);
                async move { Ok(n + 1) }
            })
            .await?;

        tracing::info!(
            files = files,
            letters = frequencies.total(),
            "Letter frequencies computed incrementally"
        );
        Ok(frequencies.finalize())
    }
}
