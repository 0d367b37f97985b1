//! Remote tree traversal
//!
//! Walks a repository from a root path, lists directories, fetches the files
//! whose names match the extension allow-list and yields their text. Every
//! remote call goes through the shared [`ResilienceExecutor`].
//!
//! Two consumption modes share the same job model:
//! - [`RepoWalker::collect`] drains an explicit work queue with at most
//!   `parallelism` remote calls outstanding and returns everything at once.
//! - [`RepoWalker::stream`] walks depth-first, one remote call at a time,
//!   and hands each file over as soon as it has been fetched.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, BoxStream, FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::extensions::AllowedExtensions;
use crate::resilience::ResilienceExecutor;
use crate::traits::{ContentEntry, ContentKind, ContentProvider};

/// Path of the repository root
pub const ROOT: &str = "/";

/// What to do with file content that is not valid UTF-8
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Replace invalid sequences with U+FFFD
    #[default]
    Replace,
    /// Drop the file
    Skip,
    /// Abort the traversal with [`Error::Decode`]
    Fail,
}

/// Traversal settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    /// Maximum remote calls outstanding in eager mode
    pub parallelism: usize,
    pub decode: DecodePolicy,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            decode: DecodePolicy::default(),
        }
    }
}

/// Half the available CPUs, at least one
pub fn default_parallelism() -> usize {
    (num_cpus::get() / 2).max(1)
}

/// Text of one matching file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub path: String,
    pub text: String,
}

#[derive(Debug)]
enum Job {
    List(String),
    Fetch(String),
}

#[derive(Debug)]
enum Outcome {
    Listed(Vec<ContentEntry>),
    Fetched(String, Vec<u8>),
}

/// Walks a remote tree through a resilience executor
#[derive(Clone)]
pub struct RepoWalker {
    provider: Arc<dyn ContentProvider>,
    executor: Arc<ResilienceExecutor>,
    options: WalkOptions,
}

impl RepoWalker {
    pub fn new(
        provider: Arc<dyn ContentProvider>,
        executor: Arc<ResilienceExecutor>,
        options: WalkOptions,
    ) -> Self {
        Self {
            provider,
            executor,
            options: WalkOptions {
                parallelism: options.parallelism.max(1),
                ..options
            },
        }
    }

    pub fn options(&self) -> &WalkOptions {
        &self.options
    }

    /// Eager mode: walk the whole tree and return every matching file
    ///
    /// The first unrecoverable error aborts the walk; calls still in flight
    /// are dropped and nothing is returned. The result is sorted by path.
    pub async fn collect(
        &self,
        root: &str,
        extensions: &AllowedExtensions,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileContent>> {
        let mut pending = VecDeque::from([Job::List(root.to_string())]);
        let mut in_flight = FuturesUnordered::new();
        let mut files = Vec::new();

        loop {
            while in_flight.len() < self.options.parallelism {
                let Some(job) = pending.pop_front() else {
                    break;
                };
                in_flight.push(self.run(job, cancel));
            }

            let Some(outcome) = in_flight.next().await else {
                break;
            };

            match outcome? {
                Outcome::Listed(entries) => {
                    pending.extend(plan(entries, extensions));
                }
                Outcome::Fetched(path, bytes) => {
                    if let Some(file) = self.decode(path, bytes)? {
                        files.push(file);
                    }
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(root = root, files = files.len(), "Traversal complete");
        Ok(files)
    }

    /// Lazy mode: yield matching files as they are fetched
    ///
    /// The stream is single-pass. It checks `cancel` before every remote call
    /// and ends after yielding the first error; items already yielded stay
    /// valid, so a consumer aggregating incrementally may hold partial results.
    pub fn stream(
        &self,
        root: &str,
        extensions: AllowedExtensions,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<FileContent>> {
        let state = StreamState {
            walker: self.clone(),
            extensions,
            cancel,
            stack: vec![Job::List(root.to_string())],
        };

        stream::try_unfold(state, |mut state| async move {
            let next = state.advance().await?;
            Ok::<_, Error>(next.map(|file| (file, state)))
        })
        .boxed()
    }

    async fn run(&self, job: Job, cancel: &CancellationToken) -> Result<Outcome> {
        match job {
            Job::List(path) => {
                let entries = self
                    .executor
                    .execute(cancel, || self.provider.list_directory(&path))
                    .await?;
                tracing::debug!(path = %path, entries = entries.len(), "Listed directory");
                Ok(Outcome::Listed(entries))
            }
            Job::Fetch(path) => {
                let bytes = self
                    .executor
                    .execute(cancel, || self.provider.get_raw_content(&path))
                    .await?;
                Ok(Outcome::Fetched(path, bytes))
            }
        }
    }

    fn decode(&self, path: String, bytes: Vec<u8>) -> Result<Option<FileContent>> {
        if bytes.is_empty() {
            tracing::debug!(path = %path, "Skipping empty file");
            return Ok(None);
        }

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => match self.options.decode {
                DecodePolicy::Replace => String::from_utf8_lossy(e.as_bytes()).into_owned(),
                DecodePolicy::Skip => {
                    tracing::warn!(path = %path, "Skipping file with invalid UTF-8");
                    return Ok(None);
                }
                DecodePolicy::Fail => return Err(Error::Decode { path }),
            },
        };

        tracing::debug!(path = %path, bytes = text.len(), "Fetched file");
        Ok(Some(FileContent { path, text }))
    }
}

/// Turn a listing into follow-up jobs, dropping files that do not match
fn plan(entries: Vec<ContentEntry>, extensions: &AllowedExtensions) -> Vec<Job> {
    entries
        .into_iter()
        .filter_map(|entry| match entry.kind {
            ContentKind::Directory => Some(Job::List(entry.path)),
            ContentKind::File if extensions.matches(&entry.name) => Some(Job::Fetch(entry.path)),
            ContentKind::File => None,
        })
        .collect()
}

struct StreamState {
    walker: RepoWalker,
    extensions: AllowedExtensions,
    cancel: CancellationToken,
    stack: Vec<Job>,
}

impl StreamState {
    /// Run jobs until one produces a file or the stack is empty
    async fn advance(&mut self) -> Result<Option<FileContent>> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let Some(job) = self.stack.pop() else {
                return Ok(None);
            };

            match self.walker.run(job, &self.cancel).await? {
                Outcome::Listed(entries) => {
                    // Reversed so the stack pops entries in listing order.
                    let mut jobs = plan(entries, &self.extensions);
                    jobs.reverse();
                    self.stack.extend(jobs);
                }
                Outcome::Fetched(path, bytes) => {
                    if let Some(file) = self.walker.decode(path, bytes)? {
                        return Ok(Some(file));
                    }
                }
            }
        }
    }
}
