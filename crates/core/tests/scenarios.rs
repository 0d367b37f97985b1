//! End-to-end traversal and aggregation scenarios against an in-memory provider

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use ghstat_core::{
    AllowedExtensions, BreakerConfig, CancellationToken, CircuitState, ContentEntry,
    ContentProvider, DecodePolicy, Error, LetterFrequencies, ROOT, RepoAnalyzer, RepoWalker,
    ResilienceExecutor, Result, RetryConfig, WalkOptions,
};
use jiff::{SignedDuration, Timestamp};

#[derive(Debug, Clone, Copy)]
enum Fault {
    RateLimited { reset_in_secs: i64 },
    Unavailable,
    Network,
}

impl Fault {
    fn to_error(self) -> Error {
        match self {
            Fault::RateLimited { reset_in_secs } => Error::RateLimited {
                reset_at: Timestamp::now() + SignedDuration::from_secs(reset_in_secs),
                message: "API rate limit exceeded".to_string(),
            },
            Fault::Unavailable => Error::Unavailable("503 Service Unavailable".to_string()),
            Fault::Network => Error::Network("connection refused".to_string()),
        }
    }
}

/// In-memory repository with scripted faults and call accounting
#[derive(Default)]
struct FakeRepo {
    dirs: BTreeMap<String, Vec<ContentEntry>>,
    files: BTreeMap<String, Vec<u8>>,
    faults: Mutex<VecDeque<Fault>>,
    always_fail: Option<Fault>,
    latency: Option<Duration>,
    /// Overrides `latency` for listings below the root
    subdir_latency: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRepo {
    fn dir(mut self, path: &str, entries: Vec<ContentEntry>) -> Self {
        self.dirs.insert(path.to_string(), entries);
        self
    }

    fn file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    fn fault(self, fault: Fault) -> Self {
        self.faults.lock().unwrap().push_back(fault);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, latency: Option<Duration>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(fault) = self.always_fail {
            return Err(fault.to_error());
        }
        if let Some(fault) = self.faults.lock().unwrap().pop_front() {
            return Err(fault.to_error());
        }
        Ok(())
    }
}

#[async_trait]
impl ContentProvider for FakeRepo {
    async fn list_directory(&self, path: &str) -> Result<Vec<ContentEntry>> {
        let latency = match path {
            ROOT => self.latency,
            _ => self.subdir_latency.or(self.latency),
        };
        self.enter(latency).await?;
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn get_raw_content(&self, path: &str) -> Result<Vec<u8>> {
        self.enter(self.latency).await?;
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }
}

fn single_file_repo() -> FakeRepo {
    FakeRepo::default()
        .dir(ROOT, vec![ContentEntry::dir("src")])
        .dir("src", vec![ContentEntry::file("src/x.ts")])
        .file("src/x.ts", "console.log('test');")
}

fn wide_repo() -> FakeRepo {
    let mut repo = FakeRepo::default();
    let mut root = Vec::new();
    for d in 0..6 {
        let dir = format!("pkg{d}");
        let mut entries = Vec::new();
        for f in 0..4 {
            let path = format!("{dir}/mod{f}.js");
            repo = repo.file(&path, "abc");
            entries.push(ContentEntry::file(path));
        }
        entries.push(ContentEntry::file(format!("{dir}/README.md")));
        repo = repo.dir(&dir, entries);
        root.push(ContentEntry::dir(dir));
    }
    repo.dir(ROOT, root)
}

fn walker(repo: Arc<FakeRepo>, executor: Arc<ResilienceExecutor>, parallelism: usize) -> RepoWalker {
    RepoWalker::new(
        repo,
        executor,
        WalkOptions {
            parallelism,
            decode: DecodePolicy::Replace,
        },
    )
}

#[tokio::test]
async fn test_single_file_tree_counts() {
    let repo = Arc::new(single_file_repo());
    let walker = walker(repo.clone(), Arc::new(ResilienceExecutor::default()), 2);
    let exts = AllowedExtensions::new([".js", ".ts"]).unwrap();

    let files = walker
        .collect(ROOT, &exts, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].text, "console.log('test');");

    let report = RepoAnalyzer::new(walker)
        .letter_frequencies(&exts, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.get('o'), Some(3));
    assert_eq!(report.get('e'), Some(2));
    assert_eq!(report.get('s'), Some(2));
    assert_eq!(report.get('t'), Some(2));
    assert_eq!(report.get('l'), Some(2));
    assert_eq!(report.get('n'), Some(1));
    assert_eq!(report.get('c'), Some(1));
    assert_eq!(report.get('g'), Some(1));
    assert_eq!(report.total(), 14);
    assert_eq!(report.entries()[0].letter, 'o');
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_first_listing_recovers() {
    let exts = AllowedExtensions::default();
    let cancel = CancellationToken::new();

    let clean = Arc::new(single_file_repo());
    let expected = walker(clean, Arc::new(ResilienceExecutor::default()), 2)
        .collect(ROOT, &exts, &cancel)
        .await
        .unwrap();

    let limited = Arc::new(single_file_repo().fault(Fault::RateLimited { reset_in_secs: 2 }));
    let started = tokio::time::Instant::now();
    let files = walker(limited.clone(), Arc::new(ResilienceExecutor::default()), 2)
        .collect(ROOT, &exts, &cancel)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(1900));
    assert_eq!(files, expected);
    // root listed twice, src listed once, one fetch
    assert_eq!(limited.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_always_unavailable_fails_after_one_retry() {
    let repo = Arc::new(FakeRepo {
        always_fail: Some(Fault::Unavailable),
        ..single_file_repo()
    });

    let result = walker(repo.clone(), Arc::new(ResilienceExecutor::default()), 2)
        .collect(ROOT, &AllowedExtensions::default(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(Error::Unavailable(_))));
    assert_eq!(repo.calls(), 2);
}

#[tokio::test]
async fn test_pre_cancelled_makes_no_calls() {
    let repo = Arc::new(single_file_repo());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let analyzer = RepoAnalyzer::new(walker(
        repo.clone(),
        Arc::new(ResilienceExecutor::default()),
        2,
    ));

    let eager = analyzer
        .letter_frequencies(&AllowedExtensions::default(), &cancel)
        .await;
    assert!(matches!(eager, Err(Error::Cancelled)));

    let lazy = analyzer
        .letter_frequencies_streaming(&AllowedExtensions::default(), &cancel)
        .await;
    assert!(matches!(lazy, Err(Error::Cancelled)));

    assert_eq!(repo.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_circuit_opens_and_allows_trial() {
    let repo = Arc::new(
        single_file_repo()
            .fault(Fault::Network)
            .fault(Fault::Network),
    );
    let executor = Arc::new(ResilienceExecutor::new(
        RetryConfig::default(),
        BreakerConfig {
            failure_threshold: 2,
            break_duration: Duration::from_secs(10),
        },
    ));
    let walker = walker(repo.clone(), executor.clone(), 1);
    let exts = AllowedExtensions::default();
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        let result = walker.collect(ROOT, &exts, &cancel).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
    assert_eq!(executor.circuit_state(), CircuitState::Open);
    assert_eq!(repo.calls(), 2);

    let result = walker.collect(ROOT, &exts, &cancel).await;
    assert!(matches!(result, Err(Error::CircuitOpen { .. })));
    assert_eq!(repo.calls(), 2);

    tokio::time::advance(Duration::from_secs(10)).await;
    let files = walker.collect(ROOT, &exts, &cancel).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(executor.circuit_state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_fan_out_is_bounded() {
    let repo = Arc::new(FakeRepo {
        latency: Some(Duration::from_millis(10)),
        ..wide_repo()
    });

    let files = walker(repo.clone(), Arc::new(ResilienceExecutor::default()), 3)
        .collect(ROOT, &AllowedExtensions::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(files.len(), 24);
    let max = repo.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "saw {max} concurrent calls");
    assert!(max > 1, "traversal never ran calls concurrently");

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[tokio::test(start_paused = true)]
async fn test_eager_cancel_stops_fan_out() {
    let dirs: Vec<ContentEntry> = (0..20).map(|d| ContentEntry::dir(format!("dir{d}"))).collect();
    let repo = Arc::new(FakeRepo {
        subdir_latency: Some(Duration::from_secs(3600)),
        ..FakeRepo::default().dir(ROOT, dirs)
    });
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        canceller.cancel();
    });

    let started = tokio::time::Instant::now();
    let result = walker(repo.clone(), Arc::new(ResilienceExecutor::default()), 3)
        .collect(ROOT, &AllowedExtensions::default(), &cancel)
        .await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(3600));
    // the root listing plus one batch of `parallelism` listings, nothing after
    assert_eq!(repo.calls(), 4);
    assert_eq!(repo.max_in_flight.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_eager_failure_aborts_everything() {
    let repo = Arc::new(
        FakeRepo::default()
            .dir(
                ROOT,
                vec![ContentEntry::file("ok.js"), ContentEntry::file("missing.js")],
            )
            .file("ok.js", "fine"),
    );
    let analyzer = RepoAnalyzer::new(walker(repo, Arc::new(ResilienceExecutor::default()), 2));

    let result = analyzer
        .letter_frequencies(&AllowedExtensions::default(), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(Error::NotFound(path)) if path == "missing.js"));
}

#[tokio::test]
async fn test_streaming_matches_batch() {
    let analyzer = RepoAnalyzer::new(walker(
        Arc::new(wide_repo()),
        Arc::new(ResilienceExecutor::default()),
        4,
    ));
    let exts = AllowedExtensions::default();
    let cancel = CancellationToken::new();

    let batch = analyzer.letter_frequencies(&exts, &cancel).await.unwrap();
    let streamed = analyzer
        .letter_frequencies_streaming(&exts, &cancel)
        .await
        .unwrap();

    assert_eq!(batch, streamed);
    assert_eq!(batch.get('a'), Some(24));
    assert_eq!(batch.entries()[..3].iter().map(|e| e.letter).collect::<String>(), "abc");
}

#[tokio::test]
async fn test_stream_cancel_midway_keeps_produced_items() {
    let repo = Arc::new(wide_repo());
    let analyzer = RepoAnalyzer::new(walker(
        repo.clone(),
        Arc::new(ResilienceExecutor::default()),
        1,
    ));
    let cancel = CancellationToken::new();
    let mut stream = analyzer.stream_files(AllowedExtensions::default(), cancel.clone());

    let frequencies = LetterFrequencies::new();
    let first = stream.next().await.unwrap().unwrap();
    frequencies.update(&first.text);
    let calls_before_cancel = repo.calls();

    cancel.cancel();
    assert!(matches!(stream.next().await, Some(Err(Error::Cancelled))));
    assert!(stream.next().await.is_none());

    assert_eq!(repo.calls(), calls_before_cancel);
    assert_eq!(frequencies.total(), 3);
}

#[tokio::test]
async fn test_empty_listing_yields_nothing() {
    let repo = Arc::new(
        FakeRepo::default()
            .dir(ROOT, vec![ContentEntry::dir("empty")])
            .dir("empty", Vec::new()),
    );
    let analyzer = RepoAnalyzer::new(walker(repo, Arc::new(ResilienceExecutor::default()), 2));

    let report = analyzer
        .letter_frequencies(&AllowedExtensions::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.entries().len(), 26);
    assert_eq!(report.total(), 0);
}
