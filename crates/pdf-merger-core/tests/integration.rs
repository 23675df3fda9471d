//! Integration tests for pdf-merger-core
//!
//! These tests verify the upload-merge workflow end to end:
//! - Empty and all-unsupported batches
//! - Order preservation across PDFs and converted images
//! - Abort on the first conversion failure
//! - Release of every input stream on every exit path
//! - Blob stores feeding the orchestrator

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use pdf_merger_core::{
    BlobStore, ConversionConfig, Error, ErrorKind, FragmentOrigin, LopdfEngine, MergeConfig,
    MergeOrchestrator, PdfEngine, PdfFragment, Result, ServiceConfig, UploadedItem,
    blob::{MemoryBlobStore, TempDirBlobStore},
    engine::EngineInfo,
};

// =============================================================================
// Mock Engine for Testing
// =============================================================================

/// Engine that records calls and returns predictable bytes.
#[derive(Default)]
struct MockEngine {
    converted: Mutex<Vec<Vec<u8>>>,
    merged_sources: Mutex<Option<Vec<String>>>,
    merge_called: AtomicBool,
    fail_merge: bool,
}

impl MockEngine {
    fn failing_merge() -> Self {
        Self {
            fail_merge: true,
            ..Default::default()
        }
    }

    fn merge_called(&self) -> bool {
        self.merge_called.load(Ordering::SeqCst)
    }

    fn merged_sources(&self) -> Option<Vec<String>> {
        self.merged_sources.lock().unwrap().clone()
    }
}

#[async_trait]
impl PdfEngine for MockEngine {
    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: "mock",
            blocking: false,
        }
    }

    async fn convert_image(&self, image: Bytes, _config: &ConversionConfig) -> Result<Bytes> {
        if image.as_ref() == b"corrupt" {
            return Err(Error::ImageDecode("mock decode failure".to_string()));
        }
        self.converted.lock().unwrap().push(image.to_vec());
        Ok(Bytes::from(format!("[pdf:{}]", String::from_utf8_lossy(&image))))
    }

    async fn merge(&self, fragments: Vec<PdfFragment>, _config: &MergeConfig) -> Result<Bytes> {
        self.merge_called.store(true, Ordering::SeqCst);
        *self.merged_sources.lock().unwrap() =
            Some(fragments.iter().map(|f| f.source.clone()).collect());

        if self.fail_merge {
            return Err(Error::Lopdf("mock merge failure".to_string()));
        }

        let mut out = Vec::new();
        for fragment in &fragments {
            out.extend_from_slice(&fragment.bytes);
        }
        Ok(Bytes::from(out))
    }
}

// =============================================================================
// Drop-Counting Stream
// =============================================================================

/// Stream that counts how many times it was released.
struct TrackedStream {
    inner: Cursor<Vec<u8>>,
    drops: Arc<AtomicUsize>,
    fail_reads: bool,
}

impl Read for TrackedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.fail_reads {
            return Err(std::io::Error::other("disk went away"));
        }
        self.inner.read(buf)
    }
}

impl Seek for TrackedStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builds tracked items and checks their release counts.
#[derive(Default)]
struct Tracker {
    counters: Vec<Arc<AtomicUsize>>,
}

impl Tracker {
    fn item(&mut self, filename: &str, data: &[u8]) -> UploadedItem {
        self.build(filename, data, false)
    }

    fn unreadable(&mut self, filename: &str) -> UploadedItem {
        self.build(filename, b"", true)
    }

    fn build(&mut self, filename: &str, data: &[u8], fail_reads: bool) -> UploadedItem {
        let drops = Arc::new(AtomicUsize::new(0));
        self.counters.push(Arc::clone(&drops));
        UploadedItem::new(
            filename,
            Box::new(TrackedStream {
                inner: Cursor::new(data.to_vec()),
                drops,
                fail_reads,
            }),
        )
    }

    fn assert_all_released_once(&self) {
        for (i, counter) in self.counters.iter().enumerate() {
            assert_eq!(
                counter.load(Ordering::SeqCst),
                1,
                "stream {i} should be released exactly once"
            );
        }
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

fn create_test_pdf(label: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let page_tree_id = doc.new_object_id();

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tj", vec![Object::string_literal(label)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

    let page_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(page_tree_id)),
        ("Contents", Object::Reference(content_id)),
        ("Resources", Object::Dictionary(Dictionary::new())),
        (
            "MediaBox",
            Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
        ),
    ]));

    let page_tree = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(vec![Object::Reference(page_id)])),
        ("Count", Object::Integer(1)),
    ]);
    doc.objects.insert(page_tree_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(page_tree_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap();
    output
}

fn create_test_png() -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([0, 128, 255])))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Describe each page as its text label, or "image" for converted pages.
fn describe_pages(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            let content = doc.get_page_content(id).unwrap();
            let text = String::from_utf8_lossy(&content).to_string();
            if text.contains("Do") {
                "image".to_string()
            } else {
                text.split('(')
                    .nth(1)
                    .and_then(|s| s.split(')').next())
                    .unwrap_or("")
                    .to_string()
            }
        })
        .collect()
}

fn mock_orchestrator() -> (Arc<MockEngine>, MergeOrchestrator) {
    let engine = Arc::new(MockEngine::default());
    let orchestrator = MergeOrchestrator::with_engine(engine.clone());
    (engine, orchestrator)
}

fn real_orchestrator() -> MergeOrchestrator {
    MergeOrchestrator::with_engine(Arc::new(LopdfEngine::new()))
}

// =============================================================================
// Orchestration Tests (mock engine)
// =============================================================================

#[tokio::test]
async fn test_empty_batch_fails_without_engine_calls() {
    let (engine, orchestrator) = mock_orchestrator();

    let result = orchestrator.merge(Vec::new()).await;

    assert!(matches!(result, Err(Error::NoFilesProvided)));
    assert!(!engine.merge_called());
    assert!(engine.converted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_all_unsupported_is_no_mergeable_content() {
    let (engine, orchestrator) = mock_orchestrator();
    let mut tracker = Tracker::default();
    let items = vec![
        tracker.item("notes.txt", b"hello"),
        tracker.item("archive.zip", b"PK"),
        tracker.item("README", b"readme"),
    ];

    let err = orchestrator.merge(items).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoMergeableContent);
    assert!(!engine.merge_called());
    tracker.assert_all_released_once();
}

#[tokio::test]
async fn test_fragments_reach_merge_in_upload_order() {
    let (engine, orchestrator) = mock_orchestrator();
    let mut tracker = Tracker::default();
    let items = vec![
        tracker.item("a.pdf", b"A"),
        tracker.item("b.PNG", b"B"),
        tracker.item("skip.txt", b"S"),
        tracker.item("c.pdf", b"C"),
        tracker.item("a.pdf", b"A"),
    ];

    let merged = orchestrator.merge(items).await.unwrap();

    assert_eq!(merged.as_ref(), b"A[pdf:B]CA");
    assert_eq!(
        engine.merged_sources().unwrap(),
        vec!["a.pdf", "b.PNG", "c.pdf", "a.pdf"]
    );
    tracker.assert_all_released_once();
}

#[tokio::test]
async fn test_conversion_failure_aborts_before_merge() {
    let (engine, orchestrator) = mock_orchestrator();
    let mut tracker = Tracker::default();
    let items = vec![
        tracker.item("a.pdf", b"A"),
        tracker.item("corrupt.png", b"corrupt"),
        tracker.item("c.pdf", b"C"),
        tracker.item("d.jpg", b"D"),
    ];

    let err = orchestrator.merge(items).await.unwrap_err();

    match err {
        Error::ConversionFailed { filename, reason } => {
            assert_eq!(filename, "corrupt.png");
            assert!(reason.contains("mock decode failure"));
        }
        other => panic!("expected ConversionFailed, got {other:?}"),
    }
    assert!(!engine.merge_called());
    // d.jpg comes after the failure and is never converted
    assert!(engine.converted.lock().unwrap().is_empty());
    tracker.assert_all_released_once();
}

#[tokio::test]
async fn test_merge_failure_is_surfaced() {
    let engine = Arc::new(MockEngine::failing_merge());
    let orchestrator = MergeOrchestrator::with_engine(engine.clone());
    let mut tracker = Tracker::default();
    let items = vec![tracker.item("a.pdf", b"A"), tracker.item("b.pdf", b"B")];

    let err = orchestrator.merge(items).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MergeFailed);
    assert!(err.to_string().contains("mock merge failure"));
    assert!(engine.merge_called());
    tracker.assert_all_released_once();
}

#[tokio::test]
async fn test_read_failure_is_file_open_error() {
    let (engine, orchestrator) = mock_orchestrator();
    let mut tracker = Tracker::default();
    let items = vec![
        tracker.item("a.pdf", b"A"),
        tracker.unreadable("broken.pdf"),
        tracker.item("c.pdf", b"C"),
    ];

    let err = orchestrator.merge(items).await.unwrap_err();

    assert!(matches!(err, Error::FileOpen { ref filename, .. } if filename == "broken.pdf"));
    assert_eq!(err.kind(), ErrorKind::FileOpenFailed);
    assert!(!engine.merge_called());
    tracker.assert_all_released_once();
}

#[tokio::test]
async fn test_unsupported_files_are_not_read() {
    let (_engine, orchestrator) = mock_orchestrator();
    let mut tracker = Tracker::default();
    // An unreadable stream with an unknown extension must not fail the batch
    let items = vec![tracker.item("a.pdf", b"A"), tracker.unreadable("notes.txt")];

    let merged = orchestrator.merge(items).await.unwrap();

    assert_eq!(merged.as_ref(), b"A");
    tracker.assert_all_released_once();
}

#[tokio::test]
async fn test_content_sniffing_rejects_mismatch() {
    let engine = Arc::new(MockEngine::default());
    let mut config = ServiceConfig::default();
    config.validation.sniff_content = true;
    let orchestrator = MergeOrchestrator::new(engine.clone(), &config);
    let mut tracker = Tracker::default();
    let items = vec![
        tracker.item("a.pdf", &create_test_pdf("a")),
        tracker.item("renamed.pdf", b"MZ\x90\x00 executable"),
    ];

    let err = orchestrator.merge(items).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ContentMismatch);
    assert!(!engine.merge_called());
    tracker.assert_all_released_once();
}

#[tokio::test]
async fn test_lenient_mode_passes_mismatched_content_through() {
    let (engine, orchestrator) = mock_orchestrator();
    let mut tracker = Tracker::default();
    let items = vec![tracker.item("renamed.pdf", b"MZ\x90\x00 executable")];

    orchestrator.merge(items).await.unwrap();

    assert_eq!(engine.merged_sources().unwrap(), vec!["renamed.pdf"]);
}

#[test]
fn test_fragment_origins() {
    let fragment = PdfFragment::new("x.png", FragmentOrigin::Converted, b"%PDF".to_vec());
    assert_eq!(fragment.as_ref(), b"%PDF");
    assert_eq!(fragment.origin, FragmentOrigin::Converted);
}

// =============================================================================
// End-to-End Tests (lopdf engine)
// =============================================================================

#[tokio::test]
async fn test_pdf_image_pdf_order() {
    let orchestrator = real_orchestrator();
    let mut tracker = Tracker::default();
    let items = vec![
        tracker.item("a.pdf", &create_test_pdf("a")),
        tracker.item("b.png", &create_test_png()),
        tracker.item("c.pdf", &create_test_pdf("c")),
    ];

    let merged = orchestrator.merge(items).await.unwrap();

    assert!(merged.starts_with(b"%PDF-"));
    assert_eq!(describe_pages(&merged), vec!["a", "image", "c"]);
    tracker.assert_all_released_once();
}

#[tokio::test]
async fn test_unsupported_file_skipped() {
    let orchestrator = real_orchestrator();
    let mut tracker = Tracker::default();
    let items = vec![
        tracker.item("a.pdf", &create_test_pdf("a")),
        tracker.item("notes.txt", b"some notes"),
    ];

    let merged = orchestrator.merge(items).await.unwrap();

    assert_eq!(describe_pages(&merged), vec!["a"]);
    tracker.assert_all_released_once();
}

#[tokio::test]
async fn test_corrupt_image_aborts_with_real_engine() {
    let orchestrator = real_orchestrator();
    let mut tracker = Tracker::default();
    let items = vec![
        tracker.item("a.pdf", &create_test_pdf("a")),
        tracker.item("corrupt.png", b"\x89PNG\r\n\x1a\ntruncated"),
        tracker.item("c.pdf", &create_test_pdf("c")),
    ];

    let err = orchestrator.merge(items).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConversionFailed);
    tracker.assert_all_released_once();
}

#[tokio::test]
async fn test_invalid_pdf_is_merge_failure() {
    let orchestrator = real_orchestrator();
    let mut tracker = Tracker::default();
    let items = vec![tracker.item("fake.pdf", b"this is not a pdf")];

    let err = orchestrator.merge(items).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MergeFailed);
}

#[tokio::test]
async fn test_identical_input_identical_output() {
    let orchestrator = real_orchestrator();
    let pdf = create_test_pdf("a");
    let png = create_test_png();

    let batch = || {
        vec![
            UploadedItem::new("a.pdf", Box::new(Cursor::new(pdf.clone()))),
            UploadedItem::new("b.jpg.png", Box::new(Cursor::new(png.clone()))),
        ]
    };

    let first = orchestrator.merge(batch()).await.unwrap();
    let second = orchestrator.merge(batch()).await.unwrap();

    assert_eq!(first, second);
}

// =============================================================================
// Blob Store Tests
// =============================================================================

async fn merge_through_store(store: &dyn BlobStore) -> Bytes {
    let mut scope = store.scope().unwrap();
    let uploads = [
        ("a.pdf", create_test_pdf("a")),
        ("b.png", create_test_png()),
    ];

    let keys: Vec<_> = uploads
        .iter()
        .map(|(name, data)| (*name, scope.put(data).unwrap()))
        .collect();

    let items = keys
        .into_iter()
        .map(|(name, key)| UploadedItem::new(name, scope.open(key).unwrap()))
        .collect();

    real_orchestrator().merge(items).await.unwrap()
}

#[tokio::test]
async fn test_memory_and_temp_dir_stores_agree() {
    let from_memory = merge_through_store(&MemoryBlobStore::new()).await;
    let from_disk = merge_through_store(&TempDirBlobStore::new(None)).await;

    assert_eq!(describe_pages(&from_memory), vec!["a", "image"]);
    assert_eq!(from_memory, from_disk);
}
