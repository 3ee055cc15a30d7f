pub mod extract;
pub mod loader;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use extract::{score_line, Extractor};
pub use loader::{load_image, LoadError, RawImage};
pub use pipeline::{BatchEntry, BatchFailure, BatchOutcome, PipelineError, ProcessedReceipt, ReceiptPipeline};
pub use preprocess::{preprocess, PreprocessError, PreprocessedImage};
pub use recognizer::{merge_lines, recognize_page, MockRecognizer, OcrBackend, OcrError, SegmentationMode};
pub use types::{ImageInput, RecognitionOutput};
