pub mod emitter;
pub mod error;
pub mod google;
pub mod placement;
pub mod range;
pub mod writer;

pub use emitter::{EmitReport, RecordEmitter};
pub use error::SheetsError;
pub use google::GoogleSheetsClient;
pub use placement::first_open_row;
pub use range::CellRange;
pub use writer::{MemorySheet, RangeUpdate, SheetWriter, WriteRequest};
