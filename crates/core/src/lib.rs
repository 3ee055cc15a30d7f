pub mod amount;
pub mod config;
pub mod locator;
pub mod record;
pub mod schema;

pub use amount::Amount;
pub use config::{
    BatchConfig, BatchPolicy, Config, ConfigError, DestinationConfig, ExtractConfig,
    PreprocessConfig, RecognitionConfig,
};
pub use locator::{LocatorError, SheetLocator};
pub use record::{Currency, ReceiptRecord, RECEIPT_FLAG};
pub use schema::{column_index, column_letter, ColumnSchema, ColumnSegment, Field, SchemaError};
