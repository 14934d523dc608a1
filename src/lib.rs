pub mod api;
pub mod config;
pub mod id_card_processor;
pub mod models;
pub mod processing;
pub mod utils;

pub use id_card_processor::{IdCardProcessor, ProcessorSettings};
pub use models::ExtractionResult;
pub use utils::IdCardError;
