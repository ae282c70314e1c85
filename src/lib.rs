//! Metadata harvester for arXiv (OAI-PMH `ListRecords`) and INSPIRE-HEP.

pub mod config;
pub mod error;
pub mod format;
pub mod harvester;
pub mod inspire;
pub mod logging;
pub mod model;
pub mod parser;
pub mod storage;
pub mod transport;

pub use error::{Error, Result};
