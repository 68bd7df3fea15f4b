pub mod boundary;
pub mod chunker;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod features;
pub mod model;
pub mod registry;
pub mod rtp;
pub mod util;

pub use boundary::BoundaryDetectionEngine;
pub use chunker::DocumentChunker;
pub use error::{RtpError, RtpResult};
pub use registry::{DeduplicationRegistry, calculate_document_hash};
pub use rtp::RtpParser;
