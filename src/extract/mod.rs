//! Extraction pipeline: document location, tree walk, codec join, column
//! resolution, threshold estimation, plot assembly and aggregation.

mod aggregate;
mod assemble;
mod codec;
mod document;
mod error;
mod pipeline;
mod resolver;
mod thresholds;
mod walker;

pub use aggregate::*;
pub use assemble::*;
pub use codec::*;
pub use document::*;
pub use error::{ExtractError, Result};
pub use pipeline::*;
pub use resolver::*;
pub use thresholds::*;
pub use walker::*;
