pub mod cache;
pub mod dataset;
pub mod etl;
pub mod export;
pub mod fetchers;
pub mod pipeline;
pub mod processors;

pub use crate::domain::ports::{Pipeline, RawResponses, Storage};
pub use crate::utils::error::Result;
