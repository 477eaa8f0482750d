pub mod metadata;
pub mod pipeline;
