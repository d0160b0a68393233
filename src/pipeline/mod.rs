//! The review, aggregate, implement pipeline.
//!
//! - **Fanout**: reviewers run concurrently on the same content
//! - **Summarize**: reviewer feedback is consolidated into one document
//! - **Implement**: the implementer turns that document into new content
//! - **Controller**: owns a file's run from read to atomic write
//! - **Report**: verbose stage output, final summary and JSON report

mod controller;
mod fanout;
mod implement;
pub mod report;
mod summarize;
pub mod types;


pub use controller::PipelineController;
