//! Aegis Request Pipeline
//!
//! Sequences the stages of a guarded completion request:
//!
//! 1. Sensitive-value detection
//! 2. Redaction into the request's token context
//! 3. Prompt optimization (over the redacted prompt only)
//! 4. Complexity analysis
//! 5. Model routing
//! 6. Cache lookup
//! 7. Provider call on miss, then cache store
//! 8. Token restoration on the response text
//! 9. Asynchronous audit submission
//! 10. Result assembly
//!
//! The prompt handed to the provider is always the redacted one; no
//! original sensitive value leaves the process.

mod pipeline;
mod result;

pub use pipeline::RequestPipeline;
pub use result::{GatewayRequest, ProcessingResult};
