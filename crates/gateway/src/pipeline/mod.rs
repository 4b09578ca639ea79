//! The AI-augmented record pipeline shared by the chat, summary and
//! insight endpoints.
//!
//! Each request walks the same stages, in order:
//!
//! 1. [`session`] resolves the caller from the request credentials.
//! 2. [`context`] fetches persisted records that ground the prompt.
//! 3. [`generate`] assembles the prompt and obtains one completion.
//! 4. [`interpret`] turns the completion into text or a JSON value.
//! 5. [`persist`] writes the result back next to its source record.
//!
//! Any stage failure ends the request with an [`error::ApiError`]. Earlier
//! writes are not rolled back.

pub mod context;
pub mod error;
pub mod generate;
pub mod interpret;
pub mod persist;
pub mod session;

pub use error::ApiError;
pub use generate::{Generator, OutputMode};
pub use session::Session;
