//! Thin request/response wrappers around the two third-party APIs.
//!
//! Both clients degrade on failure instead of propagating errors: the swap
//! client falls back to a fixed coin list or `None`, the LLM client to an
//! empty match list or a zero-confidence ruling.

pub mod openai;
pub mod sideshift;

pub use openai::OpenAiClient;
pub use sideshift::SideShiftClient;
