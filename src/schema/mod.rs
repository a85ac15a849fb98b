//! Wire schema of the analysis entry points
//!
//! Request shapes for single and batch analysis, and the response payloads
//! returned to the transport layer.

mod request;
mod response;

pub use request::*;
pub use response::*;
