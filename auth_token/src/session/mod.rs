mod admission;
mod cookie;
mod types;

pub use admission::AdmissionEngine;
pub use cookie::{extract_token, token_from_headers};
pub use types::{DenialReason, UserId, Verdict};
