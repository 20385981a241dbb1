//! Pipeline stages for wine-label analysis.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! with a scripted [`client::ModelClient`].
//!
//! ## Data Flow
//!
//! ```text
//! prepare ──▶ extract ──▶ enrich
//! (JPEG/b64)  (Pass A)    (Pass B, optional)
//!               │            │
//!               └─ client ◀──┘   sanitize runs on every reply
//! ```
//!
//! 1. [`prepare`]: decode, downscale and base64-encode the photo
//! 2. [`client`]: one model call; the only stage with network I/O
//! 3. [`sanitize`]: strip code fences and recover the JSON object
//! 4. [`extract`]: label-grounded fields from the image
//! 5. [`enrich`]: inferred context from the extracted record

pub mod client;
pub mod enrich;
pub mod extract;
pub mod prepare;
pub mod sanitize;
