//! Agent System
//!
//! - **File Upload Agent**: parses uploaded PDFs page by page and records them
//! - **Reply Agent**: answers questions about a document through the LLM layer
//! - **Citations**: page references pulled out of generated answers
//!
//! ```text
//! Upload ──► FileUploadAgent ──► Document (text with page markers)
//!                                    │
//! Question ─────────────────────────►│
//!                                    ▼
//!                               ReplyAgent ──► LLM ──► citations
//!                                    │
//!                                    ▼
//!                           ChatMessage (user + assistant)
//! ```

pub mod citations;
pub mod file_upload;
pub mod reply;

pub use citations::extract_citations;
pub use file_upload::FileUploadAgent;
pub use reply::{FallbackReason, Generation, ReplyAgent};
