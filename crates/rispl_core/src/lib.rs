//! rispl_core: shared source-location plumbing.
//!
//! Spans and line maps used by every stage of the pipeline to report where
//! tokens, AST nodes, and diagnostics originate.

pub mod text;

pub use text::{LineAndColumn, LineMap, TextPos, TextSpan};
