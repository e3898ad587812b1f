//! rispl_tests: cross-crate conformance tests.
//!
//! The tests live in `tests/`; this crate exists to give them a home with
//! the full pipeline as a dependency.
