//! Integration tests for the term algebra
//!
//! These tests exercise terms through their public surface: evaluation,
//! compilation, substitution and the textual front-end.

// Evaluation and compiled gradients
mod compilation_tests;

// Substitution with constant folding
mod substitution_tests;
