//! Integration tests for the constraints projector

// Projection of edit parameters onto geometric constraints
mod projector_tests;
