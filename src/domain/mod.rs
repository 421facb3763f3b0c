// Analytics value types (snapshots, z-grid, warm-up state, stream messages)
pub mod analytics;

// Market data domain
pub mod market;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Bar validation
pub mod validation;

// Domain-specific error types
pub mod errors;
