// Feature encoding and example wire format
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
