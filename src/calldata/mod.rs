//! Calldata Module
//!
//! Byte-level handling of the action payload:
//! - Composition with an externally obtained signature
//! - ABI parameter patching applied to the payload before a batch starts

mod composer;
mod params;

pub use composer::{compose, SignaturePosition};
pub use params::{decode_payload, last_nonzero_parameter, parameter, parameter_count, patch_parameter, CalldataError};
