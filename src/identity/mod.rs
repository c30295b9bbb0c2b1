//! Identity Module
//!
//! Derives the batch's signing identities from a master mnemonic.

mod generator;

pub use generator::{derive_identities, IdentityError, DERIVATION_PREFIX};
