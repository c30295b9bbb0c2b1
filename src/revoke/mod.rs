//! Revocation Module
//!
//! Resets every identity's authorization for the target contract to zero
//! and confirms the reset after a settling delay.

mod flow;


pub use flow::{RevocationFlow, RevocationReport, RevocationResult};
