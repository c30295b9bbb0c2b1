//! Signature Provider Module
//!
//! Supplies the externally obtained signature that is composed into each
//! identity's action payload. Providers are selected from configuration:
//! - Static: one fixed value for every identity
//! - Http: one request per identity to a remote signing service
//! - Custom: a signer function registered by the embedding program
//!
//! Every failure surfaces as `SignatureError`, which the batch engine
//! reports as a signature fetch failure without consuming retry attempts.

mod custom;
mod provider;
mod remote;


pub use custom::{CustomSignatureProvider, SignerFn, SignerRegistry};
pub use provider::{
    create_provider, decode_signature, SignatureKind, SignatureParams, SignatureProvider,
    StaticSignatureProvider, BATCH_SIGNATURE_CONCURRENCY,
};
pub use remote::{extract_signature, HttpMethod, RemoteSignatureProvider, SIGNATURE_FIELDS};
