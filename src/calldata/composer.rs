//! Calldata Composer
//!
//! Combines the base action payload with a signature. Pure and
//! deterministic: no network or state access.

use ethers::types::Bytes;
use serde::Deserialize;

/// Where the signature goes relative to the base payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignaturePosition {
    /// `base || signature`
    #[default]
    Append,
    /// `signature || base`
    Prepend,
    /// Reserved for overwriting a parameter slot. No slot can be configured
    /// here, so the base payload is returned unchanged; use
    /// `patch_parameter` to overwrite a specific word.
    Replace,
}

/// Builds the final action payload
///
/// # Arguments
/// * `base` - Encoded function call
/// * `signature` - Raw signature bytes from a provider
/// * `position` - Placement of the signature
pub fn compose(base: &[u8], signature: &[u8], position: SignaturePosition) -> Bytes {
    let mut out = Vec::with_capacity(base.len() + signature.len());
    match position {
        SignaturePosition::Append => {
            out.extend_from_slice(base);
            out.extend_from_slice(signature);
        }
        SignaturePosition::Prepend => {
            out.extend_from_slice(signature);
            out.extend_from_slice(base);
        }
        SignaturePosition::Replace => out.extend_from_slice(base),
    }
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: [u8; 8] = [0xa9, 0x05, 0x9c, 0xbb, 0, 0, 0, 1];
    const SIG: [u8; 3] = [0xde, 0xad, 0x01];

    #[test]
    fn test_append_puts_signature_last() {
        let out = compose(&BASE, &SIG, SignaturePosition::Append);
        assert_eq!(out.len(), BASE.len() + SIG.len());
        assert_eq!(&out[..BASE.len()], &BASE);
        assert_eq!(&out[BASE.len()..], &SIG);
    }

    #[test]
    fn test_prepend_mirrors_append() {
        let out = compose(&BASE, &SIG, SignaturePosition::Prepend);
        assert_eq!(&out[..SIG.len()], &SIG);
        assert_eq!(&out[SIG.len()..], &BASE);
    }

    #[test]
    fn test_replace_without_slot_is_noop() {
        let out = compose(&BASE, &SIG, SignaturePosition::Replace);
        assert_eq!(out.as_ref(), &BASE);
    }

    #[test]
    fn test_compose_is_deterministic() {
        for position in [SignaturePosition::Append, SignaturePosition::Prepend, SignaturePosition::Replace] {
            assert_eq!(compose(&BASE, &SIG, position), compose(&BASE, &SIG, position));
        }
    }

    #[test]
    fn test_position_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            position: SignaturePosition,
        }
        let parsed: Wrapper = toml::from_str("position = \"prepend\"").unwrap();
        assert_eq!(parsed.position, SignaturePosition::Prepend);
        assert!(toml::from_str::<Wrapper>("position = \"middle\"").is_err());
        assert_eq!(SignaturePosition::default(), SignaturePosition::Append);
    }
}
