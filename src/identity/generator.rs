use ethers::signers::coins_bip39::English;
use ethers::signers::{MnemonicBuilder, WalletError};
use thiserror::Error;
use tracing::debug;

use crate::types::Identity;

/// BIP-44 account path; identity `i` lives at `{DERIVATION_PREFIX}{i}`
pub const DERIVATION_PREFIX: &str = "m/44'/60'/0'/0/";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to derive identity {index}: {source}")]
    Derivation {
        index: usize,
        #[source]
        source: WalletError,
    },
}

/// Derives `count` identities from `mnemonic`
///
/// Identity `i` is the key at `m/44'/60'/0'/0/i`, so the same phrase always
/// yields the same addresses in the same order.
pub fn derive_identities(mnemonic: &str, count: usize) -> Result<Vec<Identity>, IdentityError> {
    (0..count)
        .map(|index| {
            let wallet = MnemonicBuilder::<English>::default()
                .phrase(mnemonic)
                .derivation_path(&format!("{}{}", DERIVATION_PREFIX, index))
                .and_then(|builder| builder.build())
                .map_err(|source| IdentityError::Derivation { index, source })?;
            let identity = Identity::new(index, wallet);
            debug!("Derived identity {}: {:?}", index, identity.address);
            Ok(identity)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;

    const PHRASE: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_derives_well_known_accounts() {
        let identities = derive_identities(PHRASE, 3).unwrap();

        let expected: Vec<Address> = [
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
            "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC",
        ]
        .iter()
        .map(|a| a.parse().unwrap())
        .collect();

        assert_eq!(identities.iter().map(|i| i.address).collect::<Vec<_>>(), expected);
        assert_eq!(identities.iter().map(|i| i.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_count() {
        assert!(derive_identities(PHRASE, 0).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_phrase_is_rejected() {
        let err = derive_identities("not a valid mnemonic", 1).unwrap_err();
        assert!(matches!(err, IdentityError::Derivation { index: 0, .. }));
    }
}
