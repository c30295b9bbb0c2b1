//! ERC-20 allowance and approve encoding

use ethers::abi::{AbiDecode, AbiEncode};
use ethers::contract::abigen;
use ethers::types::{Address, Bytes, U256};

use super::client::Ledger;
use crate::error::LedgerError;

abigen!(
    Erc20,
    r#"[
        function approve(address spender, uint256 amount) external returns (bool)
        function allowance(address owner, address spender) external view returns (uint256)
    ]"#
);

/// Calldata for `approve(spender, amount)`
pub fn approve_calldata(spender: Address, amount: U256) -> Bytes {
    ApproveCall { spender, amount }.encode().into()
}

/// Calldata for `allowance(owner, spender)`
pub fn allowance_calldata(owner: Address, spender: Address) -> Bytes {
    AllowanceCall { owner, spender }.encode().into()
}

/// Reads how much `spender` may move of `owner`'s `token` balance
pub async fn read_allowance(
    ledger: &dyn Ledger,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, LedgerError> {
    let raw = ledger.call_view(token, allowance_calldata(owner, spender)).await?;
    let decoded = AllowanceReturn::decode(raw.as_ref()).map_err(|e| LedgerError::Decode(e.to_string()))?;
    Ok(decoded.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_selector() {
        let data = approve_calldata(Address::repeat_byte(0x11), U256::MAX);
        assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[4 + 12..4 + 32], Address::repeat_byte(0x11).as_bytes());
        assert!(data[4 + 32..].iter().all(|b| *b == 0xff));
    }

    #[test]
    fn test_allowance_selector() {
        let data = allowance_calldata(Address::repeat_byte(1), Address::repeat_byte(2));
        assert_eq!(&data[..4], &[0xdd, 0x62, 0xed, 0x3e]);
        let call = AllowanceCall::decode(data.as_ref()).unwrap();
        assert_eq!(call.owner, Address::repeat_byte(1));
        assert_eq!(call.spender, Address::repeat_byte(2));
    }

    #[test]
    fn test_revocation_encodes_zero_amount() {
        let data = approve_calldata(Address::repeat_byte(3), U256::zero());
        let call = ApproveCall::decode(data.as_ref()).unwrap();
        assert!(call.amount.is_zero());
    }
}
