//! Ethereum primitives and contract ABI encoding.
//!
//! Addresses, integers and hashing come from `alloy-primitives`; call data
//! and return data go through the dynamic ABI codec of `alloy-dyn-abi`.

pub use alloy_dyn_abi::{DynSolType, DynSolValue};
pub use alloy_primitives::{keccak256, Address, Bytes, TxHash, U256};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("malformed return data: {0}")]
    Decode(String),
    #[error("expected {expected} in return data, got {actual}")]
    UnexpectedValue {
        expected: &'static str,
        actual: String,
    },
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
}

impl From<alloy_dyn_abi::Error> for AbiError {
    fn from(value: alloy_dyn_abi::Error) -> Self {
        AbiError::Decode(value.to_string())
    }
}

impl AbiError {
    pub(crate) fn unexpected(expected: &'static str, actual: &DynSolValue) -> Self {
        AbiError::UnexpectedValue {
            expected,
            actual: format!("{actual:?}"),
        }
    }
}

/// Four bytes function selector of a canonical signature such as
/// `addBeneficiary(address,uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for a function: selector followed by the encoded arguments.
pub fn encode_call(signature: &str, args: Vec<DynSolValue>) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend(DynSolValue::Tuple(args).abi_encode_params());
    data
}

/// Decodes a parameter list (return data, or arguments past the selector).
pub fn decode_params(types: Vec<DynSolType>, data: &[u8]) -> Result<Vec<DynSolValue>, AbiError> {
    match DynSolType::Tuple(types).abi_decode_params(data)? {
        DynSolValue::Tuple(values) => Ok(values),
        other => Err(AbiError::unexpected("a parameter list", &other)),
    }
}

/// Decodes return data made of a single value of type `ty`.
pub fn decode_single(ty: DynSolType, data: &[u8]) -> Result<DynSolValue, AbiError> {
    decode_params(vec![ty], data)?
        .pop()
        .ok_or_else(|| AbiError::Decode("empty parameter list".to_owned()))
}

pub fn as_address(value: &DynSolValue) -> Result<Address, AbiError> {
    value
        .as_address()
        .ok_or_else(|| AbiError::unexpected("an address", value))
}

pub fn as_uint(value: &DynSolValue) -> Result<U256, AbiError> {
    value
        .as_uint()
        .map(|(uint, _)| uint)
        .ok_or_else(|| AbiError::unexpected("an unsigned integer", value))
}

pub fn as_bool(value: &DynSolValue) -> Result<bool, AbiError> {
    value
        .as_bool()
        .ok_or_else(|| AbiError::unexpected("a boolean", value))
}

/// Parses a JSON-RPC quantity, or a decimal string, into a `u64`.
pub fn parse_u64(s: &str) -> Result<u64, AbiError> {
    s.to_lowercase()
        .parse::<U256>()
        .ok()
        .and_then(|value| u64::try_from(value).ok())
        .ok_or_else(|| AbiError::InvalidNumber(s.to_owned()))
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn erc20_transfer_selector() {
        assert_eq!(selector("transfer(address,uint256)"), hex!("a9059cbb"));
    }

    #[test]
    fn addresses_display_checksummed_and_parse_any_case() {
        let lower: Address = "0x0a3d1643a50ef6ac192f359cd5a6c08bf444977c".parse().unwrap();
        let upper: Address = "0x0A3D1643A50EF6AC192F359CD5A6C08BF444977C".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_string(), "0x0a3d1643A50EF6AC192F359cD5A6c08Bf444977C");

        assert!("0x0a3d".parse::<Address>().is_err());
        assert!("".parse::<Address>().is_err());
    }

    #[test]
    fn parses_chain_quantities() {
        assert_eq!(parse_u64("0xaa36a7").unwrap(), 11_155_111);
        assert_eq!(parse_u64("0xAA36A7").unwrap(), 11_155_111);
        assert!(parse_u64("0x").is_err());
        assert!(parse_u64("0x10000000000000000").is_err());
    }

    #[test]
    fn encodes_static_arguments() {
        let wallet = Address::repeat_byte(0xab);
        let data = encode_call(
            "addBeneficiary(address,uint256)",
            vec![
                DynSolValue::Address(wallet),
                DynSolValue::Uint(U256::from(10), 256),
            ],
        );

        assert_eq!(data.len(), 4 + 2 * 32);
        assert_eq!(&data[..4], &selector("addBeneficiary(address,uint256)"));

        let args = decode_params(vec![DynSolType::Address, DynSolType::Uint(256)], &data[4..])
            .unwrap();
        assert_eq!(as_address(&args[0]).unwrap(), wallet);
        assert_eq!(as_uint(&args[1]).unwrap(), U256::from(10));
    }

    #[test]
    fn wrong_value_kind_is_an_error() {
        let data = DynSolValue::Tuple(vec![DynSolValue::Bool(true)]).abi_encode_params();
        let value = decode_single(DynSolType::Bool, &data).unwrap();
        assert!(as_bool(&value).unwrap());
        assert!(matches!(
            as_address(&value),
            Err(AbiError::UnexpectedValue { .. })
        ));
    }

    #[test]
    fn short_return_data_is_an_error() {
        assert!(matches!(
            decode_single(DynSolType::Uint(256), &[0u8; 16]),
            Err(AbiError::Decode(_))
        ));
    }
}
