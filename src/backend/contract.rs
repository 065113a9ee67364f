//! Inheritance contract binding.

use super::{
    abi::{
        as_address, as_bool, as_uint, decode_single, encode_call, AbiError, Address, DynSolType,
        DynSolValue, U256,
    },
    error::Error,
    wallet::{TransactionRequest, WalletProvider, WalletProviderExt},
};

/// Canonical function signatures of the contract.
pub mod signatures {
    pub const OWNER: &str = "owner()";
    pub const IS_DECEASED: &str = "isDeceased()";
    pub const HEARTBEAT_INTERVAL: &str = "heartbeatInterval()";
    pub const LAST_CHECK_IN: &str = "lastCheckIn()";
    pub const GET_BENEFICIARIES: &str = "getBeneficiaries()";

    pub const CHECK_IN: &str = "checkIn()";
    pub const DECLARE_DECEASED: &str = "declareDeceased()";
    pub const ADD_BENEFICIARY: &str = "addBeneficiary(address,uint256)";
    pub const REMOVE_BENEFICIARY: &str = "removeBeneficiary(address)";
    pub const UPDATE_BENEFICIARY_SHARE: &str = "updateBeneficiaryShare(address,uint256)";
    pub const SET_HEARTBEAT_INTERVAL: &str = "setHeartbeatInterval(uint256)";
    pub const DISTRIBUTE_ERC20: &str = "distributeERC20(address)";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beneficiary {
    pub wallet: Address,
    /// Share in percent
    pub share: U256,
}

impl Beneficiary {
    /// ABI type of one entry, the `(address,uint256)` tuple.
    pub fn sol_type() -> DynSolType {
        DynSolType::Tuple(vec![DynSolType::Address, DynSolType::Uint(256)])
    }

    pub fn to_sol_value(&self) -> DynSolValue {
        DynSolValue::Tuple(vec![
            DynSolValue::Address(self.wallet),
            DynSolValue::Uint(self.share, 256),
        ])
    }

    fn from_sol_value(value: &DynSolValue) -> Result<Self, AbiError> {
        match value.as_tuple() {
            Some([wallet, share]) => Ok(Beneficiary {
                wallet: as_address(wallet)?,
                share: as_uint(share)?,
            }),
            _ => Err(AbiError::unexpected("an (address,uint256) tuple", value)),
        }
    }
}

/// Decodes the return data of `getBeneficiaries()`, a dynamic
/// `(address,uint256)[]`, keeping the contract order.
pub fn decode_beneficiaries(data: &[u8]) -> Result<Vec<Beneficiary>, AbiError> {
    let list = decode_single(DynSolType::Array(Box::new(Beneficiary::sol_type())), data)?;
    list.as_array()
        .ok_or_else(|| AbiError::unexpected("an array", &list))?
        .iter()
        .map(Beneficiary::from_sol_value)
        .collect()
}

/// State-mutating calls of the contract.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractCall {
    CheckIn,
    DeclareDeceased,
    AddBeneficiary { wallet: Address, share: U256 },
    RemoveBeneficiary { wallet: Address },
    UpdateBeneficiaryShare { wallet: Address, share: U256 },
    SetHeartbeatInterval { seconds: U256 },
    DistributeErc20 { token: Address },
    /// Plain value transfer to the contract
    Deposit { amount: U256 },
}

impl ContractCall {
    pub fn calldata(&self) -> Vec<u8> {
        use signatures::*;

        match self {
            ContractCall::CheckIn => encode_call(CHECK_IN, vec![]),
            ContractCall::DeclareDeceased => encode_call(DECLARE_DECEASED, vec![]),
            ContractCall::AddBeneficiary { wallet, share } => encode_call(
                ADD_BENEFICIARY,
                vec![DynSolValue::Address(*wallet), DynSolValue::Uint(*share, 256)],
            ),
            ContractCall::RemoveBeneficiary { wallet } => {
                encode_call(REMOVE_BENEFICIARY, vec![DynSolValue::Address(*wallet)])
            }
            ContractCall::UpdateBeneficiaryShare { wallet, share } => encode_call(
                UPDATE_BENEFICIARY_SHARE,
                vec![DynSolValue::Address(*wallet), DynSolValue::Uint(*share, 256)],
            ),
            ContractCall::SetHeartbeatInterval { seconds } => {
                encode_call(SET_HEARTBEAT_INTERVAL, vec![DynSolValue::Uint(*seconds, 256)])
            }
            ContractCall::DistributeErc20 { token } => {
                encode_call(DISTRIBUTE_ERC20, vec![DynSolValue::Address(*token)])
            }
            ContractCall::Deposit { .. } => Vec::new(),
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            ContractCall::Deposit { amount } => *amount,
            _ => U256::ZERO,
        }
    }
}

/// Contract at a fixed address, accessed through a wallet provider.
pub struct InheritanceContract<'p> {
    provider: &'p dyn WalletProvider,
    address: Address,
}

impl<'p> InheritanceContract<'p> {
    pub fn new(provider: &'p dyn WalletProvider, address: Address) -> Self {
        InheritanceContract { provider, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Whether any bytecode is deployed at the contract address.
    pub async fn has_code(&self) -> Result<bool, Error> {
        Ok(!self.provider.get_code(self.address).await?.is_empty())
    }

    async fn read(&self, signature: &str) -> Result<Vec<u8>, Error> {
        Ok(self
            .provider
            .call(self.address, encode_call(signature, vec![]))
            .await?)
    }

    async fn read_single(&self, signature: &str, ty: DynSolType) -> Result<DynSolValue, Error> {
        Ok(decode_single(ty, &self.read(signature).await?)?)
    }

    pub async fn owner(&self) -> Result<Address, Error> {
        let value = self.read_single(signatures::OWNER, DynSolType::Address).await?;
        Ok(as_address(&value)?)
    }

    pub async fn is_deceased(&self) -> Result<bool, Error> {
        let value = self.read_single(signatures::IS_DECEASED, DynSolType::Bool).await?;
        Ok(as_bool(&value)?)
    }

    pub async fn heartbeat_interval(&self) -> Result<U256, Error> {
        let value = self
            .read_single(signatures::HEARTBEAT_INTERVAL, DynSolType::Uint(256))
            .await?;
        Ok(as_uint(&value)?)
    }

    pub async fn last_check_in(&self) -> Result<U256, Error> {
        let value = self
            .read_single(signatures::LAST_CHECK_IN, DynSolType::Uint(256))
            .await?;
        Ok(as_uint(&value)?)
    }

    pub async fn beneficiaries(&self) -> Result<Vec<Beneficiary>, Error> {
        Ok(decode_beneficiaries(
            &self.read(signatures::GET_BENEFICIARIES).await?,
        )?)
    }

    pub fn transaction(&self, call: &ContractCall, from: Address) -> TransactionRequest {
        TransactionRequest {
            from: Some(from),
            to: self.address,
            value: call.value(),
            data: call.calldata(),
        }
    }
}
