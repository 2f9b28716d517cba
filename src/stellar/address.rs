//! Strkey-encoded account and contract identifiers.
//!
//! Parsing verifies the version byte and CRC16 checksum, so a value that
//! survives `parse` can be put into a transaction without further checks.

use std::fmt;
use std::str::FromStr;

use stellar_strkey::{ed25519, Contract};
use stellar_xdr::curr::{
    AccountId, ContractId as XdrContractId, Hash, MuxedAccount, PublicKey, ScAddress, Uint256,
};
use thiserror::Error;

/// Value shipped in sample configs before a contract has been deployed.
const PLACEHOLDER_CONTRACT_ID: &str = "YOUR_CONTRACT_ID";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("{0} is empty")]
    Empty(&'static str),

    #[error("contract id is not configured (placeholder '{0}')")]
    Placeholder(String),

    #[error("'{value}' is not a valid {kind} strkey")]
    Invalid { kind: &'static str, value: String },
}

/// An ed25519 account address (`G...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    pub fn parse(value: &str) -> Result<Self, AddressError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AddressError::Empty("account address"));
        }
        ed25519::PublicKey::from_string(value)
            .map(|pk| Self(pk.0))
            .map_err(|_| AddressError::Invalid {
                kind: "account",
                value: value.to_string(),
            })
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_muxed_account(&self) -> MuxedAccount {
        MuxedAccount::Ed25519(Uint256(self.0))
    }

    pub fn to_sc_address(&self) -> ScAddress {
        ScAddress::Account(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(self.0))))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&ed25519::PublicKey(self.0).to_string())
    }
}

impl FromStr for AccountAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A deployed contract identifier (`C...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractId([u8; 32]);

impl ContractId {
    pub fn parse(value: &str) -> Result<Self, AddressError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AddressError::Empty("contract id"));
        }
        if value == PLACEHOLDER_CONTRACT_ID {
            return Err(AddressError::Placeholder(value.to_string()));
        }
        Contract::from_string(value)
            .map(|c| Self(c.0))
            .map_err(|_| AddressError::Invalid {
                kind: "contract",
                value: value.to_string(),
            })
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_sc_address(&self) -> ScAddress {
        ScAddress::Contract(XdrContractId(Hash(self.0)))
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Contract(self.0).to_string())
    }
}

impl FromStr for ContractId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Render an `ScAddress` back to its strkey form.
pub fn sc_address_to_string(address: &ScAddress) -> Option<String> {
    match address {
        ScAddress::Account(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(bytes)))) => {
            Some(AccountAddress(*bytes).to_string())
        }
        ScAddress::Contract(XdrContractId(Hash(bytes))) => Some(ContractId(*bytes).to_string()),
        _ => None,
    }
}
