//! Native representation of Soroban contract values.
//!
//! `ContractValue` covers the subset of `ScVal` a contract client meets in
//! practice. Conversion in both directions is lossless for that subset, so a
//! value decoded from execution metadata re-encodes to the same XDR.

use std::fmt;

use stellar_xdr::curr::{
    Int128Parts, Limits, ReadXdr, ScBytes, ScMap, ScMapEntry, ScString, ScSymbol, ScVal, ScVec,
    StringM, UInt128Parts, VecM, WriteXdr,
};
use thiserror::Error;

use crate::stellar::address::{sc_address_to_string, AccountAddress, AddressError, ContractId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("unsupported contract value type: {0}")]
    Unsupported(&'static str),

    #[error("invalid contract value: {0}")]
    Invalid(String),

    #[error("XDR error: {0}")]
    Xdr(String),

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// A decoded contract argument or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractValue {
    Void,
    Bool(bool),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    U128(u128),
    I128(i128),
    Symbol(String),
    String(String),
    Bytes(Vec<u8>),
    /// Account (`G...`) or contract (`C...`) strkey.
    Address(String),
    Vec(Vec<ContractValue>),
    Map(Vec<(ContractValue, ContractValue)>),
}

impl ContractValue {
    /// Build an address argument, accepting either an account or a contract strkey.
    pub fn address(value: &str) -> Result<Self, ValueError> {
        match AccountAddress::parse(value) {
            Ok(account) => Ok(Self::Address(account.to_string())),
            Err(account_err) => match ContractId::parse(value) {
                Ok(contract) => Ok(Self::Address(contract.to_string())),
                Err(_) => Err(account_err.into()),
            },
        }
    }

    pub fn symbol(value: &str) -> Self {
        Self::Symbol(value.to_string())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn to_sc_val(&self) -> Result<ScVal, ValueError> {
        ScVal::try_from(self)
    }

    /// Decode a base64 `ScVal`.
    pub fn from_xdr_base64(encoded: &str) -> Result<Self, ValueError> {
        let val = ScVal::from_xdr_base64(encoded, Limits::none())
            .map_err(|e| ValueError::Xdr(e.to_string()))?;
        Self::try_from(&val)
    }

    /// Encode as a base64 `ScVal`.
    pub fn to_xdr_base64(&self) -> Result<String, ValueError> {
        self.to_sc_val()?
            .to_xdr_base64(Limits::none())
            .map_err(|e| ValueError::Xdr(e.to_string()))
    }
}

impl fmt::Display for ContractValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::I32(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::U128(v) => write!(f, "{}", v),
            Self::I128(v) => write!(f, "{}", v),
            Self::Symbol(v) => write!(f, ":{}", v),
            Self::String(v) => write!(f, "{:?}", v),
            Self::Bytes(v) => {
                f.write_str("0x")?;
                v.iter().try_for_each(|b| write!(f, "{:02x}", b))
            }
            Self::Address(v) => f.write_str(v),
            Self::Vec(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for ContractValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u32> for ContractValue {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<i64> for ContractValue {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<AccountAddress> for ContractValue {
    fn from(v: AccountAddress) -> Self {
        Self::Address(v.to_string())
    }
}

fn string_m<const MAX: u32>(value: &str) -> Result<StringM<MAX>, ValueError> {
    StringM::try_from(value.as_bytes().to_vec())
        .map_err(|_| ValueError::Invalid(format!("'{}' exceeds {} bytes", value, MAX)))
}

fn utf8<const MAX: u32>(value: &StringM<MAX>) -> Result<String, ValueError> {
    value
        .to_utf8_string()
        .map_err(|e| ValueError::Invalid(format!("non UTF-8 string: {}", e)))
}

impl TryFrom<&ContractValue> for ScVal {
    type Error = ValueError;

    fn try_from(value: &ContractValue) -> Result<Self, ValueError> {
        Ok(match value {
            ContractValue::Void => ScVal::Void,
            ContractValue::Bool(v) => ScVal::Bool(*v),
            ContractValue::U32(v) => ScVal::U32(*v),
            ContractValue::I32(v) => ScVal::I32(*v),
            ContractValue::U64(v) => ScVal::U64(*v),
            ContractValue::I64(v) => ScVal::I64(*v),
            ContractValue::U128(v) => ScVal::U128(UInt128Parts {
                hi: (*v >> 64) as u64,
                lo: *v as u64,
            }),
            ContractValue::I128(v) => ScVal::I128(Int128Parts {
                hi: (*v >> 64) as i64,
                lo: *v as u64,
            }),
            ContractValue::Symbol(v) => ScVal::Symbol(ScSymbol(string_m(v)?)),
            ContractValue::String(v) => ScVal::String(ScString(string_m(v)?)),
            ContractValue::Bytes(v) => ScVal::Bytes(ScBytes(
                v.clone()
                    .try_into()
                    .map_err(|_| ValueError::Invalid("byte string too long".to_string()))?,
            )),
            ContractValue::Address(v) => {
                let address = match AccountAddress::parse(v) {
                    Ok(account) => account.to_sc_address(),
                    Err(e) => ContractId::parse(v).map_err(|_| e)?.to_sc_address(),
                };
                ScVal::Address(address)
            }
            ContractValue::Vec(items) => {
                let vals = items
                    .iter()
                    .map(ScVal::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                let vec: VecM<ScVal> = vals
                    .try_into()
                    .map_err(|_| ValueError::Invalid("vector too long".to_string()))?;
                ScVal::Vec(Some(ScVec(vec)))
            }
            ContractValue::Map(entries) => {
                let entries = entries
                    .iter()
                    .map(|(k, v)| {
                        Ok(ScMapEntry {
                            key: ScVal::try_from(k)?,
                            val: ScVal::try_from(v)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ValueError>>()?;
                let map: VecM<ScMapEntry> = entries
                    .try_into()
                    .map_err(|_| ValueError::Invalid("map too long".to_string()))?;
                ScVal::Map(Some(ScMap(map)))
            }
        })
    }
}

impl TryFrom<&ScVal> for ContractValue {
    type Error = ValueError;

    fn try_from(value: &ScVal) -> Result<Self, Self::Error> {
        Ok(match value {
            ScVal::Void => ContractValue::Void,
            ScVal::Bool(v) => ContractValue::Bool(*v),
            ScVal::U32(v) => ContractValue::U32(*v),
            ScVal::I32(v) => ContractValue::I32(*v),
            ScVal::U64(v) => ContractValue::U64(*v),
            ScVal::I64(v) => ContractValue::I64(*v),
            ScVal::U128(parts) => {
                ContractValue::U128((u128::from(parts.hi) << 64) | u128::from(parts.lo))
            }
            ScVal::I128(parts) => {
                ContractValue::I128((i128::from(parts.hi) << 64) | i128::from(parts.lo))
            }
            ScVal::Symbol(ScSymbol(s)) => ContractValue::Symbol(utf8(s)?),
            ScVal::String(ScString(s)) => ContractValue::String(utf8(s)?),
            ScVal::Bytes(ScBytes(b)) => ContractValue::Bytes(b.to_vec()),
            ScVal::Address(address) => ContractValue::Address(
                sc_address_to_string(address).ok_or(ValueError::Unsupported("address kind"))?,
            ),
            ScVal::Vec(None) => ContractValue::Vec(Vec::new()),
            ScVal::Vec(Some(ScVec(items))) => ContractValue::Vec(
                items
                    .iter()
                    .map(ContractValue::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            ScVal::Map(None) => ContractValue::Map(Vec::new()),
            ScVal::Map(Some(ScMap(entries))) => ContractValue::Map(
                entries
                    .iter()
                    .map(|e| Ok((ContractValue::try_from(&e.key)?, ContractValue::try_from(&e.val)?)))
                    .collect::<Result<_, ValueError>>()?,
            ),
            ScVal::Error(_) => return Err(ValueError::Unsupported("error")),
            ScVal::Timepoint(_) => return Err(ValueError::Unsupported("timepoint")),
            ScVal::Duration(_) => return Err(ValueError::Unsupported("duration")),
            ScVal::U256(_) => return Err(ValueError::Unsupported("u256")),
            ScVal::I256(_) => return Err(ValueError::Unsupported("i256")),
            _ => return Err(ValueError::Unsupported("ledger value")),
        })
    }
}
