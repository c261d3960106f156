//! Bidirectional mapping between native values and `ScVal`.
//!
//! Encoding is type-directed: every argument carries a [`WireType`] and the
//! value must fit it exactly (no silent truncation or sign flips). Decoding
//! is total over the supported `ScVal` shapes and never drops map entries.

use super::address::Address;
use crate::{ClientError, Result};
use serde_json::Value as JsonValue;
use std::fmt;
use stellar_xdr::curr::{
    Int128Parts, ScBytes, ScMap, ScMapEntry, ScString, ScSymbol, ScVal, ScVec, StringM,
    UInt128Parts, VecM,
};

/// Declared wire type of a contract argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireType {
    Bool,
    U32,
    I32,
    U64,
    I64,
    U128,
    I128,
    String,
    Symbol,
    Bytes,
    Address,
    Vec(Box<WireType>),
    Map(Box<WireType>, Box<WireType>),
    Option(Box<WireType>),
    Tuple(Vec<WireType>),
}

impl WireType {
    pub fn vec(inner: WireType) -> Self {
        WireType::Vec(Box::new(inner))
    }

    pub fn map(key: WireType, value: WireType) -> Self {
        WireType::Map(Box::new(key), Box::new(value))
    }

    pub fn option(inner: WireType) -> Self {
        WireType::Option(Box::new(inner))
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireType::Bool => write!(f, "bool"),
            WireType::U32 => write!(f, "u32"),
            WireType::I32 => write!(f, "i32"),
            WireType::U64 => write!(f, "u64"),
            WireType::I64 => write!(f, "i64"),
            WireType::U128 => write!(f, "u128"),
            WireType::I128 => write!(f, "i128"),
            WireType::String => write!(f, "string"),
            WireType::Symbol => write!(f, "symbol"),
            WireType::Bytes => write!(f, "bytes"),
            WireType::Address => write!(f, "address"),
            WireType::Vec(inner) => write!(f, "Vec<{}>", inner),
            WireType::Map(k, v) => write!(f, "Map<{}, {}>", k, v),
            WireType::Option(inner) => write!(f, "Option<{}>", inner),
            WireType::Tuple(items) => {
                let items: Vec<String> = items.iter().map(|t| t.to_string()).collect();
                write!(f, "Tuple<{}>", items.join(", "))
            }
        }
    }
}

/// A native value on either side of the codec.
///
/// Maps are kept as ordered key/value pairs so that every entry survives a
/// decode, including ones whose keys compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeValue {
    Void,
    Bool(bool),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    U128(u128),
    I128(i128),
    String(String),
    Symbol(String),
    Bytes(Vec<u8>),
    Address(Address),
    Vec(Vec<NativeValue>),
    Map(Vec<(NativeValue, NativeValue)>),
}

impl NativeValue {
    fn kind(&self) -> &'static str {
        match self {
            NativeValue::Void => "void",
            NativeValue::Bool(_) => "bool",
            NativeValue::U32(_) => "u32",
            NativeValue::I32(_) => "i32",
            NativeValue::U64(_) => "u64",
            NativeValue::I64(_) => "i64",
            NativeValue::U128(_) => "u128",
            NativeValue::I128(_) => "i128",
            NativeValue::String(_) => "string",
            NativeValue::Symbol(_) => "symbol",
            NativeValue::Bytes(_) => "bytes",
            NativeValue::Address(_) => "address",
            NativeValue::Vec(_) => "vec",
            NativeValue::Map(_) => "map",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, NativeValue::Void)
    }

    /// Any integer variant widened to `i128`; `None` for non-integers and
    /// for `u128` values above `i128::MAX`.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            NativeValue::U32(v) => Some(v.into()),
            NativeValue::I32(v) => Some(v.into()),
            NativeValue::U64(v) => Some(v.into()),
            NativeValue::I64(v) => Some(v.into()),
            NativeValue::U128(v) => i128::try_from(v).ok(),
            NativeValue::I128(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) | NativeValue::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match self {
            NativeValue::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_vec(&self) -> Option<&[NativeValue]> {
        match self {
            NativeValue::Vec(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(NativeValue, NativeValue)]> {
        match self {
            NativeValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// JSON rendering for CLI output. Integers wider than 64 bits are
    /// rendered as strings.
    pub fn to_json(&self) -> JsonValue {
        match self {
            NativeValue::Void => JsonValue::Null,
            NativeValue::Bool(b) => JsonValue::Bool(*b),
            NativeValue::U32(v) => (*v).into(),
            NativeValue::I32(v) => (*v).into(),
            NativeValue::U64(v) => (*v).into(),
            NativeValue::I64(v) => (*v).into(),
            NativeValue::U128(v) => JsonValue::String(v.to_string()),
            NativeValue::I128(v) => JsonValue::String(v.to_string()),
            NativeValue::String(s) | NativeValue::Symbol(s) => JsonValue::String(s.clone()),
            NativeValue::Bytes(b) => JsonValue::String(hex::encode(b)),
            NativeValue::Address(a) => JsonValue::String(a.to_string()),
            NativeValue::Vec(items) => JsonValue::Array(items.iter().map(|v| v.to_json()).collect()),
            NativeValue::Map(entries) => JsonValue::Array(
                entries
                    .iter()
                    .map(|(k, v)| serde_json::json!({ "key": k.to_json(), "value": v.to_json() }))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        NativeValue::Bool(v)
    }
}

impl From<u32> for NativeValue {
    fn from(v: u32) -> Self {
        NativeValue::U32(v)
    }
}

impl From<u64> for NativeValue {
    fn from(v: u64) -> Self {
        NativeValue::U64(v)
    }
}

impl From<i128> for NativeValue {
    fn from(v: i128) -> Self {
        NativeValue::I128(v)
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        NativeValue::String(v.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        NativeValue::String(v)
    }
}

impl From<Address> for NativeValue {
    fn from(v: Address) -> Self {
        NativeValue::Address(v)
    }
}

/// A contract argument: a native value and the wire type it must encode as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub value: NativeValue,
    pub ty: WireType,
}

impl Arg {
    pub fn new(value: impl Into<NativeValue>, ty: WireType) -> Self {
        Self {
            value: value.into(),
            ty,
        }
    }

    pub fn u32(v: u32) -> Self {
        Self::new(v, WireType::U32)
    }

    pub fn u64(v: u64) -> Self {
        Self::new(v, WireType::U64)
    }

    pub fn i128(v: i128) -> Self {
        Self::new(v, WireType::I128)
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self::new(v.into(), WireType::String)
    }

    pub fn address(v: Address) -> Self {
        Self::new(v, WireType::Address)
    }

    pub fn strings<S: AsRef<str>>(items: &[S]) -> Self {
        Self {
            value: NativeValue::Vec(
                items
                    .iter()
                    .map(|s| NativeValue::String(s.as_ref().to_string()))
                    .collect(),
            ),
            ty: WireType::vec(WireType::String),
        }
    }

    pub fn encode(&self) -> Result<ScVal> {
        encode(&self.value, &self.ty)
    }
}

fn mismatch(value: &NativeValue, ty: &WireType) -> ClientError {
    ClientError::Encoding(format!("cannot encode {} value as {}", value.kind(), ty))
}

fn integer_as<T: TryFrom<i128>>(value: &NativeValue, ty: &WireType) -> Result<T> {
    let wide = value.as_integer().ok_or_else(|| mismatch(value, ty))?;
    T::try_from(wide)
        .map_err(|_| ClientError::Encoding(format!("value {} does not fit {}", wide, ty)))
}

fn string_m<const MAX: u32>(s: &str) -> Result<StringM<MAX>> {
    StringM::try_from(s).map_err(ClientError::encoding)
}

fn vec_m<T, const MAX: u32>(items: Vec<T>) -> Result<VecM<T, MAX>> {
    VecM::try_from(items).map_err(ClientError::encoding)
}

/// Encode `value` as the wire type `ty`.
pub fn encode(value: &NativeValue, ty: &WireType) -> Result<ScVal> {
    let sc = match ty {
        WireType::Bool => ScVal::Bool(value.as_bool().ok_or_else(|| mismatch(value, ty))?),
        WireType::U32 => ScVal::U32(integer_as(value, ty)?),
        WireType::I32 => ScVal::I32(integer_as(value, ty)?),
        WireType::U64 => ScVal::U64(integer_as(value, ty)?),
        WireType::I64 => ScVal::I64(integer_as(value, ty)?),
        WireType::U128 => {
            let v: u128 = match value {
                NativeValue::U128(v) => *v,
                other => integer_as(other, ty)?,
            };
            ScVal::U128(UInt128Parts {
                hi: (v >> 64) as u64,
                lo: v as u64,
            })
        }
        WireType::I128 => {
            let v: i128 = integer_as(value, ty)?;
            ScVal::I128(Int128Parts {
                hi: (v >> 64) as i64,
                lo: v as u64,
            })
        }
        WireType::String => match value {
            NativeValue::String(s) => ScVal::String(ScString(string_m(s)?)),
            other => return Err(mismatch(other, ty)),
        },
        WireType::Symbol => match value {
            NativeValue::Symbol(s) | NativeValue::String(s) => {
                ScVal::Symbol(ScSymbol(string_m(s)?))
            }
            other => return Err(mismatch(other, ty)),
        },
        WireType::Bytes => match value {
            NativeValue::Bytes(b) => ScVal::Bytes(ScBytes(
                b.clone().try_into().map_err(ClientError::encoding)?,
            )),
            other => return Err(mismatch(other, ty)),
        },
        WireType::Address => match value {
            NativeValue::Address(a) => ScVal::Address(a.to_sc_address()),
            NativeValue::String(s) => ScVal::Address(s.parse::<Address>()?.to_sc_address()),
            other => return Err(mismatch(other, ty)),
        },
        WireType::Vec(inner) => {
            let items = value.as_vec().ok_or_else(|| mismatch(value, ty))?;
            let encoded = items
                .iter()
                .map(|item| encode(item, inner))
                .collect::<Result<Vec<_>>>()?;
            ScVal::Vec(Some(ScVec(vec_m(encoded)?)))
        }
        WireType::Tuple(types) => {
            let items = value.as_vec().ok_or_else(|| mismatch(value, ty))?;
            if items.len() != types.len() {
                return Err(ClientError::Encoding(format!(
                    "tuple arity mismatch: expected {}, got {}",
                    types.len(),
                    items.len()
                )));
            }
            let encoded = items
                .iter()
                .zip(types)
                .map(|(item, t)| encode(item, t))
                .collect::<Result<Vec<_>>>()?;
            ScVal::Vec(Some(ScVec(vec_m(encoded)?)))
        }
        WireType::Map(key_ty, val_ty) => {
            let entries = value.as_map().ok_or_else(|| mismatch(value, ty))?;
            let mut encoded = entries
                .iter()
                .map(|(k, v)| {
                    Ok(ScMapEntry {
                        key: encode(k, key_ty)?,
                        val: encode(v, val_ty)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            // The host only accepts maps with strictly ascending keys.
            encoded.sort_by(|a, b| a.key.cmp(&b.key));
            if encoded.windows(2).any(|w| w[0].key == w[1].key) {
                return Err(ClientError::Encoding("map contains duplicate keys".into()));
            }
            ScVal::Map(Some(ScMap(vec_m(encoded)?)))
        }
        WireType::Option(inner) => match value {
            NativeValue::Void => ScVal::Void,
            other => encode(other, inner)?,
        },
    };
    Ok(sc)
}

/// Decode a wire value into its native form.
pub fn decode(value: &ScVal) -> Result<NativeValue> {
    let native = match value {
        ScVal::Void => NativeValue::Void,
        ScVal::Bool(b) => NativeValue::Bool(*b),
        ScVal::U32(v) => NativeValue::U32(*v),
        ScVal::I32(v) => NativeValue::I32(*v),
        ScVal::U64(v) => NativeValue::U64(*v),
        ScVal::I64(v) => NativeValue::I64(*v),
        ScVal::Timepoint(t) => NativeValue::U64(t.0),
        ScVal::Duration(d) => NativeValue::U64(d.0),
        ScVal::U128(parts) => NativeValue::U128((u128::from(parts.hi) << 64) | u128::from(parts.lo)),
        ScVal::I128(parts) => NativeValue::I128((i128::from(parts.hi) << 64) | i128::from(parts.lo)),
        ScVal::String(s) => NativeValue::String(
            String::from_utf8(s.0.to_vec())
                .map_err(|e| ClientError::Decode(format!("string is not UTF-8: {}", e)))?,
        ),
        ScVal::Symbol(s) => NativeValue::Symbol(
            String::from_utf8(s.0.to_vec())
                .map_err(|e| ClientError::Decode(format!("symbol is not UTF-8: {}", e)))?,
        ),
        ScVal::Bytes(b) => NativeValue::Bytes(b.0.to_vec()),
        ScVal::Address(a) => NativeValue::Address(Address::from_sc_address(a)),
        ScVal::Vec(items) => NativeValue::Vec(
            items
                .as_ref()
                .map(|v| v.0.iter().map(decode).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default(),
        ),
        ScVal::Map(entries) => NativeValue::Map(
            entries
                .as_ref()
                .map(|m| {
                    m.0.iter()
                        .map(|e| Ok((decode(&e.key)?, decode(&e.val)?)))
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?
                .unwrap_or_default(),
        ),
        other => {
            return Err(ClientError::Decode(format!(
                "unsupported value type {}",
                other.name()
            )))
        }
    };
    Ok(native)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amount_rejected_for_unsigned() {
        let err = encode(&NativeValue::I128(-1), &WireType::U64).unwrap_err();
        assert!(matches!(err, ClientError::Encoding(_)));
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(encode(&NativeValue::U64(u64::from(u32::MAX) + 1), &WireType::U32).is_err());
        assert!(encode(&NativeValue::U64(7), &WireType::U32).is_ok());
    }

    #[test]
    fn shape_mismatch_rejected() {
        assert!(encode(&NativeValue::String("x".into()), &WireType::U32).is_err());
        assert!(encode(&NativeValue::U32(1), &WireType::String).is_err());
        assert!(encode(&NativeValue::U32(1), &WireType::vec(WireType::U32)).is_err());
    }

    #[test]
    fn i128_splits_into_parts() {
        let v = (1i128 << 70) + 5;
        match encode(&NativeValue::I128(v), &WireType::I128).unwrap() {
            ScVal::I128(parts) => {
                assert_eq!(parts.hi, 1 << 6);
                assert_eq!(parts.lo, 5);
            }
            other => panic!("unexpected {:?}", other),
        }
        let back = decode(&encode(&NativeValue::I128(-3), &WireType::I128).unwrap()).unwrap();
        assert_eq!(back, NativeValue::I128(-3));
    }

    #[test]
    fn string_encodes_from_str_and_address_from_strkey() {
        let sc = encode(&"hello".into(), &WireType::String).unwrap();
        assert_eq!(decode(&sc).unwrap(), NativeValue::String("hello".into()));

        let strkey = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";
        let sc = encode(&strkey.into(), &WireType::Address).unwrap();
        assert_eq!(
            decode(&sc).unwrap(),
            NativeValue::Address(Address::Account([0; 32]))
        );
    }

    #[test]
    fn map_keeps_every_entry_and_sorts_keys() {
        let value = NativeValue::Map(vec![
            (NativeValue::U32(9), NativeValue::String("nine".into())),
            (NativeValue::U32(1), NativeValue::String("one".into())),
        ]);
        let sc = encode(&value, &WireType::map(WireType::U32, WireType::String)).unwrap();
        let decoded = decode(&sc).unwrap();
        let entries = decoded.as_map().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, NativeValue::U32(1));
        assert_eq!(entries[1].0, NativeValue::U32(9));
    }

    #[test]
    fn duplicate_map_keys_rejected_on_encode() {
        let value = NativeValue::Map(vec![
            (NativeValue::U32(1), NativeValue::U32(1)),
            (NativeValue::U32(1), NativeValue::U32(2)),
        ]);
        assert!(encode(&value, &WireType::map(WireType::U32, WireType::U32)).is_err());
    }

    #[test]
    fn option_encodes_void_or_inner() {
        let ty = WireType::option(WireType::U32);
        assert_eq!(encode(&NativeValue::Void, &ty).unwrap(), ScVal::Void);
        assert_eq!(encode(&NativeValue::U32(3), &ty).unwrap(), ScVal::U32(3));
    }

    #[test]
    fn tuple_arity_checked() {
        let ty = WireType::Tuple(vec![WireType::U32, WireType::I128]);
        let ok = NativeValue::Vec(vec![NativeValue::U32(0), NativeValue::I128(5)]);
        assert!(encode(&ok, &ty).is_ok());
        let short = NativeValue::Vec(vec![NativeValue::U32(0)]);
        assert!(encode(&short, &ty).is_err());
    }

    #[test]
    fn unsupported_values_fail_to_decode() {
        assert!(matches!(
            decode(&ScVal::LedgerKeyContractInstance),
            Err(ClientError::Decode(_))
        ));
    }

    #[test]
    fn wire_type_display_nests() {
        let ty = WireType::map(WireType::Address, WireType::Tuple(vec![WireType::U32, WireType::I128]));
        assert_eq!(ty.to_string(), "Map<address, Tuple<u32, i128>>");
    }
}
