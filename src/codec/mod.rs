//! Value codec: native data <-> ledger `ScVal`.
//!
//! Sub-modules:
//! - [`value`]: type-directed encoding and total decoding.
//! - [`address`]: account / contract identifiers.
//! - [`amount`]: major/minor unit conversion.
//! - [`bet`]: the `Bet` read model decoded from contract records.

pub mod address;
pub mod amount;
pub mod bet;
pub mod value;

pub use address::Address;
pub use amount::{format_amount, to_major_units, to_minor_units, MINOR_UNITS_PER_UNIT};
pub use bet::{Bet, Stake};
pub use value::{decode, encode, Arg, NativeValue, WireType};
