//! Read model for a bet record returned by `get_bet`.
//!
//! Contract structs arrive as maps keyed by field-name symbols. Decoding goes
//! through [`Record`], which requires every expected field to be present
//! exactly once and rejects unknown fields, so a malformed record surfaces
//! as [`ClientError::Decode`] instead of a half-filled `Bet`.

use super::address::Address;
use super::amount::format_amount;
use super::value::NativeValue;
use crate::{ClientError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// One bettor's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stake {
    pub option: u32,
    /// Minor units.
    pub amount: i128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bet {
    pub id: u64,
    pub question: String,
    pub options: Vec<String>,
    pub oracle: Address,
    pub is_resolved: bool,
    /// Only ever `Some` when `is_resolved` is true.
    pub winning_option: Option<u32>,
    /// Minor units.
    pub total_pot: i128,
    pub stakes: BTreeMap<Address, Stake>,
}

const BET_FIELDS: &[&str] = &[
    "id",
    "question",
    "options",
    "oracle",
    "is_resolved",
    "winning_option",
    "total_pot",
    "stakes",
];

impl Bet {
    /// Project a decoded contract record into a `Bet`.
    pub fn from_native(value: &NativeValue) -> Result<Self> {
        let record = Record::new("Bet", value, BET_FIELDS)?;

        let id = record.u64("id")?;
        let question = record.string("question")?;
        let options = record
            .vec("options")?
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| record.error(&format!("options[{}] is not a string", i)))
            })
            .collect::<Result<Vec<_>>>()?;
        let oracle = *record
            .get("oracle")?
            .as_address()
            .ok_or_else(|| record.error("oracle is not an address"))?;
        let is_resolved = record
            .get("is_resolved")?
            .as_bool()
            .ok_or_else(|| record.error("is_resolved is not a bool"))?;

        let winning_option = if is_resolved {
            let raw = record.get("winning_option")?;
            let index = match raw {
                NativeValue::U32(i) => *i,
                NativeValue::Void => {
                    return Err(record.error("resolved bet has no winning option"));
                }
                _ => return Err(record.error("winning_option is not a u32")),
            };
            if index as usize >= options.len() {
                return Err(record.error(&format!(
                    "winning option {} is out of range ({} options)",
                    index,
                    options.len()
                )));
            }
            Some(index)
        } else {
            None
        };

        let total_pot = record.amount("total_pot")?;

        let mut stakes = BTreeMap::new();
        for (key, val) in record.map("stakes")? {
            let bettor = *key
                .as_address()
                .ok_or_else(|| record.error("stakes key is not an address"))?;
            let stake = decode_stake(val).map_err(|msg| {
                record.error(&format!("stake of {}: {}", bettor, msg))
            })?;
            if stakes.insert(bettor, stake).is_some() {
                return Err(record.error(&format!("duplicate stake entry for {}", bettor)));
            }
        }

        Ok(Bet {
            id,
            question,
            options,
            oracle,
            is_resolved,
            winning_option,
            total_pot,
            stakes,
        })
    }

    /// Decode the `Option<Bet>` returned by `get_bet`.
    pub fn from_optional(value: &NativeValue) -> Result<Option<Self>> {
        match value {
            NativeValue::Void => Ok(None),
            other => Self::from_native(other).map(Some),
        }
    }

    pub fn is_winner(&self, option: usize) -> bool {
        self.is_resolved && self.winning_option.map(|w| w as usize) == Some(option)
    }

    pub fn winning_label(&self) -> Option<&str> {
        self.winning_option
            .and_then(|w| self.options.get(w as usize))
            .map(String::as_str)
    }

    pub fn stake_of(&self, account: &Address) -> Option<&Stake> {
        self.stakes.get(account)
    }

    pub fn is_oracle(&self, account: &Address) -> bool {
        &self.oracle == account
    }

    pub fn total_pot_display(&self) -> String {
        format_amount(self.total_pot)
    }

    /// Sum of stakes placed on the winning option.
    pub fn winning_stake_total(&self) -> Option<i128> {
        let winner = self.winning_option?;
        Some(
            self.stakes
                .values()
                .filter(|s| s.option == winner)
                .map(|s| s.amount)
                .sum(),
        )
    }

    /// What `account` would receive from `claim_winnings`: its share of the
    /// pot in proportion to its winning stake, rounded down. `None` while
    /// unresolved or when the account has no stake.
    pub fn payout_for(&self, account: &Address) -> Option<i128> {
        let stake = self.stake_of(account)?;
        let winner = self.winning_option?;
        if stake.option != winner {
            return Some(0);
        }
        let total = self.winning_stake_total()?;
        if total == 0 {
            return Some(0);
        }
        stake.amount.checked_mul(self.total_pot).map(|p| p / total)
    }
}

fn decode_stake(value: &NativeValue) -> std::result::Result<Stake, &'static str> {
    let items = value.as_vec().ok_or("not a tuple")?;
    let [option, amount] = items else {
        return Err("expected a (option, amount) pair");
    };
    let option = match option {
        NativeValue::U32(o) => *o,
        _ => return Err("option is not a u32"),
    };
    let amount = match amount {
        NativeValue::I128(a) if *a >= 0 => *a,
        NativeValue::I128(_) => return Err("amount is negative"),
        _ => return Err("amount is not an i128"),
    };
    Ok(Stake { option, amount })
}

/// Field access over a struct-shaped contract map.
struct Record<'a> {
    name: &'static str,
    fields: BTreeMap<&'a str, &'a NativeValue>,
}

impl<'a> Record<'a> {
    fn new(name: &'static str, value: &'a NativeValue, expected: &[&str]) -> Result<Self> {
        let entries = value.as_map().ok_or_else(|| {
            ClientError::Decode(format!("{} record is not a map", name))
        })?;
        let mut fields = BTreeMap::new();
        for (key, val) in entries {
            let key = match key {
                NativeValue::Symbol(s) => s.as_str(),
                other => {
                    return Err(ClientError::Decode(format!(
                        "{} record has a non-symbol key {:?}",
                        name, other
                    )))
                }
            };
            if !expected.contains(&key) {
                return Err(ClientError::Decode(format!(
                    "{} record has unexpected field '{}'",
                    name, key
                )));
            }
            if fields.insert(key, val).is_some() {
                return Err(ClientError::Decode(format!(
                    "{} record repeats field '{}'",
                    name, key
                )));
            }
        }
        if let Some(missing) = expected.iter().find(|f| !fields.contains_key(*f)) {
            return Err(ClientError::Decode(format!(
                "{} record is missing field '{}'",
                name, missing
            )));
        }
        Ok(Self { name, fields })
    }

    fn error(&self, msg: &str) -> ClientError {
        ClientError::Decode(format!("{}: {}", self.name, msg))
    }

    fn get(&self, field: &str) -> Result<&'a NativeValue> {
        self.fields
            .get(field)
            .copied()
            .ok_or_else(|| self.error(&format!("missing field '{}'", field)))
    }

    fn u64(&self, field: &str) -> Result<u64> {
        match self.get(field)? {
            NativeValue::U64(v) => Ok(*v),
            _ => Err(self.error(&format!("{} is not a u64", field))),
        }
    }

    fn string(&self, field: &str) -> Result<String> {
        match self.get(field)? {
            NativeValue::String(s) => Ok(s.clone()),
            _ => Err(self.error(&format!("{} is not a string", field))),
        }
    }

    fn amount(&self, field: &str) -> Result<i128> {
        match self.get(field)? {
            NativeValue::I128(v) if *v >= 0 => Ok(*v),
            NativeValue::I128(v) => Err(self.error(&format!("{} is negative ({})", field, v))),
            _ => Err(self.error(&format!("{} is not an i128", field))),
        }
    }

    fn vec(&self, field: &str) -> Result<&'a [NativeValue]> {
        self.get(field)?
            .as_vec()
            .ok_or_else(|| self.error(&format!("{} is not a vec", field)))
    }

    fn map(&self, field: &str) -> Result<&'a [(NativeValue, NativeValue)]> {
        self.get(field)?
            .as_map()
            .ok_or_else(|| self.error(&format!("{} is not a map", field)))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn bet_record(
        id: u64,
        oracle: Address,
        resolved: bool,
        winner: NativeValue,
        stakes: Vec<(Address, u32, i128)>,
    ) -> NativeValue {
        let sym = |s: &str| NativeValue::Symbol(s.to_string());
        let pot: i128 = stakes.iter().map(|(_, _, a)| a).sum();
        NativeValue::Map(vec![
            (sym("id"), NativeValue::U64(id)),
            (sym("is_resolved"), NativeValue::Bool(resolved)),
            (
                sym("options"),
                NativeValue::Vec(vec!["A".into(), "B".into()]),
            ),
            (sym("oracle"), NativeValue::Address(oracle)),
            (sym("question"), "Q".into()),
            (
                sym("stakes"),
                NativeValue::Map(
                    stakes
                        .into_iter()
                        .map(|(who, opt, amt)| {
                            (
                                NativeValue::Address(who),
                                NativeValue::Vec(vec![NativeValue::U32(opt), NativeValue::I128(amt)]),
                            )
                        })
                        .collect(),
                ),
            ),
            (sym("total_pot"), NativeValue::I128(pot)),
            (sym("winning_option"), winner),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::bet_record;
    use super::*;

    const ORACLE: Address = Address::Account([1; 32]);
    const ALICE: Address = Address::Account([2; 32]);

    fn remove_field(value: NativeValue, field: &str) -> NativeValue {
        let NativeValue::Map(entries) = value else { unreachable!() };
        NativeValue::Map(
            entries
                .into_iter()
                .filter(|(k, _)| k.as_str() != Some(field))
                .collect(),
        )
    }

    #[test]
    fn open_bet_decodes() {
        let bet = Bet::from_native(&bet_record(1, ORACLE, false, NativeValue::Void, vec![])).unwrap();
        assert_eq!(bet.id, 1);
        assert_eq!(bet.question, "Q");
        assert_eq!(bet.options, vec!["A", "B"]);
        assert!(!bet.is_resolved);
        assert_eq!(bet.winning_option, None);
        assert_eq!(bet.total_pot, 0);
        assert!(bet.stakes.is_empty());
        assert!(bet.is_oracle(&ORACLE));
    }

    #[test]
    fn resolved_bet_marks_winner() {
        let record = bet_record(3, ORACLE, true, NativeValue::U32(1), vec![(ALICE, 1, 50)]);
        let bet = Bet::from_native(&record).unwrap();
        assert_eq!(bet.winning_option, Some(1));
        assert!(bet.is_winner(1));
        assert!(!bet.is_winner(0));
        assert_eq!(bet.winning_label(), Some("B"));
        assert_eq!(bet.stake_of(&ALICE), Some(&Stake { option: 1, amount: 50 }));
        assert_eq!(bet.total_pot, 50);
    }

    #[test]
    fn unresolved_bet_ignores_raw_winner() {
        let record = bet_record(3, ORACLE, false, NativeValue::U32(0), vec![]);
        let bet = Bet::from_native(&record).unwrap();
        assert_eq!(bet.winning_option, None);
        assert!(!bet.is_winner(0));
    }

    #[test]
    fn missing_field_is_decode_error() {
        let record = remove_field(bet_record(1, ORACLE, false, NativeValue::Void, vec![]), "total_pot");
        let err = Bet::from_native(&record).unwrap_err();
        assert!(matches!(err, ClientError::Decode(msg) if msg.contains("total_pot")));
    }

    #[test]
    fn unexpected_field_is_decode_error() {
        let NativeValue::Map(mut entries) = bet_record(1, ORACLE, false, NativeValue::Void, vec![])
        else {
            unreachable!()
        };
        entries.push((NativeValue::Symbol("extra".into()), NativeValue::U32(0)));
        assert!(Bet::from_native(&NativeValue::Map(entries)).is_err());
    }

    #[test]
    fn duplicate_stake_entries_are_not_dropped_silently() {
        let record = bet_record(1, ORACLE, false, NativeValue::Void, vec![(ALICE, 0, 5), (ALICE, 1, 7)]);
        assert!(matches!(Bet::from_native(&record), Err(ClientError::Decode(_))));
    }

    #[test]
    fn malformed_stake_is_decode_error() {
        let NativeValue::Map(mut entries) = bet_record(1, ORACLE, false, NativeValue::Void, vec![])
        else {
            unreachable!()
        };
        for (k, v) in entries.iter_mut() {
            if k.as_str() == Some("stakes") {
                *v = NativeValue::Map(vec![(
                    NativeValue::Address(ALICE),
                    NativeValue::Vec(vec![NativeValue::U32(0)]),
                )]);
            }
        }
        assert!(Bet::from_native(&NativeValue::Map(entries)).is_err());
    }

    #[test]
    fn resolved_without_winner_is_rejected() {
        let record = bet_record(1, ORACLE, true, NativeValue::Void, vec![]);
        assert!(Bet::from_native(&record).is_err());
        let record = bet_record(1, ORACLE, true, NativeValue::U32(5), vec![]);
        assert!(Bet::from_native(&record).is_err());
    }

    #[test]
    fn payout_is_proportional_to_winning_stake() {
        const BOB: Address = Address::Account([3; 32]);
        const CAROL: Address = Address::Account([4; 32]);
        let record = bet_record(
            2,
            ORACLE,
            true,
            NativeValue::U32(0),
            vec![(ALICE, 0, 30), (BOB, 0, 10), (CAROL, 1, 60)],
        );
        let bet = Bet::from_native(&record).unwrap();
        assert_eq!(bet.winning_stake_total(), Some(40));
        assert_eq!(bet.payout_for(&ALICE), Some(75));
        assert_eq!(bet.payout_for(&BOB), Some(25));
        assert_eq!(bet.payout_for(&CAROL), Some(0));
        assert_eq!(bet.payout_for(&ORACLE), None);
    }

    #[test]
    fn optional_void_is_absent() {
        assert_eq!(Bet::from_optional(&NativeValue::Void).unwrap(), None);
    }
}
