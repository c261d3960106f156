#![no_main]

use libfuzzer_sys::fuzz_target;
use soroban_bets::codec::{decode, Bet};
use stellar_xdr::curr::{Limits, ReadXdr, ScVal};

// Arbitrary XDR must never panic the decoder or the Bet projection.
fuzz_target!(|data: &[u8]| {
    let Ok(scval) = ScVal::from_xdr(data, Limits { depth: 64, len: data.len() }) else {
        return;
    };
    if let Ok(native) = decode(&scval) {
        if let Ok(Some(bet)) = Bet::from_optional(&native) {
            for account in bet.stakes.keys() {
                let _ = bet.payout_for(account);
            }
        }
    }
});
