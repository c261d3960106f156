//! Rendering of command results as text or JSON.

use super::OutputFormat;
use crate::codec::{format_amount, Address, Bet};
use crate::gateway::NetworkInfo;
use colored::Colorize;
use serde_json::json;
use std::fmt::Write as _;

/// A finished command's payload, ready to print.
pub enum Rendered {
    Text(String),
    Json(serde_json::Value),
}

impl Rendered {
    pub fn print(&self) -> anyhow::Result<()> {
        match self {
            Rendered::Text(text) => println!("{}", text),
            Rendered::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        }
        Ok(())
    }
}

/// One bet. `viewer` adds the viewer's stake and expected payout.
pub fn bet(format: OutputFormat, bet: &Bet, viewer: Option<&Address>) -> Rendered {
    match format {
        OutputFormat::Json => Rendered::Json(bet_json(bet, viewer)),
        OutputFormat::Text => Rendered::Text(bet_text(bet, viewer)),
    }
}

pub fn bets(format: OutputFormat, bets: &[Bet], viewer: Option<&Address>) -> Rendered {
    match format {
        OutputFormat::Json => Rendered::Json(serde_json::Value::Array(
            bets.iter().map(|b| bet_json(b, viewer)).collect(),
        )),
        OutputFormat::Text if bets.is_empty() => Rendered::Text("No bets yet.".to_string()),
        OutputFormat::Text => Rendered::Text(
            bets.iter()
                .map(|b| bet_text(b, viewer))
                .collect::<Vec<_>>()
                .join("\n\n"),
        ),
    }
}

pub fn not_found(format: OutputFormat, bet_id: u64) -> Rendered {
    match format {
        OutputFormat::Json => Rendered::Json(serde_json::Value::Null),
        OutputFormat::Text => Rendered::Text(format!("Bet {} does not exist.", bet_id)),
    }
}

pub fn count(format: OutputFormat, count: u64) -> Rendered {
    match format {
        OutputFormat::Json => Rendered::Json(json!({ "count": count })),
        OutputFormat::Text => Rendered::Text(count.to_string()),
    }
}

pub fn address(format: OutputFormat, address: &Address) -> Rendered {
    match format {
        OutputFormat::Json => Rendered::Json(json!({ "address": address })),
        OutputFormat::Text => Rendered::Text(address.to_string()),
    }
}

pub fn created(format: OutputFormat, bet_id: u64) -> Rendered {
    match format {
        OutputFormat::Json => Rendered::Json(json!({ "bet_id": bet_id })),
        OutputFormat::Text => Rendered::Text(format!("{} Created bet {}", "✓".green(), bet_id)),
    }
}

/// Acknowledgement of a write that returns nothing.
pub fn done(format: OutputFormat, message: &str) -> Rendered {
    match format {
        OutputFormat::Json => Rendered::Json(json!({ "ok": true, "message": message })),
        OutputFormat::Text => Rendered::Text(format!("{} {}", "✓".green(), message)),
    }
}

pub fn transaction(format: OutputFormat, hash: &str, value: Option<serde_json::Value>) -> Rendered {
    match format {
        OutputFormat::Json => Rendered::Json(json!({ "hash": hash, "status": "SUCCESS", "value": value })),
        OutputFormat::Text => {
            let mut out = format!("{} Transaction {} succeeded", "✓".green(), hash);
            if let Some(value) = value {
                let _ = write!(out, "\nReturned: {}", value);
            }
            Rendered::Text(out)
        }
    }
}

pub fn status(format: OutputFormat, url: &str, health: &str, network: &NetworkInfo) -> Rendered {
    match format {
        OutputFormat::Json => Rendered::Json(json!({
            "rpc_url": url,
            "health": health,
            "network": network,
        })),
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(out, "RPC:       {}", url);
            let _ = writeln!(out, "Health:    {}", health);
            let _ = writeln!(out, "Network:   {}", network.passphrase);
            let _ = write!(out, "Protocol:  {}", network.protocol_version);
            if let Some(friendbot) = &network.friendbot_url {
                let _ = write!(out, "\nFriendbot: {}", friendbot);
            }
            Rendered::Text(out)
        }
    }
}

fn bet_json(bet: &Bet, viewer: Option<&Address>) -> serde_json::Value {
    let mut value = json!({
        "id": bet.id,
        "question": bet.question,
        "options": bet.options,
        "oracle": bet.oracle,
        "is_resolved": bet.is_resolved,
        "winning_option": bet.winning_option,
        "total_pot": bet.total_pot.to_string(),
        "total_pot_display": bet.total_pot_display(),
        "stakes": bet
            .stakes
            .iter()
            .map(|(who, stake)| json!({
                "account": who,
                "option": stake.option,
                "amount": stake.amount.to_string(),
            }))
            .collect::<Vec<_>>(),
    });
    if let Some(viewer) = viewer {
        value["payout"] = json!(bet.payout_for(viewer).map(|p| p.to_string()));
    }
    value
}

fn bet_text(bet: &Bet, viewer: Option<&Address>) -> String {
    let mut out = String::new();
    let state = if bet.is_resolved {
        "resolved".yellow()
    } else {
        "open".cyan()
    };
    let _ = writeln!(out, "#{} {} [{}]", bet.id, bet.question.bold(), state);
    for (i, option) in bet.options.iter().enumerate() {
        let staked: i128 = bet
            .stakes
            .values()
            .filter(|s| s.option as usize == i)
            .map(|s| s.amount)
            .sum();
        let line = format!("  {}. {} ({})", i, option, format_amount(staked));
        if bet.is_winner(i) {
            let _ = writeln!(out, "{} {}", line.green().bold(), "← winner".green());
        } else {
            let _ = writeln!(out, "{}", line);
        }
    }
    let _ = writeln!(out, "  Pot: {}", bet.total_pot_display());
    let _ = write!(out, "  Oracle: {}", bet.oracle);

    if let Some(viewer) = viewer {
        if let Some(stake) = bet.stake_of(viewer) {
            let _ = write!(
                out,
                "\n  Your stake: {} on option {}",
                format_amount(stake.amount),
                stake.option
            );
            if let Some(payout) = bet.payout_for(viewer) {
                let _ = write!(out, "\n  Your payout: {}", format_amount(payout));
            }
        }
    }
    out
}
