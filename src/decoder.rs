//! Transaction record decoder
//!
//! Turns a `getTransaction` (`jsonParsed`) result into a [`TransactionReport`].
//! Decoding is total: any missing or oddly-shaped optional field degrades to
//! `None` / an "Unknown" sentinel instead of failing.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::types::{lamports_to_sol, signed_lamports_to_sol, CURRENCY};

/// Sentinel for fields the record did not carry
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountEntry {
    pub address: String,
    pub writable: bool,
    pub signer: bool,
}

/// How a single instruction could be rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum InstructionView {
    /// The node understood the program and returned a typed view
    Parsed {
        program: String,
        program_id: String,
        kind: String,
        info: Vec<(String, String)>,
    },
    /// Opaque payload (base-58 data)
    Raw {
        program: String,
        program_id: String,
        data: String,
    },
}

impl InstructionView {
    pub fn program(&self) -> &str {
        match self {
            InstructionView::Parsed { program, .. } | InstructionView::Raw { program, .. } => program,
        }
    }

    pub fn program_id(&self) -> &str {
        match self {
            InstructionView::Parsed { program_id, .. } | InstructionView::Raw { program_id, .. } => {
                program_id
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardEntry {
    pub pubkey: String,
    pub lamports: i64,
    pub reward_type: String,
}

impl RewardEntry {
    pub fn units(&self) -> f64 {
        signed_lamports_to_sol(self.lamports as i128)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Error(String),
    /// No `meta` in the record
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReport {
    pub signature: Option<String>,
    pub slot: Option<u64>,
    pub block_time: Option<i64>,
    pub recent_blockhash: Option<String>,
    pub accounts: Vec<AccountEntry>,
    pub instructions: Vec<InstructionView>,
    pub execution: ExecutionStatus,
    pub fee_lamports: Option<u64>,
    /// `post - pre` for every account index, zeros included
    pub balance_deltas: Option<Vec<i128>>,
    pub rewards: Option<Vec<RewardEntry>>,
    pub confirmation_status: String,
}

impl TransactionReport {
    /// Non-zero deltas as `(account index, lamports)`
    pub fn rendered_balance_changes(&self) -> Vec<(usize, i128)> {
        self.balance_deltas
            .iter()
            .flatten()
            .enumerate()
            .filter(|(_, delta)| **delta != 0)
            .map(|(i, delta)| (i, *delta))
            .collect()
    }
}

/// `post[i] - pre[i]` for every index both arrays cover
pub fn balance_deltas(pre: &[u64], post: &[u64]) -> Vec<i128> {
    pre.iter()
        .zip(post)
        .map(|(pre, post)| *post as i128 - *pre as i128)
        .collect()
}

/// Decode a raw record. Never fails.
pub fn decode(raw: &Value) -> TransactionReport {
    let message = raw.pointer("/transaction/message");
    let meta = raw.get("meta").filter(|m| m.is_object());

    let account_keys = message
        .and_then(|m| m.get("accountKeys"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let accounts = decode_accounts(account_keys, message.and_then(|m| m.get("header")));

    let instructions = message
        .and_then(|m| m.get("instructions"))
        .and_then(Value::as_array)
        .map(|ixs| ixs.iter().map(|ix| decode_instruction(ix, &accounts)).collect())
        .unwrap_or_default();

    let execution = match meta {
        None => ExecutionStatus::Unknown,
        Some(meta) => match meta.get("err") {
            Some(err) if !err.is_null() => ExecutionStatus::Error(err.to_string()),
            _ => ExecutionStatus::Success,
        },
    };

    let balance_deltas = meta.and_then(|meta| {
        let pre = u64_array(meta.get("preBalances")?)?;
        let post = u64_array(meta.get("postBalances")?)?;
        Some(balance_deltas(&pre, &post))
    });

    let rewards = meta.map(|m| {
        m.get("rewards")
            .and_then(Value::as_array)
            .map(|rewards| rewards.iter().map(decode_reward).collect())
            .unwrap_or_default()
    });

    TransactionReport {
        signature: raw
            .pointer("/transaction/signatures/0")
            .and_then(Value::as_str)
            .map(str::to_string),
        slot: raw.get("slot").and_then(Value::as_u64),
        block_time: raw.get("blockTime").and_then(Value::as_i64),
        recent_blockhash: message
            .and_then(|m| m.get("recentBlockhash"))
            .and_then(Value::as_str)
            .map(str::to_string),
        accounts,
        instructions,
        execution,
        fee_lamports: meta.and_then(|m| m.get("fee")).and_then(Value::as_u64),
        balance_deltas,
        rewards,
        confirmation_status: raw
            .get("confirmationStatus")
            .and_then(Value::as_str)
            .map(capitalize)
            .unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

/// Any non-integer entry invalidates the whole array
fn u64_array(value: &Value) -> Option<Vec<u64>> {
    value.as_array()?.iter().map(Value::as_u64).collect()
}

/// Parsed keys carry their own flags; bare string keys (non-parsed encodings)
/// fall back to the message header, when there is one
fn decode_accounts(keys: &[Value], header: Option<&Value>) -> Vec<AccountEntry> {
    let header_count = |field: &str| {
        header
            .and_then(|h| h.get(field))
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize
    };
    let num_signers = header_count("numRequiredSignatures");
    let readonly_signed = header_count("numReadonlySignedAccounts");
    let readonly_unsigned = header_count("numReadonlyUnsignedAccounts");
    let total = keys.len();

    keys.iter()
        .enumerate()
        .map(|(i, key)| match key {
            Value::String(address) => {
                let signer = i < num_signers;
                let writable = if signer {
                    i < num_signers.saturating_sub(readonly_signed)
                } else {
                    i < total.saturating_sub(readonly_unsigned)
                };
                AccountEntry {
                    address: address.clone(),
                    writable: header.is_some() && writable,
                    signer,
                }
            }
            other => AccountEntry {
                address: other
                    .get("pubkey")
                    .and_then(Value::as_str)
                    .unwrap_or(UNKNOWN)
                    .to_string(),
                writable: other.get("writable").and_then(Value::as_bool).unwrap_or(false),
                signer: other.get("signer").and_then(Value::as_bool).unwrap_or(false),
            },
        })
        .collect()
}

fn decode_instruction(ix: &Value, accounts: &[AccountEntry]) -> InstructionView {
    let program_id = ix
        .get("programId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            let index = ix.get("programIdIndex")?.as_u64()? as usize;
            accounts.get(index).map(|a| a.address.clone())
        })
        .unwrap_or_else(|| UNKNOWN.to_string());
    let program = ix
        .get("program")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN)
        .to_string();

    match ix.get("parsed") {
        Some(Value::Object(parsed)) => InstructionView::Parsed {
            program,
            program_id,
            kind: parsed
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN)
                .to_string(),
            info: parsed
                .get("info")
                .and_then(Value::as_object)
                .map(|info| {
                    info.iter()
                        .map(|(k, v)| (k.clone(), render_value(v)))
                        .collect()
                })
                .unwrap_or_default(),
        },
        // The memo program parses to a bare string
        Some(Value::String(text)) => InstructionView::Parsed {
            program,
            program_id,
            kind: text.clone(),
            info: Vec::new(),
        },
        _ => InstructionView::Raw {
            program,
            program_id,
            data: ix
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN)
                .to_string(),
        },
    }
}

fn decode_reward(reward: &Value) -> RewardEntry {
    RewardEntry {
        pubkey: reward
            .get("pubkey")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN)
            .to_string(),
        lamports: reward.get("lamports").and_then(Value::as_i64).unwrap_or(0),
        reward_type: reward
            .get("rewardType")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN)
            .to_string(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn capitalize(status: &str) -> String {
    let mut chars = status.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => UNKNOWN.to_string(),
    }
}

/// UTC rendering of a unix timestamp
pub fn format_block_time(block_time: i64) -> String {
    chrono::DateTime::from_timestamp(block_time, 0)
        .map(|dt| format!("{} ({})", block_time, dt.format("%Y-%m-%d %H:%M:%S UTC")))
        .unwrap_or_else(|| block_time.to_string())
}

impl fmt::Display for TransactionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());

        writeln!(f, "Signature: {}", or_unknown(self.signature.clone()))?;
        writeln!(f, "Slot: {}", or_unknown(self.slot.map(|s| s.to_string())))?;
        writeln!(f, "Block Time: {}", or_unknown(self.block_time.map(format_block_time)))?;
        writeln!(f, "Recent Blockhash: {}", or_unknown(self.recent_blockhash.clone()))?;

        writeln!(f, "\nAccounts:")?;
        for account in &self.accounts {
            writeln!(
                f,
                "  - {} (Writable: {}, Signer: {})",
                account.address, account.writable, account.signer
            )?;
        }

        writeln!(f, "\nInstructions:")?;
        for (idx, ix) in self.instructions.iter().enumerate() {
            writeln!(f, "  Instruction {}:", idx + 1)?;
            writeln!(f, "    Program: {}", ix.program())?;
            writeln!(f, "    Program ID: {}", ix.program_id())?;
            match ix {
                InstructionView::Parsed { kind, info, .. } => {
                    writeln!(f, "    Type: {}", kind)?;
                    for (key, value) in info {
                        writeln!(f, "      {}: {}", key, value)?;
                    }
                }
                InstructionView::Raw { data, .. } => writeln!(f, "    Data: {}", data)?,
            }
        }

        match &self.execution {
            ExecutionStatus::Success => writeln!(f, "\nTransaction successful")?,
            ExecutionStatus::Error(err) => writeln!(f, "\nError: {}", err)?,
            ExecutionStatus::Unknown => writeln!(f, "\nExecution result: {}", UNKNOWN)?,
        }

        if let Some(fee) = self.fee_lamports {
            writeln!(f, "\nFee: {:.9} {}", lamports_to_sol(fee), CURRENCY)?;
        }

        if self.balance_deltas.is_some() {
            writeln!(f, "\nBalance Changes:")?;
            for (index, delta) in self.rendered_balance_changes() {
                writeln!(
                    f,
                    "  Account {}: {:+.9} {}",
                    index,
                    signed_lamports_to_sol(delta),
                    CURRENCY
                )?;
            }
        }

        if let Some(rewards) = self.rewards.as_ref().filter(|r| !r.is_empty()) {
            writeln!(f, "\nRewards:")?;
            for reward in rewards {
                writeln!(
                    f,
                    "  {}: {:+.9} {} (Type: {})",
                    reward.pubkey,
                    reward.units(),
                    CURRENCY,
                    reward.reward_type
                )?;
            }
        }

        write!(f, "\nStatus: {}", self.confirmation_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> Value {
        json!({
            "slot": 4242,
            "blockTime": 1_700_000_000,
            "confirmationStatus": "finalized",
            "transaction": {
                "signatures": ["5sig"],
                "message": {
                    "recentBlockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N",
                    "accountKeys": [
                        {"pubkey": "Payer111", "writable": true, "signer": true, "source": "transaction"},
                        {"pubkey": "Recipient111", "writable": true, "signer": false, "source": "transaction"},
                        {"pubkey": "11111111111111111111111111111111", "writable": false, "signer": false, "source": "transaction"}
                    ],
                    "instructions": [
                        {
                            "program": "system",
                            "programId": "11111111111111111111111111111111",
                            "parsed": {
                                "type": "transfer",
                                "info": {"destination": "Recipient111", "lamports": 1500000000, "source": "Payer111"}
                            }
                        },
                        {
                            "programId": "Prog1111",
                            "accounts": ["Payer111"],
                            "data": "3Bxs4h24hBtQy9rw"
                        }
                    ]
                }
            },
            "meta": {
                "err": null,
                "fee": 5000,
                "preBalances": [100, 50, 1],
                "postBalances": [80, 70, 1],
                "rewards": [{"pubkey": "Validator111", "lamports": 2500, "rewardType": "Fee"}]
            }
        })
    }

    #[test]
    fn test_decode_full_record() {
        let report = decode(&sample_record());

        assert_eq!(report.signature.as_deref(), Some("5sig"));
        assert_eq!(report.slot, Some(4242));
        assert_eq!(report.block_time, Some(1_700_000_000));
        assert_eq!(report.accounts.len(), 3);
        assert_eq!(
            report.accounts[1],
            AccountEntry {
                address: "Recipient111".to_string(),
                writable: true,
                signer: false
            }
        );
        assert_eq!(report.execution, ExecutionStatus::Success);
        assert_eq!(report.fee_lamports, Some(5000));
        assert_eq!(report.confirmation_status, "Finalized");
        assert_eq!(report.rewards.as_ref().unwrap()[0].lamports, 2500);
    }

    #[test]
    fn test_instruction_variants_keep_order() {
        let report = decode(&sample_record());
        assert_eq!(report.instructions.len(), 2);

        match &report.instructions[0] {
            InstructionView::Parsed { kind, info, program, .. } => {
                assert_eq!(program, "system");
                assert_eq!(kind, "transfer");
                assert!(info.contains(&("lamports".to_string(), "1500000000".to_string())));
                assert!(info.contains(&("destination".to_string(), "Recipient111".to_string())));
            }
            other => panic!("expected parsed instruction, got {:?}", other),
        }

        assert_eq!(
            report.instructions[1],
            InstructionView::Raw {
                program: UNKNOWN.to_string(),
                program_id: "Prog1111".to_string(),
                data: "3Bxs4h24hBtQy9rw".to_string()
            }
        );
    }

    #[test]
    fn test_balance_deltas() {
        assert_eq!(balance_deltas(&[100, 50], &[80, 70]), vec![-20, 20]);
        assert_eq!(balance_deltas(&[5, 5], &[5, 5]), vec![0, 0]);
        assert_eq!(balance_deltas(&[u64::MAX], &[0]), vec![-(u64::MAX as i128)]);
    }

    #[test]
    fn test_zero_deltas_rendered_but_computed() {
        let report = decode(&sample_record());
        assert_eq!(report.balance_deltas, Some(vec![-20, 20, 0]));
        assert_eq!(report.rendered_balance_changes(), vec![(0, -20), (1, 20)]);

        let text = report.to_string();
        assert!(text.contains("Account 0: -0.000000020"));
        assert!(text.contains("Account 1: +0.000000020"));
        assert!(!text.contains("Account 2:"));
    }

    #[test]
    fn test_missing_optional_fields() {
        let raw = json!({
            "slot": 7,
            "transaction": {"message": {"accountKeys": [], "instructions": []}}
        });
        let report = decode(&raw);

        assert_eq!(report.block_time, None);
        assert_eq!(report.execution, ExecutionStatus::Unknown);
        assert_eq!(report.fee_lamports, None);
        assert_eq!(report.balance_deltas, None);
        assert_eq!(report.rewards, None);
        assert_eq!(report.confirmation_status, UNKNOWN);

        let text = report.to_string();
        assert!(text.contains("Block Time: Unknown"));
        assert!(text.contains("Status: Unknown"));
    }

    #[test]
    fn test_non_integer_balance_drops_deltas() {
        for pre in [json!([100, "50"]), json!([100, 1.5]), json!([100, -3]), json!([100, null])] {
            let raw = json!({
                "slot": 1,
                "meta": {"err": null, "fee": 5000, "preBalances": pre, "postBalances": [80, 70]}
            });
            let report = decode(&raw);
            assert_eq!(report.balance_deltas, None, "preBalances {}", raw["meta"]["preBalances"]);
            assert!(report.rendered_balance_changes().is_empty());
            assert!(!report.to_string().contains("Balance Changes"));
        }
    }

    #[test]
    fn test_garbage_never_panics() {
        for raw in [
            json!(null),
            json!(42),
            json!({"meta": "nope", "transaction": []}),
            json!({"transaction": {"message": {"instructions": [1, "x", {"parsed": 3}]}}}),
            json!({"meta": {"preBalances": [1, 2], "postBalances": "x", "rewards": [{}]}}),
        ] {
            let report = decode(&raw);
            let _ = report.to_string();
        }
    }

    #[test]
    fn test_error_meta() {
        let raw = json!({"slot": 1, "meta": {"err": {"InstructionError": [0, "InsufficientFunds"]}, "fee": 5000}});
        let report = decode(&raw);
        assert!(matches!(report.execution, ExecutionStatus::Error(ref e) if e.contains("InsufficientFunds")));
        assert!(report.to_string().contains("Error: {\"InstructionError\""));
    }

    #[test]
    fn test_string_account_keys_use_header() {
        let raw = json!({
            "transaction": {"message": {
                "header": {"numRequiredSignatures": 1, "numReadonlySignedAccounts": 0, "numReadonlyUnsignedAccounts": 1},
                "accountKeys": ["A", "B", "C"],
                "instructions": [{"programIdIndex": 2, "accounts": [0, 1], "data": "3Bxs"}]
            }}
        });
        let report = decode(&raw);
        let flags: Vec<_> = report.accounts.iter().map(|a| (a.writable, a.signer)).collect();
        assert_eq!(flags, vec![(true, true), (true, false), (false, false)]);
        assert_eq!(report.instructions[0].program_id(), "C");
    }

    #[test]
    fn test_memo_parsed_as_string() {
        let raw = json!({"transaction": {"message": {"instructions": [
            {"program": "spl-memo", "programId": "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr", "parsed": "hello"}
        ]}}});
        let report = decode(&raw);
        assert_eq!(
            report.instructions[0],
            InstructionView::Parsed {
                program: "spl-memo".to_string(),
                program_id: "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr".to_string(),
                kind: "hello".to_string(),
                info: vec![]
            }
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("confirmed"), "Confirmed");
        assert_eq!(capitalize("FINALIZED"), "Finalized");
        assert_eq!(capitalize(""), UNKNOWN);
    }

    #[test]
    fn test_format_block_time() {
        assert_eq!(format_block_time(0), "0 (1970-01-01 00:00:00 UTC)");
    }
}
