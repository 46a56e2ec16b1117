//! End-to-end transfer flow over a scripted transport

use serde_json::{json, Value};
#[allow(deprecated)]
use solana_sdk::system_program;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use std::sync::Arc;

use super::test_helpers::{blockhash_result, fast_config, transaction_result, ScriptedTransport};
use crate::commands::{Command, CommandOutput, TransferStatus, WalletApp, WalletError};
use crate::rpc_manager::TransportError;
use crate::structured_logging::CommandContext;
use crate::tx_builder::{BuildError, SubmitError};
use crate::types::AmountError;
use crate::wallet::WalletManager;

const NODE_SIG: &str = "4Nd1mYWGm6pKmVpHZtBzGqPx2Rs5ZHTUxhQPk7aZBv3YtJm8A8Ezyb6yUJ4ZMRxF6zHqqb3T9D8xUfnb2p3ZwCgv";

fn app(transport: Arc<ScriptedTransport>, payer: &Keypair) -> WalletApp {
    let wallet = WalletManager::from_keypair(payer.insecure_clone());
    WalletApp::new(fast_config(), transport, Some(wallet))
}

fn send(recipient: &Pubkey, amount: &str, wait: bool) -> Command {
    Command::Send {
        recipient: recipient.to_string(),
        amount: amount.to_string(),
        wait,
    }
}

/// Decode the base-58 transaction passed to `sendTransaction`
fn sent_wire_bytes(transport: &ScriptedTransport) -> Vec<u8> {
    let calls = transport.calls_to("sendTransaction");
    assert_eq!(calls.len(), 1);
    let encoded = calls[0].params[0].as_str().unwrap();
    bs58::decode(encoded).into_vec().unwrap()
}

#[tokio::test]
async fn test_transfer_one_and_a_half_units() {
    let payer = Keypair::new();
    let recipient = Pubkey::new_unique();
    let anchor = Hash::new_unique();

    let transport = ScriptedTransport::new();
    transport
        .ok("getLatestBlockhash", blockhash_result(&anchor))
        .ok("sendTransaction", json!(NODE_SIG));

    let output = app(transport.clone(), &payer)
        .execute(send(&recipient, "1.5", false), &CommandContext::new("send"))
        .await
        .unwrap();

    let report = match output {
        CommandOutput::Transfer(report) => report,
        other => panic!("unexpected output {:?}", other),
    };
    assert_eq!(report.lamports, 1_500_000_000);
    assert_eq!(report.signature, NODE_SIG);
    assert_eq!(report.status, TransferStatus::Submitted);
    assert_eq!(transport.count("getTransaction"), 0);

    let wire = sent_wire_bytes(&transport);
    // one signature, then the v0 message
    assert_eq!(wire[0], 1);
    let signature = Signature::try_from(&wire[1..65]).unwrap();
    let message = &wire[65..];
    assert!(signature.verify(payer.pubkey().as_ref(), message));

    assert_eq!(message[0], 0x80);
    assert_eq!(&message[1..4], &[1, 0, 1]);
    assert_eq!(message[4], 3);
    assert_eq!(&message[5..37], payer.pubkey().as_ref());
    assert_eq!(&message[37..69], recipient.as_ref());
    assert_eq!(&message[69..101], system_program::id().as_ref());
    assert_eq!(&message[101..133], anchor.as_ref());

    // 1 instruction: program 2, accounts [0, 1], 12-byte payload, no lookups
    assert_eq!(&message[133..139], &[1, 2, 2, 0, 1, 12]);
    assert_eq!(&message[139..143], &2u32.to_le_bytes());
    assert_eq!(&message[143..151], &1_500_000_000u64.to_le_bytes());
    assert_eq!(message[151], 0);
    assert_eq!(message.len(), 152);
}

#[tokio::test]
async fn test_send_options_forwarded() {
    let payer = Keypair::new();
    let transport = ScriptedTransport::new();
    transport
        .ok("getLatestBlockhash", blockhash_result(&Hash::new_unique()))
        .ok("sendTransaction", json!(NODE_SIG));

    let mut config = fast_config();
    config.transfer.skip_preflight = true;
    let app = WalletApp::new(
        config,
        transport.clone(),
        Some(WalletManager::from_keypair(payer.insecure_clone())),
    );
    app.execute(send(&Pubkey::new_unique(), "0.1", false), &CommandContext::new("send"))
        .await
        .unwrap();

    let anchor_call = &transport.calls_to("getLatestBlockhash")[0];
    assert_eq!(anchor_call.params, vec![json!({"commitment": "confirmed"})]);

    let send_call = &transport.calls_to("sendTransaction")[0];
    assert_eq!(
        send_call.params[1],
        json!({"encoding": "base58", "skipPreflight": true, "preflightCommitment": "confirmed"})
    );
}

#[tokio::test]
async fn test_transfer_waits_for_outcome() {
    let payer = Keypair::new();
    let transport = ScriptedTransport::new();
    transport
        .ok("getLatestBlockhash", blockhash_result(&Hash::new_unique()))
        .ok("sendTransaction", json!(NODE_SIG))
        .ok("getTransaction", Value::Null)
        .ok("getTransaction", transaction_result(NODE_SIG, Value::Null));

    let report = app(transport.clone(), &payer)
        .transfer(&Pubkey::new_unique().to_string(), 42, true, &CommandContext::new("send"))
        .await
        .unwrap();

    match &report.status {
        TransferStatus::Confirmed(tx) => {
            assert_eq!(tx.signature.as_deref(), Some(NODE_SIG));
            assert_eq!(tx.fee_lamports, Some(5000));
        }
        other => panic!("expected confirmation, got {:?}", other),
    }
    assert_eq!(transport.count("getTransaction"), 2);
    assert_eq!(transport.calls_to("getTransaction")[0].params[0], json!(NODE_SIG));
}

#[tokio::test]
async fn test_transfer_failed_on_chain() {
    let payer = Keypair::new();
    let transport = ScriptedTransport::new();
    transport
        .ok("getLatestBlockhash", blockhash_result(&Hash::new_unique()))
        .ok("sendTransaction", json!(NODE_SIG))
        .ok(
            "getTransaction",
            transaction_result(NODE_SIG, json!({"InstructionError": [0, {"Custom": 1}]})),
        );

    let report = app(transport.clone(), &payer)
        .transfer(&Pubkey::new_unique().to_string(), 42, true, &CommandContext::new("send"))
        .await
        .unwrap();
    assert!(matches!(report.status, TransferStatus::Failed(_)));
    assert!(report.to_string().contains("Failed on chain"));
}

#[tokio::test]
async fn test_invalid_recipient_sends_nothing() {
    let payer = Keypair::new();
    let transport = ScriptedTransport::new();

    let err = app(transport.clone(), &payer)
        .execute(
            Command::Send {
                recipient: "not-a-key".into(),
                amount: "1".into(),
                wait: false,
            },
            &CommandContext::new("send"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::Build(BuildError::InvalidAddress(_))));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_amount_sends_nothing() {
    let payer = Keypair::new();
    let transport = ScriptedTransport::new();

    let err = app(transport.clone(), &payer)
        .execute(send(&Pubkey::new_unique(), "1.0000000001", false), &CommandContext::new("send"))
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::InvalidAmount(AmountError::TooPrecise(_))));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_missing_anchor() {
    let payer = Keypair::new();
    let transport = ScriptedTransport::new();
    transport.ok("getLatestBlockhash", json!({"context": {"slot": 1}, "value": null}));

    let err = app(transport.clone(), &payer)
        .execute(send(&Pubkey::new_unique(), "1", false), &CommandContext::new("send"))
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::Build(BuildError::NoAnchor(_))));
    assert_eq!(transport.count("sendTransaction"), 0);
}

#[tokio::test]
async fn test_rejected_submission() {
    let payer = Keypair::new();
    let transport = ScriptedTransport::new();
    transport
        .ok("getLatestBlockhash", blockhash_result(&Hash::new_unique()))
        .ok("sendTransaction", Value::Null);

    let err = app(transport.clone(), &payer)
        .execute(send(&Pubkey::new_unique(), "1", true), &CommandContext::new("send"))
        .await
        .unwrap_err();

    assert_eq!(err, WalletError::Submit(SubmitError::Rejected("null".into())));
    assert_eq!(transport.count("getTransaction"), 0);
}

#[tokio::test]
async fn test_preflight_failure_is_transport_error() {
    let payer = Keypair::new();
    let transport = ScriptedTransport::new();
    transport
        .ok("getLatestBlockhash", blockhash_result(&Hash::new_unique()))
        .err(
            "sendTransaction",
            TransportError::Rpc {
                code: -32002,
                message: "Transaction simulation failed: Attempt to debit an account but found no record of a prior credit.".into(),
            },
        );

    let err = app(transport.clone(), &payer)
        .execute(send(&Pubkey::new_unique(), "1", false), &CommandContext::new("send"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WalletError::Submit(SubmitError::Transport(TransportError::Rpc { code: -32002, .. }))
    ));
}

#[tokio::test]
async fn test_send_without_wallet() {
    let transport = ScriptedTransport::new();
    let app = WalletApp::new(fast_config(), transport.clone(), None);

    let err = app
        .execute(send(&Pubkey::new_unique(), "1", false), &CommandContext::new("send"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NoWallet(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_each_transfer_fetches_a_new_anchor() {
    let payer = Keypair::new();
    let first = Hash::new_unique();
    let second = Hash::new_unique();
    let transport = ScriptedTransport::new();
    transport
        .ok("getLatestBlockhash", blockhash_result(&first))
        .ok("getLatestBlockhash", blockhash_result(&second))
        .ok("sendTransaction", json!(NODE_SIG));

    let app = app(transport.clone(), &payer);
    let ctx = CommandContext::new("send");
    let recipient = Pubkey::new_unique().to_string();
    app.transfer(&recipient, 1, false, &ctx).await.unwrap();
    app.transfer(&recipient, 1, false, &ctx).await.unwrap();

    assert_eq!(transport.count("getLatestBlockhash"), 2);
    let sends = transport.calls_to("sendTransaction");
    let anchors: Vec<Vec<u8>> = sends
        .iter()
        .map(|c| {
            let wire = bs58::decode(c.params[0].as_str().unwrap()).into_vec().unwrap();
            wire[65 + 101..65 + 133].to_vec()
        })
        .collect();
    assert_eq!(anchors[0], first.as_ref());
    assert_eq!(anchors[1], second.as_ref());
}
