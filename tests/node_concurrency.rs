//! Concurrent access to a shared ledger through [`Node`].

use argonchain::blockchain::Blockchain;
use argonchain::crypto::{HashParams, KeyPair, KeyedHasher};
use argonchain::error::ChainError;
use argonchain::miner::MiningControl;
use argonchain::node::Node;
use argonchain::persistence::{JsonFilePersistence, Persistence};
use argonchain::transaction::Amount;
use argonchain::wallet::Wallet;
use std::sync::Arc;
use std::time::Duration;

fn node(difficulty: u32, reward: f64) -> Node {
    let hasher = KeyedHasher::new(HashParams::light()).unwrap();
    Node::new(Blockchain::new(difficulty, Amount::from_num(reward), hasher))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_double_spend_admits_one() {
    let node = node(1, 5.0);
    let alice = Arc::new(Wallet::from_keypair(KeyPair::generate().unwrap()));
    node.mine_pending(&alice.address(), MiningControl::new())
        .await
        .unwrap();
    let hasher = node.with_chain(|c| c.hasher().clone());

    let mut handles = Vec::new();
    for i in 0..8 {
        let node = node.clone();
        let tx = alice
            .create_transaction(&format!("recipient-{}", i), Amount::from_num(4), &hasher)
            .unwrap();
        handles.push(tokio::spawn(async move { node.add_transaction(tx).is_ok() }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(node.get_pending_transactions().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_admission_during_mining_stays_pending() {
    // High enough that the first search is still running when the late
    // transaction arrives.
    let node = node(3, 5.0);
    let alice = Wallet::from_keypair(KeyPair::generate().unwrap());
    let hasher = node.with_chain(|c| c.hasher().clone());
    node.mine_pending(&alice.address(), MiningControl::new())
        .await
        .unwrap();

    let first = alice
        .create_transaction("bob", Amount::from_num(1), &hasher)
        .unwrap();
    node.add_transaction(first).unwrap();

    let miner = node.clone();
    let address = alice.address();
    let mining = tokio::spawn(async move { miner.mine_pending(&address, MiningControl::new()).await });

    tokio::time::sleep(Duration::from_millis(5)).await;
    let late = alice
        .create_transaction("carol", Amount::from_num(1), &hasher)
        .unwrap();
    node.add_transaction(late.clone()).unwrap();

    let (block, _) = mining.await.unwrap().unwrap();
    assert_eq!(block.index, 2);
    assert_eq!(node.get_balance("bob"), Amount::from_num(1));

    // The late transfer was either in the template or is still waiting.
    let pending = node.get_pending_transactions();
    let included = block.transactions.contains(&late);
    assert_eq!(included, pending.is_empty());
    if !included {
        assert_eq!(pending, vec![late]);
    }
    assert!(node.is_valid_chain());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_stops_running_search() {
    let node = node(64, 1.0);
    let control = MiningControl::new();

    let miner = node.clone();
    let worker_control = control.clone();
    let mining = tokio::spawn(async move { miner.mine_pending("m", worker_control).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    control.cancel();

    let result = tokio::time::timeout(Duration::from_secs(30), mining)
        .await
        .expect("mining did not stop after cancel")
        .unwrap();
    assert!(matches!(result, Err(ChainError::MiningCancelled)));
    assert_eq!(node.chain_len(), 1);
}

#[tokio::test]
async fn test_snapshot_written_after_each_block() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chain.json");
    let store = Arc::new(JsonFilePersistence::new(&path));
    let node = node(1, 2.5).with_persistence(store.clone());

    node.mine_pending("m1", MiningControl::new()).await.unwrap();
    node.mine_pending("m2", MiningControl::new()).await.unwrap();

    let restored = store.load_blockchain().unwrap().unwrap();
    assert_eq!(restored.len(), 3);
    assert_eq!(restored.get_balance("m2"), Amount::from_num(2.5));
    assert_eq!(restored.chain(), node.chain_snapshot().blocks.as_slice());
}
