//! Integration tests for wallet creation and transaction handling

use argonchain::crypto::{import_private_key, HashParams, KeyPair, KeyedHasher};
use argonchain::mnemonic::{MnemonicCodec, WordList};
use argonchain::transaction::{Amount, Transaction};
use argonchain::wallet::Wallet;

/// Helper to create a codec over the English word list
fn codec() -> MnemonicCodec {
    MnemonicCodec::new(WordList::english())
}

/// Helper to create a cheap hasher
fn hasher() -> Result<KeyedHasher, Box<dyn std::error::Error>> {
    Ok(KeyedHasher::new(HashParams::light())?)
}

#[test]
fn test_wallet_creation() -> Result<(), Box<dyn std::error::Error>> {
    let wallet = Wallet::new(&codec())?;

    let mnemonic = wallet.mnemonic().ok_or("missing mnemonic")?;
    assert_eq!(mnemonic.split(' ').count(), 12);
    assert!(codec().validate(mnemonic).is_ok());
    assert!(!wallet.address().is_empty());

    Ok(())
}

#[test]
fn test_create_two_wallets() -> Result<(), Box<dyn std::error::Error>> {
    let alice = Wallet::new(&codec())?;
    let bob = Wallet::new(&codec())?;

    assert_ne!(alice.address(), bob.address());
    assert_ne!(alice.mnemonic(), bob.mnemonic());

    Ok(())
}

#[test]
fn test_restore_gives_same_address() -> Result<(), Box<dyn std::error::Error>> {
    let original = Wallet::new(&codec())?;
    let mnemonic = original.mnemonic().ok_or("missing mnemonic")?;

    let restored = Wallet::restore(&codec(), mnemonic)?;
    assert_eq!(restored.address(), original.address());

    // Extra whitespace does not change the derived key.
    let spaced = format!("  {}  ", mnemonic.replace(' ', "   "));
    let restored = Wallet::restore(&codec(), &spaced)?;
    assert_eq!(restored.address(), original.address());

    Ok(())
}

#[test]
fn test_restore_rejects_bad_phrases() -> Result<(), Box<dyn std::error::Error>> {
    assert!(Wallet::restore(&codec(), "").is_err());
    assert!(Wallet::restore(&codec(), "abandon abandon abandon").is_err());

    let wallet = Wallet::new(&codec())?;
    let mnemonic = wallet.mnemonic().ok_or("missing mnemonic")?;
    let mut words: Vec<&str> = mnemonic.split(' ').collect();
    words[0] = "argonchain";
    assert!(Wallet::restore(&codec(), &words.join(" ")).is_err());

    Ok(())
}

#[test]
fn test_export_import_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let wallet = Wallet::new(&codec())?;
    let export = wallet.export()?;
    assert_eq!(export.address, wallet.address());
    assert_eq!(export.mnemonic.as_deref(), wallet.mnemonic());

    let imported = Wallet::import(&export.private_key)?;
    assert_eq!(imported.address(), wallet.address());
    assert!(imported.mnemonic().is_none());

    let keypair = import_private_key(&export.private_key)?;
    assert_eq!(&keypair, wallet.keypair());

    // Secrets stay out of debug output.
    let debug = format!("{:?}", export);
    assert!(!debug.contains(&export.private_key));

    Ok(())
}

#[test]
fn test_signed_transaction_is_valid() -> Result<(), Box<dyn std::error::Error>> {
    let hasher = hasher()?;
    let alice = Wallet::new(&codec())?;
    let bob = Wallet::from_keypair(KeyPair::generate()?);

    let tx = alice.create_transaction(&bob.address(), Amount::from_num(1.25), &hasher)?;
    assert_eq!(tx.from.as_deref(), Some(alice.address().as_str()));
    assert!(tx.signature.is_some());
    assert!(tx.is_valid(&hasher));

    let mut forged = tx.clone();
    forged.to = alice.address();
    assert!(!forged.is_valid(&hasher));

    Ok(())
}

#[test]
fn test_transaction_json_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let hasher = hasher()?;
    let alice = Wallet::from_keypair(KeyPair::generate()?);
    let tx = alice.create_transaction("bob", Amount::from_num(3), &hasher)?;

    let json = serde_json::to_string(&tx)?;
    let parsed: Transaction = serde_json::from_str(&json)?;
    assert_eq!(parsed, tx);
    assert!(parsed.is_valid(&hasher));

    Ok(())
}
