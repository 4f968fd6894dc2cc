//! Transaction module split into types and validation for better modularity

pub mod types;
pub mod validation;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::error::ChainError;
    use crate::hashing::transaction_hash;

    fn signed_transfer(keypair: &KeyPair, amount: f64) -> Transaction {
        let recipient = KeyPair::generate().public_key_hex();
        let from = keypair.public_key_hex();
        UnsignedTransaction::transfer(from, recipient, amount, 1_700_000_000_000)
            .sign(keypair)
            .unwrap()
    }

    #[test]
    fn test_tx_validation_success() {
        let keypair = KeyPair::generate();
        let tx = signed_transfer(&keypair, 25.0);
        assert!(tx.validate().is_ok());
        assert_eq!(
            tx.hash,
            transaction_hash(&tx.from, tx.to(), 25.0, tx.timestamp, "TRANSFER")
        );
    }

    #[test]
    fn test_tampered_amount_fails() {
        let keypair = KeyPair::generate();
        let original = signed_transfer(&keypair, 25.0);

        let mut tampered = original.clone();
        tampered.action = TxAction::Transfer {
            to: original.to().to_string(),
            amount: 2500.0,
        };

        assert_ne!(tampered.compute_hash(), original.hash);
        assert!(matches!(
            tampered.verify_signature(),
            Err(ChainError::InvalidTransaction(_))
        ));

        // Re-hashing the mutated fields does not help: the old signature no longer matches.
        tampered.hash = tampered.compute_hash();
        assert!(matches!(
            tampered.verify_signature(),
            Err(ChainError::CryptoError(_))
        ));
    }

    #[test]
    fn test_every_signed_field_is_covered() {
        let keypair = KeyPair::generate();
        let tx = signed_transfer(&keypair, 10.0);

        let mut other_timestamp = tx.clone();
        other_timestamp.timestamp += 1;
        assert_ne!(other_timestamp.compute_hash(), tx.hash);

        let mut other_sender = tx.clone();
        other_sender.from = KeyPair::generate().public_key_hex();
        assert_ne!(other_sender.compute_hash(), tx.hash);

        let mut other_type = tx.clone();
        other_type.action = TxAction::Stake {
            validator: tx.to().to_string(),
            amount: 10.0,
        };
        assert_ne!(other_type.compute_hash(), tx.hash);
    }

    #[test]
    fn test_signature_from_other_key_fails() {
        let keypair = KeyPair::generate();
        let impostor = KeyPair::generate();
        let unsigned = UnsignedTransaction::stake(
            keypair.public_key_hex(),
            KeyPair::generate().public_key_hex(),
            5.0,
            42,
        );
        let tx = unsigned.sign(&impostor).unwrap();
        assert!(tx.validate().is_err());
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let keypair = KeyPair::generate();
        assert!(signed_transfer(&keypair, 0.0).validate().is_err());
        assert!(signed_transfer(&keypair, -3.0).validate().is_err());
    }

    #[test]
    fn test_action_accessors() {
        let action = TxAction::ContractCall {
            contract: "c0ffee".to_string(),
            amount: 1.5,
        };
        assert_eq!(action.tag(), "CONTRACT_CALL");
        assert_eq!(action.target(), "c0ffee");
        assert_eq!(action.amount(), 1.5);
        assert!(!action.is_spend());
        assert!(TxAction::Stake {
            validator: String::new(),
            amount: 1.0
        }
        .is_spend());
    }

    #[test]
    fn test_json_layout_is_flat() {
        let keypair = KeyPair::generate();
        let tx = signed_transfer(&keypair, 12.0);
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "TRANSFER");
        assert_eq!(json["amount"], 12.0);
        assert_eq!(json["from"], tx.from.as_str());

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn test_stake_target_serializes_as_to() {
        let keypair = KeyPair::generate();
        let validator = "validator-0001".to_string();
        let tx = UnsignedTransaction::stake(keypair.public_key_hex(), validator, 5.0, 7)
            .sign(&keypair)
            .unwrap();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "STAKE");
        assert_eq!(json["to"], "validator-0001");
        assert!(json.get("validator").is_none());

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
        assert!(back.verify_signature().is_ok());
    }
}
