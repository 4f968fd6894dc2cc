#![forbid(unsafe_code)]
//! Prints a fresh Ed25519 key pair as JSON.

use aetherium_nova::crypto::generate_keypair;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let keypair = generate_keypair();
    let json = serde_json::json!({
        "publicKey": keypair.public_key_hex(),
        "secretKey": keypair.secret_key_hex(),
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
