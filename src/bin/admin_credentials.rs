//! Generate admin credentials for the environment file.
//! Run with: cargo run --bin admin-credentials
//! Set ADMIN_PASSWORD to also print the Argon2 hash for ADMIN__PASSWORD_HASH.

use digital_house_api::security::{admin_key::generate_key, password::hash_password};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let key = generate_key();
    println!("ADMIN__API_KEY={key}");

    match std::env::var("ADMIN_PASSWORD") {
        Ok(password) if !password.is_empty() => {
            let hash = hash_password(&password)?;
            println!("ADMIN__PASSWORD_HASH={hash}");
        }
        _ => {
            eprintln!("ADMIN_PASSWORD not set; skipping password hash");
        }
    }

    Ok(())
}
