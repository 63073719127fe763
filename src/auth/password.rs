//! Argon2id password hashing.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;

use super::error::AuthError;

/// Build a hasher with the configured time cost (the work factor knob);
/// memory and parallelism stay at the argon2 defaults.
pub fn hasher(time_cost: u32) -> Result<Argon2<'static>, AuthError> {
    let params = Params::new(
        Params::DEFAULT_M_COST,
        time_cost,
        Params::DEFAULT_P_COST,
        None,
    )
    .map_err(|err| anyhow::anyhow!("invalid argon2 parameters: {err}"))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password with a freshly generated salt.
pub fn hash_password(argon2: &Argon2<'static>, password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

/// Compare a plain password against a stored PHC hash.
///
/// A mismatch is a normal outcome (`Ok(false)`); only an unparsable stored
/// hash is an error.
pub fn verify_password(
    argon2: &Argon2<'static>,
    password: &str,
    password_hash: &str,
) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|err| anyhow::anyhow!("corrupt stored password hash: {err}"))?;
    Ok(argon2.verify_password(password.as_bytes(), &parsed).is_ok())
}
