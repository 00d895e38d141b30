//! Reference code allocation
//!
//! Codes are `CA` followed by six digits. The store's uniqueness constraint
//! is the arbiter; a collision triggers regeneration up to
//! `MAX_REFERENCE_ATTEMPTS` times.

use super::error::{StoreError, VotingError, VotingResult};
use super::issuer::MAX_TOKEN_ATTEMPTS;
use super::traits::VotingStore;
use super::types::{GrantApplication, NewApplication, Timestamp, TokenGrant, VoteToken};
use rand::Rng;

/// Prefix of every reference code
pub const REFERENCE_PREFIX: &str = "CA";

/// Attempts before giving up with `ReferenceCodeCollision`
pub const MAX_REFERENCE_ATTEMPTS: u32 = 8;

/// Generate a random reference code
pub fn generate_reference_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{}{:06}", REFERENCE_PREFIX, n)
}

/// Persist `application` under a fresh reference code together with the
/// tokens produced by `mint_grants`, in a single store write.
///
/// `next_code` supplies candidates; production callers pass
/// `generate_reference_code`. A conflict on the reference code draws a new
/// code, any other conflict (a token string already in use) re-mints the
/// grants.
pub async fn allocate<S, F, M>(
    store: &S,
    application: &NewApplication,
    created_at: Timestamp,
    mut next_code: F,
    mut mint_grants: M,
) -> VotingResult<(GrantApplication, Vec<VoteToken>)>
where
    S: VotingStore + ?Sized,
    F: FnMut() -> String,
    M: FnMut() -> VotingResult<Vec<TokenGrant>>,
{
    let mut code = next_code();
    let mut grants = mint_grants()?;
    let mut reference_attempts = 1;
    let mut token_attempts = 1;

    loop {
        match store
            .insert_application(application, &code, &grants, created_at)
            .await
        {
            Ok(created) => return Ok(created),
            Err(StoreError::Conflict(what)) => {
                if store.get_application_by_reference(&code).await?.is_some() {
                    if reference_attempts >= MAX_REFERENCE_ATTEMPTS {
                        tracing::error!(
                            attempts = MAX_REFERENCE_ATTEMPTS,
                            "reference code space exhausted or generator misconfigured"
                        );
                        return Err(VotingError::ReferenceCodeCollision {
                            attempts: MAX_REFERENCE_ATTEMPTS,
                        });
                    }
                    tracing::debug!(
                        attempt = reference_attempts,
                        reference_code = %code,
                        "reference code collision, regenerating"
                    );
                    reference_attempts += 1;
                    code = next_code();
                } else {
                    if token_attempts >= MAX_TOKEN_ATTEMPTS {
                        return Err(VotingError::TokenCollision {
                            attempts: MAX_TOKEN_ATTEMPTS,
                        });
                    }
                    tracing::warn!(
                        attempt = token_attempts,
                        conflict = %what,
                        "token conflict, reminting"
                    );
                    token_attempts += 1;
                    grants = mint_grants()?;
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}
