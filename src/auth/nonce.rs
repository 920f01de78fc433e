/// Pair nonce generation
///
/// Both tokens of an issued pair carry the same nonce in their `tokens`
/// claim, which ties an access token to the refresh token minted with it.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

const PAIR_NONCE_LENGTH: usize = 32;

pub fn generate_pair_nonce() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PAIR_NONCE_LENGTH)
        .map(char::from)
        .collect()
}
