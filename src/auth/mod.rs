/// Authentication module
///
/// Handles credential hashing, stateful JWT issuance and validation,
/// and the pair nonce shared by an access/refresh token pair.

mod claims;
mod clock;
mod nonce;
mod password;
mod token;

pub use claims::{Claims, TokenKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use nonce::generate_pair_nonce;
pub use password::{Argon2Hasher, HashError, HashParams, PasswordHasher};
pub use token::{JwtTokenService, TokenError, TokenLifetimes, TokenPair, TokenService};
