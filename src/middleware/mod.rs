/// Middleware module
///
/// Bearer-token authorization for protected routes.

mod jwt_middleware;

pub use jwt_middleware::{authorize, bearer_token, AuthenticatedUser, JwtMiddleware};
