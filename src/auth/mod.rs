//! Authentication: password hashing, login tokens, request extraction.

pub mod extractor;
pub mod password;
pub mod token;

pub use extractor::{AuthUser, TOKEN_HEADER};
pub use password::PasswordHasher;
pub use token::{Claims, TokenIssuer};
