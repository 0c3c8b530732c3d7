//! Authentication primitives shared by the services in this workspace
//!
//! - Password hashing (Argon2id)
//! - HS256 access-token issuance and validation
//! - An injectable clock for time-dependent checks
//!
//! Nothing here knows about users or storage: services implement
//! [`TokenSubject`] for their own user type and own the orchestration.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).unwrap());
//! ```
//!
//! ## Tokens
//! ```
//! use auth::{TokenService, TokenSubject};
//! use chrono::Duration;
//!
//! struct User;
//!
//! impl TokenSubject for User {
//!     fn user_id(&self) -> String {
//!         "42".to_string()
//!     }
//!
//!     fn username(&self) -> &str {
//!         "alice"
//!     }
//! }
//!
//! let tokens = TokenService::new(b"secret_key_at_least_32_bytes_long!", Duration::hours(1));
//! let token = tokens.generate(&User).unwrap();
//!
//! assert!(tokens.validate(&token));
//! assert_eq!(tokens.extract_username(&token).unwrap(), "alice");
//! ```

pub mod clock;
pub mod jwt;
pub mod password;

pub use clock::Clock;
pub use clock::FixedClock;
pub use clock::SystemClock;
pub use jwt::TokenClaims;
pub use jwt::TokenError;
pub use jwt::TokenService;
pub use jwt::TokenSubject;
pub use password::PasswordError;
pub use password::PasswordHasher;
