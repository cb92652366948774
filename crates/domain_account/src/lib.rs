//! Account Store Domain
//!
//! Entities and value objects held in the account store:
//!
//! - **User**: a registered user with a role, login statistics and an
//!   optional API key digest
//! - **Email**: a validated, lowercased address
//! - **HmacDigest**: keyed digests for API keys, built once from the server
//!   secret and passed to whoever needs it
//!
//! Value objects are built through [`core_kernel::ActionResult`], so callers
//! branch on success or failure without panics.
//!
//! # Examples
//!
//! ```rust
//! use domain_account::{Email, HmacDigest, NewUser, Role};
//!
//! let digest = HmacDigest::new("a-server-secret-of-at-least-32-bytes")
//!     .into_result()
//!     .unwrap();
//! let email = Email::new("Ada@Example.com").into_result().unwrap();
//!
//! let new_user = NewUser::new(email, "Ada")
//!     .role(Role::Admin)
//!     .api_key(&digest, "ak_live_123");
//! assert_eq!(new_user.email.as_str(), "ada@example.com");
//! ```

pub mod digest;
pub mod email;
pub mod user;

pub use digest::HmacDigest;
pub use email::Email;
pub use user::{authenticate, by_email, NewUser, Role, User, UserChanges};
