//! User entity of the account store

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    DomainError, EntitySchema, IntoRecord, Model, Record, Repository, RepositoryError,
    StringFilter, UserId, WhereExpression, codes,
};

use crate::digest::HmacDigest;
use crate::email::Email;

/// Access level of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
    Viewer,
}

impl Role {
    pub const VALUES: &'static [&'static str] = &["admin", "member", "viewer"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "viewer" => Ok(Role::Viewer),
            other => Err(DomainError::validation(format!("unknown role '{}'", other))),
        }
    }
}

static USER_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::builder("User", "users")
        .string("id")
        .string("email")
        .string("display_name")
        .enumeration("role", Role::VALUES)
        .boolean("active")
        .int("login_count")
        .datetime("created_at")
        .nullable_datetime("last_login_at")
        .nullable_string("api_key_digest")
        .unique(&["email"])
        .unique(&["api_key_digest"])
        .build()
});

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub role: Role,
    pub active: bool,
    pub login_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    /// HMAC digest of the user's API key; the key itself is never stored
    #[serde(skip_serializing)]
    pub api_key_digest: Option<String>,
}

impl User {
    /// Checks a presented API key against the stored digest
    pub fn verify_api_key(&self, digest: &HmacDigest, api_key: &str) -> bool {
        self.api_key_digest
            .as_deref()
            .is_some_and(|stored| digest.verify(api_key, stored))
    }
}

impl Model for User {
    type Create = NewUser;
    type Update = UserChanges;

    fn schema() -> &'static EntitySchema {
        &USER_SCHEMA
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("email", self.email.as_str())
            .with("display_name", self.display_name.clone())
            .with("role", self.role.as_str())
            .with("active", self.active)
            .with("login_count", self.login_count)
            .with("created_at", self.created_at)
            .with("last_login_at", self.last_login_at)
            .with("api_key_digest", self.api_key_digest.clone())
    }

    fn from_record(record: &Record) -> Result<Self, DomainError> {
        let email: String = record.required("email")?;
        Ok(Self {
            id: record.required("id")?,
            email: Email::new(email).into_result()?,
            display_name: record.required("display_name")?,
            role: record.parsed("role")?,
            active: record.required("active")?,
            login_count: record.required("login_count")?,
            created_at: record.required("created_at")?,
            last_login_at: record.optional("last_login_at")?,
            api_key_digest: record.optional("api_key_digest")?,
        })
    }
}

/// Data to register a user
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub api_key_digest: Option<String>,
}

impl NewUser {
    /// An active member without an API key
    pub fn new(email: Email, display_name: impl Into<String>) -> Self {
        Self {
            id: UserId::new_v7(),
            email,
            display_name: display_name.into(),
            role: Role::Member,
            created_at: Utc::now(),
            api_key_digest: None,
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Stores the digest of `api_key`
    pub fn api_key(mut self, digest: &HmacDigest, api_key: &str) -> Self {
        self.api_key_digest = Some(digest.digest(api_key));
        self
    }
}

impl IntoRecord for NewUser {
    fn into_record(self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("email", self.email.as_str())
            .with("display_name", self.display_name)
            .with("role", self.role.as_str())
            .with("active", true)
            .with("login_count", 0i64)
            .with("created_at", self.created_at)
            .with("last_login_at", Option::<DateTime<Utc>>::None)
            .with("api_key_digest", self.api_key_digest)
    }
}

/// Changes to a user; only the fields set here are written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    display_name: Option<String>,
    role: Option<Role>,
    active: Option<bool>,
    login_count: Option<i64>,
    last_login_at: Option<Option<DateTime<Utc>>>,
    api_key_digest: Option<Option<String>>,
}

impl UserChanges {
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Records a login at `at`, given the count before it
    pub fn login(mut self, previous_count: i64, at: DateTime<Utc>) -> Self {
        self.login_count = Some(previous_count.saturating_add(1));
        self.last_login_at = Some(Some(at));
        self
    }

    pub fn api_key(mut self, digest: &HmacDigest, api_key: &str) -> Self {
        self.api_key_digest = Some(Some(digest.digest(api_key)));
        self
    }

    pub fn revoke_api_key(mut self) -> Self {
        self.api_key_digest = Some(None);
        self
    }
}

impl IntoRecord for UserChanges {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        if let Some(name) = self.display_name {
            record.set("display_name", name);
        }
        if let Some(role) = self.role {
            record.set("role", role.as_str());
        }
        if let Some(active) = self.active {
            record.set("active", active);
        }
        if let Some(count) = self.login_count {
            record.set("login_count", count);
        }
        if let Some(at) = self.last_login_at {
            record.set("last_login_at", at);
        }
        if let Some(digest) = self.api_key_digest {
            record.set("api_key_digest", digest);
        }
        record
    }
}

/// Where clause pinning a user by email
pub fn by_email(email: &Email) -> WhereExpression<User> {
    WhereExpression::new().field("email", StringFilter::equals(email.as_str()))
}

/// Resolves an API key to its active user
///
/// Unknown keys and inactive users both fail with Unauthorized.
pub async fn authenticate<R>(users: &R, digest: &HmacDigest, api_key: &str) -> Result<User, RepositoryError>
where
    R: Repository<User> + ?Sized,
{
    let filter = WhereExpression::new().field(
        "api_key_digest",
        StringFilter::equals(digest.digest(api_key)),
    );
    match users.find_one(filter, None).await? {
        Some(user) if user.active => Ok(user),
        _ => Err(RepositoryError::Unauthorized(DomainError::unauthorized(
            codes::COMMON_UNAUTHORIZED,
            "invalid API key",
        ))),
    }
}
