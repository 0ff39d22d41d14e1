use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Teacher,
    Administrator,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            "administrator" => Some(Role::Administrator),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Administrator => "administrator",
        }
    }
}

/// An authenticated identity. `account_id` is the 8-digit account number for
/// students and teachers, or the username for administrators.
#[derive(Debug, Clone)]
pub struct Principal {
    pub role: Role,
    pub account_id: String,
    pub display_name: String,
}

#[derive(Debug)]
pub enum AuthOutcome {
    Authenticated {
        principal: Principal,
        legacy_secret: bool,
    },
    NotFound,
    InvalidSecret,
}

/// Validates an identity + secret against the table implied by `role`.
/// Read-only; each role dispatches to a fixed statement, never a string-built
/// table name.
pub fn authenticate(
    conn: &Connection,
    role: Role,
    account_id: &str,
    secret: &str,
) -> anyhow::Result<AuthOutcome> {
    let Some((display_name, stored)) = lookup_stored(conn, role, account_id)? else {
        return Ok(AuthOutcome::NotFound);
    };

    match verify_secret(secret, &stored) {
        SecretCheck::HashMatch => Ok(AuthOutcome::Authenticated {
            principal: Principal {
                role,
                account_id: account_id.to_string(),
                display_name,
            },
            legacy_secret: false,
        }),
        SecretCheck::LegacyPlainMatch => {
            warn!(
                role = role.as_str(),
                account = account_id,
                "stored secret is plain text; row needs hash migration"
            );
            Ok(AuthOutcome::Authenticated {
                principal: Principal {
                    role,
                    account_id: account_id.to_string(),
                    display_name,
                },
                legacy_secret: true,
            })
        }
        SecretCheck::Mismatch => Ok(AuthOutcome::InvalidSecret),
    }
}

fn lookup_stored(
    conn: &Connection,
    role: Role,
    account_id: &str,
) -> anyhow::Result<Option<(String, String)>> {
    let row = match role {
        Role::Administrator => conn
            .query_row(
                "SELECT name, password FROM administrators WHERE username = ?",
                [account_id],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
            )
            .optional()?,
        Role::Student => {
            let Ok(account_no) = account_id.parse::<i64>() else {
                return Ok(None);
            };
            conn.query_row(
                "SELECT name, password FROM students WHERE account_no = ?",
                [account_no],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
            )
            .optional()?
        }
        Role::Teacher => {
            let Ok(account_no) = account_id.parse::<i64>() else {
                return Ok(None);
            };
            conn.query_row(
                "SELECT name, password FROM teachers WHERE account_no = ?",
                [account_no],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
            )
            .optional()?
        }
    };
    Ok(row)
}

#[derive(Debug, PartialEq, Eq)]
pub enum SecretCheck {
    HashMatch,
    LegacyPlainMatch,
    Mismatch,
}

/// Stored format: `sha256$<salt>$<64 lowercase hex digits>`. Rows that do not
/// parse as that format are legacy plain-text secrets and fall back to direct
/// equality. A recognized header with a bad digest is a mismatch, never a
/// fallback.
pub fn verify_secret(secret: &str, stored: &str) -> SecretCheck {
    match parse_stored_hash(stored) {
        Some((salt, digest)) => {
            if salted_digest_hex(salt, secret) == digest.to_ascii_lowercase() {
                SecretCheck::HashMatch
            } else {
                SecretCheck::Mismatch
            }
        }
        None => {
            if secret == stored {
                SecretCheck::LegacyPlainMatch
            } else {
                SecretCheck::Mismatch
            }
        }
    }
}

pub fn hash_secret(secret: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = salted_digest_hex(&salt, secret);
    format!("sha256${}${}", salt, digest)
}

fn parse_stored_hash(stored: &str) -> Option<(&str, &str)> {
    let rest = stored.strip_prefix("sha256$")?;
    let (salt, digest) = rest.split_once('$')?;
    if salt.is_empty() || digest.len() != 64 {
        return None;
    }
    if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some((salt, digest))
}

fn salted_digest_hex(salt: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(secret.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
