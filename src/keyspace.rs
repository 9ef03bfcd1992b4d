//! Physical keyspace naming.
//!
//! Keyspace names must match `[A-Za-z][A-Za-z0-9_]{0,47}`. Logical names are
//! arbitrary strings, so they are mapped into that charset deterministically,
//! falling back to a hash suffix when the mapped form would be invalid or too
//! long.

use base64::{Engine, engine::general_purpose::STANDARD_NO_PAD};
use sha1::{Digest, Sha1};

/// Upper bound the underlying engine places on keyspace names.
pub const MAX_NAME_LEN: usize = 48;

const INFIX: &str = "_T_";

fn charset_valid(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Encode `input` into a name of at most `len` characters drawn from
/// `[A-Za-z0-9_]`.
///
/// Underscores are doubled before dots become underscores, so `a.b` and
/// `a_b` stay distinct. Inputs that survive that mapping unchanged are used
/// directly; anything else keeps a readable prefix and is completed with a
/// SHA-1 of the original input.
pub fn encode(input: &str, len: usize) -> String {
    let mapped = input.replace('_', "__").replace('.', "_");
    if mapped.len() <= len && charset_valid(&mapped) {
        return mapped;
    }

    let run = mapped
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    let mut out = mapped[..run.min(len * 2 / 3)].to_string();

    let digest = Sha1::digest(input.as_bytes());
    let hash = STANDARD_NO_PAD.encode(digest).replace(['+', '/'], "_");
    let fill = (len - out.len()).min(hash.len());
    out.push_str(&hash[..fill]);
    out
}

/// Derive the physical keyspace name for `(reverse_domain, table)`.
///
/// The `_T_` infix keeps a domain and a table that share a prefix from
/// colliding. Total length never exceeds [`MAX_NAME_LEN`].
pub fn keyspace_name(reverse_domain: &str, table: &str) -> String {
    let domain_len = MAX_NAME_LEN
        .saturating_sub(table.len() + INFIX.len())
        .max(26);
    let prefix = encode(reverse_domain, domain_len);
    let table_len = MAX_NAME_LEN - prefix.len() - INFIX.len();
    format!("{prefix}{INFIX}{}", encode(table, table_len))
}
