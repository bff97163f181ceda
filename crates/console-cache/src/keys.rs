//! Cache key registry for every console cache entry.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses. Each resource family is a
//! [`KeyFamily`] that produces both its keys and the patterns that sweep
//! them, so a key and the pattern that must match it cannot drift apart.
//!
//! Key grammar:
//!
//! ```text
//! <namespace>[:<id>](:<param>=<value>)*     parameters sorted by name
//! <namespace>[:<id>]:all                    when there are no parameters
//! ```
//!
//! The terminal `all` segment guarantees that every key has at least one
//! segment after its namespace and after its id, which is what makes
//! `<namespace>:*` and `<namespace>:<id>:*` cover every key of a family.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::pattern::glob_match;

/// Terminal segment used by keys without parameters.
const ALL: &str = "all";

/// Characters that are escaped inside key segments.
const RESERVED: &[char] = &['%', ':', '=', '*', '?', '[', ']', '\\'];

// ── Key and pattern types ──────────────────────────────────

/// A concrete cache key produced by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// The key as stored (without any backend prefix).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A glob pattern used only for bulk deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CacheKeyPattern(String);

impl CacheKeyPattern {
    /// Pattern matching every key owned by the cache.
    pub fn everything() -> Self {
        Self("*".to_string())
    }

    /// The glob as passed to the store.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this pattern matches a key.
    pub fn matches(&self, key: &str) -> bool {
        glob_match(&self.0, key)
    }
}

impl fmt::Display for CacheKeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Parameters ─────────────────────────────────────────────

/// Named request options folded into a key, always in sorted order.
///
/// Absent values and empty strings are dropped, so "no filter" and
/// "filter explicitly cleared" produce the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheParams(BTreeMap<String, String>);

impl CacheParams {
    /// An empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter. Empty values are omitted.
    pub fn with(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.insert(name, value);
        self
    }

    /// Add an optional parameter. `None` and empty values are omitted.
    pub fn with_opt<V: fmt::Display>(mut self, name: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.insert(name, value);
        }
        self
    }

    /// Add a parameter in place.
    pub fn insert(&mut self, name: &str, value: impl fmt::Display) {
        let value = value.to_string();
        if value.is_empty() {
            self.0.remove(name);
        } else {
            self.0.insert(name.to_string(), value);
        }
    }

    /// Whether no parameter survived normalization.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: fmt::Display> FromIterator<(K, V)> for CacheParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name.as_ref(), value);
        }
        params
    }
}

// ── Families ───────────────────────────────────────────────

/// Whether a family's id segment identifies the owning principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScope {
    /// Shared data with no owner.
    Public,
    /// The id segment is a user id; entries are private to that user.
    Principal,
}

/// A resource family: namespace, ownership scope, key and pattern builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFamily {
    namespace: &'static str,
    scope: KeyScope,
}

impl KeyFamily {
    /// A single user entity, by user id.
    pub const USER: Self = Self::principal("user");
    /// Paginated and filtered user listings.
    pub const USERS_LIST: Self = Self::public("users-list");
    /// Effective permissions of one user.
    pub const USER_PERMISSIONS: Self = Self::principal("user-permissions");
    /// Group memberships of one user.
    pub const USER_GROUPS: Self = Self::principal("user-groups");
    /// Profile settings page of one user.
    pub const PROFILE: Self = Self::principal("profile");
    /// A single group entity.
    pub const GROUP: Self = Self::public("group");
    /// Group listings.
    pub const GROUPS_LIST: Self = Self::public("groups-list");
    /// A single permission definition.
    pub const PERMISSION: Self = Self::public("permission");
    /// Permission listings.
    pub const PERMISSIONS_LIST: Self = Self::public("permissions-list");
    /// Dashboard aggregates (counts, overview panels).
    pub const DASHBOARD: Self = Self::public("dashboard");
    /// Notifications of one user.
    pub const NOTIFICATION: Self = Self::principal("notification");
    /// Activity log views.
    pub const ACTIVITY: Self = Self::public("activity");
    /// A single media item.
    pub const MEDIA: Self = Self::public("media");
    /// Media library listings.
    pub const MEDIA_LIST: Self = Self::public("media-list");
    /// System analytics snapshots.
    pub const SYSTEM_ANALYTICS: Self = Self::public("system-analytics");
    /// Project settings.
    pub const PROJECT_SETTINGS: Self = Self::public("project-settings");

    /// Every registered family.
    pub const ALL: [Self; 16] = [
        Self::USER,
        Self::USERS_LIST,
        Self::USER_PERMISSIONS,
        Self::USER_GROUPS,
        Self::PROFILE,
        Self::GROUP,
        Self::GROUPS_LIST,
        Self::PERMISSION,
        Self::PERMISSIONS_LIST,
        Self::DASHBOARD,
        Self::NOTIFICATION,
        Self::ACTIVITY,
        Self::MEDIA,
        Self::MEDIA_LIST,
        Self::SYSTEM_ANALYTICS,
        Self::PROJECT_SETTINGS,
    ];

    const fn public(namespace: &'static str) -> Self {
        Self {
            namespace,
            scope: KeyScope::Public,
        }
    }

    const fn principal(namespace: &'static str) -> Self {
        Self {
            namespace,
            scope: KeyScope::Principal,
        }
    }

    /// Find the family that owns a namespace.
    pub fn lookup(namespace: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.namespace == namespace)
    }

    /// Namespace segment of every key in this family.
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Ownership scope of the id segment.
    pub fn scope(&self) -> KeyScope {
        self.scope
    }

    /// Build a key. See [`build_key`].
    pub fn key(&self, id: Option<&str>, params: &CacheParams) -> CacheKey {
        build_key(*self, id, params)
    }

    /// Key of the entity `id` without parameters.
    pub fn entity(&self, id: &str) -> CacheKey {
        build_key(*self, Some(id), &CacheParams::new())
    }

    /// Key of the family-wide view without id or parameters.
    pub fn root(&self) -> CacheKey {
        build_key(*self, None, &CacheParams::new())
    }

    /// Pattern matching every key in this family.
    pub fn list_pattern(&self) -> CacheKeyPattern {
        build_list_pattern(*self)
    }

    /// Pattern matching every key of this family built with `id`.
    pub fn scoped_pattern(&self, id: &str) -> CacheKeyPattern {
        build_user_scoped_pattern(*self, id)
    }
}

// ── Builders ───────────────────────────────────────────────

/// Build a deterministic key for a family, optional id and parameters.
pub fn build_key(family: KeyFamily, id: Option<&str>, params: &CacheParams) -> CacheKey {
    let mut key = String::from(family.namespace);
    if let Some(id) = id {
        key.push(':');
        key.push_str(&escape_segment(id));
    }
    if params.is_empty() {
        key.push(':');
        key.push_str(ALL);
    } else {
        for (name, value) in params.iter() {
            key.push(':');
            key.push_str(&escape_segment(name));
            key.push('=');
            key.push_str(&escape_segment(value));
        }
    }
    CacheKey(key)
}

/// Pattern covering every key of a family.
pub fn build_list_pattern(family: KeyFamily) -> CacheKeyPattern {
    CacheKeyPattern(format!("{}:*", family.namespace))
}

/// Pattern covering every key of a family built with a given id.
pub fn build_user_scoped_pattern(family: KeyFamily, id: &str) -> CacheKeyPattern {
    CacheKeyPattern(format!("{}:{}:*", family.namespace, escape_segment(id)))
}

// ── Parsing ────────────────────────────────────────────────

/// A live key decomposed back into family and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    /// Owning family.
    pub family: KeyFamily,
    /// Unescaped id segment, when the key has one.
    pub id: Option<String>,
}

/// Parse a key produced by [`build_key`]. Returns `None` for keys
/// outside the registry.
pub fn parse_key(key: &str) -> Option<ParsedKey> {
    let mut segments = key.split(':');
    let family = KeyFamily::lookup(segments.next()?)?;
    let rest: Vec<&str> = segments.collect();

    // An id is present when the second segment is neither a parameter
    // nor the final segment.
    let id = match rest.as_slice() {
        [first, _, ..] if !first.contains('=') => Some(unescape_segment(first)),
        _ => None,
    };

    Some(ParsedKey { family, id })
}

/// Percent-encode reserved characters and whitespace in a key segment.
pub fn escape_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if RESERVED.contains(&c) || c.is_whitespace() {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverse [`escape_segment`].
pub fn unescape_segment(escaped: &str) -> String {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}
