//! String interning for names and source paths.
//!
//! Every name and directory that participates in a label is stored exactly
//! once in a process-wide pool. Atoms compare by pool identity, copy for
//! free, and carry a hash assigned when they are first inserted. That hash
//! never changes for the lifetime of the process, which lets labels cache
//! their own composite hashes.
//!
//! ```rust
//! use kanna::intern::StringAtom;
//!
//! let a = StringAtom::new("renderer");
//! let b = StringAtom::new("renderer");
//! assert_eq!(a, b);
//! assert_eq!(a.pool_hash(), b.pool_hash());
//! ```

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::ops::Deref;
use std::sync::{LazyLock, RwLock};

/// The pool maps interned text to the hash assigned at insertion.
static POOL: LazyLock<RwLock<HashMap<&'static str, u64>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn assigned_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// An interned, immutable string with pool identity.
///
/// Two atoms are equal iff they refer to the same pool entry, so equality is
/// a pointer comparison. The stored hash is the one assigned when the text
/// was first interned; [`Hash`] forwards to it so hash-map placement is
/// stable across the process lifetime.
#[derive(Clone, Copy)]
pub struct StringAtom {
    text: &'static str,
    hash: u64,
}

impl StringAtom {
    /// Intern `s`, returning the existing atom when the bytes are already
    /// present.
    ///
    /// Interning may run concurrently with reads; writers serialize on the
    /// pool lock. Atoms are never dropped from the pool.
    pub fn new(s: impl AsRef<str>) -> Self {
        let s = s.as_ref();

        // Fast path under the read lock.
        {
            let pool = POOL.read().expect("string pool poisoned");
            if let Some((&text, &hash)) = pool.get_key_value(s) {
                return Self { text, hash };
            }
        }

        let mut pool = POOL.write().expect("string pool poisoned");
        // Another writer may have inserted between the locks.
        if let Some((&text, &hash)) = pool.get_key_value(s) {
            return Self { text, hash };
        }

        let text: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let hash = assigned_hash(text);
        pool.insert(text, hash);
        Self { text, hash }
    }

    /// The interned text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.text
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// The hash assigned when this atom was interned.
    #[inline]
    #[must_use]
    pub fn pool_hash(&self) -> u64 {
        self.hash
    }

    /// Identity comparison without going through `PartialEq`.
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        std::ptr::eq(self.text, other.text)
    }
}

impl Default for StringAtom {
    fn default() -> Self {
        Self::new("")
    }
}

impl Deref for StringAtom {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        self.text
    }
}

impl AsRef<str> for StringAtom {
    #[inline]
    fn as_ref(&self) -> &str {
        self.text
    }
}

impl Borrow<str> for StringAtom {
    #[inline]
    fn borrow(&self) -> &str {
        self.text
    }
}

impl PartialEq for StringAtom {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.text, other.text)
    }
}

impl Eq for StringAtom {}

impl PartialOrd for StringAtom {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StringAtom {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(other.text)
    }
}

impl Hash for StringAtom {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for StringAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.text, f)
    }
}

impl fmt::Display for StringAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.text, f)
    }
}

impl From<&str> for StringAtom {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StringAtom {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_gives_identity_equality() {
        let a = StringAtom::new("hello");
        let b = StringAtom::new("hello");
        let c = StringAtom::new("world");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(std::ptr::eq(a.as_str(), b.as_str()));
    }

    #[test]
    fn pool_hash_is_stable_across_lookups() {
        let first = StringAtom::new("stable-hash-probe");
        let again = StringAtom::new("stable-hash-probe");
        assert_eq!(first.pool_hash(), again.pool_hash());
        assert_eq!(first.pool_hash(), assigned_hash("stable-hash-probe"));
    }

    #[test]
    fn atoms_usable_as_map_keys() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(StringAtom::new("key"), 42);
        assert_eq!(map.get(&StringAtom::new("key")), Some(&42));
    }

    #[test]
    fn ordering_is_by_content() {
        let a = StringAtom::new("aaa");
        let b = StringAtom::new("bbb");
        assert!(a < b);
    }

    #[test]
    fn concurrent_interning_converges() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| StringAtom::new("racy-entry")))
            .collect();
        let atoms: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("intern thread"))
            .collect();
        assert!(atoms.windows(2).all(|w| w[0] == w[1]));
    }
}
