//! String interning for attribute and slot names.
//!
//! Interned strings compare and hash by pointer, so dictionary lookups on
//! class and instance attributes never touch the string bytes.

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// A string stored once per process.
#[derive(Clone)]
pub struct InternedString(Arc<str>);

impl InternedString {
    /// The string contents.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address of the shared allocation, usable as a stable key.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.0.as_ptr()
    }
}

impl PartialEq for InternedString {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for InternedString {}

impl Hash for InternedString {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.as_ptr() as usize).hash(state);
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static INTERNER: OnceLock<Mutex<FxHashSet<Arc<str>>>> = OnceLock::new();

/// Intern a string, returning the process-wide shared copy.
pub fn intern(s: &str) -> InternedString {
    let mut table = INTERNER
        .get_or_init(|| Mutex::new(FxHashSet::default()))
        .lock();
    if let Some(existing) = table.get(s) {
        return InternedString(existing.clone());
    }
    let shared: Arc<str> = Arc::from(s);
    table.insert(shared.clone());
    InternedString(shared)
}
