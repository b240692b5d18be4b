//! Disposal-safety classification.
//!
//! A type is *disposal-safe* when dropping a value of it cannot run arbitrary
//! user code: no custom `Drop`, no callback, no re-entry into the cache that
//! owns it. Evicted entries whose key and value types are both safe may be
//! released on the spot instead of going through the purge queue.
//!
//! Two sources feed the answer:
//!
//! - a fixed registry of standard types whose drop glue only frees memory,
//!   held in a process-wide [`TypeSet`] built on first use;
//! - [`std::mem::needs_drop`], which covers every type without drop glue
//!   at all (plain-old-data structs, `Copy` types, references).
//!
//! If the registry could not be built, nothing is treated as safe.
//!
//! ```
//! use std::sync::Arc;
//! use lrudict::dispose::is_disposal_safe;
//!
//! assert!(is_disposal_safe::<u64>());
//! assert!(is_disposal_safe::<String>());
//! assert!(!is_disposal_safe::<Vec<String>>());
//! assert!(!is_disposal_safe::<Arc<Vec<u8>>>());
//! ```

use std::any::TypeId;
use std::sync::{Arc, OnceLock};

use crate::ds::type_set::TypeSet;

static REGISTRY: OnceLock<Option<TypeSet>> = OnceLock::new();

fn registered_types() -> Vec<TypeId> {
    vec![
        TypeId::of::<()>(),
        TypeId::of::<bool>(),
        TypeId::of::<char>(),
        TypeId::of::<u8>(),
        TypeId::of::<u16>(),
        TypeId::of::<u32>(),
        TypeId::of::<u64>(),
        TypeId::of::<u128>(),
        TypeId::of::<usize>(),
        TypeId::of::<i8>(),
        TypeId::of::<i16>(),
        TypeId::of::<i32>(),
        TypeId::of::<i64>(),
        TypeId::of::<i128>(),
        TypeId::of::<isize>(),
        TypeId::of::<f32>(),
        TypeId::of::<f64>(),
        TypeId::of::<String>(),
        TypeId::of::<&'static str>(),
        TypeId::of::<Box<str>>(),
        TypeId::of::<Arc<str>>(),
        TypeId::of::<Vec<u8>>(),
        TypeId::of::<Box<[u8]>>(),
        TypeId::of::<Arc<[u8]>>(),
    ]
}

fn registry() -> Option<&'static TypeSet> {
    REGISTRY
        .get_or_init(|| {
            let set = TypeSet::build(&registered_types());
            if set.is_none() {
                log::warn!("disposal-safety registry unavailable; all evictions will be queued");
            }
            set
        })
        .as_ref()
}

/// Returns `true` if the registry was built successfully.
pub fn registry_available() -> bool {
    registry().is_some()
}

/// Returns `true` if dropping a `T` cannot execute user-defined code.
pub fn is_disposal_safe<T: 'static>() -> bool {
    match registry() {
        Some(set) => set.contains(TypeId::of::<T>()) || !std::mem::needs_drop::<T>(),
        None => false,
    }
}

/// Classifies a key/value pair: both halves must be safe.
pub(crate) fn entry_is_disposal_safe<K: 'static, V: 'static>() -> bool {
    is_disposal_safe::<K>() && is_disposal_safe::<V>()
}
