//! C3 method resolution order.
//!
//! The linearization stored on a type excludes the type itself: a type
//! cannot hold a strong reference to itself, so lookups check the type's
//! own dictionary first and then walk the stored tail.

use crate::object::type_obj::TypeObject;
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;

/// Linearized ancestors, nearest first.
pub type Mro = SmallVec<[Arc<TypeObject>; 8]>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MroError {
    #[error("TypeError: duplicate base class {name}")]
    DuplicateBase { name: String },

    #[error("TypeError: Cannot create a consistent method resolution order (MRO) for bases {bases}")]
    Inconsistent { bases: String },
}

/// Compute the ancestor linearization for a type with the given bases.
pub fn compute_c3_mro(bases: &[Arc<TypeObject>]) -> Result<Mro, MroError> {
    for (i, base) in bases.iter().enumerate() {
        if bases[..i].iter().any(|b| Arc::ptr_eq(b, base)) {
            return Err(MroError::DuplicateBase {
                name: base.name().to_string(),
            });
        }
    }

    let mut sequences: Vec<Vec<Arc<TypeObject>>> = bases
        .iter()
        .map(|base| {
            let mut seq = Vec::with_capacity(base.mro().len() + 1);
            seq.push(base.clone());
            seq.extend(base.mro().iter().cloned());
            seq
        })
        .collect();
    sequences.push(bases.to_vec());

    let mut result = Mro::new();
    loop {
        sequences.retain(|seq| !seq.is_empty());
        if sequences.is_empty() {
            return Ok(result);
        }

        // A good head appears in no other sequence's tail.
        let candidate = sequences
            .iter()
            .map(|seq| &seq[0])
            .find(|head| {
                !sequences
                    .iter()
                    .any(|seq| seq[1..].iter().any(|t| Arc::ptr_eq(t, head)))
            })
            .cloned();

        let Some(next) = candidate else {
            let bases = bases
                .iter()
                .map(|b| b.name().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(MroError::Inconsistent { bases });
        };

        for seq in sequences.iter_mut() {
            if Arc::ptr_eq(&seq[0], &next) {
                seq.remove(0);
            }
        }
        result.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(mro: &Mro) -> Vec<String> {
        mro.iter().map(|t| t.name().to_string()).collect()
    }

    #[test]
    fn test_single_inheritance() {
        let a = TypeObject::builder("A").build().unwrap();
        let b = TypeObject::builder("B").base(a.clone()).build().unwrap();
        let mro = compute_c3_mro(&[b]).unwrap();
        assert_eq!(names(&mro), ["B", "A", "object"]);
    }

    #[test]
    fn test_diamond() {
        let a = TypeObject::builder("A").build().unwrap();
        let b = TypeObject::builder("B").base(a.clone()).build().unwrap();
        let c = TypeObject::builder("C").base(a.clone()).build().unwrap();
        let mro = compute_c3_mro(&[b, c]).unwrap();
        assert_eq!(names(&mro), ["B", "C", "A", "object"]);
    }

    #[test]
    fn test_duplicate_base() {
        let a = TypeObject::builder("A").build().unwrap();
        let err = compute_c3_mro(&[a.clone(), a]).unwrap_err();
        assert!(matches!(err, MroError::DuplicateBase { .. }));
    }

    #[test]
    fn test_inconsistent_order() {
        let a = TypeObject::builder("A").build().unwrap();
        let b = TypeObject::builder("B").base(a.clone()).build().unwrap();
        let err = compute_c3_mro(&[a, b]).unwrap_err();
        assert!(matches!(err, MroError::Inconsistent { .. }));
    }
}
