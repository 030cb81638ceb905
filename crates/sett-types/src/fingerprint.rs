//! Canonical fingerprints and the shared normalization cache
//!
//! A `CanonicalFingerprint` is a SHA-256 content hash of a type's
//! canonical form: equal fingerprints guarantee semantic equality. The
//! hash is computed over a context-independent byte encoding, which also
//! serves as the payload of the cross-module `NormalCache` so any context
//! can re-intern a cached normal form.
//!
//! Cache entries are populated monotonically with insert-if-absent
//! semantics; recomputation always yields an identical value, so the
//! cache may be shared across concurrently checking modules.

use crate::context::TypeContext;
use crate::error::TypeError;
use crate::normalize::{Normalizer, StepBudget};
use crate::ty::{AtomicType, OpaqueId, OpaqueType, Type, TypeId};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Content hash of a type's canonical form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalFingerprint([u8; 32]);

impl CanonicalFingerprint {
    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CanonicalFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

// Encoding tags. The encoding is structural and context-independent:
// children are encoded inline, never as TypeIds.
const TAG_ATOMIC: u8 = 0x01;
const TAG_SUM: u8 = 0x02;
const TAG_PRODUCT: u8 = 0x03;
const TAG_INTERSECTION: u8 = 0x04;
const TAG_NEGATION: u8 = 0x05;
const TAG_OPAQUE: u8 = 0x06;
const TAG_TRAIT_REF: u8 = 0x07;
const TAG_META_LIFT: u8 = 0x08;
const TAG_SELF: u8 = 0x09;
const TAG_NEVER: u8 = 0x0a;
const TAG_ANY: u8 = 0x0b;
const TAG_UNIVERSE: u8 = 0x0c;
const TAG_ERROR: u8 = 0x0d;

/// Encode a type into the canonical byte form
pub fn encode(ctx: &TypeContext, id: TypeId, out: &mut Vec<u8>) {
    let Some(ty) = ctx.get(id) else {
        out.push(TAG_ERROR);
        return;
    };

    match ty {
        Type::Atomic(a) => {
            out.push(TAG_ATOMIC);
            out.push(*a as u8);
        }
        Type::Sum(s) => {
            out.push(TAG_SUM);
            push_len(out, s.members.len());
            for &member in &s.members {
                encode(ctx, member, out);
            }
        }
        Type::Product(p) => {
            out.push(TAG_PRODUCT);
            push_len(out, p.components.len());
            for &component in &p.components {
                encode(ctx, component, out);
            }
        }
        Type::Intersection(x) => {
            out.push(TAG_INTERSECTION);
            push_len(out, x.members.len());
            for &member in &x.members {
                encode(ctx, member, out);
            }
        }
        Type::Negation(n) => {
            out.push(TAG_NEGATION);
            encode(ctx, n.inner, out);
        }
        Type::Opaque(o) => {
            out.push(TAG_OPAQUE);
            out.extend_from_slice(&o.identity.as_u32().to_le_bytes());
            push_len(out, o.name.len());
            out.extend_from_slice(o.name.as_bytes());
            encode(ctx, o.inner, out);
        }
        Type::TraitRef(name) => {
            out.push(TAG_TRAIT_REF);
            push_len(out, name.len());
            out.extend_from_slice(name.as_bytes());
        }
        Type::MetaLift(m) => {
            out.push(TAG_META_LIFT);
            encode(ctx, m.predicate, out);
        }
        Type::SelfParam => out.push(TAG_SELF),
        Type::Never => out.push(TAG_NEVER),
        Type::Any => out.push(TAG_ANY),
        Type::TypeUniverse => out.push(TAG_UNIVERSE),
        Type::Error => out.push(TAG_ERROR),
    }
}

/// Decode a canonical byte form, interning into the given context
pub fn decode(ctx: &mut TypeContext, bytes: &[u8]) -> Result<TypeId, TypeError> {
    let mut cursor = 0usize;
    let id = decode_at(ctx, bytes, &mut cursor)?;
    if cursor != bytes.len() {
        return Err(TypeError::CorruptEncoding {
            reason: "trailing bytes".into(),
        });
    }
    Ok(id)
}

fn decode_at(ctx: &mut TypeContext, bytes: &[u8], cursor: &mut usize) -> Result<TypeId, TypeError> {
    let tag = take(bytes, cursor, 1)?[0];
    match tag {
        TAG_ATOMIC => {
            let raw = take(bytes, cursor, 1)?[0];
            let atom = AtomicType::ALL
                .get(raw as usize)
                .copied()
                .ok_or_else(|| TypeError::CorruptEncoding {
                    reason: format!("unknown atomic tag {raw}"),
                })?;
            Ok(ctx.intern(Type::Atomic(atom)))
        }
        TAG_SUM => {
            let len = take_len(bytes, cursor)?;
            let mut members = Vec::with_capacity(len);
            for _ in 0..len {
                members.push(decode_at(ctx, bytes, cursor)?);
            }
            Ok(ctx.sum_type(members))
        }
        TAG_PRODUCT => {
            let len = take_len(bytes, cursor)?;
            let mut components = Vec::with_capacity(len);
            for _ in 0..len {
                components.push(decode_at(ctx, bytes, cursor)?);
            }
            Ok(ctx.product_type(components))
        }
        TAG_INTERSECTION => {
            let len = take_len(bytes, cursor)?;
            let mut members = Vec::with_capacity(len);
            for _ in 0..len {
                members.push(decode_at(ctx, bytes, cursor)?);
            }
            Ok(ctx.intersection_type(members))
        }
        TAG_NEGATION => {
            let inner = decode_at(ctx, bytes, cursor)?;
            Ok(ctx.negation_type(inner))
        }
        TAG_OPAQUE => {
            let raw = take(bytes, cursor, 4)?;
            let identity = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            let name_len = take_len(bytes, cursor)?;
            let name_bytes = take(bytes, cursor, name_len)?.to_vec();
            let name =
                String::from_utf8(name_bytes).map_err(|_| TypeError::CorruptEncoding {
                    reason: "opaque name is not utf-8".into(),
                })?;
            let inner = decode_at(ctx, bytes, cursor)?;
            // Re-intern with the original run-wide identity, not a fresh one.
            Ok(ctx.intern(Type::Opaque(OpaqueType {
                identity: OpaqueId(identity),
                name,
                inner,
            })))
        }
        TAG_TRAIT_REF => {
            let name_len = take_len(bytes, cursor)?;
            let name_bytes = take(bytes, cursor, name_len)?.to_vec();
            let name =
                String::from_utf8(name_bytes).map_err(|_| TypeError::CorruptEncoding {
                    reason: "trait name is not utf-8".into(),
                })?;
            Ok(ctx.trait_ref(name))
        }
        TAG_META_LIFT => {
            let predicate = decode_at(ctx, bytes, cursor)?;
            Ok(ctx.meta_lift(predicate))
        }
        TAG_SELF => Ok(ctx.self_param()),
        TAG_NEVER => Ok(ctx.never_type()),
        TAG_ANY => Ok(ctx.any_type()),
        TAG_UNIVERSE => Ok(ctx.universe_type()),
        TAG_ERROR => Ok(ctx.error_type()),
        other => Err(TypeError::CorruptEncoding {
            reason: format!("unknown tag {other:#x}"),
        }),
    }
}

fn push_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u32).to_le_bytes());
}

fn take<'b>(bytes: &'b [u8], cursor: &mut usize, n: usize) -> Result<&'b [u8], TypeError> {
    let end = cursor.checked_add(n).ok_or_else(|| TypeError::CorruptEncoding {
        reason: "length overflow".into(),
    })?;
    if end > bytes.len() {
        return Err(TypeError::CorruptEncoding {
            reason: "truncated payload".into(),
        });
    }
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}

fn take_len(bytes: &[u8], cursor: &mut usize) -> Result<usize, TypeError> {
    let raw = take(bytes, cursor, 4)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
}

/// Content hash of a tree as it stands (canonical when the tree is)
pub fn hash_type(ctx: &TypeContext, id: TypeId) -> CanonicalFingerprint {
    let mut bytes = Vec::new();
    encode(ctx, id, &mut bytes);
    let digest = Sha256::digest(&bytes);
    CanonicalFingerprint(digest.into())
}

/// Semantic fingerprint: normalize, then hash the canonical form
pub fn fingerprint(ctx: &mut TypeContext, id: TypeId) -> Result<CanonicalFingerprint, TypeError> {
    let normal = Normalizer::new(ctx).normalize(id)?;
    Ok(hash_type(ctx, normal))
}

/// Cross-module normalization cache keyed by content hash
///
/// Payloads are canonical encodings, so entries written by one module's
/// context can be re-interned into another's. Writes are idempotent
/// insert-if-absent; aborting a run between modules leaves every entry
/// self-consistent.
#[derive(Debug, Default)]
pub struct NormalCache {
    entries: DashMap<CanonicalFingerprint, Arc<Vec<u8>>>,
}

impl NormalCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize through the cache with the default budget
    pub fn normalize(&self, ctx: &mut TypeContext, id: TypeId) -> Result<TypeId, TypeError> {
        self.normalize_with_budget(ctx, id, StepBudget::default())
    }

    /// Normalize through the cache with an explicit budget
    pub fn normalize_with_budget(
        &self,
        ctx: &mut TypeContext,
        id: TypeId,
        budget: StepBudget,
    ) -> Result<TypeId, TypeError> {
        let key = hash_type(ctx, id);
        if let Some(entry) = self.entries.get(&key) {
            let payload = Arc::clone(&entry);
            drop(entry);
            return decode(ctx, &payload);
        }

        let normal = Normalizer::with_budget(ctx, budget).normalize(id)?;
        let mut payload = Vec::new();
        encode(ctx, normal, &mut payload);
        self.entries.entry(key).or_insert_with(|| Arc::new(payload));
        Ok(normal)
    }

    /// Number of cached normal forms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_fingerprint_equality() {
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let str_ = ctx.str_type();

        let ab = ctx.sum_type(vec![int, str_]);
        let neg2 = {
            let n = ctx.negation_type(ab);
            ctx.negation_type(n)
        };

        // !!(int | str) and int | str share a fingerprint.
        let fp_sum = fingerprint(&mut ctx, ab).unwrap();
        let fp_neg2 = fingerprint(&mut ctx, neg2).unwrap();
        assert_eq!(fp_sum, fp_neg2);

        let other = ctx.sum_type(vec![int]);
        let fp_other = fingerprint(&mut ctx, other).unwrap();
        assert_ne!(fp_sum, fp_other);
    }

    #[test]
    fn test_encoding_is_context_independent() {
        let mut ctx1 = TypeContext::new();
        let mut ctx2 = TypeContext::new();

        // Interleave extra interning in ctx2 so raw TypeIds diverge.
        let i2 = ctx2.int_type();
        let _noise = ctx2.product_type(vec![i2, i2]);

        let i1 = ctx1.int_type();
        let n1 = ctx1.none_type();
        let sum1 = ctx1.sum_type(vec![i1, n1]);

        let n2 = ctx2.none_type();
        let sum2 = ctx2.sum_type(vec![n2, i2]);

        assert_eq!(hash_type(&ctx1, sum1), hash_type(&ctx2, sum2));
    }

    #[test]
    fn test_cache_round_trip_preserves_opaque_identity() {
        let cache = NormalCache::new();
        let mut ctx1 = TypeContext::new();
        let int = ctx1.int_type();
        let meters = ctx1.opaque_type("Meters", int);

        let normal1 = cache.normalize(&mut ctx1, meters).unwrap();
        let identity1 = ctx1.get(normal1).unwrap().as_opaque().unwrap().identity;

        // A second module hits the cache and re-interns the same identity.
        let mut ctx2 = TypeContext::new();
        let bytes_key = hash_type(&ctx1, meters);
        let restored = {
            let entry = cache.entries.get(&bytes_key).expect("cached");
            decode(&mut ctx2, &entry).unwrap()
        };
        let identity2 = ctx2.get(restored).unwrap().as_opaque().unwrap().identity;
        assert_eq!(identity1, identity2);
    }

    #[test]
    fn test_cache_hit_is_idempotent() {
        let cache = NormalCache::new();
        let mut ctx = TypeContext::new();
        let int = ctx.int_type();
        let never = ctx.never_type();
        let messy = ctx.sum_type(vec![int, never]);

        let first = cache.normalize(&mut ctx, messy).unwrap();
        let second = cache.normalize(&mut ctx, messy).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, int);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_corrupt_payload_rejected() {
        let mut ctx = TypeContext::new();
        assert!(matches!(
            decode(&mut ctx, &[0xff]),
            Err(TypeError::CorruptEncoding { .. })
        ));
        assert!(matches!(
            decode(&mut ctx, &[TAG_SUM, 2, 0, 0, 0, TAG_NEVER]),
            Err(TypeError::CorruptEncoding { .. })
        ));
    }
}
