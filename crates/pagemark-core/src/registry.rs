//! Page templates keyed by partial identity.
//!
//! Any three cyclically consecutive corners of a page produce one of its four
//! 30-bit partial ids. The registry indexes every template under all four, so
//! a page with one occluded corner still resolves in O(1), and a lookup also
//! reports which template slot the first of the three corners occupies. That
//! slot is what lets the assembler put a rotated page back in canonical order.

use crate::corner::{CORNER_ID_BITS, Corner, ShorthandError};
use crate::page::CornerSlot;
use rand::Rng;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while building a [`PageRegistry`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A corner's shorthand could not be parsed.
    #[error("malformed shorthand for {slot:?} corner: {source}")]
    Malformed {
        /// Which corner of the definition was malformed.
        slot: CornerSlot,
        /// Underlying parse failure.
        #[source]
        source: ShorthandError,
    },
    /// The page shares a partial id with an already registered page, or two
    /// of its own partial ids coincide.
    #[error("partial id {partial_id:#010x} already belongs to page {page_id:#012x}")]
    Collision {
        /// Colliding partial id.
        partial_id: u32,
        /// Page that owns the partial id.
        page_id: u64,
    },
}

/// Pack three corner ids into a 30-bit partial id.
#[inline]
#[must_use]
pub const fn partial_id(a: u16, b: u16, c: u16) -> u32 {
    ((a as u32) << (2 * CORNER_ID_BITS)) | ((b as u32) << CORNER_ID_BITS) | c as u32
}

/// Pack four corners (`ulhc, urhc, lrhc, llhc`) into a 40-bit page id.
#[must_use]
pub fn page_id(corners: &[Corner; 4]) -> u64 {
    corners
        .iter()
        .fold(0u64, |acc, c| (acc << CORNER_ID_BITS) | u64::from(c.id()))
}

/// The four partial ids of a page, indexed by the slot of their first corner.
#[must_use]
pub fn partial_ids(corners: &[Corner; 4]) -> [u32; 4] {
    let ids = corners.map(|c| c.id());
    std::array::from_fn(|k| partial_id(ids[k], ids[(k + 1) % 4], ids[(k + 2) % 4]))
}

/// A registered page: four corners and an application payload.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageTemplate<T> {
    /// 40-bit identity derived from the corners.
    pub id: u64,
    /// Corners in `ulhc, urhc, lrhc, llhc` order.
    pub corners: [Corner; 4],
    /// Application data carried by the page.
    pub payload: T,
}

impl<T> PageTemplate<T> {
    /// Template from corners in `ulhc, urhc, lrhc, llhc` order.
    #[must_use]
    pub fn new(corners: [Corner; 4], payload: T) -> Self {
        Self {
            id: page_id(&corners),
            corners,
            payload,
        }
    }

    /// Template from four shorthand strings.
    pub fn from_shorthand(
        ulhc: &str,
        urhc: &str,
        lrhc: &str,
        llhc: &str,
        payload: T,
    ) -> Result<Self, RegistryError> {
        let mut corners = [Corner::default(); 4];
        for (slot, text) in CornerSlot::ALL.into_iter().zip([ulhc, urhc, lrhc, llhc]) {
            corners[slot.index()] = Corner::from_shorthand(text)
                .map_err(|source| RegistryError::Malformed { slot, source })?;
        }
        Ok(Self::new(corners, payload))
    }

    /// Corner in `slot`.
    #[must_use]
    pub fn corner(&self, slot: CornerSlot) -> &Corner {
        &self.corners[slot.index()]
    }
}

/// Serializable page definition in shorthand form.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageDefinition<T> {
    /// Upper-left corner shorthand.
    pub ulhc: String,
    /// Upper-right corner shorthand.
    pub urhc: String,
    /// Lower-right corner shorthand.
    pub lrhc: String,
    /// Lower-left corner shorthand.
    pub llhc: String,
    /// Application data.
    pub payload: T,
}

/// Result of a partial-id lookup.
#[derive(Debug)]
pub struct PartialMatch<'a, T> {
    /// The matching template.
    pub template: &'a PageTemplate<T>,
    /// Template slot of the first corner passed to the lookup.
    pub slot: CornerSlot,
}

// Manual impls avoid a `T: Clone` bound.
impl<T> Clone for PartialMatch<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PartialMatch<'_, T> {}

/// Store of page templates.
///
/// Built once at startup and then shared by reference with the detector.
#[derive(Debug, Clone)]
pub struct PageRegistry<T> {
    templates: Vec<PageTemplate<T>>,
    by_partial: HashMap<u32, (usize, CornerSlot)>,
    by_id: HashMap<u64, usize>,
}

impl<T> Default for PageRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PageRegistry<T> {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: Vec::new(),
            by_partial: HashMap::new(),
            by_id: HashMap::new(),
        }
    }

    /// Build a registry from shorthand definitions, failing on the first
    /// malformed or colliding page.
    pub fn from_definitions<I>(definitions: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = PageDefinition<T>>,
    {
        let mut registry = Self::new();
        for def in definitions {
            registry.try_register_shorthand(
                &def.ulhc,
                &def.urhc,
                &def.lrhc,
                &def.llhc,
                def.payload,
            )?;
        }
        Ok(registry)
    }

    /// Register a template, reporting why it was refused.
    ///
    /// On error the registry is left unchanged.
    pub fn try_register(&mut self, template: PageTemplate<T>) -> Result<u64, RegistryError> {
        let partials = partial_ids(&template.corners);
        for (k, p) in partials.iter().enumerate() {
            if let Some(&(idx, _)) = self.by_partial.get(p) {
                return Err(RegistryError::Collision {
                    partial_id: *p,
                    page_id: self.templates[idx].id,
                });
            }
            if partials[..k].contains(p) {
                return Err(RegistryError::Collision {
                    partial_id: *p,
                    page_id: template.id,
                });
            }
        }

        let idx = self.templates.len();
        for (slot, p) in CornerSlot::ALL.into_iter().zip(partials) {
            self.by_partial.insert(p, (idx, slot));
        }
        self.by_id.insert(template.id, idx);
        let id = template.id;
        self.templates.push(template);
        tracing::debug!(page_id = id, "registered page");
        Ok(id)
    }

    /// Register a template. Returns `false`, changing nothing, when any of
    /// its partial ids is already taken.
    pub fn register(&mut self, template: PageTemplate<T>) -> bool {
        match self.try_register(template) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "page registration rejected");
                false
            }
        }
    }

    /// Parse and register a page given as four corner shorthands.
    pub fn try_register_shorthand(
        &mut self,
        ulhc: &str,
        urhc: &str,
        lrhc: &str,
        llhc: &str,
        payload: T,
    ) -> Result<u64, RegistryError> {
        let template = PageTemplate::from_shorthand(ulhc, urhc, lrhc, llhc, payload)?;
        self.try_register(template)
    }

    /// Like [`try_register_shorthand`](Self::try_register_shorthand) but
    /// only reports success.
    pub fn register_shorthand(
        &mut self,
        ulhc: &str,
        urhc: &str,
        lrhc: &str,
        llhc: &str,
        payload: T,
    ) -> bool {
        match self.try_register_shorthand(ulhc, urhc, lrhc, llhc, payload) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "page registration rejected");
                false
            }
        }
    }

    /// Find the template containing `a, b, c` as consecutive corners.
    #[must_use]
    pub fn lookup_by_partial(
        &self,
        a: &Corner,
        b: &Corner,
        c: &Corner,
    ) -> Option<PartialMatch<'_, T>> {
        let key = partial_id(a.id(), b.id(), c.id());
        self.by_partial
            .get(&key)
            .map(|&(idx, slot)| PartialMatch {
                template: &self.templates[idx],
                slot,
            })
    }

    /// Template registered under the full page id.
    #[must_use]
    pub fn get(&self, page_id: u64) -> Option<&PageTemplate<T>> {
        self.by_id.get(&page_id).map(|&idx| &self.templates[idx])
    }

    /// Number of registered pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// `true` when no page is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Registered templates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PageTemplate<T>> {
        self.templates.iter()
    }

    /// Draw random corner colors until four corners are found that could be
    /// registered without collision.
    pub fn generate_unused<R: Rng>(
        &self,
        rng: &mut R,
        max_attempts: usize,
    ) -> Option<[Corner; 4]> {
        for _ in 0..max_attempts {
            let corners: [Corner; 4] = std::array::from_fn(|_| {
                Corner::from_id(rng.gen_range(0..(1u16 << CORNER_ID_BITS)))
            });
            let partials = partial_ids(&corners);
            let free = partials.iter().enumerate().all(|(k, p)| {
                !self.by_partial.contains_key(p) && !partials[..k].contains(p)
            });
            if free {
                return Some(corners);
            }
        }
        None
    }
}

impl<'a, T> IntoIterator for &'a PageRegistry<T> {
    type Item = &'a PageTemplate<T>;
    type IntoIter = std::slice::Iter<'a, PageTemplate<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.templates.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const PAGE_ONE: [&str; 4] = ["ygybr", "brgry", "gbgyg", "bgryy"];
    const PAGE_TWO: [&str; 4] = ["yggyg", "rgyrb", "bybbg", "brgrg"];

    fn example_registry() -> PageRegistry<u32> {
        let mut registry = PageRegistry::new();
        let [a, b, c, d] = PAGE_ONE;
        assert!(registry.register_shorthand(a, b, c, d, 1));
        let [a, b, c, d] = PAGE_TWO;
        assert!(registry.register_shorthand(a, b, c, d, 2));
        registry
    }

    fn corners(shorthand: [&str; 4]) -> [Corner; 4] {
        shorthand.map(|s| Corner::from_shorthand(s).unwrap())
    }

    #[test]
    fn test_page_id_packing() {
        let cs = corners(PAGE_ONE);
        let id = page_id(&cs);
        assert!(id < 1 << 40);
        assert_eq!(id >> 30, u64::from(cs[0].id()));
        assert_eq!(id & 0x3ff, u64::from(cs[3].id()));
        for (k, c) in cs.iter().enumerate() {
            let shift = 10 * (3 - k);
            assert_eq!(Corner::from_id(((id >> shift) & 0x3ff) as u16).colors(), c.colors());
        }
    }

    #[test]
    fn test_partial_id_layout() {
        assert_eq!(partial_id(1, 2, 3), (1 << 20) | (2 << 10) | 3);
        assert_eq!(partial_id(0x3ff, 0, 0), 0x3ff << 20);
    }

    #[test]
    fn test_examples_resolve_from_any_three() {
        let registry = example_registry();
        assert_eq!(registry.len(), 2);
        for (shorthand, payload) in [(PAGE_ONE, 1), (PAGE_TWO, 2)] {
            let cs = corners(shorthand);
            for slot in CornerSlot::ALL {
                let k = slot.index();
                let found = registry
                    .lookup_by_partial(&cs[k], &cs[(k + 1) % 4], &cs[(k + 2) % 4])
                    .expect("three consecutive corners resolve");
                assert_eq!(found.template.payload, payload);
                assert_eq!(found.slot, slot);
                assert_eq!(found.template.id, page_id(&cs));
            }
            assert_eq!(registry.get(page_id(&cs)).map(|t| t.payload), Some(payload));
        }
    }

    #[test]
    fn test_wrong_order_does_not_resolve() {
        let registry = example_registry();
        let cs = corners(PAGE_ONE);
        assert!(registry.lookup_by_partial(&cs[2], &cs[1], &cs[0]).is_none());
    }

    #[test]
    fn test_collision_leaves_registry_unchanged() {
        let mut registry = example_registry();
        // Shares (ulhc, urhc, lrhc) with page one.
        let err = registry
            .try_register_shorthand("ygybr", "brgry", "gbgyg", "rrrrr", 3)
            .unwrap_err();
        let cs = corners(PAGE_ONE);
        assert_eq!(
            err,
            RegistryError::Collision {
                partial_id: partial_id(cs[0].id(), cs[1].id(), cs[2].id()),
                page_id: page_id(&cs),
            }
        );
        assert!(!registry.register_shorthand("ygybr", "brgry", "gbgyg", "rrrrr", 3));
        assert_eq!(registry.len(), 2);
        let rrrrr = Corner::from_shorthand("rrrrr").unwrap();
        assert!(registry.lookup_by_partial(&cs[1], &cs[2], &rrrrr).is_none());
        assert_eq!(
            registry.lookup_by_partial(&cs[0], &cs[1], &cs[2]).unwrap().template.payload,
            1
        );
    }

    #[test]
    fn test_self_collision_rejected() {
        let mut registry = PageRegistry::new();
        assert!(!registry.register_shorthand("rgbyr", "rgbyr", "rgbyr", "rgbyr", ()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_malformed_shorthand_is_an_error() {
        let mut registry = PageRegistry::new();
        let err = registry
            .try_register_shorthand("ygybr", "brgr", "gbgyg", "bgryy", ())
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Malformed {
                slot: CornerSlot::Urhc,
                source: ShorthandError::WrongLength(4),
            }
        );
        assert!(!registry.register_shorthand("ygybr", "brgry", "gbgyg", "bgqyy", ()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_from_definitions() {
        let defs = [PAGE_ONE, PAGE_TWO].into_iter().enumerate().map(|(i, s)| PageDefinition {
            ulhc: s[0].to_string(),
            urhc: s[1].to_string(),
            lrhc: s[2].to_string(),
            llhc: s[3].to_string(),
            payload: i,
        });
        let registry = PageRegistry::from_definitions(defs).unwrap();
        assert_eq!(registry.iter().map(|t| t.payload).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!((&registry).into_iter().count(), 2);
    }

    #[test]
    fn test_generate_unused_registers() {
        let mut registry = example_registry();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for n in 0..20 {
            let cs = registry.generate_unused(&mut rng, 100).expect("space is mostly free");
            assert!(registry.register(PageTemplate::new(cs, 10 + n)));
        }
        assert_eq!(registry.len(), 22);
        assert!(registry.generate_unused(&mut rng, 0).is_none());
    }
}
