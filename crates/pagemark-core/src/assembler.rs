//! Assembly of a frame's corners into registered pages.
//!
//! Corners of one page point at each other: the right arm of each corner aims
//! at the vertex of its clockwise neighbor, whose left arm aims straight back.
//! The assembler links every corner to its nearest such neighbor, walks those
//! links into closed 4-cycles or open 3-chains, and resolves each walk against
//! the registry by partial id. A 3-chain gets its missing corner synthesized
//! from the other three.

use crate::color::DotColor;
use crate::config::DetectorConfig;
use crate::corner::{Corner, Dot};
use crate::geometry::{Point, angle_between};
use crate::page::{CornerSlot, Page, page_angle};
use crate::registry::{PageRegistry, PartialMatch};
use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;
use std::collections::BTreeMap;

/// Longest walk followed from one corner: four hops around a full page.
const MAX_CHAIN: usize = 5;

/// Links corners into pages and resolves them against a [`PageRegistry`].
#[derive(Clone, Copy, Debug)]
pub struct CornerGraphAssembler<'c> {
    config: &'c DetectorConfig,
}

impl<'c> CornerGraphAssembler<'c> {
    /// Create an assembler using the adjacency tolerance in `config`.
    #[must_use]
    pub fn new(config: &'c DetectorConfig) -> Self {
        Self { config }
    }

    /// `true` when `o` sits where `c`'s right arm points and `o`'s left arm
    /// points back at `c`.
    fn adjacent(&self, c: &Corner, o: &Corner) -> bool {
        let tol = self.config.adjacency_angle_tolerance;
        let to_o = o.vertex() - c.vertex();
        let angle1 = angle_between(&(c.rr.position - c.vertex()), &to_o);
        let angle2 = angle_between(&(o.ll.position - o.vertex()), &(-to_o));
        angle1 <= tol && angle2 <= tol
    }

    /// Nearest adjacent corner for every corner, by arena index.
    pub fn successors<'a>(
        &self,
        arena: &'a Bump,
        corners: &[Corner],
    ) -> BumpVec<'a, Option<usize>> {
        let mut next = BumpVec::with_capacity_in(corners.len(), arena);
        for c in corners {
            let mut best: Option<(usize, f64)> = None;
            for (j, o) in corners.iter().enumerate() {
                let dist = (o.vertex() - c.vertex()).norm();
                if dist == 0.0 || !self.adjacent(c, o) {
                    continue;
                }
                if best.is_none_or(|(_, d)| dist < d) {
                    best = Some((j, dist));
                }
            }
            next.push(best.map(|(j, _)| j));
        }
        next
    }

    /// Resolve this frame's corners into pages keyed by page id.
    ///
    /// When several walks resolve to the same page id, the first one wins.
    pub fn assemble<T: Clone>(
        &self,
        arena: &Bump,
        corners: &[Corner],
        registry: &PageRegistry<T>,
    ) -> BTreeMap<u64, Page<T>> {
        let next = self.successors(arena, corners);
        let mut consumed = BumpVec::from_iter_in(corners.iter().map(|_| false), arena);
        let mut pages = BTreeMap::new();

        for start in 0..corners.len() {
            if consumed[start] {
                continue;
            }
            let (chain, len) = walk(&next, start);
            let resolved = match len {
                3 => self.resolve_partial(corners, [chain[0], chain[1], chain[2]], registry),
                5 if chain[4] == chain[0] => {
                    resolve_full(corners, [chain[0], chain[1], chain[2], chain[3]], registry)
                }
                _ => None,
            };
            let Some((page, used)) = resolved else {
                continue;
            };
            for idx in used.into_iter().flatten() {
                consumed[idx] = true;
            }
            if pages.contains_key(&page.id) {
                continue;
            }
            tracing::debug!(
                page_id = page.id,
                synthesized = ?page.synthesized,
                angle = page.angle,
                "resolved page"
            );
            pages.insert(page.id, page);
        }
        pages
    }

    /// Resolve an open chain of three corners, synthesizing the fourth.
    fn resolve_partial<T: Clone>(
        &self,
        corners: &[Corner],
        chain: [usize; 3],
        registry: &PageRegistry<T>,
    ) -> Option<(Page<T>, [Option<usize>; 4])> {
        let [a, b, c] = chain.map(|i| &corners[i]);
        let found = registry.lookup_by_partial(a, b, c)?;
        let missing = synthesize_fourth(a, b, c);
        let quad = [*a, *b, *c, missing];
        let synthesized = CornerSlot::from_index(found.slot.index() + 3);
        Some((
            canonical_page(&quad, found, Some(synthesized)),
            [Some(chain[0]), Some(chain[1]), Some(chain[2]), None],
        ))
    }
}

/// Follow successor links from `start`, at most four hops.
fn walk(next: &[Option<usize>], start: usize) -> ([usize; MAX_CHAIN], usize) {
    let mut chain = [start; MAX_CHAIN];
    let mut len = 1;
    let mut cur = start;
    while len < MAX_CHAIN {
        let Some(n) = next[cur] else { break };
        // A walk may only revisit its start, and only to close a quad.
        if chain[..len].contains(&n) && !(n == start && len == MAX_CHAIN - 1) {
            return (chain, 0);
        }
        chain[len] = n;
        len += 1;
        cur = n;
    }
    (chain, len)
}

/// Resolve a closed 4-cycle, trying each rotation in turn.
fn resolve_full<T: Clone>(
    corners: &[Corner],
    cycle: [usize; 4],
    registry: &PageRegistry<T>,
) -> Option<(Page<T>, [Option<usize>; 4])> {
    let quad = cycle.map(|i| corners[i]);
    (0..4).find_map(|rot| {
        let rotated: [Corner; 4] = std::array::from_fn(|k| quad[(rot + k) % 4]);
        registry
            .lookup_by_partial(&rotated[0], &rotated[1], &rotated[2])
            .map(|found| (canonical_page(&rotated, found, None), cycle.map(Some)))
    })
}

/// The corner following `c` on a page whose previous two corners are `a, b`.
///
/// The vertex completes the parallelogram; the arms mirror the arms of the
/// two neighbors that point at it.
#[must_use]
pub fn synthesize_fourth(a: &Corner, b: &Corner, c: &Corner) -> Corner {
    let vertex = c.vertex() + (a.vertex() - b.vertex());
    let dot = |p: Point| Dot::new(p, DotColor::default());
    Corner::from_dots([
        dot(vertex - (c.rr.position - c.vertex())),
        dot(vertex - (c.r.position - c.vertex())),
        dot(vertex),
        dot(vertex - (a.l.position - a.vertex())),
        dot(vertex - (a.ll.position - a.vertex())),
    ])
}

/// Rotate `quad` into `ulhc, urhc, lrhc, llhc` order and apply template colors.
///
/// `quad[0]` occupies `found.slot` on the template.
fn canonical_page<T: Clone>(
    quad: &[Corner; 4],
    found: PartialMatch<'_, T>,
    synthesized: Option<CornerSlot>,
) -> Page<T> {
    let template = found.template;
    let shift = 4 - found.slot.index();
    let [ulhc, urhc, lrhc, llhc] = std::array::from_fn(|k| {
        quad[(shift + k) % 4].with_colors_of(&template.corners[k])
    });
    Page {
        id: template.id,
        ulhc,
        urhc,
        lrhc,
        llhc,
        angle: page_angle(&ulhc),
        payload: template.payload.clone(),
        synthesized,
    }
}
