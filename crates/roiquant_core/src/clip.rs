//! Polygon primitives and boolean set algebra on ring sets.
//!
//! Rings are ordered closed polygons in full-resolution image coordinates.
//! The boolean kernel is a Greiner–Hormann clipper restricted to transversal
//! edge crossings; crossing-free pairs (nested, identical, disjoint) are
//! resolved by containment instead. Holes are not modeled: a difference
//! whose clip ring lies strictly inside the subject returns the subject
//! outline unchanged, and `path_area` sums ring areas without subtracting
//! nested rings.

/// One (x, y) vertex in image coordinates.
pub type Point2 = [f64; 2];

/// One closed polygon ring.
pub type Ring = Vec<Point2>;

// =============================================================================
// Constants
// =============================================================================

/// Strict-interior margin for edge intersection parameters.
/// Crossings at or beyond the endpoints are treated as non-transversal.
const EPS_PARAM: f64 = 1e-9;

/// Parallel-edge rejection threshold for the cross-product denominator.
const EPS_DENOM: f64 = 1e-12;

/// Squared distance below which a point counts as lying on an edge.
const EPS_ON_EDGE_SQ: f64 = 1e-18;

/// Output rings with less area than this are dropped as degenerate.
const EPS_AREA: f64 = 1e-9;

/// Base magnitude of the general-position nudge applied when a ring pair
/// is degenerate (collinear edges, endpoint-incident crossings).
const EPS_NUDGE: f64 = 1e-7;

/// Boolean operation selector for the clipper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    Intersection,
    Union,
    Difference,
}

// =============================================================================
// Scalar primitives
// =============================================================================

#[inline]
fn cross(a: Point2, b: Point2) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

#[inline]
fn sub(a: Point2, b: Point2) -> Point2 {
    [a[0] - b[0], a[1] - b[1]]
}

/// Signed shoelace area of a ring; positive for counter-clockwise order
/// in mathematical axes. Fewer than 3 vertices is zero.
pub fn ring_signed_area(ring: &[Point2]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let n = ring.len();
    let mut acc = 0.0;
    for i in 0..n {
        let p = ring[i];
        let q = ring[(i + 1) % n];
        acc += cross(p, q);
    }
    acc / 2.0
}

/// Absolute shoelace area of a ring.
pub fn ring_area(ring: &[Point2]) -> f64 {
    ring_signed_area(ring).abs()
}

/// Total area of a ring set: the sum of each ring's absolute area.
///
/// Nested rings are NOT treated as holes; a ring inside another adds its
/// area rather than subtracting it. Callers pass disjoint simple regions.
pub fn path_area(rings: &[Ring]) -> f64 {
    rings.iter().map(|r| ring_area(r)).sum()
}

/// Area-weighted centroid of a ring set.
///
/// Each ring contributes its first-moment centroid weighted by its absolute
/// area. Degenerate ring sets fall back to the plain vertex mean; an empty
/// set yields the origin.
pub fn path_centroid(rings: &[Ring]) -> Point2 {
    let mut weight = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for ring in rings {
        let signed = ring_signed_area(ring);
        if signed.abs() < EPS_AREA {
            continue;
        }
        let n = ring.len();
        let mut mx = 0.0;
        let mut my = 0.0;
        for i in 0..n {
            let p = ring[i];
            let q = ring[(i + 1) % n];
            let c = cross(p, q);
            mx += (p[0] + q[0]) * c;
            my += (p[1] + q[1]) * c;
        }
        let w = signed.abs();
        cx += w * (mx / (6.0 * signed));
        cy += w * (my / (6.0 * signed));
        weight += w;
    }
    if weight > 0.0 {
        return [cx / weight, cy / weight];
    }

    let count: usize = rings.iter().map(Vec::len).sum();
    if count == 0 {
        return [0.0, 0.0];
    }
    let mut sx = 0.0;
    let mut sy = 0.0;
    for ring in rings {
        for p in ring {
            sx += p[0];
            sy += p[1];
        }
    }
    [sx / count as f64, sy / count as f64]
}

/// Ray-casting parity test; boundary behavior unspecified.
fn point_in_ring_strict(pt: Point2, ring: &[Point2]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let (x, y) = (pt[0], pt[1]);
    let n = ring.len();
    let mut inside = false;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        if (a[1] > y) != (b[1] > y) {
            let xint = a[0] + (y - a[1]) / (b[1] - a[1]) * (b[0] - a[0]);
            if x < xint {
                inside = !inside;
            }
        }
    }
    inside
}

/// Squared distance from a point to a segment.
fn point_segment_dist_sq(pt: Point2, a: Point2, b: Point2) -> f64 {
    let ab = sub(b, a);
    let ap = sub(pt, a);
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1];
    let t = if len_sq > 0.0 {
        ((ap[0] * ab[0] + ap[1] * ab[1]) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let dx = pt[0] - (a[0] + t * ab[0]);
    let dy = pt[1] - (a[1] + t * ab[1]);
    dx * dx + dy * dy
}

/// Boundary-inclusive point-in-ring test.
pub fn point_in_ring(pt: Point2, ring: &[Point2]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let n = ring.len();
    for i in 0..n {
        if point_segment_dist_sq(pt, ring[i], ring[(i + 1) % n]) < EPS_ON_EDGE_SQ {
            return true;
        }
    }
    point_in_ring_strict(pt, ring)
}

// =============================================================================
// Greiner–Hormann clipper
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Node {
    pt: Point2,
    next: usize,
    prev: usize,
    neighbor: usize,
    entry: bool,
    visited: bool,
    intersection: bool,
}

impl Node {
    fn vertex(pt: Point2) -> Self {
        Self {
            pt,
            next: 0,
            prev: 0,
            neighbor: usize::MAX,
            entry: false,
            visited: false,
            intersection: false,
        }
    }

    fn crossing(pt: Point2) -> Self {
        Self {
            intersection: true,
            ..Self::vertex(pt)
        }
    }
}

struct CrossingRec {
    subj_edge: usize,
    subj_alpha: f64,
    clip_edge: usize,
    clip_alpha: f64,
    pt: Point2,
}

/// Every vertex of `a` inside (boundary-inclusive) ring `b`.
fn ring_contained(a: &[Point2], b: &[Point2]) -> bool {
    a.iter().all(|&p| point_in_ring(p, b))
}

/// Whether a point lies on the ring's boundary.
fn point_on_ring_boundary(pt: Point2, ring: &[Point2]) -> bool {
    let n = ring.len();
    (0..n).any(|i| point_segment_dist_sq(pt, ring[i], ring[(i + 1) % n]) < EPS_ON_EDGE_SQ)
}

/// Probe points (vertices and edge midpoints) of a ring.
fn ring_probes(ring: &[Point2]) -> impl Iterator<Item = Point2> + '_ {
    let n = ring.len();
    (0..n).flat_map(move |i| {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        [a, [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0]]
    })
}

/// Heuristic for partially overlapping rings whose boundary contact is
/// entirely degenerate (collinear edges, shared corners): any probe point
/// of one ring strictly inside the other.
fn partial_overlap_suspected(a: &[Point2], b: &[Point2]) -> bool {
    ring_probes(a).any(|p| point_in_ring_strict(p, b))
        || ring_probes(b).any(|p| point_in_ring_strict(p, a))
}

/// Nudge a ring into general position by a sub-resolution translation
/// whose direction is derived deterministically from the coordinates, so
/// repeated clips of already-nudged output do not re-align.
fn nudge_ring(ring: &[Point2]) -> Ring {
    let mut h = 0x9E37_79B9_7F4A_7C15u64;
    for p in ring {
        h ^= p[0].to_bits().rotate_left(17) ^ p[1].to_bits();
        h = h.wrapping_mul(0x2545_F491_4F6C_DD1D);
    }
    let fx = 0.5 + (h & 0xFFFF) as f64 / 65536.0;
    let fy = 0.5 + ((h >> 16) & 0xFFFF) as f64 / 65536.0;
    ring.iter()
        .map(|p| [p[0] + EPS_NUDGE * fx, p[1] + EPS_NUDGE * fy])
        .collect()
}

/// Resolve a crossing-free pair by containment.
fn no_crossing_result(
    subject: &[Point2],
    clip: &[Point2],
    op: BoolOp,
    a_in_b: bool,
    b_in_a: bool,
) -> Vec<Ring> {
    match op {
        BoolOp::Intersection => {
            if a_in_b {
                vec![subject.to_vec()]
            } else if b_in_a {
                vec![clip.to_vec()]
            } else {
                Vec::new()
            }
        }
        BoolOp::Union => {
            if a_in_b {
                vec![clip.to_vec()]
            } else if b_in_a {
                vec![subject.to_vec()]
            } else {
                vec![subject.to_vec(), clip.to_vec()]
            }
        }
        BoolOp::Difference => {
            if a_in_b {
                Vec::new()
            } else if b_in_a {
                // The clip region is a hole this codec cannot represent;
                // the subject outline is returned unchanged.
                vec![subject.to_vec()]
            } else {
                vec![subject.to_vec()]
            }
        }
    }
}

/// Clip one ring pair with the requested boolean operation.
///
/// Only transversal crossings (strictly interior edge parameters) are
/// honored. Crossing-free pairs resolve by containment, so identical rings
/// behave as fully nested ones; pairs whose only contact is degenerate
/// (collinear edges, shared corners) are retried once with the clip ring
/// nudged into general position.
pub fn clip_rings(subject: &[Point2], clip: &[Point2], op: BoolOp) -> Vec<Ring> {
    clip_rings_impl(subject, clip, op, true)
}

fn clip_rings_impl(subject: &[Point2], clip: &[Point2], op: BoolOp, allow_retry: bool) -> Vec<Ring> {
    if subject.len() < 3 {
        return match op {
            BoolOp::Union if clip.len() >= 3 => vec![clip.to_vec()],
            _ => Vec::new(),
        };
    }
    if clip.len() < 3 {
        return match op {
            BoolOp::Intersection => Vec::new(),
            BoolOp::Union | BoolOp::Difference => vec![subject.to_vec()],
        };
    }

    // Phase 1: transversal crossings between every edge pair.
    let n_subj = subject.len();
    let n_clip = clip.len();
    let mut recs: Vec<CrossingRec> = Vec::new();
    for i in 0..n_subj {
        let a1 = subject[i];
        let a2 = subject[(i + 1) % n_subj];
        let d1 = sub(a2, a1);
        for j in 0..n_clip {
            let b1 = clip[j];
            let b2 = clip[(j + 1) % n_clip];
            let d2 = sub(b2, b1);
            let denom = cross(d1, d2);
            if denom.abs() < EPS_DENOM {
                continue;
            }
            let diff = sub(b1, a1);
            let t = cross(diff, d2) / denom;
            let u = cross(diff, d1) / denom;
            if t > EPS_PARAM && t < 1.0 - EPS_PARAM && u > EPS_PARAM && u < 1.0 - EPS_PARAM {
                recs.push(CrossingRec {
                    subj_edge: i,
                    subj_alpha: t,
                    clip_edge: j,
                    clip_alpha: u,
                    pt: [a1[0] + t * d1[0], a1[1] + t * d1[1]],
                });
            }
        }
    }

    if recs.is_empty() {
        let a_in_b = ring_contained(subject, clip);
        let b_in_a = ring_contained(clip, subject);
        if allow_retry {
            let degenerate = if !a_in_b && !b_in_a {
                partial_overlap_suspected(subject, clip)
            } else if op == BoolOp::Difference && b_in_a && !a_in_b {
                // A clip region touching the subject boundary is not an
                // interior hole; re-clipping in general position recovers
                // the real remainder.
                clip.iter().any(|&p| point_on_ring_boundary(p, subject))
            } else {
                false
            };
            if degenerate {
                return clip_rings_impl(subject, &nudge_ring(clip), op, false);
            }
        }
        return no_crossing_result(subject, clip, op, a_in_b, b_in_a);
    }

    if recs.len() % 2 == 1 {
        if allow_retry {
            return clip_rings_impl(subject, &nudge_ring(clip), op, false);
        }
        log::warn!("clip_rings: degenerate crossing configuration; result may be approximate");
    }

    // Phase 2: build both circular chains with crossings inserted in
    // alpha order, then cross-link the twin nodes.
    let mut per_subj: Vec<Vec<usize>> = vec![Vec::new(); n_subj];
    let mut per_clip: Vec<Vec<usize>> = vec![Vec::new(); n_clip];
    for (rid, rec) in recs.iter().enumerate() {
        per_subj[rec.subj_edge].push(rid);
        per_clip[rec.clip_edge].push(rid);
    }
    for list in per_subj.iter_mut() {
        list.sort_by(|&a, &b| recs[a].subj_alpha.total_cmp(&recs[b].subj_alpha));
    }
    for list in per_clip.iter_mut() {
        list.sort_by(|&a, &b| recs[a].clip_alpha.total_cmp(&recs[b].clip_alpha));
    }

    let mut arena: Vec<Node> = Vec::with_capacity(n_subj + n_clip + 2 * recs.len());
    let mut subj_node = vec![usize::MAX; recs.len()];
    let mut clip_node = vec![usize::MAX; recs.len()];

    for (i, &pt) in subject.iter().enumerate() {
        arena.push(Node::vertex(pt));
        for &rid in &per_subj[i] {
            subj_node[rid] = arena.len();
            arena.push(Node::crossing(recs[rid].pt));
        }
    }
    let subj_count = arena.len();
    for (j, &pt) in clip.iter().enumerate() {
        arena.push(Node::vertex(pt));
        for &rid in &per_clip[j] {
            clip_node[rid] = arena.len();
            arena.push(Node::crossing(recs[rid].pt));
        }
    }
    let total = arena.len();

    link_chain(&mut arena, 0, subj_count);
    link_chain(&mut arena, subj_count, total);
    for rid in 0..recs.len() {
        arena[subj_node[rid]].neighbor = clip_node[rid];
        arena[clip_node[rid]].neighbor = subj_node[rid];
    }

    // Phase 3: entry/exit marking, adjusted for the operation.
    mark_entries(&mut arena, 0, clip);
    mark_entries(&mut arena, subj_count, subject);
    match op {
        BoolOp::Intersection => {}
        BoolOp::Union => {
            for node in arena.iter_mut() {
                if node.intersection {
                    node.entry = !node.entry;
                }
            }
        }
        BoolOp::Difference => {
            for node in arena.iter_mut().take(subj_count) {
                if node.intersection {
                    node.entry = !node.entry;
                }
            }
        }
    }

    // Phase 4: traversal.
    let mut results: Vec<Ring> = Vec::new();
    loop {
        let Some(start) = arena
            .iter()
            .position(|n| n.intersection && !n.visited)
        else {
            break;
        };
        let mut ring: Ring = vec![arena[start].pt];
        let mut current = start;
        let budget = 4 * total;
        let mut steps = 0usize;
        loop {
            mark_pair(&mut arena, current);
            let forward = arena[current].entry;
            loop {
                current = if forward {
                    arena[current].next
                } else {
                    arena[current].prev
                };
                if arena[current].intersection {
                    break;
                }
                ring.push(arena[current].pt);
                steps += 1;
                if steps > budget {
                    break;
                }
            }
            mark_pair(&mut arena, current);
            steps += 1;
            if current == start || arena[current].neighbor == start || steps > budget {
                break;
            }
            ring.push(arena[current].pt);
            current = arena[current].neighbor;
        }
        if steps > budget {
            log::warn!("clip_rings: traversal did not close; dropping partial ring");
            continue;
        }
        if ring.len() >= 3 && ring_area(&ring) > EPS_AREA {
            results.push(ring);
        }
    }
    results
}

/// Wire up a circular next/prev chain over `arena[start..end]`.
fn link_chain(arena: &mut [Node], start: usize, end: usize) {
    let len = end - start;
    for i in 0..len {
        let idx = start + i;
        arena[idx].next = start + (i + 1) % len;
        arena[idx].prev = start + (i + len - 1) % len;
    }
}

/// Mark entry/exit flags along one chain against the other ring.
///
/// The inside/outside state is probed at the midpoint of the chain segment
/// ending at the first crossing, which is guaranteed to sit strictly off
/// the other ring's boundary; the state then alternates at each crossing.
fn mark_entries(arena: &mut [Node], chain_start: usize, other: &[Point2]) {
    let mut first = None;
    let mut cur = chain_start;
    loop {
        if arena[cur].intersection {
            first = Some(cur);
            break;
        }
        cur = arena[cur].next;
        if cur == chain_start {
            break;
        }
    }
    let Some(first) = first else {
        return;
    };

    let prev = arena[first].prev;
    let mid = [
        (arena[prev].pt[0] + arena[first].pt[0]) / 2.0,
        (arena[prev].pt[1] + arena[first].pt[1]) / 2.0,
    ];
    let mut inside = point_in_ring_strict(mid, other);

    let mut cur = first;
    loop {
        if arena[cur].intersection {
            arena[cur].entry = !inside;
            inside = !inside;
        }
        cur = arena[cur].next;
        if cur == first {
            break;
        }
    }
}

/// Mark a crossing node and its twin as consumed.
fn mark_pair(arena: &mut [Node], idx: usize) {
    arena[idx].visited = true;
    let nb = arena[idx].neighbor;
    if nb != usize::MAX {
        arena[nb].visited = true;
    }
}

// =============================================================================
// Path-level operations
// =============================================================================

fn valid_rings(path: &[Ring]) -> impl Iterator<Item = &Ring> + '_ {
    path.iter().filter(|r| r.len() >= 3)
}

/// Intersection of two ring sets: all pairwise ring intersections.
pub fn intersect_paths(a: &[Ring], b: &[Ring]) -> Vec<Ring> {
    let mut out = Vec::new();
    for ra in valid_rings(a) {
        for rb in valid_rings(b) {
            out.extend(clip_rings(ra, rb, BoolOp::Intersection));
        }
    }
    out
}

/// Union of two ring sets.
///
/// Seeds the result with every ring and repeatedly merges overlapping pairs
/// until none remain; disjoint rings stay side by side.
pub fn union_paths(a: &[Ring], b: &[Ring]) -> Vec<Ring> {
    let mut rings: Vec<Ring> = valid_rings(a).chain(valid_rings(b)).cloned().collect();
    let mut budget = rings.len() * rings.len() + 1;

    'merge: while budget > 0 {
        budget -= 1;
        for i in 0..rings.len() {
            for j in (i + 1)..rings.len() {
                let touching =
                    !clip_rings(&rings[i], &rings[j], BoolOp::Intersection).is_empty();
                if !touching {
                    continue;
                }
                let merged = clip_rings(&rings[i], &rings[j], BoolOp::Union);
                rings.swap_remove(j);
                rings.swap_remove(i);
                rings.extend(merged);
                continue 'merge;
            }
        }
        break;
    }
    rings
}

/// Difference `a − b`: every ring of `a` folded through every ring of `b`.
pub fn difference_paths(a: &[Ring], b: &[Ring]) -> Vec<Ring> {
    let mut out = Vec::new();
    for ra in valid_rings(a) {
        let mut current = vec![ra.clone()];
        for rb in valid_rings(b) {
            current = current
                .into_iter()
                .flat_map(|r| clip_rings(&r, rb, BoolOp::Difference))
                .collect();
        }
        out.extend(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Ring {
        vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
    }

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    // ==================== Areas & centroids ====================

    #[test]
    fn test_ring_area_square() {
        assert!(approx_eq(ring_area(&rect(0.0, 0.0, 10.0, 10.0)), 100.0, 1e-9));
    }

    #[test]
    fn test_degenerate_ring_area_is_zero() {
        assert_eq!(ring_area(&[[0.0, 0.0], [5.0, 5.0]]), 0.0);
        assert_eq!(path_area(&[]), 0.0);
    }

    #[test]
    fn test_path_area_sums_rings_independently() {
        // Nested ring adds rather than subtracts: documented hole behavior.
        let path = vec![rect(0.0, 0.0, 10.0, 10.0), rect(2.0, 2.0, 4.0, 4.0)];
        assert!(approx_eq(path_area(&path), 104.0, 1e-9));
    }

    #[test]
    fn test_centroid_square() {
        let c = path_centroid(&[rect(0.0, 0.0, 10.0, 10.0)]);
        assert!(approx_eq(c[0], 5.0, 1e-9));
        assert!(approx_eq(c[1], 5.0, 1e-9));
    }

    #[test]
    fn test_centroid_weighted_by_ring_area() {
        // A 2×2 square at origin and a 2×2 square at (10, 0): equal weights.
        let path = vec![rect(0.0, 0.0, 2.0, 2.0), rect(10.0, 0.0, 12.0, 2.0)];
        let c = path_centroid(&path);
        assert!(approx_eq(c[0], 6.0, 1e-9));
        assert!(approx_eq(c[1], 1.0, 1e-9));
    }

    #[test]
    fn test_centroid_empty_path() {
        assert_eq!(path_centroid(&[]), [0.0, 0.0]);
    }

    // ==================== Point in ring ====================

    #[test]
    fn test_point_in_ring_basic() {
        let r = rect(0.0, 0.0, 10.0, 10.0);
        assert!(point_in_ring([5.0, 5.0], &r));
        assert!(!point_in_ring([15.0, 5.0], &r));
        // Boundary is inclusive.
        assert!(point_in_ring([10.0, 5.0], &r));
        assert!(point_in_ring([0.0, 0.0], &r));
    }

    // ==================== Boolean ops: crossing pairs ====================

    #[test]
    fn test_rect_intersection_area() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 5.0, 15.0, 15.0);
        let inter = clip_rings(&a, &b, BoolOp::Intersection);
        assert_eq!(inter.len(), 1);
        assert!(approx_eq(path_area(&inter), 25.0, 1e-9));
    }

    #[test]
    fn test_rect_union_area() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 5.0, 15.0, 15.0);
        let un = clip_rings(&a, &b, BoolOp::Union);
        assert_eq!(un.len(), 1);
        assert!(approx_eq(path_area(&un), 175.0, 1e-9));
    }

    #[test]
    fn test_rect_difference_area() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 5.0, 15.0, 15.0);
        let diff = clip_rings(&a, &b, BoolOp::Difference);
        assert!(approx_eq(path_area(&diff), 75.0, 1e-9));
    }

    #[test]
    fn test_intersection_symmetry() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 5.0, 15.0, 15.0);
        let ab = path_area(&clip_rings(&a, &b, BoolOp::Intersection));
        let ba = path_area(&clip_rings(&b, &a, BoolOp::Intersection));
        assert!(approx_eq(ab, ba, 1e-9));
    }

    #[test]
    fn test_cross_shape_intersection_two_rings() {
        // A tall rect crossed by a wide rect straddling it produces two
        // disjoint pieces when subtracting, and one ring when intersecting.
        let tall = rect(4.0, 0.0, 6.0, 10.0);
        let wide = rect(0.0, 4.0, 10.0, 6.0);
        let inter = clip_rings(&tall, &wide, BoolOp::Intersection);
        assert!(approx_eq(path_area(&inter), 4.0, 1e-9));
        let diff = clip_rings(&tall, &wide, BoolOp::Difference);
        assert_eq!(diff.len(), 2);
        assert!(approx_eq(path_area(&diff), 16.0, 1e-9));
    }

    // ==================== Boolean ops: crossing-free pairs ====================

    #[test]
    fn test_identical_rings() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let inter = clip_rings(&a, &a, BoolOp::Intersection);
        assert!(approx_eq(path_area(&inter), 100.0, 1e-9));
        let un = clip_rings(&a, &a, BoolOp::Union);
        assert!(approx_eq(path_area(&un), 100.0, 1e-9));
        let diff = clip_rings(&a, &a, BoolOp::Difference);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_disjoint_rings() {
        let a = rect(0.0, 0.0, 2.0, 2.0);
        let b = rect(5.0, 5.0, 7.0, 7.0);
        assert!(clip_rings(&a, &b, BoolOp::Intersection).is_empty());
        let un = clip_rings(&a, &b, BoolOp::Union);
        assert_eq!(un.len(), 2);
        assert!(approx_eq(path_area(&un), 8.0, 1e-9));
        let diff = clip_rings(&a, &b, BoolOp::Difference);
        assert!(approx_eq(path_area(&diff), 4.0, 1e-9));
    }

    #[test]
    fn test_nested_rings() {
        let outer = rect(0.0, 0.0, 10.0, 10.0);
        let inner = rect(3.0, 3.0, 5.0, 5.0);
        let inter = clip_rings(&outer, &inner, BoolOp::Intersection);
        assert!(approx_eq(path_area(&inter), 4.0, 1e-9));
        let un = clip_rings(&outer, &inner, BoolOp::Union);
        assert!(approx_eq(path_area(&un), 100.0, 1e-9));
        // Hole cannot be represented: the outline survives unchanged.
        let diff = clip_rings(&outer, &inner, BoolOp::Difference);
        assert!(approx_eq(path_area(&diff), 100.0, 1e-9));
        // Subject fully swallowed: nothing remains.
        let diff2 = clip_rings(&inner, &outer, BoolOp::Difference);
        assert!(diff2.is_empty());
    }

    #[test]
    fn test_degenerate_inputs() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let line = vec![[0.0, 0.0], [5.0, 5.0]];
        assert!(clip_rings(&line, &a, BoolOp::Intersection).is_empty());
        assert!(approx_eq(
            path_area(&clip_rings(&a, &line, BoolOp::Difference)),
            100.0,
            1e-9
        ));
    }

    // ==================== Containment bound ====================

    #[test]
    fn test_intersection_bounded_by_min_area() {
        let pairs = [
            (rect(0.0, 0.0, 10.0, 10.0), rect(5.0, 5.0, 15.0, 15.0)),
            (rect(0.0, 0.0, 4.0, 8.0), rect(1.0, 1.0, 3.0, 3.0)),
            (rect(0.0, 0.0, 2.0, 2.0), rect(8.0, 8.0, 9.0, 9.0)),
        ];
        for (a, b) in pairs {
            let inter = path_area(&clip_rings(&a, &b, BoolOp::Intersection));
            let bound = ring_area(&a).min(ring_area(&b));
            assert!(inter <= bound + 1e-9);
        }
    }

    // ==================== Path-level ops ====================

    // The chained-rectangle fixtures below share collinear edges, so they
    // exercise the general-position nudge; areas are exact to the nudge
    // magnitude rather than machine epsilon.

    #[test]
    fn test_union_paths_merges_chain() {
        // Three rects in a row, each overlapping the next: one merged ring.
        let a = vec![rect(0.0, 0.0, 4.0, 4.0)];
        let b = vec![rect(3.0, 0.0, 7.0, 4.0), rect(6.0, 0.0, 10.0, 4.0)];
        let un = union_paths(&a, &b);
        assert_eq!(un.len(), 1);
        assert!(approx_eq(path_area(&un), 40.0, 1e-4));
    }

    #[test]
    fn test_intersect_paths_multi_ring() {
        // Each ring of `a` overlaps one end of `b` by a 1×2 sliver.
        let a = vec![rect(0.0, 0.0, 2.0, 2.0), rect(10.0, 0.0, 12.0, 2.0)];
        let b = vec![rect(1.0, 0.0, 11.0, 2.0)];
        let inter = intersect_paths(&a, &b);
        assert_eq!(inter.len(), 2);
        assert!(approx_eq(path_area(&inter), 4.0, 1e-4));
    }

    #[test]
    fn test_difference_paths_fold() {
        let a = vec![rect(0.0, 0.0, 10.0, 2.0)];
        let b = vec![rect(2.0, 0.0, 4.0, 2.0), rect(6.0, 0.0, 8.0, 2.0)];
        let diff = difference_paths(&a, &b);
        assert!(approx_eq(path_area(&diff), 12.0, 1e-4));
    }

    #[test]
    fn test_collinear_overlap_recovers_real_intersection() {
        // Same vertical span: every boundary contact is degenerate.
        let a = rect(0.0, 0.0, 6.0, 4.0);
        let b = rect(2.0, 0.0, 8.0, 4.0);
        let inter = clip_rings(&a, &b, BoolOp::Intersection);
        assert!(approx_eq(path_area(&inter), 16.0, 1e-4));
        let un = clip_rings(&a, &b, BoolOp::Union);
        assert!(approx_eq(path_area(&un), 32.0, 1e-4));
    }

    #[test]
    fn test_through_cut_difference_is_not_a_hole() {
        // The clip band spans the subject's full height; the remainder is
        // real geometry, not a dropped interior hole.
        let a = rect(0.0, 0.0, 10.0, 2.0);
        let band = rect(4.0, 0.0, 6.0, 2.0);
        let diff = clip_rings(&a, &band, BoolOp::Difference);
        assert!(approx_eq(path_area(&diff), 16.0, 1e-4));
    }
}
