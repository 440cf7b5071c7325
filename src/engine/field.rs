// Scalar field for the implicit blob surface.
//
// The field is an ephemeral res³ lattice over field space [0,1]³. Every frame
// it is cleared, each body injects a bounded contribution around its mapped
// position, and the isosurface is re-extracted with naive surface nets:
// one vertex per sign-changing cell, one quad per sign-changing lattice edge.
// Quads feed `mesh::triangulate_smooth` for shared-vertex smooth normals.
//
// Output mesh space is field space recentered to [-0.5, 0.5]³, which matches
// simulation space, so the renderer and the mass-center projector share one
// world mapping (mesh units × blob scale).

use glam::Vec3;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Lattice samples per axis.
pub const FIELD_RES: usize = 32;
/// Level-set threshold: samples above this value are inside the surface.
pub const ISO_LEVEL: f32 = 1.0;

// ============================================================================
// FIELD GRID
// ============================================================================

/// The scalar field lattice. `values[(z * res + y) * res + x]` is the field
/// at field-space point (x, y, z) / (res - 1).
pub struct FieldGrid {
    res:    usize,
    values: Vec<f32>,
}

impl FieldGrid {
    pub fn new(res: usize) -> Self {
        debug_assert!(res >= 2, "lattice needs at least one cell per axis");
        Self {
            res,
            values: vec![0.0; res * res * res],
        }
    }

    /// Zero every sample. Call once per frame before injecting bodies.
    pub fn clear(&mut self) {
        self.values.fill(0.0);
    }

    #[inline]
    fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.res + y) * self.res + x
    }

    /// Field value at a lattice point.
    pub fn value_at(&self, x: usize, y: usize, z: usize) -> f32 {
        self.values[self.idx(x, y, z)]
    }

    /// Inject one body's contribution at `center` (field space, [0,1]³).
    ///
    /// The kernel is `strength / (ε + d²) - subtract`, clamped at zero, so a
    /// body's support is the ball of radius sqrt(strength / subtract) and
    /// nearby bodies merge where their contributions sum past ISO_LEVEL.
    /// Only lattice points inside the support's bounding box are visited.
    pub fn add_ball(&mut self, center: Vec3, strength: f32, subtract: f32) {
        let scale = (self.res - 1) as f32;
        let radius = (strength / subtract).sqrt();

        let lo = |c: f32| (((c - radius) * scale).floor().max(0.0)) as usize;
        let hi = |c: f32| ((((c + radius) * scale).ceil()) as usize).min(self.res - 1);
        let (x0, x1) = (lo(center.x), hi(center.x));
        let (y0, y1) = (lo(center.y), hi(center.y));
        let (z0, z1) = (lo(center.z), hi(center.z));

        for z in z0..=z1 {
            let fz = z as f32 / scale - center.z;
            for y in y0..=y1 {
                let fy = y as f32 / scale - center.y;
                for x in x0..=x1 {
                    let fx = x as f32 / scale - center.x;
                    let d2 = fx * fx + fy * fy + fz * fz;
                    let val = strength / (0.000001 + d2) - subtract;
                    if val > 0.0 {
                        self.values[(z * self.res + y) * self.res + x] += val;
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // SURFACE NETS EXTRACTION
    // ------------------------------------------------------------------------

    /// Extract the `iso` level set into `poly` as a quad mesh (naive surface
    /// nets). `cell_vertex` is caller-owned scratch, resized and reused across
    /// frames.
    ///
    /// Pass 1 places one vertex per mixed-sign cell at the average of its
    /// edge crossings. Pass 2 walks every lattice edge; a sign change emits a
    /// quad over the four cells sharing that edge, wound CCW toward the
    /// outside (the sub-iso end of the edge).
    ///
    /// Crossings on the outermost lattice shell are skipped; the simulation's
    /// centering force keeps the surface away from it.
    pub fn polygonize(&self, iso: f32, poly: &mut super::mesh::PolyMesh, cell_vertex: &mut Vec<i32>) {
        poly.clear();
        let res = self.res;
        let cells = res - 1;
        let inv_scale = 1.0 / cells as f32;
        cell_vertex.clear();
        cell_vertex.resize(cells * cells * cells, -1);

        let cell_idx = |x: usize, y: usize, z: usize| (z * cells + y) * cells + x;

        // Corner i of a cell sits at offset (i&1, i>>1&1, i>>2&1).
        const EDGES: [(usize, usize); 12] = [
            (0, 1), (2, 3), (4, 5), (6, 7), // x-aligned
            (0, 2), (1, 3), (4, 6), (5, 7), // y-aligned
            (0, 4), (1, 5), (2, 6), (3, 7), // z-aligned
        ];

        // ---- Pass 1: one vertex per mixed-sign cell ------------------------
        for cz in 0..cells {
            for cy in 0..cells {
                for cx in 0..cells {
                    let mut corner = [0.0f32; 8];
                    let mut inside = 0u32;
                    for (i, c) in corner.iter_mut().enumerate() {
                        let v = self.value_at(cx + (i & 1), cy + ((i >> 1) & 1), cz + ((i >> 2) & 1));
                        *c = v;
                        if v > iso {
                            inside += 1;
                        }
                    }
                    if inside == 0 || inside == 8 {
                        continue;
                    }

                    // Average the edge crossings (linear interpolation).
                    let mut sum = Vec3::ZERO;
                    let mut count = 0u32;
                    for &(a, b) in &EDGES {
                        let (va, vb) = (corner[a], corner[b]);
                        if (va > iso) == (vb > iso) {
                            continue;
                        }
                        let t = (iso - va) / (vb - va);
                        let pa = Vec3::new((a & 1) as f32, ((a >> 1) & 1) as f32, ((a >> 2) & 1) as f32);
                        let pb = Vec3::new((b & 1) as f32, ((b >> 1) & 1) as f32, ((b >> 2) & 1) as f32);
                        sum += pa + (pb - pa) * t;
                        count += 1;
                    }

                    let lattice = Vec3::new(cx as f32, cy as f32, cz as f32) + sum / count as f32;
                    let vi = poly.add_vertex(lattice * inv_scale - Vec3::splat(0.5));
                    cell_vertex[cell_idx(cx, cy, cz)] = vi as i32;
                }
            }
        }

        // ---- Pass 2: one quad per sign-changing lattice edge ---------------
        // Axis triples are the cyclic rotations (d, u, v) of (x, y, z), which
        // keeps quad winding CCW from outside for every axis.
        for axis in 0..3 {
            let d = axis;
            let u = (axis + 1) % 3;
            let v = (axis + 2) % 3;

            let mut p = [0usize; 3];
            for pd in 0..cells {
                p[d] = pd;
                for pu in 1..cells {
                    p[u] = pu;
                    for pv in 1..cells {
                        p[v] = pv;

                        let v0 = self.value_at(p[0], p[1], p[2]);
                        let mut q = p;
                        q[d] += 1;
                        let v1 = self.value_at(q[0], q[1], q[2]);
                        if (v0 > iso) == (v1 > iso) {
                            continue;
                        }

                        // Min corners of the four cells around this edge.
                        let c0 = p;
                        let mut c1 = p;
                        c1[u] -= 1;
                        let mut c2 = c1;
                        c2[v] -= 1;
                        let mut c3 = p;
                        c3[v] -= 1;

                        let fetch = |c: [usize; 3]| cell_vertex[cell_idx(c[0], c[1], c[2])] as usize;
                        let (i0, i1, i2, i3) = (fetch(c0), fetch(c1), fetch(c2), fetch(c3));

                        if v0 > iso {
                            poly.add_face(vec![i0, i1, i2, i3]);
                        } else {
                            poly.add_face(vec![i3, i2, i1, i0]);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mesh::PolyMesh;
    use std::collections::HashMap;

    const STRENGTH: f32 = 0.5;
    const SUBTRACT: f32 = 12.0;

    fn one_ball_grid() -> FieldGrid {
        let mut grid = FieldGrid::new(FIELD_RES);
        grid.add_ball(Vec3::splat(0.5), STRENGTH, SUBTRACT);
        grid
    }

    #[test]
    fn ball_contribution_peaks_at_center_and_decays() {
        let grid = one_ball_grid();
        let mid = (FIELD_RES - 1) / 2;
        let center = grid.value_at(mid, mid, mid);
        let near = grid.value_at(mid + 2, mid, mid);
        let far = grid.value_at(mid + 6, mid, mid);

        assert!(center > near);
        assert!(near > far);
    }

    #[test]
    fn ball_support_is_bounded() {
        let grid = one_ball_grid();
        // Field-space radius where the kernel reaches zero.
        let radius = (STRENGTH / SUBTRACT).sqrt();
        let scale = (FIELD_RES - 1) as f32;
        let outside = ((0.5 + radius) * scale).ceil() as usize + 1;

        assert!(outside < FIELD_RES);
        assert_eq!(grid.value_at(outside, FIELD_RES / 2, FIELD_RES / 2), 0.0);
        assert_eq!(grid.value_at(0, 0, 0), 0.0);
    }

    #[test]
    fn clear_zeroes_every_sample() {
        let mut grid = one_ball_grid();
        grid.clear();
        let mid = (FIELD_RES - 1) / 2;
        assert_eq!(grid.value_at(mid, mid, mid), 0.0);
    }

    #[test]
    fn single_ball_surface_is_closed() {
        let grid = one_ball_grid();
        let mut poly = PolyMesh::new();
        let mut scratch = Vec::new();
        grid.polygonize(ISO_LEVEL, &mut poly, &mut scratch);

        assert!(!poly.faces.is_empty(), "ball produced no surface");

        // Closed 2-manifold: every undirected edge is shared by exactly two
        // faces, traversed once in each direction.
        let mut edge_count: HashMap<(usize, usize), i32> = HashMap::new();
        for face in &poly.faces {
            for i in 0..face.len() {
                let a = face[i];
                let b = face[(i + 1) % face.len()];
                let key = if a < b { (a, b) } else { (b, a) };
                let dir = if a < b { 1 } else { -1 };
                *edge_count.entry(key).or_insert(0) += dir;
            }
        }
        for (edge, net) in &edge_count {
            assert_eq!(*net, 0, "edge {:?} not traversed once per direction", edge);
        }
    }

    #[test]
    fn single_ball_quads_face_outward() {
        let grid = one_ball_grid();
        let mut poly = PolyMesh::new();
        let mut scratch = Vec::new();
        grid.polygonize(ISO_LEVEL, &mut poly, &mut scratch);

        // Ball is centered in field space, so mesh-space center is the origin.
        for face in &poly.faces {
            let centroid = face.iter().map(|&i| poly.positions[i]).sum::<Vec3>() / face.len() as f32;
            let normal = (poly.positions[face[1]] - poly.positions[face[0]])
                .cross(poly.positions[face[2]] - poly.positions[face[0]]);
            assert!(
                normal.dot(centroid) > 0.0,
                "face at {:?} winds inward",
                centroid
            );
        }
    }

    #[test]
    fn vertices_stay_inside_centered_unit_cube() {
        let grid = one_ball_grid();
        let mut poly = PolyMesh::new();
        let mut scratch = Vec::new();
        grid.polygonize(ISO_LEVEL, &mut poly, &mut scratch);

        for p in &poly.positions {
            assert!(p.abs().max_element() <= 0.5);
        }
    }
}
