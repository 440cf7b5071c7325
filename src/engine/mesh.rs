// Mesh types and triangulation for the per-frame isosurface.
//
// Three-layer pipeline, rebuilt every frame:
//   FieldGrid → polygonize() → PolyMesh → triangulate_smooth() → RenderMesh → GPU
//
// Unlike load-time meshing, every container here is cleared and refilled each
// frame, so all build paths reuse existing Vec capacity instead of allocating.

use glam::Vec3;

// ============================================================================
// GPU VERTEX
// ============================================================================

/// GPU-ready vertex with position and normal:
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
}

impl GpuVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

// ============================================================================
// POLY MESH
// ============================================================================

/// Intermediate polygon mesh between field extraction and triangulation.
/// Surface nets emits quads, but faces may be any n-gon with n >= 3.
/// Faces use CCW winding when viewed from outside (consistent with back-face
/// culling). NOT GPU-ready — use `RenderMesh` for rendering.
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces:     Vec<Vec<usize>>,  // each face = CCW-ordered vertex index list
}

impl PolyMesh {
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            faces:     Vec::new(),
        }
    }

    /// Drop all vertices and faces, keeping allocation for the next frame.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.faces.clear();
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Vec3) -> usize {
        let idx = self.positions.len();
        self.positions.push(pos);
        idx
    }

    /// Add a face by vertex indices (CCW order).
    pub fn add_face(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.len() >= 3, "Face must have at least 3 vertices");
        self.faces.push(indices);
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// GPU-ready triangulated mesh with per-vertex normals.
/// Vertices are shared across triangles via the index buffer (smooth normals).
/// Upload vertex_bytes() to a VERTEX buffer, index_bytes() to an INDEX buffer.
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices:  Vec<u32>,
}

impl RenderMesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices:  Vec::new(),
        }
    }

    /// Cast vertex slice to raw bytes for wgpu buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Cast index slice to raw bytes for wgpu buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> usize { self.indices.len() }
}

// ============================================================================
// TRIANGULATION + SMOOTH NORMALS
// ============================================================================

/// Triangulate a PolyMesh into `out`, with smooth (area-weighted) normals.
///
/// `out` is cleared first; its Vecs keep their capacity, so a steady-state
/// frame performs no allocation.
///
/// Algorithm:
///   1. Accumulate area-weighted face normals into each vertex's accumulator.
///      The cross product magnitude = 2×triangle_area, giving automatic
///      area-weighting.
///   2. Normalize each accumulated normal and emit one GpuVertex per position.
///   3. Fan-triangulate each face (from vertex 0) into the shared index buffer.
pub fn triangulate_smooth(poly: &PolyMesh, normal_scratch: &mut Vec<Vec3>, out: &mut RenderMesh) {
    let n_verts = poly.vertex_count();

    out.vertices.clear();
    out.indices.clear();
    normal_scratch.clear();
    normal_scratch.resize(n_verts, Vec3::ZERO);

    // Step 1: accumulate area-weighted normals per vertex
    for face in &poly.faces {
        let n = face.len();
        // Fan triangulate from vertex 0
        for i in 1..(n - 1) {
            let a = poly.positions[face[0]];
            let b = poly.positions[face[i]];
            let c = poly.positions[face[i + 1]];
            // Cross product is not normalized — magnitude encodes 2×area
            let weighted_normal = (b - a).cross(c - a);
            normal_scratch[face[0]]     += weighted_normal;
            normal_scratch[face[i]]     += weighted_normal;
            normal_scratch[face[i + 1]] += weighted_normal;
        }
    }

    // Step 2: one GpuVertex per PolyMesh position
    out.vertices.extend(
        poly.positions.iter()
            .zip(normal_scratch.iter())
            .map(|(pos, n)| GpuVertex {
                position: pos.to_array(),
                normal:   n.normalize_or_zero().to_array(),
            }),
    );

    // Step 3: fan-triangulate faces into the index buffer
    for face in &poly.faces {
        let n = face.len();
        for i in 1..(n - 1) {
            out.indices.push(face[0]     as u32);
            out.indices.push(face[i]     as u32);
            out.indices.push(face[i + 1] as u32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> PolyMesh {
        // Unit quad in the XY plane, CCW viewed from +Z
        let mut poly = PolyMesh::new();
        let a = poly.add_vertex(Vec3::new(0.0, 0.0, 0.0));
        let b = poly.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        let c = poly.add_vertex(Vec3::new(1.0, 1.0, 0.0));
        let d = poly.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        poly.add_face(vec![a, b, c, d]);
        poly
    }

    #[test]
    fn quad_triangulates_to_two_triangles_with_shared_vertices() {
        let poly = quad_mesh();
        let mut scratch = Vec::new();
        let mut out = RenderMesh::new();
        triangulate_smooth(&poly, &mut scratch, &mut out);

        assert_eq!(out.vertices.len(), 4);
        assert_eq!(out.indices.len(), 6);
    }

    #[test]
    fn ccw_quad_normals_point_along_plus_z() {
        let poly = quad_mesh();
        let mut scratch = Vec::new();
        let mut out = RenderMesh::new();
        triangulate_smooth(&poly, &mut scratch, &mut out);

        for v in &out.vertices {
            assert!(v.normal[2] > 0.99, "normal {:?} not +Z", v.normal);
        }
    }

    #[test]
    fn rebuild_reuses_buffers() {
        let poly = quad_mesh();
        let mut scratch = Vec::new();
        let mut out = RenderMesh::new();
        triangulate_smooth(&poly, &mut scratch, &mut out);
        let first = (out.vertices.len(), out.indices.len());

        // Second build over the same poly must produce identical counts, not
        // append to the previous frame's data.
        triangulate_smooth(&poly, &mut scratch, &mut out);
        assert_eq!((out.vertices.len(), out.indices.len()), first);
    }
}
