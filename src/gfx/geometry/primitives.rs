//! # Primitive Shape Generation
//!
//! Procedural shapes used by the scene: the floor plane and the skybox cube.
//! Both are wound counter-clockwise when seen from the side their normals
//! point to.

use super::GeometryData;

/// Generate a horizontal plane in the XZ plane (Y-up), centered at the origin
///
/// # Arguments
/// * `width` - Extent along X
/// * `depth` - Extent along Z
/// * `width_segments` - Number of subdivisions along X
/// * `depth_segments` - Number of subdivisions along Z
/// * `uv_repeat` - How many times the texture repeats across the plane
///
/// Returns a plane with normals pointing up (+Y).
pub fn generate_plane(
    width: f32,
    depth: f32,
    width_segments: u32,
    depth_segments: u32,
    uv_repeat: f32,
) -> GeometryData {
    let mut data = GeometryData::new();

    let w_segs = width_segments.max(1);
    let d_segs = depth_segments.max(1);

    for z in 0..=d_segs {
        let v = z as f32 / d_segs as f32;
        let pos_z = (v - 0.5) * depth;

        for x in 0..=w_segs {
            let u = x as f32 / w_segs as f32;
            let pos_x = (u - 0.5) * width;

            data.vertices.push([pos_x, 0.0, pos_z]);
            data.normals.push([0.0, 1.0, 0.0]);
            data.tex_coords.push([u * uv_repeat, v * uv_repeat]);
        }
    }

    // Counter-clockwise when viewed from above
    for z in 0..d_segs {
        for x in 0..w_segs {
            let i = z * (w_segs + 1) + x;
            let next_row = i + w_segs + 1;

            data.indices.extend_from_slice(&[i, next_row, i + 1]);
            data.indices
                .extend_from_slice(&[next_row, next_row + 1, i + 1]);
        }
    }

    data
}

/// Generate a closed cube with eight shared corners, centered at the origin
///
/// Every edge is shared by exactly two faces, so the cube is a closed
/// manifold. Normals point away from the center along the corner diagonal;
/// texture coordinates are unused and left at zero.
pub fn generate_closed_cube(half_size: f32) -> GeometryData {
    let mut data = GeometryData::new();

    let s = half_size;
    #[rustfmt::skip]
    let corners = [
        [-s, -s, -s], [ s, -s, -s], [ s,  s, -s], [-s,  s, -s],
        [-s, -s,  s], [ s, -s,  s], [ s,  s,  s], [-s,  s,  s],
    ];

    let inv_len = 1.0 / 3.0_f32.sqrt();
    for corner in corners {
        data.vertices.push(corner);
        data.normals.push([
            corner[0].signum() * inv_len,
            corner[1].signum() * inv_len,
            corner[2].signum() * inv_len,
        ]);
        data.tex_coords.push([0.0, 0.0]);
    }

    #[rustfmt::skip]
    let indices = vec![
        0, 3, 2,  0, 2, 1, // -Z
        4, 5, 6,  4, 6, 7, // +Z
        0, 4, 7,  0, 7, 3, // -X
        1, 2, 6,  1, 6, 5, // +X
        0, 1, 5,  0, 5, 4, // -Y
        3, 7, 6,  3, 6, 2, // +Y
    ];
    data.indices = indices;

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::adjacency::build_adjacency_with_stats;

    fn face_normal(data: &GeometryData, tri: &[u32]) -> [f32; 3] {
        let p = |i: u32| data.vertices[i as usize];
        let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
        let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ]
    }

    #[test]
    fn test_plane_generation() {
        let plane = generate_plane(2.0, 2.0, 2, 2, 1.0);
        assert_eq!(plane.vertices.len(), 9); // 3x3 grid
        assert_eq!(plane.indices.len(), 24); // 4 quads * 2 triangles * 3 indices
        assert_eq!(plane.vertices.len(), plane.tex_coords.len());
    }

    #[test]
    fn test_plane_faces_up() {
        let plane = generate_plane(10.0, 4.0, 3, 1, 1.0);
        for tri in plane.indices.chunks_exact(3) {
            let n = face_normal(&plane, tri);
            assert!(n[1] > 0.0);
            assert_eq!(n[0], 0.0);
            assert_eq!(n[2], 0.0);
        }
    }

    #[test]
    fn test_plane_uv_repeat() {
        let plane = generate_plane(1.0, 1.0, 1, 1, 600.0);
        assert_eq!(plane.tex_coords.last(), Some(&[600.0, 600.0]));
    }

    #[test]
    fn test_closed_cube_generation() {
        let cube = generate_closed_cube(1.0);
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.triangle_count(), 12);
    }

    #[test]
    fn test_closed_cube_faces_outward() {
        let cube = generate_closed_cube(1.0);
        for tri in cube.indices.chunks_exact(3) {
            let n = face_normal(&cube, tri);
            let centroid: Vec<f32> = (0..3)
                .map(|axis| tri.iter().map(|&i| cube.vertices[i as usize][axis]).sum::<f32>())
                .collect();
            let outward = n[0] * centroid[0] + n[1] * centroid[1] + n[2] * centroid[2];
            assert!(outward > 0.0);
        }
    }

    #[test]
    fn test_closed_cube_adjacency() {
        let cube = generate_closed_cube(1.0);
        let (adjacency, stats) = build_adjacency_with_stats(&cube.indices);

        assert_eq!(stats.edges, 18); // 12 cube edges + 6 face diagonals
        assert!(stats.is_closed_manifold());

        // Every neighbour is a real third vertex, never an endpoint of the edge
        for (tri, adj) in cube.indices.chunks_exact(3).zip(adjacency.chunks_exact(6)) {
            for e in 0..3 {
                let (a, b) = (tri[e], tri[(e + 1) % 3]);
                let neighbour = adj[e * 2 + 1];
                assert_ne!(neighbour, a);
                assert_ne!(neighbour, b);
            }
        }
    }
}
