//! Structures for creating and storing geometric primitives.
use mint;
use genmesh::{Vertex as GenVertex, EmitTriangles, Triangulate};
use genmesh::generators::{self, IndexedPolygon, SharedVertex};

/// A shape of geometry that is used for mesh blending.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    /// Vertices.
    pub vertices: Vec<mint::Point3<f32>>,
    /// Normals.
    pub normals: Vec<mint::Vector3<f32>>,
}

/// A collection of vertices, their normals, and faces that defines the
/// shape of a polyhedral object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    /// The original shape of geometry.
    pub base_shape: Shape,
    /// Morph target displacements, in the same order as the influence array.
    pub shapes: Vec<Shape>,
    /// Texture co-ordinates.
    pub tex_coords: Vec<mint::Point2<f32>>,
    /// Faces.
    pub faces: Vec<[u32; 3]>,
}

impl Geometry {
    /// Create new `Geometry` without any data in it.
    pub fn empty() -> Self {
        Geometry::default()
    }

    fn generate<P, G, Fpos, Fnor>(gen: G, fpos: Fpos, fnor: Fnor) -> Self where
        P: EmitTriangles<Vertex=usize>,
        G: IndexedPolygon<P> + SharedVertex<GenVertex>,
        Fpos: Fn(GenVertex) -> mint::Point3<f32>,
        Fnor: Fn(GenVertex) -> mint::Vector3<f32>,
    {
        Geometry {
            base_shape: Shape {
                vertices: gen.shared_vertex_iter().map(fpos).collect(),
                normals: gen.shared_vertex_iter().map(fnor).collect(),
            },
            shapes: Vec::new(),
            tex_coords: gen.shared_vertex_iter()
                .map(|GenVertex{ pos, .. }| [0.5 * (pos[0] + 1.0), 0.5 * (pos[1] + 1.0)].into())
                .collect(),
            faces: gen.indexed_polygon_iter()
                .triangulate()
                .map(|t| [t.x as u32, t.y as u32, t.z as u32])
                .collect(),
        }
    }

    /// Create new Plane with desired size, facing +Z.
    pub fn plane(sx: f32, sy: f32) -> Self {
        Self::generate(generators::Plane::new(),
                       |GenVertex{ pos, ..}| {
                           [pos[0] * 0.5 * sx, pos[1] * 0.5 * sy, 0.0].into()
                       },
                       |v| v.normal.into()
        )
    }

    /// Moves every vertex of the base shape by the given offset.
    pub fn translate(mut self, x: f32, y: f32, z: f32) -> Self {
        for v in &mut self.base_shape.vertices {
            v.x += x;
            v.y += y;
            v.z += z;
        }
        self
    }

    /// Axis-aligned extent of the base shape as `(width, height)`.
    pub fn extent(&self) -> (f32, f32) {
        let mut min = [::std::f32::INFINITY; 2];
        let mut max = [::std::f32::NEG_INFINITY; 2];
        for v in &self.base_shape.vertices {
            min[0] = min[0].min(v.x);
            min[1] = min[1].min(v.y);
            max[0] = max[0].max(v.x);
            max[1] = max[1].max(v.y);
        }
        if self.base_shape.vertices.is_empty() {
            (0.0, 0.0)
        } else {
            (max[0] - min[0], max[1] - min[1])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_spans_requested_size() {
        let plane = Geometry::plane(4.0, 2.0);
        assert_eq!(plane.base_shape.vertices.len(), 4);
        assert_eq!(plane.faces.len(), 2);
        let (w, h) = plane.extent();
        assert!((w - 4.0).abs() < 1e-6);
        assert!((h - 2.0).abs() < 1e-6);
    }

    #[test]
    fn translate_moves_all_vertices() {
        let plane = Geometry::plane(1.0, 1.0).translate(0.0, 0.0, -500.0);
        assert!(plane.base_shape.vertices.iter().all(|v| v.z == -500.0));
    }
}
