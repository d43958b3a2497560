//! STL artifacts: reading, measuring and comparing triangle meshes.
//!
//! Both encodings OpenSCAD can emit are accepted:
//!
//! - Binary: 80-byte header, u32 triangle count (little-endian), then per
//!   triangle 3×f32 normal + 3×(3×f32 vertex) + u16 attribute = 50 bytes.
//! - ASCII: `solid` / `facet normal` / `outer loop` / `vertex x y z` / ... / `endsolid`.
//!
//! Two meshes are considered equal when they contain the same triangles with
//! the same orientation, regardless of facet order, starting vertex or
//! encoding. Normals are ignored; they are derived data.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use difference::{Changeset, Difference};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::artifact::{ArtifactReader, ArtifactResult};
use crate::errors::{ActionError, ActionFailure, HarnessError};

const BINARY_HEADER_LEN: usize = 80;
const BINARY_FACET_LEN: usize = 50;
/// Changed lines shown in a mismatch report before the diff is cut off.
const MAX_DIFF_LINES: usize = 20;

/// Property names understood by [`StlResult::property`].
pub const PROPERTIES: &[&str] = &[
    "volume",
    "surface_area",
    "area",
    "triangles",
    "min_x",
    "min_y",
    "min_z",
    "max_x",
    "max_y",
    "max_z",
    "size_x",
    "size_y",
    "size_z",
];

pub type Vertex = [f32; 3];
pub type Triangle = [Vertex; 3];

// ============================================================================
// MESH
// ============================================================================

/// A triangle soup read from an STL file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StlMesh {
    pub triangles: Vec<Triangle>,
}

impl StlMesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// Decodes binary or ASCII STL.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        if let Some(count) = binary_triangle_count(bytes) {
            return Ok(Self::parse_binary(bytes, count));
        }
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        if bytes[start..].starts_with(b"solid") {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| format!("ASCII STL is not valid UTF-8: {e}"))?;
            return Self::parse_ascii(text);
        }
        Err(format!(
            "neither ASCII STL nor a binary STL of consistent length ({} bytes)",
            bytes.len()
        ))
    }

    fn parse_binary(bytes: &[u8], count: usize) -> Self {
        let mut triangles = Vec::with_capacity(count);
        for facet in bytes[BINARY_HEADER_LEN + 4..].chunks_exact(BINARY_FACET_LEN) {
            // skip the 12-byte normal
            let mut tri = [[0.0f32; 3]; 3];
            for (v, vertex) in tri.iter_mut().enumerate() {
                for (c, coord) in vertex.iter_mut().enumerate() {
                    let at = 12 + v * 12 + c * 4;
                    *coord = f32::from_le_bytes([
                        facet[at],
                        facet[at + 1],
                        facet[at + 2],
                        facet[at + 3],
                    ]);
                }
            }
            triangles.push(tri);
        }
        Self { triangles }
    }

    fn parse_ascii(text: &str) -> Result<Self, String> {
        let mut vertices: Vec<Vertex> = Vec::new();
        let mut tokens = text.split_whitespace();
        while let Some(token) = tokens.next() {
            if token != "vertex" {
                continue;
            }
            let mut vertex = [0.0f32; 3];
            for coord in vertex.iter_mut() {
                let raw = tokens
                    .next()
                    .ok_or_else(|| "truncated vertex".to_string())?;
                *coord = raw
                    .parse::<f32>()
                    .map_err(|e| format!("bad vertex coordinate '{raw}': {e}"))?;
            }
            vertices.push(vertex);
        }
        if vertices.len() % 3 != 0 {
            return Err(format!(
                "{} vertices do not form whole triangles",
                vertices.len()
            ));
        }
        let triangles = vertices
            .chunks_exact(3)
            .map(|v| [v[0], v[1], v[2]])
            .collect();
        Ok(Self { triangles })
    }

    /// Enclosed volume via the divergence theorem. Meaningful for closed meshes only.
    pub fn volume(&self) -> f64 {
        let mut volume = 0.0f64;
        for [a, b, c] in &self.triangles {
            let (x0, y0, z0) = widen(a);
            let (x1, y1, z1) = widen(b);
            let (x2, y2, z2) = widen(c);
            // signed volume of the tetrahedron spanned with the origin
            volume +=
                x0 * (y1 * z2 - y2 * z1) + x1 * (y2 * z0 - y0 * z2) + x2 * (y0 * z1 - y1 * z0);
        }
        (volume / 6.0).abs()
    }

    pub fn surface_area(&self) -> f64 {
        let mut area = 0.0f64;
        for [a, b, c] in &self.triangles {
            let (x0, y0, z0) = widen(a);
            let (x1, y1, z1) = widen(b);
            let (x2, y2, z2) = widen(c);
            let (ax, ay, az) = (x1 - x0, y1 - y0, z1 - z0);
            let (bx, by, bz) = (x2 - x0, y2 - y0, z2 - z0);
            let cx = ay * bz - az * by;
            let cy = az * bx - ax * bz;
            let cz = ax * by - ay * bx;
            area += (cx * cx + cy * cy + cz * cz).sqrt() / 2.0;
        }
        area
    }

    /// Axis-aligned bounds, `None` for an empty mesh.
    pub fn bounding_box(&self) -> Option<([f64; 3], [f64; 3])> {
        let mut vertices = self.triangles.iter().flatten();
        let first = vertices.next()?;
        let mut min = (*first).map(f64::from);
        let mut max = min;
        for vertex in vertices {
            for axis in 0..3 {
                let value = f64::from(vertex[axis]);
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
            }
        }
        Some((min, max))
    }

    /// Order-independent form of the mesh used for comparison.
    ///
    /// Each triangle's vertex cycle is rotated to start at its smallest vertex
    /// (orientation preserved), then the triangle list is sorted.
    pub fn canonical(&self) -> Vec<[[u32; 3]; 3]> {
        let mut tris: Vec<[[u32; 3]; 3]> = self
            .triangles
            .iter()
            .map(|tri| {
                let keys = (*tri).map(vertex_key);
                let start = (0..3).min_by_key(|&i| keys[i]).unwrap_or(0);
                [keys[start], keys[(start + 1) % 3], keys[(start + 2) % 3]]
            })
            .collect();
        tris.sort_unstable();
        tris
    }
}

fn widen(v: &Vertex) -> (f64, f64, f64) {
    (f64::from(v[0]), f64::from(v[1]), f64::from(v[2]))
}

/// Bit pattern of a vertex with `-0.0` folded into `0.0`.
fn vertex_key(v: Vertex) -> [u32; 3] {
    v.map(|c| if c == 0.0 { 0.0f32.to_bits() } else { c.to_bits() })
}

fn binary_triangle_count(bytes: &[u8]) -> Option<usize> {
    let count_bytes = bytes.get(BINARY_HEADER_LEN..BINARY_HEADER_LEN + 4)?;
    let count = u32::from_le_bytes([count_bytes[0], count_bytes[1], count_bytes[2], count_bytes[3]])
        as usize;
    let expected_len = count
        .checked_mul(BINARY_FACET_LEN)?
        .checked_add(BINARY_HEADER_LEN + 4)?;
    (expected_len == bytes.len()).then_some(count)
}

fn listing(canonical: &[[[u32; 3]; 3]]) -> String {
    let mut out = String::new();
    for tri in canonical {
        let parts: Vec<String> = tri
            .iter()
            .map(|v| {
                let [x, y, z] = (*v).map(f32::from_bits);
                format!("{x} {y} {z}")
            })
            .collect();
        let _ = writeln!(out, "{}", parts.join(" | "));
    }
    out
}

fn render_diff(expected: &str, actual: &str) -> String {
    let changeset = Changeset::new(expected, actual, "\n");
    let mut out = String::new();
    let mut shown = 0;
    'outer: for diff in &changeset.diffs {
        let (prefix, block) = match diff {
            Difference::Same(_) => continue,
            Difference::Add(block) => ('+', block),
            Difference::Rem(block) => ('-', block),
        };
        for line in block.lines() {
            if shown == MAX_DIFF_LINES {
                out.push_str("...\n");
                break 'outer;
            }
            let _ = writeln!(out, "{prefix}{line}");
            shown += 1;
        }
    }
    out
}

// ============================================================================
// RESULT
// ============================================================================

/// A compiled STL artifact exposed as an [`ArtifactResult`].
#[derive(Debug, Clone)]
pub struct StlResult {
    pub path: PathBuf,
    pub mesh: StlMesh,
    digest: Vec<u8>,
}

impl StlResult {
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let bytes =
            fs::read(path).map_err(|e| HarnessError::artifact(path, format!("cannot read: {e}")))?;
        let mesh =
            StlMesh::from_bytes(&bytes).map_err(|reason| HarnessError::artifact(path, reason))?;
        debug!(path = %path.display(), triangles = mesh.triangles.len(), "loaded STL");
        Ok(Self {
            path: path.to_path_buf(),
            mesh,
            digest: Sha256::digest(&bytes).to_vec(),
        })
    }

    fn bounds(&self) -> Result<([f64; 3], [f64; 3]), HarnessError> {
        self.mesh
            .bounding_box()
            .ok_or_else(|| HarnessError::artifact(&self.path, "mesh has no triangles"))
    }
}

impl ArtifactResult for StlResult {
    fn property(&self, name: &str) -> Result<f64, HarnessError> {
        let axis = |suffix: &str| match suffix {
            "x" => Some(0),
            "y" => Some(1),
            "z" => Some(2),
            _ => None,
        };
        let value = match name {
            "volume" => self.mesh.volume(),
            "surface_area" | "area" => self.mesh.surface_area(),
            "triangles" => self.mesh.triangles.len() as f64,
            _ => {
                let lookup = name
                    .split_once('_')
                    .and_then(|(kind, suffix)| axis(suffix).map(|a| (kind, a)));
                match lookup {
                    Some(("min", a)) => self.bounds()?.0[a],
                    Some(("max", a)) => self.bounds()?.1[a],
                    Some(("size", a)) => {
                        let (min, max) = self.bounds()?;
                        max[a] - min[a]
                    }
                    _ => {
                        return Err(HarnessError::PropertyLookup {
                            name: name.to_string(),
                            help: Some(format!("known properties: {}", PROPERTIES.join(", "))),
                        })
                    }
                }
            }
        };
        Ok(value)
    }

    fn compare_with_expected(&self, reference: &Path) -> Result<(), ActionError> {
        let bytes = fs::read(reference).map_err(|e| HarnessError::io(reference, e))?;
        if Sha256::digest(&bytes).as_slice() == self.digest.as_slice() {
            return Ok(());
        }

        let expected = StlMesh::from_bytes(&bytes)
            .map_err(|reason| HarnessError::artifact(reference, reason))?;
        let expected_canon = expected.canonical();
        let actual_canon = self.mesh.canonical();
        if expected_canon == actual_canon {
            return Ok(());
        }

        let mut detail = format!(
            "triangles: expected {}, actual {}\n",
            expected_canon.len(),
            actual_canon.len()
        );
        detail.push_str(&render_diff(&listing(&expected_canon), &listing(&actual_canon)));
        Err(ActionFailure::Mismatch {
            reference: reference.to_path_buf(),
            detail,
        }
        .into())
    }
}

/// [`ArtifactReader`] for STL output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StlReader;

impl ArtifactReader for StlReader {
    fn read(&self, path: &Path) -> Result<Box<dyn ArtifactResult>, HarnessError> {
        Ok(Box::new(StlResult::load(path)?))
    }
}

// ============================================================================
// WRITERS
// ============================================================================

/// Writes `mesh` as ASCII STL.
pub fn to_ascii(mesh: &StlMesh, name: &str) -> String {
    let mut out = format!("solid {name}\n");
    for [a, b, c] in &mesh.triangles {
        let [nx, ny, nz] = facet_normal(a, b, c);
        let _ = writeln!(out, "  facet normal {nx} {ny} {nz}");
        out.push_str("    outer loop\n");
        for v in [a, b, c] {
            let _ = writeln!(out, "      vertex {} {} {}", v[0], v[1], v[2]);
        }
        out.push_str("    endloop\n  endfacet\n");
    }
    let _ = writeln!(out, "endsolid {name}");
    out
}

/// Writes `mesh` as binary STL.
pub fn to_binary(mesh: &StlMesh, name: &str) -> Vec<u8> {
    let mut buf =
        Vec::with_capacity(BINARY_HEADER_LEN + 4 + mesh.triangles.len() * BINARY_FACET_LEN);
    let header = format!("binary STL: {name}");
    let header = header.as_bytes();
    buf.extend_from_slice(&header[..header.len().min(BINARY_HEADER_LEN)]);
    buf.resize(BINARY_HEADER_LEN, 0u8);
    buf.extend_from_slice(&(mesh.triangles.len() as u32).to_le_bytes());
    for [a, b, c] in &mesh.triangles {
        for coord in facet_normal(a, b, c) {
            buf.extend_from_slice(&coord.to_le_bytes());
        }
        for v in [a, b, c] {
            for coord in v {
                buf.extend_from_slice(&coord.to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
    }
    buf
}

fn facet_normal(a: &Vertex, b: &Vertex, c: &Vertex) -> [f32; 3] {
    let (ax, ay, az) = (b[0] - a[0], b[1] - a[1], b[2] - a[2]);
    let (bx, by, bz) = (c[0] - a[0], c[1] - a[1], c[2] - a[2]);
    let nx = ay * bz - az * by;
    let ny = az * bx - ax * bz;
    let nz = ax * by - ay * bx;
    let len = (nx * nx + ny * ny + nz * nz).sqrt();
    if len > 1e-12 {
        [nx / len, ny / len, nz / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Closed axis-aligned box from `min` to `max`, outward-facing triangles.
pub fn box_mesh(min: Vertex, max: Vertex) -> StlMesh {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    let p = [
        [x0, y0, z0],
        [x1, y0, z0],
        [x1, y1, z0],
        [x0, y1, z0],
        [x0, y0, z1],
        [x1, y0, z1],
        [x1, y1, z1],
        [x0, y1, z1],
    ];
    let faces: [[usize; 3]; 12] = [
        [0, 2, 1],
        [0, 3, 2], // bottom
        [4, 5, 6],
        [4, 6, 7], // top
        [0, 1, 5],
        [0, 5, 4], // front
        [2, 3, 7],
        [2, 7, 6], // back
        [0, 4, 7],
        [0, 7, 3], // left
        [1, 2, 6],
        [1, 6, 5], // right
    ];
    StlMesh::new(faces.iter().map(|f| [p[f[0]], p[f[1]], p[f[2]]]).collect())
}
