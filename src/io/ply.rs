//! PLY (Stanford polygon) format support.
//!
//! Loading accepts ASCII and binary files through `ply-rs`. Polygons with
//! more than three corners are fan-triangulated. If every face carries an
//! `area` property, those areas are used instead of the geometric ones.
//!
//! Saving writes ASCII. [`save_with_attributes`] adds the curvature
//! attributes as extra `face` properties, in face order.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point3, Vector3};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::algo::{Attribute, CurvatureResult};
use crate::error::{Result, VvError};
use crate::mesh::{build_from_triangles, build_with_areas, to_face_vertex, TriangleMesh};

/// Load a mesh from a PLY file.
///
/// # Example
///
/// ```no_run
/// use vvcurv::io::ply;
///
/// let mesh = ply::load("membrane.ply").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let load_error = |message: String| VvError::LoadError {
        path: path.to_path_buf(),
        message,
    };

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| load_error(e.to_string()))?;

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or_else(|| load_error("PLY file has no vertex element".to_string()))?;

    let mut vertices: Vec<Point3<f64>> = Vec::with_capacity(vertex_element.len());
    for (i, vertex) in vertex_element.iter().enumerate() {
        let coord = |name: &str| {
            get_float_property(vertex, name)
                .ok_or_else(|| load_error(format!("vertex {i} missing {name} coordinate")))
        };
        vertices.push(Point3::new(coord("x")?, coord("y")?, coord("z")?));
    }

    let face_element = ply
        .payload
        .get("face")
        .ok_or_else(|| load_error("PLY file has no face element".to_string()))?;

    let mut faces: Vec<[usize; 3]> = Vec::with_capacity(face_element.len());
    let mut areas: Option<Vec<f64>> = Some(Vec::with_capacity(face_element.len()));
    for (i, face) in face_element.iter().enumerate() {
        let indices = get_list_property(face, "vertex_indices")
            .or_else(|| get_list_property(face, "vertex_index"))
            .ok_or_else(|| load_error(format!("face {i} missing vertex_indices property")))?;
        if indices.len() < 3 {
            return Err(load_error(format!(
                "face {i} has {} corners",
                indices.len()
            )));
        }

        // Polygon areas cannot be split across the fan
        let area = get_float_property(face, "area").filter(|_| indices.len() == 3);
        match (area, areas.as_mut()) {
            (Some(a), Some(list)) => list.push(a),
            _ => areas = None,
        }

        for k in 1..indices.len() - 1 {
            faces.push([indices[0], indices[k], indices[k + 1]]);
        }
    }

    match areas {
        Some(areas) if !areas.is_empty() => build_with_areas(&vertices, &faces, &areas),
        _ => build_from_triangles(&vertices, &faces),
    }
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a mesh to an ASCII PLY file.
pub fn save<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    write_ply(mesh, None, path.as_ref())
}

/// Save a mesh with the curvature attributes of `result` as face properties.
///
/// Besides the scalar [`Attribute`]s, each face carries its refined normal
/// (`nx ny nz`), both principal directions (`t1x .. t2z`), a `valid` flag,
/// the shape class (0 when unknown) and the shape category (0 for none,
/// otherwise 1 + its position from cup to plane). Invalid faces store NaN.
pub fn save_with_attributes<P: AsRef<Path>>(
    mesh: &TriangleMesh,
    result: &CurvatureResult,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    if result.len() != mesh.num_faces() {
        return Err(VvError::SaveError {
            path: path.to_path_buf(),
            message: format!(
                "result has {} entries for {} faces",
                result.len(),
                mesh.num_faces()
            ),
        });
    }
    write_ply(mesh, Some(result), path)
}

/// Property names of the normal and the two principal directions.
const VECTOR_PROPERTIES: [[&str; 3]; 3] = [
    ["nx", "ny", "nz"],
    ["t1x", "t1y", "t1z"],
    ["t2x", "t2y", "t2z"],
];

fn write_ply(mesh: &TriangleMesh, result: Option<&CurvatureResult>, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let (vertices, faces) = to_face_vertex(mesh);

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by vvcurv")?;
    writeln!(writer, "element vertex {}", vertices.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    writeln!(writer, "element face {}", faces.len())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    if result.is_some() {
        for names in VECTOR_PROPERTIES {
            for name in names {
                writeln!(writer, "property double {name}")?;
            }
        }
        for attribute in Attribute::ALL {
            writeln!(writer, "property double {}", attribute.name())?;
        }
        writeln!(writer, "property uchar valid")?;
        writeln!(writer, "property uchar shape_class")?;
        writeln!(writer, "property uchar category")?;
    }
    writeln!(writer, "end_header")?;

    for v in &vertices {
        writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
    }

    for (i, f) in faces.iter().enumerate() {
        write!(writer, "3 {} {} {}", f[0], f[1], f[2])?;
        if let Some(result) = result {
            let vectors: [&Vector3<f64>; 3] =
                [&result.normals[i], &result.dir_1[i], &result.dir_2[i]];
            for v in vectors {
                write!(writer, " {} {} {}", v.x, v.y, v.z)?;
            }
            for attribute in Attribute::ALL {
                write!(writer, " {}", result.scalar(attribute)[i])?;
            }
            write!(
                writer,
                " {} {} {}",
                u8::from(result.is_valid(i)),
                result.shape_class[i].map_or(0, |c| c.label()),
                result.category[i].map_or(0, |c| c.code()),
            )?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::{estimate_curvature, VotingOptions};
    use crate::io::scratch_path;
    use crate::synthetic;

    #[test]
    fn test_save_and_load() {
        let mesh = synthetic::icosphere(2.0, 1).unwrap();
        let path = scratch_path("roundtrip.ply");
        save(&mesh, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.num_vertices(), mesh.num_vertices());
        assert_eq!(loaded.num_faces(), mesh.num_faces());
        assert_eq!(loaded.raw_faces(), mesh.raw_faces());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_quad_is_triangulated() {
        let path = scratch_path("quad.ply");
        std::fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 4\nproperty float x\nproperty float y\n\
             property float z\nelement face 1\nproperty list uchar int vertex_indices\n\
             end_header\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n",
        )
        .unwrap();

        let mesh = load(&path).unwrap();
        assert_eq!(mesh.num_faces(), 2);
        assert!((mesh.total_area() - 1.0).abs() < 1e-12);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_face_areas_are_read() {
        let path = scratch_path("areas.ply");
        std::fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\n\
             property float z\nelement face 1\nproperty list uchar int vertex_indices\n\
             property double area\nend_header\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2 7.5\n",
        )
        .unwrap();

        let mesh = load(&path).unwrap();
        assert_eq!(mesh.areas(), &[7.5]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_face_element() {
        let path = scratch_path("nofaces.ply");
        std::fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\n\
             property float z\nend_header\n0 0 0\n",
        )
        .unwrap();

        assert!(matches!(load(&path), Err(VvError::LoadError { .. })));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_attributes_are_written() {
        let mesh = synthetic::icosphere(5.0, 2).unwrap();
        let result =
            estimate_curvature(&mesh, &VotingOptions::new(3.0).with_num_workers(2)).unwrap();
        assert_eq!(result.num_valid(), result.len());
        let path = scratch_path("attributes.ply");
        save_with_attributes(&mesh, &result, &path).unwrap();

        let mut reader = BufReader::new(File::open(&path).unwrap());
        let ply = Parser::<DefaultElement>::new()
            .read_ply(&mut reader)
            .unwrap();
        let faces = ply.payload.get("face").unwrap();
        assert_eq!(faces.len(), mesh.num_faces());
        for (i, face) in faces.iter().enumerate() {
            let stored = get_float_property(face, "kappa_1").unwrap();
            let expected = result.kappa_1[i];
            assert_eq!(stored, expected);
        }

        // The geometry still loads as a plain mesh
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.num_faces(), mesh.num_faces());
        std::fs::remove_file(&path).ok();
    }
}
