//! Plain-text attribute files.
//!
//! One value per line, in node order. Vectors are written as three
//! space-separated components per line. Invalid nodes appear as `NaN`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use tracing::debug;

use crate::algo::{Attribute, CurvatureResult};
use crate::error::Result;

/// Write one scalar per line.
pub fn write_values<P: AsRef<Path>>(values: &[f64], path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for v in values {
        writeln!(writer, "{v}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one vector per line as `x y z`.
pub fn write_vectors<P: AsRef<Path>>(vectors: &[Vector3<f64>], path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for v in vectors {
        writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write every attribute of `result` into `dir` as `<stem>.<name>.txt`.
///
/// Covers the scalar [`Attribute`]s, the normal and both principal
/// directions, and the validity flags (`1`/`0`). Returns the written paths.
pub fn write_attributes<P: AsRef<Path>>(
    result: &CurvatureResult,
    dir: P,
    stem: &str,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let file = |name: &str| dir.join(format!("{stem}.{name}.txt"));
    let mut written = Vec::new();

    for attribute in Attribute::ALL {
        let path = file(attribute.name());
        write_values(result.scalar(attribute), &path)?;
        written.push(path);
    }

    for (name, vectors) in [
        ("normal", &result.normals),
        ("dir_1", &result.dir_1),
        ("dir_2", &result.dir_2),
    ] {
        let path = file(name);
        write_vectors(vectors, &path)?;
        written.push(path);
    }

    let path = file("valid");
    let mut writer = BufWriter::new(File::create(&path)?);
    for valid in result.validity() {
        writeln!(writer, "{}", u8::from(valid))?;
    }
    writer.flush()?;
    written.push(path);

    debug!(files = written.len(), dir = %dir.display(), "wrote attribute files");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::scratch_path;

    #[test]
    fn test_values_one_per_line() {
        let path = scratch_path("values.txt");
        write_values(&[0.5, -2.0, f64::NAN], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "0.5\n-2\nNaN\n");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_vectors() {
        let path = scratch_path("vectors.txt");
        write_vectors(&[Vector3::new(1.0, 0.0, -0.25)], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1 0 -0.25\n");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_write_attributes() {
        use crate::algo::{estimate_curvature, VotingOptions};

        let mesh = crate::synthetic::icosphere(4.0, 1).unwrap();
        let result =
            estimate_curvature(&mesh, &VotingOptions::new(3.0).with_num_workers(1)).unwrap();
        let dir = scratch_path("attributes");
        let written = write_attributes(&result, &dir, "sphere").unwrap();

        assert_eq!(written.len(), Attribute::ALL.len() + 4);
        let kappa = std::fs::read_to_string(dir.join("sphere.kappa_1.txt")).unwrap();
        assert_eq!(kappa.lines().count(), mesh.num_faces());
        std::fs::remove_dir_all(&dir).ok();
    }
}
