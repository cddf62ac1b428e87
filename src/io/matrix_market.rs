//! Hand-written MatrixMarket reader/writer.
//!
//! No scipy-equivalent crate is part of the dependency stack, so this is a
//! direct port of the subset of the format the solver actually needs: dense
//! (`array`) and sparse (`coordinate`) layouts, `integer`/`real`/`complex`
//! scalar kinds, and all four symmetry variants.

use std::fmt::Write as _;
use std::io::{BufRead, BufReader, Write as _};
use std::path::Path;

use ndarray::Array2;
use num_traits::ToPrimitive;

use crate::error::{CssfError, Result};
use crate::precision::{Cplx, Scalar};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Layout {
    Array,
    Coordinate,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    Integer,
    Real,
    Complex,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
    SkewSymmetric,
    Hermitian,
}

fn fmt_err(path: &Path, reason: impl Into<String>) -> CssfError {
    CssfError::MatrixFormat {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Read a dense `D x D` complex matrix from a MatrixMarket file, converting
/// from the on-disk double precision into the caller's [`Scalar`] width.
pub fn read_matrix<T: Scalar>(path: impl AsRef<Path>) -> Result<Array2<Cplx<T>>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| CssfError::io(path, e))?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .ok_or_else(|| fmt_err(path, "empty file"))?
        .map_err(|e| CssfError::io(path, e))?;
    let (layout, scalar_kind, symmetry) = parse_header(path, &header)?;

    let mut data_line = None;
    for line in lines.by_ref() {
        let line = line.map_err(|e| CssfError::io(path, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        data_line = Some(trimmed.to_string());
        break;
    }
    let dims_line = data_line.ok_or_else(|| fmt_err(path, "missing dimensions line"))?;
    let mut dims = dims_line.split_whitespace();
    let rows: usize = dims
        .next()
        .ok_or_else(|| fmt_err(path, "missing row count"))?
        .parse()
        .map_err(|_| fmt_err(path, "row count is not an integer"))?;
    let cols: usize = dims
        .next()
        .ok_or_else(|| fmt_err(path, "missing column count"))?
        .parse()
        .map_err(|_| fmt_err(path, "column count is not an integer"))?;
    if rows != cols {
        return Err(CssfError::Dimension(format!(
            "matrix file {} is not square: {rows}x{cols}",
            path.display()
        )));
    }

    let mut out: Array2<Cplx<f64>> =
        Array2::from_elem((rows, cols), Cplx::new(0.0, 0.0));

    match layout {
        Layout::Array => {
            let nnz = if symmetry == Symmetry::General {
                rows * cols
            } else {
                rows * (rows + 1) / 2
            };
            let mut count = 0;
            let mut col = 0usize;
            let mut row = 0usize;
            for line in lines.by_ref() {
                if count >= nnz {
                    break;
                }
                let line = line.map_err(|e| CssfError::io(path, e))?;
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('%') {
                    continue;
                }
                let value = parse_scalar(path, trimmed, scalar_kind)?;

                if symmetry == Symmetry::General {
                    out[(row, col)] = value;
                    row += 1;
                    if row == rows {
                        row = 0;
                        col += 1;
                    }
                } else {
                    place_symmetric(&mut out, row, col, value, symmetry);
                    row += 1;
                    if row == rows {
                        col += 1;
                        row = col;
                    }
                }
                count += 1;
            }
            if count != nnz {
                return Err(fmt_err(
                    path,
                    format!("expected {nnz} array entries, found {count}"),
                ));
            }
        }
        Layout::Coordinate => {
            let nnz: usize = dims
                .next()
                .ok_or_else(|| fmt_err(path, "missing nnz count"))?
                .parse()
                .map_err(|_| fmt_err(path, "nnz count is not an integer"))?;
            let mut count = 0;
            for line in lines.by_ref() {
                if count >= nnz {
                    break;
                }
                let line = line.map_err(|e| CssfError::io(path, e))?;
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('%') {
                    continue;
                }
                let mut parts = trimmed.splitn(3, char::is_whitespace);
                let i: usize = parts
                    .next()
                    .ok_or_else(|| fmt_err(path, "missing row index"))?
                    .parse()
                    .map_err(|_| fmt_err(path, "row index is not an integer"))?;
                let j: usize = parts
                    .next()
                    .ok_or_else(|| fmt_err(path, "missing column index"))?
                    .parse()
                    .map_err(|_| fmt_err(path, "column index is not an integer"))?;
                let rest = parts.next().unwrap_or("").trim();
                let value = parse_scalar(path, rest, scalar_kind)?;
                let (row, col) = (i - 1, j - 1);

                if symmetry == Symmetry::General {
                    out[(row, col)] = value;
                } else {
                    place_symmetric(&mut out, row, col, value, symmetry);
                }
                count += 1;
            }
            if count != nnz {
                return Err(fmt_err(
                    path,
                    format!("expected {nnz} coordinate entries, found {count}"),
                ));
            }
        }
    }

    Ok(out.mapv(|c| Cplx::new(T::from_f64(c.re).unwrap(), T::from_f64(c.im).unwrap())))
}

fn place_symmetric(
    out: &mut Array2<Cplx<f64>>,
    row: usize,
    col: usize,
    value: Cplx<f64>,
    symmetry: Symmetry,
) {
    out[(row, col)] = value;
    if row == col {
        return;
    }
    out[(col, row)] = match symmetry {
        Symmetry::Symmetric => value,
        Symmetry::SkewSymmetric => -value,
        Symmetry::Hermitian => value.conj(),
        Symmetry::General => unreachable!(),
    };
}

fn parse_scalar(path: &Path, text: &str, kind: ScalarKind) -> Result<Cplx<f64>> {
    let mut parts = text.split_whitespace();
    let re: f64 = parts
        .next()
        .ok_or_else(|| fmt_err(path, "missing real component"))?
        .parse()
        .map_err(|_| fmt_err(path, "real component is not a number"))?;
    let im = match kind {
        ScalarKind::Integer | ScalarKind::Real => 0.0,
        ScalarKind::Complex => parts
            .next()
            .ok_or_else(|| fmt_err(path, "missing imaginary component"))?
            .parse()
            .map_err(|_| fmt_err(path, "imaginary component is not a number"))?,
    };
    Ok(Cplx::new(re, im))
}

fn parse_header(path: &Path, header: &str) -> Result<(Layout, ScalarKind, Symmetry)> {
    let tokens: Vec<&str> = header.trim().split_whitespace().collect();
    if tokens.len() != 5 || tokens[0] != "%%MatrixMarket" || tokens[1] != "matrix" {
        return Err(fmt_err(path, "missing or malformed %%MatrixMarket header"));
    }
    let layout = match tokens[2] {
        "array" => Layout::Array,
        "coordinate" => Layout::Coordinate,
        other => return Err(fmt_err(path, format!("unsupported layout {other:?}"))),
    };
    let scalar_kind = match tokens[3] {
        "integer" => ScalarKind::Integer,
        "real" => ScalarKind::Real,
        "complex" => ScalarKind::Complex,
        other => return Err(fmt_err(path, format!("unsupported scalar kind {other:?}"))),
    };
    let symmetry = match tokens[4] {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        "skew-symmetric" => Symmetry::SkewSymmetric,
        "hermitian" => Symmetry::Hermitian,
        other => return Err(fmt_err(path, format!("unsupported symmetry {other:?}"))),
    };
    Ok((layout, scalar_kind, symmetry))
}

/// Write a dense `D x D` complex matrix as MatrixMarket `array complex
/// general`, converting up to double precision on the way out.
pub fn write_matrix<T: Scalar>(path: impl AsRef<Path>, matrix: &Array2<Cplx<T>>) -> Result<()> {
    let path = path.as_ref();
    let d = matrix.nrows();

    let mut body = String::new();
    writeln!(body, "%%MatrixMarket matrix array complex general").ok();
    writeln!(body, "{d} {d}").ok();
    for col in 0..d {
        for row in 0..d {
            let c = matrix[(row, col)];
            writeln!(
                body,
                "{:.17e} {:.17e}",
                c.re.to_f64().unwrap(),
                c.im.to_f64().unwrap()
            )
            .ok();
        }
    }

    let mut file = std::fs::File::create(path).map_err(|e| CssfError::io(path, e))?;
    file.write_all(body.as_bytes())
        .map_err(|e| CssfError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn round_trips_a_hermitian_matrix() {
        let dir = std::env::temp_dir().join(format!("cssfinder-mtx-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rho.mtx");

        let matrix: Array2<Cplx<f64>> = Array2::from_shape_vec(
            (2, 2),
            vec![
                Cplx::new(0.6, 0.0),
                Cplx::new(0.1, -0.2),
                Cplx::new(0.1, 0.2),
                Cplx::new(0.4, 0.0),
            ],
        )
        .unwrap();

        write_matrix(&path, &matrix).unwrap();
        let loaded: Array2<Cplx<f64>> = read_matrix(&path).unwrap();

        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(loaded[(i, j)].re, matrix[(i, j)].re, epsilon = 1e-12);
                assert_abs_diff_eq!(loaded[(i, j)].im, matrix[(i, j)].im, epsilon = 1e-12);
            }
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reads_coordinate_hermitian_with_mirrored_conjugate() {
        let dir = std::env::temp_dir().join(format!("cssfinder-mtx-test2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rho.mtx");
        std::fs::write(
            &path,
            "%%MatrixMarket matrix coordinate complex hermitian\n\
             2 2 3\n\
             1 1 1.0 0.0\n\
             2 1 0.1 0.2\n\
             2 2 0.4 0.0\n",
        )
        .unwrap();

        let loaded: Array2<Cplx<f64>> = read_matrix(&path).unwrap();
        assert_abs_diff_eq!(loaded[(0, 1)].re, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(loaded[(0, 1)].im, -0.2, epsilon = 1e-12);

        std::fs::remove_dir_all(&dir).ok();
    }
}
