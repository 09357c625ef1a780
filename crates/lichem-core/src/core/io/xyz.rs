use crate::core::io::traits::RecordFile;
use crate::core::models::atom::Atom;
use crate::core::simulation::beads::split_atom_major;
use nalgebra::Point3;
use std::io::{self, BufRead};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("File declares {declared} atoms but contains {found}")]
    CountMismatch { declared: usize, found: usize },
    #[error("Bead structure has {found} entries, expected {atoms} atoms x {beads} beads")]
    BeadCountMismatch {
        atoms: usize,
        beads: usize,
        found: usize,
    },
    #[error("Missing atom count header")]
    MissingHeader,
}

/// One `element x y z` entry of an XYZ file; coordinates in Ångström.
#[derive(Debug, Clone, PartialEq)]
pub struct XyzRecord {
    pub element: String,
    pub position: Point3<f64>,
}

/// Reader for LICHEM XYZ structures.
///
/// The first non-empty line holds the atom count. LICHEM's own files go straight to the
/// coordinates; a conventional XYZ comment line is recognised by the body holding exactly one
/// non-empty line more than the declared count, and is then skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct XyzFile;

fn parse_record(line: &str, line_num: usize) -> Result<XyzRecord, XyzError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(XyzError::Parse {
            line: line_num,
            reason: format!("expected 'element x y z', got '{}'", line.trim()),
        });
    }
    let coord = |i: usize| -> Result<f64, XyzError> {
        match fields[i].parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            Ok(_) => Err(XyzError::Parse {
                line: line_num,
                reason: format!("non-finite coordinate '{}'", fields[i]),
            }),
            Err(_) => Err(XyzError::Parse {
                line: line_num,
                reason: format!("invalid coordinate '{}'", fields[i]),
            }),
        }
    };
    Ok(XyzRecord {
        element: fields[0].to_string(),
        position: Point3::new(coord(1)?, coord(2)?, coord(3)?),
    })
}

impl RecordFile for XyzFile {
    type Record = XyzRecord;
    type Error = XyzError;

    fn read_from(&self, reader: &mut impl BufRead) -> Result<Vec<XyzRecord>, XyzError> {
        let mut lines = reader
            .lines()
            .enumerate()
            .map(|(i, l)| l.map(|l| (i + 1, l)));

        let declared = loop {
            match lines.next() {
                Some(line) => {
                    let (line_num, line) = line?;
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    break trimmed.parse::<usize>().map_err(|_| XyzError::Parse {
                        line: line_num,
                        reason: format!("invalid atom count '{}'", trimmed),
                    })?;
                }
                None => return Err(XyzError::MissingHeader),
            }
        };

        let body = lines.collect::<Result<Vec<_>, _>>()?;
        let filled = body.iter().filter(|(_, l)| !l.trim().is_empty()).count();
        let has_comment = filled == declared + 1
            && body.first().is_some_and(|(_, l)| !l.trim().is_empty());

        let mut records = Vec::with_capacity(declared);
        for (line_num, line) in body.iter().skip(usize::from(has_comment)) {
            if line.trim().is_empty() {
                continue;
            }
            records.push(parse_record(line, *line_num)?);
        }

        if records.len() != declared {
            return Err(XyzError::CountMismatch {
                declared,
                found: records.len(),
            });
        }
        Ok(records)
    }
}

/// Builds single-replica MM atoms from XYZ records.
pub fn atoms_from_records(records: &[XyzRecord]) -> Vec<Atom> {
    records
        .iter()
        .map(|r| Atom::new(&r.element, r.position))
        .collect()
}

/// Splits a bead structure (`atoms * beads` records, atom-major) into per-atom replica
/// positions.
pub fn bead_positions(
    records: &[XyzRecord],
    atoms: usize,
    beads: usize,
) -> Result<Vec<Vec<Point3<f64>>>, XyzError> {
    let positions: Vec<Point3<f64>> = records.iter().map(|r| r.position).collect();
    split_atom_major(&positions, atoms, beads).ok_or(XyzError::BeadCountMismatch {
        atoms,
        beads,
        found: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn read(text: &str) -> Result<Vec<XyzRecord>, XyzError> {
        XyzFile.read_from(&mut Cursor::new(text))
    }

    #[test]
    fn reads_lichem_xyz_without_comment() {
        let records = read("3\nO 0.0 0.0 0.0\nH 0.96 0.0 0.0\nH -0.24 0.93 0.0\n").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].element, "H");
        assert_eq!(records[2].position, Point3::new(-0.24, 0.93, 0.0));
    }

    #[test]
    fn skips_conventional_comment_line() {
        let records = read("2\nwater fragment\nO 0 0 0\nH 1 0 0\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].element, "O");
    }

    #[test]
    fn count_mismatch_is_reported() {
        let err = read("3\nO 0 0 0\nH 1 0 0\n").unwrap_err();
        assert!(matches!(
            err,
            XyzError::CountMismatch {
                declared: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn bad_coordinate_names_the_line() {
        let err = read("2\nO 0 0 0\nH 1 x 0\n").unwrap_err();
        assert!(matches!(err, XyzError::Parse { line: 3, .. }));
        assert!(matches!(read(""), Err(XyzError::MissingHeader)));
    }

    #[test]
    fn bead_positions_are_atom_major() {
        let records = read("4\nO 0 0 0\nO 0 0 1\nH 1 0 0\nH 1 0 1\n").unwrap();
        let beads = bead_positions(&records, 2, 2).unwrap();
        assert_eq!(beads[0][1], Point3::new(0.0, 0.0, 1.0));
        assert_eq!(beads[1][0], Point3::new(1.0, 0.0, 0.0));
        assert!(matches!(
            bead_positions(&records, 3, 2),
            Err(XyzError::BeadCountMismatch { found: 4, .. })
        ));
    }

    #[test]
    fn malformed_first_record_is_not_taken_for_a_comment() {
        let err = read("3\nO 0 x 0\nH 0.96 0 0\nH -0.24 0.93 0\n").unwrap_err();
        assert!(matches!(err, XyzError::Parse { line: 2, .. }));
    }

    #[test]
    fn blank_comment_line_is_skipped() {
        let records = read("2\n\nO 0 0 0\nH 1 0 0\n").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        for text in ["1\nO nan 0 0\n", "1\nO 0 inf 0\n", "2\nO 0 0 0\nH 0 0 -inf\n"] {
            match read(text) {
                Err(XyzError::Parse { reason, .. }) => assert!(reason.contains("non-finite")),
                other => panic!("expected a parse error, got {:?}", other),
            }
        }
    }

    #[test]
    fn structure_reads_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frag.xyz");
        fs::write(&path, "2\nC 0.5 0 0\nN 0 1.25 0\n").unwrap();

        let atoms = atoms_from_records(&XyzFile.read_from_path(&path).unwrap());
        assert_eq!(atoms[1].element, "N");
        assert_eq!(atoms[1].positions[0], Point3::new(0.0, 1.25, 0.0));
    }
}
