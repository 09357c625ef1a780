use crate::core::models::multipole::CartesianMoments;
use nalgebra::Point3;
use std::io::{self, Write};

/// Writes embedding charges as `x y z q` lines (Ångström, e), the layout QM input generators
/// paste into their external-charge sections.
pub fn write_charges(
    writer: &mut impl Write,
    charges: impl IntoIterator<Item = (Point3<f64>, f64)>,
) -> io::Result<usize> {
    let mut count = 0;
    for (p, q) in charges {
        writeln!(writer, "{:.6} {:.6} {:.6} {:.8}", p.x, p.y, p.z, q)?;
        count += 1;
    }
    Ok(count)
}

/// One atom's global-frame multipole for the poles report.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalPoleRecord {
    pub atom: usize,
    pub element: String,
    /// Atom position in Ångström.
    pub position: Point3<f64>,
    /// Global-frame Cartesian moments in atomic units.
    pub moments: CartesianMoments,
}

/// Writes a human-readable report of global-frame multipoles for one replica.
pub fn write_global_poles(
    writer: &mut impl Write,
    replica: usize,
    records: &[GlobalPoleRecord],
) -> io::Result<()> {
    writeln!(writer, "Global multipoles for replica {} (atomic units)", replica)?;
    writeln!(writer)?;
    for r in records {
        let m = &r.moments;
        let q = &m.quadrupole;
        let o = &m.octupole;
        writeln!(
            writer,
            "Atom {} ({}) at {:.6} {:.6} {:.6}",
            r.atom, r.element, r.position.x, r.position.y, r.position.z
        )?;
        writeln!(writer, "  Charge:     {:>12.6}", m.charge)?;
        writeln!(
            writer,
            "  Dipole:     {:>12.6} {:>12.6} {:>12.6}",
            m.dipole.x, m.dipole.y, m.dipole.z
        )?;
        writeln!(
            writer,
            "  Quadrupole: {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
            q[(0, 0)],
            q[(0, 1)],
            q[(0, 2)],
            q[(1, 1)],
            q[(1, 2)],
            q[(2, 2)]
        )?;
        write!(writer, "  Octupole:  ")?;
        for c in o.components() {
            write!(writer, " {:>12.6}", c)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn charges_are_written_one_per_line() {
        let mut out = Vec::new();
        let n = write_charges(
            &mut out,
            [
                (Point3::new(1.0, 2.0, 3.0), 0.5),
                (Point3::new(-1.0, 0.0, 0.25), -0.5),
            ],
        )
        .unwrap();
        assert_eq!(n, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "1.000000 2.000000 3.000000 0.50000000");
        assert_eq!(lines[1], "-1.000000 0.000000 0.250000 -0.50000000");
    }

    #[test]
    fn report_lists_every_atom() {
        let mut moments = CartesianMoments::monopole(-0.8);
        moments.dipole = Vector3::new(0.0, 0.0, 0.3);
        let records = vec![
            GlobalPoleRecord {
                atom: 0,
                element: "O".to_string(),
                position: Point3::origin(),
                moments,
            },
            GlobalPoleRecord {
                atom: 1,
                element: "H".to_string(),
                position: Point3::new(0.96, 0.0, 0.0),
                moments: CartesianMoments::monopole(0.4),
            },
        ];
        let mut out = Vec::new();
        write_global_poles(&mut out, 2, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Global multipoles for replica 2"));
        assert!(text.contains("Atom 0 (O)"));
        assert!(text.contains("Atom 1 (H) at 0.960000"));
        assert!(text.contains("    0.300000"));
    }
}
