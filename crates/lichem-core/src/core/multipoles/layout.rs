use nalgebra::Vector3;
use std::fmt;
use std::str::FromStr;

const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// Polyhedral arrangement of the charge sites placed around each atom.
///
/// All layouts are centrosymmetric, so any charge pattern solved on them leaves the monopole
/// untouched by higher-order corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SiteLayout {
    /// 6 sites on the coordinate axes; exact through the dipole.
    Octahedron,
    /// 12 sites; exact through the quadrupole.
    Icosahedron,
    /// 20 sites; exact through the octupole.
    #[default]
    Dodecahedron,
}

impl SiteLayout {
    pub fn site_count(&self) -> usize {
        match self {
            SiteLayout::Octahedron => 6,
            SiteLayout::Icosahedron => 12,
            SiteLayout::Dodecahedron => 20,
        }
    }

    /// Highest multipole order the layout reproduces for every input.
    pub fn exact_order(&self) -> usize {
        match self {
            SiteLayout::Octahedron => 1,
            SiteLayout::Icosahedron => 2,
            SiteLayout::Dodecahedron => 3,
        }
    }

    /// Unit vectors from the atom centre to each site, in a fixed order.
    pub fn directions(&self) -> Vec<Vector3<f64>> {
        let vertices: Vec<Vector3<f64>> = match self {
            SiteLayout::Octahedron => vec![
                Vector3::x(),
                -Vector3::x(),
                Vector3::y(),
                -Vector3::y(),
                Vector3::z(),
                -Vector3::z(),
            ],
            SiteLayout::Icosahedron => {
                let mut v = Vec::with_capacity(12);
                for a in [-1.0, 1.0] {
                    for b in [-1.0, 1.0] {
                        v.push(Vector3::new(0.0, a, b * GOLDEN_RATIO));
                        v.push(Vector3::new(a, b * GOLDEN_RATIO, 0.0));
                        v.push(Vector3::new(b * GOLDEN_RATIO, 0.0, a));
                    }
                }
                v
            }
            SiteLayout::Dodecahedron => {
                let mut v = Vec::with_capacity(20);
                for x in [-1.0, 1.0] {
                    for y in [-1.0, 1.0] {
                        for z in [-1.0, 1.0] {
                            v.push(Vector3::new(x, y, z));
                        }
                    }
                }
                let inv = 1.0 / GOLDEN_RATIO;
                for a in [-1.0, 1.0] {
                    for b in [-1.0, 1.0] {
                        v.push(Vector3::new(0.0, a * inv, b * GOLDEN_RATIO));
                        v.push(Vector3::new(a * inv, b * GOLDEN_RATIO, 0.0));
                        v.push(Vector3::new(b * GOLDEN_RATIO, 0.0, a * inv));
                    }
                }
                v
            }
        };
        vertices.into_iter().map(|v| v.normalize()).collect()
    }
}

impl FromStr for SiteLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "octahedron" | "octahedral" | "6" => Ok(SiteLayout::Octahedron),
            "icosahedron" | "icosahedral" | "12" => Ok(SiteLayout::Icosahedron),
            "dodecahedron" | "dodecahedral" | "20" => Ok(SiteLayout::Dodecahedron),
            other => Err(format!(
                "Unknown site layout '{}'. Expected octahedron, icosahedron or dodecahedron.",
                other
            )),
        }
    }
}

impl fmt::Display for SiteLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SiteLayout::Octahedron => "octahedron",
            SiteLayout::Icosahedron => "icosahedron",
            SiteLayout::Dodecahedron => "dodecahedron",
        })
    }
}
