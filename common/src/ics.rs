use serde::{Deserialize, Serialize};

use crate::constants::{PACKET_MOMENTUM, PACKET_STIFFNESS};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum InitialConditions {
    /// A gaussian packet `exp(-0.5 * sqrt(s(x-cx)^2 + s(y-cy)^2 - i k y))` moving along y.
    /// When `center` is omitted the packet starts at `(Lx/2, Ly/5)`.
    GaussianPacket {
        center: Option<[f64; 2]>,
        stiffness: f64,
        momentum: f64,
    },

    /// A plane wave `exp(i (kx x + ky y))` filling the whole grid
    PlaneWave { wavevector: [f64; 2] },
}

impl Default for InitialConditions {
    fn default() -> Self {
        InitialConditions::GaussianPacket {
            center: None,
            stiffness: PACKET_STIFFNESS,
            momentum: PACKET_MOMENTUM,
        }
    }
}

/// Edge handling of the finite difference laplacian
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundaryCondition {
    /// Cells outside the grid are zero (closed box)
    #[default]
    ZeroPad,
    /// Cells outside the grid copy the nearest edge cell
    Replicate,
    /// Cells outside the grid mirror about the edge cell, without repeating it
    Reflect,
}

#[test]
fn test_ics_toml_tag() {
    let ics = InitialConditions::PlaneWave {
        wavevector: [0.5, 0.25],
    };
    let contents = toml::to_string(&ics).unwrap();
    assert!(contents.contains("type = \"PlaneWave\""));
    let parsed: InitialConditions = toml::from_str(&contents).unwrap();
    assert_eq!(parsed, ics);
}

#[test]
fn test_default_packet_has_no_center() {
    match InitialConditions::default() {
        InitialConditions::GaussianPacket {
            center,
            stiffness,
            momentum,
        } => {
            assert_eq!(center, None);
            assert_eq!(stiffness, 5.0);
            assert_eq!(momentum, 100.0);
        }
        other => panic!("unexpected default {other:?}"),
    }
}
