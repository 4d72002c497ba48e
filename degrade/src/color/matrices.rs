//! Dichromacy transform matrices.
//!
//! Two sets are kept side by side: the historical "basic" matrices whose rows
//! sum to exactly one, and the perceptually corrected "improved" set derived
//! from Machado et al. (2009). Both are reproduced verbatim; neither is
//! computed from the other.

use serde::{Deserialize, Serialize};

use crate::kind::DegradationKind;

/// Immutable 3x3 linear map over normalized RGB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    rows: [[f64; 3]; 3],
}

impl TransformMatrix {
    pub const IDENTITY: TransformMatrix =
        TransformMatrix::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub const fn new(rows: [[f64; 3]; 3]) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[[f64; 3]; 3] {
        &self.rows
    }

    /// `M · rgb` for a single column vector.
    pub fn apply(&self, rgb: [f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (o, row) in out.iter_mut().zip(self.rows.iter()) {
            *o = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
        }
        out
    }

    pub fn row_sums(&self) -> [f64; 3] {
        let mut sums = [0.0; 3];
        for (s, row) in sums.iter_mut().zip(self.rows.iter()) {
            *s = row.iter().sum();
        }
        sums
    }
}

pub const PROTANOPIA_BASIC: TransformMatrix = TransformMatrix::new([
    [0.56667, 0.43333, 0.00000],
    [0.55833, 0.44167, 0.00000],
    [0.00000, 0.24167, 0.75833],
]);

pub const DEUTERANOPIA_BASIC: TransformMatrix = TransformMatrix::new([
    [0.62500, 0.37500, 0.00000],
    [0.70000, 0.30000, 0.00000],
    [0.00000, 0.30000, 0.70000],
]);

pub const TRITANOPIA_BASIC: TransformMatrix = TransformMatrix::new([
    [0.95000, 0.05000, 0.00000],
    [0.00000, 0.43333, 0.56667],
    [0.00000, 0.47500, 0.52500],
]);

pub const PROTANOPIA_IMPROVED: TransformMatrix = TransformMatrix::new([
    [0.152286, 1.052583, -0.204868],
    [0.114503, 0.786281, 0.099216],
    [-0.003882, -0.048116, 1.051998],
]);

pub const DEUTERANOPIA_IMPROVED: TransformMatrix = TransformMatrix::new([
    [0.367322, 0.860646, -0.227968],
    [0.280085, 0.672501, 0.047413],
    [-0.011820, 0.042940, 0.968881],
]);

pub const TRITANOPIA_IMPROVED: TransformMatrix = TransformMatrix::new([
    [1.255528, -0.076749, -0.178779],
    [-0.078411, 0.930809, 0.147602],
    [0.004733, 0.691367, 0.303900],
]);

/// The three simulated dichromacies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dichromacy {
    Protanopia,
    Deuteranopia,
    Tritanopia,
}

impl Dichromacy {
    pub const ALL: [Dichromacy; 3] = [
        Dichromacy::Protanopia,
        Dichromacy::Deuteranopia,
        Dichromacy::Tritanopia,
    ];

    /// Matrix for this deficiency from the basic or improved set.
    pub fn matrix(&self, improved: bool) -> &'static TransformMatrix {
        match (self, improved) {
            (Dichromacy::Protanopia, false) => &PROTANOPIA_BASIC,
            (Dichromacy::Protanopia, true) => &PROTANOPIA_IMPROVED,
            (Dichromacy::Deuteranopia, false) => &DEUTERANOPIA_BASIC,
            (Dichromacy::Deuteranopia, true) => &DEUTERANOPIA_IMPROVED,
            (Dichromacy::Tritanopia, false) => &TRITANOPIA_BASIC,
            (Dichromacy::Tritanopia, true) => &TRITANOPIA_IMPROVED,
        }
    }

    pub fn kind(&self) -> DegradationKind {
        match self {
            Dichromacy::Protanopia => DegradationKind::Protanopia,
            Dichromacy::Deuteranopia => DegradationKind::Deuteranopia,
            Dichromacy::Tritanopia => DegradationKind::Tritanopia,
        }
    }

    pub fn from_kind(kind: DegradationKind) -> Option<Self> {
        match kind {
            DegradationKind::Protanopia => Some(Dichromacy::Protanopia),
            DegradationKind::Deuteranopia => Some(Dichromacy::Deuteranopia),
            DegradationKind::Tritanopia => Some(Dichromacy::Tritanopia),
            _ => None,
        }
    }
}
