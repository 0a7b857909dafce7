use super::composition::Composition;
use serde::Serialize;

/// Properties computed for one successfully evaluated composition. Energies are in eV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord {
    pub composition: Composition,
    pub ionization_potential: f64,
    pub electron_affinity: f64,
    pub optical_gap: f64,
    pub oscillator_strength: f64,
    /// Only present when an implicit solvent model was active.
    pub solvation_energy: Option<f64>,
}

impl PropertyRecord {
    /// IP - EA.
    pub fn fundamental_gap(&self) -> f64 {
        self.ionization_potential - self.electron_affinity
    }

    /// Fundamental gap minus the first optical excitation energy.
    pub fn exciton_binding_energy(&self) -> f64 {
        self.fundamental_gap() - self.optical_gap
    }
}
