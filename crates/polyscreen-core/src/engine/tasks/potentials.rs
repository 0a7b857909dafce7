use super::optimization::OPTIMIZED_SUFFIX;
use super::{Stage, StageContext, read_field};
use crate::engine::error::StageError;
use crate::engine::executor::Invocation;
use crate::engine::transcript::Field;
use tracing::{info, instrument};

const IONIZATION_POTENTIAL: Field = Field::after_marker("ionization potential", "delta SCC IP", 4);
const ELECTRON_AFFINITY: Field = Field::after_marker("electron affinity", "delta SCC EA", 4);

/// Vertical ionization potential and electron affinity of the optimized geometry.
pub struct VerticalPotentials;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Potentials {
    pub ionization_potential: f64,
    pub electron_affinity: f64,
}

impl VerticalPotentials {
    fn single(ctx: &StageContext<'_>, flag: &str, field: &Field) -> Result<f64, StageError> {
        let xtb = &ctx.config.engines.xtb;
        let transcript = ctx.invoke(
            Invocation::new(xtb)
                .args([ctx.artifact(OPTIMIZED_SUFFIX), flag.to_string()])
                .args(ctx.config.solvent_flags()),
        )?;
        read_field(&transcript, xtb, field)
    }
}

impl Stage for VerticalPotentials {
    type Output = Potentials;

    const NAME: &'static str = "vertical potentials";

    #[instrument(skip_all, name = "vertical_potentials", fields(name = ctx.name))]
    fn run(&self, ctx: &StageContext<'_>) -> Result<Self::Output, StageError> {
        ctx.require(&ctx.artifact(OPTIMIZED_SUFFIX))?;
        let ionization_potential = Self::single(ctx, "-vip", &IONIZATION_POTENTIAL)?;
        let electron_affinity = Self::single(ctx, "-vea", &ELECTRON_AFFINITY)?;
        info!(ionization_potential, electron_affinity, "Vertical potentials computed.");
        Ok(Potentials {
            ionization_potential,
            electron_affinity,
        })
    }
}
