use super::{Stage, StageContext};
use crate::engine::error::StageError;
use crate::engine::executor::Invocation;
use tracing::{info, instrument};

pub const POLYMER_SUFFIX: &str = "-initial.mol";
pub const REPEAT_UNIT_SUFFIX: &str = "-repeat.mol";

/// Builds 3D structures for the full polymer chain and for a single repeat unit.
///
/// Each monomer descriptor is canonicalized and completed with hydrogens by the
/// builder before embedding.
pub struct StructureGeneration<'a> {
    pub descriptors: &'a [&'a str],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureArtifacts {
    pub polymer: String,
    pub repeat_unit: String,
}

impl StructureGeneration<'_> {
    fn invocation(&self, ctx: &StageContext<'_>, repeat_units: usize, output: &str) -> Invocation {
        let mut invocation = Invocation::new(&ctx.config.engines.builder)
            .arg("polymer")
            .args(["--canonicalize", "--add-hydrogens"])
            .args(["--repeat-units".to_string(), repeat_units.to_string()])
            .args(["--output", output]);
        for descriptor in self.descriptors {
            invocation = invocation.args(["--monomer", *descriptor]);
        }
        invocation
    }
}

impl Stage for StructureGeneration<'_> {
    type Output = StructureArtifacts;

    const NAME: &'static str = "structure generation";

    #[instrument(skip_all, name = "structure_generation", fields(name = ctx.name))]
    fn run(&self, ctx: &StageContext<'_>) -> Result<Self::Output, StageError> {
        let polymer = ctx.artifact(POLYMER_SUFFIX);
        ctx.invoke(self.invocation(ctx, ctx.config.repeat_units, &polymer))?;
        ctx.require(&polymer)?;

        let repeat_unit = ctx.artifact(REPEAT_UNIT_SUFFIX);
        ctx.invoke(self.invocation(ctx, 1, &repeat_unit))?;
        ctx.require(&repeat_unit)?;

        info!(
            monomers = self.descriptors.len(),
            repeat_units = ctx.config.repeat_units,
            "Built polymer and repeat-unit structures."
        );
        Ok(StructureArtifacts {
            polymer,
            repeat_unit,
        })
    }
}
