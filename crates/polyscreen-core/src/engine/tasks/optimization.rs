use super::conformers::SELECTED_SUFFIX;
use super::{Stage, StageContext, read_field};
use crate::engine::error::StageError;
use crate::engine::executor::Invocation;
use crate::engine::transcript::Field;
use tracing::{info, instrument};

pub const HARTREE_TO_EV: f64 = 27.2114;
pub const TRANSCRIPT_FILE: &str = "opt-calc.out";
pub const OPTIMIZED_SUFFIX: &str = "-opt.xyz";
const XYZ_SUFFIX: &str = ".xyz";
const ENGINE_OUTPUT: &str = "xtbopt.xyz";

// xtb prints its closing summary block at a fixed distance from the end of the
// transcript; the implicit-solvent term shifts the total energy two tokens left.
const TOTAL_ENERGY: Field = Field::tail_window("total energy", 900, 100, 29);
const TOTAL_ENERGY_SOLVATED: Field = Field::tail_window("total energy", 900, 100, 27);
const SOLVATION_ENERGY: Field = Field::tail_window("solvation free energy", 900, 100, 18);

/// Converts the selected conformer to XYZ and relaxes it with GFN-xTB, in the
/// session's implicit solvent if one is configured.
pub struct GeometryOptimization;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedGeometry {
    pub structure: String,
    /// Hartree.
    pub total_energy: f64,
    /// eV; present only when a solvent is configured.
    pub solvation_energy: Option<f64>,
}

impl Stage for GeometryOptimization {
    type Output = OptimizedGeometry;

    const NAME: &'static str = "geometry optimization";

    #[instrument(skip_all, name = "geometry_optimization", fields(name = ctx.name))]
    fn run(&self, ctx: &StageContext<'_>) -> Result<Self::Output, StageError> {
        let engines = &ctx.config.engines;
        let mol = ctx.artifact(SELECTED_SUFFIX);
        ctx.require(&mol)?;
        let xyz = ctx.artifact(XYZ_SUFFIX);
        ctx.invoke(Invocation::new(&engines.converter).args([mol.as_str(), "-O", xyz.as_str()]))?;
        ctx.require(&xyz)?;

        let transcript = ctx.invoke(
            Invocation::new(&engines.xtb)
                .args([xyz.as_str(), "-opt"])
                .args(ctx.config.solvent_flags()),
        )?;
        ctx.workdir.write(TRANSCRIPT_FILE, transcript.as_str())?;

        let (total_energy, solvation_energy) = if ctx.config.solvent.is_some() {
            let total = read_field(&transcript, &engines.xtb, &TOTAL_ENERGY_SOLVATED)?;
            let solvation = read_field(&transcript, &engines.xtb, &SOLVATION_ENERGY)?;
            (total, Some(solvation * HARTREE_TO_EV))
        } else {
            (read_field(&transcript, &engines.xtb, &TOTAL_ENERGY)?, None)
        };

        ctx.require(ENGINE_OUTPUT)?;
        let structure = ctx.artifact(OPTIMIZED_SUFFIX);
        ctx.workdir.copy(ENGINE_OUTPUT, &structure)?;

        info!(total_energy, ?solvation_energy, "Geometry optimized.");
        Ok(OptimizedGeometry {
            structure,
            total_energy,
            solvation_energy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{
        SOLVATION_EH, ScriptedExecutor, TOTAL_ENERGY_EH, fake_engines, opt_transcript,
    };
    use super::*;
    use crate::engine::config::{SessionConfig, SessionConfigBuilder};
    use crate::engine::transcript::{ParseError, Transcript};
    use crate::engine::workdir::WorkDir;

    fn config(solvent: Option<&str>) -> SessionConfig {
        SessionConfigBuilder::new()
            .name("s")
            .repeat_length(1)
            .repeat_units(2)
            .conformers(1)
            .solvent(solvent.map(str::to_string))
            .build()
            .unwrap()
    }

    #[test]
    fn tail_fields_follow_solvent_layout() {
        let plain = opt_transcript(-10.5, None);
        assert_eq!(plain.number(&TOTAL_ENERGY.locator).unwrap(), -10.5);

        let solvated = opt_transcript(-11.25, Some(-0.02));
        assert_eq!(solvated.number(&TOTAL_ENERGY_SOLVATED.locator).unwrap(), -11.25);
        assert_eq!(solvated.number(&SOLVATION_ENERGY.locator).unwrap(), -0.02);
    }

    #[test]
    fn vacuum_run_reports_no_solvation_energy() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = WorkDir::acquire(dir.path()).unwrap();
        workdir.write("A.mol", "").unwrap();
        let config = config(None);
        let executor = fake_engines();
        let ctx = StageContext {
            name: "A",
            workdir: &workdir,
            config: &config,
            executor: &executor,
        };

        let geometry = GeometryOptimization.run(&ctx).unwrap();

        assert_eq!(geometry.total_energy, TOTAL_ENERGY_EH);
        assert_eq!(geometry.solvation_energy, None);
        assert_eq!(geometry.structure, "A-opt.xyz");
        assert!(workdir.contains("A-opt.xyz"));
        assert!(workdir.contains(TRANSCRIPT_FILE));
        let calls = executor.call_log();
        assert_eq!(calls, vec!["obabel A.mol -O A.xyz", "xtb A.xyz -opt"]);
    }

    #[test]
    fn solvated_run_passes_gbsa_and_converts_to_ev() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = WorkDir::acquire(dir.path()).unwrap();
        workdir.write("A.mol", "").unwrap();
        let config = config(Some("h2o"));
        let executor = fake_engines();
        let ctx = StageContext {
            name: "A",
            workdir: &workdir,
            config: &config,
            executor: &executor,
        };

        let geometry = GeometryOptimization.run(&ctx).unwrap();

        let solvation = geometry.solvation_energy.unwrap();
        assert!((solvation - SOLVATION_EH * HARTREE_TO_EV).abs() < 1e-9);
        assert_eq!(executor.call_log()[1], "xtb A.xyz -opt -gbsa H2O");
    }

    #[test]
    fn unparseable_transcript_is_kept_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = WorkDir::acquire(dir.path()).unwrap();
        workdir.write("A.mol", "").unwrap();
        let config = config(None);
        let executor = ScriptedExecutor::new()
            .on("obabel", None, |_, wd| {
                std::fs::write(wd.join("A.xyz"), "")?;
                Ok(Transcript::default())
            })
            .on("xtb", None, |_, _| Ok(Transcript::new("abnormal termination")));
        let ctx = StageContext {
            name: "A",
            workdir: &workdir,
            config: &config,
            executor: &executor,
        };

        let err = GeometryOptimization.run(&ctx).unwrap_err();

        assert!(matches!(
            err,
            StageError::Parse {
                source: ParseError::TokenOutOfRange { .. },
                ..
            }
        ));
        assert!(workdir.contains(TRANSCRIPT_FILE));
        assert!(!workdir.contains("A-opt.xyz"));
    }
}
