use super::config::SessionConfig;
use super::error::{PipelineError, StageError};
use super::executor::Executor;
use super::tasks::conformers::ConformerSearch;
use super::tasks::excitation::Excitation;
use super::tasks::optimization::GeometryOptimization;
use super::tasks::potentials::VerticalPotentials;
use super::tasks::structure::StructureGeneration;
use super::tasks::{Stage, StageContext};
use super::workdir::WorkDir;
use crate::core::models::composition::Composition;
use crate::core::models::record::PropertyRecord;
use tracing::{debug, instrument};

fn stage<S: Stage>(stage: &S, ctx: &StageContext<'_>) -> Result<S::Output, PipelineError> {
    debug!(stage = S::NAME, "Starting stage.");
    stage.run(ctx).map_err(|source| PipelineError {
        stage: S::NAME,
        source,
    })
}

/// Runs the five pipeline stages for one composition, in order, inside a
/// working directory. The first failing stage ends the run.
pub struct Runner<'a> {
    config: &'a SessionConfig,
    executor: &'a dyn Executor,
}

impl<'a> Runner<'a> {
    pub fn new(config: &'a SessionConfig, executor: &'a dyn Executor) -> Self {
        Self { config, executor }
    }

    #[instrument(skip_all, name = "runner", fields(composition = %composition))]
    pub fn run(
        &self,
        composition: &Composition,
        descriptors: &[&str],
        workdir: &WorkDir,
    ) -> Result<PropertyRecord, PipelineError> {
        let name = composition.name();
        let ctx = StageContext {
            name: &name,
            workdir,
            config: self.config,
            executor: self.executor,
        };

        stage(&StructureGeneration { descriptors }, &ctx)?;
        stage(&ConformerSearch, &ctx)?;
        let geometry = stage(&GeometryOptimization, &ctx)?;
        let potentials = stage(&VerticalPotentials, &ctx)?;
        let excitation = stage(&Excitation, &ctx)?;

        Ok(PropertyRecord {
            composition: composition.clone(),
            ionization_potential: potentials.ionization_potential,
            electron_affinity: potentials.electron_affinity,
            optical_gap: excitation.optical_gap,
            oscillator_strength: excitation.oscillator_strength,
            solvation_energy: geometry.solvation_energy,
        })
    }
}

/// Wraps a failure to prepare the working directory as a pipeline failure.
pub(crate) fn workdir_failure(source: std::io::Error) -> PipelineError {
    PipelineError {
        stage: "working directory",
        source: StageError::Io(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::SessionConfigBuilder;
    use crate::engine::tasks::testing::{
        EA_EV, IP_EV, OPTICAL_GAP_EV, OSCILLATOR_STRENGTH, ScriptedExecutor, arg_after,
        fake_engines,
    };
    use crate::engine::transcript::Transcript;

    fn config(solvent: Option<&str>) -> SessionConfig {
        SessionConfigBuilder::new()
            .name("session")
            .repeat_length(2)
            .repeat_units(3)
            .conformers(3)
            .solvent(solvent.map(str::to_string))
            .build()
            .unwrap()
    }

    fn composition() -> Composition {
        ["A", "B"].into_iter().collect()
    }

    #[test]
    fn full_pipeline_produces_property_record() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = WorkDir::acquire(dir.path().join("A-B")).unwrap();
        let config = config(None);
        let executor = fake_engines();

        let record = Runner::new(&config, &executor)
            .run(&composition(), &["C1=CC=CS1", "C1=CC=CC=C1"], &workdir)
            .unwrap();

        assert_eq!(record.composition, composition());
        assert_eq!(record.ionization_potential, IP_EV);
        assert_eq!(record.electron_affinity, EA_EV);
        assert_eq!(record.optical_gap, OPTICAL_GAP_EV);
        assert_eq!(record.oscillator_strength, OSCILLATOR_STRENGTH);
        assert_eq!(record.solvation_energy, None);

        let programs: Vec<String> = executor
            .call_log()
            .iter()
            .map(|c| c.split(' ').take(2).collect::<Vec<_>>().join(" "))
            .collect();
        assert_eq!(
            programs,
            vec![
                "polybuild polymer",
                "polybuild polymer",
                "polybuild conformers",
                "obabel A-B.mol",
                "xtb A-B.xyz",
                "xtb A-B-opt.xyz",
                "xtb A-B-opt.xyz",
                "xtb A-B-opt.xyz",
                "stda -xtb",
            ]
        );
    }

    #[test]
    fn solvated_pipeline_reports_solvation_energy() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = WorkDir::acquire(dir.path().join("A-B")).unwrap();
        let config = config(Some("CHCl3"));
        let executor = fake_engines();

        let record = Runner::new(&config, &executor)
            .run(&composition(), &["C", "N"], &workdir)
            .unwrap();

        assert!(record.solvation_energy.is_some());
    }

    #[test]
    fn failure_at_optimization_stops_later_stages() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = WorkDir::acquire(dir.path().join("A-B")).unwrap();
        let config = config(None);
        let failing = ScriptedExecutor::new()
            .on("polybuild", Some("polymer"), |inv, wd| {
                let out = arg_after(inv, "--output").unwrap();
                std::fs::write(wd.join(out), "")?;
                Ok(Transcript::default())
            })
            .on("polybuild", Some("conformers"), |_, wd| {
                std::fs::write(wd.join("A-B-conf0.mol"), "")?;
                Ok(Transcript::new("conformer 0 energy 1.0\n"))
            })
            .on("obabel", None, |_, _| Ok(Transcript::default()));

        let err = Runner::new(&config, &failing)
            .run(&composition(), &["C", "N"], &workdir)
            .unwrap_err();

        assert_eq!(err.stage, GeometryOptimization::NAME);
        assert!(matches!(err.source, StageError::MissingArtifact(_)));
        assert!(!failing.call_log().iter().any(|c| c.starts_with("xtb")));
        assert!(!workdir.contains("A-B-opt.xyz"));
        assert!(!workdir.contains("opt-calc.out"));
    }

    #[test]
    fn workdir_failure_is_attributed_to_its_own_stage() {
        let err = workdir_failure(std::io::Error::other("read-only file system"));
        assert_eq!(err.stage, "working directory");
        assert!(err.to_string().starts_with("working directory failed"));
    }
}
