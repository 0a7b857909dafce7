use super::structure::POLYMER_SUFFIX;
use super::{Stage, StageContext};
use crate::engine::error::StageError;
use crate::engine::executor::Invocation;
use crate::engine::transcript::{ParseError, Transcript};
use tracing::{debug, info, instrument};

const CONFORMER_PREFIX: &str = "-conf";
pub const SELECTED_SUFFIX: &str = ".mol";
const ENERGY_LINE_MARKER: &str = "conformer";

/// Embeds `conformers` conformations of the polymer, minimizes each with a
/// classical force field and promotes the lowest-energy one to `NAME.mol`.
pub struct ConformerSearch;

#[derive(Debug, Clone, PartialEq)]
pub struct ConformerSelection {
    pub index: usize,
    pub energy: f64,
    pub structure: String,
}

/// Reads `conformer <index> energy <value>` lines in the order they were printed.
fn parse_energies(transcript: &Transcript) -> Result<Vec<(usize, f64)>, ParseError> {
    let mut energies = Vec::new();
    for line in transcript.as_str().lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first() != Some(&ENERGY_LINE_MARKER) {
            continue;
        }
        if tokens.len() < 4 || tokens[2] != "energy" {
            return Err(ParseError::TokenOutOfRange {
                index: 3,
                available: tokens.len(),
            });
        }
        let index = tokens[1]
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidIndex(tokens[1].to_string()))?;
        let energy = tokens[3]
            .parse::<f64>()
            .map_err(|source| ParseError::InvalidNumber {
                token: tokens[3].to_string(),
                source,
            })?;
        energies.push((index, energy));
    }
    Ok(energies)
}

/// Lowest finite energy wins; ties go to the earliest conformer.
fn select_lowest(energies: &[(usize, f64)]) -> Option<(usize, f64)> {
    energies
        .iter()
        .copied()
        .filter(|(_, energy)| energy.is_finite())
        .fold(None, |best, candidate| match best {
            Some((_, e)) if e <= candidate.1 => best,
            _ => Some(candidate),
        })
}

impl Stage for ConformerSearch {
    type Output = ConformerSelection;

    const NAME: &'static str = "conformer search";

    #[instrument(skip_all, name = "conformer_search", fields(name = ctx.name))]
    fn run(&self, ctx: &StageContext<'_>) -> Result<Self::Output, StageError> {
        let input = ctx.artifact(POLYMER_SUFFIX);
        ctx.require(&input)?;
        let prefix = ctx.artifact(CONFORMER_PREFIX);

        let transcript = ctx.invoke(
            Invocation::new(&ctx.config.engines.builder)
                .arg("conformers")
                .args(["--input", input.as_str()])
                .args(["--count".to_string(), ctx.config.conformers.to_string()])
                .args(["--output-prefix", prefix.as_str()]),
        )?;

        let parse_error = |source: ParseError| StageError::Parse {
            program: ctx.config.engines.builder.clone(),
            field: "conformer energy",
            source,
        };
        let energies = parse_energies(&transcript).map_err(parse_error)?;
        debug!(count = energies.len(), "Parsed conformer energies.");
        let (index, energy) = select_lowest(&energies)
            .ok_or_else(|| parse_error(ParseError::MarkerNotFound(ENERGY_LINE_MARKER)))?;

        let chosen = format!("{}{}.mol", prefix, index);
        ctx.require(&chosen)?;
        let structure = ctx.artifact(SELECTED_SUFFIX);
        ctx.workdir.copy(&chosen, &structure)?;

        info!(index, energy, "Selected lowest-energy conformer.");
        Ok(ConformerSelection {
            index,
            energy,
            structure,
        })
    }
}
