use super::config::{ConfigError, Selection};
use crate::core::models::catalog::MonomerCatalog;
use crate::core::models::composition::Composition;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// The Cartesian product of catalog identifiers, with repetition, for a fixed
/// repeat-unit length.
///
/// Positions are numbered in lexicographic catalog order: position `i` is `i`
/// written in base `|catalog|` with `length` digits, most significant first.
#[derive(Debug, Clone)]
pub struct CompositionSpace {
    ids: Vec<String>,
    length: usize,
}

impl CompositionSpace {
    pub fn new(catalog: &MonomerCatalog, length: usize) -> Self {
        Self {
            ids: catalog.ids().map(str::to_string).collect(),
            length,
        }
    }

    /// `|catalog|^length`, or `None` if that does not fit in a `u64`.
    pub fn size(&self) -> Option<u64> {
        let length = u32::try_from(self.length).ok()?;
        (self.ids.len() as u64).checked_pow(length)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Materializes the composition at `index`. `index` must be below [`Self::size`].
    pub fn composition_at(&self, mut index: u64) -> Composition {
        let base = self.ids.len() as u64;
        let mut digits = vec![0usize; self.length];
        for slot in digits.iter_mut().rev() {
            *slot = (index % base) as usize;
            index /= base;
        }
        Composition::new(digits.into_iter().map(|d| self.ids[d].clone()).collect())
    }

    /// Every composition, lazily, in lexicographic order. Restartable: each call
    /// yields a fresh iterator over the same sequence.
    pub fn exhaustive(&self) -> Exhaustive<'_> {
        Exhaustive {
            space: self,
            digits: if self.ids.is_empty() && self.length > 0 {
                None
            } else {
                Some(vec![0; self.length])
            },
        }
    }

    /// `count` distinct positions drawn uniformly without replacement.
    ///
    /// Fails before drawing anything if `count` exceeds the size of the space.
    pub fn sample<R: Rng>(&self, count: u64, rng: R) -> Result<RandomSample<'_, R>, ConfigError> {
        let size = self.size().ok_or(ConfigError::SpaceTooLarge {
            monomers: self.ids.len(),
            length: self.length,
        })?;
        if count > size {
            return Err(ConfigError::InvalidSampleCount {
                requested: count,
                available: size,
            });
        }
        Ok(RandomSample {
            space: self,
            size,
            remaining: count,
            drawn: HashSet::new(),
            rng,
        })
    }

    /// The lazy composition sequence for a screening selection.
    #[instrument(level = "debug", skip(self))]
    pub fn select(
        &self,
        selection: Selection,
    ) -> Result<Box<dyn Iterator<Item = Composition> + Send + '_>, ConfigError> {
        match selection {
            Selection::Exhaustive => Ok(Box::new(self.exhaustive())),
            Selection::Random { count, seed } => {
                let rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                Ok(Box::new(self.sample(count, rng)?))
            }
        }
    }

    /// Number of compositions `selection` will yield, if representable.
    pub fn selection_len(&self, selection: Selection) -> Option<u64> {
        match selection {
            Selection::Exhaustive => self.size(),
            Selection::Random { count, .. } => Some(count),
        }
    }
}

/// Odometer over the composition space; see [`CompositionSpace::exhaustive`].
#[derive(Debug, Clone)]
pub struct Exhaustive<'a> {
    space: &'a CompositionSpace,
    digits: Option<Vec<usize>>,
}

impl Iterator for Exhaustive<'_> {
    type Item = Composition;

    fn next(&mut self) -> Option<Self::Item> {
        let digits = self.digits.as_mut()?;
        let current = Composition::new(
            digits
                .iter()
                .map(|&d| self.space.ids[d].clone())
                .collect(),
        );

        let base = self.space.ids.len();
        let mut carried_out = true;
        for digit in digits.iter_mut().rev() {
            *digit += 1;
            if *digit < base {
                carried_out = false;
                break;
            }
            *digit = 0;
        }
        if carried_out {
            self.digits = None;
        }
        Some(current)
    }
}

/// Uniform sampling without replacement; see [`CompositionSpace::sample`].
///
/// A position that was already drawn is treated as a consumed slot and redrawn,
/// so exactly `count` distinct compositions are produced.
#[derive(Debug)]
pub struct RandomSample<'a, R> {
    space: &'a CompositionSpace,
    size: u64,
    remaining: u64,
    drawn: HashSet<u64>,
    rng: R,
}

impl<R: Rng> Iterator for RandomSample<'_, R> {
    type Item = Composition;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            let index = self.rng.gen_range(0..self.size);
            if self.drawn.insert(index) {
                self.remaining -= 1;
                return Some(self.space.composition_at(index));
            }
            debug!(index, "Position already drawn; redrawing.");
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}
