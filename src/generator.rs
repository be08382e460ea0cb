use itertools::{Either, Itertools};
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use std::collections::VecDeque;

/// Separator used when the sequence is read aloud
pub const SPEECH_SEPARATOR: &str = ", ";
/// Separator used when the sequence is shown on screen
pub const DISPLAY_SEPARATOR: &str = " - ";

/// An ordered list of numbers to memorize. Immutable once generated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence(Vec<u32>);

impl Sequence {
    pub fn new(values: Vec<u32>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The order answers are checked against: reversed in backwards mode.
    pub fn expected(&self, backwards: bool) -> impl Iterator<Item = u32> + '_ {
        let values = self.0.iter().copied();
        if backwards {
            Either::Left(values.rev())
        } else {
            Either::Right(values)
        }
    }

    /// Value expected in answer slot `index`
    pub fn expected_at(&self, index: usize, backwards: bool) -> Option<u32> {
        self.expected(backwards).nth(index)
    }

    pub fn display_text(&self) -> String {
        self.0.iter().join(DISPLAY_SEPARATOR)
    }

    pub fn speech_text(&self) -> String {
        self.0.iter().join(SPEECH_SEPARATOR)
    }
}

/// Anything that can hand the round machine a fresh sequence
pub trait SequenceSource {
    fn generate(&mut self, length: usize, exclusive_max: u32) -> Sequence;
}

/// Produces sequences of bounded random numbers
pub struct SequenceGenerator {
    rng: Box<dyn RngCore>,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self {
            rng: Box::new(rand::thread_rng()),
        }
    }

    /// Deterministic generator for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Box::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SequenceSource for SequenceGenerator {
    /// `length` independent values uniformly drawn from `[0, exclusive_max)`.
    /// Both arguments are clamped to at least 1.
    fn generate(&mut self, length: usize, exclusive_max: u32) -> Sequence {
        let length = length.max(1);
        let exclusive_max = exclusive_max.max(1);

        let values = (0..length)
            .map(|_| self.rng.gen_range(0..exclusive_max))
            .collect();

        Sequence(values)
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Replays predetermined sequences in order, ignoring the requested shape.
/// Once exhausted it yields zeros of the requested length.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSequences {
    queue: VecDeque<Vec<u32>>,
}

impl ScriptedSequences {
    pub fn new<I: IntoIterator<Item = Vec<u32>>>(sequences: I) -> Self {
        Self {
            queue: sequences.into_iter().collect(),
        }
    }
}

impl SequenceSource for ScriptedSequences {
    fn generate(&mut self, length: usize, _exclusive_max: u32) -> Sequence {
        match self.queue.pop_front() {
            Some(values) => Sequence(values),
            None => Sequence(vec![0; length.max(1)]),
        }
    }
}

impl std::fmt::Debug for SequenceGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceGenerator").finish_non_exhaustive()
    }
}
