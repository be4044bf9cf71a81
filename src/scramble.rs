use itertools::Itertools;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fmt;

/// Number of moves shown before each solve unless configured otherwise
pub const DEFAULT_SCRAMBLE_LENGTH: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Face {
    R,
    U,
    B,
    L,
    D,
    F,
}

pub const FACES: [Face; 6] = [Face::R, Face::U, Face::B, Face::L, Face::D, Face::F];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Turn {
    #[strum(to_string = "")]
    Quarter,
    #[strum(to_string = "2")]
    Half,
    #[strum(to_string = "'")]
    Prime,
}

pub const TURNS: [Turn; 3] = [Turn::Quarter, Turn::Half, Turn::Prime];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub face: Face,
    pub turn: Turn,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.face, self.turn)
    }
}

/// A random move sequence. Face and turn are drawn independently, so
/// consecutive moves may cancel or repeat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scramble {
    moves: Vec<Move>,
}

impl Scramble {
    pub fn random<R: Rng + ?Sized>(length: usize, rng: &mut R) -> Self {
        let moves = (0..length)
            .map(|_| Move {
                face: FACES[rng.gen_range(0..FACES.len())],
                turn: TURNS[rng.gen_range(0..TURNS.len())],
            })
            .collect();
        Self { moves }
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl fmt::Display for Scramble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.moves.iter().join(" "))
    }
}

/// Produces a fresh scramble for each attempt
#[derive(Debug, Clone)]
pub struct ScrambleGenerator {
    length: usize,
    rng: StdRng,
}

impl ScrambleGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests and reproducible sessions
    pub fn seeded(length: usize, seed: u64) -> Self {
        Self {
            length,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self) -> Scramble {
        Scramble::random(self.length, &mut self.rng)
    }
}
