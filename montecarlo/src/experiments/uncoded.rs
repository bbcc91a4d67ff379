use std::{io, num::NonZeroUsize};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::experiment::Experiment;

/// Serialized form of the experiments in this module.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "system", rename_all = "snake_case")]
enum SystemText {
    UncodedAwgn { block_size: NonZeroUsize },
}

/// Uncoded BPSK transmission over an additive white Gaussian noise channel.
///
/// The operating parameter is Eb/N0 in dB. Every sample sends one block of
/// random bits and yields `[bit error rate, frame error indicator]`.
#[derive(Debug, Clone)]
pub struct UncodedAwgn {
    block_size: NonZeroUsize,
    ebn0_db: f64,
    sigma: f64,
    rng: StdRng,
}

impl UncodedAwgn {
    /// Index of the bit error rate in a result vector.
    pub const BER: usize = 0;
    /// Index of the frame error indicator in a result vector.
    pub const FER: usize = 1;

    pub fn new(block_size: NonZeroUsize) -> Self {
        let mut this = Self {
            block_size,
            ebn0_db: 0.0,
            sigma: 0.0,
            rng: StdRng::seed_from_u64(0),
        };

        this.set_parameter(0.0);
        this
    }

    pub fn block_size(&self) -> usize {
        self.block_size.get()
    }
}

impl Experiment for UncodedAwgn {
    fn count(&self) -> usize {
        2
    }

    fn sample(&mut self, out: &mut [f64]) {
        let block_size = self.block_size.get();
        let mut errors = 0usize;

        for _ in 0..block_size {
            let bit: bool = self.rng.random();
            let symbol = if bit { -1.0 } else { 1.0 };

            let noise: f64 = self.rng.sample(StandardNormal);
            let received = symbol + self.sigma * noise;

            if (received < 0.0) != bit {
                errors += 1;
            }
        }

        out[Self::BER] = errors as f64 / block_size as f64;
        out[Self::FER] = if errors > 0 { 1.0 } else { 0.0 };
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn parameter(&self) -> f64 {
        self.ebn0_db
    }

    fn set_parameter(&mut self, ebn0_db: f64) {
        let ebn0 = 10f64.powf(ebn0_db / 10.0);
        self.ebn0_db = ebn0_db;
        self.sigma = (1.0 / (2.0 * ebn0)).sqrt();
    }

    fn to_text(&self) -> String {
        let text = SystemText::UncodedAwgn {
            block_size: self.block_size,
        };

        // Plain struct of integers, serialization cannot fail.
        serde_json::to_string(&text).unwrap_or_default()
    }

    fn from_text(text: &str) -> io::Result<Self> {
        let SystemText::UncodedAwgn { block_size } = serde_json::from_str(text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok(Self::new(block_size))
    }

    fn description(&self) -> String {
        format!("uncoded BPSK over AWGN, {} bit blocks", self.block_size)
    }
}
