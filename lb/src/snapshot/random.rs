//! Seeded random input

use async_trait::async_trait;
use eyre::{Result, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::CellSource;

/// Each cell is alive with probability `density`; the same seed always
/// yields the same grid
#[derive(Debug, Clone, Copy)]
pub struct RandomInput {
    seed: u64,
    density: f64,
}

impl RandomInput {
    pub fn new(seed: u64, density: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&density) {
            bail!("Density must be between 0 and 1, got {}", density);
        }
        Ok(Self { seed, density })
    }
}

#[async_trait]
impl CellSource for RandomInput {
    async fn read_cells(&self, identifier: &str, width: usize, height: usize) -> Result<Vec<bool>> {
        debug!(%identifier, seed = self.seed, density = self.density, "RandomInput::read_cells: called");
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok((0..width * height).map(|_| rng.random_bool(self.density)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_seed_same_cells() {
        let a = RandomInput::new(42, 0.3).unwrap().read_cells("8x8", 8, 8).await.unwrap();
        let b = RandomInput::new(42, 0.3).unwrap().read_cells("8x8", 8, 8).await.unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_density_extremes() {
        let none = RandomInput::new(1, 0.0).unwrap().read_cells("4x4", 4, 4).await.unwrap();
        assert!(none.iter().all(|c| !c));
        let all = RandomInput::new(1, 1.0).unwrap().read_cells("4x4", 4, 4).await.unwrap();
        assert!(all.iter().all(|c| *c));
    }

    #[test]
    fn test_rejects_bad_density() {
        assert!(RandomInput::new(1, 1.5).is_err());
        assert!(RandomInput::new(1, -0.1).is_err());
    }
}
