/*!
Device selection and random initialization, resolved once and passed explicitly to every stage
*/
use candle_core::{Device, Tensor};
use candle_nn::VarMap;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::ForecastError;

/// Where tensors live, and how fresh models are initialized
#[derive(Debug, Clone)]
pub struct ComputeContext {
    device: Device,
    seed: Option<u64>,
}

impl ComputeContext {
    /// Use a CUDA device if one is available, otherwise the CPU
    pub fn detect() -> Result<ComputeContext, ForecastError> {
        let device = Device::cuda_if_available(0)?;
        Ok(ComputeContext { device, seed: None })
    }

    /// The CPU, with entropy-seeded initialization
    pub fn cpu() -> ComputeContext {
        ComputeContext {
            device: Device::Cpu,
            seed: None,
        }
    }

    /// The CPU, with reproducible initialization
    pub fn seeded(seed: u64) -> ComputeContext {
        ComputeContext {
            device: Device::Cpu,
            seed: Some(seed),
        }
    }

    /// Use a specific device
    pub fn with_device(device: Device, seed: Option<u64>) -> ComputeContext {
        ComputeContext { device, seed }
    }

    /// The device tensors should be placed on
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The seed used for initialization, if any
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// A fresh RNG for one run: seeded if this context is, from entropy otherwise
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Overwrite every variable in `varmap` with values drawn uniformly from `[-bound, bound]`.
    ///
    /// Variables are visited in name order, so a seeded context always produces the same parameters.
    pub fn init_uniform(&self, varmap: &VarMap, bound: f64) -> Result<(), ForecastError> {
        let mut rng = self.rng();
        let dist = Uniform::new_inclusive(-bound as f32, bound as f32);
        let vars = varmap
            .data()
            .lock()
            .map_err(|_| ForecastError::Config("parameter store lock poisoned".to_string()))?;
        let mut names: Vec<&String> = vars.keys().collect();
        names.sort();
        for name in names {
            let var = &vars[name];
            let values: Vec<f32> = (0..var.elem_count()).map(|_| dist.sample(&mut rng)).collect();
            let init = Tensor::from_vec(values, var.dims().to_vec(), &self.device)?
                .to_dtype(var.dtype())?;
            var.set(&init)?;
        }
        Ok(())
    }
}

impl Default for ComputeContext {
    fn default() -> ComputeContext {
        ComputeContext::cpu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::{linear, VarBuilder};

    fn init_weights(ctx: &ComputeContext) -> Vec<f32> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, ctx.device());
        let layer = linear(3, 2, vb.pp("layer")).unwrap();
        ctx.init_uniform(&varmap, 0.5).unwrap();
        layer.weight().flatten_all().unwrap().to_vec1::<f32>().unwrap()
    }

    #[test]
    fn seeded_init_is_reproducible() {
        let a = init_weights(&ComputeContext::seeded(7));
        let b = init_weights(&ComputeContext::seeded(7));
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
        assert!(a.iter().all(|w| w.abs() <= 0.5));
    }

    #[test]
    fn different_seeds_differ() {
        let a = init_weights(&ComputeContext::seeded(1));
        let b = init_weights(&ComputeContext::seeded(2));
        assert_ne!(a, b);
    }
}
