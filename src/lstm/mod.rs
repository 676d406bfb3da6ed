/*!
The LSTM implementation: a single LSTM layer over scalar inputs, read out through a linear layer
*/

use crate::data::window::Window;
use crate::error::ForecastError;
use crate::{util::to_gpu, CpuFloat};
use candle_core::{Device, Tensor};
use candle_nn::rnn::{lstm, LSTMConfig, LSTM, RNN};
use candle_nn::{linear, Linear, Module, VarBuilder};
use num::NumCast;

/// The StockLSTM model: maps a window of scaled closes to the next scaled close
#[derive(Debug, Clone)]
pub struct StockLSTM {
    /// The number of inputs per time step
    pub inputs: usize,
    /// The width of the hidden state
    pub hidden: usize,
    /// This model's LSTM layer
    pub lstm_layer: LSTM,
    /// This model's linear layer
    pub linear_layer: Linear,
}

impl StockLSTM {
    /// Run the model over a batch of sequences shaped `(batch, time, inputs)`, returning `(batch, 1)` predictions.
    ///
    /// The LSTM starts from a zero state for every sequence; only the final hidden state is read out.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor, ForecastError> {
        let states = self.lstm_layer.seq(xs)?;
        let last = states.last().ok_or_else(|| {
            ForecastError::InsufficientData("cannot run the model over an empty sequence".to_string())
        })?;
        Ok(self.linear_layer.forward(last.h())?)
    }

    /// Package windows into an input tensor shaped `(batch, length, 1)` and a target tensor shaped `(batch, 1)`
    pub fn make_batch<F>(windows: &[Window<'_, F>], device: &Device) -> Result<(Tensor, Tensor), ForecastError>
    where
        F: Copy + NumCast,
    {
        let length = windows.first().map(|w| w.input.len()).unwrap_or(0);
        if length == 0 {
            return Err(ForecastError::InsufficientData(
                "cannot build a batch from no windows".to_string(),
            ));
        }
        if let Some(w) = windows.iter().find(|w| w.input.len() != length) {
            return Err(ForecastError::InsufficientData(format!(
                "window at {} has length {}, expected {}",
                w.start,
                w.input.len(),
                length
            )));
        }

        let mut input = Vec::<f32>::with_capacity(windows.len() * length);
        let mut output = Vec::<f32>::with_capacity(windows.len());
        for window in windows {
            input.extend(to_gpu(window.input));
            output.push(NumCast::from(window.target).unwrap_or(f32::NAN));
        }

        let input = Tensor::from_vec(input, (windows.len(), length, 1), device)?;
        let output = Tensor::from_vec(output, (windows.len(), 1), device)?;
        Ok((input, output))
    }

    /// Predict the value following a single window of scaled values
    pub fn predict(&self, window: &[CpuFloat], device: &Device) -> Result<CpuFloat, ForecastError> {
        let xs = Tensor::from_vec(to_gpu(window), (1, window.len(), 1), device)?;
        let yhat = self.forward(&xs)?.flatten_all()?.to_vec1::<f32>()?;
        Ok(<CpuFloat as From<f32>>::from(yhat[0]))
    }

    /// Predict the value following each window in a batch
    pub fn predict_batch<F>(&self, windows: &[Window<'_, F>], device: &Device) -> Result<Vec<CpuFloat>, ForecastError>
    where
        F: Copy + NumCast,
    {
        let (xs, _) = Self::make_batch(windows, device)?;
        let yhat = self.forward(&xs)?.flatten_all()?.to_vec1::<f32>()?;
        Ok(yhat.into_iter().map(<CpuFloat as From<f32>>::from).collect())
    }
}

/// A descriptor for an instance of the StockLSTM model
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct StockLSTMDesc {
    /// The number of inputs per time step
    pub inputs: usize,
    /// The size of the hidden LSTM layer to use
    pub hidden: usize,
}

impl StockLSTMDesc {
    /// A model over one scalar per time step
    pub fn scalar(hidden: usize) -> StockLSTMDesc {
        StockLSTMDesc { inputs: 1, hidden }
    }

    /// Build a `StockLSTM` whose parameters live in a given `VarBuilder`
    pub fn build(&self, vb: VarBuilder) -> Result<StockLSTM, ForecastError> {
        let lstm_layer = lstm(self.inputs, self.hidden, LSTMConfig::default(), vb.pp("lstm"))?;
        let linear_layer = linear(self.hidden, 1, vb.pp("linear"))?;
        Ok(StockLSTM {
            inputs: self.inputs,
            hidden: self.hidden,
            lstm_layer,
            linear_layer,
        })
    }

    /// The bound of the uniform distribution parameters are initialized from
    pub fn init_bound(&self) -> f64 {
        1.0 / (self.hidden as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ComputeContext;
    use crate::data::window::build_windows;
    use candle_core::DType;
    use candle_nn::VarMap;

    fn model(ctx: &ComputeContext) -> (VarMap, StockLSTM) {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, ctx.device());
        let desc = StockLSTMDesc::scalar(8);
        let model = desc.build(vb).unwrap();
        ctx.init_uniform(&varmap, desc.init_bound()).unwrap();
        (varmap, model)
    }

    #[test]
    fn batch_making_works() {
        let series: Vec<f64> = (0..12).map(|i| i as f64 / 12.0).collect();
        let windows = build_windows(&series, 5).unwrap();
        let (input, output) = StockLSTM::make_batch(&windows, &Device::Cpu).unwrap();
        assert_eq!(input.dims3().unwrap(), (7, 5, 1));
        assert_eq!(output.dims2().unwrap(), (7, 1));
        let targets = output.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(targets[0], (5.0 / 12.0) as f32);
    }

    #[test]
    fn forward_shapes_and_statelessness() {
        let ctx = ComputeContext::seeded(3);
        let (_varmap, model) = model(&ctx);
        let series: Vec<f64> = (0..40).map(|i| (i as f64 * 0.3).sin() * 0.5 + 0.5).collect();
        let windows = build_windows(&series, 10).unwrap();
        let batch = model.predict_batch(&windows, ctx.device()).unwrap();
        assert_eq!(batch.len(), 30);

        // Predicting one window at a time matches the batched run, and repeats identically
        let first = model.predict(windows[0].input, ctx.device()).unwrap();
        let again = model.predict(windows[0].input, ctx.device()).unwrap();
        assert_eq!(first, again);
        assert!((first - batch[0]).abs() < 1e-5);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let windows: Vec<Window<'_, f64>> = Vec::new();
        assert!(StockLSTM::make_batch(&windows, &Device::Cpu).is_err());
    }
}
