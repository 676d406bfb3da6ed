/*!
Full-batch training of a `StockLSTM`
*/
use crate::compute::ComputeContext;
use crate::data::window::Window;
use crate::error::ForecastError;
use crate::lstm::StockLSTM;
use crate::CpuFloat;
use candle_nn::{loss, AdamW, Optimizer, ParamsAdamW, VarMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A flag which stops training at the next epoch boundary once set
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, unset token
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    /// Ask any run holding this token to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The training loss of every epoch, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossHistory(pub Vec<CpuFloat>);

impl LossHistory {
    /// The loss of the first epoch
    pub fn first(&self) -> Option<CpuFloat> {
        self.0.first().copied()
    }

    /// The loss of the final epoch
    pub fn last(&self) -> Option<CpuFloat> {
        self.0.last().copied()
    }

    /// The number of epochs recorded
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no epochs were recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every `every`-th loss, starting with the first epoch's
    pub fn sampled(&self, every: usize) -> Vec<CpuFloat> {
        self.0.iter().copied().step_by(every.max(1)).collect()
    }
}

/// Fixed-budget gradient descent settings
#[derive(Debug, Clone)]
pub struct Trainer {
    /// The number of epochs to run; there is no early stopping
    pub epochs: usize,
    /// The Adam learning rate
    pub learning_rate: f64,
    /// An optional token checked before every epoch
    pub cancel: Option<CancelToken>,
}

impl Trainer {
    /// A trainer running `epochs` epochs of Adam at `learning_rate`
    pub fn new(epochs: usize, learning_rate: f64) -> Trainer {
        Trainer {
            epochs,
            learning_rate,
            cancel: None,
        }
    }

    /// Stop training early when `token` is cancelled
    pub fn with_cancel(mut self, token: CancelToken) -> Trainer {
        self.cancel = Some(token);
        self
    }

    /// Train `model`, whose parameters live in `params`, on every window at once
    pub fn train(
        &self,
        ctx: &ComputeContext,
        model: &StockLSTM,
        params: &VarMap,
        windows: &[Window<'_, CpuFloat>],
    ) -> Result<LossHistory, ForecastError> {
        self.train_with(ctx, model, params, windows, |_, _| {})
    }

    /// Train `model`, calling `on_epoch(epoch, loss)` after every epoch
    pub fn train_with<E>(
        &self,
        ctx: &ComputeContext,
        model: &StockLSTM,
        params: &VarMap,
        windows: &[Window<'_, CpuFloat>],
        mut on_epoch: E,
    ) -> Result<LossHistory, ForecastError>
    where
        E: FnMut(usize, CpuFloat),
    {
        let (xs, ys) = StockLSTM::make_batch(windows, ctx.device())?;
        let mut opt = AdamW::new(
            params.all_vars(),
            ParamsAdamW {
                lr: self.learning_rate,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;

        info!(
            windows = windows.len(),
            epochs = self.epochs,
            learning_rate = self.learning_rate,
            "Training started"
        );

        let mut history = LossHistory(Vec::with_capacity(self.epochs));
        for epoch in 1..=self.epochs {
            if let Some(token) = &self.cancel {
                if token.is_cancelled() {
                    warn!(epoch, "Training cancelled");
                    return Err(ForecastError::Cancelled { epoch });
                }
            }

            // Forward
            let yhat = model.forward(&xs)?;
            let loss = loss::mse(&yhat, &ys)?;
            let value = CpuFloat::from(loss.to_scalar::<f32>()?);
            if !value.is_finite() {
                warn!(epoch, loss = value, "Training diverged");
                return Err(ForecastError::DivergedTraining { epoch, loss: value });
            }

            // Backward, then update
            opt.backward_step(&loss)?;

            history.0.push(value);
            on_epoch(epoch, value);
            if epoch % 10 == 0 {
                debug!(epoch, loss = value, "Epoch finished");
            }
        }

        info!(
            first_loss = history.first(),
            final_loss = history.last(),
            "Training finished"
        );
        Ok(history)
    }
}
