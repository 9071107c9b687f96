//! The seam to the downstream calculation service.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result, anyhow};
use finmap_model::BusinessInput;
use tracing::info;

/// Receives finished business inputs.
pub trait BusinessInputSink {
    fn submit(&self, input: &BusinessInput) -> Result<()>;
}

impl<F> BusinessInputSink for F
where
    F: Fn(&BusinessInput) -> Result<()>,
{
    fn submit(&self, input: &BusinessInput) -> Result<()> {
        self(input)
    }
}

/// Writes each input as one line of JSON.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| anyhow!("sink writer lock poisoned"))
    }
}

impl<W: Write> BusinessInputSink for JsonLinesSink<W> {
    fn submit(&self, input: &BusinessInput) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow!("sink writer lock poisoned"))?;
        serde_json::to_writer(&mut *writer, input).context("serialize business input")?;
        writer.write_all(b"\n").context("write business input")?;
        writer.flush().context("flush business input")?;
        info!(keys = input.len(), "business input submitted");
        Ok(())
    }
}

/// Keeps every submitted input in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    inputs: Mutex<Vec<BusinessInput>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains the collected inputs. A panic in another holder of the lock
    /// does not lose what was already submitted.
    pub fn take(&self) -> Vec<BusinessInput> {
        let mut inputs = self.inputs.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *inputs)
    }
}

impl BusinessInputSink for CollectingSink {
    fn submit(&self, input: &BusinessInput) -> Result<()> {
        self.inputs
            .lock()
            .map_err(|_| anyhow!("sink lock poisoned"))?
            .push(input.clone());
        Ok(())
    }
}
