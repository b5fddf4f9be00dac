//! Named-symbol runtime module.
//!
//! A [`GigoModule`] records the symbol of the external function the
//! compiler generated and dispatches kernel entry symbols to a
//! [`Conv2dEngine`]. Serialized form: the symbol as a little-endian `u64`
//! byte length followed by its UTF-8 bytes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use gigo_kernels::{Conv2dEngine, Conv2dParams};
use tracing::debug;

use crate::error::{Result, RuntimeError};
use crate::registry::OpKind;

/// Type key of gigo modules.
pub const TYPE_KEY: &str = "gigo";

/// Longest symbol, in bytes, that a module can be saved or loaded with.
pub const MAX_SYMBOL_LEN: u64 = 1024 * 1024; // 1 MiB

#[derive(Debug, Clone)]
pub struct GigoModule {
    symbol: String,
    engine: Conv2dEngine,
}

impl GigoModule {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), engine: Conv2dEngine::new() }
    }

    /// Use `engine` for [`invoke`](Self::invoke).
    pub fn with_engine(mut self, engine: Conv2dEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn type_key(&self) -> &'static str {
        TYPE_KEY
    }

    /// Rejects symbols longer than [`MAX_SYMBOL_LEN`] so every saved module
    /// can be loaded back.
    pub fn save_to_binary<W: Write>(&self, w: &mut W) -> Result<()> {
        let bytes = self.symbol.as_bytes();
        let len = check_symbol_len(bytes.len() as u64)?;
        w.write_all(&len.to_le_bytes())?;
        w.write_all(bytes)?;
        Ok(())
    }

    pub fn load_from_binary<R: Read>(r: &mut R) -> Result<Self> {
        let symbol = read_symbol(r)?;
        debug!(symbol = %symbol, "loaded gigo module");
        Ok(Self::new(symbol))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        check_symbol_len(self.symbol.len() as u64)?;
        let mut w = BufWriter::new(File::create(path)?);
        self.save_to_binary(&mut w)?;
        w.flush()?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        Self::load_from_binary(&mut r)
    }

    /// Operator behind a kernel entry symbol, if this module can run it.
    pub fn get_function(&self, name: &str) -> Option<OpKind> {
        OpKind::from_symbol(name)
    }

    /// Run the kernel named `name` and return its channel-last output.
    pub fn invoke(
        &self,
        name: &str,
        data: &[f32],
        weights: &[f32],
        params: &Conv2dParams,
    ) -> Result<Vec<f32>> {
        let op = self
            .get_function(name)
            .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()))?;
        let out = match op {
            OpKind::Conv2d => self.engine.run(data, weights, params)?,
            OpKind::QuantConv2d => self.engine.run_quantized(data, weights, params)?,
        };
        Ok(out)
    }
}

fn check_symbol_len(len: u64) -> Result<u64> {
    if len > MAX_SYMBOL_LEN {
        return Err(RuntimeError::SymbolTooLarge(len));
    }
    Ok(len)
}

#[inline]
fn read_u64_le<R: Read>(r: &mut R) -> Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_le_bytes(b))
}

fn read_symbol<R: Read>(r: &mut R) -> Result<String> {
    let len = check_symbol_len(read_u64_le(r)?)?;
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| RuntimeError::MalformedSymbol)
}
