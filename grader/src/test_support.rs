//! Test-only in-process compiler/loader.
//!
//! [`NativeLoader`] maps candidate "source" strings to units built from Rust
//! closures, so engine behavior can be exercised without spawning processes.
//! Any source that was not registered fails to compile.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::error::LoaderError;
use crate::core::signature::{CallableSpec, Symbol};
use crate::core::value::Value;
use crate::engine::{Loader, Unit};

type Callable = Box<dyn FnMut(&[Value]) -> Result<Value, String>>;
type UnitFactory = Box<dyn Fn() -> NativeUnit>;

/// Loader whose units are registered closures keyed by source text.
#[derive(Default)]
pub struct NativeLoader {
    units: Vec<(String, UnitFactory)>,
    compiled: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl NativeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` as compilable into the unit `factory` builds.
    pub fn with_unit(mut self, source: &str, factory: impl Fn() -> NativeUnit + 'static) -> Self {
        self.units.push((source.to_string(), Box::new(factory)));
        self
    }

    /// Units successfully compiled so far.
    pub fn compiled(&self) -> usize {
        self.compiled.load(Ordering::SeqCst)
    }

    /// Units dropped so far.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl Loader for NativeLoader {
    type Unit = NativeUnit;

    fn compile(&self, _unit_name: &str, source: &str) -> Result<NativeUnit, LoaderError> {
        let (_, factory) = self
            .units
            .iter()
            .find(|(registered, _)| registered == source)
            .ok_or_else(|| LoaderError::Compile(format!("cannot parse source {source:?}")))?;
        let mut unit = factory();
        unit.released = Some(Arc::clone(&self.released));
        self.compiled.fetch_add(1, Ordering::SeqCst);
        Ok(unit)
    }
}

/// A unit exposing closure-backed callables.
#[derive(Default)]
pub struct NativeUnit {
    callables: Vec<(Symbol, Callable)>,
    released: Option<Arc<AtomicUsize>>,
}

impl NativeUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose a callable matching `spec`'s name and runtime signature.
    pub fn with_callable(
        self,
        spec: &CallableSpec,
        callable: impl FnMut(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        self.with_symbol(
            Symbol::new(spec.name.clone(), spec.runtime_signature()),
            callable,
        )
    }

    pub fn with_symbol(
        mut self,
        symbol: Symbol,
        callable: impl FnMut(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        self.callables.push((symbol, Box::new(callable)));
        self
    }
}

impl Unit for NativeUnit {
    fn symbols(&mut self) -> Result<Vec<Symbol>, LoaderError> {
        Ok(self
            .callables
            .iter()
            .map(|(symbol, _)| symbol.clone())
            .collect())
    }

    fn invoke(
        &mut self,
        symbol: &Symbol,
        _spec: &CallableSpec,
        args: &[Value],
    ) -> Result<Value, LoaderError> {
        let (_, callable) = self
            .callables
            .iter_mut()
            .find(|(exposed, _)| exposed == symbol)
            .ok_or(LoaderError::NotFound)?;
        callable(args).map_err(LoaderError::Runtime)
    }
}

impl Drop for NativeUnit {
    fn drop(&mut self) {
        if let Some(released) = &self.released {
            released.fetch_add(1, Ordering::SeqCst);
        }
    }
}
