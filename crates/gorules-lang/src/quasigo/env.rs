use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::types::Signature;
use super::value::{Value, ValueStack};

/// Implementation of a native function or method.
///
/// It pops its arguments from the stack (the receiver of a method comes
/// first, so it is popped last) and pushes one value per result.
pub type NativeFn = dyn Fn(&mut ValueStack) + Send + Sync;

/// A compiled quasigo function.
#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    pub name: SmolStr,
    pub code: Vec<u8>,
    pub constants: Vec<Value>,
    pub num_params: usize,
    pub num_locals: usize,
    pub sig: Signature,
}

#[derive(Clone)]
pub struct NativeFunc {
    pub name: SmolStr,
    pub sig: Signature,
    pub func: Arc<NativeFn>,
}

impl Debug for NativeFunc {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunc")
            .field("name", &self.name)
            .field("sig", &self.sig)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FuncKey {
    qualifier: SmolStr,
    name: SmolStr,
}

impl FuncKey {
    fn new(qualifier: &str, name: &str) -> Self {
        Self {
            qualifier: SmolStr::new(qualifier),
            name: SmolStr::new(name),
        }
    }
}

/// Registry of the functions quasigo code can call.
///
/// Natives are registered under a package qualifier (`strings.HasPrefix`)
/// or, for methods, under the receiver type name (`(*Var).Text`). Compiled
/// functions are registered under the package they were compiled for.
/// An `Env` is filled during setup and then shared read-only through
/// [`EvalEnv`]s.
#[derive(Debug, Clone, Default)]
pub struct Env {
    natives: Vec<NativeFunc>,
    native_ids: FxHashMap<FuncKey, u16>,
    funcs: Vec<Arc<Func>>,
    func_ids: FxHashMap<FuncKey, u16>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a native function and returns its id, or `None` when the
    /// id space is exhausted.
    pub fn add_native_func<F>(&mut self, qualifier: &str, name: &str, sig: Signature, func: F) -> Option<u16>
    where
        F: Fn(&mut ValueStack) + Send + Sync + 'static,
    {
        self.add_native(
            FuncKey::new(qualifier, name),
            SmolStr::from(format!("{}.{}", qualifier, name)),
            sig,
            Arc::new(func),
        )
    }

    /// Registers a method of `type_name`. The receiver is not part of `sig`.
    pub fn add_native_method<F>(
        &mut self,
        type_name: &str,
        method_name: &str,
        sig: Signature,
        func: F,
    ) -> Option<u16>
    where
        F: Fn(&mut ValueStack) + Send + Sync + 'static,
    {
        self.add_native(
            FuncKey::new(type_name, method_name),
            SmolStr::from(format!("({}).{}", type_name, method_name)),
            sig,
            Arc::new(func),
        )
    }

    fn add_native(&mut self, key: FuncKey, name: SmolStr, sig: Signature, func: Arc<NativeFn>) -> Option<u16> {
        if let Some(&id) = self.native_ids.get(&key) {
            self.natives[usize::from(id)] = NativeFunc { name, sig, func };
            return Some(id);
        }
        let id = u16::try_from(self.natives.len()).ok()?;
        self.natives.push(NativeFunc { name, sig, func });
        self.native_ids.insert(key, id);
        Some(id)
    }

    /// Registers a compiled function, replacing an earlier one with the
    /// same name. Returns `None` when the id space is exhausted.
    pub fn add_func(&mut self, qualifier: &str, func: Func) -> Option<u16> {
        let key = FuncKey::new(qualifier, &func.name);
        let func = Arc::new(func);
        if let Some(&id) = self.func_ids.get(&key) {
            self.funcs[usize::from(id)] = func;
            return Some(id);
        }
        let id = u16::try_from(self.funcs.len()).ok()?;
        self.funcs.push(func);
        self.func_ids.insert(key, id);
        Some(id)
    }

    pub fn lookup_native(&self, qualifier: &str, name: &str) -> Option<(u16, &NativeFunc)> {
        self.native_ids
            .get(&FuncKey::new(qualifier, name))
            .map(|&id| (id, &self.natives[usize::from(id)]))
    }

    pub fn lookup_func(&self, qualifier: &str, name: &str) -> Option<(u16, &Arc<Func>)> {
        self.func_ids
            .get(&FuncKey::new(qualifier, name))
            .map(|&id| (id, &self.funcs[usize::from(id)]))
    }

    #[inline(always)]
    pub fn native(&self, id: u16) -> Option<&NativeFunc> {
        self.natives.get(usize::from(id))
    }

    #[inline(always)]
    pub fn func(&self, id: u16) -> Option<&Arc<Func>> {
        self.funcs.get(usize::from(id))
    }

    pub fn num_natives(&self) -> usize {
        self.natives.len()
    }

    pub fn num_funcs(&self) -> usize {
        self.funcs.len()
    }
}

/// Per-caller evaluation handle: a private operand stack plus a shared view
/// of the function tables.
///
/// An `EvalEnv` must not be shared between threads; each worker creates
/// its own from the same `Arc<Env>`.
#[derive(Debug)]
pub struct EvalEnv {
    pub(crate) env: Arc<Env>,
    pub stack: ValueStack,
}

impl EvalEnv {
    pub fn new(env: Arc<Env>) -> Self {
        Self {
            env,
            stack: ValueStack::with_capacity(64),
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }
}
