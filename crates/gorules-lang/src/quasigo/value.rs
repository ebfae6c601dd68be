use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use smallvec::SmallVec;
use smol_str::SmolStr;

/// A value on the VM operand stack.
///
/// Values of opaque named types (`*Var`, `error`, ...) are either `Nil` or a
/// shared reference to a host object.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Str(SmolStr),
    Ref(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn new_ref<T: Any + Send + Sync>(value: T) -> Self {
        Value::Ref(Arc::new(value))
    }

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    #[inline(always)]
    pub fn as_bool(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    #[inline(always)]
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            _ => 0,
        }
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        match self {
            Value::Str(s) => s,
            _ => "",
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Ref(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Str(s) => write!(f, "Str({:?})", s.as_str()),
            Value::Ref(_) => write!(f, "Ref(..)"),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s.as_str()),
            Value::Ref(_) => write!(f, "<ref>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(SmolStr::new(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(SmolStr::from(s))
    }
}

impl From<SmolStr> for Value {
    fn from(s: SmolStr) -> Self {
        Value::Str(s)
    }
}

/// The operand stack of an [`EvalEnv`](super::env::EvalEnv).
///
/// Native functions receive the stack directly: they pop their arguments
/// (last argument first) and push their results.
#[derive(Debug, Default)]
pub struct ValueStack {
    values: Vec<Value>,
}

impl ValueStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    #[inline(always)]
    pub fn push(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    #[inline(always)]
    pub fn pop(&mut self) -> Value {
        self.values.pop().unwrap_or_default()
    }

    #[inline(always)]
    pub fn pop_bool(&mut self) -> bool {
        self.pop().as_bool()
    }

    #[inline(always)]
    pub fn pop_int(&mut self) -> i64 {
        self.pop().as_int()
    }

    pub fn pop_str(&mut self) -> SmolStr {
        match self.pop() {
            Value::Str(s) => s,
            _ => SmolStr::default(),
        }
    }

    /// Pops the top `n` values, keeping their stack order.
    pub fn pop_n(&mut self, n: usize) -> SmallVec<[Value; 8]> {
        let at = self.values.len().saturating_sub(n);
        self.values.drain(at..).collect()
    }

    #[inline(always)]
    pub fn top(&self) -> Option<&Value> {
        self.values.last()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_order() {
        let mut stack = ValueStack::default();
        stack.push(1i64);
        stack.push("a");
        stack.push(true);
        assert_eq!(stack.pop_n(2).to_vec(), vec![Value::from("a"), Value::Bool(true)]);
        assert_eq!(stack.pop_int(), 1);
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), Value::Nil);
    }

    #[test]
    fn test_ref_identity() {
        let a = Value::new_ref(1u32);
        let b = Value::new_ref(1u32);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<u32>(), Some(&1));
        assert_eq!(a.downcast_ref::<String>(), None);
    }
}
