//! A compiler and stack VM for a small subset of Go.
//!
//! Rule filters are written as ordinary Go functions over `bool`, `int`,
//! `string` and opaque host types. They are compiled to bytecode once and
//! then evaluated many times:
//!
//! ```text
//! func f(s string, n int) bool {
//!     if n > 3 {
//!         return strings.HasPrefix(s, "x")
//!     }
//!     return false
//! }
//! ```
//!
//! Host functionality is exposed through natives registered in an [`Env`].
//! Evaluation happens through an [`EvalEnv`], which owns the operand stack
//! and may not be shared between threads.
pub mod compile;
pub mod disasm;
pub mod env;
pub mod error;
pub mod eval;
pub mod opcode;
pub mod types;
pub mod value;

pub use compile::{CompileContext, MAX_LOCALS, compile, compile_package};
pub use disasm::disasm;
pub use env::{Env, EvalEnv, Func, NativeFn, NativeFunc};
pub use error::CompileError;
pub use eval::eval;
pub use opcode::Opcode;
pub use types::{Signature, Type};
pub use value::{Value, ValueStack};
