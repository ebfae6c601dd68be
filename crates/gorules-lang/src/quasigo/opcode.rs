//! The bytecode instruction set.
//!
//! An instruction is one opcode byte followed by its operand bytes. The
//! width of an instruction depends only on its opcode:
//!
//! * 1 byte: no operand;
//! * 2 bytes: an 8-bit parameter, local or constant index;
//! * 3 bytes: a little endian 16-bit jump offset or function id.
//!
//! Jump offsets are relative to the start of the jump instruction.

macro_rules! define_opcodes {
    ($(
        $(#[$doc:meta])*
        $name:ident = $code:literal, $width:literal
    ),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($(#[$doc])* $name = $code,)*
        }

        impl Opcode {
            #[inline(always)]
            pub fn from_u8(byte: u8) -> Option<Self> {
                match byte {
                    $($code => Some(Opcode::$name),)*
                    _ => None,
                }
            }

            #[inline(always)]
            pub fn width(self) -> usize {
                match self {
                    $(Opcode::$name => $width,)*
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name),)*
                }
            }
        }
    };
}

define_opcodes! {
    Pop = 1, 1,
    Dup = 2, 1,

    /// Pushes argument `#index`.
    PushParam = 3, 2,
    /// Pushes local `#index`.
    PushLocal = 4, 2,
    /// Pushes constant `#index` of the function's constant pool.
    PushConst = 5, 2,
    PushTrue = 6, 1,
    PushFalse = 7, 1,
    PushNil = 8, 1,

    /// Pops a value into local `#index`.
    SetLocal = 9, 2,
    IncLocal = 10, 2,
    DecLocal = 11, 2,

    Jump = 12, 3,
    /// Pops a bool and jumps if it is `false`.
    JumpFalse = 13, 3,
    /// Pops a bool and jumps if it is `true`.
    JumpTrue = 14, 3,

    ReturnTop = 15, 1,
    ReturnTrue = 16, 1,
    ReturnFalse = 17, 1,

    /// Calls the compiled function with the given id.
    Call = 18, 3,
    /// Calls the function being executed.
    CallRecur = 19, 1,
    /// Calls the native function or method with the given id.
    CallNative = 20, 3,

    IsNil = 21, 1,
    IsNotNil = 22, 1,
    Not = 23, 1,
    Neg = 24, 1,

    EqInt = 25, 1,
    NotEqInt = 26, 1,
    GtInt = 27, 1,
    GtEqInt = 28, 1,
    LtInt = 29, 1,
    LtEqInt = 30, 1,
    Add = 31, 1,
    Sub = 32, 1,
    Mul = 33, 1,
    Div = 34, 1,
    Mod = 35, 1,

    EqBool = 36, 1,
    NotEqBool = 37, 1,

    EqString = 38, 1,
    NotEqString = 39, 1,
    Concat = 40, 1,
    StringLen = 41, 1,
    /// `s[low:high]`
    StringSlice = 42, 1,
    /// `s[low:]`
    StringSliceFrom = 43, 1,
    /// `s[:high]`
    StringSliceTo = 44, 1,
    /// Byte-wise string ordering.
    LtString = 45, 1,
    LtEqString = 46, 1,
    GtString = 47, 1,
    GtEqString = 48, 1,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Opcode::Pop, 1)]
    #[case(Opcode::PushParam, 2)]
    #[case(Opcode::SetLocal, 2)]
    #[case(Opcode::JumpFalse, 3)]
    #[case(Opcode::CallNative, 3)]
    #[case(Opcode::StringSlice, 1)]
    #[case(Opcode::GtEqString, 1)]
    fn test_width(#[case] op: Opcode, #[case] width: usize) {
        assert_eq!(op.width(), width);
    }

    #[test]
    fn test_from_u8() {
        for byte in 1..=48u8 {
            let op = Opcode::from_u8(byte).unwrap();
            assert_eq!(op as u8, byte);
        }
        assert_eq!(Opcode::from_u8(0), None);
        assert_eq!(Opcode::from_u8(49), None);
    }
}
