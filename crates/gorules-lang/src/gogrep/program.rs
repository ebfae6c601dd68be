use smol_str::SmolStr;

use super::operation::{Operation, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Operation,
    pub value: u8,
    pub value_index: u8,
}

impl Instruction {
    pub fn new(op: Operation) -> Self {
        Self {
            op,
            value: 0,
            value_index: 0,
        }
    }
}

/// A compiled pattern: instructions in pre-order plus the string table
/// they index into. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub insts: Vec<Instruction>,
    pub strings: Vec<SmolStr>,
}

impl Program {
    #[inline(always)]
    pub fn string(&self, index: u8) -> &SmolStr {
        &self.strings[usize::from(index)]
    }

    /// The string payload of `inst`, if its operation carries one.
    pub fn string_value(&self, inst: &Instruction) -> Option<&SmolStr> {
        let info = inst.op.info();
        (info.value_kind == ValueKind::String || info.extra_value_kind == ValueKind::String)
            .then(|| self.string(inst.value_index))
    }

    pub fn root(&self) -> Option<Operation> {
        self.insts.first().map(|inst| inst.op)
    }

    /// Whether the program matches node lists rather than single nodes.
    pub fn is_list(&self) -> bool {
        matches!(
            self.root(),
            Some(Operation::MultiStmt | Operation::MultiExpr)
        )
    }

    /// Names of the captured wildcards, in order of first use.
    pub fn capture_names(&self) -> Vec<&SmolStr> {
        let mut names = Vec::new();
        for inst in &self.insts {
            if matches!(
                inst.op,
                Operation::NamedNode | Operation::NamedNodeSeq | Operation::NamedOptNode
            ) {
                let name = self.string(inst.value_index);
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}
