use std::fmt;

/// Static types of the target language as inferred from Python values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ty {
    Void,
    Bool,
    Int,
    Float,
    Str,
    IntList,
    Unknown,
}

impl Ty {
    pub fn cpp_name(&self) -> &'static str {
        match self {
            Ty::Void => "void",
            Ty::Bool => "bool",
            Ty::Int => "long long",
            Ty::Float => "double",
            Ty::Str => "string",
            Ty::IntList => "vector<long long>",
            Ty::Unknown => "auto",
        }
    }

    /// Spelling for declarations that need a concrete type up front.
    pub fn declared_name(&self) -> &'static str {
        match self {
            Ty::Unknown | Ty::Void => Ty::Int.cpp_name(),
            t => t.cpp_name(),
        }
    }

    /// Name of the type on the Python side, used in diagnostics.
    pub fn python_name(&self) -> &'static str {
        match self {
            Ty::Void => "None",
            Ty::Bool => "bool",
            Ty::Int | Ty::Unknown => "int",
            Ty::Float => "float",
            Ty::Str => "str",
            Ty::IntList => "list",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Ty::Unknown
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Bool | Ty::Int | Ty::Float | Ty::Unknown)
    }

    /// Values whose truth is their non-emptiness.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Ty::Str | Ty::IntList)
    }

    /// Least common type of two values stored in the same slot. Numbers
    /// widen; otherwise the type seen first wins.
    pub fn join(self, other: Ty) -> Ty {
        match (self, other) {
            (Ty::Unknown, t) | (t, Ty::Unknown) => t,
            (a, b) if a == b => a,
            (Ty::Float, b) | (b, Ty::Float) if b.is_numeric() => Ty::Float,
            (Ty::Int, Ty::Bool) | (Ty::Bool, Ty::Int) => Ty::Int,
            (a, _) => a,
        }
    }

    /// Result of `+ - * % //` on operands of these types.
    pub fn arithmetic(left: Ty, right: Ty) -> Ty {
        match (left, right) {
            (Ty::Str, _) | (_, Ty::Str) => Ty::Str,
            (Ty::IntList, _) | (_, Ty::IntList) => Ty::IntList,
            (Ty::Float, _) | (_, Ty::Float) => Ty::Float,
            (Ty::Unknown, _) | (_, Ty::Unknown) => Ty::Unknown,
            _ => Ty::Int,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.python_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_widens_numbers() {
        assert_eq!(Ty::Int.join(Ty::Float), Ty::Float);
        assert_eq!(Ty::Bool.join(Ty::Int), Ty::Int);
        assert_eq!(Ty::Unknown.join(Ty::Str), Ty::Str);
        assert_eq!(Ty::Str.join(Ty::Int), Ty::Str);
    }

    #[test]
    fn arithmetic_prefers_text() {
        assert_eq!(Ty::arithmetic(Ty::Int, Ty::Str), Ty::Str);
        assert_eq!(Ty::arithmetic(Ty::Int, Ty::Float), Ty::Float);
        assert_eq!(Ty::arithmetic(Ty::Unknown, Ty::Int), Ty::Unknown);
        assert_eq!(Ty::arithmetic(Ty::Bool, Ty::Int), Ty::Int);
        assert_eq!(Ty::arithmetic(Ty::IntList, Ty::Int), Ty::IntList);
    }

    #[test]
    fn integers_are_64_bit() {
        assert_eq!(Ty::Int.cpp_name(), "long long");
        assert_eq!(Ty::IntList.cpp_name(), "vector<long long>");
        assert_eq!(Ty::Unknown.declared_name(), "long long");
        assert_eq!(Ty::IntList.to_string(), "list");
    }
}
