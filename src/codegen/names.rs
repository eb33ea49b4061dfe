use std::borrow::Cow;

use phf::phf_set;

/// Identifiers a Python name must not take in the emitted C++: keywords,
/// names the prelude defines, and `std` names the output refers to or that
/// `using namespace std` makes ambiguous.
static RESERVED: phf::Set<&'static str> = phf_set! {
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor",
    "bool", "break", "case", "catch", "char", "char8_t", "char16_t",
    "char32_t", "class", "compl", "concept", "const", "consteval",
    "constexpr", "constinit", "const_cast", "continue", "co_await",
    "co_return", "co_yield", "decltype", "default", "delete", "do", "double",
    "dynamic_cast", "else", "enum", "explicit", "export", "extern", "false",
    "float", "for", "friend", "goto", "if", "inline", "int", "long",
    "mutable", "namespace", "new", "noexcept", "not", "not_eq", "nullptr",
    "operator", "or", "or_eq", "private", "protected", "public", "register",
    "reinterpret_cast", "requires", "return", "short", "signed", "sizeof",
    "static", "static_assert", "static_cast", "struct", "switch", "template",
    "this", "thread_local", "throw", "true", "try", "typedef", "typeid",
    "typename", "union", "unsigned", "using", "virtual", "void", "volatile",
    "wchar_t", "while", "xor", "xor_eq",

    "render_list", "py_str", "py_floordiv", "py_mod", "py_fmod", "py_truthy",
    "py_concat", "py_repeat", "py_index", "py_step", "py_lvalue", "py_range",

    "std", "cout", "endl", "string", "vector", "size_t", "to_string",
    "abs", "ceil", "count", "exp", "fabs", "floor", "fmod", "log", "max",
    "min", "pow", "round", "sort", "sqrt", "swap",
};

/// C++ spelling of a Python identifier. A name whose stem (the name without
/// trailing underscores) is reserved gets one more `_`, which keeps the
/// mapping one-to-one.
pub fn cpp_ident(name: &str) -> Cow<'_, str> {
    if RESERVED.contains(name.trim_end_matches('_')) {
        Cow::Owned(format!("{name}_"))
    } else {
        Cow::Borrowed(name)
    }
}
