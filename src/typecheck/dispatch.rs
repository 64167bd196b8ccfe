//! Built-in call surfaces (section 4.G.2): free functions, host-type
//! static methods (`Type.method(args)`), and host-type instance methods
//! (`receiver.method(args)`). Modeled as lookup tables over
//! [`Lazy`](once_cell::sync::Lazy) maps rather than a hand-written
//! cascade of `if name == "..."` checks.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::typecheck::ty::{HostType, Type};

/// A free function's signature: fixed parameter types (no overloading)
/// and a return type. `None` parameter type entries accept any type
/// (used by `print`/`println`, which accept anything with a `str`
/// conversion).
struct Signature {
    params: Vec<Option<Type>>,
    variadic_tail: bool,
    return_type: Type,
}

static GLOBALS: Lazy<HashMap<&'static str, Signature>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "print",
        Signature {
            params: vec![None],
            variadic_tail: false,
            return_type: Type::Void,
        },
    );
    m.insert(
        "println",
        Signature {
            params: vec![None],
            variadic_tail: false,
            return_type: Type::Void,
        },
    );
    m.insert(
        "len",
        Signature {
            params: vec![None],
            variadic_tail: false,
            return_type: Type::Int,
        },
    );
    m.insert(
        "to_str",
        Signature {
            params: vec![None],
            variadic_tail: false,
            return_type: Type::Str,
        },
    );
    m.insert(
        "parse_int",
        Signature {
            params: vec![Some(Type::Str)],
            variadic_tail: false,
            return_type: Type::Int,
        },
    );
    m.insert(
        "parse_double",
        Signature {
            params: vec![Some(Type::Str)],
            variadic_tail: false,
            return_type: Type::Double,
        },
    );
    m.insert(
        "exit",
        Signature {
            params: vec![Some(Type::Int)],
            variadic_tail: false,
            return_type: Type::Void,
        },
    );
    m.insert(
        "assert",
        Signature {
            params: vec![Some(Type::Bool), Some(Type::Str)],
            variadic_tail: false,
            return_type: Type::Void,
        },
    );
    m
});

/// Look up a free function by name. Returns `Err` with a human-readable
/// arity complaint if `arg_types.len()` cannot match the signature;
/// returns `Ok(None)` if `name` is not a known global at all (so callers
/// can fall back to ordinary symbol-table lookup for user functions).
pub fn builtin_global(name: &str, arg_types: &[Type]) -> Option<Result<Type, String>> {
    let sig = GLOBALS.get(name)?;
    if sig.variadic_tail {
        if arg_types.len() < sig.params.len() {
            return Some(Err(format!(
                "`{name}` expects at least {} argument(s), found {}",
                sig.params.len(),
                arg_types.len()
            )));
        }
    } else if arg_types.len() != sig.params.len() {
        return Some(Err(format!(
            "`{name}` expects {} argument(s), found {}",
            sig.params.len(),
            arg_types.len()
        )));
    }
    for (expected, found) in sig.params.iter().zip(arg_types.iter()) {
        if let Some(expected) = expected {
            if !found.assignable_to(expected) {
                return Some(Err(format!(
                    "`{name}` expects `{expected}`, found `{found}`"
                )));
            }
        }
    }
    Some(Ok(sig.return_type.clone()))
}

/// The full set of static-method receiver names recognized by
/// `Type.method(args)` call syntax (section 4.G.2): the ten opaque host
/// types that also appear in the [`Type`] lattice, plus eight
/// library-singleton namespaces (`Stdin`/`Stdout`/`Stderr`/`Bytes`/
/// `Path`/`Directory`/`Environment`/`Interceptor`) that are dispatch
/// targets only and never instantiated as a variable's type.
const STATIC_TYPE_NAMES: &[&str] = &[
    "TextFile",
    "BinaryFile",
    "Time",
    "Date",
    "Stdin",
    "Stdout",
    "Stderr",
    "Bytes",
    "Path",
    "Directory",
    "Process",
    "TcpListener",
    "TcpStream",
    "UdpSocket",
    "Random",
    "UUID",
    "Environment",
    "Interceptor",
];

pub fn is_known_static_type(name: &str) -> bool {
    STATIC_TYPE_NAMES.contains(&name)
}

/// `Type.method(args)` static dispatch (section 4.G.2). Each recognized
/// type name exposes a small fixed surface; `Random`'s four generic
/// instance-style methods live in [`instance_method`] instead, once a
/// `Random` value exists — `Random.new()` itself is the static
/// constructor handled here.
pub fn static_method(type_name: &str, method: &str, arg_types: &[Type]) -> Option<Result<Type, String>> {
    let sig: (&[Type], Type) = match (type_name, method) {
        ("TextFile", "open") => (&[Type::Str], Type::Host(HostType::TextFile)),
        ("TextFile", "exists") => (&[Type::Str], Type::Bool),
        ("BinaryFile", "open") => (&[Type::Str], Type::Host(HostType::BinaryFile)),
        ("BinaryFile", "exists") => (&[Type::Str], Type::Bool),
        ("Date", "now") => (&[], Type::Host(HostType::Date)),
        ("Time", "now") => (&[], Type::Host(HostType::Time)),
        ("Stdin", "read_line") => (&[], Type::Str),
        ("Stdout", "println") => (&[Type::Any], Type::Void),
        ("Stdout", "print") => (&[Type::Any], Type::Void),
        ("Stderr", "println") => (&[Type::Any], Type::Void),
        ("Stderr", "print") => (&[Type::Any], Type::Void),
        ("Bytes", "from_str") => (&[Type::Str], Type::Array(Box::new(Type::Byte))),
        ("Bytes", "to_str") => (&[Type::Array(Box::new(Type::Byte))], Type::Str),
        ("Path", "exists") => (&[Type::Str], Type::Bool),
        ("Path", "join") => (&[Type::Str, Type::Str], Type::Str),
        ("Directory", "list") => (&[Type::Str], Type::Array(Box::new(Type::Str))),
        ("Directory", "create") => (&[Type::Str], Type::Void),
        ("Process", "spawn") => (&[Type::Str], Type::Host(HostType::Process)),
        ("TcpListener", "bind") => (&[Type::Str, Type::Int], Type::Host(HostType::TcpListener)),
        ("TcpStream", "connect") => (&[Type::Str, Type::Int], Type::Host(HostType::TcpStream)),
        ("UdpSocket", "bind") => (&[Type::Str, Type::Int], Type::Host(HostType::UdpSocket)),
        ("Random", "new") => (&[], Type::Host(HostType::Random)),
        ("UUID", "new_v4") => (&[], Type::Host(HostType::Uuid)),
        ("Environment", "get") => (&[Type::Str], Type::Str),
        ("Environment", "set") => (&[Type::Str, Type::Str], Type::Void),
        ("Interceptor", "install") => (&[Type::Str], Type::Void),
        _ if is_known_static_type(type_name) => {
            return Some(Err(format!("unknown static method `{type_name}.{method}`")))
        }
        _ => return None,
    };
    Some(check_arity_and_types(method, sig.0, &sig.1, arg_types))
}

/// `receiver.method(args)` instance dispatch (section 4.G.2): `Random`'s
/// generic methods (`choice`/`shuffle`/`weightedChoice`/`sample`, each
/// resolved from the element type of an array argument rather than any
/// table lookup), the other opaque host types' small instance surfaces,
/// and the common array/string instance methods.
pub fn instance_method(receiver: &Type, method: &str, arg_types: &[Type]) -> Option<Result<Type, String>> {
    if let Type::Host(HostType::Random) = receiver {
        if let Some(result) = random_instance_method(method, arg_types) {
            return Some(result);
        }
    }
    if let Type::Host(host) = receiver {
        if let Some(result) = host_instance_method(*host, method, arg_types) {
            return Some(result);
        }
    }
    if receiver.element_type().is_some() {
        if let Some(result) = array_instance_method(receiver, method, arg_types) {
            return Some(result);
        }
    }
    if *receiver == Type::Str {
        if let Some(result) = string_instance_method(method, arg_types) {
            return Some(result);
        }
    }
    None
}

fn random_instance_method(method: &str, arg_types: &[Type]) -> Option<Result<Type, String>> {
    match method {
        "next_int" => Some(check_arity_and_types(
            "next_int",
            &[Type::Int, Type::Int],
            &Type::Int,
            arg_types,
        )),
        "next_double" => Some(check_arity_and_types("next_double", &[], &Type::Double, arg_types)),
        "next_bool" => Some(check_arity_and_types("next_bool", &[], &Type::Bool, arg_types)),
        "choice" => Some(generic_array_method("choice", arg_types, 1, |elem| elem.clone())),
        "shuffle" => Some(generic_array_method("shuffle", arg_types, 1, |_| Type::Void)),
        "weightedChoice" => {
            if arg_types.len() != 2 {
                return Some(Err(format!(
                    "`weightedChoice` expects 2 arguments, found {}",
                    arg_types.len()
                )));
            }
            if arg_types[1] != Type::Array(Box::new(Type::Double)) {
                return Some(Err(format!(
                    "`weightedChoice` expects a `double[]` weights argument, found `{}`",
                    arg_types[1]
                )));
            }
            match arg_types[0].element_type() {
                Some(elem) => Some(Ok(elem.clone())),
                None => Some(Err(format!(
                    "`weightedChoice` expects an array argument, found `{}`",
                    arg_types[0]
                ))),
            }
        }
        "sample" => {
            if arg_types.len() != 2 {
                return Some(Err(format!("`sample` expects 2 arguments, found {}", arg_types.len())));
            }
            if arg_types[1] != Type::Int {
                return Some(Err(format!("`sample` expects an `int` count, found `{}`", arg_types[1])));
            }
            match arg_types[0].element_type() {
                Some(elem) => Some(Ok(Type::Array(Box::new(elem.clone())))),
                None => Some(Err(format!(
                    "`sample` expects an array argument, found `{}`",
                    arg_types[0]
                ))),
            }
        }
        _ => None,
    }
}

/// Generic single-array-argument method: resolves its return type from
/// the array argument's element type via `resolve`, used by `choice`
/// (returns the element) and `shuffle` (returns `void` regardless).
fn generic_array_method(
    name: &str,
    arg_types: &[Type],
    expected_arity: usize,
    resolve: impl FnOnce(&Type) -> Type,
) -> Result<Type, String> {
    if arg_types.len() != expected_arity {
        return Err(format!(
            "`{name}` expects {expected_arity} argument(s), found {}",
            arg_types.len()
        ));
    }
    match arg_types[0].element_type() {
        Some(elem) => Ok(resolve(elem)),
        None => Err(format!("`{name}` expects an array argument, found `{}`", arg_types[0])),
    }
}

fn host_instance_method(host: HostType, method: &str, arg_types: &[Type]) -> Option<Result<Type, String>> {
    let sig: (&[Type], Type) = match (host, method) {
        (HostType::TextFile, "read_line") => (&[], Type::Str),
        (HostType::TextFile, "read_all") => (&[], Type::Str),
        (HostType::TextFile, "write") => (&[Type::Str], Type::Void),
        (HostType::TextFile, "close") => (&[], Type::Void),
        (HostType::BinaryFile, "read") => (&[Type::Int], Type::Array(Box::new(Type::Byte))),
        (HostType::BinaryFile, "write") => (&[Type::Array(Box::new(Type::Byte))], Type::Void),
        (HostType::BinaryFile, "close") => (&[], Type::Void),
        (HostType::Date, "format") => (&[Type::Str], Type::Str),
        (HostType::Time, "format") => (&[Type::Str], Type::Str),
        (HostType::Process, "wait") => (&[], Type::Int),
        (HostType::Process, "kill") => (&[], Type::Void),
        (HostType::TcpListener, "accept") => (&[], Type::Host(HostType::TcpStream)),
        (HostType::TcpStream, "send") => (&[Type::Array(Box::new(Type::Byte))], Type::Int),
        (HostType::TcpStream, "receive") => (&[Type::Int], Type::Array(Box::new(Type::Byte))),
        (HostType::TcpStream, "close") => (&[], Type::Void),
        (HostType::UdpSocket, "send_to") => (&[Type::Array(Box::new(Type::Byte)), Type::Str, Type::Int], Type::Int),
        (HostType::UdpSocket, "receive") => (&[Type::Int], Type::Array(Box::new(Type::Byte))),
        (HostType::Uuid, "to_str") => (&[], Type::Str),
        _ => return None,
    };
    Some(check_arity_and_types(method, sig.0, &sig.1, arg_types))
}

/// Common array instance methods. Not named in the spec's worked
/// examples beyond `length` (handled separately as a `.length` member
/// access, section 4.G.1); this small table covers the mutation and
/// query surface any array-typed value needs.
fn array_instance_method(receiver: &Type, method: &str, arg_types: &[Type]) -> Option<Result<Type, String>> {
    let elem = receiver.element_type()?.clone();
    match method {
        "push" => Some(check_arity_and_types("push", std::slice::from_ref(&elem), &Type::Void, arg_types)),
        "pop" => Some(check_arity_and_types("pop", &[], &elem, arg_types)),
        "contains" => Some(check_arity_and_types("contains", std::slice::from_ref(&elem), &Type::Bool, arg_types)),
        "join" => Some(check_arity_and_types("join", &[Type::Str], &Type::Str, arg_types)),
        _ => None,
    }
}

/// Common string instance methods, dispatched the same table-driven way
/// as array and opaque-host-type instance methods.
fn string_instance_method(method: &str, arg_types: &[Type]) -> Option<Result<Type, String>> {
    match method {
        "split" => Some(check_arity_and_types("split", &[Type::Str], &Type::Array(Box::new(Type::Str)), arg_types)),
        "trim" => Some(check_arity_and_types("trim", &[], &Type::Str, arg_types)),
        "to_upper" => Some(check_arity_and_types("to_upper", &[], &Type::Str, arg_types)),
        "to_lower" => Some(check_arity_and_types("to_lower", &[], &Type::Str, arg_types)),
        "contains" => Some(check_arity_and_types("contains", &[Type::Str], &Type::Bool, arg_types)),
        "replace" => Some(check_arity_and_types(
            "replace",
            &[Type::Str, Type::Str],
            &Type::Str,
            arg_types,
        )),
        _ => None,
    }
}

fn check_arity_and_types(
    name: &str,
    expected: &[Type],
    return_type: &Type,
    found: &[Type],
) -> Result<Type, String> {
    if expected.len() != found.len() {
        return Err(format!(
            "`{name}` expects {} argument(s), found {}",
            expected.len(),
            found.len()
        ));
    }
    for (e, f) in expected.iter().zip(found.iter()) {
        if !f.assignable_to(e) {
            return Err(format!("`{name}` expects `{e}`, found `{f}`"));
        }
    }
    Ok(return_type.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn println_accepts_anything() {
        assert!(builtin_global("println", &[Type::Int]).unwrap().is_ok());
        assert!(builtin_global("println", &[Type::Str]).unwrap().is_ok());
    }

    #[test]
    fn parse_int_requires_str() {
        assert!(builtin_global("parse_int", &[Type::Int]).unwrap().is_err());
        assert!(builtin_global("parse_int", &[Type::Str]).unwrap().is_ok());
    }

    #[test]
    fn random_choice_is_generic_over_element_type() {
        let arr = Type::Array(Box::new(Type::Str));
        let result = instance_method(&Type::Host(HostType::Random), "choice", &[arr]).unwrap();
        assert_eq!(result, Ok(Type::Str));
    }

    #[test]
    fn unknown_global_returns_none_not_err() {
        assert!(builtin_global("frobnicate", &[]).is_none());
    }

    #[test]
    fn exit_takes_an_int_code() {
        assert!(builtin_global("exit", &[Type::Int]).unwrap().is_ok());
        assert!(builtin_global("exit", &[Type::Str]).unwrap().is_err());
    }

    #[test]
    fn assert_takes_a_condition_and_a_message() {
        assert!(builtin_global("assert", &[Type::Bool, Type::Str]).unwrap().is_ok());
        assert!(builtin_global("assert", &[Type::Bool]).unwrap().is_err());
    }

    #[test]
    fn random_shuffle_returns_void_and_sample_returns_an_array() {
        let arr = Type::Array(Box::new(Type::Int));
        assert_eq!(
            instance_method(&Type::Host(HostType::Random), "shuffle", &[arr.clone()]),
            Some(Ok(Type::Void))
        );
        assert_eq!(
            instance_method(&Type::Host(HostType::Random), "sample", &[arr.clone(), Type::Int]),
            Some(Ok(arr))
        );
    }

    #[test]
    fn random_weighted_choice_requires_a_double_weights_array() {
        let arr = Type::Array(Box::new(Type::Str));
        let weights = Type::Array(Box::new(Type::Double));
        let result = instance_method(&Type::Host(HostType::Random), "weightedChoice", &[arr, weights]).unwrap();
        assert_eq!(result, Ok(Type::Str));
    }

    #[test]
    fn namespace_only_static_type_is_known_but_not_in_the_type_lattice() {
        assert!(is_known_static_type("Stdout"));
        assert_eq!(
            static_method("Stdout", "println", &[Type::Int]),
            Some(Ok(Type::Void))
        );
    }

    #[test]
    fn unknown_method_on_a_known_static_type_is_an_error_not_none() {
        assert!(static_method("Random", "frobnicate", &[]).unwrap().is_err());
    }

    #[test]
    fn string_instance_methods_dispatch() {
        assert_eq!(instance_method(&Type::Str, "trim", &[]), Some(Ok(Type::Str)));
        assert_eq!(
            instance_method(&Type::Str, "split", &[Type::Str]),
            Some(Ok(Type::Array(Box::new(Type::Str))))
        );
    }

    #[test]
    fn array_instance_methods_dispatch() {
        let arr = Type::Array(Box::new(Type::Int));
        assert_eq!(instance_method(&arr, "push", &[Type::Int]), Some(Ok(Type::Void)));
        assert_eq!(instance_method(&arr, "pop", &[]), Some(Ok(Type::Int)));
    }
}
