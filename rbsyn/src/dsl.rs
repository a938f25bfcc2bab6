use crate::types::{DeadEnd, Ty, Value};
use std::fmt;
use std::sync::Arc;

/// A typed production rule. The synthesizer only ever talks to operators
/// through this trait, so new domains plug in without touching the search.
///
/// Implementations must be pure: the same arguments always produce the same
/// value or the same [`DeadEnd`].
pub trait Operator: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Required argument types, in order. The length is the arity.
    fn parameter_types(&self) -> &[Ty];

    fn return_type(&self) -> Ty;

    /// Combine child renders into the render of the application. Nothing is
    /// evaluated here.
    fn render(&self, args: &[&str]) -> String;

    /// Apply the rule to the values of a single example.
    fn evaluate(&self, args: &[&Value]) -> Result<Value, DeadEnd>;

    fn arity(&self) -> usize {
        self.parameter_types().len()
    }
}

pub type OperatorRef = Arc<dyn Operator>;

/// How built-in operators spell their applications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Notation {
    /// `add(x, y)`
    #[default]
    Call,
    /// `(x + y)`; operators without a symbol fall back to call form.
    Infix,
}

type EvalFn = fn(&[&Value]) -> Result<Value, DeadEnd>;

/// Table-driven operator used by the bundled libraries.
pub struct Builtin {
    name: &'static str,
    symbol: Option<&'static str>,
    params: Vec<Ty>,
    ret: Ty,
    notation: Notation,
    eval: EvalFn,
}

impl Builtin {
    pub fn new(name: &'static str, params: Vec<Ty>, ret: Ty, eval: EvalFn) -> Self {
        Builtin {
            name,
            symbol: None,
            params,
            ret,
            notation: Notation::Call,
            eval,
        }
    }

    pub fn with_symbol(mut self, symbol: &'static str) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn with_notation(mut self, notation: Notation) -> Self {
        self.notation = notation;
        self
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("ret", &self.ret)
            .finish()
    }
}

impl Operator for Builtin {
    fn name(&self) -> &str {
        self.name
    }

    fn parameter_types(&self) -> &[Ty] {
        &self.params
    }

    fn return_type(&self) -> Ty {
        self.ret
    }

    fn render(&self, args: &[&str]) -> String {
        match (self.notation, self.symbol, args) {
            (Notation::Infix, Some(symbol), [lhs, rhs]) => {
                format!("({} {} {})", lhs, symbol, rhs)
            }
            _ => format!("{}({})", self.name, args.join(", ")),
        }
    }

    fn evaluate(&self, args: &[&Value]) -> Result<Value, DeadEnd> {
        if args.len() != self.params.len() {
            return Err(DeadEnd::Arity {
                op: self.name,
                expected: self.params.len(),
                found: args.len(),
            });
        }
        (self.eval)(args)
    }
}

fn binary(
    args: &[&Value],
    f: impl FnOnce(&Value, &Value) -> Result<Value, DeadEnd>,
) -> Result<Value, DeadEnd> {
    match args {
        [lhs, rhs] => f(*lhs, *rhs),
        _ => Err(DeadEnd::Arity {
            op: "binary",
            expected: 2,
            found: args.len(),
        }),
    }
}

pub fn add() -> Builtin {
    Builtin::new("add", vec![Ty::Number, Ty::Number], Ty::Number, |args| {
        binary(args, Value::checked_add)
    })
    .with_symbol("+")
}

pub fn subtract() -> Builtin {
    Builtin::new(
        "subtract",
        vec![Ty::Number, Ty::Number],
        Ty::Number,
        |args| binary(args, Value::checked_sub),
    )
    .with_symbol("-")
}

pub fn multiply() -> Builtin {
    Builtin::new(
        "multiply",
        vec![Ty::Number, Ty::Number],
        Ty::Number,
        |args| binary(args, Value::checked_mul),
    )
    .with_symbol("*")
}

pub fn divide() -> Builtin {
    Builtin::new("divide", vec![Ty::Number, Ty::Number], Ty::Number, |args| {
        binary(args, Value::floor_div)
    })
    .with_symbol("//")
}

pub fn concat() -> Builtin {
    Builtin::new("concat", vec![Ty::Text, Ty::Text], Ty::Text, |args| {
        binary(args, Value::concat)
    })
    .with_symbol("++")
}

pub fn left() -> Builtin {
    Builtin::new("left", vec![Ty::Text, Ty::Number], Ty::Text, |args| {
        binary(args, Value::left)
    })
}

pub fn right() -> Builtin {
    Builtin::new("right", vec![Ty::Text, Ty::Number], Ty::Text, |args| {
        binary(args, Value::right)
    })
}

pub fn space() -> Builtin {
    Builtin::new("space", Vec::new(), Ty::Text, |_| Ok(Value::text(" ")))
}

/// Bundled operator domains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Library {
    Arithmetic,
    Strings,
    All,
}

impl Library {
    /// Operators in a fixed order, so runs are reproducible.
    pub fn operators(self, notation: Notation) -> Vec<OperatorRef> {
        let builtins = match self {
            Library::Arithmetic => vec![add(), subtract(), multiply(), divide()],
            Library::Strings => vec![concat(), left(), right(), space()],
            Library::All => vec![
                add(),
                subtract(),
                multiply(),
                divide(),
                concat(),
                left(),
                right(),
                space(),
            ],
        };
        builtins
            .into_iter()
            .map(|op| Arc::new(op.with_notation(notation)) as OperatorRef)
            .collect()
    }

    /// Constants worth seeding alongside the arguments.
    pub fn default_constants(self) -> Vec<Value> {
        match self {
            Library::Arithmetic => Vec::new(),
            Library::Strings | Library::All => {
                let mut constants = vec![Value::text(" ")];
                constants.extend((0..=9).map(Value::Number));
                constants
            }
        }
    }
}
