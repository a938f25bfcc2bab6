use crate::dsl::OperatorRef;
use crate::example::{Bindings, ExampleSet};
use crate::types::{DeadEnd, Ty, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Observable behavior of an expression: its type and the value it produces
/// on each example. Two expressions with the same behavior are
/// interchangeable for the search, whatever their renders.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Behavior {
    ty: Ty,
    outputs: Box<[Value]>,
}

impl Behavior {
    pub fn new(ty: Ty, outputs: Vec<Value>) -> Self {
        Behavior {
            ty,
            outputs: outputs.into_boxed_slice(),
        }
    }

    pub fn ty(&self) -> Ty {
        self.ty
    }

    pub fn outputs(&self) -> &[Value] {
        &self.outputs
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("malformed expression {render}: {actual} outputs for {expected} examples")]
    Malformed {
        render: String,
        expected: usize,
        actual: usize,
    },
    #[error("argument '{0}' is not bound by the examples")]
    UnboundArgument(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("argument '{0}' is not bound")]
    UnboundArgument(String),
    #[error(transparent)]
    DeadEnd(#[from] DeadEnd),
}

/// How an expression came to be.
#[derive(Debug, Clone)]
pub enum Origin {
    Argument(String),
    Constant(Value),
    Apply {
        op: OperatorRef,
        args: Vec<Arc<Expression>>,
    },
}

/// A candidate program together with its outputs on every example.
///
/// The render is for people only. Nothing reads it back; re-evaluation goes
/// through [`Expression::eval`], which walks the [`Origin`] tree.
#[derive(Debug, Clone)]
pub struct Expression {
    render: String,
    behavior: Behavior,
    origin: Origin,
}

impl Expression {
    pub fn argument(name: &str, examples: &ExampleSet) -> Result<Self, ExprError> {
        let ty = examples
            .signature()
            .arguments
            .get(name)
            .copied()
            .ok_or_else(|| ExprError::UnboundArgument(name.to_owned()))?;
        let outputs = examples
            .column(name)
            .ok_or_else(|| ExprError::UnboundArgument(name.to_owned()))?;
        Self::checked(
            name.to_owned(),
            ty,
            outputs,
            examples.len(),
            Origin::Argument(name.to_owned()),
        )
    }

    pub fn constant(value: Value, example_count: usize) -> Self {
        Expression {
            render: value.to_string(),
            behavior: Behavior::new(value.ty(), vec![value.clone(); example_count]),
            origin: Origin::Constant(value),
        }
    }

    /// Application of `op` to `args`, already evaluated to `outputs`.
    pub fn derived(
        op: OperatorRef,
        args: Vec<Arc<Expression>>,
        outputs: Vec<Value>,
        example_count: usize,
    ) -> Result<Self, ExprError> {
        let renders = args.iter().map(|arg| arg.render()).collect::<Vec<_>>();
        let render = op.render(&renders);
        let ty = op.return_type();
        Self::checked(render, ty, outputs, example_count, Origin::Apply { op, args })
    }

    fn checked(
        render: String,
        ty: Ty,
        outputs: Vec<Value>,
        expected: usize,
        origin: Origin,
    ) -> Result<Self, ExprError> {
        if outputs.len() != expected {
            return Err(ExprError::Malformed {
                render,
                expected,
                actual: outputs.len(),
            });
        }
        Ok(Expression {
            render,
            behavior: Behavior::new(ty, outputs),
            origin,
        })
    }

    pub fn render(&self) -> &str {
        &self.render
    }

    pub fn ty(&self) -> Ty {
        self.behavior.ty
    }

    pub fn outputs(&self) -> &[Value] {
        &self.behavior.outputs
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Number of nodes in the program tree.
    pub fn size(&self) -> usize {
        match &self.origin {
            Origin::Argument(_) | Origin::Constant(_) => 1,
            Origin::Apply { args, .. } => 1 + args.iter().map(|arg| arg.size()).sum::<usize>(),
        }
    }

    /// Run the program tree on one example's bindings.
    pub fn eval(&self, bindings: &Bindings) -> Result<Value, EvalError> {
        match &self.origin {
            Origin::Argument(name) => bindings
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnboundArgument(name.clone())),
            Origin::Constant(value) => Ok(value.clone()),
            Origin::Apply { op, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(bindings))
                    .collect::<Result<Vec<_>, _>>()?;
                let refs = values.iter().collect::<Vec<_>>();
                Ok(op.evaluate(&refs)?)
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{add, divide};
    use crate::example::Example;

    fn examples() -> ExampleSet {
        ExampleSet::new(vec![
            Example::new(
                [("x", Value::Number(3)), ("y", Value::Number(0))],
                Value::Number(6),
            ),
            Example::new(
                [("x", Value::Number(4)), ("y", Value::Number(2))],
                Value::Number(8),
            ),
        ])
        .expect("valid examples")
    }

    #[test]
    fn arguments_take_their_column() {
        let x = Expression::argument("x", &examples()).expect("x is bound");
        assert_eq!(x.render(), "x");
        assert_eq!(x.ty(), Ty::Number);
        assert_eq!(x.outputs(), &[Value::Number(3), Value::Number(4)]);
        assert_eq!(
            Expression::argument("z", &examples()).unwrap_err(),
            ExprError::UnboundArgument("z".into())
        );
    }

    #[test]
    fn constants_repeat_their_value() {
        let c = Expression::constant(Value::text(" "), 3);
        assert_eq!(c.render(), "\" \"");
        assert_eq!(c.outputs().len(), 3);
        assert!(c.outputs().iter().all(|v| v == &Value::text(" ")));
    }

    #[test]
    fn derived_with_wrong_output_count_is_malformed() {
        let x = Arc::new(Expression::argument("x", &examples()).unwrap());
        let err = Expression::derived(
            Arc::new(add()),
            vec![x.clone(), x],
            vec![Value::Number(6)],
            2,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ExprError::Malformed {
                render: "add(x, x)".into(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn behavior_ignores_render() {
        let set = examples();
        let x = Arc::new(Expression::argument("x", &set).unwrap());
        let outputs = vec![Value::Number(6), Value::Number(8)];
        let sum = Expression::derived(
            Arc::new(add()),
            vec![x.clone(), x.clone()],
            outputs.clone(),
            2,
        )
        .unwrap();
        let quotient = Expression::derived(Arc::new(divide()), vec![x.clone(), x], outputs, 2)
            .unwrap();
        assert_ne!(sum.render(), quotient.render());
        assert_eq!(sum.behavior(), quotient.behavior());
        assert_ne!(
            Behavior::new(Ty::Number, vec![Value::Number(1)]),
            Behavior::new(Ty::Text, vec![Value::Number(1)])
        );
    }

    #[test]
    fn eval_walks_the_tree() {
        let set = examples();
        let x = Arc::new(Expression::argument("x", &set).unwrap());
        let y = Arc::new(Expression::argument("y", &set).unwrap());
        let sum = Arc::new(
            Expression::derived(
                Arc::new(add()),
                vec![x.clone(), x.clone()],
                vec![Value::Number(6), Value::Number(8)],
                2,
            )
            .unwrap(),
        );
        assert_eq!(sum.size(), 3);
        let first = &set.iter().next().unwrap().input;
        assert_eq!(sum.eval(first), Ok(Value::Number(6)));

        let quotient = Expression::derived(
            Arc::new(divide()),
            vec![sum, y],
            vec![Value::Number(0), Value::Number(4)],
            2,
        )
        .unwrap();
        assert_eq!(
            quotient.eval(first),
            Err(EvalError::DeadEnd(DeadEnd::DivisionByZero))
        );
        assert_eq!(
            quotient.eval(&Bindings::new()),
            Err(EvalError::UnboundArgument("x".into()))
        );
    }
}
