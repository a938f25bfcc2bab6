use crate::expr::{Behavior, Expression};
use crate::types::{Ty, Value};
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BankError {
    #[error("primitive {render} behaves exactly like {existing}")]
    DuplicateBehavior { render: String, existing: String },
    #[error("{render} has {actual} outputs but the bank holds {expected} examples")]
    Malformed {
        render: String,
        expected: usize,
        actual: usize,
    },
}

/// Outcome of offering a candidate to the bank.
#[derive(Debug, Clone)]
pub enum Insertion {
    /// Novel behavior; the candidate is now a member.
    Inserted(Arc<Expression>),
    /// Some member already behaves this way; the candidate was dropped.
    Duplicate,
    /// The candidate reproduces the target. It is handed back, not stored.
    Solution(Arc<Expression>),
}

/// Deduplicating store of discovered expressions, keyed by behavior. No two
/// members ever share a [`Behavior`]. Members are never removed.
#[derive(Debug, Clone)]
pub struct ProgramBank {
    target: Box<[Value]>,
    members: IndexMap<Behavior, Arc<Expression>>,
    by_type: IndexMap<Ty, Vec<Arc<Expression>>>,
}

impl ProgramBank {
    pub fn new(target: Vec<Value>) -> Self {
        ProgramBank {
            target: target.into_boxed_slice(),
            members: IndexMap::new(),
            by_type: IndexMap::new(),
        }
    }

    pub fn target(&self) -> &[Value] {
        &self.target
    }

    pub fn solves(&self, candidate: &Expression) -> bool {
        candidate.outputs() == &*self.target
    }

    /// Load the primitives. Callers must hand over behaviorally distinct
    /// expressions. The batch is stored whole or not at all.
    pub fn seed<I>(&mut self, primitives: I) -> Result<(), BankError>
    where
        I: IntoIterator<Item = Expression>,
    {
        let primitives = primitives.into_iter().collect::<Vec<_>>();
        let mut batch: IndexMap<&Behavior, &Expression> = IndexMap::new();
        for primitive in primitives.iter() {
            self.check_len(primitive)?;
            let existing = self
                .members
                .get(primitive.behavior())
                .map(|e| e.as_ref())
                .or_else(|| batch.get(&primitive.behavior()).copied());
            if let Some(existing) = existing {
                return Err(BankError::DuplicateBehavior {
                    render: primitive.render().to_owned(),
                    existing: existing.render().to_owned(),
                });
            }
            batch.insert(primitive.behavior(), primitive);
        }
        for primitive in primitives {
            self.push(Arc::new(primitive));
        }
        Ok(())
    }

    pub fn try_insert(&mut self, candidate: Expression) -> Result<Insertion, BankError> {
        self.check_len(&candidate)?;
        if self.solves(&candidate) {
            return Ok(Insertion::Solution(Arc::new(candidate)));
        }
        if self.members.contains_key(candidate.behavior()) {
            return Ok(Insertion::Duplicate);
        }
        let candidate = Arc::new(candidate);
        self.push(candidate.clone());
        Ok(Insertion::Inserted(candidate))
    }

    /// Every member carries one output per example.
    fn check_len(&self, expr: &Expression) -> Result<(), BankError> {
        if expr.outputs().len() != self.target.len() {
            return Err(BankError::Malformed {
                render: expr.render().to_owned(),
                expected: self.target.len(),
                actual: expr.outputs().len(),
            });
        }
        Ok(())
    }

    fn push(&mut self, expr: Arc<Expression>) {
        self.by_type.entry(expr.ty()).or_default().push(expr.clone());
        self.members.insert(expr.behavior().clone(), expr);
    }

    /// Members of type `ty`, oldest first.
    pub fn all_of_type(&self, ty: Ty) -> &[Arc<Expression>] {
        self.by_type.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, behavior: &Behavior) -> Option<&Arc<Expression>> {
        self.members.get(behavior)
    }

    pub fn contains(&self, behavior: &Behavior) -> bool {
        self.members.contains_key(behavior)
    }

    /// All members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Expression>> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_constant(n: i64) -> Expression {
        Expression::constant(Value::Number(n), 2)
    }

    #[test]
    fn seed_rejects_duplicate_behavior() {
        let mut bank = ProgramBank::new(vec![Value::Number(9), Value::Number(9)]);
        let err = bank
            .seed([number_constant(1), number_constant(1)])
            .unwrap_err();
        assert_eq!(
            err,
            BankError::DuplicateBehavior {
                render: "1".into(),
                existing: "1".into()
            }
        );
        assert!(bank.is_empty());
    }

    #[test]
    fn failed_seed_leaves_the_bank_untouched() {
        let mut bank = ProgramBank::new(vec![Value::Number(9), Value::Number(9)]);
        bank.seed([number_constant(1)]).unwrap();

        assert!(bank.seed([number_constant(7), number_constant(7)]).is_err());
        assert!(bank.seed([number_constant(8), number_constant(1)]).is_err());
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.all_of_type(Ty::Number).len(), 1);
        assert!(!bank.contains(number_constant(7).behavior()));
        assert!(!bank.contains(number_constant(8).behavior()));
    }

    #[test]
    fn wrong_output_count_is_rejected() {
        let mut bank = ProgramBank::new(vec![Value::Number(1), Value::Number(2)]);
        let err = bank
            .try_insert(Expression::constant(Value::Number(5), 3))
            .unwrap_err();
        assert_eq!(
            err,
            BankError::Malformed {
                render: "5".into(),
                expected: 2,
                actual: 3
            }
        );
        assert!(bank
            .seed([number_constant(4), Expression::constant(Value::Number(6), 1)])
            .is_err());
        assert!(bank.is_empty());
    }

    #[test]
    fn try_insert_classifies_candidates() {
        let mut bank = ProgramBank::new(vec![Value::Number(9), Value::Number(9)]);
        bank.seed([number_constant(1)]).unwrap();

        assert!(matches!(
            bank.try_insert(number_constant(2)),
            Ok(Insertion::Inserted(_))
        ));
        assert!(matches!(
            bank.try_insert(number_constant(2)),
            Ok(Insertion::Duplicate)
        ));
        match bank.try_insert(number_constant(9)).unwrap() {
            Insertion::Solution(expr) => assert_eq!(expr.render(), "9"),
            other => panic!("expected solution, got {:?}", other),
        }
        assert_eq!(bank.len(), 2);
        assert!(!bank.contains(number_constant(9).behavior()));
    }

    #[test]
    fn type_is_part_of_identity() {
        let mut bank = ProgramBank::new(vec![Value::Number(0)]);
        let text = Expression::constant(Value::text("1"), 1);
        let number = Expression::constant(Value::Number(1), 1);
        bank.seed([text, number]).unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.all_of_type(Ty::Text).len(), 1);
        assert_eq!(bank.all_of_type(Ty::Number).len(), 1);
    }

    #[test]
    fn members_keep_insertion_order() {
        let mut bank = ProgramBank::new(vec![Value::Number(0), Value::Number(0)]);
        bank.seed([number_constant(3), number_constant(1)]).unwrap();
        bank.try_insert(number_constant(2)).unwrap();
        bank.try_insert(Expression::constant(Value::text("a"), 2))
            .unwrap();
        let numbers = bank
            .all_of_type(Ty::Number)
            .iter()
            .map(|e| e.render())
            .collect::<Vec<_>>();
        assert_eq!(numbers, vec!["3", "1", "2"]);
        let all = bank.iter().map(|e| e.render()).collect::<Vec<_>>();
        assert_eq!(all, vec!["3", "1", "2", "\"a\""]);
        assert!(bank
            .get(number_constant(1).behavior())
            .is_some_and(|e| e.render() == "1"));
    }
}
