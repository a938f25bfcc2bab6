use crate::bank::{BankError, Insertion, ProgramBank};
use crate::dsl::{Operator, OperatorRef};
use crate::example::ExampleSet;
use crate::expr::{ExprError, Expression};
use crate::types::{DeadEnd, Ty, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

pub const DEFAULT_ROUNDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    /// Round budget. Round 0 seeds the bank, so `rounds - 1` operator
    /// applications are stacked at most.
    pub rounds: usize,
    /// Optional wall-clock bound, checked between candidates.
    pub time_limit: Option<Duration>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            time_limit: None,
        }
    }
}

impl SynthConfig {
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// Seed material for round 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    Argument(String),
    Constant(Value),
}

impl Primitive {
    /// One argument primitive per name bound by the examples.
    pub fn arguments(examples: &ExampleSet) -> Vec<Primitive> {
        examples
            .argument_names()
            .map(|name| Primitive::Argument(name.to_owned()))
            .collect()
    }

    fn build(&self, examples: &ExampleSet) -> Result<Expression, ExprError> {
        match self {
            Primitive::Argument(name) => Expression::argument(name, examples),
            Primitive::Constant(value) => Ok(Expression::constant(value.clone(), examples.len())),
        }
    }
}

/// A program that reproduces every example's output.
#[derive(Debug, Clone)]
pub struct Program {
    expression: Arc<Expression>,
    round: usize,
}

impl Program {
    pub fn render(&self) -> &str {
        self.expression.render()
    }

    /// Round in which the program was discovered.
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn expression(&self) -> &Arc<Expression> {
        &self.expression
    }

    /// Re-run the program tree on every example and compare with the
    /// expected outputs.
    pub fn consistent(&self, examples: &ExampleSet) -> bool {
        examples.iter().all(|ex| match self.expression.eval(&ex.input) {
            Ok(result) => result == ex.output,
            Err(_) => false,
        })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[derive(Debug, Clone)]
pub enum SynthResult {
    Program(Program),
    /// The round budget ran out. Deeper searches may still succeed.
    ProgramNotFound,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Ready,
    Seeded,
    Searching { round: usize },
    Solved { round: usize },
    Exhausted,
    TimedOut,
    /// The run stopped on a [`SynthError`].
    Failed,
}

impl SearchState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SearchState::Solved { .. }
                | SearchState::Exhausted
                | SearchState::TimedOut
                | SearchState::Failed
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthStats {
    pub rounds_completed: usize,
    pub candidates: u64,
    pub dead_ends: u64,
    pub duplicates: u64,
    pub inserted: u64,
    pub bank_size: usize,
}

#[derive(Debug, Error, Clone)]
pub enum SynthError {
    #[error("round budget must be at least 1")]
    EmptyRoundBudget,
    #[error(transparent)]
    Expression(#[from] ExprError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error("operator {op} declares {declared} but produced {found}")]
    ReturnTypeMismatch {
        op: String,
        declared: Ty,
        found: Ty,
    },
}

/// Bottom-up enumerative search with observational-equivalence pruning.
pub struct Synthesizer {
    examples: ExampleSet,
    primitives: Vec<Expression>,
    operators: Vec<OperatorRef>,
    config: SynthConfig,
    bank: ProgramBank,
    state: SearchState,
    stats: SynthStats,
    outcome: Option<Result<SynthResult, SynthError>>,
}

impl Synthesizer {
    pub fn new(
        examples: ExampleSet,
        primitives: Vec<Primitive>,
        operators: Vec<OperatorRef>,
        config: SynthConfig,
    ) -> Result<Self, SynthError> {
        if config.rounds == 0 {
            return Err(SynthError::EmptyRoundBudget);
        }
        let primitives = primitives
            .iter()
            .map(|p| p.build(&examples))
            .collect::<Result<Vec<_>, _>>()?;
        let bank = ProgramBank::new(examples.target());
        Ok(Synthesizer {
            examples,
            primitives,
            operators,
            config,
            bank,
            state: SearchState::Ready,
            stats: SynthStats::default(),
            outcome: None,
        })
    }

    pub fn bank(&self) -> &ProgramBank {
        &self.bank
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn stats(&self) -> &SynthStats {
        &self.stats
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn examples(&self) -> &ExampleSet {
        &self.examples
    }

    /// Run to a terminal state. Once there, further calls return the same
    /// result or error without searching again.
    pub fn run(&mut self) -> Result<SynthResult, SynthError> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let deadline = self.config.time_limit.map(|limit| Instant::now() + limit);
        let result = match self.search(deadline) {
            Ok(result) => result,
            Err(err) => {
                warn!(state = ?self.state, "search failed: {}", err);
                self.stats.bank_size = self.bank.len();
                self.state = SearchState::Failed;
                self.outcome = Some(Err(err.clone()));
                return Err(err);
            }
        };

        self.stats.bank_size = self.bank.len();
        self.state = match &result {
            SynthResult::Program(program) => {
                info!(
                    round = program.round(),
                    bank = self.bank.len(),
                    candidates = self.stats.candidates,
                    "found {}",
                    program
                );
                SearchState::Solved {
                    round: program.round(),
                }
            }
            SynthResult::ProgramNotFound => {
                info!(
                    rounds = self.config.rounds,
                    bank = self.bank.len(),
                    "round budget exhausted"
                );
                SearchState::Exhausted
            }
            SynthResult::Timeout => {
                info!(bank = self.bank.len(), "time limit reached");
                SearchState::TimedOut
            }
        };
        self.outcome = Some(Ok(result.clone()));
        Ok(result)
    }

    fn search(&mut self, deadline: Option<Instant>) -> Result<SynthResult, SynthError> {
        if let Some(program) = self.seed()? {
            return Ok(SynthResult::Program(program));
        }
        for round in 1..self.config.rounds {
            self.state = SearchState::Searching { round };
            if let Some(result) = self.expand(round, deadline)? {
                return Ok(result);
            }
            self.stats.rounds_completed += 1;
            debug!(
                round,
                bank = self.bank.len(),
                candidates = self.stats.candidates,
                dead_ends = self.stats.dead_ends,
                duplicates = self.stats.duplicates,
                "round complete"
            );
        }
        Ok(SynthResult::ProgramNotFound)
    }

    /// Round 0. Primitives that behave like an earlier one are folded into
    /// it so the bank only ever sees distinct behaviors.
    fn seed(&mut self) -> Result<Option<Program>, SynthError> {
        let mut distinct: Vec<Expression> = Vec::new();
        for primitive in std::mem::take(&mut self.primitives) {
            if self.bank.solves(&primitive) {
                return Ok(Some(Program {
                    expression: Arc::new(primitive),
                    round: 0,
                }));
            }
            if let Some(earlier) = distinct
                .iter()
                .find(|e| e.behavior() == primitive.behavior())
            {
                debug!("primitive {} behaves like {}, dropped", primitive, earlier);
                continue;
            }
            distinct.push(primitive);
        }
        self.bank.seed(distinct)?;
        self.stats.rounds_completed = 1;
        self.state = SearchState::Seeded;
        debug!(bank = self.bank.len(), "seeded");
        Ok(None)
    }

    /// One pass of every operator over the bank as it stood when the round
    /// began. Members added during the round only become arguments next
    /// round.
    fn expand(
        &mut self,
        round: usize,
        deadline: Option<Instant>,
    ) -> Result<Option<SynthResult>, SynthError> {
        let mut pools: IndexMap<Ty, Vec<Arc<Expression>>> = IndexMap::new();
        for op in self.operators.iter() {
            for ty in op.parameter_types() {
                pools
                    .entry(*ty)
                    .or_insert_with(|| self.bank.all_of_type(*ty).to_vec());
            }
        }

        let example_count = self.examples.len();
        let operators = self.operators.clone();
        for op in operators.iter() {
            let params = op
                .parameter_types()
                .iter()
                .map(|ty| pools[ty].as_slice())
                .collect::<Vec<_>>();
            let lens = params.iter().map(|pool| pool.len()).collect::<Vec<_>>();

            for tuple in ArgTuples::new(lens) {
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    return Ok(Some(SynthResult::Timeout));
                }
                self.stats.candidates += 1;
                let args = tuple
                    .iter()
                    .zip(params.iter())
                    .map(|(&idx, pool)| pool[idx].clone())
                    .collect::<Vec<_>>();

                let outputs = match evaluate_candidate(op.as_ref(), &args, example_count) {
                    Ok(outputs) => outputs,
                    Err(dead_end) => {
                        self.stats.dead_ends += 1;
                        trace!(op = op.name(), %dead_end, "dead end");
                        continue;
                    }
                };
                if let Some(bad) = outputs.iter().find(|v| v.ty() != op.return_type()) {
                    return Err(SynthError::ReturnTypeMismatch {
                        op: op.name().to_owned(),
                        declared: op.return_type(),
                        found: bad.ty(),
                    });
                }

                let candidate = Expression::derived(op.clone(), args, outputs, example_count)?;
                match self.bank.try_insert(candidate)? {
                    Insertion::Inserted(expr) => {
                        self.stats.inserted += 1;
                        trace!(round, "inserted {}", expr);
                    }
                    Insertion::Duplicate => self.stats.duplicates += 1,
                    Insertion::Solution(expression) => {
                        return Ok(Some(SynthResult::Program(Program { expression, round })));
                    }
                }
            }
        }
        Ok(None)
    }
}

/// Evaluate `op` on every example. The first dead end aborts the candidate.
fn evaluate_candidate(
    op: &dyn Operator,
    args: &[Arc<Expression>],
    example_count: usize,
) -> Result<Vec<Value>, DeadEnd> {
    let mut outputs = Vec::with_capacity(example_count);
    let mut values: Vec<&Value> = Vec::with_capacity(args.len());
    for idx in 0..example_count {
        values.clear();
        values.extend(args.iter().map(|arg| &arg.outputs()[idx]));
        outputs.push(op.evaluate(&values)?);
    }
    Ok(outputs)
}

/// Index tuples of a cartesian product, rightmost position varying fastest.
/// An empty `lens` yields the empty tuple once; any empty pool yields
/// nothing.
struct ArgTuples {
    lens: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl ArgTuples {
    fn new(lens: Vec<usize>) -> Self {
        let next = if lens.contains(&0) {
            None
        } else {
            Some(vec![0; lens.len()])
        };
        ArgTuples { lens, next }
    }
}

impl Iterator for ArgTuples {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut succ = current.clone();
        for pos in (0..succ.len()).rev() {
            succ[pos] += 1;
            if succ[pos] < self.lens[pos] {
                self.next = Some(succ);
                break;
            }
            succ[pos] = 0;
        }
        Some(current)
    }
}

pub fn run_synth(
    examples: &ExampleSet,
    primitives: Vec<Primitive>,
    operators: Vec<OperatorRef>,
    config: SynthConfig,
) -> Result<SynthResult, SynthError> {
    Synthesizer::new(examples.clone(), primitives, operators, config)?.run()
}
