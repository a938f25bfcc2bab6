pub mod bank;
pub mod dsl;
pub mod example;
pub mod expr;
pub mod synth;
pub mod types;

pub use bank::{Insertion, ProgramBank};
pub use dsl::{Library, Notation, Operator, OperatorRef};
pub use example::{read_examples, Example, ExampleSet};
pub use expr::{Behavior, Expression};
pub use synth::{run_synth, Primitive, Program, SynthConfig, SynthError, SynthResult, Synthesizer};
pub use types::{DeadEnd, Ty, Value};
