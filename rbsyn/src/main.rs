use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use anyhow::Context;
use clap::ArgAction;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rbsyn::read_examples;
use rbsyn::synth::DEFAULT_ROUNDS;
use rbsyn::Library;
use rbsyn::Notation;
use rbsyn::Primitive;
use rbsyn::SynthConfig;
use rbsyn::SynthResult;
use rbsyn::Synthesizer;
use rbsyn::Value;

#[derive(Parser, Debug)]
#[command(name = "rbsyn", about = "CLI front-end for the rbsyn bottom-up synthesiser")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesise a program from JSON example pairs
    Synth {
        /// Path to JSON examples file
        file: PathBuf,
        /// Operator library to build programs from
        #[arg(short, long, value_enum, default_value_t = LibraryArg::Arithmetic)]
        library: LibraryArg,
        /// Round budget; round 0 only seeds arguments and constants
        #[arg(short, long, default_value_t = DEFAULT_ROUNDS)]
        rounds: usize,
        /// Extra constant to seed, as JSON (anything that isn't JSON is taken as text)
        #[arg(short = 'c', long = "constant")]
        constants: Vec<String>,
        /// Don't seed the library's suggested constants
        #[arg(long, action = ArgAction::SetTrue)]
        no_default_constants: bool,
        /// How to print operator applications
        #[arg(long, value_enum, default_value_t = NotationArg::Call)]
        notation: NotationArg,
        /// Give up after this many milliseconds
        #[arg(long)]
        time_limit_ms: Option<u64>,
        /// Print progress information while searching
        #[arg(short = 'v', long, action = ArgAction::SetTrue)]
        verbose: bool,
    },
    /// Infer the argument and output types of an examples file
    Infer {
        /// Path to JSON examples file
        file: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LibraryArg {
    Arithmetic,
    Strings,
    All,
}

impl From<LibraryArg> for Library {
    fn from(arg: LibraryArg) -> Self {
        match arg {
            LibraryArg::Arithmetic => Library::Arithmetic,
            LibraryArg::Strings => Library::Strings,
            LibraryArg::All => Library::All,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum NotationArg {
    Call,
    Infix,
}

impl From<NotationArg> for Notation {
    fn from(arg: NotationArg) -> Self {
        match arg {
            NotationArg::Call => Notation::Call,
            NotationArg::Infix => Notation::Infix,
        }
    }
}

struct SynthArgs {
    file: PathBuf,
    library: Library,
    rounds: usize,
    constants: Vec<String>,
    no_default_constants: bool,
    notation: Notation,
    time_limit: Option<Duration>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth {
            file,
            library,
            rounds,
            constants,
            no_default_constants,
            notation,
            time_limit_ms,
            verbose,
        } => {
            init_tracing(verbose);
            synth_command(SynthArgs {
                file,
                library: library.into(),
                rounds,
                constants,
                no_default_constants,
                notation: notation.into(),
                time_limit: time_limit_ms.map(Duration::from_millis),
            })
        }
        Commands::Infer { file } => infer_command(file),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "rbsyn=debug" } else { "rbsyn=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn synth_command(args: SynthArgs) -> anyhow::Result<()> {
    let file_display = args.file.display().to_string();
    let examples = read_examples(&args.file)
        .with_context(|| format!("reading examples from {}", file_display))?;

    let mut primitives = Primitive::arguments(&examples);
    if !args.no_default_constants {
        primitives.extend(
            args.library
                .default_constants()
                .into_iter()
                .map(Primitive::Constant),
        );
    }
    for raw in args.constants.iter() {
        let value = parse_constant(raw).with_context(|| format!("parsing --constant {}", raw))?;
        primitives.push(Primitive::Constant(value));
    }

    let mut config = SynthConfig::default().with_rounds(args.rounds);
    if let Some(limit) = args.time_limit {
        config = config.with_time_limit(limit);
    }

    let mut synth = Synthesizer::new(
        examples,
        primitives,
        args.library.operators(args.notation),
        config,
    )
    .with_context(|| format!("setting up synthesis for {}", file_display))?;
    let result = synth.run().context("running synthesis")?;

    let stats = synth.stats();
    info!(
        rounds = stats.rounds_completed,
        candidates = stats.candidates,
        dead_ends = stats.dead_ends,
        duplicates = stats.duplicates,
        bank = stats.bank_size,
        "search finished"
    );

    match result {
        SynthResult::Program(program) => println!("{}", program),
        SynthResult::ProgramNotFound => {
            println!("no program found within {} rounds", args.rounds)
        }
        SynthResult::Timeout => println!("synthesis ran out of time"),
    }

    Ok(())
}

/// JSON integers and strings are taken as they are. Anything that isn't
/// JSON at all is a bare text constant.
fn parse_constant(raw: &str) -> anyhow::Result<Value> {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Ok(Value::text(raw));
    };
    match serde_json::from_value::<Value>(json) {
        Ok(value) => Ok(value),
        Err(_) => bail!("{} is neither an integer nor a string", raw),
    }
}

fn infer_command(file: PathBuf) -> anyhow::Result<()> {
    let file_display = file.display().to_string();
    let examples = read_examples(&file)
        .with_context(|| format!("reading examples from {}", file_display))?;

    println!("EXAMPLES\n  {}", examples.len());
    println!("SIGNATURE\n  {}", examples.signature());
    Ok(())
}
