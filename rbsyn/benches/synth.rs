use std::path::Path;
use std::path::PathBuf;

use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BenchmarkId;
use criterion::Criterion;
use rbsyn::read_examples;
use rbsyn::run_synth;
use rbsyn::ExampleSet;
use rbsyn::Library;
use rbsyn::Notation;
use rbsyn::Primitive;
use rbsyn::SynthConfig;
use rbsyn::SynthResult;

struct Fixture {
    name: &'static str,
    file: &'static str,
    library: Library,
}

const FIXTURES: &[Fixture] = &[
    Fixture {
        name: "double",
        file: "double.json",
        library: Library::Arithmetic,
    },
    Fixture {
        name: "floor_div",
        file: "floor_div.json",
        library: Library::Arithmetic,
    },
    Fixture {
        name: "square_plus",
        file: "square_plus.json",
        library: Library::Arithmetic,
    },
    Fixture {
        name: "concat",
        file: "concat.json",
        library: Library::Strings,
    },
    Fixture {
        name: "first_word",
        file: "first_word.json",
        library: Library::Strings,
    },
];

fn load_examples(path: &Path) -> ExampleSet {
    read_examples(path).unwrap_or_else(|err| panic!("failed to load {}: {}", path.display(), err))
}

fn tests_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../tests")
}

fn bench_synth(c: &mut Criterion) {
    let fixtures = FIXTURES
        .iter()
        .map(|fixture| {
            let examples = load_examples(&tests_dir().join(fixture.file));
            (fixture, examples)
        })
        .collect::<Vec<_>>();

    let mut group = c.benchmark_group("synth");
    group.sample_size(20);

    for (fixture, examples) in fixtures.iter() {
        let mut primitives = Primitive::arguments(examples);
        primitives.extend(
            fixture
                .library
                .default_constants()
                .into_iter()
                .map(Primitive::Constant),
        );
        group.bench_with_input(
            BenchmarkId::from_parameter(fixture.name),
            examples,
            |b, exs| {
                b.iter(|| {
                    let result = run_synth(
                        exs,
                        primitives.clone(),
                        fixture.library.operators(Notation::Call),
                        SynthConfig::default(),
                    )
                    .expect("synthesis runs");
                    if !matches!(result, SynthResult::Program(_)) {
                        panic!("benchmark {} found no program", fixture.name);
                    }
                    black_box(result);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_synth);
criterion_main!(benches);
