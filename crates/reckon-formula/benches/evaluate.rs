use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use reckon_formula::{Formula, FormulaOptions, OperatorRegistry};
use std::hint::black_box;

fn bind_all(formula: &mut Formula) {
    formula.bind_variable("a", 2.0);
    formula.bind_variable("b", 3.0);
    formula.bind_variable("power", 100.0);
    formula.bind_variable("defense", 50.0);
    formula.bind_variable("critical_bonus", 0.5);
    formula.bind_variable("skill_modifier", 1.2);
    formula.bind_variable("threat", 1000.0);
    formula.bind_variable("distance", 20.0);
    formula.bind_variable("is_taunted", 1.0);
}

fn expressions() -> Vec<(&'static str, &'static str)> {
    vec![
        ("constant", "123.45"),
        ("variable", "a"),
        ("simple_add", "a + b"),
        ("folded_arithmetic", "(2 * 10 + 3 * 20) / 2.0 + a"),
        ("comparison_and", "a > b AND b > 1"),
        ("builtin_max", "max(a, b, 10)"),
        ("conditional", "a > b ? power : defense"),
        (
            "damage_calculation",
            "(power - defense) * (1.0 + critical_bonus) * skill_modifier",
        ),
        (
            "targeting_priority",
            "(threat * 0.8) + (distance * -0.2) + is_taunted * 100.0",
        ),
        (
            "nested_logic",
            "max(a, b) + (power > defense ? sqrt(power) : log(defense)) * skill_modifier",
        ),
    ]
}

fn benchmark_parse(c: &mut Criterion) {
    let operators = OperatorRegistry::global();

    for (name, text) in expressions() {
        c.bench_function(&format!("parse_{}", name), |b| {
            b.iter(|| {
                let formula = Formula::parse(black_box(text), operators.clone()).unwrap();
                black_box(formula);
            });
        });
    }
}

fn benchmark_compile(c: &mut Criterion) {
    for (name, text) in expressions() {
        c.bench_function(&format!("compile_{}", name), |b| {
            b.iter_batched(
                || Formula::new(text).unwrap(),
                |mut formula| {
                    formula.compile().unwrap();
                    black_box(formula);
                },
                BatchSize::SmallInput,
            );
        });
    }
}

fn benchmark_eval(c: &mut Criterion) {
    for (name, text) in expressions() {
        let mut formula = Formula::new(text).unwrap();
        bind_all(&mut formula);
        println!("{} = {}", name, formula.evaluate().unwrap());

        c.bench_function(&format!("eval_{}", name), |b| {
            b.iter(|| black_box(formula.evaluate().unwrap()));
        });

        let options = FormulaOptions {
            constant_folding: false,
            ..Default::default()
        };
        let mut unfolded =
            Formula::parse_with_options(text, OperatorRegistry::global(), options).unwrap();
        bind_all(&mut unfolded);
        c.bench_function(&format!("eval_unfolded_{}", name), |b| {
            b.iter(|| black_box(unfolded.evaluate().unwrap()));
        });
    }
}

criterion_group!(benches, benchmark_parse, benchmark_compile, benchmark_eval);
criterion_main!(benches);
