use criterion::{black_box, criterion_group, criterion_main, Criterion};

use formlogic_core::engine::{evaluate, resolve_visibility, AnswerSet};
use formlogic_core::model::{AnswerItem, QuestionBlock, QuotaCondition};
use formlogic_core::validate::validate_definition;

/// A chain where each question's "next" option reveals the following one.
fn chained_form(n: usize) -> Vec<QuestionBlock> {
    (0..n)
        .map(|i| {
            let block = QuestionBlock::radio(format!("Question {i}"), &["next", "stop"])
                .with_quota(QuotaCondition::GreaterThan, 0.0);
            if i + 1 < n {
                block.reveal("next", [i + 1])
            } else {
                block
            }
        })
        .collect()
}

/// Answers given back to front so resolution needs many rounds.
fn reversed_answers(n: usize) -> Vec<AnswerItem> {
    (0..n).rev().map(|i| AnswerItem::new(i, &["next"])).collect()
}

fn bench_resolve_visibility(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_visibility");

    for n in [10, 100, 500] {
        let form = chained_form(n);
        let answers = AnswerSet::from_items(&reversed_answers(n));

        group.bench_function(format!("chain_{n}"), |b| {
            b.iter(|| resolve_visibility(black_box(&form), black_box(&answers)))
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    let form = chained_form(200);
    let answers = reversed_answers(200);

    group.bench_function("chain_200", |b| {
        b.iter(|| evaluate(black_box(&form), black_box(&answers)))
    });

    group.bench_function("validate_chain_200", |b| {
        b.iter(|| validate_definition(black_box(&form)))
    });

    group.finish();
}

criterion_group!(benches, bench_resolve_visibility, bench_evaluate);
criterion_main!(benches);
