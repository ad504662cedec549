use criterion::{criterion_group, criterion_main, Criterion};
use halal_check_core::{evaluate, evaluate_recipe, resolve, IngredientRecord, KnowledgeBase, Ruling};

// layered graph: each node derives from two nodes in the layer below, the
// bottom layer is a mix of halal, conditional and haram leaves
fn layered_kb(layers: usize, width: usize) -> KnowledgeBase {
    let mut records = Vec::with_capacity(layers * width);
    for layer in 0..layers {
        for index in 0..width {
            let identifier = format!("l{layer}_n{index}");
            let record = if layer + 1 == layers {
                let ruling = match index % 7 {
                    0 => Ruling::Haram,
                    1 | 2 => Ruling::Conditional,
                    _ => Ruling::Halal,
                };
                IngredientRecord::new(&identifier, Some(ruling))
            } else {
                IngredientRecord::new(&identifier, Some(Ruling::Halal)).derived_from([
                    format!("l{}_n{index}", layer + 1),
                    format!("l{}_n{}", layer + 1, (index + 1) % width),
                ])
            };
            records.push(record);
        }
    }
    match KnowledgeBase::from_records(records) {
        Ok(kb) => kb,
        Err(err) => panic!("benchmark knowledge base failed: {err}"),
    }
}

fn bench_resolve(c: &mut Criterion) {
    let kb = layered_kb(6, 64);
    c.bench_function("resolve_layered_6x64", |b| {
        b.iter(|| {
            if resolve(&kb, "l0_n0").is_none() {
                panic!("resolver benchmark root missing");
            }
        });
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let kb = layered_kb(6, 64);
    let inputs = ["l0_n3", "wine braised chicken", "apple", "microbial rennet", "zorblax"];
    c.bench_function("evaluate_mixed_inputs", |b| {
        b.iter(|| {
            for input in inputs {
                let result = evaluate(&kb, input);
                if result.confidence_score > 100 {
                    panic!("score out of range for {input}");
                }
            }
        });
    });
}

fn bench_recipe(c: &mut Criterion) {
    let kb = layered_kb(4, 32);
    let ingredients = (0..32).map(|index| format!("l0_n{index}")).collect::<Vec<_>>();
    c.bench_function("recipe_32_items", |b| {
        b.iter(|| evaluate_recipe(&kb, &ingredients));
    });
}

criterion_group!(evaluation_benches, bench_resolve, bench_evaluate, bench_recipe);
criterion_main!(evaluation_benches);
