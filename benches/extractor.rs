use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use marketgate::core::diagnostics::DiagnosticSink;
use marketgate::core::extractor::CardRegistry;
use marketgate::core::loader::ContentIndex;
use marketgate::gates::static_gate::run_static_gates;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn registry_source(cards: usize) -> String {
    let mut src = String::new();
    for i in 0..cards {
        if i % 3 == 0 {
            src.push_str(&format!(
                "const _card{i}Bundle = import('./Card{i}').then(m => m)\n\
                 const Card{i} = lazy(() => _card{i}Bundle.then(m => ({{ default: m.Card{i} }})))\n"
            ));
        } else {
            src.push_str(&format!("const Card{i} = lazy(() => import('./Card{i}'))\n"));
        }
    }
    src.push_str("const RAW_CARD_COMPONENTS = {\n");
    for i in 0..cards {
        src.push_str(&format!("  card_{i}: Card{i},\n"));
    }
    src.push_str("}\n");
    src
}

fn bench_registry_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_extraction");
    group.measurement_time(Duration::from_secs(5));

    for cards in [50usize, 500, 2000] {
        let source = registry_source(cards);
        group.bench_with_input(BenchmarkId::from_parameter(cards), &source, |b, source| {
            b.iter(|| black_box(CardRegistry::parse(source)));
        });
    }
    group.finish();
}

fn bench_static_gates(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("presets")).unwrap();
    let mut items = Vec::new();
    for i in 0..300 {
        fs::write(
            root.join(format!("presets/p{i}.json")),
            format!(r#"{{"format":"kc-card-preset-v1","card_type":"card_{i}","title":"P{i}"}}"#),
        )
        .unwrap();
        items.push(format!(r#"{{"id":"p{i}","type":"card-preset"}}"#));
    }
    fs::write(
        root.join("registry.json"),
        format!(r#"{{"updatedAt":"2026-01-01","items":[{}]}}"#, items.join(",")),
    )
    .unwrap();

    c.bench_function("static_gates_300_presets", |b| {
        b.iter(|| {
            let mut sink = DiagnosticSink::new();
            let index = ContentIndex::load(root, &mut sink).unwrap();
            run_static_gates(&index, &mut sink).unwrap();
            black_box(sink.len())
        });
    });
}

criterion_group!(benches, bench_registry_extraction, bench_static_gates);
criterion_main!(benches);
