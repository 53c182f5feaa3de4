//! End-to-end latency benchmark for the CoinScript pipeline.
//!
//! Measures each stage separately:
//! 1. Lexing + parsing
//! 2. Code generation (routed and stateful coins)
//! 3. Structural hashing of the emitted program
//! 4. Rendering (flat and pretty)

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use coinscript::codegen::generate;
use coinscript::tree::tree_hash;
use coinscript::{parse_coin, CompileOptions};

/// A routed coin with `n` actions, each with a guard and a send.
fn synthetic_coin(n: usize) -> String {
    let mut src = String::from("coin Bench {\n    storage uint64 limit = 1000;\n");
    src.push_str("    event Paid(address to, uint64 amount);\n");
    for i in 0..n {
        src.push_str(&format!(
            "    action a{i}(address to, uint64 amount) {{\n\
             \x20       require(amount < limit, \"over\");\n\
             \x20       if (amount > {i}) {{ send(to, amount - {i}); }} else {{ send(to, amount); }}\n\
             \x20       emit Paid(to, amount);\n\
             \x20   }}\n"
        ));
    }
    src.push_str("}\n");
    src
}

const COUNTER: &str = "coin Counter {
    state { uint64 count; uint64 total; address owner; }
    @stateful action add(uint64 n) {
        require(msg.sender == state.owner, \"owner only\");
        state.count += 1;
        state.total = state.total + n;
    }
    @stateful action reset() { state.count = 0; state.total = 0; }
    action peek() { reserveFee(0); }
}";

fn bench_parse(c: &mut Criterion) {
    let small = synthetic_coin(4);
    let large = synthetic_coin(64);
    let options = CompileOptions::default();

    let mut group = c.benchmark_group("parse");
    group.bench_function("4_actions", |b| {
        b.iter(|| parse_coin(black_box(&small), &options))
    });
    group.bench_function("64_actions", |b| {
        b.iter(|| parse_coin(black_box(&large), &options))
    });
    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let options = CompileOptions::default();
    let Ok(routed) = parse_coin(&synthetic_coin(64), &options) else {
        return;
    };
    let Ok(stateful) = parse_coin(COUNTER, &options) else {
        return;
    };

    let mut group = c.benchmark_group("generate");
    group.bench_function("routed_64", |b| {
        b.iter(|| generate(black_box(&routed), &options))
    });
    group.bench_function("stateful", |b| {
        b.iter(|| generate(black_box(&stateful), &options))
    });
    group.finish();
}

fn bench_hash_and_render(c: &mut Criterion) {
    let options = CompileOptions::default();
    let pretty = CompileOptions {
        pretty: true,
        ..CompileOptions::default()
    };
    let Ok(coin) = coinscript::compile_coin(&synthetic_coin(64), &options) else {
        return;
    };
    let node = coin.main.program.node().clone();

    c.bench_function("tree_hash_64", |b| b.iter(|| tree_hash(black_box(&node))));
    c.bench_function("render_flat_64", |b| {
        b.iter(|| coin.main.render(black_box(&options)))
    });
    c.bench_function("render_pretty_64", |b| {
        b.iter(|| coin.main.render(black_box(&pretty)))
    });
}

/// Full pipeline: source text to rendered program.
fn bench_end_to_end(c: &mut Criterion) {
    let src = synthetic_coin(16);
    c.bench_function("compile_16", |b| {
        b.iter(|| coinscript::compile(black_box(&src), "bench.coin"))
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_generate,
    bench_hash_and_render,
    bench_end_to_end
);
criterion_main!(benches);
