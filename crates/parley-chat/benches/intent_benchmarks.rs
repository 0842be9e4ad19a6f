//! Benchmarks for intent detection and prompt assembly.
//!
//! Both run on every chat turn before the model is called, so they should
//! stay far below network latency. The latency check asserts a p95 under
//! 100us per message for detection across all intent kinds.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use parley_chat::{ContextAssembler, IntentDetector};
use parley_core::{ToolDescriptor, Turn};

const MESSAGES: &[&str] = &[
    "计算 12 * (3+4)",
    "北京今天天气怎么样",
    "现在几点了",
    "翻译 \"good morning\" 成中文",
    "搜索Rust异步编程",
    "what's the weather in Shanghai and what time is it?",
    "hello there, how are you doing today",
    "Search for the borrow checker rules",
];

fn bench_intent_detection(c: &mut Criterion) {
    let detector = IntentDetector::new();

    let mut group = c.benchmark_group("intent_detection");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("single_message", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let requests = detector.detect(MESSAGES[idx % MESSAGES.len()]);
            idx += 1;
            requests
        });
    });

    group.bench_function("all_messages", |b| {
        b.iter(|| {
            MESSAGES
                .iter()
                .map(|m| detector.detect(m).len())
                .sum::<usize>()
        });
    });

    group.finish();
}

fn bench_context_assembly(c: &mut Criterion) {
    let assembler = ContextAssembler::new();
    let history: Vec<Turn> = (0..50)
        .flat_map(|i| {
            [
                Turn::user(format!("question number {}", i)),
                Turn::assistant(format!("answer number {} with some more text", i)),
            ]
        })
        .collect();
    let catalog = vec![
        ToolDescriptor::new("calculator", "Evaluates arithmetic expressions"),
        ToolDescriptor::new("weather", "Current weather for a city"),
        ToolDescriptor::new("time", "Current date and time"),
        ToolDescriptor::new("translate", "Translates text"),
        ToolDescriptor::new("web_search", "Searches the web"),
    ];

    c.bench_function("assemble_100_turns", |b| {
        b.iter(|| assembler.assemble(&history, Some(&catalog), &[], "next question"));
    });
}

fn bench_detection_latency_assertion(_c: &mut Criterion) {
    let detector = IntentDetector::new();
    let target = Duration::from_micros(100);

    // Warm the lazily compiled patterns.
    detector.detect(MESSAGES[0]);

    let mut times = Vec::with_capacity(1000);
    for i in 0..1000 {
        let start = std::time::Instant::now();
        let _requests = detector.detect(MESSAGES[i % MESSAGES.len()]);
        times.push(start.elapsed());
    }

    times.sort();
    let p95 = times[949];
    let median = times[499];

    eprintln!("\n=== Intent Detection Latency (1000 messages) ===");
    eprintln!("Median:  {:?}", median);
    eprintln!("p95:     {:?} (target: {:?})", p95, target);

    assert!(
        p95 < target,
        "Intent detection p95 {:?} exceeds target {:?}",
        p95,
        target
    );
}

criterion_group!(
    benches,
    bench_intent_detection,
    bench_context_assembly,
    bench_detection_latency_assertion
);
criterion_main!(benches);
