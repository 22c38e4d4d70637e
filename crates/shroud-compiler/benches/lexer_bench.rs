use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shroud_compiler::lexer::{in_comment, normalize};
use shroud_compiler::{strip_decorators, FunctionContext, JavaScriptTemplates, StateVariableDescriptor, Synthesizer};
use shroud_runtime::Operand;

fn decorated_contract(functions: usize) -> String {
    let mut source = String::from("contract Bench {\n    secret uint256 private total;\n");
    for index in 0..functions {
        source.push_str(&format!(
            "    // known decorators in comments are skipped\n    function f{i}(secret uint256 a{i}) public {{\n        known uint256 b{i} = a{i};\n    }}\n",
            i = index
        ));
    }
    source.push('}');
    source
}

fn benchmark_strip(c: &mut Criterion) {
    let mut group = c.benchmark_group("strip_decorators");

    for functions in [1, 10, 50] {
        let source = decorated_contract(functions);
        group.bench_function(format!("functions_{}", functions), |b| {
            b.iter(|| black_box(strip_decorators(black_box(&source)).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_comment_scan(c: &mut Criterion) {
    let buffer = normalize(&decorated_contract(50));
    let end = buffer.len() - 1;

    c.bench_function("in_comment_end_of_buffer", |b| {
        b.iter(|| black_box(in_comment(black_box(&buffer), black_box(end))));
    });
}

fn benchmark_render(c: &mut Criterion) {
    let mut context = FunctionContext::new("transfer", "Token").with_parameter("amount");
    for index in 0..8 {
        context = context.with_state(
            StateVariableDescriptor::partitioned(format!("balance_{}", index), index)
                .with_operand(Operand::Identifier("amount".to_string()))
                .decrement(),
        );
    }
    let templates = JavaScriptTemplates::default();

    c.bench_function("render_routine_8_states", |b| {
        b.iter(|| {
            let synthesizer = Synthesizer::new(black_box(&context)).unwrap();
            black_box(synthesizer.render(&templates))
        });
    });
}

criterion_group!(benches, benchmark_strip, benchmark_comment_scan, benchmark_render);
criterion_main!(benches);
