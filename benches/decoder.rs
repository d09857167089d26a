use criterion::{criterion_group, criterion_main, Criterion};
use wspace::{encode, Instruction, ParseError, Parser};

fn source() -> String {
    let mut instructions = vec![];
    for n in 0..2048 {
        instructions.push(Instruction::Label(n));
        instructions.push(Instruction::Push(n * 7919 - 65536));
        instructions.push(Instruction::Copy);
        instructions.push(Instruction::Mult);
        instructions.push(Instruction::OutN);
        instructions.push(Instruction::Jz(n));
    }
    instructions.push(Instruction::End);
    encode(&instructions)
}

pub fn decode_benchmark(c: &mut Criterion) {
    let source = source();
    c.bench_function("decode", |b| {
        b.iter(|| -> Result<(), ParseError> {
            let parser = Parser::new(source.as_bytes());
            parser.into_iter().try_for_each(|instr| instr.map(|_| ()))?;

            Ok(())
        })
    });
}

criterion_group!(decoder, decode_benchmark);
criterion_main!(decoder);
