use clap::{App, AppSettings, Arg, ArgMatches};
use std::error::Error;
use std::fs;
use std::process;
use std::time::Instant;
use tracing::error;
use tracing_subscriber::EnvFilter;
use wspace::{encode, write_listing, Parser, Program, Vm, VmConfig};

fn file_arg(help: &'static str) -> Arg<'static> {
    Arg::new("file")
        .short('f')
        .long("file")
        .takes_value(true)
        .required(true)
        .help(help)
}

fn output_arg(help: &'static str) -> Arg<'static> {
    Arg::new("output")
        .short('o')
        .long("output")
        .takes_value(true)
        .required(false)
        .help(help)
}

fn flag(name: &'static str, short: char, help: &'static str) -> Arg<'static> {
    Arg::new(name)
        .short(short)
        .long(name)
        .takes_value(false)
        .required(false)
        .global(true)
        .help(help)
}

fn args() -> ArgMatches {
    App::new("wspace")
        .about("decodes, encodes and runs whitespace programs")
        .version("0.1.0")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(flag(
            "debug",
            'd',
            "logs the vm state before each executed instruction",
        ))
        .arg(flag(
            "debug-heap",
            'm',
            "logs a heap dump before each executed instruction",
        ))
        .arg(flag(
            "raw-input",
            'r',
            "reads characters per key press instead of per line",
        ))
        .arg(flag(
            "quiet",
            'q',
            "suppresses all output other than what the whitespace program is producing",
        ))
        .arg(flag(
            "timing",
            't',
            "prints how long decoding, loading and execution took",
        ))
        .subcommand(
            App::new("decode")
                .about("decodes whitespace source into an instruction listing")
                .arg(file_arg("whitespace source file to decode"))
                .arg(output_arg("file to write the listing to, stdout if omitted")),
        )
        .subcommand(
            App::new("run")
                .about("loads and executes an instruction listing")
                .arg(file_arg("instruction listing to execute")),
        )
        .subcommand(
            App::new("exec")
                .about("decodes and executes whitespace source")
                .arg(file_arg("whitespace source file to execute")),
        )
        .subcommand(
            App::new("encode")
                .about("renders an instruction listing as whitespace source")
                .arg(file_arg("instruction listing to encode"))
                .arg(output_arg("file to write the source to, stdout if omitted")),
        )
        .get_matches()
}

fn init_logging(args: &ArgMatches) {
    let level = if args.is_present("debug-heap") {
        "trace"
    } else if args.is_present("debug") {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reports durations the way `--timing` asks for, unless `--quiet` silences them
struct Timer {
    enabled: bool,
}

impl Timer {
    fn new(args: &ArgMatches) -> Timer {
        Timer {
            enabled: args.is_present("timing") && !args.is_present("quiet"),
        }
    }

    fn measure<T>(&self, what: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        let end = Instant::now();
        if self.enabled {
            eprintln!(
                "{} in {} ms ({} ns)",
                what,
                end.duration_since(start).as_millis(),
                end.duration_since(start).as_nanos()
            );
        }
        result
    }
}

fn emit(args: &ArgMatches, text: &str) -> Result<(), Box<dyn Error>> {
    match args.value_of("output") {
        Some(path) => fs::write(path, text)?,
        None => print!("{}", text),
    }
    Ok(())
}

fn execute(args: &ArgMatches, program: Program, timer: &Timer) -> Result<(), Box<dyn Error>> {
    let config = VmConfig::new(
        false,
        args.is_present("debug"),
        args.is_present("debug-heap"),
        args.is_present("raw-input"),
    );
    let mut vm = Vm::new(program, config);
    timer.measure("executed", || vm.run())?;

    Ok(())
}

fn dispatch(args: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let (name, sub) = match args.subcommand() {
        Some(subcommand) => subcommand,
        None => return Err("no subcommand given".into()),
    };
    let timer = Timer::new(sub);
    let file_name = sub.value_of("file").ok_or("no input file given")?;
    match name {
        "decode" => {
            let instructions = timer.measure("decoded", || {
                Parser::from_file(file_name).and_then(Parser::parse)
            })?;
            let mut listing = String::new();
            write_listing(&mut listing, &instructions)?;
            emit(sub, &listing)
        }
        "encode" => {
            let listing = fs::read_to_string(file_name)?;
            let instructions = timer.measure("parsed listing", || Program::parse_listing(&listing))?;
            emit(sub, &encode(&instructions))
        }
        "run" => {
            let listing = fs::read_to_string(file_name)?;
            let program = timer.measure("loaded", || Program::from_listing(&listing))?;
            execute(sub, program, &timer)
        }
        "exec" => {
            let program = timer.measure("decoded and loaded", || {
                Parser::from_file(file_name)
                    .and_then(Parser::parse)
                    .map(Program::load)
            })?;
            execute(sub, program, &timer)
        }
        other => Err(format!("unknown subcommand `{}`", other).into()),
    }
}

fn main() {
    let args = args();
    let sub = args.subcommand().map(|(_, sub)| sub).unwrap_or(&args);
    init_logging(sub);

    if let Err(err) = dispatch(&args) {
        error!("{}", err);
        process::exit(1);
    }
}
