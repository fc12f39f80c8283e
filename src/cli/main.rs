/*!
The stoat_dl command line interface.

Reads a serialized translation unit produced by an external frontend, runs
the middle end, and writes the resulting RAM program as JSON or pretty text.
Diagnostics are rendered to stderr, styled when the terminal allows.
*/

#[cfg(not(target_env = "msvc"))]
#[cfg(feature = "jemalloc")]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod parse_args;

use std::io::Write;

use crossterm::style::Stylize;

use stoat_dl::context::{Compiler, TranslationUnit};
use stoat_dl::reports::{ErrorReport, Severity};

fn main() {
    let args = parse_args::parse();

    #[cfg(feature = "log")]
    init_logging();

    let Some(ast_path) = &args.ast else {
        eprintln!("{}", "No AST supplied; see --help.".stylize().red());
        std::process::exit(2);
    };

    let source = match std::fs::read_to_string(ast_path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{} {e}", format!("Failed to read {ast_path}:").stylize().red());
            std::process::exit(2);
        }
    };

    let mut tu: TranslationUnit = match serde_json::from_str(&source) {
        Ok(tu) => tu,
        Err(e) => {
            eprintln!("{} {e}", format!("Failed to parse {ast_path}:").stylize().red());
            std::process::exit(2);
        }
    };

    let mut compiler = Compiler::new(args.config);
    let result = compiler.run(&mut tu);
    render_report(&tu.report);

    let ram = match result {
        Ok(Some(ram)) => ram,
        Ok(None) => {
            eprintln!("Nothing to compute.");
            return;
        }
        Err(e) => {
            eprintln!("{}", format!("{e}").stylize().red().bold());
            std::process::exit(1);
        }
    };

    if args.pretty {
        println!("{ram}");
    }

    if let Some(ram_path) = &args.ram {
        let serialized = serde_json::to_string_pretty(&serde_json::json!({
            "ram": ram,
            "symbols": tu.symbols,
        }))
        .expect("the RAM program serializes");
        match std::fs::File::create(ram_path).and_then(|mut f| f.write_all(serialized.as_bytes()))
        {
            Ok(()) => {}
            Err(e) => {
                eprintln!("{} {e}", format!("Failed to write {ram_path}:").stylize().red());
                std::process::exit(2);
            }
        }
    }
}

fn render_report(report: &ErrorReport) {
    for diagnostic in report.diagnostics() {
        let line = format!("{diagnostic}");
        match diagnostic.severity {
            Severity::Error => eprintln!("{}", line.stylize().red()),
            Severity::Warning => eprintln!("{}", line.stylize().yellow()),
            Severity::Info => {}
        }
    }
    if report.error_count() > 0 {
        eprintln!(
            "{}",
            format!(
                "{} error(s), {} warning(s)",
                report.error_count(),
                report.warning_count()
            )
            .stylize()
            .bold()
        );
    }
}

#[cfg(feature = "log")]
fn init_logging() {
    use log4rs::append::console::ConsoleAppender;
    use log4rs::config::{Appender, Config, Root};

    let stderr = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(log::LevelFilter::Debug))
        .expect("the logging config is static");
    let _ = log4rs::init_config(config);
}
