//! Command line argument parsing.
//!
//! Command-line values take precedence over in-source pragmas with the same
//! key.

use clap::Parser;

use stoat_dl::config::Config;

#[derive(Parser)]
#[command(
    name = "stoat_cli",
    about = "Compile a Datalog translation unit to a relational algebra machine program.",
    version
)]
struct Cli {
    /// A serialized translation unit, as produced by a frontend.
    #[arg(long)]
    ast: Option<String>,

    /// Write the RAM program (with the symbol table) as JSON.
    #[arg(long)]
    ram: Option<String>,

    /// Print the RAM program as text.
    #[arg(long)]
    pretty: bool,

    /// Restrict computation to demanded tuples via the magic-set transform.
    #[arg(long)]
    magic_transform: bool,

    /// Emit a subproof subroutine per clause.
    #[arg(long)]
    provenance: bool,

    /// Instrument the RAM program with timers and size counters.
    #[arg(long)]
    profile: bool,

    /// The directory fact files are read from.
    #[arg(long)]
    fact_dir: Option<String>,

    /// The directory output files are written to; `-` for stdout.
    #[arg(long)]
    output_dir: Option<String>,

    /// Workers for parallel blocks, forwarded to the backend.
    #[arg(long)]
    jobs: Option<usize>,

    /// Print help as markdown.
    #[arg(long, hide = true)]
    markdown_help: bool,
}

pub struct Args {
    pub ast: Option<String>,
    pub ram: Option<String>,
    pub pretty: bool,
    pub config: Config,
}

pub fn parse() -> Args {
    let cli = Cli::parse();

    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        std::process::exit(0);
    }

    let mut config = Config::default();
    if cli.magic_transform {
        config.magic_transform.set_from_cli(true);
    }
    if cli.provenance {
        config.provenance.set_from_cli(true);
    }
    if cli.profile {
        config.profile.set_from_cli(true);
    }
    if let Some(fact_dir) = cli.fact_dir {
        config.fact_dir.set_from_cli(fact_dir);
    }
    if let Some(output_dir) = cli.output_dir {
        config.output_dir.set_from_cli(output_dir);
    }
    if let Some(jobs) = cli.jobs {
        config.jobs.set_from_cli(jobs.max(1));
    }

    Args {
        ast: cli.ast,
        ram: cli.ram,
        pretty: cli.pretty,
        config,
    }
}
