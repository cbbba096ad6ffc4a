use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ssa_cmp::Error;
use ssa_cmp::analysis::cfg::Cfg;
use ssa_cmp::analysis::dom::DominatorTree;
use ssa_cmp::config::{OptConfig, OptLevel};
use ssa_cmp::ir::{format_module, parse_module};

#[derive(ClapParser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IR file to optimize; reads stdin when omitted
    input: Option<PathBuf>,

    /// Write the optimized IR here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optimization level
    #[arg(short = 'O', value_enum, default_value = "2")]
    opt_level: OptLevel,

    /// Signed overflow wraps instead of being undefined
    #[arg(long)]
    wrapv: bool,

    /// Force the comparison canonicalization pass on
    #[arg(long, conflicts_with = "no_tree_cmp")]
    tree_cmp: bool,

    /// Force the comparison canonicalization pass off
    #[arg(long)]
    no_tree_cmp: bool,

    /// Skip re-verification after each pass
    #[arg(long)]
    no_verify: bool,

    /// Comma-separated list of things to dump to stderr: before,after,domtree,stats
    #[arg(long)]
    dump: Option<String>,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Default)]
struct DumpFlags {
    before: bool,
    after: bool,
    domtree: bool,
    stats: bool,
}

impl DumpFlags {
    fn parse(list: Option<&str>) -> Self {
        let mut flags = DumpFlags::default();
        let Some(list) = list else {
            return flags;
        };
        for item in list.split(',').map(|s| s.trim().to_lowercase()) {
            match item.as_str() {
                "before" => flags.before = true,
                "after" => flags.after = true,
                "domtree" => flags.domtree = true,
                "stats" => flags.stats = true,
                "" => {}
                _ => eprintln!("[WARN] unknown dump flag: {item}"),
            }
        }
        flags
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "ssa_cmp=warn",
        1 => "ssa_cmp=info",
        2 => "ssa_cmp=debug",
        _ => "ssa_cmp=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[ERROR] {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let dump = DumpFlags::parse(args.dump.as_deref());

    let source = match &args.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let mut config = OptConfig::from_level(args.opt_level)
        .with_wrapv(args.wrapv)
        .with_verify(!args.no_verify);
    if args.tree_cmp {
        config = config.with_tree_cmp(true);
    } else if args.no_tree_cmp {
        config = config.with_tree_cmp(false);
    }

    let mut module = parse_module(&source)?;

    if dump.before {
        print_section("IR (before)", &format_module(&module));
    }
    if dump.domtree {
        for func in &module.funcs {
            let dom = DominatorTree::compute(&Cfg::new(func));
            print_section(&format!("Dominator Tree ({})", func.name), &dom.to_string());
        }
    }

    let report = ssa_cmp::optimize(&mut module, config)?;
    let text = format_module(&module);

    if dump.after {
        print_section("IR (after)", &text);
    }
    if dump.stats {
        print_section("Pass Stats", &report.to_string());
    }

    match &args.output {
        Some(path) => std::fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}

fn print_section(title: &str, body: &str) {
    eprintln!("{title}:");
    eprintln!("--------------------------------");
    eprintln!("{}", body.trim_end());
    eprintln!("--------------------------------");
}
