//! mathtree - evaluate and render serialized expression trees

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, error, info};
use mathtree_builtins::standard_namespace;
use mathtree_compile::Scope;
use mathtree_core::MathSession;
use mathtree_logging::{init_logging, LoggingOptions};
use mathtree_node::{Node, NodeKind};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

mod config;
mod tree_io;

use config::{ConfigLoader, LogLevel, MathTreeConfig, Notation, CONFIG_ENV};

#[derive(Parser)]
#[command(
    name = "mathtree",
    version,
    about = "Evaluate and render mathematical expression trees",
    after_help = r#"
Trees are read from JSON or YAML files, e.g.

  {"type": "OperatorNode", "op": "+", "fn": "add",
   "args": [{"type": "ConstantNode", "value": {"valueType": "number", "value": 2}},
            {"type": "SymbolNode", "name": "x"}]}

Environment Variables:
  MATHTREE_CONFIG=<path>       Path to configuration file
  MATHTREE_LOG_LEVEL=debug     Log level (error, warn, info, debug, trace)
  MATHTREE_LOG=<filter>        tracing filter directives (overridden by RUST_LOG)
  MATHTREE_MAX_DEPTH=256       Limit on nested function calls
  MATHTREE_MAX_ELEMENTS=<n>    Limit on range lengths and matrix growth
  MATHTREE_NOTATION=tex        Notation for echoed expressions
"#
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Set log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Limit on nested function calls
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Limit on range lengths and matrix growth
    #[arg(long, global = true)]
    max_elements: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and evaluate a tree
    Eval {
        /// JSON or YAML tree file
        file: PathBuf,

        /// Bind a variable before evaluating (value read as JSON)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        bindings: Vec<String>,

        /// Echo the expression in TeX before the result
        #[arg(long)]
        tex: bool,

        /// Print the variables assigned by the tree
        #[arg(long)]
        show_scope: bool,

        /// Start from an empty scope (no pi, e, i, ...)
        #[arg(long)]
        no_constants: bool,
    },

    /// Print a tree as text or TeX
    Render {
        file: PathBuf,

        #[arg(long)]
        tex: bool,
    },

    /// Summarize the nodes of a tree
    Inspect { file: PathBuf },

    /// Configuration management
    Config {
        #[command(subcommand)]
        config_command: ConfigCommand,
    },

    /// Show version and namespace information
    Info,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Write a default configuration file
    Generate {
        #[arg(short, long, default_value = ".mathtree.yaml")]
        output: PathBuf,
    },
    /// Show where configuration files are looked up
    Paths,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_configuration(&cli)?;
    apply_cli_overrides(&mut config, &cli);

    let level = if config.logging.debug {
        LogLevel::Debug
    } else {
        config.logging.level
    };
    let _logging = init_logging(LoggingOptions {
        filter: std::env::var("RUST_LOG")
            .is_err()
            .then(|| level.as_str().to_string()),
        stderr: true,
        enable_traces: false,
    });
    debug!("mathtree v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Eval {
            file,
            bindings,
            tex,
            show_scope,
            no_constants,
        } => {
            if no_constants {
                config.eval.constants = false;
            }
            if tex {
                config.output.notation = Notation::Tex;
                config.output.echo = true;
            }
            execute_eval(&file, &bindings, show_scope, &config)
        }
        Commands::Render { file, tex } => {
            let tree = tree_io::load_tree(&file)?;
            println!("{}", render(&tree, if tex { Notation::Tex } else { Notation::Text }));
            Ok(())
        }
        Commands::Inspect { file } => {
            let tree = tree_io::load_tree(&file)?;
            print!("{}", inspect(&tree));
            Ok(())
        }
        Commands::Config { config_command } => execute_config_command(config_command, &config),
        Commands::Info => {
            show_info(&config);
            Ok(())
        }
    }
}

fn load_configuration(cli: &Cli) -> Result<MathTreeConfig> {
    match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            let mut config = ConfigLoader::load_from_file(path)?;
            ConfigLoader::apply_environment(&mut config, |key| std::env::var(key).ok());
            Ok(config)
        }
        None => ConfigLoader::load(),
    }
}

fn apply_cli_overrides(config: &mut MathTreeConfig, cli: &Cli) {
    if cli.debug {
        config.logging.debug = true;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(depth) = cli.max_depth {
        config.eval.max_depth = depth;
    }
    if let Some(limit) = cli.max_elements {
        config.eval.max_elements = limit;
    }
}

fn render(tree: &Node, notation: Notation) -> String {
    match notation {
        Notation::Text => tree.to_string(),
        Notation::Tex => tree.to_tex(),
    }
}

fn execute_eval(
    file: &Path,
    bindings: &[String],
    show_scope: bool,
    config: &MathTreeConfig,
) -> Result<()> {
    let tree = tree_io::load_tree(file)?;
    let mut session = if config.eval.constants {
        MathSession::new()
    } else {
        MathSession::with_namespace(standard_namespace(), Scope::new())
    };
    session.set_max_depth(config.eval.max_depth);
    session.set_max_elements(config.eval.max_elements);
    session.set_verbose(config.eval.verbose);
    for binding in bindings {
        let (name, value) = tree_io::parse_binding(binding)?;
        debug!("binding {name} = {value}");
        session.set_variable(name, value);
    }

    if config.output.echo {
        println!("{}", render(&tree, config.output.notation));
    }
    let result = session
        .evaluate(&tree)
        .map_err(|e| anyhow::anyhow!("{}: {e}", e.identifier()))
        .with_context(|| format!("Evaluation of {} failed", file.display()))?;
    println!("{}", result.value);
    if show_scope {
        for name in &result.assigned {
            if let Some(value) = session.get_variable(name) {
                println!("{name} = {value}");
            }
        }
    }
    if config.output.timing {
        println!("({} us)", result.execution_time_us);
    }
    Ok(())
}

fn inspect(tree: &Node) -> String {
    let mut out = String::new();
    let total = tree.filter(|_, _, _| true).len();
    out.push_str(&format!("nodes: {total}\n"));
    for kind in NodeKind::ALL {
        let count = tree.filter(|node, _, _| node.kind() == kind).len();
        if count > 0 {
            out.push_str(&format!("  {}: {count}\n", kind.type_name()));
        }
    }
    let mut symbols = BTreeSet::new();
    let mut functions = BTreeSet::new();
    tree.traverse(|node, _, _| match node {
        Node::Symbol(s) => {
            symbols.insert(s.name.clone());
        }
        Node::Function(f) => {
            functions.insert(f.name().to_string());
        }
        Node::Operator(op) => {
            functions.insert(op.fn_name.clone());
        }
        _ => {}
    });
    if !symbols.is_empty() {
        out.push_str(&format!("symbols: {}\n", join(&symbols)));
    }
    if !functions.is_empty() {
        out.push_str(&format!("functions: {}\n", join(&functions)));
    }
    out
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn execute_config_command(config_command: ConfigCommand, config: &MathTreeConfig) -> Result<()> {
    match config_command {
        ConfigCommand::Show => {
            let yaml =
                serde_yaml::to_string(config).context("Failed to serialize configuration")?;
            println!("{yaml}");
        }
        ConfigCommand::Generate { output } => {
            ConfigLoader::save_to_file(&MathTreeConfig::default(), &output)
                .with_context(|| format!("Failed to write config to {}", output.display()))?;
            println!("Sample configuration generated: {}", output.display());
        }
        ConfigCommand::Paths => {
            if let Ok(path) = std::env::var(CONFIG_ENV) {
                println!("Environment override: {path}");
            }
            for path in ConfigLoader::candidate_paths() {
                let exists = if path.is_file() { " (exists)" } else { "" };
                println!("  {}{exists}", path.display());
            }
        }
    }
    Ok(())
}

fn show_info(config: &MathTreeConfig) {
    let namespace = standard_namespace();
    println!("mathtree {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Evaluation:");
    println!("  Max call depth: {}", config.eval.max_depth);
    println!("  Max elements: {}", config.eval.max_elements);
    println!("  Constants: {}", config.eval.constants);
    println!();
    println!("Namespace ({} functions):", namespace.len());
    for chunk in namespace.names().chunks(8) {
        println!("  {}", chunk.join(", "));
    }
}
