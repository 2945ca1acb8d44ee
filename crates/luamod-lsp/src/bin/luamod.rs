//! luamod: batch front-end to the module indexer and converter.
//!
//! - `luamod convert BagM.lua` prints the table-based rewrite of one file
//! - `luamod index . -d src/game` lists every indexed module
//! - `luamod doc BagM.count .` prints one function's documentation

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use luamod_lsp::config::Config;
use luamod_lsp::logging;
use luamod_lsp::query;
use luamod_lsp::registry::Registry;
use luamod_syntax::RewriteOutcome;

#[derive(Parser)]
#[command(
    name = "luamod",
    version,
    about = "Index and convert Lua files written with module(...)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite a module(...) file into a table-based module
    Convert {
        /// Lua file to convert
        file: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short = 'o', long, conflicts_with = "in_place")]
        output: Option<PathBuf>,

        /// Overwrite the input file
        #[arg(long)]
        in_place: bool,
    },
    /// Index module files and list them
    Index {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        /// Print the full index as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the documentation of MODULE.FUNCTION
    Doc {
        /// Function reference, e.g. BagM.count
        target: String,

        #[command(flatten)]
        workspace: WorkspaceArgs,
    },
}

#[derive(Args)]
struct WorkspaceArgs {
    /// Workspace root
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Module directory relative to the root (repeatable, default: src)
    #[arg(short = 'd', long = "module-dir")]
    module_dirs: Vec<String>,
}

impl WorkspaceArgs {
    fn load(self) -> Registry {
        let config = Config::with_module_dirs(self.module_dirs);
        let registry = Registry::new();
        registry.load_all(&config.module_roots(&self.root), |progress| {
            tracing::trace!("[cli] indexed {progress}");
        });
        registry
    }
}

fn main() -> Result<()> {
    logging::init("warn");
    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            file,
            output,
            in_place,
        } => convert(&file, output.as_deref(), in_place),
        Command::Index { workspace, json } => index(workspace, json),
        Command::Doc { target, workspace } => doc(&target, workspace),
    }
}

fn convert(file: &Path, output: Option<&Path>, in_place: bool) -> Result<()> {
    let source =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let outcome = luamod_syntax::rewrite(&source)
        .with_context(|| format!("failed to convert {}", file.display()))?;

    let rewrite = match outcome {
        RewriteOutcome::NoChanges => {
            let name = file.file_name().unwrap_or(file.as_os_str());
            eprintln!("[{}] requires no changes", name.to_string_lossy());
            return Ok(());
        }
        RewriteOutcome::Rewritten(rewrite) => rewrite,
    };
    let converted = rewrite.apply(&source)?;
    tracing::info!(
        "[cli] {}: module {} with {} functions",
        file.display(),
        rewrite.module_name,
        rewrite.functions.len()
    );

    let target = match (output, in_place) {
        (Some(path), _) => path,
        (None, true) => file,
        (None, false) => {
            print!("{converted}");
            return Ok(());
        }
    };
    fs::write(target, converted).with_context(|| format!("failed to write {}", target.display()))
}

fn index(workspace: WorkspaceArgs, json: bool) -> Result<()> {
    let registry = workspace.load();
    let modules = registry.modules();

    if json {
        let modules: Vec<_> = modules.iter().map(|m| m.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&modules)?);
        return Ok(());
    }
    for module in &modules {
        println!(
            "{}\t{}\t{}",
            module.name,
            module.functions.len(),
            module.file_path.display()
        );
    }
    Ok(())
}

fn doc(target: &str, workspace: WorkspaceArgs) -> Result<()> {
    let Some((module_name, function_name)) = target.split_once('.') else {
        bail!("expected MODULE.FUNCTION, got {target}");
    };
    let registry = workspace.load();
    let module = registry
        .lookup(module_name)
        .with_context(|| format!("unknown module: {module_name}"))?;
    let function = module
        .function(function_name)
        .with_context(|| format!("unknown function: {}.{function_name}", module.name))?;
    print!("{}", query::format_doc(function, true));
    Ok(())
}
