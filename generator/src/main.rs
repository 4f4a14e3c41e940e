use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use uidgen::descriptor::ManifestError;
use uidgen::emit::EmitOptions;
use uidgen::pass::PassId;
use uidgen::pipeline::{run_pipeline, GenerationState};

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    Source,
    Sites,
    Records,
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "uidgen",
    version,
    about = "Unique-ID interceptor generator: emits call-site interceptors that inject deterministic identifiers"
)]
struct Cli {
    /// Invocation manifest (JSON) from the host's semantic analysis
    manifest: PathBuf,

    /// Output file or directory; stdout if omitted or `-`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Source)]
    emit: EmitStage,

    /// Namespace of the generated interceptor class
    #[arg(long, default_value = "UniqueId.Generated")]
    namespace: String,

    /// Name of the generated interceptor class
    #[arg(long = "class", default_value = "UniqueIdInterceptors")]
    class_name: String,

    /// File name of the generated unit (used when --output is a directory)
    #[arg(long, default_value = "UniqueIdInterceptors.g.cs")]
    hint_name: String,

    /// Do not declare InterceptsLocationAttribute in the generated unit
    #[arg(long)]
    no_polyfill: bool,

    /// Print pass timing and dropped call sites
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::debug!(
        manifest = %cli.manifest.display(),
        emit = ?cli.emit,
        "starting"
    );

    // ── Read and decode manifest ──
    let mut state = match GenerationState::load(&cli.manifest) {
        Ok(state) => state,
        Err(e @ ManifestError::Io { .. }) => {
            eprintln!("uidgen: error: {}", e);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("uidgen: error: {}: {}", cli.manifest.display(), e);
            std::process::exit(2);
        }
    };

    let options = EmitOptions {
        namespace: cli.namespace,
        class_name: cli.class_name,
        hint_name: cli.hint_name,
        attribute_polyfill: !cli.no_polyfill,
    };

    // ── Run passes ──
    let terminal = match cli.emit {
        EmitStage::BuildInfo => None,
        EmitStage::Records => Some(PassId::Collect),
        EmitStage::Source | EmitStage::Sites => Some(PassId::Emit),
    };
    if let Some(terminal) = terminal {
        run_pipeline(&mut state, terminal, &options, |_, diags| {
            for d in diags {
                eprintln!("uidgen: {}", d);
            }
        });
    }

    // ── Render requested artifact ──
    let rendered = match cli.emit {
        EmitStage::Source => Ok(state
            .generated
            .as_ref()
            .map(|g| g.text.clone())
            .unwrap_or_default()),
        EmitStage::Sites => {
            serde_json::to_string_pretty(state.sites.as_deref().unwrap_or_default())
                .map(|s| s + "\n")
        }
        EmitStage::Records => {
            serde_json::to_string_pretty(state.records.as_deref().unwrap_or_default())
                .map(|s| s + "\n")
        }
        EmitStage::BuildInfo => match &state.provenance {
            Some(p) => p.to_json(),
            None => Ok(String::new()),
        },
    };
    let rendered = match rendered {
        Ok(s) => s,
        Err(e) => {
            eprintln!("uidgen: error: cannot serialize output: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = write_output(cli.output.as_deref(), &options.hint_name, &rendered) {
        eprintln!("uidgen: error: {}", e);
        std::process::exit(2);
    }

    if state.has_error {
        std::process::exit(1);
    }
}

fn write_output(output: Option<&Path>, hint_name: &str, text: &str) -> std::io::Result<()> {
    match output {
        None => write_stdout(text),
        Some(path) if path == Path::new("-") => write_stdout(text),
        Some(path) => {
            let target = if path.is_dir() {
                path.join(hint_name)
            } else {
                path.to_path_buf()
            };
            tracing::debug!(path = %target.display(), bytes = text.len(), "writing output");
            std::fs::write(&target, text).map_err(|e| {
                std::io::Error::new(e.kind(), format!("{}: {}", target.display(), e))
            })
        }
    }
}

fn write_stdout(text: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}
