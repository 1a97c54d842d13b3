//! Avatar CLI - JSON bridge over the avatar engine
//!
//! Commands: catalog, default, normalize, check, random, render, fingerprint
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 when a config breaks a rule or fails to render

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use avatar_core::{
    fingerprint, AvatarConfig, AvatarEngine, Compositor, EngineSettings, GenderHint, UriEncoding,
};

#[derive(Parser)]
#[command(name = "avatar-cli", version)]
#[command(about = "Avatar CLI - normalize, generate and render avatars")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog file (overrides AVATAR_CATALOG; builtin catalog when unset)
    #[arg(short, long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List categories and their legal values
    Catalog,

    /// Print the default configuration
    Default,

    /// Normalize a configuration
    Normalize {
        /// JSON payload (AvatarConfig)
        #[arg(short, long)]
        payload: String,
    },

    /// Report compatibility rules a configuration breaks
    Check {
        #[arg(short, long)]
        payload: String,
    },

    /// Generate random configurations
    Random {
        /// male | female
        #[arg(short, long)]
        gender: Option<GenderHint>,

        /// Seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,

        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Render a configuration to a data URI
    Render {
        #[arg(short, long, default_value = "{}")]
        payload: String,

        #[arg(long)]
        size: Option<u32>,

        /// utf8 | base64
        #[arg(long)]
        encoding: Option<UriEncoding>,

        /// Print raw SVG markup instead of a data URI
        #[arg(long)]
        svg: bool,
    },

    /// Fingerprint a normalized configuration
    Fingerprint {
        #[arg(short, long)]
        payload: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = match EngineSettings::from_env() {
        Ok(s) => s,
        Err(e) => return fail(&e.to_string()),
    };
    if let Some(path) = cli.catalog {
        settings.catalog_path = Some(path);
    }

    let engine = match AvatarEngine::from_settings(&settings) {
        Ok(engine) => engine,
        Err(e) => return fail(&format!("Failed to start engine: {}", e)),
    };

    match cli.command {
        Commands::Catalog => emit(&serde_json::json!({
            "version": engine.catalog().version().to_string(),
            "categories": engine.catalog().entries(),
        })),

        Commands::Default => emit(&engine.default_config()),

        Commands::Normalize { payload } => match parse(&payload) {
            Ok(config) => emit(&engine.normalize(&config)),
            Err(code) => code,
        },

        Commands::Check { payload } => {
            let config = match parse(&payload) {
                Ok(c) => c,
                Err(code) => return code,
            };
            let violations = engine.violations(&config);
            let valid = violations.is_empty();
            let code = emit(&serde_json::json!({
                "valid": valid,
                "violations": violations,
            }));
            if valid {
                code
            } else {
                ExitCode::from(2)
            }
        }

        Commands::Random { gender, seed, count } => {
            let configs: Vec<AvatarConfig> = match seed {
                Some(seed) => {
                    let mut rng = StdRng::seed_from_u64(seed);
                    (0..count)
                        .map(|_| engine.generate_random_with(gender, &mut rng))
                        .collect()
                }
                None => (0..count).map(|_| engine.generate_random(gender)).collect(),
            };
            emit(&configs)
        }

        Commands::Render { payload, size, encoding, svg } => {
            let config = match parse(&payload) {
                Ok(c) => c,
                Err(code) => return code,
            };
            let current = engine.compositor();
            let compositor = match Compositor::new(
                size.unwrap_or(current.size()),
                encoding.unwrap_or(current.encoding()),
            ) {
                Ok(c) => c,
                Err(e) => return fail(&e.to_string()),
            };
            let engine = engine.with_compositor(compositor);
            let rendered = if svg {
                engine.render_svg(&config)
            } else {
                engine.render(&config)
            };
            match rendered {
                Ok(output) => {
                    println!("{}", output);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!("{}", serde_json::json!({ "success": false, "error": e.to_string() }));
                    ExitCode::from(2)
                }
            }
        }

        Commands::Fingerprint { payload } => {
            let config = match parse(&payload) {
                Ok(c) => engine.normalize(&c),
                Err(code) => return code,
            };
            match fingerprint(&config) {
                Ok(hash) => emit(&serde_json::json!({ "fingerprint": hash, "config": config })),
                Err(e) => fail(&e.to_string()),
            }
        }
    }
}

fn parse(payload: &str) -> Result<AvatarConfig, ExitCode> {
    AvatarConfig::from_json(payload).map_err(|e| fail(&format!("Invalid payload: {}", e)))
}

fn emit(value: &impl Serialize) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e.to_string()),
    }
}

fn fail(message: &str) -> ExitCode {
    println!("{}", serde_json::json!({ "success": false, "error": message }));
    ExitCode::FAILURE
}
