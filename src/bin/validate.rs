//! dots-validate binary
//!
//! Opens a recorded event file, validates every dot-stimulus announce event
//! against its declared circular field, and prints the matched count.
//! Any invariant violation exits non-zero without printing the count.
//!
//! ## Configuration (flags / env)
//!
//! | Key                   | Default             | Description                      |
//! |-----------------------|---------------------|----------------------------------|
//! | `<FILE>`              | (required)          | Event file to validate           |
//! | `DOTS_SCHEMA`         | `current`           | Recording format: current/legacy |
//! | `DOTS_CODE`           | `#announceStimulus` | Announce channel to scan         |
//! | `DOTS_NUM_DOTS`       | `1000`              | Legacy dot count                 |
//! | `DOTS_FIELD_RADIUS`   | `10.0`              | Legacy field radius              |

use anyhow::Result;
use clap::{Parser, ValueEnum};
use dots_validate::{types::codes, LegacyParams, Schema, Validator};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaArg {
    /// `moving_dots` with per-event field geometry
    Current,
    /// `dynamic_random_dots` with compiled-in geometry
    Legacy,
}

#[derive(Parser, Debug)]
#[command(name = "dots-validate", about = "Dots-stimulus data validator", version)]
struct Args {
    /// Event file to validate
    file: PathBuf,

    /// Recording format to validate against
    #[arg(long, env = "DOTS_SCHEMA", value_enum, default_value_t = SchemaArg::Current)]
    schema: SchemaArg,

    /// Announce channel to scan
    #[arg(long, env = "DOTS_CODE", default_value = codes::ANNOUNCE_STIMULUS)]
    code: String,

    /// Dot count per event (legacy schema only)
    #[arg(long, env = "DOTS_NUM_DOTS", default_value_t = LegacyParams::default().num_dots)]
    num_dots: usize,

    /// Field radius (legacy schema only)
    #[arg(long, env = "DOTS_FIELD_RADIUS", default_value_t = LegacyParams::default().field_radius)]
    field_radius: f64,

    /// Print the report as JSON instead of a human-readable line
    #[arg(long)]
    json: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dots_validate=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let schema = match args.schema {
        SchemaArg::Current => Schema::Current,
        SchemaArg::Legacy => Schema::Legacy(LegacyParams {
            num_dots: args.num_dots,
            field_radius: args.field_radius,
        }),
    };

    log::info!(
        "Validating {} (schema={:?}, code='{}')",
        args.file.display(),
        args.schema,
        args.code,
    );

    let report = Validator::new(schema).validate_file(&args.file, &args.code)?;

    if args.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("Processed {} events", report.matched);
    }
    Ok(())
}
