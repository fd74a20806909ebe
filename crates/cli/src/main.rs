use anyhow::Result;
use clap::{Parser, Subcommand};
use symbind::commands::{
    catalog_command, fetch_command, info_command, init_command, resolve_command, slots_command,
    validate_command, ResolveRequest,
};
use symbind::logging::{format_from_env, init_logging};
use symbind::parse_address;

/// Symbol rebasing toolkit.
///
/// This CLI is a thin wrapper around `symbind-core`. All substantive logic
/// lives in the library so it can be tested thoroughly and reused from other
/// frontends (for example an in-process loader).
#[derive(Parser, Debug)]
#[command(
    name = "symbind",
    version,
    about = "Rebase recorded symbol addresses onto a live process image",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a `.symbind` store at the given root and write its config.
    Init {
        /// Store root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Load address the descriptions were recorded against (hex or decimal).
        #[arg(long, value_parser = parse_address)]
        baseline_base: Option<u64>,

        /// Directory holding `<version>.yml` descriptions to fetch from.
        #[arg(long)]
        mirror_dir: Option<String>,
    },

    /// Show the resolver config and the cached dataset, if any.
    Info {
        /// Store root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Check a description for cycles, malformed slots and unusable names.
    Validate {
        /// Description file (YAML, or JSON with a `.json` extension).
        #[arg(long)]
        data: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the symbol catalog of a description with recorded addresses.
    Catalog {
        /// Store root whose config supplies the pointer size.
        #[arg(long, default_value = ".")]
        root: String,

        /// Description file (YAML, or JSON with a `.json` extension).
        #[arg(long)]
        data: String,

        /// Keep only explicitly declared slots (legacy behavior).
        #[arg(long, default_value_t = false)]
        no_inherit: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the effective vtable slots of one class.
    Slots {
        /// Store root whose config supplies the pointer size.
        #[arg(long, default_value = ".")]
        root: String,

        /// Description file (YAML, or JSON with a `.json` extension).
        #[arg(long)]
        data: String,

        /// Class name as written in the description.
        #[arg(long)]
        class: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Fetch the description for a version and store it in the local cache.
    Fetch {
        /// Store root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Build version to fetch.
        #[arg(long)]
        version: String,
    },

    /// Select the trustworthy dataset for a live image and print its live table.
    Resolve {
        /// Store root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Baked description file.
        #[arg(long)]
        data: String,

        /// Load address of the live main module (hex or decimal).
        #[arg(long, value_parser = parse_address)]
        live_base: u64,

        /// Build version reported by the live process.
        #[arg(long, conflicts_with = "version_file")]
        live_version: Option<String>,

        /// File containing the live build version. Defaults to `ffxivgame.ver`
        /// next to this executable.
        #[arg(long)]
        version_file: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_logging(format_from_env());
    let cli = Cli::parse();

    match cli.command {
        Command::Init { root, baseline_base, mirror_dir } => {
            init_command(&root, baseline_base, mirror_dir)?
        }
        Command::Info { root, json } => info_command(&root, json)?,
        Command::Validate { data, json } => validate_command(&data, json)?,
        Command::Catalog { root, data, no_inherit, json } => {
            catalog_command(&root, &data, no_inherit, json)?
        }
        Command::Slots { root, data, class, json } => slots_command(&root, &data, &class, json)?,
        Command::Fetch { root, version } => fetch_command(&root, &version)?,
        Command::Resolve { root, data, live_base, live_version, version_file, json } => {
            resolve_command(&ResolveRequest {
                root,
                data,
                live_base,
                live_version,
                version_file,
                json,
            })?
        }
    }

    Ok(())
}
