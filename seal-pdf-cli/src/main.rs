use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use seal_pdf::{
    Document, EncryptionDictionary, EncryptionPolicy, EncryptionSession, PermissionFlags,
    Permissions, SecurityHandlerRevision,
};
use std::path::{Path, PathBuf};
use tracing::info;

mod config;
use config::Config;

/// Owner password applied when neither the flag nor the config provides one.
const DEFAULT_OWNER_PASSWORD: &str = "6610906";

const DEFAULT_SUFFIX: &str = "_restricted";

#[derive(Parser)]
#[command(
    name = "sealpdf",
    about = "Restrict usage permissions on PDF files",
    version
)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file location
    #[arg(long, global = true, default_value = "seal-pdf.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-encrypt a PDF so that only the chosen capabilities remain enabled
    Restrict {
        /// Input PDF file
        input: PathBuf,

        /// Capabilities to leave enabled (default: print,print-hq)
        #[arg(short, long, value_delimiter = ',')]
        allow: Vec<Capability>,

        /// Password required to open the document (empty: opens freely)
        #[arg(long, default_value = "")]
        user_password: String,

        /// Owner password; falls back to the configured default
        #[arg(long)]
        owner_password: Option<String>,

        /// Encryption configuration
        #[arg(long, value_enum, default_value = "rc4-128")]
        cipher: Cipher,

        /// Write a sibling copy with this suffix instead of overwriting
        /// the original
        #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_SUFFIX)]
        suffix: Option<String>,

        /// Copy the original aside before overwriting it
        #[arg(long)]
        backup: bool,

        /// Directory for backup copies (default: next to the original)
        #[arg(long)]
        backup_dir: Option<PathBuf>,
    },

    /// Show the permission set an encrypted PDF enforces
    Permissions {
        /// Input PDF file
        input: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Capability {
    Print,
    #[value(name = "print-hq")]
    PrintHq,
    Modify,
    Copy,
    Annotate,
    Forms,
    Accessibility,
    Assemble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Cipher {
    #[value(name = "rc4-40")]
    Rc4_40,
    #[value(name = "rc4-128")]
    Rc4_128,
    #[value(name = "aes-128")]
    Aes128,
    #[value(name = "aes-256")]
    Aes256,
}

impl Cipher {
    fn revision(self) -> SecurityHandlerRevision {
        match self {
            Cipher::Rc4_40 => SecurityHandlerRevision::R2,
            Cipher::Rc4_128 => SecurityHandlerRevision::R3,
            Cipher::Aes128 => SecurityHandlerRevision::R4Aes128,
            Cipher::Aes256 => SecurityHandlerRevision::R6,
        }
    }

    fn key_length_bits(self) -> u16 {
        match self {
            Cipher::Rc4_40 => 40,
            Cipher::Rc4_128 | Cipher::Aes128 => 128,
            Cipher::Aes256 => 256,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Restrict {
            input,
            allow,
            user_password,
            owner_password,
            cipher,
            suffix,
            backup,
            backup_dir,
        } => restrict(
            &cli.config,
            &input,
            &allow,
            &user_password,
            owner_password,
            cipher,
            suffix,
            backup,
            backup_dir,
        ),
        Commands::Permissions { input } => show_permissions(&input),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

#[allow(clippy::too_many_arguments)]
fn restrict(
    config_path: &Path,
    input: &Path,
    allow: &[Capability],
    user_password: &str,
    owner_password: Option<String>,
    cipher: Cipher,
    suffix: Option<String>,
    backup: bool,
    backup_dir: Option<PathBuf>,
) -> Result<()> {
    if !has_pdf_extension(input) {
        bail!("{} is not a PDF file", input.display());
    }

    let mut config = Config::load(config_path);
    let owner_password = owner_password
        .or_else(|| config.owner_password.clone())
        .unwrap_or_else(|| DEFAULT_OWNER_PASSWORD.to_string());

    info!("processing {}", input.display());
    let mut document =
        Document::load(input).with_context(|| format!("failed to read {}", input.display()))?;
    if document.is_encrypted() {
        bail!("{} is already encrypted", input.display());
    }

    let permissions = build_permissions(allow);
    let policy = EncryptionPolicy::new(
        user_password,
        owner_password,
        permissions,
        cipher.revision(),
        cipher.key_length_bits(),
    );

    let output = resolve_output_path(input, suffix.as_deref());
    let in_place = output == input;

    // Backups exist to protect the original; a suffixed copy never touches it.
    let backup_path = if backup && in_place {
        let dir = backup_dir.as_deref().or(config.backup_directory.as_deref());
        let target = backup_path_for(input, dir);
        std::fs::copy(input, &target)
            .with_context(|| format!("failed to create backup {}", target.display()))?;
        info!("backed up original to {}", target.display());
        Some(target)
    } else {
        None
    };

    let mut session = EncryptionSession::new(policy);
    session
        .encrypt(&mut document)
        .context("encryption failed; the input file was left untouched")?;

    document
        .save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    if let Some(parent) = input.parent() {
        config.last_directory = Some(parent.to_path_buf());
    }
    if let Some(dir) = backup_dir {
        config.backup_directory = Some(dir);
    }
    if let Err(err) = config.save(config_path) {
        info!("could not persist config: {err}");
    }

    println!("Permissions restricted: {}", output.display());
    if let Some(path) = backup_path {
        println!("Original backed up to: {}", path.display());
    }

    Ok(())
}

fn show_permissions(input: &Path) -> Result<()> {
    let document =
        Document::load(input).with_context(|| format!("failed to read {}", input.display()))?;

    let Some(dict) = document.encryption_dict() else {
        println!("{} is not encrypted; all operations are allowed", input.display());
        return Ok(());
    };

    let enc = EncryptionDictionary::from_dict(dict)?;
    let flags = enc.p.flags();

    println!("Security handler: {} (V{} R{})", enc.filter, enc.v, enc.r);
    println!("Key length: {} bits", enc.length);
    println!("P value: {}", enc.p.as_p());
    print_flag("print", flags.print);
    print_flag("high-quality print", flags.print_high_quality);
    print_flag("modify contents", flags.modify_contents);
    print_flag("copy", flags.copy);
    print_flag("annotate", flags.modify_annotations);
    print_flag("fill forms", flags.fill_forms);
    print_flag("accessibility extraction", flags.accessibility);
    print_flag("assemble", flags.assemble);

    Ok(())
}

fn print_flag(label: &str, allowed: bool) {
    println!("  {label}: {}", if allowed { "allowed" } else { "denied" });
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn build_permissions(allow: &[Capability]) -> Permissions {
    // The original tool's fixed policy: printing stays available.
    let allow: &[Capability] = if allow.is_empty() {
        &[Capability::Print, Capability::PrintHq]
    } else {
        allow
    };

    let mut flags = PermissionFlags::default();
    for capability in allow {
        match capability {
            Capability::Print => flags.print = true,
            Capability::PrintHq => flags.print_high_quality = true,
            Capability::Modify => flags.modify_contents = true,
            Capability::Copy => flags.copy = true,
            Capability::Annotate => flags.modify_annotations = true,
            Capability::Forms => flags.fill_forms = true,
            Capability::Accessibility => flags.accessibility = true,
            Capability::Assemble => flags.assemble = true,
        }
    }
    Permissions::from_flags(flags)
}

/// In-place by default; with a suffix, a sibling file next to the input.
fn resolve_output_path(input: &Path, suffix: Option<&str>) -> PathBuf {
    let Some(suffix) = suffix else {
        return input.to_path_buf();
    };
    let suffix = if suffix.is_empty() { DEFAULT_SUFFIX } else { suffix };

    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let extension = input.extension().map(|e| e.to_string_lossy());

    let file_name = match extension {
        Some(ext) => format!("{stem}{suffix}.{ext}"),
        None => format!("{stem}{suffix}"),
    };
    input.with_file_name(file_name)
}

/// `<name>.pdf.bak`, either next to the original or under the backup
/// directory.
fn backup_path_for(input: &Path, backup_dir: Option<&Path>) -> PathBuf {
    let file_name = format!(
        "{}.bak",
        input.file_name().unwrap_or_default().to_string_lossy()
    );
    match backup_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}
