use anyhow::{Context, Result};
use clap::Parser;
use drubuild::config::ExtraConfig;
use drubuild::package::{CanonicalVersion, PackageIdentity, version};
use drubuild::placement::{PlacementResolver, PlacementRules};
use std::path::PathBuf;

/// drubuild - site assembly helper
///
/// Inspection front end over the placement and version machinery: resolve
/// where a package would be installed, or normalize a version string the
/// way the lifecycle does.
///
/// The host package manager drives the actual lifecycle through the
/// library API; this binary exists for debugging rule tables and version
/// handling.
#[derive(Parser, Debug)]
#[command(author, version = env!("DRUBUILD_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file: a manifest with an "extra" key, or the
    /// bare extra object itself (also via DRUBUILD_CONFIG)
    #[arg(
        long = "config",
        short = 'c',
        env = "DRUBUILD_CONFIG",
        value_name = "PATH",
        global = true
    )]
    pub config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Resolve the installation path for a package
    Resolve(ResolveArgs),

    /// Normalize a version string and print its canonical and display forms
    Version(VersionArgs),
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// The package name in the format "vendor/project"
    #[arg(value_name = "VENDOR/PROJECT")]
    pub name: String,

    /// Declared package type
    #[arg(long = "type", short = 't', value_name = "TYPE", default_value = "drupal-module")]
    pub package_type: String,
}

#[derive(clap::Args, Debug)]
pub struct VersionArgs {
    /// Raw version string as reported by the host
    #[arg(value_name = "VERSION")]
    pub raw: String,

    /// Package name providing display context
    #[arg(long, value_name = "VENDOR/PROJECT", default_value = "vendor/project")]
    pub package: String,

    /// Distribution series, as resolved from the package source address
    #[arg(long, value_name = "SERIES")]
    pub series: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve(args) => resolve(&args, cli.config.as_deref()),
        Commands::Version(args) => show_version(&args),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<ExtraConfig> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read configuration {}", path.display()))?;
            ExtraConfig::from_json_str(&contents)
        }
        None => Ok(ExtraConfig::default()),
    }
}

fn resolve(args: &ResolveArgs, config: Option<&std::path::Path>) -> Result<()> {
    let config = load_config(config)?;
    let identity = PackageIdentity::new(&args.name, &args.package_type, "")?;
    let mut resolver = PlacementResolver::new(PlacementRules::from_config(&config));
    match resolver.resolve(&identity) {
        Some(path) => println!("{}", path.display()),
        None => println!("(host default)"),
    }
    Ok(())
}

fn show_version(args: &VersionArgs) -> Result<()> {
    let mut identity = PackageIdentity::new(&args.package, "drupal-module", &args.raw)?;
    if let Some(series) = &args.series {
        identity = identity.with_source_url(format!("https://packages.drupal.org/{series}"));
    }

    println!("canonical: {}", CanonicalVersion::parse(&args.raw));
    println!("display:   {}", version::display(&identity));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_resolve_parsing() {
        let cli = Cli::try_parse_from(["drubuild", "resolve", "acme/widgets"]).unwrap();
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.name, "acme/widgets");
                assert_eq!(args.package_type, "drupal-module");
            }
            _ => panic!("Expected Resolve command"),
        }
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_cli_resolve_type_parsing() {
        let cli = Cli::try_parse_from([
            "drubuild",
            "resolve",
            "ckeditor/ckeditor",
            "--type",
            "library",
        ])
        .unwrap();
        match cli.command {
            Commands::Resolve(args) => assert_eq!(args.package_type, "library"),
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_cli_version_parsing() {
        let cli = Cli::try_parse_from([
            "drubuild",
            "version",
            "7.1.2",
            "--package",
            "drupal/views",
            "--series",
            "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Version(args) => {
                assert_eq!(args.raw, "7.1.2");
                assert_eq!(args.package, "drupal/views");
                assert_eq!(args.series.as_deref(), Some("7"));
            }
            _ => panic!("Expected Version command"),
        }
    }

    #[test]
    fn test_cli_global_config_parsing() {
        let cli = Cli::try_parse_from([
            "drubuild",
            "--config",
            "/tmp/composer.json",
            "resolve",
            "acme/widgets",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/composer.json")));
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        let result = Cli::try_parse_from(["drubuild", "acme/widgets"]);
        assert!(result.is_err());
    }
}
