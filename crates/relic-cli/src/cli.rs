use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "relic",
    about = "relic — content-addressed data pipeline versioning",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a relic project in the current directory
    Init(InitArgs),
    /// Commit stage outputs to the cache
    Commit(CommitArgs),
    /// Restore stage outputs from the cache
    Checkout(CheckoutArgs),
    /// Show artifact status for stages
    Status(StatusArgs),
}

#[derive(Args)]
pub struct InitArgs {}

#[derive(Args)]
pub struct CommitArgs {
    /// Stage files to commit (default: all indexed stages)
    pub paths: Vec<String>,
    /// Leave originals in place instead of replacing them with links
    #[arg(short, long)]
    pub copy: bool,
}

#[derive(Args)]
pub struct CheckoutArgs {
    /// Stage files to check out (default: all indexed stages)
    pub paths: Vec<String>,
    /// Copy artifacts instead of linking
    #[arg(short, long)]
    pub copy: bool,
    /// Don't recursively operate on dependencies
    #[arg(short, long)]
    pub single_stage: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Stage files to report on (default: all indexed stages)
    pub paths: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["relic", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init(_)));
    }

    #[test]
    fn parse_commit_defaults() {
        let cli = Cli::try_parse_from(["relic", "commit"]).unwrap();
        if let Command::Commit(args) = cli.command {
            assert!(args.paths.is_empty());
            assert!(!args.copy);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_commit_paths_and_copy() {
        let cli = Cli::try_parse_from(["relic", "commit", "-c", "train.toml"]).unwrap();
        if let Command::Commit(args) = cli.command {
            assert_eq!(args.paths, ["train.toml"]);
            assert!(args.copy);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_checkout_flags() {
        let cli =
            Cli::try_parse_from(["relic", "checkout", "--copy", "--single-stage", "a.toml"])
                .unwrap();
        if let Command::Checkout(args) = cli.command {
            assert_eq!(args.paths, ["a.toml"]);
            assert!(args.copy);
            assert!(args.single_stage);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_checkout_short_flags() {
        let cli = Cli::try_parse_from(["relic", "checkout", "-c", "-s"]).unwrap();
        if let Command::Checkout(args) = cli.command {
            assert!(args.copy);
            assert!(args.single_stage);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_status() {
        let cli = Cli::try_parse_from(["relic", "status", "a.toml", "b.toml"]).unwrap();
        if let Command::Status(args) = cli.command {
            assert_eq!(args.paths, ["a.toml", "b.toml"]);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_verbose_is_global() {
        let cli = Cli::try_parse_from(["relic", "status", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }
}
