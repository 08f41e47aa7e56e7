use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log every entry as it is processed.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Create an archive from the given files, written to standard output.
    #[command(alias = "c")]
    Create {
        /// One or more regular files to add to the archive, in order.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Write the archive to this file instead of standard output.
        #[arg(short = 'f', long = "file")]
        archive: Option<PathBuf>,
    },

    /// Extract an archive read from standard input.
    #[command(alias = "x")]
    Extract {
        /// Read the archive from this file instead of standard input.
        #[arg(short = 'f', long = "file")]
        archive: Option<PathBuf>,

        /// The directory where files will be extracted. Defaults to the current directory.
        #[arg(short = 'C', long = "directory")]
        output: Option<PathBuf>,

        /// Do not restore file modes and modification times.
        #[arg(long)]
        no_metadata: bool,

        /// Extra arguments are accepted and ignored.
        #[arg(hide = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        ignored: Vec<String>,
    },

    /// List the contents of an archive without extracting it.
    #[command(alias = "t")]
    List {
        /// Read the archive from this file instead of standard input.
        #[arg(short = 'f', long = "file")]
        archive: Option<PathBuf>,
    },
}

/// Parses command-line arguments using `clap` and returns them.
///
/// Parse failures (including `--help` and `--version`) come back as a
/// `clap::Error`; the caller decides how to print them and which exit code to use.
pub fn run() -> Result<Args, clap::Error> {
    Args::try_parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tar_style_aliases_parse() {
        let args = Args::try_parse_from(["frametar", "c", "a.txt", "b.txt"]).unwrap();
        match args.command {
            Commands::Create { inputs, archive } => {
                assert_eq!(inputs, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
                assert!(archive.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }

        let args = Args::try_parse_from(["frametar", "x", "stray", "--odd"]).unwrap();
        assert!(matches!(args.command, Commands::Extract { ref ignored, .. } if ignored.len() == 2));

        let args = Args::try_parse_from(["frametar", "-v", "t", "-f", "a.ft"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Commands::List { archive: Some(_) }));
    }

    #[test]
    fn create_requires_files() {
        assert!(Args::try_parse_from(["frametar", "c"]).is_err());
        assert!(Args::try_parse_from(["frametar"]).is_err());
        assert!(Args::try_parse_from(["frametar", "z"]).is_err());
    }
}
