use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "livery-installer")]
#[command(version)]
#[command(about = "Install PMDG 777F liveries into an MSFS community folder", long_about = None)]
#[command(after_help = "Examples:\n  \
  livery-installer install AFR-001.zip D:\\MSFS\\Community\n  \
  livery-installer install https://example.com/liveries/AFR-001.zip\n  \
  livery-installer info -v AFR-001.zip")]
pub struct Cli {
    /// Quiet mode (-q => warnings only, -qq => errors only)
    #[arg(short = 'q', global = true, action = clap::ArgAction::Count)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install a livery archive into the community folder
    Install {
        /// Livery ZIP file path or HTTP URL
        #[arg(value_name = "ZIP")]
        archive: String,

        /// Community folder containing MSFSLayoutGenerator.exe
        /// (default: config file, then the current directory)
        #[arg(value_name = "COMMUNITY")]
        community: Option<PathBuf>,
    },

    /// Show the livery metadata and files of an archive
    Info {
        /// Livery ZIP file path or HTTP URL
        #[arg(value_name = "ZIP")]
        archive: String,

        /// List verbosely (sizes, compression ratio, timestamps)
        #[arg(short = 'v')]
        verbose: bool,
    },
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_with_community() {
        let cli = Cli::try_parse_from(["livery-installer", "install", "AFR.zip", "/sim"]).unwrap();
        match &cli.command {
            Command::Install { archive, community } => {
                assert_eq!(archive.as_str(), "AFR.zip");
                assert_eq!(*community, Some(PathBuf::from("/sim")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(!cli.is_quiet());
    }

    #[test]
    fn test_install_community_is_optional() {
        let cli = Cli::try_parse_from(["livery-installer", "-q", "install", "AFR.zip"]).unwrap();
        assert!(matches!(cli.command, Command::Install { community: None, .. }));
        assert!(cli.is_quiet());
    }

    #[test]
    fn test_install_requires_archive() {
        assert!(Cli::try_parse_from(["livery-installer", "install"]).is_err());
    }

    #[test]
    fn test_info_verbose() {
        let cli = Cli::try_parse_from(["livery-installer", "info", "-v", "AFR.zip", "-qq"]).unwrap();
        assert!(matches!(cli.command, Command::Info { verbose: true, .. }));
        assert_eq!(cli.quiet, 2);
    }
}
