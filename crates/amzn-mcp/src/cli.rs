//! CLI argument definitions using clap derive macros.

use clap::Parser;
use std::path::PathBuf;

/// Amazon order history MCP server
///
/// Speaks the Model Context Protocol over stdio. Credentials are read from
/// AMAZON_USERNAME and AMAZON_PASSWORD (a `.env` file is honoured).
#[derive(Parser, Debug)]
#[command(name = "amzn-mcp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Serve orders from a JSON fixture file instead of amazon.com
    #[arg(long, value_name = "PATH")]
    pub fixture: Option<PathBuf>,

    /// Amazon storefront URL (default https://www.amazon.com)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub log_json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["amzn-mcp"]);
        assert!(cli.fixture.is_none());
        assert!(cli.base_url.is_none());
        assert!(!cli.log_json);
    }

    #[test]
    fn test_cli_log_json() {
        let cli = Cli::parse_from(["amzn-mcp", "--log-json"]);
        assert!(cli.log_json);
    }
}
