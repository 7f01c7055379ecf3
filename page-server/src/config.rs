use std::path::PathBuf;

use clap::Parser;

/// Command-line and environment configuration for the page server.
#[derive(Debug, Clone, Parser)]
#[command(name = "page-server", about = "Serve template pages and echo form fields")]
pub struct Config {
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Directory holding `<page>.html` templates.
    #[arg(long, env = "VIEWS_DIR", default_value = "views")]
    pub views_dir: PathBuf,

    /// Directory of files served as-is, checked before templates.
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
