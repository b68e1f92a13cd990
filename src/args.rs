use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::status::Target;

#[derive(Parser, Debug)]
pub struct Args {
    /// The address to listen on. By default all IPv4
    /// interfaces are used.
    #[arg(short, long)]
    address: Option<String>,

    /// The port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// JSON file holding the username -> password hash map.
    /// Created on the first signup.
    #[arg(short, long, env = "USERS_FILE", default_value = "users.json")]
    users: PathBuf,

    /// Directory containing index.html, login.html, signup.html
    /// and serverstatus.html.
    #[arg(long, default_value = ".")]
    pages: PathBuf,

    /// Static asset directory, served at the root.
    #[arg(long, default_value = "public")]
    public: PathBuf,

    /// Game server queried by `checkServerStatus`.
    #[arg(long, default_value = "play.deathevents.lol")]
    status_host: String,

    #[arg(long, default_value_t = 25565)]
    status_port: u16,

    /// Upper bound on a whole status query, connect included.
    #[arg(long, default_value_t = 5000)]
    status_timeout_ms: u64,

    /// Connect to --status-host directly, without looking up its
    /// `_minecraft._tcp` SRV record.
    #[arg(long)]
    no_srv: bool,
}

impl Args {
    pub fn addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.address
            .as_deref()
            .unwrap_or("0.0.0.0")
            .parse()
            .map(|addr: IpAddr| (addr, self.port).into())
    }

    pub fn users(&self) -> &PathBuf {
        &self.users
    }

    pub fn pages(&self) -> &PathBuf {
        &self.pages
    }

    pub fn public(&self) -> &PathBuf {
        &self.public
    }

    pub fn srv(&self) -> bool {
        !self.no_srv
    }

    pub fn status_target(&self) -> Target {
        Target {
            host: self.status_host.clone(),
            port: self.status_port,
            timeout: Duration::from_millis(self.status_timeout_ms),
        }
    }
}
