use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use warp::Filter;

mod accounts;
mod args;
mod auth;
mod backend;
mod gateway;
mod routes;
mod status;
mod user;

use accounts::Accounts;
use args::Args;
use backend::Backend;
use gateway::Gateway;
use status::Prober;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "deathevents=info".into());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filter)
        .init();

    let args = Args::parse();

    let addr = match args.addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid address: {e}");
            return ExitCode::FAILURE;
        }
    };

    let backend = Backend::new(args.users());
    info!("users stored in {:?}", backend.path());

    let prober = if args.srv() {
        Prober::with_srv(args.status_target(), status::system_resolver())
    } else {
        Prober::new(args.status_target())
    };
    let target = prober.target();
    info!("server status from {}:{}", target.host, target.port);

    let gateway = Arc::new(Gateway::new(Accounts::new(backend), prober));

    let routes = routes::socket(gateway)
        .or(routes::pages(args.pages(), args.public()))
        .with(warp::log("deathevents"));

    info!("Server running on {addr}");
    warp::serve(routes).run(addr).await;

    ExitCode::SUCCESS
}
