//! `_minecraft._tcp` SRV records, which let a game server live on a
//! different host/port than the name players type in.

use std::net::IpAddr;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use log::{debug, warn};

pub type Resolver = TokioAsyncResolver;

pub fn system_resolver() -> Resolver {
    TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
        warn!("couldn't read system dns config, using defaults: {e}");
        TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
    })
}

/// Where to connect: the published SRV target if there is one,
/// otherwise `host:port` unchanged. IP literals are never looked up.
pub async fn resolve(resolver: &Resolver, host: &str, port: u16) -> (String, u16) {
    let fallback = || (host.to_string(), port);

    if host.parse::<IpAddr>().is_ok() {
        return fallback();
    }

    let name = format!("_minecraft._tcp.{host}");
    let lookup = match resolver.srv_lookup(name.as_str()).await {
        Ok(l) => l,
        Err(e) => {
            debug!("no SRV record for {host}: {e}");
            return fallback();
        }
    };

    match lookup.iter().min_by_key(|srv| srv.priority()) {
        Some(srv) => {
            let target = srv.target().to_utf8();
            let target = target.trim_end_matches('.').to_string();
            debug!("{host} has SRV record {target}:{}", srv.port());
            (target, srv.port())
        }
        None => fallback(),
    }
}
