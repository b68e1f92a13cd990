use std::fmt;
use std::io;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::timeout;

mod motd;
mod ping;
mod srv;

pub use srv::{system_resolver, Resolver};

#[derive(Debug, Clone)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

/// Reply to `checkServerStatus`. Offline serialises as just
/// `{ "online": false }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    players_online: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    players_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    motd: Option<String>,
}

impl ServerStatus {
    pub fn offline() -> Self {
        Self {
            online: false,
            players_online: None,
            players_max: None,
            version: None,
            motd: None,
        }
    }

    pub fn online(players_online: i64, players_max: i64, version: String, motd: String) -> Self {
        Self {
            online: true,
            players_online: Some(players_online),
            players_max: Some(players_max),
            version: Some(version),
            motd: Some(motd),
        }
    }
}

/// Why a probe failed. Only ever logged: callers see [`ServerStatus::offline`].
#[derive(Debug)]
pub enum ProbeError {
    Io(io::Error),
    Timeout,
    Protocol(&'static str),
    Json(serde_json::Error),
}

impl From<io::Error> for ProbeError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Timeout => write!(f, "timed out"),
            Self::Protocol(what) => write!(f, "protocol: {what}"),
            Self::Json(e) => write!(f, "bad status json: {e}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    version: Version,
    players: Players,
    #[serde(default)]
    description: Value,
}

#[derive(Debug, Deserialize)]
struct Version {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Players {
    online: i64,
    max: i64,
}

impl From<StatusResponse> for ServerStatus {
    fn from(resp: StatusResponse) -> Self {
        let motd = motd::clean(&resp.description);

        ServerStatus::online(resp.players.online, resp.players.max, resp.version.name, motd)
    }
}

pub struct Prober {
    target: Target,
    resolver: Option<Resolver>,
}

impl Prober {
    /// Connects to the target exactly as given.
    pub fn new(target: Target) -> Self {
        Self {
            target,
            resolver: None,
        }
    }

    /// Looks up a `_minecraft._tcp` SRV record for the target host
    /// first, falling back to the configured host and port.
    pub fn with_srv(target: Target, resolver: Resolver) -> Self {
        Self {
            target,
            resolver: Some(resolver),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// One status query, never retried. Every failure is reported as offline.
    pub async fn check(&self) -> ServerStatus {
        let Target { host, port, .. } = &self.target;

        let result = match timeout(self.target.timeout, self.probe()).await {
            Ok(r) => r,
            Err(_elapsed) => Err(ProbeError::Timeout),
        };

        match result {
            Ok(status) => {
                info!("{host}:{port} is online");
                status
            }
            Err(e) => {
                debug!("{host}:{port} unavailable: {e}");
                ServerStatus::offline()
            }
        }
    }

    async fn probe(&self) -> Result<ServerStatus, ProbeError> {
        let Target { host, port, .. } = &self.target;

        let (host, port) = match &self.resolver {
            Some(resolver) => srv::resolve(resolver, host, *port).await,
            None => (host.clone(), *port),
        };

        let mut stream = TcpStream::connect((host.as_str(), port)).await?;
        let json = ping::query(&mut stream, &host, port).await?;
        let resp: StatusResponse = serde_json::from_str(&json)?;

        Ok(resp.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    const STATUS_JSON: &str = r#"{
        "version": { "name": "Paper 1.21.1", "protocol": 767 },
        "players": { "max": 100, "online": 7, "sample": [] },
        "description": { "text": "§6DeathEvents", "extra": [{ "text": " §7- live" }] }
    }"#;

    fn target(port: u16, timeout: Duration) -> Target {
        Target {
            host: "127.0.0.1".into(),
            port,
            timeout,
        }
    }

    /// Accepts one connection, checks the handshake and answers with `reply`.
    async fn fake_server(reply: Vec<u8>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();

            let (id, _handshake) = ping::read_packet(&mut sock).await.unwrap();
            assert_eq!(id, 0);
            let (id, request) = ping::read_packet(&mut sock).await.unwrap();
            assert_eq!(id, 0);
            assert!(request.is_empty());

            sock.write_all(&reply).await.unwrap();
            sock.flush().await.unwrap();
        });

        port
    }

    fn status_packet(json: &str) -> Vec<u8> {
        let mut body = vec![];
        ping::write_varint(&mut body, 0);
        ping::write_varint(&mut body, json.len() as i32);
        body.extend_from_slice(json.as_bytes());

        let mut packet = vec![];
        ping::write_varint(&mut packet, body.len() as i32);
        packet.extend(body);
        packet
    }

    #[tokio::test]
    async fn online() {
        let port = fake_server(status_packet(STATUS_JSON)).await;
        let prober = Prober::new(target(port, Duration::from_secs(5)));

        assert_eq!(
            prober.check().await,
            ServerStatus::online(7, 100, "Paper 1.21.1".into(), "DeathEvents - live".into())
        );
    }

    #[test]
    fn online_json_shape() {
        let status = ServerStatus::online(7, 100, "1.20".into(), "hi".into());

        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({
                "online": true,
                "playersOnline": 7,
                "playersMax": 100,
                "version": "1.20",
                "motd": "hi",
            })
        );
    }

    #[tokio::test]
    async fn refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let prober = Prober::new(target(port, Duration::from_secs(5)));

        let status = prober.check().await;

        assert_eq!(status, ServerStatus::offline());
        assert_eq!(serde_json::to_string(&status).unwrap(), r#"{"online":false}"#);
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let prober = Prober::new(target(port, Duration::from_millis(200)));

        assert_eq!(prober.check().await, ServerStatus::offline());
    }

    #[tokio::test]
    async fn garbage_reply() {
        let port = fake_server(status_packet("this is not json")).await;
        let prober = Prober::new(target(port, Duration::from_secs(5)));

        assert_eq!(prober.check().await, ServerStatus::offline());
    }

    #[tokio::test]
    async fn wrong_packet_id() {
        let mut reply = vec![];
        ping::write_varint(&mut reply, 1);
        ping::write_varint(&mut reply, 0x05);
        let port = fake_server(reply).await;
        let prober = Prober::new(target(port, Duration::from_secs(5)));

        assert_eq!(prober.check().await, ServerStatus::offline());
    }

    #[tokio::test]
    async fn srv_falls_back_to_configured_port() {
        let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let resolver = srv::test::resolver_at(silent.local_addr().unwrap().port());

        let port = fake_server(status_packet(STATUS_JSON)).await;
        let target = Target {
            host: "localhost".into(),
            port,
            timeout: Duration::from_secs(5),
        };
        let prober = Prober::with_srv(target, resolver);

        assert_eq!(
            prober.check().await,
            ServerStatus::online(7, 100, "Paper 1.21.1".into(), "DeathEvents - live".into())
        );
    }
}
