//! Purpose: Minimal broker client speaking the RESP pub/sub subset.
//! Exports: `BrokerPublisher`, `BrokerSubscriber`, `broker_addr`, `DEFAULT_BROKER_URL`.
//! Role: Two dedicated connections; publish is never blocked by the subscribe loop.
//! Invariants: Only `AUTH`, `PUBLISH`, and `SUBSCRIBE` are ever sent.
//! Invariants: Non-message pushes on the subscriber stream are skipped, not errors.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use url::Url;

use crate::core::error::{Error, ErrorKind};
use crate::transport::resp::{self, Frame};
use crate::transport::{Inbound, Publish};

pub const DEFAULT_BROKER_URL: &str = "redis://localhost:6379";

const DEFAULT_BROKER_PORT: u16 = 6379;

/// Parse a `redis://` endpoint URL into host, port, and optional password.
pub fn broker_addr(url: &str) -> Result<(String, u16, Option<String>), Error> {
    let parsed = Url::parse(url).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid broker url '{url}'"))
            .with_source(err)
    })?;
    if parsed.scheme() != "redis" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unsupported broker scheme '{}'", parsed.scheme()))
            .with_hint("Use a redis:// url like redis://localhost:6379."));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message(format!("broker url '{url}' has no host"))
        })?
        .to_string();
    let port = parsed.port().unwrap_or(DEFAULT_BROKER_PORT);
    let password = parsed
        .password()
        .filter(|password| !password.is_empty())
        .map(str::to_string);
    Ok((host, port, password))
}

struct Connection {
    stream: TcpStream,
    buf: BytesMut,
}

impl Connection {
    async fn open(url: &str) -> Result<Self, Error> {
        let (host, port, password) = broker_addr(url)?;
        let stream = TcpStream::connect((host.as_str(), port)).await.map_err(|err| {
            Error::new(ErrorKind::Transport)
                .with_message(format!("failed to connect to broker at {host}:{port}"))
                .with_source(err)
        })?;
        let mut connection = Self {
            stream,
            buf: BytesMut::with_capacity(4096),
        };
        if let Some(password) = password {
            connection.send(&[b"AUTH", password.as_bytes()]).await?;
            match connection.read_frame().await? {
                Some(Frame::Simple(_)) => {}
                Some(Frame::Error(message)) => {
                    return Err(Error::new(ErrorKind::Transport)
                        .with_message(format!("broker rejected AUTH: {message}")));
                }
                Some(other) => return Err(unexpected_reply("AUTH", &other)),
                None => return Err(closed_during("AUTH")),
            }
        }
        Ok(connection)
    }

    async fn send(&mut self, parts: &[&[u8]]) -> Result<(), Error> {
        let command = resp::encode_command(parts);
        self.stream.write_all(&command).await.map_err(|err| {
            Error::new(ErrorKind::Transport)
                .with_message("failed to send command to broker")
                .with_source(err)
        })
    }

    /// Read one complete frame; `None` on a clean EOF between frames.
    async fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        loop {
            if let Some(frame) = resp::decode(&mut self.buf)? {
                return Ok(Some(frame));
            }
            let read = self.stream.read_buf(&mut self.buf).await.map_err(|err| {
                Error::new(ErrorKind::Transport)
                    .with_message("failed to read from broker")
                    .with_source(err)
            })?;
            if read == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message("broker closed the connection mid-frame"));
            }
        }
    }
}

/// Dedicated publish connection. One `PUBLISH` round-trip at a time; handler
/// tasks share the handle and stay concurrent outside the awaited ack.
pub struct BrokerPublisher {
    connection: Mutex<Connection>,
}

impl BrokerPublisher {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        Ok(Self {
            connection: Mutex::new(Connection::open(url).await?),
        })
    }
}

#[async_trait]
impl Publish for BrokerPublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), Error> {
        let mut connection = self.connection.lock().await;
        connection
            .send(&[b"PUBLISH", topic.as_bytes(), &payload])
            .await
            .map_err(|err| err.with_topic(topic))?;
        match connection.read_frame().await? {
            Some(Frame::Integer(_)) => Ok(()),
            Some(Frame::Error(message)) => Err(Error::new(ErrorKind::Transport)
                .with_message(format!("broker rejected publish: {message}"))
                .with_topic(topic)),
            Some(other) => Err(unexpected_reply("PUBLISH", &other).with_topic(topic)),
            None => Err(closed_during("PUBLISH").with_topic(topic)),
        }
    }
}

/// Dedicated subscribe connection. After `subscribe`, the stream only carries
/// push frames.
pub struct BrokerSubscriber {
    connection: Connection,
}

impl BrokerSubscriber {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        Ok(Self {
            connection: Connection::open(url).await?,
        })
    }

    pub async fn subscribe(&mut self, topic: &str) -> Result<(), Error> {
        self.connection
            .send(&[b"SUBSCRIBE", topic.as_bytes()])
            .await
            .map_err(|err| err.with_topic(topic))?;
        match self.connection.read_frame().await? {
            Some(frame) if subscribe_confirmed(&frame) => Ok(()),
            Some(Frame::Error(message)) => Err(Error::new(ErrorKind::Transport)
                .with_message(format!("broker rejected subscribe: {message}"))
                .with_topic(topic)),
            Some(other) => Err(unexpected_reply("SUBSCRIBE", &other).with_topic(topic)),
            None => Err(closed_during("SUBSCRIBE").with_topic(topic)),
        }
    }
}

#[async_trait]
impl Inbound for BrokerSubscriber {
    async fn next_message(&mut self) -> Result<Option<(String, Bytes)>, Error> {
        loop {
            let frame = match self.connection.read_frame().await? {
                Some(frame) => frame,
                None => return Ok(None),
            };
            if let Some(message) = push_message(&frame) {
                return Ok(Some(message));
            }
        }
    }
}

fn subscribe_confirmed(frame: &Frame) -> bool {
    let Frame::Array(Some(items)) = frame else {
        return false;
    };
    matches!(items.first(), Some(Frame::Bulk(Some(kind))) if kind.as_ref() == b"subscribe")
}

fn push_message(frame: &Frame) -> Option<(String, Bytes)> {
    let Frame::Array(Some(items)) = frame else {
        return None;
    };
    if items.len() != 3 {
        return None;
    }
    let Frame::Bulk(Some(kind)) = &items[0] else {
        return None;
    };
    if kind.as_ref() != b"message" {
        return None;
    }
    let Frame::Bulk(Some(topic)) = &items[1] else {
        return None;
    };
    let Frame::Bulk(Some(payload)) = &items[2] else {
        return None;
    };
    let topic = String::from_utf8_lossy(topic).into_owned();
    Some((topic, payload.clone()))
}

fn unexpected_reply(command: &str, frame: &Frame) -> Error {
    Error::new(ErrorKind::Corrupt)
        .with_message(format!("unexpected broker reply to {command}: {frame:?}"))
}

fn closed_during(command: &str) -> Error {
    Error::new(ErrorKind::Transport)
        .with_message(format!("broker closed the connection during {command}"))
}

#[cfg(test)]
mod tests {
    use super::{broker_addr, push_message, subscribe_confirmed};
    use crate::core::error::ErrorKind;
    use crate::transport::resp::Frame;
    use bytes::Bytes;

    fn bulk(bytes: &'static [u8]) -> Frame {
        Frame::Bulk(Some(Bytes::from_static(bytes)))
    }

    #[test]
    fn parses_default_and_explicit_endpoints() {
        let (host, port, password) = broker_addr("redis://localhost:6379").expect("default");
        assert_eq!(host, "localhost");
        assert_eq!(port, 6379);
        assert!(password.is_none());

        let (host, port, password) =
            broker_addr("redis://:sekrit@broker.internal:7000").expect("full");
        assert_eq!(host, "broker.internal");
        assert_eq!(port, 7000);
        assert_eq!(password.as_deref(), Some("sekrit"));

        let (_, port, _) = broker_addr("redis://localhost").expect("portless");
        assert_eq!(port, 6379);
    }

    #[test]
    fn rejects_non_redis_schemes() {
        let err = broker_addr("http://localhost:6379").expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let err = broker_addr("not a url").expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn recognizes_push_messages() {
        let frame = Frame::Array(Some(vec![
            bulk(b"message"),
            bulk(b"yk-calls"),
            bulk(b"{\"id\":\"1\"}"),
        ]));
        let (topic, payload) = push_message(&frame).expect("push");
        assert_eq!(topic, "yk-calls");
        assert_eq!(payload.as_ref(), b"{\"id\":\"1\"}");
    }

    #[test]
    fn skips_non_message_pushes() {
        let confirmation = Frame::Array(Some(vec![
            bulk(b"subscribe"),
            bulk(b"yk-calls"),
            Frame::Integer(1),
        ]));
        assert!(push_message(&confirmation).is_none());
        assert!(subscribe_confirmed(&confirmation));

        assert!(push_message(&Frame::Integer(1)).is_none());
        assert!(!subscribe_confirmed(&Frame::Simple("OK".to_string())));
    }
}
