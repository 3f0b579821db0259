//! RESP protocol client for Redis-compatible stores.
//!
//! Both ends of a key-value migration speak RESP2 — the source Redis and
//! the target store — so one client covers both. Commands are encoded as
//! RESP arrays of bulk strings; replies are parsed into [`Frame`]s and
//! decoded by the typed helpers below.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// A frame representing a RESP protocol value.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Option<Vec<Frame>>),
    Null,
}

impl Frame {
    /// Check if this frame is an error reply.
    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }

    /// Decode a textual reply (simple string or bulk string).
    pub fn into_text(self) -> Option<String> {
        match self {
            Frame::Simple(s) => Some(s),
            Frame::Bulk(Some(bytes)) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            _ => None,
        }
    }
}

/// Client for a Redis-protocol store, holding one connection for the
/// duration of a run. Only one command is ever in flight.
pub struct KvClient {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl KvClient {
    /// Connect to a Redis-protocol server.
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect(format!("{}:{}", host, port)).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Authenticate with the server.
    pub async fn auth(&mut self, password: &str) -> io::Result<()> {
        let reply = self.send_command(&["AUTH", password]).await?;
        if let Frame::Error(msg) = reply {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, msg));
        }
        Ok(())
    }

    /// Health check. Any non-error reply counts as reachable.
    pub async fn ping(&mut self) -> io::Result<()> {
        let reply = self.send_command(&["PING"]).await?;
        if let Frame::Error(msg) = reply {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, msg));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Source-side reads
    // ------------------------------------------------------------------

    /// All keys matching `pattern`.
    pub async fn keys(&mut self, pattern: &str) -> io::Result<Vec<String>> {
        let reply = self.send_command(&["KEYS", pattern]).await?;
        expect_text_array(reply)
    }

    /// The declared shape of a key, as the raw `TYPE` reply text.
    pub async fn key_type(&mut self, key: &str) -> io::Result<String> {
        let reply = self.send_command(&["TYPE", key]).await?;
        expect_text(reply)
    }

    /// The string value of a key, or `None` if the key is missing.
    pub async fn get(&mut self, key: &str) -> io::Result<Option<String>> {
        match self.send_command(&["GET", key]).await? {
            Frame::Null | Frame::Bulk(None) => Ok(None),
            Frame::Error(msg) => Err(other(msg)),
            frame => frame.into_text().map(Some).ok_or_else(unexpected),
        }
    }

    /// Remaining TTL in seconds. Negative values mean no expiry.
    pub async fn ttl(&mut self, key: &str) -> io::Result<i64> {
        match self.send_command(&["TTL", key]).await? {
            Frame::Integer(n) => Ok(n),
            Frame::Error(msg) => Err(other(msg)),
            _ => Err(unexpected()),
        }
    }

    /// The full contents of a list, in order.
    pub async fn lrange_all(&mut self, key: &str) -> io::Result<Vec<String>> {
        let reply = self.send_command(&["LRANGE", key, "0", "-1"]).await?;
        expect_text_array(reply)
    }

    /// All fields of a hash, in reply order.
    pub async fn hgetall(&mut self, key: &str) -> io::Result<Vec<(String, String)>> {
        let reply = self.send_command(&["HGETALL", key]).await?;
        pair_up(expect_text_array(reply)?)
    }

    /// All members of a set.
    pub async fn smembers(&mut self, key: &str) -> io::Result<Vec<String>> {
        let reply = self.send_command(&["SMEMBERS", key]).await?;
        expect_text_array(reply)
    }

    /// All (member, score) pairs of a sorted set, in rank order. Scores
    /// come back as text and stay that way.
    pub async fn zrange_all_withscores(
        &mut self,
        key: &str,
    ) -> io::Result<Vec<(String, String)>> {
        let reply = self
            .send_command(&["ZRANGE", key, "0", "-1", "WITHSCORES"])
            .await?;
        pair_up(expect_text_array(reply)?)
    }

    // ------------------------------------------------------------------
    // Target-side writes
    // ------------------------------------------------------------------

    /// `SET key value`
    pub async fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        let reply = self.send_command(&["SET", key, value]).await?;
        expect_ok(reply)
    }

    /// `EXPIRE key seconds`
    pub async fn expire(&mut self, key: &str, seconds: i64) -> io::Result<()> {
        let secs = seconds.to_string();
        let reply = self.send_command(&["EXPIRE", key, &secs]).await?;
        expect_ok(reply)
    }

    /// `DEL key`
    pub async fn del(&mut self, key: &str) -> io::Result<()> {
        let reply = self.send_command(&["DEL", key]).await?;
        expect_ok(reply)
    }

    /// `RPUSH key value...`
    pub async fn rpush(&mut self, key: &str, values: &[String]) -> io::Result<()> {
        let mut args = vec!["RPUSH", key];
        args.extend(values.iter().map(String::as_str));
        let reply = self.send_command(&args).await?;
        expect_ok(reply)
    }

    /// `HSET key field value...`
    pub async fn hset(&mut self, key: &str, fields: &[(String, String)]) -> io::Result<()> {
        let mut args = vec!["HSET", key];
        for (field, value) in fields {
            args.push(field);
            args.push(value);
        }
        let reply = self.send_command(&args).await?;
        expect_ok(reply)
    }

    /// `SADD key member...`
    pub async fn sadd(&mut self, key: &str, members: &[String]) -> io::Result<()> {
        let mut args = vec!["SADD", key];
        args.extend(members.iter().map(String::as_str));
        let reply = self.send_command(&args).await?;
        expect_ok(reply)
    }

    /// `ZADD key score member...`
    pub async fn zadd(&mut self, key: &str, members: &[(String, String)]) -> io::Result<()> {
        let mut args = vec!["ZADD".to_string(), key.to_string()];
        for (member, score) in members {
            args.push(score.clone());
            args.push(member.clone());
        }
        let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
        let reply = self.send_command(&borrowed).await?;
        expect_ok(reply)
    }

    // ------------------------------------------------------------------
    // Wire plumbing
    // ------------------------------------------------------------------

    /// Send a command and read back a single reply frame.
    pub async fn send_command(&mut self, args: &[&str]) -> io::Result<Frame> {
        let mut cmd = format!("*{}\r\n", args.len());
        for arg in args {
            cmd.push_str(&format!("${}\r\n{}\r\n", arg.len(), arg));
        }

        self.writer.write_all(cmd.as_bytes()).await?;
        self.writer.flush().await?;

        read_frame(&mut self.reader).await
    }
}

/// Read one RESP frame from `reader`.
async fn read_frame<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Frame> {
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    if line.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection closed",
        ));
    }

    let line = line.trim_end_matches("\r\n").trim_end_matches('\n');

    match line.chars().next() {
        Some('+') => Ok(Frame::Simple(line[1..].to_string())),
        Some('-') => Ok(Frame::Error(line[1..].to_string())),
        Some(':') => {
            let n: i64 = line[1..]
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid integer"))?;
            Ok(Frame::Integer(n))
        }
        Some('$') => {
            let len: i64 = line[1..]
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid bulk length"))?;

            if len < 0 {
                return Ok(Frame::Null);
            }

            let len = len as usize;
            let mut buf = vec![0u8; len + 2]; // +2 for \r\n
            reader.read_exact(&mut buf).await?;
            buf.truncate(len);
            Ok(Frame::Bulk(Some(buf)))
        }
        Some('*') => {
            let count: i64 = line[1..]
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid array length"))?;

            if count < 0 {
                return Ok(Frame::Array(None));
            }

            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(Box::pin(read_frame(reader)).await?);
            }
            Ok(Frame::Array(Some(items)))
        }
        Some('_') => Ok(Frame::Null),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unknown RESP type: {}", line),
        )),
    }
}

// ----------------------------------------------------------------------
// Reply decoding
// ----------------------------------------------------------------------

fn other(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::Other, msg)
}

fn unexpected() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "unexpected reply type")
}

/// Accept any non-error reply as success. Write commands reply with +OK
/// or an integer count depending on the command.
fn expect_ok(frame: Frame) -> io::Result<()> {
    match frame {
        Frame::Error(msg) => Err(other(msg)),
        _ => Ok(()),
    }
}

fn expect_text(frame: Frame) -> io::Result<String> {
    match frame {
        Frame::Error(msg) => Err(other(msg)),
        frame => frame.into_text().ok_or_else(unexpected),
    }
}

fn expect_text_array(frame: Frame) -> io::Result<Vec<String>> {
    match frame {
        Frame::Array(Some(items)) => items
            .into_iter()
            .map(|item| item.into_text().ok_or_else(unexpected))
            .collect(),
        Frame::Array(None) => Ok(Vec::new()),
        Frame::Error(msg) => Err(other(msg)),
        _ => Err(unexpected()),
    }
}

/// Fold a flat reply (`[a, 1, b, 2]`) into pairs (`[(a,1), (b,2)]`), as
/// HGETALL and ZRANGE WITHSCORES return them.
fn pair_up(items: Vec<String>) -> io::Result<Vec<(String, String)>> {
    if items.len() % 2 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "odd number of elements in paired reply",
        ));
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(a), Some(b)) = (iter.next(), iter.next()) {
        pairs.push((a, b));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(bytes: &[u8]) -> io::Result<Frame> {
        let mut reader = BufReader::new(bytes);
        read_frame(&mut reader).await
    }

    #[tokio::test]
    async fn test_parse_simple() {
        assert_eq!(parse(b"+OK\r\n").await.unwrap(), Frame::Simple("OK".into()));
    }

    #[tokio::test]
    async fn test_parse_error() {
        assert_eq!(
            parse(b"-ERR no\r\n").await.unwrap(),
            Frame::Error("ERR no".into())
        );
    }

    #[tokio::test]
    async fn test_parse_integer() {
        assert_eq!(parse(b":42\r\n").await.unwrap(), Frame::Integer(42));
        assert_eq!(parse(b":-1\r\n").await.unwrap(), Frame::Integer(-1));
    }

    #[tokio::test]
    async fn test_parse_bulk() {
        assert_eq!(
            parse(b"$5\r\nhello\r\n").await.unwrap(),
            Frame::Bulk(Some(b"hello".to_vec()))
        );
    }

    #[tokio::test]
    async fn test_parse_nil_bulk() {
        assert_eq!(parse(b"$-1\r\n").await.unwrap(), Frame::Null);
    }

    #[tokio::test]
    async fn test_parse_array() {
        let frame = parse(b"*2\r\n$1\r\na\r\n:7\r\n").await.unwrap();
        assert_eq!(
            frame,
            Frame::Array(Some(vec![
                Frame::Bulk(Some(b"a".to_vec())),
                Frame::Integer(7),
            ]))
        );
    }

    #[tokio::test]
    async fn test_parse_nested_array() {
        let frame = parse(b"*1\r\n*1\r\n+x\r\n").await.unwrap();
        assert_eq!(
            frame,
            Frame::Array(Some(vec![Frame::Array(Some(vec![Frame::Simple(
                "x".into()
            )]))]))
        );
    }

    #[test]
    fn test_pair_up() {
        let pairs = pair_up(vec![
            "name".into(),
            "Ann".into(),
            "age".into(),
            "30".into(),
        ])
        .unwrap();
        assert_eq!(
            pairs,
            vec![("name".into(), "Ann".into()), ("age".into(), "30".into())]
        );
    }

    #[test]
    fn test_pair_up_odd_length() {
        assert!(pair_up(vec!["lonely".into()]).is_err());
    }

    #[test]
    fn test_frame_into_text() {
        assert_eq!(Frame::Simple("ok".into()).into_text(), Some("ok".into()));
        assert_eq!(
            Frame::Bulk(Some(b"v".to_vec())).into_text(),
            Some("v".into())
        );
        assert_eq!(Frame::Integer(1).into_text(), None);
    }
}
