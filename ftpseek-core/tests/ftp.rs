//! Integration tests for the FTP transport
//!
//! A scripted FTP server runs on localhost and answers just enough of the
//! protocol for login, listing and retrieval.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ftpseek_common::{Credentials, EntryKind, ServerEndpoint};
use ftpseek_core::{FtpTransport, Retriever, RetrieveError, Transport, TransportError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

const TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Scripted server
// ============================================================================

struct FakeServer {
    /// Directory → raw LIST output
    dirs: HashMap<String, String>,
    /// Absolute path → contents
    files: HashMap<String, Vec<u8>>,
    password: String,
    epsv: bool,
}

impl FakeServer {
    fn archive() -> Self {
        let mut dirs = HashMap::new();
        dirs.insert(
            "/".to_string(),
            "drwxr-xr-x 2 ftp ftp 4096 Jan  1  2020 pub\r\n".to_string(),
        );
        dirs.insert(
            "/pub".to_string(),
            "total 8\r\n\
             drwxr-xr-x 2 ftp ftp 4096 Jan  1  2020 trends\r\n\
             -rw-r--r-- 1 ftp ftp    6 Jan  1  2020 README\r\n"
                .to_string(),
        );
        dirs.insert(
            "/pub/trends".to_string(),
            "-rw-r--r-- 1 ftp ftp   10 Mar  5  2024 co2.txt\r\n".to_string(),
        );

        let mut files = HashMap::new();
        files.insert("/pub/README".to_string(), b"readme".to_vec());
        files.insert("/pub/trends/co2.txt".to_string(), b"0123456789".to_vec());

        Self {
            dirs,
            files,
            password: "anonymous".to_string(),
            epsv: true,
        }
    }

    async fn start(self) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = Arc::new(self);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle(stream, Arc::clone(&server)));
            }
        });
        port
    }
}

async fn bind_data() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn handle(stream: TcpStream, server: Arc<FakeServer>) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    write
        .write_all(b"220-Welcome\r\n220 Fake FTP ready\r\n")
        .await
        .unwrap();

    let mut data: Option<TcpListener> = None;
    let mut cwd = "/".to_string();
    let mut rest = 0usize;

    while let Ok(Some(line)) = lines.next_line().await {
        let (command, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        let reply = match command {
            "USER" => "331 Password required".to_string(),
            "PASS" if arg == server.password => "230 Logged in".to_string(),
            "PASS" => "530 Login incorrect".to_string(),
            "TYPE" => "200 Type set to I".to_string(),
            "CWD" if server.dirs.contains_key(arg) => {
                cwd = arg.to_string();
                "250 Directory changed".to_string()
            }
            "CWD" => "550 No such directory".to_string(),
            "EPSV" if server.epsv => {
                let (listener, port) = bind_data().await;
                data = Some(listener);
                format!("229 Entering Extended Passive Mode (|||{port}|)")
            }
            "PASV" => {
                let (listener, port) = bind_data().await;
                data = Some(listener);
                format!(
                    "227 Entering Passive Mode (10,0,0,99,{},{})",
                    port / 256,
                    port % 256
                )
            }
            "REST" => {
                rest = arg.parse().unwrap();
                format!("350 Restarting at {rest}")
            }
            "LIST" => {
                let body = server.dirs.get(&cwd).cloned().unwrap_or_default();
                send_data(&mut write, data.take(), body.as_bytes()).await;
                "226 Transfer complete".to_string()
            }
            "RETR" => match server.files.get(arg) {
                Some(contents) => {
                    let start = rest.min(contents.len());
                    rest = 0;
                    send_data(&mut write, data.take(), &contents[start..]).await;
                    "226 Transfer complete".to_string()
                }
                None => "550 No such file".to_string(),
            },
            "QUIT" => {
                let _ = write.write_all(b"221 Goodbye\r\n").await;
                return;
            }
            _ => "502 Command not implemented".to_string(),
        };
        if write
            .write_all(format!("{reply}\r\n").as_bytes())
            .await
            .is_err()
        {
            return;
        }
    }
}

async fn send_data(
    control: &mut tokio::net::tcp::OwnedWriteHalf,
    listener: Option<TcpListener>,
    body: &[u8],
) {
    let listener = listener.expect("data connection opened first");
    control
        .write_all(b"150 Opening data connection\r\n")
        .await
        .unwrap();
    let (mut stream, _) = listener.accept().await.unwrap();
    stream.write_all(body).await.unwrap();
    stream.shutdown().await.unwrap();
}

async fn login(port: u16) -> Box<dyn ftpseek_core::Session> {
    let mut session = FtpTransport::new()
        .connect("127.0.0.1", port, TIMEOUT)
        .await
        .unwrap();
    session
        .authenticate(&Credentials::new("anonymous", "anonymous"))
        .await
        .unwrap();
    session
}

// ============================================================================
// Session operations
// ============================================================================

#[tokio::test]
async fn test_list_directory() {
    let port = FakeServer::archive().start().await;
    let mut session = login(port).await;

    let entries = session.list("/pub").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "trends");
    assert_eq!(entries[0].kind, EntryKind::Directory);
    assert_eq!(entries[1].name, "README");
    assert_eq!(entries[1].size, 6);

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_list_missing_directory() {
    let port = FakeServer::archive().start().await;
    let mut session = login(port).await;

    let result = session.list("/nope").await;
    assert!(matches!(result, Err(TransportError::NoSuchPath(path)) if path == "/nope"));

    // The session is still usable afterwards
    assert!(session.list("/").await.is_ok());
}

#[tokio::test]
async fn test_retrieve_with_offset() {
    let port = FakeServer::archive().start().await;
    let mut session = login(port).await;

    let mut out = Vec::new();
    let written = session
        .retrieve("/pub/trends/co2.txt", 7, &mut out)
        .await
        .unwrap();
    assert_eq!(written, 3);
    assert_eq!(out, b"789");

    let mut whole = Vec::new();
    session.retrieve("/pub/README", 0, &mut whole).await.unwrap();
    assert_eq!(whole, b"readme");
}

#[tokio::test]
async fn test_retrieve_missing_file() {
    let port = FakeServer::archive().start().await;
    let mut session = login(port).await;

    let result = session.retrieve("/pub/nothing", 0, &mut Vec::new()).await;
    assert!(matches!(result, Err(TransportError::NoSuchPath(_))));
}

#[tokio::test]
async fn test_pasv_fallback_uses_control_peer() {
    let mut server = FakeServer::archive();
    server.epsv = false;
    let port = server.start().await;
    let mut session = login(port).await;

    // The PASV reply advertises an unreachable 10.0.0.99
    let entries = session.list("/").await.unwrap();
    assert_eq!(entries[0].name, "pub");
}

#[tokio::test]
async fn test_wrong_password() {
    let port = FakeServer::archive().start().await;
    let mut session = FtpTransport::new()
        .connect("127.0.0.1", port, TIMEOUT)
        .await
        .unwrap();

    let result = session
        .authenticate(&Credentials::new("anonymous", "wrong"))
        .await;
    assert!(matches!(result, Err(TransportError::Auth(reply)) if reply.starts_with("530")));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        // Accept and never send a greeting
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let result = FtpTransport::new()
        .connect("127.0.0.1", port, Duration::from_millis(200))
        .await;
    assert!(matches!(
        result,
        Err(TransportError::Timeout {
            operation: "greeting",
            ..
        })
    ));
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_retriever_over_ftp() {
    let port = FakeServer::archive().start().await;
    let endpoint = ServerEndpoint::new("localhost", Credentials::new("anonymous", "anonymous"), 2)
        .unwrap()
        .with_port(port)
        .with_timeout(TIMEOUT)
        .unwrap();
    let retriever = Retriever::new(endpoint, Arc::new(FtpTransport::new()));

    let data = retriever.get("co2.txt", "", 5).await.unwrap();
    assert_eq!(data, b"56789");

    let entry = retriever.get_meta("README", "/pub").await.unwrap();
    assert_eq!(entry.path, "/pub");
    assert_eq!(entry.size, 6);

    let missing = retriever.get_meta("ch4.txt", "/pub").await;
    assert!(matches!(missing, Err(RetrieveError::NotFound { .. })));
}
