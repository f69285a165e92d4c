//! In-process FTP server on the loopback interface.
//!
//! Understands just enough of RFC 959 to accept uploads: `USER`, `PASS`,
//! `TYPE`, `PASV`, `EPSV`, `STOR` and `QUIT`. Everything else gets a 502.
//! Stored files are kept in memory keyed by their absolute remote path.
//! [`StorBehavior`] makes `STOR` fail on purpose.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// How the server answers `STOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorBehavior {
    #[default]
    Accept,
    /// Refuse up front with this reply code; the data connection is never accepted.
    Reject(u16),
    /// Accept and drain the data connection, then answer `426` and keep nothing.
    Abort,
}

#[derive(Debug, Default)]
struct MockState {
    files: BTreeMap<String, Vec<u8>>,
    connections: usize,
    quits: usize,
    stor: StorBehavior,
}

pub struct MockFtpServer {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
    accept_task: JoinHandle<()>,
}

impl MockFtpServer {
    /// Bind `127.0.0.1:0` and start serving. Only `user`/`password` may log in.
    pub async fn start(user: &str, password: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(MockState::default()));
        let credentials = Arc::new((user.to_string(), password.to_string()));

        let accept_state = state.clone();
        let accept_task = tokio::spawn(async move {
            while let Ok((sock, _)) = listener.accept().await {
                lock(&accept_state).connections += 1;
                let state = accept_state.clone();
                let credentials = credentials.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_session(sock, state, credentials).await {
                        log::debug!("mock ftp session ended: {}", e);
                    }
                });
            }
        });

        Ok(Self {
            addr,
            state,
            accept_task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        lock(&self.state).files.clone()
    }

    pub fn file(&self, remote_path: &str) -> Option<Vec<u8>> {
        lock(&self.state).files.get(remote_path).cloned()
    }

    /// Control connections accepted so far.
    pub fn connection_count(&self) -> usize {
        lock(&self.state).connections
    }

    pub fn set_stor_behavior(&self, behavior: StorBehavior) {
        lock(&self.state).stor = behavior;
    }

    /// `QUIT` commands received so far.
    pub fn quit_count(&self) -> usize {
        lock(&self.state).quits
    }
}

impl Drop for MockFtpServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

fn lock(state: &Mutex<MockState>) -> std::sync::MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn absolute(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

async fn serve_session(
    sock: TcpStream,
    state: Arc<Mutex<MockState>>,
    credentials: Arc<(String, String)>,
) -> std::io::Result<()> {
    let (rd, mut wr) = sock.into_split();
    let mut lines = BufReader::new(rd).lines();
    let mut user: Option<String> = None;
    let mut logged_in = false;
    let mut pending_data: Option<TcpListener> = None;

    wr.write_all(b"220-uplift mock ftp\r\n220 ready\r\n").await?;

    while let Some(line) = lines.next_line().await? {
        let (verb, arg) = match line.split_once(' ') {
            Some((v, a)) => (v.to_ascii_uppercase(), a.trim().to_string()),
            None => (line.trim().to_ascii_uppercase(), String::new()),
        };

        let reply: String = match verb.as_str() {
            "USER" => {
                user = Some(arg);
                logged_in = false;
                "331 Password required".into()
            }
            "PASS" => {
                if user.as_deref() == Some(credentials.0.as_str()) && arg == credentials.1 {
                    logged_in = true;
                    "230 Logged in".into()
                } else {
                    "530 Login incorrect".into()
                }
            }
            _ if !logged_in && verb != "QUIT" => "530 Not logged in".into(),
            "TYPE" => "200 Type set".into(),
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                pending_data = Some(listener);
                format!("227 Entering Passive Mode (127,0,0,1,{},{})", port / 256, port % 256)
            }
            "EPSV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                pending_data = Some(listener);
                format!("229 Entering Extended Passive Mode (|||{}|)", port)
            }
            "STOR" => {
                let behavior = lock(&state).stor;
                match (pending_data.take(), behavior) {
                    (None, _) => "425 Use PASV or EPSV first".into(),
                    (Some(_), StorBehavior::Reject(code)) => {
                        format!("{} Requested action not taken", code)
                    }
                    (Some(listener), behavior) => {
                        wr.write_all(b"150 Opening data connection\r\n").await?;
                        let (mut data, _) = listener.accept().await?;
                        let mut body = Vec::new();
                        data.read_to_end(&mut body).await?;
                        if behavior == StorBehavior::Abort {
                            "426 Connection closed; transfer aborted".into()
                        } else {
                            lock(&state).files.insert(absolute(&arg), body);
                            "226 Transfer complete".into()
                        }
                    }
                }
            }
            "QUIT" => {
                lock(&state).quits += 1;
                wr.write_all(b"221 Bye\r\n").await?;
                break;
            }
            _ => "502 Command not implemented".into(),
        };
        wr.write_all(format!("{}\r\n", reply).as_bytes()).await?;
    }
    Ok(())
}
