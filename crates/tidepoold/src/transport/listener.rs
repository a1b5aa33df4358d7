//! Listener implementation for protocol sockets.

use std::io;
use std::net::{TcpListener, ToSocketAddrs};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use tidepool_config::SocketEndpoint;

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};
use crate::diagnostics::Diagnostics;

#[cfg(unix)]
use super::hygiene::remove_stale_socket;
#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::os::unix::net::UnixListener;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to a socket endpoint but not yet accepting.
#[derive(Debug)]
pub struct SocketListener {
    endpoint: SocketEndpoint,
    listener: ListenerKind,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl SocketListener {
    /// Binds `endpoint`.
    ///
    /// Unix endpoints get their parent directory prepared and any stale entry
    /// at the socket path removed first; a failed removal lands in
    /// `diagnostics` and the bind proceeds.
    pub fn bind(
        endpoint: &SocketEndpoint,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, ListenerError> {
        match endpoint {
            SocketEndpoint::Tcp { host, port } => {
                let listener = bind_tcp(host, *port)?;
                Ok(Self {
                    endpoint: endpoint.clone(),
                    listener: ListenerKind::Tcp(listener),
                })
            }
            SocketEndpoint::Unix { path } => {
                #[cfg(unix)]
                {
                    endpoint
                        .prepare_filesystem()
                        .map_err(|source| ListenerError::Prepare { source })?;
                    diagnostics.extend_from(remove_stale_socket(path));
                    let listener = UnixListener::bind(path.as_std_path()).map_err(|source| {
                        ListenerError::BindUnix {
                            path: path.to_string(),
                            source,
                        }
                    })?;
                    Ok(Self {
                        endpoint: endpoint.clone(),
                        listener: ListenerKind::Unix(listener),
                    })
                }

                #[cfg(not(unix))]
                {
                    let _ = (path, diagnostics);
                    Err(ListenerError::UnsupportedUnix {
                        endpoint: endpoint.to_string(),
                    })
                }
            }
        }
    }

    /// Endpoint as bound. TCP endpoints report the port actually assigned,
    /// which differs from the configured one when port `0` was requested.
    #[must_use]
    pub fn bound_endpoint(&self) -> SocketEndpoint {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.local_addr().map_or_else(
                |_| self.endpoint.clone(),
                |addr| SocketEndpoint::tcp(addr.ip().to_string(), addr.port()),
            ),
            #[cfg(unix)]
            ListenerKind::Unix(_) => self.endpoint.clone(),
        }
    }

    /// Starts accepting connections on a background thread, handing each one
    /// to `handler` on its own session thread.
    pub fn start(
        mut self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let sessions = Arc::new(SessionRegistry::default());
        if let Err(error) = match &self.listener {
            ListenerKind::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            ListenerKind::Unix(listener) => listener.set_nonblocking(true),
        } {
            return Err(abandon_start(
                &self.endpoint,
                ListenerError::NonBlocking { source: error },
            ));
        }

        let endpoint = self.bound_endpoint();
        let configured = self.endpoint.clone();
        let shutdown_flag = Arc::clone(&shutdown);
        let registry = Arc::clone(&sessions);
        let accept = thread::Builder::new()
            .name("tidepool-accept".to_owned())
            .spawn(move || run_accept_loop(&mut self, &shutdown_flag, &handler, &registry))
            .map_err(|source| abandon_start(&configured, ListenerError::Spawn { source }))?;
        Ok(ListenerHandle {
            endpoint,
            shutdown,
            accept: Some(accept),
            sessions,
        })
    }
}

/// Handle to a running listener: its accept thread and every session thread.
pub struct ListenerHandle {
    endpoint: SocketEndpoint,
    shutdown: Arc<AtomicBool>,
    accept: Option<thread::JoinHandle<()>>,
    sessions: Arc<SessionRegistry>,
}

impl ListenerHandle {
    /// Endpoint the listener is bound to.
    #[must_use]
    pub fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Number of sessions whose threads have not finished.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions.active()
    }

    /// Stops accepting, ends every open session and waits for all threads.
    ///
    /// When this returns no session thread is running, so none can reach the
    /// engine any more. A Unix socket file is removed by the accept thread as
    /// it exits.
    pub fn stop(mut self) -> Result<(), ListenerError> {
        self.shutdown.store(true, Ordering::SeqCst);
        let accept_result = match self.accept.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        };

        let panicked = self.sessions.shutdown_and_join();
        info!(
            target: LISTENER_TARGET,
            endpoint = %self.endpoint,
            "socket listener stopped"
        );
        accept_result?;
        if panicked > 0 {
            return Err(ListenerError::SessionPanic { count: panicked });
        }
        Ok(())
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

struct Session {
    stream: ConnectionStream,
    thread: thread::JoinHandle<()>,
}

/// Live sessions, tracked so `stop` can end and join them.
#[derive(Default)]
struct SessionRegistry {
    sessions: Mutex<Vec<Session>>,
}

impl SessionRegistry {
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn track(&self, session: Session) {
        let mut sessions = self.lock();
        sessions.retain(|entry| !entry.thread.is_finished());
        sessions.push(session);
    }

    fn active(&self) -> usize {
        self.lock()
            .iter()
            .filter(|entry| !entry.thread.is_finished())
            .count()
    }

    /// Returns how many session threads panicked.
    fn shutdown_and_join(&self) -> usize {
        let sessions = std::mem::take(&mut *self.lock());
        for session in &sessions {
            if let Err(error) = session.stream.shutdown() {
                debug!(
                    target: LISTENER_TARGET,
                    error = %error,
                    "failed to shut down session stream"
                );
            }
        }
        sessions
            .into_iter()
            .map(|session| session.thread.join())
            .filter(Result::is_err)
            .count()
    }
}

fn run_accept_loop(
    listener: &mut SocketListener,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
    sessions: &SessionRegistry,
) {
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener) {
            Ok(Some(stream)) => {
                last_error = None;
                spawn_session(stream, handler, sessions);
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    #[cfg(unix)]
    cleanup_unix_socket(&listener.endpoint);
}

fn spawn_session(
    stream: ConnectionStream,
    handler: &Arc<dyn ConnectionHandler>,
    sessions: &SessionRegistry,
) {
    let control = match stream.try_clone() {
        Ok(control) => control,
        Err(error) => {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                "failed to clone session stream; dropping connection"
            );
            return;
        }
    };
    let handler = Arc::clone(handler);
    match thread::Builder::new()
        .name("tidepool-session".to_owned())
        .spawn(move || handler.handle(stream))
    {
        Ok(thread) => sessions.track(Session {
            stream: control,
            thread,
        }),
        Err(error) => warn!(
            target: LISTENER_TARGET,
            error = %error,
            "failed to spawn session thread; dropping connection"
        ),
    }
}

fn accept_connection(listener: &mut SocketListener) -> Result<Option<ConnectionStream>, io::Error> {
    match &listener.listener {
        ListenerKind::Tcp(tcp) => match tcp.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                Ok(Some(ConnectionStream::Tcp(stream)))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        },
        #[cfg(unix)]
        ListenerKind::Unix(unix) => match unix.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                Ok(Some(ConnectionStream::Unix(stream)))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        },
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_string(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

/// Removes the socket file of a listener that failed to start and hands the
/// failure back.
pub(super) fn abandon_start(endpoint: &SocketEndpoint, error: ListenerError) -> ListenerError {
    #[cfg(unix)]
    cleanup_unix_socket(endpoint);
    #[cfg(not(unix))]
    let _ = endpoint;
    error
}

#[cfg(unix)]
fn cleanup_unix_socket(endpoint: &SocketEndpoint) {
    let SocketEndpoint::Unix { path } = endpoint else {
        return;
    };
    if let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: LISTENER_TARGET,
            error = %error,
            path = %path,
            "failed to remove unix socket file"
        );
    }
}

#[cfg(test)]
impl SocketListener {
    pub(crate) fn local_addr(&self) -> Option<std::net::SocketAddr> {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            ListenerKind::Unix(_) => None,
        }
    }
}
