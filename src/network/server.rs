//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::engine::Engine;
use crate::error::Result;

use super::Connection;

/// TCP server for RelayKV
///
/// No connection cap and no idle timeout: every accepted socket gets a
/// thread that lives until the peer disconnects or sends garbage.
pub struct Server {
    engine: Arc<Engine>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listen address from the engine's config
    pub fn bind(engine: Arc<Engine>) -> Result<Self> {
        let config = engine.config();
        config.validate()?;
        let listener = TcpListener::bind(&config.listen_addr)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            engine,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that can stop `run` from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            addr: self.local_addr,
        }
    }

    /// Start the server (blocking)
    ///
    /// Returns once shutdown has been requested. Connections already running
    /// keep going until their clients leave.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr);

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            match stream {
                Ok(stream) => self.spawn_connection(stream),
                Err(e) => tracing::warn!("Failed to accept connection: {}", e),
            }
        }

        tracing::info!("Accept loop on {} stopped", self.local_addr);
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream) {
        let engine = Arc::clone(&self.engine);
        let spawned = thread::Builder::new()
            .name("relaykv-conn".to_string())
            .spawn(move || match Connection::from_tcp(stream, engine) {
                Ok(connection) => {
                    // handle() logs its own failures
                    let _ = connection.handle();
                }
                Err(e) => tracing::warn!("Failed to set up connection: {}", e),
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn connection thread: {}", e);
        }
    }
}

/// Stops a running [`Server`]
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting connections
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);

        // accept() is blocking; poke it so the loop sees the flag.
        let mut wake = self.addr;
        if wake.ip().is_unspecified() {
            wake.set_ip(match wake {
                SocketAddr::V4(_) => std::net::Ipv4Addr::LOCALHOST.into(),
                SocketAddr::V6(_) => std::net::Ipv6Addr::LOCALHOST.into(),
            });
        }
        let _ = TcpStream::connect(wake);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
