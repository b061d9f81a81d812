//! The engine's listening side.
//!
//! The engine accepts one host connection at a time and serves its runs in
//! order. Each connection gets its own call client and caches.

use crate::client::{RemoteCallClient, RunEnd, SharedClient};
use crate::error::EngineResult;
use crate::game::GameApi;
use crate::script::ScriptEngine;
use simbridge_protocol::{FrameChannel, TcpTransport};
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Serves script runs requested by the host.
pub struct EngineServer<E: ScriptEngine> {
    listener: TcpListener,
    engine: E,
}

impl<E: ScriptEngine> EngineServer<E> {
    pub fn bind<A: ToSocketAddrs>(addr: A, engine: E) -> EngineResult<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener, engine })
    }

    pub fn local_addr(&self) -> EngineResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever. A failed connection is logged and the
    /// server waits for the host to reconnect.
    pub fn serve(&self) -> EngineResult<()> {
        loop {
            self.serve_next()?;
        }
    }

    /// Accepts one connection and serves it until the host disconnects.
    pub fn serve_next(&self) -> EngineResult<()> {
        let (stream, peer) = self.listener.accept()?;
        info!(%peer, "host connected");
        let transport = TcpTransport::accepted(stream)?;
        match self.serve_connection(Box::new(transport)) {
            Ok(runs) => info!(%peer, runs, "host disconnected"),
            Err(e) => warn!(%peer, error = %e, "connection failed"),
        }
        Ok(())
    }

    /// Serves runs over one channel until it closes. Returns the number of
    /// runs served.
    pub fn serve_connection(&self, channel: Box<dyn FrameChannel>) -> EngineResult<u64> {
        let client = RemoteCallClient::shared(channel);
        let game = GameApi::new(client.clone());
        let mut runs = 0;
        loop {
            let request = client.borrow_mut().next_run()?;
            let Some(request) = request else {
                return Ok(runs);
            };
            self.run_script(&client, &game, &request.script)?;
            runs += 1;
        }
    }

    fn run_script(&self, client: &SharedClient, game: &GameApi, source: &str) -> EngineResult<()> {
        let started = Instant::now();
        let end = match self.engine.compile(source) {
            Err(e) => RunEnd::CompileFailed(e.to_string()),
            Ok(program) => match self.engine.execute(&program, game) {
                Ok(()) => RunEnd::Completed,
                Err(e) => RunEnd::Exception(e.to_string()),
            },
        };
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            outcome = ?end,
            "run finished"
        );
        client.borrow_mut().end_run(&end)?;
        Ok(())
    }
}
