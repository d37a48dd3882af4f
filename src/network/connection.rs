//! Datagram endpoint di rendezvous directory
//!
//! Setiap process punya satu endpoint. Relay di `relay.sock`, watcher di
//! `<pid>.sock`, jadi process id sekaligus alamat.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mio::event::Source;
use mio::net::UnixDatagram;
use mio::{Interest, Registry, Token};

use crate::config::client_path;
use crate::core::Transport;

/// Non-blocking Unix datagram socket bound to a path it owns
///
/// File socket dihapus saat endpoint di-drop.
#[derive(Debug)]
pub struct Endpoint {
    socket: UnixDatagram,
    path: PathBuf,
}

impl Endpoint {
    /// Bind ke `path`, menghapus file socket lama jika ada
    pub fn bind(path: &Path) -> io::Result<Self> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let socket = UnixDatagram::bind(path)?;
        Ok(Self {
            socket,
            path: path.to_path_buf(),
        })
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Kirim satu datagram utuh ke `dst`
    pub fn send_to(&self, datagram: &[u8], dst: &Path) -> io::Result<()> {
        let n = self.socket.send_to(datagram, dst)?;
        if n != datagram.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short datagram write: {} of {} bytes", n, datagram.len()),
            ));
        }
        Ok(())
    }

    /// Baca satu datagram. `Ok(None)` berarti socket sudah kosong.
    #[inline]
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv(buf) {
            Ok(n) => Ok(Some(n)),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Source for Endpoint {
    fn register(&mut self, registry: &Registry, token: Token, interests: Interest) -> io::Result<()> {
        self.socket.register(registry, token, interests)
    }

    fn reregister(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> io::Result<()> {
        self.socket.reregister(registry, token, interests)
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        self.socket.deregister(registry)
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Transport relay: process id -> `<dir>/<pid>.sock`
pub struct UnixTransport<'a> {
    endpoint: &'a Endpoint,
    dir: &'a Path,
}

impl<'a> UnixTransport<'a> {
    pub fn new(endpoint: &'a Endpoint, dir: &'a Path) -> Self {
        Self { endpoint, dir }
    }
}

impl Transport for UnixTransport<'_> {
    fn send_to(&mut self, pid: u32, datagram: &[u8]) -> io::Result<()> {
        self.endpoint.send_to(datagram, &client_path(self.dir, pid))
    }
}
