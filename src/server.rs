//! Query server over a Unix domain socket.
//!
//! Clients connect, send a single length-prefixed request whose body is a
//! NUL-separated argv, and pass their own stdout and stderr file
//! descriptors as `SCM_RIGHTS` ancillary data. The server redirects its
//! output to those descriptors for the duration of the request, dispatches
//! on `argv[0]`, reports the exit status in the output text, and closes the
//! connection. The server itself loops forever; the socket path is removed
//! both on bind (a stale socket from a crashed server) and on drop.

use std::io::{IoSliceMut, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::{UnixListener, UnixStream};

use camino::{Utf8Path, Utf8PathBuf};
use miette::{bail, ensure, Result};
use nix::sys::socket::{recvmsg, ControlMessageOwned, MsgFlags, UnixAddr};
use nix::unistd::{close, dup, dup2};

use crate::desc;
use crate::diagnostics::ResultExt;
use crate::graph::BuildGraph;
use crate::label::Label;
use crate::resolved::ResolvedTargetData;
use crate::source_dir::SourceDir;

/// Largest accepted request body.
const MAX_REQUEST: usize = 4096;

/// A bound query server over an already-resolved graph.
pub struct QueryServer<'g> {
    listener: UnixListener,
    socket_path: Utf8PathBuf,
    graph: &'g BuildGraph,
    default_toolchain: Label,
}

impl<'g> QueryServer<'g> {
    /// Bind the server socket, replacing a stale socket file if present.
    ///
    /// # Errors
    ///
    /// Returns an error when the socket cannot be bound.
    pub fn bind(
        socket_path: &Utf8Path,
        graph: &'g BuildGraph,
        default_toolchain: Label,
    ) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .diag_with(|| format!("failed to remove stale socket {socket_path}"))?;
        }
        let listener = UnixListener::bind(socket_path)
            .diag_with(|| format!("failed to bind server socket {socket_path}"))?;
        tracing::info!(path = %socket_path, "query server listening");
        Ok(Self {
            listener,
            socket_path: socket_path.to_owned(),
            graph,
            default_toolchain,
        })
    }

    /// Accept and serve clients until the process is killed.
    ///
    /// # Errors
    ///
    /// Never returns `Ok`; an `Err` means the listener itself failed.
    pub fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if let Err(error) = self.handle_client(&stream) {
                        tracing::error!(%error, "client request failed");
                    }
                }
                Err(error) => {
                    tracing::error!(%error, "failed to accept client connection");
                }
            }
        }
    }

    fn handle_client(&self, stream: &UnixStream) -> Result<()> {
        let request = receive_request(stream)?;
        let (status, output) = self.dispatch(&request.args);

        let redirect =
            RedirectStdoutAndStderr::new(request.stdout.raw(), request.stderr.raw())
                .diag("failed to redirect output to client")?;
        print!("{output}");
        println!("exit_code: {status}");
        drop(redirect);
        Ok(())
    }

    fn dispatch(&self, args: &[String]) -> (i32, String) {
        match args.first().map(String::as_str) {
            Some("desc") => self.run_desc(args.get(1)),
            Some(other) => (1, format!("unsupported query command: {other}\n")),
            None => (1, "empty request\n".to_owned()),
        }
    }

    fn run_desc(&self, spec: Option<&String>) -> (i32, String) {
        let Some(spec) = spec else {
            return (1, "desc requires a target label\n".to_owned());
        };
        let label = match Label::resolve(
            &SourceDir::source_root(),
            Some(&self.default_toolchain),
            spec,
        ) {
            Ok(label) => label,
            Err(error) => return (1, format!("{error}\n")),
        };
        let Some(id) = self.graph.lookup(&label) else {
            return (1, format!("no target named {spec}\n"));
        };
        let data = ResolvedTargetData::new(self.graph);
        (0, desc::describe(self.graph, &data, id, &self.default_toolchain))
    }
}

impl Drop for QueryServer<'_> {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_file(&self.socket_path) {
            tracing::warn!(path = %self.socket_path, %error, "failed to unlink server socket");
        }
    }
}

/// A file descriptor received over the socket, closed on drop.
struct ReceivedFd(std::os::fd::RawFd);

impl ReceivedFd {
    fn raw(&self) -> std::os::fd::RawFd {
        self.0
    }
}

impl Drop for ReceivedFd {
    fn drop(&mut self) {
        let _ = close(self.0);
    }
}

struct Request {
    args: Vec<String>,
    stdout: ReceivedFd,
    stderr: ReceivedFd,
}

/// Read the single request a client sends: `u32` length, NUL-separated
/// argv, and exactly two `SCM_RIGHTS` descriptors.
fn receive_request(stream: &UnixStream) -> Result<Request> {
    let mut buf = [0u8; MAX_REQUEST + 4];
    let mut iov = [IoSliceMut::new(&mut buf)];
    let mut cmsg_buffer = nix::cmsg_space!([std::os::fd::RawFd; 2]);

    let (received, fds) = {
        let message = recvmsg::<UnixAddr>(
            stream.as_raw_fd(),
            &mut iov,
            Some(&mut cmsg_buffer),
            MsgFlags::empty(),
        )
        .diag("failed to receive request from client")?;
        let mut fds = Vec::new();
        for cmsg in message.cmsgs().diag("bad control message")? {
            if let ControlMessageOwned::ScmRights(received) = cmsg {
                fds.extend(received);
            }
        }
        (message.bytes, fds)
    };
    let mut fds = fds.into_iter().map(ReceivedFd);

    let (Some(stdout), Some(stderr), None) = (fds.next(), fds.next(), fds.next()) else {
        bail!("expected exactly two file descriptors (client stdout and stderr)");
    };

    ensure!(received >= 4, "request too short for its length prefix");
    let data = &buf[..received];
    let arg_len = u32::from_le_bytes(data[..4].try_into().expect("4-byte prefix")) as usize;
    ensure!(
        arg_len <= data.len() - 4,
        "request length {arg_len} exceeds received {}",
        data.len() - 4
    );
    let args = split_args(&data[4..4 + arg_len]);

    Ok(Request {
        args,
        stdout,
        stderr,
    })
}

/// Split a NUL-separated argv buffer, dropping empty entries.
fn split_args(data: &[u8]) -> Vec<String> {
    data.split(|byte| *byte == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}

/// Point this process's stdout and stderr at the client's descriptors,
/// restoring the originals on drop.
struct RedirectStdoutAndStderr {
    saved_stdout: std::os::fd::RawFd,
    saved_stderr: std::os::fd::RawFd,
}

impl RedirectStdoutAndStderr {
    fn new(out_fd: std::os::fd::RawFd, err_fd: std::os::fd::RawFd) -> nix::Result<Self> {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        let stdout_fd = std::io::stdout().as_raw_fd();
        let stderr_fd = std::io::stderr().as_raw_fd();
        let saved_stdout = dup(stdout_fd)?;
        let saved_stderr = dup(stderr_fd)?;
        dup2(out_fd, stdout_fd)?;
        dup2(err_fd, stderr_fd)?;
        Ok(Self {
            saved_stdout,
            saved_stderr,
        })
    }
}

impl Drop for RedirectStdoutAndStderr {
    fn drop(&mut self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        let _ = dup2(self.saved_stdout, std::io::stdout().as_raw_fd());
        let _ = dup2(self.saved_stderr, std::io::stderr().as_raw_fd());
        let _ = close(self.saved_stdout);
        let _ = close(self.saved_stderr);
    }
}
