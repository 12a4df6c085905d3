//! Scripted in-process transport for engine tests.
//!
//! Routes are keyed by full URL. Every connect and every request is recorded
//! so tests can assert what was (and was not) sent, and every body byte read
//! is counted so tests can assert that nothing was transferred.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use fetchkit_core::transport::{
    BodyStream, FtpConnection, HttpConnection, HttpRequest, HttpResponse, RemoteFile, Transport,
};
use fetchkit_core::{ClientConfig, FetchError, Fetcher, Locator};

/// A scripted HTTP response.
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub chunks: Vec<Vec<u8>>,
    /// Respond with the request body instead of `chunks`.
    pub echo: bool,
    /// Fail with a connection reset after this many chunks.
    pub fail_after: Option<usize>,
}

impl Route {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            status: 200,
            chunks: vec![body.to_vec()],
            ..Self::default()
        }
        .with_header("Content-Length", &body.len().to_string())
    }

    pub fn chunked(chunks: Vec<Vec<u8>>) -> Self {
        let total: usize = chunks.iter().map(Vec::len).sum();
        Self {
            status: 200,
            chunks,
            ..Self::default()
        }
        .with_header("Content-Length", &total.to_string())
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self {
            status,
            ..Self::default()
        }
        .with_header("Location", location)
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn echo() -> Self {
        Self {
            status: 200,
            echo: true,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }
}

/// A scripted FTP directory entry.
#[derive(Debug, Clone)]
pub struct FtpEntry {
    pub name: String,
    pub content: Vec<u8>,
    pub modified: Option<SystemTime>,
    /// Serve only this many bytes, then report the transfer as aborted.
    pub cut_at: Option<usize>,
}

/// One request as the transport saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub verb: String,
    pub url: String,
    pub headers: String,
    pub body: Vec<u8>,
    pub user_agent: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    ftp_entries: Arc<Mutex<HashMap<String, FtpEntry>>>,
    sent: Arc<Mutex<Vec<SentRequest>>>,
    connects: Arc<AtomicUsize>,
    bytes_read: Arc<AtomicU64>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, route: Route) -> &Self {
        self.routes.lock().unwrap().insert(url.to_string(), route);
        self
    }

    pub fn ftp_file(&self, path: &str, content: &[u8], modified: Option<SystemTime>) -> &Self {
        self.insert_ftp(path, content, modified, None)
    }

    /// Lists the full size, but the data connection closes after `cut_at`
    /// bytes and the server then replies 426.
    pub fn ftp_aborted_file(&self, path: &str, content: &[u8], cut_at: usize) -> &Self {
        self.insert_ftp(path, content, None, Some(cut_at))
    }

    fn insert_ftp(
        &self,
        path: &str,
        content: &[u8],
        modified: Option<SystemTime>,
        cut_at: Option<usize>,
    ) -> &Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        self.ftp_entries.lock().unwrap().insert(
            path.to_string(),
            FtpEntry {
                name,
                content: content.to_vec(),
                modified,
                cut_at,
            },
        );
        self
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.url).collect()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::SeqCst)
    }

    pub fn fetcher(&self) -> Fetcher<ScriptedTransport> {
        self.fetcher_with(ClientConfig::default())
    }

    pub fn fetcher_with(&self, config: ClientConfig) -> Fetcher<ScriptedTransport> {
        Fetcher::with_transport(self.clone(), config)
    }
}

impl Transport for ScriptedTransport {
    fn connect_http(
        &self,
        _locator: &Locator,
        user_agent: &str,
    ) -> Result<Box<dyn HttpConnection + '_>, FetchError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedConnection {
            transport: self,
            user_agent: user_agent.to_string(),
        }))
    }

    fn connect_ftp(
        &self,
        _locator: &Locator,
        _user_agent: &str,
    ) -> Result<Box<dyn FtpConnection + '_>, FetchError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedFtp { transport: self }))
    }
}

struct ScriptedConnection<'a> {
    transport: &'a ScriptedTransport,
    user_agent: String,
}

impl HttpConnection for ScriptedConnection<'_> {
    fn send(&mut self, request: &HttpRequest<'_>) -> Result<Box<dyn HttpResponse>, FetchError> {
        let url = request.locator.as_str().to_string();
        self.transport.sent.lock().unwrap().push(SentRequest {
            verb: request.verb.to_string(),
            url: url.clone(),
            headers: request.headers.to_string(),
            body: request.body.to_vec(),
            user_agent: self.user_agent.clone(),
        });

        let route = self
            .transport
            .routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Route::status(404));
        let chunks = if route.echo {
            vec![request.body.to_vec()]
        } else {
            route.chunks
        };

        Ok(Box::new(ScriptedResponse {
            status: route.status,
            headers: route.headers,
            chunks: chunks.into_iter().filter(|c| !c.is_empty()).collect(),
            fail_after: route.fail_after,
            served: 0,
            bytes_read: Arc::clone(&self.transport.bytes_read),
        }))
    }
}

struct ScriptedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    chunks: VecDeque<Vec<u8>>,
    fail_after: Option<usize>,
    served: usize,
    bytes_read: Arc<AtomicU64>,
}

impl Read for ScriptedResponse {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_after == Some(self.served) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "scripted reset"));
        }
        let Some(mut chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.chunks.push_front(chunk.split_off(n));
        } else {
            self.served += 1;
        }
        self.bytes_read.fetch_add(n as u64, Ordering::SeqCst);
        Ok(n)
    }
}

impl HttpResponse for ScriptedResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    fn raw_headers(&self) -> String {
        let mut raw = format!("HTTP/1.1 {}\n", self.status);
        for (name, value) in &self.headers {
            raw.push_str(&format!("{name}: {value}\n"));
        }
        raw
    }
}

struct ScriptedFtp<'a> {
    transport: &'a ScriptedTransport,
}

impl FtpConnection for ScriptedFtp<'_> {
    fn lookup(&mut self, path: &str) -> Result<Option<RemoteFile>, FetchError> {
        Ok(self
            .transport
            .ftp_entries
            .lock()
            .unwrap()
            .get(path)
            .map(|entry| RemoteFile {
                name: entry.name.clone(),
                size: Some(entry.content.len() as u64),
                modified: entry.modified,
            }))
    }

    fn retrieve(&mut self, path: &str) -> Result<Box<dyn BodyStream + '_>, FetchError> {
        let entry = self
            .transport
            .ftp_entries
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::request_failed(path, "550 no such file"))?;
        let mut content = entry.content;
        if let Some(cut_at) = entry.cut_at {
            content.truncate(cut_at);
        }
        Ok(Box::new(CountingReader {
            inner: Cursor::new(content),
            bytes_read: Arc::clone(&self.transport.bytes_read),
            aborted: entry.cut_at.is_some().then(|| path.to_string()),
        }))
    }
}

struct CountingReader<R> {
    inner: R,
    bytes_read: Arc<AtomicU64>,
    /// Path whose closing reply reports an aborted transfer.
    aborted: Option<String>,
}

impl<R: Read> BodyStream for CountingReader<R> {
    fn finish(&mut self) -> Result<(), FetchError> {
        match &self.aborted {
            Some(path) => Err(FetchError::read(
                path.as_str(),
                io::Error::other("426 transfer aborted"),
            )),
            None => Ok(()),
        }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read.fetch_add(n as u64, Ordering::SeqCst);
        Ok(n)
    }
}

/// A fixed remote modification time, whole seconds so it survives HTTP-date
/// formatting.
pub fn remote_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000)
}
