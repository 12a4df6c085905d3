//! FTP transport backed by `suppaftp`.
//!
//! Passive mode, binary transfers. Logs in with the locator's credentials
//! or anonymously.

use std::io::{self, Read};
use std::net::ToSocketAddrs;
use std::time::{Duration, UNIX_EPOCH};

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpResult, FtpStream, Status};
use tracing::{debug, warn};

use super::{BodyStream, FtpConnection, RemoteFile};
use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::locator::Locator;

const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

pub(super) struct SuppaConnection {
    stream: FtpStream,
    url: String,
}

impl SuppaConnection {
    pub(super) fn open(locator: &Locator, config: &ClientConfig) -> Result<Self, FetchError> {
        let host = locator.host();
        let port = locator.port();
        let connection_error = |message: String| FetchError::connection(host, port, message);

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| connection_error(e.to_string()))?
            .next()
            .ok_or_else(|| connection_error("host resolved to no addresses".to_string()))?;

        debug!(host = %host, port, "opening FTP connection");
        let mut stream = FtpStream::connect_timeout(addr, config.connect_timeout)
            .map_err(|e| connection_error(e.to_string()))?;
        if let Err(e) = stream.get_ref().set_read_timeout(Some(config.read_timeout)) {
            debug!(error = %e, "could not set FTP read timeout");
        }

        let (user, password) = match locator.credentials() {
            Some(credentials) => (
                credentials.username.as_str(),
                credentials.password.as_deref().unwrap_or(""),
            ),
            None => (ANONYMOUS_USER, ANONYMOUS_PASSWORD),
        };
        stream
            .login(user, password)
            .map_err(|e| connection_error(format!("login failed: {e}")))?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| FetchError::request_failed(locator.as_str(), e.to_string()))?;

        Ok(Self {
            stream,
            url: locator.as_str().to_string(),
        })
    }
}

impl FtpConnection for SuppaConnection {
    fn lookup(&mut self, path: &str) -> Result<Option<RemoteFile>, FetchError> {
        let Some(name) = listed_name(self.stream.nlst(Some(path)), &self.url)? else {
            return Ok(None);
        };

        let size = self
            .stream
            .size(path)
            .ok()
            .and_then(|s| u64::try_from(s).ok());
        let modified = self.stream.mdtm(path).ok().and_then(|mtime| {
            let secs = u64::try_from(mtime.and_utc().timestamp()).ok()?;
            UNIX_EPOCH.checked_add(Duration::from_secs(secs))
        });

        Ok(Some(RemoteFile {
            name,
            size,
            modified,
        }))
    }

    fn retrieve(&mut self, path: &str) -> Result<Box<dyn BodyStream + '_>, FetchError> {
        let data = self
            .stream
            .retr_as_stream(path)
            .map_err(|e| FetchError::request_failed(self.url.as_str(), e.to_string()))?;
        Ok(Box::new(FtpDownload {
            data: Some(data),
            control: &mut self.stream,
            url: &self.url,
        }))
    }
}

/// Entry name from an `NLST` reply.
///
/// Only a 550 reply or an empty listing means the file is absent; any other
/// failure is a request error.
fn listed_name(listing: FtpResult<Vec<String>>, url: &str) -> Result<Option<String>, FetchError> {
    let entries = match listing {
        Ok(entries) => entries,
        Err(FtpError::UnexpectedResponse(response))
            if matches!(response.status, Status::FileUnavailable) =>
        {
            debug!(url = %url, "FTP listing reports file unavailable");
            return Ok(None);
        }
        Err(e) => return Err(FetchError::request_failed(url, format!("listing failed: {e}"))),
    };
    Ok(entries
        .iter()
        .map(|entry| entry.trim())
        .find(|entry| !entry.is_empty())
        .map(|entry| entry.rsplit('/').next().unwrap_or(entry).to_string()))
}

impl Drop for SuppaConnection {
    fn drop(&mut self) {
        if let Err(e) = self.stream.quit() {
            debug!(url = %self.url, error = %e, "FTP quit failed");
        }
    }
}

/// Data stream whose RETR exchange is completed by [`BodyStream::finish`],
/// or on drop when the transfer is abandoned.
struct FtpDownload<'a, S: Read> {
    data: Option<S>,
    control: &'a mut FtpStream,
    url: &'a str,
}

impl<S: Read> Read for FtpDownload<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.as_mut() {
            Some(data) => data.read(buf),
            None => Ok(0),
        }
    }
}

impl<S: Read> BodyStream for FtpDownload<'_, S> {
    fn finish(&mut self) -> Result<(), FetchError> {
        let Some(data) = self.data.take() else {
            return Ok(());
        };
        self.control.finalize_retr_stream(data).map_err(|e| {
            FetchError::read(
                self.url,
                io::Error::new(io::ErrorKind::UnexpectedEof, format!("transfer incomplete: {e}")),
            )
        })
    }
}

impl<S: Read> Drop for FtpDownload<'_, S> {
    fn drop(&mut self) {
        if let Some(data) = self.data.take()
            && let Err(e) = self.control.finalize_retr_stream(data)
        {
            warn!(error = %e, "FTP transfer did not complete cleanly");
        }
    }
}
