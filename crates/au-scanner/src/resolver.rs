use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// File suffixes tried, in order, after the bare path.
pub const SCRIPT_EXTENSIONS: &[&str] = &["", ".au3", ".au2", ".au"];

/// A located script: its physical path (or URL) plus its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScript {
    pub path: PathBuf,
    pub content: String,
}

impl ResolvedScript {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to fetch remote script {location}: {message}")]
    Remote { location: String, message: String },
}

/// One strategy for turning an include request into source text.
///
/// `Ok(None)` means "not handled here"; errors are treated the same way by the
/// scanner, which moves on to the next strategy.
pub trait IncludeResolver: Send + Sync {
    fn try_resolve(&self, path: &str) -> Result<Option<ResolvedScript>, ResolveError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemResolver;

impl IncludeResolver for FileSystemResolver {
    fn try_resolve(&self, path: &str) -> Result<Option<ResolvedScript>, ResolveError> {
        let Some(candidate) = SCRIPT_EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!("{}{}", path, ext)))
            .find(|candidate| candidate.is_file())
        else {
            return Ok(None);
        };

        let bytes = fs::read(&candidate).map_err(|source| ResolveError::Read {
            path: candidate.clone(),
            source,
        })?;
        let content = decode_source(&bytes);
        Ok(Some(ResolvedScript::new(candidate, content)))
    }
}

fn decode_source(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(text.as_ref()).to_string()
}

#[cfg(feature = "remote")]
pub use remote::{FtpResolver, HttpResolver};

#[cfg(feature = "remote")]
mod remote {
    use std::net::ToSocketAddrs;
    use std::path::PathBuf;
    use std::time::Duration;

    use percent_encoding::percent_decode_str;
    use suppaftp::FtpStream;
    use tracing::trace;
    use url::Url;

    use super::{decode_source, IncludeResolver, ResolveError, ResolvedScript};

    /// Fetches `http://` and `https://` locations with a blocking GET.
    pub struct HttpResolver {
        agent: ureq::Agent,
    }

    impl HttpResolver {
        pub fn new(timeout: Duration) -> Self {
            Self {
                agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            }
        }
    }

    impl Default for HttpResolver {
        fn default() -> Self {
            Self::new(Duration::from_secs(30))
        }
    }

    impl IncludeResolver for HttpResolver {
        fn try_resolve(&self, path: &str) -> Result<Option<ResolvedScript>, ResolveError> {
            let lower = path.to_ascii_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return Ok(None);
            }

            let response = self
                .agent
                .get(path)
                .call()
                .map_err(|error| ResolveError::Remote {
                    location: path.to_string(),
                    message: error.to_string(),
                })?;
            let content = response.into_string().map_err(|source| ResolveError::Read {
                path: PathBuf::from(path),
                source,
            })?;
            Ok(Some(ResolvedScript::new(path, content)))
        }
    }

    /// Fetches `ftp://` locations with a passive-mode `RETR`.
    pub struct FtpResolver {
        timeout: Duration,
    }

    impl FtpResolver {
        pub fn new(timeout: Duration) -> Self {
            Self { timeout }
        }

        fn fetch(&self, target: &FtpTarget) -> Result<Vec<u8>, String> {
            let address = (target.host.as_str(), target.port)
                .to_socket_addrs()
                .map_err(|error| error.to_string())?
                .next()
                .ok_or_else(|| format!("no address for {}", target.host))?;
            let mut stream =
                FtpStream::connect_timeout(address, self.timeout).map_err(|error| error.to_string())?;
            stream
                .login(target.user.as_str(), target.password.as_str())
                .map_err(|error| error.to_string())?;
            let content = stream
                .retr_as_buffer(&target.path)
                .map_err(|error| error.to_string())?;
            if let Err(error) = stream.quit() {
                trace!(host = %target.host, %error, "ftp quit failed");
            }
            Ok(content.into_inner())
        }
    }

    impl Default for FtpResolver {
        fn default() -> Self {
            Self::new(Duration::from_secs(30))
        }
    }

    impl IncludeResolver for FtpResolver {
        fn try_resolve(&self, path: &str) -> Result<Option<ResolvedScript>, ResolveError> {
            if !path.to_ascii_lowercase().starts_with("ftp://") {
                return Ok(None);
            }

            let remote = |message: String| ResolveError::Remote {
                location: path.to_string(),
                message,
            };
            let target = FtpTarget::parse(path).map_err(remote)?;
            let bytes = self.fetch(&target).map_err(remote)?;
            Ok(Some(ResolvedScript::new(path, decode_source(&bytes))))
        }
    }

    /// Server, login and file of an `ftp://` URL. Missing credentials mean an
    /// anonymous login.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(super) struct FtpTarget {
        pub host: String,
        pub port: u16,
        pub user: String,
        pub password: String,
        pub path: String,
    }

    impl FtpTarget {
        pub(super) fn parse(location: &str) -> Result<Self, String> {
            let url = Url::parse(location).map_err(|error| error.to_string())?;
            let host = url
                .host_str()
                .ok_or_else(|| "missing host".to_string())?
                .to_string();
            let decode = |text: &str| percent_decode_str(text).decode_utf8_lossy().into_owned();
            let user = match url.username() {
                "" => "anonymous".to_string(),
                user => decode(user),
            };
            let password = url
                .password()
                .map_or_else(|| "anonymous".to_string(), decode);
            Ok(Self {
                host,
                port: url.port_or_known_default().unwrap_or(21),
                user,
                password,
                path: decode(url.path()),
            })
        }
    }
}

/// Key under which a resolved script is cached: the canonical absolute path
/// for files, the URL itself for remote resources.
pub fn canonical_key(path: &Path) -> PathBuf {
    if path.to_string_lossy().contains("://") {
        return path.to_path_buf();
    }
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
