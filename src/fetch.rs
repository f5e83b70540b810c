//! Network acquisition: scraping `<img>` sources from a page, downloading
//! images with a progress bar, and fetching a generated random face.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use thiserror::Error;

/// Endpoint that answers every request with a freshly generated face.
pub const RANDOM_FACE_URL: &str = "https://thispersondoesnotexist.com/";

/// Default `User-Agent` header for all requests.
pub const DEFAULT_USER_AGENT: &str = concat!("imgascii/", env!("CARGO_PKG_VERSION"));

const CHUNK_SIZE: usize = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<img\b[^>]*>").unwrap());

static SRC_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap());

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("No images found on {0}")]
    NoImages(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// A URL is usable when it carries both a scheme and a host.
pub fn is_valid_url(url: &Url) -> bool {
    !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty())
}

pub fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !is_valid_url(&url) {
        return Err(FetchError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing scheme or host".to_string(),
        });
    }
    Ok(url)
}

/// Every `<img ...>` tag in `html`, in document order.
pub fn img_tags(html: &str) -> Vec<&str> {
    IMG_TAG.find_iter(html).map(|m| m.as_str()).collect()
}

/// The `src` attribute of a single tag, if present and non-empty.
pub fn src_attr(tag: &str) -> Option<&str> {
    let caps = SRC_ATTR.captures(tag)?;
    let value = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Resolves the image sources of a page against its URL.
///
/// Relative sources are joined to `page`, query strings and fragments are
/// dropped, and anything without a scheme and host is skipped.
pub fn resolve_image_urls(page: &Url, html: &str, progress: &ProgressBar) -> Vec<Url> {
    let tags = img_tags(html);
    progress.set_length(tags.len() as u64);

    let mut urls = Vec::new();
    for tag in tags {
        progress.inc(1);
        let Some(src) = src_attr(tag) else {
            continue;
        };
        let mut url = match page.join(src) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("skipping image source '{}': {}", src, e);
                continue;
            }
        };
        url.set_query(None);
        url.set_fragment(None);

        if is_valid_url(&url) {
            urls.push(url);
        } else {
            log::warn!("skipping invalid image url {}", url);
        }
    }
    progress.finish_and_clear();
    urls
}

/// File name for a downloaded image: the last path segment, with `.jpg`
/// appended when it has no extension.
pub fn file_name_for(url: &Url, fallback: &str) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback);
    if Path::new(segment).extension().is_some() {
        segment.to_string()
    } else {
        format!("{}.jpg", segment)
    }
}

fn is_image_response(resp: &Response) -> bool {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Removes a partially written file unless the write completed.
struct PartialFileGuard {
    path: PathBuf,
    done: bool,
}

impl PartialFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, done: false }
    }

    fn finish(mut self) -> PathBuf {
        self.done = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for PartialFileGuard {
    fn drop(&mut self) {
        if !self.done {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Blocking HTTP client for pages and images.
pub struct Fetcher {
    client: Client,
    show_progress: bool,
}

impl Fetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            show_progress: true,
        })
    }

    /// Toggles terminal progress bars.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress(&self, len: Option<u64>, template: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        match len {
            Some(len) => {
                let pb = ProgressBar::new(len);
                pb.set_style(bar_style(template));
                pb
            }
            None => ProgressBar::new_spinner(),
        }
    }

    fn get(&self, url: &Url) -> Result<Response> {
        log::debug!("GET {}", url);
        let resp = self.client.get(url.clone()).send()?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }

    /// URLs of every image referenced by the page at `page_url`.
    pub fn image_urls(&self, page_url: &str) -> Result<Vec<Url>> {
        let page = parse_url(page_url)?;
        let resp = self.get(&page)?;
        let base = resp.url().clone();
        let html = resp.text()?;

        let pb = self.progress(Some(0), "{msg} [{bar:40.cyan/blue}] {pos}/{len}");
        pb.set_message("Extracting images");
        let urls = resolve_image_urls(&base, &html, &pb);
        log::info!("found {} image(s) on {}", urls.len(), base);
        Ok(urls)
    }

    /// Downloads `url` into `dir`, creating the directory when needed.
    pub fn download(&self, url: &Url, dir: &Path) -> Result<PathBuf> {
        let resp = self.get(url)?;
        let path = dir.join(file_name_for(url, "image"));
        self.save(resp, dir, &path)
    }

    /// Fetches one generated face from `endpoint` into `dir`.
    ///
    /// Endpoints that answer with an image are saved as-is; anything else is
    /// treated as a page and its first image is downloaded.
    pub fn random_face(&self, endpoint: &str, dir: &Path) -> Result<PathBuf> {
        let url = parse_url(endpoint)?;
        let resp = self.get(&url)?;

        if is_image_response(&resp) {
            let path = dir.join(file_name_for(resp.url(), "random_face"));
            return self.save(resp, dir, &path);
        }

        let base = resp.url().clone();
        let html = resp.text()?;
        let first = resolve_image_urls(&base, &html, &ProgressBar::hidden())
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NoImages(base.to_string()))?;
        self.download(&first, dir)
    }

    fn save(&self, mut resp: Response, dir: &Path, path: &Path) -> Result<PathBuf> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| FetchError::Io { path, source }
        };

        fs::create_dir_all(dir).map_err(io_err(dir))?;
        let file = File::create(path).map_err(io_err(path))?;
        let guard = PartialFileGuard::new(path.to_path_buf());
        let mut writer = BufWriter::new(file);

        let pb = self.progress(
            resp.content_length(),
            "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
        );
        pb.set_message(format!("Downloading {}", path.display()));

        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = resp.read(&mut buf).map_err(io_err(path))?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n]).map_err(io_err(path))?;
            pb.inc(n as u64);
        }
        writer.flush().map_err(io_err(path))?;
        pb.finish_and_clear();

        log::info!("downloaded {} ({} bytes)", path.display(), pb.position());
        Ok(guard.finish())
    }
}
