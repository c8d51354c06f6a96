// Cookie file discovery and the Netscape cookie-file format
//
// Discovery order: ./cookies.txt, ./cookies/cookies.txt,
// ~/.config/yt-dlp/cookies.txt, /etc/yt-dlp/cookies.txt.
// A missing file is not an error; downloads just run unauthenticated.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::errors::DownloadError;

const NETSCAPE_HEADER: &str = "# Netscape HTTP Cookie File";
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Candidate cookie files, highest priority first
pub fn cookie_candidates(working_dir: &Path, home_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = vec![
        working_dir.join("cookies.txt"),
        working_dir.join("cookies").join("cookies.txt"),
    ];

    if let Some(home) = home_dir {
        paths.push(home.join(".config").join("yt-dlp").join("cookies.txt"));
    }

    paths.push(PathBuf::from("/etc/yt-dlp/cookies.txt"));
    paths
}

/// First existing candidate, if any
pub fn find_cookie_file(working_dir: &Path, home_dir: Option<&Path>) -> Option<PathBuf> {
    let found = cookie_candidates(working_dir, home_dir)
        .into_iter()
        .find(|path| path.is_file());

    match &found {
        Some(path) => tracing::info!("Found cookies file: {}", path.display()),
        None => tracing::info!("No cookies file found, proceeding without cookies"),
    }

    found
}

/// Discover from the process working directory and the user's home
pub fn discover_cookie_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let home = dirs::home_dir();
    find_cookie_file(&cwd, home.as_deref())
}

/// One line of a Netscape cookie file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetscapeCookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Unix epoch seconds; `None` for session cookies (written as "0")
    pub expires: Option<u64>,
    pub name: String,
    pub value: String,
    pub http_only: bool,
}

impl NetscapeCookie {
    /// Session cookie; the subdomain flag follows the leading dot
    pub fn new(domain: &str, path: &str, name: &str, value: &str) -> Self {
        Self {
            domain: domain.to_string(),
            include_subdomains: domain.starts_with('.'),
            path: path.to_string(),
            secure: false,
            expires: None,
            name: name.to_string(),
            value: value.to_string(),
            http_only: false,
        }
    }

    pub fn matches_domain(&self, domain: &str) -> bool {
        self.domain.ends_with(domain)
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

impl fmt::Display for NetscapeCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.http_only { HTTP_ONLY_PREFIX } else { "" };
        write!(
            f,
            "{}{}\t{}\t{}\t{}\t{}\t{}\t{}",
            prefix,
            self.domain,
            flag(self.include_subdomains),
            self.path,
            flag(self.secure),
            self.expires.unwrap_or(0),
            self.name,
            self.value
        )
    }
}

impl FromStr for NetscapeCookie {
    type Err = DownloadError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None => (line, false),
        };

        let columns: Vec<&str> = line
            .trim_end_matches(|c: char| c == '\r' || c == '\n')
            .split('\t')
            .collect();
        if columns.len() != 7 {
            return Err(DownloadError::ParseError(format!(
                "cookie line has {} columns, expected 7",
                columns.len()
            )));
        }

        let parse_flag = |column: &str| match column {
            "TRUE" => Ok(true),
            "FALSE" => Ok(false),
            other => Err(DownloadError::ParseError(format!(
                "invalid cookie flag: {}",
                other
            ))),
        };

        let expires: u64 = columns[4].parse().map_err(|_| {
            DownloadError::ParseError(format!("invalid cookie expiry: {}", columns[4]))
        })?;

        Ok(Self {
            domain: columns[0].to_string(),
            include_subdomains: parse_flag(columns[1])?,
            path: columns[2].to_string(),
            secure: parse_flag(columns[3])?,
            expires: (expires > 0).then_some(expires),
            name: columns[5].to_string(),
            value: columns[6].to_string(),
            http_only,
        })
    }
}

/// Ordered set of cookies as stored in a cookies.txt file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    pub cookies: Vec<NetscapeCookie>,
}

impl CookieJar {
    /// Parse file contents. Comments and blank lines are skipped,
    /// malformed lines are logged and dropped.
    pub fn parse(contents: &str) -> Self {
        let cookies = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| line.starts_with(HTTP_ONLY_PREFIX) || !line.starts_with('#'))
            .filter_map(|line| match line.parse::<NetscapeCookie>() {
                Ok(cookie) => Some(cookie),
                Err(e) => {
                    tracing::debug!("Skipping cookie line: {}", e);
                    None
                }
            })
            .collect();

        Self { cookies }
    }

    pub fn load(path: &Path) -> Result<Self, DownloadError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    /// Keep only cookies whose domain ends with `domain`
    pub fn retain_domain(mut self, domain: &str) -> Self {
        self.cookies.retain(|c| c.matches_domain(domain));
        self
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<(), DownloadError> {
        std::fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", NETSCAPE_HEADER)?;
        for cookie in &self.cookies {
            writeln!(f, "{}", cookie)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Netscape HTTP Cookie File\n\
        # This is a generated file! Do not edit.\n\
        \n\
        .youtube.com\tTRUE\t/\tTRUE\t1767225600\tPREF\tf6=40000000\n\
        #HttpOnly_.youtube.com\tTRUE\t/\tTRUE\t0\tVISITOR_INFO1_LIVE\tabc\n\
        www.example.com\tFALSE\t/\tFALSE\t0\tsid\t42\n\
        broken line without tabs\n";

    #[test]
    fn test_parse_sample_jar() {
        let jar = CookieJar::parse(SAMPLE);
        assert_eq!(jar.len(), 3);

        let pref = &jar.cookies[0];
        assert_eq!(pref.domain, ".youtube.com");
        assert!(pref.include_subdomains);
        assert!(pref.secure);
        assert_eq!(pref.expires, Some(1_767_225_600));

        let visitor = &jar.cookies[1];
        assert!(visitor.http_only);
        assert_eq!(visitor.expires, None);
    }

    #[test]
    fn test_line_layout() {
        let mut cookie = NetscapeCookie::new(".youtube.com", "/", "SID", "xyz");
        cookie.secure = true;
        assert_eq!(
            cookie.to_string(),
            ".youtube.com\tTRUE\t/\tTRUE\t0\tSID\txyz"
        );

        let host_only = NetscapeCookie::new("music.youtube.com", "/", "a", "b");
        assert!(!host_only.include_subdomains);
    }

    #[test]
    fn test_retain_domain() {
        let jar = CookieJar::parse(SAMPLE).retain_domain("youtube.com");
        assert_eq!(jar.len(), 2);
        assert!(jar.cookies.iter().all(|c| c.domain.ends_with("youtube.com")));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");

        let jar = CookieJar::parse(SAMPLE).retain_domain("youtube.com");
        jar.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(NETSCAPE_HEADER));
        assert_eq!(CookieJar::load(&path).unwrap(), jar);
    }

    #[test]
    fn test_discovery_order() {
        let cwd = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();

        // Only the system-wide path can exist outside the temp dirs
        let found = find_cookie_file(cwd.path(), Some(home.path()));
        assert!(found.map_or(true, |p| p == Path::new("/etc/yt-dlp/cookies.txt")));

        let user = home.path().join(".config/yt-dlp/cookies.txt");
        std::fs::create_dir_all(user.parent().unwrap()).unwrap();
        std::fs::write(&user, NETSCAPE_HEADER).unwrap();
        assert_eq!(find_cookie_file(cwd.path(), Some(home.path())), Some(user.clone()));

        let nested = cwd.path().join("cookies/cookies.txt");
        std::fs::create_dir_all(nested.parent().unwrap()).unwrap();
        std::fs::write(&nested, NETSCAPE_HEADER).unwrap();
        assert_eq!(find_cookie_file(cwd.path(), Some(home.path())), Some(nested));

        let local = cwd.path().join("cookies.txt");
        std::fs::write(&local, NETSCAPE_HEADER).unwrap();
        assert_eq!(find_cookie_file(cwd.path(), Some(home.path())), Some(local));
    }

    #[test]
    fn test_candidates_without_home() {
        let candidates = cookie_candidates(Path::new("/work"), None);
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/work/cookies.txt"),
                PathBuf::from("/work/cookies/cookies.txt"),
                PathBuf::from("/etc/yt-dlp/cookies.txt"),
            ]
        );
    }
}
