//! Rule lists consumed by the classifier and the path validity check.
//!
//! The lists are plain data. [`ClassifierRules::default`] carries the built-in
//! set; [`load_rules`] reads a YAML override where any omitted list keeps its
//! built-in value.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Operational and infrastructure path names. Compared case-insensitively
/// against the whole normalized path and against its first segment.
const BLOCKED_PATHS: &[&str] = &[
    // environment and source control
    ".env",
    ".env.local",
    ".env.production",
    ".env.development",
    ".env.bak",
    ".env.example",
    ".git",
    ".git/config",
    ".git/HEAD",
    ".gitignore",
    ".svn",
    ".hg",
    ".DS_Store",
    ".htaccess",
    ".htpasswd",
    // wordpress
    "wp-admin",
    "wp-login.php",
    "wp-config.php",
    "wp-includes",
    "wp-content",
    "wp-cron.php",
    "xmlrpc.php",
    "wp-json",
    "wordpress",
    // database admin tools
    "phpmyadmin",
    "pma",
    "myadmin",
    "mysql",
    "adminer.php",
    "phpinfo.php",
    // generic admin
    "admin",
    "administrator",
    "admin.php",
    "login",
    "signin",
    "config.php",
    "configuration.php",
    "config.json",
    "config.yml",
    "config.yaml",
    // scanner targets
    "server-status",
    "server-info",
    ".well-known",
    "actuator",
    "actuator/health",
    "console",
    "debug",
    "trace",
    "manager",
    "manager/html",
    "solr",
    "jenkins",
    "cgi-bin",
    // backups
    "backup",
    "db.sql",
    "database.sql",
    "dump.sql",
    // icons
    "favicon.ico",
    "apple-touch-icon.png",
    "apple-touch-icon-precomposed.png",
];

const BLOCKED_EXTENSIONS: &[&str] = &[
    // server scripts
    ".php", ".asp", ".aspx", ".jsp", ".cgi", ".pl", ".py",
    // config and serialization
    ".ini", ".conf", ".cfg", ".config", ".xml", ".yaml", ".yml", ".toml", ".json", ".env",
    // databases
    ".sql", ".db", ".sqlite", ".mdb",
    // backups and archives
    ".bak", ".backup", ".old", ".orig", ".save", ".zip", ".tar", ".gz", ".rar", ".7z", ".tgz",
    // logs and plain data
    ".log", ".logs", ".txt", ".csv", ".tsv",
    // executables
    ".exe", ".dll", ".so", ".sh", ".bat", ".cmd",
    // credentials
    ".pem", ".key", ".crt", ".cer", ".p12",
    // source maps and editor leftovers
    ".map", ".swp", ".swo", ".tmp",
];

const MALICIOUS_AGENTS: &[&str] = &[
    "Nmap",
    "Nikto",
    "sqlmap",
    "masscan",
    "ZmEu",
    "Morfeus",
    "DirBuster",
    "Havij",
    "w3af",
    "Acunetix",
    "Nessus",
    "OpenVAS",
    "Wfuzz",
    "Xenu",
    "HTTrack",
    "WebCopier",
    "Teleport",
    "Offline Explorer",
    "BlackWidow",
    "Bolt",
    "JOC Web Spider",
    "Cogentbot",
    "Harvest",
    "Email Extractor",
];

const GENERIC_AGENTS: &[&str] = &[
    "Scrapy",
    "curl/",
    "wget/",
    "python-requests",
    "python-urllib",
    "Go-http-client",
    "Java/",
    "Apache-HttpClient",
    "okhttp",
    "node-fetch",
    "axios/",
    "undici",
    "PHP/",
    "libwww-perl",
    "lwp-trivial",
    "Ruby",
    "Mechanize",
    "Siteimprove",
    "Screaming Frog",
    "Pingdom",
    "UptimeRobot",
    "StatusCake",
    "Site24x7",
    "Riddler",
    "Dataprovider",
    "HeadlessChrome",
];

const SEARCH_ENGINE_AGENTS: &[&str] = &[
    "Googlebot",
    "Bingbot",
    "Slurp",
    "DuckDuckBot",
    "Baiduspider",
    "YandexBot",
    "Sogou",
    "Exabot",
    "ia_archiver",
    "AdsBot-Google",
    "Mediapartners-Google",
    "APIs-Google",
    "Google-Read-Aloud",
    "Google-Adwords-Instant",
    "Storebot-Google",
    "GoogleOther",
    "AhrefsBot",
    "SemrushBot",
    "MJ12bot",
    "DotBot",
    "PetalBot",
    "Bytespider",
    "CCBot",
    "GPTBot",
    "ChatGPT-User",
    "Claude-Web",
    "Applebot",
];

const SOCIAL_PREVIEW_AGENTS: &[&str] = &[
    "facebookexternalhit",
    "Facebot",
    "Twitterbot",
    "LinkedInBot",
    "Pinterest",
    "Slackbot",
    "TelegramBot",
    "WhatsApp",
    "Discordbot",
    "Embedly",
    "Quora Link Preview",
    "Redditbot",
    "SkypeUriPreview",
    "vkShare",
    "Viber",
    "Line",
];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

/// Every list the classifier evaluates, in one injectable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    pub blocked_paths: Vec<String>,
    pub blocked_extensions: Vec<String>,
    pub malicious_agents: Vec<String>,
    pub generic_agents: Vec<String>,
    pub search_engine_agents: Vec<String>,
    pub social_preview_agents: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            blocked_paths: owned(BLOCKED_PATHS),
            blocked_extensions: owned(BLOCKED_EXTENSIONS),
            malicious_agents: owned(MALICIOUS_AGENTS),
            generic_agents: owned(GENERIC_AGENTS),
            search_engine_agents: owned(SEARCH_ENGINE_AGENTS),
            social_preview_agents: owned(SOCIAL_PREVIEW_AGENTS),
        }
    }
}

/// Load rule lists from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::RulesFileIo`] if the file cannot be read, or
/// [`ConfigError::RulesFileParse`] if it is not valid YAML for
/// [`ClassifierRules`].
pub fn load_rules(path: &Path) -> Result<ClassifierRules, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RulesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_rules(&content)
}

fn parse_rules(content: &str) -> Result<ClassifierRules, ConfigError> {
    serde_yaml::from_str(content).map_err(ConfigError::RulesFileParse)
}
