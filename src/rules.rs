//! Static keyword and regex rule sets.
//!
//! Keywords are lowercase substrings matched case-insensitively; the Linux
//! patterns are compiled once with the `(?i)` flag.

use regex::Regex;
use std::sync::LazyLock;

/// Cloud provider and storage service markers.
pub const CLOUD_KEYWORDS: &[&str] = &[
    "aws",
    "amazon",
    "azure",
    "google",
    "cloud",
    "googleapis",
    "amazonaws",
    "blob.core.windows.net",
    "s3",
    "cloudfront",
    "gcp",
    "dropbox",
    "box.com",
    "salesforce",
];

/// Windows time, connectivity, update, telemetry and AD service names.
pub const WINDOWS_INDICATORS: &[&str] = &[
    "time.windows.com",
    "msftncsi.com",
    "msftconnecttest.com",
    "windowsupdate.com",
    "update.microsoft.com",
    "mp.microsoft.com",
    "wdcp.microsoft.com",
    "wdcpalt.microsoft.com",
    "displaycatalog.mp.microsoft.com",
    "sls.update.microsoft.com",
    "ctldl.windowsupdate.com",
    "download.windowsupdate.com",
    "tlu.dl.delivery.mp.microsoft.com",
    "settings-win.data.microsoft.com",
    "v10.events.data.microsoft.com",
    "watson.telemetry.microsoft.com",
    "login.live.com",
    "_msdcs",
    "_ldap._tcp",
    "_kerberos._tcp",
];

/// Consumer IoT, smart-home and entertainment device vendors.
pub const IOT_KEYWORDS: &[&str] = &[
    "camera",
    "doorbell",
    "smart",
    "alexa",
    "echo",
    "nest",
    "google home",
    "tuya",
    "dahua",
    "hikvision",
    "amcrest",
    "foscam",
    "wyze",
    "ring",
    "roku",
    "samsung",
    "lg",
    "tv",
    "sonos",
    "tplink",
    "belkin",
    "wemo",
    "philips",
    "hue",
    "lifx",
    "xiaomi",
    "aqara",
    "eufy",
    "arlo",
    "ubiquiti",
    "unifi",
    "meross",
    "nanoleaf",
    "apple tv",
    "fire tv",
    "nvidia shield",
    "chromecast",
    "nintendo",
    "xbox",
    "playstation",
    "steam deck",
    "oculus",
    "quest",
    "yeelight",
    "sensibo",
    "tado",
    "netatmo",
    "withings",
    "fitbit",
    "garmin",
    "myq",
    "chamberlain",
    "august",
    "schlage",
    "yale",
    "kasa",
    "tapo",
    "reolink",
    "ezviz",
    "imou",
    "vivint",
    "simplisafe",
    "adt",
    "honeywell",
    "resideo",
    "ecobee",
    "sensi",
    "daikin",
    "mitsubishi",
    "fujitsu",
    "panasonic",
    "toshiba",
    "sharp",
    "hitachi",
    "sony",
    "bose",
    "denon",
    "marantz",
    "onkyo",
    "pioneer",
    "yamaha",
    "harman",
    "jbl",
    "ultimate ears",
    "bang olufsen",
    "bowers wilkins",
    "kepul",
    "tuya",
    "smartlife",
];

/// Distribution mirrors and package registries, anchored at the end of the name.
pub const LINUX_DOMAINS_PATTERN: &str = r"(ubuntu\.com|debian\.org|centos\.org|fedoraproject\.org|archlinux\.org|raspberrypi\.org|kali\.org|linuxmint\.com|pop-os\.org|canonical\.com|pypi\.org|pythonhosted\.org|docker\.io|quay\.io|gcr\.io|registry\.npmjs\.org|rubygems\.org|snapcraft\.io)$";

/// User-agent tokens typical of Linux tooling.
pub const LINUX_USER_AGENT_PATTERN: &str =
    r"(linux|ubuntu|debian|fedora|arch|curl|wget|apt-http|pacman)";

/// Case-insensitive compiled form of [`LINUX_DOMAINS_PATTERN`]
pub static LINUX_DOMAINS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i){}", LINUX_DOMAINS_PATTERN))
        .expect("LINUX_DOMAINS_REGEX pattern is valid")
});

/// Case-insensitive compiled form of [`LINUX_USER_AGENT_PATTERN`]
pub static LINUX_USER_AGENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i){}", LINUX_USER_AGENT_PATTERN))
        .expect("LINUX_USER_AGENT_REGEX pattern is valid")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lists() {
        assert_eq!(CLOUD_KEYWORDS.len(), 14);
        assert_eq!(WINDOWS_INDICATORS.len(), 20);
        assert_eq!(CLOUD_KEYWORDS[7], "blob.core.windows.net");
        assert_eq!(WINDOWS_INDICATORS.last(), Some(&"_kerberos._tcp"));
        assert!(IOT_KEYWORDS.contains(&"hikvision"));
        assert_eq!(IOT_KEYWORDS.iter().filter(|k| **k == "tuya").count(), 2);
    }

    #[test]
    fn test_keywords_are_lowercase() {
        for keyword in CLOUD_KEYWORDS
            .iter()
            .chain(WINDOWS_INDICATORS)
            .chain(IOT_KEYWORDS)
        {
            assert_eq!(*keyword, keyword.to_lowercase());
        }
    }

    #[test]
    fn test_linux_domain_regex_is_suffix_anchored() {
        assert!(LINUX_DOMAINS_REGEX.is_match("archive.ubuntu.com"));
        assert!(LINUX_DOMAINS_REGEX.is_match("FILES.PYTHONHOSTED.ORG"));
        assert!(LINUX_DOMAINS_REGEX.is_match("registry-1.docker.io"));
        assert!(!LINUX_DOMAINS_REGEX.is_match("ubuntu.com.evil.net"));
        assert!(!LINUX_DOMAINS_REGEX.is_match("example.org"));
    }

    #[test]
    fn test_linux_user_agent_regex() {
        assert!(LINUX_USER_AGENT_REGEX.is_match("curl/8.5.0"));
        assert!(LINUX_USER_AGENT_REGEX.is_match("Debian APT-HTTP/1.3 (2.6.1)"));
        assert!(LINUX_USER_AGENT_REGEX.is_match("Mozilla/5.0 (X11; Linux x86_64)"));
        assert!(!LINUX_USER_AGENT_REGEX.is_match("Mozilla/5.0 (Windows NT 10.0)"));
    }
}
