//! Analysis catalogue: identity, titles and run order.

use std::fmt;

/// One report section / analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Cloud,
    WindowsDns,
    DnsExploration,
    DnsServers,
    Sni,
    Iot,
    LinuxHosts,
    FlowPairs,
}

impl AnalysisKind {
    /// Fixed report order
    pub const SEQUENCE: [AnalysisKind; 8] = [
        AnalysisKind::Cloud,
        AnalysisKind::WindowsDns,
        AnalysisKind::DnsExploration,
        AnalysisKind::DnsServers,
        AnalysisKind::Sni,
        AnalysisKind::Iot,
        AnalysisKind::LinuxHosts,
        AnalysisKind::FlowPairs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::Cloud => "cloud",
            AnalysisKind::WindowsDns => "windows_dns",
            AnalysisKind::DnsExploration => "dns_exploration",
            AnalysisKind::DnsServers => "dns_servers",
            AnalysisKind::Sni => "sni",
            AnalysisKind::Iot => "iot",
            AnalysisKind::LinuxHosts => "linux_hosts",
            AnalysisKind::FlowPairs => "flow_pairs",
        }
    }

    /// Columns an analysis can use, as shown in the skipped notice
    pub fn requirement(self) -> &'static str {
        match self {
            AnalysisKind::Cloud => "tls or dns",
            AnalysisKind::WindowsDns | AnalysisKind::DnsExploration | AnalysisKind::DnsServers => {
                "dns"
            }
            AnalysisKind::Sni => "tls",
            AnalysisKind::Iot | AnalysisKind::LinuxHosts => "dns, tls or http",
            AnalysisKind::FlowPairs => "flow",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
