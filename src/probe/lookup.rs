//! Forward/reverse DNS lookup with optional GeoIP enrichment.

use std::net::IpAddr;

use hickory_resolver::TokioResolver;
use serde::Deserialize;
use tracing::debug;

use crate::error::ProbeError;

/// Placeholder reverse name when the PTR lookup yields nothing.
pub const NO_REVERSE: &str = "(no reverse DNS)";

const GEO_FIELDS: &str =
    "status,message,country,countryCode,region,regionName,city,zip,lat,lon,timezone,isp,org,as,query";

/// One resolved address with its reverse name.
#[derive(Debug, Clone)]
pub struct ResolvedAddr {
    /// The address itself.
    pub ip: IpAddr,
    /// `"IPv4"` or `"IPv6"`.
    pub family: &'static str,
    /// PTR name, or [`NO_REVERSE`].
    pub reverse: String,
}

/// GeoIP record as returned by ip-api.com.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeoInfo {
    /// `"success"` or `"fail"`.
    pub status: String,
    /// Failure reason when `status` is `"fail"`.
    pub message: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub region_name: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub timezone: Option<String>,
    pub isp: Option<String>,
    pub org: Option<String>,
    /// Autonomous system, e.g. `"AS15169 Google LLC"`.
    #[serde(rename = "as")]
    pub asn: Option<String>,
    /// The IP the record describes.
    pub query: Option<String>,
}

impl GeoInfo {
    /// Whether the upstream reported a usable record.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Full lookup result for one target.
#[derive(Debug, Clone)]
pub struct LookupReport {
    /// The name or literal address that was looked up.
    pub target: String,
    /// Resolved addresses in resolver order, deduplicated.
    pub addrs: Vec<ResolvedAddr>,
    /// GeoIP record for the first address, when enabled and reachable.
    pub geo: Option<GeoInfo>,
}

fn family_of(ip: &IpAddr) -> &'static str {
    match ip {
        IpAddr::V4(_) => "IPv4",
        IpAddr::V6(_) => "IPv6",
    }
}

/// Resolve `target` forward, then reverse each address.
///
/// A literal IP skips the forward step. Reverse failures degrade to the
/// [`NO_REVERSE`] placeholder; only the forward step can fail the lookup.
pub async fn resolve(resolver: &TokioResolver, target: &str) -> Result<Vec<ResolvedAddr>, ProbeError> {
    let ips: Vec<IpAddr> = if let Ok(ip) = target.parse::<IpAddr>() {
        vec![ip]
    } else {
        let response = resolver
            .lookup_ip(target)
            .await
            .map_err(|e| ProbeError::Resolve(e.to_string()))?;
        let mut seen = Vec::new();
        for ip in response.iter() {
            if !seen.contains(&ip) {
                seen.push(ip);
            }
        }
        seen
    };

    let mut addrs = Vec::with_capacity(ips.len());
    for ip in ips {
        let reverse = match resolver.reverse_lookup(ip).await {
            Ok(names) => names
                .iter()
                .next()
                .map(|name| name.to_string().trim_end_matches('.').to_owned())
                .unwrap_or_else(|| NO_REVERSE.to_owned()),
            Err(e) => {
                debug!(ip = %ip, error = %e, "reverse lookup failed");
                NO_REVERSE.to_owned()
            }
        };
        addrs.push(ResolvedAddr {
            ip,
            family: family_of(&ip),
            reverse,
        });
    }
    Ok(addrs)
}

/// Fetch the GeoIP record for `ip`. An upstream `"fail"` status becomes
/// [`ProbeError::Geo`] carrying the reported reason.
pub async fn geo_lookup(http: &reqwest::Client, ip: IpAddr) -> Result<GeoInfo, ProbeError> {
    let url = format!("http://ip-api.com/json/{ip}?fields={GEO_FIELDS}");
    let geo: GeoInfo = http.get(&url).send().await?.json().await?;
    if geo.is_success() {
        Ok(geo)
    } else {
        Err(ProbeError::Geo(
            geo.message.unwrap_or_else(|| "unavailable".to_owned()),
        ))
    }
}
