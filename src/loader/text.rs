//! Netblock list text format parser.
//!
//! ```text
//! # Comment
//! [isp=0, name=TelstraClear New Zealand]
//! 203.167.128.0/18            # CIDR block
//! 202.27.16.0-202.27.23.255   # inclusive range
//! 210.55.1.7                  # single address
//! 2001:4400:/32               # IPv6 textual prefix and advisory length
//!
//! [isp=1, disable]
//! 60.234.0.0/16
//! ```

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

use ipnet::Ipv4Net;

use crate::address::parse_ipv4;
use crate::error::{Error, Result};
use crate::table::{Ipv6Prefix, NetblockRange};

/// Netblock entries as read from a list, before table validation.
#[derive(Debug, Clone, Default)]
pub struct NetblockList {
    /// IPv4 ranges in file order
    pub ranges: Vec<NetblockRange>,
    /// IPv6 prefixes in file order
    pub prefixes: Vec<Ipv6Prefix>,
}

/// Netblock list parser.
///
/// Unlike rule lists, a netblock list is trusted configuration, so every
/// malformed line is an error carrying its line number.
pub struct NetblockParser;

impl NetblockParser {
    /// Parse a netblock list from a reader.
    pub fn parse<R: Read>(reader: R) -> Result<NetblockList> {
        let mut list = NetblockList::default();
        let buf_reader = BufReader::new(reader);

        // None before the first header; Some(None) inside a disabled section
        let mut current_isp: Option<Option<i32>> = None;

        for (idx, line) in buf_reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line?;

            // Remove comments
            let line = match line.find('#') {
                Some(idx) => &line[..idx],
                None => &line,
            };
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let params = parse_params(&line[1..line.len() - 1]);
                current_isp = Some(section_isp(&params, line_no)?);
                continue;
            }

            let isp = match current_isp {
                Some(Some(isp)) => isp,
                Some(None) => continue,
                None => return Err(parse_error(line_no, "entry before any [isp=N] header")),
            };

            if line.contains(':') {
                list.prefixes.push(parse_prefix(line, isp, line_no)?);
            } else {
                list.ranges.push(parse_range(line, isp, line_no)?);
            }
        }

        Ok(list)
    }

    /// Parse a netblock list from a string.
    pub fn parse_str(text: &str) -> Result<NetblockList> {
        Self::parse(text.as_bytes())
    }
}

/// Parse header parameters.
fn parse_params(content: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for part in content.split(',') {
        let part = part.trim();
        if let Some(eq_pos) = part.find('=') {
            let key = part[..eq_pos].trim().to_lowercase();
            let value = part[eq_pos + 1..].trim().to_string();
            params.insert(key, value);
        } else {
            params.insert(part.to_lowercase(), String::new());
        }
    }

    params
}

/// ISP index for a section, or `None` when the section is disabled.
fn section_isp(params: &HashMap<String, String>, line_no: usize) -> Result<Option<i32>> {
    let disabled = params
        .get("disable")
        .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "f" | "no"))
        .unwrap_or(false);

    let isp = params
        .get("isp")
        .ok_or_else(|| parse_error(line_no, "section header without isp="))?;
    let isp = isp
        .parse::<i32>()
        .map_err(|_| parse_error(line_no, format!("invalid ISP index {:?}", isp)))?;

    if disabled {
        log::debug!("Skipping disabled netblock section for ISP {}", isp);
        return Ok(None);
    }
    Ok(Some(isp))
}

/// Parse an IPv4 CIDR, `low-high` range, or single address.
fn parse_range(entry: &str, isp: i32, line_no: usize) -> Result<NetblockRange> {
    if let Some((low, high)) = entry.split_once('-') {
        let low = parse_ipv4(low.trim()).map_err(|e| parse_error(line_no, e))?;
        let high = parse_ipv4(high.trim()).map_err(|e| parse_error(line_no, e))?;
        if low > high {
            return Err(parse_error(line_no, format!("inverted range {}", entry)));
        }
        return Ok(NetblockRange::new(low, high, isp));
    }

    if entry.contains('/') {
        let net = entry
            .parse::<Ipv4Net>()
            .map_err(|_| parse_error(line_no, format!("invalid CIDR {}", entry)))?;
        return Ok(NetblockRange::from_net(net, isp));
    }

    let ip = parse_ipv4(entry).map_err(|e| parse_error(line_no, e))?;
    Ok(NetblockRange::new(ip, ip, isp))
}

/// Parse `PREFIX/LEN`, e.g. `2001:4478:/32`.
fn parse_prefix(entry: &str, isp: i32, line_no: usize) -> Result<Ipv6Prefix> {
    let (prefix, bits) = entry
        .rsplit_once('/')
        .ok_or_else(|| parse_error(line_no, format!("IPv6 prefix without length: {}", entry)))?;
    let bits = bits
        .trim()
        .parse::<u16>()
        .map_err(|_| parse_error(line_no, format!("invalid prefix length in {}", entry)))?;

    Ipv6Prefix::new(prefix, bits, isp).map_err(|e| parse_error(line_no, e))
}

fn parse_error(line: usize, message: impl ToString) -> Error {
    Error::Parse {
        line,
        message: message.to_string(),
    }
}
