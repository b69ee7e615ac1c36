use crate::{
    Error, Result,
    app::router::rules::{RuleItem, describe},
    session::Session,
};

/// Port ranges written as `start:end`. Either bound may be left out, `:1024`
/// and `1024:` are both valid.
pub struct PortRangeItem {
    is_source: bool,
    ranges: Vec<String>,
    bounds: Vec<(u16, u16)>,
}

impl PortRangeItem {
    pub fn new(is_source: bool, ranges: Vec<String>) -> Result<Self> {
        let bounds = ranges
            .iter()
            .map(|range| parse_range(range))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            is_source,
            ranges,
            bounds,
        })
    }
}

fn parse_range(range: &str) -> Result<(u16, u16)> {
    let (start, end) = range.split_once(':').ok_or_else(|| {
        Error::InvalidConfig(format!("bad port range format: {range}"))
    })?;
    let parse = |bound: &str, default: u16| -> Result<u16> {
        if bound.is_empty() {
            return Ok(default);
        }
        bound.parse::<u16>().map_err(|e| {
            Error::InvalidConfig(format!("bad port range {range}: {e}"))
        })
    };
    let start = parse(start, 0)?;
    let end = parse(end, u16::MAX)?;
    if start > end {
        return Err(Error::InvalidConfig(format!(
            "bad port range {range}: start greater than end"
        )));
    }
    Ok((start, end))
}

impl std::fmt::Display for PortRangeItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.is_source {
            "source_port_range"
        } else {
            "port_range"
        };
        describe(f, key, &self.ranges)
    }
}

impl RuleItem for PortRangeItem {
    fn matches(&self, sess: &Session) -> bool {
        let port = if self.is_source {
            sess.source.port()
        } else {
            sess.destination.port()
        };
        self.bounds
            .iter()
            .any(|(start, end)| (*start..=*end).contains(&port))
    }
}
