//! Declarative label grammar.
//!
//! Each rule maps the segments that follow an object's local name to a
//! target path inside the object and a value kind. Matching is
//! case-insensitive and exact-length; a key no rule matches is dropped.

/// One segment of a rule pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Literal(&'static str),
    /// Matches any segment and captures it for a `*` in the target.
    Any,
}

/// How a matched label value lands in the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Copied verbatim as a scalar.
    Scalar,
    /// `true` creates an empty mapping at the target; other values are ignored.
    TlsFlag,
    /// Comma-separated entries, namespaced and written as a sequence.
    MiddlewareList,
    /// Selects the named backend endpoint; never written into the object.
    EndpointSelector,
}

#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub pattern: &'static [Segment],
    pub target: &'static [&'static str],
    pub kind: ValueKind,
}

use Segment::{Any, Literal as L};

const fn rule(
    pattern: &'static [Segment],
    target: &'static [&'static str],
    kind: ValueKind,
) -> LabelRule {
    LabelRule {
        pattern,
        target,
        kind,
    }
}

pub static ROUTER_RULES: &[LabelRule] = &[
    rule(&[L("priority")], &["priority"], ValueKind::Scalar),
    rule(&[L("rule")], &["rule"], ValueKind::Scalar),
    rule(&[L("tls")], &["tls"], ValueKind::TlsFlag),
    rule(&[L("tls"), L("certresolver")], &["tls", "certresolver"], ValueKind::Scalar),
    rule(&[L("tls"), L("options")], &["tls", "options"], ValueKind::Scalar),
    rule(&[L("middlewares")], &["entrypoints"], ValueKind::MiddlewareList),
];

pub static SERVICE_RULES: &[LabelRule] = &[
    rule(&[L("servicefabric"), L("endpoint")], &[], ValueKind::EndpointSelector),
    rule(
        &[L("loadbalancer"), L("passhostheader")],
        &["loadBalancer", "passHostHeader"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("healthcheck"), L("followredirects")],
        &["loadBalancer", "healthCheck", "followRedirects"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("healthcheck"), L("headers"), Any],
        &["loadBalancer", "healthCheck", "headers", "*"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("healthcheck"), L("hostname")],
        &["loadBalancer", "healthCheck", "hostname"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("healthcheck"), L("interval")],
        &["loadBalancer", "healthCheck", "interval"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("healthcheck"), L("path")],
        &["loadBalancer", "healthCheck", "path"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("healthcheck"), L("port")],
        &["loadBalancer", "healthCheck", "port"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("healthcheck"), L("scheme")],
        &["loadBalancer", "healthCheck", "scheme"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("healthcheck"), L("timeout")],
        &["loadBalancer", "healthCheck", "timeout"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("responseforwarding"), L("flushinterval")],
        &["loadBalancer", "responseForwarding", "flushInterval"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("sticky"), L("cookie"), L("httponly")],
        &["loadBalancer", "sticky", "cookie", "httpOnly"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("sticky"), L("cookie"), L("name")],
        &["loadBalancer", "sticky", "cookie", "name"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("sticky"), L("cookie"), L("secure")],
        &["loadBalancer", "sticky", "cookie", "secure"],
        ValueKind::Scalar,
    ),
    rule(
        &[L("loadbalancer"), L("sticky"), L("cookie"), L("samesite")],
        &["loadBalancer", "sticky", "cookie", "sameSite"],
        ValueKind::Scalar,
    ),
];

/// A rule matched against concrete label segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub kind: ValueKind,
    pub path: Vec<String>,
}

impl LabelRule {
    /// Match `segments` against this rule, resolving `*` in the target.
    pub fn matches(&self, segments: &[&str]) -> Option<Match> {
        if segments.len() != self.pattern.len() {
            return None;
        }

        let mut captured = None;
        for (pattern, segment) in self.pattern.iter().zip(segments) {
            match pattern {
                Segment::Literal(lit) if lit.eq_ignore_ascii_case(segment) => {}
                Segment::Literal(_) => return None,
                Segment::Any if segment.is_empty() => return None,
                Segment::Any => captured = Some(*segment),
            }
        }

        let path = self
            .target
            .iter()
            .map(|t| match (*t, captured) {
                ("*", Some(c)) => c.to_string(),
                (t, _) => t.to_string(),
            })
            .collect();

        Some(Match {
            kind: self.kind,
            path,
        })
    }
}

/// First rule in `rules` matching `segments`.
pub fn lookup(rules: &[LabelRule], segments: &[&str]) -> Option<Match> {
    rules.iter().find_map(|r| r.matches(segments))
}
