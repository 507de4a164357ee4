//! Best-match resolution across a principal's candidate rules.
//!
//! Every rule whose patterns match the request is considered, and the one
//! granting the most of the requested actions wins. This is deliberately
//! neither "first match wins" nor "deny overrides": a broad rule with few
//! actions never shadows a narrower rule with more. It is also not a union,
//! so two disjoint single-action grants still resolve to a single action.

use serde::Serialize;

use super::{AccessRequest, ActionSet, ParseError, RuleEntry};

/// Outcome of resolving a request against a set of rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "actions", rename_all = "snake_case")]
pub enum Resolution {
    /// The permitted subset of the requested actions. Never empty.
    Granted(ActionSet),
    /// No rule matched, or no matching rule granted any requested action.
    NoMatch,
}

impl Resolution {
    pub fn is_granted(&self) -> bool {
        matches!(self, Resolution::Granted(_))
    }

    /// Permitted actions, `None` for [`Resolution::NoMatch`].
    pub fn actions(&self) -> Option<&ActionSet> {
        match self {
            Resolution::Granted(actions) => Some(actions),
            Resolution::NoMatch => None,
        }
    }
}

/// How a single candidate rule fared against a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleEvaluation {
    pub rule: RuleEntry,
    pub matched: bool,
    /// Requested actions this rule grants. Empty when `matched` is false.
    pub granted: ActionSet,
}

/// Full resolution trace, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub request: AccessRequest,
    /// Every parsed candidate, in evaluation order.
    pub evaluations: Vec<RuleEvaluation>,
    /// Index into `evaluations` of the winning rule, if any.
    pub selected: Option<usize>,
    /// Rules dropped at parse time.
    #[serde(serialize_with = "serialize_skipped")]
    pub skipped: Vec<ParseError>,
    pub resolution: Resolution,
}

#[allow(clippy::ptr_arg)]
fn serialize_skipped<S: serde::Serializer>(
    skipped: &Vec<ParseError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(skipped.iter().map(|e| e.to_string()))
}

/// Resolve a request against candidate rules.
///
/// Among matching rules, the one whose grant (requested ∩ permitted) is
/// largest wins. Ties go to the earliest rule in `candidates`, so callers
/// wanting a stable answer must supply a stable order.
pub fn resolve(candidates: &[RuleEntry], request: &AccessRequest) -> Resolution {
    let grants: Vec<Option<ActionSet>> = candidates
        .iter()
        .map(|entry| {
            entry.matches(request).then(|| {
                let granted = entry.grant(request);
                tracing::debug!(request = %request, rule = %entry, granted = %granted, "ACL rule matched");
                granted
            })
        })
        .collect();

    let selected = select_best(grants.iter().map(Option::as_ref));
    resolution_for(selected.and_then(|i| grants[i].as_ref()))
}

/// Like [`resolve`], but records how each candidate was evaluated.
pub fn resolve_with_trace(
    candidates: &[RuleEntry],
    request: &AccessRequest,
    skipped: Vec<ParseError>,
) -> Explanation {
    let evaluations: Vec<RuleEvaluation> = candidates
        .iter()
        .map(|entry| {
            let matched = entry.matches(request);
            let granted = if matched {
                entry.grant(request)
            } else {
                ActionSet::new()
            };
            RuleEvaluation {
                rule: entry.clone(),
                matched,
                granted,
            }
        })
        .collect();

    let selected = select_best(
        evaluations
            .iter()
            .map(|eval| eval.matched.then_some(&eval.granted)),
    );
    let resolution = resolution_for(selected.map(|i| &evaluations[i].granted));

    Explanation {
        request: request.clone(),
        evaluations,
        selected: selected.filter(|_| resolution.is_granted()),
        skipped,
        resolution,
    }
}

/// Index of the largest grant, `None` entries being rules that did not
/// match. Only a strictly larger grant displaces the current best, so the
/// first of equal-sized grants wins.
fn select_best<'a>(grants: impl IntoIterator<Item = Option<&'a ActionSet>>) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, grant) in grants.into_iter().enumerate() {
        let Some(grant) = grant else { continue };
        if best.is_none_or(|(_, len)| grant.len() > len) {
            best = Some((i, grant.len()));
        }
    }
    best.map(|(i, _)| i)
}

fn resolution_for(grant: Option<&ActionSet>) -> Resolution {
    match grant {
        Some(granted) if !granted.is_empty() => Resolution::Granted(granted.clone()),
        _ => Resolution::NoMatch,
    }
}

/// Parse raw rule strings, dropping and logging the malformed ones.
///
/// One bad record must not deny service to an otherwise valid principal, so
/// parse failures are never fatal here. The failures are returned alongside
/// the parsed entries for callers that want to report them.
pub fn parse_candidates<S: AsRef<str>>(raw: &[S]) -> (Vec<RuleEntry>, Vec<ParseError>) {
    let mut entries = Vec::with_capacity(raw.len());
    let mut skipped = Vec::new();

    for rule in raw {
        match RuleEntry::parse(rule.as_ref()) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed ACL rule");
                skipped.push(e);
            }
        }
    }

    (entries, skipped)
}
