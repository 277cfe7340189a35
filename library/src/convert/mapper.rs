//! Applies attribute rules from an old node onto a new one.

use log::{debug, warn};

use crate::convert::rule::{AttributeRule, ConversionRule, Converter};
use crate::error::{AttributeWriteFailure, MappingCause};
use crate::host::{HostAdapter, HostError, NodeView};
use crate::model::node::NodeRef;
use crate::model::value::{AttributeValue, Plug};

/// Result of mapping one or more attribute rules.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingOutcome {
    /// Successful writes or connections.
    pub writes: usize,
    pub failures: Vec<AttributeWriteFailure>,
}

impl MappingOutcome {
    fn absorb(&mut self, other: MappingOutcome) {
        self.writes += other.writes;
        self.failures.extend(other.failures);
    }
}

/// What a `Rename`/`FanOut` copies: live upstream outputs, or a value.
enum Source {
    Live(Vec<Plug>),
    Static(AttributeValue),
}

fn read_source(host: &dyn HostAdapter, node: NodeRef, attr: &str) -> Result<Source, HostError> {
    if let AttributeValue::Connection(plug) = host.get_attr(node, attr)? {
        return Ok(Source::Live(vec![plug]));
    }
    let plugs = host.get_connections(node, attr)?;
    if !plugs.is_empty() {
        return Ok(Source::Live(plugs));
    }
    Ok(Source::Static(host.get_static_attr(node, attr)?))
}

/// Runs every attribute rule of `rule` in declared order.
///
/// Later rules overwrite earlier ones that target the same attribute.
pub fn map_attributes(
    host: &mut dyn HostAdapter,
    rule: &ConversionRule,
    old: NodeRef,
    new: NodeRef,
) -> MappingOutcome {
    let mut outcome = MappingOutcome::default();
    for (source_attr, attribute_rule) in &rule.attribute_rules {
        outcome.absorb(apply(host, source_attr, attribute_rule, old, new));
    }
    outcome
}

/// Resolves one attribute rule for `old.source_attr` into writes on `new`.
///
/// Each `(source_attr, target_attr)` pair fails on its own; a failure is
/// logged, recorded and the remaining targets are still attempted.
pub fn apply(
    host: &mut dyn HostAdapter,
    source_attr: &str,
    rule: &AttributeRule,
    old: NodeRef,
    new: NodeRef,
) -> MappingOutcome {
    let mut outcome = MappingOutcome::default();
    let fail = |outcome: &mut MappingOutcome, target: &str, cause: MappingCause| {
        let failure = AttributeWriteFailure {
            old_node: old,
            new_node: new,
            source_attr: source_attr.to_string(),
            target_attr: target.to_string(),
            cause,
        };
        warn!("mapper: {}", failure);
        outcome.failures.push(failure);
    };

    match rule {
        AttributeRule::Rename(_) | AttributeRule::FanOut(_) => {
            let source = match read_source(&*host, old, source_attr) {
                Ok(source) => source,
                Err(err) => {
                    for target in rule.targets() {
                        fail(&mut outcome, target, MappingCause::Host(err.clone()));
                    }
                    return outcome;
                }
            };
            for target in rule.targets() {
                let written = match &source {
                    Source::Live(plugs) => plugs
                        .iter()
                        .try_for_each(|plug| host.connect(plug, new, target)),
                    Source::Static(value) => host.set_attr(new, target, value.clone()),
                };
                match written {
                    Ok(()) => {
                        debug!("mapper: {}.{} -> {}.{}", old, source_attr, new, target);
                        outcome.writes += 1;
                    }
                    Err(err) => fail(&mut outcome, target, MappingCause::Host(err)),
                }
            }
        }
        AttributeRule::Computed(converters) => {
            let value = host.get_static_attr(old, source_attr);
            for (target, converter) in converters {
                let computed = match (&value, converter) {
                    (_, Converter::Constant(constant)) => Ok(constant.clone()),
                    (Ok(value), converter) => {
                        let old_view = NodeView::new(&*host, old);
                        let new_view = NodeView::new(&*host, new);
                        converter
                            .evaluate(value, &old_view, &new_view)
                            .map_err(MappingCause::Converter)
                    }
                    (Err(err), _) => Err(MappingCause::Host(err.clone())),
                };
                let written = computed.and_then(|result| {
                    host.set_attr(new, target, result)
                        .map_err(MappingCause::Host)
                });
                match written {
                    Ok(()) => {
                        debug!(
                            "mapper: {}.{} -> {}.{} (computed)",
                            old, source_attr, new, target
                        );
                        outcome.writes += 1;
                    }
                    Err(cause) => fail(&mut outcome, target, cause),
                }
            }
        }
    }
    outcome
}
