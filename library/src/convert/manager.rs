//! Drives one sheet over a host scene.

use std::collections::HashMap;

use log::{debug, error, info, warn};

use crate::assets::{self, AssetJob};
use crate::convert::factory::{NamingPolicy, NodeFactory};
use crate::convert::mapper::map_attributes;
use crate::convert::rule::{ConversionRule, SpecSheet};
use crate::error::{AttributeWriteFailure, HookFailure, HookStage};
use crate::host::{HostAdapter, HostError};
use crate::model::node::NodeRef;

/// Terminal state of one node's conversion.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// No rule for the node's type; nothing was touched.
    Skipped,
    /// Rule without a target type; only hooks ran.
    Passthrough,
    /// Rule without a target type whose attributes were mapped onto the node.
    InPlace,
    Converted(NodeRef),
    /// The host could not create the replacement.
    Failed(HostError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeConversion {
    pub old: NodeRef,
    pub outcome: Outcome,
    pub mapping_failures: Vec<AttributeWriteFailure>,
    pub hook_failures: Vec<HookFailure>,
}

impl NodeConversion {
    fn new(old: NodeRef, outcome: Outcome) -> Self {
        Self {
            old,
            outcome,
            mapping_failures: Vec::new(),
            hook_failures: Vec::new(),
        }
    }

    /// The node that stands for `old` after conversion: the replacement,
    /// `old` itself when nothing was created, or `None` on failure.
    pub fn result_node(&self) -> Option<NodeRef> {
        match &self.outcome {
            Outcome::Skipped | Outcome::Passthrough | Outcome::InPlace => Some(self.old),
            Outcome::Converted(new) => Some(*new),
            Outcome::Failed(_) => None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.mapping_failures.is_empty()
            && self.hook_failures.is_empty()
            && !matches!(self.outcome, Outcome::Failed(_))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversionReport {
    pub conversions: Vec<NodeConversion>,
}

impl ConversionReport {
    /// `(old, result)` for every node that has a result, in conversion order.
    pub fn pairs(&self) -> Vec<(NodeRef, NodeRef)> {
        self.conversions
            .iter()
            .filter_map(|c| c.result_node().map(|new| (c.old, new)))
            .collect()
    }

    pub fn converted(&self) -> usize {
        self.conversions
            .iter()
            .filter(|c| matches!(c.outcome, Outcome::Converted(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.conversions
            .iter()
            .filter(|c| matches!(c.outcome, Outcome::Failed(_)))
            .count()
    }

    pub fn mapping_failures(&self) -> impl Iterator<Item = &AttributeWriteFailure> {
        self.conversions.iter().flat_map(|c| c.mapping_failures.iter())
    }

    pub fn hook_failures(&self) -> impl Iterator<Item = &HookFailure> {
        self.conversions.iter().flat_map(|c| c.hook_failures.iter())
    }

    pub fn is_clean(&self) -> bool {
        self.conversions.iter().all(NodeConversion::is_clean)
    }
}

pub struct ConversionManager<'s> {
    sheet: &'s SpecSheet,
    factory: NodeFactory,
    parallel_asset_jobs: bool,
}

impl<'s> ConversionManager<'s> {
    pub fn new(sheet: &'s SpecSheet) -> Self {
        Self {
            sheet,
            factory: NodeFactory::new(NamingPolicy::default()),
            parallel_asset_jobs: true,
        }
    }

    pub fn with_naming(mut self, policy: NamingPolicy) -> Self {
        self.factory = NodeFactory::new(policy);
        self
    }

    pub fn with_parallel_asset_jobs(mut self, parallel: bool) -> Self {
        self.parallel_asset_jobs = parallel;
        self
    }

    pub fn sheet(&self) -> &'s SpecSheet {
        self.sheet
    }

    /// Converts a single node, running its asset job inline.
    pub fn convert(&mut self, host: &mut dyn HostAdapter, old: NodeRef) -> NodeConversion {
        self.convert_node(host, old, true)
    }

    /// Converts every node of every sheet type, type by type in sheet order.
    ///
    /// Node lists are taken when a type's turn comes, so converters of later
    /// types observe the effects of earlier ones. Asset jobs of a type all
    /// finish before any node of that type is mapped.
    pub fn auto_convert(&mut self, host: &mut dyn HostAdapter) -> ConversionReport {
        let sheet = self.sheet;
        let mut report = ConversionReport::default();

        for (type_name, rule) in sheet.iter() {
            let nodes = host.list_nodes(type_name);
            info!(
                "convert: {} node(s) of type '{}'",
                nodes.len(),
                type_name
            );
            let mut pending = self.run_asset_jobs(&*host, rule, &nodes);

            for node in nodes {
                let mut conversion = self.convert_node(host, node, false);
                if let Some(mut failures) = pending.remove(&node) {
                    failures.append(&mut conversion.hook_failures);
                    conversion.hook_failures = failures;
                }
                report.conversions.push(conversion);
            }
        }

        info!(
            "convert: {} converted, {} failed, {} mapping failure(s), {} hook failure(s)",
            report.converted(),
            report.failed(),
            report.mapping_failures().count(),
            report.hook_failures().count()
        );
        report
    }

    /// Collects and runs asset jobs for `nodes`, returning failures by node.
    fn run_asset_jobs(
        &self,
        host: &dyn HostAdapter,
        rule: &ConversionRule,
        nodes: &[NodeRef],
    ) -> HashMap<NodeRef, Vec<HookFailure>> {
        let mut failures: HashMap<NodeRef, Vec<HookFailure>> = HashMap::new();
        let Some(factory) = &rule.asset_job else {
            return failures;
        };

        let mut jobs: Vec<(NodeRef, Box<dyn AssetJob>)> = Vec::new();
        for &node in nodes {
            match factory(host, node) {
                Ok(Some(job)) => jobs.push((node, job)),
                Ok(None) => {}
                Err(err) => record(&mut failures, node, HookStage::AssetJob, err.to_string()),
            }
        }

        for (node, result) in assets::run_jobs(jobs, self.parallel_asset_jobs) {
            match result {
                Ok(report) => {
                    for (input, reason) in report.failed {
                        let message = format!("{}: {}", input.display(), reason);
                        record(&mut failures, node, HookStage::AssetJob, message);
                    }
                }
                Err(err) => record(&mut failures, node, HookStage::AssetJob, err.to_string()),
            }
        }
        failures
    }

    fn convert_node(
        &mut self,
        host: &mut dyn HostAdapter,
        old: NodeRef,
        inline_asset_job: bool,
    ) -> NodeConversion {
        let sheet = self.sheet;
        let type_name = match host.node_type(old) {
            Ok(type_name) => type_name,
            Err(err) => {
                warn!("convert: cannot read type of {}: {}", old, err);
                return NodeConversion::new(old, Outcome::Failed(err));
            }
        };
        let Some(rule) = sheet.get(&type_name) else {
            debug!("convert: no rule for {} ({}), skipped", old, type_name);
            return NodeConversion::new(old, Outcome::Skipped);
        };

        let mut conversion = NodeConversion::new(old, Outcome::Passthrough);

        if inline_asset_job && rule.asset_job.is_some() {
            for failures in self.run_asset_jobs(&*host, rule, &[old]).into_values() {
                conversion.hook_failures.extend(failures);
            }
        }

        if let Some(hook) = &rule.before_hook {
            if let Err(err) = hook(&mut *host, old) {
                conversion.hook_failed(HookStage::Before, err.to_string());
            }
        }

        let Some(target_type) = rule.target_type.as_deref() else {
            if rule.map_in_place {
                let mapped = map_attributes(host, rule, old, old);
                conversion.mapping_failures = mapped.failures;
                conversion.outcome = Outcome::InPlace;
            }
            if let Some(hook) = &rule.after_hook {
                if let Err(err) = hook(&mut *host, old, old) {
                    conversion.hook_failed(HookStage::After, err.to_string());
                }
            }
            debug!("convert: {} ({}) handled without a new node", old, type_name);
            return conversion;
        };

        let new = match self
            .factory
            .create(host, target_type, rule.secondary_type.as_deref())
        {
            Ok(new) => new,
            Err(err) => {
                error!(
                    "convert: host could not create {} for {}: {}",
                    target_type, old, err
                );
                conversion.outcome = Outcome::Failed(err);
                return conversion;
            }
        };

        let token = rule.name_token().unwrap_or_else(|| target_type.to_string());
        if let Err(err) = self.factory.label(host, old, new, &token) {
            conversion.hook_failed(HookStage::Rename, err.to_string());
        }

        let mapped = map_attributes(host, rule, old, new);
        debug!(
            "convert: {} -> {} ({} write(s), {} failure(s))",
            old,
            new,
            mapped.writes,
            mapped.failures.len()
        );
        conversion.mapping_failures = mapped.failures;

        if let Some(hook) = &rule.after_hook {
            if let Err(err) = hook(&mut *host, old, new) {
                conversion.hook_failed(HookStage::After, err.to_string());
            }
        }

        conversion.outcome = Outcome::Converted(new);
        conversion
    }
}

impl NodeConversion {
    fn hook_failed(&mut self, stage: HookStage, message: String) {
        let failure = HookFailure {
            node: self.old,
            stage,
            message,
        };
        warn!("convert: {}", failure);
        self.hook_failures.push(failure);
    }
}

fn record(
    failures: &mut HashMap<NodeRef, Vec<HookFailure>>,
    node: NodeRef,
    stage: HookStage,
    message: String,
) {
    let failure = HookFailure {
        node,
        stage,
        message,
    };
    warn!("convert: {}", failure);
    failures.entry(node).or_default().push(failure);
}

/// Converts one node; `None` if the host could not create its replacement.
pub fn convert(
    host: &mut dyn HostAdapter,
    sheet: &SpecSheet,
    node: NodeRef,
) -> Option<NodeRef> {
    ConversionManager::new(sheet).convert(host, node).result_node()
}

/// Converts the whole scene and returns the `(old, result)` pairs.
pub fn auto_convert(host: &mut dyn HostAdapter, sheet: &SpecSheet) -> Vec<(NodeRef, NodeRef)> {
    ConversionManager::new(sheet).auto_convert(host).pairs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::rule::Converter;
    use crate::error::ShadeportError;
    use crate::host::{MemoryScene, NodeSchema};
    use crate::model::value::AttributeValue;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn scene() -> MemoryScene {
        let mut scene = MemoryScene::new();
        scene.register_type(NodeSchema::new("A").attr("x", 0i64));
        scene.register_type(NodeSchema::new("B").attr("y", 0i64));
        scene
    }

    #[test]
    fn test_unmapped_type_is_skipped() {
        let mut scene = scene();
        let node = scene.create_node("A", None).unwrap();
        let before = scene.clone();
        let sheet = SpecSheet::new().with_rule("Other", ConversionRule::to("B"));
        assert_eq!(convert(&mut scene, &sheet, node), Some(node));
        assert_eq!(scene, before);
    }

    #[test]
    fn test_rename_scenario() {
        let mut scene = scene();
        let node = scene.create_node("A", None).unwrap();
        scene.set_attr(node, "x", 5i64.into()).unwrap();
        let sheet = SpecSheet::new().with_rule("A", ConversionRule::to("B").rename("x", "y"));

        let new = convert(&mut scene, &sheet, node).unwrap();
        assert_ne!(new, node);
        assert_eq!(scene.node_type(new).unwrap(), "B");
        assert_eq!(scene.get_attr(new, "y").unwrap(), AttributeValue::from(5i64));
        assert_eq!(scene.node_name(new).unwrap(), "B1");
    }

    #[test]
    fn test_creation_failure_aborts_only_that_node() {
        let mut scene = scene();
        let a = scene.create_node("A", None).unwrap();
        let b = scene.create_node("B", None).unwrap();
        let after_ran = Arc::new(AtomicBool::new(false));
        let flag = after_ran.clone();
        let sheet = SpecSheet::new()
            .with_rule(
                "A",
                ConversionRule::to("Unregistered").after(move |_, _, _| {
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .with_rule("B", ConversionRule::to("A"));

        let report = ConversionManager::new(&sheet).auto_convert(&mut scene);
        assert_eq!(report.conversions.len(), 2);
        assert_eq!(report.conversions[0].old, a);
        assert!(matches!(
            report.conversions[0].outcome,
            Outcome::Failed(HostError::Creation(_))
        ));
        assert_eq!(report.conversions[0].result_node(), None);
        assert!(!after_ran.load(Ordering::SeqCst));
        assert_eq!(report.conversions[1].old, b);
        assert!(matches!(report.conversions[1].outcome, Outcome::Converted(_)));
        assert_eq!(report.failed(), 1);
        assert_eq!(report.pairs().len(), 1);
    }

    #[test]
    fn test_passthrough_runs_hooks_with_same_node() {
        let mut scene = scene();
        let node = scene.create_node("A", None).unwrap();
        let sheet = SpecSheet::new().with_rule(
            "A",
            ConversionRule::passthrough()
                .before(|host, old| {
                    host.set_tag(old, "seen", "before")?;
                    Ok(())
                })
                .after(|host, old, new| {
                    assert_eq!(old, new);
                    host.set_tag(new, "seen", "after")?;
                    Ok(())
                }),
        );
        let conversion = ConversionManager::new(&sheet).convert(&mut scene, node);
        assert_eq!(conversion.outcome, Outcome::Passthrough);
        assert_eq!(conversion.result_node(), Some(node));
        assert_eq!(scene.get_tag(node, "seen").unwrap().as_deref(), Some("after"));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_in_place_rule_maps_onto_old_node() {
        let mut scene = scene();
        let light = scene.add_node("pointLight", "key");
        scene.declare_attr(light, "aiExposure", 3.0).unwrap();
        scene.declare_attr(light, "intensity", 1.0).unwrap();
        let sheet = SpecSheet::new().with_rule(
            "pointLight",
            ConversionRule::in_place().computed(
                "aiExposure",
                "intensity",
                Converter::unary(|v| Ok(2f64.powf(v.try_as::<f64>()?).into())),
            ),
        );
        let conversion = ConversionManager::new(&sheet).convert(&mut scene, light);
        assert_eq!(conversion.outcome, Outcome::InPlace);
        assert_eq!(
            scene.get_attr(light, "intensity").unwrap(),
            AttributeValue::from(8.0)
        );
    }

    #[test]
    fn test_hook_failures_do_not_abort() {
        let mut scene = scene();
        let node = scene.create_node("A", None).unwrap();
        let sheet = SpecSheet::new().with_rule(
            "A",
            ConversionRule::to("B")
                .rename("x", "y")
                .before(|_, _| Err(ShadeportError::Conversion("texture tool missing".into()))),
        );
        let conversion = ConversionManager::new(&sheet).convert(&mut scene, node);
        assert!(matches!(conversion.outcome, Outcome::Converted(_)));
        assert_eq!(conversion.hook_failures.len(), 1);
        assert_eq!(conversion.hook_failures[0].stage, HookStage::Before);
        assert!(!conversion.is_clean());
    }
}
