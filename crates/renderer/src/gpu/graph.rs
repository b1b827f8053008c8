//! Dependency-ordered pass execution.
//!
//! Every pass names the resources it reads and writes. The graph orders
//! passes so each read happens after the single pass that writes the
//! resource, and rejects graphs where that order does not exist.

use std::collections::{BTreeMap, BTreeSet};

/// Resources passes can exchange within one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceId {
    /// Seed texture, uploaded before the graph runs.
    SeedTexture,
    /// Offscreen `(index / N, distance)` target.
    DistanceField,
    /// The visible target: window surface or headless texture.
    Presentation,
}

/// A full-screen pass that can be recorded into a command encoder.
pub trait RenderNode {
    fn name(&self) -> &'static str;
    fn inputs(&self) -> &[ResourceId];
    fn outputs(&self) -> &[ResourceId];
    /// Records the pass. Each node issues exactly one draw.
    fn encode(&self, encoder: &mut wgpu::CommandEncoder);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("pass `{pass}` reads {resource:?} but no pass produces it")]
    MissingProducer {
        pass: &'static str,
        resource: ResourceId,
    },
    #[error("{resource:?} is written by both `{first}` and `{second}`")]
    DuplicateProducer {
        resource: ResourceId,
        first: &'static str,
        second: &'static str,
    },
    #[error("pass `{pass}` writes {resource:?}, which is imported read-only")]
    OverwritesImport {
        pass: &'static str,
        resource: ResourceId,
    },
    #[error("passes depend on each other in a cycle: {}", passes.join(" -> "))]
    Cycle { passes: Vec<&'static str> },
}

/// Orders `passes` so producers run before consumers.
///
/// `imports` are resources that exist before the graph runs and may only be
/// read. Among passes that are ready at the same time, the one added first
/// runs first, so the result is deterministic.
pub fn schedule(
    imports: &[ResourceId],
    passes: &[&dyn RenderNode],
) -> Result<Vec<usize>, GraphError> {
    let mut producers: BTreeMap<ResourceId, usize> = BTreeMap::new();
    for (index, pass) in passes.iter().enumerate() {
        for &resource in pass.outputs() {
            if imports.contains(&resource) {
                return Err(GraphError::OverwritesImport {
                    pass: pass.name(),
                    resource,
                });
            }
            if let Some(&first) = producers.get(&resource) {
                return Err(GraphError::DuplicateProducer {
                    resource,
                    first: passes[first].name(),
                    second: pass.name(),
                });
            }
            producers.insert(resource, index);
        }
    }

    let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); passes.len()];
    let mut pending = vec![0usize; passes.len()];
    for (index, pass) in passes.iter().enumerate() {
        let mut upstream = BTreeSet::new();
        for &resource in pass.inputs() {
            if imports.contains(&resource) {
                continue;
            }
            let producer = *producers
                .get(&resource)
                .ok_or(GraphError::MissingProducer {
                    pass: pass.name(),
                    resource,
                })?;
            upstream.insert(producer);
        }
        pending[index] = upstream.len();
        for producer in upstream {
            dependents[producer].insert(index);
        }
    }

    let mut ready: BTreeSet<usize> = (0..passes.len()).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(passes.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != passes.len() {
        let passes = (0..passes.len())
            .filter(|i| !order.contains(i))
            .map(|i| passes[i].name())
            .collect();
        return Err(GraphError::Cycle { passes });
    }
    Ok(order)
}

/// Passes of one render, executed in dependency order on one encoder.
pub struct RenderGraph<'a> {
    imports: Vec<ResourceId>,
    passes: Vec<Box<dyn RenderNode + 'a>>,
}

impl<'a> RenderGraph<'a> {
    pub fn new(imports: &[ResourceId]) -> Self {
        Self {
            imports: imports.to_vec(),
            passes: Vec::new(),
        }
    }

    pub fn add_pass(&mut self, pass: impl RenderNode + 'a) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Pass names in the order they will execute.
    pub fn execution_order(&self) -> Result<Vec<&'static str>, GraphError> {
        let order = schedule(&self.imports, &self.node_refs())?;
        Ok(order.into_iter().map(|i| self.passes[i].name()).collect())
    }

    /// Records every pass into `encoder` and returns how many draws were
    /// recorded. Nothing is recorded if the graph is rejected.
    pub fn execute(&self, encoder: &mut wgpu::CommandEncoder) -> Result<usize, GraphError> {
        let order = schedule(&self.imports, &self.node_refs())?;
        for &index in &order {
            let pass = &self.passes[index];
            tracing::trace!(pass = pass.name(), "encoding pass");
            pass.encode(encoder);
        }
        Ok(order.len())
    }

    fn node_refs(&self) -> Vec<&dyn RenderNode> {
        self.passes.iter().map(|pass| pass.as_ref() as &dyn RenderNode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        name: &'static str,
        inputs: Vec<ResourceId>,
        outputs: Vec<ResourceId>,
    }

    impl RenderNode for Stub {
        fn name(&self) -> &'static str {
            self.name
        }
        fn inputs(&self) -> &[ResourceId] {
            &self.inputs
        }
        fn outputs(&self) -> &[ResourceId] {
            &self.outputs
        }
        fn encode(&self, _encoder: &mut wgpu::CommandEncoder) {}
    }

    fn stub(name: &'static str, inputs: &[ResourceId], outputs: &[ResourceId]) -> Stub {
        Stub {
            name,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        }
    }

    fn distance() -> Stub {
        stub(
            "distance",
            &[ResourceId::SeedTexture],
            &[ResourceId::DistanceField],
        )
    }

    fn edge() -> Stub {
        stub(
            "edge",
            &[ResourceId::DistanceField],
            &[ResourceId::Presentation],
        )
    }

    #[test]
    fn consumers_run_after_producers_regardless_of_insertion() {
        let mut graph = RenderGraph::new(&[ResourceId::SeedTexture]);
        graph.add_pass(edge()).add_pass(distance());
        assert_eq!(graph.execution_order().unwrap(), vec!["distance", "edge"]);
    }

    #[test]
    fn independent_passes_keep_insertion_order() {
        let a = stub("a", &[], &[ResourceId::DistanceField]);
        let b = stub("b", &[], &[ResourceId::Presentation]);
        assert_eq!(schedule(&[], &[&a, &b]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn missing_producer_is_rejected() {
        let edge = edge();
        let err = schedule(&[ResourceId::SeedTexture], &[&edge]).unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingProducer {
                pass: "edge",
                resource: ResourceId::DistanceField,
            }
        );
    }

    #[test]
    fn duplicate_producer_is_rejected() {
        let first = distance();
        let second = stub("again", &[], &[ResourceId::DistanceField]);
        let err = schedule(&[ResourceId::SeedTexture], &[&first, &second]).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateProducer { first: "distance", second: "again", .. }));
    }

    #[test]
    fn writing_an_import_is_rejected() {
        let rogue = stub("rogue", &[], &[ResourceId::SeedTexture]);
        let err = schedule(&[ResourceId::SeedTexture], &[&rogue]).unwrap_err();
        assert!(matches!(err, GraphError::OverwritesImport { pass: "rogue", .. }));
    }

    #[test]
    fn cycles_are_rejected() {
        let a = stub("a", &[ResourceId::Presentation], &[ResourceId::DistanceField]);
        let b = stub("b", &[ResourceId::DistanceField], &[ResourceId::Presentation]);
        let err = schedule(&[], &[&a, &b]).unwrap_err();
        assert_eq!(err, GraphError::Cycle { passes: vec!["a", "b"] });
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let a = stub("a", &[ResourceId::DistanceField], &[ResourceId::DistanceField]);
        assert!(matches!(schedule(&[], &[&a]), Err(GraphError::Cycle { .. })));
    }
}
